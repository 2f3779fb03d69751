//! Document-level entry points: strings and files.

use std::fs;
use std::path::{Path, PathBuf};

use crate::bound::BoundFile;
use crate::config::{ReadOptions, WriteOptions};
use crate::element::{ElementTree, ReadContext};
use crate::error::{CwXmlError, ReadValueError, Result};
use crate::fragment::Fragment;
use crate::xml::Element;

/// A parsed document root together with the read-value errors collected
/// while decoding it.
#[derive(Debug, Clone, PartialEq)]
pub struct Document<T> {
    /// Decoded root record.
    pub root: T,
    /// Damaged leaves, in document order. Always empty after a strict read.
    pub errors: Vec<ReadValueError>,
}

impl<T> Document<T> {
    /// `true` if every leaf decoded cleanly.
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Whole-document reading and writing for every root record.
pub trait XmlFile: ElementTree {
    /// Parse a document leniently.
    fn from_xml_str(xml: &str) -> Result<Document<Self>> {
        Self::from_xml_str_with(xml, &ReadOptions::default())
    }

    /// Parse a document. The root tag must be [`ElementTree::TAG`].
    fn from_xml_str_with(xml: &str, options: &ReadOptions) -> Result<Document<Self>> {
        let element = Element::parse(xml)?;
        if element.name != Self::TAG {
            return Err(CwXmlError::wrong_format(Self::TAG, element.name));
        }

        let mut ctx = ReadContext::new(&element);
        let root = Self::from_xml(&element, &mut ctx);
        let mut errors = ctx.into_errors();
        if options.strict && !errors.is_empty() {
            return Err(CwXmlError::ReadValue(errors.swap_remove(0)));
        }
        Ok(Document { root, errors })
    }

    /// Load a file leniently.
    fn from_xml_file(path: impl AsRef<Path>) -> Result<Document<Self>> {
        Self::from_xml_file_with(path, &ReadOptions::default())
    }

    /// Load a file. Any failure is tagged with the path.
    fn from_xml_file_with(path: impl AsRef<Path>, options: &ReadOptions) -> Result<Document<Self>> {
        let path = path.as_ref();
        let document = fs::read_to_string(path)
            .map_err(CwXmlError::from)
            .and_then(|xml| Self::from_xml_str_with(&xml, options))
            .map_err(|e| e.in_file(path))?;
        tracing::debug!(
            path = %path.display(),
            root = Self::TAG,
            errors = document.errors.len(),
            "loaded document"
        );
        Ok(document)
    }

    /// Serialise as a complete document.
    fn to_xml_string(&self, options: &WriteOptions) -> Result<String> {
        self.to_xml().to_xml_string(options)
    }

    /// Write a file with default options.
    fn write_xml(&self, path: impl AsRef<Path>) -> Result<()> {
        self.write_xml_with(path, &WriteOptions::default())
    }

    /// Write a file. Any failure is tagged with the path.
    fn write_xml_with(&self, path: impl AsRef<Path>, options: &WriteOptions) -> Result<()> {
        let path = path.as_ref();
        self.to_xml_string(options)
            .and_then(|xml| fs::write(path, xml).map_err(CwXmlError::from))
            .map_err(|e| e.in_file(path))?;
        tracing::debug!(path = %path.display(), root = Self::TAG, "wrote document");
        Ok(())
    }
}

impl<T: ElementTree> XmlFile for T {}

/// The `.ybn.xml` bounds format.
pub struct Ybn;

impl Ybn {
    /// File name suffix.
    pub const FILE_EXTENSION: &'static str = ".ybn.xml";

    /// Load a bounds file.
    pub fn from_xml_file(path: impl AsRef<Path>) -> Result<Document<BoundFile>> {
        BoundFile::from_xml_file(path)
    }

    /// Write a bounds file.
    pub fn write_xml(bound_file: &BoundFile, path: impl AsRef<Path>) -> Result<()> {
        bound_file.write_xml(path)
    }
}

/// The `.yft.xml` fragment format.
pub struct Yft;

impl Yft {
    /// File name suffix.
    pub const FILE_EXTENSION: &'static str = ".yft.xml";

    /// Load a fragment file.
    pub fn from_xml_file(path: impl AsRef<Path>) -> Result<Document<Fragment>> {
        Fragment::from_xml_file(path)
    }

    /// Write a fragment file.
    pub fn write_xml(fragment: &Fragment, path: impl AsRef<Path>) -> Result<()> {
        fragment.write_xml(path)
    }
}

/// `true` if the file name ends with `suffix`, ignoring ASCII case.
pub fn has_extension(path: &Path, suffix: &str) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .and_then(|n| n.get(n.len().checked_sub(suffix.len())?..))
        .is_some_and(|tail| tail.eq_ignore_ascii_case(suffix))
}

/// First `*.yft.xml` in `dir`, by file name.
pub fn find_fragment_file(dir: impl AsRef<Path>) -> Result<Option<PathBuf>> {
    let dir = dir.as_ref();
    let mut found = Vec::new();
    for entry in fs::read_dir(dir).map_err(|e| CwXmlError::from(e).in_file(dir))? {
        let path = entry.map_err(|e| CwXmlError::from(e).in_file(dir))?.path();
        if path.is_file() && has_extension(&path, Yft::FILE_EXTENSION) {
            found.push(path);
        }
    }
    found.sort();
    Ok(found.into_iter().next())
}

/// `name.yft.xml` to `name_hi.yft.xml`, in the same directory.
pub fn hi_detail_path(path: impl AsRef<Path>) -> PathBuf {
    let path = path.as_ref();
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let stem = if has_extension(path, Yft::FILE_EXTENSION) {
        &name[..name.len() - Yft::FILE_EXTENSION.len()]
    } else {
        name.as_str()
    };
    path.with_file_name(format!("{stem}_hi{}", Yft::FILE_EXTENSION))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bound::{BoundComposite, BoundItem, BoundShape};

    fn bound_file() -> BoundFile {
        let mut composite = BoundComposite::default();
        composite.bound.margin = 0.005;
        composite.children.push(BoundItem::Sphere(BoundShape::default()));
        BoundFile::new(composite)
    }

    #[test]
    fn test_wrong_root_is_fatal() {
        let err = BoundFile::from_xml_str("<Fragment/>").unwrap_err();
        assert!(matches!(err, CwXmlError::WrongFormat { ref found, .. } if found == "Fragment"));
    }

    #[test]
    fn test_lenient_read_collects_errors() {
        let xml = r#"<BoundsFile><Bounds type="Composite"><Margin value="wide"/><Volume value="2"/></Bounds></BoundsFile>"#;
        let document = BoundFile::from_xml_str_with(xml, &ReadOptions::lenient()).unwrap();
        assert!(!document.is_clean());
        assert_eq!(document.errors[0].path, "BoundsFile/Bounds/Margin");
        assert_eq!(document.root.composite.bound.volume, 2.0);
    }

    #[test]
    fn test_strict_read_fails_on_first_error() {
        let xml = r#"<BoundsFile><Bounds type="Composite"><Margin value="wide"/></Bounds></BoundsFile>"#;
        let err = BoundFile::from_xml_str_with(xml, &ReadOptions::strict()).unwrap_err();
        assert!(matches!(err, CwXmlError::ReadValue(ref e) if e.line == 1));
    }

    #[test]
    fn test_string_round_trip() {
        let original = bound_file();
        let xml = original.to_xml_string(&WriteOptions::default()).unwrap();
        assert!(xml.starts_with("<?xml"));
        assert!(xml.contains("<Margin value=\"0.005\"/>"));
        assert_eq!(BoundFile::from_xml_str(&xml).unwrap().root, original);
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("crate.ybn.xml");
        Ybn::write_xml(&bound_file(), &path).unwrap();
        let document = Ybn::from_xml_file(&path).unwrap();
        assert!(document.is_clean());
        assert_eq!(document.root, bound_file());
    }

    #[test]
    fn test_missing_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.yft.xml");
        let err = Yft::from_xml_file(&path).unwrap_err();
        assert!(matches!(err, CwXmlError::File { path: ref p, .. } if p == &path));
    }

    #[test]
    fn test_find_fragment_file() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(find_fragment_file(dir.path()).unwrap(), None);

        fs::write(dir.path().join("b.yft.xml"), "<Fragment/>").unwrap();
        fs::write(dir.path().join("a.ybn.xml"), "<BoundsFile/>").unwrap();
        fs::write(dir.path().join("a.YFT.XML"), "<Fragment/>").unwrap();
        let found = find_fragment_file(dir.path()).unwrap().unwrap();
        assert_eq!(found.file_name().unwrap(), "a.YFT.XML");
    }

    #[test]
    fn test_hi_detail_path() {
        assert_eq!(
            hi_detail_path("vehicles/door.yft.xml"),
            PathBuf::from("vehicles/door_hi.yft.xml")
        );
    }
}
