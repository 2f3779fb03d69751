//! Error types for CodeWalker XML operations.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while reading or writing CodeWalker XML.
#[derive(Error, Debug)]
pub enum CwXmlError {
    /// I/O error reading or writing a file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The document is not well-formed XML.
    #[error("XML error at line {line}: {message}")]
    Xml {
        /// Line number (1-indexed).
        line: usize,
        /// Error message.
        message: String,
    },

    /// The document root does not match the expected schema tag.
    #[error("wrong format: expected root <{expected}>, found <{found}>")]
    WrongFormat {
        /// Tag the schema expects.
        expected: String,
        /// Tag the document starts with.
        found: String,
    },

    /// A leaf value could not be decoded and strict reading was requested.
    #[error("{0}")]
    ReadValue(ReadValueError),

    /// Any of the above, tagged with the file it came from.
    #[error("{}: {source}", path.display())]
    File {
        /// Path of the file being read or written.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: Box<CwXmlError>,
    },
}

impl CwXmlError {
    /// Create an XML syntax error.
    pub fn xml(line: usize, message: impl fmt::Display) -> Self {
        Self::Xml {
            line,
            message: message.to_string(),
        }
    }

    /// Create an error for a failed XML write.
    pub fn write(message: impl fmt::Display) -> Self {
        Self::Xml {
            line: 0,
            message: message.to_string(),
        }
    }

    /// Create a root-tag mismatch error.
    pub fn wrong_format(expected: impl Into<String>, found: impl Into<String>) -> Self {
        Self::WrongFormat {
            expected: expected.into(),
            found: found.into(),
        }
    }

    /// Attach a file path to this error.
    pub fn in_file(self, path: impl Into<PathBuf>) -> Self {
        Self::File {
            path: path.into(),
            source: Box::new(self),
        }
    }
}

/// A leaf property whose text or attributes do not have the expected shape.
///
/// These are collected while parsing instead of aborting it, so a damaged
/// file still yields the rest of its structure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadValueError {
    /// Slash-separated element path, e.g. `BoundsFile/Bounds/Children/Item[2]/Vertices`.
    pub path: String,
    /// Source line of the offending element (1-indexed, 0 if unknown).
    pub line: usize,
    /// What was wrong.
    pub message: String,
}

impl fmt::Display for ReadValueError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "read value error at {} (line {}): {}",
            self.path, self.line, self.message
        )
    }
}

impl std::error::Error for ReadValueError {}

/// An index that does not resolve to an entry of its sibling array.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntegrityError {
    /// Path of the record holding the bad index.
    pub path: String,
    /// What was wrong.
    pub message: String,
}

impl IntegrityError {
    /// Create an integrity error.
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for IntegrityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "referential integrity error at {}: {}", self.path, self.message)
    }
}

impl std::error::Error for IntegrityError {}

/// Result type for CodeWalker XML operations.
pub type Result<T> = std::result::Result<T, CwXmlError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_error_mentions_path() {
        let err = CwXmlError::wrong_format("BoundsFile", "Fragment").in_file("props/crate.ybn.xml");
        let message = err.to_string();
        assert!(message.starts_with("props/crate.ybn.xml"));
        assert!(message.contains("expected root <BoundsFile>"));
    }

    #[test]
    fn test_read_value_error_display() {
        let err = ReadValueError {
            path: "BoundsFile/Bounds/Margin".into(),
            line: 7,
            message: "invalid number `abc`".into(),
        };
        assert_eq!(
            err.to_string(),
            "read value error at BoundsFile/Bounds/Margin (line 7): invalid number `abc`"
        );
    }
}
