//! Owned XML element tree.
//!
//! Documents are read into memory in one pass with `quick-xml` and written
//! back the same way. The tree keeps attribute order and records the source
//! line of every element so later decoding errors can point at it.

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use crate::config::WriteOptions;
use crate::error::{CwXmlError, Result};

/// A single XML element with its attributes, text and children.
#[derive(Debug, Clone, Default)]
pub struct Element {
    /// Tag name.
    pub name: String,
    /// Attributes in document order.
    pub attributes: Vec<(String, String)>,
    /// Trimmed text content, if any.
    pub text: Option<String>,
    /// Child elements in document order.
    pub children: Vec<Element>,
    /// Source line (1-indexed), 0 for elements built in memory.
    pub line: usize,
}

// Source lines are diagnostics only.
impl PartialEq for Element {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.attributes == other.attributes
            && self.text == other.text
            && self.children == other.children
    }
}

impl Element {
    /// Create an empty element.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Builder form of [`Element::set_attribute`].
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attribute(key, value);
        self
    }

    /// Builder form of [`Element::set_text`].
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.set_text(text);
        self
    }

    /// Builder form of [`Element::push`].
    pub fn with_child(mut self, child: Element) -> Self {
        self.push(child);
        self
    }

    /// Set an attribute, replacing an existing value in place.
    pub fn set_attribute(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.attributes.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.attributes.push((key, value)),
        }
    }

    /// Look up an attribute value.
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Set the text content.
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = Some(text.into());
    }

    /// Text content, or the empty string.
    pub fn text(&self) -> &str {
        self.text.as_deref().unwrap_or("")
    }

    /// Append a child element.
    pub fn push(&mut self, child: Element) {
        self.children.push(child);
    }

    /// First child with the given tag.
    pub fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.name == name)
    }

    /// Parse a complete document and return its root element.
    pub fn parse(xml: &str) -> Result<Element> {
        let lines = LineIndex::new(xml);
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(true);

        let mut stack: Vec<Element> = Vec::new();
        let mut root: Option<Element> = None;

        loop {
            let event = reader
                .read_event()
                .map_err(|e| CwXmlError::xml(lines.line_at(reader.buffer_position() as usize), e))?;
            let line = lines.line_at(reader.buffer_position() as usize);

            match event {
                Event::Start(start) => {
                    stack.push(open_element(&start, line)?);
                }
                Event::Empty(start) => {
                    let element = open_element(&start, line)?;
                    close_element(&mut stack, &mut root, element, line)?;
                }
                Event::End(_) => {
                    let element = stack
                        .pop()
                        .ok_or_else(|| CwXmlError::xml(line, "unexpected closing tag"))?;
                    close_element(&mut stack, &mut root, element, line)?;
                }
                Event::Text(text) => {
                    if let Some(current) = stack.last_mut() {
                        let value = text.unescape().map_err(|e| CwXmlError::xml(line, e))?;
                        append_text(current, &value);
                    }
                }
                Event::CData(data) => {
                    if let Some(current) = stack.last_mut() {
                        let raw = data.into_inner();
                        append_text(current, &String::from_utf8_lossy(&raw));
                    }
                }
                Event::Eof => break,
                // Declarations, comments, processing instructions, doctypes.
                _ => {}
            }
        }

        if let Some(open) = stack.last() {
            return Err(CwXmlError::xml(
                lines.line_at(xml.len()),
                format!("unclosed element <{}>", open.name),
            ));
        }
        root.ok_or_else(|| CwXmlError::xml(1, "document has no root element"))
    }

    /// Serialise this element as a complete document.
    pub fn to_xml_string(&self, options: &WriteOptions) -> Result<String> {
        let mut writer = if options.indent > 0 {
            Writer::new_with_indent(Vec::new(), b' ', options.indent)
        } else {
            Writer::new(Vec::new())
        };

        if options.declaration {
            writer
                .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
                .map_err(CwXmlError::write)?;
        }
        self.write_into(&mut writer)?;

        String::from_utf8(writer.into_inner()).map_err(CwXmlError::write)
    }

    fn write_into<W: std::io::Write>(&self, writer: &mut Writer<W>) -> Result<()> {
        let mut start = BytesStart::new(self.name.as_str());
        for (key, value) in &self.attributes {
            start.push_attribute((key.as_str(), value.as_str()));
        }

        let text = self.text.as_deref().filter(|t| !t.is_empty());
        if text.is_none() && self.children.is_empty() {
            return writer
                .write_event(Event::Empty(start))
                .map_err(CwXmlError::write);
        }

        writer
            .write_event(Event::Start(start))
            .map_err(CwXmlError::write)?;
        if let Some(text) = text {
            writer
                .write_event(Event::Text(BytesText::new(text)))
                .map_err(CwXmlError::write)?;
        }
        for child in &self.children {
            child.write_into(writer)?;
        }
        writer
            .write_event(Event::End(BytesEnd::new(self.name.as_str())))
            .map_err(CwXmlError::write)
    }
}

fn open_element(start: &BytesStart, line: usize) -> Result<Element> {
    let mut element = Element::new(String::from_utf8_lossy(start.name().as_ref()));
    element.line = line;
    for attr in start.attributes() {
        let attr = attr.map_err(|e| CwXmlError::xml(line, e))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr.unescape_value().map_err(|e| CwXmlError::xml(line, e))?;
        element.attributes.push((key, value.into_owned()));
    }
    Ok(element)
}

fn close_element(
    stack: &mut [Element],
    root: &mut Option<Element>,
    element: Element,
    line: usize,
) -> Result<()> {
    match stack.last_mut() {
        Some(parent) => parent.push(element),
        None if root.is_none() => *root = Some(element),
        None => return Err(CwXmlError::xml(line, "more than one root element")),
    }
    Ok(())
}

fn append_text(element: &mut Element, value: &str) {
    match &mut element.text {
        Some(text) => text.push_str(value),
        None => element.text = Some(value.to_string()),
    }
}

/// Byte offset to line number lookup.
struct LineIndex {
    newlines: Vec<usize>,
}

impl LineIndex {
    fn new(source: &str) -> Self {
        Self {
            newlines: source.match_indices('\n').map(|(i, _)| i).collect(),
        }
    }

    fn line_at(&self, offset: usize) -> usize {
        self.newlines.partition_point(|&n| n < offset) + 1
    }
}
