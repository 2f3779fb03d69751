//! Declarative binding of records to XML elements.
//!
//! Every schema record lists its properties once, in a static table of
//! [`Field`] descriptors. The generic [`read_fields`] and [`write_fields`]
//! walk that table in declaration order, so output order is deterministic and
//! no per-type traversal code is needed. The [`child!`](crate::child),
//! [`attribute!`](crate::attribute), [`fixed_attribute!`](crate::fixed_attribute)
//! and [`flatten!`](crate::flatten) macros build the descriptors.

use crate::error::ReadValueError;
use crate::xml::Element;

/// Reads a property from its matched child element.
pub type ReadChildFn<T> = fn(&mut T, &Element, &mut ReadContext);
/// Serialises a property as a child element, `None` meaning "no content".
pub type WriteChildFn<T> = fn(&T, &str) -> Option<Element>;
/// Reads a property from a raw attribute value.
pub type ReadAttributeFn<T> = fn(&mut T, &str, &mut ReadContext);
/// Serialises a property as an attribute value.
pub type WriteAttributeFn<T> = fn(&T) -> String;
/// Reads an embedded record's properties from the same element.
pub type ReadFlattenFn<T> = fn(&mut T, &Element, &mut ReadContext);
/// Writes an embedded record's properties into the same element.
pub type WriteFlattenFn<T> = fn(&T, &mut Element);

/// How a property is bound to XML.
pub enum Accessor<T> {
    /// Child element with the field's tag.
    Child {
        /// Decoder.
        read: ReadChildFn<T>,
        /// Encoder.
        write: WriteChildFn<T>,
    },
    /// Attribute on the record's own element.
    Attribute {
        /// Decoder.
        read: ReadAttributeFn<T>,
        /// Encoder.
        write: WriteAttributeFn<T>,
    },
    /// Properties of an embedded record, bound to the same element.
    Flatten {
        /// Decoder.
        read: ReadFlattenFn<T>,
        /// Encoder.
        write: WriteFlattenFn<T>,
    },
}

/// One property descriptor: a tag or attribute name plus its accessor.
pub struct Field<T> {
    /// Child tag or attribute name (empty for flattened records).
    pub name: &'static str,
    /// Binding and codec.
    pub accessor: Accessor<T>,
}

/// A record with a static property table.
pub trait Fields: Sized + 'static {
    /// Properties in binding order.
    const FIELDS: &'static [Field<Self>];
}

/// A record that maps to a whole XML element.
pub trait ElementTree: Fields + Default {
    /// Tag used when the record is a document root or a list item.
    const TAG: &'static str;

    /// Build a record from an element. Properties without a matching child or
    /// attribute keep their defaults.
    fn from_xml(element: &Element, ctx: &mut ReadContext) -> Self {
        let mut value = Self::default();
        read_fields(&mut value, element, ctx);
        value
    }

    /// Serialise under [`ElementTree::TAG`].
    fn to_xml(&self) -> Element {
        self.to_xml_tagged(Self::TAG)
    }

    /// Serialise under an explicit tag.
    fn to_xml_tagged(&self, tag: &str) -> Element {
        let mut element = Element::new(tag);
        write_fields(self, &mut element);
        element
    }
}

/// Populate `value` from `element` using its property table.
pub fn read_fields<T: Fields>(value: &mut T, element: &Element, ctx: &mut ReadContext) {
    for field in T::FIELDS {
        match &field.accessor {
            Accessor::Child { read, .. } => {
                if let Some(child) = element.child(field.name) {
                    ctx.scoped(field.name, child.line, |ctx| read(value, child, ctx));
                }
            }
            Accessor::Attribute { read, .. } => {
                if let Some(raw) = element.attribute(field.name) {
                    let segment = format!("@{}", field.name);
                    ctx.scoped(segment, element.line, |ctx| read(value, raw, ctx));
                }
            }
            Accessor::Flatten { read, .. } => read(value, element, ctx),
        }
    }
}

/// Append `value`'s properties to `element` in declaration order.
pub fn write_fields<T: Fields>(value: &T, element: &mut Element) {
    for field in T::FIELDS {
        match &field.accessor {
            Accessor::Child { write, .. } => {
                if let Some(child) = write(value, field.name) {
                    element.push(child);
                }
            }
            Accessor::Attribute { write, .. } => {
                element.set_attribute(field.name, write(value));
            }
            Accessor::Flatten { write, .. } => write(value, element),
        }
    }
}

/// Tags of every child-bound property in `T`'s own table.
pub fn child_tags<T: Fields>() -> impl Iterator<Item = &'static str> {
    T::FIELDS
        .iter()
        .filter(|f| matches!(f.accessor, Accessor::Child { .. }))
        .map(|f| f.name)
}

/// Parse state: the current element path and the errors collected so far.
#[derive(Debug, Default)]
pub struct ReadContext {
    frames: Vec<(String, usize)>,
    errors: Vec<ReadValueError>,
}

impl ReadContext {
    /// Start a context rooted at the document element.
    pub fn new(root: &Element) -> Self {
        Self {
            frames: vec![(root.name.clone(), root.line)],
            errors: Vec::new(),
        }
    }

    /// Run `f` with `segment` pushed onto the path.
    pub fn scoped<R>(
        &mut self,
        segment: impl Into<String>,
        line: usize,
        f: impl FnOnce(&mut Self) -> R,
    ) -> R {
        self.frames.push((segment.into(), line));
        let result = f(self);
        self.frames.pop();
        result
    }

    /// Current slash-separated path.
    pub fn path(&self) -> String {
        self.frames
            .iter()
            .map(|(segment, _)| segment.as_str())
            .collect::<Vec<_>>()
            .join("/")
    }

    /// Record a read-value error against the current element.
    pub fn error(&mut self, message: impl Into<String>) {
        let error = ReadValueError {
            path: self.path(),
            line: self.frames.last().map(|(_, line)| *line).unwrap_or(0),
            message: message.into(),
        };
        tracing::warn!(path = %error.path, line = error.line, "{}", error.message);
        self.errors.push(error);
    }

    /// Errors collected so far.
    pub fn errors(&self) -> &[ReadValueError] {
        &self.errors
    }

    /// Consume the context, returning its errors.
    pub fn into_errors(self) -> Vec<ReadValueError> {
        self.errors
    }
}

/// Bind a field to a child element through a [`Codec`](crate::property::Codec).
///
/// `child!("BoxMin", box_min: VectorProperty)` reads `<BoxMin .../>` into
/// `self.box_min`. Nested paths (`shape.bound.margin`) are accepted.
#[macro_export]
macro_rules! child {
    ($tag:literal, $($field:ident).+ : $codec:ty) => {
        $crate::element::Field {
            name: $tag,
            accessor: $crate::element::Accessor::Child {
                read: |this, element, ctx| {
                    if let Some(value) = <$codec as $crate::property::Codec>::read(element, ctx) {
                        this.$($field).+ = value;
                    }
                },
                write: |this, tag| <$codec as $crate::property::Codec>::write(&this.$($field).+, tag),
            },
        }
    };
}

/// Bind a scalar field to an attribute of the record's own element.
#[macro_export]
macro_rules! attribute {
    ($name:literal, $($field:ident).+) => {
        $crate::element::Field {
            name: $name,
            accessor: $crate::element::Accessor::Attribute {
                read: |this, raw, ctx| match $crate::property::Scalar::parse_scalar(raw) {
                    Ok(value) => this.$($field).+ = value,
                    Err(message) => ctx.error(message),
                },
                write: |this| $crate::property::Scalar::format_scalar(&this.$($field).+),
            },
        }
    };
}

/// Emit a constant attribute, typically a discriminator such as `type="Composite"`.
#[macro_export]
macro_rules! fixed_attribute {
    ($name:literal, $value:literal) => {
        $crate::element::Field {
            name: $name,
            accessor: $crate::element::Accessor::Attribute {
                read: |_, raw, ctx| {
                    if raw != $value {
                        ctx.error(format!("expected `{}`, found `{}`", $value, raw));
                    }
                },
                write: |_| $value.to_string(),
            },
        }
    };
}

/// Bind an embedded record's properties to the same element.
#[macro_export]
macro_rules! flatten {
    ($($field:ident).+) => {
        $crate::element::Field {
            name: "",
            accessor: $crate::element::Accessor::Flatten {
                read: |this, element, ctx| $crate::element::read_fields(&mut this.$($field).+, element, ctx),
                write: |this, element| $crate::element::write_fields(&this.$($field).+, element),
            },
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::property::{TextProperty, ValueProperty};

    #[derive(Debug, Default, PartialEq)]
    struct Inner {
        margin: f32,
    }

    impl Fields for Inner {
        const FIELDS: &'static [Field<Self>] = &[crate::child!("Margin", margin: ValueProperty<f32>)];
    }

    #[derive(Debug, PartialEq)]
    struct Outer {
        name: String,
        index: u32,
        inner: Inner,
    }

    impl Default for Outer {
        fn default() -> Self {
            Self {
                name: String::new(),
                index: 7,
                inner: Inner::default(),
            }
        }
    }

    impl Fields for Outer {
        const FIELDS: &'static [Field<Self>] = &[
            crate::attribute!("index", index),
            crate::child!("Name", name: TextProperty),
            crate::flatten!(inner),
        ];
    }

    impl ElementTree for Outer {
        const TAG: &'static str = "Outer";
    }

    fn parse(xml: &str) -> (Outer, Vec<ReadValueError>) {
        let root = Element::parse(xml).unwrap();
        let mut ctx = ReadContext::new(&root);
        let value = Outer::from_xml(&root, &mut ctx);
        (value, ctx.into_errors())
    }

    #[test]
    fn test_read_declared_fields() {
        let (value, errors) =
            parse(r#"<Outer index="3"><Name>crate</Name><Margin value="0.5"/></Outer>"#);
        assert!(errors.is_empty());
        assert_eq!(value.name, "crate");
        assert_eq!(value.index, 3);
        assert_eq!(value.inner.margin, 0.5);
    }

    #[test]
    fn test_missing_fields_keep_defaults() {
        let (value, errors) = parse("<Outer/>");
        assert!(errors.is_empty());
        assert_eq!(value, Outer::default());
    }

    #[test]
    fn test_bad_leaf_is_collected_and_siblings_survive() {
        let (value, errors) =
            parse(r#"<Outer index="x"><Name>kept</Name><Margin value="oops"/></Outer>"#);
        assert_eq!(value.name, "kept");
        assert_eq!(value.index, 7);
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].path, "Outer/@index");
        assert_eq!(errors[1].path, "Outer/Margin");
    }

    #[test]
    fn test_write_in_declaration_order() {
        let value = Outer {
            name: "a".into(),
            index: 1,
            inner: Inner { margin: 0.25 },
        };
        let element = value.to_xml();
        assert_eq!(element.attribute("index"), Some("1"));
        let tags: Vec<_> = element.children.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(tags, ["Name", "Margin"]);
        assert_eq!(child_tags::<Outer>().collect::<Vec<_>>(), ["Name"]);
    }
}
