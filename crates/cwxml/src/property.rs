//! Leaf property codecs.
//!
//! A [`Codec`] decodes one child element into a typed value and encodes it
//! back. Decoding failures are recorded on the [`ReadContext`] and reported as
//! `None`, which leaves the property at its default.

use std::marker::PhantomData;

use nalgebra::{Matrix4, Vector3, Vector4};

use crate::element::{ElementTree, ReadContext};
use crate::xml::Element;

/// Text form of a single value, used for `value="..."` and attribute bindings.
pub trait Scalar: Sized {
    /// Parse from attribute or text content.
    fn parse_scalar(raw: &str) -> Result<Self, String>;
    /// Locale-independent text form.
    fn format_scalar(&self) -> String;
}

macro_rules! impl_numeric_scalar {
    ($($t:ty => $what:literal),* $(,)?) => {
        $(
            impl Scalar for $t {
                fn parse_scalar(raw: &str) -> Result<Self, String> {
                    raw.trim()
                        .parse::<$t>()
                        .map_err(|_| format!("invalid {} `{}`", $what, raw))
                }

                // `Display` never uses exponent notation or grouping.
                fn format_scalar(&self) -> String {
                    self.to_string()
                }
            }
        )*
    };
}

impl_numeric_scalar! {
    f32 => "number",
    f64 => "number",
    u8 => "integer (0-255)",
    u16 => "integer (0-65535)",
    u32 => "unsigned integer",
    i32 => "integer",
}

impl Scalar for bool {
    fn parse_scalar(raw: &str) -> Result<Self, String> {
        match raw.trim() {
            "1" => Ok(true),
            "0" => Ok(false),
            s if s.eq_ignore_ascii_case("true") => Ok(true),
            s if s.eq_ignore_ascii_case("false") => Ok(false),
            _ => Err(format!("invalid boolean `{raw}`")),
        }
    }

    fn format_scalar(&self) -> String {
        if *self { "true" } else { "false" }.to_string()
    }
}

impl Scalar for String {
    fn parse_scalar(raw: &str) -> Result<Self, String> {
        Ok(raw.to_string())
    }

    fn format_scalar(&self) -> String {
        self.clone()
    }
}

/// Decoder/encoder for one child element.
pub trait Codec {
    /// Decoded value type.
    type Value;

    /// Tag used for this value when it appears as a list item.
    const ITEM_TAG: &'static str = "Item";

    /// Decode `element`. Errors are recorded on `ctx`.
    fn read(element: &Element, ctx: &mut ReadContext) -> Option<Self::Value>;

    /// Encode as an element named `tag`. `None` omits the element.
    fn write(value: &Self::Value, tag: &str) -> Option<Element>;
}

/// `<Tag value="..."/>`.
pub struct ValueProperty<T>(PhantomData<T>);

impl<T: Scalar> Codec for ValueProperty<T> {
    type Value = T;

    fn read(element: &Element, ctx: &mut ReadContext) -> Option<T> {
        let raw = element.attribute("value")?;
        T::parse_scalar(raw).map_err(|message| ctx.error(message)).ok()
    }

    fn write(value: &T, tag: &str) -> Option<Element> {
        Some(Element::new(tag).with_attribute("value", value.format_scalar()))
    }
}

/// `<Tag x="..." y="..." z="..."/>`.
pub struct VectorProperty;

impl Codec for VectorProperty {
    type Value = Vector3<f32>;

    fn read(element: &Element, ctx: &mut ReadContext) -> Option<Vector3<f32>> {
        let [x, y, z] = read_components(element, ["x", "y", "z"], ctx)?;
        Some(Vector3::new(x, y, z))
    }

    fn write(value: &Vector3<f32>, tag: &str) -> Option<Element> {
        Some(write_components(tag, &["x", "y", "z"], value.as_slice()))
    }
}

/// `<Tag x="..." y="..." z="..." w="..."/>`.
pub struct QuaternionProperty;

impl Codec for QuaternionProperty {
    type Value = Vector4<f32>;

    fn read(element: &Element, ctx: &mut ReadContext) -> Option<Vector4<f32>> {
        let [x, y, z, w] = read_components(element, ["x", "y", "z", "w"], ctx)?;
        Some(Vector4::new(x, y, z, w))
    }

    fn write(value: &Vector4<f32>, tag: &str) -> Option<Element> {
        Some(write_components(tag, &["x", "y", "z", "w"], value.as_slice()))
    }
}

fn read_components<const N: usize>(
    element: &Element,
    names: [&str; N],
    ctx: &mut ReadContext,
) -> Option<[f32; N]> {
    let mut out = [0.0; N];
    for (slot, name) in out.iter_mut().zip(names) {
        let Some(raw) = element.attribute(name) else {
            ctx.error(format!("missing attribute `{name}`"));
            return None;
        };
        match f32::parse_scalar(raw) {
            Ok(value) => *slot = value,
            Err(message) => {
                ctx.error(format!("attribute `{name}`: {message}"));
                return None;
            }
        }
    }
    Some(out)
}

fn write_components(tag: &str, names: &[&str], values: &[f32]) -> Element {
    let mut element = Element::new(tag);
    for (name, value) in names.iter().zip(values) {
        element.set_attribute(*name, value.format_scalar());
    }
    element
}

/// Row-major matrix with `ROWS` rows of four columns.
///
/// Written as element text, one whitespace-separated row per line. On read
/// `<Row x y z w/>` children are accepted as well.
/// Three-row matrices fill rows 0..3 and leave the last row as identity.
pub struct MatrixProperty<const ROWS: usize = 4>;

impl<const ROWS: usize> Codec for MatrixProperty<ROWS> {
    type Value = Matrix4<f32>;

    fn read(element: &Element, ctx: &mut ReadContext) -> Option<Matrix4<f32>> {
        let rows = if element.children.is_empty() {
            matrix_rows_from_text(element.text(), ctx)?
        } else {
            let mut rows = Vec::with_capacity(element.children.len());
            for (i, row) in element.children.iter().enumerate() {
                let segment = format!("{}[{i}]", row.name);
                let values =
                    ctx.scoped(segment, row.line, |ctx| read_components(row, ["x", "y", "z", "w"], ctx))?;
                rows.push(values);
            }
            rows
        };

        if rows.len() != ROWS {
            ctx.error(format!("expected {ROWS} matrix rows, found {}", rows.len()));
            return None;
        }

        let mut matrix = Matrix4::identity();
        for (r, row) in rows.iter().enumerate() {
            for (c, value) in row.iter().enumerate() {
                matrix[(r, c)] = *value;
            }
        }
        Some(matrix)
    }

    fn write(value: &Matrix4<f32>, tag: &str) -> Option<Element> {
        let mut text = String::from("\n");
        for r in 0..ROWS.min(4) {
            let row: Vec<String> = (0..4).map(|c| value[(r, c)].format_scalar()).collect();
            text.push_str(&row.join(" "));
            text.push('\n');
        }
        Some(Element::new(tag).with_text(text))
    }
}

fn matrix_rows_from_text(text: &str, ctx: &mut ReadContext) -> Option<Vec<[f32; 4]>> {
    let mut rows = Vec::new();
    for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let values: Vec<&str> = line
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|s| !s.is_empty())
            .collect();
        if values.len() != 4 {
            ctx.error(format!("matrix row `{line}` must have 4 values"));
            return None;
        }
        let mut row = [0.0; 4];
        for (slot, raw) in row.iter_mut().zip(values) {
            match f32::parse_scalar(raw) {
                Ok(value) => *slot = value,
                Err(message) => {
                    ctx.error(message);
                    return None;
                }
            }
        }
        rows.push(row);
    }
    Some(rows)
}

/// Symbolic bit set written as `NAME_A, NAME_B`.
///
/// Tokens may be names or integers in any order, separated by spaces or
/// commas. An unknown name is reported and the recognised bits are kept. Output is in ascending bit order; bits without a name are written
/// as their decimal value and the empty set as `NONE`.
pub struct FlagsProperty<F>(PhantomData<F>);

impl<F> Codec for FlagsProperty<F>
where
    F: bitflags::Flags<Bits = u32>,
{
    type Value = F;

    fn read(element: &Element, ctx: &mut ReadContext) -> Option<F> {
        let mut bits = 0u32;
        for token in element
            .text()
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|s| !s.is_empty())
        {
            if token == "NONE" {
                continue;
            }
            if let Ok(value) = token.parse::<u32>() {
                bits |= value;
            } else if let Some(flag) = F::from_name(token) {
                bits |= flag.bits();
            } else {
                ctx.error(format!("unknown flag `{token}`"));
            }
        }
        Some(F::from_bits_retain(bits))
    }

    fn write(value: &F, tag: &str) -> Option<Element> {
        let bits = value.bits();
        let tokens: Vec<String> = (0..u32::BITS)
            .map(|i| 1u32 << i)
            .filter(|bit| bits & bit != 0)
            .map(|bit| {
                F::FLAGS
                    .iter()
                    .find(|flag| flag.value().bits() == bit)
                    .map(|flag| flag.name().to_string())
                    .unwrap_or_else(|| bit.to_string())
            })
            .collect();

        let text = if tokens.is_empty() {
            "NONE".to_string()
        } else {
            tokens.join(", ")
        };
        Some(Element::new(tag).with_text(text))
    }
}

/// Raw text content.
pub struct TextProperty;

impl Codec for TextProperty {
    type Value = String;

    fn read(element: &Element, _ctx: &mut ReadContext) -> Option<String> {
        Some(element.text().to_string())
    }

    fn write(value: &String, tag: &str) -> Option<Element> {
        Some(Element::new(tag).with_text(value.as_str()))
    }
}

/// A nested record.
pub struct Nested<T>(PhantomData<T>);

impl<T: ElementTree> Codec for Nested<T> {
    type Value = T;
    const ITEM_TAG: &'static str = T::TAG;

    fn read(element: &Element, ctx: &mut ReadContext) -> Option<T> {
        Some(T::from_xml(element, ctx))
    }

    fn write(value: &T, tag: &str) -> Option<Element> {
        Some(value.to_xml_tagged(tag))
    }
}

/// A property that may be absent; `None` is not written.
pub struct Optional<C>(PhantomData<C>);

impl<C: Codec> Codec for Optional<C> {
    type Value = Option<C::Value>;
    const ITEM_TAG: &'static str = C::ITEM_TAG;

    fn read(element: &Element, ctx: &mut ReadContext) -> Option<Option<C::Value>> {
        C::read(element, ctx).map(Some)
    }

    fn write(value: &Option<C::Value>, tag: &str) -> Option<Element> {
        value.as_ref().and_then(|v| C::write(v, tag))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flags::MaterialFlags;
    use crate::ReadValueError;

    fn decode<C: Codec>(xml: &str) -> (Option<C::Value>, Vec<ReadValueError>) {
        let element = Element::parse(xml).unwrap();
        let mut ctx = ReadContext::new(&element);
        let value = C::read(&element, &mut ctx);
        (value, ctx.into_errors())
    }

    #[test]
    fn test_value_property() {
        let (value, errors) = decode::<ValueProperty<f32>>(r#"<Margin value="0.04"/>"#);
        assert_eq!(value, Some(0.04));
        assert!(errors.is_empty());

        let element = ValueProperty::<f32>::write(&0.04, "Margin").unwrap();
        assert_eq!(element.attribute("value"), Some("0.04"));
    }

    #[test]
    fn test_value_property_absent_attribute_is_default() {
        let (value, errors) = decode::<ValueProperty<u8>>("<RoomID/>");
        assert_eq!(value, None);
        assert!(errors.is_empty());
    }

    #[test]
    fn test_value_property_bad_number() {
        let (value, errors) = decode::<ValueProperty<u8>>(r#"<RoomID value="300"/>"#);
        assert_eq!(value, None);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].path, "RoomID");
    }

    #[test]
    fn test_float_formatting_has_no_exponent() {
        assert_eq!(1.0e-7f32.format_scalar(), "0.0000001");
        assert_eq!(1.0e10f32.format_scalar(), "10000000000");
        assert_eq!(0.5f32.format_scalar(), "0.5");
    }

    #[test]
    fn test_bool_scalar() {
        assert_eq!(bool::parse_scalar("True"), Ok(true));
        assert_eq!(bool::parse_scalar("0"), Ok(false));
        assert!(bool::parse_scalar("yes").is_err());
        assert_eq!(true.format_scalar(), "true");
    }

    #[test]
    fn test_vector_property() {
        let (value, _) = decode::<VectorProperty>(r#"<BoxMin x="-1" y="2.5" z="0"/>"#);
        assert_eq!(value, Some(Vector3::new(-1.0, 2.5, 0.0)));
    }

    #[test]
    fn test_vector_property_missing_component() {
        let (value, errors) = decode::<VectorProperty>(r#"<BoxMin x="1" y="2"/>"#);
        assert_eq!(value, None);
        assert!(errors[0].message.contains("`z`"));
    }

    #[test]
    fn test_quaternion_property() {
        let (value, _) = decode::<QuaternionProperty>(r#"<I x="1" y="2" z="3" w="4"/>"#);
        assert_eq!(value, Some(Vector4::new(1.0, 2.0, 3.0, 4.0)));
        let element = QuaternionProperty::write(&Vector4::new(1.0, 2.0, 3.0, 4.0), "I").unwrap();
        assert_eq!(element.attribute("w"), Some("4"));
    }

    #[test]
    fn test_matrix_from_text_rows() {
        let xml = "<M>\n 1 0 0 0\n 0 1 0 0\n 0 0 1 0\n 5 6 7 1\n</M>";
        let (value, errors) = decode::<MatrixProperty>(xml);
        assert!(errors.is_empty());
        let m = value.unwrap();
        assert_eq!(m[(3, 0)], 5.0);
        assert_eq!(m[(3, 2)], 7.0);
    }

    #[test]
    fn test_matrix_written_as_text_rows() {
        let mut m = Matrix4::identity();
        m[(0, 3)] = 2.5;
        m[(2, 1)] = -1.0;
        let element = MatrixProperty::<4>::write(&m, "Projection").unwrap();
        assert!(element.children.is_empty());
        assert_eq!(element.text().trim(), "1 0 0 2.5\n0 1 0 0\n0 -1 1 0\n0 0 0 1");

        let mut ctx = ReadContext::new(&element);
        assert_eq!(MatrixProperty::<4>::read(&element, &mut ctx), Some(m));
    }

    #[test]
    fn test_matrix_from_row_elements() {
        let xml = r#"<M><Row x="1" y="0" z="0" w="0"/><Row x="0" y="1" z="0" w="0"/><Row x="0" y="0" z="1" w="0"/><Row x="4" y="5" z="6" w="1"/></M>"#;
        let (value, errors) = decode::<MatrixProperty>(xml);
        assert!(errors.is_empty());
        assert_eq!(value.unwrap()[(3, 1)], 5.0);
    }

    #[test]
    fn test_three_row_matrix() {
        let xml = "<Item>\n 1 2 3 4\n 5 6 7 8\n 9 10 11 12\n</Item>";
        let (value, _) = decode::<MatrixProperty<3>>(xml);
        let m = value.unwrap();
        assert_eq!(m[(2, 3)], 12.0);
        assert_eq!(m[(3, 3)], 1.0);

        let element = MatrixProperty::<3>::write(&m, "Item").unwrap();
        assert_eq!(element.text().trim().lines().count(), 3);
    }

    #[test]
    fn test_matrix_wrong_row_count() {
        let (value, errors) = decode::<MatrixProperty>("<M>1 0 0 0\n0 1 0 0</M>");
        assert_eq!(value, None);
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn test_flags_parse_mixed_and_write_canonical() {
        let (value, errors) =
            decode::<FlagsProperty<MaterialFlags>>("<Flags>FLAG_SEE_THROUGH 1, FLAG_NO_DECAL</Flags>");
        assert!(errors.is_empty());
        let flags = value.unwrap();
        assert_eq!(
            flags,
            MaterialFlags::FLAG_STAIRS | MaterialFlags::FLAG_SEE_THROUGH | MaterialFlags::FLAG_NO_DECAL
        );

        let element = FlagsProperty::<MaterialFlags>::write(&flags, "Flags").unwrap();
        assert_eq!(element.text(), "FLAG_STAIRS, FLAG_SEE_THROUGH, FLAG_NO_DECAL");
    }

    #[test]
    fn test_flags_empty_and_unnamed_bits() {
        let element = FlagsProperty::<MaterialFlags>::write(&MaterialFlags::empty(), "Flags").unwrap();
        assert_eq!(element.text(), "NONE");

        let (value, _) = decode::<FlagsProperty<MaterialFlags>>("<Flags>NONE</Flags>");
        assert_eq!(value, Some(MaterialFlags::empty()));

        let odd = MaterialFlags::from_bits_retain(0x1_0001);
        let element = FlagsProperty::<MaterialFlags>::write(&odd, "Flags").unwrap();
        assert_eq!(element.text(), "FLAG_STAIRS, 65536");
    }

    #[test]
    fn test_flags_unknown_name_keeps_known_bits() {
        let (value, errors) = decode::<FlagsProperty<MaterialFlags>>(
            "<Flags>FLAG_STAIRS, FLAG_BOGUS, FLAG_NO_DECAL</Flags>",
        );
        assert_eq!(value, Some(MaterialFlags::FLAG_STAIRS | MaterialFlags::FLAG_NO_DECAL));
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("FLAG_BOGUS"));
    }

    #[test]
    fn test_optional_skips_none() {
        assert!(Optional::<VectorProperty>::write(&None, "V").is_none());
        assert!(Optional::<VectorProperty>::write(&Some(Vector3::zeros()), "V").is_some());
    }
}
