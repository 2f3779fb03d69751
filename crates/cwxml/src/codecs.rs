//! Text-content encodings specific to bounds and fragments.

use nalgebra::Vector3;

use crate::element::ReadContext;
use crate::property::{Codec, Scalar};
use crate::xml::Element;

/// One `x, y, z` point per line.
pub struct VerticesProperty;

impl Codec for VerticesProperty {
    type Value = Vec<Vector3<f32>>;

    fn read(element: &Element, ctx: &mut ReadContext) -> Option<Vec<Vector3<f32>>> {
        let mut vertices = Vec::new();
        for line in non_empty_lines(element.text()) {
            let [x, y, z] = parse_row::<f32, 3>(line, ctx)?;
            vertices.push(Vector3::new(x, y, z));
        }
        Some(vertices)
    }

    fn write(value: &Vec<Vector3<f32>>, tag: &str) -> Option<Element> {
        let mut element = Element::new(tag);
        if !value.is_empty() {
            let mut text = String::from("\n");
            for v in value {
                text.push_str(&format!(
                    "{}, {}, {}\n",
                    v.x.format_scalar(),
                    v.y.format_scalar(),
                    v.z.format_scalar()
                ));
            }
            element.set_text(text);
        }
        Some(element)
    }
}

/// One `r, g, b, a` colour per line, stored as 0-255 integers and decoded to
/// normalised floats.
///
/// Encoding truncates `channel * 255`. A tolerance of 1/1000 of a step keeps
/// values that were decoded from integers stable across a round trip.
pub struct VertexColorsProperty;

impl Codec for VertexColorsProperty {
    type Value = Vec<[f32; 4]>;

    fn read(element: &Element, ctx: &mut ReadContext) -> Option<Vec<[f32; 4]>> {
        let mut colors = Vec::new();
        for line in non_empty_lines(element.text()) {
            let rgba = parse_row::<u8, 4>(line, ctx)?;
            colors.push(rgba.map(|c| f32::from(c) / 255.0));
        }
        Some(colors)
    }

    fn write(value: &Vec<[f32; 4]>, tag: &str) -> Option<Element> {
        if value.is_empty() {
            return None;
        }
        let mut text = String::from("\n");
        for color in value {
            let channels: Vec<String> = color
                .iter()
                .map(|c| quantize_channel(*c).to_string())
                .collect();
            text.push_str(&channels.join(", "));
            text.push('\n');
        }
        Some(Element::new(tag).with_text(text))
    }
}

/// Normalised channel to 0-255, truncating.
pub fn quantize_channel(value: f32) -> u8 {
    (value.clamp(0.0, 1.0) * 255.0 + 1.0e-3).floor() as u8
}

/// Integer triples packed into a flat stream separated by any mix of spaces,
/// commas and newlines.
///
/// Writing is not supported by the external tooling yet: the element is
/// emitted empty whatever the value.
pub struct OctantsProperty;

impl Codec for OctantsProperty {
    type Value = Vec<[u32; 3]>;

    fn read(element: &Element, ctx: &mut ReadContext) -> Option<Vec<[u32; 3]>> {
        let mut values = Vec::new();
        for token in element
            .text()
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|s| !s.is_empty())
        {
            match u32::parse_scalar(token) {
                Ok(v) => values.push(v),
                Err(message) => {
                    ctx.error(message);
                    return None;
                }
            }
        }

        let chunks = values.chunks_exact(3);
        if !chunks.remainder().is_empty() {
            ctx.error(format!(
                "{} trailing octant value(s) do not form a triple",
                chunks.remainder().len()
            ));
        }
        Some(chunks.map(|c| [c[0], c[1], c[2]]).collect())
    }

    fn write(value: &Vec<[u32; 3]>, tag: &str) -> Option<Element> {
        if !value.is_empty() {
            tracing::debug!(tag, count = value.len(), "octant data is not written");
        }
        Some(Element::new(tag))
    }
}

/// Damage-state grid for breakable glass: one text row per line, one cell per
/// character.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShatterMap {
    /// Rows, top to bottom.
    pub rows: Vec<String>,
}

impl ShatterMap {
    /// Cells per row (length of the first row).
    pub fn width(&self) -> usize {
        self.rows.first().map(|r| r.chars().count()).unwrap_or(0)
    }

    /// Number of rows.
    pub fn height(&self) -> usize {
        self.rows.len()
    }

    /// Build from a flat row-major buffer of ASCII cell codes.
    pub fn from_pixels(width: usize, height: usize, pixels: &[u8]) -> Result<Self, String> {
        if pixels.len() != width * height {
            return Err(format!(
                "expected {} cells for {width}x{height}, got {}",
                width * height,
                pixels.len()
            ));
        }
        if let Some(bad) = pixels.iter().find(|p| !p.is_ascii_graphic()) {
            return Err(format!("cell value {bad} is not a printable ASCII code"));
        }
        let rows = (0..height)
            .map(|r| pixels[r * width..(r + 1) * width].iter().map(|&p| p as char).collect())
            .collect();
        Ok(Self { rows })
    }

    /// Flatten into a row-major buffer of cell codes.
    pub fn to_pixels(&self) -> Vec<u8> {
        self.rows.iter().flat_map(|r| r.bytes()).collect()
    }
}

/// [`ShatterMap`] rows as element text.
pub struct ShatterMapProperty;

impl Codec for ShatterMapProperty {
    type Value = ShatterMap;

    fn read(element: &Element, _ctx: &mut ReadContext) -> Option<ShatterMap> {
        let rows = non_empty_lines(element.text()).map(str::to_string).collect();
        Some(ShatterMap { rows })
    }

    fn write(value: &ShatterMap, tag: &str) -> Option<Element> {
        let mut element = Element::new(tag);
        if !value.rows.is_empty() {
            element.set_text(format!("\n{}\n", value.rows.join("\n")));
        }
        Some(element)
    }
}

fn non_empty_lines(text: &str) -> impl Iterator<Item = &str> {
    text.lines().map(str::trim).filter(|l| !l.is_empty())
}

fn parse_row<T: Scalar + Copy + Default, const N: usize>(
    line: &str,
    ctx: &mut ReadContext,
) -> Option<[T; N]> {
    let fields: Vec<&str> = line.split(',').collect();
    if fields.len() != N {
        ctx.error(format!("line `{line}` has {} fields, expected {N}", fields.len()));
        return None;
    }
    let mut out = [T::default(); N];
    for (slot, raw) in out.iter_mut().zip(fields) {
        match T::parse_scalar(raw) {
            Ok(v) => *slot = v,
            Err(message) => {
                ctx.error(format!("line `{line}`: {message}"));
                return None;
            }
        }
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn read<C: Codec>(xml: &str) -> (Option<C::Value>, usize) {
        let element = Element::parse(xml).unwrap();
        let mut ctx = ReadContext::new(&element);
        let value = C::read(&element, &mut ctx);
        (value, ctx.errors().len())
    }

    #[test]
    fn test_vertices_parse() {
        let (value, errors) = read::<VerticesProperty>("<Vertices>1,2,3\n4,5,6\n</Vertices>");
        assert_eq!(errors, 0);
        assert_eq!(
            value.unwrap(),
            vec![Vector3::new(1.0, 2.0, 3.0), Vector3::new(4.0, 5.0, 6.0)]
        );
    }

    #[test]
    fn test_vertices_wrong_field_count() {
        let (value, errors) = read::<VerticesProperty>("<Vertices>1,2,3\n1,2\n</Vertices>");
        assert_eq!(value, None);
        assert_eq!(errors, 1);
    }

    #[test]
    fn test_vertices_non_numeric() {
        let (value, errors) = read::<VerticesProperty>("<Vertices>1, b, 3</Vertices>");
        assert_eq!(value, None);
        assert_eq!(errors, 1);
    }

    #[test]
    fn test_vertices_write_format() {
        let element =
            VerticesProperty::write(&vec![Vector3::new(1.5, -2.0, 0.0)], "Vertices").unwrap();
        assert_eq!(element.text(), "\n1.5, -2, 0\n");

        let empty = VerticesProperty::write(&Vec::new(), "Vertices2").unwrap();
        assert_eq!(empty.text, None);
    }

    #[test]
    fn test_vertex_colors_truncate() {
        let element =
            VertexColorsProperty::write(&vec![[1.0, 0.5, 0.0, 1.0]], "VertexColours").unwrap();
        assert_eq!(element.text(), "\n255, 127, 0, 255\n");
    }

    #[test]
    fn test_vertex_colors_empty_is_omitted() {
        assert!(VertexColorsProperty::write(&Vec::new(), "VertexColours").is_none());
    }

    #[test]
    fn test_vertex_colors_decode_and_requantize() {
        let (value, errors) =
            read::<VertexColorsProperty>("<VertexColours>255, 127, 0, 1\n10, 20, 30, 40</VertexColours>");
        assert_eq!(errors, 0);
        let colors = value.unwrap();
        assert_relative_eq!(colors[0][1], 127.0 / 255.0);

        let element = VertexColorsProperty::write(&colors, "VertexColours").unwrap();
        assert_eq!(element.text(), "\n255, 127, 0, 1\n10, 20, 30, 40\n");
    }

    #[test]
    fn test_vertex_colors_out_of_range() {
        let (value, errors) = read::<VertexColorsProperty>("<VertexColours>256, 0, 0, 0</VertexColours>");
        assert_eq!(value, None);
        assert_eq!(errors, 1);
    }

    #[test]
    fn test_quantize_every_step_is_stable() {
        for i in 0..=255u8 {
            assert_eq!(quantize_channel(f32::from(i) / 255.0), i);
        }
    }

    #[test]
    fn test_octants_regroup_mixed_separators() {
        let (value, errors) = read::<OctantsProperty>("<Octants>1, 2,3\n4 5\n6,7,8 9</Octants>");
        assert_eq!(errors, 0);
        assert_eq!(value.unwrap(), vec![[1, 2, 3], [4, 5, 6], [7, 8, 9]]);
    }

    #[test]
    fn test_octants_dangling_values() {
        let (value, errors) = read::<OctantsProperty>("<Octants>1 2 3 4</Octants>");
        assert_eq!(value.unwrap(), vec![[1, 2, 3]]);
        assert_eq!(errors, 1);
    }

    #[test]
    fn test_octants_write_is_empty() {
        let element = OctantsProperty::write(&vec![[1, 2, 3]], "Octants").unwrap();
        assert_eq!(element, Element::new("Octants"));
    }

    #[test]
    fn test_shattermap_rows() {
        let (value, _) = read::<ShatterMapProperty>("<ShatterMap>\n  0011\n  0110\n  1100\n</ShatterMap>");
        let map = value.unwrap();
        assert_eq!(map.width(), 4);
        assert_eq!(map.height(), 3);

        let element = ShatterMapProperty::write(&map, "ShatterMap").unwrap();
        assert_eq!(element.text(), "\n0011\n0110\n1100\n");
    }

    #[test]
    fn test_shattermap_pixels() {
        let map = ShatterMap::from_pixels(3, 2, b"abcdef").unwrap();
        assert_eq!(map.rows, vec!["abc".to_string(), "def".to_string()]);
        assert_eq!(map.to_pixels(), b"abcdef".to_vec());

        assert!(ShatterMap::from_pixels(3, 3, b"abcdef").is_err());
        assert!(ShatterMap::from_pixels(1, 1, b"\n").is_err());
    }

    #[test]
    fn test_shattermap_zero_width_keeps_height() {
        let map = ShatterMap::from_pixels(0, 5, &[]).unwrap();
        assert_eq!((map.width(), map.height()), (0, 5));

        let map = ShatterMap::from_pixels(4, 0, &[]).unwrap();
        assert_eq!(map.height(), 0);
    }
}
