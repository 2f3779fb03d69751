//! Drawables, kept as an opaque passthrough.
//!
//! Only the header values needed to place and cull a drawable are typed.
//! Shader groups, skeletons, models, embedded bounds and lights belong to a
//! separate schema and are carried verbatim so that fragments round-trip
//! without loss.

use nalgebra::{Matrix4, Vector3};

use crate::child;
use crate::element::{child_tags, read_fields, write_fields, ElementTree, Field, Fields, ReadContext};
use crate::property::{Codec, MatrixProperty, TextProperty, ValueProperty, VectorProperty};
use crate::xml::Element;

/// Model blocks below the highest detail level.
pub const LOWER_LOD_MODEL_TAGS: [&str; 3] =
    ["DrawableModelsMedium", "DrawableModelsLow", "DrawableModelsVeryLow"];

const MATRIX_TAG: &str = "Matrix";

/// A drawable referenced by a fragment or one of its physics children.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Drawable {
    /// Drawable name.
    pub name: String,
    /// Culling sphere centre.
    pub bounding_sphere_center: Vector3<f32>,
    /// Culling sphere radius.
    pub bounding_sphere_radius: f32,
    /// Axis-aligned bounds, minimum corner.
    pub bounding_box_min: Vector3<f32>,
    /// Axis-aligned bounds, maximum corner.
    pub bounding_box_max: Vector3<f32>,
    /// High detail switch distance.
    pub lod_dist_high: f32,
    /// Medium detail switch distance.
    pub lod_dist_med: f32,
    /// Low detail switch distance.
    pub lod_dist_low: f32,
    /// Very-low detail switch distance.
    pub lod_dist_vlow: f32,
    /// Placement within the fragment; only fragment drawables carry one.
    pub matrix: Option<Matrix4<f32>>,
    /// Every other child element, in source order.
    pub extra: Vec<Element>,
}

impl Fields for Drawable {
    const FIELDS: &'static [Field<Self>] = &[
        child!("Name", name: TextProperty),
        child!("BoundingSphereCenter", bounding_sphere_center: VectorProperty),
        child!("BoundingSphereRadius", bounding_sphere_radius: ValueProperty<f32>),
        child!("BoundingBoxMin", bounding_box_min: VectorProperty),
        child!("BoundingBoxMax", bounding_box_max: VectorProperty),
        child!("LodDistHigh", lod_dist_high: ValueProperty<f32>),
        child!("LodDistMed", lod_dist_med: ValueProperty<f32>),
        child!("LodDistLow", lod_dist_low: ValueProperty<f32>),
        child!("LodDistVlow", lod_dist_vlow: ValueProperty<f32>),
    ];
}

impl ElementTree for Drawable {
    const TAG: &'static str = "Drawable";

    fn from_xml(element: &Element, ctx: &mut ReadContext) -> Self {
        let mut drawable = Self::default();
        read_fields(&mut drawable, element, ctx);

        if let Some(matrix) = element.child(MATRIX_TAG) {
            drawable.matrix =
                ctx.scoped(MATRIX_TAG, matrix.line, |ctx| MatrixProperty::<4>::read(matrix, ctx));
        }

        drawable.extra = element
            .children
            .iter()
            .filter(|c| c.name != MATRIX_TAG && !child_tags::<Self>().any(|tag| tag == c.name))
            .cloned()
            .collect();
        drawable
    }

    fn to_xml_tagged(&self, tag: &str) -> Element {
        let mut element = Element::new(tag);
        write_fields(self, &mut element);
        for child in &self.extra {
            element.push(child.clone());
        }
        if let Some(matrix) = self.matrix.as_ref().and_then(|m| MatrixProperty::<4>::write(m, MATRIX_TAG)) {
            element.push(matrix);
        }
        element
    }
}

impl Drawable {
    /// Drop the medium, low and very-low model blocks. Returns how many
    /// elements were removed.
    pub fn strip_lower_lods(&mut self) -> usize {
        let before = self.extra.len();
        self.extra
            .retain(|c| !LOWER_LOD_MODEL_TAGS.contains(&c.name.as_str()));
        before - self.extra.len()
    }

    /// A passthrough child by tag.
    pub fn extra_child(&self, tag: &str) -> Option<&Element> {
        self.extra.iter().find(|c| c.name == tag)
    }
}
