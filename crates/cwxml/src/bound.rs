//! Collision bounds (`.ybn.xml`).
//!
//! A [`BoundFile`] wraps one [`BoundComposite`], whose `Children` list holds
//! [`BoundItem`]s chosen by their `type` attribute. Geometry items carry a
//! material list, a vertex array and [`Polygon`]s chosen by tag name.
//!
//! Field names mirror the XML tags they bind to.

#![allow(missing_docs)]

use nalgebra::{Matrix4, Vector3};

use crate::codecs::{OctantsProperty, VertexColorsProperty, VerticesProperty};
use crate::element::{write_fields, ElementTree, Field, Fields, ReadContext};
use crate::flags::{CompositeFlags, MaterialFlags};
use crate::list::ListProperty;
use crate::property::{Codec, FlagsProperty, MatrixProperty, Nested, ValueProperty, VectorProperty};
use crate::xml::Element;
use crate::{attribute, child, fixed_attribute, flatten};

/// Properties shared by every bound, composite or not.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bound {
    pub box_min: Vector3<f32>,
    pub box_max: Vector3<f32>,
    pub box_center: Vector3<f32>,
    pub sphere_center: Vector3<f32>,
    pub sphere_radius: f32,
    pub margin: f32,
    pub volume: f32,
    pub inertia: Vector3<f32>,
    pub material_index: u8,
    pub material_color_index: u8,
    pub procedural_id: u8,
    pub room_id: u8,
    pub ped_density: u8,
    pub unk_flags: u8,
    pub poly_flags: u8,
    pub unk_type: u8,
}

impl Fields for Bound {
    const FIELDS: &'static [Field<Self>] = &[
        child!("BoxMin", box_min: VectorProperty),
        child!("BoxMax", box_max: VectorProperty),
        child!("BoxCenter", box_center: VectorProperty),
        child!("SphereCenter", sphere_center: VectorProperty),
        child!("SphereRadius", sphere_radius: ValueProperty<f32>),
        child!("Margin", margin: ValueProperty<f32>),
        child!("Volume", volume: ValueProperty<f32>),
        child!("Inertia", inertia: VectorProperty),
        child!("MaterialIndex", material_index: ValueProperty<u8>),
        child!("MaterialColourIndex", material_color_index: ValueProperty<u8>),
        child!("ProceduralID", procedural_id: ValueProperty<u8>),
        child!("RoomID", room_id: ValueProperty<u8>),
        child!("PedDensity", ped_density: ValueProperty<u8>),
        child!("UnkFlags", unk_flags: ValueProperty<u8>),
        child!("PolyFlags", poly_flags: ValueProperty<u8>),
        child!("UnkType", unk_type: ValueProperty<u8>),
    ];
}

/// Root bound of a file or archetype: `<Bounds type="Composite">`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoundComposite {
    pub bound: Bound,
    pub children: Vec<BoundItem>,
}

impl Fields for BoundComposite {
    const FIELDS: &'static [Field<Self>] = &[
        fixed_attribute!("type", "Composite"),
        flatten!(bound),
        child!("Children", children: BoundListProperty),
    ];
}

impl ElementTree for BoundComposite {
    const TAG: &'static str = "Bounds";
}

/// A primitive composite child: placement within the composite plus
/// collision flags.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundShape {
    pub bound: Bound,
    pub composite_transform: Matrix4<f32>,
    pub composite_flags1: CompositeFlags,
    pub composite_flags2: CompositeFlags,
}

impl Default for BoundShape {
    fn default() -> Self {
        Self {
            bound: Bound::default(),
            composite_transform: Matrix4::identity(),
            composite_flags1: CompositeFlags::empty(),
            composite_flags2: CompositeFlags::empty(),
        }
    }
}

impl Fields for BoundShape {
    const FIELDS: &'static [Field<Self>] = &[
        flatten!(bound),
        child!("CompositeTransform", composite_transform: MatrixProperty),
        child!("CompositeFlags1", composite_flags1: FlagsProperty<CompositeFlags>),
        child!("CompositeFlags2", composite_flags2: FlagsProperty<CompositeFlags>),
    ];
}

impl ElementTree for BoundShape {
    const TAG: &'static str = "Item";
}

/// Triangle-soup bound with a BVH built by the engine on load.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoundGeometryBvh {
    pub shape: BoundShape,
    pub geometry_center: Vector3<f32>,
    pub materials: Vec<MaterialItem>,
    pub vertices: Vec<Vector3<f32>>,
    /// Normalised RGBA per vertex; may be empty.
    pub vertex_colors: Vec<[f32; 4]>,
    pub polygons: Vec<Polygon>,
}

impl Fields for BoundGeometryBvh {
    const FIELDS: &'static [Field<Self>] = &[
        flatten!(shape),
        child!("GeometryCenter", geometry_center: VectorProperty),
        child!("Materials", materials: ListProperty<Nested<MaterialItem>>),
        child!("Vertices", vertices: VerticesProperty),
        child!("VertexColours", vertex_colors: VertexColorsProperty),
        child!("Polygons", polygons: PolygonsProperty),
    ];
}

impl ElementTree for BoundGeometryBvh {
    const TAG: &'static str = "Item";
}

/// Non-BVH geometry. `Vertices2` and `Octants` are read but not produced by
/// current tooling.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoundGeometry {
    pub bvh: BoundGeometryBvh,
    pub unk_float1: f32,
    pub unk_float2: f32,
    pub vertices2: Vec<Vector3<f32>>,
    pub octants: Vec<[u32; 3]>,
}

impl Fields for BoundGeometry {
    const FIELDS: &'static [Field<Self>] = &[
        flatten!(bvh),
        child!("UnkFloat1", unk_float1: ValueProperty<f32>),
        child!("UnkFloat2", unk_float2: ValueProperty<f32>),
        child!("Vertices2", vertices2: VerticesProperty),
        child!("Octants", octants: OctantsProperty),
    ];
}

impl ElementTree for BoundGeometry {
    const TAG: &'static str = "Item";
}

/// One child of a composite, tagged by its `type` attribute.
#[derive(Debug, Clone, PartialEq)]
pub enum BoundItem {
    Box(BoundShape),
    Sphere(BoundShape),
    Capsule(BoundShape),
    Cylinder(BoundShape),
    Disc(BoundShape),
    Cloth(BoundShape),
    Geometry(BoundGeometry),
    GeometryBvh(BoundGeometryBvh),
    Composite(Box<BoundComposite>),
}

type ReadBoundFn = fn(&Element, &mut ReadContext) -> BoundItem;

/// `type` attribute value to decoder.
pub const BOUND_ITEM_TYPES: &[(&str, ReadBoundFn)] = &[
    ("Box", |e, ctx| BoundItem::Box(BoundShape::from_xml(e, ctx))),
    ("Sphere", |e, ctx| BoundItem::Sphere(BoundShape::from_xml(e, ctx))),
    ("Capsule", |e, ctx| BoundItem::Capsule(BoundShape::from_xml(e, ctx))),
    ("Cylinder", |e, ctx| BoundItem::Cylinder(BoundShape::from_xml(e, ctx))),
    ("Disc", |e, ctx| BoundItem::Disc(BoundShape::from_xml(e, ctx))),
    ("Cloth", |e, ctx| BoundItem::Cloth(BoundShape::from_xml(e, ctx))),
    ("Geometry", |e, ctx| BoundItem::Geometry(BoundGeometry::from_xml(e, ctx))),
    ("GeometryBVH", |e, ctx| BoundItem::GeometryBvh(BoundGeometryBvh::from_xml(e, ctx))),
    ("Composite", |e, ctx| BoundItem::Composite(Box::new(BoundComposite::from_xml(e, ctx)))),
];

impl BoundItem {
    /// Discriminator written to the `type` attribute.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Box(_) => "Box",
            Self::Sphere(_) => "Sphere",
            Self::Capsule(_) => "Capsule",
            Self::Cylinder(_) => "Cylinder",
            Self::Disc(_) => "Disc",
            Self::Cloth(_) => "Cloth",
            Self::Geometry(_) => "Geometry",
            Self::GeometryBvh(_) => "GeometryBVH",
            Self::Composite(_) => "Composite",
        }
    }

    /// Properties common to all bounds.
    pub fn bound(&self) -> &Bound {
        match self {
            Self::Box(s)
            | Self::Sphere(s)
            | Self::Capsule(s)
            | Self::Cylinder(s)
            | Self::Disc(s)
            | Self::Cloth(s) => &s.bound,
            Self::Geometry(g) => &g.bvh.shape.bound,
            Self::GeometryBvh(g) => &g.shape.bound,
            Self::Composite(c) => &c.bound,
        }
    }

    /// The triangle-soup payload of geometry items.
    pub fn geometry(&self) -> Option<&BoundGeometryBvh> {
        match self {
            Self::Geometry(g) => Some(&g.bvh),
            Self::GeometryBvh(g) => Some(g),
            _ => None,
        }
    }

    /// Decode by `type` attribute. `None` if the attribute is missing or not
    /// in [`BOUND_ITEM_TYPES`].
    pub fn from_xml(element: &Element, ctx: &mut ReadContext) -> Option<Self> {
        let Some(kind) = element.attribute("type") else {
            tracing::info!(path = %ctx.path(), "skipping bound without a type attribute");
            return None;
        };
        match BOUND_ITEM_TYPES.iter().find(|(name, _)| *name == kind) {
            Some((_, read)) => Some(read(element, ctx)),
            None => {
                tracing::info!(path = %ctx.path(), kind, "skipping unrecognised bound type");
                None
            }
        }
    }

    /// Serialise under `tag` with the `type` attribute first.
    pub fn to_xml_tagged(&self, tag: &str) -> Element {
        let mut element = Element::new(tag).with_attribute("type", self.type_name());
        match self {
            Self::Box(s)
            | Self::Sphere(s)
            | Self::Capsule(s)
            | Self::Cylinder(s)
            | Self::Disc(s)
            | Self::Cloth(s) => write_fields(s, &mut element),
            Self::Geometry(g) => write_fields(g, &mut element),
            Self::GeometryBvh(g) => write_fields(g, &mut element),
            Self::Composite(c) => write_fields(c.as_ref(), &mut element),
        }
        element
    }
}

/// The polymorphic `Children` list of a composite.
pub struct BoundListProperty;

impl Codec for BoundListProperty {
    type Value = Vec<BoundItem>;

    fn read(element: &Element, ctx: &mut ReadContext) -> Option<Vec<BoundItem>> {
        let mut items = Vec::with_capacity(element.children.len());
        for (i, child) in element.children.iter().enumerate() {
            let segment = format!("{}[{i}]", child.name);
            if let Some(item) = ctx.scoped(segment, child.line, |ctx| BoundItem::from_xml(child, ctx)) {
                items.push(item);
            }
        }
        Some(items)
    }

    fn write(value: &Vec<BoundItem>, tag: &str) -> Option<Element> {
        let mut element = Element::new(tag);
        for item in value {
            element.push(item.to_xml_tagged("Item"));
        }
        Some(element)
    }
}

/// Surface material referenced by polygon `m` indices.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MaterialItem {
    pub material_type: u8,
    pub procedural_id: u8,
    pub room_id: u8,
    pub ped_density: u8,
    pub flags: MaterialFlags,
    pub material_color_index: u8,
    pub unk: u16,
}

impl Fields for MaterialItem {
    const FIELDS: &'static [Field<Self>] = &[
        child!("Type", material_type: ValueProperty<u8>),
        child!("ProceduralID", procedural_id: ValueProperty<u8>),
        child!("RoomID", room_id: ValueProperty<u8>),
        child!("PedDensity", ped_density: ValueProperty<u8>),
        child!("Flags", flags: FlagsProperty<MaterialFlags>),
        child!("MaterialColourIndex", material_color_index: ValueProperty<u8>),
        child!("Unk", unk: ValueProperty<u16>),
    ];
}

impl ElementTree for MaterialItem {
    const TAG: &'static str = "Item";
}

/// `<Triangle m v1 v2 v3 f1 f2 f3/>`; `f*` are neighbouring triangle indices.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PolygonTriangle {
    pub material_index: u8,
    pub v1: u32,
    pub v2: u32,
    pub v3: u32,
    pub f1: i32,
    pub f2: i32,
    pub f3: i32,
}

impl Fields for PolygonTriangle {
    const FIELDS: &'static [Field<Self>] = &[
        attribute!("m", material_index),
        attribute!("v1", v1),
        attribute!("v2", v2),
        attribute!("v3", v3),
        attribute!("f1", f1),
        attribute!("f2", f2),
        attribute!("f3", f3),
    ];
}

impl ElementTree for PolygonTriangle {
    const TAG: &'static str = "Triangle";
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PolygonSphere {
    pub material_index: u8,
    pub v: u32,
    pub radius: f32,
}

impl Fields for PolygonSphere {
    const FIELDS: &'static [Field<Self>] = &[
        attribute!("m", material_index),
        attribute!("v", v),
        attribute!("radius", radius),
    ];
}

impl ElementTree for PolygonSphere {
    const TAG: &'static str = "Sphere";
}

#[derive(Debug, Clone, PartialEq)]
pub struct PolygonCapsule {
    pub material_index: u8,
    pub v1: u32,
    pub v2: u32,
    pub radius: f32,
}

impl Default for PolygonCapsule {
    fn default() -> Self {
        Self {
            material_index: 0,
            v1: 0,
            v2: 1,
            radius: 0.0,
        }
    }
}

impl Fields for PolygonCapsule {
    const FIELDS: &'static [Field<Self>] = &[
        attribute!("m", material_index),
        attribute!("v1", v1),
        attribute!("v2", v2),
        attribute!("radius", radius),
    ];
}

impl ElementTree for PolygonCapsule {
    const TAG: &'static str = "Capsule";
}

/// Oriented box given by four corner vertices.
#[derive(Debug, Clone, PartialEq)]
pub struct PolygonBox {
    pub material_index: u8,
    pub v1: u32,
    pub v2: u32,
    pub v3: u32,
    pub v4: u32,
}

impl Default for PolygonBox {
    fn default() -> Self {
        Self {
            material_index: 0,
            v1: 0,
            v2: 1,
            v3: 2,
            v4: 3,
        }
    }
}

impl Fields for PolygonBox {
    const FIELDS: &'static [Field<Self>] = &[
        attribute!("m", material_index),
        attribute!("v1", v1),
        attribute!("v2", v2),
        attribute!("v3", v3),
        attribute!("v4", v4),
    ];
}

impl ElementTree for PolygonBox {
    const TAG: &'static str = "Box";
}

#[derive(Debug, Clone, PartialEq)]
pub struct PolygonCylinder {
    pub material_index: u8,
    pub v1: u32,
    pub v2: u32,
    pub radius: f32,
}

impl Default for PolygonCylinder {
    fn default() -> Self {
        Self {
            material_index: 0,
            v1: 0,
            v2: 1,
            radius: 0.0,
        }
    }
}

impl Fields for PolygonCylinder {
    const FIELDS: &'static [Field<Self>] = &[
        attribute!("m", material_index),
        attribute!("v1", v1),
        attribute!("v2", v2),
        attribute!("radius", radius),
    ];
}

impl ElementTree for PolygonCylinder {
    const TAG: &'static str = "Cylinder";
}

/// A geometry primitive, tagged by element name.
#[derive(Debug, Clone, PartialEq)]
pub enum Polygon {
    Triangle(PolygonTriangle),
    Sphere(PolygonSphere),
    Capsule(PolygonCapsule),
    Box(PolygonBox),
    Cylinder(PolygonCylinder),
}

type ReadPolygonFn = fn(&Element, &mut ReadContext) -> Polygon;

/// Element name to decoder.
pub const POLYGON_KINDS: &[(&str, ReadPolygonFn)] = &[
    ("Triangle", |e, ctx| Polygon::Triangle(PolygonTriangle::from_xml(e, ctx))),
    ("Sphere", |e, ctx| Polygon::Sphere(PolygonSphere::from_xml(e, ctx))),
    ("Capsule", |e, ctx| Polygon::Capsule(PolygonCapsule::from_xml(e, ctx))),
    ("Box", |e, ctx| Polygon::Box(PolygonBox::from_xml(e, ctx))),
    ("Cylinder", |e, ctx| Polygon::Cylinder(PolygonCylinder::from_xml(e, ctx))),
];

impl Polygon {
    /// Element name of this kind.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Triangle(_) => PolygonTriangle::TAG,
            Self::Sphere(_) => PolygonSphere::TAG,
            Self::Capsule(_) => PolygonCapsule::TAG,
            Self::Box(_) => PolygonBox::TAG,
            Self::Cylinder(_) => PolygonCylinder::TAG,
        }
    }

    /// Index into the owning geometry's material list.
    pub fn material_index(&self) -> u8 {
        match self {
            Self::Triangle(p) => p.material_index,
            Self::Sphere(p) => p.material_index,
            Self::Capsule(p) => p.material_index,
            Self::Box(p) => p.material_index,
            Self::Cylinder(p) => p.material_index,
        }
    }

    /// Indices into the owning geometry's vertex array.
    pub fn vertex_indices(&self) -> Vec<u32> {
        match self {
            Self::Triangle(p) => vec![p.v1, p.v2, p.v3],
            Self::Sphere(p) => vec![p.v],
            Self::Capsule(p) => vec![p.v1, p.v2],
            Self::Box(p) => vec![p.v1, p.v2, p.v3, p.v4],
            Self::Cylinder(p) => vec![p.v1, p.v2],
        }
    }

    /// Decode by element name. `None` for unknown kinds.
    pub fn from_xml(element: &Element, ctx: &mut ReadContext) -> Option<Self> {
        match POLYGON_KINDS.iter().find(|(tag, _)| *tag == element.name) {
            Some((_, read)) => Some(read(element, ctx)),
            None => {
                tracing::info!(path = %ctx.path(), kind = %element.name, "skipping unrecognised polygon");
                None
            }
        }
    }

    /// Serialise under the kind's own tag.
    pub fn to_xml(&self) -> Element {
        match self {
            Self::Triangle(p) => p.to_xml(),
            Self::Sphere(p) => p.to_xml(),
            Self::Capsule(p) => p.to_xml(),
            Self::Box(p) => p.to_xml(),
            Self::Cylinder(p) => p.to_xml(),
        }
    }
}

/// The polymorphic `Polygons` list of a geometry bound.
pub struct PolygonsProperty;

impl Codec for PolygonsProperty {
    type Value = Vec<Polygon>;

    fn read(element: &Element, ctx: &mut ReadContext) -> Option<Vec<Polygon>> {
        let mut polygons = Vec::with_capacity(element.children.len());
        for (i, child) in element.children.iter().enumerate() {
            let segment = format!("{}[{i}]", child.name);
            if let Some(polygon) = ctx.scoped(segment, child.line, |ctx| Polygon::from_xml(child, ctx)) {
                polygons.push(polygon);
            }
        }
        Some(polygons)
    }

    fn write(value: &Vec<Polygon>, tag: &str) -> Option<Element> {
        let mut element = Element::new(tag);
        for polygon in value {
            element.push(polygon.to_xml());
        }
        Some(element)
    }
}

/// Document root of a `.ybn.xml` file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoundFile {
    pub composite: BoundComposite,
}

impl Fields for BoundFile {
    const FIELDS: &'static [Field<Self>] = &[child!("Bounds", composite: Nested<BoundComposite>)];
}

impl ElementTree for BoundFile {
    const TAG: &'static str = "BoundsFile";
}

impl BoundFile {
    /// Wrap a composite as a file root.
    pub fn new(composite: BoundComposite) -> Self {
        Self { composite }
    }
}
