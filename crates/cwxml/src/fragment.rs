//! Fragments (`.yft.xml`): a drawable plus up to three physics LODs.
//!
//! Each [`Lod`] owns an [`Archetype`] with the collision composite, a list of
//! rigid-body [`GroupItem`]s linked by `ParentIndex`, and the [`ChildItem`]s
//! that attach sub-drawables to those groups. Links are plain indices into
//! sibling lists; see `validate.rs` for resolving them.

use nalgebra::{Matrix4, Vector3, Vector4};

use crate::bound::BoundComposite;
use crate::child;
use crate::codecs::{ShatterMap, ShatterMapProperty};
use crate::drawable::Drawable;
use crate::element::{ElementTree, Field, Fields, ReadContext};
use crate::list::{ListProperty, RawListProperty};
use crate::property::{
    Codec, MatrixProperty, Nested, Optional, QuaternionProperty, Scalar, TextProperty,
    ValueProperty, VectorProperty,
};
use crate::xml::Element;

/// `ParentIndex` of a root group.
pub const NO_PARENT: u8 = 255;

/// Document root of a `.yft.xml` file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Fragment {
    /// Fragment name.
    pub name: String,
    /// Culling sphere centre.
    pub bounding_sphere_center: Vector3<f32>,
    /// Culling sphere radius.
    pub bounding_sphere_radius: f32,
    #[allow(missing_docs)]
    pub unknown_b0: u32,
    #[allow(missing_docs)]
    pub unknown_b8: u32,
    #[allow(missing_docs)]
    pub unknown_bc: u32,
    #[allow(missing_docs)]
    pub unknown_c0: u32,
    #[allow(missing_docs)]
    pub unknown_c4: u32,
    #[allow(missing_docs)]
    pub unknown_cc: u32,
    /// Scale applied to world gravity.
    pub gravity_factor: f32,
    /// Scale applied to water buoyancy.
    pub buoyancy_factor: f32,
    /// The visual mesh.
    pub drawable: Drawable,
    /// Per-bone transforms.
    pub bone_transforms: BoneTransforms,
    /// Physics LODs.
    pub physics: Physics,
    /// Light attributes, kept verbatim.
    pub lights: Vec<Element>,
    /// Breakable glass panes.
    pub vehicle_glass_windows: Vec<WindowItem>,
}

impl Fields for Fragment {
    const FIELDS: &'static [Field<Self>] = &[
        child!("Name", name: TextProperty),
        child!("BoundingSphereCenter", bounding_sphere_center: VectorProperty),
        child!("BoundingSphereRadius", bounding_sphere_radius: ValueProperty<f32>),
        child!("UnknownB0", unknown_b0: ValueProperty<u32>),
        child!("UnknownB8", unknown_b8: ValueProperty<u32>),
        child!("UnknownBC", unknown_bc: ValueProperty<u32>),
        child!("UnknownC0", unknown_c0: ValueProperty<u32>),
        child!("UnknownC4", unknown_c4: ValueProperty<u32>),
        child!("UnknownCC", unknown_cc: ValueProperty<u32>),
        child!("GravityFactor", gravity_factor: ValueProperty<f32>),
        child!("BuoyancyFactor", buoyancy_factor: ValueProperty<f32>),
        child!("Drawable", drawable: Nested<Drawable>),
        child!("BoneTransforms", bone_transforms: BoneTransformsProperty),
        child!("Physics", physics: Nested<Physics>),
        child!("Lights", lights: RawListProperty),
        child!("VehicleGlassWindows", vehicle_glass_windows: ListProperty<Nested<WindowItem>>),
    ];
}

impl ElementTree for Fragment {
    const TAG: &'static str = "Fragment";
}

impl Fragment {
    /// Physics LODs that are present, with their tags.
    pub fn lods(&self) -> impl Iterator<Item = (&'static str, &Lod)> {
        [
            ("LOD1", self.physics.lod1.as_ref()),
            ("LOD2", self.physics.lod2.as_ref()),
            ("LOD3", self.physics.lod3.as_ref()),
        ]
        .into_iter()
        .filter_map(|(tag, lod)| lod.map(|lod| (tag, lod)))
    }

    /// Copy with the medium, low and very-low drawable models removed from the
    /// fragment drawable and from every LOD1 child drawable.
    pub fn to_hi_detail(&self) -> Self {
        let mut hi = self.clone();
        let mut removed = hi.drawable.strip_lower_lods();
        if let Some(lod) = hi.physics.lod1.as_mut() {
            for child in &mut lod.children {
                removed += child.drawable.strip_lower_lods();
            }
        }
        tracing::debug!(fragment = %self.name, removed, "built hi-detail fragment");
        hi
    }
}

/// `<BoneTransforms unk="1">` followed by one three-row matrix per bone.
#[derive(Debug, Clone, PartialEq)]
pub struct BoneTransforms {
    #[allow(missing_docs)]
    pub unk: u32,
    /// One per bone, rows 0..3 significant.
    pub transforms: Vec<Matrix4<f32>>,
}

impl Default for BoneTransforms {
    fn default() -> Self {
        Self {
            unk: 1,
            transforms: Vec::new(),
        }
    }
}

/// Codec for [`BoneTransforms`].
pub struct BoneTransformsProperty;

impl Codec for BoneTransformsProperty {
    type Value = BoneTransforms;

    fn read(element: &Element, ctx: &mut ReadContext) -> Option<BoneTransforms> {
        let mut value = BoneTransforms::default();
        if let Some(raw) = element.attribute("unk") {
            match u32::parse_scalar(raw) {
                Ok(unk) => value.unk = unk,
                Err(message) => ctx.scoped("@unk", element.line, |ctx| ctx.error(message)),
            }
        }
        value.transforms = ListProperty::<MatrixProperty<3>>::read(element, ctx)?;
        Some(value)
    }

    fn write(value: &BoneTransforms, tag: &str) -> Option<Element> {
        let mut element = ListProperty::<MatrixProperty<3>>::write(&value.transforms, tag)?;
        element.set_attribute("unk", value.unk.format_scalar());
        Some(element)
    }
}

/// Up to three physics LODs; absent levels are not written.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Physics {
    /// Undamaged.
    pub lod1: Option<Lod>,
    #[allow(missing_docs)]
    pub lod2: Option<Lod>,
    #[allow(missing_docs)]
    pub lod3: Option<Lod>,
}

impl Fields for Physics {
    const FIELDS: &'static [Field<Self>] = &[
        child!("LOD1", lod1: Optional<Nested<Lod>>),
        child!("LOD2", lod2: Optional<Nested<Lod>>),
        child!("LOD3", lod3: Optional<Nested<Lod>>),
    ];
}

impl ElementTree for Physics {
    const TAG: &'static str = "Physics";
}

/// One physics detail level.
#[allow(missing_docs)]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Lod {
    pub unknown_14: f32,
    pub unknown_18: f32,
    pub unknown_1c: f32,
    pub position_offset: Vector3<f32>,
    pub unknown_40: Vector3<f32>,
    pub unknown_50: Vector3<f32>,
    pub damping_linear_c: Vector3<f32>,
    pub damping_linear_v: Vector3<f32>,
    pub damping_linear_v2: Vector3<f32>,
    pub damping_angular_c: Vector3<f32>,
    pub damping_angular_v: Vector3<f32>,
    pub damping_angular_v2: Vector3<f32>,
    pub archetype: Archetype,
    /// Rigid-body bone transforms.
    pub transforms: Vec<Matrix4<f32>>,
    pub groups: Vec<GroupItem>,
    pub children: Vec<ChildItem>,
}

impl Fields for Lod {
    const FIELDS: &'static [Field<Self>] = &[
        child!("Unknown14", unknown_14: ValueProperty<f32>),
        child!("Unknown18", unknown_18: ValueProperty<f32>),
        child!("Unknown1C", unknown_1c: ValueProperty<f32>),
        child!("PositionOffset", position_offset: VectorProperty),
        child!("Unknown40", unknown_40: VectorProperty),
        child!("Unknown50", unknown_50: VectorProperty),
        child!("DampingLinearC", damping_linear_c: VectorProperty),
        child!("DampingLinearV", damping_linear_v: VectorProperty),
        child!("DampingLinearV2", damping_linear_v2: VectorProperty),
        child!("DampingAngularC", damping_angular_c: VectorProperty),
        child!("DampingAngularV", damping_angular_v: VectorProperty),
        child!("DampingAngularV2", damping_angular_v2: VectorProperty),
        child!("Archetype", archetype: Nested<Archetype>),
        child!("Transforms", transforms: ListProperty<MatrixProperty>),
        child!("Groups", groups: ListProperty<Nested<GroupItem>>),
        child!("Children", children: ListProperty<Nested<ChildItem>>),
    ];
}

impl ElementTree for Lod {
    const TAG: &'static str = "LOD";
}

/// Mass, inertia and collision shape of a LOD.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Archetype {
    /// Archetype name, usually the fragment name.
    pub name: String,
    /// Total mass.
    pub mass: f32,
    /// `1 / mass`.
    pub mass_inv: f32,
    #[allow(missing_docs)]
    pub unknown_48: f32,
    #[allow(missing_docs)]
    pub unknown_4c: f32,
    #[allow(missing_docs)]
    pub unknown_50: f32,
    #[allow(missing_docs)]
    pub unknown_54: f32,
    /// Diagonal inertia tensor.
    pub inertia_tensor: Vector3<f32>,
    /// Element-wise inverse of [`Archetype::inertia_tensor`]. Stored, never
    /// recomputed on read.
    pub inertia_tensor_inv: Vector3<f32>,
    /// Collision shape.
    pub bounds: BoundComposite,
}

impl Fields for Archetype {
    const FIELDS: &'static [Field<Self>] = &[
        child!("Name", name: TextProperty),
        child!("Mass", mass: ValueProperty<f32>),
        child!("MassInv", mass_inv: ValueProperty<f32>),
        child!("Unknown48", unknown_48: ValueProperty<f32>),
        child!("Unknown4C", unknown_4c: ValueProperty<f32>),
        child!("Unknown50", unknown_50: ValueProperty<f32>),
        child!("Unknown54", unknown_54: ValueProperty<f32>),
        child!("InertiaTensor", inertia_tensor: VectorProperty),
        child!("InertiaTensorInv", inertia_tensor_inv: VectorProperty),
        child!("Bounds", bounds: Nested<BoundComposite>),
    ];
}

impl ElementTree for Archetype {
    const TAG: &'static str = "Archetype";
}

impl Archetype {
    /// Set the mass and its inverse. A zero mass inverts to zero.
    pub fn set_mass(&mut self, mass: f32) {
        self.mass = mass;
        self.mass_inv = inverse_or_zero(mass);
    }

    /// Set the inertia tensor and its element-wise inverse. Zero components
    /// invert to zero.
    pub fn set_inertia_tensor(&mut self, tensor: Vector3<f32>) {
        self.inertia_tensor = tensor;
        self.inertia_tensor_inv = tensor.map(inverse_or_zero);
    }
}

fn inverse_or_zero(value: f32) -> f32 {
    if value == 0.0 {
        0.0
    } else {
        1.0 / value
    }
}

/// A rigid-body part. `parent_index` refers to another group in the same LOD,
/// or is [`NO_PARENT`].
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq)]
pub struct GroupItem {
    pub name: String,
    pub parent_index: u8,
    pub glass_window_index: u8,
    pub glass_flags: u8,
    pub strength: f32,
    pub force_transmission_scale_up: f32,
    pub force_transmission_scale_down: f32,
    pub joint_stiffness: f32,
    pub min_soft_angle_1: f32,
    pub max_soft_angle_1: f32,
    pub max_soft_angle_2: f32,
    pub max_soft_angle_3: f32,
    pub rotation_speed: f32,
    pub rotation_strength: f32,
    pub restoring_strength: f32,
    pub restoring_max_torque: f32,
    pub latch_strength: f32,
    pub mass: f32,
    pub min_damage_force: f32,
    pub damage_health: f32,
    pub unk_float_5c: f32,
    pub unk_float_60: f32,
    pub unk_float_64: f32,
    pub unk_float_68: f32,
    pub unk_float_6c: f32,
    pub unk_float_70: f32,
    pub unk_float_74: f32,
    pub unk_float_78: f32,
    pub unk_float_a8: f32,
}

impl Default for GroupItem {
    fn default() -> Self {
        Self {
            name: String::new(),
            parent_index: NO_PARENT,
            glass_window_index: 0,
            glass_flags: 0,
            strength: 0.0,
            force_transmission_scale_up: 0.0,
            force_transmission_scale_down: 0.0,
            joint_stiffness: 0.0,
            min_soft_angle_1: 0.0,
            max_soft_angle_1: 0.0,
            max_soft_angle_2: 0.0,
            max_soft_angle_3: 0.0,
            rotation_speed: 0.0,
            rotation_strength: 0.0,
            restoring_strength: 0.0,
            restoring_max_torque: 0.0,
            latch_strength: 0.0,
            mass: 0.0,
            min_damage_force: 0.0,
            damage_health: 0.0,
            unk_float_5c: 0.0,
            unk_float_60: 0.0,
            unk_float_64: 0.0,
            unk_float_68: 0.0,
            unk_float_6c: 0.0,
            unk_float_70: 0.0,
            unk_float_74: 0.0,
            unk_float_78: 0.0,
            unk_float_a8: 0.0,
        }
    }
}

impl Fields for GroupItem {
    const FIELDS: &'static [Field<Self>] = &[
        child!("Name", name: TextProperty),
        child!("ParentIndex", parent_index: ValueProperty<u8>),
        child!("GlassWindowIndex", glass_window_index: ValueProperty<u8>),
        child!("GlassFlags", glass_flags: ValueProperty<u8>),
        child!("Strength", strength: ValueProperty<f32>),
        child!("ForceTransmissionScaleUp", force_transmission_scale_up: ValueProperty<f32>),
        child!("ForceTransmissionScaleDown", force_transmission_scale_down: ValueProperty<f32>),
        child!("JointStiffness", joint_stiffness: ValueProperty<f32>),
        child!("MinSoftAngle1", min_soft_angle_1: ValueProperty<f32>),
        child!("MaxSoftAngle1", max_soft_angle_1: ValueProperty<f32>),
        child!("MaxSoftAngle2", max_soft_angle_2: ValueProperty<f32>),
        child!("MaxSoftAngle3", max_soft_angle_3: ValueProperty<f32>),
        child!("RotationSpeed", rotation_speed: ValueProperty<f32>),
        child!("RotationStrength", rotation_strength: ValueProperty<f32>),
        child!("RestoringStrength", restoring_strength: ValueProperty<f32>),
        child!("RestoringMaxTorque", restoring_max_torque: ValueProperty<f32>),
        child!("LatchStrength", latch_strength: ValueProperty<f32>),
        child!("Mass", mass: ValueProperty<f32>),
        child!("MinDamageForce", min_damage_force: ValueProperty<f32>),
        child!("DamageHealth", damage_health: ValueProperty<f32>),
        child!("UnkFloat5C", unk_float_5c: ValueProperty<f32>),
        child!("UnkFloat60", unk_float_60: ValueProperty<f32>),
        child!("UnkFloat64", unk_float_64: ValueProperty<f32>),
        child!("UnkFloat68", unk_float_68: ValueProperty<f32>),
        child!("UnkFloat6C", unk_float_6c: ValueProperty<f32>),
        child!("UnkFloat70", unk_float_70: ValueProperty<f32>),
        child!("UnkFloat74", unk_float_74: ValueProperty<f32>),
        child!("UnkFloat78", unk_float_78: ValueProperty<f32>),
        child!("UnkFloatA8", unk_float_a8: ValueProperty<f32>),
    ];
}

impl ElementTree for GroupItem {
    const TAG: &'static str = "Item";
}

impl GroupItem {
    /// `true` if the group has no parent.
    pub fn is_root(&self) -> bool {
        self.parent_index == NO_PARENT
    }
}

/// Attaches a sub-drawable to a group.
#[allow(missing_docs)]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChildItem {
    /// Index into the LOD's `groups`.
    pub group_index: u8,
    pub bone_tag: u16,
    pub pristine_mass: f32,
    pub damaged_mass: f32,
    pub unk_float: f32,
    pub unk_vec: Vector3<f32>,
    pub inertia_tensor: Vector4<f32>,
    pub drawable: Drawable,
}

impl Fields for ChildItem {
    const FIELDS: &'static [Field<Self>] = &[
        child!("GroupIndex", group_index: ValueProperty<u8>),
        child!("BoneTag", bone_tag: ValueProperty<u16>),
        child!("PristineMass", pristine_mass: ValueProperty<f32>),
        child!("DamagedMass", damaged_mass: ValueProperty<f32>),
        child!("UnkFloat", unk_float: ValueProperty<f32>),
        child!("UnkVec", unk_vec: VectorProperty),
        child!("InertiaTensor", inertia_tensor: QuaternionProperty),
        child!("Drawable", drawable: Nested<Drawable>),
    ];
}

impl ElementTree for ChildItem {
    const TAG: &'static str = "Item";
}

/// A breakable glass pane.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq)]
pub struct WindowItem {
    pub item_id: u32,
    pub unk_ushort_1: u16,
    pub unk_ushort_4: u16,
    pub unk_ushort_5: u16,
    /// Maps glass-space positions onto the shattermap.
    pub projection: Matrix4<f32>,
    pub unk_float_17: f32,
    pub unk_float_18: f32,
    pub cracks_texture_tiling: f32,
    pub shattermap: ShatterMap,
}

impl Default for WindowItem {
    fn default() -> Self {
        Self {
            item_id: 0,
            unk_ushort_1: 0,
            unk_ushort_4: 0,
            unk_ushort_5: 0,
            projection: Matrix4::identity(),
            unk_float_17: 0.0,
            unk_float_18: 0.0,
            cracks_texture_tiling: 0.0,
            shattermap: ShatterMap::default(),
        }
    }
}

impl Fields for WindowItem {
    const FIELDS: &'static [Field<Self>] = &[
        child!("ItemID", item_id: ValueProperty<u32>),
        child!("UnkUshort1", unk_ushort_1: ValueProperty<u16>),
        child!("UnkUshort4", unk_ushort_4: ValueProperty<u16>),
        child!("UnkUshort5", unk_ushort_5: ValueProperty<u16>),
        child!("Projection", projection: MatrixProperty),
        child!("UnkFloat17", unk_float_17: ValueProperty<f32>),
        child!("UnkFloat18", unk_float_18: ValueProperty<f32>),
        child!("CracksTextureTiling", cracks_texture_tiling: ValueProperty<f32>),
        child!("ShatterMap", shattermap: ShatterMapProperty),
    ];
}

impl ElementTree for WindowItem {
    const TAG: &'static str = "Window";
}

impl WindowItem {
    /// Shattermap width in cells.
    pub fn width(&self) -> usize {
        self.shattermap.width()
    }

    /// Shattermap height in cells.
    pub fn height(&self) -> usize {
        self.shattermap.height()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bound::{BoundItem, BoundShape};
    use approx::assert_relative_eq;

    fn reparse(fragment: &Fragment) -> Fragment {
        let element = fragment.to_xml();
        let mut ctx = ReadContext::new(&element);
        let back = Fragment::from_xml(&element, &mut ctx);
        assert!(ctx.errors().is_empty(), "{:?}", ctx.errors());
        back
    }

    fn sample() -> Fragment {
        let mut archetype = Archetype {
            name: "prop_crate".into(),
            ..Default::default()
        };
        archetype.set_mass(20.0);
        archetype.set_inertia_tensor(Vector3::new(2.0, 4.0, 0.0));
        archetype
            .bounds
            .children
            .push(BoundItem::Box(BoundShape::default()));

        let lod = Lod {
            archetype,
            transforms: vec![Matrix4::identity()],
            groups: vec![
                GroupItem {
                    name: "body".into(),
                    ..Default::default()
                },
                GroupItem {
                    name: "lid".into(),
                    parent_index: 0,
                    strength: 100.0,
                    ..Default::default()
                },
            ],
            children: vec![ChildItem {
                group_index: 1,
                bone_tag: 11816,
                pristine_mass: 5.0,
                ..Default::default()
            }],
            ..Default::default()
        };

        let mut window = WindowItem {
            item_id: 3,
            ..Default::default()
        };
        window.shattermap = ShatterMap::from_pixels(2, 2, b"0110").unwrap();

        Fragment {
            name: "prop_crate".into(),
            bounding_sphere_radius: 1.5,
            gravity_factor: 1.0,
            buoyancy_factor: 1.0,
            bone_transforms: BoneTransforms {
                unk: 1,
                transforms: vec![Matrix4::identity(); 2],
            },
            physics: Physics {
                lod1: Some(lod),
                ..Default::default()
            },
            vehicle_glass_windows: vec![window],
            ..Default::default()
        }
    }

    #[test]
    fn test_fragment_round_trip() {
        let fragment = sample();
        assert_eq!(reparse(&fragment), fragment);
    }

    #[test]
    fn test_absent_lods_are_not_written() {
        let element = sample().to_xml();
        let physics = element.child("Physics").unwrap();
        assert!(physics.child("LOD1").is_some());
        assert!(physics.child("LOD2").is_none());
        assert_eq!(sample().lods().count(), 1);
    }

    #[test]
    fn test_bone_transforms_attribute_and_rows() {
        let element = sample().to_xml();
        let bones = element.child("BoneTransforms").unwrap();
        assert_eq!(bones.attribute("unk"), Some("1"));
        assert_eq!(bones.children.len(), 2);
        assert_eq!(bones.children[0].text().trim().lines().count(), 3);
    }

    #[test]
    fn test_bone_transforms_from_text_rows() {
        let element = Element::parse(
            "<BoneTransforms unk=\"2\"><Item>1 0 0 0\n0 1 0 0\n0 0 1 3</Item></BoneTransforms>",
        )
        .unwrap();
        let mut ctx = ReadContext::new(&element);
        let bones = BoneTransformsProperty::read(&element, &mut ctx).unwrap();
        assert_eq!(bones.unk, 2);
        assert_eq!(bones.transforms[0][(2, 3)], 3.0);
    }

    #[test]
    fn test_group_defaults() {
        let element = Element::parse("<Item><Name>door</Name></Item>").unwrap();
        let mut ctx = ReadContext::new(&element);
        let group = GroupItem::from_xml(&element, &mut ctx);
        assert_eq!(group.name, "door");
        assert!(group.is_root());
    }

    #[test]
    fn test_archetype_inverses() {
        let lod = sample().physics.lod1.unwrap();
        assert_relative_eq!(lod.archetype.mass_inv, 0.05);
        assert_relative_eq!(lod.archetype.inertia_tensor_inv, Vector3::new(0.5, 0.25, 0.0));
    }

    #[test]
    fn test_window_dimensions() {
        let fragment = sample();
        let window = &fragment.vehicle_glass_windows[0];
        assert_eq!((window.width(), window.height()), (2, 2));

        let element = fragment.to_xml();
        let windows = element.child("VehicleGlassWindows").unwrap();
        assert_eq!(windows.children[0].name, "Window");
    }

    #[test]
    fn test_hi_detail_strips_lower_models() {
        let mut fragment = sample();
        let models = |tag: &str| Element::new(tag).with_child(Element::new("Item"));
        fragment.drawable.extra = vec![models("DrawableModelsHigh"), models("DrawableModelsLow")];
        if let Some(lod) = fragment.physics.lod1.as_mut() {
            lod.children[0].drawable.extra = vec![models("DrawableModelsHigh"), models("DrawableModelsMedium")];
        }

        let hi = fragment.to_hi_detail();
        assert_eq!(hi.drawable.extra.len(), 1);
        assert_eq!(hi.physics.lod1.as_ref().unwrap().children[0].drawable.extra.len(), 1);
        // The source is left untouched.
        assert_eq!(fragment.drawable.extra.len(), 2);
    }
}
