//! Symbolic flag sets used by collision bounds.

// Flag names are the engine's own.
#![allow(missing_docs)]

use bitflags::bitflags;

bitflags! {
    /// Collision type and include flags on composite children
    /// (`CompositeFlags1` / `CompositeFlags2`).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct CompositeFlags: u32 {
        const UNKNOWN = 1 << 0;
        const MAP_WEAPON = 1 << 1;
        const MAP_DYNAMIC = 1 << 2;
        const MAP_ANIMAL = 1 << 3;
        const MAP_COVER = 1 << 4;
        const MAP_VEHICLE = 1 << 5;
        const VEHICLE_NOT_BVH = 1 << 6;
        const VEHICLE_BVH = 1 << 7;
        const VEHICLE_BOX = 1 << 8;
        const PED = 1 << 9;
        const RAGDOLL = 1 << 10;
        const ANIMAL = 1 << 11;
        const ANIMAL_RAGDOLL = 1 << 12;
        const OBJECT = 1 << 13;
        const OBJECT_ENV_CLOTH = 1 << 14;
        const PLANT = 1 << 15;
        const PROJECTILE = 1 << 16;
        const EXPLOSION = 1 << 17;
        const PICKUP = 1 << 18;
        const FOLIAGE = 1 << 19;
        const FORKLIFT_FORKS = 1 << 20;
        const TEST_WEAPON = 1 << 21;
        const TEST_CAMERA = 1 << 22;
        const TEST_AI = 1 << 23;
        const TEST_SCRIPT = 1 << 24;
        const TEST_VEHICLE_WHEEL = 1 << 25;
        const GLASS = 1 << 26;
        const MAP_RIVER = 1 << 27;
        const SMOKE = 1 << 28;
        const UNSMASHED = 1 << 29;
        const MAP_STAIRS = 1 << 30;
        const MAP_DEEP_SURFACE = 1 << 31;
    }
}

bitflags! {
    /// Surface behaviour flags on bound materials.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct MaterialFlags: u32 {
        const FLAG_STAIRS = 1 << 0;
        const FLAG_NOT_CLIMBABLE = 1 << 1;
        const FLAG_SEE_THROUGH = 1 << 2;
        const FLAG_SHOOT_THROUGH = 1 << 3;
        const FLAG_NOT_COVER = 1 << 4;
        const FLAG_WALKABLE_PATH = 1 << 5;
        const FLAG_NO_CAM_COLLISION = 1 << 6;
        const FLAG_SHOOT_THROUGH_FX = 1 << 7;
        const FLAG_NO_DECAL = 1 << 8;
        const FLAG_NO_NAVMESH = 1 << 9;
        const FLAG_NO_RAGDOLL = 1 << 10;
        const FLAG_VEHICLE_WHEEL = 1 << 11;
        const FLAG_NO_PTFX = 1 << 12;
        const FLAG_TOO_STEEP_FOR_PLAYER = 1 << 13;
        const FLAG_NO_NETWORK_SPAWN = 1 << 14;
        const FLAG_NO_CAM_COLLISION_ALLOW_CLIPPING = 1 << 15;
    }
}
