//! Pointer raycasting with per-user ownership filtering
//!
//! Three stock raycasters hit-test 3D colliders, 2D colliders and UI
//! graphics. [`PerUserRaycaster`] wraps any of them and hides the scene from
//! pointer events whose device belongs to a different user.

mod filter;
mod graphic;
mod physics;
mod physics2d;
mod setup;

use std::fmt;

use glam::{Vec2, Vec3};

use crate::input::{DeviceId, DisplayIndex, OwnershipLookup};

pub use filter::{PerUserGraphicRaycaster, PerUserPhysics2DRaycaster, PerUserPhysicsRaycaster, PerUserRaycaster};
pub use graphic::{BlockingObjects, Canvas, Graphic, GraphicRaycaster, GraphicRaycasterSettings};
pub use physics::{
    Collider3D, Hit3D, MarchingRaycastAll, PhysicsRaycaster, PhysicsRaycasterSettings,
    PhysicsScene3D, Ray, RaycastAll, Shape3D, StandardRaycastAll,
};
pub use physics2d::{Collider2D, Physics2DRaycaster, PhysicsScene2D, Shape2D};
pub use setup::{
    InstalledRaycasters, PlayerHierarchy, PlayerRaycasters, SceneRaycaster, SetupIssue,
    SetupReport, Severity, install_per_user_raycasters,
};

/// The three raycaster families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RaycasterKind {
    Physics3D,
    Physics2D,
    Graphic,
}

impl fmt::Display for RaycasterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Physics3D => f.write_str("physics"),
            Self::Physics2D => f.write_str("physics 2D"),
            Self::Graphic => f.write_str("graphic"),
        }
    }
}

/// Bitmask over 32 layers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LayerMask(pub u32);

impl LayerMask {
    pub const EVERYTHING: Self = Self(u32::MAX);
    pub const NOTHING: Self = Self(0);

    pub fn contains(self, layer: u8) -> bool {
        layer < 32 && self.0 & (1 << layer) != 0
    }
}

impl Default for LayerMask {
    fn default() -> Self {
        Self::EVERYTHING
    }
}

/// Identifier of a hit scene object
pub type ObjectId = u32;

/// Pointer data handed to raycasters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerEvent {
    pub pointer_id: i32,
    /// Device that produced the event; `None` for programmatic events
    pub device: Option<DeviceId>,
    /// Position in display pixels
    pub position: Vec2,
    pub display: DisplayIndex,
}

impl PointerEvent {
    /// Pointer event produced by a device
    pub fn from_device(device: DeviceId, position: Vec2, display: DisplayIndex) -> Self {
        Self {
            pointer_id: i32::try_from(device.0).unwrap_or(i32::MAX),
            device: Some(device),
            position,
            display,
        }
    }

    /// Pointer event issued by code, with no device provenance
    pub fn programmatic(position: Vec2, display: DisplayIndex) -> Self {
        Self {
            pointer_id: -1,
            device: None,
            position,
            display,
        }
    }
}

/// One raycast hit
#[derive(Debug, Clone, PartialEq)]
pub struct RaycastResult {
    pub object: ObjectId,
    pub kind: RaycasterKind,
    pub distance: f32,
    pub sorting_order: i32,
    pub depth: i32,
    pub world_position: Option<Vec3>,
    pub display: DisplayIndex,
}

/// Orthographic camera looking down +Z
///
/// Display pixels map to world units through `pixels_per_unit`, offset by
/// `origin`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenCamera {
    pub target_display: DisplayIndex,
    pub origin: Vec3,
    pub pixels_per_unit: f32,
    pub near_clip: f32,
    pub far_clip: f32,
}

impl ScreenCamera {
    pub fn new(target_display: DisplayIndex) -> Self {
        Self {
            target_display,
            origin: Vec3::ZERO,
            pixels_per_unit: 1.0,
            near_clip: 0.3,
            far_clip: 1000.0,
        }
    }

    /// World-space point under a display position, on the near plane
    pub fn screen_to_world(&self, position: Vec2) -> Vec3 {
        let ppu = if self.pixels_per_unit > 0.0 {
            self.pixels_per_unit
        } else {
            1.0
        };
        Vec3::new(
            self.origin.x + position.x / ppu,
            self.origin.y + position.y / ppu,
            self.origin.z + self.near_clip,
        )
    }

    pub fn screen_to_ray(&self, position: Vec2) -> Ray {
        Ray::new(self.screen_to_world(position), Vec3::Z)
    }

    /// Ray length between the clip planes
    pub fn clip_distance(&self) -> f32 {
        (self.far_clip - self.near_clip).max(0.0)
    }

    /// Whether a pointer on `display` can be seen through this camera
    pub fn sees(&self, display: DisplayIndex) -> bool {
        self.target_display == display
    }
}

/// Unfiltered hit-testing algorithm
pub trait HitTester {
    fn kind(&self) -> RaycasterKind;

    /// Appends hits for `event` in the algorithm's own order
    fn hit_test(&self, event: &PointerEvent, results: &mut Vec<RaycastResult>);
}

/// Raycaster contract shared by stock and ownership-aware raycasters
pub trait Raycaster {
    fn kind(&self) -> RaycasterKind;

    /// Appends hits for `event`; `owners` answers device ownership
    fn raycast(
        &self,
        owners: &dyn OwnershipLookup,
        event: &PointerEvent,
        results: &mut Vec<RaycastResult>,
    );
}
