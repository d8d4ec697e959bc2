//! UI graphic raycasting

use std::sync::Arc;

use bitflags::bitflags;

use super::physics::PhysicsScene3D;
use super::physics2d::PhysicsScene2D;
use super::{HitTester, LayerMask, ObjectId, PointerEvent, RaycastResult, RaycasterKind, ScreenCamera};
use crate::input::Rect;

bitflags! {
    /// Which physics worlds may block UI hits
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct BlockingObjects: u8 {
        const TWO_D = 1 << 0;
        const THREE_D = 1 << 1;
    }
}

/// A drawable UI element
#[derive(Debug, Clone, PartialEq)]
pub struct Graphic {
    pub object: ObjectId,
    /// Screen rectangle in display pixels
    pub rect: Rect,
    /// Draw depth; higher is on top
    pub depth: i32,
    pub raycast_target: bool,
    /// False when the graphic is rotated away from the camera
    pub facing_camera: bool,
}

impl Graphic {
    /// Raycast-target graphic facing the camera
    pub fn new(object: ObjectId, rect: Rect, depth: i32) -> Self {
        Self {
            object,
            rect,
            depth,
            raycast_target: true,
            facing_camera: true,
        }
    }
}

/// A canvas rendered by one camera at a plane distance
#[derive(Debug, Clone, Default)]
pub struct Canvas {
    pub plane_distance: f32,
    pub sorting_order: i32,
    pub graphics: Vec<Graphic>,
}

impl Canvas {
    pub fn new(plane_distance: f32) -> Self {
        Self {
            plane_distance,
            ..Self::default()
        }
    }

    /// Builder: add a graphic
    pub fn with_graphic(mut self, graphic: Graphic) -> Self {
        self.graphics.push(graphic);
        self
    }
}

/// Configuration of a graphic raycaster
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GraphicRaycasterSettings {
    pub blocking_mask: LayerMask,
    pub blocking_objects: BlockingObjects,
    pub ignore_reversed_graphics: bool,
}

impl Default for GraphicRaycasterSettings {
    fn default() -> Self {
        Self {
            blocking_mask: LayerMask::EVERYTHING,
            blocking_objects: BlockingObjects::empty(),
            ignore_reversed_graphics: true,
        }
    }
}

/// Stock UI raycaster over one canvas
#[derive(Debug, Clone)]
pub struct GraphicRaycaster {
    camera: ScreenCamera,
    canvas: Arc<Canvas>,
    settings: GraphicRaycasterSettings,
    blockers_3d: Option<Arc<PhysicsScene3D>>,
    blockers_2d: Option<Arc<PhysicsScene2D>>,
}

impl GraphicRaycaster {
    pub fn new(camera: ScreenCamera, canvas: Arc<Canvas>, settings: GraphicRaycasterSettings) -> Self {
        Self {
            camera,
            canvas,
            settings,
            blockers_3d: None,
            blockers_2d: None,
        }
    }

    /// Builder: 3D colliders that can block this canvas
    pub fn with_3d_blockers(mut self, scene: Arc<PhysicsScene3D>) -> Self {
        self.blockers_3d = Some(scene);
        self
    }

    /// Builder: 2D colliders that can block this canvas
    pub fn with_2d_blockers(mut self, scene: Arc<PhysicsScene2D>) -> Self {
        self.blockers_2d = Some(scene);
        self
    }

    pub fn camera(&self) -> &ScreenCamera {
        &self.camera
    }

    pub fn settings(&self) -> &GraphicRaycasterSettings {
        &self.settings
    }

    /// New raycaster over this canvas with a copy of `settings`
    pub fn copy_configuration(&self) -> Self {
        Self {
            camera: self.camera,
            canvas: Arc::clone(&self.canvas),
            settings: self.settings,
            blockers_3d: self.blockers_3d.clone(),
            blockers_2d: self.blockers_2d.clone(),
        }
    }

    /// Distance to the closest blocking collider, if any
    fn blocking_distance(&self, event: &PointerEvent) -> f32 {
        let mut distance = f32::MAX;
        let blocking = self.settings.blocking_objects;
        if blocking.contains(BlockingObjects::THREE_D)
            && let Some(scene) = &self.blockers_3d
        {
            let ray = self.camera.screen_to_ray(event.position);
            if let Some(hit) = scene.raycast(&ray, self.camera.clip_distance(), self.settings.blocking_mask) {
                distance = distance.min(hit.distance);
            }
        }
        if blocking.contains(BlockingObjects::TWO_D)
            && let Some(scene) = &self.blockers_2d
        {
            let origin = self.camera.screen_to_world(event.position);
            if let Some((_, hit)) = scene
                .overlap_ray(origin.truncate(), origin.z, self.camera.clip_distance(), self.settings.blocking_mask)
                .first()
            {
                distance = distance.min(*hit);
            }
        }
        distance
    }
}

impl HitTester for GraphicRaycaster {
    fn kind(&self) -> RaycasterKind {
        RaycasterKind::Graphic
    }

    fn hit_test(&self, event: &PointerEvent, results: &mut Vec<RaycastResult>) {
        if !self.camera.sees(event.display) {
            return;
        }
        let distance = self.canvas.plane_distance;
        if distance > self.blocking_distance(event) {
            return;
        }
        let position = [event.position.x, event.position.y];
        let mut hits: Vec<&Graphic> = self
            .canvas
            .graphics
            .iter()
            .filter(|graphic| graphic.raycast_target && graphic.rect.contains(position))
            .filter(|graphic| !(self.settings.ignore_reversed_graphics && !graphic.facing_camera))
            .collect();
        hits.sort_by(|a, b| b.depth.cmp(&a.depth));
        results.extend(hits.into_iter().map(|graphic| RaycastResult {
            object: graphic.object,
            kind: RaycasterKind::Graphic,
            distance,
            sorting_order: self.canvas.sorting_order,
            depth: graphic.depth,
            world_position: None,
            display: event.display,
        }));
    }
}
