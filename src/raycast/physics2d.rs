//! 2D collider raycasting

use std::sync::Arc;

use glam::Vec2;
use ordered_float::OrderedFloat;

use super::physics::PhysicsRaycasterSettings;
use super::{HitTester, LayerMask, ObjectId, PointerEvent, RaycastResult, RaycasterKind, ScreenCamera};

/// 2D collider geometry in world units
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Shape2D {
    Circle { center: Vec2, radius: f32 },
    Rect { min: Vec2, max: Vec2 },
}

impl Shape2D {
    pub fn contains(&self, point: Vec2) -> bool {
        match *self {
            Shape2D::Circle { center, radius } => point.distance_squared(center) <= radius * radius,
            Shape2D::Rect { min, max } => {
                point.x >= min.x && point.x <= max.x && point.y >= min.y && point.y <= max.y
            }
        }
    }
}

/// A 2D collider at a depth
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Collider2D {
    pub object: ObjectId,
    pub layer: u8,
    pub shape: Shape2D,
    /// World Z of the collider plane
    pub z: f32,
    pub sorting_order: i32,
}

/// Collection of 2D colliders
#[derive(Debug, Clone, Default)]
pub struct PhysicsScene2D {
    colliders: Vec<Collider2D>,
}

impl PhysicsScene2D {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: add a collider
    pub fn with_collider(mut self, collider: Collider2D) -> Self {
        self.colliders.push(collider);
        self
    }

    pub fn add(&mut self, collider: Collider2D) {
        self.colliders.push(collider);
    }

    /// Colliders under `point` that lie in front of `near_z` and within `max_distance`,
    /// paired with their distance along +Z, closest first
    pub fn overlap_ray(
        &self,
        point: Vec2,
        near_z: f32,
        max_distance: f32,
        mask: LayerMask,
    ) -> Vec<(Collider2D, f32)> {
        let mut hits: Vec<_> = self
            .colliders
            .iter()
            .filter(|collider| mask.contains(collider.layer) && collider.shape.contains(point))
            .map(|collider| (*collider, collider.z - near_z))
            .filter(|(_, distance)| *distance >= 0.0 && *distance <= max_distance)
            .collect();
        hits.sort_by_key(|(_, distance)| OrderedFloat(*distance));
        hits
    }
}

/// Stock 2D raycaster
#[derive(Debug, Clone)]
pub struct Physics2DRaycaster {
    camera: ScreenCamera,
    scene: Arc<PhysicsScene2D>,
    settings: PhysicsRaycasterSettings,
}

impl Physics2DRaycaster {
    pub fn new(camera: ScreenCamera, scene: Arc<PhysicsScene2D>, settings: PhysicsRaycasterSettings) -> Self {
        Self {
            camera,
            scene,
            settings,
        }
    }

    pub fn camera(&self) -> &ScreenCamera {
        &self.camera
    }

    pub fn settings(&self) -> &PhysicsRaycasterSettings {
        &self.settings
    }

    /// Copy of this raycaster's configuration over the same scene
    pub fn copy_configuration(&self) -> Self {
        Self::new(self.camera, Arc::clone(&self.scene), self.settings)
    }
}

impl HitTester for Physics2DRaycaster {
    fn kind(&self) -> RaycasterKind {
        RaycasterKind::Physics2D
    }

    fn hit_test(&self, event: &PointerEvent, results: &mut Vec<RaycastResult>) {
        if !self.camera.sees(event.display) {
            return;
        }
        let origin = self.camera.screen_to_world(event.position);
        let mut hits = self.scene.overlap_ray(
            origin.truncate(),
            origin.z,
            self.camera.clip_distance(),
            self.settings.event_mask,
        );
        if self.settings.max_ray_intersections > 0 {
            hits.truncate(self.settings.max_ray_intersections);
        }
        results.extend(hits.into_iter().map(|(collider, distance)| RaycastResult {
            object: collider.object,
            kind: RaycasterKind::Physics2D,
            distance,
            sorting_order: collider.sorting_order,
            depth: 0,
            world_position: Some(origin.truncate().extend(collider.z)),
            display: event.display,
        }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn circle(object: ObjectId, z: f32) -> Collider2D {
        Collider2D {
            object,
            layer: 0,
            shape: Shape2D::Circle {
                center: Vec2::new(5.0, 5.0),
                radius: 2.0,
            },
            z,
            sorting_order: object as i32,
        }
    }

    #[test]
    fn test_hits_sorted_by_depth_and_truncated() {
        let scene = Arc::new(
            PhysicsScene2D::new()
                .with_collider(circle(1, 8.0))
                .with_collider(circle(2, 3.0))
                .with_collider(circle(3, 5.0)),
        );
        let settings = PhysicsRaycasterSettings {
            max_ray_intersections: 2,
            ..PhysicsRaycasterSettings::default()
        };
        let raycaster = Physics2DRaycaster::new(ScreenCamera::new(0), scene, settings);
        let mut results = Vec::new();
        raycaster.hit_test(&PointerEvent::programmatic(Vec2::new(5.0, 6.0), 0), &mut results);
        let objects: Vec<_> = results.iter().map(|hit| hit.object).collect();
        assert_eq!(objects, vec![2, 3]);
    }

    #[test]
    fn test_rect_contains() {
        let rect = Shape2D::Rect {
            min: Vec2::new(0.0, 0.0),
            max: Vec2::new(2.0, 1.0),
        };
        assert!(rect.contains(Vec2::new(1.0, 0.5)));
        assert!(!rect.contains(Vec2::new(3.0, 0.5)));
    }
}
