//! 3D collider raycasting

use std::sync::Arc;

use glam::Vec3;
use ordered_float::OrderedFloat;

use super::{HitTester, LayerMask, ObjectId, PointerEvent, RaycastResult, RaycasterKind, ScreenCamera};

/// Offset used to step past a surface before casting again
const SKIN: f32 = 1e-4;

/// 3D ray with a normalized direction
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Ray {
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction: direction.normalize_or_zero(),
        }
    }

    pub fn at(&self, distance: f32) -> Vec3 {
        self.origin + self.direction * distance
    }
}

/// Collider geometry
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Shape3D {
    Sphere { center: Vec3, radius: f32 },
    Box { min: Vec3, max: Vec3 },
}

impl Shape3D {
    /// Distance to the first surface crossing ahead of the ray origin
    ///
    /// A ray starting inside the shape reports the exit surface.
    fn intersect(&self, ray: &Ray) -> Option<f32> {
        let (near, far) = match *self {
            Shape3D::Sphere { center, radius } => {
                let oc = ray.origin - center;
                let b = oc.dot(ray.direction);
                let c = oc.length_squared() - radius * radius;
                let discriminant = b * b - c;
                if discriminant < 0.0 {
                    return None;
                }
                let root = discriminant.sqrt();
                (-b - root, -b + root)
            }
            Shape3D::Box { min, max } => {
                // Slab method
                let inv = ray.direction.recip();
                let t1 = (min - ray.origin) * inv;
                let t2 = (max - ray.origin) * inv;
                let near = t1.min(t2).max_element();
                let far = t1.max(t2).min_element();
                if near > far {
                    return None;
                }
                (near, far)
            }
        };
        if near > SKIN {
            Some(near)
        } else if far > SKIN {
            Some(far)
        } else {
            None
        }
    }
}

/// A collider on a layer
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Collider3D {
    pub object: ObjectId,
    pub layer: u8,
    pub shape: Shape3D,
}

/// One 3D hit
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hit3D {
    pub object: ObjectId,
    pub distance: f32,
    pub point: Vec3,
}

/// Collection of 3D colliders
#[derive(Debug, Clone, Default)]
pub struct PhysicsScene3D {
    colliders: Vec<Collider3D>,
}

impl PhysicsScene3D {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: add a collider
    pub fn with_collider(mut self, collider: Collider3D) -> Self {
        self.colliders.push(collider);
        self
    }

    pub fn add(&mut self, collider: Collider3D) {
        self.colliders.push(collider);
    }

    pub fn colliders(&self) -> &[Collider3D] {
        &self.colliders
    }

    fn hits<'a>(
        &'a self,
        ray: &'a Ray,
        max_distance: f32,
        mask: LayerMask,
    ) -> impl Iterator<Item = Hit3D> + 'a {
        self.colliders
            .iter()
            .filter(move |collider| mask.contains(collider.layer))
            .filter_map(move |collider| {
                let distance = collider.shape.intersect(ray)?;
                (distance <= max_distance).then(|| Hit3D {
                    object: collider.object,
                    distance,
                    point: ray.at(distance),
                })
            })
    }

    /// Closest hit along `ray`
    pub fn raycast(&self, ray: &Ray, max_distance: f32, mask: LayerMask) -> Option<Hit3D> {
        self.hits(ray, max_distance, mask)
            .min_by_key(|hit| OrderedFloat(hit.distance))
    }
}

/// Strategy producing every hit along a ray
pub trait RaycastAll {
    /// Returns hits sorted by distance; `limit == 0` means unlimited
    fn raycast_all(
        &self,
        scene: &PhysicsScene3D,
        ray: &Ray,
        max_distance: f32,
        mask: LayerMask,
        limit: usize,
    ) -> Vec<Hit3D>;
}

/// One hit per collider: the first surface the ray crosses
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardRaycastAll;

impl RaycastAll for StandardRaycastAll {
    fn raycast_all(
        &self,
        scene: &PhysicsScene3D,
        ray: &Ray,
        max_distance: f32,
        mask: LayerMask,
        limit: usize,
    ) -> Vec<Hit3D> {
        let mut hits: Vec<_> = scene.hits(ray, max_distance, mask).collect();
        hits.sort_by_key(|hit| OrderedFloat(hit.distance));
        if limit > 0 {
            hits.truncate(limit);
        }
        hits
    }
}

/// Repeated closest-hit casts, stepping past each surface
///
/// Reports every surface crossing, so a concave collider (or a ray passing
/// through a solid) yields several hits. Distances are measured from the
/// original ray origin.
#[derive(Debug, Clone, Copy, Default)]
pub struct MarchingRaycastAll;

impl RaycastAll for MarchingRaycastAll {
    fn raycast_all(
        &self,
        scene: &PhysicsScene3D,
        ray: &Ray,
        max_distance: f32,
        mask: LayerMask,
        limit: usize,
    ) -> Vec<Hit3D> {
        let mut hits = Vec::new();
        let mut current = *ray;
        let mut remaining = max_distance;
        let mut travelled = 0.0;
        while remaining > 0.0 && (limit == 0 || hits.len() < limit) {
            let Some(hit) = scene.raycast(&current, remaining, mask) else {
                break;
            };
            travelled += hit.distance;
            hits.push(Hit3D {
                distance: travelled,
                ..hit
            });
            remaining -= hit.distance + SKIN;
            travelled += SKIN;
            current = Ray::new(hit.point + current.direction * SKIN, current.direction);
        }
        hits
    }
}

/// Configuration of a 3D raycaster
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhysicsRaycasterSettings {
    pub event_mask: LayerMask,
    /// 0 means unlimited
    pub max_ray_intersections: usize,
    /// Select [`MarchingRaycastAll`] instead of [`StandardRaycastAll`]
    pub multiple_hits_per_concave_collider: bool,
}

impl Default for PhysicsRaycasterSettings {
    fn default() -> Self {
        Self {
            event_mask: LayerMask::EVERYTHING,
            max_ray_intersections: 0,
            multiple_hits_per_concave_collider: false,
        }
    }
}

impl PhysicsRaycasterSettings {
    pub fn strategy(&self) -> &'static dyn RaycastAll {
        if self.multiple_hits_per_concave_collider {
            &MarchingRaycastAll
        } else {
            &StandardRaycastAll
        }
    }
}

/// Stock 3D raycaster
#[derive(Debug, Clone)]
pub struct PhysicsRaycaster {
    camera: ScreenCamera,
    scene: Arc<PhysicsScene3D>,
    settings: PhysicsRaycasterSettings,
}

impl PhysicsRaycaster {
    pub fn new(camera: ScreenCamera, scene: Arc<PhysicsScene3D>, settings: PhysicsRaycasterSettings) -> Self {
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

impl HitTester for PhysicsRaycaster {
    fn kind(&self) -> RaycasterKind {
        RaycasterKind::Physics3D
    }

    fn hit_test(&self, event: &PointerEvent, results: &mut Vec<RaycastResult>) {
        if !self.camera.sees(event.display) {
            return;
        }
        let ray = self.camera.screen_to_ray(event.position);
        let hits = self.settings.strategy().raycast_all(
            &self.scene,
            &ray,
            self.camera.clip_distance(),
            self.settings.event_mask,
            self.settings.max_ray_intersections,
        );
        results.extend(hits.into_iter().map(|hit| RaycastResult {
            object: hit.object,
            kind: RaycasterKind::Physics3D,
            distance: hit.distance,
            sorting_order: 0,
            depth: 0,
            world_position: Some(hit.point),
            display: event.display,
        }));
    }
}
