//! # Hover Picking
//!
//! Pointer ray-casting against the interactable props of the loaded scene.
//!
//! ## How it works
//!
//! 1. **Pointer to Ray**: Normalized device coordinates are unprojected through
//!    the inverse view-projection of the current camera
//! 2. **Broad Phase**: Props whose displayed bounding box the ray misses are
//!    skipped
//! 3. **Narrow Phase**: The ray is brought back into the prop's unscaled
//!    geometry and tested against every triangle (Möller–Trumbore)
//! 4. **Selection**: The nearest intersected prop becomes the hovered prop
//!
//! Picking is expensive relative to the rest of a frame, so the
//! [`InteractionRaycaster`] only recomputes when its dirty flag is set by a
//! pointer move, a camera change, or a scene change.

use cgmath::{ElementWise, InnerSpace, Matrix4, SquareMatrix, Vector2, Vector3, Vector4, Zero};

use crate::assets::bundle::PropId;
use crate::gfx::camera::OrbitCamera;

/// A 3D ray for intersection testing
#[derive(Debug, Clone, Copy)]
pub struct Ray {
    /// Ray origin point in world space
    pub origin: Vector3<f32>,
    /// Ray direction (normalized)
    pub direction: Vector3<f32>,
}

impl Ray {
    /// Create a new ray
    pub fn new(origin: Vector3<f32>, direction: Vector3<f32>) -> Self {
        Self {
            origin,
            direction: direction.normalize(),
        }
    }

    /// Builds the world-space ray under a pointer given in normalized device
    /// coordinates (x right, y up, both in [-1, 1])
    pub fn from_ndc(ndc: Vector2<f32>, camera: &OrbitCamera) -> Self {
        let view_proj = camera.build_gl_view_projection_matrix();
        let inv_view_proj = view_proj.invert().unwrap_or_else(Matrix4::identity);

        let unproject = |depth: f32| {
            let world = inv_view_proj * Vector4::new(ndc.x, ndc.y, depth, 1.0);
            Vector3::new(world.x / world.w, world.y / world.w, world.z / world.w)
        };
        let near = unproject(-1.0);
        let far = unproject(1.0);

        Ray::new(near, far - near)
    }

    /// Ray-triangle intersection (Möller–Trumbore), double sided
    ///
    /// Returns the ray parameter of the hit, which is the distance when the
    /// direction is normalized.
    pub fn intersect_triangle(&self, triangle: &[Vector3<f32>; 3]) -> Option<f32> {
        const EPSILON: f32 = 1e-7;

        let [v0, v1, v2] = *triangle;
        let edge1 = v1 - v0;
        let edge2 = v2 - v0;

        let h = self.direction.cross(edge2);
        let det = edge1.dot(h);
        if det.abs() < EPSILON {
            // Parallel to the triangle plane
            return None;
        }

        let inv_det = 1.0 / det;
        let s = self.origin - v0;
        let u = inv_det * s.dot(h);
        if !(0.0..=1.0).contains(&u) {
            return None;
        }

        let q = s.cross(edge1);
        let v = inv_det * self.direction.dot(q);
        if v < 0.0 || u + v > 1.0 {
            return None;
        }

        let t = inv_det * edge2.dot(q);
        (t >= 0.0).then_some(t)
    }
}

/// Axis-aligned bounding box for intersection testing
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AABB {
    /// Minimum corner of the bounding box
    pub min: Vector3<f32>,
    /// Maximum corner of the bounding box
    pub max: Vector3<f32>,
}

impl AABB {
    pub fn new(min: Vector3<f32>, max: Vector3<f32>) -> Self {
        Self { min, max }
    }

    /// Create AABB from a set of vertices
    pub fn from_vertices(vertices: &[[f32; 3]]) -> Self {
        let Some(first) = vertices.first() else {
            return Self::new(Vector3::zero(), Vector3::zero());
        };

        let mut min = Vector3::from(*first);
        let mut max = min;
        for vertex in vertices.iter().skip(1) {
            min.x = min.x.min(vertex[0]);
            min.y = min.y.min(vertex[1]);
            min.z = min.z.min(vertex[2]);
            max.x = max.x.max(vertex[0]);
            max.y = max.y.max(vertex[1]);
            max.z = max.z.max(vertex[2]);
        }

        Self::new(min, max)
    }

    pub fn center(&self) -> Vector3<f32> {
        (self.min + self.max) * 0.5
    }

    /// Smallest box containing both boxes
    pub fn union(&self, other: &AABB) -> Self {
        Self::new(
            Vector3::new(
                self.min.x.min(other.min.x),
                self.min.y.min(other.min.y),
                self.min.z.min(other.min.z),
            ),
            Vector3::new(
                self.max.x.max(other.max.x),
                self.max.y.max(other.max.y),
                self.max.z.max(other.max.z),
            ),
        )
    }

    /// Box scaled per axis about `pivot`
    pub fn scaled_about(&self, pivot: Vector3<f32>, scale: Vector3<f32>) -> Self {
        let a = pivot + (self.min - pivot).mul_element_wise(scale);
        let b = pivot + (self.max - pivot).mul_element_wise(scale);
        Self::new(
            Vector3::new(a.x.min(b.x), a.y.min(b.y), a.z.min(b.z)),
            Vector3::new(a.x.max(b.x), a.y.max(b.y), a.z.max(b.z)),
        )
    }

    /// Test ray-AABB intersection (slab method)
    /// Returns the distance to intersection point, or None if no intersection
    pub fn intersect_ray(&self, ray: &Ray) -> Option<f32> {
        let inv_dir = Vector3::new(
            1.0 / ray.direction.x,
            1.0 / ray.direction.y,
            1.0 / ray.direction.z,
        );

        let t_min = (self.min - ray.origin).mul_element_wise(inv_dir);
        let t_max = (self.max - ray.origin).mul_element_wise(inv_dir);

        let t_near = t_min.x.min(t_max.x).max(t_min.y.min(t_max.y)).max(t_min.z.min(t_max.z));
        let t_far = t_min.x.max(t_max.x).min(t_min.y.max(t_max.y)).min(t_min.z.max(t_max.z));

        if t_near <= t_far && t_far >= 0.0 {
            Some(if t_near >= 0.0 { t_near } else { t_far })
        } else {
            None
        }
    }
}

/// A prop as seen by the picker
#[derive(Debug, Clone, Copy)]
pub struct PickTarget<'a> {
    pub id: PropId,
    /// World bounds as currently displayed
    pub bounds: AABB,
    pub pivot: Vector3<f32>,
    /// Displayed scale relative to `triangles`
    pub scale: Vector3<f32>,
    /// Loaded geometry in world space
    pub triangles: &'a [[Vector3<f32>; 3]],
}

impl PickTarget<'_> {
    /// Distance along `ray` to the nearest displayed triangle
    pub fn intersect_ray(&self, ray: &Ray) -> Option<f32> {
        self.bounds.intersect_ray(ray)?;

        // Undo the display scale about the pivot. The direction is left
        // unnormalized so hit parameters stay world distances.
        let local = Ray {
            origin: self.pivot + (ray.origin - self.pivot).div_element_wise(self.scale),
            direction: ray.direction.div_element_wise(self.scale),
        };
        self.triangles
            .iter()
            .filter_map(|triangle| local.intersect_triangle(triangle))
            .reduce(f32::min)
    }
}

/// Result of a hit test
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PickResult {
    pub id: PropId,
    /// Distance from the ray origin to the intersection point
    pub distance: f32,
}

/// Returns the nearest target hit by `ray`
///
/// Ties keep the earliest target in iteration order.
pub fn nearest_hit<'a>(
    ray: &Ray,
    targets: impl IntoIterator<Item = PickTarget<'a>>,
) -> Option<PickResult> {
    let mut closest: Option<PickResult> = None;
    for target in targets {
        if let Some(distance) = target.intersect_ray(ray) {
            if closest.map_or(true, |best| distance < best.distance) {
                closest = Some(PickResult {
                    id: target.id,
                    distance,
                });
            }
        }
    }
    closest
}

/// Dirty-flagged hover picker
pub struct InteractionRaycaster {
    pointer: Vector2<f32>,
    dirty: bool,
    hovered: Option<PickResult>,
    tests_run: u64,
}

impl InteractionRaycaster {
    pub fn new() -> Self {
        Self {
            // Off-screen until the first pointer move
            pointer: Vector2::new(f32::MAX, f32::MAX),
            dirty: false,
            hovered: None,
            tests_run: 0,
        }
    }

    /// Records the pointer position in normalized device coordinates
    pub fn on_pointer_move(&mut self, ndc: Vector2<f32>) {
        self.pointer = ndc;
        self.dirty = true;
    }

    pub fn on_camera_changed(&mut self) {
        self.dirty = true;
    }

    /// Forgets the hovered prop; used when the published props change
    pub fn clear(&mut self) {
        self.hovered = None;
        self.dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn pointer(&self) -> Vector2<f32> {
        self.pointer
    }

    /// Runs a hit test if anything changed since the last one
    ///
    /// Returns whether a test was performed.
    pub fn maybe_update<'a>(
        &mut self,
        camera: &OrbitCamera,
        targets: impl IntoIterator<Item = PickTarget<'a>>,
    ) -> bool {
        if !self.dirty {
            return false;
        }

        self.hovered = if self.pointer_on_screen() {
            let ray = Ray::from_ndc(self.pointer, camera);
            nearest_hit(&ray, targets)
        } else {
            None
        };
        self.dirty = false;
        self.tests_run += 1;
        true
    }

    pub fn hovered(&self) -> Option<PropId> {
        self.hovered.map(|hit| hit.id)
    }

    /// Number of hit tests performed so far
    pub fn tests_run(&self) -> u64 {
        self.tests_run
    }

    fn pointer_on_screen(&self) -> bool {
        self.pointer.x.abs() <= 1.0 && self.pointer.y.abs() <= 1.0
    }
}

impl Default for InteractionRaycaster {
    fn default() -> Self {
        Self::new()
    }
}
