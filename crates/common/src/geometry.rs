use glam::Vec3;

use crate::types::Color;

/// Outcome of a pick test. A miss is an ordinary result, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickResult {
    Hit,
    Miss,
}

impl PickResult {
    pub fn is_hit(self) -> bool {
        matches!(self, PickResult::Hit)
    }

    /// Color used to visualize the result on the debug cube.
    pub fn color(self) -> Color {
        match self {
            PickResult::Hit => Color::RED,
            PickResult::Miss => Color::YELLOW,
        }
    }
}

impl From<bool> for PickResult {
    fn from(hit: bool) -> Self {
        if hit { PickResult::Hit } else { PickResult::Miss }
    }
}

/// Half-line starting at `origin` and extending along `direction`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Ray {
    /// Build a ray with a normalized direction. A zero-length direction stays
    /// zero; the intersection tests tolerate it and simply report a miss or a
    /// containment hit.
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction: direction.normalize_or_zero(),
        }
    }

    pub fn intersects_aabb(&self, aabb: &Aabb) -> PickResult {
        ray_aabb(self.origin, self.direction, aabb.min, aabb.max)
    }

    pub fn intersects_sphere(&self, center: Vec3, radius: f32) -> PickResult {
        ray_sphere(self.origin, self.direction, center, radius)
    }
}

/// Axis-aligned bounding box given by its per-axis minimum and maximum corners.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Cube-like box centered on `center` spanning `half_extent` on each side.
    pub fn from_center_half_extent(center: Vec3, half_extent: Vec3) -> Self {
        Self {
            min: center - half_extent,
            max: center + half_extent,
        }
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Radius of the smallest sphere around [`Aabb::center`] enclosing the box.
    pub fn bounding_radius(&self) -> f32 {
        (self.max - self.min).length() * 0.5
    }
}

/// Slab-method ray/box test.
///
/// `1 / direction` is taken component-wise without special cases: a zero
/// component yields ±infinity, which orders correctly against finite
/// distances. The one case IEEE-754 cannot order is `0 * inf`, when the ray
/// runs parallel to a slab and starts exactly on one of its faces. That slab
/// is closed, so the ray lies inside it and the axis places no constraint.
pub fn ray_aabb(origin: Vec3, direction: Vec3, lower: Vec3, upper: Vec3) -> PickResult {
    let inv_dir = direction.recip();

    let t1 = (lower - origin) * inv_dir;
    let t2 = (upper - origin) * inv_dir;

    let mut tmin = f32::NEG_INFINITY;
    let mut tmax = f32::INFINITY;
    for axis in 0..3 {
        let (a, b) = (t1[axis], t2[axis]);
        if a.is_nan() || b.is_nan() {
            continue;
        }
        tmin = tmin.max(a.min(b));
        tmax = tmax.min(a.max(b));
    }

    // Box entirely behind the origin.
    if tmax < 0.0 {
        return PickResult::Miss;
    }
    // Slabs never overlap.
    if tmin > tmax {
        return PickResult::Miss;
    }
    PickResult::Hit
}

/// Ray/sphere test for bounding spheres. `direction` is expected to be
/// normalized.
pub fn ray_sphere(origin: Vec3, direction: Vec3, center: Vec3, radius: f32) -> PickResult {
    let to_origin = origin - center;
    let b = direction.dot(to_origin);
    let c = to_origin.length_squared() - radius * radius;
    let discriminant = b * b - c;
    if discriminant < 0.0 {
        return PickResult::Miss;
    }
    // Far intersection behind the origin means the whole sphere is behind it.
    let t_far = -b + discriminant.sqrt();
    PickResult::from(t_far >= 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_box() -> (Vec3, Vec3) {
        (Vec3::splat(-25.0), Vec3::splat(25.0))
    }

    #[test]
    fn ray_toward_box_hits() {
        let (lo, hi) = unit_box();
        let result = ray_aabb(Vec3::new(100.0, 0.0, 0.0), Vec3::NEG_X, lo, hi);
        assert_eq!(result, PickResult::Hit);
    }

    #[test]
    fn ray_away_from_box_misses() {
        let (lo, hi) = unit_box();
        let result = ray_aabb(Vec3::new(100.0, 0.0, 0.0), Vec3::X, lo, hi);
        assert_eq!(result, PickResult::Miss);
    }

    #[test]
    fn ray_from_inside_always_hits() {
        let (lo, hi) = unit_box();
        let directions = [
            Vec3::X,
            Vec3::NEG_X,
            Vec3::Y,
            Vec3::NEG_Y,
            Vec3::Z,
            Vec3::NEG_Z,
            Vec3::new(1.0, 1.0, 1.0).normalize(),
            Vec3::new(-0.3, 0.8, -0.2).normalize(),
        ];
        for origin in [Vec3::ZERO, Vec3::new(10.0, -20.0, 24.0)] {
            for dir in directions {
                assert_eq!(ray_aabb(origin, dir, lo, hi), PickResult::Hit, "{origin} {dir}");
            }
        }
    }

    #[test]
    fn axis_aligned_ray_inside_slab_hits() {
        let (lo, hi) = unit_box();
        // x and z components are zero: inverse direction is infinite there.
        let result = ray_aabb(Vec3::new(0.0, 100.0, 0.0), Vec3::NEG_Y, lo, hi);
        assert_eq!(result, PickResult::Hit);
        let result = ray_aabb(Vec3::new(10.0, 100.0, -24.0), Vec3::NEG_Y, lo, hi);
        assert_eq!(result, PickResult::Hit);
    }

    #[test]
    fn axis_aligned_ray_outside_slab_misses() {
        let (lo, hi) = unit_box();
        let result = ray_aabb(Vec3::new(30.0, 100.0, 0.0), Vec3::NEG_Y, lo, hi);
        assert_eq!(result, PickResult::Miss);
        let result = ray_aabb(Vec3::new(0.0, 100.0, -40.0), Vec3::NEG_Y, lo, hi);
        assert_eq!(result, PickResult::Miss);
    }

    #[test]
    fn axis_aligned_ray_pointing_away_misses() {
        let (lo, hi) = unit_box();
        let result = ray_aabb(Vec3::new(0.0, 100.0, 0.0), Vec3::Y, lo, hi);
        assert_eq!(result, PickResult::Miss);
    }

    #[test]
    fn oblique_ray_passing_beside_box_misses() {
        let (lo, hi) = unit_box();
        let dir = Vec3::new(-1.0, 0.0, 1.0).normalize();
        let result = ray_aabb(Vec3::new(100.0, 0.0, 0.0), dir, lo, hi);
        assert_eq!(result, PickResult::Miss);
    }

    #[test]
    fn zero_direction_does_not_panic() {
        let (lo, hi) = unit_box();
        let ray = Ray::new(Vec3::new(100.0, 0.0, 0.0), Vec3::ZERO);
        assert_eq!(ray.direction, Vec3::ZERO);
        assert_eq!(ray.intersects_aabb(&Aabb::new(lo, hi)), PickResult::Miss);
    }

    #[test]
    fn sphere_hit_and_miss() {
        let origin = Vec3::new(0.0, 0.0, 100.0);
        assert_eq!(ray_sphere(origin, Vec3::NEG_Z, Vec3::ZERO, 25.0), PickResult::Hit);
        assert_eq!(ray_sphere(origin, Vec3::Z, Vec3::ZERO, 25.0), PickResult::Miss);
        assert_eq!(ray_sphere(origin, Vec3::X, Vec3::ZERO, 25.0), PickResult::Miss);
        assert_eq!(ray_sphere(Vec3::ZERO, Vec3::X, Vec3::ZERO, 25.0), PickResult::Hit);
    }

    #[test]
    fn axis_aligned_ray_on_box_face_hits() {
        let (lo, hi) = unit_box();
        for x in [25.0, -25.0] {
            let result = ray_aabb(Vec3::new(x, 100.0, 0.0), Vec3::NEG_Y, lo, hi);
            assert_eq!(result, PickResult::Hit, "x = {x}");
        }
        let result = ray_aabb(Vec3::new(0.0, 100.0, 25.0), Vec3::NEG_Y, lo, hi);
        assert_eq!(result, PickResult::Hit);
        let result = ray_aabb(Vec3::new(25.001, 100.0, 0.0), Vec3::NEG_Y, lo, hi);
        assert_eq!(result, PickResult::Miss);
    }

    #[test]
    fn ray_along_box_edge_hits() {
        let (lo, hi) = unit_box();
        let result = ray_aabb(Vec3::new(25.0, 100.0, -25.0), Vec3::NEG_Y, lo, hi);
        assert_eq!(result, PickResult::Hit);
        let result = ray_aabb(Vec3::new(25.0, 100.0, -25.0), Vec3::Y, lo, hi);
        assert_eq!(result, PickResult::Miss);
    }

    #[test]
    fn aabb_bounding_sphere() {
        let aabb = Aabb::from_center_half_extent(Vec3::new(1.0, 2.0, 3.0), Vec3::splat(0.5));
        assert_eq!(aabb.center(), Vec3::new(1.0, 2.0, 3.0));
        assert!((aabb.bounding_radius() - 0.75_f32.sqrt()).abs() < 1e-6);

        let ray = Ray::new(Vec3::new(1.0, 2.0, 10.0), Vec3::NEG_Z);
        let hit = ray.intersects_sphere(aabb.center(), aabb.bounding_radius());
        assert_eq!(hit, PickResult::Hit);
    }

    #[test]
    fn pick_result_colors() {
        assert_eq!(PickResult::Hit.color(), Color::RED);
        assert_eq!(PickResult::Miss.color(), Color::YELLOW);
        assert!(PickResult::from(true).is_hit());
    }
}
