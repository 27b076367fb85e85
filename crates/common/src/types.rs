use glam::{Quat, Vec3, Vec4};
use serde::{Deserialize, Serialize};

/// Position and orientation of a viewer in world space.
///
/// The rotation is kept unit length: it only changes through [`Transform::rotate`],
/// which renormalizes after every composition. The basis vectors are derived
/// on demand so they can never drift away from the rotation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    rotation: Quat,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
        }
    }
}

impl Transform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Self::default()
        }
    }

    pub fn rotation(&self) -> Quat {
        self.rotation
    }

    /// Rotate by `degrees` around a world-space `axis`.
    ///
    /// The new rotation is applied on the left of the current one, so passing
    /// one of the transform's own basis vectors (e.g. [`Transform::right`])
    /// rotates about that local axis. A zero-length axis leaves the rotation
    /// untouched.
    pub fn rotate(&mut self, axis: Vec3, degrees: f32) {
        let Some(axis) = axis.try_normalize() else {
            return;
        };
        let delta = Quat::from_axis_angle(axis, degrees.to_radians());
        self.rotation = (delta * self.rotation).normalize();
    }

    /// Direction the transform looks along (`rotation * -Z`).
    pub fn forward(&self) -> Vec3 {
        self.rotation * Vec3::NEG_Z
    }

    /// Local +X in world space (`rotation * +X`).
    pub fn right(&self) -> Vec3 {
        self.rotation * Vec3::X
    }

    /// Up vector completing the right-handed basis: `right × forward`.
    pub fn up(&self) -> Vec3 {
        self.right().cross(self.forward())
    }

    /// Map a direction expressed in local axes into world space.
    pub fn to_world_direction(&self, local: Vec3) -> Vec3 {
        self.rotation * local
    }
}

/// Linear RGBA color used for clear colors and flat shading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const RED: Self = Self::rgba(1.0, 0.0, 0.0, 1.0);
    pub const YELLOW: Self = Self::rgba(1.0, 1.0, 0.0, 1.0);
    pub const WHITE: Self = Self::rgba(1.0, 1.0, 1.0, 1.0);
    /// Background color of the viewport.
    pub const VIEWPORT_CLEAR: Self = Self::rgba(0.36, 0.25, 0.94, 1.0);

    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub fn to_array(self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }

    pub fn to_vec4(self) -> Vec4 {
        Vec4::from_array(self.to_array())
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::WHITE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-5;

    #[test]
    fn transform_default_is_identity() {
        let t = Transform::default();
        assert_eq!(t.position, Vec3::ZERO);
        assert_eq!(t.rotation(), Quat::IDENTITY);
        assert!(t.forward().abs_diff_eq(Vec3::NEG_Z, EPS));
        assert!(t.right().abs_diff_eq(Vec3::X, EPS));
        assert!(t.up().abs_diff_eq(Vec3::Y, EPS));
    }

    #[test]
    fn yaw_quarter_turn_faces_negative_x() {
        let mut t = Transform::new();
        t.rotate(Vec3::Y, 90.0);
        assert!(t.forward().abs_diff_eq(Vec3::NEG_X, EPS));
        assert!(t.right().abs_diff_eq(Vec3::NEG_Z, EPS));
        assert!(t.up().abs_diff_eq(Vec3::Y, EPS));
    }

    #[test]
    fn rotating_about_own_right_keeps_right() {
        let mut t = Transform::new();
        t.rotate(Vec3::Y, 30.0);
        let right = t.right();
        t.rotate(right, 20.0);
        assert!(t.right().abs_diff_eq(right, EPS));
        assert!(t.forward().y > 0.0);
    }

    #[test]
    fn rotation_stays_unit_after_many_steps() {
        let mut t = Transform::new();
        for i in 0..10_000 {
            t.rotate(Vec3::Y, 0.37);
            let right = t.right();
            t.rotate(right, if i % 2 == 0 { 0.11 } else { -0.13 });
        }
        assert!((t.rotation().length() - 1.0).abs() < EPS);
        assert!((t.forward().length() - 1.0).abs() < 1e-4);
    }

    #[test]
    fn zero_axis_is_ignored() {
        let mut t = Transform::new();
        t.rotate(Vec3::ZERO, 45.0);
        assert_eq!(t.rotation(), Quat::IDENTITY);
    }

    #[test]
    fn color_array_order() {
        assert_eq!(Color::RED.to_array(), [1.0, 0.0, 0.0, 1.0]);
        assert_eq!(Color::YELLOW.to_vec4(), Vec4::new(1.0, 1.0, 0.0, 1.0));
    }
}
