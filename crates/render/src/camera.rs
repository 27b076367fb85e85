use glam::{Mat4, Vec2, Vec3, Vec4};
use partycube_common::{Aabb, PickResult, Ray, Transform};
use partycube_input::{InputState, MoveBindings};

use crate::config::CameraConfig;

pub const WORLD_UP: Vec3 = Vec3::Y;

/// Smallest allowed `dot(up, WORLD_UP)`. A pitch step that would push the
/// camera's up vector below this is reverted.
pub const POLE_CLAMP_THRESHOLD: f32 = 0.01;

/// World-space box that picking rays are tested against.
pub const PICK_BOUNDS: Aabb = Aabb {
    min: Vec3::splat(-25.0),
    max: Vec3::splat(25.0),
};

/// Free-fly camera driven by keyboard movement and right-drag mouse look.
///
/// Orientation is a quaternion held by a [`Transform`]; yaw turns about the
/// world up axis and pitch about the camera's current right axis, so the
/// camera never rolls. `eye` and `target` are refreshed after every update and
/// the view matrix is derived from them on demand.
#[derive(Debug, Clone)]
pub struct Camera {
    transform: Transform,
    eye: Vec3,
    target: Vec3,
    /// World units moved per update.
    pub move_speed: f32,
    pub sprint_multiplier: f32,
    /// Degrees of rotation per pixel of mouse movement.
    pub look_sensitivity: f32,
    pub bindings: MoveBindings,
}

impl Default for Camera {
    fn default() -> Self {
        Self::from_config(&CameraConfig::default())
    }
}

impl Camera {
    pub fn from_config(config: &CameraConfig) -> Self {
        let mut camera = Self {
            transform: Transform::default(),
            eye: Vec3::ZERO,
            target: Vec3::ZERO,
            move_speed: config.move_speed,
            sprint_multiplier: config.sprint_multiplier,
            look_sensitivity: config.look_sensitivity,
            bindings: MoveBindings::default(),
        };
        camera.sync_eye();
        camera
    }

    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    pub fn eye(&self) -> Vec3 {
        self.eye
    }

    pub fn target(&self) -> Vec3 {
        self.target
    }

    pub fn forward(&self) -> Vec3 {
        self.transform.forward()
    }

    pub fn right(&self) -> Vec3 {
        self.transform.right()
    }

    pub fn up(&self) -> Vec3 {
        self.transform.up()
    }

    pub fn set_position(&mut self, position: Vec3) {
        self.transform.position = position;
        self.sync_eye();
    }

    /// Apply one tick of input: mouse look first, then movement in the
    /// resulting orientation.
    pub fn update(&mut self, input: &InputState) {
        let direction = self.bindings.direction(input);

        if self.bindings.is_looking(input) {
            let delta = input.mouse_delta() * self.look_sensitivity;
            // Dragging right turns right, dragging down looks down.
            self.rotate(-delta.x, -delta.y);
        }

        let speed = if self.bindings.is_sprinting(input) {
            self.move_speed * self.sprint_multiplier
        } else {
            self.move_speed
        };

        let world_dir = self
            .transform
            .to_world_direction(direction.normalize_or_zero());
        self.transform.position += world_dir * speed;
        self.sync_eye();
    }

    /// Yaw about the world up axis, then pitch about the current right axis.
    /// The pitch is reverted if it would tip the camera over a pole. Returns
    /// whether the pitch was kept.
    pub fn rotate(&mut self, yaw_degrees: f32, pitch_degrees: f32) -> bool {
        self.transform.rotate(WORLD_UP, yaw_degrees);

        let right = self.transform.right();
        self.transform.rotate(right, pitch_degrees);

        let kept = self.transform.up().dot(WORLD_UP) >= POLE_CLAMP_THRESHOLD;
        if !kept {
            self.transform.rotate(right, -pitch_degrees);
        }
        self.sync_eye();
        kept
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.eye, self.target, WORLD_UP)
    }

    /// World-space ray from the eye through a pixel of the viewport.
    ///
    /// `viewport` must be non-zero on both axes; callers substitute 1.0 for a
    /// collapsed surface.
    pub fn screen_ray(&self, screen: Vec2, viewport: Vec2, projection: Mat4) -> Ray {
        let ndc = Vec3::new(
            2.0 * screen.x / viewport.x - 1.0,
            1.0 - 2.0 * screen.y / viewport.y,
            -1.0,
        );
        let clip = ndc.extend(1.0);

        let eye_space = projection.inverse() * clip;
        // Direction, not a point: look down -Z, no translation.
        let eye_dir = Vec4::new(eye_space.x, eye_space.y, -1.0, 0.0);

        let world_dir = (self.view_matrix().inverse() * eye_dir).truncate();
        Ray::new(self.eye, world_dir)
    }

    /// Pick against [`PICK_BOUNDS`] through a pixel of the viewport.
    pub fn cast_ray(&self, screen: Vec2, viewport: Vec2, projection: Mat4) -> PickResult {
        self.screen_ray(screen, viewport, projection)
            .intersects_aabb(&PICK_BOUNDS)
    }

    fn sync_eye(&mut self) {
        self.eye = self.transform.position;
        self.target = self.transform.position + self.transform.forward();
    }
}
