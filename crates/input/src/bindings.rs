use glam::Vec3;
use winit::event::MouseButton;
use winit::keyboard::KeyCode;

use crate::state::InputState;

/// Key map for the fly camera.
#[derive(Debug, Clone)]
pub struct MoveBindings {
    pub forward: KeyCode,
    pub back: KeyCode,
    pub left: KeyCode,
    pub right: KeyCode,
    pub up: KeyCode,
    pub down: KeyCode,
    /// Multiplies the move speed while held.
    pub sprint: KeyCode,
    /// Mouse button that enables mouse look while held.
    pub look: MouseButton,
    /// Mouse button that casts a pick ray when pressed.
    pub pick: MouseButton,
}

impl Default for MoveBindings {
    fn default() -> Self {
        Self {
            forward: KeyCode::KeyW,
            back: KeyCode::KeyS,
            left: KeyCode::KeyA,
            right: KeyCode::KeyD,
            up: KeyCode::KeyE,
            down: KeyCode::KeyQ,
            sprint: KeyCode::ShiftLeft,
            look: MouseButton::Right,
            pick: MouseButton::Left,
        }
    }
}

impl MoveBindings {
    /// Sum of the local-space unit axes whose keys are held. Not normalized;
    /// opposite keys cancel out.
    pub fn direction(&self, input: &InputState) -> Vec3 {
        let mut dir = Vec3::ZERO;
        if input.is_key_pressed(self.forward) {
            dir += Vec3::NEG_Z;
        }
        if input.is_key_pressed(self.back) {
            dir += Vec3::Z;
        }
        if input.is_key_pressed(self.left) {
            dir += Vec3::NEG_X;
        }
        if input.is_key_pressed(self.right) {
            dir += Vec3::X;
        }
        if input.is_key_pressed(self.up) {
            dir += Vec3::Y;
        }
        if input.is_key_pressed(self.down) {
            dir += Vec3::NEG_Y;
        }
        dir
    }

    pub fn is_sprinting(&self, input: &InputState) -> bool {
        input.is_key_pressed(self.sprint)
    }

    pub fn is_looking(&self, input: &InputState) -> bool {
        input.is_button_down(self.look)
    }
}
