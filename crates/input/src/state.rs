use std::collections::HashSet;

use glam::Vec2;
use winit::event::MouseButton;
use winit::keyboard::KeyCode;

/// Keyboard and mouse state as seen by one tick.
///
/// Key and button events may arrive at any time between ticks and are applied
/// immediately; the setters report whether the event was a fresh press.
/// Cursor movement is buffered: [`InputState::sample`] turns the latest
/// host-reported cursor position into a viewport-local position and a delta
/// since the previous sample.
#[derive(Debug, Default)]
pub struct InputState {
    keys_down: HashSet<KeyCode>,
    buttons_down: HashSet<MouseButton>,
    /// Top-left corner of the drawing surface in the host's cursor coordinates.
    surface_origin: Vec2,
    /// Latest cursor position reported by the host, not yet sampled.
    pending_cursor: Option<Vec2>,
    mouse_position: Vec2,
    mouse_delta: Vec2,
    sampled_once: bool,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true when `key` goes from up to down.
    pub fn set_key(&mut self, key: KeyCode, pressed: bool) -> bool {
        if pressed {
            self.keys_down.insert(key)
        } else {
            self.keys_down.remove(&key);
            false
        }
    }

    /// Returns true when `button` goes from up to down.
    pub fn set_mouse_button(&mut self, button: MouseButton, pressed: bool) -> bool {
        if pressed {
            self.buttons_down.insert(button)
        } else {
            self.buttons_down.remove(&button);
            false
        }
    }

    /// Record the cursor position in the host's coordinate space. It becomes
    /// visible to readers on the next [`InputState::sample`].
    pub fn set_cursor_position(&mut self, position: Vec2) {
        self.pending_cursor = Some(position);
    }

    /// Where the drawing surface starts in the host's cursor coordinates.
    pub fn set_surface_origin(&mut self, origin: Vec2) {
        self.surface_origin = origin;
    }

    /// Refresh the snapshot at the start of a tick.
    pub fn sample(&mut self) {
        let position = match self.pending_cursor.take() {
            Some(absolute) => absolute - self.surface_origin,
            None => self.mouse_position,
        };
        self.mouse_delta = if self.sampled_once {
            position - self.mouse_position
        } else {
            Vec2::ZERO
        };
        self.mouse_position = position;
        self.sampled_once = true;
    }

    /// Forget every held key and button, e.g. when the surface loses focus.
    pub fn release_all(&mut self) {
        if !self.keys_down.is_empty() || !self.buttons_down.is_empty() {
            tracing::trace!(
                keys = self.keys_down.len(),
                buttons = self.buttons_down.len(),
                "releasing held input"
            );
        }
        self.keys_down.clear();
        self.buttons_down.clear();
        self.mouse_delta = Vec2::ZERO;
    }

    pub fn is_key_pressed(&self, key: KeyCode) -> bool {
        self.keys_down.contains(&key)
    }

    pub fn is_button_down(&self, button: MouseButton) -> bool {
        self.buttons_down.contains(&button)
    }

    /// Viewport-local cursor position as of the last sample.
    pub fn mouse_position(&self) -> Vec2 {
        self.mouse_position
    }

    /// Cursor movement between the last two samples, in pixels.
    pub fn mouse_delta(&self) -> Vec2 {
        self.mouse_delta
    }
}
