//! Input sampling for the viewport.
//!
//! The host forwards raw key, button and cursor events into an [`InputState`];
//! the renderer samples it once at the start of every tick and the camera reads
//! it afterwards in the same tick.
//!
//! # Invariants
//! - One writer (the tick) and one reader (the camera), never interleaved.
//! - Mouse delta is measured between two consecutive samples.

pub mod bindings;
pub mod state;

pub use bindings::MoveBindings;
pub use state::InputState;
pub use winit::event::MouseButton;
pub use winit::keyboard::KeyCode;
