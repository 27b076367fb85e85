//! Viewport core: camera, picking and the per-tick render loop.
//!
//! The [`Renderer`] owns a [`RenderBackend`] and drives it from a single
//! [`Renderer::tick`] entry point that the host calls at a fixed cadence.
//! Nothing in here touches a window or a GPU directly; the wgpu backend lives
//! in its own crate and [`RecordingBackend`] stands in for it in tests.
//!
//! # Invariants
//! - Input is sampled before the camera reads it, within the same tick.
//! - The projection and view matrices are rebuilt on every draw.
//! - The GPU program is created once and released once.
//! - Nothing on the per-tick path returns an error or panics on bad input.

mod backend;
mod camera;
mod config;
mod error;
mod recording;
mod renderable;
mod renderer;
mod shader;
mod stats;

pub use backend::{
    BuildStep, DrawCall, ProgramId, RenderBackend, ShaderDiagnostic, UniformLocation,
    UniformLocations, UniformValue, UniformWrite, ViewportRect,
};
pub use camera::{Camera, PICK_BOUNDS, POLE_CLAMP_THRESHOLD, WORLD_UP};
pub use config::{CameraConfig, ProjectionConfig, ViewportConfig};
pub use error::RenderError;
pub use recording::{RecordedDraw, RecordedFrame, RecordedProgram, RecordingBackend};
pub use renderable::{DebugCube, Frame, Renderable};
pub use renderer::{PickReport, Renderer, guarded_extent};
pub use shader::{
    COLOR_UNIFORM, MVP_UNIFORM, POSITION_ATTRIBUTE, POSITION_SLOT, ShaderDir, ShaderSources,
    ShaderStage, load_shader,
};
pub use stats::TickTimer;

pub fn crate_info() -> &'static str {
    "partycube-render v0.1.0"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_loads() {
        assert!(crate_info().contains("render"));
    }
}
