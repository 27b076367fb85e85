use std::path::{Path, PathBuf};
use std::time::Duration;

use glam::Mat4;
use partycube_common::Color;
use serde::Deserialize;

use crate::error::RenderError;

/// Perspective projection parameters. Aspect ratio comes from the surface.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct ProjectionConfig {
    /// Vertical field of view in degrees.
    pub fov_degrees: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for ProjectionConfig {
    fn default() -> Self {
        Self {
            fov_degrees: 65.0,
            near: 100.0,
            far: 500_000.0,
        }
    }
}

impl ProjectionConfig {
    pub fn matrix(&self, aspect: f32) -> Mat4 {
        Mat4::perspective_rh(self.fov_degrees.to_radians(), aspect, self.near, self.far)
    }
}

/// Fly-camera tuning.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// World units moved per tick.
    pub move_speed: f32,
    /// Applied to `move_speed` while the sprint key is held.
    pub sprint_multiplier: f32,
    /// Degrees of rotation per pixel of mouse movement.
    pub look_sensitivity: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            move_speed: 50.0,
            sprint_multiplier: 10.0,
            look_sensitivity: 1.0,
        }
    }
}

/// Viewport settings. Every field has a default, so a config file only needs
/// to name what it changes.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ViewportConfig {
    pub shader_dir: PathBuf,
    pub vertex_shader: String,
    pub fragment_shader: String,
    /// Nominal spacing between ticks, in milliseconds.
    pub tick_interval_ms: u64,
    pub clear_color: Color,
    pub projection: ProjectionConfig,
    pub camera: CameraConfig,
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            shader_dir: PathBuf::from("assets/shaders"),
            vertex_shader: "vs.wgsl".into(),
            fragment_shader: "fs.wgsl".into(),
            tick_interval_ms: 16,
            clear_color: Color::VIEWPORT_CLEAR,
            projection: ProjectionConfig::default(),
            camera: CameraConfig::default(),
        }
    }
}

impl ViewportConfig {
    /// Load a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, RenderError> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path).map_err(|source| RenderError::Config {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&data)
    }

    pub fn from_json(data: &str) -> Result<Self, RenderError> {
        Ok(serde_json::from_str(data)?)
    }

    /// Tick spacing, never shorter than one millisecond.
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1))
    }
}
