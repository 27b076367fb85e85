use glam::{Mat4, Vec3};
use partycube_common::Color;

use crate::shader::ShaderStage;

/// Handle to a linked (or failed-to-link) GPU program owned by a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProgramId(pub u32);

/// Backend-specific address of a uniform inside a program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UniformLocation(pub u32);

/// Uniform slots the renderer writes every draw. `None` means the program
/// does not declare the uniform; draws still happen, without that value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UniformLocations {
    pub model_view_projection: Option<UniformLocation>,
    pub color: Option<UniformLocation>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    Mat4(Mat4),
    Color(Color),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UniformWrite {
    pub location: UniformLocation,
    pub value: UniformValue,
}

/// One flat-colored triangle list.
#[derive(Debug, Clone, Copy)]
pub struct DrawCall<'a> {
    /// Triangle list, three vertices per triangle.
    pub vertices: &'a [Vec3],
    pub uniforms: &'a [UniformWrite],
}

/// Pixel rectangle of the surface that draws land in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ViewportRect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl ViewportRect {
    pub fn from_size(width: u32, height: u32) -> Self {
        Self {
            x: 0,
            y: 0,
            width,
            height,
        }
    }
}

/// Which part of program construction a diagnostic came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildStep {
    Compile(ShaderStage),
    Link,
}

/// A compiler or linker message. Logged, never fatal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderDiagnostic {
    pub step: BuildStep,
    pub message: String,
}

/// The GPU operations the renderer needs.
///
/// Program construction follows the classic create / compile+attach /
/// bind-attribute / link / query-uniform sequence. Compile and link return the
/// backend's log when something went wrong; the caller decides what to do
/// with it. Frame methods are infallible: a backend that cannot draw (lost
/// surface, broken program) logs and skips rather than failing the tick.
pub trait RenderBackend {
    fn create_program(&mut self) -> ProgramId;

    /// Compile `source` for `stage` and attach it to `program`.
    fn compile_shader(&mut self, program: ProgramId, stage: ShaderStage, source: &str)
    -> Option<String>;

    /// Bind a vertex attribute name to a fixed slot. Takes effect at link.
    fn bind_attribute(&mut self, program: ProgramId, slot: u32, name: &str);

    fn link_program(&mut self, program: ProgramId) -> Option<String>;

    fn uniform_location(&self, program: ProgramId, name: &str) -> Option<UniformLocation>;

    fn set_viewport(&mut self, rect: ViewportRect);

    /// Start a frame: clear color and depth, bind `program`.
    fn begin_frame(&mut self, program: ProgramId, clear_color: Color);

    fn draw(&mut self, call: &DrawCall<'_>);

    /// Finish the frame and show it on the surface.
    fn present(&mut self);

    fn delete_program(&mut self, program: ProgramId);
}
