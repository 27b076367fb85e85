use std::collections::BTreeMap;

use glam::Mat4;
use partycube_common::Color;

use crate::backend::{
    DrawCall, ProgramId, RenderBackend, UniformLocation, UniformValue, ViewportRect,
};
use crate::shader::{COLOR_UNIFORM, MVP_UNIFORM, ShaderStage};

/// Program as seen by the recording backend.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordedProgram {
    pub shaders: Vec<(ShaderStage, String)>,
    pub attributes: Vec<(u32, String)>,
    pub linked: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedDraw {
    pub vertex_count: usize,
    pub model_view_projection: Option<Mat4>,
    pub color: Option<Color>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedFrame {
    pub program: ProgramId,
    pub clear_color: Color,
    pub draws: Vec<RecordedDraw>,
}

/// In-memory backend that records every call instead of talking to a GPU.
///
/// Uniform locations resolve when any attached shader mentions the uniform
/// name, mirroring how a real compiler only reports declared uniforms. Compile
/// and link failures can be injected to exercise diagnostic handling.
#[derive(Debug, Default)]
pub struct RecordingBackend {
    next_program: u32,
    programs: BTreeMap<ProgramId, RecordedProgram>,
    deleted: Vec<ProgramId>,
    compile_failures: BTreeMap<ShaderStage, String>,
    link_failure: Option<String>,
    viewports: Vec<ViewportRect>,
    frames: Vec<RecordedFrame>,
    current: Option<RecordedFrame>,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make compilation of `stage` report `message`.
    pub fn fail_compile(mut self, stage: ShaderStage, message: impl Into<String>) -> Self {
        self.compile_failures.insert(stage, message.into());
        self
    }

    /// Make linking report `message` and leave the program unlinked.
    pub fn fail_link(mut self, message: impl Into<String>) -> Self {
        self.link_failure = Some(message.into());
        self
    }

    pub fn program(&self, id: ProgramId) -> Option<&RecordedProgram> {
        self.programs.get(&id)
    }

    pub fn program_count(&self) -> usize {
        self.programs.len()
    }

    pub fn deleted_programs(&self) -> &[ProgramId] {
        &self.deleted
    }

    pub fn viewports(&self) -> &[ViewportRect] {
        &self.viewports
    }

    /// Frames that reached `present`.
    pub fn frames(&self) -> &[RecordedFrame] {
        &self.frames
    }

    pub fn last_frame(&self) -> Option<&RecordedFrame> {
        self.frames.last()
    }
}

impl RenderBackend for RecordingBackend {
    fn create_program(&mut self) -> ProgramId {
        let id = ProgramId(self.next_program);
        self.next_program += 1;
        self.programs.insert(id, RecordedProgram::default());
        id
    }

    fn compile_shader(
        &mut self,
        program: ProgramId,
        stage: ShaderStage,
        source: &str,
    ) -> Option<String> {
        let Some(entry) = self.programs.get_mut(&program) else {
            return Some(format!("unknown program {}", program.0));
        };
        entry.shaders.push((stage, source.to_string()));
        self.compile_failures.get(&stage).cloned()
    }

    fn bind_attribute(&mut self, program: ProgramId, slot: u32, name: &str) {
        if let Some(entry) = self.programs.get_mut(&program) {
            entry.attributes.push((slot, name.to_string()));
        }
    }

    fn link_program(&mut self, program: ProgramId) -> Option<String> {
        let Some(entry) = self.programs.get_mut(&program) else {
            return Some(format!("unknown program {}", program.0));
        };
        if let Some(message) = &self.link_failure {
            return Some(message.clone());
        }
        entry.linked = true;
        None
    }

    fn uniform_location(&self, program: ProgramId, name: &str) -> Option<UniformLocation> {
        let entry = self.programs.get(&program)?;
        if !entry.linked {
            return None;
        }
        if !entry.shaders.iter().any(|(_, source)| source.contains(name)) {
            return None;
        }
        let slot = match name {
            MVP_UNIFORM => 0,
            COLOR_UNIFORM => 1,
            _ => 2,
        };
        Some(UniformLocation(slot))
    }

    fn set_viewport(&mut self, rect: ViewportRect) {
        self.viewports.push(rect);
    }

    fn begin_frame(&mut self, program: ProgramId, clear_color: Color) {
        self.current = Some(RecordedFrame {
            program,
            clear_color,
            draws: Vec::new(),
        });
    }

    fn draw(&mut self, call: &DrawCall<'_>) {
        let Some(frame) = self.current.as_mut() else {
            return;
        };
        let mut draw = RecordedDraw {
            vertex_count: call.vertices.len(),
            model_view_projection: None,
            color: None,
        };
        for write in call.uniforms {
            match write.value {
                UniformValue::Mat4(m) => draw.model_view_projection = Some(m),
                UniformValue::Color(c) => draw.color = Some(c),
            }
        }
        frame.draws.push(draw);
    }

    fn present(&mut self) {
        if let Some(frame) = self.current.take() {
            self.frames.push(frame);
        }
    }

    fn delete_program(&mut self, program: ProgramId) {
        if self.programs.remove(&program).is_some() {
            self.deleted.push(program);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::UniformWrite;
    use glam::Vec3;

    #[test]
    fn uniforms_resolve_only_when_declared_and_linked() {
        let mut backend = RecordingBackend::new();
        let program = backend.create_program();
        backend.compile_shader(program, ShaderStage::Vertex, "uniform modelview;");
        assert_eq!(backend.uniform_location(program, "modelview"), None);

        assert_eq!(backend.link_program(program), None);
        assert_eq!(
            backend.uniform_location(program, "modelview"),
            Some(UniformLocation(0))
        );
        assert_eq!(backend.uniform_location(program, "col"), None);
    }

    #[test]
    fn injected_failures_are_reported() {
        let mut backend = RecordingBackend::new()
            .fail_compile(ShaderStage::Fragment, "syntax error")
            .fail_link("missing entry point");
        let program = backend.create_program();
        assert_eq!(backend.compile_shader(program, ShaderStage::Vertex, ""), None);
        assert_eq!(
            backend.compile_shader(program, ShaderStage::Fragment, ""),
            Some("syntax error".to_string())
        );
        assert_eq!(
            backend.link_program(program),
            Some("missing entry point".to_string())
        );
        assert!(!backend.program(program).unwrap().linked);
    }

    #[test]
    fn frames_are_recorded_on_present() {
        let mut backend = RecordingBackend::new();
        let program = backend.create_program();
        backend.begin_frame(program, Color::WHITE);
        let vertices = [Vec3::ZERO; 3];
        let uniforms = [UniformWrite {
            location: UniformLocation(1),
            value: UniformValue::Color(Color::RED),
        }];
        backend.draw(&DrawCall {
            vertices: &vertices,
            uniforms: &uniforms,
        });
        assert!(backend.frames().is_empty());
        backend.present();

        let frame = backend.last_frame().unwrap();
        assert_eq!(frame.draws.len(), 1);
        assert_eq!(frame.draws[0].vertex_count, 3);
        assert_eq!(frame.draws[0].color, Some(Color::RED));
        assert_eq!(frame.draws[0].model_view_projection, None);
    }

    #[test]
    fn delete_is_recorded_once() {
        let mut backend = RecordingBackend::new();
        let program = backend.create_program();
        backend.delete_program(program);
        backend.delete_program(program);
        assert_eq!(backend.deleted_programs(), &[program]);
        assert_eq!(backend.program_count(), 0);
    }
}
