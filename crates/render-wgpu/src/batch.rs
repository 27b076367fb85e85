use partycube_common::Color;
use partycube_render::{DrawCall, ProgramId, UniformValue};

use crate::shaders::UNIFORM_BLOCK_SIZE;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct BatchedDraw {
    pub first_vertex: u32,
    pub vertex_count: u32,
    pub uniform_offset: u32,
}

/// CPU-side copy of one frame: every draw's vertices packed into one buffer
/// and its uniforms into one stride-aligned block each.
#[derive(Debug)]
pub(crate) struct FrameBatch {
    pub program: Option<ProgramId>,
    pub clear_color: Color,
    pub vertices: Vec<[f32; 3]>,
    pub uniforms: Vec<u8>,
    pub draws: Vec<BatchedDraw>,
    stride: usize,
}

impl FrameBatch {
    pub fn new(stride: u64) -> Self {
        Self {
            program: None,
            clear_color: Color::VIEWPORT_CLEAR,
            vertices: Vec::new(),
            uniforms: Vec::new(),
            draws: Vec::new(),
            stride: stride.max(UNIFORM_BLOCK_SIZE) as usize,
        }
    }

    pub fn begin(&mut self, program: ProgramId, clear_color: Color) {
        self.clear();
        self.program = Some(program);
        self.clear_color = clear_color;
    }

    pub fn clear(&mut self) {
        self.program = None;
        self.vertices.clear();
        self.uniforms.clear();
        self.draws.clear();
    }

    /// Append a draw. Ignored outside `begin`, or when empty.
    pub fn push(&mut self, call: &DrawCall<'_>) {
        if self.program.is_none() || call.vertices.is_empty() {
            return;
        }
        let first_vertex = self.vertices.len() as u32;
        self.vertices.extend(call.vertices.iter().map(|v| v.to_array()));

        let uniform_offset = self.uniforms.len();
        self.uniforms.resize(uniform_offset + self.stride, 0);
        let block = &mut self.uniforms[uniform_offset..uniform_offset + self.stride];
        for write in call.uniforms {
            let start = write.location.0 as usize;
            match write.value {
                UniformValue::Mat4(m) => {
                    copy_into(block, start, bytemuck::bytes_of(&m.to_cols_array()));
                }
                UniformValue::Color(c) => {
                    copy_into(block, start, bytemuck::bytes_of(&c.to_array()));
                }
            }
        }

        self.draws.push(BatchedDraw {
            first_vertex,
            vertex_count: call.vertices.len() as u32,
            uniform_offset: uniform_offset as u32,
        });
    }
}

fn copy_into(block: &mut [u8], start: usize, bytes: &[u8]) {
    let end = start + bytes.len();
    if end > UNIFORM_BLOCK_SIZE as usize {
        tracing::warn!("uniform write at offset {start} overruns the uniform block");
        return;
    }
    block[start..end].copy_from_slice(bytes);
}
