//! Uniform block layout shared by `assets/shaders/vs.wgsl` and `fs.wgsl`.

use bytemuck::{Pod, Zeroable};
use partycube_render::{COLOR_UNIFORM, MVP_UNIFORM};

pub const VERTEX_ENTRY: &str = "vs_main";
pub const FRAGMENT_ENTRY: &str = "fs_main";

/// Mirror of `struct Uniforms` in WGSL.
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub(crate) struct UniformBlock {
    pub modelview: [[f32; 4]; 4],
    pub col: [f32; 4],
}

pub const UNIFORM_BLOCK_SIZE: u64 = std::mem::size_of::<UniformBlock>() as u64;

/// Byte offset of a named uniform inside the block.
pub fn uniform_offset(name: &str) -> Option<u32> {
    match name {
        MVP_UNIFORM => Some(std::mem::offset_of!(UniformBlock, modelview) as u32),
        COLOR_UNIFORM => Some(std::mem::offset_of!(UniformBlock, col) as u32),
        _ => None,
    }
}

/// Distance between per-draw blocks in the dynamic uniform buffer.
pub(crate) fn uniform_stride(min_alignment: u32) -> u64 {
    let align = u64::from(min_alignment.max(1));
    UNIFORM_BLOCK_SIZE.div_ceil(align) * align
}
