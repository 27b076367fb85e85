//! wgpu backend for the viewport renderer.
//!
//! Implements [`partycube_render::RenderBackend`] on top of a wgpu surface:
//! the "program" is a render pipeline built from two WGSL modules, uniforms
//! live in one dynamically-offset uniform block per draw, and every frame is
//! recorded into a single render pass at `present`.
//!
//! # Invariants
//! - Shader and pipeline validation errors are reported, never panic.
//! - A program that failed to link draws nothing; the frame is still cleared.

mod batch;
mod gpu;
mod shaders;

pub use gpu::WgpuBackend;
pub use shaders::{FRAGMENT_ENTRY, UNIFORM_BLOCK_SIZE, VERTEX_ENTRY, uniform_offset};
