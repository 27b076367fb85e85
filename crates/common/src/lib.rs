//! Shared types for the PartyCube viewport.
//!
//! Everything in here is plain data plus pure math: no GPU handles, no window
//! state. The camera, picking and renderer crates build on these.

mod geometry;
mod types;

pub use geometry::{Aabb, PickResult, Ray, ray_aabb, ray_sphere};
pub use types::{Color, Transform};
