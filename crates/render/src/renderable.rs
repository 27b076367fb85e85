use glam::{Mat4, Vec3};
use partycube_common::{Aabb, Color, Ray};

use crate::backend::{DrawCall, RenderBackend, UniformLocations, UniformValue, UniformWrite};

/// Per-frame drawing context handed to every [`Renderable`].
pub struct Frame<'a> {
    backend: &'a mut dyn RenderBackend,
    uniforms: UniformLocations,
    view_projection: Mat4,
}

impl<'a> Frame<'a> {
    pub fn new(
        backend: &'a mut dyn RenderBackend,
        uniforms: UniformLocations,
        view_projection: Mat4,
    ) -> Self {
        Self {
            backend,
            uniforms,
            view_projection,
        }
    }

    pub fn view_projection(&self) -> Mat4 {
        self.view_projection
    }

    /// Draw a flat-colored triangle list placed in the world by `model`.
    pub fn draw_triangles(&mut self, model: Mat4, vertices: &[Vec3], color: Color) {
        let mvp = self.view_projection * model;
        let mut writes = Vec::with_capacity(2);
        if let Some(location) = self.uniforms.model_view_projection {
            writes.push(UniformWrite {
                location,
                value: UniformValue::Mat4(mvp),
            });
        }
        if let Some(location) = self.uniforms.color {
            writes.push(UniformWrite {
                location,
                value: UniformValue::Color(color),
            });
        }
        self.backend.draw(&DrawCall {
            vertices,
            uniforms: &writes,
        });
    }
}

/// Something the renderer draws every frame, in insertion order.
pub trait Renderable {
    fn render(&self, frame: &mut Frame<'_>);

    /// Whether a pick ray touches this object. Objects that cannot be picked
    /// keep the default.
    fn is_ray_colliding(&self, _ray: &Ray) -> bool {
        false
    }
}

/// Flat-shaded cube: 12 triangles around `center`.
#[derive(Debug, Clone)]
pub struct DebugCube {
    center: Vec3,
    half_extent: f32,
    pub color: Color,
    vertices: Vec<Vec3>,
}

impl Default for DebugCube {
    fn default() -> Self {
        Self::new(Vec3::ZERO, 25.0, Color::YELLOW)
    }
}

impl DebugCube {
    pub fn new(center: Vec3, half_extent: f32, color: Color) -> Self {
        Self {
            center,
            half_extent,
            color,
            vertices: cube_triangles(half_extent),
        }
    }

    pub fn center(&self) -> Vec3 {
        self.center
    }

    pub fn half_extent(&self) -> f32 {
        self.half_extent
    }

    pub fn bounds(&self) -> Aabb {
        Aabb::from_center_half_extent(self.center, Vec3::splat(self.half_extent))
    }

    pub fn vertices(&self) -> &[Vec3] {
        &self.vertices
    }

    /// Draw with an explicit color instead of [`DebugCube::color`].
    pub fn draw(&self, frame: &mut Frame<'_>, color: Color) {
        frame.draw_triangles(Mat4::from_translation(self.center), &self.vertices, color);
    }
}

impl Renderable for DebugCube {
    fn render(&self, frame: &mut Frame<'_>) {
        self.draw(frame, self.color);
    }

    fn is_ray_colliding(&self, ray: &Ray) -> bool {
        let bounds = self.bounds();
        ray.intersects_sphere(bounds.center(), bounds.bounding_radius())
            .is_hit()
            && ray.intersects_aabb(&bounds).is_hit()
    }
}

/// Non-indexed triangle list for an origin-centered cube, counter-clockwise
/// when seen from outside.
fn cube_triangles(half_extent: f32) -> Vec<Vec3> {
    let p = half_extent;
    #[rustfmt::skip]
    let corners = [
        // +Z face
        [-p, -p,  p], [ p, -p,  p], [ p,  p,  p], [-p,  p,  p],
        // -Z face
        [ p, -p, -p], [-p, -p, -p], [-p,  p, -p], [ p,  p, -p],
        // +X face
        [ p, -p,  p], [ p, -p, -p], [ p,  p, -p], [ p,  p,  p],
        // -X face
        [-p, -p, -p], [-p, -p,  p], [-p,  p,  p], [-p,  p, -p],
        // +Y face
        [-p,  p,  p], [ p,  p,  p], [ p,  p, -p], [-p,  p, -p],
        // -Y face
        [-p, -p, -p], [ p, -p, -p], [ p, -p,  p], [-p, -p,  p],
    ];
    corners
        .chunks_exact(4)
        .flat_map(|quad| [quad[0], quad[1], quad[2], quad[2], quad[3], quad[0]])
        .map(Vec3::from_array)
        .collect()
}
