use std::time::Instant;

use glam::{Mat4, UVec2, Vec2};
use partycube_common::{Color, PickResult, Ray};
use partycube_input::{InputState, KeyCode, MouseButton};

use crate::backend::{
    BuildStep, ProgramId, RenderBackend, ShaderDiagnostic, UniformLocations, ViewportRect,
};
use crate::camera::{Camera, PICK_BOUNDS};
use crate::config::{ProjectionConfig, ViewportConfig};
use crate::error::RenderError;
use crate::renderable::{DebugCube, Frame, Renderable};
use crate::shader::{
    COLOR_UNIFORM, MVP_UNIFORM, POSITION_ATTRIBUTE, POSITION_SLOT, ShaderSources, ShaderStage,
    load_shader,
};
use crate::stats::TickTimer;

/// Surface size as floats, with 1.0 substituted for a zero dimension so the
/// aspect ratio and the screen-to-NDC mapping never divide by zero.
pub fn guarded_extent(size: UVec2) -> Vec2 {
    let width = if size.x == 0 { 1.0 } else { size.x as f32 };
    let height = if size.y == 0 { 1.0 } else { size.y as f32 };
    Vec2::new(width, height)
}

/// Result of one pick event.
#[derive(Debug, Clone, PartialEq)]
pub struct PickReport {
    /// Against the scene box, also shown on the debug cube.
    pub result: PickResult,
    pub ray: Ray,
    /// Indices of renderables reporting a collision, in draw order.
    pub renderables: Vec<usize>,
}

/// Drives one viewport: input sampling, camera, projection and drawing.
///
/// The host calls [`Renderer::tick`] at a fixed cadence and forwards window
/// events through the `on_*` methods. All work happens synchronously on the
/// caller's thread.
pub struct Renderer<B: RenderBackend> {
    backend: B,
    program: Option<ProgramId>,
    uniforms: UniformLocations,
    diagnostics: Vec<ShaderDiagnostic>,
    camera: Camera,
    input: InputState,
    renderables: Vec<Box<dyn Renderable>>,
    debug_cube: DebugCube,
    debug_ray_color: Color,
    view_matrix: Mat4,
    projection_matrix: Mat4,
    projection: ProjectionConfig,
    clear_color: Color,
    surface_size: UVec2,
    has_focus: bool,
    timer: TickTimer,
    frame_count: u64,
}

impl<B: RenderBackend> Renderer<B> {
    /// Read both shader sources and build the GPU program.
    ///
    /// A missing source aborts construction before anything is created on the
    /// backend. Compile and link problems are logged and kept in
    /// [`Renderer::shader_diagnostics`]; the renderer is still returned.
    pub fn new(
        backend: B,
        shaders: &dyn ShaderSources,
        config: &ViewportConfig,
        surface_size: UVec2,
    ) -> Result<Self, RenderError> {
        let vertex_source = load_shader(shaders, &config.vertex_shader)?;
        let fragment_source = load_shader(shaders, &config.fragment_shader)?;

        let camera = Camera::from_config(&config.camera);
        let extent = guarded_extent(surface_size);
        let mut renderer = Self {
            backend,
            program: None,
            uniforms: UniformLocations::default(),
            diagnostics: Vec::new(),
            view_matrix: camera.view_matrix(),
            projection_matrix: config.projection.matrix(extent.x / extent.y),
            camera,
            input: InputState::new(),
            renderables: Vec::new(),
            debug_cube: DebugCube::default(),
            debug_ray_color: Color::YELLOW,
            projection: config.projection,
            clear_color: config.clear_color,
            surface_size,
            has_focus: false,
            timer: TickTimer::default(),
            frame_count: 0,
        };
        renderer.build_program(&vertex_source, &fragment_source);
        renderer
            .backend
            .set_viewport(ViewportRect::from_size(surface_size.x, surface_size.y));
        Ok(renderer)
    }

    fn build_program(&mut self, vertex_source: &str, fragment_source: &str) {
        let program = self.backend.create_program();

        for (stage, source) in [
            (ShaderStage::Vertex, vertex_source),
            (ShaderStage::Fragment, fragment_source),
        ] {
            if let Some(log) = self.backend.compile_shader(program, stage, source) {
                self.report(BuildStep::Compile(stage), log);
            }
        }

        self.backend
            .bind_attribute(program, POSITION_SLOT, POSITION_ATTRIBUTE);
        if let Some(log) = self.backend.link_program(program) {
            self.report(BuildStep::Link, log);
        }

        self.uniforms = UniformLocations {
            model_view_projection: self.backend.uniform_location(program, MVP_UNIFORM),
            color: self.backend.uniform_location(program, COLOR_UNIFORM),
        };
        for (name, location) in [
            (MVP_UNIFORM, self.uniforms.model_view_projection),
            (COLOR_UNIFORM, self.uniforms.color),
        ] {
            if location.is_none() {
                tracing::warn!(uniform = name, "uniform not found in viewport program");
            }
        }

        self.program = Some(program);
        tracing::info!(
            program = program.0,
            diagnostics = self.diagnostics.len(),
            "viewport program built"
        );
    }

    fn report(&mut self, step: BuildStep, message: String) {
        match step {
            BuildStep::Compile(stage) => {
                tracing::warn!(%stage, "shader compile failed: {message}");
            }
            BuildStep::Link => tracing::warn!("shader link failed: {message}"),
        }
        self.diagnostics.push(ShaderDiagnostic { step, message });
    }

    /// Run one frame: sample input, move the camera if focused, draw.
    pub fn tick(&mut self) {
        let started = Instant::now();

        self.input.sample();
        if self.has_focus {
            self.camera.update(&self.input);
        }
        self.draw();

        self.timer.record(started.elapsed());
        self.frame_count += 1;
        tracing::trace!(frame = self.frame_count, "tick");
    }

    /// Clear, rebuild view and projection, draw every renderable and the
    /// debug cube, present.
    pub fn draw(&mut self) {
        let Some(program) = self.program else {
            return;
        };
        self.backend.begin_frame(program, self.clear_color);

        let extent = guarded_extent(self.surface_size);
        self.view_matrix = self.camera.view_matrix();
        self.projection_matrix = self.projection.matrix(extent.x / extent.y);

        let mut frame = Frame::new(
            &mut self.backend,
            self.uniforms,
            self.projection_matrix * self.view_matrix,
        );
        for renderable in &self.renderables {
            renderable.render(&mut frame);
        }
        self.debug_cube.draw(&mut frame, self.debug_ray_color);

        self.backend.present();
    }

    /// Cast a ray through a viewport pixel using the current projection and
    /// show the result on the debug cube.
    pub fn pick(&mut self, screen: Vec2) -> PickReport {
        let extent = guarded_extent(self.surface_size);
        let ray = self
            .camera
            .screen_ray(screen, extent, self.projection_matrix);
        let result = ray.intersects_aabb(&PICK_BOUNDS);
        self.debug_ray_color = result.color();

        let renderables: Vec<usize> = self
            .renderables
            .iter()
            .enumerate()
            .filter(|(_, r)| r.is_ray_colliding(&ray))
            .map(|(i, _)| i)
            .collect();

        tracing::debug!(
            x = screen.x,
            y = screen.y,
            hit = result.is_hit(),
            renderables = ?renderables,
            "pick"
        );
        PickReport {
            result,
            ray,
            renderables,
        }
    }

    /// Button press at viewport coordinates. A fresh press of the pick button
    /// casts a ray and returns its report, whether or not a tick ran since the
    /// last release.
    pub fn on_mouse_down(&mut self, x: f32, y: f32, button: MouseButton) -> Option<PickReport> {
        let fresh = self.input.set_mouse_button(button, true);
        if fresh && button == self.camera.bindings.pick {
            Some(self.pick(Vec2::new(x, y)))
        } else {
            None
        }
    }

    pub fn on_mouse_up(&mut self, button: MouseButton) {
        self.input.set_mouse_button(button, false);
    }

    /// Cursor position in the host's coordinates; sampled at the next tick.
    pub fn on_cursor_moved(&mut self, x: f32, y: f32) {
        self.input.set_cursor_position(Vec2::new(x, y));
    }

    /// Offset of the surface inside the host's cursor coordinate space.
    pub fn set_surface_origin(&mut self, x: f32, y: f32) {
        self.input.set_surface_origin(Vec2::new(x, y));
    }

    pub fn on_key_down(&mut self, key: KeyCode) {
        self.input.set_key(key, true);
    }

    pub fn on_key_up(&mut self, key: KeyCode) {
        self.input.set_key(key, false);
    }

    /// Update the viewport rectangle. The projection follows on the next draw.
    pub fn on_resize(&mut self, width: u32, height: u32) {
        self.surface_size = UVec2::new(width, height);
        self.backend
            .set_viewport(ViewportRect::from_size(width, height));
        tracing::debug!(width, height, "viewport resized");
    }

    pub fn on_focus_changed(&mut self, has_focus: bool) {
        self.has_focus = has_focus;
        if !has_focus {
            self.input.release_all();
        }
    }

    /// Append a renderable; draw order is insertion order. Returns its index.
    pub fn add_renderable(&mut self, renderable: Box<dyn Renderable>) -> usize {
        self.renderables.push(renderable);
        self.renderables.len() - 1
    }

    pub fn renderable_count(&self) -> usize {
        self.renderables.len()
    }

    /// Release the GPU program. Later ticks draw nothing.
    pub fn shutdown(&mut self) {
        if let Some(program) = self.program.take() {
            self.backend.delete_program(program);
            tracing::info!(program = program.0, "viewport program released");
        }
    }

    pub fn program(&self) -> Option<ProgramId> {
        self.program
    }

    pub fn uniform_locations(&self) -> UniformLocations {
        self.uniforms
    }

    pub fn shader_diagnostics(&self) -> &[ShaderDiagnostic] {
        &self.diagnostics
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }

    pub fn input(&self) -> &InputState {
        &self.input
    }

    pub fn view_matrix(&self) -> Mat4 {
        self.view_matrix
    }

    pub fn projection_matrix(&self) -> Mat4 {
        self.projection_matrix
    }

    pub fn debug_ray_color(&self) -> Color {
        self.debug_ray_color
    }

    pub fn surface_size(&self) -> UVec2 {
        self.surface_size
    }

    pub fn has_focus(&self) -> bool {
        self.has_focus
    }

    pub fn tick_timer(&self) -> &TickTimer {
        &self.timer
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }
}

impl<B: RenderBackend> Drop for Renderer<B> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recording::RecordingBackend;
    use glam::Vec3;
    use std::collections::BTreeMap;

    const VS: &str = "@location(0) vertexPos: vec3<f32>; uniforms.modelview";
    const FS: &str = "uniforms.col";

    fn sources() -> BTreeMap<String, String> {
        let mut map = BTreeMap::new();
        map.insert("vs.wgsl".to_string(), VS.to_string());
        map.insert("fs.wgsl".to_string(), FS.to_string());
        map
    }

    fn renderer_with(
        backend: RecordingBackend,
        width: u32,
        height: u32,
    ) -> Renderer<RecordingBackend> {
        Renderer::new(
            backend,
            &sources(),
            &ViewportConfig::default(),
            UVec2::new(width, height),
        )
        .unwrap()
    }

    fn renderer(width: u32, height: u32) -> Renderer<RecordingBackend> {
        renderer_with(RecordingBackend::new(), width, height)
    }

    #[test]
    fn setup_builds_program_once() {
        let r = renderer(800, 600);
        let program = r.program().unwrap();
        let recorded = r.backend().program(program).unwrap();
        assert!(recorded.linked);
        assert_eq!(recorded.shaders.len(), 2);
        assert_eq!(recorded.attributes, vec![(0, "vertexPos".to_string())]);
        assert_eq!(r.backend().program_count(), 1);
        assert!(r.shader_diagnostics().is_empty());
        assert!(r.uniform_locations().model_view_projection.is_some());
        assert!(r.uniform_locations().color.is_some());
        assert_eq!(
            r.backend().viewports(),
            &[ViewportRect::from_size(800, 600)]
        );
    }

    #[test]
    fn missing_shader_is_fatal() {
        let mut only_vertex = BTreeMap::new();
        only_vertex.insert("vs.wgsl".to_string(), VS.to_string());
        let err = Renderer::new(
            RecordingBackend::new(),
            &only_vertex,
            &ViewportConfig::default(),
            UVec2::new(10, 10),
        )
        .err()
        .unwrap();
        assert!(matches!(err, RenderError::ShaderSource { ref name, .. } if name == "fs.wgsl"));
    }

    #[test]
    fn compile_failure_is_not_fatal() {
        let backend = RecordingBackend::new().fail_compile(ShaderStage::Fragment, "bad token");
        let mut r = renderer_with(backend, 100, 100);
        assert_eq!(
            r.shader_diagnostics(),
            &[ShaderDiagnostic {
                step: BuildStep::Compile(ShaderStage::Fragment),
                message: "bad token".into(),
            }]
        );
        r.tick();
        assert_eq!(r.backend().frames().len(), 1);
    }

    #[test]
    fn link_failure_leaves_uniforms_unresolved_but_keeps_drawing() {
        let backend = RecordingBackend::new().fail_link("no entry point");
        let mut r = renderer_with(backend, 100, 100);
        assert_eq!(r.shader_diagnostics()[0].step, BuildStep::Link);
        assert_eq!(r.uniform_locations(), UniformLocations::default());

        r.tick();
        let draw = &r.backend().last_frame().unwrap().draws[0];
        assert_eq!(draw.vertex_count, 36);
        assert_eq!(draw.color, None);
    }

    #[test]
    fn draws_renderables_in_order_then_debug_cube() {
        let mut r = renderer(640, 480);
        let first = r.add_renderable(Box::new(DebugCube::new(Vec3::X * 100.0, 5.0, Color::RED)));
        let second = r.add_renderable(Box::new(DebugCube::new(
            Vec3::X * -100.0,
            5.0,
            Color::WHITE,
        )));
        assert_eq!((first, second), (0, 1));

        r.tick();
        let frame = r.backend().last_frame().unwrap();
        assert_eq!(frame.clear_color, Color::VIEWPORT_CLEAR);
        let colors: Vec<_> = frame.draws.iter().map(|d| d.color.unwrap()).collect();
        assert_eq!(colors, vec![Color::RED, Color::WHITE, Color::YELLOW]);
    }

    #[test]
    fn projection_uses_surface_aspect() {
        let mut r = renderer(800, 400);
        r.tick();
        assert_eq!(
            r.projection_matrix(),
            ProjectionConfig::default().matrix(2.0)
        );
        let frame = r.backend().last_frame().unwrap();
        let expected = r.projection_matrix() * r.view_matrix();
        assert_eq!(frame.draws[0].model_view_projection, Some(expected));
    }

    #[test]
    fn zero_sized_surface_substitutes_one() {
        let mut r = renderer(0, 0);
        r.tick();
        assert!(r.projection_matrix().is_finite());
        assert_eq!(
            r.projection_matrix(),
            ProjectionConfig::default().matrix(1.0)
        );

        r.on_resize(300, 0);
        r.tick();
        assert_eq!(
            r.projection_matrix(),
            ProjectionConfig::default().matrix(300.0)
        );
        assert!(r.on_mouse_down(0.0, 0.0, MouseButton::Left).is_some());
    }

    #[test]
    fn resize_defers_projection_to_next_draw() {
        let mut r = renderer(100, 100);
        r.tick();
        let before = r.projection_matrix();
        r.on_resize(200, 100);
        assert_eq!(r.projection_matrix(), before);
        assert_eq!(r.backend().viewports().last(), Some(&ViewportRect::from_size(200, 100)));
        r.tick();
        assert_ne!(r.projection_matrix(), before);
    }

    #[test]
    fn camera_moves_only_with_focus() {
        let mut r = renderer(100, 100);
        r.on_key_down(KeyCode::KeyW);
        r.tick();
        assert_eq!(r.camera().eye(), Vec3::ZERO);

        r.on_focus_changed(true);
        r.tick();
        assert!(r.camera().eye().abs_diff_eq(Vec3::new(0.0, 0.0, -50.0), 1e-4));

        r.on_key_up(KeyCode::KeyW);
        r.tick();
        assert!(r.camera().eye().abs_diff_eq(Vec3::new(0.0, 0.0, -50.0), 1e-4));
    }

    #[test]
    fn losing_focus_releases_keys() {
        let mut r = renderer(100, 100);
        r.on_focus_changed(true);
        r.on_key_down(KeyCode::KeyE);
        r.on_focus_changed(false);
        r.on_focus_changed(true);
        r.tick();
        assert_eq!(r.camera().eye(), Vec3::ZERO);
    }

    #[test]
    fn cursor_motion_is_sampled_before_camera_update() {
        let mut r = renderer(100, 100);
        r.on_focus_changed(true);
        r.on_cursor_moved(50.0, 50.0);
        r.tick();
        r.on_mouse_down(50.0, 50.0, MouseButton::Right);
        r.on_cursor_moved(80.0, 50.0);
        r.tick();
        assert!(r.camera().forward().x > 0.0);
    }

    #[test]
    fn surface_origin_is_subtracted() {
        let mut r = renderer(100, 100);
        r.set_surface_origin(20.0, 30.0);
        r.on_cursor_moved(25.0, 40.0);
        r.tick();
        assert_eq!(r.input().mouse_position(), Vec2::new(5.0, 10.0));
    }

    #[test]
    fn pick_colors_debug_cube() {
        let mut r = renderer(500, 500);
        r.camera_mut().set_position(Vec3::new(0.0, 0.0, 400.0));
        r.tick();
        assert_eq!(r.debug_ray_color(), Color::YELLOW);

        let report = r.on_mouse_down(250.0, 250.0, MouseButton::Left).unwrap();
        assert_eq!(report.result, PickResult::Hit);
        assert_eq!(r.debug_ray_color(), Color::RED);
        r.tick();
        let last_draw = r.backend().last_frame().unwrap().draws.last().unwrap().clone();
        assert_eq!(last_draw.color, Some(Color::RED));

        r.on_mouse_up(MouseButton::Left);
        r.tick();
        let report = r.on_mouse_down(0.0, 0.0, MouseButton::Left).unwrap();
        assert_eq!(report.result, PickResult::Miss);
        assert_eq!(r.debug_ray_color(), Color::YELLOW);
    }

    #[test]
    fn only_a_fresh_primary_press_picks() {
        let mut r = renderer(100, 100);
        assert!(r.on_mouse_down(50.0, 50.0, MouseButton::Right).is_none());
        assert!(r.on_mouse_down(50.0, 50.0, MouseButton::Left).is_some());
        r.tick();
        assert!(r.on_mouse_down(50.0, 50.0, MouseButton::Left).is_none());
    }

    #[test]
    fn re_press_before_next_tick_picks_again() {
        let mut r = renderer(100, 100);
        assert!(r.on_mouse_down(50.0, 50.0, MouseButton::Left).is_some());
        r.tick();
        r.on_mouse_up(MouseButton::Left);
        assert!(r.on_mouse_down(50.0, 50.0, MouseButton::Left).is_some());
    }

    #[test]
    fn pick_agrees_with_camera_cast() {
        let mut r = renderer(200, 100);
        r.camera_mut().set_position(Vec3::new(0.0, 0.0, 400.0));
        for screen in [Vec2::new(100.0, 50.0), Vec2::new(3.0, 97.0)] {
            let expected = r
                .camera()
                .cast_ray(screen, Vec2::new(200.0, 100.0), r.projection_matrix());
            assert_eq!(r.pick(screen).result, expected);
        }
    }

    #[test]
    fn pick_reports_colliding_renderables() {
        let mut r = renderer(200, 200);
        for z in [-1000.0, 1000.0, -3000.0] {
            let cube = DebugCube::new(Vec3::new(0.0, 0.0, z), 10.0, Color::RED);
            r.add_renderable(Box::new(cube));
        }

        let report = r.pick(Vec2::new(100.0, 100.0));
        assert_eq!(report.renderables, vec![0, 2]);
        assert!(report.ray.direction.abs_diff_eq(Vec3::NEG_Z, 1e-4));
    }

    #[test]
    fn shutdown_releases_program_once() {
        let mut r = renderer(100, 100);
        let program = r.program().unwrap();
        r.tick();
        r.shutdown();
        r.shutdown();
        assert_eq!(r.backend().deleted_programs(), &[program]);

        r.tick();
        assert_eq!(r.backend().frames().len(), 1);
        assert_eq!(r.frame_count(), 2);
    }

    #[test]
    fn ticks_are_timed() {
        let mut r = renderer(100, 100);
        for _ in 0..3 {
            r.tick();
        }
        assert_eq!(r.tick_timer().count(), 3);
        assert_eq!(r.frame_count(), 3);
    }
}
