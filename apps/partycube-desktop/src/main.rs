use anyhow::{Context, Result};
use clap::Parser;
use glam::{UVec2, Vec2};
use partycube_input::KeyCode;
use partycube_render::{Renderer, ShaderDir, ViewportConfig};
use partycube_render_wgpu::WgpuBackend;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, KeyEvent, StartCause, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::PhysicalKey;
use winit::window::{Window, WindowId};

/// Ticks between tick-time reports at debug level.
const STATS_EVERY: u64 = 300;

#[derive(Parser)]
#[command(name = "partycube-desktop", about = "Free-fly 3D viewport")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// JSON viewport configuration
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory holding vs.wgsl and fs.wgsl
    #[arg(long)]
    shader_dir: Option<PathBuf>,
}

struct ViewportApp {
    config: ViewportConfig,
    tick_interval: Duration,
    next_tick: Instant,
    window: Option<Arc<Window>>,
    cursor: Vec2,
    renderer: Option<Renderer<WgpuBackend>>,
    startup_error: Option<anyhow::Error>,
}

impl ViewportApp {
    fn new(config: ViewportConfig) -> Self {
        Self {
            tick_interval: config.tick_interval(),
            config,
            next_tick: Instant::now(),
            window: None,
            cursor: Vec2::ZERO,
            renderer: None,
            startup_error: None,
        }
    }

    fn start(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let attrs = Window::default_attributes()
            .with_title("PartyCube")
            .with_inner_size(PhysicalSize::new(1280u32, 720));
        let window = Arc::new(
            event_loop
                .create_window(attrs)
                .context("failed to create window")?,
        );

        let size = window.inner_size();
        let backend = WgpuBackend::new(window.clone())?;
        let shaders = ShaderDir::new(&self.config.shader_dir);
        let mut renderer = Renderer::new(
            backend,
            &shaders,
            &self.config,
            UVec2::new(size.width, size.height),
        )?;
        renderer.set_surface_origin(0.0, 0.0);
        renderer.on_focus_changed(window.has_focus());

        self.window = Some(window);
        self.renderer = Some(renderer);
        self.next_tick = Instant::now() + self.tick_interval;
        event_loop.set_control_flow(ControlFlow::WaitUntil(self.next_tick));
        Ok(())
    }

    fn tick(&mut self) {
        let Some(renderer) = &mut self.renderer else {
            return;
        };
        renderer.tick();
        if renderer.frame_count() % STATS_EVERY == 0 {
            let timer = renderer.tick_timer();
            tracing::debug!(
                frames = renderer.frame_count(),
                average = ?timer.average(),
                max = ?timer.max(),
                "tick timing"
            );
        }
    }
}

impl ApplicationHandler for ViewportApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        if let Err(e) = self.start(event_loop) {
            self.startup_error = Some(e);
            event_loop.exit();
        }
    }

    fn new_events(&mut self, event_loop: &ActiveEventLoop, cause: StartCause) {
        if let StartCause::ResumeTimeReached { .. } = cause {
            self.tick();
            let now = Instant::now();
            self.next_tick += self.tick_interval;
            if self.next_tick < now {
                self.next_tick = now + self.tick_interval;
            }
            event_loop.set_control_flow(ControlFlow::WaitUntil(self.next_tick));
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        let Some(renderer) = &mut self.renderer else {
            return;
        };

        match event {
            WindowEvent::CloseRequested => {
                renderer.shutdown();
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                renderer.on_resize(size.width, size.height);
            }
            WindowEvent::Focused(focused) => {
                renderer.on_focus_changed(focused);
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.cursor = Vec2::new(position.x as f32, position.y as f32);
                renderer.on_cursor_moved(self.cursor.x, self.cursor.y);
            }
            WindowEvent::MouseInput { state, button, .. } => match state {
                ElementState::Pressed => {
                    let cursor = self.cursor;
                    if let Some(report) = renderer.on_mouse_down(cursor.x, cursor.y, button) {
                        tracing::info!(
                            hit = report.result.is_hit(),
                            renderables = ?report.renderables,
                            "pick"
                        );
                    }
                }
                ElementState::Released => renderer.on_mouse_up(button),
            },
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(key),
                        state,
                        repeat: false,
                        ..
                    },
                ..
            } => {
                forward_key(renderer, key, state);
            }
            _ => {}
        }
    }
}

fn forward_key(renderer: &mut Renderer<WgpuBackend>, key: KeyCode, state: ElementState) {
    match state {
        ElementState::Pressed => renderer.on_key_down(key),
        ElementState::Released => renderer.on_key_up(key),
    }
}

fn load_config(cli: &Cli) -> Result<ViewportConfig> {
    let mut config = match &cli.config {
        Some(path) => ViewportConfig::load(path)?,
        None => ViewportConfig::default(),
    };
    if let Some(dir) = &cli.shader_dir {
        config.shader_dir = dir.clone();
    }
    Ok(config)
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    tracing::info!("partycube-desktop starting");

    let config = load_config(&cli)?;
    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Wait);

    let mut app = ViewportApp::new(config);
    event_loop.run_app(&mut app)?;

    match app.startup_error.take() {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
