use std::collections::BTreeMap;
use std::sync::Arc;

use partycube_common::Color;
use partycube_render::{
    DrawCall, ProgramId, RenderBackend, RenderError, ShaderStage, UniformLocation, ViewportRect,
};
use winit::window::Window;

use crate::batch::FrameBatch;
use crate::shaders::{self, FRAGMENT_ENTRY, UNIFORM_BLOCK_SIZE, VERTEX_ENTRY};

const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;
const INITIAL_DRAWS: u64 = 64;
const INITIAL_VERTICES: u64 = 4096;
const VERTEX_SIZE: u64 = std::mem::size_of::<[f32; 3]>() as u64;

struct CompiledShader {
    module: wgpu::ShaderModule,
    source: String,
}

#[derive(Default)]
struct GpuProgram {
    shaders: BTreeMap<ShaderStage, CompiledShader>,
    attributes: Vec<(u32, String)>,
    pipeline: Option<wgpu::RenderPipeline>,
}

/// [`RenderBackend`] drawing into a winit window through wgpu.
pub struct WgpuBackend {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    depth_texture: wgpu::TextureView,
    bind_group_layout: wgpu::BindGroupLayout,
    pipeline_layout: wgpu::PipelineLayout,
    uniform_stride: u64,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
    uniform_capacity: u64,
    vertex_buffer: wgpu::Buffer,
    vertex_capacity: u64,
    programs: BTreeMap<ProgramId, GpuProgram>,
    next_program: u32,
    viewport: ViewportRect,
    batch: FrameBatch,
}

impl WgpuBackend {
    pub fn new(window: Arc<Window>) -> Result<Self, RenderError> {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        let surface = instance
            .create_surface(window)
            .map_err(|e| RenderError::Surface(e.to_string()))?;

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))
        .ok_or_else(|| RenderError::Surface("no compatible GPU adapter".to_string()))?;

        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("partycube_device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: Default::default(),
            },
            None,
        ))
        .map_err(|e| RenderError::Surface(e.to_string()))?;

        device.on_uncaptured_error(Box::new(|error| {
            tracing::error!("wgpu error: {error}");
        }));

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first())
            .copied()
            .ok_or_else(|| RenderError::Surface("surface reports no formats".to_string()))?;
        let alpha_mode = surface_caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("uniform_bind_group_layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: wgpu::BufferSize::new(UNIFORM_BLOCK_SIZE),
                },
                count: None,
            }],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("pipeline_layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let uniform_stride =
            shaders::uniform_stride(device.limits().min_uniform_buffer_offset_alignment);
        let uniform_buffer = create_uniform_buffer(&device, uniform_stride * INITIAL_DRAWS);
        let uniform_bind_group =
            create_uniform_bind_group(&device, &bind_group_layout, &uniform_buffer);
        let vertex_buffer = create_vertex_buffer(&device, INITIAL_VERTICES);
        let depth_texture = create_depth_texture(&device, config.width, config.height);

        tracing::info!(
            "GPU initialized with {} backend",
            adapter.get_info().backend.to_str()
        );

        Ok(Self {
            surface,
            device,
            queue,
            viewport: ViewportRect::from_size(config.width, config.height),
            config,
            depth_texture,
            bind_group_layout,
            pipeline_layout,
            uniform_stride,
            uniform_buffer,
            uniform_bind_group,
            uniform_capacity: INITIAL_DRAWS,
            vertex_buffer,
            vertex_capacity: INITIAL_VERTICES,
            programs: BTreeMap::new(),
            next_program: 0,
            batch: FrameBatch::new(uniform_stride),
        })
    }

    fn resize_surface(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        if width == self.config.width && height == self.config.height {
            return;
        }
        self.config.width = width;
        self.config.height = height;
        self.surface.configure(&self.device, &self.config);
        self.depth_texture = create_depth_texture(&self.device, width, height);
        tracing::debug!(width, height, "surface reconfigured");
    }

    /// Grow GPU buffers to fit `batch` and copy it over.
    fn upload(&mut self, batch: &FrameBatch) {
        let vertices = batch.vertices.len() as u64;
        if vertices > self.vertex_capacity {
            self.vertex_capacity = vertices.next_power_of_two();
            self.vertex_buffer = create_vertex_buffer(&self.device, self.vertex_capacity);
        }
        let draws = batch.draws.len() as u64;
        if draws > self.uniform_capacity {
            self.uniform_capacity = draws.next_power_of_two();
            self.uniform_buffer =
                create_uniform_buffer(&self.device, self.uniform_stride * self.uniform_capacity);
            self.uniform_bind_group = create_uniform_bind_group(
                &self.device,
                &self.bind_group_layout,
                &self.uniform_buffer,
            );
        }
        if !batch.vertices.is_empty() {
            self.queue
                .write_buffer(&self.vertex_buffer, 0, bytemuck::cast_slice(&batch.vertices));
        }
        if !batch.uniforms.is_empty() {
            self.queue
                .write_buffer(&self.uniform_buffer, 0, &batch.uniforms);
        }
    }

    /// Viewport rectangle clipped to the current surface. `None` when nothing
    /// of it is visible.
    fn clamped_viewport(&self) -> Option<(f32, f32, f32, f32)> {
        let x = self.viewport.x.max(0) as u32;
        let y = self.viewport.y.max(0) as u32;
        if x >= self.config.width || y >= self.config.height {
            return None;
        }
        let width = self.viewport.width.min(self.config.width - x);
        let height = self.viewport.height.min(self.config.height - y);
        if width == 0 || height == 0 {
            return None;
        }
        Some((x as f32, y as f32, width as f32, height as f32))
    }
}

impl RenderBackend for WgpuBackend {
    fn create_program(&mut self) -> ProgramId {
        let id = ProgramId(self.next_program);
        self.next_program += 1;
        self.programs.insert(id, GpuProgram::default());
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
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let module = self
            .device
            .create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(match stage {
                    ShaderStage::Vertex => "vertex_shader",
                    ShaderStage::Fragment => "fragment_shader",
                }),
                source: wgpu::ShaderSource::Wgsl(source.into()),
            });
        let error = pollster::block_on(self.device.pop_error_scope());
        entry.shaders.insert(
            stage,
            CompiledShader {
                module,
                source: source.to_string(),
            },
        );
        error.map(|e| e.to_string())
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
        let (Some(vertex), Some(fragment)) = (
            entry.shaders.get(&ShaderStage::Vertex),
            entry.shaders.get(&ShaderStage::Fragment),
        ) else {
            return Some("program needs a vertex and a fragment shader".to_string());
        };

        let mut problems = Vec::new();
        for (slot, name) in &entry.attributes {
            if !vertex.source.contains(name.as_str()) {
                problems.push(format!(
                    "attribute `{name}` (slot {slot}) is not declared by the vertex shader"
                ));
            }
        }

        // Every bound attribute reads the single position stream.
        let attributes: Vec<wgpu::VertexAttribute> = entry
            .attributes
            .iter()
            .map(|(slot, _)| wgpu::VertexAttribute {
                format: wgpu::VertexFormat::Float32x3,
                offset: 0,
                shader_location: *slot,
            })
            .collect();

        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let pipeline = self
            .device
            .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("viewport_pipeline"),
                layout: Some(&self.pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &vertex.module,
                    entry_point: Some(VERTEX_ENTRY),
                    compilation_options: Default::default(),
                    buffers: &[wgpu::VertexBufferLayout {
                        array_stride: VERTEX_SIZE,
                        step_mode: wgpu::VertexStepMode::Vertex,
                        attributes: &attributes,
                    }],
                },
                fragment: Some(wgpu::FragmentState {
                    module: &fragment.module,
                    entry_point: Some(FRAGMENT_ENTRY),
                    compilation_options: Default::default(),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: self.config.format,
                        blend: Some(wgpu::BlendState::REPLACE),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    cull_mode: None,
                    ..Default::default()
                },
                depth_stencil: Some(wgpu::DepthStencilState {
                    format: DEPTH_FORMAT,
                    depth_write_enabled: true,
                    depth_compare: wgpu::CompareFunction::Less,
                    stencil: Default::default(),
                    bias: Default::default(),
                }),
                multisample: Default::default(),
                multiview: None,
                cache: None,
            });
        match pollster::block_on(self.device.pop_error_scope()) {
            Some(error) => problems.push(error.to_string()),
            None => entry.pipeline = Some(pipeline),
        }

        if problems.is_empty() {
            None
        } else {
            Some(problems.join("\n"))
        }
    }

    fn uniform_location(&self, program: ProgramId, name: &str) -> Option<UniformLocation> {
        let entry = self.programs.get(&program)?;
        entry.pipeline.as_ref()?;
        if !entry.shaders.values().any(|s| s.source.contains(name)) {
            return None;
        }
        shaders::uniform_offset(name).map(UniformLocation)
    }

    fn set_viewport(&mut self, rect: ViewportRect) {
        self.viewport = rect;
        self.resize_surface(
            rect.width.saturating_add(rect.x.max(0) as u32),
            rect.height.saturating_add(rect.y.max(0) as u32),
        );
    }

    fn begin_frame(&mut self, program: ProgramId, clear_color: Color) {
        self.batch.begin(program, clear_color);
    }

    fn draw(&mut self, call: &DrawCall<'_>) {
        self.batch.push(call);
    }

    fn present(&mut self) {
        let batch = std::mem::replace(&mut self.batch, FrameBatch::new(self.uniform_stride));
        let Some(program) = batch.program else {
            return;
        };

        let output = match self.surface.get_current_texture() {
            Ok(t) => t,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                self.surface.configure(&self.device, &self.config);
                return;
            }
            Err(e) => {
                tracing::error!("surface error: {e}");
                return;
            }
        };
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        self.upload(&batch);

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("frame_encoder"),
            });
        {
            let [r, g, b, a] = batch.clear_color.to_array().map(f64::from);
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("viewport_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color { r, g, b, a }),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_texture,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                ..Default::default()
            });

            let pipeline = self
                .programs
                .get(&program)
                .and_then(|p| p.pipeline.as_ref());
            if let (Some(pipeline), Some((x, y, w, h))) = (pipeline, self.clamped_viewport()) {
                pass.set_viewport(x, y, w, h, 0.0, 1.0);
                pass.set_pipeline(pipeline);
                pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
                for draw in &batch.draws {
                    pass.set_bind_group(0, &self.uniform_bind_group, &[draw.uniform_offset]);
                    pass.draw(
                        draw.first_vertex..draw.first_vertex + draw.vertex_count,
                        0..1,
                    );
                }
            }
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();

        self.batch = batch;
        self.batch.clear();
    }

    fn delete_program(&mut self, program: ProgramId) {
        if self.programs.remove(&program).is_some() {
            tracing::debug!(program = program.0, "program released");
        }
    }
}

fn create_uniform_buffer(device: &wgpu::Device, size: u64) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("uniform_buffer"),
        size,
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

fn create_uniform_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    buffer: &wgpu::Buffer,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("uniform_bind_group"),
        layout,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                buffer,
                offset: 0,
                size: wgpu::BufferSize::new(UNIFORM_BLOCK_SIZE),
            }),
        }],
    })
}

fn create_vertex_buffer(device: &wgpu::Device, vertices: u64) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("vertex_buffer"),
        size: vertices.max(1) * VERTEX_SIZE,
        usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

fn create_depth_texture(device: &wgpu::Device, width: u32, height: u32) -> wgpu::TextureView {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("depth_texture"),
        size: wgpu::Extent3d {
            width: width.max(1),
            height: height.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    texture.create_view(&Default::default())
}
