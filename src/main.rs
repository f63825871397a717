// Map walker: walk a 3D map plane, switch to a top-down overview and
// click out distances.
// One instanced draw for the plane, the avatar and the measurement pins,
// egui on top for the HUD.

mod engine;

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context;
use glam::{Mat4, Quat, Vec2, Vec3};
use wgpu::util::DeviceExt;
use winit::{
    event::{Event as WinitEvent, WindowEvent},
    event_loop::{ControlFlow, EventLoop},
    window::{CursorGrabMode, CursorIcon, Window},
};

use engine::config::MotionMode;
use engine::hud::{Hud, HudFrame, HudStats};
use engine::motion::ModelPlacement;
use engine::navigation::ViewMode;
use engine::picking::Viewport;
use engine::{CommandOutcome, InputCommand, InputState, ViewerConfig, ViewportState};

const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

// ============================================================================
// VERTEX DEFINITION
// ============================================================================

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct Vertex {
    position: [f32; 3],
}

impl Vertex {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[wgpu::VertexAttribute {
                offset: 0,
                shader_location: 0,
                format: wgpu::VertexFormat::Float32x3,
            }],
        }
    }
}

// ============================================================================
// INSTANCE DATA (per drawn box)
// ============================================================================

/// `params.x` = 1 marks the map plane, which the fragment shader paints with
/// the panned/zoomed map pattern instead of a flat color.
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct InstanceData {
    model: [[f32; 4]; 4],
    color: [f32; 4],
    params: [f32; 4],
}

impl InstanceData {
    const ATTRIBUTES: [wgpu::VertexAttribute; 6] = wgpu::vertex_attr_array![
        1 => Float32x4,
        2 => Float32x4,
        3 => Float32x4,
        4 => Float32x4,
        5 => Float32x4,
        6 => Float32x4,
    ];

    fn new(model: Mat4, color: [f32; 4]) -> Self {
        Self {
            model: model.to_cols_array_2d(),
            color,
            params: [0.0; 4],
        }
    }

    fn map_plane(model: Mat4) -> Self {
        Self {
            params: [1.0, 0.0, 0.0, 0.0],
            ..Self::new(model, [1.0; 4])
        }
    }

    fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<InstanceData>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

// Unit cube centered on the origin
const CUBE_VERTICES: &[Vertex] = &[
    Vertex { position: [-0.5, -0.5,  0.5] },
    Vertex { position: [ 0.5, -0.5,  0.5] },
    Vertex { position: [ 0.5,  0.5,  0.5] },
    Vertex { position: [-0.5,  0.5,  0.5] },
    Vertex { position: [-0.5, -0.5, -0.5] },
    Vertex { position: [ 0.5, -0.5, -0.5] },
    Vertex { position: [ 0.5,  0.5, -0.5] },
    Vertex { position: [-0.5,  0.5, -0.5] },
];

const CUBE_INDICES: &[u16] = &[
    0, 1, 2,  0, 2, 3,  // Front
    5, 4, 7,  5, 7, 6,  // Back
    4, 0, 3,  4, 3, 7,  // Left
    1, 5, 6,  1, 6, 2,  // Right
    3, 2, 6,  3, 6, 7,  // Top
    4, 5, 1,  4, 1, 0,  // Bottom
];

const MAX_INSTANCES: usize = 1024;

const AVATAR_COLOR: [f32; 4] = [0.2, 0.55, 0.95, 1.0];
const PIN_COLOR: [f32; 4] = [1.0, 0.78, 0.0, 1.0];
const PIN_HIGHLIGHT_COLOR: [f32; 4] = [1.0, 0.25, 0.25, 1.0];

// ============================================================================
// UNIFORM DATA
// ============================================================================

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct Uniforms {
    view_proj: [[f32; 4]; 4],
    /// offset.x, offset.y, scale, plane half-extent
    map_view: [f32; 4],
}

impl Uniforms {
    fn new() -> Self {
        Self {
            view_proj: Mat4::IDENTITY.to_cols_array_2d(),
            map_view: [0.0, 0.0, 1.0, 1.0],
        }
    }
}

// ============================================================================
// FRAME TIMING
// ============================================================================

struct FrameTimer {
    period: Duration,
    next_frame: Instant,
    last_update: Instant,
    frame_count: u32,
    frame_time_sum: f32,
    last_fps_update: Instant,
    fps: u32,
    frame_time_avg_ms: f32,
}

impl FrameTimer {
    fn new(target_fps: f32) -> Self {
        let now = Instant::now();
        Self {
            period: Duration::from_secs_f32(1.0 / target_fps),
            next_frame: now,
            last_update: now,
            frame_count: 0,
            frame_time_sum: 0.0,
            last_fps_update: now,
            fps: 0,
            frame_time_avg_ms: 0.0,
        }
    }

    /// Seconds since the previous call.
    fn tick(&mut self) -> f32 {
        let now = Instant::now();
        let dt = (now - self.last_update).as_secs_f32();
        self.last_update = now;

        self.frame_count += 1;
        self.frame_time_sum += dt;
        if (now - self.last_fps_update).as_secs_f32() >= 1.0 {
            self.fps = self.frame_count;
            self.frame_time_avg_ms = self.frame_time_sum * 1000.0 / self.frame_count as f32;
            log::debug!("FPS: {} | frame {:.2} ms", self.fps, self.frame_time_avg_ms);
            self.frame_count = 0;
            self.frame_time_sum = 0.0;
            self.last_fps_update = now;
        }
        dt
    }
}

// ============================================================================
// APPLICATION STATE
// ============================================================================

struct State {
    window: Arc<Window>,
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    size: winit::dpi::PhysicalSize<u32>,
    render_pipeline: wgpu::RenderPipeline,
    depth_view: wgpu::TextureView,
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    instance_buffer: wgpu::Buffer,
    num_indices: u32,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,

    hud: Hud,
    input: InputState,
    viewer: ViewportState,
    placement: ModelPlacement,
    look_grabbed: bool,
    cursor_pressed: bool,
    timer: FrameTimer,
}

impl State {
    async fn new(window: Arc<Window>, viewer_config: ViewerConfig) -> anyhow::Result<Self> {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let surface = instance.create_surface(window.clone())?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("no compatible GPU adapter")?;

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: None,
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                    memory_hints: wgpu::MemoryHints::default(),
                },
                None,
            )
            .await
            .context("failed to open GPU device")?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first().copied())
            .context("surface reports no formats")?;

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: surface_caps.present_modes[0],
            alpha_mode: surface_caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };

        surface.configure(&device, &config);
        let depth_view = create_depth_view(&device, &config);

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shader.wgsl").into()),
        });

        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Uniform Buffer"),
            contents: bytemuck::cast_slice(&[Uniforms::new()]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let uniform_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                }],
                label: Some("uniform_bind_group_layout"),
            });

        let uniform_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &uniform_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
            label: Some("uniform_bind_group"),
        });

        let render_pipeline_layout =
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Render Pipeline Layout"),
                bind_group_layouts: &[&uniform_bind_group_layout],
                push_constant_ranges: &[],
            });

        let render_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Render Pipeline"),
            layout: Some(&render_pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[Vertex::desc(), InstanceData::desc()],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: config.format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: Some(wgpu::Face::Back),
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState {
                count: 1,
                mask: !0,
                alpha_to_coverage_enabled: false,
            },
            multiview: None,
            cache: None,
        });

        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Vertex Buffer"),
            contents: bytemuck::cast_slice(CUBE_VERTICES),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Index Buffer"),
            contents: bytemuck::cast_slice(CUBE_INDICES),
            usage: wgpu::BufferUsages::INDEX,
        });

        let instance_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Instance Buffer"),
            size: (MAX_INSTANCES * std::mem::size_of::<InstanceData>()) as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let hud = Hud::new(&window, &device, surface_format);

        let mut input = InputState::new();
        input.scale_factor = window.scale_factor();

        let timer = FrameTimer::new(viewer_config.window.target_fps);
        let mut viewer = ViewportState::new(viewer_config, viewport_of(&window));
        let load_height = viewer
            .take_model_reload()
            .unwrap_or(viewer.config().avatar.big_load_height);

        Ok(Self {
            window,
            surface,
            device,
            queue,
            config,
            size,
            render_pipeline,
            depth_view,
            vertex_buffer,
            index_buffer,
            instance_buffer,
            num_indices: CUBE_INDICES.len() as u32,
            uniform_buffer,
            uniform_bind_group,
            hud,
            input,
            viewer,
            placement: ModelPlacement::unit_box(load_height),
            look_grabbed: false,
            cursor_pressed: false,
            timer,
        })
    }

    fn resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        self.viewer.set_viewport(viewport_of(&self.window));
        if new_size.width > 0 && new_size.height > 0 {
            self.size = new_size;
            self.config.width = new_size.width;
            self.config.height = new_size.height;
            self.surface.configure(&self.device, &self.config);
            self.depth_view = create_depth_view(&self.device, &self.config);
        }
    }

    /// Route one command. Returns false when the app should exit.
    fn handle_command(&mut self, command: InputCommand) -> bool {
        match command {
            InputCommand::Exit => return false,
            InputCommand::ToggleStats => self.hud.toggle_stats(),
            command => {
                let outcome = self.viewer.apply(command);
                if outcome != CommandOutcome::Unchanged {
                    log::trace!("{command:?} -> {outcome:?}");
                }
            }
        }
        self.sync_cursor();
        true
    }

    /// Mirror the core's capture and pressed state onto the OS cursor.
    fn sync_cursor(&mut self) {
        let captured = self.viewer.is_look_captured();
        if captured != self.look_grabbed {
            let result = if captured {
                self.window
                    .set_cursor_grab(CursorGrabMode::Locked)
                    .or_else(|_| self.window.set_cursor_grab(CursorGrabMode::Confined))
            } else {
                self.window.set_cursor_grab(CursorGrabMode::None)
            };
            if let Err(e) = result {
                log::warn!("cursor grab change failed: {e}");
            }
            self.window.set_cursor_visible(!captured);
            self.look_grabbed = captured;
        }

        let pressed = self.viewer.primary_pressed();
        if let Some(icon) = cursor_icon_change(self.cursor_pressed, pressed) {
            self.window.set_cursor(icon);
            self.cursor_pressed = pressed;
        }
    }

    fn update(&mut self) {
        let dt = self.timer.tick();
        self.viewer.update(dt, self.input.movement_keys());

        if let Some(load_height) = self.viewer.take_model_reload() {
            self.placement = ModelPlacement::unit_box(load_height);
            log::info!("avatar model reloaded at height {load_height}");
        }
    }

    fn build_instances(&self) -> Vec<InstanceData> {
        let map = &self.viewer.config().map;
        let mut instances = Vec::new();

        // Thin slab so the top face sits on y = 0.
        let plane = Mat4::from_scale_rotation_translation(
            Vec3::new(map.plane_size(), 0.02, map.plane_size()),
            Quat::IDENTITY,
            Vec3::new(0.0, -0.01, 0.0),
        );
        instances.push(InstanceData::map_plane(plane));

        if self.viewer.motion_mode() == MotionMode::Avatar {
            instances.push(InstanceData::new(
                self.viewer.avatar_transform(&self.placement),
                AVATAR_COLOR,
            ));
        }

        if self.viewer.mode() == ViewMode::Overview && !self.viewer.measurements().is_empty() {
            let highlight = self.viewer.measurements().last_index();
            for (i, pin) in self.viewer.pin_positions().into_iter().enumerate() {
                let color = if Some(i) == highlight { PIN_HIGHLIGHT_COLOR } else { PIN_COLOR };
                let needle = Mat4::from_scale_rotation_translation(
                    Vec3::new(0.04, 0.6, 0.04),
                    Quat::IDENTITY,
                    pin + Vec3::Y * 0.3,
                );
                let head = Mat4::from_scale_rotation_translation(
                    Vec3::splat(0.2),
                    Quat::IDENTITY,
                    pin + Vec3::Y * 0.65,
                );
                instances.push(InstanceData::new(needle, color));
                instances.push(InstanceData::new(head, color));
            }
        }

        instances.truncate(MAX_INSTANCES);
        instances
    }

    fn render(&mut self) -> Result<(), wgpu::SurfaceError> {
        let output = self.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let instance_data = self.build_instances();
        self.queue.write_buffer(
            &self.instance_buffer,
            0,
            bytemuck::cast_slice(&instance_data),
        );

        let map_view = self.viewer.map_view();
        let uniforms = Uniforms {
            view_proj: self.viewer.view_projection().to_cols_array_2d(),
            map_view: [
                map_view.offset.x,
                map_view.offset.y,
                map_view.scale,
                self.viewer.config().map.half_extent,
            ],
        };
        self.queue.write_buffer(&self.uniform_buffer, 0, bytemuck::cast_slice(&[uniforms]));

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: 0.05,
                            g: 0.05,
                            b: 0.1,
                            a: 1.0,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            render_pass.set_pipeline(&self.render_pipeline);
            render_pass.set_bind_group(0, &self.uniform_bind_group, &[]);
            render_pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
            render_pass.set_vertex_buffer(1, self.instance_buffer.slice(..));
            render_pass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint16);
            render_pass.draw_indexed(0..self.num_indices, 0, 0..instance_data.len() as u32);
        }

        let overview = self.viewer.mode() == ViewMode::Overview;
        let points: &[Vec2] = if overview { self.viewer.measurements().points() } else { &[] };
        let distance_label = self.viewer.distance_label();
        let stats = self.hud.stats_visible.then(|| {
            let camera = self.viewer.camera();
            HudStats {
                fps: self.timer.fps,
                frame_time_avg_ms: self.timer.frame_time_avg_ms,
                resolution: (self.size.width, self.size.height),
                mode: if overview { "overview" } else { "walking" },
                camera_position: camera.position.into(),
                camera_yaw: camera.yaw,
                camera_pitch: camera.pitch,
                eye_height: self.viewer.eye_height(),
                measurement_points: self.viewer.measurements().len(),
                avatar_facing: format!("{:?} (frame {})", self.viewer.facing(), self.viewer.animation_frame()),
                avatar_position: self.viewer.avatar_position().into(),
                avatar_size: format!("{:?}", self.viewer.avatar_size()),
            }
        });
        let frame = HudFrame {
            hotspot: self.viewer.hotspot(),
            alternate_glyph: self.viewer.pin_shows_alternate(),
            pressed: self.viewer.primary_pressed(),
            points,
            highlight: if overview { self.viewer.measurements().last_index() } else { None },
            distance_label: &distance_label,
            stats: stats.as_ref(),
        };

        let screen_descriptor = egui_wgpu::ScreenDescriptor {
            size_in_pixels: [self.config.width, self.config.height],
            pixels_per_point: self.window.scale_factor() as f32,
        };
        self.hud.render(
            &self.device,
            &self.queue,
            &mut encoder,
            &self.window,
            &view,
            &screen_descriptor,
            &frame,
        );

        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();

        Ok(())
    }
}

fn create_depth_view(device: &wgpu::Device, config: &wgpu::SurfaceConfiguration) -> wgpu::TextureView {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Depth Texture"),
        size: wgpu::Extent3d {
            width: config.width,
            height: config.height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    texture.create_view(&wgpu::TextureViewDescriptor::default())
}

/// New cursor icon when the pressed state flips, None otherwise.
fn cursor_icon_change(shown_pressed: bool, pressed: bool) -> Option<CursorIcon> {
    match (shown_pressed, pressed) {
        (false, true) => Some(CursorIcon::Grabbing),
        (true, false) => Some(CursorIcon::Default),
        _ => None,
    }
}

/// Logical window size vs physical framebuffer size.
fn viewport_of(window: &Window) -> Viewport {
    let physical = window.inner_size();
    let logical = physical.to_logical::<f32>(window.scale_factor());
    Viewport::new(
        Vec2::new(logical.width, logical.height),
        Vec2::new(physical.width as f32, physical.height as f32),
    )
}

// ============================================================================
// MAIN
// ============================================================================

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let viewer_config = ViewerConfig::discover()?;

    let event_loop = EventLoop::new()?;

    let window_attributes = Window::default_attributes()
        .with_title(viewer_config.window.title.clone())
        .with_inner_size(winit::dpi::LogicalSize::new(
            viewer_config.window.width,
            viewer_config.window.height,
        ));

    let window = Arc::new(event_loop.create_window(window_attributes)?);

    let mut state = pollster::block_on(State::new(window.clone(), viewer_config))?;
    log::info!("map walker ready ({:?} motion)", state.viewer.motion_mode());

    event_loop.run(move |event, control_flow| {
        match event {
            WinitEvent::WindowEvent {
                ref event,
                window_id,
            } if window_id == window.id() => {
                let _ = state.hud.handle_window_event(&window, event);

                if let Some(command) = state.input.process_event(event) {
                    if !state.handle_command(command) {
                        control_flow.exit();
                        return;
                    }
                }

                match event {
                    WindowEvent::CloseRequested => control_flow.exit(),
                    WindowEvent::Resized(physical_size) => {
                        state.resize(*physical_size);
                    }
                    WindowEvent::ScaleFactorChanged { .. } => {
                        let size = state.window.inner_size();
                        state.resize(size);
                    }
                    WindowEvent::RedrawRequested => {
                        state.update();
                        match state.render() {
                            Ok(_) => {}
                            Err(wgpu::SurfaceError::Lost) => state.resize(state.size),
                            Err(wgpu::SurfaceError::OutOfMemory) => control_flow.exit(),
                            Err(e) => log::warn!("{:?}", e),
                        }
                    }
                    _ => {}
                }
            }
            WinitEvent::DeviceEvent { ref event, .. } => {
                if let Some(command) = state.input.process_device_event(event) {
                    state.handle_command(command);
                }
            }
            WinitEvent::AboutToWait => {
                // Frame cap: redraw once per period, sleep in between.
                let now = Instant::now();
                if now >= state.timer.next_frame {
                    window.request_redraw();
                    state.timer.next_frame = now + state.timer.period;
                }
                control_flow.set_control_flow(ControlFlow::WaitUntil(state.timer.next_frame));
            }
            _ => {}
        }
    })?;

    Ok(())
}
