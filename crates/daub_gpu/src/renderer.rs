//! wgpu brush rasterizer
//!
//! [`PaintRenderer`] is the seam between the render thread's scheduling
//! logic and the GPU: everything behind it is only ever touched from the
//! render thread that owns the backend value. [`WgpuPaintRenderer`] keeps
//! the painting in a persistent painting-space canvas texture, stamps brush
//! dabs into it, and blits it to the surface through the composed
//! projection matrix.

use std::sync::Arc;

use daub_core::{Bitmap, Brush, Mat4, Size, Stroke, StrokePoint};
use daub_paint::Background;

use crate::error::RenderError;
use crate::shaders::{BLIT_SHADER, DAB_SHADER};

/// Maximum dab instances per draw; longer runs are chunked.
const MAX_DABS: usize = 4096;

/// Letterbox color outside the painting rect.
const SURFACE_CLEAR: wgpu::Color = wgpu::Color {
    r: 0.12,
    g: 0.12,
    b: 0.13,
    a: 1.0,
};

/// The GPU-context seam.
///
/// Implementations own all GPU resources for one surface binding and are
/// driven exclusively from the render thread. `release` is terminal and
/// called exactly once, at render-thread exit.
pub trait PaintRenderer: Send + 'static {
    /// Reallocate size-dependent buffers for a new surface size.
    fn set_buffer_size(&mut self, width: u32, height: u32) -> Result<(), RenderError>;

    /// Install the combined painting→clip projection for subsequent frames.
    fn set_projection(&mut self, projection: Mat4);

    /// Reset the canvas to the background, discarding stamped content.
    fn clear(&mut self, background: &Background);

    /// Stamp one run of consecutive stroke points with the given brush.
    ///
    /// `continues` marks a run re-anchored at the previously drawn point:
    /// its first point is not stamped again and the dab spacing phase
    /// carries over, so a stroke split across frames places its dabs
    /// exactly where an unbroken run would.
    fn draw_segment(&mut self, brush: &Brush, points: &[StrokePoint], continues: bool);

    /// Replay a committed stroke (used for full-repaint undo).
    fn draw_stroke(&mut self, stroke: &Stroke) {
        self.draw_segment(&stroke.brush, &stroke.points, false);
    }

    /// Composite the canvas to the surface and present the frame.
    fn present(&mut self) -> Result<(), RenderError>;

    /// Read back the current canvas content.
    fn snapshot(&mut self) -> Result<Bitmap, RenderError>;

    /// Release GPU resources. Idempotent; everything after it is rejected.
    fn release(&mut self);
}

/// One stamped dab, as laid out in the storage buffer.
#[repr(C)]
#[derive(Clone, Copy, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct DabInstance {
    center: [f32; 2],
    radius: f32,
    hardness: f32,
    color: [f32; 4],
}

#[repr(C)]
#[derive(Clone, Copy, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct CanvasUniforms {
    canvas_size: [f32; 2],
    _padding: [f32; 2],
}

#[repr(C)]
#[derive(Clone, Copy, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct BlitUniforms {
    projection: [f32; 16],
    painting_size: [f32; 2],
    _padding: [f32; 2],
}

/// Place dabs along a run of points at `spacing × radius` steps, returning
/// the leftover distance to the next dab.
///
/// With `carry: None` the run starts fresh and stamps its first point. With
/// `Some(c)` it continues a previous run whose end point opens this one:
/// the shared point is not stamped again and the walk resumes `c` into the
/// first pair, keeping dab placement identical to an unbroken run.
fn plan_dabs(
    brush: &Brush,
    points: &[StrokePoint],
    carry: Option<f32>,
    out: &mut Vec<DabInstance>,
) -> f32 {
    let base_radius = brush.radius();
    let color = brush.color.to_array();
    let dab = |p: StrokePoint, pressure: f32| DabInstance {
        center: [p.x, p.y],
        radius: (base_radius * pressure).max(0.5),
        hardness: brush.hardness,
        color,
    };
    let step = (brush.spacing * base_radius).max(0.5);

    let Some(&first) = points.first() else {
        return carry.unwrap_or(step);
    };
    let mut carry = match carry {
        Some(c) => c,
        None => {
            out.push(dab(first, first.pressure));
            step
        }
    };
    for pair in points.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        let len = a.position().distance(b.position());
        if len <= f32::EPSILON {
            continue;
        }
        let mut t = carry;
        while t <= len {
            let f = t / len;
            let p = StrokePoint::new(a.x + (b.x - a.x) * f, a.y + (b.y - a.y) * f);
            let pressure = a.pressure + (b.pressure - a.pressure) * f;
            out.push(dab(p, pressure));
            t += step;
        }
        carry = t - len;
    }
    carry
}

/// wgpu-backed [`PaintRenderer`] bound to one display surface.
pub struct WgpuPaintRenderer {
    #[allow(dead_code)]
    instance: wgpu::Instance,
    #[allow(dead_code)]
    adapter: wgpu::Adapter,
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    surface: wgpu::Surface<'static>,
    surface_config: wgpu::SurfaceConfiguration,

    canvas_texture: wgpu::Texture,
    canvas_width: u32,
    canvas_height: u32,
    painting_size: Size,

    dab_pipeline: wgpu::RenderPipeline,
    blit_pipeline: wgpu::RenderPipeline,
    dab_bind_group: wgpu::BindGroup,
    blit_bind_group: wgpu::BindGroup,
    canvas_uniforms: wgpu::Buffer,
    dab_buffer: wgpu::Buffer,
    blit_uniforms: wgpu::Buffer,

    projection: Mat4,
    pending_clear: Option<Background>,
    pending_dabs: Vec<DabInstance>,
    /// Leftover walk distance of the last run, consumed by continuations.
    stroke_carry: f32,
    released: bool,
}

impl WgpuPaintRenderer {
    /// Preferred backend for the current platform; a single driver stack
    /// keeps memory down compared to initializing all of them.
    fn preferred_backends() -> wgpu::Backends {
        #[cfg(target_os = "macos")]
        {
            wgpu::Backends::METAL
        }
        #[cfg(target_os = "windows")]
        {
            wgpu::Backends::DX12
        }
        #[cfg(target_os = "linux")]
        {
            wgpu::Backends::VULKAN
        }
        #[cfg(not(any(target_os = "macos", target_os = "windows", target_os = "linux")))]
        {
            wgpu::Backends::PRIMARY
        }
    }

    /// Create a renderer bound to a window surface.
    ///
    /// The returned value must be handed to the render context manager
    /// before any drawing happens; it is `Send` but all later use is
    /// confined to the render thread.
    pub async fn new<W>(
        window: Arc<W>,
        painting_size: Size,
        background: &Background,
        width: u32,
        height: u32,
    ) -> Result<Self, RenderError>
    where
        W: raw_window_handle::HasWindowHandle
            + raw_window_handle::HasDisplayHandle
            + Send
            + Sync
            + 'static,
    {
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: Self::preferred_backends(),
            ..Default::default()
        });

        let surface = instance.create_surface(window)?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or(RenderError::AdapterNotFound)?;

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Daub GPU Device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                    memory_hints: wgpu::MemoryHints::MemoryUsage,
                },
                None,
            )
            .await?;

        let device = Arc::new(device);
        let queue = Arc::new(queue);

        let caps = surface.get_capabilities(&adapter);
        let surface_format = caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .unwrap_or(caps.formats[0]);
        tracing::debug!("selected surface format: {:?}", surface_format);

        let surface_config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: width.max(1),
            height: height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode: wgpu::CompositeAlphaMode::Opaque,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &surface_config);

        let canvas_width = (painting_size.width.ceil() as u32).max(1);
        let canvas_height = (painting_size.height.ceil() as u32).max(1);
        let canvas_texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Daub Canvas Texture"),
            size: wgpu::Extent3d {
                width: canvas_width,
                height: canvas_height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8Unorm,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT
                | wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_SRC
                | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        let canvas_view = canvas_texture.create_view(&wgpu::TextureViewDescriptor::default());

        // Shaders
        let dab_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Dab Shader"),
            source: wgpu::ShaderSource::Wgsl(DAB_SHADER.into()),
        });
        let blit_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Blit Shader"),
            source: wgpu::ShaderSource::Wgsl(BLIT_SHADER.into()),
        });

        // Buffers
        let canvas_uniforms = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Canvas Uniforms"),
            size: std::mem::size_of::<CanvasUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let dab_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Dab Instances"),
            size: (MAX_DABS * std::mem::size_of::<DabInstance>()) as u64,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let blit_uniforms = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Blit Uniforms"),
            size: std::mem::size_of::<BlitUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        // Bind group layouts
        let dab_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Dab Bind Group Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Storage { read_only: true },
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
            ],
        });

        let blit_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Blit Bind Group Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        // Pipelines
        let dab_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Dab Pipeline Layout"),
            bind_group_layouts: &[&dab_layout],
            push_constant_ranges: &[],
        });
        let dab_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Dab Pipeline"),
            layout: Some(&dab_pipeline_layout),
            vertex: wgpu::VertexState {
                module: &dab_shader,
                entry_point: Some("vs_main"),
                buffers: &[],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &dab_shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: wgpu::TextureFormat::Rgba8Unorm,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            primitive: wgpu::PrimitiveState::default(),
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        let blit_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Blit Pipeline Layout"),
            bind_group_layouts: &[&blit_layout],
            push_constant_ranges: &[],
        });
        let blit_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Blit Pipeline"),
            layout: Some(&blit_pipeline_layout),
            vertex: wgpu::VertexState {
                module: &blit_shader,
                entry_point: Some("vs_main"),
                buffers: &[],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &blit_shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: surface_format,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            primitive: wgpu::PrimitiveState::default(),
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        let canvas_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Canvas Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let dab_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Dab Bind Group"),
            layout: &dab_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: canvas_uniforms.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: dab_buffer.as_entire_binding(),
                },
            ],
        });
        let blit_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Blit Bind Group"),
            layout: &blit_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: blit_uniforms.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&canvas_view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(&canvas_sampler),
                },
            ],
        });

        queue.write_buffer(
            &canvas_uniforms,
            0,
            bytemuck::bytes_of(&CanvasUniforms {
                canvas_size: [canvas_width as f32, canvas_height as f32],
                _padding: [0.0; 2],
            }),
        );

        tracing::info!(
            canvas = format!("{canvas_width}x{canvas_height}"),
            surface = format!("{}x{}", surface_config.width, surface_config.height),
            "render context created"
        );

        Ok(Self {
            instance,
            adapter,
            device,
            queue,
            surface,
            surface_config,
            canvas_texture,
            canvas_width,
            canvas_height,
            painting_size,
            dab_pipeline,
            blit_pipeline,
            dab_bind_group,
            blit_bind_group,
            canvas_uniforms,
            dab_buffer,
            blit_uniforms,
            projection: Mat4::IDENTITY,
            pending_clear: Some(background.clone()),
            pending_dabs: Vec::new(),
            stroke_carry: 0.0,
            released: false,
        })
    }

    /// Apply any queued clear and stamp queued dabs into the canvas texture.
    fn flush_canvas(&mut self) {
        if let Some(background) = self.pending_clear.take() {
            self.apply_background(&background);
        }
        if self.pending_dabs.is_empty() {
            return;
        }
        let dabs = std::mem::take(&mut self.pending_dabs);
        let canvas_view = self
            .canvas_texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        for chunk in dabs.chunks(MAX_DABS) {
            self.queue
                .write_buffer(&self.dab_buffer, 0, bytemuck::cast_slice(chunk));
            let mut encoder = self
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("Dab Encoder"),
                });
            {
                let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("Dab Pass"),
                    color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                        view: &canvas_view,
                        resolve_target: None,
                        ops: wgpu::Operations {
                            load: wgpu::LoadOp::Load,
                            store: wgpu::StoreOp::Store,
                        },
                    })],
                    depth_stencil_attachment: None,
                    timestamp_writes: None,
                    occlusion_query_set: None,
                });
                pass.set_pipeline(&self.dab_pipeline);
                pass.set_bind_group(0, &self.dab_bind_group, &[]);
                pass.draw(0..6, 0..chunk.len() as u32);
            }
            self.queue.submit(std::iter::once(encoder.finish()));
        }
    }

    fn apply_background(&mut self, background: &Background) {
        match background {
            Background::Image(bitmap)
                if bitmap.width() == self.canvas_width && bitmap.height() == self.canvas_height =>
            {
                self.queue.write_texture(
                    wgpu::ImageCopyTexture {
                        texture: &self.canvas_texture,
                        mip_level: 0,
                        origin: wgpu::Origin3d::ZERO,
                        aspect: wgpu::TextureAspect::All,
                    },
                    bitmap.pixels(),
                    wgpu::ImageDataLayout {
                        offset: 0,
                        bytes_per_row: Some(bitmap.width() * 4),
                        rows_per_image: Some(bitmap.height()),
                    },
                    wgpu::Extent3d {
                        width: self.canvas_width,
                        height: self.canvas_height,
                        depth_or_array_layers: 1,
                    },
                );
            }
            background => {
                let color = match background {
                    Background::Color(c) => wgpu::Color {
                        r: c.r as f64,
                        g: c.g as f64,
                        b: c.b as f64,
                        a: c.a as f64,
                    },
                    Background::Image(bitmap) => {
                        tracing::warn!(
                            bitmap = format!("{}x{}", bitmap.width(), bitmap.height()),
                            canvas = format!("{}x{}", self.canvas_width, self.canvas_height),
                            "background bitmap does not match canvas size, clearing to white"
                        );
                        wgpu::Color::WHITE
                    }
                };
                let canvas_view = self
                    .canvas_texture
                    .create_view(&wgpu::TextureViewDescriptor::default());
                let mut encoder =
                    self.device
                        .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                            label: Some("Clear Encoder"),
                        });
                encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("Clear Pass"),
                    color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                        view: &canvas_view,
                        resolve_target: None,
                        ops: wgpu::Operations {
                            load: wgpu::LoadOp::Clear(color),
                            store: wgpu::StoreOp::Store,
                        },
                    })],
                    depth_stencil_attachment: None,
                    timestamp_writes: None,
                    occlusion_query_set: None,
                });
                self.queue.submit(std::iter::once(encoder.finish()));
            }
        }
    }

    fn padded_bytes_per_row(width: u32) -> u32 {
        let unpadded = width * 4;
        let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
        unpadded.div_ceil(align) * align
    }
}

impl PaintRenderer for WgpuPaintRenderer {
    fn set_buffer_size(&mut self, width: u32, height: u32) -> Result<(), RenderError> {
        if self.released {
            return Err(RenderError::ContextReleased);
        }
        if width == 0 || height == 0 {
            tracing::warn!("ignoring zero-area buffer size");
            return Ok(());
        }
        self.surface_config.width = width;
        self.surface_config.height = height;
        self.surface.configure(&self.device, &self.surface_config);
        tracing::debug!(width, height, "surface buffers resized");
        Ok(())
    }

    fn set_projection(&mut self, projection: Mat4) {
        self.projection = projection;
    }

    fn clear(&mut self, background: &Background) {
        self.pending_dabs.clear();
        self.pending_clear = Some(background.clone());
    }

    fn draw_segment(&mut self, brush: &Brush, points: &[StrokePoint], continues: bool) {
        if self.released {
            tracing::error!("draw_segment on a released render context");
            return;
        }
        let carry = continues.then_some(self.stroke_carry);
        self.stroke_carry = plan_dabs(brush, points, carry, &mut self.pending_dabs);
    }

    fn present(&mut self) -> Result<(), RenderError> {
        if self.released {
            return Err(RenderError::ContextReleased);
        }
        self.flush_canvas();

        let frame = self.surface.get_current_texture()?;
        let target = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        self.queue.write_buffer(
            &self.blit_uniforms,
            0,
            bytemuck::bytes_of(&BlitUniforms {
                projection: self.projection.to_cols_array(),
                painting_size: [self.painting_size.width, self.painting_size.height],
                _padding: [0.0; 2],
            }),
        );

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Present Encoder"),
            });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Blit Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &target,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(SURFACE_CLEAR),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            pass.set_pipeline(&self.blit_pipeline);
            pass.set_bind_group(0, &self.blit_bind_group, &[]);
            pass.draw(0..6, 0..1);
        }
        self.queue.submit(std::iter::once(encoder.finish()));
        frame.present();
        Ok(())
    }

    fn snapshot(&mut self) -> Result<Bitmap, RenderError> {
        if self.released {
            return Err(RenderError::ContextReleased);
        }
        self.flush_canvas();

        let width = self.canvas_width;
        let height = self.canvas_height;
        let bytes_per_row = Self::padded_bytes_per_row(width);
        let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Snapshot Readback Buffer"),
            size: (bytes_per_row * height) as u64,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Snapshot Encoder"),
            });
        encoder.copy_texture_to_buffer(
            wgpu::ImageCopyTexture {
                texture: &self.canvas_texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::ImageCopyBuffer {
                buffer: &buffer,
                layout: wgpu::ImageDataLayout {
                    offset: 0,
                    bytes_per_row: Some(bytes_per_row),
                    rows_per_image: Some(height),
                },
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );
        self.queue.submit(std::iter::once(encoder.finish()));

        let slice = buffer.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        self.device.poll(wgpu::Maintain::Wait);
        rx.recv()
            .map_err(|e| RenderError::Snapshot(e.to_string()))?
            .map_err(|e| RenderError::Snapshot(e.to_string()))?;

        let data = slice.get_mapped_range();
        let mut pixels = Vec::with_capacity((width * height * 4) as usize);
        for y in 0..height {
            let row_start = (y * bytes_per_row) as usize;
            pixels.extend_from_slice(&data[row_start..row_start + (width * 4) as usize]);
        }
        drop(data);
        buffer.unmap();

        Bitmap::from_rgba8(width, height, pixels)
            .ok_or_else(|| RenderError::Snapshot("readback size mismatch".into()))
    }

    fn release(&mut self) {
        if self.released {
            tracing::warn!("render context released twice");
            return;
        }
        self.released = true;
        self.pending_clear = None;
        self.pending_dabs.clear();
        tracing::info!("render context released");
    }
}
