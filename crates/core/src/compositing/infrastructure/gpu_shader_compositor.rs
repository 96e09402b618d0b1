use crate::compositing::domain::shader_program::ShaderProgram;
use crate::compositing::domain::transition_compositor::{
    CompositorFactory, CompositorState, TransitionCompositor,
};
use crate::shared::constants::{PROGRESS_UNIFORM, RESOLUTION_UNIFORM};
use crate::shared::error::MergeError;
use crate::shared::frame::{Frame, RenderedFrame};
use crate::shared::uniform_value::UniformBindings;

use super::glsl_translator::{sampler_binding, texture_binding, translate, UNIFORM_BLOCK_BINDING};
use super::gpu_context::GpuContext;
use super::shader_validation::validate_fragment;
use super::uniform_layout::UniformLayout;

const TARGET_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;
const RGBA: u32 = 4;

/// Two triangles covering clip space.
const QUAD_VERTICES: [[f32; 2]; 6] = [
    [-1.0, -1.0],
    [1.0, -1.0],
    [-1.0, 1.0],
    [-1.0, 1.0],
    [1.0, -1.0],
    [1.0, 1.0],
];

/// Rejects a resolution the device cannot allocate textures for.
pub fn check_resolution((width, height): (u32, u32), max_dimension: u32) -> Result<(), MergeError> {
    if width == 0 || height == 0 {
        return Err(MergeError::Render(format!(
            "output resolution {width}x{height} is empty"
        )));
    }
    if width > max_dimension || height > max_dimension {
        return Err(MergeError::Render(format!(
            "output resolution {width}x{height} exceeds the GPU texture limit of {max_dimension} px"
        )));
    }
    Ok(())
}

/// Offscreen resources sized to the output resolution.
struct RenderTargets {
    source_a: wgpu::Texture,
    source_b: wgpu::Texture,
    target: wgpu::Texture,
    readback: wgpu::Buffer,
    vertices: wgpu::Buffer,
    sampler: wgpu::Sampler,
    padded_row_bytes: u32,
}

struct LoadedProgram {
    program: ShaderProgram,
    layout: UniformLayout,
    defaults: Vec<u8>,
    pipeline: wgpu::RenderPipeline,
    bind_group: wgpu::BindGroup,
    uniform_buffer: wgpu::Buffer,
}

/// Renders transition frames with a caller-supplied GLSL fragment stage.
///
/// Frames are uploaded bottom row first so `v_text` follows the GL
/// convention, which makes the readback come out top row first.
pub struct GpuShaderCompositor {
    resolution: (u32, u32),
    state: CompositorState,
    ctx: Option<GpuContext>,
    targets: Option<RenderTargets>,
    loaded: Option<LoadedProgram>,
}

impl GpuShaderCompositor {
    pub fn new(resolution: (u32, u32)) -> Self {
        Self {
            resolution,
            state: CompositorState::Uninitialized,
            ctx: None,
            targets: None,
            loaded: None,
        }
    }

    fn expect_state(&self, allowed: &[CompositorState], operation: &str) -> Result<(), MergeError> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(MergeError::Render(format!(
                "cannot {operation} while compositor is {:?}",
                self.state
            )))
        }
    }

    fn context(&self) -> Result<&GpuContext, MergeError> {
        self.ctx
            .as_ref()
            .ok_or_else(|| MergeError::Render("GPU context is not initialized".to_string()))
    }

    fn create_targets(ctx: &GpuContext, (width, height): (u32, u32)) -> RenderTargets {
        let device = &ctx.device;
        let extent = wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        };
        let source = |label| {
            device.create_texture(&wgpu::TextureDescriptor {
                label: Some(label),
                size: extent,
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: TARGET_FORMAT,
                usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
                view_formats: &[],
            })
        };
        let target = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("transition-target"),
            size: extent,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: TARGET_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });

        let padded_row_bytes =
            (width * RGBA).next_multiple_of(wgpu::COPY_BYTES_PER_ROW_ALIGNMENT);
        let readback = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("readback"),
            size: padded_row_bytes as u64 * height as u64,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let vertices = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("quad-vertices"),
            size: std::mem::size_of_val(&QUAD_VERTICES) as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        ctx.queue
            .write_buffer(&vertices, 0, bytemuck::cast_slice(&QUAD_VERTICES));

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("source-sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        RenderTargets {
            source_a: source("source-a"),
            source_b: source("source-b"),
            target,
            readback,
            vertices,
            sampler,
            padded_row_bytes,
        }
    }

    fn build_program(
        ctx: &GpuContext,
        targets: &RenderTargets,
        program: &ShaderProgram,
        fragment_glsl: String,
        layout: &UniformLayout,
    ) -> (wgpu::RenderPipeline, wgpu::BindGroup, wgpu::Buffer) {
        let device = &ctx.device;

        let vertex_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("fullscreen-quad"),
            source: wgpu::ShaderSource::Wgsl(program.vertex_source.into()),
        });
        let fragment_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("transition-fragment"),
            source: wgpu::ShaderSource::Glsl {
                shader: fragment_glsl.into(),
                stage: naga::ShaderStage::Fragment,
                defines: Default::default(),
            },
        });

        let mut layout_entries = vec![wgpu::BindGroupLayoutEntry {
            binding: UNIFORM_BLOCK_BINDING,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        }];
        for i in 0..program.samplers.len() {
            layout_entries.push(wgpu::BindGroupLayoutEntry {
                binding: texture_binding(i),
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    view_dimension: wgpu::TextureViewDimension::D2,
                    multisampled: false,
                },
                count: None,
            });
            layout_entries.push(wgpu::BindGroupLayoutEntry {
                binding: sampler_binding(i),
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            });
        }
        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("transition-bind-group-layout"),
            entries: &layout_entries,
        });

        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("transition-uniforms"),
            size: layout.size() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let view_a = targets
            .source_a
            .create_view(&wgpu::TextureViewDescriptor::default());
        let view_b = targets
            .source_b
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut group_entries = vec![wgpu::BindGroupEntry {
            binding: UNIFORM_BLOCK_BINDING,
            resource: uniform_buffer.as_entire_binding(),
        }];
        for (i, sampler_decl) in program.samplers.iter().enumerate() {
            let view = if sampler_decl.unit == 1 { &view_b } else { &view_a };
            group_entries.push(wgpu::BindGroupEntry {
                binding: texture_binding(i),
                resource: wgpu::BindingResource::TextureView(view),
            });
            group_entries.push(wgpu::BindGroupEntry {
                binding: sampler_binding(i),
                resource: wgpu::BindingResource::Sampler(&targets.sampler),
            });
        }
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("transition-bind-group"),
            layout: &bind_group_layout,
            entries: &group_entries,
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("transition-pipeline-layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("transition-pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &vertex_module,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: std::mem::size_of::<[f32; 2]>() as u64,
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes: &wgpu::vertex_attr_array![0 => Float32x2],
                }],
            },
            fragment: Some(wgpu::FragmentState {
                module: &fragment_module,
                entry_point: Some("main"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: TARGET_FORMAT,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState::default(),
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        (pipeline, bind_group, uniform_buffer)
    }

    /// Packs defaults, then progress and resolution when declared, then
    /// caller uniforms that the program declares.
    fn uniform_bytes(
        &self,
        loaded: &LoadedProgram,
        progress: f32,
        uniforms: &UniformBindings,
    ) -> Vec<u8> {
        let mut bytes = loaded.defaults.clone();
        let (width, height) = self.resolution;

        if loaded.program.declares(PROGRESS_UNIFORM)
            && !loaded.layout.write(&mut bytes, PROGRESS_UNIFORM, &[progress as f64])
        {
            log::warn!("Uniform '{PROGRESS_UNIFORM}' is not a float; leaving it unset");
        }
        if loaded.program.declares(RESOLUTION_UNIFORM)
            && !loaded
                .layout
                .write(&mut bytes, RESOLUTION_UNIFORM, &[width as f64, height as f64])
        {
            log::warn!("Uniform '{RESOLUTION_UNIFORM}' is not a vec2; leaving it unset");
        }

        for (name, value) in uniforms.iter() {
            if !loaded.program.declares(name) {
                continue;
            }
            if !loaded.layout.write(&mut bytes, name, value.components()) {
                log::warn!(
                    "Uniform '{name}' expects {} components, got {}; skipped",
                    loaded.layout.slot(name).map_or(0, |s| s.ty.components()),
                    value.components().len()
                );
            }
        }
        bytes
    }

    fn upload(&self, ctx: &GpuContext, texture: &wgpu::Texture, frame: &Frame) {
        let (width, height) = self.resolution;
        ctx.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &frame.to_rgba_bottom_up(),
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(width * RGBA),
                rows_per_image: Some(height),
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );
    }

    fn read_back(&self, ctx: &GpuContext, targets: &RenderTargets) -> Result<Vec<u8>, MergeError> {
        let (width, height) = self.resolution;
        let slice = targets.readback.slice(..);
        let (tx, rx) = crossbeam_channel::bounded(1);
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        ctx.device.poll(wgpu::Maintain::Wait);

        rx.recv()
            .map_err(|_| MergeError::Render("readback callback never ran".to_string()))?
            .map_err(|e| MergeError::Render(format!("cannot map readback buffer: {e}")))?;

        let row_bytes = (width * RGBA) as usize;
        let mut rgb = Vec::with_capacity((width * height) as usize * 3);
        {
            let mapped = slice.get_mapped_range();
            for row in mapped.chunks(targets.padded_row_bytes as usize) {
                for px in row[..row_bytes].chunks_exact(RGBA as usize) {
                    rgb.extend_from_slice(&px[..3]);
                }
            }
        }
        targets.readback.unmap();
        Ok(rgb)
    }
}

impl TransitionCompositor for GpuShaderCompositor {
    fn state(&self) -> CompositorState {
        self.state
    }

    fn initialize(&mut self) -> Result<(), MergeError> {
        self.expect_state(&[CompositorState::Uninitialized], "initialize")?;
        let ctx = GpuContext::new()
            .ok_or_else(|| MergeError::Render("no GPU adapter available".to_string()))?;
        log::debug!(
            "GPU context on '{}' at {}x{}",
            ctx.adapter_name,
            self.resolution.0,
            self.resolution.1
        );
        check_resolution(self.resolution, ctx.max_texture_dimension)?;

        let resolution = self.resolution;
        let (targets, error) =
            ctx.capture_validation(|| Self::create_targets(&ctx, resolution));
        if let Some(e) = error {
            return Err(MergeError::Render(format!(
                "cannot allocate {}x{} render targets: {e}",
                self.resolution.0, self.resolution.1
            )));
        }
        self.targets = Some(targets);
        self.ctx = Some(ctx);
        self.state = CompositorState::ContextReady;
        Ok(())
    }

    fn load_program(&mut self, fragment_source: &str) -> Result<(), MergeError> {
        self.expect_state(&[CompositorState::ContextReady], "load a program")?;

        let translated = translate(fragment_source, self.resolution.1)?;
        validate_fragment(&translated.source)?;

        let ctx = self.context()?;
        let targets = self
            .targets
            .as_ref()
            .ok_or_else(|| MergeError::Render("render targets are missing".to_string()))?;

        let program = translated.program;
        let layout = UniformLayout::std140(&program.uniforms);
        let defaults = layout.defaults(&program.uniforms);

        let ((pipeline, bind_group, uniform_buffer), error) = ctx.capture_validation(|| {
            Self::build_program(ctx, targets, &program, translated.source, &layout)
        });
        if let Some(e) = error {
            return Err(MergeError::ShaderCompile(e.to_string()));
        }

        log::debug!(
            "Loaded transition program declaring {:?}",
            program.declared_uniform_names()
        );
        self.loaded = Some(LoadedProgram {
            program,
            layout,
            defaults,
            pipeline,
            bind_group,
            uniform_buffer,
        });
        self.state = CompositorState::ProgramLoaded;
        Ok(())
    }

    fn declares_uniform(&self, name: &str) -> bool {
        self.loaded
            .as_ref()
            .is_some_and(|l| l.program.declares(name))
    }

    fn render_frame(
        &mut self,
        progress: f32,
        frame_a: &Frame,
        frame_b: &Frame,
        uniforms: &UniformBindings,
    ) -> Result<RenderedFrame, MergeError> {
        self.expect_state(
            &[CompositorState::ProgramLoaded, CompositorState::Rendering],
            "render",
        )?;
        for frame in [frame_a, frame_b] {
            if frame.resolution() != self.resolution {
                return Err(MergeError::Render(format!(
                    "source frame is {}x{}, expected {}x{}",
                    frame.width(),
                    frame.height(),
                    self.resolution.0,
                    self.resolution.1
                )));
            }
        }
        self.state = CompositorState::Rendering;

        let ctx = self.context()?;
        let (targets, loaded) = match (&self.targets, &self.loaded) {
            (Some(t), Some(l)) => (t, l),
            _ => return Err(MergeError::Render("program is not loaded".to_string())),
        };
        let (width, height) = self.resolution;

        let ((), error) = ctx.capture_validation(|| {
            ctx.queue.write_buffer(
                &loaded.uniform_buffer,
                0,
                &self.uniform_bytes(loaded, progress, uniforms),
            );
            self.upload(ctx, &targets.source_a, frame_a);
            self.upload(ctx, &targets.source_b, frame_b);

            let view = targets
                .target
                .create_view(&wgpu::TextureViewDescriptor::default());
            let mut encoder = ctx
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("transition-frame"),
                });
            {
                let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("transition"),
                    color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                        view: &view,
                        resolve_target: None,
                        ops: wgpu::Operations {
                            load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                            store: wgpu::StoreOp::Store,
                        },
                    })],
                    depth_stencil_attachment: None,
                    timestamp_writes: None,
                    occlusion_query_set: None,
                });
                pass.set_pipeline(&loaded.pipeline);
                pass.set_bind_group(0, &loaded.bind_group, &[]);
                pass.set_vertex_buffer(0, targets.vertices.slice(..));
                pass.draw(0..QUAD_VERTICES.len() as u32, 0..1);
            }
            encoder.copy_texture_to_buffer(
                wgpu::TexelCopyTextureInfo {
                    texture: &targets.target,
                    mip_level: 0,
                    origin: wgpu::Origin3d::ZERO,
                    aspect: wgpu::TextureAspect::All,
                },
                wgpu::TexelCopyBufferInfo {
                    buffer: &targets.readback,
                    layout: wgpu::TexelCopyBufferLayout {
                        offset: 0,
                        bytes_per_row: Some(targets.padded_row_bytes),
                        rows_per_image: Some(height),
                    },
                },
                wgpu::Extent3d {
                    width,
                    height,
                    depth_or_array_layers: 1,
                },
            );
            ctx.queue.submit(Some(encoder.finish()));
        });
        if let Some(e) = error {
            return Err(MergeError::Render(e.to_string()));
        }

        let rgb = self.read_back(ctx, targets)?;
        Ok(Frame::new(rgb, width, height, frame_a.index()))
    }

    fn close(&mut self) {
        self.loaded = None;
        self.targets = None;
        self.ctx = None;
        self.state = CompositorState::Closed;
    }
}

impl Drop for GpuShaderCompositor {
    fn drop(&mut self) {
        self.close();
    }
}

/// Hands every job its own GPU context.
#[derive(Clone, Copy, Debug, Default)]
pub struct GpuCompositorFactory;

impl CompositorFactory for GpuCompositorFactory {
    fn create(&self, resolution: (u32, u32)) -> Result<Box<dyn TransitionCompositor>, MergeError> {
        let mut compositor = GpuShaderCompositor::new(resolution);
        compositor.initialize()?;
        Ok(Box::new(compositor))
    }
}
