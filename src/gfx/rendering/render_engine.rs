//! WGPU-based rendering engine for the diorama
//!
//! Owns the surface, device and every GPU object the diorama core asks for
//! through [`RenderBackend`]. Each frame is a single pass: opaque meshes,
//! then blended smoke, then additive snow.

use std::collections::BTreeMap;

use wgpu::util::DeviceExt;

use super::pipelines::{PipelineConfig, ADDITIVE_BLENDING};
use super::uniform::{single_uniform_bind_group, single_uniform_layout, UniformBuffer};
use crate::gfx::camera::camera_utils::CameraUniform;
use crate::gfx::resources::{
    MeshHandle, PointsHandle, RenderBackend, SnowUniform, SurfaceMaterial, TextureData,
    TextureHandle, TextureResource,
};
use crate::gfx::scene::{SceneMesh, Vertex3D};

/// Tint and opacity of chimney smoke
const SMOKE_TINT: [f32; 4] = [0.85, 0.85, 0.9, 0.7];

/// Errors raised while bringing up the GPU
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("failed to create surface: {0}")]
    CreateSurface(#[from] wgpu::CreateSurfaceError),
    #[error("no compatible GPU adapter: {0}")]
    RequestAdapter(#[from] wgpu::RequestAdapterError),
    #[error("failed to open GPU device: {0}")]
    RequestDevice(#[from] wgpu::RequestDeviceError),
    #[error("surface reports no supported {0}")]
    UnsupportedSurface(&'static str),
}

/// Per-mesh shader parameters
///
/// MUST match `MeshUniform` in diorama.wgsl.
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct MeshUniform {
    model: [[f32; 4]; 4],
    color: [f32; 4],
    /// x: material mode, y: elapsed seconds
    params: [f32; 4],
}

impl MeshUniform {
    fn for_material(material: SurfaceMaterial) -> Self {
        let (mode, color) = match material {
            SurfaceMaterial::Baked { .. } => (0.0, [1.0; 4]),
            SurfaceMaterial::Emission { color: [r, g, b] } => (1.0, [r, g, b, 1.0]),
            SurfaceMaterial::Smoke => (2.0, SMOKE_TINT),
        };
        Self {
            model: cgmath::Matrix4::<f32>::from_scale(1.0).into(),
            color,
            params: [mode, 0.0, 0.0, 0.0],
        }
    }
}

struct GpuTexture {
    _resource: TextureResource,
    bind_group: wgpu::BindGroup,
}

struct GpuMesh {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
    material: SurfaceMaterial,
    params: MeshUniform,
    uniform: UniformBuffer<MeshUniform>,
    bind_group: wgpu::BindGroup,
}

struct GpuPoints {
    positions: wgpu::Buffer,
    scales: wgpu::Buffer,
    count: u32,
    uniform: UniformBuffer<SnowUniform>,
    bind_group: wgpu::BindGroup,
}

/// Core rendering engine managing GPU resources and draw calls
pub struct RenderEngine {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    depth_texture: TextureResource,
    clear_color: wgpu::Color,

    camera: UniformBuffer<CameraUniform>,
    camera_bind_group: wgpu::BindGroup,
    mesh_layout: wgpu::BindGroupLayout,
    texture_layout: wgpu::BindGroupLayout,
    snow_layout: wgpu::BindGroupLayout,

    opaque_pipeline: wgpu::RenderPipeline,
    smoke_pipeline: wgpu::RenderPipeline,
    snow_pipeline: wgpu::RenderPipeline,

    white_texture: GpuTexture,
    textures: BTreeMap<TextureHandle, GpuTexture>,
    meshes: BTreeMap<u64, GpuMesh>,
    points: BTreeMap<u64, GpuPoints>,
    effect_time: f32,
    next_id: u64,
}

impl RenderEngine {
    /// Creates a new render engine for the given window
    ///
    /// # Errors
    /// Fails when no surface, adapter or device can be obtained.
    pub async fn new(
        window: impl Into<wgpu::SurfaceTarget<'static>>,
        width: u32,
        height: u32,
        clear_color: [f64; 3],
    ) -> Result<RenderEngine, RenderError> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        let surface = instance.create_surface(window)?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await?;
        log::info!("Using adapter: {}", adapter.get_info().name);

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("Diorama Device"),
                required_features: wgpu::Features::default(),
                required_limits: wgpu::Limits {
                    max_texture_dimension_2d: 4096,
                    ..wgpu::Limits::downlevel_defaults()
                },
                memory_hints: wgpu::MemoryHints::default(),
                trace: wgpu::Trace::Off,
            })
            .await?;

        let surface_capabilities = surface.get_capabilities(&adapter);
        let (format, alpha_mode) = choose_surface_format(&surface_capabilities)?;

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: width.max(1),
            height: height.max(1),
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let depth_texture = TextureResource::create_depth_texture(&device, &config, "Depth Texture");

        let camera = UniformBuffer::new(&device, "Camera Uniform", &CameraUniform::default());
        let camera_layout = single_uniform_layout(
            &device,
            "Camera Layout",
            wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
        );
        let camera_bind_group =
            single_uniform_bind_group(&device, "Camera Bind Group", &camera_layout, &camera);

        let mesh_layout = single_uniform_layout(
            &device,
            "Mesh Layout",
            wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
        );
        let snow_layout = single_uniform_layout(
            &device,
            "Snow Layout",
            wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
        );
        let texture_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Baked Texture Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        multisampled: false,
                        view_dimension: wgpu::TextureViewDimension::D2,
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let diorama_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Diorama Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("diorama.wgsl").into()),
        });
        let snow_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Snow Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("snow.wgsl").into()),
        });

        let mesh_pipeline = PipelineConfig::new("Opaque Mesh Pipeline")
            .with_bind_group_layouts(vec![&camera_layout, &mesh_layout, &texture_layout])
            .with_vertex_buffers(vec![Vertex3D::desc()])
            // Exported models mix winding orders
            .with_cull_mode(None);
        let opaque_pipeline = mesh_pipeline.build(&device, &diorama_shader, format);
        let smoke_pipeline = PipelineConfig {
            label: "Smoke Pipeline",
            ..mesh_pipeline.clone()
        }
        .with_blend(wgpu::BlendState::ALPHA_BLENDING)
        .build(&device, &diorama_shader, format);

        let snow_pipeline = PipelineConfig::new("Snow Pipeline")
            .with_bind_group_layouts(vec![&camera_layout, &snow_layout])
            .with_vertex_buffers(vec![flake_position_layout(), flake_scale_layout()])
            .with_primitive_topology(wgpu::PrimitiveTopology::TriangleStrip)
            .with_cull_mode(None)
            .with_blend(ADDITIVE_BLENDING)
            .build(&device, &snow_shader, format);

        let white_texture = upload_texture(&device, &queue, &texture_layout, &TextureData::white());

        let [r, g, b] = clear_color;
        Ok(RenderEngine {
            surface,
            device,
            queue,
            config,
            depth_texture,
            clear_color: wgpu::Color { r, g, b, a: 1.0 },
            camera,
            camera_bind_group,
            mesh_layout,
            texture_layout,
            snow_layout,
            opaque_pipeline,
            smoke_pipeline,
            snow_pipeline,
            white_texture,
            textures: BTreeMap::new(),
            meshes: BTreeMap::new(),
            points: BTreeMap::new(),
            effect_time: 0.0,
            next_id: 0,
        })
    }

    /// Resizes the surface and recreates the depth buffer
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }

        self.config.width = width;
        self.config.height = height;
        self.surface.configure(&self.device, &self.config);
        self.depth_texture =
            TextureResource::create_depth_texture(&self.device, &self.config, "Depth Texture");
    }

    /// Returns current surface dimensions
    pub fn get_surface_size(&self) -> (u32, u32) {
        (self.config.width, self.config.height)
    }

    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn draw(&mut self) -> Result<(), wgpu::SurfaceError> {
        let surface_texture = self.surface.get_current_texture()?;
        let surface_view = surface_texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Main Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &surface_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.clear_color),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_texture.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            render_pass.set_bind_group(0, &self.camera_bind_group, &[]);

            // Opaque first, then blended smoke on top of the depth they wrote
            for (pipeline, smoke) in [(&self.opaque_pipeline, false), (&self.smoke_pipeline, true)] {
                render_pass.set_pipeline(pipeline);
                for mesh in self.meshes.values() {
                    if matches!(mesh.material, SurfaceMaterial::Smoke) != smoke {
                        continue;
                    }
                    let texture = match mesh.material {
                        SurfaceMaterial::Baked {
                            texture: Some(handle),
                        } => self.textures.get(&handle).unwrap_or(&self.white_texture),
                        _ => &self.white_texture,
                    };
                    render_pass.set_bind_group(1, &mesh.bind_group, &[]);
                    render_pass.set_bind_group(2, &texture.bind_group, &[]);
                    render_pass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
                    render_pass.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                    render_pass.draw_indexed(0..mesh.index_count, 0, 0..1);
                }
            }

            render_pass.set_pipeline(&self.snow_pipeline);
            for points in self.points.values() {
                if points.count == 0 {
                    continue;
                }
                render_pass.set_bind_group(1, &points.bind_group, &[]);
                render_pass.set_vertex_buffer(0, points.positions.slice(..));
                render_pass.set_vertex_buffer(1, points.scales.slice(..));
                render_pass.draw(0..4, 0..points.count);
            }
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        surface_texture.present();
        Ok(())
    }
}

impl RenderBackend for RenderEngine {
    fn create_texture(&mut self, texture: &TextureData) -> TextureHandle {
        let handle = TextureHandle(self.next_id());
        let gpu = upload_texture(&self.device, &self.queue, &self.texture_layout, texture);
        self.textures.insert(handle, gpu);
        handle
    }

    fn release_texture(&mut self, handle: TextureHandle) {
        self.textures.remove(&handle);
    }

    fn create_mesh(&mut self, mesh: &SceneMesh, material: SurfaceMaterial) -> MeshHandle {
        let id = self.next_id();

        let vertex_buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{} Vertex Buffer", mesh.name)),
            contents: bytemuck::cast_slice(&mesh.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{} Index Buffer", mesh.name)),
            contents: bytemuck::cast_slice(&mesh.indices),
            usage: wgpu::BufferUsages::INDEX,
        });

        let params = MeshUniform::for_material(material);
        let uniform = UniformBuffer::new(&self.device, &format!("{} Uniform", mesh.name), &params);
        let bind_group =
            single_uniform_bind_group(&self.device, &mesh.name, &self.mesh_layout, &uniform);

        self.meshes.insert(
            id,
            GpuMesh {
                vertex_buffer,
                index_buffer,
                index_count: mesh.indices.len() as u32,
                material,
                params,
                uniform,
                bind_group,
            },
        );
        MeshHandle(id)
    }

    fn set_mesh_transform(&mut self, handle: MeshHandle, transform: cgmath::Matrix4<f32>) {
        if let Some(mesh) = self.meshes.get_mut(&handle.0) {
            mesh.params.model = transform.into();
            mesh.uniform.write(&self.queue, &mesh.params);
        }
    }

    fn release_mesh(&mut self, handle: MeshHandle) {
        self.meshes.remove(&handle.0);
    }

    fn create_points(
        &mut self,
        label: &str,
        positions: &[f32],
        scales: &[f32],
        uniform: &SnowUniform,
    ) -> PointsHandle {
        let id = self.next_id();

        let positions_buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{} Positions", label)),
            contents: bytemuck::cast_slice(positions),
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        });
        let scales_buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{} Scales", label)),
            contents: bytemuck::cast_slice(scales),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let uniform = UniformBuffer::new(&self.device, &format!("{} Uniform", label), uniform);
        let bind_group = single_uniform_bind_group(&self.device, label, &self.snow_layout, &uniform);

        self.points.insert(
            id,
            GpuPoints {
                positions: positions_buffer,
                scales: scales_buffer,
                count: scales.len() as u32,
                uniform,
                bind_group,
            },
        );
        PointsHandle(id)
    }

    fn write_point_positions(&mut self, handle: PointsHandle, positions: &[f32]) {
        if let Some(points) = self.points.get(&handle.0) {
            self.queue
                .write_buffer(&points.positions, 0, bytemuck::cast_slice(positions));
        }
    }

    fn write_point_uniform(&mut self, handle: PointsHandle, uniform: &SnowUniform) {
        if let Some(points) = self.points.get_mut(&handle.0) {
            points.uniform.write(&self.queue, uniform);
        }
    }

    fn release_points(&mut self, handle: PointsHandle) {
        self.points.remove(&handle.0);
    }

    fn set_effect_time(&mut self, elapsed: f32) {
        self.effect_time = elapsed;
    }

    fn render_frame(&mut self, camera: &CameraUniform) {
        self.camera.write(&self.queue, camera);

        for mesh in self.meshes.values_mut() {
            if matches!(mesh.material, SurfaceMaterial::Smoke) {
                mesh.params.params[1] = self.effect_time;
                mesh.uniform.write(&self.queue, &mesh.params);
            }
        }

        match self.draw() {
            Ok(()) => {}
            // Lost or outdated surfaces come back after a reconfigure
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                self.surface.configure(&self.device, &self.config);
            }
            Err(err) => log::warn!("Skipping frame: {}", err),
        }
    }
}

/// Picks the surface format and alpha mode
///
/// The baked texture is sRGB, so an sRGB format is preferred to let the
/// surface encode back to sRGB.
fn choose_surface_format(
    capabilities: &wgpu::SurfaceCapabilities,
) -> Result<(wgpu::TextureFormat, wgpu::CompositeAlphaMode), RenderError> {
    let format = capabilities
        .formats
        .iter()
        .copied()
        .find(|f| f.is_srgb())
        .or_else(|| capabilities.formats.first().copied())
        .ok_or(RenderError::UnsupportedSurface("texture formats"))?;
    let alpha_mode = capabilities
        .alpha_modes
        .first()
        .copied()
        .ok_or(RenderError::UnsupportedSurface("alpha modes"))?;
    Ok((format, alpha_mode))
}

fn upload_texture(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    layout: &wgpu::BindGroupLayout,
    data: &TextureData,
) -> GpuTexture {
    let resource = TextureResource::from_data(device, queue, data, wgpu::FilterMode::Linear);
    let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some(&format!("{} Bind Group", data.label)),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(&resource.view),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(&resource.sampler),
            },
        ],
    });
    GpuTexture {
        _resource: resource,
        bind_group,
    }
}

fn flake_position_layout() -> wgpu::VertexBufferLayout<'static> {
    wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
        step_mode: wgpu::VertexStepMode::Instance,
        attributes: &[wgpu::VertexAttribute {
            offset: 0,
            shader_location: 0,
            format: wgpu::VertexFormat::Float32x3,
        }],
    }
}

fn flake_scale_layout() -> wgpu::VertexBufferLayout<'static> {
    wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<f32>() as wgpu::BufferAddress,
        step_mode: wgpu::VertexStepMode::Instance,
        attributes: &[wgpu::VertexAttribute {
            offset: 0,
            shader_location: 1,
            format: wgpu::VertexFormat::Float32,
        }],
    }
}
