//! Render pipeline construction
//!
//! The diorama needs three pipelines (opaque meshes, blended smoke and the
//! snow quads). They differ only in a handful of states, collected in
//! [`PipelineConfig`] and applied by [`PipelineConfig::build`].

use wgpu::*;

use crate::gfx::resources::TextureResource;

/// Configuration for creating a render pipeline
#[derive(Debug, Clone)]
pub struct PipelineConfig<'a> {
    pub label: &'a str,
    pub bind_group_layouts: Vec<&'a BindGroupLayout>,
    pub vertex_buffers: Vec<VertexBufferLayout<'a>>,
    pub primitive_topology: PrimitiveTopology,
    pub cull_mode: Option<Face>,
    pub blend: Option<BlendState>,
    pub depth_write: bool,
}

impl<'a> PipelineConfig<'a> {
    pub fn new(label: &'a str) -> Self {
        Self {
            label,
            bind_group_layouts: Vec::new(),
            vertex_buffers: Vec::new(),
            primitive_topology: PrimitiveTopology::TriangleList,
            cull_mode: Some(Face::Back),
            blend: Some(BlendState::REPLACE),
            depth_write: true,
        }
    }

    pub fn with_bind_group_layouts(mut self, layouts: Vec<&'a BindGroupLayout>) -> Self {
        self.bind_group_layouts = layouts;
        self
    }

    pub fn with_vertex_buffers(mut self, buffers: Vec<VertexBufferLayout<'a>>) -> Self {
        self.vertex_buffers = buffers;
        self
    }

    pub fn with_primitive_topology(mut self, topology: PrimitiveTopology) -> Self {
        self.primitive_topology = topology;
        self
    }

    pub fn with_cull_mode(mut self, face: Option<Face>) -> Self {
        self.cull_mode = face;
        self
    }

    /// Blends into the target instead of replacing it; depth is tested but not written
    pub fn with_blend(mut self, blend: BlendState) -> Self {
        self.blend = Some(blend);
        self.depth_write = false;
        self
    }

    pub fn build(&self, device: &Device, shader: &ShaderModule, format: TextureFormat) -> RenderPipeline {
        let layout = device.create_pipeline_layout(&PipelineLayoutDescriptor {
            label: Some(self.label),
            bind_group_layouts: &self.bind_group_layouts,
            push_constant_ranges: &[],
        });

        device.create_render_pipeline(&RenderPipelineDescriptor {
            label: Some(self.label),
            layout: Some(&layout),
            vertex: VertexState {
                module: shader,
                entry_point: Some("vs_main"),
                buffers: &self.vertex_buffers,
                compilation_options: Default::default(),
            },
            fragment: Some(FragmentState {
                module: shader,
                entry_point: Some("fs_main"),
                targets: &[Some(ColorTargetState {
                    format,
                    blend: self.blend,
                    write_mask: ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: PrimitiveState {
                topology: self.primitive_topology,
                strip_index_format: None,
                front_face: FrontFace::Ccw,
                cull_mode: self.cull_mode,
                unclipped_depth: false,
                polygon_mode: PolygonMode::Fill,
                conservative: false,
            },
            depth_stencil: Some(DepthStencilState {
                format: TextureResource::DEPTH_FORMAT,
                depth_write_enabled: self.depth_write,
                depth_compare: CompareFunction::Less,
                stencil: StencilState::default(),
                bias: DepthBiasState::default(),
            }),
            multisample: MultisampleState::default(),
            multiview: None,
            cache: None,
        })
    }
}

/// Additive blending used for glowing flakes
pub const ADDITIVE_BLENDING: BlendState = BlendState {
    color: BlendComponent {
        src_factor: BlendFactor::One,
        dst_factor: BlendFactor::One,
        operation: BlendOperation::Add,
    },
    alpha: BlendComponent {
        src_factor: BlendFactor::One,
        dst_factor: BlendFactor::One,
        operation: BlendOperation::Add,
    },
};
