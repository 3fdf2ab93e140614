//! Typed uniform buffers

use std::marker::PhantomData;

use wgpu::util::DeviceExt;

/// Uniform buffer holding one `Content`, written only when the bytes change
pub struct UniformBuffer<Content> {
    buffer: wgpu::Buffer,
    last_written: Vec<u8>,
    content: PhantomData<Content>,
}

impl<Content: bytemuck::Pod> UniformBuffer<Content> {
    pub fn new(device: &wgpu::Device, label: &str, initial: &Content) -> Self {
        let bytes = bytemuck::bytes_of(initial);
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: bytes,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        Self {
            buffer,
            last_written: bytes.to_vec(),
            content: PhantomData,
        }
    }

    /// Queues a write unless `content` matches what the buffer already holds
    pub fn write(&mut self, queue: &wgpu::Queue, content: &Content) {
        let bytes = bytemuck::bytes_of(content);
        if self.last_written != bytes {
            queue.write_buffer(&self.buffer, 0, bytes);
            self.last_written = bytes.to_vec();
        }
    }

    pub fn binding_resource(&self) -> wgpu::BindingResource {
        self.buffer.as_entire_binding()
    }
}

/// Layout entry for a uniform buffer at `binding`
pub fn uniform_entry(binding: u32, visibility: wgpu::ShaderStages) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

/// Layout with a single uniform buffer at binding 0
pub fn single_uniform_layout(
    device: &wgpu::Device,
    label: &str,
    visibility: wgpu::ShaderStages,
) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some(label),
        entries: &[uniform_entry(0, visibility)],
    })
}

pub fn single_uniform_bind_group<Content: bytemuck::Pod>(
    device: &wgpu::Device,
    label: &str,
    layout: &wgpu::BindGroupLayout,
    uniform: &UniformBuffer<Content>,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some(label),
        layout,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: uniform.binding_resource(),
        }],
    })
}
