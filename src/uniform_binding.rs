//! # Uniform Binding Module
//!
//! Pairs a GPU uniform buffer holding one [`UniformBuffer`] with the bind group that exposes it
//! to the mesh shader. Every drawn node owns one binding; all bindings share a single bind group
//! layout, created once by the renderer with [`UniformBinding::create_layout`] and used both for
//! the pipeline layout and for each binding's bind group.
//!
//! ## Example
//!
//! ```ignore
//! let layout = UniformBinding::create_layout(&device);
//! let binding = UniformBinding::new(&device, &layout);
//! binding.write(&queue, &UniformBuffer::new(mvp, [1.0, 1.0, 1.0, 1.0]));
//! render_pass.set_bind_group(0, &binding.bind_group, &[]);
//! ```

use std::num::NonZeroU64;

use crate::uniform_buffer::UniformBuffer;

const UNIFORM_SIZE: u64 = std::mem::size_of::<UniformBuffer>() as u64;

pub struct UniformBinding {
    pub buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
}

impl UniformBinding {
    /// Layout of group `0`: one [`UniformBuffer`] at binding `0`, read by both shader stages.
    pub fn create_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
        device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Mesh Uniform Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: NonZeroU64::new(UNIFORM_SIZE),
                },
                count: None,
            }],
        })
    }

    /// Allocates a zeroed uniform buffer and its bind group.
    pub fn new(device: &wgpu::Device, layout: &wgpu::BindGroupLayout) -> Self {
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Mesh Uniform"),
            size: UNIFORM_SIZE,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Mesh Uniform Bind Group"),
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
        });

        Self { buffer, bind_group }
    }

    /// Queues `uniform` to replace the buffer contents before the next submission.
    pub fn write(&self, queue: &wgpu::Queue, uniform: &UniformBuffer) {
        queue.write_buffer(&self.buffer, 0, bytemuck::bytes_of(uniform));
    }
}
