//! GPU plumbing shared by the chart primitive.

use bytemuck::{Pod, Zeroable};
use iced::advanced::graphics::Viewport;
use iced_wgpu::wgpu;
use std::mem;

/// Maps logical pixel coordinates into clip space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClipTransform {
    scale_x: f32,
    scale_y: f32,
}

impl ClipTransform {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            scale_x: 2.0 / width.max(1.0),
            scale_y: 2.0 / height.max(1.0),
        }
    }

    pub fn from_viewport(viewport: &Viewport) -> Self {
        let logical_size = viewport.logical_size();
        Self::new(logical_size.width, logical_size.height)
    }

    #[inline]
    pub fn to_clip(self, x: f32, y: f32) -> [f32; 2] {
        [x * self.scale_x - 1.0, 1.0 - y * self.scale_y]
    }
}

/// Position plus straight-alpha color; the shader premultiplies.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct SimpleVertex {
    pub position: [f32; 2],
    pub color: [f32; 4],
}

impl SimpleVertex {
    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<SimpleVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x2,
                },
                wgpu::VertexAttribute {
                    offset: 8,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x4,
                },
            ],
        }
    }
}

/// Growable vertex buffer owned by one primitive instance.
#[derive(Debug)]
pub struct InstanceBuffer<V: Pod> {
    pub vertex_buffer: wgpu::Buffer,
    pub capacity: wgpu::BufferAddress,
    pub vertex_count: u32,
    _marker: std::marker::PhantomData<V>,
}

impl<V: Pod> InstanceBuffer<V> {
    pub fn new(device: &wgpu::Device, label: &'static str, size: wgpu::BufferAddress) -> Self {
        let capacity = size.max(1);
        Self {
            vertex_buffer: create_vertex_buffer(device, label, capacity),
            capacity,
            vertex_count: 0,
            _marker: std::marker::PhantomData,
        }
    }

    /// Replaces the contents with `vertices`, growing the buffer to the next
    /// power of two when it is too small.
    pub fn upload(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        label: &'static str,
        vertices: &[V],
    ) {
        if vertices.is_empty() {
            self.vertex_count = 0;
            return;
        }

        let size = mem::size_of_val(vertices) as wgpu::BufferAddress;
        if size > self.capacity {
            let capacity = size.next_power_of_two();
            self.vertex_buffer = create_vertex_buffer(device, label, capacity);
            self.capacity = capacity;
        }

        queue.write_buffer(&self.vertex_buffer, 0, bytemuck::cast_slice(vertices));
        self.vertex_count = vertices.len() as u32;
    }

    pub fn used_bytes(&self) -> wgpu::BufferAddress {
        self.vertex_count as wgpu::BufferAddress * mem::size_of::<V>() as wgpu::BufferAddress
    }
}

pub fn create_vertex_buffer(
    device: &wgpu::Device,
    label: &'static str,
    size: wgpu::BufferAddress,
) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some(label),
        size,
        usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

#[inline]
pub fn create_shader_module(
    device: &wgpu::Device,
    label: &'static str,
    source: &'static str,
) -> wgpu::ShaderModule {
    device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(label),
        source: wgpu::ShaderSource::Wgsl(source.into()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clip_transform_maps_corners() {
        let clip = ClipTransform::new(200.0, 100.0);
        assert_eq!(clip.to_clip(0.0, 0.0), [-1.0, 1.0]);
        assert_eq!(clip.to_clip(200.0, 100.0), [1.0, -1.0]);
        assert_eq!(clip.to_clip(100.0, 50.0), [0.0, 0.0]);
    }

    #[test]
    fn vertex_layout_matches_struct() {
        assert_eq!(mem::size_of::<SimpleVertex>(), 24);
        assert_eq!(SimpleVertex::layout().array_stride, 24);
    }
}
