use iced::Rectangle;
use iced::advanced::graphics::Viewport;
use iced_wgpu::primitive::{Primitive, Storage};
use iced_wgpu::wgpu;
use std::collections::HashMap;
use std::sync::Arc;

use crate::chart::ChartFrame;
use crate::ui::render::common::{
    ClipTransform, InstanceBuffer, SimpleVertex, create_shader_module,
};
use crate::ui::render::geometry::{DrawBatch, Topology, build_mesh};

const VERTEX_BUFFER_LABEL: &str = "Spectrum chart vertex buffer";

#[derive(Debug, Clone)]
pub struct ChartParams {
    /// Top-left corner of the chart widget in logical pixels.
    pub origin: [f32; 2],
    pub frame: Arc<ChartFrame>,
    pub instance_key: usize,
}

#[derive(Debug)]
pub struct ChartPrimitive {
    params: ChartParams,
}

impl ChartPrimitive {
    pub fn new(params: ChartParams) -> Self {
        Self { params }
    }

    fn key(&self) -> usize {
        self.params.instance_key
    }
}

impl Primitive for ChartPrimitive {
    fn prepare(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        format: wgpu::TextureFormat,
        storage: &mut Storage,
        _bounds: &Rectangle,
        viewport: &Viewport,
    ) {
        if !storage.has::<Pipeline>() {
            storage.store(Pipeline::new(device, format));
        }
        let Some(pipeline) = storage.get_mut::<Pipeline>() else {
            return;
        };

        let clip = ClipTransform::from_viewport(viewport);
        let mesh = build_mesh(&self.params.frame, self.params.origin, clip);
        pipeline.prepare_instance(device, queue, self.key(), &mesh.vertices, mesh.batches);
    }

    fn render(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        storage: &Storage,
        target: &wgpu::TextureView,
        clip_bounds: &Rectangle<u32>,
    ) {
        let Some(pipeline) = storage.get::<Pipeline>() else {
            return;
        };
        let Some(instance) = pipeline.instance(self.key()) else {
            return;
        };
        if instance.buffer.vertex_count == 0 || instance.batches.is_empty() {
            return;
        }

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Spectrum chart pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target,
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

        pass.set_scissor_rect(
            clip_bounds.x,
            clip_bounds.y,
            clip_bounds.width.max(1),
            clip_bounds.height.max(1),
        );
        pass.set_vertex_buffer(
            0,
            instance
                .buffer
                .vertex_buffer
                .slice(0..instance.buffer.used_bytes()),
        );

        for batch in &instance.batches {
            pass.set_pipeline(pipeline.pipeline_for(batch.topology));
            pass.draw(batch.vertices.clone(), 0..1);
        }
    }
}

#[derive(Debug)]
struct Instance {
    buffer: InstanceBuffer<SimpleVertex>,
    batches: Vec<DrawBatch>,
}

#[derive(Debug)]
struct Pipeline {
    strip: wgpu::RenderPipeline,
    list: wgpu::RenderPipeline,
    instances: HashMap<usize, Instance>,
}

impl Pipeline {
    fn new(device: &wgpu::Device, format: wgpu::TextureFormat) -> Self {
        let shader = create_shader_module(
            device,
            "Spectrum chart shader",
            include_str!("shaders/spectrum.wgsl"),
        );

        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Spectrum chart pipeline layout"),
            bind_group_layouts: &[],
            push_constant_ranges: &[],
        });

        let build = |label: &'static str, topology: wgpu::PrimitiveTopology| {
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(label),
                layout: Some(&layout),
                vertex: wgpu::VertexState {
                    module: &shader,
                    entry_point: "vs_main",
                    buffers: &[SimpleVertex::layout()],
                },
                fragment: Some(wgpu::FragmentState {
                    module: &shader,
                    entry_point: "fs_main",
                    targets: &[Some(wgpu::ColorTargetState {
                        format,
                        blend: Some(wgpu::BlendState::PREMULTIPLIED_ALPHA_BLENDING),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                }),
                primitive: wgpu::PrimitiveState {
                    topology,
                    strip_index_format: None,
                    front_face: wgpu::FrontFace::Ccw,
                    cull_mode: None,
                    unclipped_depth: false,
                    polygon_mode: wgpu::PolygonMode::Fill,
                    conservative: false,
                },
                depth_stencil: None,
                multisample: wgpu::MultisampleState {
                    count: 1,
                    mask: !0,
                    alpha_to_coverage_enabled: false,
                },
                multiview: None,
            })
        };

        Self {
            strip: build(
                "Spectrum chart fill pipeline",
                wgpu::PrimitiveTopology::TriangleStrip,
            ),
            list: build(
                "Spectrum chart stroke pipeline",
                wgpu::PrimitiveTopology::TriangleList,
            ),
            instances: HashMap::new(),
        }
    }

    fn pipeline_for(&self, topology: Topology) -> &wgpu::RenderPipeline {
        match topology {
            Topology::TriangleStrip => &self.strip,
            Topology::TriangleList => &self.list,
        }
    }

    fn prepare_instance(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        key: usize,
        vertices: &[SimpleVertex],
        batches: Vec<DrawBatch>,
    ) {
        let required_size = std::mem::size_of_val(vertices) as wgpu::BufferAddress;
        let instance = self.instances.entry(key).or_insert_with(|| Instance {
            buffer: InstanceBuffer::new(device, VERTEX_BUFFER_LABEL, required_size),
            batches: Vec::new(),
        });

        instance
            .buffer
            .upload(device, queue, VERTEX_BUFFER_LABEL, vertices);
        instance.batches = batches;
    }

    fn instance(&self, key: usize) -> Option<&Instance> {
        self.instances.get(&key)
    }
}
