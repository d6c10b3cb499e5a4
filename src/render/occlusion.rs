//! wgpu occlusion query backend
//!
//! Queries queued by [`OcclusionQueries::begin_query`] are recorded by
//! [`GpuOcclusionQueries::encode`] as depth-tested bounding box proxies.
//! Results are copied to a readback buffer and mapped without blocking;
//! [`OcclusionQueries::poll_query`] reports `Pending` until they arrive.

use std::sync::mpsc;

use bytemuck::{Pod, Zeroable};
use glam::Mat4;

use crate::core::error::Error;
use crate::math::Aabb;
use crate::render::buffers::PROXY_VERTEX_COUNT;
use crate::terrain::occlusion::{OcclusionQueries, QueryError, QueryId, QueryPoll};

const PROXY_VERTEX_STRIDE: u64 = std::mem::size_of::<[f32; 3]>() as u64;

#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
struct ProxyUniforms {
    view_proj: [[f32; 4]; 4],
}

/// Lifecycle of one query slot
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Slot {
    Free,
    Queued,
    Submitted,
    Resolving,
    Ready(u64),
}

/// Slot bookkeeping, independent of the device
#[derive(Debug)]
struct SlotTable {
    slots: Vec<Slot>,
}

impl SlotTable {
    fn new(capacity: u32) -> Self {
        Self { slots: vec![Slot::Free; capacity as usize] }
    }

    fn index(&self, id: QueryId) -> Result<usize, QueryError> {
        let index = id.0 as usize;
        if index < self.slots.len() { Ok(index) } else { Err(QueryError::UnknownQuery(id)) }
    }

    /// Free and unread results can be reused
    fn queue(&mut self, id: QueryId) -> Result<(), QueryError> {
        let index = self.index(id)?;
        match self.slots[index] {
            Slot::Free | Slot::Ready(_) => {
                self.slots[index] = Slot::Queued;
                Ok(())
            }
            _ => Err(QueryError::Busy),
        }
    }

    fn mark_submitted(&mut self, id: QueryId) {
        if let Some(slot) = self.slots.get_mut(id.0 as usize) {
            *slot = Slot::Submitted;
        }
    }

    /// Move submitted slots into the next readback. Returns whether any moved.
    fn start_resolve(&mut self) -> bool {
        let mut any = false;
        for slot in &mut self.slots {
            if *slot == Slot::Submitted {
                *slot = Slot::Resolving;
                any = true;
            }
        }
        any
    }

    fn finish_resolve(&mut self, samples: &[u64]) {
        for (slot, &count) in self.slots.iter_mut().zip(samples) {
            if *slot == Slot::Resolving {
                *slot = Slot::Ready(count);
            }
        }
    }

    /// Put slots back so the next encode resolves them again
    fn fail_resolve(&mut self) {
        for slot in &mut self.slots {
            if *slot == Slot::Resolving {
                *slot = Slot::Submitted;
            }
        }
    }

    fn take(&mut self, id: QueryId) -> Result<QueryPoll, QueryError> {
        let index = self.index(id)?;
        match self.slots[index] {
            Slot::Ready(count) => {
                self.slots[index] = Slot::Free;
                Ok(QueryPoll::Complete(count))
            }
            Slot::Free => Err(QueryError::UnknownQuery(id)),
            Slot::Queued | Slot::Submitted | Slot::Resolving => Ok(QueryPoll::Pending),
        }
    }
}

/// Write every query once with no draws, so resolving the whole set never
/// touches a query that was never begun
fn prime_queries(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    query_set: &wgpu::QuerySet,
    capacity: u32,
    depth_format: wgpu::TextureFormat,
) {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("terrain_occlusion_prime_depth"),
        size: wgpu::Extent3d { width: 1, height: 1, depth_or_array_layers: 1 },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: depth_format,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("terrain_occlusion_prime"),
    });
    {
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("terrain_occlusion_prime_pass"),
            color_attachments: &[],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Discard,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: Some(query_set),
            multiview_mask: None,
        });
        for index in 0..capacity {
            pass.begin_occlusion_query(index);
            pass.end_occlusion_query();
        }
    }
    queue.submit(std::iter::once(encoder.finish()));
}

/// Occlusion queries backed by a wgpu query set
pub struct GpuOcclusionQueries {
    device: wgpu::Device,
    queue: wgpu::Queue,
    capacity: u32,
    query_set: wgpu::QuerySet,
    pipeline: wgpu::RenderPipeline,
    bind_group: wgpu::BindGroup,
    uniform_buffer: wgpu::Buffer,
    proxy_buffer: wgpu::Buffer,
    resolve_buffer: wgpu::Buffer,
    read_buffer: wgpu::Buffer,
    slots: SlotTable,
    pending: Vec<(QueryId, Aabb)>,
    awaiting_map: bool,
    mapping: Option<mpsc::Receiver<Result<(), wgpu::BufferAsyncError>>>,
}

impl GpuOcclusionQueries {
    /// Create a backend with one slot per leaf. Proxies are depth tested
    /// against a `depth_format` attachment supplied to [`Self::encode`].
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        capacity: u32,
        depth_format: wgpu::TextureFormat,
    ) -> Result<Self, Error> {
        if capacity == 0 || capacity > wgpu::QUERY_SET_MAX_QUERIES {
            return Err(Error::Gpu(format!(
                "occlusion query capacity must be in 1..={} (got {})",
                wgpu::QUERY_SET_MAX_QUERIES,
                capacity
            )));
        }

        let query_set = device.create_query_set(&wgpu::QuerySetDescriptor {
            label: Some("terrain_occlusion_queries"),
            ty: wgpu::QueryType::Occlusion,
            count: capacity,
        });

        let result_size = capacity as u64 * std::mem::size_of::<u64>() as u64;
        let resolve_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("terrain_occlusion_resolve"),
            size: result_size,
            usage: wgpu::BufferUsages::QUERY_RESOLVE | wgpu::BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        });
        let read_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("terrain_occlusion_read"),
            size: result_size,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let proxy_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("terrain_occlusion_proxies"),
            size: capacity as u64 * PROXY_VERTEX_COUNT as u64 * PROXY_VERTEX_STRIDE,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("terrain_occlusion_uniforms"),
            size: std::mem::size_of::<ProxyUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("terrain_occlusion_bind_group_layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("terrain_occlusion_bind_group"),
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("terrain_occlusion_proxy_shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("../../shaders/occlusion_proxy.wgsl").into()),
        });
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("terrain_occlusion_pipeline_layout"),
            bind_group_layouts: &[&bind_group_layout],
            immediate_size: 0,
        });
        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("terrain_occlusion_pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: PROXY_VERTEX_STRIDE,
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes: &wgpu::vertex_attr_array![0 => Float32x3],
                }],
                compilation_options: Default::default(),
            },
            fragment: None,
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                cull_mode: None,
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: depth_format,
                depth_write_enabled: false,
                depth_compare: wgpu::CompareFunction::LessEqual,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        });

        prime_queries(device, queue, &query_set, capacity, depth_format);
        log::debug!("Created occlusion query backend with {} slots", capacity);

        Ok(Self {
            device: device.clone(),
            queue: queue.clone(),
            capacity,
            query_set,
            pipeline,
            bind_group,
            uniform_buffer,
            proxy_buffer,
            resolve_buffer,
            read_buffer,
            slots: SlotTable::new(capacity),
            pending: Vec::new(),
            awaiting_map: false,
            mapping: None,
        })
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Record queued proxies against `depth_view` and, when the readback
    /// buffer is free, copy the results out. Call at most once per
    /// submission, after the terrain has written depth.
    pub fn encode(&mut self, encoder: &mut wgpu::CommandEncoder, depth_view: &wgpu::TextureView, view_proj: Mat4) {
        if !self.pending.is_empty() {
            let uniforms = ProxyUniforms { view_proj: view_proj.to_cols_array_2d() };
            self.queue.write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(&uniforms));

            let vertices: Vec<[f32; 3]> = self
                .pending
                .iter()
                .flat_map(|(_, bounds)| bounds.proxy_triangles().map(|p| p.to_array()))
                .collect();
            self.queue.write_buffer(&self.proxy_buffer, 0, bytemuck::cast_slice(&vertices));

            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("terrain_occlusion_pass"),
                color_attachments: &[],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: Some(&self.query_set),
                multiview_mask: None,
            });
            pass.set_pipeline(&self.pipeline);
            pass.set_bind_group(0, &self.bind_group, &[]);
            pass.set_vertex_buffer(0, self.proxy_buffer.slice(..));

            for (i, (id, _)) in self.pending.iter().enumerate() {
                let start = i as u32 * PROXY_VERTEX_COUNT;
                pass.begin_occlusion_query(id.0);
                pass.draw(start..start + PROXY_VERTEX_COUNT, 0..1);
                pass.end_occlusion_query();
            }
            drop(pass);

            for (id, _) in self.pending.drain(..) {
                self.slots.mark_submitted(id);
            }
        }

        if self.mapping.is_none() && !self.awaiting_map && self.slots.start_resolve() {
            encoder.resolve_query_set(&self.query_set, 0..self.capacity, &self.resolve_buffer, 0);
            encoder.copy_buffer_to_buffer(&self.resolve_buffer, 0, &self.read_buffer, 0, self.resolve_buffer.size());
            self.awaiting_map = true;
        }
    }

    /// Start mapping the results copied by the last [`Self::encode`].
    /// Call after the encoder has been submitted.
    pub fn after_submit(&mut self) {
        if !self.awaiting_map {
            return;
        }
        self.awaiting_map = false;

        let (tx, rx) = mpsc::channel();
        self.read_buffer.slice(..).map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        self.mapping = Some(rx);
    }

    /// Collect mapped results if they have arrived
    fn pump(&mut self) -> Result<(), QueryError> {
        let received = match self.mapping.as_ref() {
            Some(rx) => {
                self.device
                    .poll(wgpu::PollType::Poll)
                    .map_err(|e| QueryError::Device(e.to_string()))?;
                rx.try_recv()
            }
            None => return Ok(()),
        };

        match received {
            Ok(Ok(())) => {
                {
                    let data = self.read_buffer.slice(..).get_mapped_range();
                    let samples: &[u64] = bytemuck::cast_slice(&data);
                    self.slots.finish_resolve(samples);
                }
                self.read_buffer.unmap();
                self.mapping = None;
                Ok(())
            }
            Ok(Err(e)) => {
                self.mapping = None;
                self.slots.fail_resolve();
                Err(QueryError::Device(e.to_string()))
            }
            Err(mpsc::TryRecvError::Empty) => Ok(()),
            Err(mpsc::TryRecvError::Disconnected) => {
                self.mapping = None;
                self.slots.fail_resolve();
                Err(QueryError::Device("occlusion readback was dropped".to_string()))
            }
        }
    }
}

impl OcclusionQueries for GpuOcclusionQueries {
    fn begin_query(&mut self, id: QueryId, bounds: &Aabb) -> Result<(), QueryError> {
        self.slots.queue(id)?;
        self.pending.push((id, *bounds));
        Ok(())
    }

    fn poll_query(&mut self, id: QueryId) -> Result<QueryPoll, QueryError> {
        self.slots.index(id)?;
        self.pump()?;
        self.slots.take(id)
    }
}
