//! GPU buffers for terrain geometry

use std::collections::HashMap;

use crate::core::error::Error;
use crate::render::draw::{DrawCall, GeometryBuffer};
use crate::terrain::patch::DetailLevel;
use crate::terrain::quadtree::{LeafId, QuadTreeNode};
use crate::terrain::system::TerrainSystem;

/// Vertices per bounding box proxy (12 triangles)
pub const PROXY_VERTEX_COUNT: u32 = 36;

/// Uploaded terrain geometry, addressed by [`GeometryBuffer`]
pub struct TerrainGpuBuffers {
    vertices: Option<wgpu::Buffer>,
    patch_indices: HashMap<(LeafId, DetailLevel), wgpu::Buffer>,
    vegetation: HashMap<LeafId, (wgpu::Buffer, wgpu::Buffer)>,
    bounds: Option<wgpu::Buffer>,
    /// First proxy vertex of each leaf in `bounds`
    bounds_offsets: HashMap<LeafId, u32>,
}

/// Bounding box triangles of every leaf, packed back to back
pub fn bounds_proxy_vertices(root: &QuadTreeNode) -> (Vec<[f32; 3]>, HashMap<LeafId, u32>) {
    let mut vertices = Vec::new();
    let mut offsets = HashMap::new();
    for leaf in root.leaves() {
        let Some(data) = leaf.leaf() else { continue };
        offsets.insert(data.id, vertices.len() as u32);
        vertices.extend(leaf.bounds().proxy_triangles().iter().map(|p| p.to_array()));
    }
    (vertices, offsets)
}

fn create_filled(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    label: &str,
    usage: wgpu::BufferUsages,
    contents: &[u8],
) -> wgpu::Buffer {
    let buffer = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some(label),
        size: contents.len() as u64,
        usage: usage | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });
    queue.write_buffer(&buffer, 0, contents);
    buffer
}

impl TerrainGpuBuffers {
    /// Upload the shared vertex buffer, every built patch LOD, vegetation
    /// batches and bounding box proxies
    pub fn upload(device: &wgpu::Device, queue: &wgpu::Queue, terrain: &TerrainSystem) -> Result<Self, Error> {
        let root = terrain.root().ok_or(Error::NotInitialized)?;

        let vertices = create_filled(
            device,
            queue,
            "terrain_vertices",
            wgpu::BufferUsages::VERTEX,
            bytemuck::cast_slice(terrain.vertices()),
        );

        let mut patch_indices = HashMap::new();
        let mut vegetation = HashMap::new();
        for leaf in root.leaves() {
            let Some(data) = leaf.leaf() else { continue };
            for lod in data.patch.lods() {
                let buffer = create_filled(
                    device,
                    queue,
                    "terrain_patch_indices",
                    wgpu::BufferUsages::INDEX,
                    bytemuck::cast_slice(&lod.indices),
                );
                patch_indices.insert((data.id, lod.detail), buffer);
            }
            if let Some(batch) = data.vegetation.as_ref().filter(|b| !b.is_empty()) {
                let vb = create_filled(
                    device,
                    queue,
                    "vegetation_vertices",
                    wgpu::BufferUsages::VERTEX,
                    bytemuck::cast_slice(&batch.vertices),
                );
                let ib = create_filled(
                    device,
                    queue,
                    "vegetation_indices",
                    wgpu::BufferUsages::INDEX,
                    bytemuck::cast_slice(&batch.indices),
                );
                vegetation.insert(data.id, (vb, ib));
            }
        }

        let (proxy, bounds_offsets) = bounds_proxy_vertices(root);
        let bounds = create_filled(
            device,
            queue,
            "terrain_bounds_proxies",
            wgpu::BufferUsages::VERTEX,
            bytemuck::cast_slice(&proxy),
        );

        log::debug!(
            "Uploaded terrain: {} vertices, {} patch index buffers, {} vegetation batches",
            terrain.vertices().len(),
            patch_indices.len(),
            vegetation.len()
        );

        Ok(Self {
            vertices: Some(vertices),
            patch_indices,
            vegetation,
            bounds: Some(bounds),
            bounds_offsets,
        })
    }

    /// Look up a buffer and the vertex offset to draw from
    pub fn buffer(&self, id: GeometryBuffer) -> Option<(&wgpu::Buffer, u32)> {
        match id {
            GeometryBuffer::TerrainVertices => self.vertices.as_ref().map(|b| (b, 0)),
            GeometryBuffer::PatchIndices(leaf, detail) => self.patch_indices.get(&(leaf, detail)).map(|b| (b, 0)),
            GeometryBuffer::VegetationVertices(leaf) => self.vegetation.get(&leaf).map(|(vb, _)| (vb, 0)),
            GeometryBuffer::VegetationIndices(leaf) => self.vegetation.get(&leaf).map(|(_, ib)| (ib, 0)),
            GeometryBuffer::BoundsProxy(leaf) => {
                let offset = *self.bounds_offsets.get(&leaf)?;
                self.bounds.as_ref().map(|b| (b, offset))
            }
        }
    }

    /// Record the draw calls into `pass`. The caller binds the pipeline and
    /// uniforms for each technique. Returns the number of calls issued;
    /// calls whose buffers are missing are skipped.
    pub fn draw(&self, pass: &mut wgpu::RenderPass<'_>, calls: &[DrawCall]) -> u32 {
        let mut issued = 0;
        for call in calls {
            let Some((vertex_buffer, first_vertex)) = self.buffer(call.vertex_buffer) else {
                log::warn!("Skipping draw: missing vertex buffer {:?}", call.vertex_buffer);
                continue;
            };
            pass.set_vertex_buffer(0, vertex_buffer.slice(..));

            match call.index_buffer {
                Some(index_id) => {
                    let Some((index_buffer, _)) = self.buffer(index_id) else {
                        log::warn!("Skipping draw: missing index buffer {:?}", index_id);
                        continue;
                    };
                    pass.set_index_buffer(index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                    pass.draw_indexed(0..call.index_count, call.base_vertex as i32, 0..1);
                }
                None => {
                    let start = first_vertex + call.base_vertex;
                    pass.draw(start..start + call.vertex_count, 0..1);
                }
            }
            issued += 1;
        }
        issued
    }

    /// Free every buffer. Safe to call more than once.
    pub fn destroy(&mut self) {
        if let Some(buffer) = self.vertices.take() {
            buffer.destroy();
        }
        if let Some(buffer) = self.bounds.take() {
            buffer.destroy();
        }
        for (_, buffer) in self.patch_indices.drain() {
            buffer.destroy();
        }
        for (_, (vb, ib)) in self.vegetation.drain() {
            vb.destroy();
            ib.destroy();
        }
        self.bounds_offsets.clear();
    }

    pub fn is_destroyed(&self) -> bool {
        self.vertices.is_none()
    }
}

impl Drop for TerrainGpuBuffers {
    fn drop(&mut self) {
        self.destroy();
    }
}
