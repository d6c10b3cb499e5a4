//! Billboard vegetation scattered over classified terrain cells

use bytemuck::{Pod, Zeroable};
use rand::{rngs::StdRng, Rng, SeedableRng};

use super::config::VegetationConfig;
use super::height_field::{HeightField, LAYER_COUNT, OFF_MAP_HEIGHT};
use super::quadtree::Footprint;
use crate::core::types::Vec3;
use crate::math::Aabb;

/// Corner texture coordinates of a billboard quad
const BILLBOARD_UVS: [[f32; 2]; 4] = [[1.0, 1.0], [1.0, 0.0], [0.0, 0.0], [0.0, 1.0]];

/// Two triangles per billboard
const BILLBOARD_INDICES: [u32; 6] = [0, 1, 2, 0, 2, 3];

/// One corner of a camera-facing billboard. All four corners of an instance
/// share the ground position; the shader expands them using `uv` and `size`.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Zeroable, Pod)]
pub struct BillboardVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
    /// Billboard (width, height)
    pub size: [f32; 2],
    /// Random sway phase in [-1, 1]
    pub phase: f32,
    /// Classification layer, selects the billboard texture
    pub layer: u32,
}

impl BillboardVertex {
    /// Get the vertex buffer layout for wgpu
    pub fn buffer_layout() -> wgpu::VertexBufferLayout<'static> {
        const ATTRIBUTES: [wgpu::VertexAttribute; 6] = wgpu::vertex_attr_array![
            0 => Float32x3, // Position
            1 => Float32x3, // Normal
            2 => Float32x2, // UV
            3 => Float32x2, // Size
            4 => Float32,   // Phase
            5 => Uint32,    // Layer
        ];
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<BillboardVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &ATTRIBUTES,
        }
    }
}

/// Vegetation geometry for one leaf
#[derive(Clone, Debug, Default)]
pub struct VegetationBatch {
    pub vertices: Vec<BillboardVertex>,
    pub indices: Vec<u32>,
    /// Covers every instance, raised by the tallest billboard.
    /// `None` when nothing was placed.
    pub bounds: Option<Aabb>,
}

impl VegetationBatch {
    pub fn instance_count(&self) -> usize {
        self.vertices.len() / 4
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    fn push_instance(&mut self, position: Vec3, normal: Vec3, size: [f32; 2], phase: f32, layer: u8) {
        let base = self.vertices.len() as u32;
        for uv in BILLBOARD_UVS {
            self.vertices.push(BillboardVertex {
                position: position.to_array(),
                normal: normal.to_array(),
                uv,
                size,
                phase,
                layer: layer as u32,
            });
        }
        self.indices.extend(BILLBOARD_INDICES.iter().map(|i| base + i));

        let top = position + Vec3::Y * size[1];
        match &mut self.bounds {
            Some(bounds) => {
                bounds.expand(position);
                bounds.expand(top);
            }
            None => {
                let mut bounds = Aabb::new(position, position);
                bounds.expand(top);
                self.bounds = Some(bounds);
            }
        }
    }
}

/// Places billboard instances using a seeded RNG, so equal seeds and equal
/// scatter order give equal layouts.
#[derive(Debug)]
pub struct VegetationPlacer {
    rng: StdRng,
    min_height: f32,
    billboard_sizes: [[f32; 2]; LAYER_COUNT],
}

impl VegetationPlacer {
    pub fn new(config: &VegetationConfig) -> Self {
        Self {
            rng: StdRng::seed_from_u64(config.seed),
            min_height: config.min_height,
            billboard_sizes: config.billboard_sizes,
        }
    }

    /// One candidate per grid cell of the footprint. Candidates off the map,
    /// on unclassified cells or below the minimum height are dropped.
    pub fn scatter(&mut self, footprint: &Footprint, field: &HeightField) -> VegetationBatch {
        let mut batch = VegetationBatch::default();
        let scale = field.scale();
        let origin = field.origin();

        let x_end = footprint.offset_x + footprint.width.saturating_sub(1);
        let y_end = footprint.offset_y + footprint.height.saturating_sub(1);
        for y in footprint.offset_y..y_end {
            for x in footprint.offset_x..x_end {
                // Draw every cell's numbers up front so rejections don't shift
                // the sequence for later cells
                let jitter_x: f32 = self.rng.r#gen();
                let jitter_z: f32 = self.rng.r#gen();
                let phase: f32 = self.rng.gen_range(-1.0..=1.0);

                let Some(layer) = field.classification(x, y) else {
                    continue;
                };
                let world_x = origin.x + (x as f32 + jitter_x) * scale;
                let world_z = origin.z + (y as f32 + jitter_z) * scale;
                let height = field.height_at(world_x, world_z);
                if height == OFF_MAP_HEIGHT || height < self.min_height {
                    continue;
                }

                let position = Vec3::new(world_x, height, world_z);
                let normal = field.normal_at(world_x, world_z);
                let size = self.billboard_sizes[layer as usize];
                batch.push_instance(position, normal, size, phase, layer);
            }
        }
        batch
    }
}
