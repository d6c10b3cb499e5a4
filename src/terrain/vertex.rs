//! Terrain vertex format and the shared vertex pool

use bytemuck::{Pod, Zeroable};

use super::height_field::{HeightField, LAYER_COUNT};
use super::quadtree::Footprint;
use crate::core::types::Vec3;

/// Terrain vertex with TBN basis and splat weights
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Zeroable, Pod)]
pub struct TerrainVertex {
    /// World space position [x, y, z]
    pub position: [f32; 3],
    /// Surface normal [x, y, z]
    pub normal: [f32; 3],
    /// Tangent along +X, orthogonal to the normal
    pub tangent: [f32; 3],
    /// Binormal along +Z, orthogonal to the normal
    pub binormal: [f32; 3],
    /// Whole-map texture coordinates [u, v]
    pub uv: [f32; 2],
    /// One-hot classification layer weights, all zero when unclassified
    pub splat: [f32; LAYER_COUNT],
}

impl TerrainVertex {
    /// Vertex for grid point (x, y) of the height field
    pub fn from_grid(field: &HeightField, x: u32, y: u32) -> Self {
        let normal = field.normal(x, y);
        let tangent = (Vec3::X - normal * normal.x).try_normalize().unwrap_or(Vec3::X);
        let binormal = tangent.cross(normal);

        let mut splat = [0.0; LAYER_COUNT];
        if let Some(layer) = field.classification(x, y) {
            splat[layer as usize] = 1.0;
        }

        Self {
            position: field.world_position(x, y).to_array(),
            normal: normal.to_array(),
            tangent: tangent.to_array(),
            binormal: binormal.to_array(),
            uv: [
                x as f32 / (field.width() - 1) as f32,
                y as f32 / (field.height() - 1) as f32,
            ],
            splat,
        }
    }

    /// Get the vertex buffer layout for wgpu
    pub fn buffer_layout() -> wgpu::VertexBufferLayout<'static> {
        const ATTRIBUTES: [wgpu::VertexAttribute; 6] = wgpu::vertex_attr_array![
            0 => Float32x3, // Position
            1 => Float32x3, // Normal
            2 => Float32x3, // Tangent
            3 => Float32x3, // Binormal
            4 => Float32x2, // UV
            5 => Float32x3, // Splat
        ];
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<TerrainVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &ATTRIBUTES,
        }
    }
}

/// Append-only staging list that collects every leaf's vertex block
#[derive(Debug, Default)]
pub struct VertexPool {
    staging: Vec<TerrainVertex>,
}

impl VertexPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append the footprint's vertices (row-major) and return the index of
    /// the first one
    pub fn append_leaf(&mut self, field: &HeightField, footprint: &Footprint) -> u32 {
        let base_vertex = self.staging.len() as u32;
        self.staging.reserve((footprint.width * footprint.height) as usize);
        for y in footprint.offset_y..footprint.offset_y + footprint.height {
            for x in footprint.offset_x..footprint.offset_x + footprint.width {
                self.staging.push(TerrainVertex::from_grid(field, x, y));
            }
        }
        base_vertex
    }

    pub fn len(&self) -> usize {
        self.staging.len()
    }

    pub fn is_empty(&self) -> bool {
        self.staging.is_empty()
    }

    /// Hand the collected vertices over as the shared vertex buffer and
    /// clear the staging list
    pub fn freeze(&mut self) -> Vec<TerrainVertex> {
        std::mem::take(&mut self.staging)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp_field() -> HeightField {
        let elevations = (0..16).map(|i| (i % 4) as f32).collect();
        HeightField::from_elevations(4, 4, elevations, 2.0, Vec3::new(100.0, 10.0, 50.0)).unwrap()
    }

    #[test]
    fn test_vertex_is_pod_sized() {
        assert_eq!(std::mem::size_of::<TerrainVertex>(), 17 * 4);
    }

    #[test]
    fn test_buffer_layout_matches_struct() {
        use std::mem::offset_of;

        let layout = TerrainVertex::buffer_layout();
        assert_eq!(layout.array_stride, std::mem::size_of::<TerrainVertex>() as u64);
        assert_eq!(layout.step_mode, wgpu::VertexStepMode::Vertex);

        let offsets: Vec<u64> = layout.attributes.iter().map(|a| a.offset).collect();
        let expected = [
            offset_of!(TerrainVertex, position),
            offset_of!(TerrainVertex, normal),
            offset_of!(TerrainVertex, tangent),
            offset_of!(TerrainVertex, binormal),
            offset_of!(TerrainVertex, uv),
            offset_of!(TerrainVertex, splat),
        ];
        assert_eq!(offsets, expected.map(|o| o as u64).to_vec());

        let locations: Vec<u32> = layout.attributes.iter().map(|a| a.shader_location).collect();
        assert_eq!(locations, vec![0, 1, 2, 3, 4, 5]);
        assert_eq!(layout.attributes[4].format, wgpu::VertexFormat::Float32x2);
    }

    #[test]
    fn test_world_space_position() {
        let field = ramp_field();
        let v = TerrainVertex::from_grid(&field, 3, 1);
        assert_eq!(v.position, [106.0, 13.0, 52.0]);
        assert_eq!(v.uv, [1.0, 1.0 / 3.0]);
        assert_eq!(v.splat, [0.0; 3]);
    }

    #[test]
    fn test_tbn_orthonormal() {
        let field = ramp_field();
        let v = TerrainVertex::from_grid(&field, 1, 1);
        let (n, t, b) = (Vec3::from(v.normal), Vec3::from(v.tangent), Vec3::from(v.binormal));
        assert!(n.dot(t).abs() < 1e-5);
        assert!(n.dot(b).abs() < 1e-5);
        assert!((t.length() - 1.0).abs() < 1e-5);
        assert!(b.z > 0.0);
    }

    #[test]
    fn test_pool_append_and_freeze() {
        let field = ramp_field();
        let mut pool = VertexPool::new();
        let a = pool.append_leaf(&field, &Footprint { offset_x: 0, offset_y: 0, width: 3, height: 3 });
        let b = pool.append_leaf(&field, &Footprint { offset_x: 1, offset_y: 1, width: 3, height: 3 });
        assert_eq!((a, b), (0, 9));
        assert_eq!(pool.len(), 18);

        let vertices = pool.freeze();
        assert_eq!(vertices.len(), 18);
        assert!(pool.is_empty());
        // First vertex of the second block is grid point (1, 1)
        assert_eq!(vertices[9], TerrainVertex::from_grid(&field, 1, 1));
    }
}
