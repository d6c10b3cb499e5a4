//! Draw calls and shader parameters handed to the renderer.
//!
//! The terrain does not own a shader pipeline. Each frame it produces a
//! [`DrawList`]: geometry references, primitive counts, the technique to use
//! and the uniform values for it.

use bytemuck::{Pod, Zeroable};

use crate::core::types::{Mat4, Vec3};
use crate::terrain::occlusion::OcclusionStats;
use crate::terrain::patch::DetailLevel;
use crate::terrain::quadtree::LeafId;

/// Opaque handle to a texture owned by the host renderer
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TextureId(pub u32);

/// Identifies a buffer produced by the terrain
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GeometryBuffer {
    /// Shared vertex buffer holding every leaf's vertex block
    TerrainVertices,
    /// Index buffer of a leaf at one detail level
    PatchIndices(LeafId, DetailLevel),
    VegetationVertices(LeafId),
    VegetationIndices(LeafId),
    /// Bounding box triangles of a leaf (non-indexed, 36 vertices)
    BoundsProxy(LeafId),
}

/// Which pass of the frame a draw belongs to
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DrawPass {
    Terrain,
    BoundingBoxes,
    Vegetation,
}

/// Shader technique requested for a draw
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Technique {
    /// Splat-mapped terrain with fog and one directional light
    TerrainSplat,
    /// Terrain drawn mirrored for a reflection target
    TerrainReflected,
    /// Debug bounding box
    Bounds,
    /// Alpha-tested camera-facing billboards
    Billboard,
}

impl Technique {
    pub fn name(self) -> &'static str {
        match self {
            Technique::TerrainSplat => "terrain_splat",
            Technique::TerrainReflected => "terrain_reflected",
            Technique::Bounds => "bounds",
            Technique::Billboard => "billboard",
        }
    }
}

/// Face culling requested for the terrain pass
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CullMode {
    #[default]
    Back,
    /// Used while a reflection matrix is active
    None,
}

/// One draw call
#[derive(Clone, Debug, PartialEq)]
pub struct DrawCall {
    pub pass: DrawPass,
    pub technique: Technique,
    pub vertex_buffer: GeometryBuffer,
    /// `None` for non-indexed draws
    pub index_buffer: Option<GeometryBuffer>,
    /// Added to every index (offset of the leaf's block in the vertex buffer)
    pub base_vertex: u32,
    pub vertex_count: u32,
    pub index_count: u32,
    pub primitive_count: u32,
    /// Camera distance used for ordering
    pub sort_distance: f32,
}

/// Uniforms for the terrain technique.
/// Must match `TerrainParams` in the terrain shader.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct TerrainShaderParams {
    pub view_proj: [[f32; 4]; 4],
    /// Identity, or the reflection matrix for a mirrored pass
    pub world: [[f32; 4]; 4],
    /// xyz = camera position, w = elapsed seconds
    pub camera_position: [f32; 4],
    /// xyz = direction towards the light
    pub light_direction: [f32; 4],
    pub light_color: [f32; 4],
    pub ambient_color: [f32; 4],
    pub fog_color: [f32; 4],
    /// x = start, y = end, z = enabled (0 or 1), w = padding
    pub fog_params: [f32; 4],
}

/// Uniforms for the billboard technique.
/// Must match `VegetationParams` in the billboard shader.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct VegetationShaderParams {
    pub view_proj: [[f32; 4]; 4],
    /// xyz = camera position, w = elapsed seconds
    pub camera_position: [f32; 4],
    pub light_direction: [f32; 4],
    pub light_color: [f32; 4],
    /// x = min height, y = max height, z = draw distance, w = padding
    pub height_range: [f32; 4],
}

/// Linear distance fog
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FogParams {
    pub enabled: bool,
    pub color: Vec3,
    pub start: f32,
    pub end: f32,
}

impl Default for FogParams {
    fn default() -> Self {
        Self {
            enabled: false,
            color: Vec3::splat(0.5),
            start: 100.0,
            end: 1000.0,
        }
    }
}

/// Scene lighting passed in by the host each frame
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SceneLighting {
    /// Direction towards the light
    pub light_direction: Vec3,
    pub light_color: Vec3,
    pub ambient_color: Vec3,
    pub fog: FogParams,
}

impl Default for SceneLighting {
    fn default() -> Self {
        Self {
            light_direction: Vec3::new(0.3, 1.0, 0.2).normalize(),
            light_color: Vec3::ONE,
            ambient_color: Vec3::splat(0.2),
            fog: FogParams::default(),
        }
    }
}

impl SceneLighting {
    /// Lighting for a mirrored pass: the light direction's Y is flipped
    pub fn reflected(&self) -> Self {
        let mut lighting = *self;
        lighting.light_direction.y = -lighting.light_direction.y;
        lighting
    }
}

/// Textures bound for the terrain and vegetation passes
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TerrainTextures {
    /// Diffuse texture per classification layer
    pub layers: [Option<TextureId>; 3],
    /// Billboard texture per classification layer
    pub billboards: [Option<TextureId>; 3],
}

/// Counters for one frame
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FrameStats {
    pub leaves_drawn: u32,
    pub triangles: u32,
    pub bounding_boxes: u32,
    pub vegetation_batches: u32,
    pub vegetation_instances: u32,
    pub occlusion: OcclusionStats,
}

/// Everything the renderer needs for one frame of terrain
#[derive(Clone, Debug, Default)]
pub struct DrawList {
    pub calls: Vec<DrawCall>,
    pub terrain_params: Option<TerrainShaderParams>,
    pub vegetation_params: Option<VegetationShaderParams>,
    pub textures: TerrainTextures,
    pub cull_mode: CullMode,
    pub stats: FrameStats,
}

impl DrawList {
    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }

    pub fn len(&self) -> usize {
        self.calls.len()
    }

    /// Draw calls of one pass, in submission order
    pub fn pass(&self, pass: DrawPass) -> impl Iterator<Item = &DrawCall> {
        self.calls.iter().filter(move |c| c.pass == pass)
    }
}

impl TerrainShaderParams {
    pub fn new(view_proj: Mat4, world: Mat4, camera_position: Vec3, elapsed: f32, lighting: &SceneLighting) -> Self {
        let fog = &lighting.fog;
        Self {
            view_proj: view_proj.to_cols_array_2d(),
            world: world.to_cols_array_2d(),
            camera_position: camera_position.extend(elapsed).to_array(),
            light_direction: lighting.light_direction.extend(0.0).to_array(),
            light_color: lighting.light_color.extend(1.0).to_array(),
            ambient_color: lighting.ambient_color.extend(1.0).to_array(),
            fog_color: fog.color.extend(1.0).to_array(),
            fog_params: [fog.start, fog.end, if fog.enabled { 1.0 } else { 0.0 }, 0.0],
        }
    }
}

impl VegetationShaderParams {
    pub fn new(
        view_proj: Mat4,
        camera_position: Vec3,
        elapsed: f32,
        lighting: &SceneLighting,
        min_height: f32,
        max_height: f32,
        draw_distance: f32,
    ) -> Self {
        Self {
            view_proj: view_proj.to_cols_array_2d(),
            camera_position: camera_position.extend(elapsed).to_array(),
            light_direction: lighting.light_direction.extend(0.0).to_array(),
            light_color: lighting.light_color.extend(1.0).to_array(),
            height_range: [min_height, max_height, draw_distance, 0.0],
        }
    }
}
