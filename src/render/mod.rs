//! Rendering outputs and GPU interfaces

pub mod draw;
pub mod culling;
pub mod context;
pub mod buffers;
pub mod occlusion;

pub use buffers::TerrainGpuBuffers;
pub use context::GpuContext;
pub use draw::{DrawCall, DrawList, DrawPass, GeometryBuffer, SceneLighting, Technique, TerrainTextures};
pub use occlusion::GpuOcclusionQueries;
