//! Heightmap terrain: quadtree LOD, culling and vegetation

pub mod source;
pub mod generator;
pub mod config;
pub mod height_field;
pub mod patch;
pub mod vertex;
pub mod vegetation;
pub mod occlusion;
pub mod quadtree;
pub mod system;

pub use config::{TerrainConfig, VegetationConfig};
pub use height_field::{HeightField, OFF_MAP_HEIGHT};
pub use occlusion::{OcclusionQueries, OcclusionState, QueryError, QueryId, QueryPoll};
pub use patch::{DetailLevel, TerrainPatch};
pub use quadtree::{Footprint, LeafId, QuadTreeNode};
pub use source::ColorGrid;
pub use system::TerrainSystem;
