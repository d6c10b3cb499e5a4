//! Reactor3D - terrain quadtree LOD and culling engine

pub mod core;
pub mod math;
pub mod terrain;
pub mod render;
pub mod scene;
