//! Terrain configuration, loadable from JSON.

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::patch::DetailLevel;
use crate::core::error::Error;
use crate::core::types::{Result, Vec3};

/// Upper bound for the horizontal grid spacing.
pub const MAX_TERRAIN_SCALE: f32 = 2500.0;

// ---------------------------------------------------------------------------
// Terrain config
// ---------------------------------------------------------------------------

/// Settings applied when a terrain is initialized.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainConfig {
    /// World units between adjacent grid vertices. Clamped to 1..=2500.
    pub scale: f32,
    /// Multiplier applied to the normalized height range.
    pub elevation_strength: f32,
    /// Neighbour-averaging rounds applied to the raw heights.
    pub smoothing_passes: u32,
    /// Leaf edge length in cells. Power of two; a node becomes a leaf once
    /// its cell count drops to `leaf_size * leaf_size`.
    pub leaf_size: u32,
    /// Level of detail selected at startup.
    pub detail: DetailLevel,
    /// World position of heightmap pixel (0, 0).
    pub origin: [f32; 3],
    pub draw_terrain: bool,
    pub draw_bounding_boxes: bool,
    pub occlusion_culling: bool,
    pub vegetation: VegetationConfig,
}

impl Default for TerrainConfig {
    fn default() -> Self {
        Self {
            scale: 1.0,
            elevation_strength: 6.0,
            smoothing_passes: 10,
            leaf_size: 64,
            detail: DetailLevel::Ultra,
            origin: [0.0; 3],
            draw_terrain: true,
            draw_bounding_boxes: false,
            occlusion_culling: true,
            vegetation: VegetationConfig::default(),
        }
    }
}

impl TerrainConfig {
    /// Parse from a JSON document. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json).map_err(|e| Error::Config(e.to_string()))?;
        config.validated()
    }

    /// Load from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let config = Self::from_json_str(&text)?;
        log::debug!("Loaded terrain config from {}", path.as_ref().display());
        Ok(config)
    }

    /// Write as pretty-printed JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Horizontal scale after clamping.
    pub fn clamped_scale(&self) -> f32 {
        if self.scale.is_nan() {
            return 1.0;
        }
        self.scale.clamp(1.0, MAX_TERRAIN_SCALE)
    }

    pub fn origin(&self) -> Vec3 {
        Vec3::from_array(self.origin)
    }

    /// Minimum number of cells a node needs before it is split.
    pub fn min_leaf_cells(&self) -> u64 {
        (self.leaf_size as u64) * (self.leaf_size as u64)
    }

    fn validated(mut self) -> Result<Self> {
        if !self.leaf_size.is_power_of_two() {
            return Err(Error::LeafSize(self.leaf_size));
        }
        let clamped = self.clamped_scale();
        if clamped != self.scale {
            log::warn!("Terrain scale {} out of range, clamped to {}", self.scale, clamped);
            self.scale = clamped;
        }
        if self.vegetation.draw_distance < 0.0 {
            return Err(Error::Config(format!(
                "vegetation draw distance must be non-negative, got {}",
                self.vegetation.draw_distance
            )));
        }
        Ok(self)
    }
}

// ---------------------------------------------------------------------------
// Vegetation config
// ---------------------------------------------------------------------------

/// Billboard vegetation scattered over classified cells.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VegetationConfig {
    pub enabled: bool,
    /// Seed for the placement RNG; equal seeds give equal layouts.
    pub seed: u64,
    /// Maximum camera distance at which a leaf's vegetation is drawn.
    pub draw_distance: f32,
    /// Instances below this height are rejected.
    pub min_height: f32,
    /// Forwarded to the shader.
    pub max_height: f32,
    /// Billboard (width, height) for each classification layer.
    pub billboard_sizes: [[f32; 2]; 3],
}

impl Default for VegetationConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            seed: 0,
            draw_distance: 100.0,
            min_height: 0.0,
            max_height: 0.0,
            billboard_sizes: [[1.0, 1.0]; 3],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = TerrainConfig::default();
        assert_eq!(config.leaf_size, 64);
        assert_eq!(config.min_leaf_cells(), 64 * 64);
        assert_eq!(config.detail, DetailLevel::Ultra);
        assert_eq!(config.elevation_strength, 6.0);
        assert_eq!(config.vegetation.draw_distance, 100.0);
        assert!(!config.vegetation.enabled);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = TerrainConfig::from_json_str(r#"{ "leaf_size": 8, "detail": "High" }"#)
            .expect("parse failed");
        assert_eq!(config.leaf_size, 8);
        assert_eq!(config.detail, DetailLevel::High);
        assert_eq!(config.smoothing_passes, 10);
    }

    #[test]
    fn test_invalid_leaf_size() {
        let err = TerrainConfig::from_json_str(r#"{ "leaf_size": 6 }"#).unwrap_err();
        assert!(matches!(err, Error::LeafSize(6)));
    }

    #[test]
    fn test_scale_clamped() {
        let config = TerrainConfig::from_json_str(r#"{ "scale": 9000.0 }"#).unwrap();
        assert_eq!(config.scale, MAX_TERRAIN_SCALE);
        let config = TerrainConfig::from_json_str(r#"{ "scale": 0.25 }"#).unwrap();
        assert_eq!(config.scale, 1.0);
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(TerrainConfig::from_json_str("{ nope"), Err(Error::Config(_))));
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let path = temp_dir.path().join("terrain.json");

        let mut config = TerrainConfig::default();
        config.scale = 4.0;
        config.vegetation.enabled = true;
        config.vegetation.seed = 99;
        config.save(&path).expect("save failed");

        let loaded = TerrainConfig::load(&path).expect("load failed");
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_missing_file() {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let err = TerrainConfig::load(temp_dir.path().join("missing.json")).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}
