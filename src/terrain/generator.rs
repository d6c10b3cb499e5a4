//! Noise-based procedural heightmap generation

use noise::{Fbm, MultiFractal, NoiseFn, Perlin};

use super::source::ColorGrid;

/// Parameters controlling heightmap generation
#[derive(Clone, Debug)]
pub struct HeightmapParams {
    pub seed: u32,
    pub size: u32,          // Width and height in pixels
    pub feature_scale: f32, // Pixels per noise unit (larger = smoother)
    pub octaves: u32,       // FBM octaves (detail levels)
    pub persistence: f32,   // FBM persistence (0.5 typical)
    pub lacunarity: f32,    // FBM lacunarity (2.0 typical)
}

impl Default for HeightmapParams {
    fn default() -> Self {
        Self {
            seed: 12345,
            size: 256,
            feature_scale: 64.0,
            octaves: 4,
            persistence: 0.5,
            lacunarity: 2.0,
        }
    }
}

/// Generate a grayscale heightmap using fractal Brownian motion (FBM)
pub fn generate_heightmap(params: &HeightmapParams) -> ColorGrid {
    let noise = Fbm::<Perlin>::new(params.seed)
        .set_octaves(params.octaves as usize)
        .set_persistence(params.persistence as f64)
        .set_lacunarity(params.lacunarity as f64);

    ColorGrid::from_fn(params.size, params.size, |x, y| {
        let nx = (x as f32 / params.feature_scale) as f64;
        let ny = (y as f32 / params.feature_scale) as f64;

        // Noise value in [-1, 1] mapped to [0, 255]
        let value = ((noise.get([nx, ny]) + 1.0) * 0.5).clamp(0.0, 1.0);
        let v = (value * 255.0).round() as u8;
        [v, v, v]
    })
}

/// Classification map with the same dimensions where each pixel picks a
/// layer by height band: low = red, middle = green, high = blue.
pub fn classify_by_height(heightmap: &ColorGrid) -> ColorGrid {
    ColorGrid::from_fn(heightmap.width, heightmap.height, |x, y| {
        match heightmap.luminance_sum(x, y) {
            0..=254 => [255, 0, 0],
            255..=509 => [0, 255, 0],
            _ => [0, 0, 255],
        }
    })
}
