//! Elevation grid, vertex normals and classification layers

use super::quadtree::Footprint;
use super::source::ColorGrid;
use crate::core::error::Error;
use crate::core::types::{Result, Vec3};

/// Height returned for positions outside the terrain
pub const OFF_MAP_HEIGHT: f32 = -10000.0;

/// Classification pixels whose channel sum is at or below this carry no layer
const CLASSIFICATION_THRESHOLD: u32 = 10;

/// Number of classification layers (red, green, blue)
pub const LAYER_COUNT: usize = 3;

/// Immutable terrain elevation grid.
///
/// Grid point (x, y) sits at world `origin + (x * scale, elevation, y * scale)`.
#[derive(Clone, Debug)]
pub struct HeightField {
    width: u32,
    height: u32,
    scale: f32,
    origin: Vec3,
    elevations: Vec<f32>,
    normals: Vec<Vec3>,
    classes: Vec<Option<u8>>,
}

impl HeightField {
    /// Build from a heightmap (R + G + B per pixel) and optional
    /// classification map.
    pub fn build(
        heightmap: &ColorGrid,
        classification: Option<&ColorGrid>,
        elevation_strength: f32,
        scale: f32,
        smoothing_passes: u32,
        origin: Vec3,
    ) -> Result<Self> {
        let (width, height) = (heightmap.width, heightmap.height);
        if width < 2 || height < 2 || !heightmap.is_complete() {
            return Err(Error::HeightmapDimensions { width, height });
        }
        if let Some(map) = classification.filter(|m| !m.is_complete()) {
            return Err(Error::ClassificationDimensions { width: map.width, height: map.height });
        }

        let raw: Vec<u32> = (0..height)
            .flat_map(|y| (0..width).map(move |x| (x, y)))
            .map(|(x, y)| heightmap.luminance_sum(x, y))
            .collect();
        let min = raw.iter().copied().min().unwrap_or(0);
        let max = raw.iter().copied().max().unwrap_or(0);
        let range = (max - min) as f32;

        let mut elevations: Vec<f32> = raw
            .iter()
            .map(|&r| {
                if range > 0.0 {
                    (r - min) as f32 / range * elevation_strength * scale
                } else {
                    0.0
                }
            })
            .collect();

        for _ in 0..smoothing_passes {
            elevations = smooth(&elevations, width, height);
        }

        let classes = match classification {
            Some(map) => classify(map, width, height),
            None => vec![None; elevations.len()],
        };

        Ok(Self::assemble(width, height, scale, origin, elevations, classes))
    }

    /// Build from precomputed elevations (row-major, `width * height`)
    pub fn from_elevations(
        width: u32,
        height: u32,
        elevations: Vec<f32>,
        scale: f32,
        origin: Vec3,
    ) -> Result<Self> {
        if width < 2 || height < 2 || elevations.len() != (width as usize) * (height as usize) {
            return Err(Error::HeightmapDimensions { width, height });
        }
        let classes = vec![None; elevations.len()];
        Ok(Self::assemble(width, height, scale, origin, elevations, classes))
    }

    fn assemble(
        width: u32,
        height: u32,
        scale: f32,
        origin: Vec3,
        elevations: Vec<f32>,
        classes: Vec<Option<u8>>,
    ) -> Self {
        let mut field = Self {
            width,
            height,
            scale,
            origin,
            elevations,
            normals: Vec::new(),
            classes,
        };
        field.normals = field.compute_normals();
        field
    }

    fn compute_normals(&self) -> Vec<Vec3> {
        let mut normals = Vec::with_capacity(self.elevations.len());
        for y in 0..self.height {
            for x in 0..self.width {
                // Central differences, one-sided at the borders
                let x0 = x.saturating_sub(1);
                let x1 = (x + 1).min(self.width - 1);
                let y0 = y.saturating_sub(1);
                let y1 = (y + 1).min(self.height - 1);

                let tx = Vec3::new(
                    (x1 - x0) as f32 * self.scale,
                    self.elevation(x1, y) - self.elevation(x0, y),
                    0.0,
                );
                let tz = Vec3::new(
                    0.0,
                    self.elevation(x, y1) - self.elevation(x, y0),
                    (y1 - y0) as f32 * self.scale,
                );
                normals.push(tz.cross(tx).try_normalize().unwrap_or(Vec3::Y));
            }
        }
        normals
    }

    #[inline]
    fn idx(&self, x: u32, y: u32) -> usize {
        (x + y * self.width) as usize
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn origin(&self) -> Vec3 {
        self.origin
    }

    /// Smoothed elevation at a grid point, relative to the origin
    #[inline]
    pub fn elevation(&self, x: u32, y: u32) -> f32 {
        self.elevations[self.idx(x, y)]
    }

    #[inline]
    pub fn normal(&self, x: u32, y: u32) -> Vec3 {
        self.normals[self.idx(x, y)]
    }

    /// Classification layer (0 = red, 1 = green, 2 = blue)
    #[inline]
    pub fn classification(&self, x: u32, y: u32) -> Option<u8> {
        self.classes[self.idx(x, y)]
    }

    /// World position of a grid point
    pub fn world_position(&self, x: u32, y: u32) -> Vec3 {
        self.origin + Vec3::new(x as f32 * self.scale, self.elevation(x, y), y as f32 * self.scale)
    }

    /// Lowest and highest elevation inside a footprint (relative to origin)
    pub fn min_max_in(&self, footprint: &Footprint) -> (f32, f32) {
        let x_end = (footprint.offset_x + footprint.width).min(self.width);
        let y_end = (footprint.offset_y + footprint.height).min(self.height);

        let mut min = f32::INFINITY;
        let mut max = f32::NEG_INFINITY;
        for y in footprint.offset_y..y_end {
            for x in footprint.offset_x..x_end {
                let h = self.elevation(x, y);
                min = min.min(h);
                max = max.max(h);
            }
        }
        if min > max { (0.0, 0.0) } else { (min, max) }
    }

    fn to_local(&self, world_x: f32, world_z: f32) -> (f32, f32) {
        (
            (world_x - self.origin.x) / self.scale,
            (world_z - self.origin.z) / self.scale,
        )
    }

    fn in_extent(&self, lx: f32, lz: f32) -> bool {
        lx >= 0.0 && lz >= 0.0 && lx <= (self.width - 1) as f32 && lz <= (self.height - 1) as f32
    }

    /// True iff (x, z) lies within the grid extent
    pub fn is_above_terrain(&self, world_x: f32, world_z: f32) -> bool {
        let (lx, lz) = self.to_local(world_x, world_z);
        self.in_extent(lx, lz)
    }

    /// Cell and barycentric offsets for a local coordinate inside the extent
    fn cell(&self, lx: f32, lz: f32) -> (u32, u32, f32, f32) {
        let x = (lx.floor() as u32).min(self.width - 2);
        let y = (lz.floor() as u32).min(self.height - 2);
        (x, y, lx - x as f32, lz - y as f32)
    }

    /// Interpolated world height, `OFF_MAP_HEIGHT` outside the grid
    pub fn height_at(&self, world_x: f32, world_z: f32) -> f32 {
        let (lx, lz) = self.to_local(world_x, world_z);
        if !self.in_extent(lx, lz) {
            return OFF_MAP_HEIGHT;
        }
        let (x, y, fx, fz) = self.cell(lx, lz);
        let corners = [
            self.elevation(x, y),
            self.elevation(x + 1, y),
            self.elevation(x, y + 1),
            self.elevation(x + 1, y + 1),
        ];
        interpolate(corners, fx, fz) + self.origin.y
    }

    /// Interpolated unit normal; coordinates are clamped onto the grid
    pub fn normal_at(&self, world_x: f32, world_z: f32) -> Vec3 {
        let (lx, lz) = self.to_local(world_x, world_z);
        let lx = if lx.is_nan() { 0.0 } else { lx.clamp(0.0, (self.width - 1) as f32) };
        let lz = if lz.is_nan() { 0.0 } else { lz.clamp(0.0, (self.height - 1) as f32) };
        let (x, y, fx, fz) = self.cell(lx, lz);
        let corners = [
            self.normal(x, y),
            self.normal(x + 1, y),
            self.normal(x, y + 1),
            self.normal(x + 1, y + 1),
        ];
        interpolate(corners, fx, fz).try_normalize().unwrap_or(Vec3::Y)
    }
}

/// Interpolate over the cell triangle containing (fx, fz).
/// Corners are ordered (x, y), (x+1, y), (x, y+1), (x+1, y+1).
fn interpolate<T>(c: [T; 4], fx: f32, fz: f32) -> T
where
    T: Copy + std::ops::Add<Output = T> + std::ops::Sub<Output = T> + std::ops::Mul<f32, Output = T>,
{
    if fx + fz < 1.0 {
        c[0] + (c[1] - c[0]) * fx + (c[2] - c[0]) * fz
    } else {
        c[3] + (c[1] - c[3]) * (1.0 - fz) + (c[2] - c[3]) * (1.0 - fx)
    }
}

/// One smoothing round: each height becomes the mean of itself and the
/// average of its in-bounds neighbours.
fn smooth(src: &[f32], width: u32, height: u32) -> Vec<f32> {
    let (w, h) = (width as i64, height as i64);
    let mut out = Vec::with_capacity(src.len());
    for y in 0..h {
        for x in 0..w {
            let mut sum = 0.0;
            let mut count = 0u32;
            for dy in -1..=1 {
                for dx in -1..=1 {
                    if dx == 0 && dy == 0 {
                        continue;
                    }
                    let (nx, ny) = (x + dx, y + dy);
                    if nx >= 0 && ny >= 0 && nx < w && ny < h {
                        sum += src[(nx + ny * w) as usize];
                        count += 1;
                    }
                }
            }
            let here = src[(x + y * w) as usize];
            out.push((here + sum / count as f32) * 0.5);
        }
    }
    out
}

/// Strongest channel of a classification pixel
fn layer_of([r, g, b]: [u8; 3]) -> Option<u8> {
    if r as u32 + g as u32 + b as u32 <= CLASSIFICATION_THRESHOLD {
        None
    } else if r >= g && r >= b {
        Some(0)
    } else if g >= b {
        Some(1)
    } else {
        Some(2)
    }
}

/// Sample the classification map nearest-neighbour onto the height grid
fn classify(map: &ColorGrid, width: u32, height: u32) -> Vec<Option<u8>> {
    let mut classes = Vec::with_capacity((width as usize) * (height as usize));
    for y in 0..height {
        for x in 0..width {
            if map.width == 0 || map.height == 0 {
                classes.push(None);
                continue;
            }
            let cx = ((x as u64 * map.width as u64) / width as u64) as u32;
            let cy = ((y as u64 * map.height as u64) / height as u64) as u32;
            classes.push(layer_of(map.get(cx, cy)));
        }
    }
    classes
}
