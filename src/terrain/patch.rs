//! Per-leaf index buffers at several levels of detail

use serde::{Deserialize, Serialize};

/// Level of detail, expressed as the vertex stride used to sample a leaf
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DetailLevel {
    Low,
    Medium,
    High,
    Highest,
    #[default]
    Ultra,
}

impl DetailLevel {
    /// All levels, coarsest first
    pub const ALL: [DetailLevel; 5] = [
        DetailLevel::Low,
        DetailLevel::Medium,
        DetailLevel::High,
        DetailLevel::Highest,
        DetailLevel::Ultra,
    ];

    /// Distance between sampled vertices, in grid cells
    pub fn stride(self) -> u32 {
        match self {
            DetailLevel::Low => 8,
            DetailLevel::Medium => 6,
            DetailLevel::High => 4,
            DetailLevel::Highest => 2,
            DetailLevel::Ultra => 1,
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// Triangle-list indices for one leaf at one detail level.
/// Indices address the leaf's own vertex block (`x + y * width`).
#[derive(Clone, Debug, PartialEq)]
pub struct PatchLod {
    pub detail: DetailLevel,
    /// Stride actually used after shrinking to fit the leaf
    pub stride: u32,
    pub indices: Vec<u32>,
    pub triangle_count: u32,
}

/// Index buffers for a leaf, one per built detail level
#[derive(Clone, Debug)]
pub struct TerrainPatch {
    width: u32,
    height: u32,
    lods: [Option<PatchLod>; 5],
}

impl TerrainPatch {
    /// Stride for `detail`, halved until it fits inside the leaf
    pub fn effective_stride(width: u32, height: u32, detail: DetailLevel) -> u32 {
        let span = width.min(height).saturating_sub(1);
        let mut stride = detail.stride();
        while stride >= span && stride > 1 {
            stride /= 2;
        }
        stride
    }

    /// Sampled rows or columns along an axis of `len` vertices. The last
    /// sample is always `len - 1`, so a stride that does not divide the
    /// span ends with one shorter quad.
    fn samples(len: u32, stride: u32) -> Vec<u32> {
        let last = len.saturating_sub(1);
        let mut samples: Vec<u32> = (0..last).step_by(stride as usize).collect();
        samples.push(last);
        samples
    }

    /// Build the index list for a `width` x `height` vertex block.
    ///
    /// Each sampled quad is split along the diagonal from (x+1, y) to
    /// (x, y+1), matching the height interpolation, and both triangles wind
    /// counter-clockwise seen from +Y.
    pub fn build_indices(width: u32, height: u32, detail: DetailLevel) -> PatchLod {
        let stride = Self::effective_stride(width, height, detail);
        let columns = Self::samples(width, stride);
        let rows = Self::samples(height, stride);

        let quads = (columns.len() - 1) * (rows.len() - 1);
        let mut indices = Vec::with_capacity(quads * 6);
        for row in rows.windows(2) {
            for column in columns.windows(2) {
                let (c0, c1) = (column[0], column[1]);
                let (r0, r1) = (row[0], row[1]);

                let top_left = c0 + r0 * width;
                let top_right = c1 + r0 * width;
                let bottom_left = c0 + r1 * width;
                let bottom_right = c1 + r1 * width;

                indices.extend_from_slice(&[
                    top_left, bottom_left, top_right,
                    top_right, bottom_left, bottom_right,
                ]);
            }
        }

        let triangle_count = (indices.len() / 3) as u32;
        PatchLod { detail, stride, indices, triangle_count }
    }

    /// Empty patch for a `width` x `height` vertex block
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height, lods: Default::default() }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Build (or rebuild) the index list for `detail`
    pub fn add_lod(&mut self, detail: DetailLevel) -> &PatchLod {
        let lod = Self::build_indices(self.width, self.height, detail);
        self.lods[detail.index()].insert(lod)
    }

    pub fn has_lod(&self, detail: DetailLevel) -> bool {
        self.lods[detail.index()].is_some()
    }

    /// LOD for `detail`; falls back to the next finer built level, then to
    /// any built level.
    pub fn lod(&self, detail: DetailLevel) -> Option<&PatchLod> {
        self.lods[detail.index()..]
            .iter()
            .chain(self.lods[..detail.index()].iter().rev())
            .find_map(|lod| lod.as_ref())
    }

    /// Built LODs, coarsest first
    pub fn lods(&self) -> impl Iterator<Item = &PatchLod> {
        self.lods.iter().flatten()
    }
}
