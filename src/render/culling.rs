//! Draw ordering by camera distance

use std::cmp::Ordering;

use crate::render::draw::DrawCall;

fn by_distance(a: &DrawCall, b: &DrawCall) -> Ordering {
    a.sort_distance.partial_cmp(&b.sort_distance).unwrap_or(Ordering::Equal)
}

/// Nearest first, so opaque terrain fills depth early and later fragments
/// fail the depth test. Ties keep tree order.
pub fn sort_front_to_back(calls: &mut [DrawCall]) {
    calls.sort_by(by_distance);
}

/// Farthest first, for alpha-blended billboards
pub fn sort_back_to_front(calls: &mut [DrawCall]) {
    calls.sort_by(|a, b| by_distance(b, a));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::draw::{DrawPass, GeometryBuffer, Technique};
    use crate::terrain::quadtree::LeafId;

    fn call(leaf: u32, distance: f32) -> DrawCall {
        DrawCall {
            pass: DrawPass::Vegetation,
            technique: Technique::Billboard,
            vertex_buffer: GeometryBuffer::VegetationVertices(LeafId(leaf)),
            index_buffer: Some(GeometryBuffer::VegetationIndices(LeafId(leaf))),
            base_vertex: 0,
            vertex_count: 4,
            index_count: 6,
            primitive_count: 2,
            sort_distance: distance,
        }
    }

    fn leaves(calls: &[DrawCall]) -> Vec<GeometryBuffer> {
        calls.iter().map(|c| c.vertex_buffer).collect()
    }

    #[test]
    fn test_front_to_back() {
        let mut calls = vec![call(0, 30.0), call(1, 5.0), call(2, 12.0)];
        sort_front_to_back(&mut calls);
        assert_eq!(leaves(&calls), leaves(&[call(1, 0.0), call(2, 0.0), call(0, 0.0)]));
    }

    #[test]
    fn test_back_to_front() {
        let mut calls = vec![call(0, 30.0), call(1, 5.0), call(2, 12.0)];
        sort_back_to_front(&mut calls);
        assert_eq!(leaves(&calls), leaves(&[call(0, 0.0), call(2, 0.0), call(1, 0.0)]));
    }

    #[test]
    fn test_ties_keep_order() {
        let mut calls = vec![call(3, 1.0), call(1, 1.0), call(2, 0.5)];
        sort_front_to_back(&mut calls);
        assert_eq!(leaves(&calls), leaves(&[call(2, 0.0), call(3, 0.0), call(1, 0.0)]));
    }
}
