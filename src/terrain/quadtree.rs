//! Quadtree over the height field: bounds, leaf patches and culling

use super::height_field::HeightField;
use super::occlusion::{LeafOcclusion, QueryId};
use super::patch::{DetailLevel, PatchLod, TerrainPatch};
use super::vegetation::{VegetationBatch, VegetationPlacer};
use super::vertex::VertexPool;
use crate::core::types::Vec3;
use crate::math::{Aabb, BoundingSphere, Containment, Frustum};
use crate::render::draw::{DrawCall, DrawPass, GeometryBuffer, Technique};

/// Subtracted from a node's lowest elevation so the box never touches the
/// surface it encloses
const BOUNDS_EPSILON: f32 = 0.1;

/// Leaf index, assigned depth-first in construction order
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LeafId(pub u32);

/// Rectangle of grid vertices covered by a node
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Footprint {
    pub offset_x: u32,
    pub offset_y: u32,
    /// Vertex columns
    pub width: u32,
    /// Vertex rows
    pub height: u32,
}

impl Footprint {
    /// Footprint covering the whole height field
    pub fn full(field: &HeightField) -> Self {
        Self { offset_x: 0, offset_y: 0, width: field.width(), height: field.height() }
    }

    pub fn cell_count(&self) -> u64 {
        (self.width.saturating_sub(1) as u64) * (self.height.saturating_sub(1) as u64)
    }

    /// A footprint needs at least 3 vertices per side to produce smaller
    /// children
    pub fn can_split(&self) -> bool {
        self.width > 2 && self.height > 2
    }

    /// Quarter into top-left, top-right, bottom-left, bottom-right.
    /// Children share their boundary vertices; when the cell count along an
    /// axis is odd they overlap by one cell.
    pub fn split(&self) -> [Footprint; 4] {
        let child_w = self.width / 2 + 1;
        let child_h = self.height / 2 + 1;
        let right = self.offset_x + self.width - child_w;
        let bottom = self.offset_y + self.height - child_h;
        let quad = |offset_x, offset_y| Footprint { offset_x, offset_y, width: child_w, height: child_h };
        [
            quad(self.offset_x, self.offset_y),
            quad(right, self.offset_y),
            quad(self.offset_x, bottom),
            quad(right, bottom),
        ]
    }
}

/// Inputs shared by every node during construction
pub struct BuildContext<'a> {
    pub field: &'a HeightField,
    /// A node becomes a leaf once its cell count is at or below this
    pub min_leaf_cells: u64,
    pub detail: DetailLevel,
    pub vertices: &'a mut VertexPool,
    pub vegetation: Option<&'a mut VegetationPlacer>,
    pub next_leaf: u32,
}

impl<'a> BuildContext<'a> {
    pub fn new(field: &'a HeightField, min_leaf_cells: u64, detail: DetailLevel, vertices: &'a mut VertexPool) -> Self {
        Self { field, min_leaf_cells, detail, vertices, vegetation: None, next_leaf: 0 }
    }

    pub fn with_vegetation(mut self, placer: &'a mut VegetationPlacer) -> Self {
        self.vegetation = Some(placer);
        self
    }
}

/// Data owned by leaf nodes only
#[derive(Debug)]
pub struct LeafData {
    pub id: LeafId,
    /// Index of the leaf's first vertex in the shared vertex buffer
    pub base_vertex: u32,
    pub patch: TerrainPatch,
    pub vegetation: Option<VegetationBatch>,
    pub occlusion: LeafOcclusion,
    /// Last resolved occlusion result
    pub occluded: bool,
    /// Distance from the camera to the bounds centre, set by `update`
    pub camera_distance: f32,
}

#[derive(Debug)]
enum NodeKind {
    Branch(Box<[QuadTreeNode; 4]>),
    Leaf(Box<LeafData>),
}

/// Node of the terrain quadtree
#[derive(Debug)]
pub struct QuadTreeNode {
    footprint: Footprint,
    bounds: Aabb,
    /// Result of the last frustum test
    pub visible: bool,
    kind: NodeKind,
}

impl QuadTreeNode {
    /// Build the subtree covering `footprint`
    pub fn build(ctx: &mut BuildContext<'_>, footprint: Footprint) -> Self {
        let bounds = Self::footprint_bounds(ctx.field, &footprint);

        let kind = if footprint.cell_count() <= ctx.min_leaf_cells || !footprint.can_split() {
            let id = LeafId(ctx.next_leaf);
            ctx.next_leaf += 1;

            let field = ctx.field;
            let base_vertex = ctx.vertices.append_leaf(field, &footprint);
            let mut patch = TerrainPatch::new(footprint.width, footprint.height);
            patch.add_lod(ctx.detail);
            let vegetation = ctx.vegetation.as_deref_mut().map(|placer| placer.scatter(&footprint, field));

            NodeKind::Leaf(Box::new(LeafData {
                id,
                base_vertex,
                patch,
                vegetation,
                occlusion: LeafOcclusion::new(QueryId(id.0)),
                occluded: false,
                camera_distance: 0.0,
            }))
        } else {
            let [a, b, c, d] = footprint.split();
            NodeKind::Branch(Box::new([
                Self::build(ctx, a),
                Self::build(ctx, b),
                Self::build(ctx, c),
                Self::build(ctx, d),
            ]))
        };

        Self { footprint, bounds, visible: true, kind }
    }

    fn footprint_bounds(field: &HeightField, footprint: &Footprint) -> Aabb {
        let (min_h, max_h) = field.min_max_in(footprint);
        let origin = field.origin();
        let scale = field.scale();
        let x0 = footprint.offset_x as f32 * scale;
        let z0 = footprint.offset_y as f32 * scale;
        let x1 = (footprint.offset_x + footprint.width - 1) as f32 * scale;
        let z1 = (footprint.offset_y + footprint.height - 1) as f32 * scale;
        Aabb::new(
            origin + Vec3::new(x0, min_h - BOUNDS_EPSILON, z0),
            origin + Vec3::new(x1, max_h, z1),
        )
    }

    pub fn footprint(&self) -> &Footprint {
        &self.footprint
    }

    pub fn bounds(&self) -> &Aabb {
        &self.bounds
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self.kind, NodeKind::Leaf(_))
    }

    pub fn children(&self) -> Option<&[QuadTreeNode; 4]> {
        match &self.kind {
            NodeKind::Branch(children) => Some(children),
            NodeKind::Leaf(_) => None,
        }
    }

    pub fn leaf(&self) -> Option<&LeafData> {
        match &self.kind {
            NodeKind::Leaf(data) => Some(data),
            NodeKind::Branch(_) => None,
        }
    }

    pub fn leaf_mut(&mut self) -> Option<&mut LeafData> {
        match &mut self.kind {
            NodeKind::Leaf(data) => Some(data),
            NodeKind::Branch(_) => None,
        }
    }

    pub fn patch(&self) -> Option<&TerrainPatch> {
        self.leaf().map(|l| &l.patch)
    }

    pub fn vegetation(&self) -> Option<&VegetationBatch> {
        self.leaf().and_then(|l| l.vegetation.as_ref())
    }

    /// Last resolved occlusion result (always false for branches)
    pub fn is_occluded(&self) -> bool {
        self.leaf().is_some_and(|l| l.occluded)
    }

    /// Leaves in depth-first order
    pub fn leaves(&self) -> Vec<&QuadTreeNode> {
        let mut out = Vec::new();
        self.collect_leaves(&mut out);
        out
    }

    fn collect_leaves<'a>(&'a self, out: &mut Vec<&'a QuadTreeNode>) {
        match &self.kind {
            NodeKind::Leaf(_) => out.push(self),
            NodeKind::Branch(children) => children.iter().for_each(|c| c.collect_leaves(out)),
        }
    }

    /// Mutable leaves in depth-first order
    pub fn leaves_mut(&mut self) -> Vec<&mut QuadTreeNode> {
        let mut out = Vec::new();
        self.collect_leaves_mut(&mut out);
        out
    }

    fn collect_leaves_mut<'a>(&'a mut self, out: &mut Vec<&'a mut QuadTreeNode>) {
        if self.is_leaf() {
            out.push(self);
            return;
        }
        if let NodeKind::Branch(children) = &mut self.kind {
            children.iter_mut().for_each(|c| c.collect_leaves_mut(out));
        }
    }

    pub fn node_count(&self) -> usize {
        match &self.kind {
            NodeKind::Leaf(_) => 1,
            NodeKind::Branch(children) => 1 + children.iter().map(|c| c.node_count()).sum::<usize>(),
        }
    }

    pub fn leaf_count(&self) -> usize {
        match &self.kind {
            NodeKind::Leaf(_) => 1,
            NodeKind::Branch(children) => children.iter().map(|c| c.leaf_count()).sum(),
        }
    }

    /// Build the index list for `detail` on every leaf
    pub fn add_patch_lod(&mut self, detail: DetailLevel) {
        for leaf in self.leaves_mut() {
            if let Some(data) = leaf.leaf_mut() {
                data.patch.add_lod(detail);
            }
        }
    }

    /// Build `detail` on leaves that don't have it yet
    pub fn ensure_lod(&mut self, detail: DetailLevel) {
        for leaf in self.leaves_mut() {
            if let Some(data) = leaf.leaf_mut() {
                if !data.patch.has_lod(detail) {
                    data.patch.add_lod(detail);
                }
            }
        }
    }

    /// Scatter vegetation over every leaf, replacing existing batches
    pub fn scatter_vegetation(&mut self, placer: &mut VegetationPlacer, field: &HeightField) {
        for leaf in self.leaves_mut() {
            let footprint = leaf.footprint;
            if let Some(data) = leaf.leaf_mut() {
                data.vegetation = Some(placer.scatter(&footprint, field));
            }
        }
    }

    pub fn clear_vegetation(&mut self) {
        for leaf in self.leaves_mut() {
            if let Some(data) = leaf.leaf_mut() {
                data.vegetation = None;
            }
        }
    }

    /// Cache each leaf's distance to the camera for draw ordering
    pub fn update(&mut self, camera_position: Vec3) {
        match &mut self.kind {
            NodeKind::Leaf(data) => {
                data.camera_distance = self.bounds.center().distance(camera_position);
            }
            NodeKind::Branch(children) => children.iter_mut().for_each(|c| c.update(camera_position)),
        }
    }

    /// Frustum test every node and emit one terrain draw per visible leaf
    pub fn draw(&mut self, frustum: &Frustum, detail: DetailLevel, technique: Technique, draws: &mut Vec<DrawCall>) {
        match frustum.classify_aabb(&self.bounds) {
            Containment::Disjoint => self.set_visible_recursive(false),
            Containment::Contains => self.draw_unculled(detail, technique, draws),
            Containment::Intersects => {
                self.visible = true;
                match &mut self.kind {
                    NodeKind::Leaf(data) => draws.extend(Self::terrain_draw(data, detail, technique)),
                    NodeKind::Branch(children) => {
                        for child in children.iter_mut() {
                            child.draw(frustum, detail, technique, draws);
                        }
                    }
                }
            }
        }
    }

    /// Draw a subtree known to be entirely inside the frustum
    fn draw_unculled(&mut self, detail: DetailLevel, technique: Technique, draws: &mut Vec<DrawCall>) {
        self.visible = true;
        match &mut self.kind {
            NodeKind::Leaf(data) => draws.extend(Self::terrain_draw(data, detail, technique)),
            NodeKind::Branch(children) => {
                for child in children.iter_mut() {
                    child.draw_unculled(detail, technique, draws);
                }
            }
        }
    }

    fn set_visible_recursive(&mut self, visible: bool) {
        self.visible = visible;
        if let NodeKind::Branch(children) = &mut self.kind {
            children.iter_mut().for_each(|c| c.set_visible_recursive(visible));
        }
    }

    fn terrain_draw(data: &LeafData, detail: DetailLevel, technique: Technique) -> Option<DrawCall> {
        let lod: &PatchLod = data.patch.lod(detail)?;
        Some(DrawCall {
            pass: DrawPass::Terrain,
            technique,
            vertex_buffer: GeometryBuffer::TerrainVertices,
            index_buffer: Some(GeometryBuffer::PatchIndices(data.id, lod.detail)),
            base_vertex: data.base_vertex,
            vertex_count: data.patch.width() * data.patch.height(),
            index_count: lod.indices.len() as u32,
            primitive_count: lod.triangle_count,
            sort_distance: data.camera_distance,
        })
    }

    /// Emit a debug box draw for every visible leaf
    pub fn draw_bounding_boxes(&self, draws: &mut Vec<DrawCall>) {
        for leaf in self.leaves() {
            let Some(data) = leaf.leaf() else { continue };
            if !leaf.visible {
                continue;
            }
            draws.push(DrawCall {
                pass: DrawPass::BoundingBoxes,
                technique: Technique::Bounds,
                vertex_buffer: GeometryBuffer::BoundsProxy(data.id),
                index_buffer: None,
                base_vertex: 0,
                vertex_count: 36,
                index_count: 0,
                primitive_count: 12,
                sort_distance: data.camera_distance,
            });
        }
    }

    /// Emit vegetation draws for visible, unoccluded leaves whose vegetation
    /// bounds pass the frustum and draw-distance tests
    pub fn draw_vegetation(&self, frustum: &Frustum, range: &BoundingSphere, draws: &mut Vec<DrawCall>) {
        match &self.kind {
            NodeKind::Branch(children) => {
                for child in children.iter() {
                    child.draw_vegetation(frustum, range, draws);
                }
            }
            NodeKind::Leaf(data) => {
                if !self.visible || data.occluded {
                    return;
                }
                let Some(batch) = &data.vegetation else { return };
                let Some(bounds) = &batch.bounds else { return };
                if !frustum.intersects_aabb(bounds) || !range.intersects_aabb(bounds) {
                    return;
                }
                draws.push(DrawCall {
                    pass: DrawPass::Vegetation,
                    technique: Technique::Billboard,
                    vertex_buffer: GeometryBuffer::VegetationVertices(data.id),
                    index_buffer: Some(GeometryBuffer::VegetationIndices(data.id)),
                    base_vertex: 0,
                    vertex_count: batch.vertices.len() as u32,
                    index_count: batch.indices.len() as u32,
                    primitive_count: (batch.indices.len() / 3) as u32,
                    sort_distance: bounds.center().distance(range.center),
                });
            }
        }
    }
}
