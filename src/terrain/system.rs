//! Terrain façade: owns the height field and quadtree and drives each frame

use super::config::TerrainConfig;
use super::height_field::{HeightField, OFF_MAP_HEIGHT};
use super::occlusion::{OcclusionCullingController, OcclusionQueries};
use super::patch::DetailLevel;
use super::quadtree::{BuildContext, Footprint, QuadTreeNode};
use super::source::ColorGrid;
use super::vegetation::VegetationPlacer;
use super::vertex::{TerrainVertex, VertexPool};
use crate::core::camera::Camera;
use crate::core::error::Error;
use crate::core::types::{Mat4, Result, Vec3};
use crate::math::{BoundingSphere, Frustum};
use crate::render::culling::{sort_back_to_front, sort_front_to_back};
use crate::render::draw::{
    CullMode, DrawList, SceneLighting, Technique, TerrainShaderParams, TerrainTextures,
    VegetationShaderParams,
};

/// Heightmap terrain with quadtree culling, LOD index buffers, occlusion
/// queries and billboard vegetation
#[derive(Debug)]
pub struct TerrainSystem {
    config: TerrainConfig,
    field: Option<HeightField>,
    root: Option<QuadTreeNode>,
    /// Shared vertex buffer contents, written once per build
    vertices: Vec<TerrainVertex>,
    vegetation_scattered: bool,
    occlusion: OcclusionCullingController,
    reflection: Option<Mat4>,
    textures: TerrainTextures,
    leaves_drawn: u32,
    /// Levels requested through `add_patch_lod`, rebuilt with the tree
    extra_lods: Vec<DetailLevel>,
}

impl TerrainSystem {
    pub fn new(config: TerrainConfig) -> Self {
        let occlusion = OcclusionCullingController::new(config.occlusion_culling);
        Self {
            config,
            field: None,
            root: None,
            vertices: Vec::new(),
            vegetation_scattered: false,
            occlusion,
            reflection: None,
            textures: TerrainTextures::default(),
            leaves_drawn: 0,
            extra_lods: Vec::new(),
        }
    }

    /// Build the height field and quadtree from the input maps.
    ///
    /// Both maps must have power-of-two dimensions; the heightmap must be at
    /// least 2x2.
    pub fn initialize(&mut self, heightmap: &ColorGrid, classification: Option<&ColorGrid>) -> Result<()> {
        if heightmap.width < 2 || heightmap.height < 2 || !heightmap.is_power_of_two() {
            return Err(Error::HeightmapDimensions { width: heightmap.width, height: heightmap.height });
        }
        if let Some(map) = classification {
            if !map.is_power_of_two() {
                return Err(Error::ClassificationDimensions { width: map.width, height: map.height });
            }
        }
        if !self.config.leaf_size.is_power_of_two() {
            return Err(Error::LeafSize(self.config.leaf_size));
        }

        let field = HeightField::build(
            heightmap,
            classification,
            self.config.elevation_strength,
            self.config.clamped_scale(),
            self.config.smoothing_passes,
            self.config.origin(),
        )?;
        self.field = Some(field);
        self.build_tree()?;

        log::info!(
            "Terrain initialized: {}x{} map, {} leaves, {} vertices",
            heightmap.width,
            heightmap.height,
            self.leaf_count(),
            self.vertices.len()
        );
        Ok(())
    }

    /// (Re)build the quadtree over the current height field
    fn build_tree(&mut self) -> Result<()> {
        let field = self.field.as_ref().ok_or(Error::NotInitialized)?;

        let mut pool = VertexPool::new();
        let mut placer = VegetationPlacer::new(&self.config.vegetation);
        let mut ctx = BuildContext::new(field, self.config.min_leaf_cells(), self.config.detail, &mut pool);
        if self.config.vegetation.enabled {
            ctx = ctx.with_vegetation(&mut placer);
        }
        let mut root = QuadTreeNode::build(&mut ctx, Footprint::full(field));
        for &detail in &self.extra_lods {
            root.ensure_lod(detail);
        }

        self.vegetation_scattered = self.config.vegetation.enabled;
        self.vertices = pool.freeze();
        log::debug!(
            "Built terrain quadtree: {} nodes, {} leaves, leaf size {}",
            root.node_count(),
            root.leaf_count(),
            self.config.leaf_size
        );
        self.root = Some(root);
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.root.is_some()
    }

    /// Per-frame update: caches each leaf's camera distance
    pub fn update(&mut self, camera: &Camera) {
        if let Some(root) = &mut self.root {
            root.update(camera.position);
        }
    }

    /// Produce the frame's draw list. Occlusion queries run first, then the
    /// terrain is frustum culled and drawn front to back, then debug boxes,
    /// then vegetation back to front.
    pub fn draw(
        &mut self,
        camera: &Camera,
        lighting: &SceneLighting,
        elapsed_seconds: f32,
        queries: &mut dyn OcclusionQueries,
    ) -> DrawList {
        let mut list = DrawList { textures: self.textures, ..Default::default() };
        let Some(root) = self.root.as_mut() else {
            return list;
        };

        let view_proj = camera.view_projection();
        let world = self.reflection.unwrap_or(Mat4::IDENTITY);
        let frustum = Frustum::from_view_projection(&(view_proj * world));

        // Visibility in a mirrored view says nothing about the main view
        if self.reflection.is_none() {
            list.stats.occlusion = self.occlusion.run(root, queries);
        }

        let (technique, lighting) = match self.reflection {
            Some(_) => (Technique::TerrainReflected, lighting.reflected()),
            None => (Technique::TerrainSplat, *lighting),
        };
        list.cull_mode = if self.reflection.is_some() { CullMode::None } else { CullMode::Back };

        let mut terrain = Vec::new();
        root.draw(&frustum, self.config.detail, technique, &mut terrain);
        if self.config.draw_terrain {
            sort_front_to_back(&mut terrain);
            list.stats.leaves_drawn = terrain.len() as u32;
            list.stats.triangles = terrain.iter().map(|c| c.primitive_count).sum();
            list.calls.extend(terrain);
            list.terrain_params = Some(TerrainShaderParams::new(
                view_proj,
                world,
                camera.position,
                elapsed_seconds,
                &lighting,
            ));
        }
        self.leaves_drawn = list.stats.leaves_drawn;

        if self.config.draw_bounding_boxes {
            let start = list.calls.len();
            root.draw_bounding_boxes(&mut list.calls);
            list.stats.bounding_boxes = (list.calls.len() - start) as u32;
        }

        if self.config.vegetation.enabled {
            let vegetation = &self.config.vegetation;
            let range = BoundingSphere::new(camera.position, vegetation.draw_distance);
            let mut batches = Vec::new();
            root.draw_vegetation(&frustum, &range, &mut batches);
            sort_back_to_front(&mut batches);

            list.stats.vegetation_batches = batches.len() as u32;
            list.stats.vegetation_instances = batches.iter().map(|c| c.vertex_count / 4).sum();
            list.calls.extend(batches);
            list.vegetation_params = Some(VegetationShaderParams::new(
                view_proj * world,
                camera.position,
                elapsed_seconds,
                &lighting,
                vegetation.min_height,
                vegetation.max_height,
                vegetation.draw_distance,
            ));
        }

        log::trace!(
            "Terrain frame: {} leaves, {} triangles, {} vegetation batches",
            list.stats.leaves_drawn,
            list.stats.triangles,
            list.stats.vegetation_batches
        );
        list
    }

    /// Switch the detail level used for drawing, building it where missing
    pub fn set_detail_level(&mut self, detail: DetailLevel) {
        self.config.detail = detail;
        if let Some(root) = &mut self.root {
            root.ensure_lod(detail);
        }
        log::debug!("Terrain detail level set to {:?}", detail);
    }

    pub fn detail_level(&self) -> DetailLevel {
        self.config.detail
    }

    /// Build (or rebuild) index buffers for an additional detail level.
    /// The level is kept across tree rebuilds.
    pub fn add_patch_lod(&mut self, detail: DetailLevel) {
        if !self.extra_lods.contains(&detail) {
            self.extra_lods.push(detail);
        }
        if let Some(root) = &mut self.root {
            root.add_patch_lod(detail);
            log::debug!("Added terrain patch LOD {:?}", detail);
        }
    }

    /// Leaf edge length in cells; must be a power of two. Rebuilds the tree
    /// when the terrain is already initialized.
    pub fn set_leaf_size(&mut self, leaf_size: u32) -> Result<()> {
        if !leaf_size.is_power_of_two() {
            return Err(Error::LeafSize(leaf_size));
        }
        self.config.leaf_size = leaf_size;
        if self.field.is_some() {
            self.build_tree()?;
        }
        Ok(())
    }

    /// Takes effect on the next `initialize`
    pub fn set_elevation_strength(&mut self, strength: f32) {
        self.config.elevation_strength = strength;
    }

    /// Flip vegetation on or off. The first enable scatters over every leaf.
    pub fn toggle_vegetation(&mut self) -> bool {
        let vegetation = &mut self.config.vegetation;
        vegetation.enabled = !vegetation.enabled;

        if vegetation.enabled && !self.vegetation_scattered {
            if let (Some(root), Some(field)) = (self.root.as_mut(), self.field.as_ref()) {
                let mut placer = VegetationPlacer::new(vegetation);
                root.scatter_vegetation(&mut placer, field);
                self.vegetation_scattered = true;
            }
        }
        log::debug!("Terrain vegetation {}", if vegetation.enabled { "enabled" } else { "disabled" });
        vegetation.enabled
    }

    pub fn toggle_terrain_draw(&mut self) -> bool {
        self.config.draw_terrain = !self.config.draw_terrain;
        self.config.draw_terrain
    }

    pub fn toggle_bounding_boxes(&mut self) -> bool {
        self.config.draw_bounding_boxes = !self.config.draw_bounding_boxes;
        self.config.draw_bounding_boxes
    }

    pub fn set_occlusion_culling(&mut self, enabled: bool) {
        self.config.occlusion_culling = enabled;
        self.occlusion.set_enabled(enabled, self.root.as_mut());
    }

    pub fn set_textures(&mut self, textures: TerrainTextures) {
        self.textures = textures;
    }

    /// Draw mirrored through `reflection` (e.g. for a water reflection
    /// target) until reset
    pub fn set_reflection_matrix(&mut self, reflection: Mat4) {
        self.reflection = Some(reflection);
    }

    pub fn reset_reflection_matrix(&mut self) {
        self.reflection = None;
    }

    /// Free the height field, tree and vertex data. Safe to call repeatedly.
    pub fn release(&mut self) {
        if self.field.is_none() && self.root.is_none() {
            return;
        }
        self.field = None;
        self.root = None;
        self.vertices = Vec::new();
        self.vegetation_scattered = false;
        log::debug!("Terrain released");
    }

    /// Interpolated height at a world position, `OFF_MAP_HEIGHT` off the map
    pub fn get_terrain_height(&self, x: f32, z: f32) -> f32 {
        self.field.as_ref().map_or(OFF_MAP_HEIGHT, |f| f.height_at(x, z))
    }

    pub fn get_normal(&self, x: f32, z: f32) -> Vec3 {
        self.field.as_ref().map_or(Vec3::Y, |f| f.normal_at(x, z))
    }

    pub fn is_above_terrain(&self, x: f32, z: f32) -> bool {
        self.field.as_ref().is_some_and(|f| f.is_above_terrain(x, z))
    }

    pub fn config(&self) -> &TerrainConfig {
        &self.config
    }

    pub fn height_field(&self) -> Option<&HeightField> {
        self.field.as_ref()
    }

    pub fn root(&self) -> Option<&QuadTreeNode> {
        self.root.as_ref()
    }

    pub fn vertices(&self) -> &[TerrainVertex] {
        &self.vertices
    }

    pub fn leaf_count(&self) -> usize {
        self.root.as_ref().map_or(0, |r| r.leaf_count())
    }

    /// Terrain leaves drawn by the last `draw`
    pub fn leaves_drawn(&self) -> u32 {
        self.leaves_drawn
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::draw::{DrawPass, GeometryBuffer};
    use crate::terrain::generator::{classify_by_height, generate_heightmap, HeightmapParams};
    use crate::terrain::occlusion::testing::ScriptedQueries;
    use crate::terrain::occlusion::OcclusionState;

    fn small_config() -> TerrainConfig {
        TerrainConfig { leaf_size: 8, smoothing_passes: 2, scale: 2.0, ..Default::default() }
    }

    fn maps(size: u32) -> (ColorGrid, ColorGrid) {
        let heightmap = generate_heightmap(&HeightmapParams { size, feature_scale: 16.0, ..Default::default() });
        let classes = classify_by_height(&heightmap);
        (heightmap, classes)
    }

    fn initialized(config: TerrainConfig) -> TerrainSystem {
        let (heightmap, classes) = maps(64);
        let mut terrain = TerrainSystem::new(config);
        terrain.initialize(&heightmap, Some(&classes)).expect("initialize failed");
        terrain
    }

    fn overhead_camera(terrain: &TerrainSystem) -> Camera {
        let centre = terrain.root().unwrap().bounds().center();
        Camera::look_at(centre + Vec3::new(0.0, 300.0, 1.0), centre, Vec3::Y)
    }

    #[test]
    fn test_rejects_non_power_of_two_heightmap() {
        let mut terrain = TerrainSystem::new(TerrainConfig::default());
        let err = terrain.initialize(&ColorGrid::new(100, 64, [0; 3]), None).unwrap_err();
        assert!(matches!(err, Error::HeightmapDimensions { width: 100, height: 64 }));
        assert!(!terrain.is_initialized());
    }

    #[test]
    fn test_rejects_non_power_of_two_classification() {
        let mut terrain = TerrainSystem::new(TerrainConfig::default());
        let heights = ColorGrid::new(64, 64, [0; 3]);
        let err = terrain.initialize(&heights, Some(&ColorGrid::new(64, 48, [0; 3]))).unwrap_err();
        assert!(matches!(err, Error::ClassificationDimensions { .. }));
    }

    #[test]
    fn test_initialize_builds_tree_and_vertices() {
        let terrain = initialized(small_config());
        assert!(terrain.is_initialized());
        // 63 cells split into 32 + 32 overlapping columns, then 16 + 16, then 8 + 8
        assert_eq!(terrain.leaf_count(), 64);
        let expected: usize = terrain.root().unwrap().leaves().iter()
            .map(|l| (l.footprint().width * l.footprint().height) as usize)
            .sum();
        assert_eq!(terrain.vertices().len(), expected);
    }

    #[test]
    fn test_height_queries() {
        let terrain = initialized(small_config());
        assert_eq!(terrain.get_terrain_height(-1000.0, -1000.0), OFF_MAP_HEIGHT);
        assert!(!terrain.is_above_terrain(-1000.0, -1000.0));
        assert!(terrain.is_above_terrain(10.0, 10.0));
        let h = terrain.get_terrain_height(10.0, 10.0);
        assert!(h > OFF_MAP_HEIGHT);
        assert!((terrain.get_normal(10.0, 10.0).length() - 1.0).abs() < 1e-4);

        let empty = TerrainSystem::new(TerrainConfig::default());
        assert_eq!(empty.get_terrain_height(0.0, 0.0), OFF_MAP_HEIGHT);
    }

    #[test]
    fn test_draw_order_and_counts() {
        let mut terrain = initialized(small_config());
        let camera = Camera::look_at(Vec3::new(-20.0, 40.0, -20.0), Vec3::new(64.0, 0.0, 64.0), Vec3::Y);
        terrain.update(&camera);
        let list = terrain.draw(&camera, &SceneLighting::default(), 0.0, &mut ScriptedQueries::visible());

        let terrain_calls: Vec<_> = list.pass(DrawPass::Terrain).collect();
        assert!(!terrain_calls.is_empty());
        assert_eq!(list.stats.leaves_drawn as usize, terrain_calls.len());
        assert_eq!(terrain.leaves_drawn(), list.stats.leaves_drawn);
        assert!(terrain_calls.windows(2).all(|w| w[0].sort_distance <= w[1].sort_distance));
        assert!(terrain_calls.iter().all(|c| c.vertex_buffer == GeometryBuffer::TerrainVertices));
        assert!(list.terrain_params.is_some());
        assert!(list.vegetation_params.is_none());
        assert_eq!(list.cull_mode, CullMode::Back);
    }

    #[test]
    fn test_draw_facing_away_is_empty() {
        let mut terrain = initialized(small_config());
        let camera = Camera::look_at(Vec3::new(0.0, 20.0, -50.0), Vec3::new(0.0, 20.0, -500.0), Vec3::Y);
        let list = terrain.draw(&camera, &SceneLighting::default(), 0.0, &mut ScriptedQueries::visible());
        assert_eq!(list.pass(DrawPass::Terrain).count(), 0);
        assert_eq!(list.stats.triangles, 0);
    }

    #[test]
    fn test_occlusion_runs_before_drawing() {
        let mut terrain = initialized(small_config());
        let camera = overhead_camera(&terrain);
        let mut queries = ScriptedQueries::occluded();

        let first = terrain.draw(&camera, &SceneLighting::default(), 0.0, &mut queries);
        assert_eq!(first.stats.occlusion.issued as usize, terrain.leaf_count());
        assert_eq!(queries.begun.len(), terrain.leaf_count());

        let second = terrain.draw(&camera, &SceneLighting::default(), 0.0, &mut queries);
        assert_eq!(second.stats.occlusion.occluded as usize, terrain.leaf_count());
        assert!(terrain.root().unwrap().leaves().iter().all(|l| l.is_occluded()));
        // Occlusion only gates vegetation; terrain still draws
        assert_eq!(second.stats.leaves_drawn as usize, terrain.leaf_count());

        let third = terrain.draw(&camera, &SceneLighting::default(), 0.0, &mut queries);
        assert_eq!(third.stats.occlusion.issued as usize, terrain.leaf_count());
    }

    #[test]
    fn test_disabling_occlusion_clears_flags() {
        let mut terrain = initialized(small_config());
        let camera = overhead_camera(&terrain);
        let mut queries = ScriptedQueries::occluded();
        terrain.draw(&camera, &SceneLighting::default(), 0.0, &mut queries);
        terrain.draw(&camera, &SceneLighting::default(), 0.0, &mut queries);

        terrain.set_occlusion_culling(false);
        let leaves = terrain.root().unwrap().leaves();
        assert!(leaves.iter().all(|l| !l.is_occluded()));
        assert!(leaves.iter().all(|l| l.leaf().unwrap().occlusion.state == OcclusionState::Idle));

        let list = terrain.draw(&camera, &SceneLighting::default(), 0.0, &mut queries);
        assert_eq!(list.stats.occlusion.issued, 0);
    }

    #[test]
    fn test_vegetation_toggle_and_draw() {
        let mut terrain = initialized(small_config());
        assert!(terrain.root().unwrap().leaves().iter().all(|l| l.vegetation().is_none()));

        assert!(terrain.toggle_vegetation());
        assert!(terrain.root().unwrap().leaves().iter().all(|l| l.vegetation().is_some()));

        let camera = overhead_camera(&terrain);
        terrain.update(&camera);
        let mut queries = ScriptedQueries::visible();
        let list = terrain.draw(&camera, &SceneLighting::default(), 1.5, &mut queries);
        // Draw distance (100) is shorter than the camera height
        assert_eq!(list.pass(DrawPass::Vegetation).count(), 0);
        assert!(list.vegetation_params.is_some());

        terrain.config.vegetation.draw_distance = 1000.0;
        let list = terrain.draw(&camera, &SceneLighting::default(), 1.5, &mut queries);
        let vegetation: Vec<_> = list.pass(DrawPass::Vegetation).collect();
        assert!(!vegetation.is_empty());
        assert!(vegetation.windows(2).all(|w| w[0].sort_distance >= w[1].sort_distance));
        assert!(list.stats.vegetation_instances > 0);

        assert!(!terrain.toggle_vegetation());
        let list = terrain.draw(&camera, &SceneLighting::default(), 1.5, &mut queries);
        assert_eq!(list.pass(DrawPass::Vegetation).count(), 0);
    }

    #[test]
    fn test_vegetation_is_deterministic() {
        let mut config = small_config();
        config.vegetation.enabled = true;
        config.vegetation.seed = 42;
        let a = initialized(config.clone());
        let b = initialized(config);
        let batches = |t: &TerrainSystem| -> Vec<_> {
            t.root().unwrap().leaves().iter().map(|l| l.vegetation().unwrap().vertices.clone()).collect()
        };
        assert_eq!(batches(&a), batches(&b));
    }

    #[test]
    fn test_set_leaf_size() {
        let mut terrain = initialized(small_config());
        assert!(matches!(terrain.set_leaf_size(12), Err(Error::LeafSize(12))));
        assert!(matches!(terrain.set_leaf_size(0), Err(Error::LeafSize(0))));
        assert_eq!(terrain.leaf_count(), 64);

        terrain.set_leaf_size(16).unwrap();
        assert_eq!(terrain.leaf_count(), 16);
        terrain.set_leaf_size(64).unwrap();
        assert_eq!(terrain.leaf_count(), 1);
    }

    #[test]
    fn test_added_lods_survive_rebuild() {
        let mut terrain = initialized(small_config());
        terrain.add_patch_lod(DetailLevel::Low);
        terrain.set_leaf_size(16).unwrap();

        let leaves = terrain.root().unwrap().leaves();
        assert_eq!(leaves.len(), 16);
        for leaf in leaves {
            let patch = leaf.patch().unwrap();
            assert!(patch.has_lod(DetailLevel::Low));
            assert!(patch.has_lod(DetailLevel::Ultra));
        }
    }

    #[test]
    fn test_detail_level_changes_index_buffers() {
        let mut terrain = initialized(small_config());
        let camera = overhead_camera(&terrain);
        let mut queries = ScriptedQueries::visible();
        let ultra = terrain.draw(&camera, &SceneLighting::default(), 0.0, &mut queries).stats.triangles;

        terrain.set_detail_level(DetailLevel::High);
        assert_eq!(terrain.detail_level(), DetailLevel::High);
        let list = terrain.draw(&camera, &SceneLighting::default(), 0.0, &mut queries);
        assert!(list.stats.triangles < ultra);
        assert!(list.pass(DrawPass::Terrain).all(|c| {
            matches!(c.index_buffer, Some(GeometryBuffer::PatchIndices(_, DetailLevel::High)))
        }));
    }

    #[test]
    fn test_bounding_boxes_and_terrain_toggle() {
        let mut terrain = initialized(small_config());
        let camera = overhead_camera(&terrain);
        let mut queries = ScriptedQueries::visible();

        assert!(terrain.toggle_bounding_boxes());
        assert!(!terrain.toggle_terrain_draw());
        let list = terrain.draw(&camera, &SceneLighting::default(), 0.0, &mut queries);
        assert_eq!(list.pass(DrawPass::Terrain).count(), 0);
        assert!(list.terrain_params.is_none());
        assert_eq!(list.stats.bounding_boxes as usize, terrain.leaf_count());
    }

    #[test]
    fn test_reflection_pass() {
        let mut terrain = initialized(small_config());
        let camera = overhead_camera(&terrain);
        let mut queries = ScriptedQueries::visible();

        terrain.set_reflection_matrix(Mat4::from_scale(Vec3::new(1.0, -1.0, 1.0)));
        let lighting = SceneLighting::default();
        let list = terrain.draw(&camera, &lighting, 0.0, &mut queries);
        assert_eq!(list.cull_mode, CullMode::None);
        assert!(queries.begun.is_empty());
        let params = list.terrain_params.unwrap();
        assert_eq!(params.light_direction[1], -lighting.light_direction.y);
        assert!(list.pass(DrawPass::Terrain).all(|c| c.technique == Technique::TerrainReflected));

        terrain.reset_reflection_matrix();
        let list = terrain.draw(&camera, &lighting, 0.0, &mut queries);
        assert_eq!(list.cull_mode, CullMode::Back);
        assert!(!queries.begun.is_empty());
    }

    #[test]
    fn test_release_is_idempotent() {
        let mut terrain = initialized(small_config());
        terrain.release();
        terrain.release();
        assert!(!terrain.is_initialized());
        assert!(terrain.vertices().is_empty());
        let list = terrain.draw(&Camera::default(), &SceneLighting::default(), 0.0, &mut ScriptedQueries::visible());
        assert!(list.is_empty());
    }

    #[test]
    fn test_elevation_strength_applies_on_initialize() {
        let (heightmap, classes) = maps(64);
        let mut terrain = TerrainSystem::new(small_config());
        terrain.initialize(&heightmap, Some(&classes)).unwrap();
        let before = terrain.root().unwrap().bounds().max.y;

        terrain.set_elevation_strength(12.0);
        assert_eq!(terrain.root().unwrap().bounds().max.y, before);
        terrain.initialize(&heightmap, Some(&classes)).unwrap();
        assert!(terrain.root().unwrap().bounds().max.y > before);
    }
}
