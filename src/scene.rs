//! Scene graph adapter
//!
//! Nodes carry tagged content; the terrain is one kind of content and is
//! updated and drawn through the node tree.

use crate::core::camera::Camera;
use crate::render::draw::{DrawList, SceneLighting};
use crate::terrain::occlusion::OcclusionQueries;
use crate::terrain::system::TerrainSystem;

/// Unique identifier for a scene node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SceneNodeId(pub u64);

/// What a scene node contains.
#[derive(Debug)]
pub enum NodeContent {
    /// A grouping node with no geometry of its own.
    Group,
    /// A heightmap terrain.
    Terrain(Box<TerrainSystem>),
}

/// A node and its owned children.
#[derive(Debug)]
pub struct SceneNode {
    pub id: SceneNodeId,
    pub name: String,
    pub visible: bool,
    pub content: NodeContent,
    pub children: Vec<SceneNode>,
}

impl SceneNode {
    pub fn new(id: SceneNodeId, name: impl Into<String>, content: NodeContent) -> Self {
        Self {
            id,
            name: name.into(),
            visible: true,
            content,
            children: Vec::new(),
        }
    }

    pub fn group(id: SceneNodeId, name: impl Into<String>) -> Self {
        Self::new(id, name, NodeContent::Group)
    }

    pub fn add_child(&mut self, child: SceneNode) {
        self.children.push(child);
    }

    /// Depth-first search for a node by id
    pub fn find(&self, id: SceneNodeId) -> Option<&SceneNode> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(id))
    }

    pub fn find_mut(&mut self, id: SceneNodeId) -> Option<&mut SceneNode> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter_mut().find_map(|c| c.find_mut(id))
    }

    pub fn terrain(&self) -> Option<&TerrainSystem> {
        match &self.content {
            NodeContent::Terrain(terrain) => Some(&**terrain),
            NodeContent::Group => None,
        }
    }

    pub fn terrain_mut(&mut self) -> Option<&mut TerrainSystem> {
        match &mut self.content {
            NodeContent::Terrain(terrain) => Some(&mut **terrain),
            NodeContent::Group => None,
        }
    }

    /// Per-frame update of this node and its subtree
    pub fn update(&mut self, camera: &Camera) {
        if let Some(terrain) = self.terrain_mut() {
            terrain.update(camera);
        }
        for child in &mut self.children {
            child.update(camera);
        }
    }

    /// Draw lists of every visible terrain in the subtree, in tree order.
    /// Hidden nodes skip their whole subtree.
    pub fn render(
        &mut self,
        camera: &Camera,
        lighting: &SceneLighting,
        elapsed_seconds: f32,
        queries: &mut dyn OcclusionQueries,
    ) -> Vec<DrawList> {
        let mut lists = Vec::new();
        self.render_into(camera, lighting, elapsed_seconds, queries, &mut lists);
        lists
    }

    fn render_into(
        &mut self,
        camera: &Camera,
        lighting: &SceneLighting,
        elapsed_seconds: f32,
        queries: &mut dyn OcclusionQueries,
        lists: &mut Vec<DrawList>,
    ) {
        if !self.visible {
            return;
        }
        if let NodeContent::Terrain(terrain) = &mut self.content {
            lists.push(terrain.draw(camera, lighting, elapsed_seconds, queries));
        }
        for child in &mut self.children {
            child.render_into(camera, lighting, elapsed_seconds, queries, lists);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Vec3;
    use crate::terrain::config::TerrainConfig;
    use crate::terrain::generator::{generate_heightmap, HeightmapParams};
    use crate::terrain::occlusion::testing::ScriptedQueries;

    fn terrain_node(id: u64) -> SceneNode {
        let heightmap = generate_heightmap(&HeightmapParams { size: 32, ..Default::default() });
        let mut terrain = TerrainSystem::new(TerrainConfig { leaf_size: 8, smoothing_passes: 1, ..Default::default() });
        terrain.initialize(&heightmap, None).unwrap();
        SceneNode::new(SceneNodeId(id), "terrain", NodeContent::Terrain(Box::new(terrain)))
    }

    fn camera_over(node: &SceneNode) -> Camera {
        let centre = node.terrain().unwrap().root().unwrap().bounds().center();
        Camera::look_at(centre + Vec3::new(0.0, 400.0, 1.0), centre, Vec3::Y)
    }

    #[test]
    fn test_find_nested_node() {
        let mut root = SceneNode::group(SceneNodeId(0), "root");
        let mut group = SceneNode::group(SceneNodeId(1), "world");
        group.add_child(SceneNode::group(SceneNodeId(2), "props"));
        root.add_child(group);

        assert_eq!(root.find(SceneNodeId(2)).map(|n| n.name.as_str()), Some("props"));
        assert!(root.find(SceneNodeId(9)).is_none());
        assert!(root.find_mut(SceneNodeId(1)).is_some());
    }

    #[test]
    fn test_render_dispatches_to_terrain() {
        let mut root = SceneNode::group(SceneNodeId(0), "root");
        root.add_child(terrain_node(1));
        let camera = camera_over(&root.children[0]);
        let mut queries = ScriptedQueries::visible();

        root.update(&camera);
        let lists = root.render(&camera, &SceneLighting::default(), 0.0, &mut queries);
        assert_eq!(lists.len(), 1);
        assert!(!lists[0].is_empty());
    }

    #[test]
    fn test_hidden_subtree_is_skipped() {
        let mut root = SceneNode::group(SceneNodeId(0), "root");
        let mut group = SceneNode::group(SceneNodeId(1), "world");
        group.add_child(terrain_node(2));
        group.visible = false;
        root.add_child(group);
        let camera = camera_over(root.find(SceneNodeId(2)).unwrap());
        let mut queries = ScriptedQueries::visible();

        let lists = root.render(&camera, &SceneLighting::default(), 0.0, &mut queries);
        assert!(lists.is_empty());
    }

    #[test]
    fn test_group_has_no_terrain() {
        let node = SceneNode::group(SceneNodeId(3), "empty");
        assert!(node.terrain().is_none());
    }
}
