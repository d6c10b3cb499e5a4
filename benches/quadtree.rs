use criterion::{criterion_group, criterion_main, Criterion, black_box};

use reactor3d::core::camera::Camera;
use reactor3d::math::Aabb;
use reactor3d::render::draw::SceneLighting;
use reactor3d::terrain::config::TerrainConfig;
use reactor3d::terrain::generator::{classify_by_height, generate_heightmap, HeightmapParams};
use reactor3d::terrain::occlusion::{OcclusionQueries, QueryError, QueryId, QueryPoll};
use reactor3d::terrain::system::TerrainSystem;

use glam::Vec3;

/// Every query completes immediately with visible samples
struct AlwaysVisible;

impl OcclusionQueries for AlwaysVisible {
    fn begin_query(&mut self, _id: QueryId, _bounds: &Aabb) -> Result<(), QueryError> {
        Ok(())
    }

    fn poll_query(&mut self, _id: QueryId) -> Result<QueryPoll, QueryError> {
        Ok(QueryPoll::Complete(1))
    }
}

fn terrain(size: u32, leaf_size: u32) -> TerrainSystem {
    let heightmap = generate_heightmap(&HeightmapParams { size, ..Default::default() });
    let classes = classify_by_height(&heightmap);
    let mut terrain = TerrainSystem::new(TerrainConfig { leaf_size, ..Default::default() });
    terrain.initialize(&heightmap, Some(&classes)).unwrap();
    terrain
}

fn bench_initialize_256(c: &mut Criterion) {
    let heightmap = generate_heightmap(&HeightmapParams { size: 256, ..Default::default() });
    let classes = classify_by_height(&heightmap);

    c.bench_function("terrain_initialize_256", |b| {
        b.iter(|| {
            let mut terrain = TerrainSystem::new(TerrainConfig { leaf_size: 32, ..Default::default() });
            terrain.initialize(black_box(&heightmap), Some(black_box(&classes))).unwrap();
            terrain
        });
    });
}

fn bench_rebuild_leaf_size(c: &mut Criterion) {
    let mut terrain = terrain(256, 32);
    let mut leaf_size = 16;

    c.bench_function("terrain_set_leaf_size_256", |b| {
        b.iter(|| {
            leaf_size = if leaf_size == 16 { 32 } else { 16 };
            terrain.set_leaf_size(black_box(leaf_size)).unwrap();
        });
    });
}

fn bench_frame_draw(c: &mut Criterion) {
    let mut terrain = terrain(256, 16);
    let centre = terrain.root().unwrap().bounds().center();
    let camera = Camera::look_at(centre + Vec3::new(-120.0, 60.0, -120.0), centre, Vec3::Y);
    let lighting = SceneLighting::default();
    let mut queries = AlwaysVisible;

    c.bench_function("terrain_frame_256", |b| {
        b.iter(|| {
            terrain.update(black_box(&camera));
            terrain.draw(black_box(&camera), &lighting, 0.0, &mut queries)
        });
    });
}

fn bench_height_queries(c: &mut Criterion) {
    let terrain = terrain(256, 32);

    c.bench_function("terrain_height_at_1k", |b| {
        b.iter(|| {
            let mut sum = 0.0;
            for i in 0..1000 {
                let t = i as f32 * 0.25;
                sum += terrain.get_terrain_height(black_box(t), black_box(t * 0.5));
            }
            sum
        });
    });
}

criterion_group!(
    benches,
    bench_initialize_256,
    bench_rebuild_leaf_size,
    bench_frame_draw,
    bench_height_queries,
);
criterion_main!(benches);
