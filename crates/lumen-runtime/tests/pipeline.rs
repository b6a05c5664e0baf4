use std::sync::Arc;
use std::time::Duration;

use lumen_blocks::{AIR, BlockId, BlockMetadataProvider, BlockRegistry};
use lumen_chunk::ChunkState;
use lumen_edit::{DeltaStore, MemoryDeltaStore};
use lumen_runtime::{
    Mesher, Pipeline, PipelineConfig, RecordingMesher, Region, Stencil, World, pregenerate,
};
use lumen_world::{CHUNK_VOLUME, ChunkCoord, FlatTerrain, locate, voxel_index};

const IDLE: Duration = Duration::from_secs(30);

fn registry() -> Arc<BlockRegistry> {
    Arc::new(BlockRegistry::builtin())
}

fn config(radius: i32, vertical_radius: i32, unload_margin: i32) -> PipelineConfig {
    PipelineConfig {
        gen_workers: 2,
        mesh_workers: 2,
        radius,
        vertical_radius,
        unload_margin,
        ..PipelineConfig::default()
    }
}

/// Grass at y = 8 over stone; everything from chunk layer 1 up is sky.
fn flat_world(reg: &Arc<BlockRegistry>, cfg: &PipelineConfig, deltas: Arc<dyn DeltaStore>) -> Arc<World> {
    let grass = reg.id_by_name("grass").unwrap();
    let stone = reg.id_by_name("stone").unwrap();
    Arc::new(World::new(
        Region::new(Stencil::new(cfg.radius, cfg.vertical_radius), cfg.unload_margin),
        reg.clone() as Arc<dyn BlockMetadataProvider>,
        Arc::new(FlatTerrain::new(8, grass, stone)),
        deltas,
        42,
        256,
    ))
}

fn torch_deltas(reg: &BlockRegistry) -> Arc<MemoryDeltaStore> {
    let deltas = Arc::new(MemoryDeltaStore::new());
    let torch = reg.id_by_name("torch").unwrap();
    let (coord, idx) = locate(5, 9, 5);
    deltas.add_delta(coord, idx, torch);
    deltas
}

fn start(world: &Arc<World>, cfg: &PipelineConfig) -> (Pipeline, Arc<RecordingMesher>) {
    let mesher = Arc::new(RecordingMesher::new());
    let pipeline = Pipeline::start(
        Arc::clone(world),
        mesher.clone() as Arc<dyn Mesher>,
        cfg,
    )
    .unwrap();
    (pipeline, mesher)
}

fn settle(p: &Pipeline) {
    assert!(p.wait_idle(IDLE), "pipeline stuck: {:?}", p.queue_debug_counts());
    p.flush_light();
    assert!(p.wait_idle(IDLE), "pipeline stuck: {:?}", p.queue_debug_counts());
}

fn interior(radius: i32) -> Vec<ChunkCoord> {
    let r = radius - 1;
    let mut out = Vec::new();
    for cz in -r..=r {
        for cx in -r..=r {
            out.push(ChunkCoord::new(cx, 0, cz));
        }
    }
    out
}

fn light_grid(world: &World, coord: ChunkCoord) -> Vec<u8> {
    let h = world.chunk(coord).unwrap();
    let c = h.read().unwrap();
    (0..CHUNK_VOLUME).map(|i| c.light(i).raw()).collect()
}

#[test]
fn every_fully_linked_chunk_reaches_ready_and_is_meshed() {
    let reg = registry();
    let cfg = config(2, 1, 0);
    let world = flat_world(&reg, &cfg, Arc::new(MemoryDeltaStore::new()));
    let (pipeline, mesher) = start(&world, &cfg);
    let plan = pipeline.update(ChunkCoord::new(0, 0, 0));
    assert_eq!(plan.load.len(), 25 * 2);
    settle(&pipeline);

    assert_eq!(world.region().len(), 50);
    for c in interior(2) {
        assert_eq!(world.state(c), Some(ChunkState::Ready), "{c}");
        assert!(mesher.is_meshed(c), "{c} not meshed");
    }
    // bottom layer never has its lower neighbor
    assert_eq!(world.state(ChunkCoord::new(0, -1, 0)), Some(ChunkState::Generated));
    assert!(world.linker().pending.contains(&ChunkCoord::new(0, -1, 0)));
    assert!(world.linker().graph.check_symmetry().is_ok());

    let sky = world.light(ChunkCoord::new(0, 0, 0), voxel_index(8, 9, 8)).unwrap();
    assert_eq!(sky.sky(), 15);
    let mesh = mesher.mesh(ChunkCoord::new(0, 0, 0)).unwrap();
    let top = voxel_index(8, 8, 8);
    assert_eq!(
        mesh.face_light(top, lumen_blocks::Face::PosY).map(|l| l.sky()),
        Some(15)
    );
    pipeline.shutdown();
}

#[test]
fn bulk_and_streamed_worlds_agree_on_light() {
    let reg = registry();
    let cfg = config(2, 1, 0);

    let bulk_world = flat_world(&reg, &cfg, torch_deltas(&reg));
    let coords: Vec<ChunkCoord> = bulk_world
        .region()
        .stencil()
        .around(ChunkCoord::new(0, 0, 0))
        .filter(|c| c.cy < bulk_world.sky_level())
        .collect();
    let bulk_mesher = RecordingMesher::new();
    let report = pregenerate(&bulk_world, &coords, &bulk_mesher);
    assert_eq!(report.generated, 50);
    assert_eq!(report.seeded, 9);
    assert_eq!(report.meshed, 9);

    let streamed = flat_world(&reg, &cfg, torch_deltas(&reg));
    let (pipeline, _mesher) = start(&streamed, &cfg);
    pipeline.update(ChunkCoord::new(0, 0, 0));
    settle(&pipeline);

    for &c in &coords {
        assert_eq!(light_grid(&bulk_world, c), light_grid(&streamed, c), "light differs in {c}");
    }
    let (coord, idx) = locate(5, 9, 5);
    assert_eq!(streamed.light(coord, idx).unwrap().block(), 14);
    pipeline.shutdown();
}

#[test]
fn edits_relight_and_remesh_then_revert() {
    let reg = registry();
    let cfg = config(2, 1, 0);
    let world = flat_world(&reg, &cfg, Arc::new(MemoryDeltaStore::new()));
    let (pipeline, mesher) = start(&world, &cfg);
    pipeline.update(ChunkCoord::new(0, 0, 0));
    settle(&pipeline);
    let origin = ChunkCoord::new(0, 0, 0);
    let before = light_grid(&world, origin);

    let torch: BlockId = reg.id_by_name("torch").unwrap();
    assert_eq!(pipeline.set_block(8, 9, 8, torch), Some(AIR));
    settle(&pipeline);
    assert_eq!(world.light(origin, voxel_index(8, 9, 8)).unwrap().block(), 14);
    assert_eq!(world.light(origin, voxel_index(9, 9, 8)).unwrap().block(), 13);
    let mesh = mesher.mesh(origin).unwrap();
    assert!(mesh.voxel(voxel_index(8, 9, 8)).is_some());

    assert_eq!(pipeline.set_block(8, 9, 8, AIR), Some(torch));
    settle(&pipeline);
    assert_eq!(light_grid(&world, origin), before);
    assert!(mesher.mesh(origin).unwrap().voxel(voxel_index(8, 9, 8)).is_none());

    // unloaded positions are refused
    assert_eq!(pipeline.set_block(16 * 40, 9, 0, torch), None);
    pipeline.shutdown();
}

#[test]
fn bursts_of_edits_light_like_a_fresh_world() {
    let reg = registry();
    let cfg = config(2, 1, 0);
    let deltas = Arc::new(MemoryDeltaStore::new());
    let world = flat_world(&reg, &cfg, deltas.clone());
    let (pipeline, _mesher) = start(&world, &cfg);
    pipeline.update(ChunkCoord::new(0, 0, 0));
    settle(&pipeline);

    let torch: BlockId = reg.id_by_name("torch").unwrap();
    let stone: BlockId = reg.id_by_name("stone").unwrap();
    let glowstone: BlockId = reg.id_by_name("glowstone").unwrap();
    // No settling in between: the light thread sees writes that later ones overtook.
    for _ in 0..20 {
        pipeline.set_block(8, 9, 8, torch);
        pipeline.set_block(8, 9, 8, AIR);
    }
    pipeline.set_block(8, 9, 8, torch);
    pipeline.set_block(8, 9, 8, stone);
    pipeline.set_block(9, 9, 8, glowstone);
    pipeline.set_block(9, 10, 8, torch);
    pipeline.set_block(9, 9, 8, AIR);
    pipeline.set_block(15, 9, 8, torch);
    pipeline.set_block(16, 9, 8, stone);
    pipeline.set_block(15, 8, 8, AIR);
    pipeline.set_block(16, 8, 8, torch);
    pipeline.set_block(15, 9, 8, AIR);
    settle(&pipeline);

    let fresh = flat_world(&reg, &cfg, deltas);
    let coords: Vec<ChunkCoord> = fresh
        .region()
        .stencil()
        .around(ChunkCoord::new(0, 0, 0))
        .filter(|c| c.cy < fresh.sky_level())
        .collect();
    pregenerate(&fresh, &coords, &RecordingMesher::new());
    for c in interior(2) {
        assert_eq!(light_grid(&fresh, c), light_grid(&world, c), "light differs in {c}");
    }
    let origin = ChunkCoord::new(0, 0, 0);
    assert_eq!(world.light(origin, voxel_index(8, 9, 8)).unwrap().block(), 0);
    assert_eq!(world.light(origin, voxel_index(9, 10, 8)).unwrap().block(), 14);
    let (east, idx) = locate(16, 8, 8);
    assert_eq!(world.light(east, idx).unwrap().block(), 14);
    pipeline.shutdown();
}

#[test]
fn building_above_the_terrain_creates_a_sky_chunk() {
    let reg = registry();
    let cfg = config(2, 1, 0);
    let world = flat_world(&reg, &cfg, Arc::new(MemoryDeltaStore::new()));
    let (pipeline, mesher) = start(&world, &cfg);
    pipeline.update(ChunkCoord::new(0, 0, 0));
    settle(&pipeline);

    let stone = reg.id_by_name("stone").unwrap();
    let sky_chunk = ChunkCoord::new(0, 1, 0);
    assert!(world.chunk(sky_chunk).is_none());
    assert_eq!(pipeline.set_block(8, 20, 8, stone), Some(AIR));
    settle(&pipeline);

    let h = world.chunk(sky_chunk).expect("sky chunk materialized");
    assert!(h.read().unwrap().is_populated());
    assert!(mesher.is_meshed(sky_chunk));
    assert!(world.linker().graph.check_symmetry().is_ok());
    // the shadow under the new block is lit from the sides only
    assert_eq!(world.light(sky_chunk, voxel_index(8, 3, 8)).unwrap().sky(), 14);
    assert_eq!(
        world.light(ChunkCoord::new(0, 0, 0), voxel_index(8, 9, 8)).unwrap().sky(),
        14
    );
    assert_eq!(world.light(sky_chunk, voxel_index(2, 3, 8)).unwrap().sky(), 15);
    pipeline.shutdown();
}

#[test]
fn moving_the_viewer_unloads_the_far_edge() {
    let reg = registry();
    let cfg = config(1, 1, 0);
    let world = flat_world(&reg, &cfg, Arc::new(MemoryDeltaStore::new()));
    let (pipeline, mesher) = start(&world, &cfg);
    pipeline.update(ChunkCoord::new(0, 0, 0));
    settle(&pipeline);
    assert_eq!(world.region().len(), 18);

    let plan = pipeline.update(ChunkCoord::new(1, 0, 0));
    assert_eq!(plan.unload.len(), 6);
    assert!(plan.unload.iter().all(|c| c.cx == -1));
    assert_eq!(plan.load.len(), 6);
    settle(&pipeline);

    assert_eq!(world.region().len(), 18);
    assert!(world.region().coords().iter().all(|c| c.cx >= 0));
    assert!(mesher.coords().iter().all(|c| c.cx >= 0));
    assert!(!world.linker().graph.contains(ChunkCoord::new(-1, 0, 0)));
    assert!(world.linker().graph.check_symmetry().is_ok());
    assert_eq!(world.state(ChunkCoord::new(1, 0, 0)), Some(ChunkState::Ready));
    pipeline.shutdown();
}

#[test]
fn full_teardown_leaves_nothing_behind() {
    let reg = registry();
    let cfg = config(2, 1, 0);
    let world = flat_world(&reg, &cfg, Arc::new(MemoryDeltaStore::new()));
    let (pipeline, mesher) = start(&world, &cfg);
    pipeline.update(ChunkCoord::new(0, 0, 0));
    settle(&pipeline);

    let resident = world.region().coords();
    for &c in &resident {
        pipeline.unload(c);
    }
    settle(&pipeline);

    assert!(world.region().is_empty());
    assert!(world.linker().graph.is_empty());
    assert!(world.linker().pending.is_empty());
    assert!(mesher.is_empty());
    assert_eq!(mesher.call_counts().1, resident.len());
    let engine = pipeline.shutdown();
    assert_eq!(engine.leftover_count(), 0);
    assert_eq!(engine.pending(), 0);
}

#[test]
fn shutdown_with_work_queued_returns() {
    let reg = registry();
    let cfg = config(6, 2, 0);
    let world = flat_world(&reg, &cfg, Arc::new(MemoryDeltaStore::new()));
    let (pipeline, _mesher) = start(&world, &cfg);
    pipeline.update(ChunkCoord::new(0, 0, 0));
    let _ = pipeline.shutdown();
}

#[test]
fn edits_survive_unload_and_reload() {
    let reg = registry();
    let cfg = config(1, 1, 0);
    let deltas = Arc::new(MemoryDeltaStore::new());
    let world = flat_world(&reg, &cfg, deltas.clone());
    let (pipeline, _mesher) = start(&world, &cfg);
    pipeline.update(ChunkCoord::new(0, 0, 0));
    settle(&pipeline);

    let glass = reg.id_by_name("glass").unwrap();
    pipeline.set_block(3, 8, 3, glass);
    settle(&pipeline);
    let (coord, idx) = locate(3, 8, 3);
    assert_eq!(deltas.get(coord, idx), Some(glass));

    pipeline.unload(coord);
    settle(&pipeline);
    assert!(world.chunk(coord).is_none());
    pipeline.update(ChunkCoord::new(0, 0, 0));
    settle(&pipeline);
    assert_eq!(world.block(coord, idx), Some(glass));
    assert_eq!(world.state(coord), Some(ChunkState::Ready));
    pipeline.shutdown();
}
