use std::error::Error;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use lumen_blocks::{BlockMetadataProvider, BlockRegistry};
use lumen_edit::MemoryDeltaStore;
use lumen_runtime::{
    NullMesher, Pipeline, PipelineConfig, RecordingMesher, Region, Stencil, World, pregenerate,
};
use lumen_world::{CHUNK_SIZE, ChunkCoord, WorldGenConfig};
use serde::Deserialize;

/// Top-level config file: `[world]` and `[pipeline]` tables.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub world: WorldGenConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

impl AppConfig {
    pub fn load(path: Option<&Path>) -> Result<Self, Box<dyn Error>> {
        match path {
            Some(p) => {
                let s = std::fs::read_to_string(p)
                    .map_err(|e| format!("failed to read config {}: {e}", p.display()))?;
                Ok(toml::from_str(&s)?)
            }
            None => Ok(Self::default()),
        }
    }
}

pub fn load_registry(path: Option<&Path>) -> Result<Arc<BlockRegistry>, Box<dyn Error>> {
    let reg = match path {
        Some(p) => BlockRegistry::load_from_path(p)?,
        None => BlockRegistry::builtin(),
    };
    log::info!("block registry: {} blocks", reg.len());
    Ok(Arc::new(reg))
}

fn build_world(cfg: &AppConfig, reg: &Arc<BlockRegistry>) -> Arc<World> {
    let p = &cfg.pipeline;
    Arc::new(World::new(
        Region::new(Stencil::new(p.radius, p.vertical_radius), p.unload_margin),
        reg.clone() as Arc<dyn BlockMetadataProvider>,
        cfg.world.build_terrain(reg),
        Arc::new(MemoryDeltaStore::new()),
        cfg.world.seed,
        p.column_cache,
    ))
}

pub fn run_pregen(
    mut cfg: AppConfig,
    reg: Arc<BlockRegistry>,
    radius: Option<i32>,
    vertical_radius: Option<i32>,
    center: Option<Vec<i32>>,
) -> Result<(), Box<dyn Error>> {
    if let Some(r) = radius {
        cfg.pipeline.radius = r;
    }
    if let Some(v) = vertical_radius {
        cfg.pipeline.vertical_radius = v;
    }
    let center = match center.as_deref() {
        Some([x, y, z]) => ChunkCoord::new(*x, *y, *z),
        Some(_) => return Err("--center takes three integers".into()),
        None => ChunkCoord::new(0, 0, 0),
    };
    let world = build_world(&cfg, &reg);
    let coords: Vec<ChunkCoord> = world
        .region()
        .stencil()
        .around(center)
        .filter(|c| c.cy < world.sky_level())
        .collect();
    log::info!("pregenerating {} chunks around {}", coords.len(), center);
    let started = Instant::now();
    let report = pregenerate(&world, &coords, &NullMesher);
    let cache = world.columns().stats();
    log::info!(
        "done in {:?}: generated={} empty={} lit={} meshed={} deferred={}",
        started.elapsed(),
        report.generated,
        report.empty,
        report.seeded,
        report.meshed,
        report.engine.leftover_count()
    );
    log::info!(
        "column cache: entries={} hits={} misses={} evictions={}",
        cache.entries,
        cache.hits,
        cache.misses,
        cache.evictions
    );
    Ok(())
}

pub fn run_stream(
    cfg: AppConfig,
    reg: Arc<BlockRegistry>,
    steps: u32,
    stride: i32,
    torches: bool,
    settle: Duration,
) -> Result<(), Box<dyn Error>> {
    let world = build_world(&cfg, &reg);
    let mesher = Arc::new(RecordingMesher::new());
    let pipeline = Pipeline::start(Arc::clone(&world), mesher.clone(), &cfg.pipeline)?;
    let torch = reg.id_by_name("torch");
    let surface_cy = (world.sky_level() - 1).max(0);
    let mut viewer = ChunkCoord::new(0, surface_cy, 0);
    for step in 0..=steps {
        let started = Instant::now();
        let plan = pipeline.update(viewer);
        let settled = pipeline.wait_idle(settle);
        if !settled {
            log::warn!(
                "step {} did not settle within {:?}: {:?}",
                step,
                settle,
                pipeline.queue_debug_counts()
            );
        }
        log::info!(
            "step {} viewer={} load={} unload={} resident={} meshed={} in {:?}",
            step,
            viewer,
            plan.load.len(),
            plan.unload.len(),
            world.region().len(),
            mesher.len(),
            started.elapsed()
        );
        if let (true, Some(torch)) = (torches, torch) {
            let (ox, oy, oz) = viewer.with_y(world.sky_level()).origin();
            let half = CHUNK_SIZE as i32 / 2;
            match pipeline.set_block(ox + half, oy - 1, oz + half, torch) {
                Some(_) => log::debug!("torch placed above {}", viewer),
                None => log::debug!("torch position above {} not loaded", viewer),
            }
        }
        viewer = viewer.offset(stride, 0, 0);
    }
    pipeline.flush_light();
    let (adds, removes) = mesher.call_counts();
    let engine = pipeline.shutdown();
    log::info!(
        "stream finished: meshes added={} removed={} deferred light={}",
        adds,
        removes,
        engine.leftover_count()
    );
    Ok(())
}
