use std::iter;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender, unbounded};
use lumen_blocks::{AIR, BlockId};
use lumen_chunk::{Chunk, ChunkState};
use lumen_edit::affected_chunks;
use lumen_lighting::{LightEngine, seed};
use lumen_world::{ChunkCoord, locate};
use rayon::{ThreadPool, ThreadPoolBuildError, ThreadPoolBuilder};
use thiserror::Error;

use crate::cancel::CancelToken;
use crate::config::PipelineConfig;
use crate::light_actor::{LightActor, LightRequest};
use crate::mesher::{MeshInput, Mesher};
use crate::region::RegionPlan;
use crate::world::{World, WorldVolume};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("failed to build {stage} pool: {source}")]
    Pool {
        stage: &'static str,
        #[source]
        source: ThreadPoolBuildError,
    },
    #[error("failed to spawn light thread: {0}")]
    Spawn(#[from] std::io::Error),
}

#[derive(Debug, Default)]
pub(crate) struct Lane {
    pub queued: AtomicUsize,
    pub inflight: AtomicUsize,
}

impl Lane {
    fn snapshot(&self) -> (usize, usize) {
        (
            self.queued.load(Ordering::Relaxed),
            self.inflight.load(Ordering::Relaxed),
        )
    }
}

#[derive(Debug, Default)]
pub(crate) struct StageCounters {
    pub generate: Lane,
    pub link: Lane,
    pub seed: Lane,
    pub light: Lane,
    pub mesh: Lane,
}

/// `(queued, in flight)` per stage.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StageCounts {
    pub generate: (usize, usize),
    pub link: (usize, usize),
    pub seed: (usize, usize),
    pub light: (usize, usize),
    pub mesh: (usize, usize),
}

impl StageCounts {
    pub fn is_idle(&self) -> bool {
        [self.generate, self.link, self.seed, self.light, self.mesh]
            .iter()
            .all(|&(q, i)| q == 0 && i == 0)
    }
}

fn send_counted<T>(tx: &Sender<T>, lane: &Lane, msg: T) {
    lane.queued.fetch_add(1, Ordering::Relaxed);
    if tx.send(msg).is_err() {
        lane.queued.fetch_sub(1, Ordering::Relaxed);
    }
}

/// Builds a named pool whose workers drain `rx` until every sender is dropped.
fn spawn_lane<F>(
    stage: &'static str,
    workers: usize,
    rx: Receiver<ChunkCoord>,
    counters: &Arc<StageCounters>,
    lane: fn(&StageCounters) -> &Lane,
    job: F,
) -> Result<Arc<ThreadPool>, PipelineError>
where
    F: Fn(ChunkCoord) + Send + Sync + 'static,
{
    let pool = Arc::new(
        ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(move |i| format!("lumen-{stage}-{i}"))
            .build()
            .map_err(|source| PipelineError::Pool { stage, source })?,
    );
    let job = Arc::new(job);
    for _ in 0..workers {
        let rx = rx.clone();
        let job = Arc::clone(&job);
        let counters = Arc::clone(counters);
        pool.spawn(move || {
            while let Ok(coord) = rx.recv() {
                let l = lane(&counters);
                l.queued.fetch_sub(1, Ordering::Relaxed);
                l.inflight.fetch_add(1, Ordering::Relaxed);
                job(coord);
                l.inflight.fetch_sub(1, Ordering::Relaxed);
            }
        });
    }
    Ok(pool)
}

/// Staged chunk pipeline: generate, link, seed light, flood (single thread), mesh.
pub struct Pipeline {
    world: Arc<World>,
    mesher: Arc<dyn Mesher>,
    cancel: CancelToken,
    counters: Arc<StageCounters>,
    gen_tx: Option<Sender<ChunkCoord>>,
    light_tx: Option<Sender<LightRequest>>,
    actor: Option<JoinHandle<LightEngine>>,
    _pools: Vec<Arc<ThreadPool>>,
}

impl Pipeline {
    pub fn start(
        world: Arc<World>,
        mesher: Arc<dyn Mesher>,
        config: &PipelineConfig,
    ) -> Result<Self, PipelineError> {
        Self::with_engine(world, mesher, config, LightEngine::new())
    }

    /// Starts the stages around an engine that already holds state, e.g. from [`crate::pregenerate`].
    pub fn with_engine(
        world: Arc<World>,
        mesher: Arc<dyn Mesher>,
        config: &PipelineConfig,
        engine: LightEngine,
    ) -> Result<Self, PipelineError> {
        let (w_gen, w_link, w_seed, w_mesh) = config.resolved_workers();
        let cancel = CancelToken::new();
        let counters = Arc::new(StageCounters::default());
        let (gen_tx, gen_rx) = unbounded::<ChunkCoord>();
        let (link_tx, link_rx) = unbounded::<ChunkCoord>();
        let (seed_tx, seed_rx) = unbounded::<ChunkCoord>();
        let (light_tx, light_rx) = unbounded::<LightRequest>();
        let (mesh_tx, mesh_rx) = unbounded::<ChunkCoord>();

        let mut pools = Vec::with_capacity(4);
        pools.push({
            let world = Arc::clone(&world);
            let counters_c = Arc::clone(&counters);
            let cancel = cancel.clone();
            spawn_lane("gen", w_gen, gen_rx, &counters, |c| &c.generate, move |coord| {
                if cancel.is_cancelled() {
                    world.region().cancel_request(coord);
                    return;
                }
                let chunk = world.generate(coord);
                log::trace!(target: "pipeline", "generated {} empty={}", coord, chunk.is_empty());
                world.install(chunk);
                send_counted(&link_tx, &counters_c.link, coord);
            })?
        });
        pools.push({
            let world = Arc::clone(&world);
            let counters_c = Arc::clone(&counters);
            let cancel = cancel.clone();
            let light_tx = light_tx.clone();
            spawn_lane("link", w_link, link_rx, &counters, |c| &c.link, move |coord| {
                if cancel.is_cancelled() {
                    return;
                }
                let Some((newly, advanced)) = link_chunk(&world, coord) else {
                    return;
                };
                send_counted(
                    &light_tx,
                    &counters_c.light,
                    LightRequest::Linked { coord, newly },
                );
                for c in advanced {
                    send_counted(&seed_tx, &counters_c.seed, c);
                }
            })?
        });
        pools.push({
            let world = Arc::clone(&world);
            let counters_c = Arc::clone(&counters);
            let cancel = cancel.clone();
            let light_tx = light_tx.clone();
            spawn_lane("seed", w_seed, seed_rx, &counters, |c| &c.seed, move |coord| {
                if cancel.is_cancelled() {
                    return;
                }
                if let Some(seeds) = plan_seeds(&world, coord) {
                    send_counted(
                        &light_tx,
                        &counters_c.light,
                        LightRequest::Seed { coord, seeds },
                    );
                }
            })?
        });
        pools.push({
            let world = Arc::clone(&world);
            let mesher = Arc::clone(&mesher);
            let cancel = cancel.clone();
            spawn_lane("mesh", w_mesh, mesh_rx, &counters, |c| &c.mesh, move |coord| {
                if cancel.is_cancelled() {
                    return;
                }
                mesh_chunk(&world, mesher.as_ref(), coord);
            })?
        });

        let actor = LightActor {
            world: Arc::clone(&world),
            engine,
            rx: light_rx,
            mesh_tx,
            counters: Arc::clone(&counters),
            cancel: cancel.clone(),
        };
        let actor = thread::Builder::new()
            .name("lumen-light".into())
            .spawn(move || actor.run())?;
        log::info!(
            target: "pipeline",
            "pipeline started: gen={} link={} seed={} mesh={}",
            w_gen,
            w_link,
            w_seed,
            w_mesh
        );
        Ok(Self {
            world,
            mesher,
            cancel,
            counters,
            gen_tx: Some(gen_tx),
            light_tx: Some(light_tx),
            actor: Some(actor),
            _pools: pools,
        })
    }

    pub fn world(&self) -> &Arc<World> {
        &self.world
    }

    /// Queues generation of `coord` unless it is resident or already requested.
    pub fn request(&self, coord: ChunkCoord) -> bool {
        let Some(tx) = &self.gen_tx else {
            return false;
        };
        if !self.world.region().mark_requested(coord) {
            return false;
        }
        send_counted(tx, &self.counters.generate, coord);
        true
    }

    /// Moves the region to `viewer`: unloads far chunks, then requests missing ones nearest first.
    pub fn update(&self, viewer: ChunkCoord) -> RegionPlan {
        let plan = self.world.region().plan(viewer, self.world.sky_level());
        for &coord in &plan.unload {
            self.unload(coord);
        }
        for &coord in &plan.load {
            self.request(coord);
        }
        if !plan.load.is_empty() || !plan.unload.is_empty() {
            log::info!(
                target: "pipeline",
                "viewer at {}: load {} unload {}",
                viewer,
                plan.load.len(),
                plan.unload.len()
            );
        }
        plan
    }

    /// Tears `coord` down: pending entry, mesh, graph links, deferred light, then storage.
    pub fn unload(&self, coord: ChunkCoord) {
        let handle = {
            let mut linker = self.world.linker_mut();
            linker.pending.remove(&coord);
            self.mesher.remove(coord);
            linker.graph.dereference(coord);
            self.world.region().remove(coord)
        };
        if let Some(tx) = &self.light_tx {
            send_counted(tx, &self.counters.light, LightRequest::Forget(coord));
        }
        if let Some(h) = handle {
            h.write().unwrap().dispose();
        }
        log::debug!(target: "pipeline", "unloaded {}", coord);
    }

    /// Writes `block` at a world position and schedules the light and mesh updates.
    ///
    /// Returns the previous block, or `None` when the position is not loaded. Writes above
    /// the terrain create the sky chunk on demand.
    pub fn set_block(&self, wx: i32, wy: i32, wz: i32, block: BlockId) -> Option<BlockId> {
        let world = &self.world;
        let meta = world.meta();
        let (coord, idx) = locate(wx, wy, wz);
        let handle = match world.chunk(coord) {
            Some(h) => h,
            None if world.is_sky(coord) && block != AIR => {
                let h = world.install(Chunk::empty(coord));
                world.linker_mut().graph.calculate_adjacency(coord);
                h
            }
            None => return None,
        };
        let (old, materialized) = {
            let mut c = handle.write().unwrap();
            let was_empty = c.is_empty();
            let old = c.set_block(idx, block, meta);
            (old, was_empty && c.is_populated())
        };
        if old == block && !materialized {
            return Some(old);
        }
        world.deltas().add_delta(coord, idx, block);

        let neighbors = world.neighbor_faces(coord);
        let across = handle.write().unwrap().refresh_around(idx, &neighbors, meta);
        for (face, j) in across {
            let n = coord.neighbor(face);
            if let Some(h) = world.chunk(n) {
                let faces = world.neighbor_faces(n);
                let mut c = h.write().unwrap();
                c.refresh_active(j, &faces, meta);
                c.mark_dirty();
            }
        }
        if let Some(tx) = &self.light_tx {
            send_counted(
                tx,
                &self.counters.light,
                LightRequest::Edit {
                    coord,
                    idx,
                    old,
                    new: block,
                    materialized,
                    remesh: affected_chunks(coord, idx),
                },
            );
        }
        Some(old)
    }

    /// Blocks until the light thread has flooded everything queued so far.
    pub fn flush_light(&self) {
        let Some(tx) = &self.light_tx else { return };
        let (ack_tx, ack_rx) = crossbeam_channel::bounded(1);
        send_counted(tx, &self.counters.light, LightRequest::Flush(ack_tx));
        let _ = ack_rx.recv();
    }

    pub fn queue_debug_counts(&self) -> StageCounts {
        let c = &self.counters;
        StageCounts {
            generate: c.generate.snapshot(),
            link: c.link.snapshot(),
            seed: c.seed.snapshot(),
            light: c.light.snapshot(),
            mesh: c.mesh.snapshot(),
        }
    }

    pub fn is_idle(&self) -> bool {
        self.queue_debug_counts().is_idle()
    }

    /// Polls until every stage is idle or `timeout` passes. Returns whether it went idle.
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            if self.is_idle() {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            thread::sleep(Duration::from_millis(2));
        }
    }

    /// Cancels outstanding work, closes the stages and returns the light engine.
    pub fn shutdown(mut self) -> LightEngine {
        self.stop().unwrap_or_default()
    }

    fn stop(&mut self) -> Option<LightEngine> {
        let actor = self.actor.take()?;
        self.cancel.cancel();
        self.gen_tx = None;
        self.light_tx = None;
        match actor.join() {
            Ok(engine) => {
                log::info!(target: "pipeline", "pipeline stopped");
                Some(engine)
            }
            Err(_) => {
                log::error!(target: "pipeline", "light thread panicked");
                None
            }
        }
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Links `coord` and promotes every chunk that became fully linked.
///
/// Returns the newly linked neighbors and the chunks now in `Linked`.
fn link_chunk(world: &World, coord: ChunkCoord) -> Option<(Vec<ChunkCoord>, Vec<ChunkCoord>)> {
    let handle = world.chunk(coord)?;
    let mut linker = world.linker_mut();
    if !world.region().contains(coord) {
        return None;
    }
    let newly = linker.graph.calculate_adjacency(coord);
    if handle.read().unwrap().state() == ChunkState::Generated {
        linker.pending.insert(coord);
    }
    let mut advanced = Vec::new();
    for c in iter::once(coord).chain(newly.iter().copied()) {
        if !linker.pending.contains(&c) || !linker.graph.all_neighbors_exist(c) {
            continue;
        }
        linker.pending.remove(&c);
        if let Some(h) = world.chunk(c) {
            let mut chunk = h.write().unwrap();
            if chunk.state() == ChunkState::Generated {
                chunk.set_state(ChunkState::Linked);
                advanced.push(c);
            }
        }
    }
    log::trace!(
        target: "pipeline",
        "linked {}: {} new links, {} advanced, {} pending",
        coord,
        newly.len(),
        advanced.len(),
        linker.pending.len()
    );
    Some((newly, advanced))
}

fn plan_seeds(world: &World, coord: ChunkCoord) -> Option<Vec<lumen_lighting::LightSeed>> {
    let handle = world.chunk(coord)?;
    if handle.read().unwrap().state() != ChunkState::Linked {
        return None;
    }
    let vol = WorldVolume::new(world);
    let mut seeds = seed::initial_skylight(&vol, coord);
    seeds.extend(seed::initial_light(&vol, coord));
    let mut chunk = handle.write().unwrap();
    if chunk.state() != ChunkState::Linked {
        return None;
    }
    chunk.set_state(ChunkState::LightSeeded);
    Some(seeds)
}

/// Builds and hands over the mesh for a lit chunk, or sends it back to linking
/// when a neighbor went away.
pub(crate) fn mesh_chunk(world: &World, mesher: &dyn Mesher, coord: ChunkCoord) {
    let Some(handle) = world.chunk(coord) else {
        return;
    };
    let meshable = |c: &Chunk| {
        c.is_populated() && matches!(c.state(), ChunkState::Lit | ChunkState::Ready)
    };
    if !meshable(&*handle.read().unwrap()) {
        return;
    }
    {
        let mut linker = world.linker_mut();
        if !linker.graph.contains(coord) {
            return;
        }
        if !linker.graph.all_neighbors_exist(coord) {
            handle.write().unwrap().set_state(ChunkState::Generated);
            linker.pending.insert(coord);
            log::debug!(target: "pipeline", "{} lost a neighbor; back to linking", coord);
            return;
        }
    }
    let meta = world.meta();
    let neighbors = world.neighbor_faces(coord);
    let input = {
        let mut c = handle.write().unwrap();
        if !meshable(&*c) {
            return;
        }
        c.populate_active(&neighbors, meta);
        let input = MeshInput::build(&c, &neighbors, meta);
        c.set_state(ChunkState::Ready);
        c.clear_dirty();
        input
    };
    let linker = world.linker();
    if linker.graph.contains(coord) {
        mesher.add_mesh(input);
    }
}
