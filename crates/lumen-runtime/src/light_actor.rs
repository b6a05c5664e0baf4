use std::sync::Arc;
use std::sync::atomic::Ordering;

use crossbeam_channel::{Receiver, Sender};
use hashbrown::HashSet;
use lumen_blocks::BlockId;
use lumen_chunk::ChunkState;
use lumen_lighting::{LightEngine, LightSeed};
use lumen_world::ChunkCoord;

use crate::cancel::CancelToken;
use crate::pipeline::StageCounters;
use crate::world::{World, WorldVolume};

/// Work for the thread that owns the [`LightEngine`].
#[derive(Debug)]
pub enum LightRequest {
    /// Initial seeds planned for a freshly linked chunk.
    Seed { coord: ChunkCoord, seeds: Vec<LightSeed> },
    /// `coord` joined the graph; `newly` are the chunks it linked to.
    Linked { coord: ChunkCoord, newly: Vec<ChunkCoord> },
    /// A block was written at `idx`. `materialized` means the chunk had no grid before.
    Edit {
        coord: ChunkCoord,
        idx: usize,
        old: BlockId,
        new: BlockId,
        materialized: bool,
        remesh: Vec<ChunkCoord>,
    },
    /// `coord` was unloaded.
    Forget(ChunkCoord),
    /// Replies once every request queued before it has been flooded.
    Flush(Sender<()>),
}

pub(crate) struct LightActor {
    pub world: Arc<World>,
    pub engine: LightEngine,
    pub rx: Receiver<LightRequest>,
    pub mesh_tx: Sender<ChunkCoord>,
    pub counters: Arc<StageCounters>,
    pub cancel: CancelToken,
}

impl LightActor {
    /// Serves batches until every sender is gone; hands the engine back.
    pub fn run(mut self) -> LightEngine {
        while let Ok(first) = self.rx.recv() {
            let mut batch = vec![first];
            batch.extend(self.rx.try_iter());
            let n = batch.len();
            let counters = Arc::clone(&self.counters);
            let lane = &counters.light;
            lane.queued.fetch_sub(n, Ordering::Relaxed);
            lane.inflight.fetch_add(n, Ordering::Relaxed);
            if self.cancel.is_cancelled() {
                lane.inflight.fetch_sub(n, Ordering::Relaxed);
                continue;
            }
            self.process(batch);
            lane.inflight.fetch_sub(n, Ordering::Relaxed);
        }
        log::debug!(target: "light", "light actor stopped");
        self.engine
    }

    fn process(&mut self, batch: Vec<LightRequest>) {
        let world = Arc::clone(&self.world);
        let mut vol = WorldVolume::new(&world);
        let mut seeded = Vec::new();
        let mut forward: HashSet<ChunkCoord> = HashSet::new();
        let mut acks = Vec::new();
        for req in batch {
            match req {
                LightRequest::Seed { coord, seeds } => {
                    self.engine.apply_seeds(&mut vol, &seeds);
                    seeded.push(coord);
                }
                LightRequest::Linked { coord, newly } => {
                    self.engine.relink(&mut vol, coord);
                    for n in newly {
                        self.engine.relink(&mut vol, n);
                    }
                }
                LightRequest::Edit {
                    coord,
                    idx,
                    old,
                    new,
                    materialized,
                    remesh,
                } => {
                    if materialized {
                        self.engine.relink(&mut vol, coord);
                    }
                    let stats = self.engine.update_light(&mut vol, coord, idx, old, new);
                    log::debug!(
                        target: "light",
                        "edit {} #{}: {} -> {} ({} nodes)",
                        coord,
                        idx,
                        old,
                        new,
                        stats.processed
                    );
                    forward.extend(remesh);
                }
                LightRequest::Forget(coord) => self.engine.forget(coord),
                LightRequest::Flush(ack) => acks.push(ack),
            }
        }
        let stats = self.engine.flood_fill(&mut vol);
        if stats.processed > 0 {
            log::debug!(
                target: "light",
                "batch flood: processed={} updated={} deferred={}",
                stats.processed,
                stats.updated,
                stats.deferred
            );
        }
        for coord in &seeded {
            if let Some(h) = world.chunk(*coord) {
                let mut c = h.write().unwrap();
                if c.state() == ChunkState::LightSeeded {
                    c.set_state(ChunkState::Lit);
                }
            }
        }
        forward.extend(seeded);
        forward.extend(self.engine.take_touched());
        let mut forward: Vec<ChunkCoord> = forward.into_iter().collect();
        forward.sort();
        for coord in forward {
            let Some(h) = world.chunk(coord) else { continue };
            let meshable = {
                let c = h.read().unwrap();
                c.is_populated() && matches!(c.state(), ChunkState::Lit | ChunkState::Ready)
            };
            if meshable {
                self.counters.mesh.queued.fetch_add(1, Ordering::Relaxed);
                if self.mesh_tx.send(coord).is_err() {
                    self.counters.mesh.queued.fetch_sub(1, Ordering::Relaxed);
                }
            }
        }
        for ack in acks {
            let _ = ack.send(());
        }
    }
}
