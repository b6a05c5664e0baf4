use std::collections::VecDeque;

use hashbrown::{HashMap, HashSet};
use lumen_blocks::{BlockId, Face, MAX_LIGHT};
use lumen_chunk::{Channel, border_indexes};
use lumen_world::ChunkCoord;

use crate::seed::{self, LightSeed};
use crate::volume::{LightNode, LightVolume, NeighborSlot, Target, resolve};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FloodStats {
    /// Nodes dequeued.
    pub processed: usize,
    /// Voxels whose light increased.
    pub updated: usize,
    /// Crossings filed under a missing neighbor.
    pub deferred: usize,
}

/// BFS light propagation state.
///
/// Owned by exactly one thread; every write to stored light goes through it.
#[derive(Debug, Default)]
pub struct LightEngine {
    queue: VecDeque<LightNode>,
    removal: VecDeque<(LightNode, u8)>,
    leftovers: HashMap<ChunkCoord, HashSet<LightNode>>,
    touched: HashSet<ChunkCoord>,
}

impl LightEngine {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn enqueue(&mut self, node: LightNode) {
        self.queue.push_back(node);
    }

    /// Nodes waiting for the next flood fill.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Total deferred nodes across all missing neighbors.
    pub fn leftover_count(&self) -> usize {
        self.leftovers.values().map(HashSet::len).sum()
    }

    pub fn deferred_for(&self, coord: ChunkCoord) -> usize {
        self.leftovers.get(&coord).map_or(0, HashSet::len)
    }

    /// Chunks whose light changed since the last call, sorted.
    pub fn take_touched(&mut self) -> Vec<ChunkCoord> {
        let mut out: Vec<ChunkCoord> = self.touched.drain().collect();
        out.sort();
        out
    }

    /// Max-writes every seed and queues it, even when nothing changed.
    pub fn apply_seeds<V: LightVolume + ?Sized>(&mut self, vol: &mut V, seeds: &[LightSeed]) {
        for s in seeds {
            let Some((_, current)) = vol.voxel(s.node.coord, s.node.index()) else {
                continue;
            };
            let merged = current.max(s.value);
            if merged != current && vol.set_light(s.node.coord, s.node.index(), merged) {
                self.touched.insert(s.node.coord);
            }
            self.queue.push_back(s.node);
        }
    }

    pub fn initialize_light<V: LightVolume + ?Sized>(&mut self, vol: &mut V, coord: ChunkCoord) {
        let seeds = seed::initial_light(&*vol, coord);
        self.apply_seeds(vol, &seeds);
    }

    pub fn initialize_skylight<V: LightVolume + ?Sized>(&mut self, vol: &mut V, coord: ChunkCoord) {
        let seeds = seed::initial_skylight(&*vol, coord);
        self.apply_seeds(vol, &seeds);
    }

    /// Drains the frontier.
    ///
    /// Light is written only into transparent voxels. Crossing into an
    /// unlinked neighbor files the source node under that neighbor's
    /// coordinate instead of dropping it.
    pub fn flood_fill<V: LightVolume + ?Sized>(&mut self, vol: &mut V) -> FloodStats {
        let mut stats = FloodStats::default();
        while let Some(node) = self.queue.pop_front() {
            stats.processed += 1;
            let Some((_, current)) = vol.voxel(node.coord, node.index()) else {
                continue;
            };
            if current.is_null() {
                continue;
            }
            for face in Face::ALL {
                let candidate = current.attenuated(face);
                if candidate.is_null() {
                    continue;
                }
                let target = match resolve(&*vol, node, face) {
                    Target::Voxel(t) => t,
                    Target::Open => continue,
                    Target::Missing(n) => {
                        self.leftovers.entry(n).or_default().insert(node);
                        stats.deferred += 1;
                        continue;
                    }
                };
                let Some((block, stored)) = vol.voxel(target.coord, target.index()) else {
                    continue;
                };
                if !vol.meta().is_transparent(block) {
                    continue;
                }
                let merged = stored.max(candidate);
                if merged != stored {
                    vol.set_light(target.coord, target.index(), merged);
                    self.touched.insert(target.coord);
                    self.queue.push_back(target);
                    stats.updated += 1;
                }
            }
        }
        if stats.processed > 0 {
            log::debug!(
                target: "light",
                "flood fill: {} processed, {} updated, {} deferred",
                stats.processed,
                stats.updated,
                stats.deferred
            );
        }
        stats
    }

    /// Re-injects light held back while `coord` was missing.
    ///
    /// Besides deferred nodes, the border voxels of every loaded neighbor
    /// facing `coord` are queued, so a chunk that comes back after being
    /// unloaded receives light its neighbors gained in the meantime. An empty
    /// chunk gets no light itself; its neighbors gain open-sky support instead.
    pub fn relink<V: LightVolume + ?Sized>(&mut self, vol: &mut V, coord: ChunkCoord) {
        let deferred = self.leftovers.remove(&coord);
        let populated = vol.is_populated(coord);
        if populated {
            if let Some(nodes) = deferred {
                self.queue.extend(nodes);
            }
        }
        for face in Face::ALL {
            let NeighborSlot::Loaded(n) = vol.neighbor(coord, face) else {
                continue;
            };
            let toward = face.opposite();
            if populated {
                for idx in border_indexes(toward) {
                    if vol.voxel(n, idx).is_some_and(|(_, l)| !l.is_null()) {
                        self.queue.push_back(LightNode::new(n, idx));
                    }
                }
            } else {
                let seeds = seed::open_border(&*vol, n, toward);
                self.apply_seeds(vol, &seeds);
            }
        }
    }

    /// Drops deferred light keyed by or originating from `coord`.
    pub fn forget(&mut self, coord: ChunkCoord) {
        self.leftovers.remove(&coord);
        self.leftovers.retain(|_, nodes| {
            nodes.retain(|n| n.coord != coord);
            !nodes.is_empty()
        });
        self.queue.retain(|n| n.coord != coord);
        self.touched.remove(&coord);
    }

    /// Brings light up to date after voxel `idx` of `coord` changed from `old` to `new`.
    ///
    /// The block must already be written. Edits are applied in order, so the voxel
    /// may already hold a later write than `new`; the stored block wins. Runs the
    /// needed removal waves and a flood fill before returning.
    pub fn update_light<V: LightVolume + ?Sized>(
        &mut self,
        vol: &mut V,
        coord: ChunkCoord,
        idx: usize,
        old: BlockId,
        new: BlockId,
    ) -> FloodStats {
        let Some((block, current)) = vol.voxel(coord, idx) else {
            return FloodStats::default();
        };
        if block != new {
            log::trace!(target: "light", "{} #{}: {} superseded by {}", coord, idx, new, block);
        }
        let new = block;
        let node = LightNode::new(coord, idx);
        let old_emits = vol.meta().is_light_source(old);
        let emission = vol.meta().light_emission(new);
        self.touched.insert(coord);

        if vol.meta().is_transparent(new) {
            if old_emits && old != new {
                self.remove_source(vol, node);
            }
            self.relight_from_neighbors(vol, node);
        } else {
            for ch in Channel::ALL {
                self.remove_channel_at(vol, node, ch);
            }
        }

        if emission > 0 {
            let (_, lv) = vol.voxel(coord, idx).unwrap_or((new, current));
            let lit = lv.with_channel(Channel::Block, lv.block().max(emission));
            vol.set_light(coord, idx, lit);
            self.queue.push_back(node);
        }
        self.flood_fill(vol)
    }

    /// Retracts the block light of a removed emitter at `node`.
    fn remove_source<V: LightVolume + ?Sized>(&mut self, vol: &mut V, node: LightNode) {
        self.remove_channel_at(vol, node, Channel::Block);
    }

    /// Zeroes channel `ch` at `node` and runs the removal wave from there.
    fn remove_channel_at<V: LightVolume + ?Sized>(&mut self, vol: &mut V, node: LightNode, ch: Channel) {
        let Some((_, lv)) = vol.voxel(node.coord, node.index()) else {
            return;
        };
        let level = lv.channel(ch);
        if level == 0 {
            return;
        }
        vol.set_light(node.coord, node.index(), lv.with_channel(ch, 0));
        self.removal.push_back((node, level));
        self.removal_wave(vol, ch);
    }

    /// Channel-restricted decay BFS over the removal queue.
    ///
    /// A neighbor below its predecessor's former level depended on it and is
    /// cleared down to whatever it produces on its own; a neighbor at or above
    /// that level is lit independently and is queued to refill the cleared area.
    fn removal_wave<V: LightVolume + ?Sized>(&mut self, vol: &mut V, ch: Channel) {
        let mut cleared = 0usize;
        while let Some((node, old)) = self.removal.pop_front() {
            for face in Face::ALL {
                let Target::Voxel(target) = resolve(&*vol, node, face) else {
                    continue;
                };
                let Some((block, stored)) = vol.voxel(target.coord, target.index()) else {
                    continue;
                };
                let level = stored.channel(ch);
                if level == 0 {
                    continue;
                }
                let straight_down =
                    ch == Channel::Sky && face == Face::NegY && old == MAX_LIGHT && level == MAX_LIGHT;
                if level < old || straight_down {
                    let floor = self.own_level(&*vol, target, block, ch);
                    vol.set_light(target.coord, target.index(), stored.with_channel(ch, floor));
                    self.touched.insert(target.coord);
                    self.removal.push_back((target, level));
                    if floor > 0 {
                        self.queue.push_back(target);
                    }
                    cleared += 1;
                } else {
                    self.queue.push_back(target);
                }
            }
        }
        if cleared > 0 {
            log::debug!(target: "light", "removal wave ({:?}): {} voxels cleared", ch, cleared);
        }
    }

    /// Level a voxel holds without any neighbor contribution.
    fn own_level<V: LightVolume + ?Sized>(
        &self,
        vol: &V,
        node: LightNode,
        block: BlockId,
        ch: Channel,
    ) -> u8 {
        match ch {
            Channel::Block => vol.meta().light_emission(block),
            Channel::Sky if vol.meta().is_transparent(block) => {
                seed::external_sky(vol, node.coord, node.index())
            }
            Channel::Sky => 0,
        }
    }

    /// Queues every lit neighbor of a newly opened voxel plus its own open-sky support.
    fn relight_from_neighbors<V: LightVolume + ?Sized>(&mut self, vol: &mut V, node: LightNode) {
        for face in Face::ALL {
            if let Target::Voxel(n) = resolve(&*vol, node, face) {
                if vol.voxel(n.coord, n.index()).is_some_and(|(_, l)| !l.is_null()) {
                    self.queue.push_back(n);
                }
            }
        }
        let sky = seed::external_sky(&*vol, node.coord, node.index());
        if let Some((_, lv)) = vol.voxel(node.coord, node.index()) {
            if sky > lv.sky() {
                vol.set_light(node.coord, node.index(), lv.with_channel(Channel::Sky, sky));
            }
        }
        self.queue.push_back(node);
    }
}
