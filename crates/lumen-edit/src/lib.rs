//! Block edits layered over generated terrain.
#![forbid(unsafe_code)]

use std::sync::Mutex;

use hashbrown::HashMap;
use lumen_blocks::{AIR, BlockId, Face};
use lumen_world::{BlockBuffer, CHUNK_SIZE, CHUNK_VOLUME, ChunkCoord, voxel_coords};

/// Durable overlay of player edits, applied after terrain fill.
pub trait DeltaStore: Send + Sync {
    /// Overlays the stored edits for `coord` onto freshly generated blocks.
    ///
    /// `None` in or out means the chunk holds no blocks.
    fn apply_delta(&self, coord: ChunkCoord, blocks: Option<BlockBuffer>) -> Option<BlockBuffer>;

    fn add_delta(&self, coord: ChunkCoord, voxel: usize, block: BlockId);
}

/// Store that forgets everything; terrain comes back exactly as generated.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoDeltas;

impl DeltaStore for NoDeltas {
    fn apply_delta(&self, _coord: ChunkCoord, blocks: Option<BlockBuffer>) -> Option<BlockBuffer> {
        blocks
    }

    fn add_delta(&self, _coord: ChunkCoord, _voxel: usize, _block: BlockId) {}
}

#[derive(Default, Debug, Clone, Copy)]
pub struct DeltaStoreStats {
    pub chunk_entries: usize,
    pub block_edits: usize,
    pub rev_entries: usize,
}

#[derive(Default)]
struct Inner {
    edits: HashMap<ChunkCoord, HashMap<u16, BlockId>>,
    // latest edit stamp per chunk, including neighbors whose border it touched
    rev: HashMap<ChunkCoord, u64>,
    counter: u64,
}

/// In-memory delta store with per-chunk revision stamps.
#[derive(Default)]
pub struct MemoryDeltaStore {
    inner: Mutex<Inner>,
}

impl MemoryDeltaStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> DeltaStoreStats {
        let inner = self.inner.lock().unwrap();
        DeltaStoreStats {
            chunk_entries: inner.edits.len(),
            block_edits: inner.edits.values().map(|m| m.len()).sum(),
            rev_entries: inner.rev.len(),
        }
    }

    pub fn get(&self, coord: ChunkCoord, voxel: usize) -> Option<BlockId> {
        let inner = self.inner.lock().unwrap();
        inner
            .edits
            .get(&coord)
            .and_then(|m| m.get(&(voxel as u16)).copied())
    }

    /// Edits recorded for one chunk, sorted by voxel index.
    pub fn snapshot_for_chunk(&self, coord: ChunkCoord) -> Vec<(usize, BlockId)> {
        let inner = self.inner.lock().unwrap();
        let mut out: Vec<(usize, BlockId)> = inner
            .edits
            .get(&coord)
            .map(|m| m.iter().map(|(k, v)| (*k as usize, *v)).collect())
            .unwrap_or_default();
        out.sort_unstable();
        out
    }

    pub fn get_rev(&self, coord: ChunkCoord) -> u64 {
        let inner = self.inner.lock().unwrap();
        inner.rev.get(&coord).copied().unwrap_or(0)
    }
}

impl DeltaStore for MemoryDeltaStore {
    fn apply_delta(&self, coord: ChunkCoord, blocks: Option<BlockBuffer>) -> Option<BlockBuffer> {
        let inner = self.inner.lock().unwrap();
        let Some(edits) = inner.edits.get(&coord).filter(|m| !m.is_empty()) else {
            return blocks;
        };
        let mut buf = blocks.unwrap_or_else(|| vec![AIR; CHUNK_VOLUME]);
        for (idx, block) in edits {
            buf[*idx as usize] = *block;
        }
        log::debug!(target: "edit", "applied {} edits to chunk {}", edits.len(), coord);
        buf.iter().any(|b| *b != AIR).then_some(buf)
    }

    fn add_delta(&self, coord: ChunkCoord, voxel: usize, block: BlockId) {
        debug_assert!(voxel < CHUNK_VOLUME);
        let mut inner = self.inner.lock().unwrap();
        inner.counter = inner.counter.wrapping_add(1).max(1);
        let stamp = inner.counter;
        inner
            .edits
            .entry(coord)
            .or_default()
            .insert(voxel as u16, block);
        for c in affected_chunks(coord, voxel) {
            inner.rev.insert(c, stamp);
        }
    }
}

/// Chunks whose meshes can change when voxel `voxel` of `coord` changes:
/// the chunk itself plus each face neighbor the voxel borders.
pub fn affected_chunks(coord: ChunkCoord, voxel: usize) -> Vec<ChunkCoord> {
    let (x, y, z) = voxel_coords(voxel);
    let last = CHUNK_SIZE - 1;
    let mut out = vec![coord];
    for (on_edge, face) in [
        (x == last, Face::PosX),
        (x == 0, Face::NegX),
        (y == last, Face::PosY),
        (y == 0, Face::NegY),
        (z == last, Face::PosZ),
        (z == 0, Face::NegZ),
    ] {
        if on_edge {
            out.push(coord.neighbor(face));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_world::voxel_index;

    #[test]
    fn edits_overlay_generated_blocks() {
        let store = MemoryDeltaStore::new();
        let c = ChunkCoord::new(1, 0, -1);
        let mut blocks = vec![AIR; CHUNK_VOLUME];
        blocks[0] = 1;
        store.add_delta(c, 0, AIR);
        store.add_delta(c, 17, 7);
        let out = store.apply_delta(c, Some(blocks)).unwrap();
        assert_eq!(out[0], AIR);
        assert_eq!(out[17], 7);
        assert_eq!(store.get(c, 17), Some(7));
        assert_eq!(store.snapshot_for_chunk(c), vec![(0, AIR), (17, 7)]);
    }

    #[test]
    fn edits_can_create_or_empty_a_chunk() {
        let store = MemoryDeltaStore::new();
        let sky = ChunkCoord::new(0, 9, 0);
        store.add_delta(sky, 100, 3);
        let created = store.apply_delta(sky, None).unwrap();
        assert_eq!(created[100], 3);
        store.add_delta(sky, 100, AIR);
        assert!(store.apply_delta(sky, None).is_none());
        let untouched = ChunkCoord::new(5, 5, 5);
        assert!(store.apply_delta(untouched, None).is_none());
    }

    #[test]
    fn border_edit_bumps_neighbor_revision() {
        let store = MemoryDeltaStore::new();
        let c = ChunkCoord::new(4, 7, -2);
        store.add_delta(c, voxel_index(5, 15, 11), 1);
        let top = store.get_rev(c);
        assert!(top > 0);
        assert_eq!(store.get_rev(c.neighbor(Face::PosY)), top);
        assert_eq!(store.get_rev(c.neighbor(Face::NegY)), 0);

        store.add_delta(c, voxel_index(9, 0, 3), 1);
        let bottom = store.get_rev(c);
        assert!(bottom > top);
        assert_eq!(store.get_rev(c.neighbor(Face::NegY)), bottom);
        assert_eq!(store.get_rev(c.neighbor(Face::PosY)), top);
        let stats = store.stats();
        assert_eq!(stats.chunk_entries, 1);
        assert_eq!(stats.block_edits, 2);
        assert_eq!(stats.rev_entries, 3);
    }

    #[test]
    fn affected_chunks_cover_corner_faces() {
        let c = ChunkCoord::new(0, 0, 0);
        let mut got = affected_chunks(c, voxel_index(0, 15, 7));
        got.sort();
        assert_eq!(
            got,
            vec![ChunkCoord::new(-1, 0, 0), c, ChunkCoord::new(0, 1, 0)]
        );
        assert_eq!(affected_chunks(c, voxel_index(3, 3, 3)), vec![c]);
    }
}
