use std::sync::Arc;

use hashbrown::HashMap;
use lumen_blocks::{BlockId, BlockMetadataProvider, Face};
use lumen_chunk::{Chunk, ChunkGraph, LightValue, Link, NeighborFaces};
use lumen_world::ChunkCoord;

use crate::volume::{LightVolume, NeighborSlot};

/// Single-owner set of chunks plus their adjacency graph.
///
/// Used for offline tools and tests where no concurrency is involved.
pub struct ChunkArena {
    chunks: HashMap<ChunkCoord, Chunk>,
    graph: ChunkGraph,
    meta: Arc<dyn BlockMetadataProvider>,
}

impl ChunkArena {
    pub fn new(meta: Arc<dyn BlockMetadataProvider>, sky_level: Option<i32>) -> Self {
        Self {
            chunks: HashMap::new(),
            graph: sky_level.map(ChunkGraph::with_sky_level).unwrap_or_default(),
            meta,
        }
    }

    /// Stores and links `chunk`; returns the neighbors that gained a link.
    pub fn insert(&mut self, chunk: Chunk) -> Vec<ChunkCoord> {
        let coord = chunk.coord();
        self.chunks.insert(coord, chunk);
        self.graph.calculate_adjacency(coord)
    }

    pub fn remove(&mut self, coord: ChunkCoord) -> Option<Chunk> {
        self.graph.dereference(coord);
        self.chunks.remove(&coord)
    }

    pub fn get(&self, coord: ChunkCoord) -> Option<&Chunk> {
        self.chunks.get(&coord)
    }

    pub fn get_mut(&mut self, coord: ChunkCoord) -> Option<&mut Chunk> {
        self.chunks.get_mut(&coord)
    }

    pub fn graph(&self) -> &ChunkGraph {
        &self.graph
    }

    pub fn coords(&self) -> Vec<ChunkCoord> {
        let mut out: Vec<ChunkCoord> = self.chunks.keys().copied().collect();
        out.sort();
        out
    }

    /// Writes a block and returns the previous one, `None` if the chunk is absent.
    pub fn set_block(&mut self, coord: ChunkCoord, idx: usize, id: BlockId) -> Option<BlockId> {
        let meta = Arc::clone(&self.meta);
        self.chunks
            .get_mut(&coord)
            .map(|c| c.set_block(idx, id, meta.as_ref()))
    }

    /// Border snapshot of the six neighbors of `coord`.
    pub fn neighbor_faces(&self, coord: ChunkCoord) -> NeighborFaces {
        let mut faces = NeighborFaces::new();
        for face in Face::ALL {
            match self.graph.neighbor(coord, face) {
                Some(Link::Sky) => faces.set(face, lumen_chunk::NeighborPlane::Open),
                Some(Link::Chunk(n)) => {
                    if let Some(c) = self.chunks.get(&n) {
                        faces.set(face, c.border(face.opposite()));
                    }
                }
                None => {}
            }
        }
        faces
    }
}

impl LightVolume for ChunkArena {
    fn meta(&self) -> &dyn BlockMetadataProvider {
        self.meta.as_ref()
    }

    fn neighbor(&self, coord: ChunkCoord, face: Face) -> NeighborSlot {
        match self.graph.neighbor(coord, face) {
            Some(Link::Sky) => NeighborSlot::Empty,
            Some(Link::Chunk(n)) => match self.chunks.get(&n) {
                Some(c) if c.is_populated() => NeighborSlot::Loaded(n),
                Some(_) => NeighborSlot::Empty,
                None => NeighborSlot::Missing(n),
            },
            None => NeighborSlot::Missing(coord.neighbor(face)),
        }
    }

    fn is_populated(&self, coord: ChunkCoord) -> bool {
        self.chunks.get(&coord).is_some_and(Chunk::is_populated)
    }

    fn voxel(&self, coord: ChunkCoord, idx: usize) -> Option<(BlockId, LightValue)> {
        self.chunks
            .get(&coord)
            .filter(|c| c.is_populated())
            .map(|c| (c.block(idx), c.light(idx)))
    }

    fn set_light(&mut self, coord: ChunkCoord, idx: usize, value: LightValue) -> bool {
        self.chunks
            .get_mut(&coord)
            .is_some_and(|c| c.set_light(idx, value))
    }

    fn light_sources(&self, coord: ChunkCoord) -> Vec<usize> {
        self.chunks
            .get(&coord)
            .map(Chunk::light_sources)
            .unwrap_or_default()
    }
}
