use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use hashbrown::HashSet;
use lumen_blocks::{BlockId, BlockMetadataProvider, Face};
use lumen_chunk::{Chunk, ChunkGraph, ChunkState, LightValue, Link, NeighborFaces, NeighborPlane};
use lumen_edit::DeltaStore;
use lumen_lighting::{LightVolume, NeighborSlot};
use lumen_world::{
    ChunkCoord, ColumnCache, TerrainGenerator, generate_blocks, sky_level,
};

use crate::region::Region;

/// Shared, individually locked chunk.
pub type ChunkHandle = Arc<RwLock<Chunk>>;

/// Adjacency graph plus chunks waiting on neighbors, guarded by one lock.
///
/// Lock order: the linker before any chunk, never the other way round.
#[derive(Debug)]
pub struct Linker {
    pub graph: ChunkGraph,
    pub pending: HashSet<ChunkCoord>,
}

/// Everything the stages share: resident chunks, the graph, and the world's collaborators.
pub struct World {
    region: Region,
    linker: RwLock<Linker>,
    meta: Arc<dyn BlockMetadataProvider>,
    terrain: Arc<dyn TerrainGenerator>,
    deltas: Arc<dyn DeltaStore>,
    columns: ColumnCache,
    seed: u64,
    sky_level: i32,
}

impl World {
    pub fn new(
        region: Region,
        meta: Arc<dyn BlockMetadataProvider>,
        terrain: Arc<dyn TerrainGenerator>,
        deltas: Arc<dyn DeltaStore>,
        seed: u64,
        column_cache: usize,
    ) -> Self {
        let sky = sky_level(terrain.max_elevation());
        log::info!(
            target: "world",
            "world ready: seed={} sky_level={} max_elevation={}",
            seed,
            sky,
            terrain.max_elevation()
        );
        Self {
            region,
            linker: RwLock::new(Linker {
                graph: ChunkGraph::with_sky_level(sky),
                pending: HashSet::new(),
            }),
            meta,
            terrain,
            deltas,
            columns: ColumnCache::new(column_cache),
            seed,
            sky_level: sky,
        }
    }

    pub fn region(&self) -> &Region {
        &self.region
    }

    pub fn meta(&self) -> &dyn BlockMetadataProvider {
        self.meta.as_ref()
    }

    pub fn deltas(&self) -> &dyn DeltaStore {
        self.deltas.as_ref()
    }

    pub fn columns(&self) -> &ColumnCache {
        &self.columns
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// First chunk layer that generation leaves empty.
    pub fn sky_level(&self) -> i32 {
        self.sky_level
    }

    pub fn is_sky(&self, coord: ChunkCoord) -> bool {
        coord.cy >= self.sky_level
    }

    pub fn linker(&self) -> RwLockReadGuard<'_, Linker> {
        self.linker.read().unwrap()
    }

    pub fn linker_mut(&self) -> RwLockWriteGuard<'_, Linker> {
        self.linker.write().unwrap()
    }

    pub fn chunk(&self, coord: ChunkCoord) -> Option<ChunkHandle> {
        self.region.get(coord)
    }

    pub fn state(&self, coord: ChunkCoord) -> Option<ChunkState> {
        self.chunk(coord).map(|h| h.read().unwrap().state())
    }

    /// Terrain fill, then the edit overlay. Empty results come back `Ready`.
    pub fn generate(&self, coord: ChunkCoord) -> Chunk {
        let blocks = generate_blocks(self.terrain.as_ref(), &self.columns, coord, self.seed);
        let blocks = self.deltas.apply_delta(coord, blocks);
        Chunk::from_blocks(coord, blocks, self.meta.as_ref())
    }

    pub fn install(&self, chunk: Chunk) -> ChunkHandle {
        let coord = chunk.coord();
        let handle = Arc::new(RwLock::new(chunk));
        self.region.install(Arc::clone(&handle), coord);
        handle
    }

    /// Border planes of the six neighbors, taken one chunk lock at a time.
    pub fn neighbor_faces(&self, coord: ChunkCoord) -> NeighborFaces {
        let links: Vec<(Face, Option<Link>)> = {
            let linker = self.linker();
            Face::ALL
                .into_iter()
                .map(|f| (f, linker.graph.neighbor(coord, f)))
                .collect()
        };
        let mut faces = NeighborFaces::new();
        for (face, link) in links {
            match link {
                Some(Link::Sky) => faces.set(face, NeighborPlane::Open),
                Some(Link::Chunk(n)) => {
                    if let Some(h) = self.region.get(n) {
                        let plane = h.read().unwrap().border(face.opposite());
                        faces.set(face, plane);
                    }
                }
                None => {}
            }
        }
        faces
    }

    pub fn block(&self, coord: ChunkCoord, idx: usize) -> Option<BlockId> {
        self.chunk(coord).map(|h| h.read().unwrap().block(idx))
    }

    pub fn light(&self, coord: ChunkCoord, idx: usize) -> Option<LightValue> {
        self.chunk(coord).map(|h| h.read().unwrap().light(idx))
    }
}

/// [`LightVolume`] over the shared world; every access takes one short chunk lock.
pub struct WorldVolume<'a> {
    world: &'a World,
}

impl<'a> WorldVolume<'a> {
    pub fn new(world: &'a World) -> Self {
        Self { world }
    }
}

impl LightVolume for WorldVolume<'_> {
    fn meta(&self) -> &dyn BlockMetadataProvider {
        self.world.meta()
    }

    fn neighbor(&self, coord: ChunkCoord, face: Face) -> NeighborSlot {
        let link = self.world.linker().graph.neighbor(coord, face);
        match link {
            Some(Link::Sky) => NeighborSlot::Empty,
            Some(Link::Chunk(n)) => match self.world.region.get(n) {
                Some(h) if h.read().unwrap().is_populated() => NeighborSlot::Loaded(n),
                Some(_) => NeighborSlot::Empty,
                None => NeighborSlot::Missing(n),
            },
            None => NeighborSlot::Missing(coord.neighbor(face)),
        }
    }

    fn is_populated(&self, coord: ChunkCoord) -> bool {
        self.world
            .region
            .get(coord)
            .is_some_and(|h| h.read().unwrap().is_populated())
    }

    fn voxel(&self, coord: ChunkCoord, idx: usize) -> Option<(BlockId, LightValue)> {
        let h = self.world.region.get(coord)?;
        let c = h.read().unwrap();
        c.is_populated().then(|| (c.block(idx), c.light(idx)))
    }

    fn set_light(&mut self, coord: ChunkCoord, idx: usize, value: LightValue) -> bool {
        self.world
            .region
            .get(coord)
            .is_some_and(|h| h.write().unwrap().set_light(idx, value))
    }

    fn light_sources(&self, coord: ChunkCoord) -> Vec<usize> {
        self.world
            .region
            .get(coord)
            .map(|h| h.read().unwrap().light_sources())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::region::Stencil;
    use lumen_blocks::BlockRegistry;
    use lumen_edit::MemoryDeltaStore;
    use lumen_world::{FlatTerrain, voxel_index};

    fn world(deltas: Arc<dyn DeltaStore>) -> World {
        let reg = Arc::new(BlockRegistry::builtin());
        let stone = reg.id_by_name("stone").unwrap();
        let grass = reg.id_by_name("grass").unwrap();
        World::new(
            Region::new(Stencil::new(1, 1), 1),
            reg,
            Arc::new(FlatTerrain::new(4, grass, stone)),
            deltas,
            7,
            64,
        )
    }

    #[test]
    fn generation_applies_deltas_and_empties_sky() {
        let deltas = Arc::new(MemoryDeltaStore::new());
        let w = world(deltas.clone());
        assert_eq!(w.sky_level(), 1);
        let glass = 7;
        let idx = voxel_index(3, 10, 3);
        deltas.add_delta(ChunkCoord::new(0, 0, 0), idx, glass);
        let c = w.generate(ChunkCoord::new(0, 0, 0));
        assert_eq!(c.block(idx), glass);
        assert_eq!(c.state(), ChunkState::Generated);
        let sky = w.generate(ChunkCoord::new(0, 1, 0));
        assert!(sky.is_empty());
        assert_eq!(sky.state(), ChunkState::Ready);
    }

    #[test]
    fn volume_reports_sky_loaded_and_missing_neighbors() {
        let w = world(Arc::new(lumen_edit::NoDeltas));
        let a = ChunkCoord::new(0, 0, 0);
        let b = ChunkCoord::new(1, 0, 0);
        for c in [a, b] {
            w.install(w.generate(c));
            w.linker_mut().graph.calculate_adjacency(c);
        }
        let vol = WorldVolume::new(&w);
        assert_eq!(vol.neighbor(a, Face::PosX), NeighborSlot::Loaded(b));
        assert_eq!(vol.neighbor(a, Face::PosY), NeighborSlot::Empty);
        assert_eq!(
            vol.neighbor(a, Face::NegX),
            NeighborSlot::Missing(ChunkCoord::new(-1, 0, 0))
        );
        let faces = w.neighbor_faces(a);
        assert!(matches!(faces.get(Face::PosY), NeighborPlane::Open));
        assert!(matches!(faces.get(Face::PosX), NeighborPlane::Plane(_)));
        assert!(matches!(faces.get(Face::NegX), NeighborPlane::Missing));
    }
}
