use lumen_blocks::{BlockId, BlockMetadataProvider, Face};
use lumen_chunk::{LightValue, VoxelStep, step};
use lumen_world::ChunkCoord;

/// Handle to one voxel; its light is read when the node is processed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LightNode {
    pub coord: ChunkCoord,
    pub idx: u16,
}

impl LightNode {
    #[inline]
    pub fn new(coord: ChunkCoord, idx: usize) -> Self {
        Self {
            coord,
            idx: idx as u16,
        }
    }

    #[inline]
    pub fn index(self) -> usize {
        self.idx as usize
    }
}

/// What sits across one face of a chunk, as seen by the light engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NeighborSlot {
    /// Linked chunk with a voxel grid.
    Loaded(ChunkCoord),
    /// Linked empty chunk or open sky.
    Empty,
    /// Not linked yet; light headed there is deferred under this coordinate.
    Missing(ChunkCoord),
}

/// Chunk storage as seen by the light engine.
pub trait LightVolume {
    fn meta(&self) -> &dyn BlockMetadataProvider;

    fn neighbor(&self, coord: ChunkCoord, face: Face) -> NeighborSlot;

    fn is_populated(&self, coord: ChunkCoord) -> bool;

    /// Block and light of a voxel in a populated chunk; `None` otherwise.
    fn voxel(&self, coord: ChunkCoord, idx: usize) -> Option<(BlockId, LightValue)>;

    fn set_light(&mut self, coord: ChunkCoord, idx: usize, value: LightValue) -> bool;

    fn light_sources(&self, coord: ChunkCoord) -> Vec<usize>;
}

/// Where one step from `node` lands.
pub(crate) enum Target {
    Voxel(LightNode),
    Open,
    Missing(ChunkCoord),
}

pub(crate) fn resolve<V: LightVolume + ?Sized>(vol: &V, node: LightNode, face: Face) -> Target {
    match step(node.index(), face) {
        VoxelStep::Inside(j) => Target::Voxel(LightNode::new(node.coord, j)),
        VoxelStep::Across(j) => match vol.neighbor(node.coord, face) {
            NeighborSlot::Loaded(n) => Target::Voxel(LightNode::new(n, j)),
            NeighborSlot::Empty => Target::Open,
            NeighborSlot::Missing(n) => Target::Missing(n),
        },
    }
}
