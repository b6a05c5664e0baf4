use hashbrown::HashSet;
use lumen_blocks::{AIR, BlockId, BlockMetadataProvider, Face};
use lumen_world::{BlockBuffer, CHUNK_VOLUME, ChunkCoord};

use crate::faces::{
    BorderPlane, FacesState, NeighborFaces, NeighborPlane, VoxelStep, border_indexes, plane_index,
    step,
};
use crate::light::LightValue;

/// Progress of a chunk through the generation pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ChunkState {
    Generated,
    Linked,
    LightSeeded,
    Lit,
    Ready,
}

/// Dense per-voxel data of a populated chunk.
#[derive(Clone, Debug)]
pub struct Voxels {
    blocks: Vec<BlockId>,
    light: Vec<LightValue>,
}

impl Voxels {
    fn open_sky() -> Self {
        Self {
            blocks: vec![AIR; CHUNK_VOLUME],
            light: vec![LightValue::SUNLIGHT; CHUNK_VOLUME],
        }
    }
}

#[derive(Clone, Debug)]
pub enum ChunkStorage {
    /// All air, reading as full sunlight; nothing allocated.
    Empty,
    Populated(Box<Voxels>),
}

#[derive(Clone, Debug)]
pub struct Chunk {
    coord: ChunkCoord,
    storage: ChunkStorage,
    active: HashSet<u16>,
    light_sources: HashSet<u16>,
    recalculate_mesh: bool,
    state: ChunkState,
}

impl Chunk {
    /// An empty chunk; it needs no lighting or meshing and starts `Ready`.
    pub fn empty(coord: ChunkCoord) -> Self {
        Self {
            coord,
            storage: ChunkStorage::Empty,
            active: HashSet::new(),
            light_sources: HashSet::new(),
            recalculate_mesh: false,
            state: ChunkState::Ready,
        }
    }

    pub fn from_blocks(
        coord: ChunkCoord,
        blocks: Option<BlockBuffer>,
        meta: &dyn BlockMetadataProvider,
    ) -> Self {
        let mut chunk = Self::empty(coord);
        if let Some(blocks) = blocks {
            chunk.fill(blocks, meta);
        }
        chunk
    }

    /// Replaces the voxel grid with `blocks` in darkness and resets the chunk to `Generated`.
    pub fn fill(&mut self, blocks: BlockBuffer, meta: &dyn BlockMetadataProvider) {
        assert_eq!(blocks.len(), CHUNK_VOLUME, "block buffer has wrong length");
        self.light_sources = blocks
            .iter()
            .enumerate()
            .filter(|(_, b)| meta.is_light_source(**b))
            .map(|(i, _)| i as u16)
            .collect();
        self.storage = ChunkStorage::Populated(Box::new(Voxels {
            blocks,
            light: vec![LightValue::NULL; CHUNK_VOLUME],
        }));
        self.active.clear();
        self.recalculate_mesh = true;
        self.state = ChunkState::Generated;
    }

    #[inline]
    pub fn coord(&self) -> ChunkCoord {
        self.coord
    }

    #[inline]
    pub fn state(&self) -> ChunkState {
        self.state
    }

    #[inline]
    pub fn set_state(&mut self, state: ChunkState) {
        self.state = state;
    }

    #[inline]
    pub fn storage(&self) -> &ChunkStorage {
        &self.storage
    }

    #[inline]
    pub fn is_populated(&self) -> bool {
        matches!(self.storage, ChunkStorage::Populated(_))
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        !self.is_populated()
    }

    #[inline]
    pub fn block(&self, idx: usize) -> BlockId {
        debug_assert!(idx < CHUNK_VOLUME);
        match &self.storage {
            ChunkStorage::Empty => AIR,
            ChunkStorage::Populated(v) => v.blocks[idx],
        }
    }

    #[inline]
    pub fn light(&self, idx: usize) -> LightValue {
        debug_assert!(idx < CHUNK_VOLUME);
        match &self.storage {
            ChunkStorage::Empty => LightValue::SUNLIGHT,
            ChunkStorage::Populated(v) => v.light[idx],
        }
    }

    /// Writes a block and returns the one it replaced.
    ///
    /// Writing into an empty chunk allocates a grid of air in full sunlight.
    pub fn set_block(&mut self, idx: usize, id: BlockId, meta: &dyn BlockMetadataProvider) -> BlockId {
        debug_assert!(idx < CHUNK_VOLUME);
        if matches!(self.storage, ChunkStorage::Empty) {
            if id == AIR {
                return AIR;
            }
            self.storage = ChunkStorage::Populated(Box::new(Voxels::open_sky()));
        }
        let ChunkStorage::Populated(v) = &mut self.storage else {
            unreachable!("storage allocated above");
        };
        let old = std::mem::replace(&mut v.blocks[idx], id);
        if meta.is_light_source(id) {
            self.light_sources.insert(idx as u16);
        } else {
            self.light_sources.remove(&(idx as u16));
        }
        if old != id {
            self.recalculate_mesh = true;
        }
        old
    }

    /// Stores `value`; returns whether anything changed. Empty chunks ignore writes.
    pub fn set_light(&mut self, idx: usize, value: LightValue) -> bool {
        debug_assert!(idx < CHUNK_VOLUME);
        match &mut self.storage {
            ChunkStorage::Empty => false,
            ChunkStorage::Populated(v) => {
                if v.light[idx] == value {
                    return false;
                }
                v.light[idx] = value;
                self.recalculate_mesh = true;
                true
            }
        }
    }

    pub fn add_active(&mut self, idx: usize) -> bool {
        self.active.insert(idx as u16)
    }

    pub fn remove_active(&mut self, idx: usize) -> bool {
        self.active.remove(&(idx as u16))
    }

    pub fn is_active(&self, idx: usize) -> bool {
        self.active.contains(&(idx as u16))
    }

    /// Active voxel indexes in ascending order.
    pub fn active(&self) -> Vec<usize> {
        let mut out: Vec<usize> = self.active.iter().map(|i| *i as usize).collect();
        out.sort_unstable();
        out
    }

    pub fn active_len(&self) -> usize {
        self.active.len()
    }

    pub fn add_light_source(&mut self, idx: usize) -> bool {
        self.light_sources.insert(idx as u16)
    }

    pub fn remove_light_source(&mut self, idx: usize) -> bool {
        self.light_sources.remove(&(idx as u16))
    }

    pub fn light_sources(&self) -> Vec<usize> {
        let mut out: Vec<usize> = self.light_sources.iter().map(|i| *i as usize).collect();
        out.sort_unstable();
        out
    }

    #[inline]
    pub fn needs_mesh(&self) -> bool {
        self.recalculate_mesh
    }

    #[inline]
    pub fn mark_dirty(&mut self) {
        self.recalculate_mesh = true;
    }

    #[inline]
    pub fn clear_dirty(&mut self) {
        self.recalculate_mesh = false;
    }

    /// Faces of voxel `idx` that a mesher should emit.
    ///
    /// A face shows when the adjacent voxel is air, or transparent while this
    /// voxel is opaque. Faces towards a missing neighbor stay hidden.
    pub fn faces_state(
        &self,
        idx: usize,
        neighbors: &NeighborFaces,
        meta: &dyn BlockMetadataProvider,
    ) -> FacesState {
        let current = self.block(idx);
        let mut faces = FacesState::NONE;
        if current == AIR {
            return faces;
        }
        let opaque = meta.is_opaque(current);
        for face in Face::ALL {
            let adjacent = match step(idx, face) {
                VoxelStep::Inside(j) => self.block(j),
                VoxelStep::Across(_) => match neighbors.block_across(face, idx) {
                    Some(b) => b,
                    None => continue,
                },
            };
            if adjacent == AIR || (opaque && meta.is_transparent(adjacent)) {
                faces.set(face);
            }
        }
        faces
    }

    /// Light visible through face `face` of voxel `idx`.
    pub fn face_light(&self, idx: usize, face: Face, neighbors: &NeighborFaces) -> LightValue {
        match step(idx, face) {
            VoxelStep::Inside(j) => self.light(j),
            VoxelStep::Across(_) => neighbors.light_across(face, idx),
        }
    }

    /// Rebuilds the active set from scratch; returns how many voxels are active.
    pub fn populate_active(
        &mut self,
        neighbors: &NeighborFaces,
        meta: &dyn BlockMetadataProvider,
    ) -> usize {
        self.active.clear();
        if self.is_empty() {
            return 0;
        }
        for idx in 0..CHUNK_VOLUME {
            if self.faces_state(idx, neighbors, meta).any() {
                self.active.insert(idx as u16);
            }
        }
        self.active.len()
    }

    /// Re-evaluates one voxel's membership in the active set.
    pub fn refresh_active(
        &mut self,
        idx: usize,
        neighbors: &NeighborFaces,
        meta: &dyn BlockMetadataProvider,
    ) -> bool {
        let visible = self.faces_state(idx, neighbors, meta).any();
        if visible {
            self.add_active(idx);
        } else {
            self.remove_active(idx);
        }
        visible
    }

    /// Re-evaluates `idx` and its in-chunk neighbors.
    ///
    /// Returns the `(face, index)` positions that lie across a border and must
    /// be refreshed in the neighboring chunk.
    pub fn refresh_around(
        &mut self,
        idx: usize,
        neighbors: &NeighborFaces,
        meta: &dyn BlockMetadataProvider,
    ) -> Vec<(Face, usize)> {
        self.refresh_active(idx, neighbors, meta);
        let mut across = Vec::new();
        for face in Face::ALL {
            match step(idx, face) {
                VoxelStep::Inside(j) => {
                    self.refresh_active(j, neighbors, meta);
                }
                VoxelStep::Across(j) => across.push((face, j)),
            }
        }
        self.recalculate_mesh = true;
        across
    }

    /// Snapshot of the boundary layer facing `face`.
    pub fn border(&self, face: Face) -> NeighborPlane {
        let ChunkStorage::Populated(v) = &self.storage else {
            return NeighborPlane::Open;
        };
        let mut plane = BorderPlane {
            blocks: vec![AIR; lumen_world::CHUNK_AREA],
            light: vec![LightValue::NULL; lumen_world::CHUNK_AREA],
        };
        for idx in border_indexes(face) {
            let p = plane_index(face, idx);
            plane.blocks[p] = v.blocks[idx];
            plane.light[p] = v.light[idx];
        }
        NeighborPlane::Plane(plane)
    }

    /// Copy of the block grid, `None` for an empty chunk.
    pub fn blocks(&self) -> Option<BlockBuffer> {
        match &self.storage {
            ChunkStorage::Empty => None,
            ChunkStorage::Populated(v) => Some(v.blocks.clone()),
        }
    }

    /// Releases voxel storage and bookkeeping sets.
    pub fn dispose(&mut self) {
        self.storage = ChunkStorage::Empty;
        self.active = HashSet::new();
        self.light_sources = HashSet::new();
        self.recalculate_mesh = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_blocks::BlockRegistry;
    use lumen_world::voxel_index;

    fn stone_floor(reg: &BlockRegistry) -> BlockBuffer {
        let stone = reg.id_by_name("stone").unwrap();
        let mut blocks = vec![AIR; CHUNK_VOLUME];
        for z in 0..16 {
            for x in 0..16 {
                blocks[voxel_index(x, 0, z)] = stone;
            }
        }
        blocks
    }

    #[test]
    fn empty_chunk_reads_as_sunlit_air() {
        let reg = BlockRegistry::builtin();
        let mut c = Chunk::empty(ChunkCoord::new(0, 4, 0));
        assert_eq!(c.state(), ChunkState::Ready);
        assert_eq!(c.block(123), AIR);
        assert_eq!(c.light(123), LightValue::SUNLIGHT);
        assert!(!c.set_light(123, LightValue::NULL));
        assert_eq!(c.set_block(5, AIR, &reg), AIR);
        assert!(c.is_empty());
    }

    #[test]
    fn writing_into_empty_chunk_allocates_sunlit_grid() {
        let reg = BlockRegistry::builtin();
        let torch = reg.id_by_name("torch").unwrap();
        let mut c = Chunk::empty(ChunkCoord::new(0, 4, 0));
        let idx = voxel_index(3, 3, 3);
        assert_eq!(c.set_block(idx, torch, &reg), AIR);
        assert!(c.is_populated());
        assert_eq!(c.block(idx), torch);
        assert_eq!(c.light(voxel_index(9, 9, 9)), LightValue::SUNLIGHT);
        assert_eq!(c.light_sources(), vec![idx]);
        c.set_block(idx, AIR, &reg);
        assert!(c.light_sources().is_empty());
    }

    #[test]
    fn set_light_marks_dirty_only_on_change() {
        let reg = BlockRegistry::builtin();
        let mut c = Chunk::from_blocks(ChunkCoord::new(0, 0, 0), Some(stone_floor(&reg)), &reg);
        c.clear_dirty();
        assert!(!c.set_light(40, LightValue::NULL));
        assert!(!c.needs_mesh());
        assert!(c.set_light(40, LightValue::new(3, 4)));
        assert!(c.needs_mesh());
        assert_eq!(c.light(40), LightValue::new(3, 4));
    }

    #[test]
    fn missing_neighbors_hide_faces_and_open_ones_show_them() {
        let reg = BlockRegistry::builtin();
        let mut c = Chunk::from_blocks(ChunkCoord::new(0, 0, 0), Some(stone_floor(&reg)), &reg);
        let corner = voxel_index(0, 0, 0);
        let missing = NeighborFaces::new();
        let faces = c.faces_state(corner, &missing, &reg);
        assert!(faces.is_visible(Face::PosY));
        assert!(!faces.is_visible(Face::NegY));
        assert!(!faces.is_visible(Face::NegX));
        assert!(!faces.is_visible(Face::PosX));

        let open = NeighborFaces::open();
        let faces = c.faces_state(corner, &open, &reg);
        assert!(faces.is_visible(Face::NegY));
        assert!(faces.is_visible(Face::NegX));

        assert_eq!(c.populate_active(&missing, &reg), 256);
        assert!(!c.faces_state(voxel_index(4, 5, 4), &open, &reg).any());
    }

    #[test]
    fn transparent_neighbors_show_opaque_faces_only() {
        let reg = BlockRegistry::builtin();
        let stone = reg.id_by_name("stone").unwrap();
        let glass = reg.id_by_name("glass").unwrap();
        let water = reg.id_by_name("water").unwrap();
        let mut c = Chunk::empty(ChunkCoord::new(0, 0, 0));
        let a = voxel_index(5, 5, 5);
        let b = voxel_index(6, 5, 5);
        c.set_block(a, stone, &reg);
        c.set_block(b, glass, &reg);
        let n = NeighborFaces::open();
        assert!(c.faces_state(a, &n, &reg).is_visible(Face::PosX));
        assert!(!c.faces_state(b, &n, &reg).is_visible(Face::NegX));
        c.set_block(a, water, &reg);
        assert!(!c.faces_state(a, &n, &reg).is_visible(Face::PosX));
        assert!(!c.faces_state(b, &n, &reg).is_visible(Face::NegX));
    }

    #[test]
    fn refresh_around_reports_cross_border_positions() {
        let reg = BlockRegistry::builtin();
        let stone = reg.id_by_name("stone").unwrap();
        let mut c = Chunk::from_blocks(ChunkCoord::new(0, 0, 0), Some(stone_floor(&reg)), &reg);
        let n = NeighborFaces::open();
        c.populate_active(&n, &reg);
        let above = voxel_index(15, 1, 4);
        c.set_block(above, stone, &reg);
        let across = c.refresh_around(above, &n, &reg);
        assert_eq!(across, vec![(Face::PosX, voxel_index(0, 1, 4))]);
        assert!(c.is_active(above));
        assert!(c.is_active(voxel_index(15, 0, 4)));
    }

    #[test]
    fn border_snapshot_and_dispose() {
        let reg = BlockRegistry::builtin();
        let stone = reg.id_by_name("stone").unwrap();
        let mut c = Chunk::from_blocks(ChunkCoord::new(0, 0, 0), Some(stone_floor(&reg)), &reg);
        let NeighborPlane::Plane(p) = c.border(Face::NegY) else {
            panic!("populated chunk must snapshot a plane");
        };
        assert!(p.blocks.iter().all(|b| *b == stone));
        let NeighborPlane::Plane(p) = c.border(Face::PosY) else {
            panic!("populated chunk must snapshot a plane");
        };
        assert!(p.blocks.iter().all(|b| *b == AIR));
        c.dispose();
        assert!(c.is_empty());
        assert!(matches!(c.border(Face::PosX), NeighborPlane::Open));
        assert_eq!(c.active_len(), 0);
    }
}
