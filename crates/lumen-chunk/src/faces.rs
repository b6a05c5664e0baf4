use lumen_blocks::{AIR, BlockId, Face};
use lumen_world::{CHUNK_AREA, CHUNK_SIZE, voxel_coords, voxel_index};

use crate::light::LightValue;

/// Result of moving one voxel from `idx` in some direction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VoxelStep {
    /// Still inside the chunk, at this index.
    Inside(usize),
    /// Crossed into the neighbor chunk, landing at this index there.
    Across(usize),
}

#[inline]
pub fn step(idx: usize, face: Face) -> VoxelStep {
    let (x, y, z) = voxel_coords(idx);
    let last = CHUNK_SIZE - 1;
    match face {
        Face::PosX if x == last => VoxelStep::Across(voxel_index(0, y, z)),
        Face::NegX if x == 0 => VoxelStep::Across(voxel_index(last, y, z)),
        Face::PosY if y == last => VoxelStep::Across(voxel_index(x, 0, z)),
        Face::NegY if y == 0 => VoxelStep::Across(voxel_index(x, last, z)),
        Face::PosZ if z == last => VoxelStep::Across(voxel_index(x, y, 0)),
        Face::NegZ if z == 0 => VoxelStep::Across(voxel_index(x, y, last)),
        Face::PosX => VoxelStep::Inside(idx + 1),
        Face::NegX => VoxelStep::Inside(idx - 1),
        Face::PosY => VoxelStep::Inside(idx + CHUNK_AREA),
        Face::NegY => VoxelStep::Inside(idx - CHUNK_AREA),
        Face::PosZ => VoxelStep::Inside(idx + CHUNK_SIZE),
        Face::NegZ => VoxelStep::Inside(idx - CHUNK_SIZE),
    }
}

// Plane layout per axis:
// - X faces: index = y * 16 + z
// - Y faces: index = z * 16 + x
// - Z faces: index = y * 16 + x
// Both sides of a seam agree on the index, so a voxel and the one it touches
// across the border share a plane slot.
#[inline]
pub fn plane_index(face: Face, idx: usize) -> usize {
    let (x, y, z) = voxel_coords(idx);
    match face {
        Face::PosX | Face::NegX => y * CHUNK_SIZE + z,
        Face::PosY | Face::NegY => z * CHUNK_SIZE + x,
        Face::PosZ | Face::NegZ => y * CHUNK_SIZE + x,
    }
}

/// Voxel indexes on the boundary layer facing `face`, in plane order.
pub fn border_indexes(face: Face) -> impl Iterator<Item = usize> {
    let last = CHUNK_SIZE - 1;
    (0..CHUNK_AREA).map(move |p| {
        let (a, b) = (p / CHUNK_SIZE, p % CHUNK_SIZE);
        match face {
            Face::PosX => voxel_index(last, a, b),
            Face::NegX => voxel_index(0, a, b),
            Face::PosY => voxel_index(b, last, a),
            Face::NegY => voxel_index(b, 0, a),
            Face::PosZ => voxel_index(b, a, last),
            Face::NegZ => voxel_index(b, a, 0),
        }
    })
}

/// Blocks and light of one chunk boundary layer, indexed by [`plane_index`].
#[derive(Clone, Debug)]
pub struct BorderPlane {
    pub blocks: Vec<BlockId>,
    pub light: Vec<LightValue>,
}

/// What lies across one side of a chunk.
#[derive(Clone, Debug, Default)]
pub enum NeighborPlane {
    /// No chunk linked there yet.
    #[default]
    Missing,
    /// Empty chunk or open sky: all air in full sunlight.
    Open,
    Plane(BorderPlane),
}

/// Snapshot of the six neighbor planes around a chunk.
///
/// Taken one neighbor lock at a time so visibility and mesh light can be
/// computed without holding two chunk locks.
#[derive(Clone, Debug, Default)]
pub struct NeighborFaces {
    sides: [NeighborPlane; 6],
}

impl NeighborFaces {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every side open, as for a chunk surrounded by sky.
    pub fn open() -> Self {
        let mut n = Self::default();
        for face in Face::ALL {
            n.set(face, NeighborPlane::Open);
        }
        n
    }

    pub fn set(&mut self, face: Face, plane: NeighborPlane) {
        self.sides[face.index()] = plane;
    }

    pub fn get(&self, face: Face) -> &NeighborPlane {
        &self.sides[face.index()]
    }

    pub fn is_complete(&self) -> bool {
        self.sides
            .iter()
            .all(|s| !matches!(s, NeighborPlane::Missing))
    }

    /// Block touching boundary voxel `idx` across `face`; `None` when the neighbor is missing.
    #[inline]
    pub fn block_across(&self, face: Face, idx: usize) -> Option<BlockId> {
        match self.get(face) {
            NeighborPlane::Missing => None,
            NeighborPlane::Open => Some(AIR),
            NeighborPlane::Plane(p) => Some(p.blocks[plane_index(face, idx)]),
        }
    }

    #[inline]
    pub fn light_across(&self, face: Face, idx: usize) -> LightValue {
        match self.get(face) {
            NeighborPlane::Missing => LightValue::NULL,
            NeighborPlane::Open => LightValue::SUNLIGHT,
            NeighborPlane::Plane(p) => p.light[plane_index(face, idx)],
        }
    }
}

/// Visible faces of one voxel as a bit per [`Face::index`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct FacesState(u8);

impl FacesState {
    pub const NONE: FacesState = FacesState(0);

    #[inline]
    pub fn set(&mut self, face: Face) {
        self.0 |= 1 << face.index();
    }

    #[inline]
    pub fn is_visible(self, face: Face) -> bool {
        self.0 & (1 << face.index()) != 0
    }

    #[inline]
    pub fn any(self) -> bool {
        self.0 != 0
    }

    #[inline]
    pub fn count(self) -> u32 {
        self.0.count_ones()
    }

    pub fn faces(self) -> impl Iterator<Item = Face> {
        Face::ALL.into_iter().filter(move |f| self.is_visible(*f))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_crosses_only_at_the_boundary() {
        let idx = voxel_index(15, 3, 7);
        assert_eq!(step(idx, Face::PosX), VoxelStep::Across(voxel_index(0, 3, 7)));
        assert_eq!(step(idx, Face::NegX), VoxelStep::Inside(voxel_index(14, 3, 7)));
        let bottom = voxel_index(2, 0, 2);
        assert_eq!(step(bottom, Face::NegY), VoxelStep::Across(voxel_index(2, 15, 2)));
        assert_eq!(step(bottom, Face::PosY), VoxelStep::Inside(voxel_index(2, 1, 2)));
        let front = voxel_index(4, 4, 15);
        assert_eq!(step(front, Face::PosZ), VoxelStep::Across(voxel_index(4, 4, 0)));
    }

    #[test]
    fn seam_voxels_share_a_plane_slot() {
        for face in Face::ALL {
            for idx in border_indexes(face) {
                let VoxelStep::Across(other) = step(idx, face) else {
                    panic!("border voxel {idx} does not cross {face:?}");
                };
                assert_eq!(plane_index(face, idx), plane_index(face.opposite(), other));
            }
            let mut seen: Vec<usize> = border_indexes(face).map(|i| plane_index(face, i)).collect();
            seen.sort_unstable();
            seen.dedup();
            assert_eq!(seen.len(), CHUNK_AREA);
        }
    }

    #[test]
    fn faces_state_bits() {
        let mut f = FacesState::NONE;
        assert!(!f.any());
        f.set(Face::PosY);
        f.set(Face::NegZ);
        assert!(f.is_visible(Face::PosY));
        assert!(!f.is_visible(Face::NegY));
        assert_eq!(f.count(), 2);
        assert_eq!(f.faces().collect::<Vec<_>>(), vec![Face::PosY, Face::NegZ]);
    }
}
