use std::sync::Arc;

use dashmap::{DashMap, DashSet};
use lumen_world::ChunkCoord;

use crate::world::ChunkHandle;

/// Box of chunk offsets around the viewer, nearest first.
#[derive(Clone, Debug)]
pub struct Stencil {
    offsets: Vec<(i32, i32, i32)>,
    radius: i32,
    vertical_radius: i32,
}

impl Stencil {
    /// Offsets within `radius` horizontally and `vertical_radius` vertically,
    /// sorted by Manhattan distance with ties broken by `(dy, dz, dx)`.
    pub fn new(radius: i32, vertical_radius: i32) -> Self {
        let r = radius.max(0);
        let v = vertical_radius.max(0);
        let mut offsets = Vec::with_capacity(((2 * r + 1) * (2 * r + 1) * (2 * v + 1)) as usize);
        for dy in -v..=v {
            for dz in -r..=r {
                for dx in -r..=r {
                    offsets.push((dx, dy, dz));
                }
            }
        }
        offsets.sort_by_key(|&(dx, dy, dz)| (dx.abs() + dy.abs() + dz.abs(), dy, dz, dx));
        Self {
            offsets,
            radius: r,
            vertical_radius: v,
        }
    }

    pub fn offsets(&self) -> &[(i32, i32, i32)] {
        &self.offsets
    }

    pub fn radius(&self) -> i32 {
        self.radius
    }

    pub fn vertical_radius(&self) -> i32 {
        self.vertical_radius
    }

    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    /// Chunk coordinates covered around `center`, in load order.
    pub fn around(&self, center: ChunkCoord) -> impl Iterator<Item = ChunkCoord> + '_ {
        self.offsets
            .iter()
            .map(move |&(dx, dy, dz)| center.offset(dx, dy, dz))
    }
}

/// What one viewer move asks of the pipeline.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RegionPlan {
    /// Missing chunks inside the stencil, nearest first.
    pub load: Vec<ChunkCoord>,
    /// Loaded chunks beyond the radius plus the unload margin.
    pub unload: Vec<ChunkCoord>,
}

/// The set of resident chunks around the viewer.
pub struct Region {
    chunks: DashMap<ChunkCoord, ChunkHandle>,
    requested: DashSet<ChunkCoord>,
    stencil: Stencil,
    unload_margin: i32,
}

impl Region {
    pub fn new(stencil: Stencil, unload_margin: i32) -> Self {
        Self {
            chunks: DashMap::new(),
            requested: DashSet::new(),
            stencil,
            unload_margin: unload_margin.max(0),
        }
    }

    pub fn stencil(&self) -> &Stencil {
        &self.stencil
    }

    /// Chunks to request and chunks to drop for a viewer standing in `center`.
    ///
    /// Layers at or above `sky_level` are never requested; they only exist once edited.
    pub fn plan(&self, center: ChunkCoord, sky_level: i32) -> RegionPlan {
        let load = self
            .stencil
            .around(center)
            .filter(|c| c.cy < sky_level)
            .filter(|c| !self.chunks.contains_key(c) && !self.requested.contains(c))
            .collect();
        let mut unload: Vec<ChunkCoord> = self
            .coords()
            .into_iter()
            .filter(|c| self.is_outside(center, *c))
            .collect();
        unload.sort_by_key(|c| std::cmp::Reverse(c.manhattan(center)));
        RegionPlan { load, unload }
    }

    fn is_outside(&self, center: ChunkCoord, c: ChunkCoord) -> bool {
        let keep = self.stencil.radius + self.unload_margin;
        let keep_y = self.stencil.vertical_radius + self.unload_margin;
        (c.cx - center.cx).abs() > keep
            || (c.cz - center.cz).abs() > keep
            || (c.cy - center.cy).abs() > keep_y
    }

    /// Records an outstanding generation request. Returns `false` if one is already out
    /// or the chunk is resident.
    pub fn mark_requested(&self, coord: ChunkCoord) -> bool {
        !self.chunks.contains_key(&coord) && self.requested.insert(coord)
    }

    pub fn cancel_request(&self, coord: ChunkCoord) {
        self.requested.remove(&coord);
    }

    pub fn is_requested(&self, coord: ChunkCoord) -> bool {
        self.requested.contains(&coord)
    }

    pub fn install(&self, handle: ChunkHandle, coord: ChunkCoord) {
        self.chunks.insert(coord, handle);
        self.requested.remove(&coord);
    }

    #[inline]
    pub fn get(&self, coord: ChunkCoord) -> Option<ChunkHandle> {
        self.chunks.get(&coord).map(|r| Arc::clone(r.value()))
    }

    pub fn contains(&self, coord: ChunkCoord) -> bool {
        self.chunks.contains_key(&coord)
    }

    pub fn remove(&self, coord: ChunkCoord) -> Option<ChunkHandle> {
        self.chunks.remove(&coord).map(|(_, h)| h)
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn in_flight(&self) -> usize {
        self.requested.len()
    }

    /// Resident coordinates, sorted.
    pub fn coords(&self) -> Vec<ChunkCoord> {
        let mut out: Vec<ChunkCoord> = self.chunks.iter().map(|r| *r.key()).collect();
        out.sort();
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::RwLock;

    use lumen_chunk::Chunk;

    fn handle(c: ChunkCoord) -> ChunkHandle {
        Arc::new(RwLock::new(Chunk::empty(c)))
    }

    #[test]
    fn stencil_is_sorted_nearest_first() {
        let s = Stencil::new(2, 1);
        assert_eq!(s.len(), 5 * 5 * 3);
        assert_eq!(s.offsets()[0], (0, 0, 0));
        let d: Vec<i32> = s
            .offsets()
            .iter()
            .map(|&(x, y, z)| x.abs() + y.abs() + z.abs())
            .collect();
        assert!(d.windows(2).all(|w| w[0] <= w[1]));
        // distance-one ties: dy first, then dz, then dx
        assert_eq!(
            &s.offsets()[1..7],
            &[(0, -1, 0), (0, 0, -1), (-1, 0, 0), (1, 0, 0), (0, 0, 1), (0, 1, 0)]
        );
    }

    #[test]
    fn plan_skips_sky_layers_and_resident_chunks() {
        let region = Region::new(Stencil::new(1, 1), 0);
        let center = ChunkCoord::new(0, 0, 0);
        let plan = region.plan(center, 1);
        assert_eq!(plan.load.len(), 9 * 2);
        assert!(plan.load.iter().all(|c| c.cy < 1));
        assert_eq!(plan.load[0], center);

        region.install(handle(center), center);
        assert!(region.mark_requested(ChunkCoord::new(1, 0, 0)));
        assert!(!region.mark_requested(ChunkCoord::new(1, 0, 0)));
        assert!(!region.mark_requested(center));
        let plan = region.plan(center, 1);
        assert_eq!(plan.load.len(), 9 * 2 - 2);
    }

    #[test]
    fn unload_respects_margin_per_axis() {
        let region = Region::new(Stencil::new(1, 0), 1);
        for c in [
            ChunkCoord::new(2, 0, 0),
            ChunkCoord::new(3, 0, 0),
            ChunkCoord::new(0, 2, 0),
            ChunkCoord::new(-2, 0, 2),
        ] {
            region.install(handle(c), c);
        }
        let plan = region.plan(ChunkCoord::new(0, 0, 0), 8);
        assert_eq!(
            plan.unload,
            vec![ChunkCoord::new(3, 0, 0), ChunkCoord::new(0, 2, 0)]
        );
    }
}
