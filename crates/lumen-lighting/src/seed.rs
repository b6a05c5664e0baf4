//! Read-only planning of initial light for freshly linked chunks.
//!
//! Plans can be computed on any thread; the engine applies them.

use lumen_blocks::{Face, MAX_LIGHT};
use lumen_chunk::{LightValue, VoxelStep, border_indexes, step};
use lumen_world::{CHUNK_SIZE, ChunkCoord, voxel_index};

use crate::volume::{LightNode, LightVolume, NeighborSlot};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LightSeed {
    pub node: LightNode,
    pub value: LightValue,
}

/// Sky level a voxel receives from an open neighbor across `face`.
#[inline]
pub fn open_sky_level(face: Face) -> u8 {
    if face == Face::PosY {
        MAX_LIGHT
    } else {
        MAX_LIGHT - 1
    }
}

/// Sky support voxel `idx` of `coord` gets from open neighbors.
pub fn external_sky<V: LightVolume + ?Sized>(vol: &V, coord: ChunkCoord, idx: usize) -> u8 {
    Face::ALL
        .into_iter()
        .filter(|f| matches!(step(idx, *f), VoxelStep::Across(_)))
        .filter(|f| vol.neighbor(coord, *f) == NeighborSlot::Empty)
        .map(open_sky_level)
        .max()
        .unwrap_or(0)
}

/// Sky seeds for the transparent boundary voxels of `coord` facing an open neighbor across `face`.
pub fn open_border<V: LightVolume + ?Sized>(vol: &V, coord: ChunkCoord, face: Face) -> Vec<LightSeed> {
    let meta = vol.meta();
    let level = open_sky_level(face);
    border_indexes(face)
        .filter_map(|idx| {
            let (block, _) = vol.voxel(coord, idx)?;
            meta.is_transparent(block).then(|| LightSeed {
                node: LightNode::new(coord, idx),
                value: LightValue::new(level, 0),
            })
        })
        .collect()
}

/// Emitters at their emission level plus sky from every open side.
pub fn initial_light<V: LightVolume + ?Sized>(vol: &V, coord: ChunkCoord) -> Vec<LightSeed> {
    if !vol.is_populated(coord) {
        return Vec::new();
    }
    let meta = vol.meta();
    let mut seeds: Vec<LightSeed> = vol
        .light_sources(coord)
        .into_iter()
        .filter_map(|idx| {
            let (block, _) = vol.voxel(coord, idx)?;
            let emission = meta.light_emission(block);
            (emission > 0).then(|| LightSeed {
                node: LightNode::new(coord, idx),
                value: LightValue::new(0, emission),
            })
        })
        .collect();
    for face in Face::ALL {
        if vol.neighbor(coord, face) == NeighborSlot::Empty {
            seeds.extend(open_border(vol, coord, face));
        }
    }
    seeds
}

/// Full-strength shafts down every open column that has sunlight above it.
///
/// A shaft stops at the first opaque voxel and continues into linked chunks below.
pub fn initial_skylight<V: LightVolume + ?Sized>(vol: &V, coord: ChunkCoord) -> Vec<LightSeed> {
    if !vol.is_populated(coord) {
        return Vec::new();
    }
    let meta = vol.meta();
    let above = vol.neighbor(coord, Face::PosY);
    let mut seeds = Vec::new();
    for z in 0..CHUNK_SIZE {
        for x in 0..CHUNK_SIZE {
            let lit = match above {
                NeighborSlot::Empty => true,
                NeighborSlot::Loaded(n) => vol
                    .voxel(n, voxel_index(x, 0, z))
                    .is_some_and(|(b, l)| meta.is_transparent(b) && l.sky() == MAX_LIGHT),
                NeighborSlot::Missing(_) => false,
            };
            if !lit {
                continue;
            }
            let mut chunk = coord;
            'shaft: loop {
                for y in (0..CHUNK_SIZE).rev() {
                    let idx = voxel_index(x, y, z);
                    match vol.voxel(chunk, idx) {
                        Some((b, _)) if meta.is_transparent(b) => seeds.push(LightSeed {
                            node: LightNode::new(chunk, idx),
                            value: LightValue::SUNLIGHT,
                        }),
                        _ => break 'shaft,
                    }
                }
                match vol.neighbor(chunk, Face::NegY) {
                    NeighborSlot::Loaded(below) => chunk = below,
                    _ => break,
                }
            }
        }
    }
    seeds
}
