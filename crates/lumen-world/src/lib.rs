//! Chunk coordinates, terrain sampling, and worldgen parameters.
#![forbid(unsafe_code)]

mod chunk_coord;
pub mod column_cache;
pub mod generation;
pub mod noise_terrain;
pub mod terrain;
pub mod worldgen;

pub use chunk_coord::ChunkCoord;
pub use column_cache::{ColumnCache, ColumnCacheStats};
pub use generation::{BlockBuffer, ColumnProfile, generate_blocks, sky_level};
pub use noise_terrain::NoiseTerrain;
pub use terrain::{Biome, ColumnSample, FlatTerrain, TerrainGenerator};
pub use worldgen::{ConfigError, WorldGenConfig, WorldGenMode};

/// Edge length of a cubic chunk in voxels.
pub const CHUNK_SIZE: usize = 16;
pub const CHUNK_AREA: usize = CHUNK_SIZE * CHUNK_SIZE;
pub const CHUNK_VOLUME: usize = CHUNK_AREA * CHUNK_SIZE;

/// Linear voxel index inside a chunk, laid out y-major then z then x.
#[inline]
pub fn voxel_index(x: usize, y: usize, z: usize) -> usize {
    debug_assert!(x < CHUNK_SIZE && y < CHUNK_SIZE && z < CHUNK_SIZE);
    (y * CHUNK_SIZE + z) * CHUNK_SIZE + x
}

#[inline]
pub fn voxel_coords(index: usize) -> (usize, usize, usize) {
    debug_assert!(index < CHUNK_VOLUME);
    let x = index % CHUNK_SIZE;
    let z = (index / CHUNK_SIZE) % CHUNK_SIZE;
    let y = index / CHUNK_AREA;
    (x, y, z)
}

/// Splits a world-space voxel position into its chunk and in-chunk index.
#[inline]
pub fn locate(wx: i32, wy: i32, wz: i32) -> (ChunkCoord, usize) {
    let s = CHUNK_SIZE as i32;
    let coord = ChunkCoord::containing(wx, wy, wz);
    let lx = wx.rem_euclid(s) as usize;
    let ly = wy.rem_euclid(s) as usize;
    let lz = wz.rem_euclid(s) as usize;
    (coord, voxel_index(lx, ly, lz))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_round_trips_through_coords() {
        for i in [0, 1, 15, 16, 255, 256, 4095] {
            let (x, y, z) = voxel_coords(i);
            assert_eq!(voxel_index(x, y, z), i);
        }
        assert_eq!(voxel_index(1, 0, 0), 1);
        assert_eq!(voxel_index(0, 0, 1), CHUNK_SIZE);
        assert_eq!(voxel_index(0, 1, 0), CHUNK_AREA);
    }

    #[test]
    fn locate_handles_negative_positions() {
        let (c, i) = locate(-1, -17, 16);
        assert_eq!(c, ChunkCoord::new(-1, -2, 1));
        assert_eq!(voxel_coords(i), (15, 15, 0));
    }
}
