use lumen_blocks::{AIR, BlockId};

use crate::column_cache::ColumnCache;
use crate::terrain::{ColumnSample, TerrainGenerator};
use crate::{CHUNK_AREA, CHUNK_SIZE, CHUNK_VOLUME, ChunkCoord, voxel_index};

/// Dense block ids of one chunk in `voxel_index` order.
pub type BlockBuffer = Vec<BlockId>;

/// Terrain samples for the 16×16 columns of a chunk stack.
#[derive(Clone, Debug)]
pub struct ColumnProfile {
    pub cx: i32,
    pub cz: i32,
    samples: Vec<ColumnSample>,
}

impl ColumnProfile {
    pub fn from_samples(cx: i32, cz: i32, samples: Vec<ColumnSample>) -> Self {
        assert_eq!(samples.len(), CHUNK_AREA, "column profile needs one sample per column");
        Self { cx, cz, samples }
    }

    pub fn sample(terrain: &dyn TerrainGenerator, cx: i32, cz: i32) -> Self {
        let origin = ChunkCoord::new(cx, 0, cz).origin();
        let mut samples = Vec::with_capacity(CHUNK_AREA);
        for z in 0..CHUNK_SIZE {
            for x in 0..CHUNK_SIZE {
                samples.push(terrain.fill_column(origin, x, z));
            }
        }
        Self { cx, cz, samples }
    }

    #[inline]
    pub fn at(&self, x: usize, z: usize) -> ColumnSample {
        self.samples[z * CHUNK_SIZE + x]
    }
}

/// First chunk layer lying entirely above `max_elevation`.
#[inline]
pub fn sky_level(max_elevation: i32) -> i32 {
    max_elevation.div_euclid(CHUNK_SIZE as i32) + 1
}

fn chunk_rng(seed: u64, coord: ChunkCoord) -> fastrand::Rng {
    let mut h = seed ^ 0x9E37_79B9_7F4A_7C15;
    for v in [coord.cx, coord.cy, coord.cz] {
        h = (h ^ (v as u32 as u64)).wrapping_mul(0x0100_0000_01B3);
        h = h.rotate_left(17);
    }
    fastrand::Rng::with_seed(h)
}

/// Fills the block buffer for `coord`.
///
/// Returns `None` when the chunk holds no blocks at all, either because it
/// lies above the terrain's maximum elevation or because every voxel came
/// out as air.
pub fn generate_blocks(
    terrain: &dyn TerrainGenerator,
    columns: &ColumnCache,
    coord: ChunkCoord,
    seed: u64,
) -> Option<BlockBuffer> {
    let (_, base_y, _) = coord.origin();
    if base_y > terrain.max_elevation() {
        return None;
    }
    let profile = columns.get_or_insert_with(coord.cx, coord.cz, || {
        ColumnProfile::sample(terrain, coord.cx, coord.cz)
    });
    let mut rng = chunk_rng(seed, coord);
    let mut blocks = vec![AIR; CHUNK_VOLUME];
    let mut has_blocks = false;
    for z in 0..CHUNK_SIZE {
        for x in 0..CHUNK_SIZE {
            let column = profile.at(x, z);
            for y in 0..CHUNK_SIZE {
                let wy = base_y + y as i32;
                let block = terrain.fill(column.height, wy, column.biome, &mut rng);
                if block != AIR {
                    has_blocks = true;
                }
                blocks[voxel_index(x, y, z)] = block;
            }
        }
    }
    has_blocks.then_some(blocks)
}
