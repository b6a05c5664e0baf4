use lumen_blocks::{AIR, BlockId};
use serde::Deserialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Biome {
    Plains,
    Desert,
    Mountains,
    Tundra,
}

/// Height and biome of one world column.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ColumnSample {
    pub height: i32,
    pub biome: Biome,
}

/// Terrain collaborator that fills chunk block buffers column by column.
pub trait TerrainGenerator: Send + Sync {
    /// Samples the column at in-chunk `(x, z)` of the chunk whose origin is `chunk_origin`.
    fn fill_column(&self, chunk_origin: (i32, i32, i32), x: usize, z: usize) -> ColumnSample;

    /// Block at world height `y` in a column of `terrain_height`.
    fn fill(&self, terrain_height: i32, y: i32, biome: Biome, rng: &mut fastrand::Rng) -> BlockId;

    /// Highest world `y` that can hold a non-air block.
    fn max_elevation(&self) -> i32;
}

/// Level terrain: `surface` at `height`, `filler` below, air above.
#[derive(Clone, Debug)]
pub struct FlatTerrain {
    pub height: i32,
    pub surface: BlockId,
    pub filler: BlockId,
}

impl FlatTerrain {
    pub fn new(height: i32, surface: BlockId, filler: BlockId) -> Self {
        Self {
            height,
            surface,
            filler,
        }
    }
}

impl TerrainGenerator for FlatTerrain {
    fn fill_column(&self, _chunk_origin: (i32, i32, i32), _x: usize, _z: usize) -> ColumnSample {
        ColumnSample {
            height: self.height,
            biome: Biome::Plains,
        }
    }

    fn fill(&self, terrain_height: i32, y: i32, _biome: Biome, _rng: &mut fastrand::Rng) -> BlockId {
        if y > terrain_height {
            AIR
        } else if y == terrain_height {
            self.surface
        } else {
            self.filler
        }
    }

    fn max_elevation(&self) -> i32 {
        self.height
    }
}
