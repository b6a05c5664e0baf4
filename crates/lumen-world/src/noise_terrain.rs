use fastnoise_lite::{FastNoiseLite, NoiseType};
use lumen_blocks::{AIR, BlockId, BlockRegistry};

use crate::terrain::{Biome, ColumnSample, TerrainGenerator};
use crate::worldgen::WorldGenConfig;

#[derive(Clone, Copy, Debug)]
struct Palette {
    stone: BlockId,
    dirt: BlockId,
    grass: BlockId,
    sand: BlockId,
    snow: BlockId,
    water: BlockId,
    coal: BlockId,
    glow: BlockId,
}

impl Palette {
    fn resolve(reg: &BlockRegistry) -> Self {
        let stone = reg.id_by_name("stone").unwrap_or_else(|| {
            log::warn!("block registry has no 'stone'; terrain falls back to id 1");
            1
        });
        let pick = |name: &str| {
            reg.id_by_name(name).unwrap_or_else(|| {
                log::warn!("block registry has no '{}'; using stone", name);
                stone
            })
        };
        Self {
            stone,
            dirt: pick("dirt"),
            grass: pick("grass"),
            sand: pick("sand"),
            snow: pick("snow"),
            water: reg.id_by_name("water").unwrap_or(AIR),
            coal: pick("coal_ore"),
            glow: pick("glowstone"),
        }
    }
}

/// Height-map terrain with four biomes, sea water and scattered ores.
pub struct NoiseTerrain {
    height: FastNoiseLite,
    mountains: FastNoiseLite,
    temperature: FastNoiseLite,
    moisture: FastNoiseLite,
    cfg: WorldGenConfig,
    palette: Palette,
}

impl NoiseTerrain {
    pub fn new(cfg: &WorldGenConfig, reg: &BlockRegistry) -> Self {
        let seed = cfg.seed as i32;
        let mut height = FastNoiseLite::with_seed(seed);
        height.set_noise_type(Some(NoiseType::OpenSimplex2));
        height.set_frequency(Some(cfg.height.frequency));
        let mut mountains = FastNoiseLite::with_seed(seed ^ 99_173);
        mountains.set_noise_type(Some(NoiseType::OpenSimplex2));
        mountains.set_frequency(Some(cfg.height.frequency * 0.5));
        let mut temperature = FastNoiseLite::with_seed(seed ^ 0x1203_5F31);
        temperature.set_noise_type(Some(NoiseType::OpenSimplex2));
        temperature.set_frequency(Some(cfg.biomes.temp_frequency));
        let mut moisture = FastNoiseLite::with_seed(((seed as u32) ^ 0x92E3_A1B2u32) as i32);
        moisture.set_noise_type(Some(NoiseType::OpenSimplex2));
        moisture.set_frequency(Some(cfg.biomes.moisture_frequency));
        Self {
            height,
            mountains,
            temperature,
            moisture,
            cfg: cfg.clone(),
            palette: Palette::resolve(reg),
        }
    }

    #[inline]
    fn unit(n: f32) -> f32 {
        ((n + 1.0) * 0.5).clamp(0.0, 1.0)
    }

    fn biome_at(&self, x: f32, z: f32, mountain: f32) -> Biome {
        let b = &self.cfg.biomes;
        let t = Self::unit(self.temperature.get_noise_2d(x, z));
        let m = Self::unit(self.moisture.get_noise_2d(x, z));
        if mountain > b.mountain_above {
            Biome::Mountains
        } else if t < b.tundra_below {
            Biome::Tundra
        } else if t > b.desert_above && m < 0.4 {
            Biome::Desert
        } else {
            Biome::Plains
        }
    }
}

impl TerrainGenerator for NoiseTerrain {
    fn fill_column(&self, chunk_origin: (i32, i32, i32), x: usize, z: usize) -> ColumnSample {
        let wx = (chunk_origin.0 + x as i32) as f32;
        let wz = (chunk_origin.2 + z as i32) as f32;
        let h = &self.cfg.height;
        let base = self.height.get_noise_2d(wx, wz);
        let mountain = Self::unit(self.mountains.get_noise_2d(wx, wz));
        let biome = self.biome_at(wx, wz, mountain);
        let mut height = h.base as f32 + base * h.amplitude;
        if biome == Biome::Mountains {
            let ramp = (mountain - self.cfg.biomes.mountain_above)
                / (1.0 - self.cfg.biomes.mountain_above).max(f32::EPSILON);
            height += ramp.clamp(0.0, 1.0) * h.mountain_boost;
        }
        ColumnSample {
            height: height.round() as i32,
            biome,
        }
    }

    fn fill(&self, terrain_height: i32, y: i32, biome: Biome, rng: &mut fastrand::Rng) -> BlockId {
        let p = &self.palette;
        let water = &self.cfg.water;
        if y > terrain_height {
            return if water.enable && y <= water.sea_level {
                p.water
            } else {
                AIR
            };
        }
        let depth = terrain_height - y;
        if depth == 0 {
            return match biome {
                Biome::Plains if water.enable && terrain_height < water.sea_level => p.sand,
                Biome::Plains => p.grass,
                Biome::Desert => p.sand,
                Biome::Mountains => p.stone,
                Biome::Tundra => p.snow,
            };
        }
        if depth < 4 {
            return match biome {
                Biome::Desert => p.sand,
                Biome::Mountains => p.stone,
                _ => p.dirt,
            };
        }
        let ores = &self.cfg.ores;
        if depth >= ores.glow_min_depth && rng.f32() < ores.glow_chance {
            p.glow
        } else if rng.f32() < ores.coal_chance {
            p.coal
        } else {
            p.stone
        }
    }

    fn max_elevation(&self) -> i32 {
        let h = &self.cfg.height;
        let land = h.base + (h.amplitude + h.mountain_boost).ceil() as i32 + 1;
        if self.cfg.water.enable {
            land.max(self.cfg.water.sea_level)
        } else {
            land
        }
    }
}
