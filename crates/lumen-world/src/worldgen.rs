use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use lumen_blocks::BlockRegistry;
use serde::Deserialize;
use thiserror::Error;

use crate::noise_terrain::NoiseTerrain;
use crate::terrain::{FlatTerrain, TerrainGenerator};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Clone, Debug, Deserialize)]
pub struct WorldGenConfig {
    #[serde(default = "default_seed")]
    pub seed: u64,
    #[serde(default = "default_mode")]
    pub mode: WorldGenMode,
    #[serde(default)]
    pub flat: Flat,
    #[serde(default)]
    pub height: Height,
    #[serde(default)]
    pub biomes: Biomes,
    #[serde(default)]
    pub water: Water,
    #[serde(default)]
    pub ores: Ores,
}

impl Default for WorldGenConfig {
    fn default() -> Self {
        Self {
            seed: default_seed(),
            mode: default_mode(),
            flat: Flat::default(),
            height: Height::default(),
            biomes: Biomes::default(),
            water: Water::default(),
            ores: Ores::default(),
        }
    }
}

impl WorldGenConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let s = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&s)
    }

    /// Builds the terrain collaborator for this config, resolving block names in `reg`.
    pub fn build_terrain(&self, reg: &BlockRegistry) -> Arc<dyn TerrainGenerator> {
        match self.mode {
            WorldGenMode::Normal => Arc::new(NoiseTerrain::new(self, reg)),
            WorldGenMode::Flat => {
                let surface = reg.id_by_name(&self.flat.surface).unwrap_or_else(|| {
                    log::warn!("flat surface block '{}' not found; using stone", self.flat.surface);
                    reg.id_by_name("stone").unwrap_or(1)
                });
                let filler = reg.id_by_name("stone").unwrap_or(surface);
                Arc::new(FlatTerrain::new(self.flat.height, surface, filler))
            }
        }
    }
}

#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum WorldGenMode {
    Normal,
    Flat,
}

fn default_mode() -> WorldGenMode {
    WorldGenMode::Normal
}

fn default_seed() -> u64 {
    1337
}

#[derive(Clone, Debug, Deserialize)]
pub struct Flat {
    #[serde(default = "default_flat_height")]
    pub height: i32,
    #[serde(default = "default_flat_surface")]
    pub surface: String,
}
fn default_flat_height() -> i32 {
    8
}
fn default_flat_surface() -> String {
    "grass".into()
}
impl Default for Flat {
    fn default() -> Self {
        Self {
            height: default_flat_height(),
            surface: default_flat_surface(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct Height {
    #[serde(default = "default_height_base")]
    pub base: i32,
    #[serde(default = "default_height_amplitude")]
    pub amplitude: f32,
    #[serde(default = "default_height_freq")]
    pub frequency: f32,
    #[serde(default = "default_mountain_boost")]
    pub mountain_boost: f32,
}
fn default_height_base() -> i32 {
    24
}
fn default_height_amplitude() -> f32 {
    10.0
}
fn default_height_freq() -> f32 {
    0.01
}
fn default_mountain_boost() -> f32 {
    18.0
}
impl Default for Height {
    fn default() -> Self {
        Self {
            base: default_height_base(),
            amplitude: default_height_amplitude(),
            frequency: default_height_freq(),
            mountain_boost: default_mountain_boost(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct Biomes {
    #[serde(default = "default_temp_freq")]
    pub temp_frequency: f32,
    #[serde(default = "default_moisture_freq")]
    pub moisture_frequency: f32,
    #[serde(default = "default_tundra_below")]
    pub tundra_below: f32,
    #[serde(default = "default_desert_above")]
    pub desert_above: f32,
    #[serde(default = "default_mountain_above")]
    pub mountain_above: f32,
}
fn default_temp_freq() -> f32 {
    0.004
}
fn default_moisture_freq() -> f32 {
    0.005
}
fn default_tundra_below() -> f32 {
    0.25
}
fn default_desert_above() -> f32 {
    0.7
}
fn default_mountain_above() -> f32 {
    0.65
}
impl Default for Biomes {
    fn default() -> Self {
        Self {
            temp_frequency: default_temp_freq(),
            moisture_frequency: default_moisture_freq(),
            tundra_below: default_tundra_below(),
            desert_above: default_desert_above(),
            mountain_above: default_mountain_above(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct Water {
    #[serde(default = "default_water_enable")]
    pub enable: bool,
    #[serde(default = "default_sea_level")]
    pub sea_level: i32,
}
fn default_water_enable() -> bool {
    true
}
fn default_sea_level() -> i32 {
    20
}
impl Default for Water {
    fn default() -> Self {
        Self {
            enable: default_water_enable(),
            sea_level: default_sea_level(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct Ores {
    #[serde(default = "default_coal_chance")]
    pub coal_chance: f32,
    /// Chance per deep stone voxel of a light-emitting crystal.
    #[serde(default = "default_glow_chance")]
    pub glow_chance: f32,
    #[serde(default = "default_glow_depth")]
    pub glow_min_depth: i32,
}
fn default_coal_chance() -> f32 {
    0.01
}
fn default_glow_chance() -> f32 {
    0.0015
}
fn default_glow_depth() -> i32 {
    12
}
impl Default for Ores {
    fn default() -> Self {
        Self {
            coal_chance: default_coal_chance(),
            glow_chance: default_glow_chance(),
            glow_min_depth: default_glow_depth(),
        }
    }
}
