use std::fs;
use std::path::Path;
use std::thread;

use serde::Deserialize;

/// Worker counts and streaming radii. A worker count of `0` means "pick from the CPU count".
#[derive(Clone, Debug, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub gen_workers: usize,
    #[serde(default = "default_small_stage")]
    pub link_workers: usize,
    #[serde(default = "default_small_stage")]
    pub seed_workers: usize,
    #[serde(default)]
    pub mesh_workers: usize,
    /// Horizontal load radius in chunks.
    #[serde(default = "default_radius")]
    pub radius: i32,
    #[serde(default = "default_vertical_radius")]
    pub vertical_radius: i32,
    /// Extra chunks kept beyond the radius before unloading.
    #[serde(default = "default_unload_margin")]
    pub unload_margin: i32,
    #[serde(default = "default_column_cache")]
    pub column_cache: usize,
}

fn default_small_stage() -> usize {
    1
}
fn default_radius() -> i32 {
    4
}
fn default_vertical_radius() -> i32 {
    2
}
fn default_unload_margin() -> i32 {
    1
}
fn default_column_cache() -> usize {
    1024
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            gen_workers: 0,
            link_workers: default_small_stage(),
            seed_workers: default_small_stage(),
            mesh_workers: 0,
            radius: default_radius(),
            vertical_radius: default_vertical_radius(),
            unload_margin: default_unload_margin(),
            column_cache: default_column_cache(),
        }
    }
}

impl PipelineConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(s)
    }

    pub fn load_from_path(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let s = fs::read_to_string(path)?;
        Ok(Self::from_toml_str(&s)?)
    }

    /// Generation and meshing share the machine; each gets half the cores when unset.
    pub fn resolved_workers(&self) -> (usize, usize, usize, usize) {
        let cores = thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4);
        let half = (cores / 2).max(1);
        let pick = |n: usize| if n == 0 { half } else { n };
        (
            pick(self.gen_workers),
            self.link_workers.max(1),
            self.seed_workers.max(1),
            pick(self.mesh_workers),
        )
    }
}
