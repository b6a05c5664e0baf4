use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "lumen", about = "Streamed voxel world with chunk-graph lighting")]
pub struct Cli {
    /// World and pipeline settings (TOML)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
    /// Block table (TOML); the builtin table is used when omitted
    #[arg(long, global = true)]
    pub blocks: Option<PathBuf>,
    /// Default log filter when RUST_LOG is unset
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Generate, light and mesh a fixed box of chunks in one pass
    Pregen {
        /// Horizontal radius in chunks; overrides the config
        #[arg(long)]
        radius: Option<i32>,
        /// Vertical radius in chunks; overrides the config
        #[arg(long)]
        vertical_radius: Option<i32>,
        /// Center chunk as X Y Z
        #[arg(long, num_args = 3, value_names = ["X", "Y", "Z"], allow_hyphen_values = true)]
        center: Option<Vec<i32>>,
    },
    /// Walk a viewer through the world with the streaming pipeline
    Stream {
        /// Number of viewer moves
        #[arg(long, default_value_t = 8)]
        steps: u32,
        /// Chunks moved along +X per step
        #[arg(long, default_value_t = 1)]
        stride: i32,
        /// Place a torch above the viewer after every step
        #[arg(long)]
        torches: bool,
        /// Seconds to wait for the pipeline to settle after each move
        #[arg(long, default_value_t = 30)]
        settle_secs: u64,
    },
}
