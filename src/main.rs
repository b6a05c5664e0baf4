mod app;
mod cli;

use std::error::Error;
use std::time::Duration;

use clap::Parser;

use crate::app::AppConfig;
use crate::cli::{Cli, Command};

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&cli.log_level))
        .format_timestamp_millis()
        .init();

    let cfg = AppConfig::load(cli.config.as_deref())?;
    let reg = app::load_registry(cli.blocks.as_deref())?;
    match cli.command {
        Command::Pregen {
            radius,
            vertical_radius,
            center,
        } => app::run_pregen(cfg, reg, radius, vertical_radius, center),
        Command::Stream {
            steps,
            stride,
            torches,
            settle_secs,
        } => app::run_stream(
            cfg,
            reg,
            steps,
            stride,
            torches,
            Duration::from_secs(settle_secs),
        ),
    }
}
