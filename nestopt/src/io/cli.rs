use std::path::PathBuf;

use clap::Parser;
use log::LevelFilter;

use crate::config::{Engine, NestConfig};

#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// JSON instance: pieces, sheets, same-type families and pairs
    #[arg(short, long, value_name = "FILE")]
    pub input_file: PathBuf,
    /// Receives the JSON solution and one SVG per used sheet
    #[arg(short, long, value_name = "FOLDER")]
    pub solution_folder: PathBuf,
    /// JSON configuration, every field is optional
    #[arg(short, long, value_name = "FILE")]
    pub config_file: Option<PathBuf>,
    /// Overrides the engine of the configuration
    #[arg(short, long, value_enum)]
    pub engine: Option<Engine>,
    /// Overrides the PRNG seed of the configuration
    #[arg(long)]
    pub seed: Option<u64>,
    /// Cancels the nesting after this many seconds, the partial result is still written
    #[arg(short, long, value_name = "SECONDS")]
    pub time_limit: Option<f64>,
    #[arg(
        short,
        long,
        value_name = "[off, error, warn, info, debug, trace]",
        default_value = "info"
    )]
    pub log_level: LevelFilter,
}

impl Cli {
    /// Applies the command line overrides on top of `config`
    pub fn apply_overrides(&self, mut config: NestConfig) -> NestConfig {
        if let Some(engine) = self.engine {
            config.engine = engine;
        }
        if let Some(seed) = self.seed {
            config.prng_seed = Some(seed);
        }
        config
    }
}
