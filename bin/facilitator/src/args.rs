//! Parses command-line arguments for the facilitator CLI.

use std::path::PathBuf;

use clap::{crate_version, Parser};

#[derive(Debug, Parser)]
#[clap(
    name = "facilitator",
    about = "Accepts stake requests of the staking bridge",
    version = crate_version!()
)]
pub(crate) struct Cli {
    #[clap(
        long,
        short = 'c',
        help = "The file containing the configuration for the facilitator",
        default_value = "config.toml"
    )]
    pub config: PathBuf,

    #[arg(
        required = true,
        help = "JSON files with the batches to ingest, one batch object or an array of them each"
    )]
    pub batches: Vec<PathBuf>,
}
