use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "xe-gasmap", version, about = "129Xe gas-exchange mapping pipeline")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Process one subject.
    Run(RunArgs),
    /// Process many subjects, one config file each.
    Batch(BatchArgs),
    /// Load and validate a config without running.
    Validate(ValidateArgs),
}

#[derive(Debug, Args)]
pub struct RunArgs {
    #[arg(long, help = "Subject config JSON")]
    pub config: PathBuf,

    #[arg(long, default_value_t = false, help = "Resume from the snapshot artifact")]
    pub force_reprocess: bool,

    #[arg(long, default_value_t = false, help = "Re-run segmentation in reprocess mode")]
    pub force_segmentation: bool,

    #[arg(long, default_value_t = false, help = "Re-resolve calibration in reprocess mode")]
    pub force_calibration: bool,
}

#[derive(Debug, Args)]
pub struct BatchArgs {
    #[arg(long, num_args = 1.., help = "Subject config JSONs (repeatable)")]
    pub config: Vec<PathBuf>,
}

#[derive(Debug, Args)]
pub struct ValidateArgs {
    #[arg(long, help = "Subject config JSON")]
    pub config: PathBuf,
}
