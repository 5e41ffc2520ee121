use clap::Parser;
use std::path::PathBuf;

use crate::database::DEFAULT_DB_PATH;
use crate::excel::InferenceMode;
use crate::sync::SyncOptions;

/// Watch an Excel workbook and mirror its tables into SQLite
#[derive(Parser, Debug)]
#[command(name = "excel-sync")]
#[command(author, version, about, long_about = None)]
#[command(after_help = "Run without FILE to be prompted for the workbook. Log verbosity follows RUST_LOG.")]
pub struct Cli {
    /// Workbook to synchronize and watch
    pub file: Option<PathBuf>,

    /// SQLite database file, created if absent
    #[arg(long, default_value = DEFAULT_DB_PATH)]
    pub db: PathBuf,

    /// Type each column from its first data row only
    #[arg(long)]
    pub single_sample: bool,

    /// Print one JSON report per synchronization pass
    #[arg(long)]
    pub json: bool,

    /// Synchronize once and exit without watching
    #[arg(long)]
    pub once: bool,
}

impl Cli {
    pub fn sync_options(&self) -> SyncOptions {
        SyncOptions {
            inference: if self.single_sample {
                InferenceMode::SingleSample
            } else {
                InferenceMode::Widening
            },
        }
    }
}
