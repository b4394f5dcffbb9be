use anyhow::Result;
use clap::Args;
use std::path::PathBuf;

use crate::loader::DatasetSource;
use crate::paginate::DEFAULT_PER_PAGE;
use crate::store::{MemoryStorage, SqliteStorage, Storage};

pub const DEFAULT_DATASET: &str = "data/all_jobs.json.gz";

/// Options shared by every subcommand. Flags win over environment variables.
#[derive(Args, Debug, Clone)]
pub struct GlobalOptions {
    /// Dataset path or http(s) URL (JSON, optionally gzip-compressed)
    #[arg(long, global = true, env = "JOBBOARD_DATASET", default_value = DEFAULT_DATASET)]
    pub dataset: String,

    /// Application-status database (default: XDG data dir)
    #[arg(long, global = true, env = "JOBBOARD_DB")]
    pub db: Option<PathBuf>,

    /// Keep application status in memory only; nothing is persisted
    #[arg(long, global = true)]
    pub ephemeral: bool,

    /// Rows per page
    #[arg(long, global = true, env = "JOBBOARD_PER_PAGE", default_value_t = DEFAULT_PER_PAGE)]
    pub per_page: usize,

    /// Debug-level logging (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub dataset: DatasetSource,
    pub db_path: PathBuf,
    pub ephemeral: bool,
    pub per_page: usize,
    pub verbose: bool,
}

impl Config {
    pub fn from_options(opts: &GlobalOptions) -> Self {
        Self {
            dataset: DatasetSource::parse(&opts.dataset),
            db_path: opts.db.clone().unwrap_or_else(SqliteStorage::default_path),
            ephemeral: opts.ephemeral,
            per_page: if opts.per_page == 0 {
                DEFAULT_PER_PAGE
            } else {
                opts.per_page
            },
            verbose: opts.verbose,
        }
    }

    pub fn open_storage(&self) -> Result<Box<dyn Storage>> {
        if self.ephemeral {
            tracing::info!("using in-memory status storage");
            return Ok(Box::new(MemoryStorage::default()));
        }
        let storage = SqliteStorage::open(&self.db_path)?;
        tracing::debug!(path = %storage.path().display(), "status database opened");
        Ok(Box::new(storage))
    }

    /// Log file used while the terminal browser owns the screen.
    pub fn browse_log_path(&self) -> PathBuf {
        self.db_path.with_file_name("jobboard.log")
    }
}
