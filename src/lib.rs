#![allow(clippy::collapsible_if)]
#![allow(clippy::type_complexity)]

// Core modules
pub mod cache;
pub mod config;
pub mod data;
pub mod diagnostics;
pub mod domain;
pub mod engine;
pub mod utils;

#[cfg(not(target_arch = "wasm32"))]
mod cli;

// Re-export commonly used types outside of crate
pub use cache::{CacheKey, KeyValueStore, MemoryStore, SeriesCache, StoreError};
pub use config::{CacheSettings, PERSISTENCE};
pub use data::{RawPayload, normalize, normalize_payload, synthesize};
pub use domain::{Candle, CanonicalSeries, DatasetType, ParamBag, Point, Series, SeriesKind};
pub use engine::{CacheCoordinator, LoadState, LoadStatus, PendingLoad};

#[cfg(not(target_arch = "wasm32"))]
pub use {cache::FileStore, cli::run_cli};

// CLI argument parsing
use {
    clap::{Parser, Subcommand},
    std::path::PathBuf,
};

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Directory of the file-backed cache store
    #[arg(long)]
    pub store_dir: Option<PathBuf>,

    /// Byte budget of the store; writes beyond it trigger quota recovery
    #[arg(long)]
    pub capacity_bytes: Option<u64>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Entry count, size and age per dataset
    Stats,
    /// Remove expired, unreadable and outdated entries
    Purge,
    /// Remove every entry of one dataset
    Clear { dataset: DatasetType },
    /// Remove every entry the cache owns
    ClearAll,
    /// Run a raw payload file through the normalizer and print the canonical series
    Normalize {
        path: PathBuf,
        /// Record kind of a bare JSON array (detected from the first record otherwise)
        #[arg(long)]
        kind: Option<SeriesKind>,
    },
}
