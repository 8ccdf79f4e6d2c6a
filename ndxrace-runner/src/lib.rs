//! ndxrace runner: turns a constituent table into the market-cap dataset
//! file.
//!
//! This crate builds on `ndxrace-core` to provide:
//! - Layered run configuration
//! - History assembly with bounded parallel fetching
//! - The forward-fill policy for share counts
//! - Carry-forward from the previous snapshot for failed tickers
//! - The atomic dataset writer
//! - The end-to-end pipeline and its run summary

pub mod assemble;
pub mod config;
pub mod fill;
pub mod pipeline;
pub mod snapshot;
pub mod writer;

pub use assemble::{
    build_dataset, market_cap_series, AssembleError, AssembleOptions, Assembly, AssemblyReport,
    Omission,
};
pub use config::{ConfigError, RunConfig, StaleFallback, DEFAULT_CONFIG_FILE, DEFAULT_OUTPUT};
pub use fill::forward_fill;
pub use pipeline::{run, RunError, RunSummary};
pub use snapshot::{carry_forward, load_previous};
pub use writer::{temp_path, write_dataset, WriteError, WriteOutcome};
