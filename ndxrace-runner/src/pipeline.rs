//! One end-to-end run: fetch, assemble, optional carry-forward, write.
//!
//! Per-ticker problems are recorded in the [`RunSummary`]. Only config and
//! output-stage errors fail the run, before the existing output is touched.
//! When every ticker fails the run still writes a dataset with no dates,
//! unless `refuse_empty` is set.

use crate::assemble::{build_dataset, AssembleError, AssembleOptions, Omission};
use crate::config::{ConfigError, RunConfig, StaleFallback};
use crate::snapshot::{carry_forward, load_previous};
use crate::writer::{write_dataset, WriteError};
use chrono::NaiveDate;
use ndxrace_core::constituents::ConstituentTable;
use ndxrace_core::data::{DataSource, FetchProgress, MarketDataClient};
use std::collections::BTreeMap;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{error, info, warn};

#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Assemble(#[from] AssembleError),

    #[error("no data for any of the {attempted} tickers; refusing to write an empty dataset")]
    EmptyDataset { attempted: usize },

    #[error(transparent)]
    Write(#[from] WriteError),
}

/// What a run did, for logging and for callers that want to act on it.
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// Name of the market data provider.
    pub provider: String,
    pub succeeded: Vec<String>,
    pub omitted: Vec<Omission>,
    /// Omitted tickers whose values came from the previous snapshot.
    pub carried_forward: Vec<String>,
    /// Source of every ticker that has data in the output.
    pub sources: BTreeMap<String, DataSource>,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
    pub trading_days: usize,
    pub output: PathBuf,
    pub bytes: usize,
    pub hash: String,
    pub changed: bool,
}

impl RunSummary {
    pub fn log(&self) {
        info!(
            "provider {}: {} succeeded, {} omitted, {} carried forward",
            self.provider,
            self.succeeded.len(),
            self.omitted.len(),
            self.carried_forward.len()
        );
        let mut by_source: BTreeMap<DataSource, usize> = BTreeMap::new();
        for source in self.sources.values() {
            *by_source.entry(*source).or_default() += 1;
        }
        for (source, count) in by_source {
            info!("  {count} tickers from {}", source.label());
        }
        for omission in &self.omitted {
            let carried = self.carried_forward.contains(&omission.ticker);
            if carried {
                warn!("  {} omitted ({}), previous values kept", omission.ticker, omission.reason);
            } else {
                warn!("  {} omitted: {}", omission.ticker, omission.reason);
            }
        }
        match (self.first_date, self.last_date) {
            (Some(first), Some(last)) => {
                info!("dates {first} to {last} ({} trading days)", self.trading_days)
            }
            _ => warn!("dataset has no trading days"),
        }
        info!(
            "{} {} ({} bytes, blake3 {})",
            self.output.display(),
            if self.changed { "updated" } else { "unchanged" },
            self.bytes,
            self.hash
        );
    }
}

/// Run the whole pipeline against `client`. `today` anchors a window that
/// has no explicit end date.
pub fn run(
    config: &RunConfig,
    table: &ConstituentTable,
    client: &dyn MarketDataClient,
    progress: &dyn FetchProgress,
    today: NaiveDate,
) -> Result<RunSummary, RunError> {
    config.validate()?;
    let (start, end) = config.date_range(today)?;

    let opts = AssembleOptions {
        start,
        end,
        concurrency: config.concurrency,
        min_market_cap: config.min_market_cap,
    };
    let mut assembly = build_dataset(client, table, &opts, progress)?;

    if assembly.dataset.dates.is_empty() {
        if config.refuse_empty {
            error!("every ticker failed; leaving {} untouched", config.output.display());
            return Err(RunError::EmptyDataset {
                attempted: table.len(),
            });
        }
        warn!("every ticker failed; writing a dataset with no trading days");
    }

    let mut carried = Vec::new();
    if config.stale_fallback == StaleFallback::PreviousSnapshot && !assembly.report.omitted.is_empty() {
        if let Some(previous) = load_previous(&config.output) {
            let failed = assembly.report.omitted.iter().map(|o| o.ticker.as_str());
            carried = carry_forward(&mut assembly.dataset, &previous, failed);
            if !carried.is_empty() {
                info!("carried forward {} tickers from the previous snapshot", carried.len());
            }
        }
    }
    let mut sources = assembly.report.sources;
    for ticker in &carried {
        sources.insert(ticker.clone(), DataSource::PreviousSnapshot);
    }

    let written = write_dataset(&assembly.dataset, &config.output)?;

    Ok(RunSummary {
        provider: client.name().to_string(),
        succeeded: assembly.report.succeeded,
        omitted: assembly.report.omitted,
        carried_forward: carried,
        sources,
        first_date: assembly.dataset.first_date(),
        last_date: assembly.dataset.last_date(),
        trading_days: assembly.dataset.dates.len(),
        output: written.path,
        bytes: written.bytes,
        hash: written.hash,
        changed: written.changed,
    })
}
