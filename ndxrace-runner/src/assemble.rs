//! History assembly: fetch every constituent, compute daily market caps, and
//! align them on one date axis.
//!
//! Per-ticker failures never abort assembly. A failed ticker still gets a
//! column in the dataset (all null) and an entry in the report saying why.
//! With `concurrency > 1` fetches run on a bounded rayon pool; results are
//! collected in table order, so the output never depends on scheduling.

use crate::fill::forward_fill;
use chrono::NaiveDate;
use ndxrace_core::constituents::ConstituentTable;
use ndxrace_core::data::{
    align_series, DailySeries, DataSource, FetchError, FetchProgress, MarketDataClient,
    Observation,
};
use ndxrace_core::dataset::{CompanySeries, Dataset};
use rayon::prelude::*;
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum AssembleError {
    #[error("invalid date range: start {start} is after end {end}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },

    #[error("build fetch thread pool: {0}")]
    ThreadPool(String),
}

#[derive(Debug, Clone)]
pub struct AssembleOptions {
    pub start: NaiveDate,
    pub end: NaiveDate,
    /// Parallel fetches; 1 runs on the calling thread.
    pub concurrency: usize,
    /// Caps below this become null.
    pub min_market_cap: f64,
}

/// A ticker left out of this run's data, and why.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Omission {
    pub ticker: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default)]
pub struct AssemblyReport {
    /// Tickers with at least one observation in the window, in table order.
    pub succeeded: Vec<String>,
    /// Tickers that produced nothing, in table order.
    pub omitted: Vec<Omission>,
    /// Where each succeeded ticker's data came from.
    pub sources: BTreeMap<String, DataSource>,
}

#[derive(Debug, Clone)]
pub struct Assembly {
    pub dataset: Dataset,
    pub report: AssemblyReport,
}

/// Fetch every constituent and assemble the dataset.
pub fn build_dataset(
    client: &dyn MarketDataClient,
    table: &ConstituentTable,
    opts: &AssembleOptions,
    progress: &dyn FetchProgress,
) -> Result<Assembly, AssembleError> {
    if opts.start > opts.end {
        return Err(AssembleError::InvalidRange {
            start: opts.start,
            end: opts.end,
        });
    }

    let total = table.len();
    info!(
        "fetching {total} tickers from {} ({} to {}, concurrency {})",
        client.name(),
        opts.start,
        opts.end,
        opts.concurrency
    );

    let fetch = |index: usize, ticker: &str| {
        progress.on_start(ticker, index, total);
        let result = fetch_ticker(client, ticker, opts);
        let counted = result.as_ref().map(|(series, _)| series.len()).map_err(|e| e.clone());
        progress.on_complete(ticker, index, total, &counted);
        result
    };

    let results: Vec<Result<(DailySeries, DataSource), FetchError>> = if opts.concurrency <= 1 {
        table
            .iter()
            .enumerate()
            .map(|(i, c)| fetch(i, &c.ticker))
            .collect()
    } else {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(opts.concurrency)
            .thread_name(|i| format!("ndxrace-fetch-{i}"))
            .build()
            .map_err(|e| AssembleError::ThreadPool(e.to_string()))?;
        pool.install(|| {
            table
                .as_slice()
                .par_iter()
                .enumerate()
                .map(|(i, c)| fetch(i, &c.ticker))
                .collect()
        })
    };

    let mut report = AssemblyReport::default();
    let mut fetched: BTreeMap<String, DailySeries> = BTreeMap::new();
    let mut blocked = 0usize;
    for (constituent, result) in table.iter().zip(results) {
        match result {
            Ok((series, source)) => {
                report.succeeded.push(constituent.ticker.clone());
                report.sources.insert(constituent.ticker.clone(), source);
                fetched.insert(constituent.ticker.clone(), series);
            }
            Err(e) => {
                if matches!(e, FetchError::CircuitBreakerTripped) {
                    blocked += 1;
                }
                report.omitted.push(Omission {
                    ticker: constituent.ticker.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }
    progress.on_batch_complete(report.succeeded.len(), report.omitted.len(), total);
    if blocked > 0 {
        match client.cooldown_remaining() {
            Some(left) => warn!(
                "{blocked} tickers skipped by the circuit breaker; {} accepts requests again in {}s",
                client.name(),
                left.as_secs()
            ),
            None => warn!("{blocked} tickers skipped by the circuit breaker"),
        }
    }

    let mut aligned = align_series(fetched);
    let days = aligned.dates.len();
    debug!("date axis has {days} trading days");

    let companies = table
        .iter()
        .map(|c| {
            let market_cap = aligned
                .values
                .remove(&c.ticker)
                .unwrap_or_else(|| vec![None; days]);
            let series = CompanySeries {
                name: c.name.clone(),
                sector: c.sector.clone(),
                market_cap,
            };
            (c.ticker.clone(), series)
        })
        .collect();

    Ok(Assembly {
        dataset: Dataset {
            dates: aligned.dates,
            companies,
        },
        report,
    })
}

/// Fetch one ticker and turn its history into a market-cap series clipped
/// to the window. An empty result counts as unavailable.
fn fetch_ticker(
    client: &dyn MarketDataClient,
    ticker: &str,
    opts: &AssembleOptions,
) -> Result<(DailySeries, DataSource), FetchError> {
    if !client.is_available() {
        return Err(FetchError::CircuitBreakerTripped);
    }
    let history = client.fetch_history(ticker, opts.start, opts.end)?;
    let series = market_cap_series(&history.observations, opts.start, opts.end, opts.min_market_cap);
    if series.is_empty() {
        return Err(FetchError::unavailable(ticker, "no trading days in range"));
    }
    Ok((series, history.source))
}

/// Daily market caps for one ticker.
///
/// Shares are forward-filled across the whole history before the window is
/// applied, so a count reported before `start` still covers the first days.
/// A provider-supplied cap wins over `close * shares`. Values are rounded to
/// whole currency units; non-finite values or values below `min_market_cap`
/// become null.
pub fn market_cap_series(
    observations: &[Observation],
    start: NaiveDate,
    end: NaiveDate,
    min_market_cap: f64,
) -> DailySeries {
    let mut sorted: Vec<&Observation> = observations.iter().collect();
    sorted.sort_by_key(|o| o.date);
    sorted.dedup_by_key(|o| o.date);

    let shares: Vec<Option<f64>> = sorted.iter().map(|o| o.shares_outstanding).collect();
    let shares = forward_fill(&shares);

    sorted
        .iter()
        .zip(shares)
        .filter(|(o, _)| o.date >= start && o.date <= end)
        .map(|(o, shares)| {
            let cap = o
                .market_cap
                .or_else(|| shares.map(|s| o.close * s))
                .map(f64::round)
                .filter(|v| v.is_finite() && *v >= min_market_cap);
            (o.date, cap)
        })
        .collect()
}
