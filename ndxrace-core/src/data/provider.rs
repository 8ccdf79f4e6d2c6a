//! Market data client trait and structured error types.
//!
//! The MarketDataClient trait abstracts over data sources (Yahoo Finance,
//! synthetic data) so the assembler can be driven by fakes in tests.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// One trading day of history for a ticker, as reported by a provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub date: NaiveDate,
    /// Official daily close.
    pub close: f64,
    /// Shares outstanding on this day, when the provider knows it.
    pub shares_outstanding: Option<f64>,
    /// Market cap computed by the provider itself; takes precedence over
    /// `close * shares_outstanding` when present.
    pub market_cap: Option<f64>,
}

impl Observation {
    pub fn new(date: NaiveDate, close: f64, shares_outstanding: Option<f64>) -> Self {
        Self {
            date,
            close,
            shares_outstanding,
            market_cap: None,
        }
    }
}

/// Structured error types for market data fetches.
///
/// Only `Transient` is retried. Once a retry policy gives up, the last
/// transient error becomes `DataUnavailable`.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FetchError {
    #[error("transient provider error: {reason}")]
    Transient {
        reason: String,
        /// Server-requested wait (HTTP `Retry-After`).
        retry_after: Option<Duration>,
    },

    #[error("data unavailable for {ticker}: {reason}")]
    DataUnavailable { ticker: String, reason: String },

    #[error("hard stop: data provider has blocked requests (circuit breaker tripped)")]
    CircuitBreakerTripped,

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl FetchError {
    pub fn transient(reason: impl Into<String>) -> Self {
        FetchError::Transient {
            reason: reason.into(),
            retry_after: None,
        }
    }

    pub fn unavailable(ticker: &str, reason: impl Into<String>) -> Self {
        FetchError::DataUnavailable {
            ticker: ticker.to_string(),
            reason: reason.into(),
        }
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, FetchError::Transient { .. })
    }
}

/// Result of a successful fetch for a single ticker.
#[derive(Debug, Clone)]
pub struct History {
    pub ticker: String,
    /// Trading days only, ascending.
    pub observations: Vec<Observation>,
    pub source: DataSource,
}

/// Where the data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DataSource {
    YahooFinance,
    Synthetic,
    /// Carried over from the existing output file after a failed fetch.
    PreviousSnapshot,
}

impl DataSource {
    pub fn label(self) -> &'static str {
        match self {
            DataSource::YahooFinance => "yahoo finance",
            DataSource::Synthetic => "synthetic",
            DataSource::PreviousSnapshot => "previous snapshot",
        }
    }
}

/// Trait for market data clients.
///
/// Implementations own their retry behaviour: errors returned from
/// `fetch_history` are never `Transient`.
pub trait MarketDataClient: Send + Sync {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    /// Fetch daily history for a ticker over an inclusive date range.
    fn fetch_history(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<History, FetchError>;

    /// Check if the provider is currently available (not blocked).
    fn is_available(&self) -> bool;

    /// How long until a blocked provider accepts requests again.
    fn cooldown_remaining(&self) -> Option<Duration> {
        None
    }
}

/// Reject requests that can never succeed before any network call is made.
pub fn validate_request(ticker: &str, start: NaiveDate, end: NaiveDate) -> Result<(), FetchError> {
    if ticker.trim().is_empty() {
        return Err(FetchError::InvalidRequest("ticker must not be empty".into()));
    }
    if start > end {
        return Err(FetchError::InvalidRequest(format!(
            "start date {start} is after end date {end}"
        )));
    }
    Ok(())
}

/// Progress callback for multi-ticker fetches.
pub trait FetchProgress: Send + Sync {
    /// Called when starting to fetch a ticker.
    fn on_start(&self, ticker: &str, index: usize, total: usize);

    /// Called when a ticker fetch completes.
    fn on_complete(&self, ticker: &str, index: usize, total: usize, result: &Result<usize, FetchError>);

    /// Called when the entire batch is done.
    fn on_batch_complete(&self, succeeded: usize, failed: usize, total: usize);
}

/// Progress reporter that emits `tracing` events.
pub struct TracingProgress;

impl FetchProgress for TracingProgress {
    fn on_start(&self, ticker: &str, index: usize, total: usize) {
        tracing::debug!("[{}/{}] fetching {ticker}", index + 1, total);
    }

    fn on_complete(
        &self,
        ticker: &str,
        index: usize,
        total: usize,
        result: &Result<usize, FetchError>,
    ) {
        match result {
            Ok(days) => tracing::info!("[{}/{}] {ticker}: {days} trading days", index + 1, total),
            Err(e) => tracing::warn!("[{}/{}] {ticker} omitted: {e}", index + 1, total),
        }
    }

    fn on_batch_complete(&self, succeeded: usize, failed: usize, total: usize) {
        tracing::info!("fetch complete: {succeeded}/{total} succeeded, {failed} failed");
    }
}

/// Progress reporter that does nothing.
pub struct NoProgress;

impl FetchProgress for NoProgress {
    fn on_start(&self, _ticker: &str, _index: usize, _total: usize) {}

    fn on_complete(
        &self,
        _ticker: &str,
        _index: usize,
        _total: usize,
        _result: &Result<usize, FetchError>,
    ) {
    }

    fn on_batch_complete(&self, _succeeded: usize, _failed: usize, _total: usize) {}
}
