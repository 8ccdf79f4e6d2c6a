//! Run configuration.
//!
//! Layers, lowest first: built-in defaults, an optional TOML file, then
//! command-line overrides applied by the binary. Every field is optional in
//! the file.
//!
//! ```toml
//! output = "data/nasdaq_data.json"
//! years = 5
//! concurrency = 4
//! share_source = "history"
//! stale_fallback = "previous_snapshot"
//!
//! [retry]
//! max_attempts = 5
//! base_delay_ms = 1000
//!
//! [breaker]
//! failure_threshold = 12
//! cooldown_secs = 1800
//! ```

use chrono::{Months, NaiveDate};
use ndxrace_core::constituents::{Constituent, ConstituentError, ConstituentTable};
use ndxrace_core::data::{BreakerConfig, RetryPolicy, ShareSource};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Config file picked up from the working directory when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "ndxrace.toml";

pub const DEFAULT_OUTPUT: &str = "data/nasdaq_data.json";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("parse config file {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("invalid config: {0}")]
    Invalid(String),

    #[error(transparent)]
    Constituents(#[from] ConstituentError),
}

/// What to do with tickers whose fetch failed this run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StaleFallback {
    /// Emit the ticker as all-null.
    #[default]
    None,
    /// Reuse the ticker's values from the existing output file.
    PreviousSnapshot,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunConfig {
    /// Destination of the dataset JSON.
    pub output: PathBuf,

    /// First date of the window (inclusive). Derived from `years` when unset.
    pub start: Option<NaiveDate>,

    /// Last date of the window (inclusive). Today when unset.
    pub end: Option<NaiveDate>,

    /// Years of history ending at `end`, used when `start` is unset.
    pub years: u32,

    /// Parallel ticker fetches. 1 runs sequentially.
    pub concurrency: usize,

    pub retry: RetryPolicy,

    pub breaker: BreakerConfig,

    pub share_source: ShareSource,

    pub stale_fallback: StaleFallback,

    /// Fail the run instead of writing a dataset with no trading days when
    /// every ticker failed.
    pub refuse_empty: bool,

    /// Market caps below this are treated as bad data and emitted as null.
    pub min_market_cap: f64,

    /// TOML or CSV constituents file; takes precedence over `constituents`.
    pub constituents_file: Option<PathBuf>,

    /// Inline `[[constituents]]` table. The built-in Nasdaq-100 table is used
    /// when this and `constituents_file` are both empty.
    pub constituents: Vec<Constituent>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            output: PathBuf::from(DEFAULT_OUTPUT),
            start: None,
            end: None,
            years: 5,
            concurrency: 1,
            retry: RetryPolicy::default(),
            breaker: BreakerConfig::default(),
            share_source: ShareSource::default(),
            stale_fallback: StaleFallback::default(),
            refuse_empty: false,
            min_market_cap: 1_000_000.0,
            constituents_file: None,
            constituents: Vec::new(),
        }
    }
}

impl RunConfig {
    /// Parse a config from a TOML string. Missing fields take their defaults.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse {
            path: PathBuf::from("<inline>"),
            message: e.to_string(),
        })
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Load the explicit file if given, else `ndxrace.toml` in the working
    /// directory if it exists, else the defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        match explicit {
            Some(path) => Self::from_file(path),
            None => {
                let implicit = Path::new(DEFAULT_CONFIG_FILE);
                if implicit.is_file() {
                    tracing::debug!("using config file {}", implicit.display());
                    Self::from_file(implicit)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.concurrency == 0 {
            return Err(ConfigError::Invalid("concurrency must be at least 1".into()));
        }
        if self.start.is_none() && self.years == 0 {
            return Err(ConfigError::Invalid(
                "years must be at least 1 when no start date is set".into(),
            ));
        }
        if let (Some(start), Some(end)) = (self.start, self.end) {
            if start > end {
                return Err(ConfigError::Invalid(format!(
                    "start date {start} is after end date {end}"
                )));
            }
        }
        if !self.min_market_cap.is_finite() || self.min_market_cap < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "min_market_cap must be a non-negative number, got {}",
                self.min_market_cap
            )));
        }
        if self.output.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("output path must not be empty".into()));
        }
        self.retry.validate().map_err(ConfigError::Invalid)?;
        self.breaker
            .validate(self.retry.max_attempts)
            .map_err(ConfigError::Invalid)
    }

    /// Resolve the inclusive fetch window against `today`.
    pub fn date_range(&self, today: NaiveDate) -> Result<(NaiveDate, NaiveDate), ConfigError> {
        let end = self.end.unwrap_or(today);
        let start = match self.start {
            Some(start) => start,
            None => end
                .checked_sub_months(Months::new(self.years.saturating_mul(12)))
                .ok_or_else(|| ConfigError::Invalid(format!("{} years before {end}", self.years)))?,
        };
        if start > end {
            return Err(ConfigError::Invalid(format!(
                "start date {start} is after end date {end}"
            )));
        }
        Ok((start, end))
    }

    /// The constituent table this config selects.
    pub fn constituent_table(&self) -> Result<ConstituentTable, ConfigError> {
        if let Some(path) = &self.constituents_file {
            return Ok(ConstituentTable::from_file(path)?);
        }
        if !self.constituents.is_empty() {
            return Ok(ConstituentTable::new(self.constituents.clone())?);
        }
        Ok(ConstituentTable::nasdaq100())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn empty_file_yields_defaults() {
        let config = RunConfig::from_toml("").unwrap();
        assert_eq!(config, RunConfig::default());
        assert_eq!(config.output, PathBuf::from("data/nasdaq_data.json"));
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.breaker.failure_threshold, 10);
        assert!(!config.refuse_empty);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_file_overrides_only_given_fields() {
        let config = RunConfig::from_toml(
            r#"
            output = "out.json"
            concurrency = 4
            share_source = "history"
            stale_fallback = "previous_snapshot"

            [retry]
            max_attempts = 5
            "#,
        )
        .unwrap();
        assert_eq!(config.output, PathBuf::from("out.json"));
        assert_eq!(config.concurrency, 4);
        assert_eq!(config.share_source, ShareSource::History);
        assert_eq!(config.stale_fallback, StaleFallback::PreviousSnapshot);
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.retry.base_delay_ms, 500);
        assert_eq!(config.years, 5);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = RunConfig::from_toml("ouptut = \"x.json\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn default_window_is_five_years_to_today() {
        let (start, end) = RunConfig::default().date_range(d("2024-06-14")).unwrap();
        assert_eq!(start, d("2019-06-14"));
        assert_eq!(end, d("2024-06-14"));
    }

    #[test]
    fn explicit_dates_win_over_years() {
        let config = RunConfig {
            start: Some(d("2024-01-01")),
            end: Some(d("2024-01-03")),
            years: 10,
            ..RunConfig::default()
        };
        assert_eq!(
            config.date_range(d("2030-01-01")).unwrap(),
            (d("2024-01-01"), d("2024-01-03"))
        );
    }

    #[test]
    fn future_start_against_today_is_rejected() {
        let config = RunConfig {
            start: Some(d("2025-01-01")),
            ..RunConfig::default()
        };
        assert!(config.validate().is_ok());
        assert!(config.date_range(d("2024-06-14")).is_err());
    }

    #[test]
    fn invalid_values_are_rejected() {
        let zero_workers = RunConfig {
            concurrency: 0,
            ..RunConfig::default()
        };
        assert!(zero_workers.validate().is_err());

        let mut no_attempts = RunConfig::default();
        no_attempts.retry.max_attempts = 0;
        assert!(no_attempts.validate().is_err());

        let mut bad_jitter = RunConfig::default();
        bad_jitter.retry.jitter = 1.5;
        assert!(bad_jitter.validate().is_err());

        let inverted = RunConfig {
            start: Some(d("2024-02-01")),
            end: Some(d("2024-01-01")),
            ..RunConfig::default()
        };
        assert!(inverted.validate().is_err());
    }

    #[test]
    fn breaker_threshold_must_exceed_retry_attempts() {
        let config = RunConfig::from_toml(
            r#"
            [retry]
            max_attempts = 3

            [breaker]
            failure_threshold = 3
            "#,
        )
        .unwrap();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut raised = RunConfig::default();
        raised.retry.max_attempts = 10;
        assert!(raised.validate().is_err());
        raised.breaker.failure_threshold = 11;
        assert!(raised.validate().is_ok());
    }

    #[test]
    fn inline_constituents_replace_builtin_table() {
        let config = RunConfig::from_toml(
            r#"
            [[constituents]]
            ticker = "AAPL"
            name = "Apple Inc."
            "#,
        )
        .unwrap();
        assert_eq!(config.constituent_table().unwrap().tickers(), vec!["AAPL"]);
        assert!(RunConfig::default().constituent_table().unwrap().len() >= 100);
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let err = RunConfig::load(Some(Path::new("/nonexistent/ndxrace.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
