//! ndxrace CLI: build the Nasdaq-100 market-cap dataset for the bar-chart race.
//!
//! One command, no required arguments. Settings come from built-in defaults,
//! then `ndxrace.toml` (or `--config`), then the flags below.
//!
//! Exits 0 when the dataset was written or was already up to date. Any fatal
//! error exits non-zero and leaves the previous file untouched.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, ValueEnum};
use ndxrace_core::constituents::wikipedia::{fetch_constituents, NASDAQ_100_URL};
use ndxrace_core::constituents::ConstituentTable;
use ndxrace_core::data::{
    CircuitBreaker, MarketDataClient, ShareSource, SyntheticProvider, TracingProgress,
    YahooProvider,
};
use ndxrace_runner::{run, RunConfig, StaleFallback};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, subscriber, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Debug, Parser)]
#[command(
    name = "ndxrace",
    version,
    about = "Fetch daily Nasdaq-100 market caps and write the bar-chart race dataset"
)]
struct Cli {
    /// TOML config file. Defaults to ./ndxrace.toml when present.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output JSON path. Defaults to data/nasdaq_data.json.
    #[arg(long, short)]
    output: Option<PathBuf>,

    /// First date (YYYY-MM-DD). Defaults to --years before the end date.
    #[arg(long)]
    start: Option<NaiveDate>,

    /// Last date (YYYY-MM-DD). Defaults to today.
    #[arg(long)]
    end: Option<NaiveDate>,

    /// Years of history when --start is not given.
    #[arg(long)]
    years: Option<u32>,

    /// Constituents file (.toml with [[constituents]] or .csv with ticker,name[,sector]).
    #[arg(long)]
    constituents: Option<PathBuf>,

    /// Scrape the current member list from Wikipedia, falling back to the
    /// configured table if that fails.
    #[arg(long, default_value_t = false)]
    refresh_constituents: bool,

    /// Parallel ticker fetches.
    #[arg(long)]
    concurrency: Option<usize>,

    /// Total attempts per request, including the first.
    #[arg(long)]
    max_attempts: Option<u32>,

    /// Consecutive transient failures, across tickers, that stop all fetching.
    #[arg(long)]
    breaker_threshold: Option<u32>,

    /// Where shares outstanding come from.
    #[arg(long, value_enum)]
    share_source: Option<ShareSourceArg>,

    /// What to do with tickers that fail this run.
    #[arg(long, value_enum)]
    stale_fallback: Option<StaleFallbackArg>,

    /// Exit non-zero instead of writing an empty dataset when every ticker fails.
    #[arg(long, default_value_t = false)]
    refuse_empty: bool,

    /// Use the deterministic offline provider instead of Yahoo Finance.
    #[arg(long, default_value_t = false)]
    synthetic: bool,

    /// Sets the level of tracing.
    #[arg(long, value_enum, ignore_case = true, default_value_t = LogLevel::INFO)]
    log_level: LogLevel,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ShareSourceArg {
    /// Today's share count over the adjusted close.
    Current,
    /// Dated share counts from filings over the raw close.
    History,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum StaleFallbackArg {
    /// Failed tickers are all-null.
    None,
    /// Failed tickers keep their values from the existing output.
    PreviousSnapshot,
}

#[allow(clippy::upper_case_acronyms)]
#[derive(Debug, Clone, Copy, ValueEnum)]
#[clap(rename_all = "UPPERCASE")]
enum LogLevel {
    ERROR,
    WARN,
    INFO,
    DEBUG,
    TRACE,
}

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::ERROR => Level::ERROR,
            LogLevel::WARN => Level::WARN,
            LogLevel::INFO => Level::INFO,
            LogLevel::DEBUG => Level::DEBUG,
            LogLevel::TRACE => Level::TRACE,
        }
    }
}

fn init_logging(level: LogLevel) -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::from(level))
        .with_target(false)
        .finish();
    subscriber::set_global_default(subscriber).context("install tracing subscriber")
}

/// Apply command-line overrides on top of the file layer.
fn apply_overrides(config: &mut RunConfig, cli: &Cli) {
    if let Some(output) = &cli.output {
        config.output = output.clone();
    }
    if cli.start.is_some() {
        config.start = cli.start;
    }
    if cli.end.is_some() {
        config.end = cli.end;
    }
    if let Some(years) = cli.years {
        config.years = years;
    }
    if let Some(path) = &cli.constituents {
        config.constituents_file = Some(path.clone());
    }
    if let Some(concurrency) = cli.concurrency {
        config.concurrency = concurrency;
    }
    if let Some(max_attempts) = cli.max_attempts {
        config.retry.max_attempts = max_attempts;
    }
    if let Some(threshold) = cli.breaker_threshold {
        config.breaker.failure_threshold = threshold;
    }
    if cli.refuse_empty {
        config.refuse_empty = true;
    }
    if let Some(source) = cli.share_source {
        config.share_source = match source {
            ShareSourceArg::Current => ShareSource::Current,
            ShareSourceArg::History => ShareSource::History,
        };
    }
    if let Some(fallback) = cli.stale_fallback {
        config.stale_fallback = match fallback {
            StaleFallbackArg::None => StaleFallback::None,
            StaleFallbackArg::PreviousSnapshot => StaleFallback::PreviousSnapshot,
        };
    }
}

fn constituent_table(config: &RunConfig, refresh: bool) -> Result<ConstituentTable> {
    let configured = config.constituent_table().context("load constituent table")?;
    if !refresh {
        return Ok(configured);
    }
    match fetch_constituents(NASDAQ_100_URL) {
        Ok(table) => {
            info!("refreshed constituents from Wikipedia: {} tickers", table.len());
            Ok(table)
        }
        Err(e) => {
            warn!("could not refresh constituents ({e}); using the configured table");
            Ok(configured)
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_level)?;
    debug!("command line: {cli:?}");

    let mut config = RunConfig::load(cli.config.as_deref())?;
    apply_overrides(&mut config, &cli);
    config.validate()?;

    let table = constituent_table(&config, cli.refresh_constituents)?;
    info!("{} constituents, writing {}", table.len(), config.output.display());

    let client: Box<dyn MarketDataClient> = if cli.synthetic {
        warn!("using synthetic data; the output is not real market data");
        Box::new(SyntheticProvider::new())
    } else {
        let breaker = Arc::new(CircuitBreaker::from_config(&config.breaker));
        Box::new(
            YahooProvider::new(breaker, config.retry.clone(), config.share_source)
                .context("build HTTP client")?,
        )
    };

    let today = chrono::Local::now().date_naive();
    let summary = run(&config, &table, client.as_ref(), &TracingProgress, today)?;
    summary.log();

    Ok(())
}
