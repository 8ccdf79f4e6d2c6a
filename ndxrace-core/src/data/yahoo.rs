//! Yahoo Finance market data provider.
//!
//! Daily closes come from the v8 chart API. Shares outstanding come either
//! from quoteSummary (the current count, applied to every day against the
//! split-adjusted close) or from the fundamentals-timeseries API (dated
//! counts, applied against the raw close and forward-filled downstream).
//!
//! Yahoo Finance has no official API and is subject to unannounced format
//! changes; every parse failure is reported as `DataUnavailable` for the
//! ticker rather than aborting the run.

use super::circuit_breaker::CircuitBreaker;
use super::provider::{
    validate_request, DataSource, FetchError, History, MarketDataClient, Observation,
};
use super::retry::RetryPolicy;
use chrono::{DateTime, Duration as ChronoDuration, NaiveDate, Utc};
use reqwest::blocking::{Client, Response};
use reqwest::header::{self, HeaderValue};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, trace, warn};

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

/// How far before the requested start to look for share-count reports, so
/// the first trading days already have a value to carry forward.
const SHARE_LOOKBACK_DAYS: i64 = 400;

/// Where shares outstanding come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShareSource {
    /// Today's share count applied to the whole split-adjusted history.
    #[default]
    Current,
    /// Dated share counts from company filings.
    History,
}

// ── Response models ─────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub(crate) struct ChartResponse {
    chart: ChartEnvelope,
}

#[derive(Debug, Deserialize)]
struct ChartEnvelope {
    result: Option<Vec<ChartData>>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChartMeta {
    #[serde(default)]
    gmtoffset: i64,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    meta: Option<ChartMeta>,
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<QuoteData>,
    adjclose: Option<Vec<AdjCloseData>>,
}

#[derive(Debug, Deserialize)]
struct QuoteData {
    #[serde(default)]
    close: Vec<Option<f64>>,
}

#[derive(Debug, Deserialize)]
struct AdjCloseData {
    adjclose: Vec<Option<f64>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TimeseriesResponse {
    timeseries: TimeseriesEnvelope,
}

#[derive(Debug, Deserialize)]
struct TimeseriesEnvelope {
    result: Option<Vec<TimeseriesData>>,
}

#[derive(Debug, Deserialize)]
struct TimeseriesData {
    timestamp: Option<Vec<i64>>,
    shares_out: Option<Vec<Option<f64>>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct QuoteSummaryResponse {
    quote_summary: QuoteSummaryEnvelope,
}

#[derive(Debug, Deserialize)]
struct QuoteSummaryEnvelope {
    result: Option<Vec<QuoteSummaryResult>>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuoteSummaryResult {
    default_key_statistics: Option<KeyStatistics>,
    price: Option<PriceModule>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct KeyStatistics {
    shares_outstanding: Option<RawValue>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PriceModule {
    market_cap: Option<RawValue>,
    regular_market_price: Option<RawValue>,
}

#[derive(Debug, Deserialize)]
struct RawValue {
    raw: Option<f64>,
}

/// One parsed chart row. `timestamp` is kept to pick the official bar when
/// Yahoo appends a live bar for a date it already reported.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ChartBar {
    pub date: NaiveDate,
    pub timestamp: i64,
    pub close: f64,
    pub adj_close: Option<f64>,
}

// ── Provider ────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
struct Crumb {
    cookie: String,
    crumb: String,
}

/// Yahoo Finance data provider.
pub struct YahooProvider {
    client: Client,
    circuit_breaker: Arc<CircuitBreaker>,
    retry: RetryPolicy,
    share_source: ShareSource,
    crumb: Mutex<Option<Crumb>>,
}

impl YahooProvider {
    pub fn new(
        circuit_breaker: Arc<CircuitBreaker>,
        retry: RetryPolicy,
        share_source: ShareSource,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            circuit_breaker,
            retry,
            share_source,
            crumb: Mutex::new(None),
        })
    }

    fn chart_url(ticker: &str, start: NaiveDate, end: NaiveDate) -> String {
        let (start_ts, end_ts) = unix_range(start, end);
        format!(
            "https://query2.finance.yahoo.com/v8/finance/chart/{ticker}\
             ?period1={start_ts}&period2={end_ts}&interval=1d\
             &includeAdjustedClose=true"
        )
    }

    fn timeseries_url(ticker: &str, start: NaiveDate, end: NaiveDate) -> String {
        let (start_ts, end_ts) = unix_range(start, end);
        format!(
            "https://query1.finance.yahoo.com/ws/fundamentals-timeseries/v1/finance/timeseries/{ticker}\
             ?symbol={ticker}&period1={start_ts}&period2={end_ts}"
        )
    }

    fn quote_summary_url(ticker: &str, crumb: &str) -> String {
        format!(
            "https://query1.finance.yahoo.com/v10/finance/quoteSummary/{ticker}\
             ?modules=defaultKeyStatistics,price&crumb={crumb}"
        )
    }

    /// Send one GET and classify the HTTP outcome. Only successful
    /// responses are returned.
    fn send(&self, ticker: &str, url: &str, cookie: Option<&str>) -> Result<Response, FetchError> {
        if !self.circuit_breaker.is_allowed() {
            return Err(FetchError::CircuitBreakerTripped);
        }

        trace!("GET {url}");
        let mut request = self.client.get(url);
        if let Some(cookie) = cookie {
            request = request.header(header::COOKIE, cookie);
        }

        let resp = match request.send() {
            Ok(resp) => resp,
            Err(e) if e.is_timeout() || e.is_connect() => {
                self.circuit_breaker.record_failure();
                return Err(FetchError::transient(format!("network: {e}")));
            }
            Err(e) => return Err(FetchError::unavailable(ticker, format!("request failed: {e}"))),
        };

        let status = resp.status();
        if status.is_success() {
            self.circuit_breaker.record_success();
            return Ok(resp);
        }
        Err(self.reject(ticker, status, resp.headers().get(header::RETRY_AFTER)))
    }

    /// Error for a non-success response. A 401 also drops the cached crumb
    /// so the next attempt fetches a fresh one.
    fn reject(&self, ticker: &str, status: StatusCode, retry_after: Option<&HeaderValue>) -> FetchError {
        if status == StatusCode::UNAUTHORIZED {
            self.clear_crumb();
        }
        classify_status(ticker, status, retry_after, &self.circuit_breaker)
    }

    fn fetch_chart(&self, ticker: &str, start: NaiveDate, end: NaiveDate) -> Result<Vec<ChartBar>, FetchError> {
        let url = Self::chart_url(ticker, start, end);
        self.retry.run(ticker, |attempt| {
            debug!("{ticker}: chart request, attempt {attempt}");
            let resp = self.send(ticker, &url, None)?;
            let chart: ChartResponse = resp.json().map_err(|e| {
                FetchError::unavailable(ticker, format!("response format changed: {e}"))
            })?;
            parse_chart(ticker, chart)
        })
    }

    fn fetch_share_history(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<(NaiveDate, f64)>, FetchError> {
        let url = Self::timeseries_url(ticker, start, end);
        self.retry.run(ticker, |attempt| {
            debug!("{ticker}: share history request, attempt {attempt}");
            let resp = self.send(ticker, &url, None)?;
            let series: TimeseriesResponse = resp.json().map_err(|e| {
                FetchError::unavailable(ticker, format!("response format changed: {e}"))
            })?;
            parse_share_history(ticker, series)
        })
    }

    fn fetch_current_shares(&self, ticker: &str) -> Result<f64, FetchError> {
        self.retry.run(ticker, |attempt| {
            debug!("{ticker}: quote summary request, attempt {attempt}");
            let crumb = self.ensure_crumb(ticker)?;
            let url = Self::quote_summary_url(ticker, &crumb.crumb);
            let resp = self.send(ticker, &url, Some(&crumb.cookie))?;
            let summary: QuoteSummaryResponse = resp.json().map_err(|e| {
                FetchError::unavailable(ticker, format!("response format changed: {e}"))
            })?;
            parse_current_shares(ticker, summary)
        })
    }

    /// Cached cookie + crumb pair required by quoteSummary.
    fn ensure_crumb(&self, ticker: &str) -> Result<Crumb, FetchError> {
        if let Some(crumb) = self.crumb_slot().as_ref() {
            return Ok(crumb.clone());
        }

        // fc.yahoo.com answers 404 but still sets the session cookie
        let resp = self
            .client
            .get("https://fc.yahoo.com")
            .send()
            .map_err(|e| FetchError::transient(format!("cookie request failed: {e}")))?;
        let cookie = resp
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|h| h.to_str().ok())
            .and_then(|s| s.split_once(';').map(|(v, _)| v.to_string()))
            .ok_or_else(|| FetchError::unavailable(ticker, "failed to obtain Yahoo cookie"))?;

        let resp = self.send(
            ticker,
            "https://query1.finance.yahoo.com/v1/test/getcrumb",
            Some(&cookie),
        )?;
        let crumb = resp
            .text()
            .map_err(|e| FetchError::transient(format!("failed to read crumb: {e}")))?;
        if crumb.trim().is_empty() {
            return Err(FetchError::unavailable(ticker, "empty Yahoo crumb"));
        }

        let crumb = Crumb {
            cookie,
            crumb: crumb.trim().to_string(),
        };
        *self.crumb_slot() = Some(crumb.clone());
        Ok(crumb)
    }

    fn clear_crumb(&self) {
        *self.crumb_slot() = None;
    }

    fn crumb_slot(&self) -> std::sync::MutexGuard<'_, Option<Crumb>> {
        self.crumb.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl MarketDataClient for YahooProvider {
    fn name(&self) -> &str {
        "yahoo_finance"
    }

    fn fetch_history(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<History, FetchError> {
        validate_request(ticker, start, end)?;
        let bars = self.fetch_chart(ticker, start, end)?;

        let observations = match self.share_source {
            ShareSource::Current => {
                let shares = self.fetch_current_shares(ticker)?;
                observations_with_current_shares(&bars, shares)
            }
            ShareSource::History => {
                let lookback = start - ChronoDuration::days(SHARE_LOOKBACK_DAYS);
                match self.fetch_share_history(ticker, lookback, end) {
                    Ok(reports) if !reports.is_empty() => {
                        observations_with_share_reports(&bars, &reports)
                    }
                    Ok(_) | Err(FetchError::DataUnavailable { .. }) => {
                        warn!("{ticker}: no dated share counts, using the current count");
                        let shares = self.fetch_current_shares(ticker)?;
                        observations_with_current_shares(&bars, shares)
                    }
                    Err(e) => return Err(e),
                }
            }
        };

        Ok(History {
            ticker: ticker.to_string(),
            observations,
            source: DataSource::YahooFinance,
        })
    }

    fn is_available(&self) -> bool {
        self.circuit_breaker.is_allowed()
    }

    fn cooldown_remaining(&self) -> Option<Duration> {
        let left = self.circuit_breaker.remaining_cooldown();
        (!left.is_zero()).then_some(left)
    }
}

/// Map a non-success HTTP status to a fetch error, feeding the breaker.
///
/// 403 means Yahoo has blocked us and trips the breaker outright. 429 and
/// 5xx count toward its failure streak and are retried; 404 and any other
/// client error are final for the ticker.
pub(crate) fn classify_status(
    ticker: &str,
    status: StatusCode,
    retry_after: Option<&HeaderValue>,
    breaker: &CircuitBreaker,
) -> FetchError {
    match status {
        StatusCode::FORBIDDEN => {
            breaker.trip();
            FetchError::CircuitBreakerTripped
        }
        StatusCode::TOO_MANY_REQUESTS => {
            breaker.record_failure();
            let retry_after = retry_after
                .and_then(|v| v.to_str().ok())
                .and_then(|v| parse_retry_after(v, Utc::now()));
            FetchError::Transient {
                reason: "rate limited (HTTP 429)".into(),
                retry_after,
            }
        }
        StatusCode::UNAUTHORIZED => FetchError::transient("authentication expired (HTTP 401)"),
        StatusCode::NOT_FOUND => FetchError::unavailable(ticker, "symbol not found"),
        s if s.is_server_error() => {
            breaker.record_failure();
            FetchError::transient(format!("HTTP {s}"))
        }
        s => FetchError::unavailable(ticker, format!("HTTP {s}")),
    }
}

/// Retry-After is either delay-seconds or an HTTP-date. A date already in
/// the past means retry now.
fn parse_retry_after(value: &str, now: DateTime<Utc>) -> Option<Duration> {
    let value = value.trim();
    if let Ok(secs) = value.parse::<u64>() {
        return Some(Duration::from_secs(secs));
    }
    let at = DateTime::parse_from_rfc2822(value).ok()?;
    Some(
        at.with_timezone(&Utc)
            .signed_duration_since(now)
            .to_std()
            .unwrap_or(Duration::ZERO),
    )
}

// ── Parsing ─────────────────────────────────────────────────────────

fn unix_range(start: NaiveDate, end: NaiveDate) -> (i64, i64) {
    let start_ts = start.and_time(chrono::NaiveTime::MIN).and_utc().timestamp();
    // period2 is exclusive; cover the whole end day
    let end_ts = (end + ChronoDuration::days(1))
        .and_time(chrono::NaiveTime::MIN)
        .and_utc()
        .timestamp();
    (start_ts, end_ts)
}

/// Parse the chart API response into one bar per exchange-local date.
pub(crate) fn parse_chart(ticker: &str, resp: ChartResponse) -> Result<Vec<ChartBar>, FetchError> {
    let result = match (resp.chart.result, resp.chart.error) {
        (Some(result), _) => result,
        (None, Some(err)) if err.code == "Not Found" => {
            return Err(FetchError::unavailable(ticker, "symbol not found"))
        }
        (None, Some(err)) => {
            return Err(FetchError::unavailable(
                ticker,
                format!("{}: {}", err.code, err.description),
            ))
        }
        (None, None) => return Err(FetchError::unavailable(ticker, "empty chart result")),
    };

    let data = result
        .into_iter()
        .next()
        .ok_or_else(|| FetchError::unavailable(ticker, "chart result array is empty"))?;
    let gmtoffset = data.meta.map(|m| m.gmtoffset).unwrap_or(0);
    let timestamps = data
        .timestamp
        .ok_or_else(|| FetchError::unavailable(ticker, "no price history in range"))?;
    let quote = data
        .indicators
        .quote
        .into_iter()
        .next()
        .ok_or_else(|| FetchError::unavailable(ticker, "no quote data"))?;
    let adj_closes = data
        .indicators
        .adjclose
        .and_then(|v| v.into_iter().next())
        .map(|a| a.adjclose);

    let mut by_date: BTreeMap<NaiveDate, ChartBar> = BTreeMap::new();
    for (i, &ts) in timestamps.iter().enumerate() {
        // holidays and halted days come back with null prices
        let Some(close) = quote.close.get(i).copied().flatten() else {
            continue;
        };
        if !close.is_finite() || close < 0.0 {
            continue;
        }
        let date = DateTime::from_timestamp(ts + gmtoffset, 0)
            .map(|dt| dt.date_naive())
            .ok_or_else(|| FetchError::unavailable(ticker, format!("invalid timestamp: {ts}")))?;
        let adj_close = adj_closes
            .as_ref()
            .and_then(|v| v.get(i).copied().flatten())
            .filter(|v| v.is_finite() && *v >= 0.0);

        let bar = ChartBar {
            date,
            timestamp: ts,
            close,
            adj_close,
        };
        match by_date.get(&date) {
            Some(existing) if existing.timestamp <= ts => {
                trace!("{ticker}: dropping later duplicate bar for {date}");
            }
            _ => {
                by_date.insert(date, bar);
            }
        }
    }

    if by_date.is_empty() {
        return Err(FetchError::unavailable(ticker, "no price history in range"));
    }
    Ok(by_date.into_values().collect())
}

/// Parse dated share counts, ascending, dropping empty entries.
pub(crate) fn parse_share_history(
    ticker: &str,
    resp: TimeseriesResponse,
) -> Result<Vec<(NaiveDate, f64)>, FetchError> {
    let data = resp
        .timeseries
        .result
        .and_then(|r| r.into_iter().next())
        .ok_or_else(|| FetchError::unavailable(ticker, "no share count series"))?;
    let (Some(timestamps), Some(shares)) = (data.timestamp, data.shares_out) else {
        return Ok(Vec::new());
    };

    let mut reports: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for (ts, count) in timestamps.iter().zip(shares) {
        let Some(count) = count.filter(|c| c.is_finite() && *c > 0.0) else {
            continue;
        };
        if let Some(dt) = DateTime::from_timestamp(*ts, 0) {
            // several filings on one day: the last reported wins
            reports.insert(dt.date_naive(), count);
        }
    }
    Ok(reports.into_iter().collect())
}

pub(crate) fn parse_current_shares(ticker: &str, resp: QuoteSummaryResponse) -> Result<f64, FetchError> {
    let result = match (resp.quote_summary.result, resp.quote_summary.error) {
        (Some(result), _) => result.into_iter().next(),
        (None, Some(err)) => {
            return Err(FetchError::unavailable(
                ticker,
                format!("{}: {}", err.code, err.description),
            ))
        }
        (None, None) => None,
    }
    .ok_or_else(|| FetchError::unavailable(ticker, "empty quote summary"))?;

    let direct = result
        .default_key_statistics
        .and_then(|k| k.shares_outstanding)
        .and_then(|v| v.raw)
        .filter(|v| v.is_finite() && *v > 0.0);
    if let Some(shares) = direct {
        return Ok(shares);
    }

    // some listings only expose market cap and price
    let derived = result.price.and_then(|p| {
        let cap = p.market_cap.and_then(|v| v.raw)?;
        let price = p.regular_market_price.and_then(|v| v.raw)?;
        (price > 0.0).then(|| cap / price)
    });
    derived
        .filter(|v| v.is_finite() && *v > 0.0)
        .ok_or_else(|| FetchError::unavailable(ticker, "shares outstanding not reported"))
}

fn observations_with_current_shares(bars: &[ChartBar], shares: f64) -> Vec<Observation> {
    bars.iter()
        .map(|bar| Observation::new(bar.date, bar.adj_close.unwrap_or(bar.close), Some(shares)))
        .collect()
}

/// Attach each share report to the first trading day on or after it.
fn observations_with_share_reports(bars: &[ChartBar], reports: &[(NaiveDate, f64)]) -> Vec<Observation> {
    let mut next = 0;
    bars.iter()
        .map(|bar| {
            let mut shares = None;
            while next < reports.len() && reports[next].0 <= bar.date {
                shares = Some(reports[next].1);
                next += 1;
            }
            Observation::new(bar.date, bar.close, shares)
        })
        .collect()
}
