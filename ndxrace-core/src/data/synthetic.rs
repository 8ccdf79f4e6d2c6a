//! Deterministic offline provider.
//!
//! Produces a seeded random walk per ticker over weekdays, with a fixed
//! share count. Output depends only on the ticker and the requested range,
//! so repeated runs are byte-identical. Used for demos, benchmarks and
//! end-to-end tests; never mixed with real data in one run.

use super::provider::{validate_request, DataSource, FetchError, History, MarketDataClient, Observation};
use chrono::{Datelike, Duration, NaiveDate, Weekday};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

#[derive(Debug, Default, Clone)]
pub struct SyntheticProvider;

impl SyntheticProvider {
    pub fn new() -> Self {
        Self
    }
}

impl MarketDataClient for SyntheticProvider {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn fetch_history(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<History, FetchError> {
        validate_request(ticker, start, end)?;

        let seed: [u8; 32] = *blake3::hash(ticker.as_bytes()).as_bytes();
        let mut rng = StdRng::from_seed(seed);

        let shares: f64 = (rng.gen_range(500_000_000u64..16_000_000_000u64)) as f64;
        let mut price: f64 = rng.gen_range(20.0..500.0);
        let mut observations = Vec::new();
        let mut current = start;

        while current <= end {
            if matches!(current.weekday(), Weekday::Sat | Weekday::Sun) {
                current += Duration::days(1);
                continue;
            }
            let daily_return: f64 = rng.gen_range(-0.03..0.0305);
            price *= 1.0 + daily_return;
            observations.push(Observation::new(current, (price * 100.0).round() / 100.0, Some(shares)));
            current += Duration::days(1);
        }

        if observations.is_empty() {
            return Err(FetchError::unavailable(ticker, "no trading days in range"));
        }

        Ok(History {
            ticker: ticker.to_string(),
            observations,
            source: DataSource::Synthetic,
        })
    }

    fn is_available(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn skips_weekends() {
        // 2024-01-06/07 is a weekend
        let h = SyntheticProvider
            .fetch_history("AAPL", d("2024-01-04"), d("2024-01-09"))
            .unwrap();
        let dates: Vec<_> = h.observations.iter().map(|o| o.date).collect();
        assert_eq!(
            dates,
            vec![d("2024-01-04"), d("2024-01-05"), d("2024-01-08"), d("2024-01-09")]
        );
        assert_eq!(h.source, DataSource::Synthetic);
    }

    #[test]
    fn deterministic_per_ticker() {
        let a = SyntheticProvider.fetch_history("MSFT", d("2024-01-01"), d("2024-03-01")).unwrap();
        let b = SyntheticProvider.fetch_history("MSFT", d("2024-01-01"), d("2024-03-01")).unwrap();
        let c = SyntheticProvider.fetch_history("NVDA", d("2024-01-01"), d("2024-03-01")).unwrap();
        assert_eq!(a.observations, b.observations);
        assert_ne!(a.observations, c.observations);
    }

    #[test]
    fn weekend_only_range_is_unavailable() {
        let err = SyntheticProvider
            .fetch_history("AAPL", d("2024-01-06"), d("2024-01-07"))
            .unwrap_err();
        assert!(matches!(err, FetchError::DataUnavailable { .. }));
    }
}
