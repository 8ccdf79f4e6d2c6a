//! Multi-ticker time alignment.
//!
//! Given a daily series per ticker, build one ascending date axis from the
//! union of all observed dates and project every series onto it. Dates a
//! ticker did not report become `None`, never zero.

use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// A single ticker's daily values before alignment, ascending by date.
pub type DailySeries = Vec<(NaiveDate, Option<f64>)>;

/// Values for several tickers on a common timeline.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedSeries {
    /// The common date axis (strictly ascending).
    pub dates: Vec<NaiveDate>,
    /// Each inner Vec has the same length as `dates`.
    pub values: BTreeMap<String, Vec<Option<f64>>>,
}

/// Union of all dates across the given series, sorted and de-duplicated.
pub fn date_axis<'a, I>(series: I) -> Vec<NaiveDate>
where
    I: IntoIterator<Item = &'a DailySeries>,
{
    let mut all_dates = BTreeSet::new();
    for points in series {
        all_dates.extend(points.iter().map(|(date, _)| *date));
    }
    all_dates.into_iter().collect()
}

/// Project one series onto `axis`. Points off the axis are dropped; if a
/// date appears twice the first value wins.
pub fn align_to_axis(axis: &[NaiveDate], points: &[(NaiveDate, Option<f64>)]) -> Vec<Option<f64>> {
    let mut by_date: HashMap<NaiveDate, Option<f64>> = HashMap::with_capacity(points.len());
    for (date, value) in points {
        by_date.entry(*date).or_insert(*value);
    }
    axis.iter()
        .map(|date| by_date.get(date).copied().flatten())
        .collect()
}

/// Align every series to the union of their dates.
pub fn align_series(series: BTreeMap<String, DailySeries>) -> AlignedSeries {
    let dates = date_axis(series.values());
    let values = series
        .iter()
        .map(|(ticker, points)| (ticker.clone(), align_to_axis(&dates, points)))
        .collect();
    AlignedSeries { dates, values }
}
