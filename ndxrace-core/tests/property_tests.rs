//! Property tests for alignment and dataset invariants.
//!
//! Uses proptest to verify:
//! 1. The date axis is strictly ascending and covers every observed date
//! 2. Every aligned column has one entry per axis date
//! 3. Alignment never invents values: a column is `Some` only where the
//!    ticker reported that value
//! 4. Any aligned result forms a valid dataset

use chrono::{Duration, NaiveDate};
use ndxrace_core::data::align::{align_series, DailySeries};
use ndxrace_core::dataset::{CompanySeries, Dataset};
use proptest::prelude::*;
use std::collections::{BTreeMap, HashMap};

// ── Strategies (proptest) ────────────────────────────────────────────

fn base() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
}

/// A series over a random subset of 60 days, ascending, unique dates.
fn arb_series() -> impl Strategy<Value = DailySeries> {
    prop::collection::btree_map(0i64..60, prop::option::of(1.0e6..4.0e12_f64), 0..40).prop_map(
        |days| {
            days.into_iter()
                .map(|(offset, value)| (base() + Duration::days(offset), value.map(f64::round)))
                .collect()
        },
    )
}

fn arb_universe() -> impl Strategy<Value = BTreeMap<String, DailySeries>> {
    prop::collection::vec(arb_series(), 1..6).prop_map(|all| {
        all.into_iter()
            .enumerate()
            .map(|(i, s)| (format!("T{i}"), s))
            .collect()
    })
}

proptest! {
    #[test]
    fn axis_is_sorted_union(universe in arb_universe()) {
        let aligned = align_series(universe.clone());

        prop_assert!(aligned.dates.windows(2).all(|w| w[0] < w[1]));
        for series in universe.values() {
            for (date, _) in series {
                prop_assert!(aligned.dates.binary_search(date).is_ok());
            }
        }
    }

    #[test]
    fn columns_match_axis_and_never_invent_values(universe in arb_universe()) {
        let aligned = align_series(universe.clone());

        for (ticker, column) in &aligned.values {
            prop_assert_eq!(column.len(), aligned.dates.len());
            let reported: HashMap<NaiveDate, Option<f64>> =
                universe[ticker].iter().copied().collect();
            for (date, value) in aligned.dates.iter().zip(column) {
                match value {
                    Some(v) => prop_assert_eq!(reported.get(date).copied().flatten(), Some(*v)),
                    None => prop_assert!(reported.get(date).copied().flatten().is_none()),
                }
            }
        }
    }

    #[test]
    fn aligned_output_is_a_valid_dataset(universe in arb_universe()) {
        let aligned = align_series(universe);
        let dataset = Dataset {
            dates: aligned.dates,
            companies: aligned
                .values
                .into_iter()
                .map(|(ticker, market_cap)| {
                    let series = CompanySeries { name: ticker.clone(), sector: None, market_cap };
                    (ticker, series)
                })
                .collect(),
        };

        let bytes = dataset.to_json_bytes().unwrap();
        prop_assert_eq!(Dataset::from_json_slice(&bytes).unwrap(), dataset);
    }
}
