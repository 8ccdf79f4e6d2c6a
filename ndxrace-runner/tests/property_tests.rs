//! Property tests for the share-count fill policy and market-cap series.

use chrono::{Duration, NaiveDate};
use ndxrace_core::data::Observation;
use ndxrace_runner::{forward_fill, market_cap_series};
use proptest::prelude::*;

fn arb_gappy() -> impl Strategy<Value = Vec<Option<f64>>> {
    prop::collection::vec(prop::option::of(1.0..1.0e10_f64), 0..80)
}

proptest! {
    /// Present values are kept; gaps take the most recent earlier value;
    /// leading gaps stay empty.
    #[test]
    fn forward_fill_policy(values in arb_gappy()) {
        let filled = forward_fill(&values);
        prop_assert_eq!(filled.len(), values.len());

        let first_known = values.iter().position(Option::is_some);
        for (i, (orig, out)) in values.iter().zip(&filled).enumerate() {
            match (orig, first_known) {
                (Some(v), _) => prop_assert_eq!(*out, Some(*v)),
                (None, Some(first)) if i > first => {
                    let last = values[..i].iter().rev().find_map(|v| *v);
                    prop_assert_eq!(*out, last);
                }
                (None, _) => prop_assert!(out.is_none()),
            }
        }
    }

    /// Market caps stay inside the window, ascending, and never negative.
    #[test]
    fn market_caps_respect_window(
        closes in prop::collection::vec((0.01..2000.0_f64, prop::option::of(1.0e6..2.0e10_f64)), 1..120),
        window_start in 0i64..60,
        window_len in 0i64..60,
    ) {
        let base = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let observations: Vec<Observation> = closes
            .iter()
            .enumerate()
            .map(|(i, (close, shares))| Observation::new(base + Duration::days(i as i64), *close, *shares))
            .collect();
        let start = base + Duration::days(window_start);
        let end = start + Duration::days(window_len);

        let series = market_cap_series(&observations, start, end, 0.0);

        prop_assert!(series.windows(2).all(|w| w[0].0 < w[1].0));
        for (date, cap) in &series {
            prop_assert!(*date >= start && *date <= end);
            if let Some(cap) = cap {
                prop_assert!(*cap >= 0.0 && cap.fract() == 0.0);
            }
        }
    }
}
