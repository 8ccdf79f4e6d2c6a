//! Carry-forward from the previous output for tickers that failed this run.

use ndxrace_core::data::align_to_axis;
use ndxrace_core::dataset::Dataset;
use std::path::Path;
use tracing::{debug, warn};

/// Read the existing output file, if any.
///
/// A missing file is normal on a first run. An unreadable or invalid file is
/// logged and ignored; it never blocks the new run.
pub fn load_previous(path: &Path) -> Option<Dataset> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!("no previous snapshot at {}", path.display());
            return None;
        }
        Err(e) => {
            warn!("cannot read previous snapshot {}: {e}", path.display());
            return None;
        }
    };
    match Dataset::from_json_slice(&bytes) {
        Ok(dataset) => Some(dataset),
        Err(e) => {
            warn!("ignoring previous snapshot {}: {e}", path.display());
            None
        }
    }
}

/// Fill each failed ticker's column from `previous`, on the dates of the new
/// axis that the previous snapshot also has. Dates outside the previous
/// snapshot stay null. Returns the tickers that received at least one value.
pub fn carry_forward<'a, I>(dataset: &mut Dataset, previous: &Dataset, failed: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut carried = Vec::new();
    for ticker in failed {
        let Some(old) = previous.series(ticker) else {
            continue;
        };
        let values = align_to_axis(&dataset.dates, &old);
        if values.iter().all(Option::is_none) {
            continue;
        }
        if let Some(company) = dataset.companies.get_mut(ticker) {
            company.market_cap = values;
            carried.push(ticker.to_string());
        }
    }
    carried
}
