//! The bar-chart race dataset and its JSON schema.
//!
//! ```json
//! {
//!   "dates": ["2024-01-02", "2024-01-03"],
//!   "companies": {
//!     "AAPL": { "name": "Apple Inc.", "marketCap": [2.9e12, null] }
//!   }
//! }
//! ```
//!
//! Companies serialize in ticker order so identical data always produces
//! identical bytes.

use crate::data::align::DailySeries;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("dates are not strictly ascending at index {index}: {previous} then {next}")]
    UnsortedDates {
        index: usize,
        previous: NaiveDate,
        next: NaiveDate,
    },

    #[error("{ticker}: marketCap has {actual} values but there are {expected} dates")]
    LengthMismatch {
        ticker: String,
        expected: usize,
        actual: usize,
    },

    #[error("{ticker}: invalid market cap {value} on {date}")]
    InvalidValue {
        ticker: String,
        date: NaiveDate,
        value: f64,
    },

    #[error("dataset JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// One company's series in the output file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanySeries {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sector: Option<String>,
    /// Same length and order as [`Dataset::dates`].
    #[serde(rename = "marketCap")]
    pub market_cap: Vec<Option<f64>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub dates: Vec<NaiveDate>,
    pub companies: BTreeMap<String, CompanySeries>,
}

impl Dataset {
    /// Check the structural invariants: strictly ascending dates, one value
    /// per date for every company, and non-negative finite values.
    pub fn validate(&self) -> Result<(), DatasetError> {
        for (i, pair) in self.dates.windows(2).enumerate() {
            if pair[0] >= pair[1] {
                return Err(DatasetError::UnsortedDates {
                    index: i + 1,
                    previous: pair[0],
                    next: pair[1],
                });
            }
        }

        for (ticker, company) in &self.companies {
            if company.market_cap.len() != self.dates.len() {
                return Err(DatasetError::LengthMismatch {
                    ticker: ticker.clone(),
                    expected: self.dates.len(),
                    actual: company.market_cap.len(),
                });
            }
            for (date, value) in self.dates.iter().zip(&company.market_cap) {
                if let Some(v) = value {
                    if !v.is_finite() || *v < 0.0 {
                        return Err(DatasetError::InvalidValue {
                            ticker: ticker.clone(),
                            date: *date,
                            value: *v,
                        });
                    }
                }
            }
        }

        Ok(())
    }

    /// Serialize to the on-disk form (compact JSON plus a trailing newline).
    /// Fails without producing output if the invariants do not hold.
    pub fn to_json_bytes(&self) -> Result<Vec<u8>, DatasetError> {
        self.validate()?;
        let mut bytes = serde_json::to_vec(self)?;
        bytes.push(b'\n');
        Ok(bytes)
    }

    /// Parse and validate a previously written dataset.
    pub fn from_json_slice(bytes: &[u8]) -> Result<Self, DatasetError> {
        let dataset: Dataset = serde_json::from_slice(bytes)?;
        dataset.validate()?;
        Ok(dataset)
    }

    /// A company's values paired with their dates, nulls included.
    pub fn series(&self, ticker: &str) -> Option<DailySeries> {
        self.companies.get(ticker).map(|company| {
            self.dates
                .iter()
                .copied()
                .zip(company.market_cap.iter().copied())
                .collect()
        })
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.dates.first().copied()
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.dates.last().copied()
    }
}
