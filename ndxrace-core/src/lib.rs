//! ndxrace core: domain types for the Nasdaq-100 market-cap dataset.
//!
//! - Constituent tables (built-in, file-based, or scraped)
//! - The `MarketDataClient` capability with Yahoo Finance and synthetic providers
//! - Retry policy and circuit breaker for provider calls
//! - Multi-ticker date alignment
//! - The output `Dataset` and its JSON schema

pub mod constituents;
pub mod data;
pub mod dataset;

pub use constituents::{Constituent, ConstituentError, ConstituentTable};
pub use dataset::{CompanySeries, Dataset, DatasetError};
