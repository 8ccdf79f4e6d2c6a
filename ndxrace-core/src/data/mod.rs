//! Market data fetching and alignment

pub mod align;
pub mod circuit_breaker;
pub mod provider;
pub mod retry;
pub mod synthetic;
pub mod yahoo;

pub use align::{align_series, align_to_axis, date_axis, AlignedSeries, DailySeries};
pub use circuit_breaker::{BreakerConfig, CircuitBreaker};
pub use provider::{
    validate_request, DataSource, FetchError, FetchProgress, History, MarketDataClient,
    NoProgress, Observation, TracingProgress,
};
pub use retry::RetryPolicy;
pub use synthetic::SyntheticProvider;
pub use yahoo::{ShareSource, YahooProvider};
