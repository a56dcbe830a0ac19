#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/carhart/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod cache;
pub mod dropped;
pub mod error;
pub mod frame;
pub mod period;
pub mod returns;
pub mod series;
pub mod stats;
pub mod store;
pub mod types;

pub use cache::{Cache, CacheKey, CacheStats, CsvSeriesCache, MemoryCache, SqliteCache};
pub use dropped::{DroppedSymbol, FailureKind, Stage};
pub use error::{DataError, Result};
pub use frame::{AlignedSeries, align_series, series_frame};
pub use period::{Period, ReportingPeriod};
pub use returns::{ClosePrice, ReturnRow, calculate_cumulative_returns};
pub use series::{FactorKey, FactorKind, FactorSeries};
pub use store::{CsvStore, InMemoryStore, TimeSeriesStore};
pub use types::{
    AccountEntry, FinancialSnapshot, MarketCapPoint, PricePoint, PriceSeries, RatePoint,
};

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
