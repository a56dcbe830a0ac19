//! Read access to prices, statements, rates and market capitalization.
//!
//! Every lookup is keyed by symbol and [`ReportingPeriod`]. A missing key is
//! [`DataError::NotFound`](crate::DataError::NotFound), which callers treat as
//! "skip and continue".

mod csv_store;
mod memory;
mod parse;

pub use self::csv_store::CsvStore;
pub use self::memory::InMemoryStore;

pub(crate) use self::parse::parse_date;

use crate::error::{DataError, Result};
use crate::period::ReportingPeriod;
use crate::types::{FinancialSnapshot, MarketCapPoint, PriceSeries, RatePoint};
use tracing::debug;

/// Source of the time series the engine consumes.
///
/// Implementations are read-only and shared across worker threads.
pub trait TimeSeriesStore: Send + Sync {
    /// Daily prices of a security, or of an index when no security matches.
    fn get_price_series(&self, symbol: &str, period: ReportingPeriod) -> Result<PriceSeries>;

    /// Daily prices of a market index.
    fn get_index_series(&self, name: &str, period: ReportingPeriod) -> Result<PriceSeries>;

    /// Financial statement reported for the period.
    fn get_financial_snapshot(
        &self,
        symbol: &str,
        period: ReportingPeriod,
    ) -> Result<FinancialSnapshot>;

    /// Daily risk-free proxy (annualized yield in percent).
    fn get_risk_free_series(&self, period: ReportingPeriod) -> Result<Vec<RatePoint>>;

    /// Daily market capitalization of a security.
    fn get_market_cap_series(
        &self,
        symbol: &str,
        period: ReportingPeriod,
    ) -> Result<Vec<MarketCapPoint>>;

    /// Securities available in the store, sorted.
    fn securities(&self) -> Result<Vec<String>>;

    /// Indices available in the store, sorted.
    fn indices(&self) -> Result<Vec<String>>;

    /// Concatenated prices over `from..=to`.
    ///
    /// Quarters without data are skipped; the result is `NotFound` only when
    /// every quarter is missing.
    fn get_price_history(
        &self,
        symbol: &str,
        from: ReportingPeriod,
        to: ReportingPeriod,
    ) -> Result<PriceSeries> {
        let mut history = PriceSeries::new(symbol, Vec::new());
        let mut period = from;
        while period <= to {
            match self.get_price_series(symbol, period) {
                Ok(series) => history.extend(&series),
                Err(e) if e.is_not_found() => {
                    debug!(symbol, %period, "no prices for quarter");
                }
                Err(e) => return Err(e),
            }
            period = period.next();
        }

        if history.is_empty() {
            return Err(DataError::not_found(format!(
                "prices for {} between {} and {}",
                symbol, from, to
            )));
        }
        Ok(history)
    }
}

impl<S: TimeSeriesStore + ?Sized> TimeSeriesStore for &S {
    fn get_price_series(&self, symbol: &str, period: ReportingPeriod) -> Result<PriceSeries> {
        (**self).get_price_series(symbol, period)
    }

    fn get_index_series(&self, name: &str, period: ReportingPeriod) -> Result<PriceSeries> {
        (**self).get_index_series(name, period)
    }

    fn get_financial_snapshot(
        &self,
        symbol: &str,
        period: ReportingPeriod,
    ) -> Result<FinancialSnapshot> {
        (**self).get_financial_snapshot(symbol, period)
    }

    fn get_risk_free_series(&self, period: ReportingPeriod) -> Result<Vec<RatePoint>> {
        (**self).get_risk_free_series(period)
    }

    fn get_market_cap_series(
        &self,
        symbol: &str,
        period: ReportingPeriod,
    ) -> Result<Vec<MarketCapPoint>> {
        (**self).get_market_cap_series(symbol, period)
    }

    fn securities(&self) -> Result<Vec<String>> {
        (**self).securities()
    }

    fn indices(&self) -> Result<Vec<String>> {
        (**self).indices()
    }
}
