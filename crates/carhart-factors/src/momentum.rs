//! Momentum factor (MOM).
//!
//! Trailing close-to-close return over `lookback` observations, computed on
//! roughly thirteen months of history and sliced to the target quarter:
//! the last month of the quarter five back, the four full quarters before
//! the target, and the target quarter itself.

use crate::error::Result;
use crate::traits::{SecurityFactor, StyleFactor};
use carhart_data::{
    FactorKey, FactorKind, FactorSeries, PriceSeries, ReportingPeriod, TimeSeriesStore,
};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Configuration for the MOM factor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MomentumConfig {
    /// Lookback window in observations (default: 252 for ~1 year)
    pub lookback: usize,
}

impl Default for MomentumConfig {
    fn default() -> Self {
        Self { lookback: 252 }
    }
}

/// `close[t] / close[t - lookback] - 1`, or 0 where the history is too short
/// or the ratio is undefined.
pub fn trailing_momentum(closes: &[f64], lookback: usize) -> Vec<f64> {
    closes
        .iter()
        .enumerate()
        .map(|(i, close)| {
            if lookback == 0 || i < lookback {
                return 0.0;
            }
            let r = close / closes[i - lookback] - 1.0;
            if r.is_nan() { 0.0 } else { r }
        })
        .collect()
}

/// MOM: trailing one-year price momentum per security
#[derive(Debug)]
pub struct MomentumFactor {
    config: MomentumConfig,
}

impl MomentumFactor {
    /// Price history used for `period`.
    ///
    /// Earlier quarters without data are skipped; the target quarter must exist.
    pub fn history(
        &self,
        store: &dyn TimeSeriesStore,
        symbol: &str,
        period: ReportingPeriod,
    ) -> Result<PriceSeries> {
        let target = store.get_price_series(symbol, period)?;
        let mut history = PriceSeries::new(symbol, Vec::new());

        match store.get_price_series(symbol, period.offset(-5)) {
            Ok(oldest) => {
                if let Some(last) = oldest.last_date() {
                    let month_start =
                        NaiveDate::from_ymd_opt(last.year(), last.month(), 1).unwrap_or(last);
                    history.extend(&oldest.between(month_start, last));
                }
            }
            Err(e) if e.is_not_found() => {}
            Err(e) => return Err(e.into()),
        }

        for back in (1..=4).rev() {
            let quarter = period.offset(-back);
            match store.get_price_series(symbol, quarter) {
                Ok(series) => history.extend(&series),
                Err(e) if e.is_not_found() => {
                    debug!(symbol, %quarter, "momentum history quarter missing");
                }
                Err(e) => return Err(e.into()),
            }
        }

        history.extend(&target);
        Ok(history)
    }
}

impl SecurityFactor for MomentumFactor {
    fn name(&self) -> &str {
        "momentum"
    }

    fn kind(&self) -> FactorKind {
        FactorKind::Mom
    }

    fn compute(
        &self,
        store: &dyn TimeSeriesStore,
        symbol: &str,
        period: ReportingPeriod,
    ) -> Result<FactorSeries> {
        let history = self.history(store, symbol, period)?;
        let momentum = trailing_momentum(&history.closes(), self.config.lookback);
        let points = history
            .dates()
            .into_iter()
            .zip(momentum)
            .filter(|(date, _)| period.contains(*date))
            .collect();

        let series = FactorSeries::new(FactorKey::for_symbol(FactorKind::Mom, period, symbol), points);
        debug!(symbol, %period, history = history.len(), rows = series.len(), "computed MOM");
        Ok(series)
    }
}

impl StyleFactor for MomentumFactor {
    type Config = MomentumConfig;

    fn with_config(config: Self::Config) -> Self {
        Self { config }
    }

    fn config(&self) -> &Self::Config {
        &self.config
    }
}

impl Default for MomentumFactor {
    fn default() -> Self {
        Self::with_config(MomentumConfig::default())
    }
}
