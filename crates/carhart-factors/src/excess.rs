//! Market and security excess returns over the risk-free proxy.
//!
//! The proxy is quoted as an annualized percentage and converted by dividing
//! by `rate_divisor` (100) only; it is not de-annualized to a daily rate.

use crate::error::Result;
use crate::traits::{SecurityFactor, StyleFactor};
use carhart_data::{
    FactorKey, FactorKind, FactorSeries, PriceSeries, RatePoint, ReportingPeriod,
    TimeSeriesStore,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Configuration for excess returns
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExcessReturnConfig {
    /// Divisor applied to the quoted yield (default: 100)
    pub rate_divisor: f64,
}

impl Default for ExcessReturnConfig {
    fn default() -> Self {
        Self { rate_divisor: 100.0 }
    }
}

/// Daily returns minus the risk-free proxy, on dates present in both.
pub fn excess_returns(
    key: FactorKey,
    prices: &PriceSeries,
    rates: &[RatePoint],
    rate_divisor: f64,
) -> FactorSeries {
    let rates: BTreeMap<_, _> = rates.iter().map(|r| (r.date, r.bond_yield)).collect();
    let points = prices
        .returns()
        .into_iter()
        .filter_map(|row| {
            rates
                .get(&row.date)
                .map(|y| (row.date, row.ret - y / rate_divisor))
        })
        .collect();
    FactorSeries::new(key, points)
}

/// Excess return of a security or index (`EXCESS_RETURN` / `MKT_RF`).
#[derive(Debug)]
pub struct ExcessReturnFactor {
    kind: FactorKind,
    config: ExcessReturnConfig,
}

impl ExcessReturnFactor {
    /// Excess return of a market index.
    pub fn market() -> Self {
        Self {
            kind: FactorKind::MarketExcessReturn,
            config: ExcessReturnConfig::default(),
        }
    }

    /// Excess return of an individual security.
    pub fn security() -> Self {
        Self {
            kind: FactorKind::SecurityExcessReturn,
            config: ExcessReturnConfig::default(),
        }
    }

    /// Replace the configuration.
    pub const fn configured(mut self, config: ExcessReturnConfig) -> Self {
        self.config = config;
        self
    }
}

impl SecurityFactor for ExcessReturnFactor {
    fn name(&self) -> &str {
        match self.kind {
            FactorKind::MarketExcessReturn => "market_excess_return",
            _ => "security_excess_return",
        }
    }

    fn kind(&self) -> FactorKind {
        self.kind
    }

    fn compute(
        &self,
        store: &dyn TimeSeriesStore,
        symbol: &str,
        period: ReportingPeriod,
    ) -> Result<FactorSeries> {
        let prices = match self.kind {
            FactorKind::MarketExcessReturn => store.get_index_series(symbol, period)?,
            _ => store.get_price_series(symbol, period)?,
        };
        let rates = store.get_risk_free_series(period)?;
        let key = FactorKey::for_symbol(self.kind, period, symbol);
        let series = excess_returns(key, &prices, &rates, self.config.rate_divisor);
        debug!(symbol, %period, factor = self.name(), rows = series.len(), "computed excess returns");
        Ok(series)
    }
}

impl StyleFactor for ExcessReturnFactor {
    type Config = ExcessReturnConfig;

    fn with_config(config: Self::Config) -> Self {
        Self::security().configured(config)
    }

    fn config(&self) -> &Self::Config {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use carhart_data::{InMemoryStore, Period, PricePoint};
    use chrono::NaiveDate;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2023, 1, d).unwrap()
    }

    fn rate(d: u32, y: f64) -> RatePoint {
        RatePoint {
            date: date(d),
            bond_yield: y,
            change: None,
        }
    }

    fn store() -> InMemoryStore {
        InMemoryStore::new()
            .with_prices(PriceSeries::new(
                "A",
                vec![
                    PricePoint::from_close(date(2), 100.0),
                    PricePoint::from_close(date(3), 110.0),
                    PricePoint::from_close(date(4), 99.0),
                ],
            ))
            .with_rates(vec![rate(2, 3.5), rate(4, 3.0), rate(5, 3.0)])
    }

    #[test]
    fn test_rate_divided_not_deannualized() {
        let rp = ReportingPeriod::new(2023, Period::Q1);
        let series = ExcessReturnFactor::security()
            .compute(&store(), "A", rp)
            .unwrap();

        // inner join on dates: Jan 3 has no rate, Jan 5 has no price
        assert_eq!(series.dates(), vec![date(2), date(4)]);
        assert_relative_eq!(series.values()[0], 0.0 - 0.035, epsilon = 1e-15);
        assert_relative_eq!(series.values()[1], (99.0 / 110.0 - 1.0) - 0.03, epsilon = 1e-15);
        assert_eq!(
            series.key(),
            &FactorKey::for_symbol(FactorKind::SecurityExcessReturn, rp, "A")
        );
    }

    #[test]
    fn test_market_requires_index() {
        let rp = ReportingPeriod::new(2023, Period::Q1);
        let err = ExcessReturnFactor::market()
            .compute(&store(), "A", rp)
            .unwrap_err();
        assert!(err.is_not_found());
    }
}
