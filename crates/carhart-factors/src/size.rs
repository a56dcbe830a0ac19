//! Size factor (SMB).
//!
//! Spread between a small-capitalization index and a large-capitalization
//! index over the period. Both legs use close-to-close returns with the
//! first day of the period at 0. The spread is taken between daily returns
//! unless [`SmbMeasure::Cumulative`] is configured.

use crate::config::SmbMeasure;
use crate::error::Result;
use crate::traits::{MarketFactor, StyleFactor};
use carhart_data::{FactorKey, FactorKind, FactorSeries, ReportingPeriod, TimeSeriesStore};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Configuration for the SMB factor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizeConfig {
    /// Small-capitalization index name
    pub small_cap_index: String,
    /// Large-capitalization index name
    pub large_cap_index: String,
    /// Daily or cumulative spread (default: daily)
    pub measure: SmbMeasure,
}

impl Default for SizeConfig {
    fn default() -> Self {
        let config = crate::config::FactorConfig::default();
        Self {
            small_cap_index: config.small_cap_index,
            large_cap_index: config.large_cap_index,
            measure: SmbMeasure::Daily,
        }
    }
}

/// SMB: small-cap index return minus large-cap index return
#[derive(Debug)]
pub struct SizeFactor {
    config: SizeConfig,
}

impl MarketFactor for SizeFactor {
    fn name(&self) -> &str {
        "smb"
    }

    fn kind(&self) -> FactorKind {
        FactorKind::Smb
    }

    fn compute(
        &self,
        store: &dyn TimeSeriesStore,
        period: ReportingPeriod,
    ) -> Result<FactorSeries> {
        let small = store.get_index_series(&self.config.small_cap_index, period)?;
        let large = store.get_index_series(&self.config.large_cap_index, period)?;

        let pick = |row: &carhart_data::ReturnRow| match self.config.measure {
            SmbMeasure::Daily => row.ret,
            SmbMeasure::Cumulative => row.cumulative_return,
        };
        let large: BTreeMap<_, _> = large.returns().iter().map(|r| (r.date, pick(r))).collect();
        let points = small
            .returns()
            .iter()
            .filter_map(|r| large.get(&r.date).map(|b| (r.date, pick(r) - b)))
            .collect();

        let series = FactorSeries::new(FactorKey::market(FactorKind::Smb, period), points);
        debug!(%period, rows = series.len(), measure = ?self.config.measure, "computed SMB");
        Ok(series)
    }
}

impl StyleFactor for SizeFactor {
    type Config = SizeConfig;

    fn with_config(config: Self::Config) -> Self {
        Self { config }
    }

    fn config(&self) -> &Self::Config {
        &self.config
    }
}

impl Default for SizeFactor {
    fn default() -> Self {
        Self::with_config(SizeConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use carhart_data::{InMemoryStore, Period, PricePoint, PriceSeries};
    use chrono::NaiveDate;

    fn index(name: &str, closes: &[(u32, f64)]) -> PriceSeries {
        PriceSeries::new(
            name,
            closes
                .iter()
                .map(|&(d, c)| PricePoint::from_close(NaiveDate::from_ymd_opt(2023, 4, d).unwrap(), c))
                .collect(),
        )
    }

    fn store() -> InMemoryStore {
        InMemoryStore::new()
            .with_index(index("SMALL", &[(3, 100.0), (4, 102.0), (5, 101.0)]))
            .with_index(index("LARGE", &[(3, 200.0), (4, 202.0), (6, 210.0)]))
    }

    fn factor(measure: SmbMeasure) -> SizeFactor {
        SizeFactor::with_config(SizeConfig {
            small_cap_index: "SMALL".to_string(),
            large_cap_index: "LARGE".to_string(),
            measure,
        })
    }

    #[test]
    fn test_daily_spread_on_common_dates() {
        let rp = ReportingPeriod::new(2023, Period::Q2);
        let smb = factor(SmbMeasure::Daily).compute(&store(), rp).unwrap();

        assert_eq!(smb.len(), 2);
        assert_eq!(smb.values()[0], 0.0);
        assert_relative_eq!(smb.values()[1], 0.02 - 0.01, epsilon = 1e-12);
    }

    #[test]
    fn test_cumulative_spread() {
        let rp = ReportingPeriod::new(2023, Period::Q2);
        let smb = factor(SmbMeasure::Cumulative).compute(&store(), rp).unwrap();
        // each leg compounds on its own dates before the join
        assert_relative_eq!(smb.values()[1], 0.02 - 0.01, epsilon = 1e-12);
    }

    #[test]
    fn test_default_measure_is_daily() {
        assert_eq!(SizeConfig::default().measure, SmbMeasure::Daily);
        assert_eq!(SmbMeasure::default(), SmbMeasure::Daily);
    }

    #[test]
    fn test_missing_index_is_not_found() {
        let rp = ReportingPeriod::new(2023, Period::Q3);
        assert!(factor(SmbMeasure::Daily).compute(&store(), rp).unwrap_err().is_not_found());
    }
}
