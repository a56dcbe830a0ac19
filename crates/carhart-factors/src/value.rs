//! Value factor (HML).
//!
//! For every date, securities are ranked by their book-to-market ratio
//! (market capitalization over total equity, as quoted by the data feed).
//! Securities at or above the high quantile form the High bucket, those at
//! or below the low quantile the Low bucket. HML is the mean daily return of
//! High minus that of Low. Buckets are recomputed independently on each date.
//!
//! A security without a return on a date is left out of that date's bucket
//! mean; an empty bucket contributes 0.

use crate::error::{FactorError, Result};
use crate::traits::{MarketFactor, StyleFactor};
use carhart_data::stats::{mean, quantile};
use carhart_data::{
    DataError, DroppedSymbol, FactorKey, FactorKind, FactorSeries, FailureKind, ReportingPeriod,
    Stage, TimeSeriesStore,
};
use chrono::NaiveDate;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::{debug, info, warn};

/// Configuration for the HML factor
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValueConfig {
    /// Quantile at or above which a security is in the High bucket (default: 0.7)
    pub high_quantile: f64,
    /// Quantile at or below which a security is in the Low bucket (default: 0.3)
    pub low_quantile: f64,
}

impl Default for ValueConfig {
    fn default() -> Self {
        Self {
            high_quantile: 0.7,
            low_quantile: 0.3,
        }
    }
}

/// HML series together with bucket membership and dropped securities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HmlBreakdown {
    /// The HML series
    pub series: FactorSeries,
    /// Securities that were in the High bucket on at least one date
    pub high_members: Vec<String>,
    /// Securities that were in the Low bucket on at least one date
    pub low_members: Vec<String>,
    /// Securities excluded for missing or unusable inputs
    pub dropped: Vec<DroppedSymbol>,
}

/// Per-security inputs for one period.
#[derive(Debug)]
struct Inputs {
    symbol: String,
    book_to_market: Vec<(NaiveDate, f64)>,
    returns: HashMap<NaiveDate, f64>,
}

/// HML: high book-to-market minus low book-to-market
#[derive(Debug)]
pub struct ValueFactor {
    config: ValueConfig,
}

impl ValueFactor {
    fn load(
        store: &dyn TimeSeriesStore,
        symbol: &str,
        period: ReportingPeriod,
    ) -> std::result::Result<(Inputs, Option<DroppedSymbol>), DroppedSymbol> {
        let drop = |kind: FailureKind, detail: String| {
            DroppedSymbol::new(symbol, Stage::Factor, kind, detail)
        };
        let from_data = |what: &str, e: DataError| drop(e.kind(), format!("{}: {}", what, e));

        let snapshot = store
            .get_financial_snapshot(symbol, period)
            .map_err(|e| from_data("statement", e))?;
        let equity = match snapshot.total_equity() {
            Some(v) if v != 0.0 && v.is_finite() => v,
            _ => {
                return Err(drop(
                    FailureKind::NotFound,
                    format!("no total equity in {} statement", period),
                ));
            }
        };
        let caps = store
            .get_market_cap_series(symbol, period)
            .map_err(|e| from_data("market cap", e))?;
        let book_to_market = caps
            .iter()
            .map(|c| (c.date, c.market_cap / equity))
            .collect();

        // Missing prices keep the security in the ranking but out of bucket means.
        let (returns, note) = match store.get_price_series(symbol, period) {
            Ok(prices) => (
                prices.returns().iter().map(|r| (r.date, r.ret)).collect(),
                None,
            ),
            Err(e) => (
                HashMap::new(),
                Some(drop(e.kind(), format!("prices: {}; excluded from bucket returns", e))),
            ),
        };

        Ok((
            Inputs {
                symbol: symbol.to_string(),
                book_to_market,
                returns,
            },
            note,
        ))
    }

    /// Compute HML over every security in the store, with bucket details.
    pub fn breakdown(
        &self,
        store: &dyn TimeSeriesStore,
        period: ReportingPeriod,
    ) -> Result<HmlBreakdown> {
        let universe = store.securities()?;
        self.breakdown_for(store, period, &universe)
    }

    /// Compute HML over the given securities, with bucket details.
    pub fn breakdown_for(
        &self,
        store: &dyn TimeSeriesStore,
        period: ReportingPeriod,
        universe: &[String],
    ) -> Result<HmlBreakdown> {
        let loaded: Vec<_> = universe
            .par_iter()
            .map(|symbol| Self::load(store, symbol, period))
            .collect();

        let mut inputs = Vec::new();
        let mut dropped = Vec::new();
        for outcome in loaded {
            match outcome {
                Ok((input, note)) => {
                    dropped.extend(note);
                    inputs.push(input);
                }
                Err(d) => dropped.push(d),
            }
        }
        for d in &dropped {
            warn!(symbol = %d.symbol, kind = %d.kind, detail = %d.detail, "HML input missing");
        }
        if inputs.is_empty() {
            return Err(FactorError::NoEligibleSecurities {
                factor: FactorKind::Hml,
                period,
            });
        }

        // date -> [(input index, ratio)], over the union of dates
        let mut panel: BTreeMap<NaiveDate, Vec<(usize, f64)>> = BTreeMap::new();
        for (i, input) in inputs.iter().enumerate() {
            for &(date, ratio) in &input.book_to_market {
                if period.contains(date) && !ratio.is_nan() {
                    panel.entry(date).or_default().push((i, ratio));
                }
            }
        }

        let mut high_members = BTreeSet::new();
        let mut low_members = BTreeSet::new();
        let mut points = Vec::with_capacity(panel.len());
        for (date, ratios) in &panel {
            let values: Vec<f64> = ratios.iter().map(|(_, r)| *r).collect();
            let (Some(high_cut), Some(low_cut)) = (
                quantile(&values, self.config.high_quantile),
                quantile(&values, self.config.low_quantile),
            ) else {
                continue;
            };

            let mut high_returns = Vec::new();
            let mut low_returns = Vec::new();
            for &(i, ratio) in ratios {
                let input = &inputs[i];
                let ret = input.returns.get(date).copied();
                if ratio >= high_cut {
                    high_members.insert(input.symbol.clone());
                    high_returns.extend(ret);
                }
                if ratio <= low_cut {
                    low_members.insert(input.symbol.clone());
                    low_returns.extend(ret);
                }
            }

            let bucket_mean = |r: &[f64]| if r.is_empty() { 0.0 } else { mean(r) };
            points.push((*date, bucket_mean(&high_returns) - bucket_mean(&low_returns)));
            debug!(%date, high = high_returns.len(), low = low_returns.len(), "HML buckets");
        }

        let series = FactorSeries::new(FactorKey::market(FactorKind::Hml, period), points);
        info!(
            %period,
            rows = series.len(),
            eligible = inputs.len(),
            dropped = dropped.len(),
            "computed HML"
        );

        Ok(HmlBreakdown {
            series,
            high_members: high_members.into_iter().collect(),
            low_members: low_members.into_iter().collect(),
            dropped,
        })
    }
}

impl MarketFactor for ValueFactor {
    fn name(&self) -> &str {
        "hml"
    }

    fn kind(&self) -> FactorKind {
        FactorKind::Hml
    }

    fn compute(
        &self,
        store: &dyn TimeSeriesStore,
        period: ReportingPeriod,
    ) -> Result<FactorSeries> {
        Ok(self.breakdown(store, period)?.series)
    }
}

impl StyleFactor for ValueFactor {
    type Config = ValueConfig;

    fn with_config(config: Self::Config) -> Self {
        Self { config }
    }

    fn config(&self) -> &Self::Config {
        &self.config
    }
}

impl Default for ValueFactor {
    fn default() -> Self {
        Self::with_config(ValueConfig::default())
    }
}
