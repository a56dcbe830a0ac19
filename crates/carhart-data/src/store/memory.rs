//! In-memory store for tests and embedding applications.

use super::TimeSeriesStore;
use crate::error::{DataError, Result};
use crate::period::ReportingPeriod;
use crate::types::{FinancialSnapshot, MarketCapPoint, PriceSeries, RatePoint};
use std::collections::BTreeMap;

/// [`TimeSeriesStore`] over series held in memory.
///
/// Series are stored whole and sliced to the requested period on read.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    prices: BTreeMap<String, PriceSeries>,
    indices: BTreeMap<String, PriceSeries>,
    statements: BTreeMap<(String, ReportingPeriod), FinancialSnapshot>,
    rates: Vec<RatePoint>,
    market_caps: BTreeMap<String, Vec<MarketCapPoint>>,
}

impl InMemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or merge a security's prices.
    pub fn insert_prices(&mut self, series: PriceSeries) {
        match self.prices.get_mut(series.symbol()) {
            Some(existing) => existing.extend(&series),
            None => {
                self.prices.insert(series.symbol().to_string(), series);
            }
        }
    }

    /// Add or merge an index's prices.
    pub fn insert_index(&mut self, series: PriceSeries) {
        match self.indices.get_mut(series.symbol()) {
            Some(existing) => existing.extend(&series),
            None => {
                self.indices.insert(series.symbol().to_string(), series);
            }
        }
    }

    /// Add a statement snapshot, replacing any for the same key.
    pub fn insert_snapshot(&mut self, snapshot: FinancialSnapshot) {
        let key = (snapshot.symbol.clone(), snapshot.reporting_period());
        self.statements.insert(key, snapshot);
    }

    /// Add risk-free observations.
    pub fn insert_rates(&mut self, points: impl IntoIterator<Item = RatePoint>) {
        self.rates.extend(points);
        self.rates.sort_by_key(|p| p.date);
        self.rates.dedup_by_key(|p| p.date);
    }

    /// Add market capitalization observations for a security.
    pub fn insert_market_caps(
        &mut self,
        symbol: impl Into<String>,
        points: impl IntoIterator<Item = MarketCapPoint>,
    ) {
        let entry = self.market_caps.entry(symbol.into()).or_default();
        entry.extend(points);
        entry.sort_by_key(|p| p.date);
        entry.dedup_by_key(|p| p.date);
    }

    /// Builder form of [`insert_prices`](Self::insert_prices).
    pub fn with_prices(mut self, series: PriceSeries) -> Self {
        self.insert_prices(series);
        self
    }

    /// Builder form of [`insert_index`](Self::insert_index).
    pub fn with_index(mut self, series: PriceSeries) -> Self {
        self.insert_index(series);
        self
    }

    /// Builder form of [`insert_snapshot`](Self::insert_snapshot).
    pub fn with_snapshot(mut self, snapshot: FinancialSnapshot) -> Self {
        self.insert_snapshot(snapshot);
        self
    }

    /// Builder form of [`insert_rates`](Self::insert_rates).
    pub fn with_rates(mut self, points: impl IntoIterator<Item = RatePoint>) -> Self {
        self.insert_rates(points);
        self
    }

    /// Builder form of [`insert_market_caps`](Self::insert_market_caps).
    pub fn with_market_caps(
        mut self,
        symbol: impl Into<String>,
        points: impl IntoIterator<Item = MarketCapPoint>,
    ) -> Self {
        self.insert_market_caps(symbol, points);
        self
    }

    fn slice(series: &PriceSeries, period: ReportingPeriod, what: &str) -> Result<PriceSeries> {
        let sliced = series.within(&period);
        if sliced.is_empty() {
            return Err(DataError::not_found(format!(
                "{} {} in {}",
                what,
                series.symbol(),
                period
            )));
        }
        Ok(sliced)
    }
}

impl TimeSeriesStore for InMemoryStore {
    fn get_price_series(&self, symbol: &str, period: ReportingPeriod) -> Result<PriceSeries> {
        match self.prices.get(symbol) {
            Some(series) => Self::slice(series, period, "prices"),
            None => self.get_index_series(symbol, period),
        }
    }

    fn get_index_series(&self, name: &str, period: ReportingPeriod) -> Result<PriceSeries> {
        let series = self
            .indices
            .get(name)
            .ok_or_else(|| DataError::not_found(format!("index {}", name)))?;
        Self::slice(series, period, "index")
    }

    fn get_financial_snapshot(
        &self,
        symbol: &str,
        period: ReportingPeriod,
    ) -> Result<FinancialSnapshot> {
        self.statements
            .get(&(symbol.to_string(), period))
            .cloned()
            .ok_or_else(|| DataError::not_found(format!("statement for {} in {}", symbol, period)))
    }

    fn get_risk_free_series(&self, period: ReportingPeriod) -> Result<Vec<RatePoint>> {
        let points: Vec<_> = self
            .rates
            .iter()
            .filter(|p| period.contains(p.date))
            .copied()
            .collect();
        if points.is_empty() {
            return Err(DataError::not_found(format!("bond yields in {}", period)));
        }
        Ok(points)
    }

    fn get_market_cap_series(
        &self,
        symbol: &str,
        period: ReportingPeriod,
    ) -> Result<Vec<MarketCapPoint>> {
        let points: Vec<_> = self
            .market_caps
            .get(symbol)
            .map(|all| {
                all.iter()
                    .filter(|p| period.contains(p.date))
                    .copied()
                    .collect()
            })
            .unwrap_or_default();
        if points.is_empty() {
            return Err(DataError::not_found(format!(
                "market cap for {} in {}",
                symbol, period
            )));
        }
        Ok(points)
    }

    fn securities(&self) -> Result<Vec<String>> {
        Ok(self.prices.keys().cloned().collect())
    }

    fn indices(&self) -> Result<Vec<String>> {
        Ok(self.indices.keys().cloned().collect())
    }
}
