//! Cached factor construction for a period.

use crate::config::FactorConfig;
use crate::error::Result;
use crate::excess::ExcessReturnFactor;
use crate::momentum::MomentumFactor;
use crate::size::SizeFactor;
use crate::traits::{MarketFactor, SecurityFactor, StyleFactor};
use crate::value::ValueFactor;
use carhart_data::{
    Cache, DroppedSymbol, FactorKey, FactorKind, FactorSeries, MemoryCache, ReportingPeriod,
    TimeSeriesStore,
};
use std::fmt;
use std::sync::Arc;
use tracing::info;

/// Shared cache of factor series.
pub type FactorCache = Arc<dyn Cache<FactorKey, FactorSeries>>;

/// Market-wide regressors for one period.
#[derive(Debug, Clone, PartialEq)]
pub struct MarketFactors {
    /// Period covered
    pub period: ReportingPeriod,
    /// Market index the excess return was taken from
    pub market: String,
    /// Market excess return (`MKT_RF`)
    pub market_excess: FactorSeries,
    /// Size spread
    pub smb: FactorSeries,
    /// Value spread
    pub hml: FactorSeries,
    /// Securities left out of HML; empty when HML came from the cache
    pub dropped: Vec<DroppedSymbol>,
}

/// Security-specific series for one period.
#[derive(Debug, Clone, PartialEq)]
pub struct SecurityFactors {
    /// Security symbol
    pub symbol: String,
    /// Security excess return (regressand)
    pub excess_return: FactorSeries,
    /// Momentum
    pub momentum: FactorSeries,
}

/// Builds factor series from a store, computing each key at most once.
pub struct FactorBuilder<'a> {
    store: &'a dyn TimeSeriesStore,
    config: FactorConfig,
    cache: FactorCache,
}

impl fmt::Debug for FactorBuilder<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FactorBuilder")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<'a> FactorBuilder<'a> {
    /// Builder with default configuration and an in-memory cache.
    pub fn new(store: &'a dyn TimeSeriesStore) -> Self {
        Self {
            store,
            config: FactorConfig::default(),
            cache: Arc::new(MemoryCache::<FactorKey, FactorSeries>::new()),
        }
    }

    /// Replace the configuration.
    pub fn with_config(mut self, config: FactorConfig) -> Self {
        self.config = config;
        self
    }

    /// Replace the cache.
    pub fn with_cache(mut self, cache: FactorCache) -> Self {
        self.cache = cache;
        self
    }

    /// Active configuration.
    pub const fn config(&self) -> &FactorConfig {
        &self.config
    }

    /// Underlying store.
    pub fn store(&self) -> &'a dyn TimeSeriesStore {
        self.store
    }

    /// Market index excess return.
    pub fn market_excess_return(&self, index: &str, period: ReportingPeriod) -> Result<FactorSeries> {
        let key = FactorKey::for_symbol(FactorKind::MarketExcessReturn, period, index);
        let factor = ExcessReturnFactor::market().configured(self.config.excess());
        self.cache
            .get_or_compute(&key, || factor.compute(self.store, index, period))
    }

    /// Security excess return.
    pub fn security_excess_return(
        &self,
        symbol: &str,
        period: ReportingPeriod,
    ) -> Result<FactorSeries> {
        let key = FactorKey::for_symbol(FactorKind::SecurityExcessReturn, period, symbol);
        let factor = ExcessReturnFactor::security().configured(self.config.excess());
        self.cache
            .get_or_compute(&key, || factor.compute(self.store, symbol, period))
    }

    /// Size spread.
    pub fn smb(&self, period: ReportingPeriod) -> Result<FactorSeries> {
        let key = FactorKey::market(FactorKind::Smb, period);
        let factor = SizeFactor::with_config(self.config.size());
        self.cache
            .get_or_compute(&key, || factor.compute(self.store, period))
    }

    /// Value spread, with the securities dropped while computing it.
    pub fn hml(&self, period: ReportingPeriod) -> Result<(FactorSeries, Vec<DroppedSymbol>)> {
        let key = FactorKey::market(FactorKind::Hml, period);
        let mut dropped = Vec::new();
        let series = self.cache.get_or_compute(&key, || {
            let breakdown = ValueFactor::with_config(self.config.value()).breakdown(self.store, period)?;
            dropped = breakdown.dropped;
            Ok::<_, crate::error::FactorError>(breakdown.series)
        })?;
        Ok((series, dropped))
    }

    /// Momentum.
    pub fn momentum(&self, symbol: &str, period: ReportingPeriod) -> Result<FactorSeries> {
        let key = FactorKey::for_symbol(FactorKind::Mom, period, symbol);
        let factor = MomentumFactor::with_config(self.config.momentum());
        self.cache
            .get_or_compute(&key, || factor.compute(self.store, symbol, period))
    }

    /// All market-wide regressors for a period.
    pub fn market_factors(&self, market: &str, period: ReportingPeriod) -> Result<MarketFactors> {
        let market_excess = self.market_excess_return(market, period)?;
        let smb = self.smb(period)?;
        let (hml, dropped) = self.hml(period)?;
        info!(
            market,
            %period,
            mkt_rf = market_excess.len(),
            smb = smb.len(),
            hml = hml.len(),
            "market factors ready"
        );
        Ok(MarketFactors {
            period,
            market: market.to_string(),
            market_excess,
            smb,
            hml,
            dropped,
        })
    }

    /// Excess return and momentum of one security.
    pub fn security_factors(&self, symbol: &str, period: ReportingPeriod) -> Result<SecurityFactors> {
        Ok(SecurityFactors {
            symbol: symbol.to_string(),
            excess_return: self.security_excess_return(symbol, period)?,
            momentum: self.momentum(symbol, period)?,
        })
    }
}
