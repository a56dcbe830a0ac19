//! End-to-end run: factors, regressions, screening, optimization, risk.
//!
//! For an investment quarter `Q` the model is estimated on `Q − 1`: the
//! market-wide factors and every security's regression use that quarter
//! only. The selected securities are then weighted on a trailing year of
//! daily returns, the four quarters ending with `Q − 1`, and the same window
//! feeds the risk metrics.

use crate::config::PipelineConfig;
use crate::error::Result;
use crate::universe::Universe;
use carhart_data::{DroppedSymbol, PriceSeries, ReportingPeriod, Stage, TimeSeriesStore};
use carhart_factors::FactorBuilder;
use carhart_factors::builder::FactorCache;
use carhart_model::{
    RegressionCache, RegressionEngine, RegressionResult, ScreeningFilter, ScreeningOutcome,
};
use carhart_output::RunReport;
use carhart_risk::{Portfolio, PortfolioMetrics, PortfolioOptimizer, ReturnMatrix, RiskAnalytics};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{info, warn};

/// Quarters of daily prices used for optimization and risk.
pub const PRICE_WINDOW_QUARTERS: i32 = 4;

/// Everything a run produces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineOutput {
    /// Quarter the portfolio is built for
    pub investment_period: ReportingPeriod,
    /// Quarter the model was estimated on
    pub analysis_period: ReportingPeriod,
    /// Market index used
    pub market_index: String,
    /// Number of symbols in the input universe
    pub universe_size: usize,
    /// Optimized weights
    pub portfolio: Portfolio,
    /// Risk metrics of the portfolio
    pub metrics: PortfolioMetrics,
    /// Screening outcome
    pub screening: ScreeningOutcome,
    /// Regression result of every fitted symbol
    pub regressions: BTreeMap<String, RegressionResult>,
    /// Symbols dropped at any stage, with reasons
    pub dropped: Vec<DroppedSymbol>,
}

impl PipelineOutput {
    /// Dropped symbols of one stage.
    pub fn dropped_at(&self, stage: Stage) -> impl Iterator<Item = &DroppedSymbol> {
        self.dropped.iter().filter(move |d| d.stage == stage)
    }

    /// Build the run report.
    pub fn report(&self) -> RunReport {
        RunReport::new(
            self.investment_period,
            self.market_index.clone(),
            &self.screening,
            self.portfolio.clone(),
            self.metrics.clone(),
        )
        .with_counts(self.universe_size, self.regressions.len())
        .with_dropped(self.dropped.iter().cloned())
    }
}

/// Runs the whole engine against a store.
pub struct Pipeline<'a> {
    store: &'a dyn TimeSeriesStore,
    config: PipelineConfig,
    factor_cache: Option<FactorCache>,
    regression_cache: Option<RegressionCache>,
}

impl std::fmt::Debug for Pipeline<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("config", &self.config)
            .field("factor_cache", &self.factor_cache.is_some())
            .field("regression_cache", &self.regression_cache.is_some())
            .finish_non_exhaustive()
    }
}

impl<'a> Pipeline<'a> {
    /// Create a pipeline with the default configuration.
    pub fn new(store: &'a dyn TimeSeriesStore) -> Self {
        Self {
            store,
            config: PipelineConfig::default(),
            factor_cache: None,
            regression_cache: None,
        }
    }

    /// Set the configuration.
    pub fn with_config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    /// Persist factor series in `cache`.
    pub fn with_factor_cache(mut self, cache: FactorCache) -> Self {
        self.factor_cache = Some(cache);
        self
    }

    /// Persist regression results in `cache`.
    pub fn with_regression_cache(mut self, cache: RegressionCache) -> Self {
        self.regression_cache = Some(cache);
        self
    }

    /// Active configuration.
    pub const fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Build the portfolio for `investment_period` from `universe`.
    ///
    /// # Errors
    /// Configuration errors, market-wide factor failures, a missing market
    /// index price history, optimization failures and risk failures. Failures
    /// of a single symbol are recorded in [`PipelineOutput::dropped`] instead.
    pub fn run<U: Universe + ?Sized>(
        &self,
        universe: &U,
        investment_period: ReportingPeriod,
    ) -> Result<PipelineOutput> {
        self.config.validate()?;
        let config = &self.config;
        let analysis_period = investment_period.previous();
        let symbols = universe.symbols();
        info!(
            %investment_period,
            %analysis_period,
            universe = symbols.len(),
            "pipeline started"
        );

        let mut builder = FactorBuilder::new(self.store).with_config(config.factor.clone());
        if let Some(cache) = &self.factor_cache {
            builder = builder.with_cache(cache.clone());
        }
        let market = builder.market_factors(&config.market_index, analysis_period)?;
        let mut dropped = market.dropped.clone();

        let mut engine = RegressionEngine::new();
        if let Some(cache) = &self.regression_cache {
            engine = engine.with_cache(cache.clone());
        }
        let batch = engine.fit_universe(&builder, &market, &symbols);
        dropped.extend(batch.dropped);

        let market_prices = self.load_market_prices(analysis_period)?;
        let (mut priced, unpriced) = self.load_prices(batch.results.keys(), analysis_period);
        dropped.extend(unpriced);
        let candidates: BTreeMap<String, RegressionResult> = batch
            .results
            .iter()
            .filter(|(symbol, _)| priced.contains_key(*symbol))
            .map(|(symbol, result)| (symbol.clone(), result.clone()))
            .collect();

        let screening = ScreeningFilter::with_config(config.screening.clone())
            .select(&candidates, config.portfolio_size);
        dropped.extend(screening.rejected.iter().cloned());
        info!(
            selected = screening.len(),
            rounds = screening.rounds,
            "screening finished"
        );

        let mut prices: Vec<PriceSeries> = screening
            .selected()
            .iter()
            .filter_map(|symbol| priced.remove(symbol))
            .collect();
        prices.push(market_prices);
        let returns = ReturnMatrix::from_prices(&prices)?;
        let (assets, market_returns) = returns.split_off(&config.market_index)?;

        let portfolio = PortfolioOptimizer::new(config.optimizer.clone()).optimize(&assets)?;
        let metrics = RiskAnalytics::new(config.risk.clone()).analyze(
            &portfolio,
            &assets,
            &market_returns.to_vec(),
        )?;

        info!(
            holdings = portfolio.len(),
            dropped = dropped.len(),
            sharpe = metrics.sharpe_ratio,
            "pipeline finished"
        );
        Ok(PipelineOutput {
            investment_period,
            analysis_period,
            market_index: config.market_index.clone(),
            universe_size: symbols.len(),
            portfolio,
            metrics,
            screening,
            regressions: batch.results,
            dropped,
        })
    }

    /// First quarter of the optimization and risk window.
    fn window_start(analysis_period: ReportingPeriod) -> ReportingPeriod {
        analysis_period.offset(1 - PRICE_WINDOW_QUARTERS)
    }

    /// Price history of the market index over the window.
    fn load_market_prices(&self, analysis_period: ReportingPeriod) -> Result<PriceSeries> {
        Ok(self.store.get_price_history(
            &self.config.market_index,
            Self::window_start(analysis_period),
            analysis_period,
        )?)
    }

    /// Price histories of `symbols` over the window, keyed by symbol.
    ///
    /// Symbols without prices are dropped here, before screening, so every
    /// screened symbol can be weighted.
    fn load_prices<'s>(
        &self,
        symbols: impl IntoIterator<Item = &'s String>,
        analysis_period: ReportingPeriod,
    ) -> (BTreeMap<String, PriceSeries>, Vec<DroppedSymbol>) {
        let from = Self::window_start(analysis_period);
        let mut prices = BTreeMap::new();
        let mut dropped = Vec::new();

        for symbol in symbols {
            match self.store.get_price_history(symbol, from, analysis_period) {
                Ok(series) => {
                    prices.insert(symbol.clone(), series);
                }
                Err(e) => {
                    warn!(symbol = %symbol, error = %e, "no price window, not screened");
                    dropped.push(DroppedSymbol::new(
                        symbol.as_str(),
                        Stage::Optimization,
                        e.kind(),
                        e.to_string(),
                    ));
                }
            }
        }
        (prices, dropped)
    }
}
