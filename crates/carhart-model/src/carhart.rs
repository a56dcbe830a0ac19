//! The Carhart four-factor regression.
//!
//! ```text
//! EXCESS_RETURN = const + b1 MKT_RF + b2 SMB + b3 HML + b4 MOM + e
//! ```
//!
//! Observations are the dates shared by all five series. A fitted model is
//! immutable and may be cached under a [`RegressionKey`].

use crate::error::{RegressionError, Result};
use crate::ols::{OlsFit, fit_ols};
use carhart_data::{
    Cache, CacheKey, DataError, DroppedSymbol, FactorKind, FactorSeries, ReportingPeriod, Stage,
    align_series,
};
use carhart_factors::{FactorBuilder, MarketFactors, SecurityFactors};
use derive_more::Display;
use ndarray::{Array1, Array2};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Parameters of the four-factor model, in design-matrix order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, Serialize, Deserialize,
)]
pub enum Regressor {
    /// Intercept (alpha)
    #[display("const")]
    #[serde(rename = "const")]
    Const,
    /// Market excess return
    #[display("MKT_RF")]
    #[serde(rename = "MKT_RF")]
    MarketExcessReturn,
    /// Size spread
    #[display("SMB")]
    #[serde(rename = "SMB")]
    Smb,
    /// Value spread
    #[display("HML")]
    #[serde(rename = "HML")]
    Hml,
    /// Momentum
    #[display("MOM")]
    #[serde(rename = "MOM")]
    Mom,
}

impl Regressor {
    /// All parameters, intercept first.
    pub const fn all() -> [Self; 5] {
        [
            Self::Const,
            Self::MarketExcessReturn,
            Self::Smb,
            Self::Hml,
            Self::Mom,
        ]
    }

    /// Factor series behind this regressor; `None` for the intercept.
    pub const fn factor_kind(&self) -> Option<FactorKind> {
        match self {
            Self::Const => None,
            Self::MarketExcessReturn => Some(FactorKind::MarketExcessReturn),
            Self::Smb => Some(FactorKind::Smb),
            Self::Hml => Some(FactorKind::Hml),
            Self::Mom => Some(FactorKind::Mom),
        }
    }
}

/// Estimate and inference for one parameter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CoefficientStats {
    /// Parameter
    pub regressor: Regressor,
    /// Point estimate
    pub coefficient: f64,
    /// Standard error
    pub std_error: f64,
    /// t-statistic
    pub t_stat: f64,
    /// Two-sided p-value
    pub p_value: f64,
    /// Lower bound of the 95% confidence interval
    pub conf_low: f64,
    /// Upper bound of the 95% confidence interval
    pub conf_high: f64,
}

impl CoefficientStats {
    fn is_finite(&self) -> bool {
        [
            self.coefficient,
            self.std_error,
            self.t_stat,
            self.p_value,
            self.conf_low,
            self.conf_high,
        ]
        .iter()
        .all(|v| v.is_finite())
    }
}

/// Goodness-of-fit and residual diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelDiagnostics {
    /// Number of observations
    pub nobs: usize,
    /// Model degrees of freedom
    pub df_model: usize,
    /// Residual degrees of freedom
    pub df_resid: usize,
    /// R²
    pub r_squared: f64,
    /// Adjusted R², clamped to `[0, 1]`
    pub adj_r_squared: f64,
    /// F-statistic
    pub f_statistic: Option<f64>,
    /// p-value of the F-statistic
    pub f_pvalue: Option<f64>,
    /// Log-likelihood
    pub log_likelihood: f64,
    /// Akaike information criterion
    pub aic: f64,
    /// Bayesian information criterion
    pub bic: f64,
    /// Durbin-Watson statistic
    pub durbin_watson: f64,
    /// Jarque-Bera statistic
    pub jarque_bera: f64,
    /// p-value of the Jarque-Bera statistic
    pub jb_pvalue: f64,
    /// Residual skewness
    pub skew: f64,
    /// Residual kurtosis
    pub kurtosis: f64,
    /// Condition number of the design matrix
    pub condition_number: Option<f64>,
}

impl ModelDiagnostics {
    fn is_finite(&self) -> bool {
        let required = [
            self.r_squared,
            self.adj_r_squared,
            self.log_likelihood,
            self.aic,
            self.bic,
            self.durbin_watson,
            self.jarque_bera,
            self.jb_pvalue,
            self.skew,
            self.kurtosis,
        ];
        let optional = [self.f_statistic, self.f_pvalue, self.condition_number];
        required.iter().all(|v| v.is_finite())
            && optional.iter().flatten().all(|v| v.is_finite())
    }
}

impl From<&OlsFit> for ModelDiagnostics {
    fn from(fit: &OlsFit) -> Self {
        Self {
            nobs: fit.nobs,
            df_model: fit.df_model,
            df_resid: fit.df_resid,
            r_squared: fit.r_squared,
            adj_r_squared: fit.adj_r_squared.clamp(0.0, 1.0),
            f_statistic: fit.f_statistic,
            f_pvalue: fit.f_pvalue,
            log_likelihood: fit.log_likelihood,
            aic: fit.aic,
            bic: fit.bic,
            durbin_watson: fit.durbin_watson,
            jarque_bera: fit.jarque_bera,
            jb_pvalue: fit.jb_pvalue,
            skew: fit.skew,
            kurtosis: fit.kurtosis,
            condition_number: fit.condition_number,
        }
    }
}

/// Fitted four-factor model of one security for one period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionResult {
    /// Security symbol
    pub symbol: String,
    /// Market index the market factor was taken from
    pub market: String,
    /// Period the model was fitted on
    pub period: ReportingPeriod,
    /// One entry per [`Regressor`], intercept first
    pub coefficients: Vec<CoefficientStats>,
    /// Model diagnostics
    pub diagnostics: ModelDiagnostics,
}

impl RegressionResult {
    /// Statistics for one parameter.
    pub fn coefficient(&self, regressor: Regressor) -> Option<&CoefficientStats> {
        self.coefficients.iter().find(|c| c.regressor == regressor)
    }

    /// The intercept (alpha).
    pub fn intercept(&self) -> Option<&CoefficientStats> {
        self.coefficient(Regressor::Const)
    }

    /// Adjusted R², clamped to `[0, 1]`.
    pub const fn adj_r_squared(&self) -> f64 {
        self.diagnostics.adj_r_squared
    }

    /// Whether every reported statistic is finite.
    pub fn is_finite(&self) -> bool {
        self.coefficients.iter().all(CoefficientStats::is_finite) && self.diagnostics.is_finite()
    }

    fn from_fit(symbol: &str, market: &str, period: ReportingPeriod, fit: &OlsFit) -> Self {
        let coefficients = Regressor::all()
            .into_iter()
            .enumerate()
            .map(|(i, regressor)| CoefficientStats {
                regressor,
                coefficient: fit.params[i],
                std_error: fit.std_errors[i],
                t_stat: fit.t_values[i],
                p_value: fit.p_values[i],
                conf_low: fit.conf_low[i],
                conf_high: fit.conf_high[i],
            })
            .collect();

        Self {
            symbol: symbol.to_string(),
            market: market.to_string(),
            period,
            coefficients,
            diagnostics: ModelDiagnostics::from(fit),
        }
    }
}

/// Cache identity of a regression: security, market and period.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RegressionKey {
    /// Security symbol
    pub symbol: String,
    /// Market index
    pub market: String,
    /// Period fitted
    pub period: ReportingPeriod,
}

impl RegressionKey {
    /// Create a new key.
    pub fn new(symbol: impl Into<String>, market: impl Into<String>, period: ReportingPeriod) -> Self {
        Self {
            symbol: symbol.into(),
            market: market.into(),
            period,
        }
    }
}

impl CacheKey for RegressionKey {
    fn namespace(&self) -> &'static str {
        "regression"
    }

    fn cache_key(&self) -> String {
        format!("{}/{}/{}", self.market, self.period, self.symbol)
    }
}

/// Shared cache of regression results.
pub type RegressionCache = Arc<dyn Cache<RegressionKey, RegressionResult>>;

/// Results of fitting a whole universe for one period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionBatch {
    /// Period fitted
    pub period: ReportingPeriod,
    /// Market index
    pub market: String,
    /// Fitted models by symbol
    pub results: BTreeMap<String, RegressionResult>,
    /// Symbols that could not be fitted, sorted by symbol
    pub dropped: Vec<DroppedSymbol>,
}

/// Fits the four-factor model, optionally through a result cache.
#[derive(Default)]
pub struct RegressionEngine {
    cache: Option<RegressionCache>,
}

impl fmt::Debug for RegressionEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegressionEngine")
            .field("cached", &self.cache.is_some())
            .finish()
    }
}

impl RegressionEngine {
    /// Create an engine without a cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store and reuse results through `cache`.
    pub fn with_cache(mut self, cache: RegressionCache) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Fit one security against the market-wide factors.
    pub fn fit(&self, market: &MarketFactors, security: &SecurityFactors) -> Result<RegressionResult> {
        let key = RegressionKey::new(&security.symbol, &market.market, market.period);
        if let Some(result) = self.cached(&key) {
            return Ok(result);
        }
        let result = Self::fit_series(
            &key,
            &security.excess_return,
            [
                &market.market_excess,
                &market.smb,
                &market.hml,
                &security.momentum,
            ],
        )?;
        self.store(&key, &result);
        Ok(result)
    }

    /// Fit `dependent` on the four regressors, in [`Regressor`] order.
    ///
    /// Dates missing from any series are dropped before fitting.
    pub fn fit_series(
        key: &RegressionKey,
        dependent: &FactorSeries,
        regressors: [&FactorSeries; 4],
    ) -> Result<RegressionResult> {
        let mut all = vec![dependent];
        all.extend(regressors);
        let aligned = align_series(&all)?;

        let column = |kind: FactorKind| {
            aligned.column(kind).ok_or_else(|| {
                RegressionError::Data(DataError::Alignment(format!("{} column missing", kind)))
            })
        };

        let y = Array1::from(column(dependent.kind())?.to_vec());
        let columns = regressors
            .iter()
            .map(|s| column(s.kind()))
            .collect::<Result<Vec<_>>>()?;
        let x = Array2::from_shape_fn((aligned.len(), columns.len()), |(i, j)| columns[j][i]);

        let fit = fit_ols(y.view(), x.view())?;
        debug!(
            symbol = %key.symbol,
            period = %key.period,
            nobs = fit.nobs,
            adj_r2 = fit.adj_r_squared,
            "fitted four-factor model"
        );
        Ok(RegressionResult::from_fit(&key.symbol, &key.market, key.period, &fit))
    }

    /// Fit every symbol in parallel.
    ///
    /// Per-symbol failures are recorded in [`RegressionBatch::dropped`]; they
    /// never abort the batch.
    pub fn fit_universe(
        &self,
        builder: &FactorBuilder<'_>,
        market: &MarketFactors,
        symbols: &[String],
    ) -> RegressionBatch {
        let outcomes: Vec<_> = symbols
            .par_iter()
            .map(|symbol| self.fit_symbol(builder, market, symbol))
            .collect();

        let mut results = BTreeMap::new();
        let mut dropped = Vec::new();
        for outcome in outcomes {
            match outcome {
                Ok(result) => {
                    results.insert(result.symbol.clone(), result);
                }
                Err(drop) => {
                    warn!(symbol = %drop.symbol, stage = %drop.stage, reason = %drop.detail, "dropped symbol");
                    dropped.push(drop);
                }
            }
        }
        dropped.sort_by(|a, b| a.symbol.cmp(&b.symbol));

        info!(
            market = %market.market,
            period = %market.period,
            fitted = results.len(),
            dropped = dropped.len(),
            "regressions complete"
        );

        RegressionBatch {
            period: market.period,
            market: market.market.clone(),
            results,
            dropped,
        }
    }

    fn fit_symbol(
        &self,
        builder: &FactorBuilder<'_>,
        market: &MarketFactors,
        symbol: &str,
    ) -> std::result::Result<RegressionResult, DroppedSymbol> {
        let key = RegressionKey::new(symbol, &market.market, market.period);
        if let Some(result) = self.cached(&key) {
            return Ok(result);
        }

        let security = builder
            .security_factors(symbol, market.period)
            .map_err(|e| DroppedSymbol::new(symbol, Stage::Factor, e.kind(), e.to_string()))?;

        self.fit(market, &security)
            .map_err(|e| DroppedSymbol::new(symbol, Stage::Regression, e.kind(), e.to_string()))
    }

    fn cached(&self, key: &RegressionKey) -> Option<RegressionResult> {
        let cache = self.cache.as_ref()?;
        match cache.get(key) {
            Ok(Some(result)) => {
                debug!(key = %key.cache_key(), "regression cache hit");
                Some(result)
            }
            Ok(None) => None,
            Err(e) => {
                warn!(key = %key.cache_key(), error = %e, "unreadable regression cache entry");
                None
            }
        }
    }

    fn store(&self, key: &RegressionKey, result: &RegressionResult) {
        let Some(cache) = &self.cache else {
            return;
        };
        // JSON has no NaN or infinity, so such results would not read back.
        if !result.is_finite() {
            debug!(key = %key.cache_key(), "non-finite result not cached");
            return;
        }
        if let Err(e) = cache.put(key, result) {
            warn!(key = %key.cache_key(), error = %e, "failed to cache regression");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use carhart_data::{FactorKey, MemoryCache, Period};
    use chrono::{Days, NaiveDate};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    const N: usize = 60;

    fn rp() -> ReportingPeriod {
        ReportingPeriod::new(2023, Period::Q1)
    }

    fn dates() -> Vec<NaiveDate> {
        let start = NaiveDate::from_ymd_opt(2023, 1, 2).unwrap();
        (0..N as u64).map(|i| start + Days::new(i)).collect()
    }

    fn market_series(kind: FactorKind, values: &[f64]) -> FactorSeries {
        FactorSeries::new(
            FactorKey::market(kind, rp()),
            dates().into_iter().zip(values.iter().copied()).collect(),
        )
    }

    fn symbol_series(kind: FactorKind, symbol: &str, values: &[f64]) -> FactorSeries {
        FactorSeries::new(
            FactorKey::for_symbol(kind, rp(), symbol),
            dates().into_iter().zip(values.iter().copied()).collect(),
        )
    }

    fn fixture(seed: u64) -> (MarketFactors, SecurityFactors) {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut draw = |scale: f64| (0..N).map(|_| rng.gen_range(-scale..scale)).collect::<Vec<_>>();
        let mkt = draw(0.02);
        let smb = draw(0.01);
        let hml = draw(0.01);
        let mom = draw(0.05);
        let noise = draw(0.002);
        let excess: Vec<f64> = (0..N)
            .map(|i| 0.001 + 1.2 * mkt[i] + 0.5 * smb[i] - 0.3 * hml[i] + 0.1 * mom[i] + noise[i])
            .collect();

        let market = MarketFactors {
            period: rp(),
            market: "MARKET".to_string(),
            market_excess: market_series(FactorKind::MarketExcessReturn, &mkt),
            smb: market_series(FactorKind::Smb, &smb),
            hml: market_series(FactorKind::Hml, &hml),
            dropped: vec![],
        };
        let security = SecurityFactors {
            symbol: "A".to_string(),
            excess_return: symbol_series(FactorKind::SecurityExcessReturn, "A", &excess),
            momentum: symbol_series(FactorKind::Mom, "A", &mom),
        };
        (market, security)
    }

    #[test]
    fn test_fit_recovers_loadings() {
        let (market, security) = fixture(42);
        let result = RegressionEngine::new().fit(&market, &security).unwrap();

        assert_eq!(result.coefficients.len(), 5);
        assert_eq!(result.diagnostics.nobs, N);
        assert_eq!(result.diagnostics.df_resid, N - 5);
        let beta = result.coefficient(Regressor::MarketExcessReturn).unwrap();
        assert_abs_diff_eq!(beta.coefficient, 1.2, epsilon = 0.05);
        assert!(beta.conf_low < beta.coefficient && beta.coefficient < beta.conf_high);
        assert!(result.adj_r_squared() > 0.9);
        assert!(result.is_finite());
    }

    #[test]
    fn test_adj_r_squared_in_unit_interval() {
        for seed in 0..10 {
            let (market, mut security) = fixture(seed);
            // regress pure noise so the raw adjusted R² can go negative
            let mut rng = StdRng::seed_from_u64(seed + 100);
            let noise: Vec<f64> = (0..N).map(|_| rng.gen_range(-0.01..0.01)).collect();
            security.excess_return = symbol_series(FactorKind::SecurityExcessReturn, "A", &noise);

            let result = RegressionEngine::new().fit(&market, &security).unwrap();
            let adj = result.adj_r_squared();
            assert!((0.0..=1.0).contains(&adj), "adj R² {} out of range", adj);
        }
    }

    #[test]
    fn test_refit_is_bit_identical() {
        let (market, security) = fixture(7);
        let a = RegressionEngine::new().fit(&market, &security).unwrap();
        let b = RegressionEngine::new().fit(&market, &security).unwrap();
        for (x, y) in a.coefficients.iter().zip(&b.coefficients) {
            assert_eq!(x.coefficient.to_bits(), y.coefficient.to_bits());
            assert_eq!(x.std_error.to_bits(), y.std_error.to_bits());
        }
        assert_eq!(a, b);
    }

    #[test]
    fn test_inner_join_on_dates() {
        let (market, mut security) = fixture(3);
        let trimmed: Vec<_> = security.momentum.points()[10..].to_vec();
        security.momentum = FactorSeries::new(security.momentum.key().clone(), trimmed);

        let result = RegressionEngine::new().fit(&market, &security).unwrap();
        assert_eq!(result.diagnostics.nobs, N - 10);
    }

    #[test]
    fn test_insufficient_observations() {
        let (market, mut security) = fixture(5);
        let short: Vec<_> = security.momentum.points()[..4].to_vec();
        security.momentum = FactorSeries::new(security.momentum.key().clone(), short);

        let err = RegressionEngine::new().fit(&market, &security).unwrap_err();
        assert!(matches!(
            err,
            RegressionError::InsufficientData {
                required: 5,
                actual: 4
            }
        ));
    }

    #[test]
    fn test_constant_momentum_is_degenerate() {
        let (market, mut security) = fixture(9);
        security.momentum = symbol_series(FactorKind::Mom, "A", &[0.0; N]);

        let err = RegressionEngine::new().fit(&market, &security).unwrap_err();
        assert!(matches!(err, RegressionError::DegenerateDesign(_)));
        assert_eq!(err.kind(), carhart_data::FailureKind::DegenerateDesign);
    }

    #[test]
    fn test_cache_hit_returned_verbatim() {
        let (market, security) = fixture(11);
        let cache: RegressionCache = Arc::new(MemoryCache::<RegressionKey, RegressionResult>::new());
        let engine = RegressionEngine::new().with_cache(Arc::clone(&cache));

        let first = engine.fit(&market, &security).unwrap();
        let key = RegressionKey::new("A", "MARKET", rp());
        assert_eq!(cache.get(&key).unwrap(), Some(first.clone()));

        let mut planted = first;
        planted.diagnostics.aic = 123.0;
        cache.put(&key, &planted).unwrap();
        assert_eq!(engine.fit(&market, &security).unwrap(), planted);
    }

    #[test]
    fn test_regression_key() {
        let key = RegressionKey::new("005930", "KOSPI", rp());
        assert_eq!(key.namespace(), "regression");
        assert_eq!(key.cache_key(), "KOSPI/2023_Q1/005930");
    }
}
