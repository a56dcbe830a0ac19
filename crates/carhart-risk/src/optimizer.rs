//! Sharpe-ratio portfolio optimization under box and budget constraints.
//!
//! The objective `(w·μ − r_f) / sqrt(wᵀΣw)` is maximized over
//! `{w : Σw = 1, lo ≤ w_i ≤ hi}`. Nelder-Mead searches an unconstrained
//! space; every candidate is mapped to the feasible set by the Euclidean
//! projection onto the capped simplex, so the solver only ever scores
//! feasible weights.

use crate::covariance::{CovarianceError, CovarianceEstimator, StandardizedCovariance};
use crate::returns::ReturnMatrix;
use argmin::core::{CostFunction, Executor, State, TerminationReason};
use argmin::solver::neldermead::NelderMead;
use carhart_data::FailureKind;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{debug, info};

/// Bisection steps of the capped-simplex projection.
const PROJECTION_STEPS: usize = 100;

/// Tolerance on `Σw = 1` and on the bounds of a returned portfolio.
pub const WEIGHT_TOLERANCE: f64 = 1e-9;

/// Errors raised by [`PortfolioOptimizer`].
#[derive(Debug, Error)]
pub enum OptimizationError {
    /// Bounds cannot hold weights summing to one
    #[error("Infeasible bounds: {assets} assets cannot sum to 1 within [{min_weight}, {max_weight}]")]
    InfeasibleBounds {
        /// Number of assets
        assets: usize,
        /// Lower weight bound
        min_weight: f64,
        /// Upper weight bound
        max_weight: f64,
    },

    /// The solver did not converge
    #[error("Optimization failed: {0}")]
    OptimizationFailed(String),

    /// Not enough return observations
    #[error("Insufficient data: need at least {required} observations, got {actual}")]
    InsufficientData {
        /// Required number of observations
        required: usize,
        /// Actual number of observations
        actual: usize,
    },

    /// Invalid configuration
    #[error("Invalid optimizer configuration: {0}")]
    InvalidConfig(String),

    /// Covariance estimation error
    #[error("Covariance error: {0}")]
    Covariance(#[from] CovarianceError),
}

impl OptimizationError {
    /// Classify this error for reporting.
    pub const fn kind(&self) -> FailureKind {
        match self {
            Self::InsufficientData { .. } => FailureKind::InsufficientData,
            Self::InvalidConfig(_) | Self::Covariance(_) => FailureKind::DataError,
            Self::InfeasibleBounds { .. } | Self::OptimizationFailed(_) => {
                FailureKind::OptimizationFailed
            }
        }
    }
}

/// Optimizer configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerConfig {
    /// Lower bound of each weight (default: 0.05)
    pub min_weight: f64,
    /// Upper bound of each weight (default: 0.20)
    pub max_weight: f64,
    /// Solver iteration limit
    pub max_iterations: u64,
    /// Convergence tolerance on the spread of objective values
    pub tolerance: f64,
    /// Risk-free rate subtracted from the mean return in the objective
    pub risk_free_rate: f64,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            min_weight: 0.05,
            max_weight: 0.20,
            max_iterations: 20_000,
            tolerance: 1e-10,
            risk_free_rate: 0.0,
        }
    }
}

impl OptimizerConfig {
    /// Check the configuration is usable.
    pub fn validate(&self) -> Result<(), OptimizationError> {
        if !(0.0..=1.0).contains(&self.min_weight)
            || !(0.0..=1.0).contains(&self.max_weight)
            || self.min_weight > self.max_weight
        {
            return Err(OptimizationError::InvalidConfig(format!(
                "weight bounds [{}, {}] must satisfy 0 <= min <= max <= 1",
                self.min_weight, self.max_weight
            )));
        }
        if self.max_iterations == 0 {
            return Err(OptimizationError::InvalidConfig(
                "max_iterations must be positive".to_string(),
            ));
        }
        if self.tolerance.is_nan() || self.tolerance <= 0.0 {
            return Err(OptimizationError::InvalidConfig(
                "tolerance must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Whether `assets` weights can sum to one within the bounds.
    pub fn is_feasible(&self, assets: usize) -> bool {
        let n = assets as f64;
        assets > 0
            && n * self.min_weight <= 1.0 + WEIGHT_TOLERANCE
            && n * self.max_weight >= 1.0 - WEIGHT_TOLERANCE
    }
}

/// Portfolio weights by symbol.
///
/// Serializes as a plain `{symbol: weight}` object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Portfolio {
    weights: BTreeMap<String, f64>,
}

impl Portfolio {
    /// Create a portfolio from `(symbol, weight)` pairs.
    pub fn new(weights: impl IntoIterator<Item = (String, f64)>) -> Self {
        Self {
            weights: weights.into_iter().collect(),
        }
    }

    /// Equal weight on each symbol.
    pub fn equal_weight(symbols: &[String]) -> Self {
        let w = 1.0 / symbols.len() as f64;
        Self::new(symbols.iter().map(|s| (s.clone(), w)))
    }

    /// Weights by symbol.
    pub const fn weights(&self) -> &BTreeMap<String, f64> {
        &self.weights
    }

    /// Weight of one symbol.
    pub fn weight(&self, symbol: &str) -> Option<f64> {
        self.weights.get(symbol).copied()
    }

    /// Symbols held, sorted.
    pub fn symbols(&self) -> Vec<String> {
        self.weights.keys().cloned().collect()
    }

    /// Sum of weights.
    pub fn total(&self) -> f64 {
        self.weights.values().sum()
    }

    /// Number of holdings.
    pub fn len(&self) -> usize {
        self.weights.len()
    }

    /// Whether the portfolio is empty.
    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }
}

/// Euclidean projection of `x` onto `{w : Σw = 1, lo ≤ w_i ≤ hi}`.
///
/// The projection is `w_i = clamp(x_i − τ, lo, hi)` with `τ` found by
/// bisection. The caller must ensure the set is non-empty.
pub fn project_capped_simplex(x: &[f64], lo: f64, hi: f64) -> Vec<f64> {
    let total = |tau: f64| x.iter().map(|v| (v - tau).clamp(lo, hi)).sum::<f64>();

    let min = x.iter().copied().fold(f64::INFINITY, f64::min);
    let max = x.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    // total(low) = n * hi >= 1, total(high) = n * lo <= 1
    let (mut low, mut high) = (min - hi, max - lo);
    for _ in 0..PROJECTION_STEPS {
        let mid = 0.5 * (low + high);
        if total(mid) > 1.0 {
            low = mid;
        } else {
            high = mid;
        }
    }
    let tau = 0.5 * (low + high);
    x.iter().map(|v| (v - tau).clamp(lo, hi)).collect()
}

/// Negative Sharpe ratio of the projected weights.
struct SharpeCost {
    mean: Array1<f64>,
    cov: Array2<f64>,
    risk_free: f64,
    min_weight: f64,
    max_weight: f64,
}

impl SharpeCost {
    fn sharpe(&self, w: &Array1<f64>) -> f64 {
        let variance = w.dot(&self.cov.dot(w));
        let excess = w.dot(&self.mean) - self.risk_free;
        if variance > 0.0 {
            excess / variance.sqrt()
        } else {
            f64::NAN
        }
    }
}

impl CostFunction for SharpeCost {
    type Param = Vec<f64>;
    type Output = f64;

    fn cost(&self, x: &Self::Param) -> Result<Self::Output, argmin::core::Error> {
        let w = Array1::from(project_capped_simplex(x, self.min_weight, self.max_weight));
        let sharpe = self.sharpe(&w);
        // a degenerate variance scores worse than any real portfolio
        Ok(if sharpe.is_finite() { -sharpe } else { f64::MAX })
    }
}

/// Maximizes the Sharpe-like ratio of a portfolio of selected securities.
#[derive(Debug, Clone, Default)]
pub struct PortfolioOptimizer<E = StandardizedCovariance> {
    config: OptimizerConfig,
    estimator: E,
}

impl PortfolioOptimizer {
    /// Create an optimizer using the standardized covariance.
    pub fn new(config: OptimizerConfig) -> Self {
        Self {
            config,
            estimator: StandardizedCovariance,
        }
    }
}

impl<E: CovarianceEstimator> PortfolioOptimizer<E> {
    /// Create an optimizer with a custom covariance estimator.
    pub const fn with_estimator(config: OptimizerConfig, estimator: E) -> Self {
        Self { config, estimator }
    }

    /// Active configuration.
    pub const fn config(&self) -> &OptimizerConfig {
        &self.config
    }

    /// Optimize weights for every asset of `returns`.
    ///
    /// # Errors
    /// * [`OptimizationError::InfeasibleBounds`] when the bounds cannot hold
    ///   a fully invested portfolio of this size
    /// * [`OptimizationError::OptimizationFailed`] when the solver stops
    ///   without converging
    pub fn optimize(&self, returns: &ReturnMatrix) -> Result<Portfolio, OptimizationError> {
        if returns.len() < 2 {
            return Err(OptimizationError::InsufficientData {
                required: 2,
                actual: returns.len(),
            });
        }
        let cov = self.estimator.estimate(returns.returns())?;
        let weights = self.optimize_weights(&returns.mean_returns(), &cov)?;

        let portfolio = Portfolio::new(
            returns
                .symbols()
                .iter()
                .cloned()
                .zip(weights.iter().copied()),
        );
        info!(
            assets = portfolio.len(),
            observations = returns.len(),
            "portfolio optimized"
        );
        Ok(portfolio)
    }

    /// Optimize weights for mean vector `mean` and covariance `cov`.
    pub fn optimize_weights(
        &self,
        mean: &Array1<f64>,
        cov: &Array2<f64>,
    ) -> Result<Array1<f64>, OptimizationError> {
        self.config.validate()?;
        let n = mean.len();
        let (lo, hi) = (self.config.min_weight, self.config.max_weight);
        if !self.config.is_feasible(n) {
            return Err(OptimizationError::InfeasibleBounds {
                assets: n,
                min_weight: lo,
                max_weight: hi,
            });
        }
        if cov.dim() != (n, n) {
            return Err(OptimizationError::InvalidConfig(format!(
                "covariance is {:?}, expected {}x{}",
                cov.dim(),
                n,
                n
            )));
        }

        let x0 = vec![1.0 / n as f64; n];
        let step = (0.5 * (hi - lo)).max(1e-3);
        let mut simplex = Vec::with_capacity(n + 1);
        simplex.push(x0.clone());
        for i in 0..n {
            let mut vertex = x0.clone();
            vertex[i] += step;
            simplex.push(vertex);
        }

        let cost = SharpeCost {
            mean: mean.clone(),
            cov: cov.clone(),
            risk_free: self.config.risk_free_rate,
            min_weight: lo,
            max_weight: hi,
        };
        let solver = NelderMead::new(simplex)
            .with_sd_tolerance(self.config.tolerance)
            .map_err(|e| OptimizationError::OptimizationFailed(e.to_string()))?;
        let result = Executor::new(cost, solver)
            .configure(|state| state.max_iters(self.config.max_iterations))
            .run()
            .map_err(|e| OptimizationError::OptimizationFailed(e.to_string()))?;

        let state = result.state();
        match state.get_termination_reason() {
            Some(TerminationReason::SolverConverged) => {}
            other => {
                return Err(OptimizationError::OptimizationFailed(format!(
                    "solver stopped after {} iterations: {:?}",
                    state.get_iter(),
                    other
                )));
            }
        }
        let best = state
            .get_best_param()
            .ok_or_else(|| OptimizationError::OptimizationFailed("no solution".to_string()))?;
        debug!(
            iterations = state.get_iter(),
            sharpe = -state.get_best_cost(),
            "solver converged"
        );

        let weights = Array1::from(project_capped_simplex(best, lo, hi));
        let total = weights.sum();
        let in_bounds = weights
            .iter()
            .all(|w| *w >= lo - WEIGHT_TOLERANCE && *w <= hi + WEIGHT_TOLERANCE);
        if (total - 1.0).abs() > WEIGHT_TOLERANCE || !in_bounds {
            return Err(OptimizationError::OptimizationFailed(format!(
                "solution violates constraints (sum {})",
                total
            )));
        }
        Ok(weights)
    }
}
