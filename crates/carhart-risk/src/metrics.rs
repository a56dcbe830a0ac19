//! Portfolio risk metrics.
//!
//! All quantities come from a window of daily returns:
//!
//! - expected return: `Σ w_i · mean(r_i) · 252`
//! - volatility: `sqrt(wᵀ (Σ · 252) w)`
//! - Sharpe ratio: `(return − r_f) / volatility`
//! - beta, twice: the weighted sum of security betas against the market, and
//!   the beta of the realized portfolio return series
//! - historical VaR and Expected Shortfall at a confidence level, scaled to a
//!   horizon of `t` days by `sqrt(t)`

use crate::covariance::{CovarianceEstimator, SampleCovariance};
use crate::error::{Result, RiskError};
use crate::optimizer::Portfolio;
use crate::returns::ReturnMatrix;
use carhart_data::stats::{mean, percentile, sample_covariance, sample_variance};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Risk analytics configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskConfig {
    /// Annual risk-free rate used by the Sharpe ratio (default: 0.037)
    pub risk_free_rate: f64,
    /// VaR/ES confidence level in (0, 1) (default: 0.95)
    pub confidence_level: f64,
    /// VaR/ES horizon in days (default: 1)
    pub horizon_days: u32,
    /// Trading days per year (default: 252)
    pub trading_days: f64,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            risk_free_rate: 0.037,
            confidence_level: 0.95,
            horizon_days: 1,
            trading_days: 252.0,
        }
    }
}

impl RiskConfig {
    /// Check the configuration is usable.
    pub fn validate(&self) -> Result<()> {
        if !(self.confidence_level > 0.0 && self.confidence_level < 1.0) {
            return Err(RiskError::InvalidParameter(format!(
                "confidence level {} must lie in (0, 1)",
                self.confidence_level
            )));
        }
        if self.horizon_days == 0 {
            return Err(RiskError::InvalidParameter(
                "horizon must be at least one day".to_string(),
            ));
        }
        if self.trading_days.is_nan() || self.trading_days <= 0.0 {
            return Err(RiskError::InvalidParameter(
                "trading days must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Historical Value-at-Risk.
///
/// `−percentile(returns, (1 − confidence) · 100) · sqrt(horizon)`; `None`
/// for an empty sample or a confidence outside `[0, 1]`.
pub fn historical_var(returns: &[f64], confidence: f64, horizon_days: u32) -> Option<f64> {
    let cutoff = percentile(returns, (1.0 - confidence) * 100.0)?;
    Some(-cutoff * f64::from(horizon_days).sqrt())
}

/// Historical Expected Shortfall for a one-day `var`.
///
/// The negated mean of every return at or below `−var`, scaled by
/// `sqrt(horizon)`. `None` when no return lies in the tail.
pub fn expected_shortfall(returns: &[f64], var: f64, horizon_days: u32) -> Option<f64> {
    let tail: Vec<f64> = returns.iter().copied().filter(|r| *r <= -var).collect();
    if tail.is_empty() {
        return None;
    }
    Some(-mean(&tail) * f64::from(horizon_days).sqrt())
}

/// Risk metrics of one portfolio over one return window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioMetrics {
    /// Annualized expected return
    pub expected_return: f64,
    /// Annualized volatility
    pub volatility: f64,
    /// Sharpe ratio
    pub sharpe_ratio: f64,
    /// Weighted sum of per-security betas
    pub beta_weighted: f64,
    /// Beta of the realized portfolio return series
    pub beta_realized: f64,
    /// Value-at-Risk over the horizon
    pub value_at_risk: f64,
    /// Expected Shortfall over the horizon; `None` when the tail is empty
    pub expected_shortfall: Option<f64>,
    /// Confidence level of VaR and ES
    pub confidence_level: f64,
    /// Horizon of VaR and ES in days
    pub horizon_days: u32,
    /// Risk-free rate used by the Sharpe ratio
    pub risk_free_rate: f64,
    /// Number of daily observations
    pub observations: usize,
}

/// Computes [`PortfolioMetrics`].
#[derive(Debug, Clone, Default)]
pub struct RiskAnalytics {
    config: RiskConfig,
}

impl RiskAnalytics {
    /// Create with a configuration.
    pub const fn new(config: RiskConfig) -> Self {
        Self { config }
    }

    /// Active configuration.
    pub const fn config(&self) -> &RiskConfig {
        &self.config
    }

    /// Annualized expected return `Σ w_i · mean(r_i) · trading_days`.
    pub fn portfolio_return(&self, weights: &Array1<f64>, returns: &Array2<f64>) -> Result<f64> {
        check_weights(weights, returns)?;
        let means = returns
            .mean_axis(ndarray::Axis(0))
            .ok_or(RiskError::InsufficientData {
                required: 1,
                actual: 0,
            })?;
        Ok(weights.dot(&(means * self.config.trading_days)))
    }

    /// Annualized volatility `sqrt(wᵀ (Σ · trading_days) w)`.
    pub fn portfolio_volatility(&self, weights: &Array1<f64>, returns: &Array2<f64>) -> Result<f64> {
        check_weights(weights, returns)?;
        let cov = SampleCovariance::annualized(self.config.trading_days).estimate(returns)?;
        Ok(weights.dot(&cov.dot(weights)).sqrt())
    }

    /// `(portfolio_return − risk_free_rate) / volatility`.
    pub fn sharpe_ratio(&self, portfolio_return: f64, volatility: f64) -> Result<f64> {
        if !(volatility > 0.0 && volatility.is_finite()) {
            return Err(RiskError::DegenerateVolatility(volatility));
        }
        Ok((portfolio_return - self.config.risk_free_rate) / volatility)
    }

    /// Beta of each security: `cov(r_i, m) / var(m)`.
    pub fn security_betas(&self, returns: &Array2<f64>, market: &[f64]) -> Result<Array1<f64>> {
        let market_var = market_variance(returns, market)?;
        Ok(returns
            .columns()
            .into_iter()
            .map(|column| sample_covariance(&column.to_vec(), market) / market_var)
            .collect())
    }

    /// Weighted sum of security betas.
    pub fn weighted_beta(
        &self,
        weights: &Array1<f64>,
        returns: &Array2<f64>,
        market: &[f64],
    ) -> Result<f64> {
        check_weights(weights, returns)?;
        Ok(weights.dot(&self.security_betas(returns, market)?))
    }

    /// Beta of the realized portfolio return series.
    pub fn realized_beta(
        &self,
        weights: &Array1<f64>,
        returns: &Array2<f64>,
        market: &[f64],
    ) -> Result<f64> {
        check_weights(weights, returns)?;
        let market_var = market_variance(returns, market)?;
        let portfolio = returns.dot(weights).to_vec();
        Ok(sample_covariance(&portfolio, market) / market_var)
    }

    /// VaR of a daily return series at the configured confidence and horizon.
    pub fn value_at_risk(&self, portfolio_returns: &[f64]) -> Result<f64> {
        historical_var(
            portfolio_returns,
            self.config.confidence_level,
            self.config.horizon_days,
        )
        .ok_or(RiskError::InsufficientData {
            required: 1,
            actual: portfolio_returns.len(),
        })
    }

    /// Expected Shortfall of a daily return series.
    ///
    /// # Errors
    /// [`RiskError::NoTailObservations`] when no return lies at or below the
    /// one-day VaR.
    pub fn expected_shortfall(&self, portfolio_returns: &[f64]) -> Result<f64> {
        let var = historical_var(portfolio_returns, self.config.confidence_level, 1).ok_or(
            RiskError::InsufficientData {
                required: 1,
                actual: portfolio_returns.len(),
            },
        )?;
        expected_shortfall(portfolio_returns, var, self.config.horizon_days).ok_or(
            RiskError::NoTailObservations {
                var,
                confidence: self.config.confidence_level,
            },
        )
    }

    /// All metrics of `portfolio` over `returns`, against `market`.
    ///
    /// `returns` must hold every symbol of the portfolio; `market` holds the
    /// market's daily returns on the same dates.
    pub fn analyze(
        &self,
        portfolio: &Portfolio,
        returns: &ReturnMatrix,
        market: &[f64],
    ) -> Result<PortfolioMetrics> {
        self.config.validate()?;
        if returns.len() < 2 {
            return Err(RiskError::InsufficientData {
                required: 2,
                actual: returns.len(),
            });
        }
        let symbols = portfolio.symbols();
        let held = returns.select(&symbols)?;
        let weights: Array1<f64> = symbols
            .iter()
            .map(|s| portfolio.weight(s).unwrap_or(0.0))
            .collect();
        let matrix = held.returns();

        let expected_return = self.portfolio_return(&weights, matrix)?;
        let volatility = self.portfolio_volatility(&weights, matrix)?;
        let sharpe_ratio = self.sharpe_ratio(expected_return, volatility)?;
        let beta_weighted = self.weighted_beta(&weights, matrix, market)?;
        let beta_realized = self.realized_beta(&weights, matrix, market)?;

        let daily = matrix.dot(&weights).to_vec();
        let value_at_risk = self.value_at_risk(&daily)?;
        let expected_shortfall = match self.expected_shortfall(&daily) {
            Ok(es) => Some(es),
            Err(RiskError::NoTailObservations { var, .. }) => {
                debug!(var, "no tail observations for expected shortfall");
                None
            }
            Err(e) => return Err(e),
        };

        Ok(PortfolioMetrics {
            expected_return,
            volatility,
            sharpe_ratio,
            beta_weighted,
            beta_realized,
            value_at_risk,
            expected_shortfall,
            confidence_level: self.config.confidence_level,
            horizon_days: self.config.horizon_days,
            risk_free_rate: self.config.risk_free_rate,
            observations: returns.len(),
        })
    }
}

fn check_weights(weights: &Array1<f64>, returns: &Array2<f64>) -> Result<()> {
    if weights.len() != returns.ncols() {
        return Err(RiskError::DimensionMismatch {
            expected: returns.ncols(),
            actual: weights.len(),
        });
    }
    Ok(())
}

/// Sample variance of `market`, checked against the return matrix.
fn market_variance(returns: &Array2<f64>, market: &[f64]) -> Result<f64> {
    if market.len() != returns.nrows() {
        return Err(RiskError::DimensionMismatch {
            expected: returns.nrows(),
            actual: market.len(),
        });
    }
    if market.len() < 2 {
        return Err(RiskError::InsufficientData {
            required: 2,
            actual: market.len(),
        });
    }
    let variance = sample_variance(market);
    if !(variance > 0.0 && variance.is_finite()) {
        return Err(RiskError::DegenerateMarket(variance));
    }
    Ok(variance)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};
    use ndarray::array;
    use rstest::rstest;

    fn sample() -> Vec<f64> {
        vec![
            -0.05, 0.01, 0.02, -0.01, 0.03, -0.02, 0.00, 0.015, -0.035, 0.025,
        ]
    }

    #[rstest]
    #[case(0.90)]
    #[case(0.95)]
    #[case(0.99)]
    fn test_var_is_negated_percentile(#[case] confidence: f64) {
        let returns = sample();
        let var = historical_var(&returns, confidence, 1).unwrap();
        let expected = -percentile(&returns, (1.0 - confidence) * 100.0).unwrap();
        assert_eq!(var, expected);
    }

    #[test]
    fn test_var_horizon_scaling() {
        let returns = sample();
        let one = historical_var(&returns, 0.95, 1).unwrap();
        let ten = historical_var(&returns, 0.95, 10).unwrap();
        assert_relative_eq!(ten, one * 10.0_f64.sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn test_es_is_tail_mean() {
        let returns = sample();
        let var = historical_var(&returns, 0.90, 1).unwrap();
        let tail: Vec<f64> = returns.iter().copied().filter(|r| *r <= -var).collect();
        let es = expected_shortfall(&returns, var, 1).unwrap();
        assert_relative_eq!(es, -mean(&tail), epsilon = 1e-15);
        assert!(!tail.is_empty());
    }

    #[test]
    fn test_es_without_tail() {
        // every return is above −VaR when VaR is very negative
        let returns = vec![0.01, 0.02, 0.03];
        assert_eq!(expected_shortfall(&returns, -0.05, 1), None);

        let analytics = RiskAnalytics::default();
        let positive = vec![0.01; 5];
        // −VaR = 0.01 and every return equals it, so the tail is the whole sample
        assert_relative_eq!(analytics.expected_shortfall(&positive).unwrap(), -0.01);
    }

    #[test]
    fn test_empty_samples() {
        let analytics = RiskAnalytics::default();
        let err = expected_shortfall(&[f64::NAN], 0.0, 1);
        assert_eq!(err, None);
        assert!(matches!(
            analytics.expected_shortfall(&[]),
            Err(RiskError::InsufficientData { .. })
        ));
    }

    #[test]
    fn test_betas() {
        let returns = array![[0.01, 0.02], [0.02, 0.04], [-0.01, -0.02], [0.00, 0.00]];
        let market = vec![0.01, 0.02, -0.01, 0.00];
        let analytics = RiskAnalytics::default();

        let betas = analytics.security_betas(&returns, &market).unwrap();
        assert_relative_eq!(betas[0], 1.0, epsilon = 1e-12);
        assert_relative_eq!(betas[1], 2.0, epsilon = 1e-12);

        let w = array![0.5, 0.5];
        let weighted = analytics.weighted_beta(&w, &returns, &market).unwrap();
        let realized = analytics.realized_beta(&w, &returns, &market).unwrap();
        assert_relative_eq!(weighted, 1.5, epsilon = 1e-12);
        assert_abs_diff_eq!(weighted, realized, epsilon = 1e-12);
    }

    #[rstest]
    #[case(vec![0.5, 0.5, 0.5, 0.5])]
    #[case(vec![0.01, f64::NAN, -0.01, 0.0])]
    fn test_degenerate_market_rejected(#[case] market: Vec<f64>) {
        let returns = array![[0.01, 0.02], [0.02, 0.04], [-0.01, -0.02], [0.00, 0.00]];
        let w = array![0.5, 0.5];
        let analytics = RiskAnalytics::default();
        assert!(matches!(
            analytics.security_betas(&returns, &market),
            Err(RiskError::DegenerateMarket(_))
        ));
        assert!(matches!(
            analytics.realized_beta(&w, &returns, &market),
            Err(RiskError::DegenerateMarket(_))
        ));
        assert!(matches!(
            analytics.weighted_beta(&w, &returns, &market),
            Err(RiskError::DegenerateMarket(_))
        ));
    }

    #[test]
    fn test_zero_volatility_rejected() {
        let analytics = RiskAnalytics::default();
        assert!(matches!(
            analytics.sharpe_ratio(0.1, 0.0),
            Err(RiskError::DegenerateVolatility(_))
        ));
    }

    #[rstest]
    #[case(RiskConfig { confidence_level: 1.0, ..Default::default() })]
    #[case(RiskConfig { horizon_days: 0, ..Default::default() })]
    #[case(RiskConfig { trading_days: 0.0, ..Default::default() })]
    fn test_invalid_config(#[case] config: RiskConfig) {
        assert!(config.validate().is_err());
    }
}
