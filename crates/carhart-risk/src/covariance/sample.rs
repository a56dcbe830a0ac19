//! Plain sample covariance.

use super::{CovarianceError, CovarianceEstimator, covariance};
use ndarray::Array2;

/// Sample covariance of returns, optionally annualized.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleCovariance {
    /// Delta degrees of freedom (default 1)
    pub ddof: usize,
    /// Multiplier applied to the estimate, e.g. 252 to annualize daily data
    pub scale: f64,
}

impl Default for SampleCovariance {
    fn default() -> Self {
        Self {
            ddof: 1,
            scale: 1.0,
        }
    }
}

impl SampleCovariance {
    /// Daily covariance scaled by `trading_days`.
    pub const fn annualized(trading_days: f64) -> Self {
        Self {
            ddof: 1,
            scale: trading_days,
        }
    }
}

impl CovarianceEstimator for SampleCovariance {
    fn estimate(&self, returns: &Array2<f64>) -> Result<Array2<f64>, CovarianceError> {
        Ok(covariance(returns, self.ddof)? * self.scale)
    }
}
