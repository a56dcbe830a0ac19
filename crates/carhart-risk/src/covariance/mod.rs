//! Covariance estimation for asset returns.

pub mod sample;
pub mod standardized;

pub use sample::SampleCovariance;
pub use standardized::StandardizedCovariance;

use ndarray::Array2;
use thiserror::Error;

/// Errors that can occur during covariance estimation
#[derive(Debug, Error)]
pub enum CovarianceError {
    /// Insufficient data for estimation
    #[error("Insufficient data: need at least {required} observations, got {actual}")]
    InsufficientData {
        /// Required number of observations
        required: usize,
        /// Actual number of observations
        actual: usize,
    },

    /// Invalid parameter
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

/// Trait for covariance matrix estimators
pub trait CovarianceEstimator: Send + Sync {
    /// Estimate the covariance matrix of asset returns
    ///
    /// # Arguments
    /// * `returns` - Matrix where each row is a date and each column an asset
    ///
    /// # Returns
    /// * Estimated covariance matrix (N x N where N is number of assets)
    fn estimate(&self, returns: &Array2<f64>) -> Result<Array2<f64>, CovarianceError>;
}

/// Sample covariance with `n - ddof` denominator.
pub(crate) fn covariance(returns: &Array2<f64>, ddof: usize) -> Result<Array2<f64>, CovarianceError> {
    let (n_periods, _) = returns.dim();
    if n_periods <= ddof {
        return Err(CovarianceError::InsufficientData {
            required: ddof + 1,
            actual: n_periods,
        });
    }
    let Some(means) = returns.mean_axis(ndarray::Axis(0)) else {
        return Err(CovarianceError::InsufficientData {
            required: 1,
            actual: 0,
        });
    };
    let centered = returns - &means;
    Ok(centered.t().dot(&centered) / (n_periods - ddof) as f64)
}
