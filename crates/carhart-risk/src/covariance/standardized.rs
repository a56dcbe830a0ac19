//! Standardized covariance with a unit diagonal.
//!
//! Each asset's returns are scaled to zero mean and unit variance (population
//! standard deviation), the sample covariance of the scaled returns is taken,
//! and every entry is divided by `sqrt(Σ_ii Σ_jj)`. The result is the
//! correlation matrix of the returns, free of scale differences between
//! assets.

use super::{CovarianceError, CovarianceEstimator, covariance};
use ndarray::{Array2, Axis};

/// Standardize, estimate, then normalize to a unit diagonal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StandardizedCovariance;

impl StandardizedCovariance {
    /// Scale columns to zero mean and unit population variance.
    ///
    /// A column with zero variance is only centered.
    pub fn standardize(returns: &Array2<f64>) -> Result<Array2<f64>, CovarianceError> {
        let Some(means) = returns.mean_axis(Axis(0)) else {
            return Err(CovarianceError::InsufficientData {
                required: 1,
                actual: 0,
            });
        };
        let scales = returns
            .std_axis(Axis(0), 0.0)
            .mapv(|s| if s == 0.0 || !s.is_finite() { 1.0 } else { s });
        Ok((returns - &means) / &scales)
    }
}

impl CovarianceEstimator for StandardizedCovariance {
    fn estimate(&self, returns: &Array2<f64>) -> Result<Array2<f64>, CovarianceError> {
        let scaled = Self::standardize(returns)?;
        let cov = covariance(&scaled, 1)?;
        let std = cov.diag().mapv(f64::sqrt);
        let n = cov.nrows();

        let normalized = Array2::from_shape_fn((n, n), |(i, j)| {
            let value = cov[[i, j]] / (std[i] * std[j]);
            if value.is_finite() { value } else { 0.0 }
        });
        Ok(normalized)
    }
}
