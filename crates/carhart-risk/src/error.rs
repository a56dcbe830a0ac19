//! Error types for return preparation and risk analytics.

use crate::covariance::CovarianceError;
use carhart_data::{DataError, FailureKind};
use thiserror::Error;

/// Result type for risk operations.
pub type Result<T> = std::result::Result<T, RiskError>;

/// Errors raised while preparing returns or computing risk metrics.
#[derive(Debug, Error)]
pub enum RiskError {
    /// Not enough return observations
    #[error("Insufficient data: need at least {required} observations, got {actual}")]
    InsufficientData {
        /// Required number of observations
        required: usize,
        /// Actual number of observations
        actual: usize,
    },

    /// No return at or below −VaR, so Expected Shortfall is undefined
    #[error("No tail observations at or below -VaR {var} (confidence {confidence})")]
    NoTailObservations {
        /// One-day VaR used as the threshold
        var: f64,
        /// Confidence level
        confidence: f64,
    },

    /// Portfolio volatility is zero or not finite
    #[error("Portfolio volatility is degenerate: {0}")]
    DegenerateVolatility(f64),

    /// Market return variance is zero or not finite, so betas are undefined
    #[error("Market return variance is degenerate: {0}")]
    DegenerateMarket(f64),

    /// A symbol is missing from the return matrix
    #[error("Symbol {0} missing from return matrix")]
    MissingSymbol(String),

    /// Dimension mismatch
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Expected dimension
        expected: usize,
        /// Actual dimension
        actual: usize,
    },

    /// Invalid parameter
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Covariance estimation error
    #[error("Covariance error: {0}")]
    Covariance(#[from] CovarianceError),

    /// Data access error
    #[error(transparent)]
    Data(#[from] DataError),
}

impl RiskError {
    /// Classify this error for dropped-symbol reporting.
    pub const fn kind(&self) -> FailureKind {
        match self {
            Self::InsufficientData { .. } | Self::NoTailObservations { .. } => {
                FailureKind::InsufficientData
            }
            Self::DegenerateVolatility(_) | Self::DegenerateMarket(_) => FailureKind::NonFinite,
            Self::Data(e) => e.kind(),
            Self::MissingSymbol(_) => FailureKind::NotFound,
            Self::DimensionMismatch { .. } | Self::InvalidParameter(_) | Self::Covariance(_) => {
                FailureKind::DataError
            }
        }
    }
}
