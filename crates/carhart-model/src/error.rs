//! Error types for regression and screening.

use carhart_data::{DataError, FailureKind};
use carhart_factors::FactorError;
use thiserror::Error;

/// Result type for regression operations.
pub type Result<T> = std::result::Result<T, RegressionError>;

/// Errors that can occur while fitting a regression.
#[derive(Debug, Error)]
pub enum RegressionError {
    /// Fewer joined observations than parameters
    #[error("Insufficient data: need at least {required} observations, got {actual}")]
    InsufficientData {
        /// Required number of observations
        required: usize,
        /// Actual number of observations
        actual: usize,
    },

    /// A regressor is constant or the design is singular
    #[error("Degenerate design: {0}")]
    DegenerateDesign(String),

    /// Dimension mismatch between regressand and design
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Expected dimension
        expected: usize,
        /// Actual dimension
        actual: usize,
    },

    /// Factor construction failed
    #[error(transparent)]
    Factor(#[from] FactorError),

    /// Data access or alignment failed
    #[error(transparent)]
    Data(#[from] DataError),
}

impl RegressionError {
    /// Classify this error for dropped-symbol reporting.
    pub const fn kind(&self) -> FailureKind {
        match self {
            Self::InsufficientData { .. } => FailureKind::InsufficientData,
            Self::DegenerateDesign(_) | Self::DimensionMismatch { .. } => {
                FailureKind::DegenerateDesign
            }
            Self::Factor(e) => e.kind(),
            Self::Data(e) => e.kind(),
        }
    }
}

/// Errors raised by screening configuration.
#[derive(Debug, Error)]
pub enum ScreeningError {
    /// Invalid configuration
    #[error("Invalid screening configuration: {0}")]
    InvalidConfig(String),
}
