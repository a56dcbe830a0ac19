//! Pipeline errors.

use carhart_data::{DataError, FailureKind};
use carhart_factors::FactorError;
use carhart_model::ScreeningError;
use carhart_risk::{OptimizationError, RiskError};
use thiserror::Error;

/// Result type for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Failures that abort a pipeline run.
///
/// Per-symbol failures are not errors; they are recorded as dropped symbols.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Configuration rejected
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Configuration file could not be read
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration file could not be parsed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Data access error outside per-symbol work
    #[error(transparent)]
    Data(#[from] DataError),

    /// Market-wide factor construction failed
    #[error("Factor construction failed: {0}")]
    Factor(#[from] FactorError),

    /// Screening configuration rejected
    #[error(transparent)]
    Screening(#[from] ScreeningError),

    /// Portfolio optimization failed
    #[error("Optimization failed: {0}")]
    Optimization(#[from] OptimizationError),

    /// Risk computation failed
    #[error("Risk computation failed: {0}")]
    Risk(#[from] RiskError),
}

impl PipelineError {
    /// Failure classification.
    pub const fn kind(&self) -> FailureKind {
        match self {
            Self::Data(e) => e.kind(),
            Self::Factor(e) => e.kind(),
            Self::Optimization(e) => e.kind(),
            Self::Risk(e) => e.kind(),
            Self::InvalidConfig(_) | Self::Io(_) | Self::Json(_) | Self::Screening(_) => {
                FailureKind::DataError
            }
        }
    }
}
