//! Error types for factor construction.

use carhart_data::{DataError, FactorKind, FailureKind, ReportingPeriod};
use thiserror::Error;

/// Result type for factor operations.
pub type Result<T> = std::result::Result<T, FactorError>;

/// Errors that can occur while building factor series.
#[derive(Debug, Error)]
pub enum FactorError {
    /// Underlying data could not be read
    #[error(transparent)]
    Data(#[from] DataError),

    /// No security had the inputs a market-wide factor needs
    #[error("No eligible securities for {factor} in {period}")]
    NoEligibleSecurities {
        /// Factor being built
        factor: FactorKind,
        /// Period being built
        period: ReportingPeriod,
    },

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl FactorError {
    /// Whether the error means required input data does not exist.
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::Data(e) if e.is_not_found())
    }

    /// Classify this error for dropped-symbol reporting.
    pub const fn kind(&self) -> FailureKind {
        match self {
            Self::Data(e) => e.kind(),
            Self::NoEligibleSecurities { .. } => FailureKind::InsufficientData,
            Self::InvalidConfig(_) => FailureKind::DataError,
        }
    }
}
