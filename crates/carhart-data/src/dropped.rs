//! Records of symbols removed from a pipeline stage.
//!
//! Per-symbol failures are recovered locally: the symbol is removed from the
//! stage's output and a [`DroppedSymbol`] travels with the result instead.

use derive_more::Display;
use serde::{Deserialize, Serialize};

/// Pipeline stage at which a symbol was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, Serialize, Deserialize)]
pub enum Stage {
    /// Factor construction (HML inputs, MOM, excess returns)
    #[display("factor")]
    Factor,
    /// Four-factor regression
    #[display("regression")]
    Regression,
    /// Exposure-quality screening
    #[display("screening")]
    Screening,
    /// Price-window preparation for optimization
    #[display("optimization")]
    Optimization,
}

/// Failure classification shared by every stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
pub enum FailureKind {
    /// Input file or row missing
    #[display("not found")]
    NotFound,
    /// Too few joined observations
    #[display("insufficient data")]
    InsufficientData,
    /// Constant or collinear regressor
    #[display("degenerate design")]
    DegenerateDesign,
    /// Never met the screening thresholds
    #[display("threshold not met")]
    ThresholdNotMet,
    /// Statistics were NaN or infinite
    #[display("non-finite statistics")]
    NonFinite,
    /// Portfolio solver did not converge or bounds were infeasible
    #[display("optimization failed")]
    OptimizationFailed,
    /// Malformed input or storage failure
    #[display("data error")]
    DataError,
}

/// A symbol removed from one stage, with the reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DroppedSymbol {
    /// Symbol that was dropped
    pub symbol: String,
    /// Stage that dropped it
    pub stage: Stage,
    /// Failure classification
    pub kind: FailureKind,
    /// Human-readable detail
    pub detail: String,
}

impl DroppedSymbol {
    /// Create a new dropped-symbol record.
    pub fn new(
        symbol: impl Into<String>,
        stage: Stage,
        kind: FailureKind,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            stage,
            kind,
            detail: detail.into(),
        }
    }
}
