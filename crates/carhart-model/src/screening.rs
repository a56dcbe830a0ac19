//! Exposure-quality screening with adaptive threshold relaxation.
//!
//! Candidates are scanned in symbol order. Each round accepts every remaining
//! symbol that clears the current thresholds until the slate is full; if it
//! is still short, the thresholds are relaxed by one step and only the
//! symbols not yet accepted are scanned again. Acceptance is monotonic: an
//! accepted symbol is never re-evaluated or displaced.

use crate::carhart::RegressionResult;
use crate::error::ScreeningError;
use carhart_data::{DroppedSymbol, FailureKind, Stage};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Screening thresholds, or the per-round relaxation step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    /// Adjusted R² must exceed this
    pub min_adj_r_squared: f64,
    /// Intercept p-value must be below this
    pub max_intercept_pvalue: f64,
    /// Intercept must exceed this
    pub min_intercept: f64,
}

impl Thresholds {
    /// Starting thresholds: adjusted R² > 0.50, p < 0.05, intercept > 0.
    pub const fn initial() -> Self {
        Self {
            min_adj_r_squared: 0.50,
            max_intercept_pvalue: 0.05,
            min_intercept: 0.0,
        }
    }

    /// Default relaxation step.
    pub const fn step() -> Self {
        Self {
            min_adj_r_squared: 0.05,
            max_intercept_pvalue: 0.01,
            min_intercept: 0.01,
        }
    }

    /// Whether `result` clears all three thresholds.
    pub fn admits(&self, result: &RegressionResult) -> bool {
        let Some(intercept) = result.intercept() else {
            return false;
        };
        result.adj_r_squared() > self.min_adj_r_squared
            && intercept.p_value < self.max_intercept_pvalue
            && intercept.coefficient > self.min_intercept
    }

    /// Thresholds loosened by one `step`.
    pub const fn relaxed(&self, step: &Self) -> Self {
        Self {
            min_adj_r_squared: self.min_adj_r_squared - step.min_adj_r_squared,
            max_intercept_pvalue: self.max_intercept_pvalue + step.max_intercept_pvalue,
            min_intercept: self.min_intercept - step.min_intercept,
        }
    }
}

impl Default for Thresholds {
    fn default() -> Self {
        Self::initial()
    }
}

/// Configuration for [`ScreeningFilter`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScreeningConfig {
    /// Thresholds of the first round
    pub initial: Thresholds,
    /// Relaxation applied after each short round
    pub step: Thresholds,
    /// Upper bound on scanning rounds
    pub max_rounds: usize,
}

impl Default for ScreeningConfig {
    fn default() -> Self {
        Self {
            initial: Thresholds::initial(),
            step: Thresholds::step(),
            max_rounds: 1000,
        }
    }
}

impl ScreeningConfig {
    /// Check the configuration is usable.
    pub fn validate(&self) -> Result<(), ScreeningError> {
        let step = &self.step;
        let parts = [
            step.min_adj_r_squared,
            step.max_intercept_pvalue,
            step.min_intercept,
        ];
        if parts.iter().any(|v| !v.is_finite() || *v < 0.0) {
            return Err(ScreeningError::InvalidConfig(
                "relaxation steps must be finite and non-negative".to_string(),
            ));
        }
        if parts.iter().all(|v| *v == 0.0) {
            return Err(ScreeningError::InvalidConfig(
                "at least one relaxation step must be positive".to_string(),
            ));
        }
        if self.max_rounds == 0 {
            return Err(ScreeningError::InvalidConfig(
                "max_rounds must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// A symbol accepted by the screen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Acceptance {
    /// Accepted symbol
    pub symbol: String,
    /// Round it was accepted in (0 = initial thresholds)
    pub round: usize,
}

/// Result of one screening run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScreeningOutcome {
    /// Accepted symbols in acceptance order
    pub accepted: Vec<Acceptance>,
    /// Symbols not selected, with reasons
    pub rejected: Vec<DroppedSymbol>,
    /// Number of rounds scanned
    pub rounds: usize,
    /// Thresholds in force in the last round
    pub thresholds: Thresholds,
}

impl ScreeningOutcome {
    /// Accepted symbols in acceptance order.
    pub fn selected(&self) -> Vec<String> {
        self.accepted.iter().map(|a| a.symbol.clone()).collect()
    }

    /// Number of accepted symbols.
    pub fn len(&self) -> usize {
        self.accepted.len()
    }

    /// Whether nothing was accepted.
    pub fn is_empty(&self) -> bool {
        self.accepted.is_empty()
    }
}

/// Selects a fixed number of well-fitted securities.
#[derive(Debug, Clone, Default)]
pub struct ScreeningFilter {
    config: ScreeningConfig,
}

impl ScreeningFilter {
    /// Create a filter with the default thresholds.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a filter with a custom configuration.
    pub const fn with_config(config: ScreeningConfig) -> Self {
        Self { config }
    }

    /// Active configuration.
    pub const fn config(&self) -> &ScreeningConfig {
        &self.config
    }

    /// Select `n` symbols from `results`.
    ///
    /// Results with a non-finite adjusted R² or intercept are rejected
    /// before the first round. Stops once `n` symbols are accepted, every
    /// candidate is accepted, or `max_rounds` rounds have run.
    pub fn select(&self, results: &BTreeMap<String, RegressionResult>, n: usize) -> ScreeningOutcome {
        let mut rejected = Vec::new();
        let mut remaining: Vec<&RegressionResult> = Vec::new();
        for (symbol, result) in results {
            let finite = result.adj_r_squared().is_finite()
                && result
                    .intercept()
                    .is_some_and(|c| c.coefficient.is_finite() && c.p_value.is_finite());
            if finite {
                remaining.push(result);
            } else {
                rejected.push(DroppedSymbol::new(
                    symbol.as_str(),
                    Stage::Screening,
                    FailureKind::NonFinite,
                    "adjusted R² or intercept statistics are not finite",
                ));
            }
        }

        let mut accepted: Vec<Acceptance> = Vec::new();
        let mut thresholds = self.config.initial;
        let mut rounds = 0;

        while accepted.len() < n && !remaining.is_empty() && rounds < self.config.max_rounds {
            if rounds > 0 {
                thresholds = thresholds.relaxed(&self.config.step);
            }
            let mut still_remaining = Vec::with_capacity(remaining.len());
            for result in remaining {
                if accepted.len() < n && thresholds.admits(result) {
                    accepted.push(Acceptance {
                        symbol: result.symbol.clone(),
                        round: rounds,
                    });
                } else {
                    still_remaining.push(result);
                }
            }
            debug!(
                round = rounds,
                accepted = accepted.len(),
                min_adj_r2 = thresholds.min_adj_r_squared,
                max_pvalue = thresholds.max_intercept_pvalue,
                min_intercept = thresholds.min_intercept,
                "screening round"
            );
            remaining = still_remaining;
            rounds += 1;
        }

        let detail = if accepted.len() >= n {
            "slate filled before acceptance".to_string()
        } else {
            format!("thresholds not met after {} rounds", rounds)
        };
        rejected.extend(remaining.into_iter().map(|result| {
            DroppedSymbol::new(
                result.symbol.as_str(),
                Stage::Screening,
                FailureKind::ThresholdNotMet,
                detail.as_str(),
            )
        }));
        rejected.sort_by(|a, b| a.symbol.cmp(&b.symbol));

        info!(
            target = n,
            selected = accepted.len(),
            rejected = rejected.len(),
            rounds,
            "screening complete"
        );

        ScreeningOutcome {
            accepted,
            rejected,
            rounds,
            thresholds,
        }
    }
}
