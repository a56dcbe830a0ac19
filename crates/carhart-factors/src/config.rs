//! Factor configuration.

use crate::error::{FactorError, Result};
use crate::excess::ExcessReturnConfig;
use crate::momentum::MomentumConfig;
use crate::size::SizeConfig;
use crate::value::ValueConfig;
use serde::{Deserialize, Serialize};

/// How the SMB spread is measured.
///
/// The default is [`SmbMeasure::Daily`]: the factor is the daily return of
/// the small-cap index minus that of the large-cap index, which is the
/// series the regressions expect. [`SmbMeasure::Cumulative`] differences the
/// compounded returns since the first day of the period instead, giving a
/// running spread that is not a daily return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SmbMeasure {
    /// Difference of daily returns
    #[default]
    Daily,
    /// Difference of cumulative returns since the start of the period
    Cumulative,
}

/// Settings for every factor the builder produces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FactorConfig {
    /// Trailing observations for momentum (default: 252)
    pub momentum_lookback: usize,
    /// Index tracking small-capitalization securities
    pub small_cap_index: String,
    /// Index tracking large-capitalization securities
    pub large_cap_index: String,
    /// Book-to-market quantile at or above which a security is High (default: 0.7)
    pub hml_high_quantile: f64,
    /// Book-to-market quantile at or below which a security is Low (default: 0.3)
    pub hml_low_quantile: f64,
    /// SMB spread measure (default: daily)
    pub smb_measure: SmbMeasure,
    /// Divisor converting the quoted yield to a fraction (default: 100)
    pub rate_divisor: f64,
}

impl Default for FactorConfig {
    fn default() -> Self {
        Self {
            momentum_lookback: 252,
            small_cap_index: "코스피 소형주".to_string(),
            large_cap_index: "코스피 대형주".to_string(),
            hml_high_quantile: 0.7,
            hml_low_quantile: 0.3,
            smb_measure: SmbMeasure::Daily,
            rate_divisor: 100.0,
        }
    }
}

impl FactorConfig {
    /// Check parameter ranges.
    pub fn validate(&self) -> Result<()> {
        if self.momentum_lookback == 0 {
            return Err(FactorError::InvalidConfig(
                "momentum_lookback must be positive".to_string(),
            ));
        }
        let ordered = 0.0 <= self.hml_low_quantile
            && self.hml_low_quantile <= self.hml_high_quantile
            && self.hml_high_quantile <= 1.0;
        if !ordered {
            return Err(FactorError::InvalidConfig(format!(
                "HML quantiles must satisfy 0 <= low ({}) <= high ({}) <= 1",
                self.hml_low_quantile, self.hml_high_quantile
            )));
        }
        if self.small_cap_index.is_empty() || self.large_cap_index.is_empty() {
            return Err(FactorError::InvalidConfig(
                "size indices must be named".to_string(),
            ));
        }
        if !(self.rate_divisor.is_finite() && self.rate_divisor > 0.0) {
            return Err(FactorError::InvalidConfig(format!(
                "rate_divisor must be positive, got {}",
                self.rate_divisor
            )));
        }
        Ok(())
    }

    /// SMB settings.
    pub fn size(&self) -> SizeConfig {
        SizeConfig {
            small_cap_index: self.small_cap_index.clone(),
            large_cap_index: self.large_cap_index.clone(),
            measure: self.smb_measure,
        }
    }

    /// HML settings.
    pub const fn value(&self) -> ValueConfig {
        ValueConfig {
            high_quantile: self.hml_high_quantile,
            low_quantile: self.hml_low_quantile,
        }
    }

    /// MOM settings.
    pub const fn momentum(&self) -> MomentumConfig {
        MomentumConfig {
            lookback: self.momentum_lookback,
        }
    }

    /// Excess-return settings.
    pub const fn excess(&self) -> ExcessReturnConfig {
        ExcessReturnConfig {
            rate_divisor: self.rate_divisor,
        }
    }
}
