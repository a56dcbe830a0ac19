//! Pipeline configuration.

use crate::error::{PipelineError, Result};
use carhart_factors::FactorConfig;
use carhart_model::ScreeningConfig;
use carhart_risk::{OptimizerConfig, RiskConfig};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Settings of a whole pipeline run.
///
/// Every section falls back to its defaults when omitted from JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Market index for excess returns and betas
    pub market_index: String,
    /// Number of securities to screen into the portfolio (default: 10)
    pub portfolio_size: usize,
    /// Factor construction
    pub factor: FactorConfig,
    /// Exposure screening
    pub screening: ScreeningConfig,
    /// Portfolio optimization
    pub optimizer: OptimizerConfig,
    /// Risk metrics
    pub risk: RiskConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            market_index: "코스피".to_string(),
            portfolio_size: 10,
            factor: FactorConfig::default(),
            screening: ScreeningConfig::default(),
            optimizer: OptimizerConfig::default(),
            risk: RiskConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Load and validate a JSON configuration file.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Check every section, and that a portfolio of `portfolio_size`
    /// securities can satisfy the weight bounds.
    pub fn validate(&self) -> Result<()> {
        if self.market_index.trim().is_empty() {
            return Err(PipelineError::InvalidConfig(
                "market_index must not be empty".to_string(),
            ));
        }
        self.factor.validate()?;
        self.screening.validate()?;
        self.optimizer.validate()?;
        self.risk.validate()?;
        if !self.optimizer.is_feasible(self.portfolio_size) {
            return Err(PipelineError::InvalidConfig(format!(
                "{} securities cannot satisfy weight bounds [{}, {}]",
                self.portfolio_size, self.optimizer.min_weight, self.optimizer.max_weight
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults_are_valid() {
        let config = PipelineConfig::default();
        assert_eq!(config.portfolio_size, 10);
        assert_eq!(config.optimizer.min_weight, 0.05);
        assert_eq!(config.risk.risk_free_rate, 0.037);
        config.validate().unwrap();
    }

    #[rstest]
    #[case(4, false)]
    #[case(5, true)]
    #[case(20, true)]
    #[case(21, false)]
    fn test_portfolio_size_must_fit_bounds(#[case] size: usize, #[case] valid: bool) {
        let config = PipelineConfig {
            portfolio_size: size,
            ..Default::default()
        };
        assert_eq!(config.validate().is_ok(), valid);
    }

    #[test]
    fn test_partial_json_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"market_index": "MARKET", "portfolio_size": 8, "risk": {{"confidence_level": 0.99}}}}"#
        )
        .unwrap();

        let config = PipelineConfig::from_json_file(file.path()).unwrap();
        assert_eq!(config.market_index, "MARKET");
        assert_eq!(config.portfolio_size, 8);
        assert_eq!(config.risk.confidence_level, 0.99);
        assert_eq!(config.risk.horizon_days, 1);
        assert_eq!(config.factor, FactorConfig::default());
    }

    #[test]
    fn test_invalid_json_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"risk": {{"confidence_level": 1.5}}}}"#).unwrap();
        assert!(matches!(
            PipelineConfig::from_json_file(file.path()),
            Err(PipelineError::Risk(_))
        ));

        assert!(matches!(
            PipelineConfig::from_json_file("/nonexistent/carhart.json"),
            Err(PipelineError::Io(_))
        ));
    }
}
