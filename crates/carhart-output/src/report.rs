//! Run reports: the final portfolio with its metrics and every dropped symbol.

use carhart_data::{DroppedSymbol, ReportingPeriod, Stage};
use carhart_model::{Acceptance, ScreeningOutcome, Thresholds};
use carhart_risk::{Portfolio, PortfolioMetrics};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::Path;
use thiserror::Error;

/// Errors that can occur during report generation.
#[derive(Debug, Error)]
pub enum ReportError {
    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Summary of one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    /// Quarter the portfolio is built for.
    pub investment_period: ReportingPeriod,

    /// Quarter the factors and regressions were estimated on.
    pub analysis_period: ReportingPeriod,

    /// Market index used for excess returns and betas.
    pub market_index: String,

    /// Report generation timestamp.
    pub generated_at: DateTime<Utc>,

    /// Symbols in the input universe.
    pub universe_size: usize,

    /// Symbols with a regression result.
    pub fitted: usize,

    /// Screened symbols with the round each was accepted in.
    pub selected: Vec<Acceptance>,

    /// Screening thresholds in force in the last round.
    pub thresholds: Thresholds,

    /// Screening rounds scanned.
    pub screening_rounds: usize,

    /// Optimized weights.
    pub portfolio: Portfolio,

    /// Risk metrics of the optimized portfolio.
    pub metrics: PortfolioMetrics,

    /// Every symbol dropped along the way, with the reason.
    pub dropped: Vec<DroppedSymbol>,
}

impl RunReport {
    /// Create a report from a run's outputs.
    pub fn new(
        investment_period: ReportingPeriod,
        market_index: impl Into<String>,
        screening: &ScreeningOutcome,
        portfolio: Portfolio,
        metrics: PortfolioMetrics,
    ) -> Self {
        Self {
            investment_period,
            analysis_period: investment_period.previous(),
            market_index: market_index.into(),
            generated_at: Utc::now(),
            universe_size: 0,
            fitted: 0,
            selected: screening.accepted.clone(),
            thresholds: screening.thresholds,
            screening_rounds: screening.rounds,
            portfolio,
            metrics,
            dropped: Vec::new(),
        }
    }

    /// Set the universe and fitted counts.
    pub const fn with_counts(mut self, universe_size: usize, fitted: usize) -> Self {
        self.universe_size = universe_size;
        self.fitted = fitted;
        self
    }

    /// Attach dropped symbols.
    pub fn with_dropped(mut self, dropped: impl IntoIterator<Item = DroppedSymbol>) -> Self {
        self.dropped.extend(dropped);
        self
    }

    /// Number of dropped symbols per stage.
    pub fn dropped_by_stage(&self) -> BTreeMap<Stage, usize> {
        let mut counts = BTreeMap::new();
        for d in &self.dropped {
            *counts.entry(d.stage).or_insert(0) += 1;
        }
        counts
    }

    /// Convert report to JSON string.
    pub fn to_json(&self) -> Result<String, ReportError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write the JSON report to `path`.
    pub fn write_json(&self, path: &Path) -> Result<(), ReportError> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    /// Render as Markdown.
    pub fn to_markdown(&self) -> String {
        let mut output = String::new();
        let m = &self.metrics;

        let _ = writeln!(output, "# Carhart Portfolio: {}\n", self.investment_period);
        let _ = writeln!(
            output,
            "**Analysis period:** {} | **Market:** {} | **Generated:** {}\n",
            self.analysis_period,
            self.market_index,
            self.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
        );

        output.push_str("## Holdings\n\n");
        output.push_str("| Symbol | Weight | Screening Round |\n");
        output.push_str("|--------|--------|-----------------|\n");
        for (symbol, weight) in self.portfolio.weights() {
            let round = self
                .selected
                .iter()
                .find(|a| &a.symbol == symbol)
                .map_or_else(|| "-".to_string(), |a| a.round.to_string());
            let _ = writeln!(output, "| {} | {:.2}% | {} |", symbol, weight * 100.0, round);
        }
        output.push('\n');

        output.push_str("## Risk Metrics\n\n");
        let _ = writeln!(
            output,
            "- **Expected Return:** {:.2}%",
            m.expected_return * 100.0
        );
        let _ = writeln!(output, "- **Volatility:** {:.2}%", m.volatility * 100.0);
        let _ = writeln!(
            output,
            "- **Sharpe Ratio:** {:.3} (r_f = {:.2}%)",
            m.sharpe_ratio,
            m.risk_free_rate * 100.0
        );
        let _ = writeln!(
            output,
            "- **Beta:** {:.3} weighted, {:.3} realized",
            m.beta_weighted, m.beta_realized
        );
        let _ = writeln!(
            output,
            "- **{:.0}% VaR ({}d):** {:.2}%",
            m.confidence_level * 100.0,
            m.horizon_days,
            m.value_at_risk * 100.0
        );
        match m.expected_shortfall {
            Some(es) => {
                let _ = writeln!(
                    output,
                    "- **{:.0}% ES ({}d):** {:.2}%",
                    m.confidence_level * 100.0,
                    m.horizon_days,
                    es * 100.0
                );
            }
            None => output.push_str("- **ES:** n/a (empty tail)\n"),
        }
        let _ = writeln!(output, "- **Observations:** {}\n", m.observations);

        output.push_str("## Screening\n\n");
        let _ = writeln!(
            output,
            "- **Universe:** {} symbols, {} fitted, {} selected",
            self.universe_size,
            self.fitted,
            self.selected.len()
        );
        let _ = writeln!(
            output,
            "- **Final thresholds:** adj. R² > {:.2}, intercept p < {:.2}, intercept > {:.2} after {} rounds\n",
            self.thresholds.min_adj_r_squared,
            self.thresholds.max_intercept_pvalue,
            self.thresholds.min_intercept,
            self.screening_rounds
        );

        if !self.dropped.is_empty() {
            output.push_str("## Dropped Symbols\n\n");
            output.push_str("| Symbol | Stage | Reason | Detail |\n");
            output.push_str("|--------|-------|--------|--------|\n");
            for d in &self.dropped {
                let _ = writeln!(
                    output,
                    "| {} | {} | {} | {} |",
                    d.symbol,
                    d.stage,
                    d.kind,
                    d.detail.replace('|', "\\|")
                );
            }
        }

        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use carhart_data::{FailureKind, Period};
    use rstest::{fixture, rstest};

    #[fixture]
    fn report() -> RunReport {
        let screening = ScreeningOutcome {
            accepted: vec![
                Acceptance {
                    symbol: "AAA".to_string(),
                    round: 0,
                },
                Acceptance {
                    symbol: "BBB".to_string(),
                    round: 2,
                },
            ],
            rejected: Vec::new(),
            rounds: 3,
            thresholds: Thresholds::initial(),
        };
        let metrics = PortfolioMetrics {
            expected_return: 0.12,
            volatility: 0.2,
            sharpe_ratio: 0.415,
            beta_weighted: 1.1,
            beta_realized: 1.05,
            value_at_risk: 0.021,
            expected_shortfall: None,
            confidence_level: 0.95,
            horizon_days: 1,
            risk_free_rate: 0.037,
            observations: 250,
        };
        RunReport::new(
            ReportingPeriod::new(2023, Period::Q2),
            "KOSPI",
            &screening,
            Portfolio::new([("AAA".to_string(), 0.6), ("BBB".to_string(), 0.4)]),
            metrics,
        )
        .with_counts(5, 4)
        .with_dropped([
            DroppedSymbol::new("CCC", Stage::Regression, FailureKind::DegenerateDesign, "MOM"),
            DroppedSymbol::new("DDD", Stage::Factor, FailureKind::NotFound, "prices|2023"),
            DroppedSymbol::new("EEE", Stage::Factor, FailureKind::NotFound, "prices"),
        ])
    }

    #[rstest]
    fn test_analysis_period_is_previous_quarter(report: RunReport) {
        assert_eq!(report.analysis_period, ReportingPeriod::new(2023, Period::Q1));
    }

    #[rstest]
    fn test_markdown_sections(report: RunReport) {
        let md = report.to_markdown();
        assert!(md.starts_with("# Carhart Portfolio: 2023_Q2"));
        assert!(md.contains("| AAA | 60.00% | 0 |"));
        assert!(md.contains("| BBB | 40.00% | 2 |"));
        assert!(md.contains("- **95% VaR (1d):** 2.10%"));
        assert!(md.contains("n/a (empty tail)"));
        assert!(md.contains("| CCC | regression | degenerate design | MOM |"));
        assert!(md.contains("prices\\|2023"));
    }

    #[rstest]
    fn test_json_roundtrip(report: RunReport) {
        let json = report.to_json().unwrap();
        let parsed: RunReport = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, report);
    }

    #[rstest]
    fn test_dropped_by_stage(report: RunReport) {
        let counts = report.dropped_by_stage();
        assert_eq!(counts[&Stage::Factor], 2);
        assert_eq!(counts[&Stage::Regression], 1);
        assert!(!counts.contains_key(&Stage::Screening));
    }
}
