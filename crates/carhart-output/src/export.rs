//! CSV and JSON exports of engine outputs.
//!
//! The canonical files are a `{symbol: weight}` portfolio JSON, a
//! `{symbol: RegressionResult}` JSON and one `Date,<FACTOR>` CSV per factor
//! series.

use carhart_data::FactorSeries;
use carhart_model::RegressionResult;
use carhart_risk::Portfolio;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

/// Errors that can occur during export operations.
#[derive(Debug, Error)]
pub enum ExportError {
    /// CSV serialization error.
    #[error("CSV serialization error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON serialization error.
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid format error.
    #[error("Invalid format: {0}")]
    InvalidFormat(String),
}

/// Export format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    /// Comma-separated values format.
    Csv,

    /// Compact JSON format.
    Json,

    /// Pretty-printed JSON format.
    PrettyJson,
}

impl ExportFormat {
    /// Get the file extension for this format.
    pub const fn extension(&self) -> &str {
        match self {
            Self::Csv => "csv",
            Self::Json | Self::PrettyJson => "json",
        }
    }
}

/// Regression results keyed by symbol.
pub type RegressionSet = BTreeMap<String, RegressionResult>;

/// Trait for exporting data in various formats.
pub trait Exporter {
    /// Export data to a string in the specified format.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    fn export_to_string(&self, format: ExportFormat) -> Result<String, ExportError>;

    /// Export data to a file in the specified format, creating parent
    /// directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or file writing fails.
    fn export_to_file(&self, path: &Path, format: ExportFormat) -> Result<(), ExportError> {
        let content = self.export_to_string(format)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = File::create(path)?;
        file.write_all(content.as_bytes())?;
        debug!(path = %path.display(), bytes = content.len(), "exported");
        Ok(())
    }
}

fn to_json<T: Serialize + ?Sized>(value: &T, format: ExportFormat) -> Result<String, ExportError> {
    match format {
        ExportFormat::Json => Ok(serde_json::to_string(value)?),
        ExportFormat::PrettyJson => Ok(serde_json::to_string_pretty(value)?),
        ExportFormat::Csv => Err(ExportError::InvalidFormat("CSV is not JSON".to_string())),
    }
}

fn finish(writer: csv::Writer<Vec<u8>>) -> Result<String, ExportError> {
    let bytes = writer.into_inner().map_err(|e| e.into_error())?;
    String::from_utf8(bytes).map_err(|e| ExportError::InvalidFormat(e.to_string()))
}

impl Exporter for Portfolio {
    fn export_to_string(&self, format: ExportFormat) -> Result<String, ExportError> {
        match format {
            ExportFormat::Csv => {
                let mut wtr = csv::Writer::from_writer(vec![]);
                wtr.write_record(["symbol", "weight"])?;
                for (symbol, weight) in self.weights() {
                    wtr.write_record([symbol.as_str(), weight.to_string().as_str()])?;
                }
                finish(wtr)
            }
            _ => to_json(self, format),
        }
    }
}

/// One coefficient of one regression, flattened for CSV export.
#[derive(Debug, Serialize)]
struct CoefficientRow<'a> {
    symbol: &'a str,
    regressor: String,
    coefficient: f64,
    std_error: f64,
    t_stat: f64,
    p_value: f64,
    conf_low: f64,
    conf_high: f64,
    adj_r_squared: f64,
    nobs: usize,
}

impl Exporter for RegressionSet {
    fn export_to_string(&self, format: ExportFormat) -> Result<String, ExportError> {
        match format {
            ExportFormat::Csv => {
                let mut wtr = csv::Writer::from_writer(vec![]);
                for (symbol, result) in self {
                    for c in &result.coefficients {
                        wtr.serialize(CoefficientRow {
                            symbol,
                            regressor: c.regressor.to_string(),
                            coefficient: c.coefficient,
                            std_error: c.std_error,
                            t_stat: c.t_stat,
                            p_value: c.p_value,
                            conf_low: c.conf_low,
                            conf_high: c.conf_high,
                            adj_r_squared: result.diagnostics.adj_r_squared,
                            nobs: result.diagnostics.nobs,
                        })?;
                    }
                }
                finish(wtr)
            }
            _ => to_json(self, format),
        }
    }
}

impl Exporter for FactorSeries {
    fn export_to_string(&self, format: ExportFormat) -> Result<String, ExportError> {
        match format {
            ExportFormat::Csv => {
                let mut wtr = csv::Writer::from_writer(vec![]);
                wtr.write_record(["Date", self.kind().column_name()])?;
                for (date, value) in self.points() {
                    wtr.write_record([date.format("%Y-%m-%d").to_string(), value.to_string()])?;
                }
                finish(wtr)
            }
            _ => to_json(self, format),
        }
    }
}

/// Write `{symbol: weight}` to `path`.
pub fn export_portfolio_json(portfolio: &Portfolio, path: &Path) -> Result<(), ExportError> {
    portfolio.export_to_file(path, ExportFormat::PrettyJson)
}

/// Write `{symbol: RegressionResult}` to `path`.
pub fn export_regressions_json(results: &RegressionSet, path: &Path) -> Result<(), ExportError> {
    results.export_to_file(path, ExportFormat::PrettyJson)
}

/// Write `Date,<FACTOR>` rows to `path`.
pub fn export_factor_series_csv(series: &FactorSeries, path: &Path) -> Result<(), ExportError> {
    series.export_to_file(path, ExportFormat::Csv)
}

#[cfg(test)]
mod tests {
    use super::*;
    use carhart_data::{FactorKey, FactorKind, Period, ReportingPeriod};
    use chrono::NaiveDate;

    fn portfolio() -> Portfolio {
        Portfolio::new([
            ("AAA".to_string(), 0.5),
            ("BBB".to_string(), 0.3),
            ("CCC".to_string(), 0.2),
        ])
    }

    fn hml() -> FactorSeries {
        let rp = ReportingPeriod::new(2023, Period::Q1);
        FactorSeries::new(
            FactorKey::market(FactorKind::Hml, rp),
            vec![
                (NaiveDate::from_ymd_opt(2023, 1, 3).unwrap(), 0.0125),
                (NaiveDate::from_ymd_opt(2023, 1, 2).unwrap(), -0.5),
            ],
        )
    }

    #[test]
    fn test_portfolio_json_is_flat_object() {
        let json = portfolio().export_to_string(ExportFormat::Json).unwrap();
        let parsed: BTreeMap<String, f64> = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.len(), 3);
        assert_eq!(parsed["AAA"], 0.5);
        assert!((parsed.values().sum::<f64>() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_portfolio_csv() {
        let csv = portfolio().export_to_string(ExportFormat::Csv).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "symbol,weight");
        assert_eq!(lines[1], "AAA,0.5");
        assert_eq!(lines.len(), 4);
    }

    #[test]
    fn test_factor_series_csv_header_names_factor() {
        let csv = hml().export_to_string(ExportFormat::Csv).unwrap();
        assert_eq!(csv, "Date,HML\n2023-01-02,-0.5\n2023-01-03,0.0125\n");
    }

    #[test]
    fn test_pretty_json_is_indented() {
        let json = hml().export_to_string(ExportFormat::PrettyJson).unwrap();
        assert!(json.contains("  "));
        assert!(json.contains("\"Hml\""));
    }

    #[test]
    fn test_empty_regression_set() {
        let results = RegressionSet::new();
        assert_eq!(results.export_to_string(ExportFormat::Json).unwrap(), "{}");
        assert_eq!(results.export_to_string(ExportFormat::Csv).unwrap(), "");
    }

    #[test]
    fn test_export_format_extension() {
        assert_eq!(ExportFormat::Csv.extension(), "csv");
        assert_eq!(ExportFormat::Json.extension(), "json");
        assert_eq!(ExportFormat::PrettyJson.extension(), "json");
    }
}
