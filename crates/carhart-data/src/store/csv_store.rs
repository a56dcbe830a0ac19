//! File-backed store over the on-disk CSV layout.
//!
//! ```text
//! <root>/prices/<SYMBOL>/<YYYY>.<MM>/<YYYY>.<MM>_<SYMBOL>.csv
//! <root>/indices/<NAME>/<YYYY>/<YYYY>_<NAME>.csv
//! <root>/market_cap/<YYYY>/<SYMBOL>/<Qn>_<SYMBOL>_market_cap.csv
//! <root>/statements/<SYMBOL>/**/*.csv
//! <root>/rates/<YYYY>/<YYYY>_bond_yield.csv
//! ```
//!
//! Price, index, market-cap and rate files are read by column position since
//! their headers may be localized. Statements are read by header name.

use super::TimeSeriesStore;
use super::parse::{field_opt, field_or_nan, parse_amount, parse_date};
use crate::error::{DataError, Result};
use crate::period::{Period, ReportingPeriod};
use crate::types::{
    AccountEntry, FinancialSnapshot, MarketCapPoint, PricePoint, PriceSeries, RatePoint,
};
use csv::{ReaderBuilder, StringRecord};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const PRICES_DIR: &str = "prices";
const INDICES_DIR: &str = "indices";
const MARKET_CAP_DIR: &str = "market_cap";
const STATEMENTS_DIR: &str = "statements";
const RATES_DIR: &str = "rates";

/// [`TimeSeriesStore`] reading the CSV directory layout under a root.
#[derive(Debug, Clone)]
pub struct CsvStore {
    root: PathBuf,
}

impl CsvStore {
    /// Create a store rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of one month of security prices.
    pub fn price_file(&self, symbol: &str, year: i32, month: u32) -> PathBuf {
        let stamp = format!("{}.{:02}", year, month);
        self.root
            .join(PRICES_DIR)
            .join(symbol)
            .join(&stamp)
            .join(format!("{}_{}.csv", stamp, symbol))
    }

    /// Path of one year of index prices.
    pub fn index_file(&self, name: &str, year: i32) -> PathBuf {
        self.root
            .join(INDICES_DIR)
            .join(name)
            .join(year.to_string())
            .join(format!("{}_{}.csv", year, name))
    }

    /// Path of one quarter of market capitalization.
    pub fn market_cap_file(&self, symbol: &str, period: ReportingPeriod) -> PathBuf {
        self.root
            .join(MARKET_CAP_DIR)
            .join(period.year.to_string())
            .join(symbol)
            .join(format!("{}_{}_market_cap.csv", period.period, symbol))
    }

    /// Path of one year of risk-free yields.
    pub fn rates_file(&self, year: i32) -> PathBuf {
        self.root
            .join(RATES_DIR)
            .join(year.to_string())
            .join(format!("{}_bond_yield.csv", year))
    }

    fn read_records(path: &Path) -> Result<Vec<StringRecord>> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_path(path)?;
        let mut records = Vec::new();
        for record in reader.records() {
            records.push(record?);
        }
        Ok(records)
    }

    fn parse_price_row(record: &StringRecord, with_index_fields: bool) -> Result<PricePoint> {
        let raw_date = record
            .get(0)
            .ok_or_else(|| DataError::Parse("Missing date".to_string()))?;
        let (transaction_value, market_cap) = if with_index_fields {
            (field_opt(record, 6)?, field_opt(record, 7)?)
        } else {
            (None, None)
        };
        Ok(PricePoint {
            date: parse_date(raw_date)?,
            open: field_or_nan(record, 1)?,
            high: field_or_nan(record, 2)?,
            low: field_or_nan(record, 3)?,
            close: field_or_nan(record, 4)?,
            volume: field_or_nan(record, 5)?,
            transaction_value,
            market_cap,
        })
    }

    fn read_security_prices(&self, symbol: &str, period: ReportingPeriod) -> Result<PriceSeries> {
        let mut points = Vec::new();
        let mut found = 0usize;
        for (year, month) in period.months() {
            let path = self.price_file(symbol, year, month);
            if !path.is_file() {
                warn!(symbol, year, month, path = %path.display(), "missing monthly price file");
                continue;
            }
            found += 1;
            for record in Self::read_records(&path)? {
                points.push(Self::parse_price_row(&record, false)?);
            }
        }

        if found == 0 {
            return Err(DataError::not_found(format!("prices for {} in {}", symbol, period)));
        }
        let series = PriceSeries::new(symbol, points).within(&period);
        debug!(symbol, %period, rows = series.len(), "loaded security prices");
        Ok(series)
    }

    fn list_dirs(dir: &Path) -> Result<Vec<String>> {
        if !dir.is_dir() {
            return Ok(Vec::new());
        }
        let mut names = Vec::new();
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();
        Ok(names)
    }

    fn collect_csv_files(dir: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if path.is_dir() {
                Self::collect_csv_files(&path, out)?;
            } else if path.extension().is_some_and(|ext| ext == "csv") {
                out.push(path);
            }
        }
        Ok(())
    }

    fn statement_entries(
        path: &Path,
        fiscal_year: i32,
        period: Period,
    ) -> Result<Vec<AccountEntry>> {
        let mut reader = ReaderBuilder::new().flexible(true).from_path(path)?;
        let headers = reader.headers()?.clone();
        let position = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim() == name)
                .ok_or_else(|| {
                    DataError::Parse(format!("{}: missing column {}", path.display(), name))
                })
        };
        let year_col = position("bsns_year")?;
        let code_col = position("reprt_code")?;
        let id_col = position("account_id")?;
        let name_col = position("account_nm")?;
        let amount_col = position("thstrm_amount")?;

        let year = fiscal_year.to_string();
        let mut entries = Vec::new();
        for record in reader.records() {
            let record = record?;
            let matches = record.get(year_col).map(str::trim) == Some(year.as_str())
                && record.get(code_col).map(str::trim) == Some(period.report_code());
            if !matches {
                continue;
            }
            entries.push(AccountEntry {
                account_id: record.get(id_col).unwrap_or_default().trim().to_string(),
                account_name: record.get(name_col).unwrap_or_default().trim().to_string(),
                amount: match record.get(amount_col) {
                    Some(raw) => parse_amount(raw)?,
                    None => None,
                },
            });
        }
        Ok(entries)
    }
}

impl TimeSeriesStore for CsvStore {
    fn get_price_series(&self, symbol: &str, period: ReportingPeriod) -> Result<PriceSeries> {
        if self.root.join(PRICES_DIR).join(symbol).is_dir() {
            return self.read_security_prices(symbol, period);
        }
        self.get_index_series(symbol, period)
    }

    fn get_index_series(&self, name: &str, period: ReportingPeriod) -> Result<PriceSeries> {
        let path = self.index_file(name, period.year);
        if !path.is_file() {
            return Err(DataError::not_found(format!("index {} for {}", name, period.year)));
        }
        let mut points = Vec::new();
        for record in Self::read_records(&path)? {
            points.push(Self::parse_price_row(&record, true)?);
        }
        let series = PriceSeries::new(name, points).within(&period);
        if series.is_empty() {
            return Err(DataError::not_found(format!("index {} in {}", name, period)));
        }
        debug!(index = name, %period, rows = series.len(), "loaded index prices");
        Ok(series)
    }

    fn get_financial_snapshot(
        &self,
        symbol: &str,
        period: ReportingPeriod,
    ) -> Result<FinancialSnapshot> {
        let dir = self.root.join(STATEMENTS_DIR).join(symbol);
        if !dir.is_dir() {
            return Err(DataError::not_found(format!("statements for {}", symbol)));
        }
        let mut files = Vec::new();
        Self::collect_csv_files(&dir, &mut files)?;
        files.sort();

        let mut entries = Vec::new();
        for file in &files {
            entries.extend(Self::statement_entries(file, period.year, period.period)?);
        }
        if entries.is_empty() {
            return Err(DataError::not_found(format!(
                "statement for {} in {}",
                symbol, period
            )));
        }
        Ok(FinancialSnapshot::new(symbol, period.year, period.period, entries))
    }

    fn get_risk_free_series(&self, period: ReportingPeriod) -> Result<Vec<RatePoint>> {
        let path = self.rates_file(period.year);
        if !path.is_file() {
            return Err(DataError::not_found(format!("bond yields for {}", period.year)));
        }
        let mut points = Vec::new();
        for record in Self::read_records(&path)? {
            let raw_date = record
                .get(0)
                .ok_or_else(|| DataError::Parse("Missing date".to_string()))?;
            let date = parse_date(raw_date)?;
            if !period.contains(date) {
                continue;
            }
            let Some(bond_yield) = field_opt(&record, 1)? else {
                continue;
            };
            points.push(RatePoint {
                date,
                bond_yield,
                change: field_opt(&record, 2)?,
            });
        }
        points.sort_by_key(|p| p.date);
        points.dedup_by_key(|p| p.date);
        if points.is_empty() {
            return Err(DataError::not_found(format!("bond yields in {}", period)));
        }
        Ok(points)
    }

    fn get_market_cap_series(
        &self,
        symbol: &str,
        period: ReportingPeriod,
    ) -> Result<Vec<MarketCapPoint>> {
        let path = self.market_cap_file(symbol, period);
        if !path.is_file() {
            return Err(DataError::not_found(format!(
                "market cap for {} in {}",
                symbol, period
            )));
        }
        let mut points = Vec::new();
        for record in Self::read_records(&path)? {
            let raw_date = record
                .get(0)
                .ok_or_else(|| DataError::Parse("Missing date".to_string()))?;
            let Some(market_cap) = field_opt(&record, 1)? else {
                continue;
            };
            points.push(MarketCapPoint {
                date: parse_date(raw_date)?,
                market_cap,
                volume: field_opt(&record, 2)?,
                transaction_value: field_opt(&record, 3)?,
                shares_outstanding: field_opt(&record, 4)?,
            });
        }
        points.sort_by_key(|p| p.date);
        points.dedup_by_key(|p| p.date);
        Ok(points)
    }

    fn securities(&self) -> Result<Vec<String>> {
        Self::list_dirs(&self.root.join(PRICES_DIR))
    }

    fn indices(&self) -> Result<Vec<String>> {
        Self::list_dirs(&self.root.join(INDICES_DIR))
    }
}
