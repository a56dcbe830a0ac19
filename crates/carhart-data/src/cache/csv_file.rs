//! Factor series cached as CSV files.
//!
//! Layout: `<root>/<KIND>/<YYYY>/<Qn>[_<SYMBOL>]_<KIND>.csv` with columns
//! `Date,<KIND>`.

use super::Cache;
use crate::error::{DataError, Result};
use crate::series::{FactorKey, FactorSeries};
use crate::store::parse_date;
use csv::{ReaderBuilder, Writer};
use std::fs;
use std::path::{Path, PathBuf};

/// File-backed cache for [`FactorSeries`].
#[derive(Debug, Clone)]
pub struct CsvSeriesCache {
    root: PathBuf,
}

impl CsvSeriesCache {
    /// Create a cache rooted at `root`. Directories are created on write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File holding the series for `key`.
    pub fn path(&self, key: &FactorKey) -> PathBuf {
        let column = key.kind.column_name();
        let file = match &key.symbol {
            Some(symbol) => format!("{}_{}_{}.csv", key.period.period, symbol, column),
            None => format!("{}_{}.csv", key.period.period, column),
        };
        self.root
            .join(column)
            .join(key.period.year.to_string())
            .join(file)
    }
}

impl Cache<FactorKey, FactorSeries> for CsvSeriesCache {
    fn get(&self, key: &FactorKey) -> Result<Option<FactorSeries>> {
        let path = self.path(key);
        if !path.is_file() {
            return Ok(None);
        }
        let mut reader = ReaderBuilder::new().has_headers(true).from_path(&path)?;
        let mut points = Vec::new();
        for record in reader.records() {
            let record = record?;
            let (Some(raw_date), Some(raw_value)) = (record.get(0), record.get(1)) else {
                return Err(DataError::Cache(format!(
                    "{}: malformed row",
                    path.display()
                )));
            };
            let value = raw_value.trim().parse::<f64>().map_err(|_| {
                DataError::Cache(format!("{}: invalid value {:?}", path.display(), raw_value))
            })?;
            points.push((parse_date(raw_date)?, value));
        }
        Ok(Some(FactorSeries::new(key.clone(), points)))
    }

    fn put(&self, key: &FactorKey, value: &FactorSeries) -> Result<()> {
        let path = self.path(key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut writer = Writer::from_path(&path)?;
        writer.write_record(["Date", key.kind.column_name()])?;
        for (date, v) in value.points() {
            writer.write_record([date.format("%Y-%m-%d").to_string(), v.to_string()])?;
        }
        writer.flush()?;
        Ok(())
    }
}
