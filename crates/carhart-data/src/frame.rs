//! Date alignment of factor series through polars frames.
//!
//! Each [`FactorSeries`] becomes a two-column frame (`date`, `<FACTOR>`); the
//! regression design is the inner join of all frames on `date`, sorted
//! ascending.

use crate::error::{DataError, Result};
use crate::series::{FactorKind, FactorSeries};
use chrono::NaiveDate;
use polars::prelude::*;
use std::collections::HashSet;

const DATE_COLUMN: &str = "date";
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Build a `date` + value frame from a factor series.
pub fn series_frame(series: &FactorSeries) -> Result<DataFrame> {
    let dates: Vec<String> = series
        .dates()
        .iter()
        .map(|d| d.format(DATE_FORMAT).to_string())
        .collect();

    let df = DataFrame::new(vec![
        Series::new(DATE_COLUMN.into(), dates).into(),
        Series::new(series.kind().column_name().into(), series.values()).into(),
    ])?;

    let df = df
        .lazy()
        .with_column(col(DATE_COLUMN).cast(DataType::Date))
        .collect()?;

    Ok(df)
}

/// Series aligned on their common dates.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedSeries {
    dates: Vec<NaiveDate>,
    columns: Vec<(FactorKind, Vec<f64>)>,
}

impl AlignedSeries {
    /// Common dates, ascending.
    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    /// Values of one factor on the common dates.
    pub fn column(&self, kind: FactorKind) -> Option<&[f64]> {
        self.columns
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, v)| v.as_slice())
    }

    /// Number of common dates.
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    /// Whether no date is shared by all series.
    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }
}

/// Inner-join the series on date.
///
/// Every kind may appear at most once.
pub fn align_series(series: &[&FactorSeries]) -> Result<AlignedSeries> {
    let mut seen = HashSet::new();
    for s in series {
        if !seen.insert(s.kind()) {
            return Err(DataError::Alignment(format!(
                "series {} supplied more than once",
                s.kind()
            )));
        }
    }

    let Some((first, rest)) = series.split_first() else {
        return Ok(AlignedSeries {
            dates: Vec::new(),
            columns: Vec::new(),
        });
    };

    let mut joined = series_frame(first)?.lazy();
    for s in rest {
        joined = joined.join(
            series_frame(s)?.lazy(),
            [col(DATE_COLUMN)],
            [col(DATE_COLUMN)],
            JoinArgs::new(JoinType::Inner),
        );
    }
    let df = joined
        .sort([DATE_COLUMN], SortMultipleOptions::default())
        .collect()?;

    let date_strings = df.column(DATE_COLUMN)?.cast(&DataType::String)?;
    let date_strings = date_strings.str()?;
    let mut dates = Vec::with_capacity(df.height());
    for i in 0..df.height() {
        let raw = date_strings
            .get(i)
            .ok_or_else(|| DataError::Parse("Missing date".to_string()))?;
        let date = NaiveDate::parse_from_str(raw, DATE_FORMAT)
            .map_err(|e| DataError::Parse(format!("{}: {}", raw, e)))?;
        dates.push(date);
    }

    let mut columns = Vec::with_capacity(series.len());
    for s in series {
        let name = s.kind().column_name();
        let values = df.column(name)?.f64()?;
        let mut out = Vec::with_capacity(df.height());
        for i in 0..df.height() {
            let v = values
                .get(i)
                .ok_or_else(|| DataError::Parse(format!("Missing {} value", name)))?;
            out.push(v);
        }
        columns.push((s.kind(), out));
    }

    Ok(AlignedSeries { dates, columns })
}
