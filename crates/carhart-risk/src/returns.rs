//! Daily return matrices built from closing prices.
//!
//! Prices of several securities are aligned on the union of their dates.
//! Missing closes are filled by linear interpolation so that a security that
//! skipped a trading day does not shrink the common window; rows that still
//! hold a gap (before a security's first price) are dropped after the returns
//! are taken.

use crate::error::{Result, RiskError};
use carhart_data::PriceSeries;
use chrono::NaiveDate;
use ndarray::{Array1, Array2, ArrayView1, Axis};
use std::collections::{BTreeSet, HashSet};
use tracing::debug;

/// Fill NaN gaps in place.
///
/// Interior gaps are interpolated linearly by position, trailing gaps repeat
/// the last valid value, and leading gaps are left as NaN.
pub fn interpolate_gaps(values: &mut [f64]) {
    let mut last_valid: Option<usize> = None;
    for i in 0..values.len() {
        if values[i].is_nan() {
            continue;
        }
        if let Some(prev) = last_valid
            && i > prev + 1
        {
            let (start, end) = (values[prev], values[i]);
            let span = (i - prev) as f64;
            for (k, slot) in values.iter_mut().enumerate().take(i).skip(prev + 1) {
                let fraction = (k - prev) as f64 / span;
                *slot = start + (end - start) * fraction;
            }
        }
        last_valid = Some(i);
    }

    if let Some(prev) = last_valid {
        let fill = values[prev];
        for slot in values.iter_mut().skip(prev + 1) {
            *slot = fill;
        }
    }
}

/// Daily simple returns of several assets on common dates.
#[derive(Debug, Clone, PartialEq)]
pub struct ReturnMatrix {
    symbols: Vec<String>,
    dates: Vec<NaiveDate>,
    returns: Array2<f64>,
}

impl ReturnMatrix {
    /// Wrap an existing matrix: one row per date, one column per symbol.
    pub fn new(symbols: Vec<String>, dates: Vec<NaiveDate>, returns: Array2<f64>) -> Result<Self> {
        if returns.ncols() != symbols.len() {
            return Err(RiskError::DimensionMismatch {
                expected: symbols.len(),
                actual: returns.ncols(),
            });
        }
        if returns.nrows() != dates.len() {
            return Err(RiskError::DimensionMismatch {
                expected: dates.len(),
                actual: returns.nrows(),
            });
        }
        let unique: HashSet<&str> = symbols.iter().map(String::as_str).collect();
        if unique.len() != symbols.len() {
            return Err(RiskError::InvalidParameter("duplicate symbols".to_string()));
        }
        Ok(Self {
            symbols,
            dates,
            returns,
        })
    }

    /// Build from closing prices.
    ///
    /// Each series' closes are placed on the union of dates, gaps are filled
    /// with [`interpolate_gaps`], and close-to-close returns are taken. The
    /// first date and any date with an unfilled gap are dropped.
    pub fn from_prices(series: &[PriceSeries]) -> Result<Self> {
        if series.is_empty() {
            return Err(RiskError::InvalidParameter("no price series".to_string()));
        }

        let all_dates: Vec<NaiveDate> = series
            .iter()
            .flat_map(|s| s.dates())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let mut closes = Array2::<f64>::from_elem((all_dates.len(), series.len()), f64::NAN);
        for (j, s) in series.iter().enumerate() {
            for point in s.points() {
                if let Ok(i) = all_dates.binary_search(&point.date) {
                    closes[[i, j]] = point.close;
                }
            }
            let mut column: Vec<f64> = closes.column(j).to_vec();
            interpolate_gaps(&mut column);
            closes.column_mut(j).assign(&Array1::from(column));
        }

        let mut dates = Vec::new();
        let mut rows = Vec::new();
        for i in 1..all_dates.len() {
            let row: Vec<f64> = (0..series.len())
                .map(|j| closes[[i, j]] / closes[[i - 1, j]] - 1.0)
                .collect();
            if row.iter().all(|r| r.is_finite()) {
                dates.push(all_dates[i]);
                rows.extend(row);
            }
        }

        let returns = Array2::from_shape_vec((dates.len(), series.len()), rows)
            .map_err(|e| RiskError::InvalidParameter(e.to_string()))?;
        debug!(
            assets = series.len(),
            dates = all_dates.len(),
            rows = dates.len(),
            "return matrix prepared"
        );

        Self::new(
            series.iter().map(|s| s.symbol().to_string()).collect(),
            dates,
            returns,
        )
    }

    /// Column symbols.
    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    /// Row dates, ascending.
    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    /// Return matrix (dates x symbols).
    pub const fn returns(&self) -> &Array2<f64> {
        &self.returns
    }

    /// Number of dates.
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    /// Whether there are no dates.
    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    /// Number of assets.
    pub fn n_assets(&self) -> usize {
        self.symbols.len()
    }

    /// Column index of `symbol`.
    pub fn index_of(&self, symbol: &str) -> Option<usize> {
        self.symbols.iter().position(|s| s == symbol)
    }

    /// Returns of one symbol.
    pub fn column(&self, symbol: &str) -> Option<ArrayView1<'_, f64>> {
        self.index_of(symbol).map(|j| self.returns.column(j))
    }

    /// Per-asset mean daily return.
    pub fn mean_returns(&self) -> Array1<f64> {
        self.returns
            .mean_axis(Axis(0))
            .unwrap_or_else(|| Array1::from_elem(self.n_assets(), f64::NAN))
    }

    /// Matrix restricted to `symbols`, in that order.
    pub fn select(&self, symbols: &[String]) -> Result<Self> {
        let indices = symbols
            .iter()
            .map(|s| {
                self.index_of(s)
                    .ok_or_else(|| RiskError::MissingSymbol(s.clone()))
            })
            .collect::<Result<Vec<_>>>()?;
        Self::new(
            symbols.to_vec(),
            self.dates.clone(),
            self.returns.select(Axis(1), &indices),
        )
    }

    /// Remove `symbol` and return it separately, e.g. a market index.
    pub fn split_off(&self, symbol: &str) -> Result<(Self, Array1<f64>)> {
        let index = self
            .index_of(symbol)
            .ok_or_else(|| RiskError::MissingSymbol(symbol.to_string()))?;
        let rest: Vec<String> = self
            .symbols
            .iter()
            .filter(|s| s.as_str() != symbol)
            .cloned()
            .collect();
        let column = self.returns.column(index).to_owned();
        Ok((self.select(&rest)?, column))
    }
}
