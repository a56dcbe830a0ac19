//! Close-to-close returns.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Anything with a date and a closing price.
pub trait ClosePrice {
    /// Observation date
    fn date(&self) -> NaiveDate;
    /// Closing price
    fn close(&self) -> f64;
}

/// A close price with its derived daily and cumulative return.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReturnRow {
    /// Observation date
    pub date: NaiveDate,
    /// Closing price
    pub close: f64,
    /// Percent change from the previous close (0 for the first row)
    pub ret: f64,
    /// Running product of `1 + ret`, minus one
    pub cumulative_return: f64,
}

impl ClosePrice for ReturnRow {
    fn date(&self) -> NaiveDate {
        self.date
    }

    fn close(&self) -> f64 {
        self.close
    }
}

/// Compute daily and cumulative returns from closing prices.
///
/// The first observation's return is 0, not missing. Undefined changes
/// (0/0) are also 0. A missing (non-finite) close has a 0 return and the
/// next return is taken against the last finite close. Returns are always
/// recomputed from `close`, so applying this to its own output reproduces
/// the same rows.
pub fn calculate_cumulative_returns<T: ClosePrice>(rows: &[T]) -> Vec<ReturnRow> {
    let mut out = Vec::with_capacity(rows.len());
    let mut growth = 1.0;
    let mut prev_close: Option<f64> = None;

    for row in rows {
        let close = row.close();
        let ret = match prev_close {
            Some(prev) => {
                let r = close / prev - 1.0;
                if r.is_nan() { 0.0 } else { r }
            }
            None => 0.0,
        };
        growth *= 1.0 + ret;
        out.push(ReturnRow {
            date: row.date(),
            close,
            ret,
            cumulative_return: growth - 1.0,
        });
        if close.is_finite() {
            prev_close = Some(close);
        }
    }

    out
}
