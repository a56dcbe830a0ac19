//! Calendar quarters and reporting periods.
//!
//! A single [`Period`] type carries every quarter mapping the engine needs:
//! month ranges, first/last calendar day, and the report code used by the
//! financial-statement feed.

use crate::error::{DataError, Result};
use chrono::{Datelike, NaiveDate};
use derive_more::Display;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;

/// Calendar quarter.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, Serialize, Deserialize,
)]
pub enum Period {
    /// January to March
    #[display("Q1")]
    Q1,
    /// April to June
    #[display("Q2")]
    Q2,
    /// July to September
    #[display("Q3")]
    Q3,
    /// October to December
    #[display("Q4")]
    Q4,
}

impl Period {
    /// All quarters in calendar order.
    pub const fn all() -> [Self; 4] {
        [Self::Q1, Self::Q2, Self::Q3, Self::Q4]
    }

    /// Quarter number (1-4).
    pub const fn number(&self) -> u32 {
        match self {
            Self::Q1 => 1,
            Self::Q2 => 2,
            Self::Q3 => 3,
            Self::Q4 => 4,
        }
    }

    /// Quarter from its number (1-4).
    pub fn from_number(n: u32) -> Result<Self> {
        match n {
            1 => Ok(Self::Q1),
            2 => Ok(Self::Q2),
            3 => Ok(Self::Q3),
            4 => Ok(Self::Q4),
            _ => Err(DataError::InvalidPeriod(format!("quarter number {}", n))),
        }
    }

    /// Quarter containing the given month (1-12).
    pub fn from_month(month: u32) -> Result<Self> {
        if !(1..=12).contains(&month) {
            return Err(DataError::InvalidPeriod(format!("month {}", month)));
        }
        Self::from_number((month - 1) / 3 + 1)
    }

    /// Months covered by the quarter.
    pub const fn months(&self) -> RangeInclusive<u32> {
        let first = self.first_month();
        first..=first + 2
    }

    /// First month of the quarter.
    pub const fn first_month(&self) -> u32 {
        (self.number() - 1) * 3 + 1
    }

    /// First calendar day of the quarter in `year`.
    pub fn start_date(&self, year: i32) -> NaiveDate {
        ReportingPeriod::new(year, *self).start()
    }

    /// Last calendar day of the quarter in `year`.
    pub fn end_date(&self, year: i32) -> NaiveDate {
        ReportingPeriod::new(year, *self).end()
    }

    /// Financial-statement report code for this quarter.
    ///
    /// The codes are not in calendar order: the annual report (Q4) is 11011.
    pub const fn report_code(&self) -> &'static str {
        match self {
            Self::Q1 => "11013",
            Self::Q2 => "11012",
            Self::Q3 => "11014",
            Self::Q4 => "11011",
        }
    }

    /// Quarter from a financial-statement report code.
    pub fn from_report_code(code: &str) -> Result<Self> {
        match code.trim() {
            "11013" => Ok(Self::Q1),
            "11012" => Ok(Self::Q2),
            "11014" => Ok(Self::Q3),
            "11011" => Ok(Self::Q4),
            other => Err(DataError::InvalidPeriod(format!("report code {}", other))),
        }
    }
}

impl FromStr for Period {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        let digits = trimmed
            .strip_prefix('Q')
            .or_else(|| trimmed.strip_prefix('q'))
            .unwrap_or(trimmed);
        digits
            .parse::<u32>()
            .map_err(|_| DataError::InvalidPeriod(s.to_string()))
            .and_then(Self::from_number)
    }
}

/// A quarter of a specific year, the unit every factor and regression is keyed by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ReportingPeriod {
    /// Calendar year
    pub year: i32,
    /// Quarter within the year
    pub period: Period,
}

impl ReportingPeriod {
    /// Create a new reporting period.
    pub const fn new(year: i32, period: Period) -> Self {
        Self { year, period }
    }

    /// Reporting period containing the given date.
    pub fn containing(date: NaiveDate) -> Self {
        // month() is always 1-12
        let period = Period::from_month(date.month()).unwrap_or(Period::Q1);
        Self::new(date.year(), period)
    }

    /// First calendar day of the period.
    pub fn start(&self) -> NaiveDate {
        // Only years outside chrono's range fail here.
        NaiveDate::from_ymd_opt(self.year, self.period.first_month(), 1).unwrap_or(NaiveDate::MIN)
    }

    /// Last calendar day of the period.
    pub fn end(&self) -> NaiveDate {
        self.next().start().pred_opt().unwrap_or(NaiveDate::MAX)
    }

    /// Whether `date` falls inside the period (inclusive).
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start() && date <= self.end()
    }

    /// The quarter immediately before this one.
    pub fn previous(&self) -> Self {
        self.offset(-1)
    }

    /// The quarter immediately after this one.
    pub fn next(&self) -> Self {
        self.offset(1)
    }

    /// Shift by `quarters` (negative moves back in time).
    pub fn offset(&self, quarters: i32) -> Self {
        let index = self.year * 4 + self.period.number() as i32 - 1 + quarters;
        let year = index.div_euclid(4);
        let number = index.rem_euclid(4) as u32 + 1;
        // rem_euclid(4) + 1 is always 1-4
        let period = Period::from_number(number).unwrap_or(Period::Q1);
        Self::new(year, period)
    }

    /// `(year, month)` pairs covered by the period.
    pub fn months(&self) -> impl Iterator<Item = (i32, u32)> + '_ {
        self.period.months().map(move |m| (self.year, m))
    }

    /// Start date of the window covering `quarters` periods ending with this one.
    pub fn lookback_start(&self, quarters: u32) -> NaiveDate {
        self.offset(1 - quarters as i32).start()
    }
}

impl fmt::Display for ReportingPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.year, self.period)
    }
}

impl FromStr for ReportingPeriod {
    type Err = DataError;

    /// Parses `2023_Q1`, `2023Q1` or `2023-Q1`.
    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        let split = trimmed
            .find(['_', '-', 'Q', 'q'])
            .ok_or_else(|| DataError::InvalidPeriod(s.to_string()))?;
        let (year, rest) = trimmed.split_at(split);
        let year = year
            .parse::<i32>()
            .map_err(|_| DataError::InvalidPeriod(s.to_string()))?;
        let rest = rest.trim_start_matches(['_', '-']);
        Ok(Self::new(year, rest.parse()?))
    }
}
