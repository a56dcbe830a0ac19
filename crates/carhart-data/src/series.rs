//! Date-indexed factor series.

use crate::period::ReportingPeriod;
use chrono::NaiveDate;
use derive_more::Display;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The five series entering the four-factor regression.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, Serialize, Deserialize,
)]
pub enum FactorKind {
    /// Small-minus-big size spread
    #[display("SMB")]
    Smb,
    /// High-minus-low book-to-market spread
    #[display("HML")]
    Hml,
    /// Trailing-return momentum
    #[display("MOM")]
    Mom,
    /// Market index return minus the risk-free proxy
    #[display("MKT_RF")]
    MarketExcessReturn,
    /// Security return minus the risk-free proxy
    #[display("EXCESS_RETURN")]
    SecurityExcessReturn,
}

impl FactorKind {
    /// All factor kinds.
    pub const fn all() -> [Self; 5] {
        [
            Self::MarketExcessReturn,
            Self::Smb,
            Self::Hml,
            Self::Mom,
            Self::SecurityExcessReturn,
        ]
    }

    /// Column name used in frames and CSV files.
    pub const fn column_name(&self) -> &'static str {
        match self {
            Self::Smb => "SMB",
            Self::Hml => "HML",
            Self::Mom => "MOM",
            Self::MarketExcessReturn => "MKT_RF",
            Self::SecurityExcessReturn => "EXCESS_RETURN",
        }
    }

    /// Whether the series is computed per symbol rather than market-wide.
    ///
    /// Market excess return is keyed by its index symbol.
    pub const fn is_keyed_by_symbol(&self) -> bool {
        matches!(
            self,
            Self::Mom | Self::SecurityExcessReturn | Self::MarketExcessReturn
        )
    }
}

/// Identity of a factor series: kind, period and, where relevant, symbol.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FactorKey {
    /// Factor kind
    pub kind: FactorKind,
    /// Reporting period covered
    pub period: ReportingPeriod,
    /// Security or index symbol for symbol-keyed factors
    pub symbol: Option<String>,
}

impl FactorKey {
    /// Key for a market-wide factor (SMB, HML).
    pub const fn market(kind: FactorKind, period: ReportingPeriod) -> Self {
        Self {
            kind,
            period,
            symbol: None,
        }
    }

    /// Key for a symbol-specific factor.
    pub fn for_symbol(kind: FactorKind, period: ReportingPeriod, symbol: impl Into<String>) -> Self {
        Self {
            kind,
            period,
            symbol: Some(symbol.into()),
        }
    }
}

impl fmt::Display for FactorKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.symbol {
            Some(symbol) => write!(f, "{}/{}/{}", self.kind, self.period, symbol),
            None => write!(f, "{}/{}", self.kind, self.period),
        }
    }
}

/// A factor series: strictly increasing dates, one value per date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactorSeries {
    key: FactorKey,
    points: Vec<(NaiveDate, f64)>,
}

impl FactorSeries {
    /// Create a series. Points are sorted by date; on duplicate dates the
    /// first occurrence wins.
    pub fn new(key: FactorKey, mut points: Vec<(NaiveDate, f64)>) -> Self {
        points.sort_by_key(|(d, _)| *d);
        points.dedup_by_key(|(d, _)| *d);
        Self { key, points }
    }

    /// Series identity.
    pub const fn key(&self) -> &FactorKey {
        &self.key
    }

    /// Factor kind.
    pub const fn kind(&self) -> FactorKind {
        self.key.kind
    }

    /// `(date, value)` pairs in date order.
    pub fn points(&self) -> &[(NaiveDate, f64)] {
        &self.points
    }

    /// Dates in order.
    pub fn dates(&self) -> Vec<NaiveDate> {
        self.points.iter().map(|(d, _)| *d).collect()
    }

    /// Values in date order.
    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|(_, v)| *v).collect()
    }

    /// Value at a date.
    pub fn get(&self, date: NaiveDate) -> Option<f64> {
        self.points
            .binary_search_by_key(&date, |(d, _)| *d)
            .ok()
            .map(|i| self.points[i].1)
    }

    /// Number of observations.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the series has no observations.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}
