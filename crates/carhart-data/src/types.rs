//! Core data model: prices, statements, rates and market capitalization.

use crate::period::{Period, ReportingPeriod};
use crate::returns::{ClosePrice, ReturnRow, calculate_cumulative_returns};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One daily OHLCV observation.
///
/// The owning symbol is carried by [`PriceSeries`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    /// Trading date
    pub date: NaiveDate,
    /// Opening price
    pub open: f64,
    /// Session high
    pub high: f64,
    /// Session low
    pub low: f64,
    /// Closing price
    pub close: f64,
    /// Traded volume
    pub volume: f64,
    /// Traded value (index files only)
    pub transaction_value: Option<f64>,
    /// Market capitalization (index files only)
    pub market_cap: Option<f64>,
}

impl PricePoint {
    /// Observation with only a close price, the rest mirroring it.
    pub const fn from_close(date: NaiveDate, close: f64) -> Self {
        Self {
            date,
            open: close,
            high: close,
            low: close,
            close,
            volume: 0.0,
            transaction_value: None,
            market_cap: None,
        }
    }
}

impl ClosePrice for PricePoint {
    fn date(&self) -> NaiveDate {
        self.date
    }

    fn close(&self) -> f64 {
        self.close
    }
}

/// Date-ordered price history of one security or index.
///
/// Construction sorts by date and drops duplicate dates, keeping the first
/// occurrence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSeries {
    symbol: String,
    points: Vec<PricePoint>,
}

impl PriceSeries {
    /// Create a series, enforcing date order and uniqueness.
    pub fn new(symbol: impl Into<String>, mut points: Vec<PricePoint>) -> Self {
        // stable sort keeps input order among equal dates
        points.sort_by_key(|p| p.date);
        points.dedup_by_key(|p| p.date);
        Self {
            symbol: symbol.into(),
            points,
        }
    }

    /// Series symbol.
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Observations in date order.
    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    /// Number of observations.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the series has no observations.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Trading dates.
    pub fn dates(&self) -> Vec<NaiveDate> {
        self.points.iter().map(|p| p.date).collect()
    }

    /// Closing prices.
    pub fn closes(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.close).collect()
    }

    /// First observation date.
    pub fn first_date(&self) -> Option<NaiveDate> {
        self.points.first().map(|p| p.date)
    }

    /// Last observation date.
    pub fn last_date(&self) -> Option<NaiveDate> {
        self.points.last().map(|p| p.date)
    }

    /// Observations between `start` and `end`, both inclusive.
    pub fn between(&self, start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            symbol: self.symbol.clone(),
            points: self
                .points
                .iter()
                .filter(|p| p.date >= start && p.date <= end)
                .cloned()
                .collect(),
        }
    }

    /// Observations inside a reporting period.
    pub fn within(&self, period: &ReportingPeriod) -> Self {
        self.between(period.start(), period.end())
    }

    /// Append another series' observations, keeping existing dates on conflict.
    pub fn extend(&mut self, other: &Self) {
        let mut points = std::mem::take(&mut self.points);
        points.extend(other.points.iter().cloned());
        *self = Self::new(std::mem::take(&mut self.symbol), points);
    }

    /// Daily and cumulative returns (see [`calculate_cumulative_returns`]).
    pub fn returns(&self) -> Vec<ReturnRow> {
        calculate_cumulative_returns(&self.points)
    }
}

/// One line of a long-format financial statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountEntry {
    /// Standardized account identifier (e.g. `ifrs-full_Equity`)
    pub account_id: String,
    /// Reported account name
    pub account_name: String,
    /// Current-term amount, if reported
    pub amount: Option<f64>,
}

/// Financial-statement snapshot for one (symbol, fiscal year, period).
///
/// Account identifiers are unique within a snapshot; the first row wins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancialSnapshot {
    /// Security symbol
    pub symbol: String,
    /// Fiscal year of the report
    pub fiscal_year: i32,
    /// Reporting quarter
    pub period: Period,
    accounts: BTreeMap<String, AccountEntry>,
}

impl FinancialSnapshot {
    /// Account identifier for total equity.
    pub const EQUITY_ID: &'static str = "ifrs-full_Equity";
    /// Account identifier for net income.
    pub const NET_INCOME_ID: &'static str = "ifrs-full_ProfitLoss";
    /// Account names accepted for total equity when the identifier is absent.
    pub const EQUITY_NAMES: [&'static str; 3] = ["자본총계", "Total equity", "Total Equity"];

    /// Build a snapshot from statement rows.
    pub fn new(
        symbol: impl Into<String>,
        fiscal_year: i32,
        period: Period,
        entries: impl IntoIterator<Item = AccountEntry>,
    ) -> Self {
        let mut accounts = BTreeMap::new();
        for entry in entries {
            accounts.entry(entry.account_id.clone()).or_insert(entry);
        }
        Self {
            symbol: symbol.into(),
            fiscal_year,
            period,
            accounts,
        }
    }

    /// Reporting period of the snapshot.
    pub const fn reporting_period(&self) -> ReportingPeriod {
        ReportingPeriod::new(self.fiscal_year, self.period)
    }

    /// Number of distinct accounts.
    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    /// Whether the snapshot has no accounts.
    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    /// All accounts, ordered by identifier.
    pub fn accounts(&self) -> impl Iterator<Item = &AccountEntry> {
        self.accounts.values()
    }

    /// Amount reported for an account identifier.
    pub fn amount(&self, account_id: &str) -> Option<f64> {
        self.accounts.get(account_id).and_then(|e| e.amount)
    }

    /// Total equity (book value).
    pub fn total_equity(&self) -> Option<f64> {
        self.amount(Self::EQUITY_ID).or_else(|| {
            self.accounts
                .values()
                .find(|e| Self::EQUITY_NAMES.contains(&e.account_name.trim()))
                .and_then(|e| e.amount)
        })
    }

    /// Net income for the period.
    pub fn net_income(&self) -> Option<f64> {
        self.amount(Self::NET_INCOME_ID)
    }
}

/// Daily risk-free proxy observation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RatePoint {
    /// Observation date
    pub date: NaiveDate,
    /// Annualized yield in percent
    pub bond_yield: f64,
    /// Day-over-day change as reported
    pub change: Option<f64>,
}

/// Daily market capitalization of one security.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarketCapPoint {
    /// Trading date
    pub date: NaiveDate,
    /// Market capitalization
    pub market_cap: f64,
    /// Traded volume
    pub volume: Option<f64>,
    /// Traded value
    pub transaction_value: Option<f64>,
    /// Shares outstanding
    pub shares_outstanding: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    #[test]
    fn test_series_sorts_and_dedups() {
        let series = PriceSeries::new(
            "005930",
            vec![
                PricePoint::from_close(date(3), 103.0),
                PricePoint::from_close(date(2), 102.0),
                PricePoint::from_close(date(3), 999.0),
            ],
        );
        assert_eq!(series.dates(), vec![date(2), date(3)]);
        assert_eq!(series.closes(), vec![102.0, 103.0]);
    }

    #[test]
    fn test_extend_keeps_existing_dates() {
        let mut a = PriceSeries::new("A", vec![PricePoint::from_close(date(2), 1.0)]);
        let b = PriceSeries::new(
            "A",
            vec![
                PricePoint::from_close(date(2), 5.0),
                PricePoint::from_close(date(4), 2.0),
            ],
        );
        a.extend(&b);
        assert_eq!(a.closes(), vec![1.0, 2.0]);
        assert_eq!(a.symbol(), "A");
    }

    #[test]
    fn test_snapshot_equity_lookup() {
        let snapshot = FinancialSnapshot::new(
            "000660",
            2023,
            Period::Q2,
            vec![
                AccountEntry {
                    account_id: "-".to_string(),
                    account_name: "자본총계".to_string(),
                    amount: Some(5.0e12),
                },
                AccountEntry {
                    account_id: FinancialSnapshot::NET_INCOME_ID.to_string(),
                    account_name: "당기순이익".to_string(),
                    amount: Some(1.0e11),
                },
            ],
        );
        assert_eq!(snapshot.total_equity(), Some(5.0e12));
        assert_eq!(snapshot.net_income(), Some(1.0e11));
        assert_eq!(snapshot.reporting_period(), ReportingPeriod::new(2023, Period::Q2));
    }

    #[test]
    fn test_snapshot_account_ids_unique() {
        let entry = |amount| AccountEntry {
            account_id: FinancialSnapshot::EQUITY_ID.to_string(),
            account_name: "Total equity".to_string(),
            amount: Some(amount),
        };
        let snapshot = FinancialSnapshot::new("A", 2023, Period::Q1, vec![entry(1.0), entry(2.0)]);
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot.total_equity(), Some(1.0));
    }
}
