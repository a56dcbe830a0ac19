//! Writing every canonical output file and reading it back.

use carhart_data::{FactorKey, FactorKind, FactorSeries, Period, ReportingPeriod};
use carhart_model::{RegressionEngine, RegressionKey, Regressor};
use carhart_output::{
    RegressionSet, export_factor_series_csv, export_portfolio_json, export_regressions_json,
};
use carhart_risk::Portfolio;
use chrono::{Days, NaiveDate};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::BTreeMap;
use std::fs;
use tempfile::TempDir;

const DAYS: u64 = 40;

fn period() -> ReportingPeriod {
    ReportingPeriod::new(2023, Period::Q1)
}

fn series(kind: FactorKind, values: &[f64]) -> FactorSeries {
    let start = NaiveDate::from_ymd_opt(2023, 1, 2).unwrap();
    let key = if kind.is_keyed_by_symbol() {
        FactorKey::for_symbol(kind, period(), "AAA")
    } else {
        FactorKey::market(kind, period())
    };
    FactorSeries::new(
        key,
        values
            .iter()
            .enumerate()
            .map(|(i, v)| (start + Days::new(i as u64), *v))
            .collect(),
    )
}

fn regressions() -> RegressionSet {
    let mut rng = StdRng::seed_from_u64(11);
    let mut draw = || -> Vec<f64> { (0..DAYS).map(|_| rng.gen_range(-0.02..0.02)).collect() };
    let (mkt, smb, hml, mom, noise) = (draw(), draw(), draw(), draw(), draw());
    let excess: Vec<f64> = (0..DAYS as usize)
        .map(|t| 0.001 + 1.1 * mkt[t] + 0.3 * smb[t] - 0.2 * hml[t] + 0.1 * mom[t] + 0.1 * noise[t])
        .collect();

    let key = RegressionKey::new("AAA", "MARKET", period());
    let result = RegressionEngine::fit_series(
        &key,
        &series(FactorKind::SecurityExcessReturn, &excess),
        [
            &series(FactorKind::MarketExcessReturn, &mkt),
            &series(FactorKind::Smb, &smb),
            &series(FactorKind::Hml, &hml),
            &series(FactorKind::Mom, &mom),
        ],
    )
    .unwrap();
    BTreeMap::from([("AAA".to_string(), result)])
}

#[test]
fn test_portfolio_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("portfolio").join("2023_Q2.json");
    let portfolio = Portfolio::new([
        ("AAA".to_string(), 0.25),
        ("BBB".to_string(), 0.25),
        ("CCC".to_string(), 0.5),
    ]);

    export_portfolio_json(&portfolio, &path).unwrap();

    let parsed: BTreeMap<String, f64> =
        serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(parsed.len(), 3);
    assert_eq!(parsed.values().sum::<f64>(), 1.0);
    let reloaded: Portfolio = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(reloaded, portfolio);
}

#[test]
fn test_regressions_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("regressions.json");
    let results = regressions();

    export_regressions_json(&results, &path).unwrap();

    let reloaded: RegressionSet = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(reloaded, results);

    let raw: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    let coefficients = raw["AAA"]["coefficients"].as_array().unwrap();
    assert_eq!(coefficients.len(), Regressor::all().len());
    assert_eq!(coefficients[1]["regressor"], "MKT_RF");
}

#[test]
fn test_factor_series_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("SMB.csv");
    let smb = series(FactorKind::Smb, &[0.01, -0.02, 0.005]);

    export_factor_series_csv(&smb, &path).unwrap();

    let content = fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines, ["Date,SMB", "2023-01-02,0.01", "2023-01-03,-0.02", "2023-01-04,0.005"]);
}
