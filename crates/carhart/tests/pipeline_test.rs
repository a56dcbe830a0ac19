//! Full runs against a synthetic store.

use approx::assert_abs_diff_eq;
use carhart::data::{
    AccountEntry, Cache, DataError, FailureKind, FinancialSnapshot, InMemoryStore,
    MarketCapPoint, MemoryCache, Period, PricePoint, PriceSeries, RatePoint, ReportingPeriod,
    Stage, TimeSeriesStore,
};
use carhart::factors::FactorConfig;
use carhart::model::{RegressionCache, RegressionKey, RegressionResult};
use carhart::{Pipeline, PipelineConfig, PipelineError, StoreUniverse, Universe};
use chrono::{Days, NaiveDate};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;

const DAYS: u64 = 365;
const SECURITIES: usize = 10;

fn dates() -> Vec<NaiveDate> {
    let start = NaiveDate::from_ymd_opt(2022, 4, 1).unwrap();
    (0..DAYS).map(|i| start + Days::new(i)).collect()
}

fn walk(symbol: &str, returns: &[f64], start: f64) -> PriceSeries {
    let mut close = start;
    let points = dates()
        .into_iter()
        .zip(returns)
        .map(|(date, r)| {
            close *= 1.0 + r;
            PricePoint::from_close(date, close)
        })
        .collect();
    PriceSeries::new(symbol, points)
}

fn draws(rng: &mut StdRng, scale: f64) -> Vec<f64> {
    (0..DAYS).map(|_| rng.gen_range(-scale..scale)).collect()
}

fn symbol(i: usize) -> String {
    format!("S{:02}", i)
}

fn store() -> InMemoryStore {
    let mut rng = StdRng::seed_from_u64(7);
    let market = draws(&mut rng, 0.015);
    let small = draws(&mut rng, 0.02);
    let large = draws(&mut rng, 0.01);

    let mut store = InMemoryStore::new()
        .with_index(walk("MARKET", &market, 2500.0))
        .with_index(walk("SMALL", &small, 1000.0))
        .with_index(walk("LARGE", &large, 3000.0))
        .with_rates(dates().into_iter().map(|date| RatePoint {
            date,
            bond_yield: 3.5,
            change: None,
        }));

    for i in 0..SECURITIES {
        let beta = 0.7 + 0.08 * i as f64;
        let alpha = 0.001 + 0.0002 * i as f64;
        let noise = draws(&mut rng, 0.004);
        let returns: Vec<f64> = market
            .iter()
            .zip(&noise)
            .map(|(m, e)| alpha + beta * m + e)
            .collect();
        store.insert_prices(walk(&symbol(i), &returns, 5_000.0 * (i + 1) as f64));
        store.insert_market_caps(
            symbol(i),
            dates().into_iter().map(|date| MarketCapPoint {
                date,
                market_cap: 1e9 * (i + 1) as f64,
                volume: None,
                transaction_value: None,
                shares_outstanding: None,
            }),
        );
        store.insert_snapshot(FinancialSnapshot::new(
            symbol(i),
            2023,
            Period::Q1,
            vec![AccountEntry {
                account_id: FinancialSnapshot::EQUITY_ID.to_string(),
                account_name: "Total equity".to_string(),
                amount: Some(4e8 * (SECURITIES + 1 - i) as f64),
            }],
        ));
    }
    store
}

/// Serves quarterly prices for every symbol but no multi-quarter history
/// for `symbol`.
struct NoHistory {
    inner: InMemoryStore,
    symbol: String,
}

impl TimeSeriesStore for NoHistory {
    fn get_price_series(
        &self,
        symbol: &str,
        period: ReportingPeriod,
    ) -> carhart::data::Result<PriceSeries> {
        self.inner.get_price_series(symbol, period)
    }

    fn get_index_series(
        &self,
        name: &str,
        period: ReportingPeriod,
    ) -> carhart::data::Result<PriceSeries> {
        self.inner.get_index_series(name, period)
    }

    fn get_financial_snapshot(
        &self,
        symbol: &str,
        period: ReportingPeriod,
    ) -> carhart::data::Result<FinancialSnapshot> {
        self.inner.get_financial_snapshot(symbol, period)
    }

    fn get_risk_free_series(
        &self,
        period: ReportingPeriod,
    ) -> carhart::data::Result<Vec<RatePoint>> {
        self.inner.get_risk_free_series(period)
    }

    fn get_market_cap_series(
        &self,
        symbol: &str,
        period: ReportingPeriod,
    ) -> carhart::data::Result<Vec<MarketCapPoint>> {
        self.inner.get_market_cap_series(symbol, period)
    }

    fn securities(&self) -> carhart::data::Result<Vec<String>> {
        self.inner.securities()
    }

    fn indices(&self) -> carhart::data::Result<Vec<String>> {
        self.inner.indices()
    }

    fn get_price_history(
        &self,
        symbol: &str,
        from: ReportingPeriod,
        to: ReportingPeriod,
    ) -> carhart::data::Result<PriceSeries> {
        if symbol == self.symbol {
            return Err(DataError::not_found(format!("history of {}", symbol)));
        }
        self.inner.get_price_history(symbol, from, to)
    }
}

fn config() -> PipelineConfig {
    PipelineConfig {
        market_index: "MARKET".to_string(),
        portfolio_size: 8,
        factor: FactorConfig {
            momentum_lookback: 20,
            small_cap_index: "SMALL".to_string(),
            large_cap_index: "LARGE".to_string(),
            ..Default::default()
        },
        ..Default::default()
    }
}

fn universe() -> Vec<String> {
    (0..SECURITIES)
        .map(symbol)
        .chain(["MISSING".to_string()])
        .collect()
}

fn investment_period() -> ReportingPeriod {
    ReportingPeriod::new(2023, Period::Q2)
}

#[test]
fn test_run_builds_bounded_portfolio() {
    let store = store();
    let output = Pipeline::new(&store)
        .with_config(config())
        .run(&universe(), investment_period())
        .unwrap();

    assert_eq!(output.analysis_period, ReportingPeriod::new(2023, Period::Q1));
    assert_eq!(output.universe_size, SECURITIES + 1);
    assert_eq!(output.regressions.len(), SECURITIES);
    assert_eq!(output.portfolio.len(), 8);
    assert_abs_diff_eq!(output.portfolio.total(), 1.0, epsilon = 1e-6);
    for weight in output.portfolio.weights().values() {
        assert!((0.05 - 1e-9..=0.20 + 1e-9).contains(weight));
    }
    for symbol in output.portfolio.symbols() {
        assert!(output.screening.selected().contains(&symbol));
    }

    assert!(output.metrics.volatility > 0.0);
    assert!(output.metrics.beta_realized > 0.0);
    assert_abs_diff_eq!(
        output.metrics.beta_weighted,
        output.metrics.beta_realized,
        epsilon = 1e-9
    );
    // a year of daily returns less the first day
    assert_eq!(output.metrics.observations, DAYS as usize - 1);
}

#[test]
fn test_run_reports_dropped_symbols() {
    let store = store();
    let output = Pipeline::new(&store)
        .with_config(config())
        .run(&universe(), investment_period())
        .unwrap();

    let missing: Vec<_> = output
        .dropped_at(Stage::Factor)
        .filter(|d| d.symbol == "MISSING")
        .collect();
    assert_eq!(missing.len(), 1);
    assert_eq!(missing[0].kind, FailureKind::NotFound);

    let screened_out: Vec<_> = output.dropped_at(Stage::Screening).collect();
    assert_eq!(screened_out.len(), SECURITIES - 8);

    let report = output.report();
    assert_eq!(report.fitted, SECURITIES);
    let markdown = report.to_markdown();
    assert!(markdown.contains("MISSING"));
    for symbol in output.portfolio.symbols() {
        assert!(markdown.contains(&symbol));
    }
}

#[test]
fn test_unpriced_symbol_is_replaced_before_weighting() {
    let config = PipelineConfig {
        portfolio_size: 6,
        ..config()
    };
    let baseline = Pipeline::new(&store())
        .with_config(config.clone())
        .run(&universe(), investment_period())
        .unwrap();
    let unpriced = baseline.screening.selected()[0].clone();

    let store = NoHistory {
        inner: store(),
        symbol: unpriced.clone(),
    };
    let output = Pipeline::new(&store)
        .with_config(config)
        .run(&universe(), investment_period())
        .unwrap();

    assert_eq!(output.portfolio.len(), 6);
    assert_eq!(output.screening.len(), 6);
    assert!(!output.screening.selected().contains(&unpriced));
    assert!(!output.portfolio.symbols().contains(&unpriced));
    assert_abs_diff_eq!(output.portfolio.total(), 1.0, epsilon = 1e-6);

    let dropped: Vec<_> = output.dropped_at(Stage::Optimization).collect();
    assert_eq!(dropped.len(), 1);
    assert_eq!(dropped[0].symbol, unpriced);
    assert_eq!(dropped[0].kind, FailureKind::NotFound);
    assert!(output.regressions.contains_key(&unpriced));
}

#[test]
fn test_run_is_deterministic() {
    let store = store();
    let pipeline = Pipeline::new(&store).with_config(config());
    let first = pipeline.run(&universe(), investment_period()).unwrap();
    let second = pipeline.run(&universe(), investment_period()).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_regression_cache_reused() {
    let store = store();
    let cache: RegressionCache = Arc::new(MemoryCache::<RegressionKey, RegressionResult>::new());
    let pipeline = Pipeline::new(&store)
        .with_config(config())
        .with_regression_cache(cache.clone());

    let first = pipeline.run(&universe(), investment_period()).unwrap();
    let key = RegressionKey::new(symbol(0), "MARKET", first.analysis_period);
    assert_eq!(cache.get(&key).unwrap().as_ref(), first.regressions.get(&symbol(0)));

    let second = pipeline.run(&universe(), investment_period()).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_store_universe() {
    let store = store();
    let universe = StoreUniverse::new(&store).unwrap();
    assert_eq!(universe.size(), SECURITIES);

    let output = Pipeline::new(&store)
        .with_config(config())
        .run(&universe, investment_period())
        .unwrap();
    assert!(output.dropped_at(Stage::Factor).next().is_none());
}

#[test]
fn test_missing_market_index_is_an_error() {
    let store = store();
    let config = PipelineConfig {
        market_index: "NOWHERE".to_string(),
        ..config()
    };
    let result = Pipeline::new(&store)
        .with_config(config)
        .run(&universe(), investment_period());
    assert!(matches!(result, Err(PipelineError::Factor(_))));
}

#[test]
fn test_infeasible_portfolio_size_rejected() {
    let store = store();
    let config = PipelineConfig {
        portfolio_size: 4,
        ..config()
    };
    let result = Pipeline::new(&store)
        .with_config(config)
        .run(&universe(), investment_period());
    assert!(matches!(result, Err(PipelineError::InvalidConfig(_))));
}
