//! Optimizer and risk metrics on synthetic return histories.

use approx::assert_abs_diff_eq;
use carhart_data::stats::percentile;
use carhart_data::{PricePoint, PriceSeries};
use carhart_risk::{
    OptimizerConfig, Portfolio, PortfolioOptimizer, ReturnMatrix, RiskAnalytics, RiskConfig,
    historical_var,
};
use chrono::{Days, NaiveDate};
use ndarray::{Array1, Array2, Axis};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn dates(n: usize) -> Vec<NaiveDate> {
    let start = NaiveDate::from_ymd_opt(2019, 1, 2).unwrap();
    (0..n as u64).map(|i| start + Days::new(i)).collect()
}

fn random_returns(rng: &mut StdRng, rows: usize, drifts: &[f64]) -> Array2<f64> {
    let market: Vec<f64> = (0..rows).map(|_| rng.gen_range(-0.02..0.02)).collect();
    Array2::from_shape_fn((rows, drifts.len()), |(t, j)| {
        drifts[j] + 0.5 * market[t] + rng.gen_range(-0.015..0.015)
    })
}

fn symbols(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("S{}", i)).collect()
}

#[test]
fn test_optimized_weights_respect_constraints() {
    let mut rng = StdRng::seed_from_u64(17);
    let drifts = [0.0008, 0.0002, -0.0001, 0.0005, 0.0, 0.0003, 0.0001, -0.0002];
    let returns = random_returns(&mut rng, 250, &drifts);
    let matrix = ReturnMatrix::new(symbols(drifts.len()), dates(250), returns).unwrap();

    let portfolio = PortfolioOptimizer::new(OptimizerConfig::default())
        .optimize(&matrix)
        .unwrap();

    assert_eq!(portfolio.len(), drifts.len());
    assert_abs_diff_eq!(portfolio.total(), 1.0, epsilon = 1e-6);
    for weight in portfolio.weights().values() {
        assert!((0.05 - 1e-9..=0.20 + 1e-9).contains(weight), "weight {}", weight);
    }
}

#[test]
fn test_optimizer_is_deterministic() {
    let mut rng = StdRng::seed_from_u64(5);
    let drifts = [0.0004, 0.0002, 0.0001, 0.0003, 0.0, 0.0006];
    let returns = random_returns(&mut rng, 120, &drifts);
    let matrix = ReturnMatrix::new(symbols(drifts.len()), dates(120), returns).unwrap();
    let optimizer = PortfolioOptimizer::new(OptimizerConfig::default());

    assert_eq!(
        optimizer.optimize(&matrix).unwrap(),
        optimizer.optimize(&matrix).unwrap()
    );
}

#[test]
fn test_equal_weight_metrics_match_closed_form() {
    // four years of daily returns for four securities
    let rows = 4 * 252;
    let mut rng = StdRng::seed_from_u64(42);
    let drifts = [0.0004, 0.0002, 0.0006, 0.0001];
    let returns = random_returns(&mut rng, rows, &drifts);
    let market: Vec<f64> = returns.mean_axis(Axis(1)).unwrap().to_vec();
    let names = symbols(4);
    let matrix = ReturnMatrix::new(names.clone(), dates(rows), returns.clone()).unwrap();

    let portfolio = Portfolio::equal_weight(&names);
    let config = RiskConfig::default();
    let metrics = RiskAnalytics::new(config.clone())
        .analyze(&portfolio, &matrix, &market)
        .unwrap();

    let w = Array1::from_elem(4, 0.25);
    let means = returns.mean_axis(Axis(0)).unwrap();
    let expected_return = w.dot(&(&means * 252.0));

    let centered = &returns - &means;
    let cov = centered.t().dot(&centered) / (rows - 1) as f64;
    let volatility = w.dot(&(&cov * 252.0).dot(&w)).sqrt();

    assert_abs_diff_eq!(metrics.expected_return, expected_return, epsilon = 1e-9);
    assert_abs_diff_eq!(metrics.volatility, volatility, epsilon = 1e-9);
    assert_abs_diff_eq!(
        metrics.sharpe_ratio,
        (expected_return - config.risk_free_rate) / volatility,
        epsilon = 1e-9
    );
    // the market is the equal-weight portfolio itself
    assert_abs_diff_eq!(metrics.beta_realized, 1.0, epsilon = 1e-9);
    assert_abs_diff_eq!(metrics.beta_weighted, metrics.beta_realized, epsilon = 1e-9);
    assert_eq!(metrics.observations, rows);
}

#[test]
fn test_var_of_hundred_draws_matches_fifth_percentile() {
    let mut rng = StdRng::seed_from_u64(100);
    let draws: Vec<f64> = (0..100).map(|_| rng.gen_range(-0.03..0.03)).collect();

    let var = RiskAnalytics::default().value_at_risk(&draws).unwrap();
    assert_eq!(var, -percentile(&draws, 5.0).unwrap());
    assert_eq!(var, historical_var(&draws, 0.95, 1).unwrap());
}

#[test]
fn test_expected_shortfall_is_tail_mean() {
    let mut rng = StdRng::seed_from_u64(8);
    let draws: Vec<f64> = (0..250).map(|_| rng.gen_range(-0.04..0.03)).collect();
    let analytics = RiskAnalytics::default();

    let var = analytics.value_at_risk(&draws).unwrap();
    let es = analytics.expected_shortfall(&draws).unwrap();
    let tail: Vec<f64> = draws.iter().copied().filter(|r| *r <= -var).collect();
    let tail_mean = tail.iter().sum::<f64>() / tail.len() as f64;
    assert_abs_diff_eq!(es, -tail_mean, epsilon = 1e-15);
}

#[test]
fn test_price_gaps_do_not_truncate_window() {
    let days = dates(30);
    let full = |symbol: &str, start: f64| {
        PriceSeries::new(
            symbol,
            days.iter()
                .enumerate()
                .map(|(i, d)| PricePoint::from_close(*d, start + i as f64))
                .collect(),
        )
    };
    // every other day missing
    let sparse = PriceSeries::new(
        "SPARSE",
        days.iter()
            .enumerate()
            .filter(|(i, _)| i % 2 == 0)
            .map(|(i, d)| PricePoint::from_close(*d, 50.0 + i as f64))
            .collect(),
    );

    let matrix =
        ReturnMatrix::from_prices(&[full("A", 100.0), sparse, full("MKT", 1000.0)]).unwrap();
    assert_eq!(matrix.len(), 29);

    let (assets, market) = matrix.split_off("MKT").unwrap();
    assert_eq!(assets.n_assets(), 2);
    assert_eq!(market.len(), 29);
}
