//! Descriptive statistics shared by the factor and risk crates.
//!
//! Conventions follow the usual data-analysis defaults: sample variance and
//! covariance use `n - 1`, quantiles interpolate linearly between order
//! statistics at position `q * (n - 1)`.

/// Arithmetic mean; NaN for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample covariance (`n - 1` denominator); NaN with fewer than two points.
pub fn sample_covariance(a: &[f64], b: &[f64]) -> f64 {
    let n = a.len().min(b.len());
    if n < 2 {
        return f64::NAN;
    }
    let (a, b) = (&a[..n], &b[..n]);
    let (ma, mb) = (mean(a), mean(b));
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - ma) * (y - mb))
        .sum::<f64>()
        / (n - 1) as f64
}

/// Sample variance (`n - 1` denominator).
pub fn sample_variance(values: &[f64]) -> f64 {
    sample_covariance(values, values)
}

/// Linearly interpolated quantile, `q` in `[0, 1]`.
///
/// NaN values are ignored. Returns `None` when no finite-or-infinite value
/// remains or `q` is out of range.
pub fn quantile(values: &[f64], q: f64) -> Option<f64> {
    if !(0.0..=1.0).contains(&q) {
        return None;
    }
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
    if sorted.is_empty() {
        return None;
    }
    sorted.sort_by(f64::total_cmp);

    let position = q * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let fraction = position - lower as f64;
    if lower == upper {
        return Some(sorted[lower]);
    }
    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * fraction)
}

/// Percentile on the 0-100 scale (see [`quantile`]).
pub fn percentile(values: &[f64], p: f64) -> Option<f64> {
    quantile(values, p / 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;

    #[rstest]
    #[case(0.0, 1.0)]
    #[case(0.3, 2.2)]
    #[case(0.5, 3.0)]
    #[case(0.7, 3.8)]
    #[case(1.0, 5.0)]
    fn test_quantile_linear(#[case] q: f64, #[case] expected: f64) {
        let values = [5.0, 1.0, 4.0, 2.0, 3.0];
        assert_relative_eq!(quantile(&values, q).unwrap(), expected, epsilon = 1e-12);
    }

    #[test]
    fn test_quantile_ignores_nan() {
        let values = [f64::NAN, 2.0, 4.0];
        assert_relative_eq!(quantile(&values, 0.5).unwrap(), 3.0);
        assert!(quantile(&[f64::NAN], 0.5).is_none());
        assert!(quantile(&values, 1.5).is_none());
    }

    #[test]
    fn test_sample_moments() {
        let a = [1.0, 2.0, 3.0, 4.0];
        let b = [2.0, 4.0, 6.0, 8.0];
        assert_relative_eq!(mean(&a), 2.5);
        assert_relative_eq!(sample_variance(&a), 5.0 / 3.0, epsilon = 1e-12);
        assert_relative_eq!(sample_covariance(&a, &b), 10.0 / 3.0, epsilon = 1e-12);
        assert!(sample_variance(&[1.0]).is_nan());
    }

    #[test]
    fn test_percentile_scale() {
        let values: Vec<f64> = (1..=101).map(f64::from).collect();
        assert_relative_eq!(percentile(&values, 5.0).unwrap(), 6.0, epsilon = 1e-12);
    }
}
