//! Ordinary least squares with an intercept and full inference statistics.

use crate::error::{RegressionError, Result};
use crate::linalg::{cholesky, cholesky_inverse, cholesky_solve, condition_number};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis, s};
use statrs::distribution::{ChiSquared, ContinuousCDF, FisherSnedecor, StudentsT};
use std::f64::consts::PI;

/// Two-sided confidence level of the reported coefficient intervals.
pub const CONFIDENCE_LEVEL: f64 = 0.95;

/// A fitted OLS model `y = Xb + e` where column 0 of `X` is the intercept.
#[derive(Debug, Clone, PartialEq)]
pub struct OlsFit {
    /// Estimated parameters, intercept first
    pub params: Array1<f64>,
    /// Standard errors of the parameters
    pub std_errors: Array1<f64>,
    /// t-statistics
    pub t_values: Array1<f64>,
    /// Two-sided p-values
    pub p_values: Array1<f64>,
    /// Lower bounds of the confidence intervals
    pub conf_low: Array1<f64>,
    /// Upper bounds of the confidence intervals
    pub conf_high: Array1<f64>,
    /// Residuals in observation order
    pub residuals: Array1<f64>,
    /// Number of observations
    pub nobs: usize,
    /// Model degrees of freedom (regressors excluding the intercept)
    pub df_model: usize,
    /// Residual degrees of freedom
    pub df_resid: usize,
    /// Coefficient of determination
    pub r_squared: f64,
    /// Adjusted R², unclamped
    pub adj_r_squared: f64,
    /// F-statistic; `None` when undefined (no residual freedom or a perfect fit)
    pub f_statistic: Option<f64>,
    /// p-value of the F-statistic
    pub f_pvalue: Option<f64>,
    /// Gaussian log-likelihood
    pub log_likelihood: f64,
    /// Akaike information criterion
    pub aic: f64,
    /// Bayesian information criterion
    pub bic: f64,
    /// Durbin-Watson statistic of the residuals
    pub durbin_watson: f64,
    /// Jarque-Bera normality statistic of the residuals
    pub jarque_bera: f64,
    /// p-value of the Jarque-Bera statistic
    pub jb_pvalue: f64,
    /// Residual skewness
    pub skew: f64,
    /// Residual kurtosis (normal = 3)
    pub kurtosis: f64,
    /// Condition number of the design; `None` when it is singular
    pub condition_number: Option<f64>,
}

/// Fit `y` on `regressors` plus an intercept.
///
/// `regressors` has one row per observation and one column per regressor;
/// the intercept column is added here.
///
/// # Errors
/// * [`RegressionError::InsufficientData`] with fewer observations than
///   parameters
/// * [`RegressionError::DegenerateDesign`] when a regressor is constant or
///   the columns are collinear
pub fn fit_ols(y: ArrayView1<'_, f64>, regressors: ArrayView2<'_, f64>) -> Result<OlsFit> {
    let nobs = y.len();
    if regressors.nrows() != nobs {
        return Err(RegressionError::DimensionMismatch {
            expected: nobs,
            actual: regressors.nrows(),
        });
    }

    let k = regressors.ncols() + 1;
    if nobs < k {
        return Err(RegressionError::InsufficientData {
            required: k,
            actual: nobs,
        });
    }

    if y.iter().chain(regressors.iter()).any(|v| !v.is_finite()) {
        return Err(RegressionError::DegenerateDesign(
            "observations contain non-finite values".to_string(),
        ));
    }

    for (j, column) in regressors.axis_iter(Axis(1)).enumerate() {
        let first = column[0];
        if column.iter().all(|&v| v == first) {
            return Err(RegressionError::DegenerateDesign(format!(
                "regressor {} is constant",
                j + 1
            )));
        }
    }

    let mut design = Array2::<f64>::ones((nobs, k));
    design.slice_mut(s![.., 1..]).assign(&regressors);

    let gram = design.t().dot(&design);
    let factor = cholesky(&gram)?;
    let xty = design.t().dot(&y);
    let params = cholesky_solve(&factor, &xty);

    let fitted = design.dot(&params);
    let residuals = &y - &fitted;

    let df_model = k - 1;
    let df_resid = nobs - k;
    let n = nobs as f64;

    let ssr = residuals.dot(&residuals);
    let y_mean = y.sum() / n;
    let centered_tss = y.iter().map(|v| (v - y_mean).powi(2)).sum::<f64>();
    let ess = centered_tss - ssr;

    let r_squared = 1.0 - ssr / centered_tss;
    let adj_r_squared = 1.0 - (n - 1.0) / df_resid as f64 * (1.0 - r_squared);

    // Inference is undefined without residual degrees of freedom.
    let sigma2 = if df_resid > 0 {
        ssr / df_resid as f64
    } else {
        f64::NAN
    };
    let cov_params = cholesky_inverse(&factor) * sigma2;
    let std_errors = cov_params.diag().mapv(f64::sqrt);
    let t_values = &params / &std_errors;

    let t_dist = StudentsT::new(0.0, 1.0, df_resid as f64).ok();
    let p_values = t_values.mapv(|t| match &t_dist {
        Some(dist) if t.is_finite() => 2.0 * dist.sf(t.abs()),
        _ => f64::NAN,
    });
    let t_crit = t_dist
        .as_ref()
        .map_or(f64::NAN, |dist| dist.inverse_cdf(0.5 + CONFIDENCE_LEVEL / 2.0));
    let conf_low = &params - &(&std_errors * t_crit);
    let conf_high = &params + &(&std_errors * t_crit);

    let (f_statistic, f_pvalue) = f_test(ess, ssr, df_model, df_resid);

    let log_likelihood = -n / 2.0 * ((2.0 * PI).ln() + (ssr / n).ln() + 1.0);
    let aic = -2.0 * log_likelihood + 2.0 * k as f64;
    let bic = -2.0 * log_likelihood + k as f64 * n.ln();

    let durbin_watson = durbin_watson(residuals.view());
    let (skew, kurtosis) = skew_kurtosis(residuals.view());
    let jarque_bera = n / 6.0 * (skew.powi(2) + (kurtosis - 3.0).powi(2) / 4.0);
    let jb_pvalue = ChiSquared::new(2.0)
        .ok()
        .filter(|_| jarque_bera.is_finite())
        .map_or(f64::NAN, |dist| dist.sf(jarque_bera));

    Ok(OlsFit {
        params,
        std_errors,
        t_values,
        p_values,
        conf_low,
        conf_high,
        residuals,
        nobs,
        df_model,
        df_resid,
        r_squared,
        adj_r_squared,
        f_statistic,
        f_pvalue,
        log_likelihood,
        aic,
        bic,
        durbin_watson,
        jarque_bera,
        jb_pvalue,
        skew,
        kurtosis,
        condition_number: condition_number(&design),
    })
}

fn f_test(ess: f64, ssr: f64, df_model: usize, df_resid: usize) -> (Option<f64>, Option<f64>) {
    if df_resid == 0 || df_model == 0 || ssr <= 0.0 {
        return (None, None);
    }
    let f = (ess / df_model as f64) / (ssr / df_resid as f64);
    let p = FisherSnedecor::new(df_model as f64, df_resid as f64)
        .ok()
        .filter(|_| f.is_finite())
        .map(|dist| dist.sf(f));
    (Some(f), p)
}

/// Durbin-Watson statistic `Σ(e_t − e_{t−1})² / Σe_t²`.
pub fn durbin_watson(residuals: ArrayView1<'_, f64>) -> f64 {
    let denominator = residuals.dot(&residuals);
    let numerator: f64 = residuals
        .windows(2)
        .into_iter()
        .map(|w| (w[1] - w[0]).powi(2))
        .sum();
    numerator / denominator
}

/// Population skewness and (non-excess) kurtosis.
fn skew_kurtosis(values: ArrayView1<'_, f64>) -> (f64, f64) {
    let n = values.len() as f64;
    let mean = values.sum() / n;
    let (m2, m3, m4) = values.iter().fold((0.0, 0.0, 0.0), |(m2, m3, m4), v| {
        let d = v - mean;
        let d2 = d * d;
        (m2 + d2, m3 + d2 * d, m4 + d2 * d2)
    });
    let (m2, m3, m4) = (m2 / n, m3 / n, m4 / n);
    (m3 / m2.powf(1.5), m4 / (m2 * m2))
}
