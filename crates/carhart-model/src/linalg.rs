//! Small dense linear algebra for least squares.
//!
//! The design matrices here are at most a handful of columns wide, so the
//! normal equations are solved by Cholesky factorization and eigenvalues come
//! from the cyclic Jacobi method.

use crate::error::{RegressionError, Result};
use ndarray::{Array1, Array2};

/// Relative pivot below which a Cholesky factorization is treated as singular.
const PIVOT_TOLERANCE: f64 = 1e-12;

/// Result of eigenvalue decomposition
#[derive(Debug, Clone)]
pub struct EigenDecomposition {
    /// Eigenvalues (sorted in descending order)
    pub eigenvalues: Array1<f64>,
    /// Eigenvectors (columns are eigenvectors)
    pub eigenvectors: Array2<f64>,
}

/// Lower-triangular Cholesky factor `L` with `A = L Lᵀ`.
///
/// Fails with [`RegressionError::DegenerateDesign`] when `A` is not
/// numerically positive definite.
pub fn cholesky(matrix: &Array2<f64>) -> Result<Array2<f64>> {
    let n = square_dim(matrix)?;
    let scale = matrix
        .diag()
        .iter()
        .fold(0.0_f64, |acc, v| acc.max(v.abs()));
    let mut l = Array2::<f64>::zeros((n, n));

    for j in 0..n {
        let mut diag = matrix[[j, j]];
        for k in 0..j {
            diag -= l[[j, k]] * l[[j, k]];
        }
        if !diag.is_finite() || diag <= PIVOT_TOLERANCE * scale {
            return Err(RegressionError::DegenerateDesign(format!(
                "normal matrix is singular at column {}",
                j
            )));
        }
        let pivot = diag.sqrt();
        l[[j, j]] = pivot;

        for i in (j + 1)..n {
            let mut sum = matrix[[i, j]];
            for k in 0..j {
                sum -= l[[i, k]] * l[[j, k]];
            }
            l[[i, j]] = sum / pivot;
        }
    }

    Ok(l)
}

/// Solve `L Lᵀ x = b` given the Cholesky factor `L`.
pub fn cholesky_solve(l: &Array2<f64>, b: &Array1<f64>) -> Array1<f64> {
    let n = l.nrows();

    // forward: L z = b
    let mut z = Array1::<f64>::zeros(n);
    for i in 0..n {
        let mut sum = b[i];
        for k in 0..i {
            sum -= l[[i, k]] * z[k];
        }
        z[i] = sum / l[[i, i]];
    }

    // backward: Lᵀ x = z
    let mut x = Array1::<f64>::zeros(n);
    for i in (0..n).rev() {
        let mut sum = z[i];
        for k in (i + 1)..n {
            sum -= l[[k, i]] * x[k];
        }
        x[i] = sum / l[[i, i]];
    }

    x
}

/// Inverse of a symmetric positive definite matrix from its Cholesky factor.
pub fn cholesky_inverse(l: &Array2<f64>) -> Array2<f64> {
    let n = l.nrows();
    let mut inverse = Array2::<f64>::zeros((n, n));
    for j in 0..n {
        let mut e = Array1::<f64>::zeros(n);
        e[j] = 1.0;
        inverse.column_mut(j).assign(&cholesky_solve(l, &e));
    }
    inverse
}

/// Condition number of a design matrix `X`.
///
/// Computed as `sqrt(λmax / λmin)` of `XᵀX`. Returns `None` when the smallest
/// eigenvalue is not positive.
pub fn condition_number(design: &Array2<f64>) -> Option<f64> {
    let gram = design.t().dot(design);
    let decomp = jacobi_eigendecomp(&gram, 500, 1e-14).ok()?;
    let max_eig = decomp.eigenvalues.first().copied()?;
    let min_eig = decomp.eigenvalues.last().copied()?;
    if min_eig <= 0.0 || !min_eig.is_finite() {
        return None;
    }
    Some((max_eig / min_eig).sqrt())
}

/// Jacobi eigenvalue decomposition for symmetric matrices
///
/// # Arguments
/// * `matrix` - Symmetric matrix to decompose
/// * `max_iterations` - Maximum number of rotations
/// * `tolerance` - Convergence tolerance for off-diagonal elements, relative
///   to the largest diagonal magnitude
///
/// # Returns
/// * Eigenvalues and eigenvectors
pub fn jacobi_eigendecomp(
    matrix: &Array2<f64>,
    max_iterations: usize,
    tolerance: f64,
) -> Result<EigenDecomposition> {
    let n = square_dim(matrix)?;

    let mut a = matrix.clone();
    let mut v = Array2::<f64>::eye(n);
    let scale = a.diag().iter().fold(0.0_f64, |acc, x| acc.max(x.abs())).max(f64::MIN_POSITIVE);

    for _ in 0..max_iterations {
        let Some((p, q, max_val)) = find_largest_off_diagonal(&a) else {
            break;
        };
        if max_val.abs() < tolerance * scale {
            break;
        }
        let (cos_theta, sin_theta) = compute_rotation(a[[p, p]], a[[q, q]], a[[p, q]]);
        apply_jacobi_rotation(&mut a, &mut v, p, q, cos_theta, sin_theta);
    }

    let eigenvalues: Array1<f64> = a.diag().to_owned();

    let mut indices: Vec<usize> = (0..n).collect();
    indices.sort_by(|&i, &j| eigenvalues[j].total_cmp(&eigenvalues[i]));

    let sorted_eigenvalues = indices.iter().map(|&i| eigenvalues[i]).collect();
    let mut sorted_eigenvectors = Array2::<f64>::zeros((n, n));
    for (new_idx, &old_idx) in indices.iter().enumerate() {
        sorted_eigenvectors
            .column_mut(new_idx)
            .assign(&v.column(old_idx));
    }

    Ok(EigenDecomposition {
        eigenvalues: sorted_eigenvalues,
        eigenvectors: sorted_eigenvectors,
    })
}

fn square_dim(matrix: &Array2<f64>) -> Result<usize> {
    let n = matrix.nrows();
    if n != matrix.ncols() {
        return Err(RegressionError::DimensionMismatch {
            expected: n,
            actual: matrix.ncols(),
        });
    }
    Ok(n)
}

/// Largest off-diagonal element, or `None` for matrices smaller than 2x2.
fn find_largest_off_diagonal(matrix: &Array2<f64>) -> Option<(usize, usize, f64)> {
    let n = matrix.nrows();
    if n < 2 {
        return None;
    }
    let mut max_val = 0.0;
    let mut p = 0;
    let mut q = 1;

    for i in 0..n {
        for j in (i + 1)..n {
            let val = matrix[[i, j]].abs();
            if val > max_val {
                max_val = val;
                p = i;
                q = j;
            }
        }
    }

    Some((p, q, matrix[[p, q]]))
}

/// Rotation `(cos, sin)` that zeroes `a[p][q]`.
fn compute_rotation(app: f64, aqq: f64, apq: f64) -> (f64, f64) {
    if apq.abs() < f64::MIN_POSITIVE {
        return (1.0, 0.0);
    }

    let tau = (aqq - app) / (2.0 * apq);
    let t = if tau >= 0.0 {
        1.0 / (tau + (1.0 + tau * tau).sqrt())
    } else {
        -1.0 / (-tau + (1.0 + tau * tau).sqrt())
    };

    let cos_theta = 1.0 / (1.0 + t * t).sqrt();
    (cos_theta, t * cos_theta)
}

fn apply_jacobi_rotation(
    a: &mut Array2<f64>,
    v: &mut Array2<f64>,
    p: usize,
    q: usize,
    cos_theta: f64,
    sin_theta: f64,
) {
    let n = a.nrows();
    let app = a[[p, p]];
    let aqq = a[[q, q]];
    let apq = a[[p, q]];

    a[[p, p]] = cos_theta * cos_theta * app - 2.0 * cos_theta * sin_theta * apq
        + sin_theta * sin_theta * aqq;
    a[[q, q]] = sin_theta * sin_theta * app
        + 2.0 * cos_theta * sin_theta * apq
        + cos_theta * cos_theta * aqq;
    a[[p, q]] = 0.0;
    a[[q, p]] = 0.0;

    for i in 0..n {
        if i != p && i != q {
            let aip = a[[i, p]];
            let aiq = a[[i, q]];

            a[[i, p]] = cos_theta * aip - sin_theta * aiq;
            a[[p, i]] = a[[i, p]];

            a[[i, q]] = sin_theta * aip + cos_theta * aiq;
            a[[q, i]] = a[[i, q]];
        }
    }

    for i in 0..n {
        let vip = v[[i, p]];
        let viq = v[[i, q]];

        v[[i, p]] = cos_theta * vip - sin_theta * viq;
        v[[i, q]] = sin_theta * vip + cos_theta * viq;
    }
}
