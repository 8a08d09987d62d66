//! Small dense linear-algebra routines used by the fitters.
//!
//! The design matrices in this study are tall and narrow (hundreds of rows,
//! at most a few dozen columns), so the crate carries its own Cholesky solve
//! and a Jacobi eigendecomposition instead of a BLAS-backed dependency. These
//! are intentionally small and easy to test.

use ndarray::{Array1, Array2};

use crate::error::AnalysisError;

/// Cholesky factor (lower triangular) of a symmetric positive-definite matrix.
///
/// Fails with `SingularFit` when a pivot is not strictly positive, which is
/// how collinear predictor sets surface from the OLS normal equations.
pub fn cholesky(a: &Array2<f64>) -> Result<Array2<f64>, AnalysisError> {
    let n = a.nrows();
    assert_eq!(n, a.ncols(), "cholesky requires a square matrix");

    let mut l = Array2::<f64>::zeros((n, n));
    for j in 0..n {
        let mut diag = a[(j, j)];
        for k in 0..j {
            diag -= l[(j, k)] * l[(j, k)];
        }
        if diag <= 0.0 || !diag.is_finite() {
            return Err(AnalysisError::SingularFit(format!(
                "non-positive pivot at column {}",
                j
            )));
        }
        let diag = diag.sqrt();
        l[(j, j)] = diag;

        for i in (j + 1)..n {
            let mut sum = a[(i, j)];
            for k in 0..j {
                sum -= l[(i, k)] * l[(j, k)];
            }
            l[(i, j)] = sum / diag;
        }
    }
    Ok(l)
}

/// Solve `A x = b` for symmetric positive-definite `A` via Cholesky.
pub fn solve_spd(a: &Array2<f64>, b: &Array1<f64>) -> Result<Array1<f64>, AnalysisError> {
    let l = cholesky(a)?;
    Ok(solve_with_factor(&l, b))
}

/// Forward/back substitution with a precomputed lower-triangular factor.
fn solve_with_factor(l: &Array2<f64>, b: &Array1<f64>) -> Array1<f64> {
    let n = l.nrows();

    // L y = b
    let mut y = Array1::<f64>::zeros(n);
    for i in 0..n {
        let mut sum = b[i];
        for k in 0..i {
            sum -= l[(i, k)] * y[k];
        }
        y[i] = sum / l[(i, i)];
    }

    // L' x = y
    let mut x = Array1::<f64>::zeros(n);
    for i in (0..n).rev() {
        let mut sum = y[i];
        for k in (i + 1)..n {
            sum -= l[(k, i)] * x[k];
        }
        x[i] = sum / l[(i, i)];
    }
    x
}

/// Inverse of a symmetric positive-definite matrix, column by column.
pub fn inverse_spd(a: &Array2<f64>) -> Result<Array2<f64>, AnalysisError> {
    let n = a.nrows();
    let l = cholesky(a)?;
    let mut inv = Array2::<f64>::zeros((n, n));
    for j in 0..n {
        let mut e = Array1::<f64>::zeros(n);
        e[j] = 1.0;
        let col = solve_with_factor(&l, &e);
        for i in 0..n {
            inv[(i, j)] = col[i];
        }
    }
    Ok(inv)
}

/// Eigendecomposition of a symmetric matrix by cyclic Jacobi rotations.
///
/// Returns `(values, vectors)` with eigenvalues sorted descending and the
/// matching eigenvectors as columns. Convergence is to machine precision on
/// the off-diagonal norm; the item correlation matrices this is used for are
/// tiny, so the quadratic sweep cost is irrelevant.
pub fn jacobi_eigh(a: &Array2<f64>) -> (Array1<f64>, Array2<f64>) {
    let n = a.nrows();
    assert_eq!(n, a.ncols(), "jacobi_eigh requires a square matrix");

    let mut m = a.clone();
    let mut v = Array2::<f64>::eye(n);

    const MAX_SWEEPS: usize = 100;
    const TOL: f64 = 1e-12;

    for _ in 0..MAX_SWEEPS {
        let mut off = 0.0;
        for i in 0..n {
            for j in (i + 1)..n {
                off += m[(i, j)] * m[(i, j)];
            }
        }
        if off.sqrt() < TOL {
            break;
        }

        for p in 0..n {
            for q in (p + 1)..n {
                if m[(p, q)].abs() < TOL {
                    continue;
                }
                let theta = (m[(q, q)] - m[(p, p)]) / (2.0 * m[(p, q)]);
                let t = theta.signum() / (theta.abs() + (theta * theta + 1.0).sqrt());
                let c = 1.0 / (t * t + 1.0).sqrt();
                let s = t * c;

                for k in 0..n {
                    let mkp = m[(k, p)];
                    let mkq = m[(k, q)];
                    m[(k, p)] = c * mkp - s * mkq;
                    m[(k, q)] = s * mkp + c * mkq;
                }
                for k in 0..n {
                    let mpk = m[(p, k)];
                    let mqk = m[(q, k)];
                    m[(p, k)] = c * mpk - s * mqk;
                    m[(q, k)] = s * mpk + c * mqk;
                }
                for k in 0..n {
                    let vkp = v[(k, p)];
                    let vkq = v[(k, q)];
                    v[(k, p)] = c * vkp - s * vkq;
                    v[(k, q)] = s * vkp + c * vkq;
                }
            }
        }
    }

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a_idx, &b_idx| {
        m[(b_idx, b_idx)]
            .partial_cmp(&m[(a_idx, a_idx)])
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut values = Array1::<f64>::zeros(n);
    let mut vectors = Array2::<f64>::zeros((n, n));
    for (out_col, &src_col) in order.iter().enumerate() {
        values[out_col] = m[(src_col, src_col)];
        for row in 0..n {
            vectors[(row, out_col)] = v[(row, src_col)];
        }
    }
    (values, vectors)
}
