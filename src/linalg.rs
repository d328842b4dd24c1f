use faer::Mat;

use crate::error::{Result, ZeffCtError};

/// Solve the overdetermined system `a x = b` in the least-squares sense.
///
/// Columns are equilibrated before a Householder QR pass; the triangular
/// solve runs on the scaled system and the scaling is undone on the way out.
pub fn lstsq(a: &Mat<f64>, b: &[f64]) -> Result<Vec<f64>> {
    let m = a.nrows();
    let n = a.ncols();
    if m < n {
        return Err(ZeffCtError::Numerical(format!(
            "least squares needs at least {n} rows, got {m}"
        )));
    }
    if b.len() != m {
        return Err(ZeffCtError::Numerical(format!(
            "rhs length {} does not match {m} rows",
            b.len()
        )));
    }

    let mut work = a.clone();
    let mut rhs = b.to_vec();

    let mut scale = vec![1.0; n];
    for j in 0..n {
        let norm: f64 = (0..m).map(|i| work[(i, j)] * work[(i, j)]).sum::<f64>().sqrt();
        if norm > 0.0 {
            scale[j] = norm;
            for i in 0..m {
                work[(i, j)] /= norm;
            }
        }
    }

    let mut v = vec![0.0; m];
    for k in 0..n {
        let mut norm: f64 = (k..m).map(|i| work[(i, k)] * work[(i, k)]).sum::<f64>().sqrt();
        if norm == 0.0 {
            continue;
        }
        if work[(k, k)] > 0.0 {
            norm = -norm;
        }
        for i in k..m {
            v[i] = work[(i, k)];
        }
        v[k] -= norm;
        let vtv: f64 = (k..m).map(|i| v[i] * v[i]).sum();
        if vtv == 0.0 {
            continue;
        }
        for j in k..n {
            let dot: f64 = (k..m).map(|i| v[i] * work[(i, j)]).sum();
            let factor = 2.0 * dot / vtv;
            for i in k..m {
                work[(i, j)] -= factor * v[i];
            }
        }
        let dot: f64 = (k..m).map(|i| v[i] * rhs[i]).sum();
        let factor = 2.0 * dot / vtv;
        for i in k..m {
            rhs[i] -= factor * v[i];
        }
    }

    let mut x = vec![0.0; n];
    for i in (0..n).rev() {
        let mut sum = rhs[i];
        for j in (i + 1)..n {
            sum -= work[(i, j)] * x[j];
        }
        let diagonal = work[(i, i)];
        if diagonal.abs() < 1.0e-300 {
            return Err(ZeffCtError::Numerical(format!(
                "rank-deficient least-squares system at column {i}"
            )));
        }
        x[i] = sum / diagonal;
    }

    for j in 0..n {
        x[j] /= scale[j];
    }
    Ok(x)
}

/// Solve the square system `a x = b` by partial-pivot LU elimination.
pub fn lu_solve(a: &Mat<f64>, b: &[f64]) -> Result<Vec<f64>> {
    let n = a.nrows();
    if a.ncols() != n {
        return Err(ZeffCtError::Numerical(format!(
            "LU solve requires a square matrix, got {}x{}",
            a.nrows(),
            a.ncols()
        )));
    }
    if b.len() != n {
        return Err(ZeffCtError::Numerical(format!(
            "rhs length {} does not match dimension {n}",
            b.len()
        )));
    }

    let mut lu = a.clone();
    let mut x = b.to_vec();

    for col in 0..n {
        let mut pivot_row = col;
        let mut pivot_mag = lu[(col, col)].abs();
        for row in (col + 1)..n {
            let mag = lu[(row, col)].abs();
            if mag > pivot_mag {
                pivot_mag = mag;
                pivot_row = row;
            }
        }
        if pivot_mag < 1.0e-300 {
            return Err(ZeffCtError::Numerical(format!(
                "singular matrix at pivot {col}"
            )));
        }
        if pivot_row != col {
            for j in 0..n {
                let tmp = lu[(col, j)];
                lu[(col, j)] = lu[(pivot_row, j)];
                lu[(pivot_row, j)] = tmp;
            }
            x.swap(col, pivot_row);
        }
        let pivot = lu[(col, col)];
        for row in (col + 1)..n {
            let factor = lu[(row, col)] / pivot;
            lu[(row, col)] = factor;
            for j in (col + 1)..n {
                let updated = lu[(row, j)] - factor * lu[(col, j)];
                lu[(row, j)] = updated;
            }
            x[row] -= factor * x[col];
        }
    }

    for row in (0..n).rev() {
        let mut sum = x[row];
        for j in (row + 1)..n {
            sum -= lu[(row, j)] * x[j];
        }
        x[row] = sum / lu[(row, row)];
    }
    Ok(x)
}

/// Damped Gauss-Newton refinement for small nonlinear least-squares fits.
///
/// `eval` fills residuals and the Jacobian (row-major, one row per residual)
/// at the current parameters. Iterates until the update stalls or the
/// iteration cap is hit; hitting the cap is an error, not a stale result.
pub fn gauss_newton(
    params: &mut [f64],
    residual_count: usize,
    max_iterations: usize,
    mut eval: impl FnMut(&[f64], &mut [f64], &mut Mat<f64>),
) -> Result<()> {
    let p = params.len();
    let mut residuals = vec![0.0; residual_count];
    let mut jacobian = Mat::<f64>::zeros(residual_count, p);

    for _ in 0..max_iterations {
        eval(params, &mut residuals, &mut jacobian);

        // normal equations J^T J dp = J^T r
        let mut jtj = Mat::<f64>::zeros(p, p);
        let mut jtr = vec![0.0; p];
        for i in 0..residual_count {
            for a in 0..p {
                jtr[a] += jacobian[(i, a)] * residuals[i];
                for b in a..p {
                    let value = jtj[(a, b)] + jacobian[(i, a)] * jacobian[(i, b)];
                    jtj[(a, b)] = value;
                }
            }
        }
        for a in 0..p {
            for b in 0..a {
                jtj[(a, b)] = jtj[(b, a)];
            }
        }

        let delta = lu_solve(&jtj, &jtr)?;
        let mut largest = 0.0f64;
        for (value, step) in params.iter_mut().zip(delta.iter()) {
            *value += step;
            largest = largest.max(step.abs() / (1.0 + value.abs()));
        }
        if largest < 1.0e-13 {
            return Ok(());
        }
    }
    Err(ZeffCtError::NonConvergence {
        method: "gauss-newton",
        iterations: max_iterations,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lstsq_recovers_exact_quadratic() {
        // y = 2 + 3x - x^2 sampled exactly
        let xs = [0.0, 1.0, 2.0, 3.0, 4.0];
        let mut a = Mat::<f64>::zeros(xs.len(), 3);
        let mut b = vec![0.0; xs.len()];
        for (i, &x) in xs.iter().enumerate() {
            a[(i, 0)] = 1.0;
            a[(i, 1)] = x;
            a[(i, 2)] = x * x;
            b[i] = 2.0 + 3.0 * x - x * x;
        }
        let c = lstsq(&a, &b).unwrap();
        assert!((c[0] - 2.0).abs() < 1e-10);
        assert!((c[1] - 3.0).abs() < 1e-10);
        assert!((c[2] + 1.0).abs() < 1e-10);
    }

    #[test]
    fn lu_solve_recovers_known_solution() {
        let mut a = Mat::<f64>::zeros(3, 3);
        let rows = [[0.0, 2.0, 1.0], [1.0, -2.0, -3.0], [2.0, 3.0, 1.0]];
        for (i, row) in rows.iter().enumerate() {
            for (j, &value) in row.iter().enumerate() {
                a[(i, j)] = value;
            }
        }
        let expected = [1.0, 2.0, -0.5];
        let b: Vec<f64> = (0..3)
            .map(|i| (0..3).map(|j| rows[i][j] * expected[j]).sum())
            .collect();
        let x = lu_solve(&a, &b).unwrap();
        for (got, want) in x.iter().zip(expected.iter()) {
            assert!((got - want).abs() < 1e-12);
        }
    }

    #[test]
    fn lu_solve_rejects_singular() {
        let mut a = Mat::<f64>::zeros(2, 2);
        a[(0, 0)] = 1.0;
        a[(0, 1)] = 2.0;
        a[(1, 0)] = 2.0;
        a[(1, 1)] = 4.0;
        assert!(lu_solve(&a, &[1.0, 2.0]).is_err());
    }
}
