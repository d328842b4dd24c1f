use faer::Mat;

use crate::eigen::hessenberg_eigenvalues;
use crate::error::{Result, ZeffCtError};
use crate::linalg::lstsq;

/// Least-squares fit of a dense polynomial of the given degree.
///
/// Coefficients are returned in ascending order: c[0] + c[1] x + ... .
pub fn polyfit(xs: &[f64], ys: &[f64], degree: usize) -> Result<Vec<f64>> {
    if xs.len() != ys.len() {
        return Err(ZeffCtError::Numerical(
            "polyfit: mismatched sample lengths".into(),
        ));
    }
    let mut vandermonde = Mat::<f64>::zeros(xs.len(), degree + 1);
    for (i, &x) in xs.iter().enumerate() {
        let mut power = 1.0;
        for j in 0..=degree {
            vandermonde[(i, j)] = power;
            power *= x;
        }
    }
    lstsq(&vandermonde, ys)
}

/// Evaluate an ascending-coefficient polynomial by Horner's rule.
pub fn polyval(coeffs: &[f64], x: f64) -> f64 {
    coeffs.iter().rev().fold(0.0, |acc, &c| acc * x + c)
}

/// All (complex) roots of an ascending-coefficient polynomial, as (re, im)
/// pairs, via the eigenvalues of the balanced companion matrix.
pub fn polyroots(coeffs: &[f64]) -> Result<Vec<(f64, f64)>> {
    let mut c = coeffs.to_vec();
    while c.len() > 1 && c[c.len() - 1] == 0.0 {
        c.pop();
    }
    let n = c.len() - 1;
    if n < 1 {
        return Ok(Vec::new());
    }

    let mut companion = Mat::<f64>::zeros(n, n);
    for i in 0..n {
        companion[(i, n - 1)] = -c[i] / c[n];
    }
    for i in 1..n {
        companion[(i, i - 1)] = 1.0;
    }
    hessenberg_eigenvalues(&companion)
}

/// A Chebyshev-basis polynomial over the domain [lo, hi].
#[derive(Debug, Clone)]
pub struct Chebyshev {
    pub coeffs: Vec<f64>,
    pub lo: f64,
    pub hi: f64,
}

impl Chebyshev {
    /// Least-squares fit of the given degree over the sample domain.
    pub fn fit(xs: &[f64], ys: &[f64], degree: usize, lo: f64, hi: f64) -> Result<Self> {
        if xs.len() != ys.len() {
            return Err(ZeffCtError::Numerical(
                "chebfit: mismatched sample lengths".into(),
            ));
        }
        let mut design = Mat::<f64>::zeros(xs.len(), degree + 1);
        for (i, &x) in xs.iter().enumerate() {
            let u = Self::to_unit(x, lo, hi);
            let mut t_prev = 1.0;
            let mut t_cur = u;
            design[(i, 0)] = t_prev;
            if degree >= 1 {
                design[(i, 1)] = t_cur;
            }
            for j in 2..=degree {
                let t_next = 2.0 * u * t_cur - t_prev;
                design[(i, j)] = t_next;
                t_prev = t_cur;
                t_cur = t_next;
            }
        }
        let coeffs = lstsq(&design, ys)?;
        Ok(Chebyshev { coeffs, lo, hi })
    }

    #[inline]
    fn to_unit(x: f64, lo: f64, hi: f64) -> f64 {
        (2.0 * x - (hi + lo)) / (hi - lo)
    }

    pub fn evaluate(&self, x: f64) -> f64 {
        let u = Self::to_unit(x, self.lo, self.hi);
        let mut t_prev = 1.0;
        let mut t_cur = u;
        let mut sum = self.coeffs[0];
        if self.coeffs.len() > 1 {
            sum += self.coeffs[1] * t_cur;
        }
        for c in &self.coeffs[2.min(self.coeffs.len())..] {
            let t_next = 2.0 * u * t_cur - t_prev;
            sum += c * t_next;
            t_prev = t_cur;
            t_cur = t_next;
        }
        sum
    }

    /// All (complex) roots mapped back to the fit domain, via the
    /// eigenvalues of the balanced colleague matrix.
    ///
    /// The colleague matrix is upper Hessenberg: half-weight sub- and
    /// super-diagonals with the coefficient corrections folded into the last
    /// column.
    pub fn roots(&self) -> Result<Vec<(f64, f64)>> {
        let mut c = self.coeffs.clone();
        while c.len() > 1 && c[c.len() - 1] == 0.0 {
            c.pop();
        }
        let n = c.len() - 1;
        if n < 1 {
            return Ok(Vec::new());
        }

        let mut colleague = Mat::<f64>::zeros(n, n);
        if n >= 2 {
            colleague[(1, 0)] = 1.0;
        }
        for j in 1..n {
            colleague[(j - 1, j)] = 0.5;
            if j + 1 < n {
                colleague[(j + 1, j)] = 0.5;
            }
        }
        for i in 0..n {
            let value = colleague[(i, n - 1)] - c[i] / (2.0 * c[n]);
            colleague[(i, n - 1)] = value;
        }

        let scale = (self.hi - self.lo) / 2.0;
        let shift = (self.hi + self.lo) / 2.0;
        Ok(hessenberg_eigenvalues(&colleague)?
            .into_iter()
            .map(|(re, im)| (shift + re * scale, im * scale))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn polyfit_roundtrip_cubic() {
        let xs: Vec<f64> = (0..10).map(|i| i as f64).collect();
        let ys: Vec<f64> = xs.iter().map(|&x| 1.0 - 2.0 * x + 0.5 * x * x * x).collect();
        let c = polyfit(&xs, &ys, 3).unwrap();
        for (got, want) in c.iter().zip([1.0, -2.0, 0.0, 0.5]) {
            assert!((got - want).abs() < 1e-9, "{got} vs {want}");
        }
    }

    #[test]
    fn polyroots_of_factored_cubic() {
        // (x-1)(x-4)(x+2) = x^3 - 3x^2 - 6x + 8
        let mut roots: Vec<f64> = polyroots(&[8.0, -6.0, -3.0, 1.0])
            .unwrap()
            .into_iter()
            .filter(|(_, im)| im.abs() < 1e-9)
            .map(|(re, _)| re)
            .collect();
        roots.sort_by(f64::total_cmp);
        for (got, want) in roots.iter().zip([-2.0, 1.0, 4.0]) {
            assert!((got - want).abs() < 1e-9);
        }
    }

    #[test]
    fn chebyshev_fit_and_roots() {
        // exact quartic sampled densely; roots of (fit - 0.0) must match
        let quartic = |x: f64| (x - 0.5) * (x + 0.25) * (x * x + 2.0);
        let xs: Vec<f64> = (0..50).map(|i| -1.0 + i as f64 * (2.0 / 49.0)).collect();
        let ys: Vec<f64> = xs.iter().map(|&x| quartic(x)).collect();
        let cheb = Chebyshev::fit(&xs, &ys, 4, -1.0, 1.0).unwrap();
        assert!((cheb.evaluate(0.1) - quartic(0.1)).abs() < 1e-10);
        let mut roots: Vec<f64> = cheb
            .roots()
            .unwrap()
            .into_iter()
            .filter(|(re, im)| im.abs() < 1e-8 && re.abs() <= 1.0)
            .map(|(re, _)| re)
            .collect();
        roots.sort_by(f64::total_cmp);
        assert!((roots[0] + 0.25).abs() < 1e-8);
        assert!((roots[1] - 0.5).abs() < 1e-8);
    }
}
