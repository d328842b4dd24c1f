use crate::error::{Result, ZeffCtError};
use crate::poly::{polyfit, polyroots, polyval, Chebyshev};
use crate::spline::CubicSpline;

/// Imaginary-part tolerance below which a candidate root counts as real.
pub const REAL_ROOT_TOLERANCE: f64 = 1.0e-8;

/// Curve-fit strategy for the Z-parameterised cross-section curves.
///
/// All three fit the same samples and expose the same evaluate/roots
/// surface; which one runs is a configuration choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FitStrategy {
    Polynomial,
    Chebyshev,
    #[default]
    BSpline,
}

/// A fitted one-dimensional curve that can be evaluated and searched for
/// roots of `curve(x) == target`.
///
/// Root candidates are reported as (re, im) pairs; callers apply the
/// admissibility policy.
pub trait CurveModel {
    fn evaluate(&self, x: f64) -> f64;
    fn root_candidates(&self, target: f64) -> Result<Vec<(f64, f64)>>;
}

struct PolynomialCurve {
    coeffs: Vec<f64>,
}

impl CurveModel for PolynomialCurve {
    fn evaluate(&self, x: f64) -> f64 {
        polyval(&self.coeffs, x)
    }

    fn root_candidates(&self, target: f64) -> Result<Vec<(f64, f64)>> {
        let mut shifted = self.coeffs.clone();
        shifted[0] -= target;
        polyroots(&shifted)
    }
}

impl CurveModel for Chebyshev {
    fn evaluate(&self, x: f64) -> f64 {
        Chebyshev::evaluate(self, x)
    }

    fn root_candidates(&self, target: f64) -> Result<Vec<(f64, f64)>> {
        let mut shifted = self.clone();
        shifted.coeffs[0] -= target;
        shifted.roots()
    }
}

impl CurveModel for CubicSpline {
    fn evaluate(&self, x: f64) -> f64 {
        CubicSpline::evaluate(self, x)
    }

    fn root_candidates(&self, target: f64) -> Result<Vec<(f64, f64)>> {
        Ok(self.roots(target)?.into_iter().map(|r| (r, 0.0)).collect())
    }
}

/// Fit a curve through (xs, ys) with the chosen strategy. `degree` applies
/// to the two polynomial bases; the spline interpolates the samples.
pub fn fit_curve(
    strategy: FitStrategy,
    xs: &[f64],
    ys: &[f64],
    degree: usize,
) -> Result<Box<dyn CurveModel + Send + Sync>> {
    match strategy {
        FitStrategy::Polynomial => Ok(Box::new(PolynomialCurve {
            coeffs: polyfit(xs, ys, degree)?,
        })),
        FitStrategy::Chebyshev => Ok(Box::new(Chebyshev::fit(
            xs,
            ys,
            degree,
            xs[0],
            xs[xs.len() - 1],
        )?)),
        FitStrategy::BSpline => Ok(Box::new(CubicSpline::new(xs.to_vec(), ys.to_vec())?)),
    }
}

/// Apply the root admissibility policy: drop complex candidates, drop
/// candidates outside (0, upper], and return the smallest survivor.
///
/// The smallest-root tie-break targets the lowest-Z branch of the fitted
/// curve. It is inherited from the formalisms as published; it is an
/// assumption, not a proven selection rule, for the multi-root cases the
/// wiggly high-degree fits can produce.
pub fn smallest_admissible_root(
    method: &'static str,
    candidates: &[(f64, f64)],
    target: f64,
    upper: Option<f64>,
) -> Result<f64> {
    let mut best: Option<f64> = None;
    for &(re, im) in candidates {
        if im.abs() > REAL_ROOT_TOLERANCE {
            continue;
        }
        if re <= 0.0 {
            continue;
        }
        if let Some(limit) = upper {
            if re > limit {
                continue;
            }
        }
        best = Some(match best {
            Some(current) if current <= re => current,
            _ => re,
        });
    }
    best.ok_or(ZeffCtError::NoAdmissibleRoot { method, target })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policy_selects_smallest_real_in_range() {
        let candidates = [(12.0, 0.0), (3.5, 0.0), (-2.0, 0.0), (5.0, 1.0), (150.0, 0.0)];
        let root = smallest_admissible_root("test", &candidates, 0.0, Some(100.0)).unwrap();
        assert_eq!(root, 3.5);
    }

    #[test]
    fn policy_fails_when_nothing_admissible() {
        let candidates = [(-1.0, 0.0), (4.0, 2.0)];
        let err = smallest_admissible_root("test", &candidates, 1.0, None).unwrap_err();
        assert!(matches!(
            err,
            ZeffCtError::NoAdmissibleRoot { method: "test", .. }
        ));
    }

    #[test]
    fn strategies_agree_on_a_smooth_curve() {
        let xs: Vec<f64> = (1..=40).map(|i| i as f64).collect();
        let ys: Vec<f64> = xs.iter().map(|&x| 0.02 * x * x + 0.3 * x + 1.0).collect();
        for strategy in [
            FitStrategy::Polynomial,
            FitStrategy::Chebyshev,
            FitStrategy::BSpline,
        ] {
            let curve = fit_curve(strategy, &xs, &ys, 9).unwrap();
            assert!(
                (curve.evaluate(17.5) - (0.02 * 17.5 * 17.5 + 0.3 * 17.5 + 1.0)).abs() < 1e-5,
                "{strategy:?}"
            );
        }
    }
}
