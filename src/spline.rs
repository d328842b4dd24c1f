use crate::error::{Result, ZeffCtError};
use crate::poly::polyroots;

/// An interpolating cubic spline stored as knots plus pre-computed second
/// derivatives (natural boundary conditions).
///
/// Evaluation uses the standard two-sided form
/// `a*y[lo] + b*y[hi] + h^2/6 * ((a^3-a) y''[lo] + (b^3-b) y''[hi])`
/// with a binary bracket search over the knots.
#[derive(Debug, Clone)]
pub struct CubicSpline {
    x: Vec<f64>,
    y: Vec<f64>,
    y2: Vec<f64>,
}

impl CubicSpline {
    /// Build the spline through the given knots. `x` must be strictly
    /// increasing and hold at least three points.
    pub fn new(x: Vec<f64>, y: Vec<f64>) -> Result<Self> {
        if x.len() != y.len() {
            return Err(ZeffCtError::Numerical(
                "spline: mismatched knot lengths".into(),
            ));
        }
        if x.len() < 3 {
            return Err(ZeffCtError::Numerical(
                "spline: at least three knots required".into(),
            ));
        }
        if !x.windows(2).all(|w| w[0] < w[1]) {
            return Err(ZeffCtError::Numerical(
                "spline: knots must be strictly increasing".into(),
            ));
        }

        let n = x.len();
        let mut y2 = vec![0.0; n];
        let mut u = vec![0.0; n];
        for i in 1..n - 1 {
            let sig = (x[i] - x[i - 1]) / (x[i + 1] - x[i - 1]);
            let p = sig * y2[i - 1] + 2.0;
            y2[i] = (sig - 1.0) / p;
            let slope_diff =
                (y[i + 1] - y[i]) / (x[i + 1] - x[i]) - (y[i] - y[i - 1]) / (x[i] - x[i - 1]);
            u[i] = (6.0 * slope_diff / (x[i + 1] - x[i - 1]) - sig * u[i - 1]) / p;
        }
        for k in (1..n - 1).rev() {
            y2[k] = y2[k] * y2[k + 1] + u[k];
        }

        Ok(CubicSpline { x, y, y2 })
    }

    pub fn domain(&self) -> (f64, f64) {
        (self.x[0], self.x[self.x.len() - 1])
    }

    /// Evaluate at `xv`; outside the knot range the boundary cubic is
    /// extended.
    pub fn evaluate(&self, xv: f64) -> f64 {
        let n = self.x.len();
        let hi = match self.x.partition_point(|&v| v < xv) {
            0 => 1,
            i if i >= n => n - 1,
            i => i,
        };
        let lo = hi - 1;

        let h = self.x[hi] - self.x[lo];
        let a = (self.x[hi] - xv) / h;
        let b = (xv - self.x[lo]) / h;
        a * self.y[lo]
            + b * self.y[hi]
            + (h * h / 6.0)
                * ((a * a * a - a) * self.y2[lo] + (b * b * b - b) * self.y2[hi])
    }

    /// Evaluate with the argument clamped into the knot range, so
    /// out-of-range queries return the boundary knot value.
    pub fn evaluate_clamped(&self, xv: f64) -> f64 {
        let (lo, hi) = self.domain();
        self.evaluate(xv.clamp(lo, hi))
    }

    /// All solutions of `spline(x) == target` inside the knot range.
    ///
    /// Each interval's cubic is solved exactly (companion roots of the
    /// local cubic in the normalised coordinate); duplicates at shared
    /// knots are merged. Results are ascending.
    pub fn roots(&self, target: f64) -> Result<Vec<f64>> {
        let n = self.x.len();
        let mut found: Vec<f64> = Vec::new();

        for i in 0..n - 1 {
            let h = self.x[i + 1] - self.x[i];
            let k = h * h / 6.0;
            let (y0, y1) = (self.y[i] - target, self.y[i + 1] - target);
            let (s0, s1) = (self.y2[i], self.y2[i + 1]);
            // spline restricted to the interval, as a cubic in t = (x-x_i)/h:
            // (1-t) y0 + t y1 + k [((1-t)^3-(1-t)) s0 + (t^3-t) s1]
            let c0 = y0;
            let c1 = (y1 - y0) + k * (-2.0 * s0 - s1);
            let c2 = k * 3.0 * s0;
            let c3 = k * (s1 - s0);

            for (re, im) in polyroots(&[c0, c1, c2, c3])? {
                if im.abs() < 1.0e-9 && (-1.0e-9..=1.0 + 1.0e-9).contains(&re) {
                    let root = self.x[i] + re.clamp(0.0, 1.0) * h;
                    if !found.iter().any(|&r| (r - root).abs() < 1.0e-9) {
                        found.push(root);
                    }
                }
            }
        }

        found.sort_by(f64::total_cmp);
        Ok(found)
    }
}
