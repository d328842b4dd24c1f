use faer::Mat;
use tracing::info;

use crate::control_point::ControlPoint;
use crate::error::{Result, ZeffCtError};
use crate::linalg::lu_solve;

/// Thin-plate radial basis kernel, phi(r) = r^2 ln r (phi(0) = 0).
#[inline]
fn thin_plate(r: f64) -> f64 {
    if r == 0.0 {
        0.0
    } else {
        r * r * r.ln()
    }
}

/// A thin-plate-spline surface over scattered control points:
/// (x = CT number at E_high, y = CT number at E_low) -> Zeff.
///
/// The interpolant reproduces its control points exactly; outside the
/// training CT range the surface is unconstrained and can diverge, so
/// callers clamp inputs into the domain first.
#[derive(Debug, Clone)]
pub struct ThinPlateSurface {
    points: Vec<(f64, f64)>,
    weights: Vec<f64>,
    x_range: (f64, f64),
    y_range: (f64, f64),
}

impl ThinPlateSurface {
    /// Fit the interpolating surface through the given control points.
    pub fn fit(control_points: &[ControlPoint]) -> Result<Self> {
        let n = control_points.len();
        if n < 3 {
            return Err(ZeffCtError::Numerical(format!(
                "surface fit needs at least 3 control points, got {n}"
            )));
        }

        let points: Vec<(f64, f64)> = control_points
            .iter()
            .map(|cp| (cp.ct_high, cp.ct_low))
            .collect();
        let values: Vec<f64> = control_points.iter().map(|cp| cp.zeff_ave).collect();

        let mut kernel = Mat::<f64>::zeros(n, n);
        for i in 0..n {
            for j in 0..n {
                let dx = points[i].0 - points[j].0;
                let dy = points[i].1 - points[j].1;
                kernel[(i, j)] = thin_plate((dx * dx + dy * dy).sqrt());
            }
        }
        let weights = lu_solve(&kernel, &values)?;

        let mut x_range = (f64::INFINITY, f64::NEG_INFINITY);
        let mut y_range = (f64::INFINITY, f64::NEG_INFINITY);
        for &(x, y) in &points {
            x_range = (x_range.0.min(x), x_range.1.max(x));
            y_range = (y_range.0.min(y), y_range.1.max(y));
        }

        let surface = ThinPlateSurface {
            points,
            weights,
            x_range,
            y_range,
        };

        let diagnostic = surface.mean_relative_error(control_points);
        info!(
            control_points = n,
            mean_relative_error = diagnostic,
            "thin-plate surface fitted"
        );

        Ok(surface)
    }

    /// Evaluate the surface at (CT_high, CT_low).
    pub fn evaluate(&self, ct_high: f64, ct_low: f64) -> f64 {
        self.points
            .iter()
            .zip(self.weights.iter())
            .map(|(&(x, y), &w)| {
                let dx = ct_high - x;
                let dy = ct_low - y;
                w * thin_plate((dx * dx + dy * dy).sqrt())
            })
            .sum()
    }

    /// Clamp a query point into the training CT range.
    pub fn clamp_domain(&self, ct_high: f64, ct_low: f64) -> (f64, f64) {
        (
            ct_high.clamp(self.x_range.0, self.x_range.1),
            ct_low.clamp(self.y_range.0, self.y_range.1),
        )
    }

    /// Average relative reconstruction error over a set of control points;
    /// the fit-quality diagnostic.
    pub fn mean_relative_error(&self, control_points: &[ControlPoint]) -> f64 {
        let mut sum = 0.0;
        for cp in control_points {
            let predicted = self.evaluate(cp.ct_high, cp.ct_low);
            sum += (predicted - cp.zeff_ave).abs() / cp.zeff_ave;
        }
        sum / control_points.len() as f64
    }

    pub fn x_range(&self) -> (f64, f64) {
        self.x_range
    }

    pub fn y_range(&self) -> (f64, f64) {
        self.y_range
    }
}
