use std::sync::Arc;

use crate::error::Result;
use crate::fitting::{fit_curve, smallest_admissible_root, CurveModel, FitStrategy};
use crate::material::Material;
use crate::table::ElementTable;

const Z_FIT_MAX_POLYNOMIAL: u32 = 52;
const POLYNOMIAL_DEGREE: usize = 5;

/// Curve basis for the Taylor parameterisation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TaylorMode {
    /// Interpolating spline through every tabulated element.
    #[default]
    Spline,
    /// Degree-5 polynomial over Z = 1..52.
    Polynomial,
}

/// Taylor formalism: same structure as Bourque but parameterises the total
/// microscopic cross section per atom rather than the electron cross
/// section.
pub struct Taylor {
    table: Arc<ElementTable>,
    mode: TaylorMode,
}

impl Taylor {
    pub fn new(table: Arc<ElementTable>, mode: TaylorMode) -> Self {
        Taylor { table, mode }
    }

    /// Fit total cross section per atom vs Z at the given energy.
    pub fn parameterize_at(&self, energy: f64) -> Result<Box<dyn CurveModel + Send + Sync>> {
        match self.mode {
            TaylorMode::Spline => {
                let mut zs = Vec::with_capacity(self.table.len());
                let mut xs = Vec::with_capacity(self.table.len());
                for element in self.table.iter() {
                    zs.push(element.z as f64);
                    xs.push(element.total_xs(energy));
                }
                fit_curve(FitStrategy::BSpline, &zs, &xs, 0)
            }
            TaylorMode::Polynomial => {
                let mut zs = Vec::with_capacity(Z_FIT_MAX_POLYNOMIAL as usize);
                let mut xs = Vec::with_capacity(Z_FIT_MAX_POLYNOMIAL as usize);
                for z in 1..=Z_FIT_MAX_POLYNOMIAL {
                    let element = self.table.element(z)?;
                    zs.push(z as f64);
                    xs.push(element.total_xs(energy));
                }
                fit_curve(FitStrategy::Polynomial, &zs, &xs, POLYNOMIAL_DEGREE)
            }
        }
    }

    /// Zeff of a committed material at a single energy. No upper admissible
    /// bound is asserted for this formalism.
    pub fn zeff_at(&self, material: &Material, energy: f64) -> Result<f64> {
        let target = material.total_xs_per_atom_at(energy)?;
        let curve = self.parameterize_at(energy)?;
        let candidates = curve.root_candidates(target)?;
        smallest_admissible_root("taylor", &candidates, target, None)
    }
}
