use std::sync::Arc;

use crate::error::Result;
use crate::fitting::smallest_admissible_root;
use crate::material::Material;
use crate::poly::{polyfit, polyroots, polyval};
use crate::table::ElementTable;

const Z_FIT_MAX: u32 = 20;
const F_DEGREE: usize = 4;
const G_DEGREE: usize = 3;
const Z_UPPER_BOUND: f64 = 100.0;

/// Torikoshi parameterisation at one energy: the Z^4-scaled photoelectric
/// term F(Z) and the linear-in-Z scatter term G(Z), combined into a single
/// degree-8 polynomial whose roots solve the Zeff equation directly.
#[derive(Debug, Clone)]
pub struct TorikoshiCurve {
    f_coeffs: Vec<f64>,
    g_coeffs: Vec<f64>,
    combined: Vec<f64>,
}

impl TorikoshiCurve {
    /// F(Z) = sigma_pe / Z^5, the photoelectric shape factor.
    pub fn f(&self, z: f64) -> f64 {
        polyval(&self.f_coeffs, z)
    }

    /// G(Z) = (sigma_compton + sigma_rayleigh) / Z, the scatter shape
    /// factor.
    pub fn g(&self, z: f64) -> f64 {
        polyval(&self.g_coeffs, z)
    }

    /// Electron cross section predicted by the split parameterisation:
    /// Z^4 F(Z) + G(Z).
    pub fn electron_xs(&self, z: f64) -> f64 {
        z.powi(4) * self.f(z) + self.g(z)
    }
}

/// Torikoshi formalism: avoids a separate nonlinear solve by combining the
/// two fitted terms into one polynomial and root-solving it.
pub struct Torikoshi {
    table: Arc<ElementTable>,
}

impl Torikoshi {
    pub fn new(table: Arc<ElementTable>) -> Self {
        Torikoshi { table }
    }

    pub fn parameterize_at(&self, energy: f64) -> Result<TorikoshiCurve> {
        let mut zs = Vec::with_capacity(Z_FIT_MAX as usize);
        let mut f_samples = Vec::with_capacity(Z_FIT_MAX as usize);
        let mut g_samples = Vec::with_capacity(Z_FIT_MAX as usize);
        for z in 1..=Z_FIT_MAX {
            let element = self.table.element(z)?;
            let zf = z as f64;
            zs.push(zf);
            f_samples.push(element.photoelectric_xs(energy) / zf.powi(5));
            g_samples.push((element.compton_xs(energy) + element.rayleigh_xs(energy)) / zf);
        }

        let f_coeffs = polyfit(&zs, &f_samples, F_DEGREE)?;
        let g_coeffs = polyfit(&zs, &g_samples, G_DEGREE)?;

        // Z^4 * F(Z) + G(Z) as one degree-8 polynomial
        let mut combined = vec![0.0; F_DEGREE + 4 + 1];
        for (i, &g) in g_coeffs.iter().enumerate() {
            combined[i] += g;
        }
        for (i, &f) in f_coeffs.iter().enumerate() {
            combined[i + 4] += f;
        }

        Ok(TorikoshiCurve {
            f_coeffs,
            g_coeffs,
            combined,
        })
    }

    /// Zeff of a committed material at a single energy.
    pub fn zeff_at(&self, material: &Material, energy: f64) -> Result<f64> {
        let target = material.electron_xs_at(energy)?;
        let curve = self.parameterize_at(energy)?;
        let mut shifted = curve.combined.clone();
        shifted[0] -= target;
        let candidates = polyroots(&shifted)?;
        smallest_admissible_root("torikoshi", &candidates, target, Some(Z_UPPER_BOUND))
    }
}
