use std::sync::Arc;

use tracing::debug;

use crate::error::{Result, ZeffCtError};
use crate::fitting::{fit_curve, smallest_admissible_root, CurveModel, FitStrategy};
use crate::material::Material;
use crate::nist;
use crate::poly::{polyfit, polyval};
use crate::spline::CubicSpline;
use crate::table::ElementTable;

const Z_FIT_MAX: u32 = 52;
const DER_Z_MAX: u32 = 36;
const FIT_DEGREE: usize = 9;
const Z_UPPER_BOUND: f64 = 100.0;

/// Bourque formalism: parameterise the electron cross section as a function
/// of Z at the measurement energy, then invert it for a material's electron
/// cross section.
///
/// The polynomial strategies can fit poorly where the electron cross section
/// changes abruptly at low energy; the spline strategy is the default.
pub struct Bourque {
    table: Arc<ElementTable>,
    strategy: FitStrategy,
    water: Material,
}

impl Bourque {
    pub fn new(table: Arc<ElementTable>, strategy: FitStrategy) -> Result<Self> {
        let water = nist::reference_material("Water, Liquid", &table)?;
        Ok(Bourque {
            table,
            strategy,
            water,
        })
    }

    /// Fit the electron cross section vs Z curve at the given energy.
    pub fn parameterize_at(&self, energy: f64) -> Result<Box<dyn CurveModel + Send + Sync>> {
        let mut zs = Vec::with_capacity(Z_FIT_MAX as usize);
        let mut xs = Vec::with_capacity(Z_FIT_MAX as usize);
        for z in 1..=Z_FIT_MAX {
            let element = self.table.element(z)?;
            zs.push(z as f64);
            xs.push(element.electron_xs(energy));
        }
        fit_curve(self.strategy, &zs, &xs, FIT_DEGREE)
    }

    /// Zeff of a committed material at a single energy.
    pub fn zeff_at(&self, material: &Material, energy: f64) -> Result<f64> {
        let target = material.electron_xs_at(energy)?;
        let curve = self.parameterize_at(energy)?;
        let candidates = curve.root_candidates(target)?;
        smallest_admissible_root("bourque", &candidates, target, Some(Z_UPPER_BOUND))
    }

    /// The water-normalised dual-energy ratio of element Z between the two
    /// energies, evaluated through the fitted curves.
    pub fn dual_energy_ratio(&self, e_high: f64, e_low: f64, z: f64) -> Result<f64> {
        let low = self.parameterize_at(e_low)?;
        let high = self.parameterize_at(e_high)?;
        let mut der = low.evaluate(z) / high.evaluate(z);
        der *= self.water.mac_at(e_high)? / self.water.mac_at(e_low)?;
        Ok(der)
    }

    /// Precompute the DER(Z) polynomial and the inverse Z(DER) spline used
    /// for image-scale evaluation.
    ///
    /// Z and DER are bijective on Z = 1..36 for the reference library in
    /// use, which is what makes the inverse spline valid there.
    pub fn parameterize_der(&self, e_high: f64, e_low: f64) -> Result<DerTable> {
        let low = self.parameterize_at(e_low)?;
        let high = self.parameterize_at(e_high)?;
        let water_ratio = self.water.mac_at(e_high)? / self.water.mac_at(e_low)?;

        let mut zs = Vec::with_capacity(DER_Z_MAX as usize);
        let mut ders = Vec::with_capacity(DER_Z_MAX as usize);
        for z in 1..=DER_Z_MAX {
            let z = z as f64;
            zs.push(z);
            ders.push(low.evaluate(z) / high.evaluate(z) * water_ratio);
        }

        if !ders.windows(2).all(|w| w[0] < w[1]) {
            return Err(ZeffCtError::Numerical(format!(
                "DER is not strictly increasing over Z=1..{DER_Z_MAX} for E = ({e_low}, {e_high})"
            )));
        }

        let der_min = ders[0];
        let der_max = ders[ders.len() - 1];
        debug!(der_min, der_max, e_high, e_low, "DER table parameterised");

        let der_poly = polyfit(&zs, &ders, FIT_DEGREE)?;
        let inverse = CubicSpline::new(ders, zs)?;

        Ok(DerTable {
            e_high,
            e_low,
            water_ratio,
            der_min,
            der_max,
            der_poly,
            inverse,
        })
    }
}

/// The precomputed dual-energy-ratio model: DER(Z) as a degree-9 polynomial
/// and Z(DER) as an interpolating cubic spline, plus the water
/// normalisation.
///
/// This is the fast per-pixel evaluator: one ratio, one clamp, one spline
/// evaluation per pixel.
#[derive(Debug, Clone)]
pub struct DerTable {
    pub e_high: f64,
    pub e_low: f64,
    water_ratio: f64,
    pub der_min: f64,
    pub der_max: f64,
    der_poly: Vec<f64>,
    inverse: CubicSpline,
}

impl DerTable {
    /// DER predicted for an atomic number, through the fitted polynomial.
    pub fn der_of_z(&self, z: f64) -> f64 {
        polyval(&self.der_poly, z)
    }

    /// Zeff for a DER value; out-of-range DER is clamped to the fitted
    /// domain first, so the result saturates at the boundary Z.
    pub fn zeff_of_der(&self, der: f64) -> f64 {
        self.inverse.evaluate(der.clamp(self.der_min, self.der_max))
    }

    /// Zeff from a pixel's linear attenuation pair.
    pub fn zeff_of_mu_pair(&self, mu_high: f64, mu_low: f64) -> f64 {
        self.zeff_of_der(mu_low / mu_high * self.water_ratio)
    }

    pub fn water_ratio(&self) -> f64 {
        self.water_ratio
    }
}
