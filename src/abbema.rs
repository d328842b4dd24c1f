use faer::Mat;
use serde::Serialize;

use crate::error::{Result, ZeffCtError};
use crate::linalg::{gauss_newton, lstsq};
use crate::protocol::DualEnergyProtocol;
use crate::table::ElementTable;

const NEWTON_MAX_ITERATIONS: usize = 50;
const BRACKET_SCAN_STEPS: usize = 2000;
const Z_SCAN_MIN: f64 = 0.05;
const Z_SCAN_MAX: f64 = 100.0;

const FIT_E_START: f64 = 50.0;
const FIT_E_STOP: f64 = 100.0;
const FIT_E_POINTS: usize = 100;

/// Coefficients of the Abbema closed-form cross-section model:
///
///   sigma_pe(E, Z) = a * E^-b * Z^c
///   sigma_rl(E, Z) = d * E^-f * Z^g
///   sigma_cs(E, Z) = h * exp(-j E) * Z^k
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AbbemaCoefficients {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub f: f64,
    pub g: f64,
    pub h: f64,
    pub j: f64,
    pub k: f64,
}

/// Where the coefficient set comes from; selected by configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CoefficientSource {
    /// Constants as published.
    #[default]
    Literature,
    /// Locally re-derived constants.
    LocallyModified,
    /// Staged refit: exponents in E from oxygen, exponents in Z at the mean
    /// effective energy, amplitudes pinned at oxygen.
    StagedFit,
    /// Joint refit of each process over the full (Z, E) grid.
    JointFit,
}

impl CoefficientSource {
    pub fn resolve(self, table: &ElementTable) -> Result<AbbemaCoefficients> {
        match self {
            Self::Literature => Ok(AbbemaCoefficients::literature()),
            Self::LocallyModified => Ok(AbbemaCoefficients::locally_modified()),
            Self::StagedFit => AbbemaCoefficients::staged_fit(table),
            Self::JointFit => AbbemaCoefficients::joint_fit(table),
        }
    }
}

impl AbbemaCoefficients {
    /// Parameters from the Abbema paper, unchanged.
    pub fn literature() -> Self {
        AbbemaCoefficients {
            a: 22.3,
            b: 3.302,
            c: 4.62,
            d: 3.71,
            f: 1.856,
            g: 2.60,
            h: 0.672,
            j: 0.00197,
            k: 0.939,
        }
    }

    /// Locally re-derived parameter set.
    pub fn locally_modified() -> Self {
        AbbemaCoefficients {
            a: 20.7,
            b: 3.303,
            c: 4.66,
            d: 3.54,
            f: 1.857,
            g: 2.63,
            h: 0.688,
            j: 0.00198,
            k: 0.928,
        }
    }

    pub fn pe_xs(&self, energy: f64, z: f64) -> f64 {
        self.a * energy.powf(-self.b) * z.powf(self.c)
    }

    pub fn rayleigh_xs(&self, energy: f64, z: f64) -> f64 {
        self.d * energy.powf(-self.f) * z.powf(self.g)
    }

    pub fn compton_xs(&self, energy: f64, z: f64) -> f64 {
        self.h * (-self.j * energy).exp() * z.powf(self.k)
    }

    pub fn total_xs(&self, energy: f64, z: f64) -> f64 {
        self.pe_xs(energy, z) + self.rayleigh_xs(energy, z) + self.compton_xs(energy, z)
    }

    /// Reproduce the published derivation: energy exponents from oxygen
    /// over 50-100 keV, Z exponents over Z = 6..20 at the mean effective
    /// energy, amplitudes from the oxygen cross sections at that energy.
    pub fn staged_fit(table: &ElementTable) -> Result<Self> {
        let oxygen = table.element(8)?;
        let z_ref: f64 = 8.0;

        // b from the photoelectric energy dependence
        let energies = linspace(FIT_E_START, FIT_E_STOP, FIT_E_POINTS);
        let pe: Vec<f64> = energies
            .iter()
            .map(|&e| oxygen.photoelectric_xs(e))
            .collect();
        let (_, b) = fit_power_law(&energies, &pe)?;

        // j from the tabulated incoherent samples in the same window
        let compton = oxygen
            .compton_curve()
            .ok_or_else(|| ZeffCtError::DataError("oxygen has no incoherent curve".into()))?;
        let (cs_e, cs_xs) = window_samples(&compton.energy, &compton.micro_xs);
        // exponential fits need a seed to avoid a wrong branch
        let (_, j) = fit_exponential(&cs_e, &cs_xs, 0.688 * z_ref.powf(0.928), 0.00198)?;

        // f from the tabulated coherent samples
        let rayleigh = oxygen
            .rayleigh_curve()
            .ok_or_else(|| ZeffCtError::DataError("oxygen has no coherent curve".into()))?;
        let (rl_e, rl_xs) = window_samples(&rayleigh.energy, &rayleigh.micro_xs);
        let (_, f) = fit_power_law(&rl_e, &rl_xs)?;

        // c, k, g from the Z dependence at the mean effective energy
        let energy = (51.93 + 69.28) / 2.0;
        let zs: Vec<f64> = (6..=20).map(|z| z as f64).collect();
        let mut pe_z = Vec::with_capacity(zs.len());
        let mut cs_z = Vec::with_capacity(zs.len());
        let mut rl_z = Vec::with_capacity(zs.len());
        for &z in &zs {
            let element = table.element(z as u32)?;
            pe_z.push(element.photoelectric_xs(energy));
            cs_z.push(element.compton_xs(energy));
            rl_z.push(element.rayleigh_xs(energy));
        }
        let (_, neg_c) = fit_power_law(&zs, &pe_z)?;
        let (_, neg_k) = fit_power_law(&zs, &cs_z)?;
        let (_, neg_g) = fit_power_law(&zs, &rl_z)?;
        let (c, k, g) = (-neg_c, -neg_k, -neg_g);

        // amplitudes pinned at oxygen
        let a = oxygen.photoelectric_xs(energy) / energy.powf(-b) / z_ref.powf(c);
        let h = oxygen.compton_xs(energy) / (-energy * j).exp() / z_ref.powf(k);
        let d = oxygen.rayleigh_xs(energy) / energy.powf(-f) / z_ref.powf(g);

        Ok(AbbemaCoefficients {
            a,
            b,
            c,
            d,
            f,
            g,
            h,
            j,
            k,
        })
    }

    /// Joint refit of every process over Z = 1..20 and 50-100 keV at once.
    /// The fit runs in linear space, so the large cross sections dominate.
    pub fn joint_fit(table: &ElementTable) -> Result<Self> {
        let energies = linspace(FIT_E_START, FIT_E_STOP, FIT_E_POINTS);
        let mut zs = Vec::new();
        let mut es = Vec::new();
        let mut pe = Vec::new();
        let mut cs = Vec::new();
        let mut rl = Vec::new();
        for z in 1..=20u32 {
            let element = table.element(z)?;
            for &e in &energies {
                zs.push(z as f64);
                es.push(e);
                pe.push(element.photoelectric_xs(e));
                cs.push(element.compton_xs(e));
                rl.push(element.rayleigh_xs(e));
            }
        }

        let (a, b, c) = fit_joint_power(&zs, &es, &pe, None)?;
        let (h, j, k) = fit_joint_exponential(&zs, &es, &cs, (0.688, 0.00198, 0.928))?;
        let (d, f, g) = fit_joint_power(&zs, &es, &rl, None)?;

        Ok(AbbemaCoefficients {
            a,
            b,
            c,
            d,
            f,
            g,
            h,
            j,
            k,
        })
    }
}

/// Abbema solver: closed-form cross-section model inverted per pixel by a
/// bracketed Newton-Raphson iteration.
#[derive(Debug, Clone)]
pub struct Abbema {
    pub coeffs: AbbemaCoefficients,
    pub e_high: f64,
    pub e_low: f64,
}

impl Abbema {
    pub fn new(coeffs: AbbemaCoefficients, e_high: f64, e_low: f64) -> Self {
        Abbema {
            coeffs,
            e_high,
            e_low,
        }
    }

    pub fn from_protocol(coeffs: AbbemaCoefficients, protocol: &DualEnergyProtocol) -> Self {
        Self::new(coeffs, protocol.e_high, protocol.e_low)
    }

    /// Solve for Zeff given a pixel's attenuation at both energies.
    ///
    /// The combination equation F(Z) = c1 Z^c + c2 Z^g + c3 Z^k has F(0) = 0
    /// and can be non-monotone, so the iteration first brackets the smallest
    /// sign change on (0, 100] and then runs Newton with the analytic
    /// derivative, bisecting whenever a step leaves the bracket. Failure to
    /// bracket or to converge within the iteration cap is an error.
    pub fn solve_mu_pair(&self, mu_high: f64, mu_low: f64) -> Result<f64> {
        let co = &self.coeffs;
        let a_high = co.a * self.e_high.powf(-co.b);
        let a_low = co.a * self.e_low.powf(-co.b);
        let d_high = co.d * self.e_high.powf(-co.f);
        let d_low = co.d * self.e_low.powf(-co.f);
        let h_high = co.h * (-co.j * self.e_high).exp();
        let h_low = co.h * (-co.j * self.e_low).exp();

        let c1 = mu_high * a_low - mu_low * a_high;
        let c2 = mu_high * d_low - mu_low * d_high;
        let c3 = mu_high * h_low - mu_low * h_high;

        let f = |z: f64| c1 * z.powf(co.c) + c2 * z.powf(co.g) + c3 * z.powf(co.k);
        let fp = |z: f64| {
            c1 * co.c * z.powf(co.c - 1.0)
                + c2 * co.g * z.powf(co.g - 1.0)
                + c3 * co.k * z.powf(co.k - 1.0)
        };

        // bracket the smallest sign change
        let step = (Z_SCAN_MAX - Z_SCAN_MIN) / BRACKET_SCAN_STEPS as f64;
        let mut scan_lo = Z_SCAN_MIN;
        let mut f_lo = f(scan_lo);
        let mut bracket = None;
        for i in 1..=BRACKET_SCAN_STEPS {
            let scan_hi = Z_SCAN_MIN + i as f64 * step;
            let f_hi = f(scan_hi);
            if f_lo == 0.0 {
                return Ok(scan_lo);
            }
            if f_lo * f_hi < 0.0 {
                bracket = Some((scan_lo, scan_hi));
                break;
            }
            scan_lo = scan_hi;
            f_lo = f_hi;
        }
        let Some((mut lo, mut hi)) = bracket else {
            return Err(ZeffCtError::NoAdmissibleRoot {
                method: "abbema",
                target: mu_low / mu_high,
            });
        };

        let f_lo_sign = f_lo < 0.0;
        let mut z = 0.5 * (lo + hi);
        for _ in 0..NEWTON_MAX_ITERATIONS {
            let value = f(z);
            if value == 0.0 {
                return Ok(z);
            }
            if (value < 0.0) == f_lo_sign {
                lo = z;
            } else {
                hi = z;
            }
            let derivative = fp(z);
            let mut next = if derivative != 0.0 {
                z - value / derivative
            } else {
                0.5 * (lo + hi)
            };
            if next <= lo || next >= hi {
                next = 0.5 * (lo + hi);
            }
            if (next - z).abs() < 1.0e-12 {
                return Ok(next);
            }
            z = next;
        }
        Err(ZeffCtError::NonConvergence {
            method: "abbema",
            iterations: NEWTON_MAX_ITERATIONS,
        })
    }

    /// Zeff of a committed material. Density cancels in the dual-energy
    /// ratio, so the mass attenuation coefficients are used directly.
    pub fn zeff_of_material(&self, material: &crate::material::Material) -> Result<f64> {
        let mu_high = material.mac_at(self.e_high)?;
        let mu_low = material.mac_at(self.e_low)?;
        self.solve_mu_pair(mu_high, mu_low)
    }
}

fn linspace(start: f64, stop: f64, count: usize) -> Vec<f64> {
    let step = (stop - start) / (count - 1) as f64;
    (0..count).map(|i| start + i as f64 * step).collect()
}

fn window_samples(energy: &[f64], xs: &[f64]) -> (Vec<f64>, Vec<f64>) {
    let mut es = Vec::new();
    let mut ys = Vec::new();
    for (&e, &y) in energy.iter().zip(xs.iter()) {
        if (FIT_E_START..=FIT_E_STOP).contains(&e) {
            es.push(e);
            ys.push(y);
        }
    }
    (es, ys)
}

/// Fit y = t * x^-b, returning (t, b). Seeded by the log-space linear fit,
/// then refined in linear space by Gauss-Newton.
fn fit_power_law(xs: &[f64], ys: &[f64]) -> Result<(f64, f64)> {
    let mut design = Mat::<f64>::zeros(xs.len(), 2);
    let mut rhs = vec![0.0; xs.len()];
    for (i, (&x, &y)) in xs.iter().zip(ys.iter()).enumerate() {
        design[(i, 0)] = 1.0;
        design[(i, 1)] = x.ln();
        rhs[i] = y.ln();
    }
    let seed = lstsq(&design, &rhs)?;
    let mut params = [seed[0].exp(), -seed[1]];

    gauss_newton(&mut params, xs.len(), NEWTON_MAX_ITERATIONS, |p, r, jac| {
        let (t, b) = (p[0], p[1]);
        for (i, (&x, &y)) in xs.iter().zip(ys.iter()).enumerate() {
            let model = t * x.powf(-b);
            r[i] = y - model;
            jac[(i, 0)] = x.powf(-b);
            jac[(i, 1)] = -t * x.ln() * x.powf(-b);
        }
    })?;
    Ok((params[0], params[1]))
}

/// Fit y = t * exp(-j x), returning (t, j), from the given seed.
fn fit_exponential(xs: &[f64], ys: &[f64], t_seed: f64, j_seed: f64) -> Result<(f64, f64)> {
    let mut params = [t_seed, j_seed];
    gauss_newton(&mut params, xs.len(), NEWTON_MAX_ITERATIONS, |p, r, jac| {
        let (t, j) = (p[0], p[1]);
        for (i, (&x, &y)) in xs.iter().zip(ys.iter()).enumerate() {
            let decay = (-j * x).exp();
            r[i] = y - t * decay;
            jac[(i, 0)] = decay;
            jac[(i, 1)] = -t * x * decay;
        }
    })?;
    Ok((params[0], params[1]))
}

/// Fit y = a * e^-b * z^c over scattered (z, e) samples, returning
/// (a, b, c).
fn fit_joint_power(
    zs: &[f64],
    es: &[f64],
    ys: &[f64],
    seed: Option<(f64, f64, f64)>,
) -> Result<(f64, f64, f64)> {
    let mut params = match seed {
        Some((a, b, c)) => [a, b, c],
        None => {
            // log-linear seed: ln y = ln a - b ln e + c ln z
            let mut design = Mat::<f64>::zeros(ys.len(), 3);
            let mut rhs = vec![0.0; ys.len()];
            for i in 0..ys.len() {
                design[(i, 0)] = 1.0;
                design[(i, 1)] = es[i].ln();
                design[(i, 2)] = zs[i].ln();
                rhs[i] = ys[i].ln();
            }
            let fit = lstsq(&design, &rhs)?;
            [fit[0].exp(), -fit[1], fit[2]]
        }
    };

    gauss_newton(&mut params, ys.len(), NEWTON_MAX_ITERATIONS, |p, r, jac| {
        let (a, b, c) = (p[0], p[1], p[2]);
        for i in 0..ys.len() {
            let shape = es[i].powf(-b) * zs[i].powf(c);
            r[i] = ys[i] - a * shape;
            jac[(i, 0)] = shape;
            jac[(i, 1)] = -a * es[i].ln() * shape;
            jac[(i, 2)] = a * zs[i].ln() * shape;
        }
    })?;
    Ok((params[0], params[1], params[2]))
}

/// Fit y = h * exp(-j e) * z^k over scattered (z, e) samples, returning
/// (h, j, k).
fn fit_joint_exponential(
    zs: &[f64],
    es: &[f64],
    ys: &[f64],
    seed: (f64, f64, f64),
) -> Result<(f64, f64, f64)> {
    let mut params = [seed.0, seed.1, seed.2];
    gauss_newton(&mut params, ys.len(), NEWTON_MAX_ITERATIONS, |p, r, jac| {
        let (h, j, k) = (p[0], p[1], p[2]);
        for i in 0..ys.len() {
            let shape = (-j * es[i]).exp() * zs[i].powf(k);
            r[i] = ys[i] - h * shape;
            jac[(i, 0)] = shape;
            jac[(i, 1)] = -h * es[i] * shape;
            jac[(i, 2)] = h * zs[i].ln() * shape;
        }
    })?;
    Ok((params[0], params[1], params[2]))
}
