use std::sync::Arc;

use crate::constants::{HU_AIR_FLOOR, HU_MAX, HU_MIN};
use crate::error::Result;
use crate::material::Material;
use crate::nist;
use crate::table::ElementTable;

/// High-tube configuration and its effective spectrum energy.
///
/// The Sn-filtered 140 kVp beam hardens the spectrum from a 69.28 keV mean
/// to 89 keV.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HighTube {
    #[default]
    Sn140,
    Plain140,
}

impl HighTube {
    pub fn effective_energy(self) -> f64 {
        match self {
            Self::Sn140 => 89.0,
            Self::Plain140 => 69.28,
        }
    }
}

/// Low-tube configuration and its effective spectrum energy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LowTube {
    #[default]
    Kvp80,
    Kvp100,
}

impl LowTube {
    pub fn effective_energy(self) -> f64 {
        match self {
            Self::Kvp80 => 51.93,
            Self::Kvp100 => 63.292,
        }
    }
}

/// A dual-energy scan protocol: the two effective energies plus the water
/// and air linear-attenuation references that anchor the CT-number scale.
#[derive(Debug, Clone)]
pub struct DualEnergyProtocol {
    pub e_high: f64,
    pub e_low: f64,
    pub mu_water_high: f64,
    pub mu_water_low: f64,
    pub mu_air_high: f64,
    pub mu_air_low: f64,
    water: Material,
}

impl DualEnergyProtocol {
    pub fn new(table: &Arc<ElementTable>, high: HighTube, low: LowTube) -> Result<Self> {
        Self::with_energies(table, high.effective_energy(), low.effective_energy())
    }

    /// Build a protocol directly from effective energies in keV.
    pub fn with_energies(table: &Arc<ElementTable>, e_high: f64, e_low: f64) -> Result<Self> {
        let water = nist::reference_material("Water, Liquid", table)?;
        let air = nist::reference_material("Air, Dry", table)?;

        let mu_water_high = water.mac_at(e_high)? * water.density;
        let mu_water_low = water.mac_at(e_low)? * water.density;
        let mu_air_high = air.mac_at(e_high)? * air.density;
        let mu_air_low = air.mac_at(e_low)? * air.density;

        Ok(DualEnergyProtocol {
            e_high,
            e_low,
            mu_water_high,
            mu_water_low,
            mu_air_high,
            mu_air_low,
            water,
        })
    }

    pub fn e_ave(&self) -> f64 {
        (self.e_high + self.e_low) / 2.0
    }

    pub fn water(&self) -> &Material {
        &self.water
    }

    /// CT number -> linear attenuation against the given references.
    pub fn hu_to_mu(hu: f64, mu_water: f64, mu_air: f64) -> f64 {
        hu / 1000.0 * (mu_water - mu_air) + mu_water
    }

    /// Linear attenuation -> CT number against the given references.
    pub fn mu_to_hu(mu: f64, mu_water: f64, mu_air: f64) -> f64 {
        (mu - mu_water) / (mu_water - mu_air) * 1000.0
    }

    pub fn hu_to_mu_high(&self, hu: f64) -> f64 {
        Self::hu_to_mu(hu, self.mu_water_high, self.mu_air_high)
    }

    pub fn hu_to_mu_low(&self, hu: f64) -> f64 {
        Self::hu_to_mu(hu, self.mu_water_low, self.mu_air_low)
    }

    pub fn mu_to_hu_high(&self, mu: f64) -> f64 {
        Self::mu_to_hu(mu, self.mu_water_high, self.mu_air_high)
    }

    pub fn mu_to_hu_low(&self, mu: f64) -> f64 {
        Self::mu_to_hu(mu, self.mu_water_low, self.mu_air_low)
    }

    /// CT numbers of a committed material at both protocol energies,
    /// returned as (hu_high, hu_low).
    pub fn ct_numbers(&self, material: &Material) -> Result<(f64, f64)> {
        let mu_high = material.mac_at(self.e_high)? * material.density;
        let mu_low = material.mac_at(self.e_low)? * material.density;
        Ok((self.mu_to_hu_high(mu_high), self.mu_to_hu_low(mu_low)))
    }
}

/// Clamp a raw CT number into the representable window and floor sub-air
/// values to air.
pub fn prepare_hu(hu: f64) -> f64 {
    let clamped = hu.clamp(HU_MIN, HU_MAX);
    if clamped < HU_AIR_FLOOR {
        HU_MIN
    } else {
        clamped
    }
}
