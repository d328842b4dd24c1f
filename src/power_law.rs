use crate::material::Material;

/// Electron-fraction-weighted power-law effective atomic number:
/// Zeff = (sum lambda_i Z_i^m)^(1/m), lambda_i the electron fraction.
#[derive(Debug, Clone, Copy)]
pub struct PowerLaw {
    pub exponent: f64,
}

impl PowerLaw {
    pub fn new(exponent: f64) -> Self {
        PowerLaw { exponent }
    }

    /// The Mayneord variant, m = 2.94.
    pub fn mayneord() -> Self {
        PowerLaw { exponent: 2.94 }
    }

    pub fn zeff(&self, material: &Material) -> f64 {
        let total_electrons: f64 = material
            .components()
            .map(|c| c.atomic_fraction * c.z as f64)
            .sum();

        let mut sum = 0.0;
        for component in material.components() {
            let lambda = component.atomic_fraction * component.z as f64 / total_electrons;
            sum += lambda * (component.z as f64).powf(self.exponent);
        }
        sum.powf(1.0 / self.exponent)
    }
}
