use std::ops::{Deref, DerefMut};

use crate::error::{Result, ZeffCtError};
use crate::material::{Fraction, Material};

/// How a component material enters a mixture.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MixFraction {
    Weight(f64),
    Molar(f64),
}

/// One committed material inside a mixture, with its mixing fractions.
#[derive(Debug, Clone)]
pub struct MaterialComponent {
    pub material: Material,
    pub weight_fraction: f64,
    pub molar_fraction: f64,
}

/// A material composed from other committed materials.
///
/// The element-level composition accumulates into the inner `Material`; the
/// material-level fractions obey the same don't-mix-bases rule and are
/// renormalised on commit. Dereferences to `Material` for all macroscopic
/// queries.
#[derive(Debug, Clone)]
pub struct Mixture {
    material: Material,
    parts: Vec<MaterialComponent>,
}

impl Mixture {
    pub fn new(name: impl Into<String>, table: std::sync::Arc<crate::table::ElementTable>) -> Self {
        Mixture {
            material: Material::new(name, table),
            parts: Vec::new(),
        }
    }

    /// Fold a committed material into the mixture by weight or molar
    /// fraction.
    pub fn add_material(&mut self, other: &Material, fraction: MixFraction) -> Result<()> {
        if !other.is_committed() {
            return Err(ZeffCtError::NotCommitted(other.name.clone()));
        }

        match fraction {
            MixFraction::Weight(weight) => {
                for component in other.components() {
                    self.material
                        .add_element(component.z, Fraction::Weight(weight * component.weight_fraction))?;
                }
                self.parts.push(MaterialComponent {
                    material: other.clone(),
                    weight_fraction: weight,
                    molar_fraction: 0.0,
                });
            }
            MixFraction::Molar(molar) => {
                for component in other.components() {
                    self.material
                        .add_element(component.z, Fraction::Atomic(molar * component.atomic_fraction))?;
                }
                self.parts.push(MaterialComponent {
                    material: other.clone(),
                    weight_fraction: 0.0,
                    molar_fraction: molar,
                });
            }
        }
        Ok(())
    }

    /// Approximate density via the additive-volume rule
    /// mass / sum(mass / density). Mixing two liquids contracts the volume
    /// slightly, so this is an upper-bound approximation.
    pub fn calculate_density(&mut self) {
        let mut mass = 0.0;
        let mut volume = 0.0;
        for part in &self.parts {
            mass += part.weight_fraction;
            volume += part.weight_fraction / part.material.density;
        }
        self.material.density = mass / volume;
    }

    /// Commit the element-level composition, then validate and normalise the
    /// material-level fractions.
    pub fn commit(&mut self) -> Result<()> {
        self.material.commit()?;

        // every component material must itself be normalised
        for part in &self.parts {
            let weight_sum: f64 = part.material.components().map(|c| c.weight_fraction).sum();
            let atomic_sum: f64 = part.material.components().map(|c| c.atomic_fraction).sum();
            if (weight_sum - 1.0).abs() > 1e-6 || (atomic_sum - 1.0).abs() > 1e-6 {
                return Err(ZeffCtError::InvalidComposition(format!(
                    "component '{}' of '{}' is not normalised",
                    part.material.name, self.material.name
                )));
            }
        }

        let uses_weight = self.parts.iter().any(|p| p.weight_fraction != 0.0);
        let uses_molar = self.parts.iter().any(|p| p.molar_fraction != 0.0);
        if uses_weight && uses_molar {
            return Err(ZeffCtError::InvalidComposition(format!(
                "'{}' mixes material weight and molar fractions",
                self.material.name
            )));
        }
        if !uses_weight && !uses_molar {
            return Err(ZeffCtError::InvalidComposition(format!(
                "'{}' has no non-zero material fractions",
                self.material.name
            )));
        }

        // convert via the sum of the component's element masses
        let table = self.material.element_table().clone();
        for part in &mut self.parts {
            let mut a_all = 0.0;
            for component in part.material.components() {
                a_all += table.element(component.z)?.a;
            }
            if uses_weight {
                part.molar_fraction = part.weight_fraction / a_all;
            } else {
                part.weight_fraction = a_all * part.molar_fraction;
            }
        }

        let weight_sum: f64 = self.parts.iter().map(|p| p.weight_fraction).sum();
        let molar_sum: f64 = self.parts.iter().map(|p| p.molar_fraction).sum();
        for part in &mut self.parts {
            part.weight_fraction /= weight_sum;
            part.molar_fraction /= molar_sum;
        }

        Ok(())
    }

    pub fn parts(&self) -> &[MaterialComponent] {
        &self.parts
    }

    /// The mixture viewed as a plain material.
    pub fn into_material(self) -> Material {
        self.material
    }
}

impl Deref for Mixture {
    type Target = Material;

    fn deref(&self) -> &Material {
        &self.material
    }
}

impl DerefMut for Mixture {
    fn deref_mut(&mut self) -> &mut Material {
        &mut self.material
    }
}
