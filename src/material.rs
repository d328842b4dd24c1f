use std::collections::BTreeMap;
use std::sync::Arc;

use crate::constants::{AVOGADRO, BARN_CM2};
use crate::error::{Result, ZeffCtError};
use crate::table::ElementTable;

/// Which fraction a caller is supplying when adding an element.
///
/// A material must be built entirely from weight fractions or entirely from
/// atomic fractions; commit rejects a mix of both.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Fraction {
    Weight(f64),
    Atomic(f64),
}

/// One element of a material's composition.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ElementComponent {
    pub z: u32,
    pub weight_fraction: f64,
    pub atomic_fraction: f64,
}

impl ElementComponent {
    fn new(z: u32) -> Self {
        ElementComponent {
            z,
            weight_fraction: 0.0,
            atomic_fraction: 0.0,
        }
    }
}

/// A material: a named elemental composition with a caller-supplied density.
///
/// Components are keyed and iterated in ascending Z. After `commit()` both
/// fraction representations are populated and normalised to sum to 1; only
/// the density may change afterwards.
#[derive(Debug, Clone)]
pub struct Material {
    pub name: String,
    pub density: f64,
    components: BTreeMap<u32, ElementComponent>,
    table: Arc<ElementTable>,
    committed: bool,
}

impl Material {
    pub fn new(name: impl Into<String>, table: Arc<ElementTable>) -> Self {
        Material {
            name: name.into(),
            density: 0.0,
            components: BTreeMap::new(),
            table,
            committed: false,
        }
    }

    pub fn is_committed(&self) -> bool {
        self.committed
    }

    pub fn element_table(&self) -> &Arc<ElementTable> {
        &self.table
    }

    /// Components in ascending Z order.
    pub fn components(&self) -> impl Iterator<Item = &ElementComponent> {
        self.components.values()
    }

    pub fn component(&self, z: u32) -> Option<&ElementComponent> {
        self.components.get(&z)
    }

    /// Add an element by weight or atomic fraction. Repeated calls for the
    /// same Z accumulate the supplied fraction.
    pub fn add_element(&mut self, z: u32, fraction: Fraction) -> Result<()> {
        if self.committed {
            return Err(ZeffCtError::AlreadyCommitted(self.name.clone()));
        }
        let component = self
            .components
            .entry(z)
            .or_insert_with(|| ElementComponent::new(z));
        match fraction {
            Fraction::Weight(w) => component.weight_fraction += w,
            Fraction::Atomic(n) => component.atomic_fraction += n,
        }
        Ok(())
    }

    /// Validate the fraction basis, derive the missing representation
    /// (w_i = n_i * A_i), and normalise both to sum to 1.
    pub fn commit(&mut self) -> Result<()> {
        if self.committed {
            return Err(ZeffCtError::AlreadyCommitted(self.name.clone()));
        }

        let uses_weight = self
            .components
            .values()
            .any(|component| component.weight_fraction != 0.0);
        let uses_atomic = self
            .components
            .values()
            .any(|component| component.atomic_fraction != 0.0);

        if uses_weight && uses_atomic {
            return Err(ZeffCtError::InvalidComposition(format!(
                "'{}' mixes weight and atomic fractions",
                self.name
            )));
        }
        if !uses_weight && !uses_atomic {
            return Err(ZeffCtError::InvalidComposition(format!(
                "'{}' has no non-zero fractions",
                self.name
            )));
        }

        let table = self.table.clone();
        for component in self.components.values_mut() {
            let a = table.element(component.z)?.a;
            if uses_weight {
                component.atomic_fraction = component.weight_fraction / a;
            } else {
                component.weight_fraction = component.atomic_fraction * a;
            }
        }

        let weight_sum: f64 = self.components.values().map(|c| c.weight_fraction).sum();
        let atomic_sum: f64 = self.components.values().map(|c| c.atomic_fraction).sum();
        for component in self.components.values_mut() {
            component.weight_fraction /= weight_sum;
            component.atomic_fraction /= atomic_sum;
        }

        self.committed = true;
        Ok(())
    }

    fn require_committed(&self) -> Result<()> {
        if self.committed {
            Ok(())
        } else {
            Err(ZeffCtError::NotCommitted(self.name.clone()))
        }
    }

    fn mac_over(&self, energy: f64, xs: impl Fn(&crate::element::Element, f64) -> f64) -> Result<f64> {
        self.require_committed()?;
        let mut mac = 0.0;
        for component in self.components.values() {
            let element = self.table.element(component.z)?;
            mac += component.weight_fraction / element.a * xs(element, energy);
        }
        Ok(mac * AVOGADRO * BARN_CM2) // cm^2 / g
    }

    /// Total mass attenuation coefficient at `energy` keV, in cm^2/g.
    pub fn mac_at(&self, energy: f64) -> Result<f64> {
        self.mac_over(energy, |el, e| el.total_xs(e))
    }

    /// Photoelectric part of the mass attenuation coefficient, cm^2/g.
    pub fn pe_mac_at(&self, energy: f64) -> Result<f64> {
        self.mac_over(energy, |el, e| el.photoelectric_xs(e))
    }

    /// Incoherent (Compton) part of the mass attenuation coefficient, cm^2/g.
    pub fn compton_mac_at(&self, energy: f64) -> Result<f64> {
        self.mac_over(energy, |el, e| el.compton_xs(e))
    }

    /// Coherent (Rayleigh) part of the mass attenuation coefficient, cm^2/g.
    pub fn rayleigh_mac_at(&self, energy: f64) -> Result<f64> {
        self.mac_over(energy, |el, e| el.rayleigh_xs(e))
    }

    /// The exact (non-parametric) effective atomic number at `energy`:
    /// Zeff = sum(n_i * sigma_i) / sum(n_i * sigma_i / Z_i).
    ///
    /// Physically exact but impractical per pixel; the solver formalisms
    /// exist to approximate it cheaply.
    pub fn zeff_at(&self, energy: f64) -> Result<f64> {
        self.require_committed()?;
        let mut up = 0.0;
        let mut down = 0.0;
        for component in self.components.values() {
            let element = self.table.element(component.z)?;
            let weighted = component.atomic_fraction * element.total_xs(energy);
            up += weighted;
            down += weighted / component.z as f64;
        }
        Ok(up / down)
    }

    /// Electron-weighted mean microscopic cross section per electron, barns.
    pub fn electron_xs_at(&self, energy: f64) -> Result<f64> {
        self.require_committed()?;
        let mut up = 0.0;
        let mut down = 0.0;
        for component in self.components.values() {
            let element = self.table.element(component.z)?;
            let electrons_per_mass = component.weight_fraction * element.z as f64 / element.a;
            up += electrons_per_mass * element.electron_xs(energy);
            down += electrons_per_mass;
        }
        Ok(up / down)
    }

    /// Atom-weighted mean total microscopic cross section, barns per atom.
    pub fn total_xs_per_atom_at(&self, energy: f64) -> Result<f64> {
        self.require_committed()?;
        let mut up = 0.0;
        let mut down = 0.0;
        for component in self.components.values() {
            let element = self.table.element(component.z)?;
            let atoms_per_mass = component.weight_fraction / element.a;
            up += atoms_per_mass * element.total_xs(energy);
            down += atoms_per_mass;
        }
        Ok(up / down)
    }

    /// Mean number of electrons per atom.
    pub fn electrons_per_atom(&self) -> f64 {
        self.components
            .values()
            .map(|c| c.z as f64 * c.atomic_fraction)
            .sum()
    }
}
