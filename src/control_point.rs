use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use tracing::warn;

use crate::bourque::Bourque;
use crate::constants::{HU_MAX, HU_MIN};
use crate::error::{Result, ZeffCtError};
use crate::fitting::FitStrategy;
use crate::material::{Fraction, Material};
use crate::mixture::{MixFraction, Mixture};
use crate::nist;
use crate::protocol::DualEnergyProtocol;
use crate::table::ElementTable;
use crate::taylor::{Taylor, TaylorMode};

/// Which formalism evaluates the training materials.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolverChoice {
    /// The exact atomic-fraction definition; no curve fit involved.
    Direct,
    Bourque(FitStrategy),
    Taylor(TaylorMode),
}

impl SolverChoice {
    fn zeff_at(&self, table: &Arc<ElementTable>, material: &Material, energy: f64) -> Result<f64> {
        match self {
            Self::Direct => material.zeff_at(energy),
            Self::Bourque(strategy) => Bourque::new(table.clone(), *strategy)?.zeff_at(material, energy),
            Self::Taylor(mode) => Taylor::new(table.clone(), *mode).zeff_at(material, energy),
        }
    }
}

/// One scattered training sample for the surface model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ControlPoint {
    pub ct_high: f64,
    pub ct_low: f64,
    pub zeff_ave: f64,
    pub label: String,
    pub is_reference: bool,
}

/// Everything computed for one candidate material: Zeff, attenuation, and
/// CT number at both protocol energies, plus the retention flags.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ZeffSummary {
    pub material: String,
    pub density: f64,
    pub zeff_low: f64,
    pub zeff_high: f64,
    pub zeff_ave: f64,
    pub mu_low: f64,
    pub mu_high: f64,
    pub ct_low: f64,
    pub ct_high: f64,
    pub chosen: bool,
    pub is_reference: bool,
}

impl ZeffSummary {
    /// Evaluate one material through the chosen solver at both energies.
    ///
    /// A solver failure at one energy is recorded as -1 for that energy,
    /// mirroring how the training pipeline tolerates individual rejects.
    pub fn evaluate(
        table: &Arc<ElementTable>,
        protocol: &DualEnergyProtocol,
        solver: SolverChoice,
        material: &Material,
        is_reference: bool,
    ) -> Result<Self> {
        let zeff_high = match solver.zeff_at(table, material, protocol.e_high) {
            Ok(z) => z,
            Err(err) => {
                warn!(material = %material.name, energy = protocol.e_high, %err, "solver failed");
                -1.0
            }
        };
        let zeff_low = match solver.zeff_at(table, material, protocol.e_low) {
            Ok(z) => z,
            Err(err) => {
                warn!(material = %material.name, energy = protocol.e_low, %err, "solver failed");
                -1.0
            }
        };

        let mu_high = material.mac_at(protocol.e_high)? * material.density;
        let mu_low = material.mac_at(protocol.e_low)? * material.density;
        let ct_high = protocol.mu_to_hu_high(mu_high);
        let ct_low = protocol.mu_to_hu_low(mu_low);

        let in_window =
            (HU_MIN..=HU_MAX).contains(&ct_low) && (HU_MIN..=HU_MAX).contains(&ct_high);
        let denied = nist::REFERENCE_DENY_LIST
            .iter()
            .any(|name| material.name.contains(name));
        let chosen = if is_reference {
            // the curated reference list overrides the window check
            !denied
                && nist::REFERENCE_ALLOW_LIST
                    .iter()
                    .any(|name| material.name.contains(name))
        } else {
            !denied && in_window
        };

        Ok(ZeffSummary {
            material: material.name.clone(),
            density: material.density,
            zeff_low,
            zeff_high,
            zeff_ave: (zeff_low + zeff_high) / 2.0,
            mu_low,
            mu_high,
            ct_low,
            ct_high,
            chosen,
            is_reference,
        })
    }
}

/// Which synthetic materials extend the reference set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ControlPointRecipe {
    /// Iodine-water at two concentrations plus a full air-blend ladder.
    ColonEc,
    /// The six kidney-stone compounds.
    KidneyStone,
    /// One single-element material per Z = 1..36 at a fixed density.
    SameDensitySweep,
    /// Fixed Z = 26 across a density sweep.
    SameZDensitySweep,
    /// Tissue-density variants plus iodine-water and a sparse air ladder.
    #[default]
    ColonEcExtended,
    /// Tissue-density variants plus the kidney-stone compounds.
    KidneyStoneExtended,
}

/// The assembled training set: per-material summaries plus the retained
/// control points, sorted by average Zeff.
#[derive(Debug, Clone, Serialize)]
pub struct ControlPointSet {
    pub e_high: f64,
    pub e_low: f64,
    pub summaries: Vec<ZeffSummary>,
}

impl ControlPointSet {
    pub fn build(
        table: &Arc<ElementTable>,
        protocol: &DualEnergyProtocol,
        solver: SolverChoice,
        recipe: ControlPointRecipe,
    ) -> Result<Self> {
        let mut summaries = Vec::new();

        for material in nist::reference_materials(table)? {
            let summary = ZeffSummary::evaluate(table, protocol, solver, &material, true)?;
            if summary.chosen {
                summaries.push(summary);
            }
        }

        for material in extra_materials(table, recipe)? {
            summaries.push(ZeffSummary::evaluate(table, protocol, solver, &material, false)?);
        }

        summaries.sort_by(|a, b| a.zeff_ave.total_cmp(&b.zeff_ave));

        Ok(ControlPointSet {
            e_high: protocol.e_high,
            e_low: protocol.e_low,
            summaries,
        })
    }

    /// The retained control points, in ascending average Zeff.
    pub fn control_points(&self) -> Vec<ControlPoint> {
        self.summaries
            .iter()
            .filter(|summary| summary.chosen)
            .map(|summary| ControlPoint {
                ct_high: summary.ct_high,
                ct_low: summary.ct_low,
                zeff_ave: summary.zeff_ave,
                label: summary.material.clone(),
                is_reference: summary.is_reference,
            })
            .collect()
    }

    /// Write the full summary table as a JSON diagnostic report.
    pub fn write_report(&self, path: &Path) -> Result<()> {
        let file = std::fs::File::create(path)
            .map_err(|e| ZeffCtError::DataError(format!("cannot create {}: {e}", path.display())))?;
        serde_json::to_writer_pretty(file, self)
            .map_err(|e| ZeffCtError::DataError(format!("cannot serialise report: {e}")))
    }
}

fn extra_materials(table: &Arc<ElementTable>, recipe: ControlPointRecipe) -> Result<Vec<Material>> {
    match recipe {
        ControlPointRecipe::ColonEc => {
            let mut out = iodine_water_materials(table)?;
            out.extend(air_iodine_ladder(
                table,
                &[0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7, 0.8, 0.9],
            )?);
            Ok(out)
        }
        ControlPointRecipe::KidneyStone => kidney_stone_materials(table, 1.0),
        ControlPointRecipe::SameDensitySweep => {
            let mut out = Vec::new();
            for z in 1..=36u32 {
                let mut material = Material::new(format!("material {z}"), table.clone());
                material.add_element(z, Fraction::Atomic(1.0))?;
                material.commit()?;
                material.density = 0.2;
                out.push(material);
            }
            Ok(out)
        }
        ControlPointRecipe::SameZDensitySweep => {
            let mut out = Vec::new();
            let count = 20;
            for i in 0..count {
                let density = 0.1 + 0.9 * i as f64 / (count - 1) as f64;
                let mut material = Material::new(format!("material {density:.4}"), table.clone());
                material.add_element(26, Fraction::Atomic(1.0))?;
                material.commit()?;
                material.density = density;
                out.push(material);
            }
            Ok(out)
        }
        ControlPointRecipe::ColonEcExtended => {
            let mut out = tissue_density_variants(table)?;
            out.extend(iodine_water_materials(table)?);
            out.extend(air_iodine_ladder(table, &[0.1, 0.3, 0.5, 0.7, 0.9])?);
            Ok(out)
        }
        ControlPointRecipe::KidneyStoneExtended => {
            let mut out = tissue_density_variants(table)?;
            // the full-density hydroxyapatite lands above the CT window
            out.extend(kidney_stone_materials(table, 0.5)?);
            Ok(out)
        }
    }
}

/// Density-scaled variants of the reference tissues.
fn tissue_density_variants(table: &Arc<ElementTable>) -> Result<Vec<Material>> {
    let variants: &[(&str, &[f64])] = &[
        ("Adipose Tissue (ICRU-44)", &[0.9, 1.5, 2.1, 2.7, 3.3, 3.9]),
        ("Breast Tissue (ICRU-44)", &[0.9, 1.5, 2.1, 2.7, 3.3, 3.9]),
        ("Tissue, Soft (ICRU-44)", &[0.9, 1.5, 2.1, 2.7, 3.3]),
        ("B-100 Bone-Equivalent Plastic", &[0.9, 1.3, 1.7]),
        ("Bone, Cortical (ICRU-44)", &[0.9, 1.15]),
    ];

    let mut out = Vec::new();
    for (name, scales) in variants {
        let base = nist::reference_material(name, table)?;
        for (index, scale) in scales.iter().enumerate() {
            let mut material = base.clone();
            material.name = format!("{name} (Var {index})");
            material.density = base.density * scale;
            out.push(material);
        }
    }
    Ok(out)
}

/// Elemental iodine dissolved in water at 20 and 50 mg per ml.
fn iodine_water_materials(table: &Arc<ElementTable>) -> Result<Vec<Material>> {
    let water = nist::reference_material("Water, Liquid", table)?;

    let mut iodine = Material::new("iodine", table.clone());
    iodine.add_element(53, Fraction::Weight(1.0))?;
    iodine.commit()?;
    iodine.density = 4.93;

    let mut out = Vec::new();
    for milligrams in [20.0, 50.0] {
        let mut mixture = Mixture::new(
            format!("iodine-water ({milligrams:.0} mg/ml)"),
            table.clone(),
        );
        mixture.add_material(&iodine, MixFraction::Weight(milligrams / 1000.0))?;
        mixture.add_material(&water, MixFraction::Weight(1.0))?;
        mixture.commit()?;
        mixture.calculate_density();
        out.push(mixture.into_material());
    }
    Ok(out)
}

/// Air blended into the 20 mg/ml iodine-water at the given volume
/// fractions (converted to weight fractions through the densities).
fn air_iodine_ladder(table: &Arc<ElementTable>, volume_fractions: &[f64]) -> Result<Vec<Material>> {
    let air = nist::reference_material("Air, Dry", table)?;
    let iodine_water = iodine_water_materials(table)?.swap_remove(0);

    let mut out = Vec::new();
    for &volume_fraction in volume_fractions {
        let ratio = volume_fraction * air.density / iodine_water.density;
        let mut mixture = Mixture::new(
            format!("air({:.0}%)-iodine-water", volume_fraction * 100.0),
            table.clone(),
        );
        mixture.add_material(&air, MixFraction::Weight(ratio))?;
        mixture.add_material(&iodine_water, MixFraction::Weight(1.0 - ratio))?;
        mixture.commit()?;
        mixture.calculate_density();
        out.push(mixture.into_material());
    }
    Ok(out)
}

/// The kidney-stone compounds, built from atomic fractions.
/// `hydroxyapatite_scale` tunes down the densest compound when the full
/// density would leave the CT window.
fn kidney_stone_materials(
    table: &Arc<ElementTable>,
    hydroxyapatite_scale: f64,
) -> Result<Vec<Material>> {
    let compounds: &[(&str, f64, &[(u32, f64)])] = &[
        // C5 H4 N4 O3
        ("uric acid", 1.87, &[(6, 5.0), (1, 4.0), (7, 4.0), (8, 3.0)]),
        // Ca C2 H2 O5
        (
            "calcium oxalate monohydrate",
            2.2,
            &[(20, 1.0), (6, 2.0), (1, 2.0), (8, 5.0)],
        ),
        // Ca C2 H4 O6
        (
            "calcium oxalate dihydrate",
            2.2,
            &[(20, 1.0), (6, 2.0), (1, 4.0), (8, 6.0)],
        ),
        // Ca10 H2 O26 P6
        (
            "hydroxyapatite",
            3.18,
            &[(20, 10.0), (1, 2.0), (8, 26.0), (15, 6.0)],
        ),
        // C6 H12 N2 O4 S2
        (
            "cystine",
            1.677,
            &[(6, 6.0), (1, 12.0), (7, 2.0), (8, 4.0), (16, 2.0)],
        ),
        // Ca Mg N H16 P O10
        (
            "struvite",
            1.711,
            &[(20, 1.0), (12, 1.0), (7, 1.0), (1, 16.0), (15, 1.0), (8, 10.0)],
        ),
    ];

    let mut out = Vec::new();
    for (name, density, fractions) in compounds {
        let mut material = Material::new(*name, table.clone());
        for &(z, count) in *fractions {
            material.add_element(z, Fraction::Atomic(count))?;
        }
        material.commit()?;
        material.density = if *name == "hydroxyapatite" {
            density * hydroxyapatite_scale
        } else {
            *density
        };
        out.push(material);
    }
    Ok(out)
}
