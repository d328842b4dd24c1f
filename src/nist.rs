use std::sync::Arc;

use crate::error::Result;
use crate::material::{Fraction, Material};
use crate::table::ElementTable;

/// The reference compositions retained for control-point construction.
///
/// Each entry: (name, density g/cm3, weight fractions by Z). These are the
/// sixteen canonical compositions on the explicit allow-list; densities and
/// fractions follow the published NIST/ICRU-44 tables.
pub const REFERENCE_MATERIALS: &[(&str, f64, &[(u32, f64)])] = &[
    (
        "A-150 Tissue-Equivalent Plastic",
        1.127,
        &[
            (1, 0.101327),
            (6, 0.775501),
            (7, 0.035057),
            (8, 0.052316),
            (9, 0.017422),
            (20, 0.018378),
        ],
    ),
    (
        "Adipose Tissue (ICRU-44)",
        0.95,
        &[
            (1, 0.114),
            (6, 0.598),
            (7, 0.007),
            (8, 0.278),
            (11, 0.001),
            (16, 0.001),
            (17, 0.001),
        ],
    ),
    (
        "Air, Dry (near sea level)",
        1.20479e-3,
        &[(6, 0.000124), (7, 0.755267), (8, 0.231781), (18, 0.012827)],
    ),
    (
        "B-100 Bone-Equivalent Plastic",
        1.45,
        &[
            (1, 0.065473),
            (6, 0.536942),
            (7, 0.0215),
            (8, 0.032084),
            (9, 0.167415),
            (20, 0.176585),
        ],
    ),
    (
        "Blood, Whole (ICRU-44)",
        1.06,
        &[
            (1, 0.102),
            (6, 0.11),
            (7, 0.033),
            (8, 0.745),
            (11, 0.001),
            (15, 0.001),
            (16, 0.002),
            (17, 0.003),
            (19, 0.002),
            (26, 0.001),
        ],
    ),
    (
        "Bone, Cortical (ICRU-44)",
        1.92,
        &[
            (1, 0.034),
            (6, 0.155),
            (7, 0.042),
            (8, 0.435),
            (11, 0.001),
            (12, 0.002),
            (15, 0.103),
            (16, 0.003),
            (20, 0.225),
        ],
    ),
    (
        "Brain, Grey/White Matter (ICRU-44)",
        1.04,
        &[
            (1, 0.107),
            (6, 0.145),
            (7, 0.022),
            (8, 0.712),
            (11, 0.002),
            (15, 0.004),
            (16, 0.002),
            (17, 0.003),
            (19, 0.003),
        ],
    ),
    (
        "Breast Tissue (ICRU-44)",
        1.02,
        &[
            (1, 0.106),
            (6, 0.332),
            (7, 0.03),
            (8, 0.527),
            (11, 0.001),
            (15, 0.001),
            (16, 0.002),
            (17, 0.001),
        ],
    ),
    (
        "Eye Lens (ICRU-44)",
        1.07,
        &[
            (1, 0.096),
            (6, 0.195),
            (7, 0.057),
            (8, 0.646),
            (11, 0.001),
            (15, 0.001),
            (16, 0.003),
            (17, 0.001),
        ],
    ),
    (
        "Lung Tissue (ICRU-44)",
        1.05,
        &[
            (1, 0.103),
            (6, 0.105),
            (7, 0.031),
            (8, 0.749),
            (11, 0.002),
            (15, 0.002),
            (16, 0.003),
            (17, 0.003),
            (19, 0.002),
        ],
    ),
    (
        "Muscle, Skeletal (ICRU-44)",
        1.05,
        &[
            (1, 0.102),
            (6, 0.143),
            (7, 0.034),
            (8, 0.71),
            (11, 0.001),
            (15, 0.002),
            (16, 0.003),
            (17, 0.001),
            (19, 0.004),
        ],
    ),
    (
        "Ovary (ICRU-44)",
        1.05,
        &[
            (1, 0.105),
            (6, 0.093),
            (7, 0.024),
            (8, 0.768),
            (11, 0.002),
            (15, 0.002),
            (16, 0.002),
            (17, 0.002),
            (19, 0.002),
        ],
    ),
    (
        "Testis (ICRU-44)",
        1.04,
        &[
            (1, 0.106),
            (6, 0.099),
            (7, 0.02),
            (8, 0.766),
            (11, 0.002),
            (15, 0.001),
            (16, 0.002),
            (17, 0.002),
            (19, 0.002),
        ],
    ),
    (
        "Tissue, Soft (ICRU-44)",
        1.06,
        &[
            (1, 0.102),
            (6, 0.143),
            (7, 0.034),
            (8, 0.708),
            (11, 0.002),
            (15, 0.003),
            (16, 0.003),
            (17, 0.002),
            (19, 0.003),
        ],
    ),
    (
        "Tissue, Soft (ICRU Four-Component)",
        1.0,
        &[(1, 0.101172), (6, 0.111), (7, 0.026), (8, 0.761828)],
    ),
    (
        "Water, Liquid",
        1.0,
        &[(1, 0.111894), (8, 0.888106)],
    ),
];

/// Names a control-point summary must match to count as a retained
/// reference material.
pub const REFERENCE_ALLOW_LIST: &[&str] = &[
    "A-150 Tissue-Equivalent Plastic",
    "Adipose Tissue (ICRU-44)",
    "Air, Dry (near sea level)",
    "B-100 Bone-Equivalent Plastic",
    "Blood, Whole (ICRU-44)",
    "Bone, Cortical (ICRU-44)",
    "Brain, Grey/White Matter (ICRU-44)",
    "Breast Tissue (ICRU-44)",
    "Eye Lens (ICRU-44)",
    "Lung Tissue (ICRU-44)",
    "Muscle, Skeletal (ICRU-44)",
    "Ovary (ICRU-44)",
    "Testis (ICRU-44)",
    "Tissue, Soft (ICRU-44)",
    "Tissue, Soft (ICRU Four-Component)",
    "Water, Liquid",
];

/// Reference gas compositions excluded from control-point retention.
pub const REFERENCE_DENY_LIST: &[&str] = &[
    "Tissue-Equivalent Gas, Methane Based",
    "Tissue-Equivalent Gas, Propane Based",
    "Polytetrafluoroethylene, (Teflon)",
];

/// Build and commit every embedded reference material against `table`.
pub fn reference_materials(table: &Arc<ElementTable>) -> Result<Vec<Material>> {
    REFERENCE_MATERIALS
        .iter()
        .map(|(name, density, fractions)| build_material(name, *density, fractions, table))
        .collect()
}

/// Build and commit one embedded reference material by (partial) name.
pub fn reference_material(name: &str, table: &Arc<ElementTable>) -> Result<Material> {
    for (full_name, density, fractions) in REFERENCE_MATERIALS {
        if full_name.contains(name) {
            return build_material(full_name, *density, fractions, table);
        }
    }
    Err(crate::error::ZeffCtError::DataError(format!(
        "reference material '{name}' not found"
    )))
}

fn build_material(
    name: &str,
    density: f64,
    fractions: &[(u32, f64)],
    table: &Arc<ElementTable>,
) -> Result<Material> {
    let mut material = Material::new(name, table.clone());
    for &(z, weight) in fractions {
        material.add_element(z, Fraction::Weight(weight))?;
    }
    material.commit()?;
    material.density = density;
    Ok(material)
}
