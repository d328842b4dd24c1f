//! Shared fixtures: a synthetic element table whose cross sections follow
//! the literature power-law shapes, tabulated on deliberately different
//! energy grids per process.

// not every test binary touches every fixture
#![allow(dead_code)]

use std::sync::Arc;

use zeffct::constants::NEUTRON_MASS_AMU;
use zeffct::element::{Element, TOTAL_REF};
use zeffct::interp::XsCurve;
use zeffct::material::{Fraction, Material};
use zeffct::table::ElementTable;

pub const E_HIGH: f64 = 69.28;
pub const E_LOW: f64 = 51.93;

pub fn e_ave() -> f64 {
    (E_HIGH + E_LOW) / 2.0
}

// closed-form cross-section model (barns), literature exponents
pub fn pe_xs(energy: f64, z: f64) -> f64 {
    22.3 * energy.powf(-3.302) * z.powf(4.62)
}

pub fn rl_xs(energy: f64, z: f64) -> f64 {
    3.71 * energy.powf(-1.856) * z.powf(2.60)
}

pub fn cs_xs(energy: f64, z: f64) -> f64 {
    0.672 * (-0.00197 * energy).exp() * z.powf(0.939)
}

pub fn total_xs(energy: f64, z: f64) -> f64 {
    pe_xs(energy, z) + rl_xs(energy, z) + cs_xs(energy, z)
}

pub fn atomic_mass(z: u32) -> f64 {
    match z {
        1 => 1.008,
        6 => 12.011,
        7 => 14.007,
        8 => 15.999,
        9 => 18.998,
        11 => 22.990,
        12 => 24.305,
        15 => 30.974,
        16 => 32.06,
        17 => 35.45,
        18 => 39.948,
        19 => 39.098,
        20 => 40.078,
        26 => 55.845,
        53 => 126.904,
        _ => 2.02 * z as f64 + 0.5,
    }
}

fn grid(start: f64, step: f64, count: usize) -> Vec<f64> {
    (0..count).map(|i| start + step * i as f64).collect()
}

/// Elements Z = 1..53 with each process tabulated on its own grid and the
/// reference total tabulated on a coarser grid of its own.
pub fn synthetic_table() -> Arc<ElementTable> {
    let mut table = ElementTable::new();
    for z in 1..=53u32 {
        let zf = z as f64;
        let mut element = Element::new(z);
        element.set_awr(atomic_mass(z) / NEUTRON_MASS_AMU);

        let pe_grid = grid(10.0, 0.5, 381); // 10 .. 200
        let cs_grid = grid(10.0, 0.7, 272); // 10 .. 199.7
        let rl_grid = grid(10.0, 0.9, 212); // 10 .. 199.9
        let ref_grid = grid(10.0, 2.0, 96); // 10 .. 200

        element.add_process(
            "photo-electric",
            XsCurve::new(
                pe_grid.clone(),
                pe_grid.iter().map(|&e| pe_xs(e, zf)).collect(),
            ),
        );
        element.add_process(
            "photon [incoherent] scattering",
            XsCurve::new(
                cs_grid.clone(),
                cs_grid.iter().map(|&e| cs_xs(e, zf)).collect(),
            ),
        );
        element.add_process(
            "photon [coherent] scattering",
            XsCurve::new(
                rl_grid.clone(),
                rl_grid.iter().map(|&e| rl_xs(e, zf)).collect(),
            ),
        );
        element.add_process(
            TOTAL_REF,
            XsCurve::new(
                ref_grid.clone(),
                ref_grid.iter().map(|&e| total_xs(e, zf)).collect(),
            ),
        );

        table.insert(element);
    }
    Arc::new(table)
}

pub fn water(table: &Arc<ElementTable>) -> Material {
    let mut material = Material::new("Water", table.clone());
    material.add_element(1, Fraction::Weight(0.111894)).unwrap();
    material.add_element(8, Fraction::Weight(0.888106)).unwrap();
    material.commit().unwrap();
    material.density = 1.0;
    material
}

pub fn dry_air(table: &Arc<ElementTable>) -> Material {
    let mut material = Material::new("Dry Air", table.clone());
    material.add_element(6, Fraction::Weight(0.000124)).unwrap();
    material.add_element(7, Fraction::Weight(0.755267)).unwrap();
    material.add_element(8, Fraction::Weight(0.231781)).unwrap();
    material.add_element(18, Fraction::Weight(0.012827)).unwrap();
    material.commit().unwrap();
    material.density = 1.20479e-3;
    material
}
