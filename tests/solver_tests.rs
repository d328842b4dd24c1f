mod common;

use approx::assert_relative_eq;
use common::{e_ave, synthetic_table, water, E_HIGH, E_LOW};
use zeffct::abbema::{Abbema, AbbemaCoefficients};
use zeffct::bourque::Bourque;
use zeffct::fitting::FitStrategy;
use zeffct::material::{Fraction, Material};
use zeffct::power_law::PowerLaw;
use zeffct::taylor::{Taylor, TaylorMode};
use zeffct::torikoshi::Torikoshi;
use zeffct::ZeffCtError;

fn single_element(table: &std::sync::Arc<zeffct::ElementTable>, z: u32) -> Material {
    let mut material = Material::new(format!("element {z}"), table.clone());
    material.add_element(z, Fraction::Atomic(1.0)).unwrap();
    material.commit().unwrap();
    material.density = 1.0;
    material
}

#[test]
fn bourque_spline_recovers_oxygen_exactly() {
    let table = synthetic_table();
    let bourque = Bourque::new(table.clone(), FitStrategy::BSpline).unwrap();
    let oxygen = single_element(&table, 8);
    let z = bourque.zeff_at(&oxygen, e_ave()).unwrap();
    assert_relative_eq!(z, 8.0, epsilon = 1e-6);
}

#[test]
fn bourque_spline_finds_the_hydrogen_boundary_root() {
    let table = synthetic_table();
    let bourque = Bourque::new(table.clone(), FitStrategy::BSpline).unwrap();
    let hydrogen = single_element(&table, 1);
    let z = bourque.zeff_at(&hydrogen, e_ave()).unwrap();
    assert_relative_eq!(z, 1.0, epsilon = 1e-6);
}

#[test]
fn bourque_polynomial_recovers_oxygen_within_fit_tolerance() {
    let table = synthetic_table();
    let bourque = Bourque::new(table.clone(), FitStrategy::Polynomial).unwrap();
    let oxygen = single_element(&table, 8);
    let z = bourque.zeff_at(&oxygen, e_ave()).unwrap();
    assert!((z - 8.0).abs() < 0.5, "z = {z}");
}

#[test]
fn bourque_chebyshev_recovers_oxygen_within_fit_tolerance() {
    let table = synthetic_table();
    let bourque = Bourque::new(table.clone(), FitStrategy::Chebyshev).unwrap();
    let oxygen = single_element(&table, 8);
    let z = bourque.zeff_at(&oxygen, e_ave()).unwrap();
    assert!((z - 8.0).abs() < 0.5, "z = {z}");
}

#[test]
fn bourque_spline_water_sits_near_the_power_law_estimate() {
    let table = synthetic_table();
    let bourque = Bourque::new(table.clone(), FitStrategy::BSpline).unwrap();
    let water = water(&table);
    let z = bourque.zeff_at(&water, e_ave()).unwrap();
    let mayneord = PowerLaw::mayneord().zeff(&water);
    assert!((z - mayneord).abs() < 0.5, "z = {z}, mayneord = {mayneord}");
}

#[test]
fn taylor_spline_recovers_oxygen_exactly() {
    let table = synthetic_table();
    let taylor = Taylor::new(table.clone(), TaylorMode::Spline);
    let oxygen = single_element(&table, 8);
    let z = taylor.zeff_at(&oxygen, e_ave()).unwrap();
    assert_relative_eq!(z, 8.0, epsilon = 1e-6);
}

#[test]
fn taylor_spline_water_tracks_the_direct_definition() {
    let table = synthetic_table();
    let taylor = Taylor::new(table.clone(), TaylorMode::Spline);
    let water = water(&table);
    let z = taylor.zeff_at(&water, e_ave()).unwrap();
    // Taylor parameterises the total cross section per atom, so it lands
    // near the atomic-fraction Zeff, not the electron-weighted one
    assert_relative_eq!(z, 3.6559, epsilon = 1e-3);
}

#[test]
fn taylor_polynomial_recovers_oxygen_within_fit_tolerance() {
    let table = synthetic_table();
    let taylor = Taylor::new(table.clone(), TaylorMode::Polynomial);
    let oxygen = single_element(&table, 8);
    let z = taylor.zeff_at(&oxygen, e_ave()).unwrap();
    assert!((z - 8.0).abs() < 0.5, "z = {z}");
}

#[test]
fn torikoshi_recovers_oxygen_within_fit_tolerance() {
    let table = synthetic_table();
    let torikoshi = Torikoshi::new(table.clone());
    let oxygen = single_element(&table, 8);
    let z = torikoshi.zeff_at(&oxygen, e_ave()).unwrap();
    assert!((z - 8.0).abs() < 0.5, "z = {z}");
}

#[test]
fn torikoshi_water_lands_on_the_electron_weighted_branch() {
    let table = synthetic_table();
    let torikoshi = Torikoshi::new(table.clone());
    let water = water(&table);
    let z = torikoshi.zeff_at(&water, e_ave()).unwrap();
    assert!((7.5..8.5).contains(&z), "z = {z}");
}

#[test]
fn der_table_is_monotone_and_inverts_elements_exactly() {
    let table = synthetic_table();
    let bourque = Bourque::new(table.clone(), FitStrategy::Polynomial).unwrap();
    let der = bourque.parameterize_der(E_HIGH, E_LOW).unwrap();

    assert!(der.der_min < der.der_max);
    assert!((0.8..1.0).contains(&der.der_min), "{}", der.der_min);
    assert!((2.0..2.3).contains(&der.der_max), "{}", der.der_max);

    // the polynomial DER of oxygen, pushed through the inverse spline;
    // the degree-9 DER fit carries a small bias, so this is a loose check
    let der_oxygen = der.der_of_z(8.0);
    assert!((der.zeff_of_der(der_oxygen) - 8.0).abs() < 0.05);
}

#[test]
fn der_clamps_out_of_range_ratios_to_boundary_atomic_numbers() {
    let table = synthetic_table();
    let bourque = Bourque::new(table.clone(), FitStrategy::Polynomial).unwrap();
    let der = bourque.parameterize_der(E_HIGH, E_LOW).unwrap();
    assert_relative_eq!(der.zeff_of_der(der.der_min / 2.0), 1.0, epsilon = 1e-9);
    assert_relative_eq!(der.zeff_of_der(der.der_max * 2.0), 36.0, epsilon = 1e-9);
}

/// End-to-end cross-check: water through the image-scale DER path against
/// the Mayneord power-law estimate.
#[test]
fn water_der_path_agrees_with_mayneord() {
    let table = synthetic_table();
    let bourque = Bourque::new(table.clone(), FitStrategy::Polynomial).unwrap();
    let der = bourque.parameterize_der(E_HIGH, E_LOW).unwrap();
    let water = water(&table);

    let mu_high = water.mac_at(E_HIGH).unwrap() * water.density;
    let mu_low = water.mac_at(E_LOW).unwrap() * water.density;
    let z = der.zeff_of_mu_pair(mu_high, mu_low);

    let mayneord = PowerLaw::mayneord().zeff(&water);
    assert!((z - mayneord).abs() < 0.1, "z = {z}, mayneord = {mayneord}");
}

#[test]
fn abbema_literature_recovers_water_and_oxygen() {
    let table = synthetic_table();
    let abbema = Abbema::new(AbbemaCoefficients::literature(), E_HIGH, E_LOW);

    let water = water(&table);
    let z_water = abbema.zeff_of_material(&water).unwrap();
    assert!((z_water - 7.37).abs() < 0.05, "z = {z_water}");

    let oxygen = table.element(8).unwrap();
    let z_oxygen = abbema
        .solve_mu_pair(oxygen.total_xs(E_HIGH), oxygen.total_xs(E_LOW))
        .unwrap();
    assert!((z_oxygen - 8.0).abs() < 0.1, "z = {z_oxygen}");
}

#[test]
fn abbema_staged_fit_recovers_the_generating_exponents() {
    let table = synthetic_table();
    let coeffs = AbbemaCoefficients::staged_fit(&table).unwrap();
    assert_relative_eq!(coeffs.b, 3.302, epsilon = 1e-3);
    assert_relative_eq!(coeffs.c, 4.62, epsilon = 1e-2);
    assert_relative_eq!(coeffs.f, 1.856, epsilon = 1e-2);
    assert_relative_eq!(coeffs.g, 2.60, epsilon = 1e-2);
    assert_relative_eq!(coeffs.k, 0.939, epsilon = 1e-2);
    assert_relative_eq!(coeffs.a, 22.3, max_relative = 0.02);
}

#[test]
fn abbema_joint_fit_recovers_the_generating_model() {
    let table = synthetic_table();
    let coeffs = AbbemaCoefficients::joint_fit(&table).unwrap();
    assert_relative_eq!(coeffs.b, 3.302, epsilon = 1e-2);
    assert_relative_eq!(coeffs.c, 4.62, epsilon = 1e-2);
    assert_relative_eq!(coeffs.j, 0.00197, epsilon = 1e-4);
    // the refit model must reproduce the tabulated totals closely
    let oxygen = table.element(8).unwrap();
    let predicted = coeffs.total_xs(60.0, 8.0);
    let tabulated = oxygen.total_xs(60.0);
    assert_relative_eq!(predicted, tabulated, max_relative = 1e-3);
}

#[test]
fn solver_reports_missing_roots_instead_of_guessing() {
    let table = synthetic_table();
    let bourque = Bourque::new(table.clone(), FitStrategy::BSpline).unwrap();
    let water = water(&table);
    // an energy far outside every tabulated curve zeroes the cross
    // sections; no root is admissible there
    let result = bourque.zeff_at(&water, 5000.0);
    assert!(matches!(
        result,
        Err(ZeffCtError::NoAdmissibleRoot { .. }) | Err(ZeffCtError::Numerical(_))
    ));
}
