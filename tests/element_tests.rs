mod common;

use common::{synthetic_table, total_xs};
use zeffct::element::TOTAL_REF;

#[test]
fn interpolation_is_exact_on_tabulated_nodes() {
    let table = synthetic_table();
    let oxygen = table.element(8).unwrap();
    for (_, curve) in oxygen.processes() {
        for (e, xs) in curve.energy.iter().zip(curve.micro_xs.iter()) {
            assert_eq!(curve.interpolate(*e), *xs);
        }
    }
}

#[test]
fn interpolation_is_zero_outside_the_tabulated_range() {
    let table = synthetic_table();
    let oxygen = table.element(8).unwrap();
    for (_, curve) in oxygen.processes() {
        assert_eq!(curve.interpolate(9.999), 0.0);
        assert_eq!(curve.interpolate(200.1), 0.0);
    }
}

#[test]
fn total_is_the_sum_of_interpolated_partials() {
    let table = synthetic_table();
    let oxygen = table.element(8).unwrap();
    let energy = 61.0;
    let by_parts = oxygen.photoelectric_xs(energy)
        + oxygen.compton_xs(energy)
        + oxygen.rayleigh_xs(energy);
    assert!((oxygen.total_xs(energy) - by_parts).abs() < 1e-12);
}

/// Regression guard against the forbidden shortcut: between tabulated nodes
/// the sum of interpolated partials must differ from interpolating the
/// reference total directly.
#[test]
fn total_differs_from_direct_reference_interpolation_between_nodes() {
    let table = synthetic_table();
    let oxygen = table.element(8).unwrap();
    // 61 keV sits strictly between nodes of the reference grid
    let energy = 61.0;
    let computed = oxygen.total_xs(energy);
    let reference = oxygen.process(TOTAL_REF).unwrap().interpolate(energy);
    let difference = (computed - reference).abs();
    assert!(difference > 1e-10, "difference = {difference:e}");
    // both are still approximations of the same smooth function
    assert!(difference / reference < 0.01);
}

#[test]
fn total_tracks_the_closed_form_between_nodes() {
    let table = synthetic_table();
    let iron = table.element(26).unwrap();
    let energy = 61.0;
    let exact = total_xs(energy, 26.0);
    assert!((iron.total_xs(energy) - exact).abs() / exact < 1e-3);
}

#[test]
fn electron_xs_is_total_over_z() {
    let table = synthetic_table();
    let calcium = table.element(20).unwrap();
    let energy = 60.0;
    assert!((calcium.electron_xs(energy) - calcium.total_xs(energy) / 20.0).abs() < 1e-12);
}

#[test]
fn table_is_iterated_in_ascending_z() {
    let table = synthetic_table();
    let zs: Vec<u32> = table.iter().map(|el| el.z).collect();
    assert_eq!(zs.len(), 53);
    assert!(zs.windows(2).all(|w| w[0] < w[1]));
    assert_eq!(table.max_z(), Some(53));
}

#[test]
fn unknown_element_is_an_error() {
    let table = synthetic_table();
    assert!(table.element(99).is_err());
}
