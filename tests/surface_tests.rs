mod common;

use common::{synthetic_table, E_HIGH, E_LOW};
use zeffct::control_point::{ControlPointRecipe, ControlPointSet, SolverChoice};
use zeffct::fitting::FitStrategy;
use zeffct::image::{CtImage, SurfaceBackend, ZeffImageSolver};
use zeffct::protocol::DualEnergyProtocol;
use zeffct::surface::ThinPlateSurface;

fn build_set(recipe: ControlPointRecipe) -> ControlPointSet {
    let table = synthetic_table();
    let protocol = DualEnergyProtocol::with_energies(&table, E_HIGH, E_LOW).unwrap();
    ControlPointSet::build(
        &table,
        &protocol,
        SolverChoice::Bourque(FitStrategy::BSpline),
        recipe,
    )
    .unwrap()
}

#[test]
fn colon_ec_set_contains_references_and_blends() {
    let set = build_set(ControlPointRecipe::ColonEc);
    let points = set.control_points();

    let references = points.iter().filter(|p| p.is_reference).count();
    assert_eq!(references, 16);
    assert!(points.len() > references, "no synthetic blends retained");

    // sorted by average Zeff
    assert!(points
        .windows(2)
        .all(|pair| pair[0].zeff_ave <= pair[1].zeff_ave));

    // water pins the CT origin
    let water = points
        .iter()
        .find(|p| p.label.contains("Water"))
        .expect("water control point");
    assert!(water.ct_high.abs() < 1e-6);
    assert!(water.ct_low.abs() < 1e-6);

    // air pins the lower CT corner
    let air = points
        .iter()
        .find(|p| p.label.contains("Air"))
        .expect("air control point");
    assert!((air.ct_high + 1000.0).abs() < 1e-6);
    assert!((air.ct_low + 1000.0).abs() < 1e-6);
}

#[test]
fn kidney_stone_recipes_add_the_compounds() {
    let set = build_set(ControlPointRecipe::KidneyStone);
    let labels: Vec<&str> = set
        .summaries
        .iter()
        .map(|summary| summary.material.as_str())
        .collect();
    for name in [
        "uric acid",
        "calcium oxalate monohydrate",
        "calcium oxalate dihydrate",
        "hydroxyapatite",
        "cystine",
        "struvite",
    ] {
        assert!(labels.contains(&name), "missing {name}");
    }
}

#[test]
fn surface_reproduces_its_control_points() {
    let set = build_set(ControlPointRecipe::ColonEc);
    let points = set.control_points();
    let surface = ThinPlateSurface::fit(&points).unwrap();

    for point in &points {
        let predicted = surface.evaluate(point.ct_high, point.ct_low);
        let relative = (predicted - point.zeff_ave).abs() / point.zeff_ave;
        assert!(relative < 1e-3, "{}: relative error {relative:e}", point.label);
    }

    assert!(surface.mean_relative_error(&points) < 1e-6);
}

#[test]
fn surface_domain_clamp_saturates_out_of_range_queries() {
    let set = build_set(ControlPointRecipe::ColonEc);
    let points = set.control_points();
    let surface = ThinPlateSurface::fit(&points).unwrap();

    let (x_lo, x_hi) = surface.x_range();
    let (clamped_x, clamped_y) = surface.clamp_domain(x_hi + 5000.0, x_lo - 5000.0);
    assert_eq!(clamped_x, x_hi);
    assert_eq!(clamped_y, surface.y_range().0);
}

#[test]
fn surface_backend_solves_images_with_clamped_output() {
    let set = build_set(ControlPointRecipe::ColonEc);
    let points = set.control_points();
    let surface = ThinPlateSurface::fit(&points).unwrap();
    let backend = SurfaceBackend::new(surface, 1.0, 36.0);

    let high = CtImage::from_vec(2, 2, vec![0.0, -1000.0, 50.0, 3000.0]).unwrap();
    let low = CtImage::from_vec(2, 2, vec![0.0, -1000.0, 60.0, 3000.0]).unwrap();
    let zeff = backend.solve_image(&high, &low).unwrap();

    assert_eq!(zeff.shape(), (2, 2));
    for &value in zeff.pixels() {
        assert!((1.0..=36.0).contains(&value), "value = {value}");
    }

    // shape mismatch is an error, not a truncation
    let narrow = CtImage::zeros(2, 1);
    assert!(backend.solve_image(&high, &narrow).is_err());
}

#[test]
fn report_is_written_as_json() {
    let set = build_set(ControlPointRecipe::ColonEc);
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("control_points.json");
    set.write_report(&path).unwrap();

    let text = std::fs::read_to_string(&path).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert!(parsed["summaries"].as_array().unwrap().len() >= 16);
}
