mod common;

use std::sync::Arc;

use approx::assert_relative_eq;
use zeffct::constants::NEUTRON_MASS_AMU;
use zeffct::element::TOTAL_REF;
use zeffct::parsers;
use zeffct::table::ElementTable;

const HYDROGEN_AWR_FILE: &str = "\
 header line that carries no data\n\
 1000.000000 0.99916730 some trailing fields\n";

const OXYGEN_AWR_FILE: &str = "\
 header line that carries no data\n\
 8000.000000 15.86190000 some trailing fields\n";

const OXYGEN_CURVE_FILE: &str = r#"<reactionSuite projectile="photon">
  <chemicalElement Z="8" symbol="O">
  </chemicalElement>
  <crossSectionSum ENDF_MT="501" label="total">
    <crossSection>
      <regions1d>
        <XYs1d>
          <values>10000.0 3.5 20000.0 2.1 40000.0 1.2</values>
        </XYs1d>
      </regions1d>
    </crossSection>
  </crossSectionSum>
  <reaction label="photo-electric 1s1/2">
    <crossSection>
      <XYs1d>
        <values>10000.0 2.0 20000.0 0.9</values>
        <values>20000.0 0.9 40000.0 0.3</values>
      </XYs1d>
    </crossSection>
  </reaction>
  <reaction label="photon + O [coherent] scattering">
    <crossSection>
      <XYs1d>
        <values>10000.0 1.0 20000.0 0.7 40000.0 0.5</values>
      </XYs1d>
    </crossSection>
  </reaction>
  <reaction label="photon + O [incoherent] scattering">
    <crossSection>
      <XYs1d>
        <values>10000.0 0.5 20000.0 0.5 40000.0 0.4</values>
      </XYs1d>
    </crossSection>
  </reaction>
</reactionSuite>
"#;

#[test]
fn awr_directory_is_parsed_in_sorted_order() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("b_oxygen.txt"), OXYGEN_AWR_FILE).unwrap();
    std::fs::write(dir.path().join("a_hydrogen.txt"), HYDROGEN_AWR_FILE).unwrap();

    let records = parsers::parse_awr_dir(dir.path()).unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].0, 1);
    assert_relative_eq!(records[0].1, 0.9991673, epsilon = 1e-6);
    assert_eq!(records[1].0, 8);
}

#[test]
fn curve_file_populates_every_process() {
    let mut table = ElementTable::new();
    let mut oxygen = zeffct::element::Element::new(8);
    oxygen.set_awr(15.8619);
    table.insert(oxygen);

    parsers::parse_curve_file(OXYGEN_CURVE_FILE, &mut table).unwrap();
    let oxygen = table.element(8).unwrap();
    assert_eq!(oxygen.symbol, "O");

    // energies converted from eV to keV; region-boundary duplicate merged
    let pe = oxygen.process("photo-electric 1s1/2").unwrap();
    assert_eq!(pe.energy, vec![10.0, 20.0, 40.0]);
    assert_eq!(pe.micro_xs, vec![2.0, 0.9, 0.3]);

    let reference = oxygen.process(TOTAL_REF).unwrap();
    assert_eq!(reference.len(), 3);

    // total at a node equals the sum of the partials there
    assert_relative_eq!(oxygen.total_xs(20.0), 0.9 + 0.7 + 0.5, epsilon = 1e-12);
}

#[test]
fn curve_file_for_unknown_element_fails() {
    let mut table = ElementTable::new();
    let err = parsers::parse_curve_file(OXYGEN_CURVE_FILE, &mut table).unwrap_err();
    assert!(matches!(err, zeffct::ZeffCtError::UnknownElement(8)));
}

#[test]
fn curve_with_odd_value_count_fails() {
    let mut table = ElementTable::new();
    table.insert(zeffct::element::Element::new(8));
    let content = OXYGEN_CURVE_FILE.replace(
        "<values>10000.0 1.0 20000.0 0.7 40000.0 0.5</values>",
        "<values>10000.0 1.0 20000.0</values>",
    );
    assert!(parsers::parse_curve_file(&content, &mut table).is_err());
}

#[test]
fn end_to_end_table_load_from_disk() {
    let awr_dir = tempfile::tempdir().unwrap();
    std::fs::write(awr_dir.path().join("o.txt"), OXYGEN_AWR_FILE).unwrap();
    let curve_dir = tempfile::tempdir().unwrap();
    std::fs::write(curve_dir.path().join("o.xml"), OXYGEN_CURVE_FILE).unwrap();

    let table = ElementTable::load(awr_dir.path(), curve_dir.path()).unwrap();
    assert_eq!(table.len(), 1);
    let oxygen = table.element(8).unwrap();
    assert_relative_eq!(oxygen.a, 15.8619 * NEUTRON_MASS_AMU, epsilon = 1e-9);
    assert!(oxygen.total_xs(15.0) > 0.0);
}

const NIST_MATERIAL_TEXT: &str = "\
name: Water, Liquid\n\
1: 0.111894\n\
8: 0.888106\n\
density = 1.0\n\
end\n\
\n\
name: Dry Air\n\
6: 0.000124\n\
7: 0.755267\n\
8: 0.231781\n\
18: 0.012827\n\
density = 0.00120479\n\
end\n";

#[test]
fn nist_material_text_parses_and_commits() {
    let table: Arc<ElementTable> = common::synthetic_table();
    let materials = parsers::parse_nist_material_text(NIST_MATERIAL_TEXT, &table).unwrap();
    assert_eq!(materials.len(), 2);

    let water = &materials[0];
    assert_eq!(water.name, "Water, Liquid");
    assert!(water.is_committed());
    assert_relative_eq!(water.density, 1.0, epsilon = 1e-12);
    let weight_sum: f64 = water.components().map(|c| c.weight_fraction).sum();
    assert_relative_eq!(weight_sum, 1.0, epsilon = 1e-6);

    let air = &materials[1];
    assert_relative_eq!(air.density, 0.00120479, epsilon = 1e-12);
    assert_eq!(air.components().count(), 4);
}

#[test]
fn nist_fraction_before_name_fails() {
    let table: Arc<ElementTable> = common::synthetic_table();
    let err = parsers::parse_nist_material_text("1: 0.5\n", &table).unwrap_err();
    assert!(matches!(err, zeffct::ZeffCtError::DataError(_)));
}
