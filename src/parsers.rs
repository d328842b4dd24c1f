use std::path::Path;
use std::sync::Arc;

use crate::element::TOTAL_REF;
use crate::error::{Result, ZeffCtError};
use crate::interp::XsCurve;
use crate::material::{Fraction, Material};
use crate::table::ElementTable;

/// Parse the atomic-weight-ratio directory.
///
/// Each file covers one element; the second line's first field encodes the
/// element as Z*1000 and the second field is the atomic weight ratio. Files
/// are read in sorted name order so results are stable across file systems.
pub fn parse_awr_dir(dir: &Path) -> Result<Vec<(u32, f64)>> {
    let mut names: Vec<_> = std::fs::read_dir(dir)
        .map_err(|e| ZeffCtError::DataError(format!("cannot read {}: {e}", dir.display())))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file())
        .collect();
    names.sort();

    let mut records = Vec::new();
    for path in names {
        let content = std::fs::read_to_string(&path)
            .map_err(|e| ZeffCtError::DataError(format!("cannot read {}: {e}", path.display())))?;
        let line = content.lines().nth(1).ok_or_else(|| {
            ZeffCtError::DataError(format!("{}: missing header line", path.display()))
        })?;
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 2 {
            return Err(ZeffCtError::DataError(format!(
                "{}: malformed header line",
                path.display()
            )));
        }
        let za: f64 = fields[0]
            .parse()
            .map_err(|_| ZeffCtError::DataError(format!("{}: bad ZA field", path.display())))?;
        let awr: f64 = fields[1]
            .parse()
            .map_err(|_| ZeffCtError::DataError(format!("{}: bad AWR field", path.display())))?;
        records.push(((za / 1000.0) as u32, awr));
    }
    Ok(records)
}

/// Load every process-curve file from `dir` into `table`.
///
/// One file per element; elements must already exist in the table (the AWR
/// pass creates them).
pub fn load_process_curves(dir: &Path, table: &mut ElementTable) -> Result<()> {
    let mut names: Vec<_> = std::fs::read_dir(dir)
        .map_err(|e| ZeffCtError::DataError(format!("cannot read {}: {e}", dir.display())))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file())
        .collect();
    names.sort();

    for path in names {
        let content = std::fs::read_to_string(&path)
            .map_err(|e| ZeffCtError::DataError(format!("cannot read {}: {e}", path.display())))?;
        parse_curve_file(&content, table)
            .map_err(|e| ZeffCtError::DataError(format!("{}: {e}", path.display())))?;
    }
    Ok(())
}

/// Parse one process-curve document into the table.
///
/// The reader understands the structural subset the loader consumes: the
/// `chemicalElement` info node (Z, symbol), `reaction` blocks labelled with
/// process names, and the `crossSectionSum` block holding the tabulated
/// reference total (ENDF MT 501). Curve payloads are whitespace-separated
/// alternating energy/cross-section values; energies arrive in eV and are
/// stored in keV.
pub fn parse_curve_file(content: &str, table: &mut ElementTable) -> Result<()> {
    let info = find_tag(content, "chemicalElement")
        .ok_or_else(|| ZeffCtError::DataError("missing chemicalElement info".into()))?;
    let z: u32 = attr(info, "Z")
        .and_then(|v| v.parse().ok())
        .ok_or_else(|| ZeffCtError::DataError("bad Z attribute".into()))?;
    let symbol = attr(info, "symbol")
        .ok_or_else(|| ZeffCtError::DataError("missing symbol attribute".into()))?
        .to_string();

    if !table.contains(z) {
        return Err(ZeffCtError::UnknownElement(z));
    }

    let mut curves: Vec<(String, XsCurve)> = Vec::new();

    for block in find_blocks(content, "crossSectionSum") {
        if attr(block.open_tag, "ENDF_MT") == Some("501") {
            curves.push((TOTAL_REF.to_string(), parse_values(block.body)?));
        }
    }
    if !curves.iter().any(|(label, _)| label == TOTAL_REF) {
        return Err(ZeffCtError::DataError("missing MT=501 total sum".into()));
    }

    for block in find_blocks(content, "reaction") {
        let label = attr(block.open_tag, "label")
            .ok_or_else(|| ZeffCtError::DataError("reaction without label".into()))?;
        curves.push((label.to_string(), parse_values(block.body)?));
    }

    let element = table.element_mut(z)?;
    element.symbol = symbol;
    for (label, curve) in curves {
        element.add_process(label, curve);
    }
    Ok(())
}

fn parse_values(body: &str) -> Result<XsCurve> {
    let mut energy = Vec::new();
    let mut micro_xs = Vec::new();
    for payload in find_blocks(body, "values") {
        let mut numbers = payload.body.split_whitespace();
        while let Some(first) = numbers.next() {
            let second = numbers
                .next()
                .ok_or_else(|| ZeffCtError::DataError("odd value count in curve".into()))?;
            let e: f64 = first
                .parse()
                .map_err(|_| ZeffCtError::DataError(format!("bad energy '{first}'")))?;
            let xs: f64 = second
                .parse()
                .map_err(|_| ZeffCtError::DataError(format!("bad cross section '{second}'")))?;
            let e_kev = e / 1000.0;
            // region boundaries repeat the shared energy; keep the later value
            if energy.last() == Some(&e_kev) {
                *micro_xs.last_mut().unwrap() = xs;
                continue;
            }
            if energy.last().is_some_and(|&last| e_kev < last) {
                return Err(ZeffCtError::DataError("curve energies not ascending".into()));
            }
            energy.push(e_kev);
            micro_xs.push(xs);
        }
    }
    if energy.is_empty() {
        return Err(ZeffCtError::DataError("empty curve".into()));
    }
    Ok(XsCurve::new(energy, micro_xs))
}

struct TagBlock<'a> {
    open_tag: &'a str,
    body: &'a str,
}

/// Find the first occurrence of `<name ...>` and return the open tag text.
fn find_tag<'a>(content: &'a str, name: &str) -> Option<&'a str> {
    let mut search = content;
    let open = format!("<{name}");
    while let Some(start) = search.find(&open) {
        let rest = &search[start + open.len()..];
        if rest.starts_with(|c: char| c.is_whitespace() || c == '>' || c == '/') {
            let end = rest.find('>')?;
            return Some(&search[start..start + open.len() + end + 1]);
        }
        search = &search[start + open.len()..];
    }
    None
}

/// Enumerate non-nested `<name ...>...</name>` blocks.
fn find_blocks<'a>(content: &'a str, name: &str) -> Vec<TagBlock<'a>> {
    let open = format!("<{name}");
    let close = format!("</{name}>");
    let mut blocks = Vec::new();
    let mut offset = 0;
    while let Some(start) = content[offset..].find(&open) {
        let tag_start = offset + start;
        let after_name = tag_start + open.len();
        // reject prefixes of longer tag names (e.g. reaction vs reactionSuite)
        if !content[after_name..].starts_with(|c: char| c.is_whitespace() || c == '>' || c == '/') {
            offset = after_name;
            continue;
        }
        let Some(tag_end_rel) = content[tag_start..].find('>') else {
            break;
        };
        let tag_end = tag_start + tag_end_rel + 1;
        let open_tag = &content[tag_start..tag_end];
        if open_tag.ends_with("/>") {
            blocks.push(TagBlock {
                open_tag,
                body: "",
            });
            offset = tag_end;
            continue;
        }
        let Some(close_rel) = content[tag_end..].find(&close) else {
            break;
        };
        blocks.push(TagBlock {
            open_tag,
            body: &content[tag_end..tag_end + close_rel],
        });
        offset = tag_end + close_rel + close.len();
    }
    blocks
}

/// Extract an attribute value from an open tag.
fn attr<'a>(tag: &'a str, name: &str) -> Option<&'a str> {
    let needle = format!("{name}=\"");
    let start = tag.find(&needle)? + needle.len();
    let end = tag[start..].find('"')?;
    Some(&tag[start..start + end])
}

/// Parse the line-oriented NIST material list and commit every material
/// against `table`.
///
/// Format per block: a `name:` line, one `Z:fraction` line per element
/// (weight fractions), a three-token line whose last token is the density,
/// and an `end` marker.
pub fn parse_nist_materials(path: &Path, table: &Arc<ElementTable>) -> Result<Vec<Material>> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| ZeffCtError::DataError(format!("cannot read {}: {e}", path.display())))?;
    parse_nist_material_text(&content, table)
}

pub fn parse_nist_material_text(content: &str, table: &Arc<ElementTable>) -> Result<Vec<Material>> {
    let mut materials = Vec::new();
    let mut current: Option<Material> = None;

    for line in content.lines() {
        let tokens: Vec<&str> = line.split_whitespace().collect();

        if let Some(name) = line.strip_prefix("name:") {
            current = Some(Material::new(name.trim(), table.clone()));
        } else if line.contains(':') && !line.contains("name") {
            let (z_text, fraction_text) = line
                .split_once(':')
                .ok_or_else(|| ZeffCtError::DataError(format!("malformed line '{line}'")))?;
            let z: u32 = z_text.trim().parse().map_err(|_| {
                ZeffCtError::DataError(format!("bad atomic number in '{line}'"))
            })?;
            let fraction: f64 = fraction_text.trim().parse().map_err(|_| {
                ZeffCtError::DataError(format!("bad fraction in '{line}'"))
            })?;
            let material = current
                .as_mut()
                .ok_or_else(|| ZeffCtError::DataError("fraction before name:".into()))?;
            material.add_element(z, Fraction::Weight(fraction))?;
        } else if line.contains("end") {
            let material = current
                .take()
                .ok_or_else(|| ZeffCtError::DataError("end before name:".into()))?;
            materials.push(material);
        } else if tokens.len() == 3 {
            let density: f64 = tokens[2].parse().map_err(|_| {
                ZeffCtError::DataError(format!("bad density in '{line}'"))
            })?;
            let material = current
                .as_mut()
                .ok_or_else(|| ZeffCtError::DataError("density before name:".into()))?;
            material.density = density;
        }
    }

    for material in &mut materials {
        material.commit()?;
    }
    tracing::info!(count = materials.len(), "reference materials imported");
    Ok(materials)
}
