use std::collections::BTreeMap;
use std::path::Path;

use tracing::info;

use crate::element::Element;
use crate::error::{Result, ZeffCtError};
use crate::parsers;

/// All elements available to the physics layer, keyed and iterated by Z.
///
/// Built once at startup from the reference data files, then shared
/// read-only (wrap in `Arc` for that); nothing mutates it afterwards.
#[derive(Debug, Default)]
pub struct ElementTable {
    elements: BTreeMap<u32, Element>,
}

impl ElementTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a table from the two reference-data directories: `awr_dir` holds
    /// the atomic-weight-ratio files, `curve_dir` the per-element process
    /// curve files.
    pub fn load(awr_dir: &Path, curve_dir: &Path) -> Result<Self> {
        let mut table = ElementTable::new();
        for (z, awr) in parsers::parse_awr_dir(awr_dir)? {
            let mut element = Element::new(z);
            element.set_awr(awr);
            table.insert(element);
        }
        parsers::load_process_curves(curve_dir, &mut table)?;
        info!(elements = table.len(), "element table loaded");
        Ok(table)
    }

    pub fn insert(&mut self, element: Element) {
        self.elements.insert(element.z, element);
    }

    pub fn element(&self, z: u32) -> Result<&Element> {
        self.elements.get(&z).ok_or(ZeffCtError::UnknownElement(z))
    }

    pub fn element_mut(&mut self, z: u32) -> Result<&mut Element> {
        self.elements
            .get_mut(&z)
            .ok_or(ZeffCtError::UnknownElement(z))
    }

    pub fn contains(&self, z: u32) -> bool {
        self.elements.contains_key(&z)
    }

    /// Elements in ascending Z order.
    pub fn iter(&self) -> impl Iterator<Item = &Element> {
        self.elements.values()
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Largest tabulated Z.
    pub fn max_z(&self) -> Option<u32> {
        self.elements.keys().next_back().copied()
    }
}
