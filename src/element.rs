use std::collections::BTreeMap;

use crate::constants::NEUTRON_MASS_AMU;
use crate::interp::XsCurve;

/// Reference-library channel holding the tabulated total cross section.
///
/// The total between tabulated energies MUST NOT be obtained by interpolating
/// this channel; the only consistent definition is the sum of the linearly
/// interpolated partial processes. The channel is kept for regression checks.
pub const TOTAL_REF: &str = "total_ref";

/// Photon interaction process classes recognised in the per-process table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessKind {
    Photoelectric,
    Incoherent,
    Coherent,
    PairProduction,
    TotalRef,
}

impl ProcessKind {
    /// Classify a reference-library process label.
    ///
    /// Labels follow the upstream naming convention: coherent and incoherent
    /// scattering carry a bracketed marker, pair production is spelled out,
    /// and every remaining non-reference label is a photoelectric subshell.
    pub fn classify(label: &str) -> Self {
        if label == TOTAL_REF {
            Self::TotalRef
        } else if label.contains("[incoherent]") {
            Self::Incoherent
        } else if label.contains("[coherent]") {
            Self::Coherent
        } else if label.contains("pair production") {
            Self::PairProduction
        } else {
            Self::Photoelectric
        }
    }
}

/// Element-specific data: identity, atomic mass, and the per-process
/// tabulated cross-section curves.
///
/// The process map is ordered by label so iteration order is deterministic.
#[derive(Debug, Clone)]
pub struct Element {
    pub z: u32,
    pub symbol: String,
    /// Atomic mass in u, derived from the atomic weight ratio.
    pub a: f64,
    /// Atomic weight ratio relative to the neutron.
    pub awr: f64,
    xs_table: BTreeMap<String, XsCurve>,
}

impl Element {
    pub fn new(z: u32) -> Self {
        Element {
            z,
            symbol: String::new(),
            a: 0.0,
            awr: 0.0,
            xs_table: BTreeMap::new(),
        }
    }

    /// Set the atomic weight ratio and derive the atomic mass from it.
    pub fn set_awr(&mut self, awr: f64) {
        self.awr = awr;
        self.a = awr * NEUTRON_MASS_AMU;
    }

    /// Add (or replace) a process curve under the given label.
    pub fn add_process(&mut self, label: impl Into<String>, curve: XsCurve) {
        self.xs_table.insert(label.into(), curve);
    }

    pub fn process(&self, label: &str) -> Option<&XsCurve> {
        self.xs_table.get(label)
    }

    pub fn processes(&self) -> impl Iterator<Item = (&str, &XsCurve)> {
        self.xs_table.iter().map(|(k, v)| (k.as_str(), v))
    }

    fn summed_xs(&self, energy: f64, accept: impl Fn(ProcessKind) -> bool) -> f64 {
        self.xs_table
            .iter()
            .filter(|(label, _)| accept(ProcessKind::classify(label)))
            .map(|(_, curve)| curve.interpolate(energy))
            .sum()
    }

    /// Total microscopic cross section at `energy` keV, in barns.
    ///
    /// Computed as the sum of all interpolated partials; the tabulated
    /// `total_ref` channel is excluded by definition.
    pub fn total_xs(&self, energy: f64) -> f64 {
        self.summed_xs(energy, |kind| kind != ProcessKind::TotalRef)
    }

    /// Photoelectric microscopic cross section (all subshells) in barns.
    pub fn photoelectric_xs(&self, energy: f64) -> f64 {
        self.summed_xs(energy, |kind| kind == ProcessKind::Photoelectric)
    }

    /// Incoherent (Compton) microscopic cross section in barns.
    pub fn compton_xs(&self, energy: f64) -> f64 {
        self.summed_xs(energy, |kind| kind == ProcessKind::Incoherent)
    }

    /// Coherent (Rayleigh) microscopic cross section in barns.
    pub fn rayleigh_xs(&self, energy: f64) -> f64 {
        self.summed_xs(energy, |kind| kind == ProcessKind::Coherent)
    }

    /// Microscopic cross section per electron, in barns.
    pub fn electron_xs(&self, energy: f64) -> f64 {
        self.total_xs(energy) / self.z as f64
    }

    /// The incoherent-scatter curve, if present.
    pub fn compton_curve(&self) -> Option<&XsCurve> {
        self.xs_table
            .iter()
            .find(|(label, _)| ProcessKind::classify(label) == ProcessKind::Incoherent)
            .map(|(_, curve)| curve)
    }

    /// The coherent-scatter curve, if present.
    pub fn rayleigh_curve(&self) -> Option<&XsCurve> {
        self.xs_table
            .iter()
            .find(|(label, _)| ProcessKind::classify(label) == ProcessKind::Coherent)
            .map(|(_, curve)| curve)
    }
}
