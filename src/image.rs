use rayon::prelude::*;

use crate::abbema::Abbema;
use crate::bourque::DerTable;
use crate::error::{Result, ZeffCtError};
use crate::protocol::{prepare_hu, DualEnergyProtocol};
use crate::surface::ThinPlateSurface;

/// A rectangular image of f64 values, row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct CtImage {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl CtImage {
    pub fn zeros(rows: usize, cols: usize) -> Self {
        CtImage {
            rows,
            cols,
            data: vec![0.0; rows * cols],
        }
    }

    pub fn from_vec(rows: usize, cols: usize, data: Vec<f64>) -> Result<Self> {
        if data.len() != rows * cols {
            return Err(ZeffCtError::DataError(format!(
                "image data length {} does not match {rows}x{cols}",
                data.len()
            )));
        }
        Ok(CtImage { rows, cols, data })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.data[row * self.cols + col]
    }

    pub fn set(&mut self, row: usize, col: usize, value: f64) {
        self.data[row * self.cols + col] = value;
    }

    pub fn pixels(&self) -> &[f64] {
        &self.data
    }

    pub fn map(&self, f: impl Fn(f64) -> f64 + Sync + Send) -> CtImage {
        CtImage {
            rows: self.rows,
            cols: self.cols,
            data: self.data.par_iter().map(|&v| f(v)).collect(),
        }
    }

    fn same_shape(&self, other: &CtImage) -> Result<()> {
        if self.shape() != other.shape() {
            return Err(ZeffCtError::DataError(format!(
                "image shapes differ: {:?} vs {:?}",
                self.shape(),
                other.shape()
            )));
        }
        Ok(())
    }
}

/// Clamp raw CT numbers into the representable window and floor sub-air
/// pixels, ahead of any solve.
pub fn prepare_image(image: &CtImage) -> CtImage {
    image.map(prepare_hu)
}

/// Progress reporting for batch solves: total first, then one event per
/// completed image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressEvent {
    Started { total: usize },
    ImageDone { index: usize },
}

/// A per-image-pair Zeff solver. Every pixel solve is independent, so
/// implementations are free to parallelise internally; an external
/// native/GPU implementation is just another implementor selected at call
/// time, with the same whole-array contract.
pub trait ZeffImageSolver: Sync {
    fn solve_image(&self, high: &CtImage, low: &CtImage) -> Result<CtImage>;
}

/// Drive a list of (high, low) image pairs through a backend.
///
/// No partial results: the first failing image aborts the batch.
pub fn solve_series(
    solver: &dyn ZeffImageSolver,
    pairs: &[(CtImage, CtImage)],
    mut progress: impl FnMut(ProgressEvent),
) -> Result<Vec<CtImage>> {
    progress(ProgressEvent::Started { total: pairs.len() });
    let mut out = Vec::with_capacity(pairs.len());
    for (index, (high, low)) in pairs.iter().enumerate() {
        out.push(solver.solve_image(high, low)?);
        progress(ProgressEvent::ImageDone { index: index + 1 });
    }
    Ok(out)
}

/// CPU Abbema backend: bracketed Newton per pixel, parallel across pixels.
pub struct AbbemaBackend {
    abbema: Abbema,
    protocol: DualEnergyProtocol,
}

impl AbbemaBackend {
    pub fn new(abbema: Abbema, protocol: DualEnergyProtocol) -> Self {
        AbbemaBackend { abbema, protocol }
    }
}

impl ZeffImageSolver for AbbemaBackend {
    fn solve_image(&self, high: &CtImage, low: &CtImage) -> Result<CtImage> {
        high.same_shape(low)?;
        let data: Vec<f64> = high
            .pixels()
            .par_iter()
            .zip(low.pixels().par_iter())
            .map(|(&hu_high, &hu_low)| {
                let mu_high = self.protocol.hu_to_mu_high(hu_high);
                let mu_low = self.protocol.hu_to_mu_low(hu_low);
                self.abbema.solve_mu_pair(mu_high, mu_low)
            })
            .collect::<Result<Vec<f64>>>()?;
        CtImage::from_vec(high.rows(), high.cols(), data)
    }
}

/// Bourque DER lookup backend: the fast per-pixel path through the inverse
/// spline, with DER clamped to the fitted domain.
pub struct DerLookupBackend {
    der: DerTable,
    protocol: DualEnergyProtocol,
}

impl DerLookupBackend {
    pub fn new(der: DerTable, protocol: DualEnergyProtocol) -> Self {
        DerLookupBackend { der, protocol }
    }

    pub fn der_table(&self) -> &DerTable {
        &self.der
    }
}

impl ZeffImageSolver for DerLookupBackend {
    fn solve_image(&self, high: &CtImage, low: &CtImage) -> Result<CtImage> {
        high.same_shape(low)?;
        let data: Vec<f64> = high
            .pixels()
            .par_iter()
            .zip(low.pixels().par_iter())
            .map(|(&hu_high, &hu_low)| {
                let mu_high = self.protocol.hu_to_mu_high(hu_high);
                let mu_low = self.protocol.hu_to_mu_low(hu_low);
                self.der.zeff_of_mu_pair(mu_high, mu_low)
            })
            .collect();
        CtImage::from_vec(high.rows(), high.cols(), data)
    }
}

/// Surface-model lookup backend: inputs are clamped into the training CT
/// range, outputs into the configured admissible Zeff window.
pub struct SurfaceBackend {
    surface: ThinPlateSurface,
    zeff_min: f64,
    zeff_max: f64,
}

impl SurfaceBackend {
    pub fn new(surface: ThinPlateSurface, zeff_min: f64, zeff_max: f64) -> Self {
        SurfaceBackend {
            surface,
            zeff_min,
            zeff_max,
        }
    }
}

impl ZeffImageSolver for SurfaceBackend {
    fn solve_image(&self, high: &CtImage, low: &CtImage) -> Result<CtImage> {
        high.same_shape(low)?;
        let data: Vec<f64> = high
            .pixels()
            .par_iter()
            .zip(low.pixels().par_iter())
            .map(|(&hu_high, &hu_low)| {
                let (x, y) = self.surface.clamp_domain(hu_high, hu_low);
                self.surface.evaluate(x, y).clamp(self.zeff_min, self.zeff_max)
            })
            .collect();
        CtImage::from_vec(high.rows(), high.cols(), data)
    }
}
