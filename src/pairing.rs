use std::collections::BTreeMap;

use tracing::info;

use crate::constants::{HIGH_KVP, KVP_TOLERANCE, LOW_KVP, LOW_KVP_100};
use crate::error::{Result, ZeffCtError};

/// Metadata of one image file, as supplied by the DICOM collaborator.
/// `id` is an opaque file identity (typically the path).
#[derive(Debug, Clone, PartialEq)]
pub struct SliceMeta {
    pub id: String,
    pub patient_id: String,
    pub study_id: String,
    pub series_number: i32,
    pub kvp: f64,
    pub slice_location: f64,
    pub image_type: Vec<String>,
}

/// Metadata of one blended ("mixed") image file.
#[derive(Debug, Clone, PartialEq)]
pub struct MixedSliceMeta {
    pub id: String,
    pub series_number: i32,
    pub slice_location: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KvpClass {
    Low,
    High,
}

/// One matched slice: the low-kVp file, the high-kVp file at the same slice
/// location, and optionally the blended image.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesPair {
    pub low: SliceMeta,
    pub high: SliceMeta,
    pub mixed: Option<MixedSliceMeta>,
}

/// The pairing result: (low series number, high series number) -> slices
/// ordered by ascending slice location.
#[derive(Debug, Clone, Default)]
pub struct SeriesPairTable {
    pairs: BTreeMap<(i32, i32), Vec<SeriesPair>>,
}

fn kvp_is(value: f64, nominal: f64) -> bool {
    (value - nominal).abs() < KVP_TOLERANCE
}

fn classify_kvp(value: f64) -> Result<KvpClass> {
    if kvp_is(value, LOW_KVP) || kvp_is(value, LOW_KVP_100) {
        Ok(KvpClass::Low)
    } else if kvp_is(value, HIGH_KVP) {
        Ok(KvpClass::High)
    } else {
        Err(ZeffCtError::Pairing(format!("unknown kVp {value}")))
    }
}

impl SeriesPairTable {
    /// Discover and validate the low/high pairing for one study directory's
    /// metadata.
    ///
    /// Only ORIGINAL images participate. Fails on: multiple patients, an
    /// odd series count, a kVp outside the accepted tube classes, or a low
    /// series with no matching high series.
    pub fn build(files: &[SliceMeta]) -> Result<Self> {
        // mixed images are excluded up front, though some scanners mark
        // blends as ORIGINAL too
        let originals: Vec<&SliceMeta> = files
            .iter()
            .filter(|file| file.image_type.first().map(String::as_str) == Some("ORIGINAL"))
            .collect();
        if originals.is_empty() {
            return Err(ZeffCtError::Pairing("no ORIGINAL images found".into()));
        }

        let patient = &originals[0].patient_id;
        if originals.iter().any(|file| &file.patient_id != patient) {
            return Err(ZeffCtError::Pairing("more than one patient found".into()));
        }
        // study id is left unchecked: it is empty in some archives

        let mut series: BTreeMap<i32, Vec<&SliceMeta>> = BTreeMap::new();
        for file in &originals {
            series.entry(file.series_number).or_default().push(file);
        }
        if series.len() % 2 != 0 {
            return Err(ZeffCtError::Pairing(format!(
                "odd number of series: {}",
                series.len()
            )));
        }

        let mut low_series: BTreeMap<i32, Vec<&SliceMeta>> = BTreeMap::new();
        let mut high_series: BTreeMap<i32, Vec<&SliceMeta>> = BTreeMap::new();
        for (number, mut slices) in series {
            slices.sort_by(|a, b| a.slice_location.total_cmp(&b.slice_location));
            match classify_kvp(slices[0].kvp)? {
                KvpClass::Low => {
                    low_series.insert(number, slices);
                }
                KvpClass::High => {
                    high_series.insert(number, slices);
                }
            }
        }

        let mut pairs = BTreeMap::new();
        for (&low_number, low_slices) in &low_series {
            let matching_high = high_series.iter().find(|(_, high_slices)| {
                high_slices.len() == low_slices.len()
                    && low_slices
                        .iter()
                        .zip(high_slices.iter())
                        .all(|(low, high)| low.slice_location == high.slice_location)
            });
            let Some((&high_number, high_slices)) = matching_high else {
                return Err(ZeffCtError::Pairing(format!(
                    "no pairing series found for low-kVp series {low_number}"
                )));
            };

            let entries: Vec<SeriesPair> = low_slices
                .iter()
                .zip(high_slices.iter())
                .map(|(low, high)| SeriesPair {
                    low: (*low).clone(),
                    high: (*high).clone(),
                    mixed: None,
                })
                .collect();
            pairs.insert((low_number, high_number), entries);
        }

        let table = SeriesPairTable { pairs };
        table.validate()?;
        info!(
            series_pairs = table.pairs.len(),
            slices = table.pairs.values().map(Vec::len).sum::<usize>(),
            "series pairing complete"
        );
        Ok(table)
    }

    /// Final integrity pass over every record.
    fn validate(&self) -> Result<()> {
        for entry in self.pairs.values().flatten() {
            let low_ok = kvp_is(entry.low.kvp, LOW_KVP) || kvp_is(entry.low.kvp, LOW_KVP_100);
            let high_ok = kvp_is(entry.high.kvp, HIGH_KVP);
            if !low_ok || !high_ok || entry.low.slice_location != entry.high.slice_location {
                return Err(ZeffCtError::Pairing(format!(
                    "inconsistent pair: '{}' / '{}'",
                    entry.low.id, entry.high.id
                )));
            }
        }
        Ok(())
    }

    /// Attach blended images (from their own directory) to the pair list
    /// entries sharing their slice location. Every slot must be filled.
    pub fn attach_mixed(&mut self, mixed: &[MixedSliceMeta]) -> Result<()> {
        let mut mixed_series: BTreeMap<i32, Vec<&MixedSliceMeta>> = BTreeMap::new();
        for file in mixed {
            mixed_series.entry(file.series_number).or_default().push(file);
        }

        for mixed_slices in mixed_series.values() {
            for entries in self.pairs.values_mut() {
                if entries.len() != mixed_slices.len() {
                    continue;
                }
                for mixed_file in mixed_slices {
                    for entry in entries.iter_mut() {
                        if entry.low.slice_location == mixed_file.slice_location {
                            entry.mixed = Some((*mixed_file).clone());
                        }
                    }
                }
            }
        }

        for entry in self.pairs.values().flatten() {
            if entry.mixed.is_none() {
                return Err(ZeffCtError::Pairing(format!(
                    "no mixed image found for slice at {}",
                    entry.low.slice_location
                )));
            }
        }
        Ok(())
    }

    /// Pair groups keyed by (low series number, high series number), in key
    /// order.
    pub fn groups(&self) -> impl Iterator<Item = (&(i32, i32), &Vec<SeriesPair>)> {
        self.pairs.iter()
    }

    pub fn group(&self, low: i32, high: i32) -> Option<&[SeriesPair]> {
        self.pairs.get(&(low, high)).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    fn find_entry(&self, id: &str) -> Result<(&SeriesPair, KvpClass)> {
        for entry in self.pairs.values().flatten() {
            if entry.low.id == id {
                return Ok((entry, KvpClass::Low));
            }
            if entry.high.id == id {
                return Ok((entry, KvpClass::High));
            }
        }
        Err(ZeffCtError::Pairing(format!("file not found: {id}")))
    }

    /// The partner file of `id` at the other tube voltage.
    pub fn find_pairing_file(&self, id: &str) -> Result<&str> {
        let (entry, class) = self.find_entry(id)?;
        Ok(match class {
            KvpClass::Low => &entry.high.id,
            KvpClass::High => &entry.low.id,
        })
    }

    /// Whether `id` belongs to the low- or high-kVp series of its pair.
    pub fn kvp_class(&self, id: &str) -> Result<KvpClass> {
        Ok(self.find_entry(id)?.1)
    }

    /// The mixed image attached at `id`'s slice location.
    pub fn find_mixed_file(&self, id: &str) -> Result<&str> {
        let (entry, _) = self.find_entry(id)?;
        entry
            .mixed
            .as_ref()
            .map(|mixed| mixed.id.as_str())
            .ok_or_else(|| {
                ZeffCtError::Pairing(format!("no mixed image attached for: {id}"))
            })
    }
}
