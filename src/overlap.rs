use crate::DistError;
use itertools::Itertools;
use rustc_hash::FxHashMap;
use serde::Serialize;

/// Offset between consecutive overlap slices over the cyclic pair sequence
pub const OVERLAP_STRIDE: usize = 2;

/// Distinct overlap slices; audit directories reuse them round-robin
pub const OVERLAP_SLICES: usize = 3;

/// Copy one of `source`'s picks into `target`'s bunch
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct OverlapEntry {
    pub source: String,
    pub target: String,
}

impl OverlapEntry {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }
}

/// Every unordered pair of annotators, in annotator order
pub fn annotator_pairs(annotators: &[String]) -> Vec<OverlapEntry> {
    annotators
        .iter()
        .tuple_combinations()
        .map(|(a, b)| OverlapEntry::new(a.as_str(), b.as_str()))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlapMap {
    slices: Vec<Vec<OverlapEntry>>,
}

impl OverlapMap {
    /// Slice `per_audit` entries out of the cycled pair sequence at offsets
    /// 0, 2 and 4
    pub fn build(annotators: &[String], per_audit: usize) -> Result<Self, DistError> {
        if annotators.len() < 2 {
            return Err(DistError::InvalidConfig(format!(
                "overlaps need at least 2 annotators, got {}",
                annotators.len()
            )));
        }
        if !annotators.iter().all_unique() {
            return Err(DistError::InvalidConfig("annotator names must be unique".into()));
        }

        let pairs = annotator_pairs(annotators);
        let slices = (0..OVERLAP_SLICES)
            .map(|i| {
                pairs
                    .iter()
                    .cycle()
                    .skip(i * OVERLAP_STRIDE)
                    .take(per_audit)
                    .cloned()
                    .collect()
            })
            .collect();
        Ok(Self { slices })
    }

    /// Overlap list for the `index`-th audit directory
    pub fn for_directory(&self, index: usize) -> &[OverlapEntry] {
        &self.slices[index % self.slices.len()]
    }
}

/// Times each annotator receives a copy in `overlaps`
pub fn target_counts(overlaps: &[OverlapEntry]) -> FxHashMap<&str, usize> {
    let mut counts = FxHashMap::default();
    for entry in overlaps {
        *counts.entry(entry.target.as_str()).or_insert(0) += 1;
    }
    counts
}

/// Reject entries naming unknown annotators or copying an annotator onto itself
pub fn check_overlaps(overlaps: &[OverlapEntry], annotators: &[String]) -> Result<(), DistError> {
    for (index, entry) in overlaps.iter().enumerate() {
        for name in [&entry.source, &entry.target] {
            if !annotators.contains(name) {
                return Err(DistError::InvalidOverlap(format!(
                    "entry {} names unknown annotator '{}'",
                    index, name
                )));
            }
        }
        if entry.source == entry.target {
            return Err(DistError::InvalidOverlap(format!(
                "entry {} copies '{}' onto itself",
                index, entry.source
            )));
        }
    }
    Ok(())
}
