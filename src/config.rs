use crate::allocator::BunchKind;
use crate::DistError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Directory that receives the empty placeholder corpus
pub const EMPTY_FILES_DIR: &str = "empty_files_corpus";

/// Root directory holding one subdirectory per annotator
pub const ANNOTATORS_DIR: &str = "annotators";

pub const DEFAULT_SEED: u64 = 777;
pub const DEFAULT_OVERLAPS_PER_AUDIT: usize = 8;
pub const DEFAULT_DESIGNATED_SUBSTRING: &str = "sonespases";

// Son Espases is the only Balearic hospital in the corpus, so its share is
// pinned to the Balearic fraction of the combined regional population.
const CATALONIA_POPULATION: u64 = 7_543_825;
const BALEARIC_POPULATION: u64 = 1_150_839;

/// Pinned share for the designated cluster, rounded to two decimals (0.13)
pub fn default_designated_percentage() -> f64 {
    let share = BALEARIC_POPULATION as f64 / (CATALONIA_POPULATION + BALEARIC_POPULATION) as f64;
    (share * 100.0).round() / 100.0
}

/// How to settle a spool whose rounded per-cluster quotas don't add up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ReconcilePolicy {
    /// Keep the rounded spool and only log the discrepancy
    Strict,
    /// Top up from the smallest clusters, or trim the surplus off the tail
    #[default]
    FillFromSmallest,
}

/// Whether overlap copies count towards the distinct-documents figure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum DistinctPolicy {
    #[default]
    IncludeOverlaps,
    ExcludeOverlaps,
}

/// One row of the bunch table: how many documents per bunch and which run
/// directories receive one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BunchPlan {
    #[serde(rename = "type")]
    pub kind: BunchKind,
    pub amount: usize,
    #[serde(default)]
    pub dirs: Vec<String>,
}

impl BunchPlan {
    pub fn new(kind: BunchKind, amount: usize, dirs: &[&str]) -> Self {
        Self {
            kind,
            amount,
            dirs: dirs.iter().map(|d| d.to_string()).collect(),
        }
    }
}

/// Restricts a run to a single bunch type and run directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndividualBunch {
    pub kind: BunchKind,
    pub dir: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DistributionConfig {
    pub clusters_file: PathBuf,
    pub corpus_dir: PathBuf,
    #[serde(default = "default_output_root")]
    pub output_root: PathBuf,
    #[serde(default = "default_placeholder_dir")]
    pub placeholder_dir: PathBuf,
    pub annotators: Vec<String>,
    #[serde(default = "default_bunches")]
    pub bunches: Vec<BunchPlan>,
    #[serde(default = "default_overlaps")]
    pub overlaps_per_audit: usize,
    #[serde(default = "default_seed")]
    pub seed: u64,
    #[serde(default = "default_designated_substring")]
    pub designated_substring: String,
    #[serde(default = "default_designated_percentage")]
    pub designated_percentage: f64,
    #[serde(default)]
    pub reconcile: ReconcilePolicy,
    #[serde(default)]
    pub distinct: DistinctPolicy,
    #[serde(default)]
    pub backup: bool,
    #[serde(default)]
    pub create_empty_corpus: bool,
    #[serde(default)]
    pub no_overwrite: bool,
    #[serde(default)]
    pub individual: Option<IndividualBunch>,
}

fn default_output_root() -> PathBuf {
    PathBuf::from(ANNOTATORS_DIR)
}

fn default_placeholder_dir() -> PathBuf {
    PathBuf::from(EMPTY_FILES_DIR)
}

fn default_overlaps() -> usize {
    DEFAULT_OVERLAPS_PER_AUDIT
}

fn default_seed() -> u64 {
    DEFAULT_SEED
}

fn default_designated_substring() -> String {
    DEFAULT_DESIGNATED_SUBSTRING.to_string()
}

/// Reference bunch table: one training run, six audit runs
pub fn default_bunches() -> Vec<BunchPlan> {
    vec![
        BunchPlan::new(BunchKind::Training, 25, &["08"]),
        BunchPlan::new(BunchKind::Regular, 50, &[]),
        BunchPlan::new(BunchKind::Audit, 50, &["02", "03", "04", "05", "06", "07"]),
    ]
}

pub fn default_annotators() -> Vec<String> {
    ["A", "B", "C", "D"].iter().map(|a| a.to_string()).collect()
}

impl DistributionConfig {
    pub fn new(clusters_file: impl Into<PathBuf>, corpus_dir: impl Into<PathBuf>) -> Self {
        Self {
            clusters_file: clusters_file.into(),
            corpus_dir: corpus_dir.into(),
            output_root: default_output_root(),
            placeholder_dir: default_placeholder_dir(),
            annotators: default_annotators(),
            bunches: default_bunches(),
            overlaps_per_audit: DEFAULT_OVERLAPS_PER_AUDIT,
            seed: DEFAULT_SEED,
            designated_substring: default_designated_substring(),
            designated_percentage: default_designated_percentage(),
            reconcile: ReconcilePolicy::default(),
            distinct: DistinctPolicy::default(),
            backup: false,
            create_empty_corpus: false,
            no_overwrite: false,
            individual: None,
        }
    }

    /// Replace the bunch table with one read from a JSON array of
    /// `{"type": "...", "amount": N, "dirs": [...]}` rows
    pub fn load_bunches(&mut self, path: &Path) -> Result<(), DistError> {
        let raw = fs::read_to_string(path)?;
        self.bunches = serde_json::from_str(&raw)?;
        Ok(())
    }

    /// Total documents the spool must hold to serve every planned bunch
    pub fn total_pickings(&self) -> usize {
        let annotators = self.annotators.len();
        self.bunches
            .iter()
            .map(|bunch| {
                let dirs = bunch.dirs.len();
                match bunch.kind {
                    BunchKind::Training => bunch.amount * dirs,
                    BunchKind::Regular => bunch.amount * annotators * dirs,
                    BunchKind::Audit => {
                        (bunch.amount * annotators).saturating_sub(self.overlaps_per_audit) * dirs
                    }
                }
            })
            .sum()
    }

    pub fn validate(&self) -> Result<(), DistError> {
        if self.annotators.len() < 2 {
            return Err(DistError::InvalidConfig(format!(
                "at least 2 annotators are required, got {}",
                self.annotators.len()
            )));
        }
        let mut seen = HashSet::new();
        for name in &self.annotators {
            if name.trim().is_empty() {
                return Err(DistError::InvalidConfig("annotator names must not be empty".into()));
            }
            if !seen.insert(name.as_str()) {
                return Err(DistError::InvalidConfig(format!("duplicate annotator '{}'", name)));
            }
        }

        if !(0.0..1.0).contains(&self.designated_percentage) {
            return Err(DistError::InvalidConfig(format!(
                "designated percentage must be in [0, 1), got {}",
                self.designated_percentage
            )));
        }

        let mut dirs = HashSet::new();
        for bunch in &self.bunches {
            if bunch.amount == 0 && !bunch.dirs.is_empty() {
                return Err(DistError::InvalidConfig(format!(
                    "{} bunch amount must be positive",
                    bunch.kind
                )));
            }
            for dir in &bunch.dirs {
                if !dirs.insert(dir.as_str()) {
                    return Err(DistError::InvalidConfig(format!(
                        "run directory '{}' is planned twice",
                        dir
                    )));
                }
            }
            if bunch.kind == BunchKind::Audit
                && !bunch.dirs.is_empty()
                && self.overlaps_per_audit > bunch.amount
            {
                return Err(DistError::InvalidConfig(format!(
                    "{} overlaps per audit exceed the audit amount {}",
                    self.overlaps_per_audit, bunch.amount
                )));
            }
        }

        if let Some(only) = &self.individual {
            let planned = self
                .bunches
                .iter()
                .any(|b| b.kind == only.kind && b.dirs.contains(&only.dir));
            if !planned {
                return Err(DistError::InvalidConfig(format!(
                    "{} bunch '{}' is not in the bunch table",
                    only.kind, only.dir
                )));
            }
        }

        Ok(())
    }
}
