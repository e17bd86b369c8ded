use crate::config::DistinctPolicy;
use crate::distribution::{AssignmentOrigin, Distribution};
use crate::DistError;
use rustc_hash::FxHashSet;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Documents named by at least one assignment, counted once
pub fn distinct_documents(distribution: &Distribution, policy: DistinctPolicy) -> usize {
    let mut distinct: FxHashSet<&str> = distribution.iter().map(|a| a.document.as_str()).collect();
    if policy == DistinctPolicy::ExcludeOverlaps {
        for assignment in distribution.iter() {
            if assignment.origin == AssignmentOrigin::Overlap {
                distinct.remove(assignment.document.as_str());
            }
        }
    }
    distinct.len()
}

/// File count per destination directory
pub fn directory_counts(distribution: &Distribution) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for assignment in distribution.iter() {
        *counts
            .entry(assignment.destination.display().to_string())
            .or_insert(0) += 1;
    }
    counts
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Report {
    pub directory_counts: BTreeMap<String, usize>,
    pub assignments: usize,
    pub written: usize,
    pub dry_run: bool,
    pub initial_pickings: usize,
    pub spool_size: usize,
    pub distinct_documents: usize,
    pub remaining_spool: usize,
    pub duplicated: BTreeMap<String, Vec<String>>,
}

impl Report {
    pub fn build(
        distribution: &Distribution,
        policy: DistinctPolicy,
        initial_pickings: usize,
        spool_size: usize,
        remaining_spool: usize,
    ) -> Self {
        Self {
            directory_counts: directory_counts(distribution),
            assignments: distribution.len(),
            written: 0,
            dry_run: false,
            initial_pickings,
            spool_size,
            distinct_documents: distinct_documents(distribution, policy),
            remaining_spool,
            duplicated: distribution.duplicated().clone(),
        }
    }

    pub fn print(&self) {
        println!("{}", "=".repeat(60));
        for (dir, count) in &self.directory_counts {
            println!("{} {}", dir, count);
        }
        println!("{}", "─".repeat(60));
        if self.dry_run {
            println!("Dry run: corpus missing, nothing copied ({} planned)", self.assignments);
        } else {
            println!("Documents written to disk: {}", self.written);
        }
        println!("Initial pickings: {}", self.initial_pickings);
        println!("Spool size: {}", self.spool_size);
        println!("Distinct annotations: {}", self.distinct_documents);
        println!("Remaining spool: {}", self.remaining_spool);
        for (dir, docs) in &self.duplicated {
            println!("Duplicated in {}: {}", dir, docs.join(" "));
        }
        println!("{}", "=".repeat(60));
    }

    pub fn write_json(&self, path: &Path) -> Result<(), DistError> {
        let body = serde_json::to_string_pretty(self)?;
        fs::write(path, body)?;
        Ok(())
    }
}
