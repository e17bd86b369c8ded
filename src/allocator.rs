use crate::distribution::{Assignment, AssignmentOrigin, Distribution};
use crate::overlap::{check_overlaps, target_counts, OverlapEntry};
use crate::spool::{SeededRng, Spool};
use crate::{DistError, Document};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum BunchKind {
    /// Same documents for every annotator
    Training,
    /// Disjoint documents per annotator
    Regular,
    /// Disjoint documents plus a few deliberate duplicates
    Audit,
}

impl fmt::Display for BunchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BunchKind::Training => write!(f, "training"),
            BunchKind::Regular => write!(f, "regular"),
            BunchKind::Audit => write!(f, "audit"),
        }
    }
}

/// Turns spool draws into assignments for one run directory at a time
pub struct Allocator<'a> {
    corpus_dir: &'a Path,
    output_root: &'a Path,
    annotators: &'a [String],
    rng: SeededRng,
}

impl<'a> Allocator<'a> {
    pub fn new(corpus_dir: &'a Path, output_root: &'a Path, annotators: &'a [String], rng: SeededRng) -> Self {
        Self {
            corpus_dir,
            output_root,
            annotators,
            rng,
        }
    }

    fn destination(&self, annotator: &str, dir: &str) -> PathBuf {
        self.output_root.join(annotator).join(dir)
    }

    fn assign(&self, doc: &Document, annotator: &str, bunch: BunchKind, dir: &str, origin: AssignmentOrigin) -> Assignment {
        Assignment {
            document: doc.clone(),
            source: self.corpus_dir.join(doc),
            destination: self.destination(annotator, dir),
            annotator: annotator.to_string(),
            bunch,
            dir: dir.to_string(),
            origin,
        }
    }

    /// One shared draw, copied to every annotator
    pub fn training_bunch(&self, spool: &mut Spool, dir: &str, amount: usize, out: &mut Distribution) -> Result<(), DistError> {
        let picked = spool.draw(&self.rng, amount, BunchKind::Training, dir)?;
        for doc in &picked {
            for annotator in self.annotators {
                out.push(self.assign(doc, annotator, BunchKind::Training, dir, AssignmentOrigin::Primary));
            }
        }
        debug!("[allocator] training '{}': {} shared documents", dir, picked.len());
        Ok(())
    }

    /// A fresh draw per annotator; the shrinking spool keeps them disjoint
    pub fn regular_bunch(&self, spool: &mut Spool, dir: &str, amount: usize, out: &mut Distribution) -> Result<(), DistError> {
        for annotator in self.annotators {
            let picked = spool.draw(&self.rng, amount, BunchKind::Regular, dir)?;
            for doc in &picked {
                out.push(self.assign(doc, annotator, BunchKind::Regular, dir, AssignmentOrigin::Primary));
            }
        }
        debug!("[allocator] regular '{}': {} documents each", dir, amount);
        Ok(())
    }

    /// Each annotator draws `amount` minus the copies it will receive, then
    /// hands the pick at each of its overlap entries' index to that entry's
    /// target. Every bunch ends with exactly `amount` documents.
    pub fn audit_bunch(
        &self,
        spool: &mut Spool,
        dir: &str,
        amount: usize,
        overlaps: &[OverlapEntry],
        out: &mut Distribution,
    ) -> Result<(), DistError> {
        check_overlaps(overlaps, self.annotators)?;
        let discards = target_counts(overlaps);

        for annotator in self.annotators {
            let incoming = discards.get(annotator.as_str()).copied().unwrap_or(0);
            let own = amount.checked_sub(incoming).ok_or_else(|| {
                DistError::InvalidOverlap(format!(
                    "'{}' receives {} copies in '{}', more than the audit amount {}",
                    annotator, incoming, dir, amount
                ))
            })?;

            let picked = spool.draw(&self.rng, own, BunchKind::Audit, dir)?;
            for doc in &picked {
                out.push(self.assign(doc, annotator, BunchKind::Audit, dir, AssignmentOrigin::Primary));
            }

            for (index, entry) in overlaps.iter().enumerate() {
                if entry.source != *annotator {
                    continue;
                }
                let doc = picked.get(index).ok_or_else(|| {
                    DistError::InvalidOverlap(format!(
                        "entry {} in '{}' points past the {} documents drawn for '{}'",
                        index,
                        dir,
                        picked.len(),
                        annotator
                    ))
                })?;
                out.push(self.assign(doc, &entry.target, BunchKind::Audit, dir, AssignmentOrigin::Overlap));
            }
            debug!("[allocator] audit '{}': {} drew {} (+{} incoming)", dir, annotator, own, incoming);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn abcd() -> Vec<String> {
        ["A", "B", "C", "D"].iter().map(|s| s.to_string()).collect()
    }

    fn spool_of(n: usize) -> Spool {
        let mut spool = Spool::new();
        for i in 0..n {
            spool.push(format!("{}.txt", i));
        }
        spool
    }

    fn primary_count(dist: &Distribution, annotator: &str, dir: &str) -> usize {
        dist.iter()
            .filter(|a| a.annotator == annotator && a.dir == dir && a.origin == AssignmentOrigin::Primary)
            .count()
    }

    #[test]
    fn test_training_gives_everyone_the_same_set() {
        let annotators = abcd();
        let allocator = Allocator::new(Path::new("corpus"), Path::new("annotators"), &annotators, SeededRng::new(777));
        let mut spool = spool_of(40);
        let mut dist = Distribution::new();
        allocator.training_bunch(&mut spool, "08", 25, &mut dist).unwrap();

        assert_eq!(spool.len(), 15);
        assert_eq!(dist.len(), 100);
        let reference: HashSet<_> = dist.bunch_of("A", "08").into_iter().collect();
        assert_eq!(reference.len(), 25);
        for annotator in &annotators {
            let set: HashSet<_> = dist.bunch_of(annotator, "08").into_iter().collect();
            assert_eq!(set, reference);
        }
    }

    #[test]
    fn test_regular_sets_are_disjoint() {
        let annotators = abcd();
        let allocator = Allocator::new(Path::new("corpus"), Path::new("annotators"), &annotators, SeededRng::new(777));
        let mut spool = spool_of(60);
        let mut dist = Distribution::new();
        allocator.regular_bunch(&mut spool, "01", 10, &mut dist).unwrap();

        assert_eq!(spool.len(), 20);
        let sets: Vec<HashSet<_>> = annotators
            .iter()
            .map(|a| dist.bunch_of(a, "01").into_iter().collect())
            .collect();
        for (i, a) in sets.iter().enumerate() {
            assert_eq!(a.len(), 10);
            for b in &sets[i + 1..] {
                assert!(a.is_disjoint(b));
            }
        }
    }

    #[test]
    fn test_audit_discards_make_room_for_copies() {
        let annotators = abcd();
        let allocator = Allocator::new(Path::new("corpus"), Path::new("annotators"), &annotators, SeededRng::new(777));
        let mut spool = spool_of(300);
        let mut dist = Distribution::new();
        let overlaps = vec![
            OverlapEntry::new("A", "B"),
            OverlapEntry::new("A", "B"),
            OverlapEntry::new("C", "D"),
        ];
        allocator.audit_bunch(&mut spool, "02", 50, &overlaps, &mut dist).unwrap();

        assert_eq!(primary_count(&dist, "A", "02"), 50);
        assert_eq!(primary_count(&dist, "B", "02"), 48);
        assert_eq!(primary_count(&dist, "C", "02"), 50);
        assert_eq!(primary_count(&dist, "D", "02"), 49);
        for annotator in &annotators {
            assert_eq!(dist.bunch_of(annotator, "02").len(), 50, "{}", annotator);
        }
        assert_eq!(spool.len(), 300 - 197);
        assert_eq!(dist.duplicated()["02"].len(), 3);
    }

    #[test]
    fn test_audit_copies_come_from_the_source_picks() {
        let annotators = abcd();
        let allocator = Allocator::new(Path::new("corpus"), Path::new("annotators"), &annotators, SeededRng::new(5));
        let mut spool = spool_of(100);
        let mut dist = Distribution::new();
        let overlaps = vec![OverlapEntry::new("B", "D"), OverlapEntry::new("C", "A")];
        allocator.audit_bunch(&mut spool, "05", 10, &overlaps, &mut dist).unwrap();

        let b: Vec<_> = dist
            .iter()
            .filter(|a| a.annotator == "B" && a.origin == AssignmentOrigin::Primary)
            .map(|a| a.document.clone())
            .collect();
        let copied: Vec<_> = dist
            .iter()
            .filter(|a| a.annotator == "D" && a.origin == AssignmentOrigin::Overlap)
            .map(|a| a.document.clone())
            .collect();
        // entry 0 copies B's first pick
        assert_eq!(copied, vec![b[0].clone()]);

        let c_pick = dist
            .iter()
            .filter(|a| a.annotator == "C" && a.origin == AssignmentOrigin::Primary)
            .nth(1)
            .map(|a| a.document.clone())
            .unwrap();
        assert!(dist.bunch_of("A", "05").contains(&&c_pick));
    }

    #[test]
    fn test_audit_with_generated_overlap_map() {
        let annotators = abcd();
        let allocator = Allocator::new(Path::new("corpus"), Path::new("annotators"), &annotators, SeededRng::new(777));
        let map = crate::overlap::OverlapMap::build(&annotators, 8).unwrap();
        let mut spool = spool_of(192 * 3);
        let mut dist = Distribution::new();
        for (i, dir) in ["02", "03", "04"].iter().enumerate() {
            allocator
                .audit_bunch(&mut spool, dir, 50, map.for_directory(i), &mut dist)
                .unwrap();
            for annotator in &annotators {
                assert_eq!(dist.bunch_of(annotator, dir).len(), 50);
            }
        }
        assert!(spool.is_empty());
    }

    #[test]
    fn test_audit_exhausted_spool_is_fatal() {
        let annotators = abcd();
        let allocator = Allocator::new(Path::new("corpus"), Path::new("annotators"), &annotators, SeededRng::new(777));
        let mut spool = spool_of(120);
        let mut dist = Distribution::new();
        let err = allocator
            .audit_bunch(&mut spool, "06", 50, &[], &mut dist)
            .unwrap_err();
        assert!(matches!(
            err,
            DistError::InsufficientSpool { bunch: BunchKind::Audit, ref dir, requested: 50, available: 20 } if dir == "06"
        ));
    }

    #[test]
    fn test_audit_rejects_unknown_annotator() {
        let annotators = abcd();
        let allocator = Allocator::new(Path::new("corpus"), Path::new("annotators"), &annotators, SeededRng::new(777));
        let mut spool = spool_of(100);
        let mut dist = Distribution::new();
        let err = allocator
            .audit_bunch(&mut spool, "02", 10, &[OverlapEntry::new("A", "E")], &mut dist)
            .unwrap_err();
        assert!(matches!(err, DistError::InvalidOverlap(_)));
        assert_eq!(spool.len(), 100);
    }

    #[test]
    fn test_assignment_paths() {
        let annotators = abcd();
        let allocator = Allocator::new(Path::new("docs"), Path::new("out"), &annotators, SeededRng::new(777));
        let mut spool = spool_of(4);
        let mut dist = Distribution::new();
        allocator.training_bunch(&mut spool, "08", 1, &mut dist).unwrap();

        let first = dist.iter().next().unwrap();
        assert_eq!(first.source, Path::new("docs").join(&first.document));
        assert_eq!(first.destination, PathBuf::from("out/A/08"));
    }
}
