use crate::allocator::BunchKind;
use crate::Document;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AssignmentOrigin {
    /// Drawn from the spool for this annotator
    Primary,
    /// Copied from another annotator's picks for agreement auditing
    Overlap,
}

/// One file copy: `source` goes into the `destination` directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Assignment {
    pub document: Document,
    pub source: PathBuf,
    pub destination: PathBuf,
    pub annotator: String,
    pub bunch: BunchKind,
    pub dir: String,
    pub origin: AssignmentOrigin,
}

impl Assignment {
    pub fn target_file(&self) -> PathBuf {
        self.destination.join(&self.document)
    }
}

/// Ordered assignments accumulated over every bunch, plus the documents
/// duplicated in each audit directory
#[derive(Debug, Clone, Default)]
pub struct Distribution {
    assignments: Vec<Assignment>,
    duplicated: BTreeMap<String, Vec<Document>>,
}

impl Distribution {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, assignment: Assignment) {
        if assignment.origin == AssignmentOrigin::Overlap {
            self.duplicated
                .entry(assignment.dir.clone())
                .or_default()
                .push(assignment.document.clone());
        }
        self.assignments.push(assignment);
    }

    pub fn len(&self) -> usize {
        self.assignments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Assignment> {
        self.assignments.iter()
    }

    pub fn duplicated(&self) -> &BTreeMap<String, Vec<Document>> {
        &self.duplicated
    }

    /// Assignments landing in `annotator`'s `dir`, primary picks and copies alike
    pub fn bunch_of(&self, annotator: &str, dir: &str) -> Vec<&Document> {
        self.assignments
            .iter()
            .filter(|a| a.annotator == annotator && a.dir == dir)
            .map(|a| &a.document)
            .collect()
    }

    /// Keep only the assignments of one bunch type and run directory
    pub fn retain_bunch(&mut self, bunch: BunchKind, dir: &str) {
        self.assignments.retain(|a| a.bunch == bunch && a.dir == dir);
        self.duplicated.retain(|d, _| d == dir);
    }

    pub fn into_assignments(self) -> Vec<Assignment> {
        self.assignments
    }
}
