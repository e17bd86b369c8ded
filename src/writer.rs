use crate::distribution::Distribution;
use crate::{DistError, Document};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

fn ensure_directory_exists(path: &Path) -> Result<(), DistError> {
    if !path.exists() {
        fs::create_dir_all(path)?;
    }
    Ok(())
}

/// Fail before touching the disk if any target file already exists
pub fn check_conflicts(distribution: &Distribution) -> Result<(), DistError> {
    for assignment in distribution.iter() {
        let target = assignment.target_file();
        if target.exists() {
            return Err(DistError::DestinationConflict(target));
        }
    }
    Ok(())
}

/// Copy every assignment into place, creating destination directories on
/// demand. Stops at the first failing copy.
pub fn write_to_disk(distribution: Distribution, no_overwrite: bool) -> Result<usize, DistError> {
    if no_overwrite {
        check_conflicts(&distribution)?;
    }

    let total = distribution.len();
    let mut written = 0;
    for assignment in distribution.into_assignments() {
        let copied = fs::create_dir_all(&assignment.destination)
            .and_then(|_| fs::copy(&assignment.source, assignment.target_file()));

        if let Err(source) = copied {
            warn!(
                "[writer] Stopped after {}/{} copies at {}",
                written,
                total,
                assignment.source.display()
            );
            return Err(DistError::WriteAborted {
                written,
                failed: assignment,
                source,
            });
        }
        written += 1;
    }

    info!("[writer] Copied {} documents", written);
    Ok(written)
}

/// Create an empty file for each document name under `dir`
pub fn create_placeholder_corpus(dir: &Path, documents: &[Document]) -> Result<usize, DistError> {
    ensure_directory_exists(dir)?;
    for doc in documents {
        fs::File::create(dir.join(doc))?;
    }
    info!("[writer] Created {} placeholder files in {}", documents.len(), dir.display());
    Ok(documents.len())
}

/// `<corpus>_backup` next to the corpus directory
pub fn backup_dir_for(corpus_dir: &Path) -> PathBuf {
    let mut name = corpus_dir
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "corpus".into());
    name.push("_backup");
    corpus_dir.with_file_name(name)
}

/// Copy the regular files of `corpus_dir` into `backup_dir`
pub fn backup_corpus(corpus_dir: &Path, backup_dir: &Path) -> Result<usize, DistError> {
    ensure_directory_exists(backup_dir)?;
    let mut copied = 0;
    for entry in fs::read_dir(corpus_dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        fs::copy(entry.path(), backup_dir.join(entry.file_name()))?;
        copied += 1;
    }
    debug!("[writer] Backed up {} files to {}", copied, backup_dir.display());
    Ok(copied)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocator::BunchKind;
    use crate::distribution::{Assignment, AssignmentOrigin};

    fn assignment(corpus: &Path, out: &Path, doc: &str, annotator: &str) -> Assignment {
        Assignment {
            document: doc.to_string(),
            source: corpus.join(doc),
            destination: out.join(annotator).join("02"),
            annotator: annotator.to_string(),
            bunch: BunchKind::Audit,
            dir: "02".to_string(),
            origin: AssignmentOrigin::Primary,
        }
    }

    #[test]
    fn test_write_creates_directories_and_copies() {
        let tmp = tempfile::tempdir().unwrap();
        let corpus = tmp.path().join("corpus");
        let out = tmp.path().join("annotators");
        create_placeholder_corpus(&corpus, &["1.txt".to_string(), "2.txt".to_string()]).unwrap();
        fs::write(corpus.join("1.txt"), "hello").unwrap();

        let mut dist = Distribution::new();
        dist.push(assignment(&corpus, &out, "1.txt", "A"));
        dist.push(assignment(&corpus, &out, "1.txt", "B"));
        dist.push(assignment(&corpus, &out, "2.txt", "B"));

        assert_eq!(write_to_disk(dist, false).unwrap(), 3);
        assert_eq!(fs::read_to_string(out.join("A/02/1.txt")).unwrap(), "hello");
        assert!(out.join("B/02/2.txt").exists());
    }

    #[test]
    fn test_missing_source_reports_progress() {
        let tmp = tempfile::tempdir().unwrap();
        let corpus = tmp.path().join("corpus");
        let out = tmp.path().join("annotators");
        create_placeholder_corpus(&corpus, &["1.txt".to_string()]).unwrap();

        let mut dist = Distribution::new();
        dist.push(assignment(&corpus, &out, "1.txt", "A"));
        dist.push(assignment(&corpus, &out, "missing.txt", "A"));
        dist.push(assignment(&corpus, &out, "1.txt", "B"));

        match write_to_disk(dist, false) {
            Err(DistError::WriteAborted { written, failed, .. }) => {
                assert_eq!(written, 1);
                assert_eq!(failed.document, "missing.txt");
            }
            other => panic!("expected WriteAborted, got {:?}", other),
        }
        assert!(!out.join("B/02/1.txt").exists());
    }

    #[test]
    fn test_no_overwrite_refuses_existing_target() {
        let tmp = tempfile::tempdir().unwrap();
        let corpus = tmp.path().join("corpus");
        let out = tmp.path().join("annotators");
        create_placeholder_corpus(&corpus, &["1.txt".to_string()]).unwrap();
        create_placeholder_corpus(&out.join("A/02"), &["1.txt".to_string()]).unwrap();

        let mut dist = Distribution::new();
        dist.push(assignment(&corpus, &out, "1.txt", "B"));
        dist.push(assignment(&corpus, &out, "1.txt", "A"));

        assert!(matches!(write_to_disk(dist, true), Err(DistError::DestinationConflict(_))));
        assert!(!out.join("B").exists(), "nothing may be written on conflict");
    }

    #[test]
    fn test_backup_corpus() {
        let tmp = tempfile::tempdir().unwrap();
        let corpus = tmp.path().join("corpus");
        create_placeholder_corpus(&corpus, &["a.txt".to_string(), "b.txt".to_string()]).unwrap();
        fs::create_dir_all(corpus.join("nested")).unwrap();

        let backup = backup_dir_for(&corpus);
        assert_eq!(backup, tmp.path().join("corpus_backup"));
        assert_eq!(backup_corpus(&corpus, &backup).unwrap(), 2);
        assert!(backup.join("a.txt").exists());
        assert!(!backup.join("nested").exists());
    }
}
