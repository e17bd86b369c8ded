use std::fmt;
use std::path::PathBuf;

use crate::allocator::BunchKind;
use crate::distribution::Assignment;

#[derive(Debug)]
pub enum DistError {
    /// Header or row layout of the clusters file is unusable
    MalformedInput(String),
    DelimiterDetection(String),
    /// A draw asked for more documents than the pool still holds
    InsufficientSpool {
        bunch: BunchKind,
        dir: String,
        requested: usize,
        available: usize,
    },
    /// A cluster holds fewer documents than its stratified quota
    InsufficientCluster {
        cluster: String,
        requested: usize,
        available: usize,
    },
    DestinationConflict(PathBuf),
    InvalidConfig(String),
    InvalidOverlap(String),
    /// The writer stopped part way; `written` assignments made it to disk
    WriteAborted {
        written: usize,
        failed: Assignment,
        source: std::io::Error,
    },
    Csv(csv::Error),
    Json(serde_json::Error),
    Io(std::io::Error),
}

impl fmt::Display for DistError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DistError::MalformedInput(e) => write!(f, "Malformed input: {}", e),
            DistError::DelimiterDetection(e) => write!(f, "Delimiter detection failed: {}", e),
            DistError::InsufficientSpool { bunch, dir, requested, available } => write!(
                f,
                "Insufficient spool for {} bunch '{}': requested {}, available {}",
                bunch, dir, requested, available
            ),
            DistError::InsufficientCluster { cluster, requested, available } => write!(
                f,
                "Cluster '{}' too small for its quota: requested {}, available {}",
                cluster, requested, available
            ),
            DistError::DestinationConflict(path) => {
                write!(f, "Destination already exists: {}", path.display())
            }
            DistError::InvalidConfig(e) => write!(f, "Invalid configuration: {}", e),
            DistError::InvalidOverlap(e) => write!(f, "Invalid overlap: {}", e),
            DistError::WriteAborted { written, failed, source } => write!(
                f,
                "Write aborted after {} assignments at {} -> {}: {}",
                written,
                failed.source.display(),
                failed.destination.display(),
                source
            ),
            DistError::Csv(e) => write!(f, "CSV error: {}", e),
            DistError::Json(e) => write!(f, "JSON error: {}", e),
            DistError::Io(e) => write!(f, "IO error: {}", e),
        }
    }
}

impl std::error::Error for DistError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DistError::WriteAborted { source, .. } => Some(source),
            DistError::Csv(e) => Some(e),
            DistError::Json(e) => Some(e),
            DistError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for DistError {
    fn from(err: std::io::Error) -> Self {
        DistError::Io(err)
    }
}

impl From<csv::Error> for DistError {
    fn from(err: csv::Error) -> Self {
        DistError::Csv(err)
    }
}

impl From<serde_json::Error> for DistError {
    fn from(err: serde_json::Error) -> Self {
        DistError::Json(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insufficient_spool_names_bunch_and_dir() {
        let err = DistError::InsufficientSpool {
            bunch: BunchKind::Audit,
            dir: "03".to_string(),
            requested: 50,
            available: 12,
        };
        let msg = err.to_string();
        assert!(msg.contains("audit"), "{}", msg);
        assert!(msg.contains("'03'"), "{}", msg);
        assert!(msg.contains("requested 50"), "{}", msg);
        assert!(msg.contains("available 12"), "{}", msg);
    }

    #[test]
    fn test_io_error_keeps_source() {
        use std::error::Error;
        let err: DistError = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
        assert!(err.source().is_some());
        assert!(err.to_string().starts_with("IO error"));
    }
}
