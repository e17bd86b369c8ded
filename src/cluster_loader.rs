use crate::{DistError, Document};
use rustc_hash::FxHashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Component, Path};
use tracing::{debug, info};

const FILE_COLUMN: &str = "file";
const CLUSTER_COLUMN: &str = "cluster";

/// Delimiters the sniffer will consider, in order of preference
const CANDIDATE_DELIMITERS: [u8; 3] = [b'\t', b',', b' '];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cluster {
    pub id: String,
    pub documents: Vec<Document>,
}

/// Documents grouped by cluster id, clusters kept in first-appearance order
#[derive(Debug, Clone, Default)]
pub struct Clusters {
    clusters: Vec<Cluster>,
    index: FxHashMap<String, usize>,
}

impl Clusters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, cluster_id: String, document: Document) {
        let slot = match self.index.get(&cluster_id) {
            Some(&slot) => slot,
            None => {
                self.clusters.push(Cluster {
                    id: cluster_id.clone(),
                    documents: Vec::new(),
                });
                self.index.insert(cluster_id, self.clusters.len() - 1);
                self.clusters.len() - 1
            }
        };
        self.clusters[slot].documents.push(document);
    }

    pub fn get(&self, cluster_id: &str) -> Option<&Cluster> {
        self.index.get(cluster_id).map(|&slot| &self.clusters[slot])
    }

    pub fn iter(&self) -> impl Iterator<Item = &Cluster> {
        self.clusters.iter()
    }

    pub(crate) fn at_mut(&mut self, slot: usize) -> &mut Cluster {
        &mut self.clusters[slot]
    }

    pub fn len(&self) -> usize {
        self.clusters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty()
    }

    pub fn total_documents(&self) -> usize {
        self.clusters.iter().map(|c| c.documents.len()).sum()
    }

    /// Slot of the only cluster whose id, or one of whose documents, contains
    /// `needle`. Ambiguous or absent matches give `None`.
    pub fn find_designated(&self, needle: &str) -> Option<usize> {
        if needle.is_empty() {
            return None;
        }
        let mut found = self.clusters.iter().enumerate().filter(|(_, cluster)| {
            cluster.id.contains(needle) || cluster.documents.iter().any(|d| d.contains(needle))
        });
        match (found.next(), found.next()) {
            (Some((slot, _)), None) => Some(slot),
            _ => None,
        }
    }
}

/// Pick the delimiter that turns the header line into `file` and `cluster`
/// columns. Prefers the candidate producing the most fields.
pub fn sniff_delimiter(header: &str) -> Result<u8, DistError> {
    let header = header.trim_end_matches(['\r', '\n']);
    if header.trim().is_empty() {
        return Err(DistError::MalformedInput("missing header row".into()));
    }

    let present: Vec<u8> = CANDIDATE_DELIMITERS
        .iter()
        .copied()
        .filter(|&d| header.as_bytes().contains(&d))
        .collect();
    if present.is_empty() {
        return Err(DistError::DelimiterDetection(format!(
            "no tab, comma or space in header '{}'",
            header
        )));
    }

    let mut best: Option<(u8, usize)> = None;
    for delimiter in present {
        let fields: Vec<&str> = header
            .split(delimiter as char)
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .collect();
        if !(fields.contains(&FILE_COLUMN) && fields.contains(&CLUSTER_COLUMN)) {
            continue;
        }
        if best.is_none_or(|(_, count)| fields.len() > count) {
            best = Some((delimiter, fields.len()));
        }
    }

    best.map(|(d, _)| d).ok_or_else(|| {
        DistError::MalformedInput(format!(
            "header '{}' lacks '{}' and '{}' columns",
            header, FILE_COLUMN, CLUSTER_COLUMN
        ))
    })
}

pub fn detect_delimiter(path: &Path) -> Result<u8, DistError> {
    let mut reader = BufReader::new(File::open(path)?);
    let mut first_line = String::new();
    reader.read_line(&mut first_line)?;
    sniff_delimiter(&first_line)
}

fn column_positions(headers: &csv::StringRecord) -> Result<(usize, usize), DistError> {
    let position = |name: &str| {
        headers.iter().position(|h| h == name).ok_or_else(|| {
            DistError::MalformedInput(format!("no '{}' column in header", name))
        })
    };
    Ok((position(FILE_COLUMN)?, position(CLUSTER_COLUMN)?))
}

fn reader_for(path: &Path, delimiter: u8) -> Result<csv::Reader<File>, DistError> {
    Ok(csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)?)
}

/// A document must name a single entry inside the corpus directory
fn is_plain_file_name(file: &str) -> bool {
    let mut components = Path::new(file).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

/// Walk every data row as (file, cluster)
fn for_each_row(
    path: &Path,
    delimiter: u8,
    mut visit: impl FnMut(String, String),
) -> Result<usize, DistError> {
    let mut reader = reader_for(path, delimiter)?;
    let (file_at, cluster_at) = column_positions(reader.headers()?)?;

    let mut rows = 0;
    for record in reader.records() {
        let record = record?;
        let line = record.position().map(|p| p.line()).unwrap_or_default();
        let file = record.get(file_at).filter(|f| !f.is_empty());
        let cluster = record.get(cluster_at);
        match (file, cluster) {
            (Some(file), Some(_)) if !is_plain_file_name(file) => {
                return Err(DistError::MalformedInput(format!(
                    "line {}: '{}' is not a plain file name",
                    line, file
                )));
            }
            (Some(file), Some(cluster)) => visit(file.to_string(), cluster.to_string()),
            _ => {
                return Err(DistError::MalformedInput(format!(
                    "line {}: expected '{}' and '{}' fields",
                    line, FILE_COLUMN, CLUSTER_COLUMN
                )));
            }
        }
        rows += 1;
    }
    Ok(rows)
}

/// Load the clusters file into documents grouped by cluster. Duplicate rows
/// are kept as separate entries.
pub fn load_clusters(path: &Path) -> Result<Clusters, DistError> {
    let delimiter = detect_delimiter(path)?;
    debug!("[loader] Delimiter for {}: {:?}", path.display(), delimiter as char);

    let mut clusters = Clusters::new();
    let rows = for_each_row(path, delimiter, |file, cluster| clusters.insert(cluster, file))?;

    info!(
        "[loader] Loaded {} rows into {} clusters from {}",
        rows,
        clusters.len(),
        path.display()
    );
    Ok(clusters)
}

/// Every `file` value in row order, used to fake a corpus for dry runs
pub fn list_documents(path: &Path) -> Result<Vec<Document>, DistError> {
    let delimiter = detect_delimiter(path)?;
    let mut documents = Vec::new();
    for_each_row(path, delimiter, |file, _| documents.push(file))?;
    Ok(documents)
}
