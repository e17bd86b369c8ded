use crate::allocator::{Allocator, BunchKind};
use crate::cluster_loader::{list_documents, load_clusters, Clusters};
use crate::config::DistributionConfig;
use crate::distribution::Distribution;
use crate::overlap::OverlapMap;
use crate::report::Report;
use crate::sampler::StratifiedSampler;
use crate::spool::{SeededRng, Spool};
use crate::writer::{backup_corpus, backup_dir_for, create_placeholder_corpus, write_to_disk};
use crate::DistError;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Where the documents to copy come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CorpusMode {
    Existing(PathBuf),
    /// Placeholders are generated first and then copied for real
    Generated(PathBuf),
    /// Corpus is absent: placeholders are generated, nothing is copied
    Missing(PathBuf),
}

impl CorpusMode {
    pub fn resolve(config: &DistributionConfig) -> Self {
        if config.create_empty_corpus {
            CorpusMode::Generated(config.placeholder_dir.clone())
        } else if config.corpus_dir.exists() {
            CorpusMode::Existing(config.corpus_dir.clone())
        } else {
            CorpusMode::Missing(config.corpus_dir.clone())
        }
    }

    pub fn corpus_dir(&self) -> &Path {
        match self {
            CorpusMode::Existing(dir) | CorpusMode::Generated(dir) | CorpusMode::Missing(dir) => dir,
        }
    }

    pub fn is_dry_run(&self) -> bool {
        matches!(self, CorpusMode::Missing(_))
    }
}

/// Everything decided before the first byte is written
#[derive(Debug)]
pub struct Plan {
    pub distribution: Distribution,
    pub spool: Spool,
    pub total_pickings: usize,
    pub spool_size: usize,
}

/// Sample the spool and run every planned bunch against it
pub fn allocate(config: &DistributionConfig, clusters: &mut Clusters, corpus_dir: &Path) -> Result<Plan, DistError> {
    let rng = SeededRng::new(config.seed);
    let total_pickings = config.total_pickings();

    let sampler = StratifiedSampler::new(
        rng,
        config.designated_substring.as_str(),
        config.designated_percentage,
        config.reconcile,
    );
    let mut spool = sampler.sample(clusters, total_pickings)?.spool;
    let spool_size = spool.len();

    let overlaps = OverlapMap::build(&config.annotators, config.overlaps_per_audit)?;
    let allocator = Allocator::new(corpus_dir, &config.output_root, &config.annotators, rng);
    let mut distribution = Distribution::new();

    for bunch in &config.bunches {
        for (index, dir) in bunch.dirs.iter().enumerate() {
            match bunch.kind {
                BunchKind::Training => allocator.training_bunch(&mut spool, dir, bunch.amount, &mut distribution)?,
                BunchKind::Regular => allocator.regular_bunch(&mut spool, dir, bunch.amount, &mut distribution)?,
                BunchKind::Audit => allocator.audit_bunch(
                    &mut spool,
                    dir,
                    bunch.amount,
                    overlaps.for_directory(index),
                    &mut distribution,
                )?,
            }
        }
    }

    if let Some(only) = &config.individual {
        distribution.retain_bunch(only.kind, &only.dir);
        info!("[pipeline] Keeping only {} bunch '{}'", only.kind, only.dir);
    }

    info!(
        "[pipeline] {} assignments planned, {} documents left in spool",
        distribution.len(),
        spool.len()
    );
    Ok(Plan {
        distribution,
        spool,
        total_pickings,
        spool_size,
    })
}

/// Load, sample, allocate and copy. Nothing touches the disk until the whole
/// allocation has succeeded.
pub fn run(config: &DistributionConfig) -> Result<Report, DistError> {
    config.validate()?;
    let mut clusters = load_clusters(&config.clusters_file)?;
    let mode = CorpusMode::resolve(config);

    let plan = allocate(config, &mut clusters, mode.corpus_dir())?;
    let mut report = Report::build(
        &plan.distribution,
        config.distinct,
        plan.total_pickings,
        plan.spool_size,
        plan.spool.len(),
    );
    report.dry_run = mode.is_dry_run();

    match &mode {
        CorpusMode::Existing(_) => {}
        CorpusMode::Generated(dir) => {
            create_placeholder_corpus(dir, &list_documents(&config.clusters_file)?)?;
        }
        CorpusMode::Missing(dir) => {
            warn!("[pipeline] Corpus {} not found, generating placeholders only", dir.display());
            create_placeholder_corpus(&config.placeholder_dir, &list_documents(&config.clusters_file)?)?;
        }
    }

    if config.backup {
        let corpus = mode.corpus_dir();
        if corpus.exists() {
            backup_corpus(corpus, &backup_dir_for(corpus))?;
        } else {
            warn!("[pipeline] Nothing to back up at {}", corpus.display());
        }
    }

    if !report.dry_run {
        report.written = write_to_disk(plan.distribution, config.no_overwrite)?;
    }
    Ok(report)
}
