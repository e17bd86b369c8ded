use clap::Parser;
use distributor::allocator::BunchKind;
use distributor::config::{
    default_designated_percentage, DistinctPolicy, DistributionConfig, IndividualBunch, ReconcilePolicy,
    ANNOTATORS_DIR, DEFAULT_DESIGNATED_SUBSTRING, DEFAULT_OVERLAPS_PER_AUDIT, DEFAULT_SEED, EMPTY_FILES_DIR,
};
use distributor::{pipeline, DistError};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "distributor")]
#[command(about = "Distribute a clustered corpus among annotators in training, regular and audit bunches", long_about = None)]
struct Cli {
    /// Delimited file with `file` and `cluster` columns (tab, comma or space)
    #[arg(long)]
    clusters_file: PathBuf,

    /// Directory holding only the plain text documents to annotate
    #[arg(long, default_value = EMPTY_FILES_DIR)]
    corpus_dir: PathBuf,

    /// Names of the annotators, in overlap order
    #[arg(long, num_args = 4, value_names = ["A", "B", "C", "D"], default_values = ["A", "B", "C", "D"])]
    annotators: Vec<String>,

    /// JSON bunch table: [{"type": "audit", "amount": 50, "dirs": ["02"]}, ...]
    #[arg(long)]
    plan: Option<PathBuf>,

    /// Documents per audit bunch shared with another annotator
    #[arg(long, default_value_t = DEFAULT_OVERLAPS_PER_AUDIT)]
    overlaps: usize,

    #[arg(long, default_value_t = DEFAULT_SEED)]
    seed: u64,

    /// Substring identifying the cluster with a pinned share
    #[arg(long, default_value = DEFAULT_DESIGNATED_SUBSTRING)]
    designated: String,

    /// Pinned share of the designated cluster
    #[arg(long)]
    designated_percentage: Option<f64>,

    #[arg(long, value_enum, default_value_t = ReconcilePolicy::FillFromSmallest)]
    reconcile: ReconcilePolicy,

    #[arg(long, value_enum, default_value_t = DistinctPolicy::IncludeOverlaps)]
    distinct: DistinctPolicy,

    #[arg(long, default_value = ANNOTATORS_DIR)]
    output_root: PathBuf,

    /// Create a backup of the corpus directory before copying
    #[arg(long)]
    backup: bool,

    /// Create empty files named after the clusters file rows and use them as corpus
    #[arg(long)]
    create_empty_corpus: bool,

    /// Refuse to replace files already present in annotator directories
    #[arg(long)]
    no_overwrite: bool,

    /// Only write this bunch type (requires --bunch-dir)
    #[arg(long, value_enum, requires = "bunch_dir")]
    bunch_type: Option<BunchKind>,

    /// Only write this run directory (requires --bunch-type)
    #[arg(long, requires = "bunch_type")]
    bunch_dir: Option<String>,

    /// Also write the final report as JSON
    #[arg(long)]
    report_json: Option<PathBuf>,

    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn into_config(self) -> Result<DistributionConfig, DistError> {
        let mut config = DistributionConfig::new(self.clusters_file, self.corpus_dir);
        if let Some(plan) = &self.plan {
            config.load_bunches(plan)?;
        }
        config.annotators = self.annotators;
        config.output_root = self.output_root;
        config.overlaps_per_audit = self.overlaps;
        config.seed = self.seed;
        config.designated_substring = self.designated;
        config.designated_percentage = self
            .designated_percentage
            .unwrap_or_else(default_designated_percentage);
        config.reconcile = self.reconcile;
        config.distinct = self.distinct;
        config.backup = self.backup;
        config.create_empty_corpus = self.create_empty_corpus;
        config.no_overwrite = self.no_overwrite;
        config.individual = match (self.bunch_type, self.bunch_dir) {
            (Some(kind), Some(dir)) => Some(IndividualBunch { kind, dir }),
            _ => None,
        };
        Ok(config)
    }
}

fn main() -> Result<(), DistError> {
    let cli = Cli::parse();
    distributor::init_tracing(if cli.verbose { "debug" } else { "info" });

    let report_json = cli.report_json.clone();
    let config = cli.into_config()?;

    println!("[distributor] Clusters file: {}", config.clusters_file.display());
    println!("[distributor] Annotators: {}", config.annotators.join(", "));

    let report = pipeline::run(&config)?;
    report.print();

    if let Some(path) = report_json {
        report.write_json(&path)?;
        println!("[distributor] Report saved to {}", path.display());
    }
    Ok(())
}
