pub mod allocator;
pub mod cluster_loader;
pub mod config;
pub mod distribution;
pub mod error;
pub mod overlap;
pub mod pipeline;
pub mod report;
pub mod sampler;
pub mod spool;
pub mod writer;

pub use error::*;

/// A document is identified by its file name inside the corpus directory
pub type Document = String;

/// Install the global fmt subscriber. `RUST_LOG` wins over `default_level`.
pub fn init_tracing(default_level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .try_init();
}
