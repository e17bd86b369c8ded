use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use distributor::cluster_loader::{Clusters, load_clusters};
use distributor::config::{DistributionConfig, ReconcilePolicy};
use distributor::pipeline;
use distributor::sampler::StratifiedSampler;
use distributor::spool::SeededRng;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn synthetic_clusters(docs: usize) -> Clusters {
    let mut clusters = Clusters::new();
    for i in 0..docs {
        let cluster = if i % 10 == 0 { "sonespases".to_string() } else { (i % 7).to_string() };
        clusters.insert(cluster, format!("{:06}.txt", i));
    }
    clusters
}

fn bench_stratified_sample(c: &mut Criterion) {
    let mut group = c.benchmark_group("stratified_sample");

    for docs in [2_000, 10_000, 50_000] {
        let clusters = synthetic_clusters(docs);
        let sampler = StratifiedSampler::new(SeededRng::new(777), "sonespases", 0.13, ReconcilePolicy::FillFromSmallest);

        group.bench_with_input(BenchmarkId::new("docs", docs), &clusters, |b, clusters| {
            b.iter(|| {
                let mut clusters = clusters.clone();
                sampler.sample(&mut clusters, black_box(1_177)).unwrap()
            });
        });
    }

    group.finish();
}

/// Full plan over the default bunch table without writing anything
fn bench_allocate_default_plan(c: &mut Criterion) {
    let mut group = c.benchmark_group("allocate");
    group.sample_size(20);

    let config = DistributionConfig::new("clusters.tsv", "corpus");
    let clusters = synthetic_clusters(20_000);

    group.bench_function("default_plan", |b| {
        b.iter(|| {
            let mut clusters = clusters.clone();
            pipeline::allocate(black_box(&config), &mut clusters, Path::new("corpus")).unwrap()
        });
    });

    group.finish();
}

fn bench_load_clusters(c: &mut Criterion) {
    let mut group = c.benchmark_group("load_clusters");
    group.sample_size(20);

    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("clusters.tsv");
    let mut body = String::from("file\tcluster\n");
    for i in 0..20_000 {
        body.push_str(&format!("{:06}.txt\t{}\n", i, i % 7));
    }
    fs::write(&path, body).unwrap();

    group.bench_function("tsv_20k", |b| {
        b.iter(|| load_clusters(black_box(&path)).unwrap());
    });

    group.finish();
}

criterion_group!(benches, bench_stratified_sample, bench_allocate_default_plan, bench_load_clusters);
criterion_main!(benches);
