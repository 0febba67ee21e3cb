use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use iacindex::config::ScanConfig;
use iacindex::indexing::PipelineConfig;
use iacindex::{Classifier, IndexBuilder, PersistedIndex, QueryEngine};
use std::hint::black_box;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

const RESOURCES_PER_FILE: usize = 20;
const FILE_COUNTS: &[usize] = &[10, 100, 500];

const TEMPLATES: &[(&str, &str)] = &[
    ("aws_kms_key", "  enable_key_rotation = true\n"),
    ("aws_s3_bucket", "  bucket = \"assets\"\n"),
    ("aws_security_group", "  ingress {\n    from_port = 443\n  }\n"),
    ("aws_iam_role", "  name = \"deployer\"\n"),
    ("aws_cloudwatch_log_group", "  retention_in_days = 90\n"),
];

fn create_corpus(root: &Path, file_count: usize) {
    for file in 0..file_count {
        let env = ["prod", "staging", "dev"][file % 3];
        let dir = root.join(env);
        std::fs::create_dir_all(&dir).expect("create corpus dir");

        let mut source = String::new();
        for i in 0..RESOURCES_PER_FILE {
            let (resource_type, body) = TEMPLATES[(file + i) % TEMPLATES.len()];
            source.push_str(&format!(
                "resource \"{resource_type}\" \"r{file}_{i}\" {{\n{body}}}\n\n"
            ));
        }
        std::fs::write(dir.join(format!("main_{file:04}.tf")), source).expect("write corpus file");
    }
}

fn build_index(file_count: usize) -> PersistedIndex {
    let temp_dir = TempDir::new().expect("create temp dir");
    create_corpus(temp_dir.path(), file_count);

    IndexBuilder::new(
        ScanConfig::new([temp_dir.path()]),
        Classifier::builtin(),
        PipelineConfig::default(),
    )
    .build(&CancellationToken::new())
    .expect("build corpus index")
    .index
}

fn bench_point_queries(c: &mut Criterion) {
    let mut group = c.benchmark_group("point_queries");

    for &file_count in FILE_COUNTS {
        let engine = QueryEngine::new(Arc::new(build_index(file_count)));
        group.throughput(Throughput::Elements(engine.index().metadata.total_resources as u64));

        group.bench_with_input(BenchmarkId::new("by_control", file_count), &engine, |b, engine| {
            b.iter(|| black_box(engine.by_control(black_box("CC6.8")).count))
        });
        group.bench_with_input(
            BenchmarkId::new("by_attribute", file_count),
            &engine,
            |b, engine| b.iter(|| black_box(engine.by_attribute(black_box("encryption")).count)),
        );
        group.bench_with_input(
            BenchmarkId::new("by_resource_type", file_count),
            &engine,
            |b, engine| {
                b.iter(|| black_box(engine.by_resource_type(black_box("aws_kms_key")).count))
            },
        );
    }

    group.finish();
}

fn bench_combined_query(c: &mut Criterion) {
    let engine = QueryEngine::new(Arc::new(build_index(100)));

    c.bench_function("attribute_and_environment", |b| {
        b.iter(|| {
            let encrypted = engine.by_attribute(black_box("encryption"));
            let production = engine.by_environment(black_box("production"));
            black_box(encrypted.intersect(&production).count)
        })
    });
}

criterion_group!(benches, bench_point_queries, bench_combined_query);
criterion_main!(benches);
