use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use autods::cleaning::clean;
use autods::dataset::{Column, Dataset};
use autods::features::synthesize;
use autods::training::search;
use autods::{AutoPipeline, PipelineConfig};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

fn create_classification_data(n_rows: usize, n_features: usize) -> Dataset {
    let mut rng = ChaCha8Rng::seed_from_u64(42);

    let mut columns: Vec<Column> = (0..n_features)
        .map(|i| {
            let values: Vec<Option<f64>> = (0..n_rows)
                .map(|_| if rng.gen::<f64>() < 0.03 { None } else { Some(rng.gen::<f64>() * 10.0) })
                .collect();
            Column::numeric(format!("feature_{}", i), values)
        })
        .collect();

    let segment: Vec<&str> = (0..n_rows).map(|_| ["a", "b", "c", "d"][rng.gen_range(0..4)]).collect();
    columns.push(Column::from_strs("segment", &segment));

    // Label from the first two features plus noise
    let label: Vec<&str> = (0..n_rows)
        .map(|i| {
            let f0 = columns[0].as_numeric().and_then(|v| v[i]).unwrap_or(5.0);
            let f1 = columns[1].as_numeric().and_then(|v| v[i]).unwrap_or(5.0);
            if f0 + f1 + rng.gen::<f64>() > 10.5 { "yes" } else { "no" }
        })
        .collect();
    columns.push(Column::from_strs("label", &label));

    Dataset::new(columns).unwrap()
}

fn bench_cleaning(c: &mut Criterion) {
    let mut group = c.benchmark_group("cleaning");
    group.sample_size(10);

    for n_rows in [500, 2000, 5000].iter() {
        let data = create_classification_data(*n_rows, 8);
        group.bench_with_input(BenchmarkId::new("clean", n_rows), &data, |b, data| {
            b.iter(|| clean(black_box(data)).unwrap())
        });
    }

    group.finish();
}

fn bench_features(c: &mut Criterion) {
    let mut group = c.benchmark_group("features");
    group.sample_size(10);
    let config = PipelineConfig::default();

    for n_rows in [500, 2000, 5000].iter() {
        let (cleaned, _) = clean(&create_classification_data(*n_rows, 8)).unwrap();
        group.bench_with_input(BenchmarkId::new("synthesize", n_rows), &cleaned, |b, data| {
            b.iter(|| synthesize(black_box(data), "label", &config).unwrap())
        });
    }

    group.finish();
}

fn bench_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("search");
    group.sample_size(10);

    let (cleaned, _) = clean(&create_classification_data(1000, 6)).unwrap();
    let features = synthesize(&cleaned, "label", &PipelineConfig::default()).unwrap();

    for model in ["Logistic Regression", "Decision Tree", "Random Forest", "K-Nearest Neighbors"] {
        let config = PipelineConfig::default().with_candidate_models([model]);
        group.bench_function(BenchmarkId::new("candidate", model), |b| {
            b.iter(|| search(black_box(&features.features), &features.target, Some(features.task), &config).unwrap())
        });
    }

    group.finish();
}

fn bench_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline");
    group.sample_size(10);

    let data = create_classification_data(1000, 6);
    let pipeline = AutoPipeline::new(PipelineConfig::default());
    group.bench_function("run_1000", |b| b.iter(|| pipeline.run(black_box(&data)).unwrap()));

    group.finish();
}

criterion_group!(benches, bench_cleaning, bench_features, bench_search, bench_pipeline);
criterion_main!(benches);
