//! Integration test: end-to-end pipeline runs

use autods::dataset::{Column, Dataset};
use autods::pipeline::{AutoPipeline, MIN_ROWS};
use autods::training::Predictions;
use autods::{run, AutoDsError, PipelineConfig, TaskType};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Subscription customers; churn follows short tenure and a high bill
fn churn_table(n: usize) -> Dataset {
    let mut rng = ChaCha8Rng::seed_from_u64(99);
    let ids: Vec<String> = (0..n).map(|i| format!("C{:05}", 1000 + i * 7)).collect();
    let tenure: Vec<f64> = (0..n).map(|_| rng.gen_range(1..72) as f64).collect();
    let monthly: Vec<Option<f64>> = (0..n)
        .map(|i| if i % 25 == 3 { None } else { Some(rng.gen_range(20.0..110.0)) })
        .collect();
    let plan: Vec<&str> = (0..n).map(|_| ["basic", "plus", "premium"][rng.gen_range(0..3)]).collect();
    let churn: Vec<&str> = (0..n)
        .map(|i| {
            let bill = monthly[i].unwrap_or(60.0);
            if tenure[i] < 24.0 && bill > 60.0 { "yes" } else { "no" }
        })
        .collect();

    Dataset::new(vec![
        Column::text("customer_id", ids.into_iter().map(Some).collect()),
        Column::from_f64("tenure", tenure),
        Column::numeric("monthly", monthly),
        Column::from_strs("plan", &plan),
        Column::from_strs("churn", &churn),
    ])
    .unwrap()
}

fn fast_config() -> PipelineConfig {
    PipelineConfig::default().with_candidate_models(["Logistic Regression", "Decision Tree", "Naive Bayes"])
}

#[test]
fn test_pipeline_detects_target_and_trains() {
    let raw = churn_table(150);
    let run = AutoPipeline::new(fast_config()).run(&raw).unwrap();

    assert_eq!(run.target, "churn");
    assert_eq!(run.outcome.task, TaskType::Classification);
    assert!(!run.cleaned.contains("customer_id"));
    assert!(run.cleaning_report.dropped_columns().iter().any(|(name, _)| *name == "customer_id"));
    assert!(!run.features.features.contains("churn"));
    assert_eq!(run.outcome.candidates.len(), 3);
    assert!(run.outcome.best_score() > 0.7);
    assert_eq!(run.profile.n_rows, 150);
}

#[test]
fn test_full_registry_run() {
    let raw = churn_table(200);
    let run = run(&raw, Some("churn"), &PipelineConfig::default()).unwrap();
    assert_eq!(run.outcome.candidates.len(), 7);
    assert!(run.outcome.candidates.iter().any(|c| c.metrics.is_some()));
    assert_eq!(run.outcome.class_labels, vec!["no".to_string(), "yes".to_string()]);
}

#[test]
fn test_summary_serializes() {
    let run = AutoPipeline::new(fast_config()).run(&churn_table(120)).unwrap();
    let summary = run.summary();

    assert_eq!(summary.raw_rows, 120);
    assert_eq!(summary.raw_columns, 5);
    assert_eq!(summary.features_selected.len(), run.features.n_features());
    assert_eq!(summary.model_search.best_model, run.outcome.best_model_name);

    let json = serde_json::to_value(&summary).unwrap();
    assert_eq!(json["target"], "churn");
    assert_eq!(json["task"], "Classification");
    assert_eq!(json["model_search"]["best_metrics"]["task"], "classification");
    assert!(json["model_search"]["candidates"].as_array().unwrap().len() == 3);

    let text = run.summary_text();
    assert!(text.contains("Target:    churn (classification)"));
    assert!(text.contains(&format!("--- Best model: {} ---", run.outcome.best_model_name)));
    assert!(text.contains("confusion matrix"));
}

#[test]
fn test_predict_on_raw_rows() {
    let raw = churn_table(120);
    let run = AutoPipeline::new(fast_config()).run(&raw).unwrap();

    let fresh = raw.select_rows(&[0, 1, 2, 3, 4]).without_column("churn");
    match run.predict(&fresh).unwrap() {
        Predictions::Labels(labels) => {
            assert_eq!(labels.len(), 5);
            assert!(labels.iter().all(|l| l == "yes" || l == "no"));
        }
        other => panic!("expected labels, got {other:?}"),
    }
}

#[test]
fn test_csv_round_trip_run() {
    let raw = churn_table(100);
    let path = std::env::temp_dir().join(format!("autods_churn_{}.csv", std::process::id()));
    raw.write_csv(&path).unwrap();
    let loaded = Dataset::read_csv(&path).unwrap();
    let _ = std::fs::remove_file(&path);

    assert_eq!(loaded.n_rows(), 100);
    assert_eq!(loaded.column_names(), raw.column_names());
    assert!(loaded.column("tenure").unwrap().is_numeric());

    let run = AutoPipeline::new(fast_config()).with_target("churn").run(&loaded).unwrap();
    assert_eq!(run.outcome.target, "churn");
}

#[test]
fn test_task_hint_forces_regression() {
    let mut rng = ChaCha8Rng::seed_from_u64(2);
    let n = 60;
    let x: Vec<f64> = (0..n).map(|_| rng.gen_range(0.0..4.0)).collect();
    // few distinct values would otherwise read as classes
    let y: Vec<f64> = x.iter().map(|v| v.floor()).collect();
    let ds = Dataset::new(vec![Column::from_f64("x", x), Column::from_f64("level", y)]).unwrap();

    let config = PipelineConfig::default().with_candidate_models(["Linear Regression", "Decision Tree"]);
    let run = AutoPipeline::new(config)
        .with_target("level")
        .with_task_hint(Some(TaskType::Regression))
        .run(&ds)
        .unwrap();
    assert_eq!(run.outcome.task, TaskType::Regression);
    assert_eq!(run.outcome.primary_metric_name(), "r2");
}

#[test]
fn test_identifier_only_dataset_is_rejected() {
    let n = 20;
    let ids: Vec<String> = (0..n).map(|i| format!("id-{i}")).collect();
    let refs: Vec<&str> = ids.iter().map(String::as_str).collect();
    let ds = Dataset::new(vec![
        Column::from_strs("id", &refs),
        Column::from_f64("row", (0..n).map(|i| i as f64).collect()),
    ])
    .unwrap();

    let err = AutoPipeline::default().run(&ds).unwrap_err();
    assert!(matches!(err, AutoDsError::Configuration(_)));
}

#[test]
fn test_target_dropped_by_cleaning_is_reported() {
    let raw = churn_table(60);
    let err = AutoPipeline::new(fast_config())
        .with_target("customer_id")
        .run(&raw)
        .unwrap_err();
    match err {
        AutoDsError::Configuration(msg) => assert!(msg.contains("identifier-like"), "{msg}"),
        other => panic!("expected configuration error, got {other:?}"),
    }
}

#[test]
fn test_too_small_dataset_is_rejected() {
    let raw = churn_table(MIN_ROWS - 1);
    assert!(matches!(
        AutoPipeline::default().run(&raw),
        Err(AutoDsError::Configuration(_))
    ));
}
