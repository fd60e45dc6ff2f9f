//! Integration test: model search over synthesized features

use autods::dataset::{Column, Dataset};
use autods::training::{
    search, DecisionTree, Estimator, Metrics, ModelContext, ModelDescriptor, ModelSearch, SearchState,
    SearchWarning, TaskApplicability, TaskType,
};
use autods::{AutoDsError, PipelineConfig};
use ndarray::{Array1, Array2};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Two gaussian-ish blobs around (0, 0) and (5, 5), alternating rows
fn blobs(n: usize, seed: u64) -> (Dataset, Column) {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut a = Vec::with_capacity(n);
    let mut b = Vec::with_capacity(n);
    let mut y = Vec::with_capacity(n);
    for i in 0..n {
        let center = if i % 2 == 0 { 0.0 } else { 5.0 };
        a.push(center + rng.gen_range(-1.0..1.0));
        b.push(center + rng.gen_range(-1.0..1.0));
        y.push(if i % 2 == 0 { "negative" } else { "positive" });
    }
    let features = Dataset::new(vec![Column::from_f64("a", a), Column::from_f64("b", b)]).unwrap();
    (features, Column::from_strs("outcome", &y))
}

fn three_classes(n: usize) -> (Dataset, Column) {
    let mut rng = ChaCha8Rng::seed_from_u64(3);
    let mut a = Vec::with_capacity(n);
    let mut b = Vec::with_capacity(n);
    let mut y = Vec::with_capacity(n);
    for i in 0..n {
        let class = i % 3;
        a.push(class as f64 * 4.0 + rng.gen_range(-1.0..1.0));
        b.push(rng.gen_range(-1.0..1.0));
        y.push(["setosa", "versicolor", "virginica"][class]);
    }
    let features = Dataset::new(vec![Column::from_f64("a", a), Column::from_f64("b", b)]).unwrap();
    (features, Column::from_strs("species", &y))
}

#[test]
fn test_well_separated_classes_score_high() {
    let (features, target) = blobs(200, 5);
    let outcome = search(&features, &target, None, &PipelineConfig::default()).unwrap();

    assert_eq!(outcome.task, TaskType::Classification);
    assert_eq!(outcome.primary_metric_name(), "accuracy");
    assert!(outcome.best_score() > 0.9, "best score {}", outcome.best_score());
    assert_eq!(outcome.candidates.len(), 7);
    assert!(outcome.warnings.is_empty());
    assert!(outcome.split.stratified);
    assert_eq!(outcome.split.test.len(), 40);

    let best = outcome.best_metrics.as_classification().unwrap();
    let curve = best.roc_curve.as_ref().unwrap();
    assert_eq!(curve.fpr.len(), curve.tpr.len());
    assert!((curve.area() - best.roc_auc.unwrap()).abs() < 1e-9);
}

#[test]
fn test_small_class_falls_back_to_shuffled_split() {
    let mut rng = ChaCha8Rng::seed_from_u64(8);
    let n = 153;
    let a: Vec<f64> = (0..n).map(|i| if i < 150 { rng.gen_range(0.0..1.0) } else { 10.0 + i as f64 }).collect();
    let b: Vec<f64> = (0..n).map(|_| rng.gen_range(0.0..1.0)).collect();
    let y: Vec<&str> = (0..n).map(|i| if i < 150 { "major" } else { "minor" }).collect();
    let features = Dataset::new(vec![Column::from_f64("a", a), Column::from_f64("b", b)]).unwrap();
    let target = Column::from_strs("class", &y);

    let config = PipelineConfig::default().with_candidate_models(["Logistic Regression", "Decision Tree"]);
    let outcome = search(&features, &target, None, &config).unwrap();

    assert!(!outcome.split.stratified);
    assert_eq!(outcome.split.test.len(), 31);
    assert_eq!(
        outcome.warnings,
        vec![SearchWarning::SplitFallback {
            class_label: "minor".to_string(),
            members: 3,
            required: 5,
        }]
    );
}

#[test]
fn test_confusion_matrix_matches_class_count() {
    let (features, target) = three_classes(90);
    let config = PipelineConfig::default().with_candidate_models(["Decision Tree", "K-Nearest Neighbors"]);
    let outcome = search(&features, &target, None, &config).unwrap();

    assert_eq!(outcome.n_classes(), 3);
    for candidate in &outcome.candidates {
        match &candidate.metrics {
            Some(Metrics::Classification(m)) => {
                assert_eq!(m.confusion_matrix.len(), 3);
                assert!(m.confusion_matrix.iter().all(|row| row.len() == 3));
                let total: usize = m.confusion_matrix.iter().flatten().sum();
                assert_eq!(total, outcome.split.test.len());
                assert!(m.roc_auc.is_none());
                assert!(m.roc_curve.is_none());
            }
            other => panic!("expected classification metrics, got {other:?}"),
        }
    }
}

#[test]
fn test_same_seed_same_result() {
    let (features, target) = blobs(120, 21);
    let config = PipelineConfig::default()
        .with_seed(7)
        .with_candidate_models(["Random Forest", "Gradient Boosting", "K-Nearest Neighbors"]);

    let first = search(&features, &target, None, &config).unwrap();
    let second = search(&features, &target, None, &config).unwrap();
    assert_eq!(first.best_model_name, second.best_model_name);
    assert_eq!(first.best_metrics, second.best_metrics);
    assert_eq!(first.split, second.split);
    let metrics = |o: &autods::TrainingOutcome| -> Vec<Option<Metrics>> {
        o.candidates.iter().map(|c| c.metrics.clone()).collect()
    };
    assert_eq!(metrics(&first), metrics(&second));
}

#[test]
fn test_regression_search() {
    let mut rng = ChaCha8Rng::seed_from_u64(4);
    let n = 100;
    let x: Vec<f64> = (0..n).map(|_| rng.gen_range(0.0..10.0)).collect();
    let y: Vec<f64> = x.iter().map(|v| 4.0 * v + 2.0 + rng.gen_range(-0.5..0.5)).collect();
    let features = Dataset::new(vec![Column::from_f64("x", x)]).unwrap();
    let target = Column::from_f64("y", y);

    let config = PipelineConfig::default().with_candidate_models(["Linear Regression", "Decision Tree"]);
    let mut model_search = ModelSearch::new(config);
    let outcome = model_search.run(&features, &target).unwrap();

    assert_eq!(outcome.task, TaskType::Regression);
    assert_eq!(outcome.primary_metric_name(), "r2");
    assert_eq!(outcome.best_model_name, "Linear Regression");
    assert!(outcome.best_score() > 0.99);
    assert!(outcome.class_labels.is_empty());
    assert_eq!(model_search.state(), &SearchState::Selected { best: "Linear Regression".into() });
}

#[test]
fn test_empty_feature_matrix_is_configuration_error() {
    let features = Dataset::with_rows(20);
    let target = Column::from_strs("label", &["a", "b"].repeat(10));
    let err = search(&features, &target, None, &PipelineConfig::default()).unwrap_err();
    assert!(matches!(err, AutoDsError::Configuration(_)));
}

#[test]
fn test_unknown_candidate_is_configuration_error() {
    let (features, target) = blobs(40, 1);
    let config = PipelineConfig::default().with_candidate_models(["Perceptron"]);
    let err = search(&features, &target, None, &config).unwrap_err();
    assert!(matches!(err, AutoDsError::Configuration(_)));
}

/// Rejects every training set
#[derive(Debug)]
struct RejectingModel;

impl Estimator for RejectingModel {
    fn fit(&mut self, _x: &Array2<f64>, _y: &Array1<f64>) -> autods::Result<()> {
        Err(AutoDsError::Training("solver diverged".into()))
    }

    fn predict(&self, x: &Array2<f64>) -> autods::Result<Array1<f64>> {
        Ok(Array1::zeros(x.nrows()))
    }
}

/// Panics during fit
#[derive(Debug)]
struct PanickingModel;

impl Estimator for PanickingModel {
    fn fit(&mut self, _x: &Array2<f64>, _y: &Array1<f64>) -> autods::Result<()> {
        panic!("index out of bounds");
    }

    fn predict(&self, x: &Array2<f64>) -> autods::Result<Array1<f64>> {
        Ok(Array1::zeros(x.nrows()))
    }
}

fn rejecting(_ctx: &ModelContext) -> Box<dyn Estimator> {
    Box::new(RejectingModel)
}

fn panicking(_ctx: &ModelContext) -> Box<dyn Estimator> {
    Box::new(PanickingModel)
}

fn tree(ctx: &ModelContext) -> Box<dyn Estimator> {
    Box::new(DecisionTree::new_classifier(ctx.n_classes).with_random_state(ctx.seed))
}

static MIXED_MODELS: &[ModelDescriptor] = &[
    ModelDescriptor {
        name: "Rejecting",
        applicability: TaskApplicability::Both,
        build: rejecting,
    },
    ModelDescriptor {
        name: "Tree",
        applicability: TaskApplicability::Classification,
        build: tree,
    },
    ModelDescriptor {
        name: "Panicking",
        applicability: TaskApplicability::Both,
        build: panicking,
    },
];

static FAILING_MODELS: &[ModelDescriptor] = &[
    ModelDescriptor {
        name: "Rejecting",
        applicability: TaskApplicability::Both,
        build: rejecting,
    },
    ModelDescriptor {
        name: "Panicking",
        applicability: TaskApplicability::Both,
        build: panicking,
    },
];

#[test]
fn test_failed_candidates_are_recorded_and_survivor_selected() {
    let (features, target) = blobs(80, 11);
    let mut model_search = ModelSearch::new(PipelineConfig::default()).with_registry(MIXED_MODELS);
    let outcome = model_search.run(&features, &target).unwrap();

    assert_eq!(outcome.best_model_name, "Tree");
    assert_eq!(model_search.state(), &SearchState::Selected { best: "Tree".into() });

    let names: Vec<&str> = outcome.candidates.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["Rejecting", "Tree", "Panicking"]);

    let rejected = &outcome.candidates[0];
    assert!(!rejected.succeeded());
    assert!(rejected.failure.as_deref().unwrap().contains("solver diverged"));

    let panicked = &outcome.candidates[2];
    assert!(panicked.metrics.is_none());
    assert!(panicked.failure.as_deref().unwrap().contains("index out of bounds"));

    assert!(outcome.candidates[1].succeeded());
}

#[test]
fn test_every_candidate_failing_is_no_valid_model() {
    let (features, target) = blobs(60, 12);
    let mut model_search = ModelSearch::new(PipelineConfig::default()).with_registry(FAILING_MODELS);
    let err = model_search.run(&features, &target).unwrap_err();

    match err {
        AutoDsError::NoValidModel { failures } => {
            let names: Vec<&str> = failures.iter().map(|f| f.name.as_str()).collect();
            assert_eq!(names, vec!["Rejecting", "Panicking"]);
            assert!(failures[0].reason.contains("solver diverged"));
            assert!(failures[1].reason.starts_with("panicked"));
        }
        other => panic!("expected NoValidModel, got {other:?}"),
    }
    assert_eq!(model_search.state(), &SearchState::Failed);
}

#[test]
fn test_candidate_names_resolve_against_custom_registry() {
    let (features, target) = blobs(60, 13);
    let config = PipelineConfig::default().with_candidate_models(["tree"]);
    let outcome = ModelSearch::new(config.clone())
        .with_registry(MIXED_MODELS)
        .run(&features, &target)
        .unwrap();
    assert_eq!(outcome.candidates.len(), 1);

    // "Tree" is not a built-in registry name
    assert!(matches!(
        ModelSearch::new(config).run(&features, &target),
        Err(AutoDsError::Configuration(_))
    ));
}
