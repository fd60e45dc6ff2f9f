//! Automated model search
//!
//! Detects the task, splits the rows, trains every applicable registry entry
//! on the training side and keeps the one with the best hold-out primary
//! metric. A run moves through [`SearchState`]:
//!
//! ```text
//! Idle -> Splitting -> Training(candidate)* -> Scoring -> Selected | Failed
//! ```

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::Instant;

use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::metrics::{primary_metric_name, ClassificationMetrics, Metrics, RegressionMetrics};
use super::models::Estimator;
use super::registry::{self, ModelContext, ModelDescriptor};
use super::split::{train_test_split, SplitFallback, TrainTestSplit};
use super::{EncodedTarget, TaskDetector, TaskType};
use crate::config::PipelineConfig;
use crate::dataset::{format_number, Column, Dataset};
use crate::error::{AutoDsError, CandidateFailure, Result};

/// Where a search run currently is
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SearchState {
    Idle,
    Splitting,
    Training { candidate: String },
    Scoring,
    Selected { best: String },
    Failed,
}

impl SearchState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SearchState::Selected { .. } | SearchState::Failed)
    }
}

impl std::fmt::Display for SearchState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SearchState::Idle => write!(f, "idle"),
            SearchState::Splitting => write!(f, "splitting"),
            SearchState::Training { candidate } => write!(f, "training({candidate})"),
            SearchState::Scoring => write!(f, "scoring"),
            SearchState::Selected { best } => write!(f, "selected({best})"),
            SearchState::Failed => write!(f, "failed"),
        }
    }
}

/// Non-fatal conditions recorded during a search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SearchWarning {
    /// Stratification was impossible; rows were shuffled without it
    SplitFallback {
        class_label: String,
        members: usize,
        required: usize,
    },
}

impl std::fmt::Display for SearchWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SearchWarning::SplitFallback {
                class_label,
                members,
                required,
            } => write!(
                f,
                "stratified split not possible: class '{class_label}' has {members} rows \
                 (needs {required}); used a non-stratified split"
            ),
        }
    }
}

/// Per-candidate record kept for reporting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateReport {
    pub name: String,
    /// Hold-out metrics; `None` when the candidate failed
    pub metrics: Option<Metrics>,
    pub failure: Option<String>,
    pub training_time_secs: f64,
}

impl CandidateReport {
    pub fn succeeded(&self) -> bool {
        self.metrics.is_some()
    }
}

/// Result of one candidate within a run
#[derive(Debug)]
pub struct ModelResult {
    pub descriptor: &'static ModelDescriptor,
    /// Trained model; dropped for failed candidates
    pub model: Option<Box<dyn Estimator>>,
    pub metrics: Option<Metrics>,
    pub failure: Option<CandidateFailure>,
    pub training_time_secs: f64,
    predictions: Option<Array1<f64>>,
}

impl ModelResult {
    fn report(&self) -> CandidateReport {
        CandidateReport {
            name: self.descriptor.name.to_string(),
            metrics: self.metrics.clone(),
            failure: self.failure.as_ref().map(|f| f.reason.clone()),
            training_time_secs: self.training_time_secs,
        }
    }

    /// Primary metric for ranking; NaN ranks below everything
    fn rank_score(&self) -> Option<f64> {
        self.metrics.as_ref().map(|m| {
            let score = m.primary();
            if score.is_nan() {
                f64::NEG_INFINITY
            } else {
                score
            }
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureImportance {
    pub feature: String,
    pub importance: f64,
}

/// Predictions decoded back into target space
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Predictions {
    Labels(Vec<String>),
    Values(Vec<f64>),
}

impl Predictions {
    pub fn len(&self) -> usize {
        match self {
            Predictions::Labels(v) => v.len(),
            Predictions::Values(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn to_column(&self, name: &str) -> Column {
        match self {
            Predictions::Labels(labels) => Column::text(name, labels.iter().cloned().map(Some).collect()),
            Predictions::Values(values) => Column::from_f64(name, values.clone()),
        }
    }
}

/// Terminal artifact of a search run
#[derive(Debug)]
pub struct TrainingOutcome {
    pub best_model_name: String,
    pub best_model: Box<dyn Estimator>,
    pub task: TaskType,
    pub target: String,
    /// Label of every class code; empty for regression
    pub class_labels: Vec<String>,
    /// Feature columns the model was trained on, in order
    pub feature_names: Vec<String>,
    /// Every candidate tried, in registry order
    pub candidates: Vec<CandidateReport>,
    pub best_metrics: Metrics,
    /// Best model's importances, largest first
    pub feature_importances: Vec<FeatureImportance>,
    pub split: TrainTestSplit,
    /// Hold-out truth and the winner's predictions (class codes for classification)
    pub holdout_truth: Array1<f64>,
    pub holdout_predictions: Array1<f64>,
    pub warnings: Vec<SearchWarning>,
}

/// Serializable digest of a [`TrainingOutcome`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutcomeSummary {
    pub best_model: String,
    pub task: TaskType,
    pub target: String,
    pub primary_metric: String,
    pub best_score: f64,
    pub best_metrics: Metrics,
    pub candidates: Vec<CandidateReport>,
    pub feature_importances: Vec<FeatureImportance>,
    pub class_labels: Vec<String>,
    pub n_train: usize,
    pub n_test: usize,
    pub warnings: Vec<SearchWarning>,
}

impl TrainingOutcome {
    pub fn primary_metric_name(&self) -> &'static str {
        primary_metric_name(self.task)
    }

    pub fn best_score(&self) -> f64 {
        self.best_metrics.primary()
    }

    pub fn n_classes(&self) -> usize {
        self.class_labels.len()
    }

    pub fn summary(&self) -> OutcomeSummary {
        OutcomeSummary {
            best_model: self.best_model_name.clone(),
            task: self.task,
            target: self.target.clone(),
            primary_metric: self.primary_metric_name().to_string(),
            best_score: self.best_score(),
            best_metrics: self.best_metrics.clone(),
            candidates: self.candidates.clone(),
            feature_importances: self.feature_importances.clone(),
            class_labels: self.class_labels.clone(),
            n_train: self.split.train.len(),
            n_test: self.split.test.len(),
            warnings: self.warnings.clone(),
        }
    }

    /// Predict with the winning model. `features` must hold the training
    /// feature columns (extra columns are ignored).
    pub fn predict(&self, features: &Dataset) -> Result<Predictions> {
        let names: Vec<&str> = self.feature_names.iter().map(String::as_str).collect();
        let mut x = features.to_array(&names)?;
        sanitize(&mut x);
        let raw = self.best_model.predict(&x)?;
        Ok(match self.task {
            TaskType::Classification => Predictions::Labels(
                raw.iter()
                    .map(|&code| decode_label(&self.class_labels, code))
                    .collect(),
            ),
            TaskType::Regression => Predictions::Values(raw.to_vec()),
        })
    }
}

fn decode_label(labels: &[String], code: f64) -> String {
    let idx = code.round().max(0.0) as usize;
    labels
        .get(idx.min(labels.len().saturating_sub(1)))
        .cloned()
        .unwrap_or_else(|| format_number(code))
}

/// Replace NaN and infinities with 0
fn sanitize(x: &mut Array2<f64>) {
    x.mapv_inplace(|v| if v.is_finite() { v } else { 0.0 });
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("panicked: {s}")
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("panicked: {s}")
    } else {
        "panicked".to_string()
    }
}

/// Trains and ranks the candidate registry
#[derive(Debug, Clone)]
pub struct ModelSearch {
    config: PipelineConfig,
    task_hint: Option<TaskType>,
    /// Candidate table; the built-in [`registry::REGISTRY`] unless replaced
    models: &'static [ModelDescriptor],
    state: SearchState,
}

impl ModelSearch {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            task_hint: None,
            models: registry::REGISTRY,
            state: SearchState::Idle,
        }
    }

    /// Search over `models` instead of the built-in registry. Declaration
    /// order still breaks ties and `candidate_models` names entries of `models`.
    pub fn with_registry(mut self, models: &'static [ModelDescriptor]) -> Self {
        self.models = models;
        self
    }

    pub fn with_task_hint(mut self, task: Option<TaskType>) -> Self {
        self.task_hint = task;
        self
    }

    pub fn state(&self) -> &SearchState {
        &self.state
    }

    fn transition(&mut self, next: SearchState) {
        debug!(from = %self.state, to = %next, "Search state");
        self.state = next;
    }

    /// Run the search over `features` (numeric columns only) against `target`
    pub fn run(&mut self, features: &Dataset, target: &Column) -> Result<TrainingOutcome> {
        self.config.validate_against(self.models)?;
        self.state = SearchState::Idle;

        if target.len() != features.n_rows() {
            return Err(AutoDsError::Configuration(format!(
                "target '{}' has {} rows but the feature table has {}",
                target.name(),
                target.len(),
                features.n_rows()
            )));
        }
        if features.n_cols() == 0 {
            return Err(AutoDsError::Configuration("no feature columns to train on".into()));
        }
        if features.contains(target.name()) {
            return Err(AutoDsError::Configuration(format!(
                "feature table contains the target column '{}'",
                target.name()
            )));
        }

        let task = TaskDetector::from_config(&self.config).resolve(target, self.task_hint);
        let encoded = EncodedTarget::encode(target, task)?;
        if task == TaskType::Classification && encoded.n_classes() < 2 {
            return Err(AutoDsError::Configuration(format!(
                "classification target '{}' has fewer than 2 classes",
                target.name()
            )));
        }
        let candidates = registry::applicable_in(self.models, task, &self.config);
        if candidates.is_empty() {
            return Err(AutoDsError::Configuration(format!("no candidate model applies to {task}")));
        }

        let mut x = features.to_matrix()?;
        sanitize(&mut x);
        let feature_names: Vec<String> = features.column_names().into_iter().map(String::from).collect();
        info!(
            task = %task,
            rows = x.nrows(),
            features = x.ncols(),
            candidates = candidates.len(),
            "Starting model search"
        );

        // Split
        self.transition(SearchState::Splitting);
        let y = &encoded.values;
        let (split, fallback) = train_test_split(
            &y.to_vec(),
            task,
            self.config.test_fraction,
            self.config.random_seed,
        )?;
        let mut warnings = Vec::new();
        if let Some(SplitFallback { class, members, required }) = fallback {
            let class_label = encoded.class_labels.get(class).cloned().unwrap_or_default();
            warn!(class = %class_label, members, required, "Falling back to a non-stratified split");
            warnings.push(SearchWarning::SplitFallback {
                class_label,
                members,
                required,
            });
        }
        let x_train = x.select(Axis(0), &split.train);
        let x_test = x.select(Axis(0), &split.test);
        let y_train = y.select(Axis(0), &split.train);
        let y_test = y.select(Axis(0), &split.test);

        // Train
        let ctx = ModelContext::new(task, encoded.n_classes(), &self.config);
        let mut trained = Vec::with_capacity(candidates.len());
        for descriptor in candidates {
            self.transition(SearchState::Training {
                candidate: descriptor.name.to_string(),
            });
            trained.push(train_candidate(descriptor, &ctx, &x_train, &y_train, &x_test));
        }

        // Score
        self.transition(SearchState::Scoring);
        let mut results = Vec::with_capacity(trained.len());
        for (mut result, scores) in trained {
            if let Some(pred) = &result.predictions {
                let metrics = match task {
                    TaskType::Classification => Metrics::Classification(ClassificationMetrics::compute(
                        &y_test,
                        pred,
                        scores.as_ref(),
                        encoded.n_classes(),
                    )),
                    TaskType::Regression => Metrics::Regression(RegressionMetrics::compute(&y_test, pred)),
                };
                info!(
                    model = result.descriptor.name,
                    metric = metrics.primary_name(),
                    score = metrics.primary(),
                    secs = result.training_time_secs,
                    "Candidate scored"
                );
                result.metrics = Some(metrics);
            }
            results.push(result);
        }

        let mut best: Option<(usize, f64)> = None;
        for (i, result) in results.iter().enumerate() {
            if let Some(score) = result.rank_score() {
                // Strictly greater keeps the first-declared candidate on ties
                if best.map_or(true, |(_, s)| score > s) {
                    best = Some((i, score));
                }
            }
        }

        let candidate_reports: Vec<CandidateReport> = results.iter().map(ModelResult::report).collect();
        let Some((best_idx, _)) = best else {
            self.transition(SearchState::Failed);
            let failures: Vec<CandidateFailure> = results.into_iter().filter_map(|r| r.failure).collect();
            warn!(failed = failures.len(), "Every candidate failed");
            return Err(AutoDsError::NoValidModel { failures });
        };

        let winner = results.swap_remove(best_idx);
        let (Some(best_model), Some(best_metrics), Some(holdout_predictions)) =
            (winner.model, winner.metrics, winner.predictions)
        else {
            self.transition(SearchState::Failed);
            return Err(AutoDsError::Training("selected candidate lost its model".into()));
        };
        let best_model_name = winner.descriptor.name.to_string();
        self.transition(SearchState::Selected {
            best: best_model_name.clone(),
        });
        info!(
            model = %best_model_name,
            metric = best_metrics.primary_name(),
            score = best_metrics.primary(),
            "Selected best model"
        );

        let feature_importances = ranked_importances(best_model.as_ref(), &feature_names);

        Ok(TrainingOutcome {
            best_model_name,
            best_model,
            task,
            target: target.name().to_string(),
            class_labels: encoded.class_labels,
            feature_names,
            candidates: candidate_reports,
            best_metrics,
            feature_importances,
            split,
            holdout_truth: y_test,
            holdout_predictions,
            warnings,
        })
    }
}

/// Fit one candidate and predict the hold-out rows. Errors and panics
/// become a recorded failure.
fn train_candidate(
    descriptor: &'static ModelDescriptor,
    ctx: &ModelContext,
    x_train: &Array2<f64>,
    y_train: &Array1<f64>,
    x_test: &Array2<f64>,
) -> (ModelResult, Option<Array1<f64>>) {
    let start = Instant::now();
    let attempt = catch_unwind(AssertUnwindSafe(|| -> Result<_> {
        let mut model = (descriptor.build)(ctx);
        model.fit(x_train, y_train)?;
        let predictions = model.predict(x_test)?;
        if predictions.len() != x_test.nrows() {
            return Err(AutoDsError::ShapeMismatch {
                expected: format!("{} predictions", x_test.nrows()),
                actual: format!("{} predictions", predictions.len()),
            });
        }
        if predictions.iter().any(|v| !v.is_finite()) {
            return Err(AutoDsError::Training("non-finite predictions".into()));
        }
        let scores = model.decision_scores(x_test)?;
        Ok((model, predictions, scores))
    }));
    let training_time_secs = start.elapsed().as_secs_f64();

    let outcome = match attempt {
        Ok(Ok(trained)) => Ok(trained),
        Ok(Err(err)) => Err(err.to_string()),
        Err(payload) => Err(panic_message(payload)),
    };

    match outcome {
        Ok((model, predictions, scores)) => (
            ModelResult {
                descriptor,
                model: Some(model),
                metrics: None,
                failure: None,
                training_time_secs,
                predictions: Some(predictions),
            },
            scores,
        ),
        Err(reason) => {
            warn!(model = descriptor.name, %reason, "Candidate failed");
            (
                ModelResult {
                    descriptor,
                    model: None,
                    metrics: None,
                    failure: Some(CandidateFailure {
                        name: descriptor.name.to_string(),
                        reason,
                    }),
                    training_time_secs,
                    predictions: None,
                },
                None,
            )
        }
    }
}

/// Pair importances with feature names, largest first (stable on ties)
fn ranked_importances(model: &dyn Estimator, feature_names: &[String]) -> Vec<FeatureImportance> {
    let Some(importances) = model.feature_importances() else {
        return Vec::new();
    };
    if importances.len() != feature_names.len() {
        return Vec::new();
    }
    let mut ranked: Vec<FeatureImportance> = feature_names
        .iter()
        .zip(importances)
        .map(|(feature, importance)| FeatureImportance {
            feature: feature.clone(),
            importance,
        })
        .collect();
    ranked.sort_by(|a, b| b.importance.total_cmp(&a.importance));
    ranked
}

/// Search with an optional task hint
pub fn search(
    features: &Dataset,
    target: &Column,
    task_hint: Option<TaskType>,
    config: &PipelineConfig,
) -> Result<TrainingOutcome> {
    ModelSearch::new(config.clone())
        .with_task_hint(task_hint)
        .run(features, target)
}
