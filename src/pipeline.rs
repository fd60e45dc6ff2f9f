//! End-to-end orchestration
//!
//! [`AutoPipeline::run`] checks the raw dataset, picks the target when none
//! is given, then runs clean -> synthesize -> search. Each stage gets its own
//! input and produces a new value, so every intermediate result stays
//! available on the returned [`PipelineRun`].

use std::fmt::Write as _;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::cleaning::{detect_target, Cleaner, CleaningReport, DefaultTargetPolicy, TargetPolicy};
use crate::config::PipelineConfig;
use crate::dataset::{ColumnKind, Dataset, DatasetProfile};
use crate::error::{AutoDsError, Result};
use crate::features::{FeatureSet, FeatureSynthesizer};
use crate::training::{ModelSearch, OutcomeSummary, Predictions, TaskType, TrainingOutcome};

/// Smallest dataset the pipeline accepts
pub const MIN_ROWS: usize = 10;
pub const MIN_COLUMNS: usize = 2;

/// Runs every stage with one configuration
pub struct AutoPipeline {
    config: PipelineConfig,
    target: Option<String>,
    task_hint: Option<TaskType>,
    target_policy: Box<dyn TargetPolicy>,
}

impl Default for AutoPipeline {
    fn default() -> Self {
        Self::new(PipelineConfig::default())
    }
}

impl AutoPipeline {
    pub fn new(config: PipelineConfig) -> Self {
        let target_policy = Box::new(DefaultTargetPolicy {
            max_unique_ratio: config.target_max_unique_ratio,
        });
        Self {
            config,
            target: None,
            task_hint: None,
            target_policy,
        }
    }

    /// Use this target instead of auto-detecting one
    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    pub fn with_task_hint(mut self, task: Option<TaskType>) -> Self {
        self.task_hint = task;
        self
    }

    /// Replace the target auto-detection heuristic
    pub fn with_target_policy(mut self, policy: impl TargetPolicy + 'static) -> Self {
        self.target_policy = Box::new(policy);
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Reject datasets too small or too poor to model
    pub fn preflight(&self, dataset: &Dataset) -> Result<()> {
        if dataset.n_cols() < MIN_COLUMNS {
            return Err(AutoDsError::Configuration(format!(
                "dataset must have at least {MIN_COLUMNS} columns, found {}",
                dataset.n_cols()
            )));
        }
        if dataset.n_rows() < MIN_ROWS {
            return Err(AutoDsError::Configuration(format!(
                "dataset must have at least {MIN_ROWS} rows, found {}",
                dataset.n_rows()
            )));
        }
        if !dataset
            .columns()
            .iter()
            .any(|c| c.observed_kind() == ColumnKind::Numeric)
        {
            return Err(AutoDsError::Configuration(
                "dataset has no numeric columns".to_string(),
            ));
        }
        Ok(())
    }

    /// The configured target if present in `dataset`, else the detected one
    pub fn resolve_target(&self, dataset: &Dataset) -> Result<String> {
        match &self.target {
            Some(name) if dataset.contains(name) => Ok(name.clone()),
            Some(name) => Err(AutoDsError::Configuration(format!(
                "target column '{name}' not found; available columns: {}",
                dataset.column_names().join(", ")
            ))),
            None => detect_target(dataset, self.target_policy.as_ref()),
        }
    }

    pub fn run(&self, dataset: &Dataset) -> Result<PipelineRun> {
        let started_at = Utc::now();
        let start = Instant::now();
        self.config.validate()?;
        self.preflight(dataset)?;

        let target = self.resolve_target(dataset)?;
        let profile = dataset.profile();
        info!(
            rows = dataset.n_rows(),
            columns = dataset.n_cols(),
            target = %target,
            "Starting pipeline"
        );

        let (cleaned, cleaning_report) = Cleaner::new(self.config.clone()).clean(dataset)?;
        if !cleaned.contains(&target) {
            let reason = cleaning_report
                .dropped_columns()
                .into_iter()
                .find(|(name, _)| *name == target)
                .map(|(_, reason)| reason.to_string())
                .unwrap_or_else(|| "removed".to_string());
            return Err(AutoDsError::Configuration(format!(
                "target column '{target}' was dropped during cleaning ({reason})"
            )));
        }

        let features = FeatureSynthesizer::new(self.config.clone())
            .with_task_hint(self.task_hint)
            .synthesize(&cleaned, &target)?;

        let outcome = ModelSearch::new(self.config.clone())
            .with_task_hint(Some(features.task))
            .run(&features.features, &features.target)?;

        let elapsed_secs = start.elapsed().as_secs_f64();
        info!(
            best = %outcome.best_model_name,
            score = outcome.best_score(),
            secs = elapsed_secs,
            "Pipeline finished"
        );

        Ok(PipelineRun {
            target,
            started_at,
            elapsed_secs,
            profile,
            cleaned,
            cleaning_report,
            features,
            outcome,
        })
    }
}

/// Every stage output of one run
#[derive(Debug)]
pub struct PipelineRun {
    pub target: String,
    pub started_at: DateTime<Utc>,
    pub elapsed_secs: f64,
    /// Profile of the raw input
    pub profile: DatasetProfile,
    pub cleaned: Dataset,
    pub cleaning_report: CleaningReport,
    pub features: FeatureSet,
    pub outcome: TrainingOutcome,
}

/// Serializable digest of a [`PipelineRun`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub target: String,
    pub task: TaskType,
    pub started_at: DateTime<Utc>,
    pub elapsed_secs: f64,
    pub raw_rows: usize,
    pub raw_columns: usize,
    pub cleaning: CleaningReport,
    pub features_generated: usize,
    pub features_selected: Vec<String>,
    pub features_by_provenance: Vec<(String, usize)>,
    pub model_search: OutcomeSummary,
}

impl PipelineRun {
    pub fn summary(&self) -> RunSummary {
        RunSummary {
            target: self.target.clone(),
            task: self.outcome.task,
            started_at: self.started_at,
            elapsed_secs: self.elapsed_secs,
            raw_rows: self.profile.n_rows,
            raw_columns: self.profile.n_cols,
            cleaning: self.cleaning_report.clone(),
            features_generated: self.features.catalog.len(),
            features_selected: self.features.feature_names(),
            features_by_provenance: self
                .features
                .catalog
                .counts_by_provenance()
                .into_iter()
                .map(|(label, count)| (label.to_string(), count))
                .collect(),
            model_search: self.outcome.summary(),
        }
    }

    /// Plain-text report of the run
    pub fn summary_text(&self) -> String {
        let mut out = String::new();
        let outcome = &self.outcome;
        let _ = writeln!(out, "=== autods run report ===");
        let _ = writeln!(out, "Started:   {}", self.started_at.format("%Y-%m-%d %H:%M:%S UTC"));
        let _ = writeln!(out, "Duration:  {:.2}s", self.elapsed_secs);
        let _ = writeln!(out, "Target:    {} ({})", self.target, outcome.task);
        let _ = writeln!(out);

        let _ = writeln!(out, "--- Cleaning ---");
        for line in self.cleaning_report.summary_lines() {
            let _ = writeln!(out, "  {line}");
        }
        let _ = writeln!(out);

        let _ = writeln!(out, "--- Features ---");
        let _ = writeln!(
            out,
            "  generated {}, selected {}",
            self.features.catalog.len(),
            self.features.n_features()
        );
        for (label, count) in self.features.catalog.counts_by_provenance() {
            let _ = writeln!(out, "  {label:<12} {count}");
        }
        let _ = writeln!(out);

        let _ = writeln!(out, "--- Models ({}) ---", outcome.primary_metric_name());
        for candidate in &outcome.candidates {
            match (&candidate.metrics, &candidate.failure) {
                (Some(metrics), _) => {
                    let marker = if candidate.name == outcome.best_model_name { "*" } else { " " };
                    let _ = writeln!(
                        out,
                        "{marker} {:<22} {:.4}  ({:.2}s)",
                        candidate.name,
                        metrics.primary(),
                        candidate.training_time_secs
                    );
                }
                (None, failure) => {
                    let _ = writeln!(
                        out,
                        "  {:<22} failed: {}",
                        candidate.name,
                        failure.as_deref().unwrap_or("unknown error")
                    );
                }
            }
        }
        let _ = writeln!(out);

        let _ = writeln!(out, "--- Best model: {} ---", outcome.best_model_name);
        for (name, value) in outcome.best_metrics.entries() {
            let _ = writeln!(out, "  {name:<10} {value:.4}");
        }
        if let Some(m) = outcome.best_metrics.as_classification() {
            let _ = writeln!(out, "  confusion matrix (rows = truth):");
            for (label, row) in outcome.class_labels.iter().zip(&m.confusion_matrix) {
                let cells: Vec<String> = row.iter().map(|c| format!("{c:>5}")).collect();
                let _ = writeln!(out, "    {label:<12}{}", cells.join(""));
            }
        }
        if !outcome.feature_importances.is_empty() {
            let _ = writeln!(out, "  top features:");
            for fi in outcome.feature_importances.iter().take(10) {
                let _ = writeln!(out, "    {:<24} {:.4}", fi.feature, fi.importance);
            }
        }

        let warnings: Vec<String> = self
            .cleaning_report
            .warnings()
            .iter()
            .map(ToString::to_string)
            .chain(outcome.warnings.iter().map(ToString::to_string))
            .collect();
        if !warnings.is_empty() {
            let _ = writeln!(out);
            let _ = writeln!(out, "--- Warnings ---");
            for w in warnings {
                let _ = writeln!(out, "  {w}");
            }
        }
        out
    }

    /// Recompute the selected features for raw rows and predict with the winner
    pub fn predict(&self, rows: &Dataset) -> Result<Predictions> {
        let features = self.features.plan.apply(rows)?;
        self.outcome.predict(&features)
    }
}

/// Run the whole pipeline with an optional explicit target
pub fn run(dataset: &Dataset, target: Option<&str>, config: &PipelineConfig) -> Result<PipelineRun> {
    let mut pipeline = AutoPipeline::new(config.clone());
    if let Some(target) = target {
        pipeline = pipeline.with_target(target);
    }
    pipeline.run(dataset)
}
