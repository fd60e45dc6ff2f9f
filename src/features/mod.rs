//! Feature synthesis
//!
//! Turns a cleaned dataset into a numeric-only feature table:
//!
//! 1. originals, pairwise interactions, polynomials and row aggregates of
//!    the numeric columns
//! 2. one-hot or label encoding of categorical columns
//! 3. standard scaling of every feature
//! 4. univariate F-score ranking and top-K selection
//!
//! Every generated feature is recorded in a [`FeatureCatalog`]; the fitted
//! [`SynthesisPlan`] recomputes the selected features for new rows.

mod catalog;
mod encoding;
mod interactions;
mod scaler;
mod selection;

pub use catalog::{
    AggregationOp, CategoryEncoding, FeatureCatalog, FeatureEntry, InteractionOp, PolynomialOp,
    Provenance,
};
pub use scaler::StandardScaler;
pub use selection::{f_classif, f_regression, f_scores, top_k};

use ndarray::Array2;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::PipelineConfig;
use crate::dataset::{Column, ColumnKind, Dataset};
use crate::error::{AutoDsError, Result};
use crate::training::{EncodedTarget, TaskDetector, TaskType};

/// Output of [`FeatureSynthesizer::synthesize`]
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureSet {
    /// Selected, scaled features; never contains the target
    pub features: Dataset,
    /// Target column, row-aligned with `features`
    pub target: Column,
    /// Every synthesized feature, selected or not
    pub catalog: FeatureCatalog,
    pub plan: SynthesisPlan,
    /// Task used to score features
    pub task: TaskType,
}

impl FeatureSet {
    pub fn n_features(&self) -> usize {
        self.features.n_cols()
    }

    pub fn feature_names(&self) -> Vec<String> {
        self.features.column_names().into_iter().map(String::from).collect()
    }
}

/// Fitted recipe for the selected features
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynthesisPlan {
    entries: Vec<FeatureEntry>,
    scaler: StandardScaler,
}

impl SynthesisPlan {
    /// Selected features in output order
    pub fn entries(&self) -> &[FeatureEntry] {
        &self.entries
    }

    pub fn scaler(&self) -> &StandardScaler {
        &self.scaler
    }

    /// Recompute the selected features for `dataset`, which must hold the
    /// source columns seen during fitting
    pub fn apply(&self, dataset: &Dataset) -> Result<Dataset> {
        let raw = raw_matrix(&self.entries, dataset)?;
        let mut scaled = self.scaler.transform(&raw)?;
        sanitize(&mut scaled);
        to_dataset(&self.entries, &scaled, &(0..self.entries.len()).collect::<Vec<_>>())
    }
}

/// Builds a [`FeatureSet`] from a cleaned dataset
#[derive(Debug, Clone, Default)]
pub struct FeatureSynthesizer {
    config: PipelineConfig,
    task_hint: Option<TaskType>,
}

impl FeatureSynthesizer {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config, task_hint: None }
    }

    /// Score features for this task instead of detecting it from the target
    pub fn with_task_hint(mut self, task: Option<TaskType>) -> Self {
        self.task_hint = task;
        self
    }

    pub fn synthesize(&self, dataset: &Dataset, target: &str) -> Result<FeatureSet> {
        self.config.validate()?;
        let target_column = dataset.column(target).ok_or_else(|| {
            AutoDsError::Configuration(format!("target column '{target}' not found in dataset"))
        })?;

        let (numeric, categorical) = source_columns(dataset, target);
        if numeric.is_empty() && categorical.is_empty() {
            return Err(AutoDsError::Configuration(format!(
                "no feature columns besides target '{target}'"
            )));
        }

        let mut catalog = FeatureCatalog::new();
        for name in &numeric {
            catalog.insert(name, Provenance::Original, vec![name.clone()], target);
        }
        let interactions = interactions::plan_interactions(
            &mut catalog,
            dataset,
            &numeric,
            self.config.max_interaction_columns,
            target,
        )?;
        let polynomials = interactions::plan_polynomials(&mut catalog, dataset, &numeric, target)?;
        let aggregations = interactions::plan_aggregations(&mut catalog, &numeric, target);
        let mut encoded = 0;
        for name in &categorical {
            if let Some(column) = dataset.column(name) {
                encoded += encoding::plan_encoding(
                    &mut catalog,
                    column,
                    self.config.onehot_cardinality_threshold,
                    target,
                );
            }
        }
        debug!(
            originals = numeric.len(),
            interactions, polynomials, aggregations, encoded, "Planned features"
        );

        let raw = raw_matrix(catalog.entries(), dataset)?;
        let scaler = StandardScaler::fit(&raw);
        let mut scaled = scaler.transform(&raw)?;
        sanitize(&mut scaled);

        let task = TaskDetector::from_config(&self.config).resolve(target_column, self.task_hint);
        let encoded_target = EncodedTarget::encode(target_column, task)?;
        let scores = f_scores(&scaled, &encoded_target.values, task);
        let keep = top_k(&scores, self.config.max_features);

        for (i, entry) in catalog.entries_mut().iter_mut().enumerate() {
            entry.score = Some(scores[i]);
            entry.selected = keep.binary_search(&i).is_ok();
        }
        let entries: Vec<FeatureEntry> = catalog.selected().cloned().collect();
        let features = to_dataset(catalog.entries(), &scaled, &keep)?;
        let plan = SynthesisPlan {
            entries,
            scaler: scaler.subset(&keep),
        };

        info!(
            target,
            task = %task,
            synthesized = catalog.len(),
            selected = features.n_cols(),
            "Feature synthesis complete"
        );

        Ok(FeatureSet {
            features,
            target: target_column.clone(),
            catalog,
            plan,
            task,
        })
    }
}

/// Synthesize features for `target` with the detected task
pub fn synthesize(dataset: &Dataset, target: &str, config: &PipelineConfig) -> Result<FeatureSet> {
    FeatureSynthesizer::new(config.clone()).synthesize(dataset, target)
}

/// Numeric and categorical source columns, target excluded
fn source_columns(dataset: &Dataset, target: &str) -> (Vec<String>, Vec<String>) {
    let mut numeric = Vec::new();
    let mut categorical = Vec::new();
    for column in dataset.columns() {
        if column.name() == target {
            continue;
        }
        match (column.kind(), column.observed_kind()) {
            (ColumnKind::Identifier, _) => {
                debug!(column = column.name(), "Skipping identifier column");
            }
            (_, ColumnKind::Numeric) => numeric.push(column.name().to_string()),
            _ => categorical.push(column.name().to_string()),
        }
    }
    (numeric, categorical)
}

fn raw_matrix(entries: &[FeatureEntry], dataset: &Dataset) -> Result<Array2<f64>> {
    let mut x = Array2::zeros((dataset.n_rows(), entries.len()));
    for (j, entry) in entries.iter().enumerate() {
        let values = match &entry.provenance {
            Provenance::EncodedCategory(enc) => {
                let source = entry.sources.first().and_then(|s| dataset.column(s)).ok_or_else(|| {
                    AutoDsError::Configuration(format!(
                        "source column for feature '{}' is missing",
                        entry.name
                    ))
                })?;
                encoding::evaluate(enc, source)
            }
            other => interactions::evaluate(other, &entry.sources, dataset)?,
        };
        for (i, v) in values.into_iter().enumerate() {
            x[[i, j]] = v;
        }
    }
    sanitize(&mut x);
    Ok(x)
}

/// Replace NaN and infinities with 0
fn sanitize(x: &mut Array2<f64>) {
    x.mapv_inplace(|v| if v.is_finite() { v } else { 0.0 });
}

fn to_dataset(entries: &[FeatureEntry], x: &Array2<f64>, keep: &[usize]) -> Result<Dataset> {
    let columns = keep
        .iter()
        .map(|&j| Column::from_f64(entries[j].name.clone(), x.column(j).to_vec()))
        .collect();
    let mut dataset = Dataset::new(columns)?;
    if keep.is_empty() {
        dataset = Dataset::with_rows(x.nrows());
    }
    Ok(dataset)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Dataset {
        let n = 40;
        let x: Vec<f64> = (0..n).map(|i| (i as f64 * 0.37).sin() * 3.0 + i as f64 * 0.1).collect();
        let z: Vec<f64> = (0..n).map(|i| ((i * 7) % 11) as f64 + 0.5).collect();
        let color: Vec<&str> = (0..n).map(|i| ["red", "green", "blue"][i % 3]).collect();
        let y: Vec<&str> = (0..n).map(|i| if i < n / 2 { "no" } else { "yes" }).collect();
        Dataset::new(vec![
            Column::from_f64("x", x),
            Column::from_f64("z", z),
            Column::from_strs("color", &color),
            Column::from_strs("y", &y),
        ])
        .unwrap()
    }

    #[test]
    fn test_catalog_order_and_provenance() {
        let fs = synthesize(&sample(), "y", &PipelineConfig::default()).unwrap();
        let names: Vec<&str> = fs.catalog.entries().iter().map(|e| e.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "x", "z", "x_x_z", "x_div_z", "x_squared", "z_squared", "z_sqrt",
                "numeric_sum", "numeric_mean", "numeric_std",
                "color_blue", "color_green", "color_red",
            ]
        );
        assert_eq!(fs.task, TaskType::Classification);
        assert!(fs.catalog.entries().iter().all(|e| e.score.is_some()));
    }

    #[test]
    fn test_max_features_and_no_target() {
        let config = PipelineConfig::default().with_max_features(4);
        let fs = synthesize(&sample(), "y", &config).unwrap();
        assert_eq!(fs.n_features(), 4);
        assert!(!fs.features.contains("y"));
        assert_eq!(fs.catalog.selected().count(), 4);
        assert!(fs.features.columns().iter().all(|c| c.is_numeric()));
    }

    #[test]
    fn test_missing_target_is_configuration_error() {
        let err = synthesize(&sample(), "nope", &PipelineConfig::default()).unwrap_err();
        assert!(matches!(err, AutoDsError::Configuration(_)));
    }

    #[test]
    fn test_target_only_is_configuration_error() {
        let ds = Dataset::new(vec![Column::from_strs("y", &["a", "b"])]).unwrap();
        let err = synthesize(&ds, "y", &PipelineConfig::default()).unwrap_err();
        assert!(matches!(err, AutoDsError::Configuration(_)));
    }

    #[test]
    fn test_plan_reapplies_to_same_rows() {
        let ds = sample();
        let fs = synthesize(&ds, "y", &PipelineConfig::default().with_max_features(6)).unwrap();
        let again = fs.plan.apply(&ds).unwrap();
        assert_eq!(again, fs.features);
    }

    #[test]
    fn test_unseen_category_encodes_to_zero_before_scaling() {
        let ds = sample();
        let fs = synthesize(&ds, "y", &PipelineConfig::default()).unwrap();
        let new_rows = Dataset::new(vec![
            Column::from_f64("x", vec![1.0]),
            Column::from_f64("z", vec![2.0]),
            Column::from_strs("color", &["purple"]),
        ])
        .unwrap();
        let out = fs.plan.apply(&new_rows).unwrap();
        assert_eq!(out.n_rows(), 1);
        assert_eq!(out.n_cols(), fs.n_features());
    }
}
