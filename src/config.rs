//! Pipeline configuration
//!
//! One flat set of knobs shared by every stage. Each stage calls
//! [`PipelineConfig::validate`] before touching data.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AutoDsError, Result};
use crate::training::registry::{self, ModelDescriptor};

/// Configuration for a full clean → synthesize → search run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Missing fraction below which median/mode imputation is used
    pub missing_low_threshold: f64,

    /// Missing fraction above which a column is dropped
    pub missing_high_threshold: f64,

    /// Multiplier applied to the IQR when computing capping bounds
    pub outlier_iqr_multiplier: f64,

    /// Categorical columns with fewer distinct values are one-hot encoded,
    /// the rest are label encoded
    pub onehot_cardinality_threshold: usize,

    /// Number of features kept by univariate selection
    pub max_features: usize,

    /// Fraction of rows held out for scoring
    pub test_fraction: f64,

    /// Seed for splitting and any model stochasticity
    pub random_seed: u64,

    /// Restrict the model registry to these names (declaration order is kept)
    pub candidate_models: Option<Vec<String>>,

    /// Neighbors used by KNN imputation
    pub knn_neighbors: usize,

    /// Numeric columns considered for pairwise interactions
    pub max_interaction_columns: usize,

    /// Numeric targets with fewer distinct values may be classification
    pub classification_max_distinct: usize,

    /// ... provided distinct/rows is also below this ratio
    pub classification_max_distinct_ratio: f64,

    /// Target auto-detection rejects columns more unique than this ratio
    pub target_max_unique_ratio: f64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            missing_low_threshold: 0.05,
            missing_high_threshold: 0.5,
            outlier_iqr_multiplier: 3.0,
            onehot_cardinality_threshold: 10,
            max_features: 50,
            test_fraction: 0.2,
            random_seed: 42,
            candidate_models: None,
            knn_neighbors: 5,
            max_interaction_columns: 5,
            classification_max_distinct: 20,
            classification_max_distinct_ratio: 0.05,
            target_max_unique_ratio: 0.8,
        }
    }
}

impl PipelineConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a configuration from a JSON file; absent keys keep their defaults
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_missing_thresholds(mut self, low: f64, high: f64) -> Self {
        self.missing_low_threshold = low;
        self.missing_high_threshold = high;
        self
    }

    pub fn with_outlier_multiplier(mut self, multiplier: f64) -> Self {
        self.outlier_iqr_multiplier = multiplier;
        self
    }

    pub fn with_onehot_threshold(mut self, threshold: usize) -> Self {
        self.onehot_cardinality_threshold = threshold;
        self
    }

    pub fn with_max_features(mut self, k: usize) -> Self {
        self.max_features = k;
        self
    }

    pub fn with_test_fraction(mut self, fraction: f64) -> Self {
        self.test_fraction = fraction;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.random_seed = seed;
        self
    }

    /// Restrict the search to the named registry entries
    pub fn with_candidate_models<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.candidate_models = Some(names.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_knn_neighbors(mut self, k: usize) -> Self {
        self.knn_neighbors = k;
        self
    }

    pub fn with_max_interaction_columns(mut self, n: usize) -> Self {
        self.max_interaction_columns = n;
        self
    }

    /// Reject settings no stage could honor
    pub fn validate(&self) -> Result<()> {
        self.validate_against(registry::REGISTRY)
    }

    /// [`validate`](Self::validate), resolving `candidate_models` in `models`
    pub fn validate_against(&self, models: &[ModelDescriptor]) -> Result<()> {
        let fraction = |name: &str, v: f64| -> Result<()> {
            if !(0.0..=1.0).contains(&v) {
                return Err(AutoDsError::Configuration(format!(
                    "{name} must be within [0, 1], got {v}"
                )));
            }
            Ok(())
        };

        fraction("missing_low_threshold", self.missing_low_threshold)?;
        fraction("missing_high_threshold", self.missing_high_threshold)?;
        fraction("classification_max_distinct_ratio", self.classification_max_distinct_ratio)?;
        fraction("target_max_unique_ratio", self.target_max_unique_ratio)?;

        if self.missing_low_threshold > self.missing_high_threshold {
            return Err(AutoDsError::Configuration(format!(
                "missing_low_threshold ({}) exceeds missing_high_threshold ({})",
                self.missing_low_threshold, self.missing_high_threshold
            )));
        }
        if !(self.test_fraction > 0.0 && self.test_fraction < 1.0) {
            return Err(AutoDsError::Configuration(format!(
                "test_fraction must be strictly between 0 and 1, got {}",
                self.test_fraction
            )));
        }
        if !self.outlier_iqr_multiplier.is_finite() || self.outlier_iqr_multiplier < 0.0 {
            return Err(AutoDsError::Configuration(format!(
                "outlier_iqr_multiplier must be a non-negative number, got {}",
                self.outlier_iqr_multiplier
            )));
        }
        if self.max_features == 0 {
            return Err(AutoDsError::Configuration("max_features must be at least 1".into()));
        }
        if self.knn_neighbors == 0 {
            return Err(AutoDsError::Configuration("knn_neighbors must be at least 1".into()));
        }

        if let Some(names) = &self.candidate_models {
            if names.is_empty() {
                return Err(AutoDsError::Configuration("candidate_models is empty".into()));
            }
            for name in names {
                if registry::find_in(models, name).is_none() {
                    return Err(AutoDsError::Configuration(format!(
                        "unknown candidate model '{name}'"
                    )));
                }
            }
        }
        Ok(())
    }
}
