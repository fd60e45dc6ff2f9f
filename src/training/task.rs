//! Task type detection and target encoding

use ndarray::Array1;
use serde::{Deserialize, Serialize};

use crate::config::PipelineConfig;
use crate::dataset::Column;
use crate::error::{AutoDsError, Result};

/// Type of ML task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskType {
    Classification,
    Regression,
}

impl std::fmt::Display for TaskType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskType::Classification => write!(f, "classification"),
            TaskType::Regression => write!(f, "regression"),
        }
    }
}

impl std::str::FromStr for TaskType {
    type Err = AutoDsError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "classification" | "classify" | "class" => Ok(TaskType::Classification),
            "regression" | "regress" => Ok(TaskType::Regression),
            other => Err(AutoDsError::Configuration(format!("unknown task type '{other}'"))),
        }
    }
}

/// Decides classification vs regression from the target values
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TaskDetector {
    /// Numeric targets need fewer distinct values than this ...
    pub max_distinct: usize,
    /// ... and a distinct/row ratio below this to count as classes
    pub max_distinct_ratio: f64,
}

impl Default for TaskDetector {
    fn default() -> Self {
        Self::from_config(&PipelineConfig::default())
    }
}

impl TaskDetector {
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            max_distinct: config.classification_max_distinct,
            max_distinct_ratio: config.classification_max_distinct_ratio,
        }
    }

    pub fn detect(&self, target: &Column) -> TaskType {
        if !target.is_numeric() {
            return TaskType::Classification;
        }
        let rows = target.len().max(1);
        let distinct = target.distinct_count();
        if distinct < self.max_distinct && (distinct as f64 / rows as f64) < self.max_distinct_ratio {
            TaskType::Classification
        } else {
            TaskType::Regression
        }
    }

    /// The hint when given, otherwise detection
    pub fn resolve(&self, target: &Column, hint: Option<TaskType>) -> TaskType {
        hint.unwrap_or_else(|| self.detect(target))
    }
}

/// Target values ready for fitting
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedTarget {
    pub task: TaskType,
    /// Class codes `0..C` for classification, raw values for regression
    pub values: Array1<f64>,
    /// Label for every class code; empty for regression
    pub class_labels: Vec<String>,
}

impl EncodedTarget {
    /// Encode a target column. Classes are the sorted distinct labels
    /// (numeric order for numbers, lexicographic for text).
    pub fn encode(target: &Column, task: TaskType) -> Result<Self> {
        if target.missing_count() > 0 {
            return Err(AutoDsError::Configuration(format!(
                "target column '{}' has {} missing values",
                target.name(),
                target.missing_count()
            )));
        }

        match task {
            TaskType::Regression => {
                let values = target.as_numeric().ok_or_else(|| {
                    AutoDsError::Configuration(format!(
                        "regression target '{}' is not numeric",
                        target.name()
                    ))
                })?;
                Ok(Self {
                    task,
                    values: values.iter().map(|v| v.unwrap_or(0.0)).collect(),
                    class_labels: Vec::new(),
                })
            }
            TaskType::Classification => {
                let class_labels = class_labels(target);
                let values = (0..target.len())
                    .map(|row| {
                        let label = target.display_value(row).unwrap_or_default();
                        class_labels
                            .iter()
                            .position(|l| *l == label)
                            .map(|p| p as f64)
                            .unwrap_or(0.0)
                    })
                    .collect();
                Ok(Self { task, values, class_labels })
            }
        }
    }

    pub fn n_classes(&self) -> usize {
        self.class_labels.len()
    }
}

/// Sorted distinct labels of a target column
pub fn class_labels(target: &Column) -> Vec<String> {
    match target.as_numeric() {
        Some(values) => {
            let mut distinct: Vec<f64> = values.iter().flatten().copied().collect();
            distinct.sort_by(|a, b| a.total_cmp(b));
            distinct.dedup();
            distinct.into_iter().map(crate::dataset::format_number).collect()
        }
        None => {
            let mut distinct: Vec<String> = (0..target.len())
                .filter_map(|row| target.display_value(row))
                .collect();
            distinct.sort();
            distinct.dedup();
            distinct
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_target_is_classification() {
        let target = Column::from_strs("y", &["a", "b", "c", "d"]);
        assert_eq!(TaskDetector::default().detect(&target), TaskType::Classification);
    }

    #[test]
    fn test_numeric_detection_thresholds() {
        let detector = TaskDetector::default();
        let binary = Column::from_f64("y", (0..200).map(|i| (i % 2) as f64).collect());
        assert_eq!(detector.detect(&binary), TaskType::Classification);

        let continuous = Column::from_f64("y", (0..200).map(|i| i as f64 * 0.37).collect());
        assert_eq!(detector.detect(&continuous), TaskType::Regression);

        // few distinct values but a high ratio on a tiny table
        let small = Column::from_f64("y", vec![0.0, 1.0, 0.0, 1.0]);
        assert_eq!(detector.detect(&small), TaskType::Regression);
        assert_eq!(detector.resolve(&small, Some(TaskType::Classification)), TaskType::Classification);
    }

    #[test]
    fn test_encode_classes_sorted() {
        let target = Column::from_f64("y", vec![10.0, 2.0, 10.0, 2.0, 7.0]);
        let encoded = EncodedTarget::encode(&target, TaskType::Classification).unwrap();
        assert_eq!(encoded.class_labels, vec!["2", "7", "10"]);
        assert_eq!(encoded.values.to_vec(), vec![2.0, 0.0, 2.0, 0.0, 1.0]);
    }

    #[test]
    fn test_text_regression_target_rejected() {
        let target = Column::from_strs("y", &["a", "b"]);
        assert!(matches!(
            EncodedTarget::encode(&target, TaskType::Regression),
            Err(AutoDsError::Configuration(_))
        ));
    }

    #[test]
    fn test_parse_task_type() {
        assert_eq!("Regression".parse::<TaskType>().unwrap(), TaskType::Regression);
        assert!("clustering".parse::<TaskType>().is_err());
    }
}
