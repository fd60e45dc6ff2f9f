//! Static registry of candidate models
//!
//! Entries are tried in declaration order, which also breaks ties between
//! candidates with equal scores.

use serde::{Deserialize, Serialize};

use super::adaboost::AdaBoostClassifier;
use super::decision_tree::DecisionTree;
use super::gradient_boosting::{GradientBoostingClassifier, GradientBoostingConfig, GradientBoostingRegressor};
use super::knn::{KNNClassifier, KNNRegressor};
use super::linear_models::{LassoRegression, LinearRegression, LogisticRegression, RidgeRegression};
use super::models::Estimator;
use super::naive_bayes::GaussianNaiveBayes;
use super::random_forest::RandomForest;
use super::TaskType;
use crate::config::PipelineConfig;

/// Which tasks a registry entry can train for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskApplicability {
    Classification,
    Regression,
    Both,
}

impl TaskApplicability {
    pub fn supports(self, task: TaskType) -> bool {
        matches!(
            (self, task),
            (TaskApplicability::Both, _)
                | (TaskApplicability::Classification, TaskType::Classification)
                | (TaskApplicability::Regression, TaskType::Regression)
        )
    }
}

impl std::fmt::Display for TaskApplicability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskApplicability::Classification => write!(f, "classification"),
            TaskApplicability::Regression => write!(f, "regression"),
            TaskApplicability::Both => write!(f, "classification, regression"),
        }
    }
}

/// Everything a constructor needs to build an untrained model
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelContext {
    pub task: TaskType,
    /// Distinct class count; 0 for regression
    pub n_classes: usize,
    pub seed: u64,
    pub knn_neighbors: usize,
}

impl ModelContext {
    pub fn new(task: TaskType, n_classes: usize, config: &PipelineConfig) -> Self {
        Self {
            task,
            n_classes,
            seed: config.random_seed,
            knn_neighbors: config.knn_neighbors,
        }
    }

    fn is_classification(&self) -> bool {
        self.task == TaskType::Classification
    }
}

/// A registry entry: name, applicability and constructor
#[derive(Clone, Copy)]
pub struct ModelDescriptor {
    pub name: &'static str,
    pub applicability: TaskApplicability,
    pub build: fn(&ModelContext) -> Box<dyn Estimator>,
}

impl std::fmt::Debug for ModelDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelDescriptor")
            .field("name", &self.name)
            .field("applicability", &self.applicability)
            .finish()
    }
}

fn random_forest(ctx: &ModelContext) -> Box<dyn Estimator> {
    let forest = if ctx.is_classification() {
        RandomForest::new_classifier(100, ctx.n_classes)
    } else {
        RandomForest::new_regressor(100)
    };
    Box::new(forest.with_random_state(ctx.seed))
}

fn gradient_boosting(ctx: &ModelContext) -> Box<dyn Estimator> {
    let config = GradientBoostingConfig {
        random_state: ctx.seed,
        ..Default::default()
    };
    if ctx.is_classification() {
        Box::new(GradientBoostingClassifier::new(config, ctx.n_classes))
    } else {
        Box::new(GradientBoostingRegressor::new(config))
    }
}

fn logistic_regression(ctx: &ModelContext) -> Box<dyn Estimator> {
    Box::new(LogisticRegression::new().with_n_classes(ctx.n_classes))
}

fn linear_regression(_ctx: &ModelContext) -> Box<dyn Estimator> {
    Box::new(LinearRegression::new())
}

fn ridge_regression(_ctx: &ModelContext) -> Box<dyn Estimator> {
    Box::new(RidgeRegression::new(1.0))
}

fn lasso_regression(_ctx: &ModelContext) -> Box<dyn Estimator> {
    Box::new(LassoRegression::new(1.0))
}

fn decision_tree(ctx: &ModelContext) -> Box<dyn Estimator> {
    let tree = if ctx.is_classification() {
        DecisionTree::new_classifier(ctx.n_classes)
    } else {
        DecisionTree::new_regressor()
    };
    Box::new(tree.with_random_state(ctx.seed))
}

fn k_nearest_neighbors(ctx: &ModelContext) -> Box<dyn Estimator> {
    if ctx.is_classification() {
        Box::new(KNNClassifier::with_k(ctx.knn_neighbors).with_n_classes(ctx.n_classes))
    } else {
        Box::new(KNNRegressor::with_k(ctx.knn_neighbors))
    }
}

fn naive_bayes(ctx: &ModelContext) -> Box<dyn Estimator> {
    Box::new(GaussianNaiveBayes::new().with_n_classes(ctx.n_classes))
}

fn adaboost(ctx: &ModelContext) -> Box<dyn Estimator> {
    Box::new(AdaBoostClassifier::new(100, 1.0).with_n_classes(ctx.n_classes))
}

/// Every candidate model, in declaration order
pub static REGISTRY: &[ModelDescriptor] = &[
    ModelDescriptor {
        name: "Random Forest",
        applicability: TaskApplicability::Both,
        build: random_forest,
    },
    ModelDescriptor {
        name: "Gradient Boosting",
        applicability: TaskApplicability::Both,
        build: gradient_boosting,
    },
    ModelDescriptor {
        name: "Logistic Regression",
        applicability: TaskApplicability::Classification,
        build: logistic_regression,
    },
    ModelDescriptor {
        name: "Linear Regression",
        applicability: TaskApplicability::Regression,
        build: linear_regression,
    },
    ModelDescriptor {
        name: "Ridge Regression",
        applicability: TaskApplicability::Regression,
        build: ridge_regression,
    },
    ModelDescriptor {
        name: "Lasso Regression",
        applicability: TaskApplicability::Regression,
        build: lasso_regression,
    },
    ModelDescriptor {
        name: "Decision Tree",
        applicability: TaskApplicability::Both,
        build: decision_tree,
    },
    ModelDescriptor {
        name: "K-Nearest Neighbors",
        applicability: TaskApplicability::Both,
        build: k_nearest_neighbors,
    },
    ModelDescriptor {
        name: "Naive Bayes",
        applicability: TaskApplicability::Classification,
        build: naive_bayes,
    },
    ModelDescriptor {
        name: "AdaBoost",
        applicability: TaskApplicability::Classification,
        build: adaboost,
    },
];

/// Look up a registry entry by name (case-insensitive)
pub fn find(name: &str) -> Option<&'static ModelDescriptor> {
    find_in(REGISTRY, name)
}

pub fn find_in<'a>(models: &'a [ModelDescriptor], name: &str) -> Option<&'a ModelDescriptor> {
    models.iter().find(|d| d.name.eq_ignore_ascii_case(name.trim()))
}

/// Entries that apply to `task`, restricted to `candidate_models` when set,
/// in declaration order
pub fn applicable(task: TaskType, config: &PipelineConfig) -> Vec<&'static ModelDescriptor> {
    applicable_in(REGISTRY, task, config)
}

/// [`applicable`] over a caller-supplied model table
pub fn applicable_in<'a>(
    models: &'a [ModelDescriptor],
    task: TaskType,
    config: &PipelineConfig,
) -> Vec<&'a ModelDescriptor> {
    models
        .iter()
        .filter(|d| d.applicability.supports(task))
        .filter(|d| match &config.candidate_models {
            Some(names) => names.iter().any(|n| d.name.eq_ignore_ascii_case(n.trim())),
            None => true,
        })
        .collect()
}
