//! Model search and the candidate models it trains
//!
//! Candidates:
//! - Decision trees and Random Forests
//! - Gradient boosting and AdaBoost
//! - Linear models (OLS, Ridge, Lasso, Logistic)
//! - K-Nearest Neighbors
//! - Gaussian Naive Bayes
//!
//! Every candidate implements [`Estimator`] and is listed once in the static
//! [`registry::REGISTRY`]; [`ModelSearch`] trains them in declaration order.

mod models;
mod task;
pub mod adaboost;
pub mod decision_tree;
pub mod gradient_boosting;
pub mod knn;
pub mod linear_models;
pub mod metrics;
pub mod naive_bayes;
pub mod random_forest;
pub mod registry;
pub mod search;
pub mod split;

pub use adaboost::AdaBoostClassifier;
pub use decision_tree::{Criterion, DecisionTree, TreeNode};
pub use gradient_boosting::{GradientBoostingClassifier, GradientBoostingConfig, GradientBoostingRegressor};
pub use knn::{DistanceMetric, KNNClassifier, KNNConfig, KNNRegressor, WeightScheme};
pub use linear_models::{LassoRegression, LinearRegression, LogisticRegression, RidgeRegression};
pub use metrics::{ClassificationMetrics, Metrics, RegressionMetrics, RocCurve};
pub use models::Estimator;
pub use naive_bayes::GaussianNaiveBayes;
pub use random_forest::{MaxFeatures, RandomForest};
pub use registry::{ModelContext, ModelDescriptor, TaskApplicability, REGISTRY};
pub use search::{
    search, CandidateReport, FeatureImportance, ModelResult, ModelSearch, OutcomeSummary, Predictions,
    SearchState, SearchWarning, TrainingOutcome,
};
pub use split::{train_test_split, SplitFallback, TrainTestSplit};
pub use task::{class_labels, EncodedTarget, TaskDetector, TaskType};
