//! Missing-value imputation
//!
//! Provides:
//! - simple statistics (median, mode) for columns with few gaps
//! - a KNN imputer that estimates a gap from the nearest complete rows

mod knn;
mod simple;

pub use knn::{DistanceMetric, KNNImputer, NeighborWeights};
pub use simple::{median, mode, quantile};

use crate::error::Result;
use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// How a column's gaps were filled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImputeStrategy {
    /// Column median (numeric, few gaps)
    Median,
    /// Most frequent value (categorical, few gaps)
    Mode,
    /// Mean of the k nearest rows over the other numeric columns
    NearestNeighbors { k: usize },
    /// Majority label among the k nearest rows over the numeric columns
    NeighborVote { k: usize },
    /// Neighbor imputation had no reference rows; median used instead
    MedianFallback,
    /// Neighbor vote had no reference rows; mode used instead
    ModeFallback,
}

impl std::fmt::Display for ImputeStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ImputeStrategy::Median => write!(f, "median"),
            ImputeStrategy::Mode => write!(f, "mode"),
            ImputeStrategy::NearestNeighbors { k } => write!(f, "knn (k={k})"),
            ImputeStrategy::NeighborVote { k } => write!(f, "knn vote (k={k})"),
            ImputeStrategy::MedianFallback => write!(f, "median (no neighbors)"),
            ImputeStrategy::ModeFallback => write!(f, "mode (no neighbors)"),
        }
    }
}

/// Trait for matrix imputers
pub trait Imputer: Send + Sync {
    /// Fit the imputer on data with missing values
    fn fit(&mut self, x: &Array2<f64>) -> Result<()>;

    /// Transform data by imputing missing values
    fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>>;

    /// Fit and transform in one step
    fn fit_transform(&mut self, x: &Array2<f64>) -> Result<Array2<f64>> {
        self.fit(x)?;
        self.transform(x)
    }
}

/// Check if value is missing (NaN)
#[inline]
pub fn is_missing(v: f64) -> bool {
    v.is_nan()
}
