//! Estimator trait shared by every candidate model

use ndarray::{Array1, Array2, ArrayView1};

use crate::error::{AutoDsError, Result};

/// A trainable model. Classification targets are class codes `0..C`.
pub trait Estimator: Send + std::fmt::Debug {
    /// Fit the model to training data
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()>;

    /// Predicted class codes or regression values
    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>>;

    /// Score of the positive class (code 1), for ranking metrics. Only
    /// binary classifiers that can rank samples return `Some`.
    fn decision_scores(&self, _x: &Array2<f64>) -> Result<Option<Array1<f64>>> {
        Ok(None)
    }

    /// Per-feature importance, if the model has a notion of it
    fn feature_importances(&self) -> Option<Vec<f64>> {
        None
    }
}

/// Reject mismatched or empty training data
pub(crate) fn check_training_data(x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
    if x.nrows() != y.len() {
        return Err(AutoDsError::ShapeMismatch {
            expected: format!("y length = {}", x.nrows()),
            actual: format!("y length = {}", y.len()),
        });
    }
    if x.nrows() == 0 {
        return Err(AutoDsError::Training("no training rows".to_string()));
    }
    Ok(())
}

/// Number of classes implied by the codes in `y`
pub(crate) fn n_classes_of(y: &Array1<f64>, at_least: usize) -> usize {
    let observed = y.iter().map(|&c| c.max(0.0) as usize + 1).max().unwrap_or(0);
    observed.max(at_least)
}

/// Index of the largest value; the first one wins ties
pub(crate) fn argmax(values: ArrayView1<f64>) -> usize {
    let mut best = 0;
    for (i, &v) in values.iter().enumerate() {
        if v > values[best] {
            best = i;
        }
    }
    best
}

/// Scale importances so they sum to 1
pub(crate) fn normalize(importances: &mut [f64]) {
    let total: f64 = importances.iter().sum();
    if total > 0.0 {
        for imp in importances.iter_mut() {
            *imp /= total;
        }
    }
}
