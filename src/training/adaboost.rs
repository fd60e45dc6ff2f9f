//! AdaBoost (Adaptive Boosting) implementation
//!
//! AdaBoost builds an ensemble of weak learners (decision stumps), weighting
//! misclassified samples more heavily in subsequent rounds.

use ndarray::{Array1, Array2, ArrayView1};
use serde::{Deserialize, Serialize};

use super::models::{argmax, check_training_data, n_classes_of, normalize, Estimator};
use crate::error::{AutoDsError, Result};

/// A single decision stump: splits on one feature at one threshold
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Stump {
    feature_index: usize,
    threshold: f64,
    /// Class code when feature <= threshold
    left_label: usize,
    /// Class code when feature > threshold
    right_label: usize,
}

impl Stump {
    fn predict_sample(&self, sample: ArrayView1<f64>) -> usize {
        if self.threshold == f64::INFINITY || sample[self.feature_index] <= self.threshold {
            self.left_label
        } else {
            self.right_label
        }
    }
}

/// AdaBoost Classifier (SAMME variant, supports multi-class)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdaBoostClassifier {
    pub n_estimators: usize,
    pub learning_rate: f64,
    stumps: Vec<Stump>,
    alphas: Vec<f64>,
    n_classes: usize,
    n_features: usize,
}

impl Default for AdaBoostClassifier {
    fn default() -> Self {
        Self::new(50, 1.0)
    }
}

impl AdaBoostClassifier {
    pub fn new(n_estimators: usize, learning_rate: f64) -> Self {
        Self {
            n_estimators: n_estimators.max(1),
            learning_rate,
            stumps: Vec::new(),
            alphas: Vec::new(),
            n_classes: 0,
            n_features: 0,
        }
    }

    pub fn with_n_classes(mut self, n_classes: usize) -> Self {
        self.n_classes = n_classes;
        self
    }

    pub fn is_fitted(&self) -> bool {
        !self.stumps.is_empty()
    }

    /// Lowest weighted-error stump, found by sweeping each feature in value
    /// order while moving class weight from the right side to the left
    fn fit_stump(x: &Array2<f64>, y: &[usize], weights: &[f64], n_classes: usize) -> (Stump, f64) {
        let mut totals = vec![0.0; n_classes];
        for (&c, &w) in y.iter().zip(weights) {
            totals[c] += w;
        }
        let total: f64 = totals.iter().sum();
        let majority = argmax(ArrayView1::from(&totals[..]));

        let mut best = Stump {
            feature_index: 0,
            threshold: f64::INFINITY,
            left_label: majority,
            right_label: majority,
        };
        let mut best_error = total - totals[majority];

        for f in 0..x.ncols() {
            let col = x.column(f);
            let mut order: Vec<usize> = (0..y.len()).collect();
            order.sort_by(|&a, &b| col[a].total_cmp(&col[b]));

            let mut left = vec![0.0; n_classes];
            for k in 0..order.len() - 1 {
                let i = order[k];
                left[y[i]] += weights[i];
                if col[i] == col[order[k + 1]] {
                    continue;
                }
                let right: Vec<f64> = totals.iter().zip(&left).map(|(t, l)| t - l).collect();
                let left_label = argmax(ArrayView1::from(&left[..]));
                let right_label = argmax(ArrayView1::from(&right[..]));
                let error = total - left[left_label] - right[right_label];
                if error < best_error - 1e-12 {
                    best_error = error;
                    best = Stump {
                        feature_index: f,
                        threshold: (col[i] + col[order[k + 1]]) / 2.0,
                        left_label,
                        right_label,
                    };
                }
            }
        }
        (best, best_error / total.max(f64::MIN_POSITIVE))
    }

    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        check_training_data(x, y)?;
        let n_samples = x.nrows();
        self.n_classes = n_classes_of(y, self.n_classes).max(2);
        self.n_features = x.ncols();
        let k = self.n_classes as f64;
        let labels: Vec<usize> = y.iter().map(|&c| c as usize).collect();
        let mut weights = vec![1.0 / n_samples as f64; n_samples];

        self.stumps.clear();
        self.alphas.clear();

        for _round in 0..self.n_estimators {
            let (stump, error) = Self::fit_stump(x, &labels, &weights, self.n_classes);

            // No better than chance: stop unless nothing has been learned yet
            if error >= 1.0 - 1.0 / k && !self.stumps.is_empty() {
                break;
            }
            let clamped = error.clamp(1e-10, 1.0 - 1e-10);
            let alpha = self.learning_rate * (((1.0 - clamped) / clamped).ln() + (k - 1.0).ln());

            let mut any_wrong = false;
            for (i, row) in x.rows().into_iter().enumerate() {
                if stump.predict_sample(row) != labels[i] {
                    weights[i] *= alpha.exp();
                    any_wrong = true;
                }
            }
            let w_sum: f64 = weights.iter().sum();
            if w_sum > 0.0 && w_sum.is_finite() {
                weights.iter_mut().for_each(|w| *w /= w_sum);
            }

            self.stumps.push(stump);
            self.alphas.push(alpha);
            if !any_wrong {
                break;
            }
        }
        Ok(self)
    }

    /// Alpha-weighted votes per class
    fn class_scores(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        if !self.is_fitted() {
            return Err(AutoDsError::ModelNotFitted);
        }
        let mut scores = Array2::zeros((x.nrows(), self.n_classes));
        for (i, row) in x.rows().into_iter().enumerate() {
            for (stump, &alpha) in self.stumps.iter().zip(&self.alphas) {
                scores[[i, stump.predict_sample(row)]] += alpha;
            }
        }
        Ok(scores)
    }

    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let scores = self.class_scores(x)?;
        Ok(scores.rows().into_iter().map(|row| argmax(row) as f64).collect())
    }

    /// Softmax of the class votes
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        let mut proba = self.class_scores(x)?;
        for mut row in proba.rows_mut() {
            let max_score = row.fold(f64::NEG_INFINITY, |m, &v| m.max(v));
            row.mapv_inplace(|s| (s - max_score).exp());
            let sum = row.sum();
            row /= sum;
        }
        Ok(proba)
    }

    /// Alpha-weighted stump feature usage
    pub fn feature_importances(&self) -> Option<Vec<f64>> {
        if !self.is_fitted() {
            return None;
        }
        let mut importances = vec![0.0; self.n_features];
        for (stump, &alpha) in self.stumps.iter().zip(&self.alphas) {
            // Constant stumps carry no feature
            if stump.threshold.is_finite() {
                importances[stump.feature_index] += alpha.abs();
            }
        }
        normalize(&mut importances);
        Some(importances)
    }
}

impl Estimator for AdaBoostClassifier {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        AdaBoostClassifier::fit(self, x, y).map(|_| ())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        AdaBoostClassifier::predict(self, x)
    }

    fn decision_scores(&self, x: &Array2<f64>) -> Result<Option<Array1<f64>>> {
        if self.n_classes != 2 {
            return Ok(None);
        }
        Ok(Some(self.predict_proba(x)?.column(1).to_owned()))
    }

    fn feature_importances(&self) -> Option<Vec<f64>> {
        AdaBoostClassifier::feature_importances(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_adaboost_binary() {
        let x = array![[1.0, 2.0], [2.0, 3.0], [3.0, 4.0], [6.0, 7.0], [7.0, 8.0], [8.0, 9.0]];
        let y = array![0.0, 0.0, 0.0, 1.0, 1.0, 1.0];
        let mut model = AdaBoostClassifier::new(10, 1.0);
        model.fit(&x, &y).unwrap();
        assert!(model.is_fitted());
        assert_eq!(model.predict(&x).unwrap(), y);
    }

    #[test]
    fn test_adaboost_multiclass() {
        let x = array![[0.0], [1.0], [2.0], [5.0], [6.0], [7.0], [10.0], [11.0], [12.0]];
        let y = array![0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 2.0, 2.0, 2.0];
        let mut model = AdaBoostClassifier::new(3, 1.0);
        model.fit(&x, &y).unwrap();
        assert_eq!(model.predict(&x).unwrap(), y);
    }

    #[test]
    fn test_adaboost_predict_proba() {
        let x = array![[0.0, 0.0], [1.0, 1.0], [5.0, 5.0], [6.0, 6.0]];
        let y = array![0.0, 0.0, 1.0, 1.0];
        let mut model = AdaBoostClassifier::new(20, 1.0);
        model.fit(&x, &y).unwrap();
        let proba = model.predict_proba(&x).unwrap();
        assert_eq!(proba.dim(), (4, 2));
        assert!(proba[[3, 1]] > proba[[0, 1]]);
    }
}
