//! Gaussian Naive Bayes for continuous features

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

use super::models::{argmax, check_training_data, n_classes_of, Estimator};
use crate::error::{AutoDsError, Result};

/// Gaussian Naive Bayes Classifier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GaussianNaiveBayes {
    /// Mean of each feature, per class code
    means: Vec<Vec<f64>>,
    /// Variance of each feature, per class code
    variances: Vec<Vec<f64>>,
    /// Prior probability per class code; 0 for classes absent in training
    priors: Vec<f64>,
    /// Added to every variance, relative to the largest feature variance
    var_smoothing: f64,
    n_classes: usize,
}

impl Default for GaussianNaiveBayes {
    fn default() -> Self {
        Self::new()
    }
}

impl GaussianNaiveBayes {
    pub fn new() -> Self {
        Self {
            means: Vec::new(),
            variances: Vec::new(),
            priors: Vec::new(),
            var_smoothing: 1e-9,
            n_classes: 0,
        }
    }

    pub fn with_n_classes(mut self, n_classes: usize) -> Self {
        self.n_classes = n_classes;
        self
    }

    /// Set variance smoothing parameter
    pub fn with_var_smoothing(mut self, smoothing: f64) -> Self {
        self.var_smoothing = smoothing;
        self
    }

    /// Fit the classifier
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        check_training_data(x, y)?;
        let n_samples = x.nrows();
        let n_features = x.ncols();
        self.n_classes = n_classes_of(y, self.n_classes);

        // Smoothing scales with the widest feature so constant features
        // never yield a zero variance
        let max_var = x
            .columns()
            .into_iter()
            .map(|c| c.var(0.0))
            .fold(0.0, f64::max);
        let epsilon = self.var_smoothing * max_var.max(1.0);

        self.means = vec![vec![0.0; n_features]; self.n_classes];
        self.variances = vec![vec![epsilon; n_features]; self.n_classes];
        self.priors = vec![0.0; self.n_classes];

        for class in 0..self.n_classes {
            let rows: Vec<usize> = (0..n_samples).filter(|&i| y[i] as usize == class).collect();
            if rows.is_empty() {
                continue;
            }
            self.priors[class] = rows.len() as f64 / n_samples as f64;

            // Single-pass Welford's algorithm for mean and variance
            let mut feature_means = vec![0.0; n_features];
            let mut feature_m2 = vec![0.0; n_features];
            for (count, &idx) in rows.iter().enumerate() {
                for (j, &val) in x.row(idx).iter().enumerate() {
                    let delta = val - feature_means[j];
                    feature_means[j] += delta / (count + 1) as f64;
                    feature_m2[j] += delta * (val - feature_means[j]);
                }
            }
            self.variances[class] = feature_m2
                .iter()
                .map(|&m2| m2 / rows.len() as f64 + epsilon)
                .collect();
            self.means[class] = feature_means;
        }
        Ok(())
    }

    /// Normalized log posterior per class
    pub fn predict_log_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        if self.priors.is_empty() {
            return Err(AutoDsError::ModelNotFitted);
        }
        let mut log_probs = Array2::zeros((x.nrows(), self.n_classes));
        for (i, row) in x.rows().into_iter().enumerate() {
            for class in 0..self.n_classes {
                log_probs[[i, class]] = if self.priors[class] > 0.0 {
                    self.priors[class].ln() + self.log_likelihood(row, class)
                } else {
                    f64::NEG_INFINITY
                };
            }
        }

        // log-sum-exp normalization
        for mut row in log_probs.rows_mut() {
            let max_val = row.fold(f64::NEG_INFINITY, |m, &v| m.max(v));
            let log_sum = row.iter().map(|&v| (v - max_val).exp()).sum::<f64>().ln();
            row.mapv_inplace(|v| v - max_val - log_sum);
        }
        Ok(log_probs)
    }

    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        Ok(self.predict_log_proba(x)?.mapv(f64::exp))
    }

    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let log_probs = self.predict_log_proba(x)?;
        Ok(log_probs.rows().into_iter().map(|row| argmax(row) as f64).collect())
    }

    fn log_likelihood(&self, x: ndarray::ArrayView1<f64>, class: usize) -> f64 {
        x.iter()
            .zip(&self.means[class])
            .zip(&self.variances[class])
            .map(|((&xi, &mean), &var)| -0.5 * ((xi - mean).powi(2) / var + var.ln() + (2.0 * PI).ln()))
            .sum()
    }

    /// Class priors indexed by class code
    pub fn class_priors(&self) -> &[f64] {
        &self.priors
    }
}

impl Estimator for GaussianNaiveBayes {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        GaussianNaiveBayes::fit(self, x, y)
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        GaussianNaiveBayes::predict(self, x)
    }

    fn decision_scores(&self, x: &Array2<f64>) -> Result<Option<Array1<f64>>> {
        if self.n_classes != 2 {
            return Ok(None);
        }
        Ok(Some(self.predict_proba(x)?.column(1).to_owned()))
    }
}
