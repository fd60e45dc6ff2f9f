//! Gradient boosted regression trees
//!
//! Each round fits a shallow regression tree to the negative gradient of
//! the loss on a random row subsample. Classification boosts the log-odds
//! of each class against the rest.

use ndarray::{Array1, Array2, Axis};
use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::{Deserialize, Serialize};

use super::decision_tree::DecisionTree;
use super::models::{argmax, check_training_data, n_classes_of, normalize, Estimator};
use crate::error::{AutoDsError, Result};

/// Gradient Boosting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradientBoostingConfig {
    /// Number of boosting rounds (trees)
    pub n_estimators: usize,
    /// Learning rate (shrinkage)
    pub learning_rate: f64,
    pub max_depth: usize,
    pub min_samples_leaf: usize,
    /// Row subsample ratio for each tree
    pub subsample: f64,
    /// Column subsample ratio for each tree
    pub colsample_bytree: f64,
    pub random_state: u64,
}

impl Default for GradientBoostingConfig {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            learning_rate: 0.1,
            max_depth: 3,
            min_samples_leaf: 1,
            subsample: 0.8,
            colsample_bytree: 1.0,
            random_state: 42,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Loss {
    Squared,
    Logistic,
}

fn sigmoid(v: f64) -> f64 {
    1.0 / (1.0 + (-v).exp())
}

/// One boosted additive model producing a raw score
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Booster {
    initial: f64,
    trees: Vec<DecisionTree>,
    columns: Vec<Vec<usize>>,
}

impl Booster {
    fn fit(
        config: &GradientBoostingConfig,
        x: &Array2<f64>,
        y: &Array1<f64>,
        loss: Loss,
        rng: &mut Xoshiro256PlusPlus,
        importances: &mut [f64],
    ) -> Result<Self> {
        let n_samples = x.nrows();
        let initial = match loss {
            Loss::Squared => y.mean().unwrap_or(0.0),
            Loss::Logistic => {
                let p = y.mean().unwrap_or(0.5).clamp(1e-6, 1.0 - 1e-6);
                (p / (1.0 - p)).ln()
            }
        };
        let mut scores = Array1::from_elem(n_samples, initial);
        let mut booster = Self {
            initial,
            trees: Vec::with_capacity(config.n_estimators),
            columns: Vec::with_capacity(config.n_estimators),
        };

        for _ in 0..config.n_estimators {
            let residuals: Array1<f64> = y
                .iter()
                .zip(scores.iter())
                .map(|(&yi, &si)| match loss {
                    Loss::Squared => yi - si,
                    Loss::Logistic => yi - sigmoid(si),
                })
                .collect();

            let rows = sample_indices(n_samples, config.subsample, rng);
            let cols = sample_indices(x.ncols(), config.colsample_bytree, rng);
            let x_cols = x.select(Axis(1), &cols);
            let x_sub = x_cols.select(Axis(0), &rows);
            let y_sub: Array1<f64> = rows.iter().map(|&i| residuals[i]).collect();

            let mut tree = DecisionTree::new_regressor()
                .with_max_depth(config.max_depth)
                .with_min_samples_leaf(config.min_samples_leaf);
            tree.fit(&x_sub, &y_sub)?;

            let update = tree.predict(&x_cols)?;
            scores.scaled_add(config.learning_rate, &update);

            if let Some(tree_importance) = tree.feature_importances() {
                for (&col, &imp) in cols.iter().zip(tree_importance) {
                    importances[col] += imp;
                }
            }
            booster.trees.push(tree);
            booster.columns.push(cols);
        }
        Ok(booster)
    }

    fn raw_scores(&self, x: &Array2<f64>, learning_rate: f64) -> Result<Array1<f64>> {
        let mut scores = Array1::from_elem(x.nrows(), self.initial);
        for (tree, cols) in self.trees.iter().zip(&self.columns) {
            let update = tree.predict(&x.select(Axis(1), cols))?;
            scores.scaled_add(learning_rate, &update);
        }
        Ok(scores)
    }
}

/// Sorted random subset holding `ratio` of `0..n` (at least one)
fn sample_indices(n: usize, ratio: f64, rng: &mut Xoshiro256PlusPlus) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..n).collect();
    if n == 0 {
        return indices;
    }
    let size = ((n as f64) * ratio).ceil().clamp(1.0, n as f64) as usize;
    if size < n {
        indices.shuffle(rng);
        indices.truncate(size);
        indices.sort_unstable();
    }
    indices
}

/// Gradient Boosting Regressor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradientBoostingRegressor {
    config: GradientBoostingConfig,
    booster: Option<Booster>,
    feature_importances: Vec<f64>,
}

impl GradientBoostingRegressor {
    pub fn new(config: GradientBoostingConfig) -> Self {
        Self {
            config,
            booster: None,
            feature_importances: Vec::new(),
        }
    }

    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        check_training_data(x, y)?;
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(self.config.random_state);
        let mut importances = vec![0.0; x.ncols()];
        self.booster = Some(Booster::fit(&self.config, x, y, Loss::Squared, &mut rng, &mut importances)?);
        normalize(&mut importances);
        self.feature_importances = importances;
        Ok(())
    }

    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let booster = self.booster.as_ref().ok_or(AutoDsError::ModelNotFitted)?;
        booster.raw_scores(x, self.config.learning_rate)
    }

    pub fn feature_importances(&self) -> &[f64] {
        &self.feature_importances
    }
}

/// Gradient Boosting Classifier; one log-odds booster per class beyond binary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradientBoostingClassifier {
    config: GradientBoostingConfig,
    n_classes: usize,
    boosters: Vec<Booster>,
    feature_importances: Vec<f64>,
}

impl GradientBoostingClassifier {
    pub fn new(config: GradientBoostingConfig, n_classes: usize) -> Self {
        Self {
            config,
            n_classes,
            boosters: Vec::new(),
            feature_importances: Vec::new(),
        }
    }

    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        check_training_data(x, y)?;
        self.n_classes = n_classes_of(y, self.n_classes).max(2);
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(self.config.random_state);
        let mut importances = vec![0.0; x.ncols()];

        // Binary problems need only the booster for class 1
        let targets: Vec<usize> = if self.n_classes == 2 {
            vec![1]
        } else {
            (0..self.n_classes).collect()
        };
        self.boosters.clear();
        for class in targets {
            let y_bin = y.mapv(|c| if c as usize == class { 1.0 } else { 0.0 });
            let booster = Booster::fit(&self.config, x, &y_bin, Loss::Logistic, &mut rng, &mut importances)?;
            self.boosters.push(booster);
        }
        normalize(&mut importances);
        self.feature_importances = importances;
        Ok(())
    }

    /// Class probabilities; one-vs-rest scores are renormalized per row
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        if self.boosters.is_empty() {
            return Err(AutoDsError::ModelNotFitted);
        }
        let mut proba = Array2::zeros((x.nrows(), self.n_classes));
        if self.n_classes == 2 {
            let p = self.boosters[0].raw_scores(x, self.config.learning_rate)?.mapv(sigmoid);
            for (i, &pi) in p.iter().enumerate() {
                proba[[i, 0]] = 1.0 - pi;
                proba[[i, 1]] = pi;
            }
            return Ok(proba);
        }
        for (c, booster) in self.boosters.iter().enumerate() {
            let p = booster.raw_scores(x, self.config.learning_rate)?.mapv(sigmoid);
            proba.column_mut(c).assign(&p);
        }
        for mut row in proba.rows_mut() {
            let total = row.sum();
            if total > 0.0 {
                row /= total;
            }
        }
        Ok(proba)
    }

    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let proba = self.predict_proba(x)?;
        Ok(proba.rows().into_iter().map(|row| argmax(row) as f64).collect())
    }

    pub fn feature_importances(&self) -> &[f64] {
        &self.feature_importances
    }
}

impl Estimator for GradientBoostingRegressor {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        GradientBoostingRegressor::fit(self, x, y)
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        GradientBoostingRegressor::predict(self, x)
    }

    fn feature_importances(&self) -> Option<Vec<f64>> {
        Some(self.feature_importances.clone())
    }
}

impl Estimator for GradientBoostingClassifier {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        GradientBoostingClassifier::fit(self, x, y)
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        GradientBoostingClassifier::predict(self, x)
    }

    fn decision_scores(&self, x: &Array2<f64>) -> Result<Option<Array1<f64>>> {
        if self.n_classes != 2 {
            return Ok(None);
        }
        Ok(Some(self.predict_proba(x)?.column(1).to_owned()))
    }

    fn feature_importances(&self) -> Option<Vec<f64>> {
        Some(self.feature_importances.clone())
    }
}
