//! K-Nearest Neighbors implementation
//!
//! KNN classifier and regressor. Neighbors at equal distance are ranked by
//! training row order, so predictions do not depend on iteration order.

use ndarray::{Array1, Array2, ArrayView1};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BinaryHeap;

use super::models::{argmax, check_training_data, n_classes_of, Estimator};
use crate::error::{AutoDsError, Result};

/// Distance metric for KNN
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum DistanceMetric {
    /// Euclidean distance (L2)
    #[default]
    Euclidean,
    /// Manhattan distance (L1)
    Manhattan,
    /// Minkowski distance with parameter p
    Minkowski(f64),
}

/// Weighting scheme for neighbors
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum WeightScheme {
    /// All neighbors have equal weight
    #[default]
    Uniform,
    /// Closer neighbors have more weight (inverse distance)
    Distance,
}

/// KNN configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KNNConfig {
    pub n_neighbors: usize,
    pub metric: DistanceMetric,
    pub weights: WeightScheme,
}

impl Default for KNNConfig {
    fn default() -> Self {
        Self {
            n_neighbors: 5,
            metric: DistanceMetric::Euclidean,
            weights: WeightScheme::Uniform,
        }
    }
}

/// Stored training data shared by both estimators
#[derive(Debug, Clone, Serialize, Deserialize)]
struct TrainingSet {
    x: Array2<f64>,
    y: Array1<f64>,
}

impl TrainingSet {
    /// (distance, target) of the k nearest rows, nearest first
    fn nearest(&self, point: ArrayView1<f64>, config: &KNNConfig) -> Result<Vec<(f64, f64)>> {
        if point.len() != self.x.ncols() {
            return Err(AutoDsError::ShapeMismatch {
                expected: format!("{} features", self.x.ncols()),
                actual: format!("{} features", point.len()),
            });
        }
        let k = config.n_neighbors.clamp(1, self.x.nrows());
        let mut heap = BinaryHeap::with_capacity(k + 1);
        for (i, row) in self.x.rows().into_iter().enumerate() {
            let entry = Neighbor(compute_distance(point, row, config.metric), i);
            if heap.len() < k {
                heap.push(entry);
            } else if heap.peek().map_or(false, |top| entry < *top) {
                heap.pop();
                heap.push(entry);
            }
        }
        Ok(heap
            .into_sorted_vec()
            .into_iter()
            .map(|n| (n.0, self.y[n.1]))
            .collect())
    }
}

/// Max-heap entry ordered by distance, then training row
#[derive(Debug, Clone, Copy)]
struct Neighbor(f64, usize);

impl PartialEq for Neighbor {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Neighbor {}

impl PartialOrd for Neighbor {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Neighbor {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0).then(self.1.cmp(&other.1))
    }
}

/// Compute distance between two points using the specified metric
fn compute_distance(a: ArrayView1<f64>, b: ArrayView1<f64>, metric: DistanceMetric) -> f64 {
    match metric {
        DistanceMetric::Euclidean => a
            .iter()
            .zip(b.iter())
            .map(|(ai, bi)| (ai - bi).powi(2))
            .sum::<f64>()
            .sqrt(),
        DistanceMetric::Manhattan => a.iter().zip(b.iter()).map(|(ai, bi)| (ai - bi).abs()).sum(),
        DistanceMetric::Minkowski(p) => a
            .iter()
            .zip(b.iter())
            .map(|(ai, bi)| (ai - bi).abs().powf(p))
            .sum::<f64>()
            .powf(1.0 / p),
    }
}

fn weight(dist: f64, scheme: WeightScheme) -> f64 {
    match scheme {
        WeightScheme::Uniform => 1.0,
        WeightScheme::Distance => 1.0 / (dist + 1e-10),
    }
}

/// K-Nearest Neighbors Classifier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KNNClassifier {
    config: KNNConfig,
    train: Option<TrainingSet>,
    n_classes: usize,
}

impl KNNClassifier {
    pub fn new(config: KNNConfig) -> Self {
        Self {
            config,
            train: None,
            n_classes: 0,
        }
    }

    /// Create with default config and specified k
    pub fn with_k(k: usize) -> Self {
        Self::new(KNNConfig {
            n_neighbors: k,
            ..Default::default()
        })
    }

    pub fn with_n_classes(mut self, n_classes: usize) -> Self {
        self.n_classes = n_classes;
        self
    }

    /// Fit the classifier (stores training data)
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        check_training_data(x, y)?;
        self.n_classes = n_classes_of(y, self.n_classes);
        self.train = Some(TrainingSet {
            x: x.clone(),
            y: y.clone(),
        });
        Ok(())
    }

    /// Weighted neighbor vote share per class
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        let train = self.train.as_ref().ok_or(AutoDsError::ModelNotFitted)?;
        let mut proba = Array2::zeros((x.nrows(), self.n_classes));
        for (i, row) in x.rows().into_iter().enumerate() {
            let neighbors = train.nearest(row, &self.config)?;
            let mut total = 0.0;
            for (dist, label) in neighbors {
                let w = weight(dist, self.config.weights);
                proba[[i, label as usize]] += w;
                total += w;
            }
            if total > 0.0 {
                proba.row_mut(i).mapv_inplace(|v| v / total);
            }
        }
        Ok(proba)
    }

    /// Majority class among the neighbors; the lower class code wins ties
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let proba = self.predict_proba(x)?;
        Ok(proba.rows().into_iter().map(|row| argmax(row) as f64).collect())
    }
}

/// K-Nearest Neighbors Regressor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KNNRegressor {
    config: KNNConfig,
    train: Option<TrainingSet>,
}

impl KNNRegressor {
    pub fn new(config: KNNConfig) -> Self {
        Self { config, train: None }
    }

    /// Create with default config and specified k
    pub fn with_k(k: usize) -> Self {
        Self::new(KNNConfig {
            n_neighbors: k,
            ..Default::default()
        })
    }

    /// Fit the regressor (stores training data)
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        check_training_data(x, y)?;
        self.train = Some(TrainingSet {
            x: x.clone(),
            y: y.clone(),
        });
        Ok(())
    }

    /// Weighted mean of the neighbors' targets
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let train = self.train.as_ref().ok_or(AutoDsError::ModelNotFitted)?;
        x.rows()
            .into_iter()
            .map(|row| {
                let neighbors = train.nearest(row, &self.config)?;
                let (sum, total) = neighbors.iter().fold((0.0, 0.0), |(s, t), &(dist, y)| {
                    let w = weight(dist, self.config.weights);
                    (s + w * y, t + w)
                });
                Ok(sum / total)
            })
            .collect()
    }
}

impl Estimator for KNNClassifier {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        KNNClassifier::fit(self, x, y)
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        KNNClassifier::predict(self, x)
    }

    fn decision_scores(&self, x: &Array2<f64>) -> Result<Option<Array1<f64>>> {
        if self.n_classes != 2 {
            return Ok(None);
        }
        Ok(Some(self.predict_proba(x)?.column(1).to_owned()))
    }
}

impl Estimator for KNNRegressor {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        KNNRegressor::fit(self, x, y)
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        KNNRegressor::predict(self, x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn create_classification_data() -> (Array2<f64>, Array1<f64>) {
        let x = Array2::from_shape_vec((20, 2), vec![
            // Class 0 (low values)
            1.0, 1.0, 1.5, 1.5, 2.0, 2.0, 2.5, 2.5, 1.0, 2.0,
            1.5, 2.5, 2.0, 1.5, 2.5, 1.0, 1.2, 1.8, 1.8, 1.2,
            // Class 1 (high values)
            8.0, 8.0, 8.5, 8.5, 9.0, 9.0, 9.5, 9.5, 8.0, 9.0,
            8.5, 9.5, 9.0, 8.5, 9.5, 8.0, 8.2, 8.8, 8.8, 8.2,
        ]).unwrap();
        let y = Array1::from_vec(vec![
            0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0,
            1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0,
        ]);
        (x, y)
    }

    #[test]
    fn test_knn_classifier() {
        let (x, y) = create_classification_data();
        let mut knn = KNNClassifier::with_k(3);
        knn.fit(&x, &y).unwrap();
        assert_eq!(knn.predict(&x).unwrap(), y);
    }

    #[test]
    fn test_knn_regressor() {
        let x = Array2::from_shape_vec((10, 2), (0..20).map(|i| i as f64).collect()).unwrap();
        let y: Array1<f64> = x.rows().into_iter().map(|row| row[0] + row[1]).collect();

        let mut knn = KNNRegressor::with_k(3);
        knn.fit(&x, &y).unwrap();
        let predictions = knn.predict(&x).unwrap();
        let mse: f64 =
            y.iter().zip(predictions.iter()).map(|(yi, pi)| (yi - pi).powi(2)).sum::<f64>() / y.len() as f64;
        assert!(mse < 10.0, "MSE ({mse}) should be low");
    }

    #[test]
    fn test_distance_metrics() {
        let a = array![0.0, 0.0];
        let b = array![3.0, 4.0];
        assert!((compute_distance(a.view(), b.view(), DistanceMetric::Euclidean) - 5.0).abs() < 1e-12);
        assert!((compute_distance(a.view(), b.view(), DistanceMetric::Manhattan) - 7.0).abs() < 1e-12);
    }

    #[test]
    fn test_equal_distance_tie_prefers_lower_class() {
        let x = array![[0.0], [2.0]];
        let y = array![1.0, 0.0];
        let mut knn = KNNClassifier::with_k(2);
        knn.fit(&x, &y).unwrap();
        assert_eq!(knn.predict(&array![[1.0]]).unwrap(), array![0.0]);
    }

    #[test]
    fn test_weighted_knn() {
        let (x, y) = create_classification_data();
        let mut knn = KNNClassifier::new(KNNConfig {
            n_neighbors: 5,
            weights: WeightScheme::Distance,
            ..Default::default()
        });
        knn.fit(&x, &y).unwrap();
        assert_eq!(knn.predict(&x).unwrap().len(), 20);
    }
}
