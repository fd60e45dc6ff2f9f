//! Nearest-neighbor imputation over numeric matrices

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use ndarray::{Array1, Array2, ArrayView1, Axis};
use serde::{Deserialize, Serialize};

use crate::error::{AutoDsError, Result};
use crate::imputation::{is_missing, Imputer};

/// Candidate neighbor: (distance, reference position)
#[derive(Debug, Clone, Copy)]
struct Candidate {
    distance: f64,
    position: usize,
}

impl Ord for Candidate {
    // Farthest on top of the heap; at equal distance the later row is evicted first
    fn cmp(&self, other: &Self) -> Ordering {
        self.distance
            .total_cmp(&other.distance)
            .then(self.position.cmp(&other.position))
    }
}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Candidate {}

/// Distance over the coordinates both rows have
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DistanceMetric {
    Euclidean,
    Manhattan,
}

impl DistanceMetric {
    /// Mean per-coordinate distance over shared coordinates; infinite when
    /// the rows share none
    fn between(self, a: &[f64], b: ArrayView1<f64>) -> f64 {
        let mut shared = 0usize;
        let mut total = 0.0;
        for (&x, &y) in a.iter().zip(b.iter()) {
            if is_missing(x) || is_missing(y) {
                continue;
            }
            shared += 1;
            total += match self {
                DistanceMetric::Euclidean => (x - y) * (x - y),
                DistanceMetric::Manhattan => (x - y).abs(),
            };
        }
        if shared == 0 {
            return f64::INFINITY;
        }
        let mean = total / shared as f64;
        match self {
            DistanceMetric::Euclidean => mean.sqrt(),
            DistanceMetric::Manhattan => mean,
        }
    }
}

/// How neighbor values are averaged
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NeighborWeights {
    Uniform,
    /// Inverse distance; an exact match dominates
    Distance,
}

/// Fills gaps from the k most similar complete rows.
///
/// Fitting keeps every row with no missing value as a reference. Similarity
/// is measured over the coordinates the incomplete row does have.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KNNImputer {
    k: usize,
    metric: DistanceMetric,
    weights: NeighborWeights,
    references: Option<Array2<f64>>,
    /// Row index in the fitted matrix of each reference
    reference_rows: Vec<usize>,
    /// Used when no reference is reachable
    column_means: Option<Array1<f64>>,
}

impl Default for KNNImputer {
    fn default() -> Self {
        Self::new(5)
    }
}

impl KNNImputer {
    pub fn new(k: usize) -> Self {
        Self {
            k: k.max(1),
            metric: DistanceMetric::Euclidean,
            weights: NeighborWeights::Uniform,
            references: None,
            reference_rows: Vec::new(),
            column_means: None,
        }
    }

    pub fn with_metric(mut self, metric: DistanceMetric) -> Self {
        self.metric = metric;
        self
    }

    pub fn with_weights(mut self, weights: NeighborWeights) -> Self {
        self.weights = weights;
        self
    }

    pub fn n_neighbors(&self) -> usize {
        self.k
    }

    /// Complete rows kept at fit time
    pub fn n_references(&self) -> usize {
        self.reference_rows.len()
    }

    /// Up to k references accepted by `keep`, as (reference position,
    /// distance), closest first
    fn closest<F>(&self, references: &Array2<f64>, sample: &[f64], keep: F) -> Vec<(usize, f64)>
    where
        F: Fn(usize) -> bool,
    {
        let mut heap = BinaryHeap::with_capacity(self.k + 1);
        for (position, reference) in references.axis_iter(Axis(0)).enumerate() {
            if !keep(self.reference_rows[position]) {
                continue;
            }
            let distance = self.metric.between(sample, reference);
            if !distance.is_finite() {
                continue;
            }
            heap.push(Candidate { distance, position });
            if heap.len() > self.k {
                heap.pop();
            }
        }
        heap.into_sorted_vec()
            .into_iter()
            .map(|c| (c.position, c.distance))
            .collect()
    }

    /// Nearest reference rows to `sample`, reported as row indices of the
    /// matrix passed to `fit`. Only rows accepted by `keep` are considered.
    pub fn nearest_rows<F>(&self, sample: &[f64], keep: F) -> Result<Vec<(usize, f64)>>
    where
        F: Fn(usize) -> bool,
    {
        let references = self.references.as_ref().ok_or(AutoDsError::ModelNotFitted)?;
        Ok(self
            .closest(references, sample, keep)
            .into_iter()
            .map(|(position, distance)| (self.reference_rows[position], distance))
            .collect())
    }

    fn estimate(&self, references: &Array2<f64>, neighbors: &[(usize, f64)], column: usize, fallback: f64) -> f64 {
        if neighbors.is_empty() {
            return fallback;
        }
        let value = |position: usize| references[[position, column]];
        match self.weights {
            NeighborWeights::Uniform => {
                neighbors.iter().map(|&(p, _)| value(p)).sum::<f64>() / neighbors.len() as f64
            }
            NeighborWeights::Distance => {
                let (num, den) = neighbors.iter().fold((0.0, 0.0), |(num, den), &(p, d)| {
                    let w = 1.0 / d.max(1e-10);
                    (num + w * value(p), den + w)
                });
                if den > 0.0 {
                    num / den
                } else {
                    fallback
                }
            }
        }
    }
}

impl Imputer for KNNImputer {
    fn fit(&mut self, x: &Array2<f64>) -> Result<()> {
        let reference_rows: Vec<usize> = x
            .axis_iter(Axis(0))
            .enumerate()
            .filter(|(_, row)| row.iter().all(|&v| !is_missing(v)))
            .map(|(i, _)| i)
            .collect();
        if reference_rows.is_empty() {
            return Err(AutoDsError::Data(
                "KNN imputation needs at least one complete row".to_string(),
            ));
        }

        let references = x.select(Axis(0), &reference_rows);
        let column_means = references
            .mean_axis(Axis(0))
            .ok_or_else(|| AutoDsError::Data("cannot average reference rows".to_string()))?;

        self.references = Some(references);
        self.reference_rows = reference_rows;
        self.column_means = Some(column_means);
        Ok(())
    }

    fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        let references = self.references.as_ref().ok_or(AutoDsError::ModelNotFitted)?;
        let means = self.column_means.as_ref().ok_or(AutoDsError::ModelNotFitted)?;
        if x.ncols() != references.ncols() {
            return Err(AutoDsError::ShapeMismatch {
                expected: format!("{} columns", references.ncols()),
                actual: format!("{} columns", x.ncols()),
            });
        }

        let mut filled = x.clone();
        for (i, row) in x.axis_iter(Axis(0)).enumerate() {
            let sample = row.to_vec();
            if sample.iter().all(|&v| !is_missing(v)) {
                continue;
            }
            let neighbors = self.closest(references, &sample, |_| true);
            for (j, &v) in sample.iter().enumerate() {
                if is_missing(v) {
                    filled[[i, j]] = self.estimate(references, &neighbors, j, means[j]);
                }
            }
        }
        Ok(filled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_gap_filled_from_similar_rows() {
        let x = array![
            [1.0, 10.0],
            [2.0, 20.0],
            [3.0, 30.0],
            [4.0, 40.0],
            [f64::NAN, 25.0],
            [2.5, f64::NAN],
        ];
        let out = KNNImputer::new(2).fit_transform(&x).unwrap();

        // 25.0 sits between rows 1 and 2
        assert!((out[[4, 0]] - 2.5).abs() < 1e-12);
        assert!((out[[5, 1]] - 25.0).abs() < 1e-12);
        assert_eq!(out[[0, 1]], 10.0);
    }

    #[test]
    fn test_distance_weights_favor_the_closest_row() {
        let x = array![[0.0, 0.0], [1.0, 1.0], [2.0, 2.0], [3.0, 3.0], [0.1, f64::NAN]];
        let uniform = KNNImputer::new(3).fit_transform(&x).unwrap();
        let weighted = KNNImputer::new(3)
            .with_weights(NeighborWeights::Distance)
            .fit_transform(&x)
            .unwrap();
        assert!((uniform[[4, 1]] - 1.0).abs() < 1e-12);
        assert!(weighted[[4, 1]] < uniform[[4, 1]]);
    }

    #[test]
    fn test_manhattan_metric() {
        let x = array![[1.0, 1.0], [2.0, 2.0], [3.0, 3.0], [1.4, f64::NAN]];
        let out = KNNImputer::new(2)
            .with_metric(DistanceMetric::Manhattan)
            .fit_transform(&x)
            .unwrap();
        assert!((out[[3, 1]] - 1.5).abs() < 1e-12);
    }

    #[test]
    fn test_nearest_rows_are_sorted_and_filtered() {
        let x = array![[0.0], [1.0], [f64::NAN], [3.0]];
        let mut imputer = KNNImputer::new(2);
        imputer.fit(&x).unwrap();
        assert_eq!(imputer.n_references(), 3);

        let near = imputer.nearest_rows(&[0.9], |_| true).unwrap();
        assert_eq!(near.iter().map(|n| n.0).collect::<Vec<_>>(), vec![1, 0]);

        let skip_first = imputer.nearest_rows(&[0.9], |row| row != 1).unwrap();
        assert_eq!(skip_first.iter().map(|n| n.0).collect::<Vec<_>>(), vec![0, 3]);
    }

    #[test]
    fn test_equal_distances_keep_earlier_rows() {
        let x = array![[0.0], [2.0], [-2.0]];
        let mut imputer = KNNImputer::new(1);
        imputer.fit(&x).unwrap();
        let near = imputer.nearest_rows(&[0.0], |row| row != 0).unwrap();
        assert_eq!(near[0].0, 1);
    }

    #[test]
    fn test_fit_without_complete_rows_fails() {
        let x = array![[f64::NAN, 1.0], [2.0, f64::NAN]];
        assert!(KNNImputer::new(2).fit(&x).is_err());
        assert!(matches!(
            KNNImputer::new(2).transform(&x),
            Err(AutoDsError::ModelNotFitted)
        ));
    }
}
