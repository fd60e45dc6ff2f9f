//! Univariate feature scoring and top-K selection
//!
//! - classification: one-way ANOVA F-statistic across class groups
//! - regression: F-statistic of the Pearson correlation with the target

use ndarray::{Array1, Array2, ArrayView1, Axis};

use crate::training::TaskType;

/// Score every column of `x` against `y`. Undefined scores (constant
/// features, a single class) are 0; perfect separation is infinite.
pub fn f_scores(x: &Array2<f64>, y: &Array1<f64>, task: TaskType) -> Vec<f64> {
    x.axis_iter(Axis(1))
        .map(|column| {
            let score = match task {
                TaskType::Classification => f_classif(column, y.view()),
                TaskType::Regression => f_regression(column, y.view()),
            };
            if score.is_nan() {
                0.0
            } else {
                score
            }
        })
        .collect()
}

/// ANOVA F for one feature; `y` holds class codes
pub fn f_classif(x: ArrayView1<f64>, y: ArrayView1<f64>) -> f64 {
    let n = x.len();
    let n_classes = y.iter().map(|&c| c as usize + 1).max().unwrap_or(0);
    let mut sums = vec![0.0; n_classes];
    let mut counts = vec![0usize; n_classes];
    for (&v, &c) in x.iter().zip(y.iter()) {
        sums[c as usize] += v;
        counts[c as usize] += 1;
    }

    let groups: Vec<usize> = (0..n_classes).filter(|&c| counts[c] > 0).collect();
    let k = groups.len();
    if k < 2 || n <= k {
        return 0.0;
    }

    let grand_mean = x.sum() / n as f64;
    let ss_between: f64 = groups
        .iter()
        .map(|&c| {
            let mean = sums[c] / counts[c] as f64;
            counts[c] as f64 * (mean - grand_mean).powi(2)
        })
        .sum();
    let ss_within: f64 = x
        .iter()
        .zip(y.iter())
        .map(|(&v, &c)| {
            let c = c as usize;
            (v - sums[c] / counts[c] as f64).powi(2)
        })
        .sum();

    let ms_between = ss_between / (k - 1) as f64;
    let ms_within = ss_within / (n - k) as f64;
    if ms_within == 0.0 {
        return if ms_between > 0.0 { f64::INFINITY } else { 0.0 };
    }
    ms_between / ms_within
}

/// Correlation F for one feature: r² / (1 - r²) · (n - 2)
pub fn f_regression(x: ArrayView1<f64>, y: ArrayView1<f64>) -> f64 {
    let n = x.len();
    if n < 3 {
        return 0.0;
    }
    let mx = x.sum() / n as f64;
    let my = y.sum() / n as f64;
    let mut sxy = 0.0;
    let mut sxx = 0.0;
    let mut syy = 0.0;
    for (&a, &b) in x.iter().zip(y.iter()) {
        sxy += (a - mx) * (b - my);
        sxx += (a - mx).powi(2);
        syy += (b - my).powi(2);
    }
    if sxx == 0.0 || syy == 0.0 {
        return 0.0;
    }
    let r2 = (sxy * sxy / (sxx * syy)).min(1.0);
    if r2 >= 1.0 {
        return f64::INFINITY;
    }
    r2 / (1.0 - r2) * (n - 2) as f64
}

/// Indices of the `k` best scores, returned in ascending index order.
/// Equal scores keep the earlier index.
pub fn top_k(scores: &[f64], k: usize) -> Vec<usize> {
    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]));
    let mut kept: Vec<usize> = order.into_iter().take(k).collect();
    kept.sort_unstable();
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_f_classif_separating_feature_scores_higher() {
        let y = array![0.0, 0.0, 0.0, 1.0, 1.0, 1.0];
        let x = array![
            [1.0, 0.3],
            [1.1, 0.9],
            [0.9, 0.1],
            [5.0, 0.2],
            [5.2, 0.8],
            [4.9, 0.4]
        ];
        let scores = f_scores(&x, &y, TaskType::Classification);
        assert!(scores[0] > 100.0);
        assert!(scores[1] < 1.0);
    }

    #[test]
    fn test_constant_feature_scores_zero() {
        let y = array![0.0, 1.0, 0.0, 1.0];
        let x = array![[2.0], [2.0], [2.0], [2.0]];
        assert_eq!(f_scores(&x, &y, TaskType::Classification), vec![0.0]);
        assert_eq!(f_scores(&x, &y, TaskType::Regression), vec![0.0]);
    }

    #[test]
    fn test_f_regression_matches_formula() {
        let x = array![1.0, 2.0, 3.0, 4.0];
        let y = array![1.0, 3.0, 2.0, 4.0];
        // r = 0.8 -> F = 0.64 / 0.36 * 2
        let f = f_regression(x.view(), y.view());
        assert!((f - 0.64 / 0.36 * 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_top_k_ties_keep_insertion_order() {
        let scores = [1.0, 3.0, 3.0, 0.5, 3.0];
        assert_eq!(top_k(&scores, 2), vec![1, 2]);
        assert_eq!(top_k(&scores, 10), vec![0, 1, 2, 3, 4]);
    }
}
