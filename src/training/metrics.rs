//! Hold-out evaluation metrics

use ndarray::Array1;
use serde::{Deserialize, Serialize};

use super::TaskType;

/// Metrics for a classification candidate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationMetrics {
    pub accuracy: f64,
    /// Positive-class precision for binary targets, macro average otherwise
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    /// `confusion_matrix[true][predicted]`, one row and column per class
    pub confusion_matrix: Vec<Vec<usize>>,
    /// Only for two-class targets whose hold-out split holds both classes
    pub roc_auc: Option<f64>,
    /// Points behind `roc_auc`; present exactly when it is
    pub roc_curve: Option<RocCurve>,
}

/// False and true positive rates, one point per distinct score threshold
/// from the highest down, starting at (0, 0)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RocCurve {
    pub fpr: Vec<f64>,
    pub tpr: Vec<f64>,
}

impl RocCurve {
    /// Trapezoidal area under the curve
    pub fn area(&self) -> f64 {
        self.fpr
            .windows(2)
            .zip(self.tpr.windows(2))
            .map(|(x, y)| (x[1] - x[0]) * (y[0] + y[1]) / 2.0)
            .sum()
    }
}

impl ClassificationMetrics {
    /// Score predicted class codes against the truth. `scores` ranks samples
    /// by positive-class likelihood; hard predictions stand in without it.
    pub fn compute(
        y_true: &Array1<f64>,
        y_pred: &Array1<f64>,
        scores: Option<&Array1<f64>>,
        n_classes: usize,
    ) -> Self {
        let n = y_true.len();
        let correct = y_true
            .iter()
            .zip(y_pred.iter())
            .filter(|(t, p)| (*t - *p).abs() < 0.5)
            .count();
        let accuracy = if n > 0 { correct as f64 / n as f64 } else { 0.0 };

        let confusion_matrix = confusion_matrix(y_true, y_pred, n_classes);
        let (precision, recall, f1_score) = if n_classes == 2 {
            class_scores(&confusion_matrix, 1)
        } else {
            macro_scores(&confusion_matrix)
        };

        let (roc_auc, roc_curve) = if n_classes == 2 {
            let ranking = scores.unwrap_or(y_pred);
            (roc_auc(y_true, ranking), roc_curve(y_true, ranking))
        } else {
            (None, None)
        };

        Self {
            accuracy,
            precision,
            recall,
            f1_score,
            confusion_matrix,
            roc_auc,
            roc_curve,
        }
    }
}

/// Metrics for a regression candidate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionMetrics {
    pub r2: f64,
    pub mse: f64,
    pub rmse: f64,
    pub mae: f64,
}

impl RegressionMetrics {
    pub fn compute(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Self {
        let n = y_true.len().max(1) as f64;
        let errors: Vec<f64> = y_true.iter().zip(y_pred.iter()).map(|(t, p)| t - p).collect();

        let mse = errors.iter().map(|e| e * e).sum::<f64>() / n;
        let mae = errors.iter().map(|e| e.abs()).sum::<f64>() / n;

        let y_mean = y_true.iter().sum::<f64>() / n;
        let ss_tot: f64 = y_true.iter().map(|y| (y - y_mean).powi(2)).sum();
        let ss_res: f64 = errors.iter().map(|e| e.powi(2)).sum();
        let r2 = if ss_tot > 0.0 { 1.0 - ss_res / ss_tot } else { 0.0 };

        Self {
            r2,
            mse,
            rmse: mse.sqrt(),
            mae,
        }
    }
}

/// Metric table of one candidate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "task", rename_all = "snake_case")]
pub enum Metrics {
    Classification(ClassificationMetrics),
    Regression(RegressionMetrics),
}

impl Metrics {
    pub fn task(&self) -> TaskType {
        match self {
            Metrics::Classification(_) => TaskType::Classification,
            Metrics::Regression(_) => TaskType::Regression,
        }
    }

    /// Accuracy for classification, R² for regression
    pub fn primary(&self) -> f64 {
        match self {
            Metrics::Classification(m) => m.accuracy,
            Metrics::Regression(m) => m.r2,
        }
    }

    pub fn primary_name(&self) -> &'static str {
        primary_metric_name(self.task())
    }

    pub fn as_classification(&self) -> Option<&ClassificationMetrics> {
        match self {
            Metrics::Classification(m) => Some(m),
            Metrics::Regression(_) => None,
        }
    }

    pub fn as_regression(&self) -> Option<&RegressionMetrics> {
        match self {
            Metrics::Regression(m) => Some(m),
            Metrics::Classification(_) => None,
        }
    }

    /// (name, value) pairs in display order
    pub fn entries(&self) -> Vec<(&'static str, f64)> {
        match self {
            Metrics::Classification(m) => {
                let mut entries = vec![
                    ("accuracy", m.accuracy),
                    ("precision", m.precision),
                    ("recall", m.recall),
                    ("f1_score", m.f1_score),
                ];
                if let Some(auc) = m.roc_auc {
                    entries.push(("roc_auc", auc));
                }
                entries
            }
            Metrics::Regression(m) => vec![("r2", m.r2), ("mse", m.mse), ("rmse", m.rmse), ("mae", m.mae)],
        }
    }
}

pub fn primary_metric_name(task: TaskType) -> &'static str {
    match task {
        TaskType::Classification => "accuracy",
        TaskType::Regression => "r2",
    }
}

/// C x C counts; codes outside `0..n_classes` are ignored
pub fn confusion_matrix(y_true: &Array1<f64>, y_pred: &Array1<f64>, n_classes: usize) -> Vec<Vec<usize>> {
    let mut matrix = vec![vec![0; n_classes]; n_classes];
    for (&t, &p) in y_true.iter().zip(y_pred.iter()) {
        if t < 0.0 || p < 0.0 {
            continue;
        }
        let (t, p) = (t.round() as usize, p.round() as usize);
        if t < n_classes && p < n_classes {
            matrix[t][p] += 1;
        }
    }
    matrix
}

/// Precision, recall and F1 of one class; zero division yields 0
fn class_scores(matrix: &[Vec<usize>], class: usize) -> (f64, f64, f64) {
    let tp = matrix[class][class] as f64;
    let predicted: usize = matrix.iter().map(|row| row[class]).sum();
    let actual: usize = matrix[class].iter().sum();

    let precision = if predicted > 0 { tp / predicted as f64 } else { 0.0 };
    let recall = if actual > 0 { tp / actual as f64 } else { 0.0 };
    let f1 = if precision + recall > 0.0 {
        2.0 * precision * recall / (precision + recall)
    } else {
        0.0
    };
    (precision, recall, f1)
}

/// Unweighted mean over the classes that occur in the truth or the predictions
fn macro_scores(matrix: &[Vec<usize>]) -> (f64, f64, f64) {
    let present: Vec<usize> = (0..matrix.len())
        .filter(|&c| matrix[c].iter().sum::<usize>() > 0 || matrix.iter().any(|row| row[c] > 0))
        .collect();
    if present.is_empty() {
        return (0.0, 0.0, 0.0);
    }
    let (p, r, f) = present.iter().fold((0.0, 0.0, 0.0), |(p, r, f), &c| {
        let (cp, cr, cf) = class_scores(matrix, c);
        (p + cp, r + cr, f + cf)
    });
    let k = present.len() as f64;
    (p / k, r / k, f / k)
}

/// Area under the ROC curve via the Mann-Whitney rank statistic.
/// `None` when the truth holds a single class.
pub fn roc_auc(y_true: &Array1<f64>, scores: &Array1<f64>) -> Option<f64> {
    let n_pos = y_true.iter().filter(|&&t| t == 1.0).count();
    let n_neg = y_true.len() - n_pos;
    if n_pos == 0 || n_neg == 0 {
        return None;
    }

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[a].total_cmp(&scores[b]));

    // Average ranks (1-based) across tied scores
    let mut ranks = vec![0.0; scores.len()];
    let mut i = 0;
    while i < order.len() {
        let mut j = i;
        while j + 1 < order.len() && scores[order[j + 1]] == scores[order[i]] {
            j += 1;
        }
        let avg_rank = (i + j) as f64 / 2.0 + 1.0;
        for &idx in &order[i..=j] {
            ranks[idx] = avg_rank;
        }
        i = j + 1;
    }

    let rank_sum: f64 = y_true
        .iter()
        .zip(&ranks)
        .filter(|(&t, _)| t == 1.0)
        .map(|(_, &r)| r)
        .sum();
    let u = rank_sum - (n_pos * (n_pos + 1)) as f64 / 2.0;
    Some(u / (n_pos * n_neg) as f64)
}

/// ROC points for positive class 1. `None` when the truth holds a single class.
pub fn roc_curve(y_true: &Array1<f64>, scores: &Array1<f64>) -> Option<RocCurve> {
    let n_pos = y_true.iter().filter(|&&t| t == 1.0).count();
    let n_neg = y_true.len() - n_pos;
    if n_pos == 0 || n_neg == 0 {
        return None;
    }

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]));

    let mut fpr = vec![0.0];
    let mut tpr = vec![0.0];
    let (mut tp, mut fp) = (0usize, 0usize);
    for (i, &idx) in order.iter().enumerate() {
        if y_true[idx] == 1.0 {
            tp += 1;
        } else {
            fp += 1;
        }
        // One point per threshold; tied scores move together
        let last_of_tie = order.get(i + 1).map_or(true, |&next| scores[next] != scores[idx]);
        if last_of_tie {
            fpr.push(fp as f64 / n_neg as f64);
            tpr.push(tp as f64 / n_pos as f64);
        }
    }
    Some(RocCurve { fpr, tpr })
}
