//! Linear model implementations

use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

use super::models::{argmax, check_training_data, n_classes_of, Estimator};
use crate::error::{AutoDsError, Result};

/// Cholesky factor-and-solve of a symmetric positive-definite system.
/// Returns `None` when the matrix is not (numerically) positive definite.
fn cholesky_solve(a: &Array2<f64>, b: &Array1<f64>) -> Option<Array1<f64>> {
    let n = a.nrows();
    if n != a.ncols() || n != b.len() {
        return None;
    }

    // A = L * L^T
    let mut l = Array2::zeros((n, n));
    for i in 0..n {
        for j in 0..=i {
            let mut sum = 0.0;
            for k in 0..j {
                sum += l[[i, k]] * l[[j, k]];
            }
            if i == j {
                let diag = a[[i, i]] - sum;
                if diag <= 1e-10 * a[[i, i]].abs() || diag <= 0.0 {
                    return None;
                }
                l[[i, j]] = diag.sqrt();
            } else {
                l[[i, j]] = (a[[i, j]] - sum) / l[[j, j]];
            }
        }
    }

    // Forward substitution: L * y = b
    let mut y = Array1::zeros(n);
    for i in 0..n {
        let mut sum = 0.0;
        for j in 0..i {
            sum += l[[i, j]] * y[j];
        }
        y[i] = (b[i] - sum) / l[[i, i]];
    }

    // Backward substitution: L^T * x = y
    let mut x = Array1::zeros(n);
    for i in (0..n).rev() {
        let mut sum = 0.0;
        for j in (i + 1)..n {
            sum += l[[j, i]] * x[j];
        }
        x[i] = (y[i] - sum) / l[[i, i]];
    }
    Some(x)
}

/// Gauss-Jordan elimination with partial pivoting (fallback)
fn gauss_jordan_solve(a: &Array2<f64>, b: &Array1<f64>) -> Option<Array1<f64>> {
    let n = a.nrows();
    let mut aug = Array2::zeros((n, n + 1));
    for i in 0..n {
        for j in 0..n {
            aug[[i, j]] = a[[i, j]];
        }
        aug[[i, n]] = b[i];
    }

    for col in 0..n {
        let mut max_row = col;
        for row in col + 1..n {
            if aug[[row, col]].abs() > aug[[max_row, col]].abs() {
                max_row = row;
            }
        }
        if max_row != col {
            for j in 0..=n {
                aug.swap([col, j], [max_row, j]);
            }
        }
        if aug[[col, col]].abs() < 1e-10 {
            return None;
        }
        let pivot = aug[[col, col]];
        for j in 0..=n {
            aug[[col, j]] /= pivot;
        }
        for row in 0..n {
            if row != col {
                let factor = aug[[row, col]];
                for j in 0..=n {
                    aug[[row, j]] -= factor * aug[[col, j]];
                }
            }
        }
    }
    Some(aug.column(n).to_owned())
}

/// Solve (X^T X + alpha*I) w = X^T y. Collinear designs get a small
/// diagonal jitter before giving up.
fn solve_normal_equations(x: &Array2<f64>, y: &Array1<f64>, alpha: f64) -> Result<Array1<f64>> {
    let n_features = x.ncols();
    let mut xtx = x.t().dot(x);
    for i in 0..n_features {
        xtx[[i, i]] += alpha;
    }
    let xty = x.t().dot(y);

    if let Some(w) = cholesky_solve(&xtx, &xty) {
        return Ok(w);
    }
    let mean_diag = xtx.diag().iter().map(|v| v.abs()).sum::<f64>() / n_features.max(1) as f64;
    let mut jittered = xtx.clone();
    for i in 0..n_features {
        jittered[[i, i]] += 1e-8 * mean_diag.max(1.0);
    }
    cholesky_solve(&jittered, &xty)
        .or_else(|| gauss_jordan_solve(&jittered, &xty))
        .ok_or_else(|| AutoDsError::Training("matrix is singular, cannot solve least squares".to_string()))
}

/// Column means and mean-centered copies of x and y
fn center(x: &Array2<f64>, y: &Array1<f64>) -> Result<(Array2<f64>, Array1<f64>, Array1<f64>, f64)> {
    let x_mean = x
        .mean_axis(Axis(0))
        .ok_or_else(|| AutoDsError::Training("no training rows".to_string()))?;
    let y_mean = y.mean().unwrap_or(0.0);
    let x_centered = x - &x_mean.clone().insert_axis(Axis(0));
    let y_centered = y - y_mean;
    Ok((x_centered, y_centered, x_mean, y_mean))
}

fn check_features(x: &Array2<f64>, coefficients: &Array1<f64>) -> Result<()> {
    if x.ncols() != coefficients.len() {
        return Err(AutoDsError::ShapeMismatch {
            expected: format!("{} features", coefficients.len()),
            actual: format!("{} features", x.ncols()),
        });
    }
    Ok(())
}

/// Fitted weights shared by the regression models
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct LinearFit {
    coefficients: Option<Array1<f64>>,
    intercept: f64,
}

impl LinearFit {
    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let coefficients = self.coefficients.as_ref().ok_or(AutoDsError::ModelNotFitted)?;
        check_features(x, coefficients)?;
        Ok(x.dot(coefficients) + self.intercept)
    }

    fn abs_coefficients(&self) -> Option<Vec<f64>> {
        self.coefficients.as_ref().map(|c| c.iter().map(|v| v.abs()).collect())
    }
}

/// Ordinary least squares
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LinearRegression {
    fit: LinearFit,
}

impl LinearRegression {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        check_training_data(x, y)?;
        let (x_c, y_c, x_mean, y_mean) = center(x, y)?;
        let coefficients = solve_normal_equations(&x_c, &y_c, 0.0)?;
        self.fit = LinearFit {
            intercept: y_mean - coefficients.dot(&x_mean),
            coefficients: Some(coefficients),
        };
        Ok(self)
    }

    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        self.fit.predict(x)
    }

    pub fn coefficients(&self) -> Option<&Array1<f64>> {
        self.fit.coefficients.as_ref()
    }

    pub fn intercept(&self) -> f64 {
        self.fit.intercept
    }
}

/// L2-regularized least squares
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RidgeRegression {
    pub alpha: f64,
    fit: LinearFit,
}

impl Default for RidgeRegression {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl RidgeRegression {
    pub fn new(alpha: f64) -> Self {
        Self {
            alpha: alpha.max(0.0),
            fit: LinearFit::default(),
        }
    }

    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        check_training_data(x, y)?;
        let (x_c, y_c, x_mean, y_mean) = center(x, y)?;
        let coefficients = solve_normal_equations(&x_c, &y_c, self.alpha)?;
        self.fit = LinearFit {
            intercept: y_mean - coefficients.dot(&x_mean),
            coefficients: Some(coefficients),
        };
        Ok(self)
    }

    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        self.fit.predict(x)
    }

    pub fn coefficients(&self) -> Option<&Array1<f64>> {
        self.fit.coefficients.as_ref()
    }
}

/// L1-regularized least squares, fitted by coordinate descent
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LassoRegression {
    pub alpha: f64,
    pub max_iter: usize,
    pub tol: f64,
    fit: LinearFit,
}

impl Default for LassoRegression {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl LassoRegression {
    pub fn new(alpha: f64) -> Self {
        Self {
            alpha: alpha.max(0.0),
            max_iter: 1000,
            tol: 1e-6,
            fit: LinearFit::default(),
        }
    }

    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    fn soft_threshold(val: f64, threshold: f64) -> f64 {
        if val > threshold {
            val - threshold
        } else if val < -threshold {
            val + threshold
        } else {
            0.0
        }
    }

    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        check_training_data(x, y)?;
        let n_samples = x.nrows();
        let n_features = x.ncols();
        let (x_c, y_c, x_mean, y_mean) = center(x, y)?;

        let col_norms: Vec<f64> = (0..n_features)
            .map(|j| x_c.column(j).mapv(|v| v * v).sum())
            .collect();

        let mut w = Array1::zeros(n_features);
        let lambda = self.alpha * n_samples as f64;
        let mut r = y_c.clone();

        for _iter in 0..self.max_iter {
            let mut max_change: f64 = 0.0;
            for j in 0..n_features {
                if col_norms[j] < 1e-15 {
                    continue;
                }
                let rho = x_c.column(j).dot(&r) + col_norms[j] * w[j];
                let old_wj = w[j];
                w[j] = Self::soft_threshold(rho, lambda) / col_norms[j];
                let delta = old_wj - w[j];
                if delta != 0.0 {
                    r.scaled_add(delta, &x_c.column(j));
                    max_change = max_change.max(delta.abs());
                }
            }
            if max_change < self.tol {
                break;
            }
        }

        self.fit = LinearFit {
            intercept: y_mean - w.dot(&x_mean),
            coefficients: Some(w),
        };
        Ok(self)
    }

    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        self.fit.predict(x)
    }

    pub fn coefficients(&self) -> Option<&Array1<f64>> {
        self.fit.coefficients.as_ref()
    }
}

/// One binary logit: weights and bias
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Logit {
    weights: Array1<f64>,
    bias: f64,
}

impl Logit {
    fn probability(&self, x: &Array2<f64>) -> Array1<f64> {
        (x.dot(&self.weights) + self.bias).mapv(sigmoid)
    }
}

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

/// Logistic regression; multi-class targets are fitted one-vs-rest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticRegression {
    /// L2 regularization strength
    pub alpha: f64,
    pub max_iter: usize,
    pub tol: f64,
    pub learning_rate: f64,
    n_classes: usize,
    n_features: usize,
    logits: Vec<Logit>,
}

impl Default for LogisticRegression {
    fn default() -> Self {
        Self::new()
    }
}

impl LogisticRegression {
    pub fn new() -> Self {
        Self {
            alpha: 0.01,
            max_iter: 1000,
            tol: 1e-6,
            learning_rate: 0.1,
            n_classes: 0,
            n_features: 0,
            logits: Vec::new(),
        }
    }

    pub fn with_n_classes(mut self, n_classes: usize) -> Self {
        self.n_classes = n_classes;
        self
    }

    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    pub fn with_learning_rate(mut self, lr: f64) -> Self {
        self.learning_rate = lr;
        self
    }

    /// Batch gradient descent on the penalized log loss of a 0/1 target
    fn fit_logit(&self, x: &Array2<f64>, y: &Array1<f64>) -> Logit {
        let n_samples = x.nrows() as f64;
        let mut weights = Array1::zeros(x.ncols());
        let mut bias = 0.0;

        for _iter in 0..self.max_iter {
            let predictions = (x.dot(&weights) + bias).mapv(sigmoid);
            let errors = &predictions - y;
            let dw = x.t().dot(&errors) / n_samples + self.alpha * &weights;
            let db = errors.mean().unwrap_or(0.0);

            let grad_norm = (dw.mapv(|v| v * v).sum() + db * db).sqrt();
            if grad_norm < self.tol {
                break;
            }
            weights.scaled_add(-self.learning_rate, &dw);
            bias -= self.learning_rate * db;
        }
        Logit { weights, bias }
    }

    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        check_training_data(x, y)?;
        self.n_classes = n_classes_of(y, self.n_classes).max(2);
        self.n_features = x.ncols();

        self.logits = if self.n_classes == 2 {
            let target = y.mapv(|c| if c == 1.0 { 1.0 } else { 0.0 });
            vec![self.fit_logit(x, &target)]
        } else {
            (0..self.n_classes)
                .map(|class| {
                    let target = y.mapv(|c| if c as usize == class { 1.0 } else { 0.0 });
                    self.fit_logit(x, &target)
                })
                .collect()
        };
        Ok(self)
    }

    /// Class probabilities; one-vs-rest scores are renormalized per row
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        if self.logits.is_empty() {
            return Err(AutoDsError::ModelNotFitted);
        }
        if x.ncols() != self.n_features {
            return Err(AutoDsError::ShapeMismatch {
                expected: format!("{} features", self.n_features),
                actual: format!("{} features", x.ncols()),
            });
        }
        let mut proba = Array2::zeros((x.nrows(), self.n_classes));
        if self.n_classes == 2 {
            let p = self.logits[0].probability(x);
            proba.column_mut(0).assign(&p.mapv(|v| 1.0 - v));
            proba.column_mut(1).assign(&p);
            return Ok(proba);
        }
        for (class, logit) in self.logits.iter().enumerate() {
            proba.column_mut(class).assign(&logit.probability(x));
        }
        for mut row in proba.rows_mut() {
            let sum = row.sum();
            if sum > 0.0 {
                row /= sum;
            }
        }
        Ok(proba)
    }

    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let proba = self.predict_proba(x)?;
        Ok(proba.rows().into_iter().map(|row| argmax(row) as f64).collect())
    }

    /// Mean absolute weight per feature across the fitted logits
    pub fn coefficient_magnitudes(&self) -> Option<Vec<f64>> {
        if self.logits.is_empty() {
            return None;
        }
        let mut total = vec![0.0; self.n_features];
        for logit in &self.logits {
            for (t, w) in total.iter_mut().zip(logit.weights.iter()) {
                *t += w.abs();
            }
        }
        let k = self.logits.len() as f64;
        Some(total.into_iter().map(|v| v / k).collect())
    }
}

impl Estimator for LinearRegression {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        LinearRegression::fit(self, x, y).map(|_| ())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        LinearRegression::predict(self, x)
    }

    fn feature_importances(&self) -> Option<Vec<f64>> {
        self.fit.abs_coefficients()
    }
}

impl Estimator for RidgeRegression {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        RidgeRegression::fit(self, x, y).map(|_| ())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        RidgeRegression::predict(self, x)
    }

    fn feature_importances(&self) -> Option<Vec<f64>> {
        self.fit.abs_coefficients()
    }
}

impl Estimator for LassoRegression {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        LassoRegression::fit(self, x, y).map(|_| ())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        LassoRegression::predict(self, x)
    }

    fn feature_importances(&self) -> Option<Vec<f64>> {
        self.fit.abs_coefficients()
    }
}

impl Estimator for LogisticRegression {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        LogisticRegression::fit(self, x, y).map(|_| ())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        LogisticRegression::predict(self, x)
    }

    fn decision_scores(&self, x: &Array2<f64>) -> Result<Option<Array1<f64>>> {
        if self.n_classes != 2 {
            return Ok(None);
        }
        Ok(Some(self.predict_proba(x)?.column(1).to_owned()))
    }

    fn feature_importances(&self) -> Option<Vec<f64>> {
        self.coefficient_magnitudes()
    }
}
