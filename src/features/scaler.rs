//! Standard scaling: (x - mean) / std with population statistics

use ndarray::{Array2, Axis};
use serde::{Deserialize, Serialize};

use crate::error::{AutoDsError, Result};

/// Per-column center and scale
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    centers: Vec<f64>,
    scales: Vec<f64>,
}

impl StandardScaler {
    /// Fit on every column of `x`; zero-variance columns get scale 1
    pub fn fit(x: &Array2<f64>) -> Self {
        let n = x.nrows().max(1) as f64;
        let mut centers = Vec::with_capacity(x.ncols());
        let mut scales = Vec::with_capacity(x.ncols());
        for column in x.axis_iter(Axis(1)) {
            let mean = column.sum() / n;
            let var = column.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
            let std = var.sqrt();
            centers.push(mean);
            scales.push(if std > 0.0 && std.is_finite() { std } else { 1.0 });
        }
        Self { centers, scales }
    }

    /// Keep only the given columns, in the given order
    pub fn subset(&self, columns: &[usize]) -> Self {
        Self {
            centers: columns.iter().map(|&i| self.centers[i]).collect(),
            scales: columns.iter().map(|&i| self.scales[i]).collect(),
        }
    }

    pub fn centers(&self) -> &[f64] {
        &self.centers
    }

    pub fn scales(&self) -> &[f64] {
        &self.scales
    }

    pub fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        if x.ncols() != self.centers.len() {
            return Err(AutoDsError::ShapeMismatch {
                expected: format!("{} columns", self.centers.len()),
                actual: format!("{} columns", x.ncols()),
            });
        }
        let mut out = x.clone();
        for (j, mut column) in out.axis_iter_mut(Axis(1)).enumerate() {
            let (center, scale) = (self.centers[j], self.scales[j]);
            column.mapv_inplace(|v| (v - center) / scale);
        }
        Ok(out)
    }
}
