//! IQR-based outlier capping
//!
//! Values beyond `Q1 - k·IQR` or `Q3 + k·IQR` are clamped to the bound.
//! Rows are never removed. Quartiles use the nearest-rank definition, so a
//! quartile is always an observed value; clamping keeps value ranks, which
//! makes capping an already capped column a no-op.

use serde::{Deserialize, Serialize};

/// Capping bounds fitted on one column
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IqrBounds {
    pub q1: f64,
    pub q3: f64,
    pub lower: f64,
    pub upper: f64,
}

impl IqrBounds {
    /// Fit bounds on the non-missing values; `None` when there are none
    pub fn fit(values: &[Option<f64>], factor: f64) -> Option<Self> {
        let mut present: Vec<f64> = values.iter().flatten().copied().collect();
        if present.is_empty() {
            return None;
        }
        present.sort_by(|a, b| a.total_cmp(b));
        let q1 = nearest_rank(&present, 0.25);
        let q3 = nearest_rank(&present, 0.75);
        let iqr = q3 - q1;
        Some(Self {
            q1,
            q3,
            lower: q1 - factor * iqr,
            upper: q3 + factor * iqr,
        })
    }

    /// Clamp values in place and return how many moved
    pub fn cap(&self, values: &mut [Option<f64>]) -> usize {
        let mut moved = 0;
        for v in values.iter_mut().flatten() {
            let clamped = v.clamp(self.lower, self.upper);
            if clamped != *v {
                *v = clamped;
                moved += 1;
            }
        }
        moved
    }
}

fn nearest_rank(sorted: &[f64], q: f64) -> f64 {
    let rank = (q * sorted.len() as f64).ceil() as usize;
    sorted[rank.clamp(1, sorted.len()) - 1]
}
