//! Seeded train/test partitioning

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::TaskType;
use crate::error::{AutoDsError, Result};

/// Row indices of each side of a hold-out split, ascending
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainTestSplit {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
    pub stratified: bool,
}

/// Why a classification split could not preserve class proportions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplitFallback {
    /// Code of the smallest class
    pub class: usize,
    pub members: usize,
    /// Members that class needs to stratify at the requested test fraction
    pub required: usize,
}

/// Stratify only if every class keeps at least one row on each side:
/// each class needs two members and `floor(n_c * fraction) >= 1`.
fn stratification_blocker(groups: &[Vec<usize>], test_fraction: f64) -> Option<SplitFallback> {
    let required = ((1.0 / test_fraction).ceil() as usize).max(2);
    groups
        .iter()
        .enumerate()
        .filter(|(_, rows)| !rows.is_empty())
        .filter(|(_, rows)| rows.len() < 2 || ((rows.len() as f64) * test_fraction).floor() < 1.0)
        .min_by_key(|(class, rows)| (rows.len(), *class))
        .map(|(class, rows)| SplitFallback {
            class,
            members: rows.len(),
            required,
        })
}

/// Split row indices into train and test. Classification targets are
/// stratified by class code when every class is large enough; otherwise the
/// split falls back to a plain shuffle and reports why.
pub fn train_test_split(
    y: &[f64],
    task: TaskType,
    test_fraction: f64,
    seed: u64,
) -> Result<(TrainTestSplit, Option<SplitFallback>)> {
    let n = y.len();
    if n < 2 {
        return Err(AutoDsError::Configuration(format!(
            "need at least 2 rows to split into train and test, got {n}"
        )));
    }
    if !(test_fraction > 0.0 && test_fraction < 1.0) {
        return Err(AutoDsError::Configuration(format!(
            "test_fraction must be in (0, 1), got {test_fraction}"
        )));
    }
    let mut rng = ChaCha8Rng::seed_from_u64(seed);

    let mut fallback = None;
    if task == TaskType::Classification {
        let n_classes = y.iter().map(|&c| c.max(0.0) as usize + 1).max().unwrap_or(0);
        let mut groups: Vec<Vec<usize>> = vec![Vec::new(); n_classes];
        for (i, &c) in y.iter().enumerate() {
            groups[c.max(0.0) as usize].push(i);
        }

        match stratification_blocker(&groups, test_fraction) {
            None => {
                let mut train = Vec::with_capacity(n);
                let mut test = Vec::new();
                for rows in groups.iter_mut().filter(|rows| !rows.is_empty()) {
                    rows.shuffle(&mut rng);
                    let n_c = rows.len();
                    let n_test = ((n_c as f64 * test_fraction).round() as usize).clamp(1, n_c - 1);
                    test.extend_from_slice(&rows[..n_test]);
                    train.extend_from_slice(&rows[n_test..]);
                }
                train.sort_unstable();
                test.sort_unstable();
                debug!(train = train.len(), test = test.len(), "Stratified split");
                return Ok((
                    TrainTestSplit {
                        train,
                        test,
                        stratified: true,
                    },
                    None,
                ));
            }
            Some(blocker) => fallback = Some(blocker),
        }
    }

    let mut rows: Vec<usize> = (0..n).collect();
    rows.shuffle(&mut rng);
    let n_test = ((n as f64 * test_fraction).ceil() as usize).clamp(1, n - 1);
    let mut test = rows[..n_test].to_vec();
    let mut train = rows[n_test..].to_vec();
    train.sort_unstable();
    test.sort_unstable();
    debug!(train = train.len(), test = test.len(), "Shuffled split");

    Ok((
        TrainTestSplit {
            train,
            test,
            stratified: false,
        },
        fallback,
    ))
}
