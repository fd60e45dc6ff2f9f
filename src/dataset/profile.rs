//! Quick descriptive profile of a dataset

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::{ColumnKind, Dataset};
use crate::cleaning::{DefaultIdentifierPolicy, IdentifierPolicy};

/// Per-column profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnProfile {
    pub name: String,
    /// Kind implied by the values
    pub kind: ColumnKind,
    pub missing_count: usize,
    pub missing_fraction: f64,
    pub distinct_count: usize,
    pub identifier_like: bool,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub mean: Option<f64>,
    pub std: Option<f64>,
    /// Most frequent value and its count (ties go to the first seen)
    pub mode: Option<(String, usize)>,
}

/// Dataset-level profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetProfile {
    pub n_rows: usize,
    pub n_cols: usize,
    pub duplicate_rows: usize,
    pub total_missing: usize,
    pub columns: Vec<ColumnProfile>,
}

impl DatasetProfile {
    pub fn new(dataset: &Dataset, policy: &dyn IdentifierPolicy) -> Self {
        let columns: Vec<ColumnProfile> = dataset
            .columns()
            .iter()
            .map(|column| {
                let mut profile = ColumnProfile {
                    name: column.name().to_string(),
                    kind: column.observed_kind(),
                    missing_count: column.missing_count(),
                    missing_fraction: column.missing_fraction(),
                    distinct_count: column.distinct_count(),
                    identifier_like: policy.is_identifier(column),
                    min: None,
                    max: None,
                    mean: None,
                    std: None,
                    mode: None,
                };
                if profile.identifier_like {
                    profile.kind = ColumnKind::Identifier;
                }

                if let Some(values) = column.numeric_view() {
                    let present: Vec<f64> = values.into_iter().flatten().collect();
                    if !present.is_empty() {
                        let n = present.len() as f64;
                        let mean = present.iter().sum::<f64>() / n;
                        let var = present.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
                        profile.min = present.iter().copied().reduce(f64::min);
                        profile.max = present.iter().copied().reduce(f64::max);
                        profile.mean = Some(mean);
                        profile.std = Some(var.sqrt());
                    }
                }

                let mut counts: HashMap<String, (usize, usize)> = HashMap::new();
                for row in 0..column.len() {
                    if let Some(v) = column.display_value(row) {
                        let entry = counts.entry(v).or_insert((0, row));
                        entry.0 += 1;
                    }
                }
                profile.mode = counts
                    .into_iter()
                    .max_by(|a, b| a.1 .0.cmp(&b.1 .0).then(b.1 .1.cmp(&a.1 .1)))
                    .map(|(value, (count, _))| (value, count));

                profile
            })
            .collect();

        Self {
            n_rows: dataset.n_rows(),
            n_cols: dataset.n_cols(),
            duplicate_rows: dataset.n_rows() - dataset.first_occurrences().len(),
            total_missing: columns.iter().map(|c| c.missing_count).sum(),
            columns,
        }
    }

    /// Columns whose values are numbers (stored or parseable)
    pub fn numeric_columns(&self) -> Vec<&str> {
        self.columns
            .iter()
            .filter(|c| c.kind == ColumnKind::Numeric)
            .map(|c| c.name.as_str())
            .collect()
    }
}

impl Dataset {
    /// Profile with the default identifier policy
    pub fn profile(&self) -> DatasetProfile {
        DatasetProfile::new(self, &DefaultIdentifierPolicy::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Column;

    #[test]
    fn test_profile_counts() {
        let ds = Dataset::new(vec![
            Column::numeric("x", vec![Some(1.0), Some(3.0), None, Some(1.0)]),
            Column::from_strs("c", &["a", "b", "a", "a"]),
        ])
        .unwrap();

        let profile = ds.profile();
        assert_eq!(profile.n_rows, 4);
        assert_eq!(profile.total_missing, 1);
        assert_eq!(profile.duplicate_rows, 1);

        let x = &profile.columns[0];
        assert_eq!(x.min, Some(1.0));
        assert_eq!(x.max, Some(3.0));
        assert_eq!(x.mode, Some(("1".to_string(), 2)));

        let c = &profile.columns[1];
        assert_eq!(c.kind, ColumnKind::Categorical);
        assert_eq!(c.mode, Some(("a".to_string(), 3)));
        assert_eq!(profile.numeric_columns(), vec!["x"]);
    }
}
