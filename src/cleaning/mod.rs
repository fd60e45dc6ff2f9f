//! Automatic data cleaning
//!
//! [`Cleaner::clean`] repairs a raw [`Dataset`] in a fixed order:
//!
//! 1. collapse exact duplicate rows (first occurrence wins)
//! 2. drop columns that are mostly missing, constant or identifier-like
//! 3. fill gaps: median/mode for sparse gaps, nearest neighbors otherwise
//! 4. cap numeric outliers at `Q1 - k·IQR` / `Q3 + k·IQR`
//! 5. coerce columns whose declared kind disagrees with their values
//!
//! A final settling pass re-applies steps 1, 2 and 4 until nothing changes,
//! so the output satisfies every post-condition and cleaning it again is a
//! no-op.

mod outlier;
mod policy;

pub use outlier::IqrBounds;
pub use policy::{
    detect_target, DefaultIdentifierPolicy, DefaultTargetPolicy, IdentifierPolicy, TargetPolicy,
    TARGET_KEYWORDS,
};

use std::collections::HashMap;

use ndarray::Array2;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::PipelineConfig;
use crate::dataset::{Column, ColumnKind, Dataset};
use crate::error::{AutoDsError, Result};
use crate::imputation::{median, mode, ImputeStrategy, Imputer, KNNImputer};

/// Why a column was removed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DropReason {
    TooManyMissing { fraction: f64 },
    Constant,
    IdentifierLike,
}

impl std::fmt::Display for DropReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DropReason::TooManyMissing { fraction } => {
                write!(f, "too many missing values ({:.1}%)", fraction * 100.0)
            }
            DropReason::Constant => write!(f, "constant"),
            DropReason::IdentifierLike => write!(f, "identifier-like"),
        }
    }
}

/// One decision taken for a column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ColumnAction {
    Imputed { strategy: ImputeStrategy, count: usize },
    OutlierCapped { lower: f64, upper: f64, count: usize },
    TypeCoerced { from: ColumnKind, to: ColumnKind },
    Dropped { reason: DropReason },
}

/// Actions taken for one input column; empty means untouched
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnReport {
    pub name: String,
    pub actions: Vec<ColumnAction>,
}

/// Non-fatal findings recorded while cleaning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CleaningWarning {
    ColumnDropped { column: String, reason: DropReason },
}

impl std::fmt::Display for CleaningWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CleaningWarning::ColumnDropped { column, reason } => {
                write!(f, "dropped column '{column}': {reason}")
            }
        }
    }
}

/// Record of one cleaning run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleaningReport {
    rows_before: usize,
    rows_after: usize,
    duplicates_removed: usize,
    columns: Vec<ColumnReport>,
    warnings: Vec<CleaningWarning>,
}

impl CleaningReport {
    pub fn rows_before(&self) -> usize {
        self.rows_before
    }

    pub fn rows_after(&self) -> usize {
        self.rows_after
    }

    pub fn duplicates_removed(&self) -> usize {
        self.duplicates_removed
    }

    /// Per-column records, in input column order
    pub fn columns(&self) -> &[ColumnReport] {
        &self.columns
    }

    pub fn warnings(&self) -> &[CleaningWarning] {
        &self.warnings
    }

    /// Actions taken for a column (empty when untouched or unknown)
    pub fn actions(&self, column: &str) -> &[ColumnAction] {
        self.columns
            .iter()
            .find(|c| c.name == column)
            .map_or(&[], |c| c.actions.as_slice())
    }

    /// Dropped columns with their reasons, in input order
    pub fn dropped_columns(&self) -> Vec<(&str, &DropReason)> {
        self.columns
            .iter()
            .filter_map(|c| {
                c.actions.iter().find_map(|a| match a {
                    ColumnAction::Dropped { reason } => Some((c.name.as_str(), reason)),
                    _ => None,
                })
            })
            .collect()
    }

    /// Human-readable lines, one per non-trivial decision
    pub fn summary_lines(&self) -> Vec<String> {
        let mut lines = vec![format!(
            "rows {} -> {} ({} duplicates removed)",
            self.rows_before, self.rows_after, self.duplicates_removed
        )];
        for column in &self.columns {
            for action in &column.actions {
                let text = match action {
                    ColumnAction::Imputed { strategy, count } => {
                        format!("{}: imputed {count} values with {strategy}", column.name)
                    }
                    ColumnAction::OutlierCapped { lower, upper, count } => format!(
                        "{}: capped {count} values to [{lower:.4}, {upper:.4}]",
                        column.name
                    ),
                    ColumnAction::TypeCoerced { from, to } => {
                        format!("{}: converted {from} -> {to}", column.name)
                    }
                    ColumnAction::Dropped { reason } => {
                        format!("{}: dropped ({reason})", column.name)
                    }
                };
                lines.push(text);
            }
        }
        lines
    }
}

/// Accumulates the report while the cleaner runs
struct ReportBuilder {
    rows_before: usize,
    duplicates_removed: usize,
    columns: Vec<ColumnReport>,
    index: HashMap<String, usize>,
    warnings: Vec<CleaningWarning>,
}

impl ReportBuilder {
    fn new(dataset: &Dataset) -> Self {
        let columns: Vec<ColumnReport> = dataset
            .columns()
            .iter()
            .map(|c| ColumnReport {
                name: c.name().to_string(),
                actions: Vec::new(),
            })
            .collect();
        let index = columns
            .iter()
            .enumerate()
            .map(|(i, c)| (c.name.clone(), i))
            .collect();
        Self {
            rows_before: dataset.n_rows(),
            duplicates_removed: 0,
            columns,
            index,
            warnings: Vec::new(),
        }
    }

    fn push(&mut self, column: &str, action: ColumnAction) {
        if let Some(&i) = self.index.get(column) {
            self.columns[i].actions.push(action);
        }
    }

    fn drop_column(&mut self, column: &str, reason: DropReason) {
        warn!(column, %reason, "Dropping column");
        self.warnings.push(CleaningWarning::ColumnDropped {
            column: column.to_string(),
            reason: reason.clone(),
        });
        self.push(column, ColumnAction::Dropped { reason });
    }

    /// Merge a later capping pass into the column's existing record
    fn capped(&mut self, column: &str, bounds: &IqrBounds, count: usize) {
        let Some(&i) = self.index.get(column) else {
            return;
        };
        let actions = &mut self.columns[i].actions;
        for action in actions.iter_mut() {
            if let ColumnAction::OutlierCapped { lower, upper, count: total } = action {
                *lower = bounds.lower;
                *upper = bounds.upper;
                *total += count;
                return;
            }
        }
        actions.push(ColumnAction::OutlierCapped {
            lower: bounds.lower,
            upper: bounds.upper,
            count,
        });
    }

    fn finish(self, rows_after: usize) -> CleaningReport {
        CleaningReport {
            rows_before: self.rows_before,
            rows_after,
            duplicates_removed: self.duplicates_removed,
            columns: self.columns,
            warnings: self.warnings,
        }
    }
}

/// Working copy of a column during imputation and capping
struct WorkColumn {
    name: String,
    declared: ColumnKind,
    values: WorkValues,
}

enum WorkValues {
    Numeric(Vec<Option<f64>>),
    Text(Vec<Option<String>>),
}

impl WorkColumn {
    fn from_column(column: &Column) -> Self {
        let values = match column.numeric_view() {
            Some(values) => WorkValues::Numeric(values),
            None => WorkValues::Text(column.as_text().map(<[_]>::to_vec).unwrap_or_default()),
        };
        Self {
            name: column.name().to_string(),
            declared: column.kind(),
            values,
        }
    }

    fn missing_fraction(&self) -> f64 {
        let (missing, len) = match &self.values {
            WorkValues::Numeric(v) => (v.iter().filter(|x| x.is_none()).count(), v.len()),
            WorkValues::Text(v) => (v.iter().filter(|x| x.is_none()).count(), v.len()),
        };
        if len == 0 {
            0.0
        } else {
            missing as f64 / len as f64
        }
    }
}

/// Dataset cleaner
pub struct Cleaner {
    config: PipelineConfig,
    identifier_policy: Box<dyn IdentifierPolicy>,
}

impl Default for Cleaner {
    fn default() -> Self {
        Self::new(PipelineConfig::default())
    }
}

impl Cleaner {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            identifier_policy: Box::new(DefaultIdentifierPolicy::default()),
        }
    }

    /// Replace the identifier heuristic
    pub fn with_identifier_policy(mut self, policy: impl IdentifierPolicy + 'static) -> Self {
        self.identifier_policy = Box::new(policy);
        self
    }

    /// Step 2 decision for a single column
    pub fn drop_reason(&self, column: &Column) -> Option<DropReason> {
        let fraction = column.missing_fraction();
        if fraction > self.config.missing_high_threshold {
            Some(DropReason::TooManyMissing { fraction })
        } else if column.distinct_count() <= 1 {
            Some(DropReason::Constant)
        } else if self.identifier_policy.is_identifier(column) {
            Some(DropReason::IdentifierLike)
        } else {
            None
        }
    }

    /// Clean a dataset, returning the new dataset and a report of every decision
    pub fn clean(&self, dataset: &Dataset) -> Result<(Dataset, CleaningReport)> {
        self.config.validate()?;
        if dataset.n_cols() == 0 || dataset.n_rows() == 0 {
            return Err(AutoDsError::Configuration(format!(
                "cannot clean an empty dataset ({} rows x {} columns)",
                dataset.n_rows(),
                dataset.n_cols()
            )));
        }
        info!(rows = dataset.n_rows(), columns = dataset.n_cols(), "Cleaning dataset");

        let mut report = ReportBuilder::new(dataset);

        // 1. duplicates
        let deduped = Self::remove_duplicates(dataset, &mut report);

        // 2. useless columns
        let pruned = self.prune_columns(&deduped, &mut report)?;

        // 3-5. gaps, outliers, kinds
        let mut work: Vec<WorkColumn> = pruned.columns().iter().map(WorkColumn::from_column).collect();
        self.resolve_missing(&mut work, &mut report)?;
        for column in &mut work {
            if let WorkValues::Numeric(values) = &mut column.values {
                self.cap_outliers(&column.name, values, &mut report);
            }
        }
        let mut current = Self::normalize_types(work, &mut report)?;

        // Settle: capping and pruning can expose new duplicates or constants
        loop {
            let before = (current.n_rows(), current.n_cols());
            current = self.prune_columns(&current, &mut report)?;
            current = Self::remove_duplicates(&current, &mut report);
            let moved = self.cap_dataset(&mut current, &mut report)?;
            if moved == 0 && before == (current.n_rows(), current.n_cols()) {
                break;
            }
        }

        info!(
            rows_before = dataset.n_rows(),
            rows_after = current.n_rows(),
            columns_after = current.n_cols(),
            "Cleaning complete"
        );
        let report = report.finish(current.n_rows());
        Ok((current, report))
    }

    fn remove_duplicates(dataset: &Dataset, report: &mut ReportBuilder) -> Dataset {
        let keep = dataset.first_occurrences();
        let removed = dataset.n_rows() - keep.len();
        if removed == 0 {
            return dataset.clone();
        }
        debug!(removed, "Removed duplicate rows");
        report.duplicates_removed += removed;
        dataset.select_rows(&keep)
    }

    fn prune_columns(&self, dataset: &Dataset, report: &mut ReportBuilder) -> Result<Dataset> {
        let mut kept = Vec::with_capacity(dataset.n_cols());
        for column in dataset.columns() {
            match self.drop_reason(column) {
                Some(reason) => report.drop_column(column.name(), reason),
                None => kept.push(column.clone()),
            }
        }

        if kept.is_empty() {
            let dropped: Vec<String> = report
                .columns
                .iter()
                .filter_map(|c| {
                    c.actions.iter().find_map(|a| match a {
                        ColumnAction::Dropped { reason } => Some(format!("{} ({reason})", c.name)),
                        _ => None,
                    })
                })
                .collect();
            return Err(AutoDsError::Configuration(format!(
                "no usable columns remain after cleaning; dropped: {}",
                dropped.join(", ")
            )));
        }
        if kept.len() == dataset.n_cols() {
            return Ok(dataset.clone());
        }
        Dataset::new(kept)
    }

    fn resolve_missing(&self, work: &mut [WorkColumn], report: &mut ReportBuilder) -> Result<()> {
        let low = self.config.missing_low_threshold;
        let high = self.config.missing_high_threshold;

        let mut neighbor_columns = Vec::new();
        for (idx, column) in work.iter_mut().enumerate() {
            let m = column.missing_fraction();
            if m == 0.0 {
                continue;
            }
            if m > high {
                return Err(AutoDsError::Configuration(format!(
                    "column '{}' still exceeds the missing threshold after pruning",
                    column.name
                )));
            }
            if m < low {
                let (strategy, count) = fill_simple(&mut column.values);
                debug!(column = %column.name, %strategy, count, "Imputed");
                report.push(&column.name, ColumnAction::Imputed { strategy, count });
            } else {
                neighbor_columns.push(idx);
            }
        }

        // numeric columns first so categorical votes see complete features
        neighbor_columns.sort_by_key(|&i| !matches!(work[i].values, WorkValues::Numeric(_)));
        for idx in neighbor_columns {
            let (strategy, count) = match &work[idx].values {
                WorkValues::Numeric(_) => self.impute_numeric_knn(work, idx)?,
                WorkValues::Text(_) => self.impute_categorical_knn(work, idx)?,
            };
            debug!(column = %work[idx].name, %strategy, count, "Imputed");
            report.push(&work[idx].name, ColumnAction::Imputed { strategy, count });
        }
        Ok(())
    }

    /// Numeric matrix of the given columns, NaN for gaps
    fn numeric_matrix(work: &[WorkColumn], columns: &[usize], n_rows: usize) -> Array2<f64> {
        let mut x = Array2::from_elem((n_rows, columns.len()), f64::NAN);
        for (j, &c) in columns.iter().enumerate() {
            if let WorkValues::Numeric(values) = &work[c].values {
                for (i, v) in values.iter().enumerate() {
                    if let Some(v) = v {
                        x[[i, j]] = *v;
                    }
                }
            }
        }
        x
    }

    fn other_numeric(work: &[WorkColumn], idx: usize) -> Vec<usize> {
        work.iter()
            .enumerate()
            .filter(|(j, c)| *j != idx && matches!(c.values, WorkValues::Numeric(_)))
            .map(|(j, _)| j)
            .collect()
    }

    fn impute_numeric_knn(&self, work: &mut [WorkColumn], idx: usize) -> Result<(ImputeStrategy, usize)> {
        let k = self.config.knn_neighbors;
        let n_rows = match &work[idx].values {
            WorkValues::Numeric(v) => v.len(),
            WorkValues::Text(v) => v.len(),
        };
        let others = Self::other_numeric(work, idx);

        let mut columns = vec![idx];
        columns.extend(&others);
        let x = Self::numeric_matrix(work, &columns, n_rows);

        let mut imputer = KNNImputer::new(k);
        let filled = if others.is_empty() {
            None
        } else {
            match imputer.fit(&x) {
                Ok(()) => Some(imputer.transform(&x)?),
                Err(err) => {
                    debug!(column = %work[idx].name, %err, "KNN imputation unavailable");
                    None
                }
            }
        };

        let WorkValues::Numeric(values) = &mut work[idx].values else {
            return Ok((ImputeStrategy::MedianFallback, 0));
        };
        match filled {
            Some(filled) => {
                let mut count = 0;
                for (i, v) in values.iter_mut().enumerate() {
                    if v.is_none() {
                        *v = Some(filled[[i, 0]]);
                        count += 1;
                    }
                }
                Ok((ImputeStrategy::NearestNeighbors { k }, count))
            }
            None => {
                let (_, count) = fill_numeric_median(values);
                Ok((ImputeStrategy::MedianFallback, count))
            }
        }
    }

    fn impute_categorical_knn(&self, work: &mut [WorkColumn], idx: usize) -> Result<(ImputeStrategy, usize)> {
        let k = self.config.knn_neighbors;
        let others = Self::other_numeric(work, idx);
        let WorkValues::Text(labels) = &work[idx].values else {
            return Ok((ImputeStrategy::ModeFallback, 0));
        };
        let labels = labels.clone();
        let fallback = mode(&labels);

        let x = Self::numeric_matrix(work, &others, labels.len());
        let mut imputer = KNNImputer::new(k);
        let fitted = !others.is_empty() && imputer.fit(&x).is_ok();

        let mut filled = labels.clone();
        let mut count = 0;
        for (row, slot) in filled.iter_mut().enumerate() {
            if slot.is_some() {
                continue;
            }
            let mut vote = None;
            if fitted {
                let sample: Vec<f64> = x.row(row).to_vec();
                let neighbors = imputer.nearest_rows(&sample, |r| labels[r].is_some())?;
                vote = majority_label(neighbors.iter().filter_map(|(r, _)| labels[*r].as_deref()));
            }
            *slot = vote.or_else(|| fallback.clone());
            count += 1;
        }

        if let WorkValues::Text(values) = &mut work[idx].values {
            *values = filled;
        }
        let strategy = if fitted {
            ImputeStrategy::NeighborVote { k }
        } else {
            ImputeStrategy::ModeFallback
        };
        Ok((strategy, count))
    }

    fn cap_outliers(&self, name: &str, values: &mut [Option<f64>], report: &mut ReportBuilder) -> usize {
        let Some(bounds) = IqrBounds::fit(values, self.config.outlier_iqr_multiplier) else {
            return 0;
        };
        // zero spread would collapse the column to a single value
        if bounds.q3 == bounds.q1 {
            return 0;
        }
        let moved = bounds.cap(values);
        if moved > 0 {
            debug!(column = name, moved, lower = bounds.lower, upper = bounds.upper, "Capped outliers");
            report.capped(name, &bounds, moved);
        }
        moved
    }

    fn cap_dataset(&self, dataset: &mut Dataset, report: &mut ReportBuilder) -> Result<usize> {
        let mut total = 0;
        let mut columns = Vec::with_capacity(dataset.n_cols());
        for column in dataset.columns() {
            match column.as_numeric() {
                Some(values) => {
                    let mut values = values.to_vec();
                    let moved = self.cap_outliers(column.name(), &mut values, report);
                    total += moved;
                    if moved > 0 {
                        columns.push(Column::numeric(column.name(), values));
                    } else {
                        columns.push(column.clone());
                    }
                }
                None => columns.push(column.clone()),
            }
        }
        if total > 0 {
            *dataset = Dataset::new(columns)?;
        }
        Ok(total)
    }

    fn normalize_types(work: Vec<WorkColumn>, report: &mut ReportBuilder) -> Result<Dataset> {
        let mut columns = Vec::with_capacity(work.len());
        for column in work {
            let built = match column.values {
                WorkValues::Numeric(values) => {
                    if column.declared != ColumnKind::Numeric {
                        debug!(column = %column.name, from = %column.declared, "Coerced to numeric");
                        report.push(
                            &column.name,
                            ColumnAction::TypeCoerced {
                                from: column.declared,
                                to: ColumnKind::Numeric,
                            },
                        );
                    }
                    Column::numeric(column.name, values)
                }
                WorkValues::Text(values) => {
                    let built = Column::text(column.name, values);
                    match column.declared {
                        ColumnKind::Categorical | ColumnKind::FreeText => {
                            built.with_kind(column.declared)
                        }
                        declared => {
                            let to = built.kind();
                            report.push(built.name(), ColumnAction::TypeCoerced { from: declared, to });
                            built
                        }
                    }
                }
            };
            columns.push(built);
        }
        Dataset::new(columns)
    }
}

/// Fill every gap with the median (numeric) or mode (text)
fn fill_simple(values: &mut WorkValues) -> (ImputeStrategy, usize) {
    match values {
        WorkValues::Numeric(v) => fill_numeric_median(v),
        WorkValues::Text(v) => {
            let fill = mode(v);
            let mut count = 0;
            for slot in v.iter_mut().filter(|x| x.is_none()) {
                *slot = fill.clone();
                count += 1;
            }
            (ImputeStrategy::Mode, count)
        }
    }
}

fn fill_numeric_median(values: &mut [Option<f64>]) -> (ImputeStrategy, usize) {
    let fill = median(values);
    let mut count = 0;
    for slot in values.iter_mut().filter(|x| x.is_none()) {
        *slot = fill;
        count += 1;
    }
    (ImputeStrategy::Median, count)
}

/// Most common label; ties go to the label seen first (the nearest neighbor)
fn majority_label<'a>(labels: impl Iterator<Item = &'a str>) -> Option<String> {
    let mut counts: Vec<(&str, usize)> = Vec::new();
    for label in labels {
        match counts.iter_mut().find(|(l, _)| *l == label) {
            Some(entry) => entry.1 += 1,
            None => counts.push((label, 1)),
        }
    }
    let best = counts.iter().map(|(_, c)| *c).max()?;
    counts
        .into_iter()
        .find(|(_, c)| *c == best)
        .map(|(l, _)| l.to_string())
}

/// Clean with default settings
pub fn clean(dataset: &Dataset) -> Result<(Dataset, CleaningReport)> {
    Cleaner::default().clean(dataset)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numeric(name: &str, values: &[f64]) -> Column {
        Column::from_f64(name, values.to_vec())
    }

    #[test]
    fn test_duplicates_collapsed_in_order() {
        let ds = Dataset::new(vec![
            numeric("a", &[1.5, 2.0, 1.5, 3.0]),
            Column::from_strs("b", &["x", "y", "x", "x"]),
        ])
        .unwrap();

        let (cleaned, report) = clean(&ds).unwrap();
        assert_eq!(report.duplicates_removed(), 1);
        assert_eq!(cleaned.n_rows(), 3);
        assert_eq!(
            cleaned.column("a").unwrap().as_numeric().unwrap(),
            &[Some(1.5), Some(2.0), Some(3.0)]
        );
    }

    #[derive(Clone, Default)]
    struct CapturedLogs(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_decisions_are_logged() {
        let ds = Dataset::new(vec![
            numeric("a", &[1.5, 2.0, 1.5, 3.0]),
            Column::from_strs("b", &["x", "y", "x", "x"]),
            numeric("flat", &[7.0, 7.0, 7.0, 7.0]),
        ])
        .unwrap();

        let logs = CapturedLogs::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        tracing::subscriber::with_default(subscriber, || clean(&ds).unwrap());

        let text = String::from_utf8(logs.0.lock().unwrap().clone()).unwrap();
        assert!(text.contains("Cleaning dataset"), "{text}");
        assert!(text.contains("Removed duplicate rows"), "{text}");
        assert!(text.contains("Dropping column"), "{text}");
    }

    #[test]
    fn test_constant_and_sparse_columns_dropped() {
        let ds = Dataset::new(vec![
            numeric("keep", &[1.0, 2.0, 3.0, 5.0]),
            numeric("flat", &[7.0, 7.0, 7.0, 7.0]),
            Column::numeric("sparse", vec![Some(1.0), None, None, None]),
            Column::from_strs("grp", &["a", "b", "a", "b"]),
        ])
        .unwrap();

        let (cleaned, report) = clean(&ds).unwrap();
        assert_eq!(cleaned.column_names(), vec!["keep", "grp"]);
        assert_eq!(report.actions("flat"), &[ColumnAction::Dropped { reason: DropReason::Constant }]);
        assert!(matches!(
            report.actions("sparse")[0],
            ColumnAction::Dropped { reason: DropReason::TooManyMissing { .. } }
        ));
        assert_eq!(report.warnings().len(), 2);
    }

    #[test]
    fn test_sparse_gaps_use_median_and_mode() {
        let mut x: Vec<Option<f64>> = (0..40).map(|i| Some(i as f64)).collect();
        x[3] = None;
        let mut g: Vec<Option<String>> = (0..40).map(|i| Some(if i % 3 == 0 { "a" } else { "b" }.to_string())).collect();
        g[5] = None;
        let ds = Dataset::new(vec![
            Column::numeric("x", x),
            Column::text("g", g),
            numeric("z", &(0..40).map(|i| (i * 7 % 11) as f64).collect::<Vec<_>>()),
        ])
        .unwrap();

        let (cleaned, report) = clean(&ds).unwrap();
        assert_eq!(report.actions("x"), &[ColumnAction::Imputed { strategy: ImputeStrategy::Median, count: 1 }]);
        assert_eq!(report.actions("g"), &[ColumnAction::Imputed { strategy: ImputeStrategy::Mode, count: 1 }]);
        assert_eq!(cleaned.column("x").unwrap().as_numeric().unwrap()[3], Some(20.0));
        assert_eq!(cleaned.column("g").unwrap().as_text().unwrap()[5].as_deref(), Some("b"));
    }

    #[test]
    fn test_outliers_capped_without_removing_rows() {
        let mut values: Vec<f64> = (0..20).map(|i| (i % 10) as f64).collect();
        values[19] = 1_000.0;
        let ds = Dataset::new(vec![
            numeric("v", &values),
            numeric("w", &(0..20).map(|i| i as f64 * 0.5).collect::<Vec<_>>()),
        ])
        .unwrap();

        let (cleaned, report) = clean(&ds).unwrap();
        assert_eq!(cleaned.n_rows(), 20);
        match &report.actions("v")[0] {
            ColumnAction::OutlierCapped { upper, count, .. } => {
                assert_eq!(*count, 1);
                assert_eq!(cleaned.column("v").unwrap().as_numeric().unwrap()[19], Some(*upper));
            }
            other => panic!("unexpected action {other:?}"),
        }
    }

    #[test]
    fn test_numeric_text_is_coerced() {
        let ds = Dataset::new(vec![
            Column::from_strs("amount", &["1.5", "2", "3.25", "2"]),
            Column::from_strs("grp", &["a", "b", "a", "a"]),
        ])
        .unwrap();

        let (cleaned, report) = clean(&ds).unwrap();
        let amount = cleaned.column("amount").unwrap();
        assert!(amount.is_numeric());
        assert_eq!(amount.kind(), ColumnKind::Numeric);
        assert_eq!(
            report.actions("amount"),
            &[ColumnAction::TypeCoerced { from: ColumnKind::Categorical, to: ColumnKind::Numeric }]
        );
    }

    #[test]
    fn test_zero_spread_column_is_not_capped() {
        let mut flag = vec![0.0; 30];
        flag[4] = 1.0;
        flag[11] = 1.0;
        let ds = Dataset::new(vec![
            numeric("flag", &flag),
            numeric("x", &(0..30).map(|i| i as f64 * 1.1).collect::<Vec<_>>()),
        ])
        .unwrap();

        let (cleaned, report) = clean(&ds).unwrap();
        assert!(report.actions("flag").is_empty());
        assert_eq!(cleaned.column("flag").unwrap().distinct_count(), 2);
    }

    #[test]
    fn test_all_columns_dropped_is_configuration_error() {
        let ds = Dataset::new(vec![
            Column::from_strs("user", &["u1", "u2", "u3"]),
            numeric("flat", &[1.0, 1.0, 1.0]),
        ])
        .unwrap();

        match clean(&ds) {
            Err(AutoDsError::Configuration(msg)) => {
                assert!(msg.contains("user (identifier-like)"));
                assert!(msg.contains("flat (constant)"));
            }
            other => panic!("expected configuration error, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_dataset_rejected() {
        assert!(matches!(clean(&Dataset::default()), Err(AutoDsError::Configuration(_))));
    }

    #[test]
    fn test_majority_label_tie_prefers_nearest() {
        let labels = ["b", "a", "a", "b"];
        assert_eq!(majority_label(labels.into_iter()).as_deref(), Some("b"));
        assert_eq!(majority_label(std::iter::empty()), None);
    }
}
