//! In-memory tabular dataset
//!
//! A [`Dataset`] is an ordered set of uniquely named [`Column`]s of equal
//! length. Every stage of the pipeline consumes a dataset by reference and
//! produces a new one, so earlier outputs stay valid for inspection.

mod frame;
mod profile;

pub use profile::{ColumnProfile, DatasetProfile};

use std::collections::HashSet;

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::error::{AutoDsError, Result};

/// Text cells treated as missing on ingestion (compared case-insensitively)
const MISSING_TOKENS: &[&str] = &["na", "n/a", "nan", "null", "none", "?", "-"];

/// Mean value length above which text is considered free-form
const FREE_TEXT_MIN_MEAN_LENGTH: f64 = 50.0;

/// Declared kind of a column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColumnKind {
    Numeric,
    Categorical,
    FreeText,
    Identifier,
}

impl std::fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ColumnKind::Numeric => "numeric",
            ColumnKind::Categorical => "categorical",
            ColumnKind::FreeText => "free-text",
            ColumnKind::Identifier => "identifier-like",
        };
        f.write_str(s)
    }
}

/// Column storage. `None` marks a missing cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ColumnData {
    Numeric(Vec<Option<f64>>),
    Text(Vec<Option<String>>),
}

/// Hashable view of one cell, used for duplicate detection and distinct counts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cell<'a> {
    Missing,
    Number(u64),
    Text(&'a str),
}

fn number_key(v: f64) -> u64 {
    // -0.0 and 0.0 compare equal and must hash equal
    if v == 0.0 {
        0.0f64.to_bits()
    } else {
        v.to_bits()
    }
}

/// Parse a text cell as a finite number
pub fn parse_number(s: &str) -> Option<f64> {
    s.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

fn normalize_text(value: Option<String>) -> Option<String> {
    let value = value?;
    let trimmed = value.trim();
    if trimmed.is_empty() || MISSING_TOKENS.iter().any(|t| trimmed.eq_ignore_ascii_case(t)) {
        None
    } else if trimmed.len() == value.len() {
        Some(value)
    } else {
        Some(trimmed.to_string())
    }
}

/// A named, typed column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    name: String,
    kind: ColumnKind,
    data: ColumnData,
}

impl Column {
    /// Numeric column; NaN and infinities are stored as missing
    pub fn numeric(name: impl Into<String>, values: Vec<Option<f64>>) -> Self {
        let values = values
            .into_iter()
            .map(|v| v.filter(|x| x.is_finite()))
            .collect();
        Self {
            name: name.into(),
            kind: ColumnKind::Numeric,
            data: ColumnData::Numeric(values),
        }
    }

    /// Dense numeric column; NaN becomes missing
    pub fn from_f64(name: impl Into<String>, values: Vec<f64>) -> Self {
        Self::numeric(name, values.into_iter().map(Some).collect())
    }

    /// Text column. Values are trimmed and common missing markers become
    /// missing. The kind is categorical unless values are long free text.
    pub fn text(name: impl Into<String>, values: Vec<Option<String>>) -> Self {
        let values: Vec<Option<String>> = values.into_iter().map(normalize_text).collect();
        let kind = infer_text_kind(&values);
        Self {
            name: name.into(),
            kind,
            data: ColumnData::Text(values),
        }
    }

    /// Convenience constructor from string slices
    pub fn from_strs(name: impl Into<String>, values: &[&str]) -> Self {
        Self::text(name, values.iter().map(|s| Some(s.to_string())).collect())
    }

    /// Override the declared kind
    pub fn with_kind(mut self, kind: ColumnKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ColumnKind {
        self.kind
    }

    pub fn data(&self) -> &ColumnData {
        &self.data
    }

    pub fn len(&self) -> usize {
        match &self.data {
            ColumnData::Numeric(v) => v.len(),
            ColumnData::Text(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True when values are stored as numbers
    pub fn is_numeric(&self) -> bool {
        matches!(self.data, ColumnData::Numeric(_))
    }

    pub fn as_numeric(&self) -> Option<&[Option<f64>]> {
        match &self.data {
            ColumnData::Numeric(v) => Some(v),
            ColumnData::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&[Option<String>]> {
        match &self.data {
            ColumnData::Text(v) => Some(v),
            ColumnData::Numeric(_) => None,
        }
    }

    /// Numeric values when the column holds numbers or text that parses
    /// entirely as numbers (missing cells excluded). `None` otherwise.
    pub fn numeric_view(&self) -> Option<Vec<Option<f64>>> {
        match &self.data {
            ColumnData::Numeric(v) => Some(v.clone()),
            ColumnData::Text(values) => {
                let mut out = Vec::with_capacity(values.len());
                let mut seen = false;
                for value in values {
                    match value {
                        None => out.push(None),
                        Some(s) => {
                            out.push(Some(parse_number(s)?));
                            seen = true;
                        }
                    }
                }
                seen.then_some(out)
            }
        }
    }

    /// Kind implied by the stored values, independent of the declared kind
    pub fn observed_kind(&self) -> ColumnKind {
        match &self.data {
            ColumnData::Numeric(_) => ColumnKind::Numeric,
            ColumnData::Text(values) => {
                if self.numeric_view().is_some() {
                    ColumnKind::Numeric
                } else {
                    infer_text_kind(values)
                }
            }
        }
    }

    pub fn cell(&self, row: usize) -> Cell<'_> {
        match &self.data {
            ColumnData::Numeric(v) => v[row].map_or(Cell::Missing, |x| Cell::Number(number_key(x))),
            ColumnData::Text(v) => v[row].as_deref().map_or(Cell::Missing, Cell::Text),
        }
    }

    pub fn is_missing(&self, row: usize) -> bool {
        matches!(self.cell(row), Cell::Missing)
    }

    pub fn missing_count(&self) -> usize {
        match &self.data {
            ColumnData::Numeric(v) => v.iter().filter(|x| x.is_none()).count(),
            ColumnData::Text(v) => v.iter().filter(|x| x.is_none()).count(),
        }
    }

    pub fn missing_fraction(&self) -> f64 {
        if self.is_empty() {
            0.0
        } else {
            self.missing_count() as f64 / self.len() as f64
        }
    }

    /// Number of distinct non-missing values
    pub fn distinct_count(&self) -> usize {
        (0..self.len())
            .map(|i| self.cell(i))
            .filter(|c| !matches!(c, Cell::Missing))
            .collect::<HashSet<_>>()
            .len()
    }

    /// Display form of a cell, used for class labels and categories
    pub fn display_value(&self, row: usize) -> Option<String> {
        match &self.data {
            ColumnData::Numeric(v) => v[row].map(format_number),
            ColumnData::Text(v) => v[row].clone(),
        }
    }

    /// New column with only the given rows, in the given order
    pub fn select_rows(&self, rows: &[usize]) -> Self {
        let data = match &self.data {
            ColumnData::Numeric(v) => ColumnData::Numeric(rows.iter().map(|&i| v[i]).collect()),
            ColumnData::Text(v) => ColumnData::Text(rows.iter().map(|&i| v[i].clone()).collect()),
        };
        Self {
            name: self.name.clone(),
            kind: self.kind,
            data,
        }
    }
}

/// Render a number the way it would appear in a CSV cell
pub fn format_number(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{}", v as i64)
    } else {
        format!("{v}")
    }
}

fn infer_text_kind(values: &[Option<String>]) -> ColumnKind {
    let present: Vec<&String> = values.iter().flatten().collect();
    if present.is_empty() {
        return ColumnKind::Categorical;
    }
    let mean_len =
        present.iter().map(|s| s.chars().count()).sum::<usize>() as f64 / present.len() as f64;
    if mean_len > FREE_TEXT_MIN_MEAN_LENGTH {
        ColumnKind::FreeText
    } else {
        ColumnKind::Categorical
    }
}

/// Ordered collection of equally sized, uniquely named columns
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Dataset {
    columns: Vec<Column>,
    n_rows: usize,
}

impl Dataset {
    /// Build a dataset, rejecting duplicate names and ragged columns
    pub fn new(columns: Vec<Column>) -> Result<Self> {
        let n_rows = columns.first().map_or(0, Column::len);
        let mut seen = HashSet::with_capacity(columns.len());
        for column in &columns {
            if !seen.insert(column.name()) {
                return Err(AutoDsError::Data(format!(
                    "duplicate column name '{}'",
                    column.name()
                )));
            }
            if column.len() != n_rows {
                return Err(AutoDsError::ShapeMismatch {
                    expected: format!("{n_rows} rows"),
                    actual: format!("{} rows in column '{}'", column.len(), column.name()),
                });
            }
        }
        Ok(Self { columns, n_rows })
    }

    /// A dataset with a fixed row count and no columns
    pub fn with_rows(n_rows: usize) -> Self {
        Self {
            columns: Vec::new(),
            n_rows,
        }
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty() || self.n_rows == 0
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn into_columns(self) -> Vec<Column> {
        self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name() == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(Column::name).collect()
    }

    /// Append a column; its length must match and its name must be new
    pub fn push_column(&mut self, column: Column) -> Result<()> {
        if self.contains(column.name()) {
            return Err(AutoDsError::Data(format!(
                "duplicate column name '{}'",
                column.name()
            )));
        }
        if self.columns.is_empty() && self.n_rows == 0 {
            self.n_rows = column.len();
        } else if column.len() != self.n_rows {
            return Err(AutoDsError::ShapeMismatch {
                expected: format!("{} rows", self.n_rows),
                actual: format!("{} rows in column '{}'", column.len(), column.name()),
            });
        }
        self.columns.push(column);
        Ok(())
    }

    /// Copy of the dataset without the named column
    pub fn without_column(&self, name: &str) -> Self {
        Self {
            columns: self
                .columns
                .iter()
                .filter(|c| c.name() != name)
                .cloned()
                .collect(),
            n_rows: self.n_rows,
        }
    }

    /// New dataset with only the given rows, in the given order
    pub fn select_rows(&self, rows: &[usize]) -> Self {
        Self {
            columns: self.columns.iter().map(|c| c.select_rows(rows)).collect(),
            n_rows: rows.len(),
        }
    }

    /// Index of the first occurrence of every distinct row, in order
    pub fn first_occurrences(&self) -> Vec<usize> {
        let mut seen: HashSet<Vec<Cell<'_>>> = HashSet::with_capacity(self.n_rows);
        let mut keep = Vec::with_capacity(self.n_rows);
        for row in 0..self.n_rows {
            let key: Vec<Cell<'_>> = self.columns.iter().map(|c| c.cell(row)).collect();
            if seen.insert(key) {
                keep.push(row);
            }
        }
        keep
    }

    /// Row-major matrix of the named numeric columns; missing cells are NaN
    pub fn to_array(&self, names: &[&str]) -> Result<Array2<f64>> {
        let mut columns = Vec::with_capacity(names.len());
        for name in names {
            let column = self
                .column(name)
                .ok_or_else(|| AutoDsError::Data(format!("column '{name}' not found")))?;
            let values = column.as_numeric().ok_or_else(|| {
                AutoDsError::Data(format!("column '{name}' is not numeric"))
            })?;
            columns.push(values);
        }
        Ok(Array2::from_shape_fn((self.n_rows, names.len()), |(i, j)| {
            columns[j][i].unwrap_or(f64::NAN)
        }))
    }

    /// Every column as a matrix, in dataset order
    pub fn to_matrix(&self) -> Result<Array2<f64>> {
        let names = self.column_names();
        self.to_array(&names)
    }
}
