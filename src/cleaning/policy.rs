//! Pluggable heuristics for identifier columns and target selection
//!
//! Both decisions rest on tunable constants rather than hard rules, so they
//! sit behind small traits that callers can replace.

use regex::Regex;
use tracing::debug;

use crate::dataset::{Column, ColumnKind, Dataset};
use crate::error::{AutoDsError, Result};

/// Column names that usually mark the prediction target
pub const TARGET_KEYWORDS: &[&str] = &[
    "target",
    "label",
    "class",
    "output",
    "prediction",
    "churn",
    "outcome",
    "attrition",
];

const URL_OR_EMAIL_MARKERS: &[&str] = &["http://", "https://", "@", ".com", "www."];

/// Decides whether a column carries per-row identity rather than signal
pub trait IdentifierPolicy: Send + Sync {
    fn is_identifier(&self, column: &Column) -> bool;
}

/// Default identifier rules:
/// - a column declared as identifier
/// - text whose non-missing values are all distinct
/// - text where most values look like emails or URLs
/// - integers forming a contiguous run of distinct values (row numbers)
///
/// Other all-distinct numeric columns are kept: continuous measurements are
/// naturally unique.
#[derive(Debug, Clone)]
pub struct DefaultIdentifierPolicy {
    /// Share of values that must match a pattern
    pattern_ratio: f64,
    email: Regex,
    url: Regex,
}

impl Default for DefaultIdentifierPolicy {
    fn default() -> Self {
        Self {
            pattern_ratio: 0.8,
            email: Regex::new(r"^[a-zA-Z0-9._%+\-]+@[a-zA-Z0-9.\-]+\.[a-zA-Z]{2,}$").unwrap(),
            url: Regex::new(r"(?i)^(https?://|www\.)\S+$").unwrap(),
        }
    }
}

impl DefaultIdentifierPolicy {
    pub fn with_pattern_ratio(mut self, ratio: f64) -> Self {
        self.pattern_ratio = ratio;
        self
    }

    fn matches_pattern(&self, value: &str) -> bool {
        self.email.is_match(value) || self.url.is_match(value)
    }

    fn is_row_number(values: &[Option<f64>]) -> bool {
        let present: Vec<f64> = values.iter().flatten().copied().collect();
        if present.len() < 2 || present.len() != values.len() {
            return false;
        }
        if present.iter().any(|v| v.fract() != 0.0) {
            return false;
        }
        let min = present.iter().copied().fold(f64::INFINITY, f64::min);
        let max = present.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let mut sorted = present.clone();
        sorted.sort_by(|a, b| a.total_cmp(b));
        sorted.dedup();
        sorted.len() == present.len() && (max - min) as usize + 1 == present.len()
    }
}

impl IdentifierPolicy for DefaultIdentifierPolicy {
    fn is_identifier(&self, column: &Column) -> bool {
        if column.kind() == ColumnKind::Identifier {
            return true;
        }

        if let Some(values) = column.numeric_view() {
            return Self::is_row_number(&values);
        }

        let Some(values) = column.as_text() else {
            return false;
        };
        let present: Vec<&str> = values.iter().flatten().map(String::as_str).collect();
        if present.len() < 2 {
            return false;
        }
        if column.distinct_count() == present.len() {
            return true;
        }
        let matching = present.iter().filter(|v| self.matches_pattern(v)).count();
        matching as f64 >= self.pattern_ratio * present.len() as f64
    }
}

/// Decides whether a column can serve as the prediction target
pub trait TargetPolicy: Send + Sync {
    fn is_valid_target(&self, column: &Column) -> bool;
}

/// Rejects near-unique columns, single-valued columns, and text whose
/// first value looks like a URL or email
#[derive(Debug, Clone)]
pub struct DefaultTargetPolicy {
    pub max_unique_ratio: f64,
}

impl Default for DefaultTargetPolicy {
    fn default() -> Self {
        Self { max_unique_ratio: 0.8 }
    }
}

impl TargetPolicy for DefaultTargetPolicy {
    fn is_valid_target(&self, column: &Column) -> bool {
        let n_rows = column.len();
        let n_unique = column.distinct_count();
        if n_unique as f64 > n_rows as f64 * self.max_unique_ratio || n_unique < 2 {
            return false;
        }
        if let Some(values) = column.as_text() {
            let sample = values
                .first()
                .and_then(|v| v.as_deref())
                .unwrap_or_default()
                .to_lowercase();
            if URL_OR_EMAIL_MARKERS.iter().any(|m| sample.contains(m)) {
                return false;
            }
        }
        true
    }
}

fn is_keyword_name(name: &str) -> bool {
    let lower = name.to_lowercase();
    TARGET_KEYWORDS.iter().any(|k| lower == *k || lower.ends_with(k))
}

/// Pick a target column: first a keyword-named valid column, otherwise the
/// right-most valid column
pub fn detect_target(dataset: &Dataset, policy: &dyn TargetPolicy) -> Result<String> {
    let columns = dataset.columns();

    if let Some(column) = columns
        .iter()
        .find(|c| is_keyword_name(c.name()) && policy.is_valid_target(c))
    {
        debug!(column = column.name(), "Target chosen by name");
        return Ok(column.name().to_string());
    }

    if let Some(column) = columns.iter().rev().find(|c| policy.is_valid_target(c)) {
        debug!(column = column.name(), "Target chosen by position");
        return Ok(column.name().to_string());
    }

    Err(AutoDsError::Configuration(format!(
        "cannot auto-detect a valid target column; every column looks like an identifier \
         or has too many unique values. Available columns: {}",
        dataset.column_names().join(", ")
    )))
}
