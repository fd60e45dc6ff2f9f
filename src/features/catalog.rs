//! Feature catalog: where every synthesized feature comes from

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Pairwise interaction operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InteractionOp {
    Product,
    Ratio,
}

/// Single-column polynomial transform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PolynomialOp {
    Square,
    SquareRoot,
}

/// Row-wise aggregate over the original numeric columns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AggregationOp {
    Sum,
    Mean,
    /// Sample standard deviation
    Std,
}

/// How a categorical column became numeric
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CategoryEncoding {
    /// 1.0 when the row holds `category`, else 0.0
    OneHot { category: String },
    /// Index of the value in `categories` (sorted); unseen values get -1
    Label { categories: Vec<String> },
}

/// Origin of a feature
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Provenance {
    Original,
    Interaction(InteractionOp),
    Polynomial(PolynomialOp),
    Aggregation(AggregationOp),
    EncodedCategory(CategoryEncoding),
}

impl Provenance {
    /// Short label used in reports
    pub fn label(&self) -> &'static str {
        match self {
            Provenance::Original => "original",
            Provenance::Interaction(_) => "interaction",
            Provenance::Polynomial(_) => "polynomial",
            Provenance::Aggregation(_) => "aggregation",
            Provenance::EncodedCategory(CategoryEncoding::OneHot { .. }) => "one-hot",
            Provenance::EncodedCategory(CategoryEncoding::Label { .. }) => "label",
        }
    }
}

/// One synthesized feature
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureEntry {
    pub name: String,
    pub provenance: Provenance,
    /// Input columns the feature is computed from
    pub sources: Vec<String>,
    /// Univariate relevance score, once scored
    pub score: Option<f64>,
    /// Whether selection kept the feature
    pub selected: bool,
}

/// Every synthesized feature in insertion order (originals first)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeatureCatalog {
    entries: Vec<FeatureEntry>,
    #[serde(skip)]
    index: HashMap<String, usize>,
}

impl PartialEq for FeatureCatalog {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl FeatureCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a feature, suffixing the name when it collides with an existing
    /// one or with a reserved name (the target). Returns the final name.
    pub fn insert(&mut self, name: &str, provenance: Provenance, sources: Vec<String>, reserved: &str) -> String {
        let mut unique = name.to_string();
        let mut n = 2;
        while self.index.contains_key(&unique) || unique == reserved {
            unique = format!("{name}_{n}");
            n += 1;
        }
        self.index.insert(unique.clone(), self.entries.len());
        self.entries.push(FeatureEntry {
            name: unique.clone(),
            provenance,
            sources,
            score: None,
            selected: false,
        });
        unique
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[FeatureEntry] {
        &self.entries
    }

    pub(crate) fn entries_mut(&mut self) -> &mut [FeatureEntry] {
        &mut self.entries
    }

    pub fn get(&self, name: &str) -> Option<&FeatureEntry> {
        match self.index.get(name) {
            Some(&i) => self.entries.get(i),
            // index is not serialized
            None => self.entries.iter().find(|e| e.name == name),
        }
    }

    /// Selected features in catalog order
    pub fn selected(&self) -> impl Iterator<Item = &FeatureEntry> {
        self.entries.iter().filter(|e| e.selected)
    }

    /// Number of features per provenance label, in first-seen order
    pub fn counts_by_provenance(&self) -> Vec<(&'static str, usize)> {
        let mut counts: Vec<(&'static str, usize)> = Vec::new();
        for entry in &self.entries {
            let label = entry.provenance.label();
            match counts.iter_mut().find(|(l, _)| *l == label) {
                Some(c) => c.1 += 1,
                None => counts.push((label, 1)),
            }
        }
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_keeps_names_unique() {
        let mut catalog = FeatureCatalog::new();
        let a = catalog.insert("color_red", Provenance::Original, vec!["color_red".into()], "y");
        let b = catalog.insert(
            "color_red",
            Provenance::EncodedCategory(CategoryEncoding::OneHot { category: "red".into() }),
            vec!["color".into()],
            "y",
        );
        let c = catalog.insert("y", Provenance::Original, vec![], "y");

        assert_eq!(a, "color_red");
        assert_eq!(b, "color_red_2");
        assert_eq!(c, "y_2");
        assert_eq!(catalog.get("color_red_2").unwrap().sources, vec!["color"]);
    }

    #[test]
    fn test_counts_by_provenance() {
        let mut catalog = FeatureCatalog::new();
        catalog.insert("a", Provenance::Original, vec![], "y");
        catalog.insert("a_squared", Provenance::Polynomial(PolynomialOp::Square), vec![], "y");
        catalog.insert("b", Provenance::Original, vec![], "y");
        assert_eq!(catalog.counts_by_provenance(), vec![("original", 2), ("polynomial", 1)]);
    }
}
