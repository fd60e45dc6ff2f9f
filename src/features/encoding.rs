//! Categorical encoding: one-hot below a cardinality threshold, label
//! codes at or above it

use crate::dataset::Column;

use super::catalog::{CategoryEncoding, FeatureCatalog, Provenance};

/// Sorted distinct non-missing values of a column
pub(crate) fn categories(column: &Column) -> Vec<String> {
    let mut values: Vec<String> = (0..column.len())
        .filter_map(|row| column.display_value(row))
        .collect();
    values.sort();
    values.dedup();
    values
}

/// Add the encoded features of one categorical column
pub(crate) fn plan_encoding(catalog: &mut FeatureCatalog, column: &Column, threshold: usize, reserved: &str) -> usize {
    let categories = categories(column);
    let source = vec![column.name().to_string()];

    if categories.len() < threshold {
        for category in &categories {
            catalog.insert(
                &format!("{}_{}", column.name(), category),
                Provenance::EncodedCategory(CategoryEncoding::OneHot {
                    category: category.clone(),
                }),
                source.clone(),
                reserved,
            );
        }
        categories.len()
    } else {
        catalog.insert(
            column.name(),
            Provenance::EncodedCategory(CategoryEncoding::Label { categories }),
            source,
            reserved,
        );
        1
    }
}

/// Encoded values of a column
pub(crate) fn evaluate(encoding: &CategoryEncoding, column: &Column) -> Vec<f64> {
    (0..column.len())
        .map(|row| {
            let value = column.display_value(row);
            match (encoding, value) {
                (_, None) => f64::NAN,
                (CategoryEncoding::OneHot { category }, Some(v)) => {
                    if *category == v {
                        1.0
                    } else {
                        0.0
                    }
                }
                (CategoryEncoding::Label { categories }, Some(v)) => categories
                    .binary_search(&v)
                    .map(|i| i as f64)
                    .unwrap_or(-1.0),
            }
        })
        .collect()
}
