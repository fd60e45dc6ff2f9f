//! Derived numeric features: interactions, polynomials, row aggregates
//!
//! Planning adds catalog entries; evaluation recomputes a feature from its
//! catalog entry, so the same code serves fitting and re-application.

use crate::dataset::Dataset;
use crate::error::{AutoDsError, Result};

use super::catalog::{AggregationOp, FeatureCatalog, InteractionOp, PolynomialOp, Provenance};

/// Values of a numeric source column; gaps become NaN
pub(crate) fn numeric_values(dataset: &Dataset, name: &str) -> Result<Vec<f64>> {
    let column = dataset.column(name).ok_or_else(|| {
        AutoDsError::Configuration(format!("feature source column '{name}' is missing"))
    })?;
    let values = column.numeric_view().ok_or_else(|| {
        AutoDsError::Data(format!("feature source column '{name}' is not numeric"))
    })?;
    Ok(values.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect())
}

/// Product for every pair of the first `cap` numeric columns, plus a ratio
/// when the denominator column never holds zero
pub(crate) fn plan_interactions(
    catalog: &mut FeatureCatalog,
    dataset: &Dataset,
    numeric: &[String],
    cap: usize,
    reserved: &str,
) -> Result<usize> {
    let considered = &numeric[..numeric.len().min(cap)];
    let mut added = 0;
    for (i, a) in considered.iter().enumerate() {
        for b in &considered[i + 1..] {
            let sources = vec![a.clone(), b.clone()];
            catalog.insert(&format!("{a}_x_{b}"), Provenance::Interaction(InteractionOp::Product), sources.clone(), reserved);
            added += 1;

            let denominator = numeric_values(dataset, b)?;
            if denominator.iter().all(|v| *v != 0.0) {
                catalog.insert(&format!("{a}_div_{b}"), Provenance::Interaction(InteractionOp::Ratio), sources, reserved);
                added += 1;
            }
        }
    }
    Ok(added)
}

/// Square of every numeric column; square root when it has no negatives
pub(crate) fn plan_polynomials(
    catalog: &mut FeatureCatalog,
    dataset: &Dataset,
    numeric: &[String],
    reserved: &str,
) -> Result<usize> {
    let mut added = 0;
    for name in numeric {
        catalog.insert(&format!("{name}_squared"), Provenance::Polynomial(PolynomialOp::Square), vec![name.clone()], reserved);
        added += 1;

        let values = numeric_values(dataset, name)?;
        if values.iter().all(|v| *v >= 0.0) {
            catalog.insert(&format!("{name}_sqrt"), Provenance::Polynomial(PolynomialOp::SquareRoot), vec![name.clone()], reserved);
            added += 1;
        }
    }
    Ok(added)
}

/// Row-wise sum, mean and standard deviation across the numeric columns
pub(crate) fn plan_aggregations(catalog: &mut FeatureCatalog, numeric: &[String], reserved: &str) -> usize {
    if numeric.len() < 2 {
        return 0;
    }
    let ops = [
        ("numeric_sum", AggregationOp::Sum),
        ("numeric_mean", AggregationOp::Mean),
        ("numeric_std", AggregationOp::Std),
    ];
    for (name, op) in ops {
        catalog.insert(name, Provenance::Aggregation(op), numeric.to_vec(), reserved);
    }
    ops.len()
}

/// Raw values of a numeric (non-encoded) feature
pub(crate) fn evaluate(provenance: &Provenance, sources: &[String], dataset: &Dataset) -> Result<Vec<f64>> {
    let source = |i: usize| -> Result<Vec<f64>> {
        let name = sources
            .get(i)
            .ok_or_else(|| AutoDsError::Data("feature has too few source columns".to_string()))?;
        numeric_values(dataset, name)
    };

    let values = match provenance {
        Provenance::Original => source(0)?,
        Provenance::Interaction(op) => {
            let a = source(0)?;
            let b = source(1)?;
            a.iter()
                .zip(&b)
                .map(|(x, y)| match op {
                    InteractionOp::Product => x * y,
                    InteractionOp::Ratio => x / y,
                })
                .collect()
        }
        Provenance::Polynomial(op) => source(0)?
            .into_iter()
            .map(|x| match op {
                PolynomialOp::Square => x * x,
                PolynomialOp::SquareRoot => x.sqrt(),
            })
            .collect(),
        Provenance::Aggregation(op) => {
            let columns = (0..sources.len()).map(source).collect::<Result<Vec<_>>>()?;
            (0..dataset.n_rows())
                .map(|row| {
                    let cells: Vec<f64> = columns.iter().map(|c| c[row]).collect();
                    aggregate(*op, &cells)
                })
                .collect()
        }
        Provenance::EncodedCategory(_) => {
            return Err(AutoDsError::Data(
                "encoded features are evaluated by the encoder".to_string(),
            ))
        }
    };
    Ok(values)
}

fn aggregate(op: AggregationOp, cells: &[f64]) -> f64 {
    let n = cells.len() as f64;
    let sum: f64 = cells.iter().sum();
    match op {
        AggregationOp::Sum => sum,
        AggregationOp::Mean => sum / n,
        AggregationOp::Std => {
            if cells.len() < 2 {
                return 0.0;
            }
            let mean = sum / n;
            (cells.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0)).sqrt()
        }
    }
}
