//! Integration test: Cleaner behavior on realistic tables

use autods::cleaning::{clean, Cleaner, ColumnAction, DropReason};
use autods::dataset::{Column, Dataset};
use autods::imputation::ImputeStrategy;
use autods::{AutoDsError, PipelineConfig};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// 100 customer rows plus 5 exact duplicates, with gaps, an outlier,
/// a constant column and a categorical column
fn messy_customers() -> Dataset {
    let mut rng = ChaCha8Rng::seed_from_u64(7);
    let n = 100;

    let mut age: Vec<Option<f64>> = (0..n).map(|_| Some(rng.gen_range(20..70) as f64)).collect();
    let mut income: Vec<Option<f64>> = (0..n)
        .map(|i| Some(30_000.0 + age[i].unwrap_or(40.0) * 800.0 + rng.gen_range(-2_000.0..2_000.0)))
        .collect();
    let mut city: Vec<Option<String>> = (0..n)
        .map(|_| Some(["paris", "lyon", "nice", "lille"][rng.gen_range(0..4)].to_string()))
        .collect();
    let label: Vec<Option<String>> = (0..n)
        .map(|i| Some(if age[i].unwrap_or(0.0) > 45.0 { "yes" } else { "no" }.to_string()))
        .collect();

    // 3% gaps in age, 12% in income, 2% in city
    for i in [5, 40, 77] {
        age[i] = None;
    }
    for i in (0..n).step_by(9).take(12) {
        income[i] = None;
    }
    city[13] = None;
    city[61] = None;
    income[50] = Some(5_000_000.0);

    let mut columns = vec![
        Column::numeric("age", age),
        Column::numeric("income", income),
        Column::text("city", city),
        Column::from_f64("flat", vec![1.0; n]),
        Column::text("label", label),
    ];
    let dup_rows: Vec<usize> = (0..n).chain([1, 2, 3, 4, 6]).collect();
    columns = columns.iter().map(|c| c.select_rows(&dup_rows)).collect();
    Dataset::new(columns).unwrap()
}

#[test]
fn test_email_column_dropped_as_identifier() {
    let n = 30;
    let emails: Vec<String> = (0..n).map(|i| format!("user{i}@example.com")).collect();
    let email_refs: Vec<&str> = emails.iter().map(String::as_str).collect();
    let ds = Dataset::new(vec![
        Column::from_strs("email", &email_refs),
        Column::from_f64("spend", (0..n).map(|i| (i % 7) as f64 * 3.5).collect()),
        Column::from_strs("plan", &(0..n).map(|i| if i % 3 == 0 { "pro" } else { "free" }).collect::<Vec<_>>()),
    ])
    .unwrap();

    let (cleaned, report) = clean(&ds).unwrap();
    assert!(!cleaned.contains("email"));
    assert_eq!(report.dropped_columns(), vec![("email", &DropReason::IdentifierLike)]);
    assert_eq!(DropReason::IdentifierLike.to_string(), "identifier-like");
    assert_eq!(report.warnings().len(), 1);
}

#[test]
fn test_moderate_gaps_use_neighbor_imputation() {
    let n = 50;
    let x: Vec<f64> = (0..n).map(|i| i as f64 * 0.5 + 0.25).collect();
    let mut y: Vec<Option<f64>> = x.iter().map(|v| Some(2.0 * v + 1.0)).collect();
    // 10% missing
    for i in [4, 12, 20, 28, 36] {
        y[i] = None;
    }
    let ds = Dataset::new(vec![Column::from_f64("x", x), Column::numeric("y", y)]).unwrap();

    let (cleaned, report) = clean(&ds).unwrap();
    assert_eq!(
        report.actions("y"),
        &[ColumnAction::Imputed {
            strategy: ImputeStrategy::NearestNeighbors { k: 5 },
            count: 5
        }]
    );

    let filled = cleaned.column("y").unwrap().as_numeric().unwrap();
    assert!(filled.iter().all(Option::is_some));
    // row 20 should be close to its true value 21.5; the median of y is ~26
    let v = filled[20].unwrap();
    assert!((v - 21.5).abs() < 2.0, "expected a local estimate, got {v}");
}

#[test]
fn test_clean_is_idempotent() {
    let (once, _) = clean(&messy_customers()).unwrap();
    let (twice, report) = clean(&once).unwrap();
    assert_eq!(once, twice);
    assert_eq!(report.duplicates_removed(), 0);
    assert!(report.columns().iter().all(|c| c.actions.is_empty()));
}

#[test]
fn test_rows_never_increase_and_capping_keeps_rows() {
    let raw = messy_customers();
    let (cleaned, report) = clean(&raw).unwrap();

    assert_eq!(report.rows_before(), 105);
    assert_eq!(report.duplicates_removed(), 5);
    assert_eq!(cleaned.n_rows(), 100);
    assert!(cleaned.n_rows() <= raw.n_rows());

    let capped = report
        .actions("income")
        .iter()
        .find_map(|a| match a {
            ColumnAction::OutlierCapped { upper, count, .. } => Some((*upper, *count)),
            _ => None,
        })
        .expect("income outlier should be capped");
    assert!(capped.1 >= 1);
    let income = cleaned.column("income").unwrap().as_numeric().unwrap();
    assert!(income.iter().flatten().all(|&v| v <= capped.0));
}

#[test]
fn test_report_lists_every_decision() {
    let (cleaned, report) = clean(&messy_customers()).unwrap();

    assert_eq!(cleaned.column_names(), vec!["age", "income", "city", "label"]);
    assert_eq!(report.dropped_columns(), vec![("flat", &DropReason::Constant)]);
    assert!(matches!(
        report.actions("age")[0],
        ColumnAction::Imputed { strategy: ImputeStrategy::Median, count: 3 }
    ));
    assert!(matches!(
        report.actions("city")[0],
        ColumnAction::Imputed { strategy: ImputeStrategy::Mode, count: 2 }
    ));
    assert!(report.summary_lines()[0].starts_with("rows 105 -> 100"));
}

#[test]
fn test_all_identifier_columns_is_configuration_error() {
    let ds = Dataset::new(vec![
        Column::from_strs("id", &["a1", "b2", "c3", "d4", "e5"]),
        Column::from_strs("email", &["a@x.io", "b@x.io", "c@x.io", "d@x.io", "e@x.io"]),
        Column::from_f64("row", vec![1.0, 2.0, 3.0, 4.0, 5.0]),
    ])
    .unwrap();

    match clean(&ds) {
        Err(AutoDsError::Configuration(msg)) => assert!(msg.contains("identifier-like")),
        other => panic!("expected configuration error, got {other:?}"),
    }
}

#[test]
fn test_custom_thresholds() {
    // with a 0.2 drop threshold the 30% sparse column goes away
    let sparse: Vec<Option<f64>> = (0..20).map(|i| if i % 10 < 3 { None } else { Some(i as f64) }).collect();
    let ds = Dataset::new(vec![
        Column::numeric("sparse", sparse),
        Column::from_f64("x", (0..20).map(|i| i as f64 * 1.5 + 0.1).collect()),
    ])
    .unwrap();

    let config = PipelineConfig::default().with_missing_thresholds(0.05, 0.2);
    let (cleaned, report) = Cleaner::new(config).clean(&ds).unwrap();
    assert!(!cleaned.contains("sparse"));
    assert!(matches!(
        report.dropped_columns()[0].1,
        DropReason::TooManyMissing { fraction } if (fraction - 0.3).abs() < 1e-12
    ));
}
