//! Accuracy regression tests for thicket-rf.
//!
//! These tests verify that algorithmic changes do not degrade forest and
//! cascade accuracy on deterministic synthetic datasets.

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use thicket_data::{Attribute, Dataset, Sample, Schema, Value};
use thicket_rf::{CascadeConfig, CrossValidation, OobMode, RandomForestConfig};

// ---------------------------------------------------------------------------
// Helpers: deterministic synthetic datasets
// ---------------------------------------------------------------------------

/// Generate a 300-sample, 10-feature, 3-class dataset with labels "0".."2".
///
/// Features 0-2 are informative (class * 3.0 + noise in [0, 0.5]).
/// Features 3-9 are pure noise in [0, 0.5].
fn make_classification() -> Dataset {
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    let n_features = 10;
    let mut attributes: Vec<Attribute> = (0..n_features)
        .map(|f| Attribute::numeric(format!("f{f}")))
        .collect();
    attributes.push(Attribute::categorical("class"));
    let mut ds = Dataset::new(Schema::new(attributes, n_features).unwrap());

    for i in 0..300 {
        let class = i % 3;
        let mut row: Vec<Value> = (0..n_features)
            .map(|f| {
                let base = if f < 3 { class as f64 * 3.0 } else { 0.0 };
                Value::Numeric(base + rng.r#gen::<f64>() * 0.5)
            })
            .collect();
        row.push(Value::from(class.to_string()));
        ds.push(Sample::new(row, n_features).unwrap()).unwrap();
    }
    ds
}

/// Imbalanced binary dataset: 1 positive in 5, with a categorical column.
fn make_imbalanced() -> Dataset {
    let mut rng = ChaCha8Rng::seed_from_u64(7);
    let schema = Schema::new(
        vec![
            Attribute::numeric("signal"),
            Attribute::numeric("noise"),
            Attribute::categorical("colour"),
            Attribute::categorical("class"),
        ],
        3,
    )
    .unwrap();
    let mut ds = Dataset::new(schema);
    for i in 0..250 {
        let positive = i % 5 == 0;
        let signal = if positive { 2.0 } else { 0.0 } + rng.r#gen::<f64>() * 1.5;
        let colour = ["red", "green", "blue"][i % 3];
        let label = if positive { "1" } else { "0" };
        let row = vec![
            Value::Numeric(signal),
            Value::Numeric(rng.r#gen::<f64>()),
            Value::from(colour),
            Value::from(label),
        ];
        ds.push(Sample::new(row, 3).unwrap()).unwrap();
    }
    ds
}

// ---------------------------------------------------------------------------
// a) cv_accuracy_above_threshold
// ---------------------------------------------------------------------------

/// 5-fold cross-validation mean accuracy must exceed 0.85.
#[test]
fn cv_accuracy_above_threshold() {
    let ds = make_classification();
    let rf_config = RandomForestConfig::new().with_n_trees(50).with_seed(42);
    let cv = CrossValidation::new(5).unwrap().with_seed(42);
    let result = cv.evaluate(&rf_config, &ds).unwrap();

    assert!(
        result.mean_accuracy > 0.85,
        "cv mean_accuracy {} <= 0.85",
        result.mean_accuracy
    );
}

// ---------------------------------------------------------------------------
// b) oob_accuracy_above_threshold
// ---------------------------------------------------------------------------

/// Forest OOB accuracy with 60 trees must exceed 0.80.
#[test]
fn oob_accuracy_above_threshold() {
    let ds = make_classification();
    let result = RandomForestConfig::new()
        .with_n_trees(60)
        .with_seed(42)
        .with_oob_mode(OobMode::Enabled)
        .fit(&ds)
        .unwrap();
    let oob = result.oob().unwrap();

    assert!(oob.accuracy() > 0.80, "oob accuracy {} <= 0.80", oob.accuracy());
    assert_eq!(oob.reports.len(), 60);
}

// ---------------------------------------------------------------------------
// c) binary_auc_above_threshold
// ---------------------------------------------------------------------------

/// OOB AUC on the imbalanced set must clearly beat chance.
#[test]
fn binary_auc_above_threshold() {
    let ds = make_imbalanced();
    let result = RandomForestConfig::new()
        .with_n_trees(60)
        .with_seed(42)
        .with_oob_mode(OobMode::Enabled)
        .fit(&ds)
        .unwrap();
    let stat = result.oob().unwrap().forest.stat.unwrap();
    let auc = stat.auc.unwrap();

    assert!(auc > 0.75, "oob auc {auc} <= 0.75");
    assert_eq!(stat.counts.total(), ds.row_count());
}

// ---------------------------------------------------------------------------
// d) cascade_recall_above_threshold
// ---------------------------------------------------------------------------

/// The cascade's weighted vote must recover most positives on training data.
#[test]
fn cascade_recall_above_threshold() {
    let ds = make_imbalanced();
    let result = CascadeConfig::new()
        .with_forest(RandomForestConfig::new().with_n_trees(20).with_seed(42))
        .with_n_stages(3)
        .fit(&ds)
        .unwrap();
    let prediction = result.forest().classify_set(&ds).unwrap();
    let stat = prediction.stat.unwrap();

    assert!(stat.tp_rate > 0.7, "cascade tp_rate {} <= 0.7", stat.tp_rate);
    assert!(!result.reports().is_empty());
}
