use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use thicket_data::{Attribute, Dataset, Sample, Schema, Value};
use thicket_smote::{DistanceMetric, SmoteConfig};

/// Two gaussian-ish blobs; the minority blob is `n_minority` rows around (4, 4).
fn blobs(n_majority: usize, n_minority: usize, seed: u64) -> Dataset {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let schema = Schema::new(
        vec![
            Attribute::numeric("a"),
            Attribute::numeric("b"),
            Attribute::categorical("label"),
        ],
        2,
    )
    .unwrap();
    let mut ds = Dataset::new(schema);
    let mut push = |centre: f64, label: &str, rng: &mut ChaCha8Rng| {
        let row = vec![
            Value::Numeric(centre + rng.gen_range(-1.0..1.0)),
            Value::Numeric(centre + rng.gen_range(-1.0..1.0)),
            Value::from(label),
        ];
        ds.push(Sample::new(row, 2).unwrap()).unwrap();
    };
    for _ in 0..n_majority {
        push(0.0, "0", &mut rng);
    }
    for _ in 0..n_minority {
        push(4.0, "1", &mut rng);
    }
    ds
}

#[test]
fn smote_balances_classes() {
    let mut ds = blobs(200, 20, 11);
    let result = SmoteConfig::new()
        .with_percent_over(900)
        .smote(&ds)
        .unwrap();
    assert_eq!(result.synthetic().len(), 180);
    result.append_to(&mut ds).unwrap();
    assert_eq!(ds.class_count("1"), 200);
    assert_eq!(ds.class_count("0"), 200);
}

#[test]
fn smote_rows_stay_in_minority_region() {
    let ds = blobs(100, 15, 5);
    let result = SmoteConfig::new()
        .with_percent_over(400)
        .with_metric(DistanceMetric::Euclidean)
        .smote(&ds)
        .unwrap();
    for row in result.synthetic() {
        for col in 0..2 {
            let v = row.numeric(col).unwrap();
            assert!((3.0..=5.0).contains(&v), "column {col} = {v}");
        }
    }
}

#[test]
fn lnsmote_flags_minority_rows_beside_majority_clusters() {
    let mut ds = blobs(200, 20, 3);
    // Each planted minority row sits 2 away from a tight majority cluster
    // whose members are each other's nearest neighbours.
    for (px, py) in [(-10.0, -10.0), (10.0, -10.0)] {
        let cx = if px < 0.0 { px + 1.0 } else { px - 1.0 };
        for i in 0..8 {
            let row = vec![
                Value::Numeric(cx + 0.05 * f64::from(i)),
                Value::Numeric(py + 1.0),
                Value::from("0"),
            ];
            ds.push(Sample::new(row, 2).unwrap()).unwrap();
        }
        let row = vec![Value::Numeric(px), Value::Numeric(py), Value::from("1")];
        ds.push(Sample::new(row, 2).unwrap()).unwrap();
    }
    let result = SmoteConfig::new().with_k(5).lnsmote(&ds).unwrap();

    let outliers: Vec<(f64, f64)> = result
        .outliers()
        .iter()
        .map(|row| (row.numeric(0).unwrap(), row.numeric(1).unwrap()))
        .collect();
    assert_eq!(outliers, vec![(-10.0, -10.0), (10.0, -10.0)]);
    assert_eq!(result.synthetic().len(), 20);
    assert_eq!(result.skipped(), 2);
    for row in result.synthetic() {
        assert_eq!(row.class_label(), "1");
        for col in 0..2 {
            let v = row.numeric(col).unwrap();
            assert!((3.0..=5.0).contains(&v), "column {col} = {v}");
        }
    }
}

#[test]
fn lnsmote_on_clean_data_matches_smote_count() {
    let ds = blobs(100, 20, 9);
    let smote = SmoteConfig::new().with_k(3).smote(&ds).unwrap();
    let ln = SmoteConfig::new().with_k(3).lnsmote(&ds).unwrap();
    assert_eq!(ln.synthetic().len(), smote.synthetic().len());
    assert!(ln.outliers().is_empty());
}
