//! Criterion benchmarks for thicket-rf: forest training, prediction and cascades.

use criterion::{Criterion, criterion_group, criterion_main};
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use thicket_data::{Attribute, Dataset, Sample, Schema, Value};
use thicket_rf::{CascadeConfig, GiniGainEngine, RandomForestConfig};

fn make_classification(
    n_samples: usize,
    n_features: usize,
    n_classes: usize,
    seed: u64,
) -> Dataset {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut attributes: Vec<Attribute> = (0..n_features)
        .map(|f| Attribute::numeric(format!("f{f}")))
        .collect();
    attributes.push(Attribute::categorical("class"));
    let mut ds = Dataset::new(Schema::new(attributes, n_features).unwrap());
    for i in 0..n_samples {
        let class = i % n_classes;
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

fn bench_rf_train(c: &mut Criterion) {
    let ds = make_classification(500, 20, 5, 42);
    let cfg = RandomForestConfig::new().with_n_trees(50).with_seed(42);

    c.bench_function("rf_train_500x20_5class_50trees", |b| {
        b.iter(|| cfg.fit(&ds).unwrap());
    });
}

fn bench_rf_classify_set(c: &mut Criterion) {
    let ds = make_classification(500, 20, 5, 42);
    let forest = RandomForestConfig::new()
        .with_n_trees(50)
        .with_seed(42)
        .fit(&ds)
        .unwrap()
        .into_forest();

    c.bench_function("rf_classify_set_500x20_50trees", |b| {
        b.iter(|| forest.classify_set(&ds, None).unwrap());
    });
}

fn bench_gini_continuous(c: &mut Criterion) {
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    let attr: Vec<f64> = (0..2000).map(|_| rng.r#gen::<f64>()).collect();
    let target: Vec<usize> = (0..2000).map(|i| i % 3).collect();
    let engine = GiniGainEngine::new(3);

    c.bench_function("gini_continuous_2000", |b| {
        b.iter(|| engine.compute_continuous(&attr, &target).unwrap());
    });
}

fn bench_cascade_train(c: &mut Criterion) {
    let ds = make_classification(300, 10, 2, 42);
    let cfg = CascadeConfig::new()
        .with_forest(RandomForestConfig::new().with_n_trees(20).with_seed(42))
        .with_n_stages(3);

    c.bench_function("cascade_train_300x10_3stages", |b| {
        b.iter(|| cfg.fit(&ds).unwrap());
    });
}

criterion_group!(
    benches,
    bench_rf_train,
    bench_rf_classify_set,
    bench_gini_continuous,
    bench_cascade_train
);
criterion_main!(benches);
