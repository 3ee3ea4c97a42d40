//! Criterion benchmarks for thicket-smote: neighbour search and oversampling.

use criterion::{Criterion, criterion_group, criterion_main};
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use thicket_data::{Attribute, Dataset, Sample, Schema, Value};
use thicket_smote::{KnnEngine, SmoteConfig};

fn make_imbalanced(n_samples: usize, n_features: usize, minority_every: usize, seed: u64) -> Dataset {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut attributes: Vec<Attribute> = (0..n_features)
        .map(|f| Attribute::numeric(format!("f{f}")))
        .collect();
    attributes.push(Attribute::categorical("class"));
    let mut ds = Dataset::new(Schema::new(attributes, n_features).unwrap());
    for i in 0..n_samples {
        let minority = i % minority_every == 0;
        let offset = if minority { 2.0 } else { 0.0 };
        let mut row: Vec<Value> = (0..n_features)
            .map(|_| Value::Numeric(offset + rng.r#gen::<f64>()))
            .collect();
        row.push(Value::from(if minority { "1" } else { "0" }));
        ds.push(Sample::new(row, n_features).unwrap()).unwrap();
    }
    ds
}

fn bench_knn(c: &mut Criterion) {
    let ds = make_imbalanced(2000, 10, 10, 42);
    let rows: Vec<&Sample> = ds.rows().iter().collect();
    let engine = KnnEngine::new(5);

    c.bench_function("knn_2000x10_k5", |b| {
        b.iter(|| engine.find_neighbors(&rows, rows[0]).unwrap());
    });
}

fn bench_smote(c: &mut Criterion) {
    let ds = make_imbalanced(2000, 10, 10, 42);
    let cfg = SmoteConfig::new().with_percent_over(300);

    c.bench_function("smote_2000x10_200min_300pct", |b| {
        b.iter(|| cfg.smote(&ds).unwrap());
    });
}

fn bench_lnsmote(c: &mut Criterion) {
    let ds = make_imbalanced(2000, 10, 10, 42);
    let cfg = SmoteConfig::new().with_percent_over(300);

    c.bench_function("lnsmote_2000x10_200min_300pct", |b| {
        b.iter(|| cfg.lnsmote(&ds).unwrap());
    });
}

criterion_group!(benches, bench_knn, bench_smote, bench_lnsmote);
criterion_main!(benches);
