use std::collections::BTreeSet;

use rand::Rng;
use thicket_data::{AttributeKind, DataError, Dataset};

use crate::error::RfError;
use crate::gini::{GiniGainEngine, GiniResult, SplitCandidate};
use crate::node::{AttributeIndex, SplitPredicate};

/// Result of finding the best split for a node.
#[derive(Debug, Clone)]
pub(crate) struct SplitResult {
    /// Column used for the split.
    pub(crate) attribute: AttributeIndex,
    /// Routing predicate built from the winning candidate.
    pub(crate) predicate: SplitPredicate,
    /// Gini gain of the winning candidate.
    pub(crate) gain: f64,
    /// Dataset rows going to the left child.
    pub(crate) left_rows: Vec<usize>,
    /// Dataset rows going to the right child.
    pub(crate) right_rows: Vec<usize>,
}

/// Pick the attributes a node may split on.
///
/// With `n_random_features` set, a uniformly chosen subset of that size is
/// drawn without replacement (partial Fisher-Yates). The returned columns
/// are sorted so that gain ties resolve by column order.
pub(crate) fn select_attributes(
    available: &[usize],
    n_random_features: Option<usize>,
    rng: &mut impl Rng,
) -> Vec<usize> {
    let take = match n_random_features {
        Some(n) if n < available.len() => n,
        _ => return available.to_vec(),
    };
    let mut order = available.to_vec();
    for i in 0..take {
        let j = rng.gen_range(i..order.len());
        order.swap(i, j);
    }
    let mut selected = order[..take].to_vec();
    selected.sort_unstable();
    selected
}

/// Score one column over `rows`, returning the Gini result and, for
/// categorical columns, the sorted value set the partitions index into.
fn score_attribute(
    engine: &GiniGainEngine,
    dataset: &Dataset,
    labels: &[usize],
    rows: &[usize],
    column: usize,
) -> Result<(GiniResult, Vec<String>), RfError> {
    let samples = dataset.rows();
    let target: Vec<usize> = rows.iter().map(|&r| labels[r]).collect();
    match dataset.schema().attribute(column)?.kind() {
        AttributeKind::Numeric => {
            let attr = rows
                .iter()
                .map(|&r| samples[r].numeric(column))
                .collect::<Result<Vec<f64>, _>>()?;
            Ok((engine.compute_continuous(&attr, &target)?, Vec::new()))
        }
        AttributeKind::Categorical => {
            let mut distinct = BTreeSet::new();
            for &r in rows {
                distinct.insert(samples[r].categorical(column)?);
            }
            let value_set: Vec<&str> = distinct.into_iter().collect();
            let attr = rows
                .iter()
                .map(|&r| -> Result<usize, RfError> {
                    let v = samples[r].categorical(column)?;
                    Ok(value_set.binary_search(&v).unwrap_or_default())
                })
                .collect::<Result<Vec<usize>, RfError>>()?;
            let result = engine.compute_discrete(&attr, value_set.len(), &target)?;
            Ok((result, value_set.into_iter().map(String::from).collect()))
        }
    }
}

/// Find the best split for a node.
///
/// Every non-class column not in `excluded` is a candidate; with random
/// feature selection only a random subset is scored and the rest are
/// skipped. The column with the globally maximum gain wins, first column on
/// ties. Returns `None` when no column has positive gain.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`RfError::EmptyPartition`] | `rows` is empty |
/// | [`RfError::DegenerateSplit`] | the winning split leaves one side empty |
/// | [`RfError::Data`] | a value does not match its column kind |
pub(crate) fn find_best_split(
    dataset: &Dataset,
    labels: &[usize],
    rows: &[usize],
    n_classes: usize,
    excluded: &[bool],
    n_random_features: Option<usize>,
    rng: &mut impl Rng,
) -> Result<Option<SplitResult>, RfError> {
    let available: Vec<usize> = dataset
        .feature_indices()
        .into_iter()
        .filter(|&c| !excluded[c])
        .collect();
    if available.is_empty() {
        return Ok(None);
    }
    let selected = select_attributes(&available, n_random_features, rng);
    let engine = GiniGainEngine::new(n_classes);

    let mut best: Option<(usize, GiniResult, Vec<String>)> = None;
    for &column in &selected {
        let (result, value_set) = score_attribute(&engine, dataset, labels, rows, column)?;
        if result.is_exhausted() {
            continue;
        }
        if best
            .as_ref()
            .is_none_or(|(_, b, _)| result.max_gain() > b.max_gain())
        {
            best = Some((column, result, value_set));
        }
    }

    let Some((column, result, value_set)) = best else {
        return Ok(None);
    };
    let predicate = match result.best_candidate() {
        Some(SplitCandidate::Threshold(t)) => SplitPredicate::LessThan(*t),
        Some(SplitCandidate::Partition(left)) => {
            SplitPredicate::InSet(left.iter().map(|&p| value_set[p].clone()).collect())
        }
        None => return Ok(None),
    };

    let samples = dataset.rows();
    let kind = dataset.schema().attribute(column)?.kind();
    let mut left_rows = Vec::with_capacity(rows.len() / 2);
    let mut right_rows = Vec::with_capacity(rows.len() / 2);
    for &r in rows {
        let value = samples[r].attribute(column)?;
        let Some(goes_left) = predicate.goes_left(value) else {
            return Err(DataError::TypeMismatch {
                column,
                expected: kind,
            }
            .into());
        };
        if goes_left {
            left_rows.push(r);
        } else {
            right_rows.push(r);
        }
    }
    if left_rows.is_empty() || right_rows.is_empty() {
        return Err(RfError::DegenerateSplit {
            column,
            n_left: left_rows.len(),
            n_right: right_rows.len(),
        });
    }

    Ok(Some(SplitResult {
        attribute: AttributeIndex::new(column),
        predicate,
        gain: result.max_gain(),
        left_rows,
        right_rows,
    }))
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use thicket_data::{Attribute, Dataset, Sample, Schema, Value};

    use super::*;

    fn dataset() -> Dataset {
        let schema = Schema::new(
            vec![
                Attribute::numeric("noise"),
                Attribute::numeric("x"),
                Attribute::categorical("colour"),
                Attribute::categorical("class"),
            ],
            3,
        )
        .unwrap();
        let rows = [
            (0.5, 1.0, "red", "0"),
            (0.5, 2.0, "blue", "0"),
            (0.5, 3.0, "red", "0"),
            (0.5, 10.0, "blue", "1"),
            (0.5, 11.0, "red", "1"),
            (0.5, 12.0, "blue", "1"),
        ]
        .into_iter()
        .map(|(n, x, c, y)| {
            Sample::new(
                vec![Value::Numeric(n), Value::Numeric(x), Value::from(c), Value::from(y)],
                3,
            )
            .unwrap()
        })
        .collect();
        Dataset::from_rows(schema, rows).unwrap()
    }

    #[test]
    fn separable_data_finds_threshold() {
        let ds = dataset();
        let labels = ds.class_indices();
        let rows: Vec<usize> = (0..6).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let split = find_best_split(&ds, &labels, &rows, 2, &[false; 4], None, &mut rng)
            .unwrap()
            .expect("should find a split");
        assert_eq!(split.attribute.index(), 1);
        assert_eq!(split.predicate, SplitPredicate::LessThan(6.5));
        assert_eq!(split.left_rows, vec![0, 1, 2]);
        assert_eq!(split.right_rows, vec![3, 4, 5]);
    }

    #[test]
    fn excluded_columns_are_not_used() {
        let ds = dataset();
        let labels = ds.class_indices();
        let rows: Vec<usize> = (0..6).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let excluded = [false, true, false, false];
        let split = find_best_split(&ds, &labels, &rows, 2, &excluded, None, &mut rng)
            .unwrap()
            .expect("colour still separates a little");
        assert_eq!(split.attribute.index(), 2);
        assert!(matches!(split.predicate, SplitPredicate::InSet(_)));
    }

    #[test]
    fn no_gain_returns_none() {
        let ds = dataset();
        let labels = ds.class_indices();
        let rows: Vec<usize> = (0..6).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        // Only the constant column remains.
        let excluded = [false, true, true, false];
        let split = find_best_split(&ds, &labels, &rows, 2, &excluded, None, &mut rng).unwrap();
        assert!(split.is_none());
    }

    #[test]
    fn random_subset_has_requested_size() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        for _ in 0..20 {
            let picked = select_attributes(&[0, 2, 4, 6, 8], Some(2), &mut rng);
            assert_eq!(picked.len(), 2);
            assert!(picked[0] < picked[1]);
        }
        assert_eq!(select_attributes(&[1, 2], Some(5), &mut rng), vec![1, 2]);
    }

    #[test]
    fn empty_rows_is_transient_error() {
        let ds = dataset();
        let labels = ds.class_indices();
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let err = find_best_split(&ds, &labels, &[], 2, &[false; 4], None, &mut rng).unwrap_err();
        assert!(err.is_transient());
    }
}
