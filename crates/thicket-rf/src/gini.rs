//! Gini impurity and best-split scoring for a single attribute column.

use crate::error::RfError;
use crate::node::Impurity;

/// Categorical columns with more distinct values than this are scored with
/// one-vs-rest partitions instead of every 2-way partition.
pub const MAX_EXHAUSTIVE_CATEGORIES: usize = 12;

/// Compute the Gini impurity `1 - Σ(p_c²)` of a node from its class counts.
///
/// Returns `Impurity::new(0.0)` when `n_samples` is zero.
#[must_use]
pub fn impurity(class_counts: &[usize], n_samples: usize) -> Impurity {
    if n_samples == 0 {
        return Impurity::new(0.0);
    }
    let n = n_samples as f64;
    let sum_sq: f64 = class_counts
        .iter()
        .map(|&c| {
            let p = c as f64 / n;
            p * p
        })
        .sum();
    Impurity::new(1.0 - sum_sq)
}

/// One candidate partition of an attribute.
#[derive(Debug, Clone, PartialEq)]
pub enum SplitCandidate {
    /// Numeric threshold: `value < threshold` goes left.
    Threshold(f64),
    /// Positions in the value set that go left; the rest go right.
    Partition(Vec<usize>),
}

/// Scores of every candidate split of one attribute.
#[derive(Debug, Clone)]
pub struct GiniResult {
    impurity: Impurity,
    candidates: Vec<SplitCandidate>,
    gains: Vec<f64>,
    best: Option<usize>,
    sorted_index: Vec<usize>,
    skip: bool,
}

impl GiniResult {
    /// A result for an attribute excluded from consideration at this node.
    #[must_use]
    pub fn skipped() -> Self {
        Self {
            impurity: Impurity::new(0.0),
            candidates: Vec::new(),
            gains: Vec::new(),
            best: None,
            sorted_index: Vec::new(),
            skip: true,
        }
    }

    /// Impurity of the whole target column.
    #[must_use]
    pub fn impurity(&self) -> Impurity {
        self.impurity
    }

    /// Every candidate in scan order.
    #[must_use]
    pub fn candidates(&self) -> &[SplitCandidate] {
        &self.candidates
    }

    /// Gain of each candidate, parallel to [`GiniResult::candidates`].
    #[must_use]
    pub fn gains(&self) -> &[f64] {
        &self.gains
    }

    /// Position of the first candidate reaching the maximum gain.
    #[must_use]
    pub fn max_gain_index(&self) -> Option<usize> {
        self.best
    }

    /// Maximum gain over all candidates, 0 when there are none.
    #[must_use]
    pub fn max_gain(&self) -> f64 {
        self.best.map_or(0.0, |i| self.gains[i])
    }

    /// The winning candidate.
    #[must_use]
    pub fn best_candidate(&self) -> Option<&SplitCandidate> {
        self.best.map(|i| &self.candidates[i])
    }

    /// Permutation that sorted a numeric column ascending; empty for
    /// categorical columns.
    #[must_use]
    pub fn sorted_index(&self) -> &[usize] {
        &self.sorted_index
    }

    /// Whether the attribute was excluded from consideration.
    #[must_use]
    pub fn is_skipped(&self) -> bool {
        self.skip
    }

    /// An attribute whose best gain is 0 cannot discriminate at this node.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.skip || self.max_gain() <= 0.0
    }

    fn push(&mut self, candidate: SplitCandidate, gain: f64) {
        // Strictly greater: the first candidate reaching the maximum wins.
        if self.best.is_none_or(|b| gain > self.gains[b]) {
            self.best = Some(self.gains.len());
        }
        self.candidates.push(candidate);
        self.gains.push(gain);
    }
}

/// Gini gain calculator over a fixed number of classes.
#[derive(Debug, Clone, Copy)]
pub struct GiniGainEngine {
    n_classes: usize,
}

impl GiniGainEngine {
    /// Create an engine for targets in `0..n_classes`.
    #[must_use]
    pub fn new(n_classes: usize) -> Self {
        Self { n_classes }
    }

    fn counts(&self, target: &[usize]) -> Result<Vec<usize>, RfError> {
        let mut counts = vec![0usize; self.n_classes];
        for &t in target {
            *counts.get_mut(t).ok_or(RfError::ClassOutOfRange {
                class: t,
                n_classes: self.n_classes,
            })? += 1;
        }
        Ok(counts)
    }

    fn gain(
        &self,
        parent: Impurity,
        left: &[usize],
        n_left: usize,
        n: usize,
        parent_counts: &[usize],
    ) -> f64 {
        let right: Vec<usize> = parent_counts.iter().zip(left).map(|(p, l)| p - l).collect();
        let n_right = n - n_left;
        let nf = n as f64;
        let weighted = (n_left as f64 / nf) * impurity(left, n_left).value()
            + (n_right as f64 / nf) * impurity(&right, n_right).value();
        // Concavity keeps the gain non-negative; clamp rounding noise.
        (parent.value() - weighted).max(0.0)
    }

    /// Score every midpoint threshold of a numeric attribute.
    ///
    /// The column is sorted ascending (stable, so ties keep input order) and
    /// candidates are the midpoints between consecutive distinct values. A
    /// midpoint that rounds onto one of its neighbours is rejected.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`RfError::EmptyPartition`] | `attr` is empty |
    /// | [`RfError::ColumnLengthMismatch`] | `attr` and `target` differ in length |
    /// | [`RfError::ClassOutOfRange`] | a target is outside `0..n_classes` |
    pub fn compute_continuous(&self, attr: &[f64], target: &[usize]) -> Result<GiniResult, RfError> {
        if attr.is_empty() {
            return Err(RfError::EmptyPartition);
        }
        if attr.len() != target.len() {
            return Err(RfError::ColumnLengthMismatch {
                attribute: attr.len(),
                target: target.len(),
            });
        }
        let n = attr.len();
        let parent_counts = self.counts(target)?;
        let parent = impurity(&parent_counts, n);

        let mut sorted_index: Vec<usize> = (0..n).collect();
        sorted_index.sort_by(|&a, &b| attr[a].total_cmp(&attr[b]));

        let mut result = GiniResult {
            impurity: parent,
            candidates: Vec::new(),
            gains: Vec::new(),
            best: None,
            sorted_index: Vec::new(),
            skip: false,
        };

        let mut left_counts = vec![0usize; self.n_classes];
        for i in 0..n - 1 {
            let si = sorted_index[i];
            left_counts[target[si]] += 1;

            let val_i = attr[si];
            let val_next = attr[sorted_index[i + 1]];
            if val_i == val_next {
                continue;
            }
            let threshold = val_i + (val_next - val_i) / 2.0;
            if threshold == val_i || threshold == val_next {
                continue;
            }
            let gain = self.gain(parent, &left_counts, i + 1, n, &parent_counts);
            result.push(SplitCandidate::Threshold(threshold), gain);
        }

        result.sorted_index = sorted_index;
        Ok(result)
    }

    /// Score the 2-way partitions of a categorical attribute.
    ///
    /// `attr[i]` is the position of row `i`'s value in a value set of
    /// `n_values` entries. Every partition is scored once: the last value
    /// always sits on the right, giving `2^(n_values-1) - 1` candidates. Above
    /// [`MAX_EXHAUSTIVE_CATEGORIES`] values only one-vs-rest partitions are
    /// scored.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`RfError::EmptyPartition`] | `attr` is empty |
    /// | [`RfError::ColumnLengthMismatch`] | `attr` and `target` differ in length |
    /// | [`RfError::ClassOutOfRange`] | a target is outside `0..n_classes` |
    /// | [`RfError::ValueOutOfRange`] | a value is outside `0..n_values` |
    pub fn compute_discrete(
        &self,
        attr: &[usize],
        n_values: usize,
        target: &[usize],
    ) -> Result<GiniResult, RfError> {
        if attr.is_empty() {
            return Err(RfError::EmptyPartition);
        }
        if attr.len() != target.len() {
            return Err(RfError::ColumnLengthMismatch {
                attribute: attr.len(),
                target: target.len(),
            });
        }
        let n = attr.len();
        let parent_counts = self.counts(target)?;
        let parent = impurity(&parent_counts, n);

        // Per-value class counts.
        let mut table = vec![vec![0usize; self.n_classes]; n_values];
        for (&v, &t) in attr.iter().zip(target) {
            let row = table
                .get_mut(v)
                .ok_or(RfError::ValueOutOfRange { value: v, n_values })?;
            row[t] += 1;
        }

        let mut result = GiniResult {
            impurity: parent,
            candidates: Vec::new(),
            gains: Vec::new(),
            best: None,
            sorted_index: Vec::new(),
            skip: false,
        };
        if n_values < 2 {
            return Ok(result);
        }

        let score = |left: Vec<usize>, result: &mut GiniResult| {
            let mut left_counts = vec![0usize; self.n_classes];
            for &v in &left {
                for (acc, &c) in left_counts.iter_mut().zip(&table[v]) {
                    *acc += c;
                }
            }
            let n_left: usize = left_counts.iter().sum();
            let gain = if n_left == 0 || n_left == n {
                0.0
            } else {
                self.gain(parent, &left_counts, n_left, n, &parent_counts)
            };
            result.push(SplitCandidate::Partition(left), gain);
        };

        if n_values <= MAX_EXHAUSTIVE_CATEGORIES {
            for mask in 1usize..(1 << (n_values - 1)) {
                let left: Vec<usize> = (0..n_values - 1).filter(|&v| mask & (1 << v) != 0).collect();
                score(left, &mut result);
            }
        } else {
            for v in 0..n_values {
                score(vec![v], &mut result);
            }
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const P: usize = 0;
    const N: usize = 1;

    #[test]
    fn gini_pure() {
        assert!((impurity(&[10, 0, 0], 10).value() - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn gini_binary_balanced() {
        assert!((impurity(&[5, 5], 10).value() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn gini_three_class_uniform() {
        let imp = impurity(&[100, 100, 100], 300);
        assert!((imp.value() - (1.0 - 3.0 * (1.0 / 3.0_f64).powi(2))).abs() < 1e-10);
    }

    #[test]
    fn continuous_picks_first_maximum() {
        let attr = [1.0, 6.0, 5.0, 4.0, 7.0, 3.0, 8.0, 7.0, 5.0];
        let target = [P, P, N, P, N, N, N, P, N];
        let engine = GiniGainEngine::new(2);
        let result = engine.compute_continuous(&attr, &target).unwrap();

        let thresholds: Vec<f64> = result
            .candidates()
            .iter()
            .map(|c| match c {
                SplitCandidate::Threshold(t) => *t,
                SplitCandidate::Partition(_) => panic!("numeric column"),
            })
            .collect();
        assert_eq!(thresholds, vec![2.0, 3.5, 4.5, 5.5, 6.5, 7.5]);
        assert!((result.impurity().value() - 40.0 / 81.0).abs() < 1e-12);
        assert_eq!(result.max_gain_index(), Some(0));
        assert!((result.max_gain() - 25.0 / 324.0).abs() < 1e-12);
        // 4.5 and 7.5 tie exactly; both lose to 2.0.
        assert!((result.gains()[2] - result.gains()[5]).abs() < 1e-12);

        let again = engine.compute_continuous(&attr, &target).unwrap();
        assert_eq!(again.best_candidate(), result.best_candidate());
    }

    #[test]
    fn continuous_tie_keeps_leftmost() {
        // Symmetric layout: 1.5 and 3.5 score identically.
        let attr = [1.0, 2.0, 3.0, 4.0];
        let target = [N, P, P, N];
        let result = GiniGainEngine::new(2).compute_continuous(&attr, &target).unwrap();
        assert!((result.gains()[0] - result.gains()[2]).abs() < 1e-12);
        assert!(result.gains()[1] < result.gains()[0]);
        assert_eq!(result.max_gain_index(), Some(0));
    }

    #[test]
    fn sorted_index_realigns_column() {
        let attr = [3.0, 1.0, 2.0];
        let result = GiniGainEngine::new(2).compute_continuous(&attr, &[P, N, P]).unwrap();
        assert_eq!(result.sorted_index(), &[1, 2, 0]);
    }

    #[test]
    fn constant_column_has_no_candidates() {
        let result = GiniGainEngine::new(2)
            .compute_continuous(&[5.0, 5.0, 5.0], &[P, N, P])
            .unwrap();
        assert!(result.candidates().is_empty());
        assert_eq!(result.max_gain(), 0.0);
        assert!(result.is_exhausted());
    }

    #[test]
    fn uninformative_column_has_zero_gain() {
        // Each side keeps the parent's 50/50 class mix.
        let attr = [1.0, 1.0, 2.0, 2.0];
        let target = [P, N, P, N];
        let result = GiniGainEngine::new(2).compute_continuous(&attr, &target).unwrap();
        assert_eq!(result.candidates().len(), 1);
        assert_eq!(result.max_gain(), 0.0);
        assert!(result.is_exhausted());
    }

    #[test]
    fn empty_partition_is_error() {
        let err = GiniGainEngine::new(2).compute_continuous(&[], &[]).unwrap_err();
        assert!(matches!(err, RfError::EmptyPartition));
        assert!(err.is_transient());
    }

    #[test]
    fn length_mismatch_is_error() {
        let err = GiniGainEngine::new(2).compute_continuous(&[1.0], &[P, N]).unwrap_err();
        assert!(matches!(err, RfError::ColumnLengthMismatch { attribute: 1, target: 2 }));
    }

    #[test]
    fn discrete_value_out_of_range_is_error() {
        let err = GiniGainEngine::new(2).compute_discrete(&[0, 5], 2, &[P, N]).unwrap_err();
        assert!(matches!(err, RfError::ValueOutOfRange { value: 5, n_values: 2 }));
        assert!(!err.is_transient());
    }

    #[test]
    fn gains_bounded_by_unit_interval() {
        let attr = [0.1, 0.4, 0.35, 0.8, 0.9, 0.2, 0.6];
        let target = [0, 2, 1, 1, 2, 0, 1];
        let result = GiniGainEngine::new(3).compute_continuous(&attr, &target).unwrap();
        for &g in result.gains() {
            assert!((0.0..=1.0).contains(&g), "gain {g} out of range");
        }
    }

    #[test]
    fn discrete_enumerates_all_two_way_partitions() {
        // Values: 0 = red, 1 = green, 2 = blue.
        let attr = [0, 0, 1, 1, 2, 2];
        let target = [P, P, N, N, P, P];
        let result = GiniGainEngine::new(2).compute_discrete(&attr, 3, &target).unwrap();
        assert_eq!(result.candidates().len(), 3);
        assert_eq!(
            result.candidates(),
            &[
                SplitCandidate::Partition(vec![0]),
                SplitCandidate::Partition(vec![1]),
                SplitCandidate::Partition(vec![0, 1]),
            ]
        );
        // {green} vs {red, blue} separates the classes perfectly.
        assert_eq!(result.best_candidate(), Some(&SplitCandidate::Partition(vec![1])));
        assert!((result.max_gain() - result.impurity().value()).abs() < 1e-12);
    }

    #[test]
    fn discrete_single_value_has_no_candidates() {
        let result = GiniGainEngine::new(2).compute_discrete(&[0, 0], 1, &[P, N]).unwrap();
        assert!(result.candidates().is_empty());
        assert!(result.is_exhausted());
    }

    #[test]
    fn discrete_high_cardinality_uses_one_vs_rest() {
        let n_values = MAX_EXHAUSTIVE_CATEGORIES + 1;
        let attr: Vec<usize> = (0..n_values).collect();
        let target: Vec<usize> = (0..n_values).map(|v| usize::from(v == 4)).collect();
        let result = GiniGainEngine::new(2).compute_discrete(&attr, n_values, &target).unwrap();
        assert_eq!(result.candidates().len(), n_values);
        assert_eq!(result.best_candidate(), Some(&SplitCandidate::Partition(vec![4])));
    }

    #[test]
    fn skipped_result_is_exhausted() {
        let r = GiniResult::skipped();
        assert!(r.is_skipped());
        assert!(r.is_exhausted());
        assert_eq!(r.max_gain_index(), None);
    }
}
