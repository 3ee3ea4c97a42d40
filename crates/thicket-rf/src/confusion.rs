//! Confusion matrix and per-class classification metrics.

use std::fmt;

use thicket_data::ValueSpace;

use crate::error::RfError;
use crate::stats::BinaryCounts;

/// A confusion matrix over a class value space.
///
/// Entry `counts[actual][predicted]` counts how many rows with class
/// `actual` were predicted as `predicted`. Rows and columns follow the
/// value-space order.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ConfusionMatrix {
    classes: ValueSpace,
    counts: Vec<Vec<usize>>,
}

/// Per-class precision, recall, and F1 score.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ClassMetrics {
    /// The class label.
    pub class: String,
    /// Precision: TP / (TP + FP). 0.0 if no predictions for this class.
    pub precision: f64,
    /// Recall: TP / (TP + FN). 0.0 if no true samples for this class.
    pub recall: f64,
    /// F1: 2 * precision * recall / (precision + recall). 0.0 if both are zero.
    pub f1: f64,
    /// Number of true samples in this class.
    pub support: usize,
}

impl ConfusionMatrix {
    /// Create an all-zero matrix.
    #[must_use]
    pub fn empty(classes: &ValueSpace) -> Self {
        let n = classes.len();
        Self {
            classes: classes.clone(),
            counts: vec![vec![0; n]; n],
        }
    }

    /// Build a matrix from class indices into `classes`.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`RfError::PredictionLengthMismatch`] | slices differ in length |
    /// | [`RfError::ClassOutOfRange`] | an index does not address `classes` |
    pub fn compute(
        classes: &ValueSpace,
        actuals: &[usize],
        predictions: &[usize],
    ) -> Result<Self, RfError> {
        if actuals.len() != predictions.len() {
            return Err(RfError::PredictionLengthMismatch {
                actuals: actuals.len(),
                predictions: predictions.len(),
            });
        }
        let mut matrix = Self::empty(classes);
        let n_classes = classes.len();
        for (&a, &p) in actuals.iter().zip(predictions) {
            for class in [a, p] {
                if class >= n_classes {
                    return Err(RfError::ClassOutOfRange { class, n_classes });
                }
            }
            matrix.counts[a][p] += 1;
        }
        Ok(matrix)
    }

    /// Build a matrix from string labels.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`RfError::PredictionLengthMismatch`] | slices differ in length |
    /// | [`RfError::UnknownClassLabel`] | a label is not in `classes` |
    pub fn compute_labels<S: AsRef<str>>(
        classes: &ValueSpace,
        actuals: &[S],
        predictions: &[S],
    ) -> Result<Self, RfError> {
        let encode = |labels: &[S]| -> Result<Vec<usize>, RfError> {
            labels
                .iter()
                .map(|l| {
                    classes
                        .index_of(l.as_ref())
                        .ok_or_else(|| RfError::UnknownClassLabel {
                            label: l.as_ref().to_string(),
                        })
                })
                .collect()
        };
        Self::compute(classes, &encode(actuals)?, &encode(predictions)?)
    }

    /// Add another matrix over the same value space into this one.
    ///
    /// # Errors
    ///
    /// Returns [`RfError::ClassOutOfRange`] if the other matrix is larger.
    pub fn merge(&mut self, other: &ConfusionMatrix) -> Result<(), RfError> {
        let n_classes = self.n_classes();
        if other.n_classes() > n_classes {
            return Err(RfError::ClassOutOfRange {
                class: other.n_classes() - 1,
                n_classes,
            });
        }
        for (row, other_row) in self.counts.iter_mut().zip(&other.counts) {
            for (c, o) in row.iter_mut().zip(other_row) {
                *c += o;
            }
        }
        Ok(())
    }

    /// Return the count of rows with class `actual` predicted as `predicted`.
    #[must_use]
    pub fn count(&self, actual: usize, predicted: usize) -> usize {
        self.counts
            .get(actual)
            .and_then(|row| row.get(predicted))
            .copied()
            .unwrap_or(0)
    }

    /// Return the total number of rows counted.
    #[must_use]
    pub fn total(&self) -> usize {
        self.counts.iter().flatten().sum()
    }

    /// Per-row class error: misclassified rows of a class over all rows of it.
    ///
    /// Rows with no samples have error 0.
    #[must_use]
    pub fn class_errors(&self) -> Vec<f64> {
        self.counts
            .iter()
            .enumerate()
            .map(|(i, row)| {
                let row_sum: usize = row.iter().sum();
                if row_sum == 0 {
                    0.0
                } else {
                    (row_sum - row[i]) as f64 / row_sum as f64
                }
            })
            .collect()
    }

    /// Overall accuracy: proportion of correct predictions.
    #[must_use]
    pub fn accuracy(&self) -> f64 {
        let correct: usize = (0..self.n_classes()).map(|i| self.counts[i][i]).sum();
        let total = self.total();
        if total == 0 {
            0.0
        } else {
            correct as f64 / total as f64
        }
    }

    /// Collapse the matrix to one class against the rest.
    #[must_use]
    pub fn binary_counts(&self, positive: usize) -> BinaryCounts {
        let n = self.n_classes();
        if positive >= n {
            return BinaryCounts {
                true_negatives: self.total(),
                ..BinaryCounts::default()
            };
        }
        let tp = self.counts[positive][positive];
        let row_sum: usize = self.counts[positive].iter().sum();
        let col_sum: usize = (0..n).map(|i| self.counts[i][positive]).sum();
        let fn_ = row_sum - tp;
        let fp = col_sum - tp;
        BinaryCounts {
            true_positives: tp,
            false_positives: fp,
            true_negatives: self.total() - tp - fn_ - fp,
            false_negatives: fn_,
        }
    }

    /// Per-class precision, recall, F1, and support.
    #[must_use]
    pub fn class_metrics(&self) -> Vec<ClassMetrics> {
        (0..self.n_classes())
            .map(|c| {
                let counts = self.binary_counts(c);
                let tp = counts.true_positives;
                let support = tp + counts.false_negatives;
                let predicted = tp + counts.false_positives;
                let precision = if predicted == 0 {
                    0.0
                } else {
                    tp as f64 / predicted as f64
                };
                let recall = if support == 0 {
                    0.0
                } else {
                    tp as f64 / support as f64
                };
                let f1 = if precision + recall == 0.0 {
                    0.0
                } else {
                    2.0 * precision * recall / (precision + recall)
                };
                ClassMetrics {
                    class: self.classes.label(c).unwrap_or_default().to_string(),
                    precision,
                    recall,
                    f1,
                    support,
                }
            })
            .collect()
    }

    /// Return the underlying matrix rows.
    #[must_use]
    pub fn as_rows(&self) -> &[Vec<usize>] {
        &self.counts
    }

    /// Return the value space labelling rows and columns.
    #[must_use]
    pub fn classes(&self) -> &ValueSpace {
        &self.classes
    }

    /// Return the number of classes.
    #[must_use]
    pub fn n_classes(&self) -> usize {
        self.counts.len()
    }
}

impl fmt::Display for ConfusionMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:>10}", "")?;
        for label in self.classes.labels() {
            write!(f, " {label:>8}")?;
        }
        writeln!(f, " {:>8}", "error")?;

        for ((label, row), error) in self
            .classes
            .labels()
            .iter()
            .zip(&self.counts)
            .zip(self.class_errors())
        {
            write!(f, "{label:>10}")?;
            for val in row {
                write!(f, " {val:>8}")?;
            }
            writeln!(f, " {error:>8.4}")?;
        }

        Ok(())
    }
}

/// Row ids partitioned by binary outcome.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct PredictionGroups {
    /// Ids of positive rows predicted positive.
    pub true_positives: Vec<usize>,
    /// Ids of negative rows predicted positive.
    pub false_positives: Vec<usize>,
    /// Ids of negative rows predicted negative.
    pub true_negatives: Vec<usize>,
    /// Ids of positive rows predicted negative.
    pub false_negatives: Vec<usize>,
}

/// Partition `ids` into TP/FP/TN/FN lists, treating `positive` as the
/// positive class and every other class as negative.
///
/// # Errors
///
/// Returns [`RfError::PredictionLengthMismatch`] if the three slices differ
/// in length.
pub fn group_index_predictions(
    ids: &[usize],
    actuals: &[usize],
    predictions: &[usize],
    positive: usize,
) -> Result<PredictionGroups, RfError> {
    if ids.len() != actuals.len() || actuals.len() != predictions.len() {
        return Err(RfError::PredictionLengthMismatch {
            actuals: actuals.len(),
            predictions: predictions.len().min(ids.len()),
        });
    }
    let mut groups = PredictionGroups::default();
    for ((&id, &a), &p) in ids.iter().zip(actuals).zip(predictions) {
        let bucket = match (a == positive, p == positive) {
            (true, true) => &mut groups.true_positives,
            (false, true) => &mut groups.false_positives,
            (false, false) => &mut groups.true_negatives,
            (true, false) => &mut groups.false_negatives,
        };
        bucket.push(id);
    }
    Ok(groups)
}
