//! Prediction methods for the Random Forest ensemble.

use rayon::iter::{IndexedParallelIterator, IntoParallelRefIterator, ParallelIterator};
use thicket_data::{Dataset, Sample, ValueSpace};

use crate::confusion::{ConfusionMatrix, PredictionGroups, group_index_predictions};
use crate::error::RfError;
use crate::forest::RandomForest;
use crate::stats::{Stat, auc};
use crate::tree::majority;

/// Predictions for a labelled row set with the derived evaluation.
#[derive(Debug, Clone)]
pub struct SetPrediction {
    /// Id of each row, as passed by the caller or `0..n`.
    pub sample_ids: Vec<usize>,
    /// Predicted class index per row.
    pub predictions: Vec<usize>,
    /// Per-row class probabilities, aligned with the value space.
    pub probabilities: Vec<Vec<f64>>,
    /// Actual class index per row.
    pub actuals: Vec<usize>,
    /// Confusion matrix over all rows.
    pub matrix: ConfusionMatrix,
    /// Row ids by binary outcome, when the positive class is known.
    pub groups: Option<PredictionGroups>,
    /// Binary statistics with AUC, when the positive class is known.
    pub stat: Option<Stat>,
}

impl SetPrediction {
    /// Assemble predictions and derive the matrix, groups and statistics.
    pub(crate) fn summarize(
        classes: &ValueSpace,
        positive_label: &str,
        sample_ids: Vec<usize>,
        predictions: Vec<usize>,
        probabilities: Vec<Vec<f64>>,
        actuals: Vec<usize>,
    ) -> Result<Self, RfError> {
        let matrix = ConfusionMatrix::compute(classes, &actuals, &predictions)?;
        let (groups, stat) = match classes.index_of(positive_label) {
            Some(positive) => {
                let groups =
                    group_index_predictions(&sample_ids, &actuals, &predictions, positive)?;
                let scores: Vec<f64> = probabilities
                    .iter()
                    .map(|p| p.get(positive).copied().unwrap_or(0.0))
                    .collect();
                let is_positive: Vec<bool> = actuals.iter().map(|&a| a == positive).collect();
                let stat = Stat::from_counts(matrix.binary_counts(positive))
                    .with_auc(auc(&scores, &is_positive));
                (Some(groups), Some(stat))
            }
            None => (None, None),
        };
        Ok(Self {
            sample_ids,
            predictions,
            probabilities,
            actuals,
            matrix,
            groups,
            stat,
        })
    }

    /// Return overall accuracy.
    #[must_use]
    pub fn accuracy(&self) -> f64 {
        self.matrix.accuracy()
    }
}

/// Encode each row's class label against `classes`.
pub(crate) fn encode_actuals(
    classes: &ValueSpace,
    dataset: &Dataset,
) -> Result<Vec<usize>, RfError> {
    dataset
        .rows()
        .iter()
        .map(|row| {
            classes
                .index_of(row.class_label())
                .ok_or_else(|| RfError::UnknownClassLabel {
                    label: row.class_label().to_string(),
                })
        })
        .collect()
}

/// Normalise vote counts to frequencies.
pub(crate) fn frequencies(votes: &[usize]) -> Vec<f64> {
    let total: usize = votes.iter().sum();
    if total == 0 {
        return vec![0.0; votes.len()];
    }
    votes.iter().map(|&v| v as f64 / total as f64).collect()
}

/// Running per-row vote counts, kept with and without own-bag exclusion.
#[derive(Debug, Clone)]
pub(crate) struct VoteTally {
    oob: Vec<Vec<usize>>,
    all: Vec<Vec<usize>>,
}

impl VoteTally {
    pub(crate) fn new(n_rows: usize, n_classes: usize) -> Self {
        Self {
            oob: vec![vec![0; n_classes]; n_rows],
            all: vec![vec![0; n_classes]; n_rows],
        }
    }

    /// Record one tree's vote for `row`.
    pub(crate) fn record(&mut self, row: usize, class: usize, in_bag: bool) {
        self.all[row][class] += 1;
        if !in_bag {
            self.oob[row][class] += 1;
        }
    }

    /// Votes for `row` from trees that did not draw it, or from every tree
    /// when all of them did.
    pub(crate) fn votes(&self, row: usize) -> &[usize] {
        if self.oob[row].iter().any(|&v| v > 0) {
            &self.oob[row]
        } else {
            &self.all[row]
        }
    }

    pub(crate) fn predictions(&self) -> Vec<usize> {
        (0..self.all.len()).map(|r| majority(self.votes(r))).collect()
    }

    pub(crate) fn probabilities(&self) -> Vec<Vec<f64>> {
        (0..self.all.len()).map(|r| frequencies(self.votes(r))).collect()
    }
}

impl RandomForest {
    fn check_width(&self, sample: &Sample) -> Result<(), RfError> {
        let expected = self.schema.column_count();
        if sample.len() != expected {
            return Err(RfError::PredictionFeatureMismatch {
                expected,
                got: sample.len(),
            });
        }
        Ok(())
    }

    /// Count one vote per tree for `sample`.
    ///
    /// With `own_row = Some(id)`, trees whose bag drew training row `id` are
    /// skipped; if that skips every tree, all trees vote.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`RfError::PredictionFeatureMismatch`] | row width differs from training |
    /// | [`RfError::Data`] | a tested value has the wrong kind |
    pub fn votes(&self, sample: &Sample, own_row: Option<usize>) -> Result<Vec<usize>, RfError> {
        self.check_width(sample)?;
        let n_classes = self.classes.len();
        let mut oob = vec![0usize; n_classes];
        let mut all = vec![0usize; n_classes];
        let mut n_oob = 0usize;
        for (tree, bag) in self.trees.iter().zip(&self.bags) {
            let class = tree.classify(sample)?;
            all[class] += 1;
            if own_row.is_some_and(|id| !bag.contains(id)) {
                oob[class] += 1;
                n_oob += 1;
            }
        }
        Ok(if own_row.is_some() && n_oob > 0 { oob } else { all })
    }

    /// Predict the class index of a single row by majority vote.
    ///
    /// The first class reaching the maximum vote count wins ties.
    ///
    /// # Errors
    ///
    /// See [`Self::votes`].
    pub fn classify(&self, sample: &Sample) -> Result<usize, RfError> {
        Ok(majority(&self.votes(sample, None)?))
    }

    /// Return per-class vote frequencies for a single row.
    ///
    /// # Errors
    ///
    /// See [`Self::votes`].
    pub fn class_probabilities(&self, sample: &Sample) -> Result<Vec<f64>, RfError> {
        Ok(frequencies(&self.votes(sample, None)?))
    }

    /// Predict the class index of every row in parallel, ignoring labels.
    ///
    /// # Errors
    ///
    /// See [`Self::votes`].
    pub fn predict_rows(&self, dataset: &Dataset) -> Result<Vec<usize>, RfError> {
        dataset
            .rows()
            .par_iter()
            .map(|row| self.classify(row))
            .collect()
    }

    /// Classify a labelled row set and evaluate the result.
    ///
    /// `sample_ids[i]` is the training-row id of `dataset` row `i`; when
    /// given, each row skips the trees whose bag drew it. `None` numbers the
    /// rows `0..n` and lets every tree vote.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`RfError::PredictionLengthMismatch`] | `sample_ids` length differs from the row count |
    /// | [`RfError::UnknownClassLabel`] | a row's label is not in the forest's value space |
    /// | [`RfError::PredictionFeatureMismatch`] | row width differs from training |
    pub fn classify_set(
        &self,
        dataset: &Dataset,
        sample_ids: Option<&[usize]>,
    ) -> Result<SetPrediction, RfError> {
        if let Some(ids) = sample_ids {
            if ids.len() != dataset.row_count() {
                return Err(RfError::PredictionLengthMismatch {
                    actuals: dataset.row_count(),
                    predictions: ids.len(),
                });
            }
        }
        let actuals = encode_actuals(&self.classes, dataset)?;
        let ids: Vec<usize> = match sample_ids {
            Some(ids) => ids.to_vec(),
            None => (0..dataset.row_count()).collect(),
        };

        let votes: Vec<Vec<usize>> = dataset
            .rows()
            .par_iter()
            .enumerate()
            .map(|(i, row)| self.votes(row, sample_ids.map(|_| ids[i])))
            .collect::<Result<_, _>>()?;

        let predictions = votes.iter().map(|v| majority(v)).collect();
        let probabilities = votes.iter().map(|v| frequencies(v)).collect();
        SetPrediction::summarize(
            &self.classes,
            &self.positive_label,
            ids,
            predictions,
            probabilities,
            actuals,
        )
    }
}
