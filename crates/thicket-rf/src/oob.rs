//! Out-of-bag (OOB) evaluation for Random Forest.

use rayon::iter::{IndexedParallelIterator, IntoParallelRefIterator, ParallelIterator};
use thicket_data::Dataset;
use tracing::{debug, instrument};

use crate::confusion::ConfusionMatrix;
use crate::error::RfError;
use crate::forest::RandomForest;
use crate::predict::SetPrediction;
use crate::stats::Stat;

/// OOB evaluation of a single tree.
#[derive(Debug, Clone)]
pub struct OobReport {
    /// Position of the tree in the forest.
    pub tree: usize,
    /// Number of rows the tree never drew.
    pub n_oob: usize,
    /// Confusion matrix of the tree on its OOB rows.
    pub matrix: ConfusionMatrix,
    /// Binary statistics of this tree, when the positive class is known.
    pub stat: Option<Stat>,
    /// Binary statistics of the running aggregate up to this tree.
    pub running_stat: Option<Stat>,
}

/// All OOB results of a training run.
#[derive(Debug, Clone)]
pub struct OobSummary {
    /// One report per tree, in growth order.
    pub reports: Vec<OobReport>,
    /// Sum of every tree's OOB confusion matrix.
    pub aggregate: ConfusionMatrix,
    /// Forest vote on the training rows with own-bag exclusion.
    pub forest: SetPrediction,
}

impl OobSummary {
    /// Forest-level OOB accuracy.
    #[must_use]
    pub fn accuracy(&self) -> f64 {
        self.forest.accuracy()
    }
}

/// Classify each tree's OOB rows, accumulate the running matrix, then vote
/// the whole forest over the training rows with own-bag exclusion.
#[instrument(skip_all, fields(n_trees = forest.n_trees()))]
pub(crate) fn compute_oob(
    forest: &RandomForest,
    dataset: &Dataset,
    labels: &[usize],
) -> Result<OobSummary, RfError> {
    let rows = dataset.rows();
    let matrices: Vec<(usize, ConfusionMatrix)> = forest
        .trees
        .par_iter()
        .zip(forest.bags.par_iter())
        .map(|(tree, bag)| -> Result<(usize, ConfusionMatrix), RfError> {
            let oob = bag.oob_indices();
            let predictions = oob
                .iter()
                .map(|&i| tree.classify(&rows[i]))
                .collect::<Result<Vec<_>, _>>()?;
            let actuals: Vec<usize> = oob.iter().map(|&i| labels[i]).collect();
            let matrix = ConfusionMatrix::compute(&forest.classes, &actuals, &predictions)?;
            Ok((oob.len(), matrix))
        })
        .collect::<Result<_, _>>()?;

    let positive = forest.classes.index_of(&forest.positive_label);
    let mut aggregate = ConfusionMatrix::empty(&forest.classes);
    let mut reports = Vec::with_capacity(matrices.len());
    for (tree, (n_oob, matrix)) in matrices.into_iter().enumerate() {
        aggregate.merge(&matrix)?;
        let stat = positive.map(|p| Stat::from_counts(matrix.binary_counts(p)));
        let running_stat = positive.map(|p| Stat::from_counts(aggregate.binary_counts(p)));
        debug!(
            tree,
            n_oob,
            accuracy = matrix.accuracy(),
            running_accuracy = aggregate.accuracy(),
            "tree OOB evaluated"
        );
        reports.push(OobReport {
            tree,
            n_oob,
            matrix,
            stat,
            running_stat,
        });
    }

    let ids: Vec<usize> = (0..dataset.row_count()).collect();
    let forest_prediction = forest.classify_set(dataset, Some(&ids))?;

    Ok(OobSummary {
        reports,
        aggregate,
        forest: forest_prediction,
    })
}
