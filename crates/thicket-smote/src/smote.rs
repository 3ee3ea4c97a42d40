//! SMOTE: interpolate synthetic minority rows between neighbours.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
use thicket_data::{Dataset, Sample, Value};
use tracing::{debug, info, instrument};

use crate::config::SmoteConfig;
use crate::error::SmoteError;
use crate::knn::{KnnEngine, Neighbor};
use crate::result::OversampleResult;

/// Build a row between `p` and `n`.
///
/// Each numeric attribute becomes `p + delta * (n - p)` with `delta` drawn
/// independently from `[low, high)`. Categorical attributes and the class
/// label are copied from `p`.
pub(crate) fn interpolate<R: Rng>(
    p: &Sample,
    n: &Sample,
    low: f64,
    high: f64,
    rng: &mut R,
) -> Result<Sample, SmoteError> {
    let mut synthetic = p.clone();
    for idx in p.feature_indices() {
        if let Value::Numeric(pv) = p.attribute(idx)? {
            let nv = n.numeric(idx)?;
            let delta = low + (high - low) * rng.r#gen::<f64>();
            synthetic.set_numeric(idx, pv + delta * (nv - pv))?;
        }
    }
    Ok(synthetic)
}

/// Neighbour lists of every query row, computed in parallel.
pub(crate) fn neighbor_lists<'a>(
    engine: &KnnEngine,
    candidates: &[&'a Sample],
    queries: &[&Sample],
    n: usize,
) -> Result<Vec<Vec<Neighbor<'a>>>, SmoteError> {
    queries
        .par_iter()
        .map(|query| engine.find_n_neighbors(candidates, query, n))
        .collect()
}

pub(crate) fn minority_rows<'a>(dataset: &'a Dataset, label: &str) -> Vec<&'a Sample> {
    dataset
        .rows()
        .iter()
        .filter(|row| row.class_label() == label)
        .collect()
}

impl SmoteConfig {
    /// Oversample the minority class of `dataset` with SMOTE.
    ///
    /// For every minority row `p`, the `k` nearest minority rows are found.
    /// Each of [`Self::n_synthetic`] repetitions picks one of them uniformly
    /// and interpolates between `p` and it. A row with no neighbour other
    /// than exact duplicates of itself produces nothing. The input is not
    /// modified; see [`OversampleResult::append_to`].
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`SmoteError::EmptyDataset`] | `dataset` has no rows |
    /// | [`SmoteError::UnknownMinorityClass`] | the configured label never occurs |
    /// | [`SmoteError::Data`] | rows of mixed attribute kinds |
    #[instrument(skip_all, fields(n_rows = dataset.row_count(), k = self.k))]
    pub fn smote(&self, dataset: &Dataset) -> Result<OversampleResult, SmoteError> {
        let label = self.resolve_minority(dataset)?;
        let minority = minority_rows(dataset, &label);
        info!(
            minority = %label,
            n_minority = minority.len(),
            n_synthetic = self.n_synthetic(),
            "starting SMOTE"
        );

        let engine = self.engine();
        let neighbors = neighbor_lists(&engine, &minority, &minority, self.k)?;

        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let mut synthetic = Vec::with_capacity(minority.len() * self.n_synthetic());
        let mut skipped = 0;
        for (i, (p, near)) in minority.iter().zip(&neighbors).enumerate() {
            if near.is_empty() {
                debug!(row = i, "no distinct minority neighbour, skipping");
                skipped += self.n_synthetic();
                continue;
            }
            for _ in 0..self.n_synthetic() {
                let n = near[rng.gen_range(0..near.len())].sample;
                synthetic.push(interpolate(p, n, 0.0, 1.0, &mut rng)?);
            }
        }

        info!(generated = synthetic.len(), skipped, "SMOTE finished");
        Ok(OversampleResult {
            minority_label: label,
            n_minority: minority.len(),
            synthetic,
            outliers: Vec::new(),
            skipped,
        })
    }
}
