//! LN-SMOTE: SMOTE bounded by local safe levels.
//!
//! The safe level of a row is the number of minority rows among its `k`
//! nearest neighbours in the whole dataset. The neighbour `n` of a minority
//! row `p` is drawn from those same rows, so it may belong to the majority
//! class. Interpolation is pulled toward whichever endpoint sits in the safer
//! region.

use std::collections::HashMap;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use thicket_data::{Dataset, Sample};
use tracing::{debug, info, instrument};

use crate::config::SmoteConfig;
use crate::error::SmoteError;
use crate::knn::Neighbor;
use crate::result::OversampleResult;
use crate::smote::{interpolate, minority_rows, neighbor_lists};

/// Range of the interpolation factor for one `(p, n)` pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Gap {
    /// Both endpoints have no minority neighbour.
    Outlier,
    /// One endpoint has no minority neighbour, or the range would be empty.
    Unsafe,
    /// Draw the factor from `[low, high)`.
    Range { low: f64, high: f64 },
}

pub(crate) fn gap(slp: usize, sln: usize) -> Gap {
    match (slp, sln) {
        (0, 0) => Gap::Outlier,
        (_, 0) | (0, _) => Gap::Unsafe,
        (p, n) if p == n => Gap::Range {
            low: 0.0,
            high: 1.0,
        },
        (p, n) if p < n => Gap::Range {
            low: 0.0,
            high: p as f64 / n as f64,
        },
        (p, n) => Gap::Range {
            low: 1.0 - n as f64 / p as f64,
            high: 1.0,
        },
    }
}

fn count_minority(neighbors: &[Neighbor<'_>], label: &str) -> usize {
    neighbors
        .iter()
        .filter(|nb| nb.sample.class_label() == label)
        .count()
}

/// Safe level of a minority `n` seen from `p`.
///
/// `p` is skipped if it is one of `n`'s `k` nearest, and the `k + 1`-th
/// neighbour takes its place.
fn safe_level_from(p: &Sample, n_neighbors: &[Neighbor<'_>], k: usize, label: &str) -> usize {
    let nearest = &n_neighbors[..n_neighbors.len().min(k)];
    if nearest.iter().any(|nb| std::ptr::eq(nb.sample, p)) {
        let replaced: Vec<Neighbor<'_>> = n_neighbors
            .iter()
            .filter(|nb| !std::ptr::eq(nb.sample, p))
            .take(k)
            .copied()
            .collect();
        count_minority(&replaced, label)
    } else {
        count_minority(nearest, label)
    }
}

impl SmoteConfig {
    /// Oversample the minority class of `dataset` with LN-SMOTE.
    ///
    /// For every minority row `p`, the `k` nearest rows of any class are
    /// found. Each of [`Self::n_synthetic`] repetitions picks one of them
    /// uniformly as `n`. The interpolation factor range for the pair is:
    ///
    /// | `slp` vs `sln` | factor range |
    /// |---|---|
    /// | both 0 | none; `p` is recorded as an outlier |
    /// | either 0 | none |
    /// | equal | `[0, 1)` |
    /// | `slp < sln` | `[0, slp / sln)` |
    /// | `slp > sln` | `[1 - sln / slp, 1)` |
    ///
    /// Synthetic rows always carry the class of `p`.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`SmoteError::EmptyDataset`] | `dataset` has no rows |
    /// | [`SmoteError::UnknownMinorityClass`] | the configured label never occurs |
    /// | [`SmoteError::Data`] | rows of mixed attribute kinds |
    #[instrument(skip_all, fields(n_rows = dataset.row_count(), k = self.k))]
    pub fn lnsmote(&self, dataset: &Dataset) -> Result<OversampleResult, SmoteError> {
        let label = self.resolve_minority(dataset)?;
        let minority = minority_rows(dataset, &label);
        let all: Vec<&Sample> = dataset.rows().iter().collect();
        info!(
            minority = %label,
            n_minority = minority.len(),
            n_synthetic = self.n_synthetic(),
            "starting LN-SMOTE"
        );

        let engine = self.engine();
        let nearest = neighbor_lists(&engine, &all, &minority, self.k)?;

        // Only rows that can be drawn as `n` need their own neighbour lists.
        let mut candidates: Vec<usize> = nearest.iter().flatten().map(|nb| nb.index).collect();
        candidates.sort_unstable();
        candidates.dedup();
        let queries: Vec<&Sample> = candidates.iter().map(|&j| all[j]).collect();
        let candidate_neighbors: HashMap<usize, Vec<Neighbor<'_>>> = candidates
            .into_iter()
            .zip(neighbor_lists(&engine, &all, &queries, self.k + 1)?)
            .collect();
        debug!(n_candidates = candidate_neighbors.len(), "neighbour lists ready");

        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let mut synthetic = Vec::with_capacity(minority.len() * self.n_synthetic());
        let mut outliers = Vec::new();
        let mut skipped = 0;
        for (i, p) in minority.iter().enumerate() {
            let near = &nearest[i];
            if near.is_empty() {
                debug!(row = i, "no distinct neighbour, skipping");
                skipped += self.n_synthetic();
                continue;
            }
            let slp = count_minority(near, &label);
            let mut is_outlier = false;
            for _ in 0..self.n_synthetic() {
                let chosen = near[rng.gen_range(0..near.len())];
                let n_neighbors = candidate_neighbors
                    .get(&chosen.index)
                    .map_or(&[][..], Vec::as_slice);
                let sln = if chosen.sample.class_label() == label {
                    safe_level_from(p, n_neighbors, self.k, &label)
                } else {
                    count_minority(&n_neighbors[..n_neighbors.len().min(self.k)], &label)
                };
                match gap(slp, sln) {
                    Gap::Outlier => {
                        if !is_outlier {
                            debug!(row = i, "outlier: no minority neighbours");
                            outliers.push((*p).clone());
                            is_outlier = true;
                        }
                        skipped += 1;
                    }
                    Gap::Unsafe => skipped += 1,
                    Gap::Range { low, high } => {
                        synthetic.push(interpolate(p, chosen.sample, low, high, &mut rng)?);
                    }
                }
            }
        }

        info!(
            generated = synthetic.len(),
            outliers = outliers.len(),
            skipped,
            "LN-SMOTE finished"
        );
        Ok(OversampleResult {
            minority_label: label,
            n_minority: minority.len(),
            synthetic,
            outliers,
            skipped,
        })
    }
}
