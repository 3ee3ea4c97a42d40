//! Brute-force k-nearest-neighbour search.

use thicket_data::Sample;
use tracing::warn;

use crate::distance::{Distance, DistanceMetric};
use crate::error::SmoteError;

pub(crate) const DEFAULT_K: usize = 5;

/// One neighbour of a query row.
#[derive(Debug, Clone, Copy)]
pub struct Neighbor<'a> {
    /// Position of the neighbour in the candidate slice.
    pub index: usize,
    /// The neighbouring row, borrowed from the candidates.
    pub sample: &'a Sample,
    /// Distance from the query.
    pub distance: Distance,
}

/// Finds the `k` nearest candidates of a query row.
///
/// Every query scans every candidate; no spatial index is built.
#[derive(Debug, Clone, Copy)]
pub struct KnnEngine {
    k: usize,
    metric: DistanceMetric,
}

impl KnnEngine {
    /// Create an engine returning up to `k` neighbours. Zero is replaced by 5.
    #[must_use]
    pub fn new(k: usize) -> Self {
        let k = if k == 0 {
            warn!(default = DEFAULT_K, "k = 0 is invalid, using default");
            DEFAULT_K
        } else {
            k
        };
        Self {
            k,
            metric: DistanceMetric::default(),
        }
    }

    /// Set the distance metric.
    #[must_use]
    pub fn with_metric(mut self, metric: DistanceMetric) -> Self {
        self.metric = metric;
        self
    }

    /// Return the neighbour count.
    #[must_use]
    pub fn k(&self) -> usize {
        self.k
    }

    /// Return the distance metric.
    #[must_use]
    pub fn metric(&self) -> DistanceMetric {
        self.metric
    }

    /// Return the `k` nearest candidates of `query`, closest first.
    ///
    /// Candidates at distance 0 are treated as the query itself and
    /// dropped. Equal distances keep candidate order. Fewer than `k`
    /// neighbours are returned when fewer candidates remain.
    ///
    /// # Errors
    ///
    /// Propagates [`DistanceMetric::distance`] errors.
    pub fn find_neighbors<'a>(
        &self,
        candidates: &[&'a Sample],
        query: &Sample,
    ) -> Result<Vec<Neighbor<'a>>, SmoteError> {
        self.find_n_neighbors(candidates, query, self.k)
    }

    /// Like [`Self::find_neighbors`] with an explicit neighbour count.
    ///
    /// # Errors
    ///
    /// Propagates [`DistanceMetric::distance`] errors.
    pub fn find_n_neighbors<'a>(
        &self,
        candidates: &[&'a Sample],
        query: &Sample,
        n: usize,
    ) -> Result<Vec<Neighbor<'a>>, SmoteError> {
        let mut matches = Vec::with_capacity(candidates.len());
        for (index, &sample) in candidates.iter().enumerate() {
            let distance = self.metric.distance(query, sample)?;
            if distance.value() > 0.0 {
                matches.push(Neighbor {
                    index,
                    sample,
                    distance,
                });
            }
        }
        matches.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        matches.truncate(n);
        Ok(matches)
    }
}

impl Default for KnnEngine {
    fn default() -> Self {
        Self::new(DEFAULT_K)
    }
}

#[cfg(test)]
mod tests {
    use thicket_data::Value;

    use super::*;

    fn point(x: f64) -> Sample {
        Sample::new(vec![Value::Numeric(x), Value::from("c")], 1).unwrap()
    }

    #[test]
    fn nearest_sorted_ascending() {
        let rows: Vec<Sample> = [5.0, 1.0, 3.0, 8.0, 2.0].into_iter().map(point).collect();
        let candidates: Vec<&Sample> = rows.iter().collect();
        let neighbors = KnnEngine::new(3)
            .find_neighbors(&candidates, &point(0.0))
            .unwrap();
        let indices: Vec<usize> = neighbors.iter().map(|n| n.index).collect();
        assert_eq!(indices, vec![1, 4, 2]);
        assert!((neighbors[0].distance.value() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn zero_distance_matches_are_dropped() {
        let rows: Vec<Sample> = [0.0, 0.0, 1.0, 2.0].into_iter().map(point).collect();
        let candidates: Vec<&Sample> = rows.iter().collect();
        let neighbors = KnnEngine::new(5)
            .find_neighbors(&candidates, &rows[0])
            .unwrap();
        assert_eq!(neighbors.len(), 2);
        assert!(neighbors.iter().all(|n| n.distance.value() > 0.0));
    }

    #[test]
    fn ties_keep_candidate_order() {
        let rows: Vec<Sample> = [1.0, -1.0, 2.0].into_iter().map(point).collect();
        let candidates: Vec<&Sample> = rows.iter().collect();
        let neighbors = KnnEngine::new(2)
            .find_neighbors(&candidates, &point(0.0))
            .unwrap();
        assert_eq!(neighbors[0].index, 0);
        assert_eq!(neighbors[1].index, 1);
    }

    #[test]
    fn manhattan_is_the_default() {
        let engine = KnnEngine::default();
        assert_eq!(engine.metric(), DistanceMetric::Manhattan);
        assert_eq!(engine.k(), 5);
        assert_eq!(KnnEngine::new(0).k(), 5);
    }

    #[test]
    fn neighbors_borrow_candidates() {
        let rows: Vec<Sample> = [1.0, 2.0].into_iter().map(point).collect();
        let candidates: Vec<&Sample> = rows.iter().collect();
        let neighbors = KnnEngine::new(1)
            .find_neighbors(&candidates, &point(0.0))
            .unwrap();
        assert!(std::ptr::eq(neighbors[0].sample, &rows[0]));
    }
}
