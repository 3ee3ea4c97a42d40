//! Training result types for Random Forest.

use crate::forest::RandomForest;
use crate::oob::OobSummary;

/// Metadata about the training run.
#[derive(Debug, Clone, serde::Serialize)]
pub struct TrainingMetadata {
    /// Number of trees trained.
    pub n_trees: usize,
    /// Number of non-class attributes.
    pub n_features: usize,
    /// Number of distinct classes.
    pub n_classes: usize,
    /// Number of training samples.
    pub n_samples: usize,
    /// Attributes considered at each split.
    pub n_random_features: usize,
    /// Rows drawn per bootstrap bag.
    pub bag_size: usize,
    /// Trees regrown after a transient failure, summed over the forest.
    pub retries: usize,
}

/// Result of Random Forest training.
///
/// Contains the fitted forest, optional OOB evaluation, and training metadata.
#[derive(Debug)]
pub struct RandomForestResult {
    forest: RandomForest,
    oob: Option<OobSummary>,
    metadata: TrainingMetadata,
}

impl RandomForestResult {
    /// Create a new training result.
    pub(crate) fn new(
        forest: RandomForest,
        oob: Option<OobSummary>,
        metadata: TrainingMetadata,
    ) -> Self {
        Self {
            forest,
            oob,
            metadata,
        }
    }

    /// Borrow the fitted forest.
    #[must_use]
    pub fn forest(&self) -> &RandomForest {
        &self.forest
    }

    /// Consume the result and return the fitted forest.
    #[must_use]
    pub fn into_forest(self) -> RandomForest {
        self.forest
    }

    /// Return the OOB evaluation, if computed.
    #[must_use]
    pub fn oob(&self) -> Option<&OobSummary> {
        self.oob.as_ref()
    }

    /// Return training metadata.
    #[must_use]
    pub fn metadata(&self) -> &TrainingMetadata {
        &self.metadata
    }
}
