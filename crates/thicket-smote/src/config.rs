//! Configuration builder shared by SMOTE and LN-SMOTE.

use thicket_data::Dataset;
use tracing::warn;

use crate::distance::DistanceMetric;
use crate::error::SmoteError;
use crate::knn::{DEFAULT_K, KnnEngine};

pub(crate) const DEFAULT_PERCENT_OVER: usize = 100;

/// Configuration for minority oversampling.
///
/// Construct via [`SmoteConfig::new`], then chain `with_*` methods and call
/// [`SmoteConfig::smote`] or [`SmoteConfig::lnsmote`].
///
/// # Defaults
///
/// | Parameter        | Default                          |
/// |------------------|----------------------------------|
/// | `k`              | 5                                |
/// | `percent_over`   | 100 (one synthetic row per row)  |
/// | `metric`         | `Manhattan`                      |
/// | `seed`           | 42                               |
/// | `minority_label` | `None` (least frequent class)    |
#[derive(Debug, Clone)]
pub struct SmoteConfig {
    pub(crate) k: usize,
    pub(crate) percent_over: usize,
    pub(crate) metric: DistanceMetric,
    pub(crate) seed: u64,
    pub(crate) minority_label: Option<String>,
}

impl SmoteConfig {
    /// Create a new config with default values.
    #[must_use]
    pub fn new() -> Self {
        Self {
            k: DEFAULT_K,
            percent_over: DEFAULT_PERCENT_OVER,
            metric: DistanceMetric::default(),
            seed: 42,
            minority_label: None,
        }
    }

    /// Set the neighbour count. Zero is replaced by the default.
    #[must_use]
    pub fn with_k(mut self, k: usize) -> Self {
        if k == 0 {
            warn!(default = DEFAULT_K, "k = 0 is invalid, using default");
            self.k = DEFAULT_K;
        } else {
            self.k = k;
        }
        self
    }

    /// Set the oversampling amount in percent of the minority size.
    ///
    /// Only whole hundreds count: 250 yields two synthetic rows per minority
    /// row. Values below 100 are replaced by the default.
    #[must_use]
    pub fn with_percent_over(mut self, percent_over: usize) -> Self {
        if percent_over < 100 {
            warn!(
                percent_over,
                default = DEFAULT_PERCENT_OVER,
                "percent_over below 100 is invalid, using default"
            );
            self.percent_over = DEFAULT_PERCENT_OVER;
        } else {
            self.percent_over = percent_over;
        }
        self
    }

    /// Set the distance metric.
    #[must_use]
    pub fn with_metric(mut self, metric: DistanceMetric) -> Self {
        self.metric = metric;
        self
    }

    /// Set the random seed for reproducibility.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Oversample this class instead of the least frequent one.
    #[must_use]
    pub fn with_minority_label(mut self, label: impl Into<String>) -> Self {
        self.minority_label = Some(label.into());
        self
    }

    #[must_use]
    pub fn k(&self) -> usize {
        self.k
    }

    #[must_use]
    pub fn percent_over(&self) -> usize {
        self.percent_over
    }

    #[must_use]
    pub fn metric(&self) -> DistanceMetric {
        self.metric
    }

    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    #[must_use]
    pub fn minority_label(&self) -> Option<&str> {
        self.minority_label.as_deref()
    }

    /// Synthetic rows generated per minority row.
    #[must_use]
    pub fn n_synthetic(&self) -> usize {
        self.percent_over / 100
    }

    pub(crate) fn engine(&self) -> KnnEngine {
        KnnEngine::new(self.k).with_metric(self.metric)
    }

    /// The label to oversample in `dataset`.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`SmoteError::EmptyDataset`] | `dataset` has no rows |
    /// | [`SmoteError::UnknownMinorityClass`] | the configured label never occurs |
    pub(crate) fn resolve_minority(&self, dataset: &Dataset) -> Result<String, SmoteError> {
        if dataset.is_empty() {
            return Err(SmoteError::EmptyDataset);
        }
        match &self.minority_label {
            Some(label) if dataset.class_count(label) == 0 => {
                Err(SmoteError::UnknownMinorityClass {
                    label: label.clone(),
                })
            }
            Some(label) => Ok(label.clone()),
            None => dataset
                .minority_class()
                .map(str::to_string)
                .ok_or(SmoteError::EmptyDataset),
        }
    }
}

impl Default for SmoteConfig {
    fn default() -> Self {
        Self::new()
    }
}
