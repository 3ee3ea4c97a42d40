//! Configuration builder for Random Forest training.

use thicket_data::Dataset;
use tracing::warn;

use crate::error::RfError;
use crate::result::RandomForestResult;

/// Whether to compute out-of-bag evaluation during training.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OobMode {
    /// Record per-tree OOB reports and the forest OOB estimate.
    Enabled,
    /// Skip OOB evaluation.
    Disabled,
}

pub(crate) const DEFAULT_N_TREES: usize = 100;
pub(crate) const DEFAULT_PERCENT_BOOT: f64 = 100.0;
/// Largest accepted bootstrap percentage.
pub const MAX_PERCENT_BOOT: f64 = 1000.0;
pub(crate) const DEFAULT_MAX_RETRIES: usize = 10;

/// Configuration for Random Forest training.
///
/// Construct via [`RandomForestConfig::new`], then chain `with_*` methods.
/// Invalid values are replaced by their defaults with a warning.
///
/// # Defaults
///
/// | Parameter           | Default                       |
/// |---------------------|-------------------------------|
/// | `n_trees`           | 100                           |
/// | `percent_boot`      | 100.0                         |
/// | `n_random_features` | `None` (round(sqrt(features))) |
/// | `max_retries`       | 10                            |
/// | `seed`              | 42                            |
/// | `oob_mode`          | `Disabled`                    |
/// | `positive_label`    | `"1"`                         |
#[derive(Debug, Clone)]
pub struct RandomForestConfig {
    pub(crate) n_trees: usize,
    pub(crate) percent_boot: f64,
    pub(crate) n_random_features: Option<usize>,
    pub(crate) max_retries: usize,
    pub(crate) seed: u64,
    pub(crate) oob_mode: OobMode,
    pub(crate) positive_label: String,
}

impl RandomForestConfig {
    /// Create a new config with default values.
    #[must_use]
    pub fn new() -> Self {
        Self {
            n_trees: DEFAULT_N_TREES,
            percent_boot: DEFAULT_PERCENT_BOOT,
            n_random_features: None,
            max_retries: DEFAULT_MAX_RETRIES,
            seed: 42,
            oob_mode: OobMode::Disabled,
            positive_label: "1".to_string(),
        }
    }

    // --- Setters ---

    /// Set the number of trees. Zero is replaced by the default.
    #[must_use]
    pub fn with_n_trees(mut self, n_trees: usize) -> Self {
        if n_trees == 0 {
            warn!(default = DEFAULT_N_TREES, "n_trees = 0 is invalid, using default");
            self.n_trees = DEFAULT_N_TREES;
        } else {
            self.n_trees = n_trees;
        }
        self
    }

    /// Set the bootstrap size as a percentage of the training rows.
    ///
    /// Values outside `(0, MAX_PERCENT_BOOT]` are replaced by the default.
    #[must_use]
    pub fn with_percent_boot(mut self, percent_boot: f64) -> Self {
        if percent_boot > 0.0 && percent_boot <= MAX_PERCENT_BOOT {
            self.percent_boot = percent_boot;
        } else {
            warn!(
                percent_boot,
                default = DEFAULT_PERCENT_BOOT,
                "invalid percent_boot, using default"
            );
            self.percent_boot = DEFAULT_PERCENT_BOOT;
        }
        self
    }

    /// Set how many attributes each split considers.
    ///
    /// `None` or `Some(0)` selects `round(sqrt(n_features))`. Values larger
    /// than the feature count are clamped at training time.
    #[must_use]
    pub fn with_n_random_features(mut self, n_random_features: Option<usize>) -> Self {
        if n_random_features == Some(0) {
            warn!("n_random_features = 0 is invalid, using round(sqrt(n_features))");
            self.n_random_features = None;
        } else {
            self.n_random_features = n_random_features;
        }
        self
    }

    /// Set how many times a failed tree is regrown from a fresh bag.
    #[must_use]
    pub fn with_max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set the random seed for reproducibility.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set the OOB evaluation mode.
    #[must_use]
    pub fn with_oob_mode(mut self, oob_mode: OobMode) -> Self {
        self.oob_mode = oob_mode;
        self
    }

    /// Set the class label treated as positive in binary statistics.
    #[must_use]
    pub fn with_positive_label(mut self, positive_label: impl Into<String>) -> Self {
        self.positive_label = positive_label.into();
        self
    }

    // --- Getters ---

    /// Return the number of trees.
    #[must_use]
    pub fn n_trees(&self) -> usize {
        self.n_trees
    }

    /// Return the bootstrap percentage.
    #[must_use]
    pub fn percent_boot(&self) -> f64 {
        self.percent_boot
    }

    /// Return the configured random feature count, if set.
    #[must_use]
    pub fn n_random_features(&self) -> Option<usize> {
        self.n_random_features
    }

    /// Return the retry cap per tree.
    #[must_use]
    pub fn max_retries(&self) -> usize {
        self.max_retries
    }

    /// Return the random seed.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Return the OOB evaluation mode.
    #[must_use]
    pub fn oob_mode(&self) -> OobMode {
        self.oob_mode
    }

    /// Return the positive class label.
    #[must_use]
    pub fn positive_label(&self) -> &str {
        &self.positive_label
    }

    /// Resolve the per-split attribute count for `n_features` attributes.
    #[must_use]
    pub fn resolve_n_random_features(&self, n_features: usize) -> usize {
        let resolved = self
            .n_random_features
            .unwrap_or_else(|| (n_features as f64).sqrt().round() as usize);
        resolved.clamp(1, n_features.max(1))
    }

    /// Train a Random Forest on `dataset`.
    ///
    /// # Errors
    ///
    /// | Variant                           | When                                    |
    /// |-----------------------------------|-----------------------------------------|
    /// | [`RfError::EmptyDataset`]         | `dataset` has no rows                   |
    /// | [`RfError::ZeroFeatures`]         | `dataset` has only the class column     |
    /// | [`RfError::NonFiniteValue`]       | a numeric value is NaN or infinite      |
    /// | [`RfError::TreeGrowthExhausted`]  | a tree failed on every retry            |
    pub fn fit(&self, dataset: &Dataset) -> Result<RandomForestResult, RfError> {
        crate::forest::train(self, dataset)
    }
}

impl Default for RandomForestConfig {
    fn default() -> Self {
        Self::new()
    }
}
