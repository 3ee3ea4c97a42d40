//! Random Forest training with parallel tree construction.

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::iter::{IndexedParallelIterator, IntoParallelIterator, ParallelIterator};
use thicket_data::{Dataset, Schema, ValueSpace};
use tracing::{debug, info, instrument, warn};

use crate::bag::{BagRecord, bag_size};
use crate::config::{OobMode, RandomForestConfig};
use crate::error::RfError;
use crate::oob::compute_oob;
use crate::result::{RandomForestResult, TrainingMetadata};
use crate::tree::{DecisionTree, DecisionTreeConfig, validate_dataset};

/// A fitted Random Forest ensemble.
///
/// Trees and their bootstrap bags are stored pairwise in growth order.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct RandomForest {
    pub(crate) trees: Vec<DecisionTree>,
    pub(crate) bags: Vec<BagRecord>,
    pub(crate) classes: ValueSpace,
    pub(crate) schema: Schema,
    pub(crate) positive_label: String,
}

/// Per-tree growth parameters shared by the forest and the cascade.
#[derive(Debug, Clone, Copy)]
pub(crate) struct GrowSettings {
    pub(crate) n_random_features: usize,
    pub(crate) bag_size: usize,
    pub(crate) max_retries: usize,
}

impl GrowSettings {
    pub(crate) fn for_dataset(config: &RandomForestConfig, dataset: &Dataset) -> Self {
        Self {
            n_random_features: config
                .resolve_n_random_features(dataset.feature_indices().len()),
            bag_size: bag_size(dataset.row_count(), config.percent_boot),
            max_retries: config.max_retries,
        }
    }
}

/// A grown tree, its bag and the number of attempts it took.
#[derive(Debug)]
pub(crate) struct GrownTree {
    pub(crate) tree: DecisionTree,
    pub(crate) bag: BagRecord,
    pub(crate) attempts: usize,
}

/// Draw a bag and grow one tree on it, redrawing after transient failures.
///
/// Non-transient errors are returned at once. After `max_retries` failed
/// redraws the last error is wrapped in [`RfError::TreeGrowthExhausted`].
pub(crate) fn grow_tree(
    tree: usize,
    dataset: &Dataset,
    labels: &[usize],
    settings: &GrowSettings,
    seed: u64,
) -> Result<GrownTree, RfError> {
    let tree_config =
        DecisionTreeConfig::new().with_n_random_features(Some(settings.n_random_features));
    grow_with(tree, dataset.row_count(), settings, seed, |bag, rng| {
        tree_config.grow(dataset, labels, bag.indices(), rng)
    })
}

/// Retry loop behind [`grow_tree`]; `grow` builds a tree from a drawn bag.
pub(crate) fn grow_with<F>(
    tree: usize,
    n_rows: usize,
    settings: &GrowSettings,
    seed: u64,
    mut grow: F,
) -> Result<GrownTree, RfError>
where
    F: FnMut(&BagRecord, &mut ChaCha8Rng) -> Result<DecisionTree, RfError>,
{
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let max_attempts = settings.max_retries + 1;
    let mut last = None;

    for attempt in 1..=max_attempts {
        let bag = BagRecord::draw(n_rows, settings.bag_size, &mut rng);
        match grow(&bag, &mut rng) {
            Ok(grown) => {
                return Ok(GrownTree {
                    tree: grown,
                    bag,
                    attempts: attempt,
                });
            }
            Err(e) if e.is_transient() => {
                warn!(tree, attempt, error = %e, "tree growth failed, redrawing bag");
                last = Some(e);
            }
            Err(e) => return Err(e),
        }
    }

    Err(RfError::TreeGrowthExhausted {
        tree,
        attempts: max_attempts,
        last: Box::new(last.unwrap_or(RfError::EmptyPartition)),
    })
}

/// Train the Random Forest ensemble.
#[instrument(skip_all, fields(n_trees = config.n_trees, n_samples = dataset.row_count()))]
pub(crate) fn train(
    config: &RandomForestConfig,
    dataset: &Dataset,
) -> Result<RandomForestResult, RfError> {
    validate_dataset(dataset)?;

    let n_samples = dataset.row_count();
    let n_features = dataset.feature_indices().len();
    let n_classes = dataset.class_value_space().len();
    let labels = dataset.class_indices();
    let settings = GrowSettings::for_dataset(config, dataset);

    info!(
        n_trees = config.n_trees,
        n_samples,
        n_features,
        n_classes,
        n_random_features = settings.n_random_features,
        bag_size = settings.bag_size,
        "training random forest"
    );

    // Per-tree seeds from the master RNG keep results independent of thread count.
    let mut master_rng = ChaCha8Rng::seed_from_u64(config.seed);
    let tree_seeds: Vec<u64> = (0..config.n_trees).map(|_| master_rng.r#gen()).collect();

    let grown: Vec<GrownTree> = tree_seeds
        .into_par_iter()
        .enumerate()
        .map(|(tree, seed)| grow_tree(tree, dataset, &labels, &settings, seed))
        .collect::<Result<_, _>>()?;

    let attempts: usize = grown.iter().map(|g| g.attempts).sum();
    let mut trees = Vec::with_capacity(grown.len());
    let mut bags = Vec::with_capacity(grown.len());
    for g in grown {
        trees.push(g.tree);
        bags.push(g.bag);
    }

    debug!(n_trees_trained = trees.len(), "tree training complete");

    let forest = RandomForest {
        trees,
        bags,
        classes: dataset.class_value_space().clone(),
        schema: dataset.schema().clone(),
        positive_label: config.positive_label.clone(),
    };

    let oob = if config.oob_mode == OobMode::Enabled {
        Some(compute_oob(&forest, dataset, &labels)?)
    } else {
        None
    };

    let metadata = TrainingMetadata {
        n_trees: config.n_trees,
        n_features,
        n_classes,
        n_samples,
        n_random_features: settings.n_random_features,
        bag_size: settings.bag_size,
        retries: attempts - config.n_trees,
    };

    info!(
        oob_accuracy = oob.as_ref().map(|s| s.accuracy()),
        retries = metadata.retries,
        "random forest training complete"
    );

    Ok(RandomForestResult::new(forest, oob, metadata))
}

impl RandomForest {
    /// Return the number of trees in the ensemble.
    #[must_use]
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Return the trees in growth order.
    #[must_use]
    pub fn trees(&self) -> &[DecisionTree] {
        &self.trees
    }

    /// Return the bootstrap bag of each tree, aligned with [`Self::trees`].
    #[must_use]
    pub fn bags(&self) -> &[BagRecord] {
        &self.bags
    }

    /// Return the class value space predictions index into.
    #[must_use]
    pub fn classes(&self) -> &ValueSpace {
        &self.classes
    }

    /// Return the schema the forest was trained on.
    #[must_use]
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Return the class label treated as positive.
    #[must_use]
    pub fn positive_label(&self) -> &str {
        &self.positive_label
    }
}
