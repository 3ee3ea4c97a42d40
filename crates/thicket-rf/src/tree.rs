use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use thicket_data::{AttributeKind, DataError, Dataset, Sample};
use tracing::{debug, instrument, warn};

use crate::RfError;
use crate::node::{Node, NodeIndex};
use crate::split::find_best_split;

/// Configuration for a single CART decision tree.
///
/// Construct via [`DecisionTreeConfig::new`], then chain `with_*` methods.
///
/// # Defaults
///
/// | Parameter           | Default                 |
/// |---------------------|-------------------------|
/// | `n_random_features` | `None` (all attributes) |
/// | `seed`              | 42                      |
#[derive(Debug, Clone)]
pub struct DecisionTreeConfig {
    pub(crate) n_random_features: Option<usize>,
    pub(crate) seed: u64,
}

impl DecisionTreeConfig {
    /// Create a new config with default values.
    #[must_use]
    pub fn new() -> Self {
        Self {
            n_random_features: None,
            seed: 42,
        }
    }

    /// Limit each node to a random subset of this many attributes.
    ///
    /// `None` considers every attribute. `Some(0)` is replaced by `None`.
    #[must_use]
    pub fn with_n_random_features(mut self, n_random_features: Option<usize>) -> Self {
        if n_random_features == Some(0) {
            warn!("n_random_features = 0 is invalid, considering all attributes");
            self.n_random_features = None;
        } else {
            self.n_random_features = n_random_features;
        }
        self
    }

    /// Set the random seed for reproducibility.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Return the random feature subset size, if set.
    #[must_use]
    pub fn n_random_features(&self) -> Option<usize> {
        self.n_random_features
    }

    /// Return the random seed.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Train a decision tree on every row of `dataset`.
    ///
    /// # Errors
    ///
    /// | Variant | When |
    /// |---|---|
    /// | [`RfError::EmptyDataset`] | `dataset` has no rows |
    /// | [`RfError::ZeroFeatures`] | `dataset` has only the class column |
    /// | [`RfError::NonFiniteValue`] | a numeric value is NaN or infinite |
    #[instrument(skip_all, fields(n_samples = dataset.row_count()))]
    pub fn fit(&self, dataset: &Dataset) -> Result<DecisionTree, RfError> {
        validate_dataset(dataset)?;
        let labels = dataset.class_indices();
        let rows: Vec<usize> = (0..dataset.row_count()).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        self.grow(dataset, &labels, &rows, &mut rng)
    }

    /// Grow a tree on a multiset of dataset rows.
    ///
    /// `labels[i]` is the class index of dataset row `i`; `rows` may repeat
    /// rows, as a bootstrap bag does.
    pub(crate) fn grow(
        &self,
        dataset: &Dataset,
        labels: &[usize],
        rows: &[usize],
        rng: &mut impl Rng,
    ) -> Result<DecisionTree, RfError> {
        let mut builder = TreeBuilder {
            dataset,
            labels,
            n_classes: dataset.class_value_space().len(),
            n_random_features: self.n_random_features,
            arena: Vec::new(),
            rng,
        };
        let mut excluded = vec![false; dataset.column_count()];
        excluded[dataset.class_index()] = true;
        builder.build(rows, &mut excluded, None)?;

        debug!(
            n_rows = rows.len(),
            n_nodes = builder.arena.len(),
            "decision tree built"
        );

        Ok(DecisionTree {
            nodes: builder.arena,
            n_columns: dataset.column_count(),
            n_classes: dataset.class_value_space().len(),
        })
    }
}

impl Default for DecisionTreeConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Check that a dataset can be trained on.
pub(crate) fn validate_dataset(dataset: &Dataset) -> Result<(), RfError> {
    if dataset.is_empty() {
        return Err(RfError::EmptyDataset);
    }
    let features = dataset.feature_indices();
    if features.is_empty() {
        return Err(RfError::ZeroFeatures);
    }
    let numeric: Vec<usize> = features
        .into_iter()
        .filter(|&c| {
            dataset
                .schema()
                .attributes()
                .get(c)
                .is_some_and(|a| a.kind() == AttributeKind::Numeric)
        })
        .collect();
    for (sample_index, row) in dataset.rows().iter().enumerate() {
        for &column in &numeric {
            if !row.numeric(column)?.is_finite() {
                return Err(RfError::NonFiniteValue {
                    sample_index,
                    column,
                });
            }
        }
    }
    Ok(())
}

/// Index of the first class reaching the maximum count.
pub(crate) fn majority(counts: &[usize]) -> usize {
    let mut best = 0;
    for (idx, &c) in counts.iter().enumerate() {
        if c > counts[best] {
            best = idx;
        }
    }
    best
}

struct TreeBuilder<'a, R> {
    dataset: &'a Dataset,
    labels: &'a [usize],
    n_classes: usize,
    n_random_features: Option<usize>,
    arena: Vec<Node>,
    rng: &'a mut R,
}

impl<R: Rng> TreeBuilder<'_, R> {
    fn leaf(&mut self, class: usize, n_samples: usize) -> NodeIndex {
        let idx = self.arena.len();
        self.arena.push(Node::Leaf { class, n_samples });
        NodeIndex::new(idx)
    }

    /// Recursively build the subtree for `rows` and return its arena index.
    ///
    /// `excluded[c]` marks columns already split on by an ancestor.
    fn build(
        &mut self,
        rows: &[usize],
        excluded: &mut [bool],
        parent_majority: Option<usize>,
    ) -> Result<NodeIndex, RfError> {
        let n_samples = rows.len();
        if n_samples == 0 {
            return match parent_majority {
                Some(class) => Ok(self.leaf(class, 0)),
                None => Err(RfError::EmptyDataset),
            };
        }

        let mut class_counts = vec![0usize; self.n_classes];
        for &r in rows {
            class_counts[self.labels[r]] += 1;
        }
        let majority_class = majority(&class_counts);
        if class_counts[majority_class] == n_samples {
            return Ok(self.leaf(majority_class, n_samples));
        }

        let split = find_best_split(
            self.dataset,
            self.labels,
            rows,
            self.n_classes,
            excluded,
            self.n_random_features,
            &mut *self.rng,
        )?;
        let Some(split) = split else {
            return Ok(self.leaf(majority_class, n_samples));
        };

        // Arena pattern: reserve index, recurse, then overwrite with the split.
        let node_idx = self.arena.len();
        self.arena.push(Node::Leaf {
            class: majority_class,
            n_samples,
        });

        let column = split.attribute.index();
        excluded[column] = true;
        let left = self.build(&split.left_rows, excluded, Some(majority_class));
        let right = left.and_then(|l| {
            self.build(&split.right_rows, excluded, Some(majority_class))
                .map(|r| (l, r))
        });
        excluded[column] = false;
        let (left, right) = right?;

        self.arena[node_idx] = Node::Split {
            attribute: split.attribute,
            predicate: split.predicate,
            left,
            right,
            n_samples,
            gain: split.gain,
        };
        Ok(NodeIndex::new(node_idx))
    }
}

/// A fitted CART decision tree.
///
/// Stored as an arena-based `Vec<Node>` rooted at index 0.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct DecisionTree {
    pub(crate) nodes: Vec<Node>,
    pub(crate) n_columns: usize,
    pub(crate) n_classes: usize,
}

impl DecisionTree {
    /// Classify a row, returning a class index into the training value space.
    ///
    /// Walks from the root applying each split predicate until a leaf.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`RfError::PredictionFeatureMismatch`] | row width differs from training |
    /// | [`RfError::Data`] | a tested value has the wrong kind |
    pub fn classify(&self, sample: &Sample) -> Result<usize, RfError> {
        if sample.len() != self.n_columns {
            return Err(RfError::PredictionFeatureMismatch {
                expected: self.n_columns,
                got: sample.len(),
            });
        }
        let mut idx = 0usize;
        loop {
            match &self.nodes[idx] {
                Node::Leaf { class, .. } => return Ok(*class),
                Node::Split {
                    attribute,
                    predicate,
                    left,
                    right,
                    ..
                } => {
                    let value = sample.attribute(attribute.index())?;
                    let goes_left = predicate.goes_left(value).ok_or_else(|| {
                        DataError::TypeMismatch {
                            column: attribute.index(),
                            expected: match value.kind() {
                                AttributeKind::Numeric => AttributeKind::Categorical,
                                AttributeKind::Categorical => AttributeKind::Numeric,
                            },
                        }
                    })?;
                    idx = if goes_left { left.index() } else { right.index() };
                }
            }
        }
    }

    /// Return the root node.
    #[must_use]
    pub fn root(&self) -> &Node {
        &self.nodes[0]
    }

    /// Return every node in arena order.
    #[must_use]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Return the total number of nodes in the tree (both splits and leaves).
    #[must_use]
    pub fn n_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Return the number of leaf nodes.
    #[must_use]
    pub fn n_leaves(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_leaf()).count()
    }

    /// Return the size of the value space the tree predicts into.
    #[must_use]
    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    /// Return the maximum depth of the tree.
    ///
    /// A single-node tree (just a root leaf) has depth 0.
    #[must_use]
    pub fn depth(&self) -> usize {
        let mut max_depth = 0usize;
        let mut queue = std::collections::VecDeque::new();
        queue.push_back((0usize, 0usize));

        while let Some((node_idx, d)) = queue.pop_front() {
            match &self.nodes[node_idx] {
                Node::Leaf { .. } => max_depth = max_depth.max(d),
                Node::Split { left, right, .. } => {
                    queue.push_back((left.index(), d + 1));
                    queue.push_back((right.index(), d + 1));
                }
            }
        }

        max_depth
    }
}
