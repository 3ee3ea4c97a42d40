//! Cascaded Random Forest: sequential weighted stages with true-negative
//! archiving and false-positive reinjection.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
use thicket_data::{Dataset, Sample, Schema, ValueSpace};
use tracing::{debug, info, instrument, warn};

use crate::arena::{SampleArena, SampleId};
use crate::config::RandomForestConfig;
use crate::confusion::ConfusionMatrix;
use crate::error::RfError;
use crate::forest::{GrowSettings, RandomForest, grow_tree};
use crate::predict::{SetPrediction, VoteTally, encode_actuals, frequencies};
use crate::stats::Stat;
use crate::tree::validate_dataset;

const DEFAULT_N_STAGES: usize = 3;
const DEFAULT_RATE: f64 = 0.9;

/// Configuration for a cascaded forest.
///
/// Per-stage forests use the wrapped [`RandomForestConfig`]; its `n_trees`
/// caps the trees grown per stage.
///
/// # Defaults
///
/// | Parameter  | Default                       |
/// |------------|-------------------------------|
/// | `forest`   | `RandomForestConfig::new()`   |
/// | `n_stages` | 3                             |
/// | `tp_rate`  | 0.9                           |
/// | `tn_rate`  | 0.9                           |
#[derive(Debug, Clone)]
pub struct CascadeConfig {
    pub(crate) forest: RandomForestConfig,
    pub(crate) n_stages: usize,
    pub(crate) tp_rate: f64,
    pub(crate) tn_rate: f64,
}

fn sanitize_rate(name: &str, rate: f64) -> f64 {
    if (0.0..=1.0).contains(&rate) {
        rate
    } else {
        warn!(name, rate, default = DEFAULT_RATE, "rate outside [0, 1], using default");
        DEFAULT_RATE
    }
}

impl CascadeConfig {
    /// Create a new config with default values.
    #[must_use]
    pub fn new() -> Self {
        Self {
            forest: RandomForestConfig::new(),
            n_stages: DEFAULT_N_STAGES,
            tp_rate: DEFAULT_RATE,
            tn_rate: DEFAULT_RATE,
        }
    }

    /// Set the per-stage forest configuration.
    #[must_use]
    pub fn with_forest(mut self, forest: RandomForestConfig) -> Self {
        self.forest = forest;
        self
    }

    /// Set the number of stages. Zero is replaced by the default.
    #[must_use]
    pub fn with_n_stages(mut self, n_stages: usize) -> Self {
        if n_stages == 0 {
            warn!(default = DEFAULT_N_STAGES, "n_stages = 0 is invalid, using default");
            self.n_stages = DEFAULT_N_STAGES;
        } else {
            self.n_stages = n_stages;
        }
        self
    }

    /// Set the true-positive rate a stage must exceed to stop growing.
    #[must_use]
    pub fn with_tp_rate(mut self, tp_rate: f64) -> Self {
        self.tp_rate = sanitize_rate("tp_rate", tp_rate);
        self
    }

    /// Set the true-negative rate a stage must exceed to stop growing.
    #[must_use]
    pub fn with_tn_rate(mut self, tn_rate: f64) -> Self {
        self.tn_rate = sanitize_rate("tn_rate", tn_rate);
        self
    }

    /// Return the per-stage forest configuration.
    #[must_use]
    pub fn forest(&self) -> &RandomForestConfig {
        &self.forest
    }

    /// Return the number of stages.
    #[must_use]
    pub fn n_stages(&self) -> usize {
        self.n_stages
    }

    /// Return the true-positive rate threshold.
    #[must_use]
    pub fn tp_rate(&self) -> f64 {
        self.tp_rate
    }

    /// Return the true-negative rate threshold.
    #[must_use]
    pub fn tn_rate(&self) -> f64 {
        self.tn_rate
    }

    /// Train a cascaded forest on `dataset`.
    ///
    /// # Errors
    ///
    /// | Variant | When |
    /// |---|---|
    /// | [`RfError::EmptyDataset`] | `dataset` has no rows |
    /// | [`RfError::ZeroFeatures`] | `dataset` has only the class column |
    /// | [`RfError::NonFiniteValue`] | a numeric value is NaN or infinite |
    /// | [`RfError::MissingPositiveClass`] | the positive label never occurs |
    /// | [`RfError::TreeGrowthExhausted`] | a tree failed on every retry |
    pub fn fit(&self, dataset: &Dataset) -> Result<CascadeResult, RfError> {
        train_cascade(self, dataset)
    }
}

impl Default for CascadeConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// One trained forest and its reliability weight.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CascadeStage {
    pub(crate) forest: RandomForest,
    pub(crate) weight: f64,
}

impl CascadeStage {
    /// Return the stage forest.
    #[must_use]
    pub fn forest(&self) -> &RandomForest {
        &self.forest
    }

    /// Return `exp(F-measure)` of the stage on its working set.
    #[must_use]
    pub fn weight(&self) -> f64 {
        self.weight
    }
}

/// A sequence of weighted forest stages voting together.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CascadedForest {
    pub(crate) stages: Vec<CascadeStage>,
    pub(crate) classes: ValueSpace,
    pub(crate) schema: Schema,
    pub(crate) n_trees: usize,
    pub(crate) positive_label: String,
}

/// What happened in one stage.
#[derive(Debug, Clone, serde::Serialize)]
pub struct StageReport {
    /// Zero-based stage number.
    pub stage: usize,
    /// Trees grown before the stopping rule fired or the cap was reached.
    pub trees_grown: usize,
    /// Trees regrown after a transient failure.
    pub retries: usize,
    /// Stage weight, `exp(F-measure)`.
    pub weight: f64,
    /// Statistics of the stage on its working set.
    pub stat: Stat,
    /// Working-set size when the stage started.
    pub working_before: usize,
    /// True negatives moved to the reservoir.
    pub true_negatives_archived: usize,
    /// True negatives dropped from the working set.
    pub true_negatives_deleted: usize,
    /// Reservoir rows moved back after the cascade called them positive.
    pub false_positives_reinjected: usize,
    /// Working-set ids after the stage.
    pub working_after: Vec<SampleId>,
    /// Reservoir ids after the stage.
    pub reservoir_after: Vec<SampleId>,
}

/// Result of cascaded forest training.
#[derive(Debug)]
pub struct CascadeResult {
    forest: CascadedForest,
    reports: Vec<StageReport>,
}

impl CascadeResult {
    /// Borrow the fitted cascade.
    #[must_use]
    pub fn forest(&self) -> &CascadedForest {
        &self.forest
    }

    /// Consume the result and return the fitted cascade.
    #[must_use]
    pub fn into_forest(self) -> CascadedForest {
        self.forest
    }

    /// Return one report per trained stage.
    #[must_use]
    pub fn reports(&self) -> &[StageReport] {
        &self.reports
    }
}

/// Index of the first maximum.
fn argmax(scores: &[f64]) -> usize {
    let mut best = 0;
    for (idx, &s) in scores.iter().enumerate() {
        if s > scores[best] {
            best = idx;
        }
    }
    best
}

struct StageOutcome {
    stage: CascadeStage,
    prediction: SetPrediction,
    trees_grown: usize,
    retries: usize,
}

/// Grow one stage tree by tree until both rates exceed their thresholds or
/// the tree cap is reached.
///
/// After each tree the stage so far votes on `dataset` with own-bag
/// exclusion.
fn grow_stage(
    stage: usize,
    config: &CascadeConfig,
    dataset: &Dataset,
    ids: &[SampleId],
    positive: usize,
    rng: &mut ChaCha8Rng,
) -> Result<StageOutcome, RfError> {
    let labels = dataset.class_indices();
    let classes = dataset.class_value_space();
    let settings = GrowSettings::for_dataset(&config.forest, dataset);
    let mut tally = VoteTally::new(dataset.row_count(), classes.len());
    let mut trees = Vec::new();
    let mut bags = Vec::new();
    let mut retries = 0;
    let mut predictions = Vec::new();
    let mut stat = Stat::from_counts(Default::default());

    for t in 0..config.forest.n_trees {
        let grown = grow_tree(t, dataset, &labels, &settings, rng.r#gen())?;
        retries += grown.attempts - 1;
        let votes: Vec<usize> = dataset
            .rows()
            .par_iter()
            .map(|row| grown.tree.classify(row))
            .collect::<Result<_, _>>()?;
        for (row, &class) in votes.iter().enumerate() {
            tally.record(row, class, grown.bag.contains(row));
        }
        trees.push(grown.tree);
        bags.push(grown.bag);

        predictions = tally.predictions();
        let matrix = ConfusionMatrix::compute(classes, &labels, &predictions)?;
        stat = Stat::from_counts(matrix.binary_counts(positive));
        debug!(
            stage,
            tree = t,
            tp_rate = stat.tp_rate,
            tn_rate = stat.tn_rate,
            "stage tree evaluated"
        );
        if stat.tp_rate > config.tp_rate && stat.tn_rate > config.tn_rate {
            break;
        }
    }

    let weight = stat.f_measure.exp();
    let trees_grown = trees.len();
    let forest = RandomForest {
        trees,
        bags,
        classes: classes.clone(),
        schema: dataset.schema().clone(),
        positive_label: config.forest.positive_label.clone(),
    };
    let prediction = SetPrediction::summarize(
        classes,
        &config.forest.positive_label,
        ids.iter().map(|id| id.index()).collect(),
        predictions,
        tally.probabilities(),
        labels,
    )?;

    Ok(StageOutcome {
        stage: CascadeStage { forest, weight },
        prediction,
        trees_grown,
        retries,
    })
}

#[instrument(skip_all, fields(n_stages = config.n_stages, n_samples = dataset.row_count()))]
fn train_cascade(config: &CascadeConfig, dataset: &Dataset) -> Result<CascadeResult, RfError> {
    validate_dataset(dataset)?;
    let positive_label = &config.forest.positive_label;
    let positive = dataset
        .class_value_space()
        .index_of(positive_label)
        .ok_or_else(|| RfError::MissingPositiveClass {
            label: positive_label.clone(),
        })?;

    info!(
        n_stages = config.n_stages,
        n_trees = config.forest.n_trees,
        tp_rate = config.tp_rate,
        tn_rate = config.tn_rate,
        "training cascaded forest"
    );

    let mut rng = ChaCha8Rng::seed_from_u64(config.forest.seed);
    let mut working = SampleArena::from_rows(dataset.rows());
    let mut reservoir = SampleArena::vacant(dataset.row_count());
    let mut cascade = CascadedForest {
        stages: Vec::with_capacity(config.n_stages),
        classes: dataset.class_value_space().clone(),
        schema: dataset.schema().clone(),
        n_trees: config.forest.n_trees,
        positive_label: positive_label.clone(),
    };
    let mut reports = Vec::with_capacity(config.n_stages);

    for stage in 0..config.n_stages {
        if working.is_empty() {
            warn!(stage, "working set is empty, stopping cascade early");
            break;
        }
        let (ids, stage_data) = working.snapshot(dataset)?;
        let outcome = grow_stage(stage, config, &stage_data, &ids, positive, &mut rng)?;

        let true_negatives: Vec<SampleId> = outcome
            .prediction
            .groups
            .as_ref()
            .map(|g| g.true_negatives.iter().map(|&i| SampleId::new(i)).collect())
            .unwrap_or_default();
        let (mut archived, mut deleted) = (0, 0);
        for &id in &true_negatives {
            if stage == 0 {
                if working.transfer(id, &mut reservoir) {
                    archived += 1;
                }
            } else if working.remove(id).is_some() {
                deleted += 1;
            }
        }

        let weight = outcome.stage.weight;
        cascade.stages.push(outcome.stage);

        let mut reinjected = 0;
        if !reservoir.is_empty() {
            let (reservoir_ids, reservoir_data) = reservoir.snapshot(dataset)?;
            let predicted = cascade.classify_by_weight(&reservoir_data)?;
            for (&id, &class) in reservoir_ids.iter().zip(&predicted) {
                if class == positive && reservoir.transfer(id, &mut working) {
                    reinjected += 1;
                }
            }
        }

        info!(
            stage,
            trees = outcome.trees_grown,
            weight,
            archived,
            deleted,
            reinjected,
            working = working.len(),
            reservoir = reservoir.len(),
            "cascade stage complete"
        );

        reports.push(StageReport {
            stage,
            trees_grown: outcome.trees_grown,
            retries: outcome.retries,
            weight,
            stat: outcome.prediction.stat.unwrap_or(Stat::from_counts(Default::default())),
            working_before: ids.len(),
            true_negatives_archived: archived,
            true_negatives_deleted: deleted,
            false_positives_reinjected: reinjected,
            working_after: working.ids(),
            reservoir_after: reservoir.ids(),
        });
    }

    Ok(CascadeResult {
        forest: cascade,
        reports,
    })
}

impl CascadedForest {
    /// Weighted class scores for one row.
    ///
    /// Each stage's vote frequencies are scaled by its weight, summed over
    /// stages and divided by `(sum of weights) * n_trees`.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`RfError::PredictionFeatureMismatch`] | row width differs from training |
    /// | [`RfError::Data`] | a tested value has the wrong kind |
    pub fn weighted_scores(&self, sample: &Sample) -> Result<Vec<f64>, RfError> {
        let mut scores = vec![0.0; self.classes.len()];
        for stage in &self.stages {
            let freq = frequencies(&stage.forest.votes(sample, None)?);
            for (score, f) in scores.iter_mut().zip(freq) {
                *score += stage.weight * f;
            }
        }
        let norm = self.stages.iter().map(|s| s.weight).sum::<f64>() * self.n_trees as f64;
        if norm > 0.0 {
            scores.iter_mut().for_each(|s| *s /= norm);
        }
        Ok(scores)
    }

    /// Predict the class index of one row; the first maximum score wins.
    ///
    /// # Errors
    ///
    /// See [`Self::weighted_scores`].
    pub fn classify(&self, sample: &Sample) -> Result<usize, RfError> {
        Ok(argmax(&self.weighted_scores(sample)?))
    }

    /// Predict the class index of every row in parallel.
    ///
    /// # Errors
    ///
    /// See [`Self::weighted_scores`].
    pub fn classify_by_weight(&self, dataset: &Dataset) -> Result<Vec<usize>, RfError> {
        dataset
            .rows()
            .par_iter()
            .map(|row| self.classify(row))
            .collect()
    }

    /// Classify a labelled row set and evaluate the result.
    ///
    /// Probabilities are the weighted scores rescaled to sum to 1.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`RfError::UnknownClassLabel`] | a row's label is not in the value space |
    /// | [`RfError::PredictionFeatureMismatch`] | row width differs from training |
    pub fn classify_set(&self, dataset: &Dataset) -> Result<SetPrediction, RfError> {
        let actuals = encode_actuals(&self.classes, dataset)?;
        let scores: Vec<Vec<f64>> = dataset
            .rows()
            .par_iter()
            .map(|row| self.weighted_scores(row))
            .collect::<Result<_, _>>()?;
        let predictions = scores.iter().map(|s| argmax(s)).collect();
        let probabilities = scores
            .into_iter()
            .map(|s| {
                let total: f64 = s.iter().sum();
                if total > 0.0 {
                    s.iter().map(|v| v / total).collect()
                } else {
                    s
                }
            })
            .collect();
        SetPrediction::summarize(
            &self.classes,
            &self.positive_label,
            (0..dataset.row_count()).collect(),
            predictions,
            probabilities,
            actuals,
        )
    }

    /// Return the stages in training order.
    #[must_use]
    pub fn stages(&self) -> &[CascadeStage] {
        &self.stages
    }

    /// Return the class value space predictions index into.
    #[must_use]
    pub fn classes(&self) -> &ValueSpace {
        &self.classes
    }

    /// Return the schema the cascade was trained on.
    #[must_use]
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Return the per-stage tree cap used for score normalisation.
    #[must_use]
    pub fn n_trees(&self) -> usize {
        self.n_trees
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use thicket_data::{Attribute, Value};

    use super::*;

    /// Imbalanced, overlapping binary data: 20 positives, 60 negatives.
    fn imbalanced() -> Dataset {
        let schema = Schema::new(
            vec![
                Attribute::numeric("a"),
                Attribute::numeric("b"),
                Attribute::categorical("class"),
            ],
            2,
        )
        .unwrap();
        let mut ds = Dataset::new(schema);
        for i in 0..80u32 {
            let label = if i % 4 == 0 { "1" } else { "0" };
            let a = f64::from(i % 17) + if label == "1" { 6.0 } else { 0.0 };
            let b = f64::from((i * 7) % 13);
            ds.push(
                Sample::new(
                    vec![Value::Numeric(a), Value::Numeric(b), Value::from(label)],
                    2,
                )
                .unwrap(),
            )
            .unwrap();
        }
        ds
    }

    fn config() -> CascadeConfig {
        CascadeConfig::new()
            .with_forest(RandomForestConfig::new().with_n_trees(8).with_seed(3))
            .with_n_stages(3)
    }

    #[test]
    fn working_set_and_reservoir_stay_disjoint() {
        let ds = imbalanced();
        let result = config().fit(&ds).unwrap();
        assert!(!result.reports().is_empty());
        for report in result.reports() {
            let working: BTreeSet<_> = report.working_after.iter().collect();
            let reservoir: BTreeSet<_> = report.reservoir_after.iter().collect();
            assert!(working.is_disjoint(&reservoir), "stage {}", report.stage);
            assert!(working.len() + reservoir.len() <= ds.row_count());
        }
    }

    #[test]
    fn stage_bookkeeping_adds_up() {
        let ds = imbalanced();
        let result = config().fit(&ds).unwrap();
        let first = &result.reports()[0];
        assert_eq!(first.working_before, ds.row_count());
        assert_eq!(first.true_negatives_deleted, 0);
        assert_eq!(
            first.reservoir_after.len() + first.false_positives_reinjected,
            first.true_negatives_archived
        );
        for report in result.reports() {
            assert_eq!(
                report.working_before - report.true_negatives_archived
                    - report.true_negatives_deleted
                    + report.false_positives_reinjected,
                report.working_after.len()
            );
            assert!(report.trees_grown >= 1 && report.trees_grown <= 8);
            assert!(report.weight >= 1.0 && report.weight <= std::f64::consts::E + 1e-12);
            if report.stage > 0 {
                assert_eq!(report.true_negatives_archived, 0);
            }
        }
        assert_eq!(result.forest().stages().len(), result.reports().len());
    }

    #[test]
    fn reservoir_holds_only_negatives() {
        let ds = imbalanced();
        let result = config().fit(&ds).unwrap();
        for report in result.reports() {
            for id in &report.reservoir_after {
                assert_eq!(ds.rows()[id.index()].class_label(), "0");
            }
        }
    }

    #[test]
    fn weighted_classification_learns_signal() {
        let ds = imbalanced();
        let cascade = config().fit(&ds).unwrap().into_forest();
        let prediction = cascade.classify_set(&ds).unwrap();
        assert!(prediction.accuracy() > 0.6, "accuracy = {}", prediction.accuracy());
        assert!(prediction.stat.is_some());
        for row in ds.rows().iter().take(5) {
            let scores = cascade.weighted_scores(row).unwrap();
            assert!(scores.iter().all(|s| (0.0..=1.0).contains(s)));
        }
    }

    #[test]
    fn easy_stage_stops_early() {
        let schema = Schema::new(
            vec![Attribute::numeric("x"), Attribute::categorical("class")],
            1,
        )
        .unwrap();
        let mut ds = Dataset::new(schema);
        for i in 0..40 {
            let (x, label) = if i < 20 {
                (f64::from(i), "0")
            } else {
                (f64::from(i) + 50.0, "1")
            };
            ds.push(Sample::new(vec![Value::Numeric(x), Value::from(label)], 1).unwrap())
                .unwrap();
        }
        let result = CascadeConfig::new()
            .with_forest(RandomForestConfig::new().with_n_trees(20))
            .with_n_stages(1)
            .with_tp_rate(0.5)
            .with_tn_rate(0.5)
            .fit(&ds)
            .unwrap();
        let report = &result.reports()[0];
        assert!(report.trees_grown < 20, "grew {}", report.trees_grown);
        assert!((report.weight - std::f64::consts::E).abs() < 1e-12);
        // Every negative was a true negative and went to the reservoir.
        assert_eq!(report.true_negatives_archived, 20);
    }

    #[test]
    fn missing_positive_class_error() {
        let ds = imbalanced();
        let err = config()
            .with_forest(RandomForestConfig::new().with_positive_label("yes"))
            .fit(&ds)
            .unwrap_err();
        assert!(matches!(err, RfError::MissingPositiveClass { label } if label == "yes"));
    }

    #[test]
    fn empty_dataset_error() {
        let ds = imbalanced().clone_empty();
        assert!(matches!(config().fit(&ds), Err(RfError::EmptyDataset)));
    }

    #[test]
    fn invalid_rates_fall_back() {
        let config = CascadeConfig::new()
            .with_tp_rate(1.5)
            .with_tn_rate(f64::NAN)
            .with_n_stages(0);
        assert_eq!(config.tp_rate(), 0.9);
        assert_eq!(config.tn_rate(), 0.9);
        assert_eq!(config.n_stages(), 3);
    }

    #[test]
    fn argmax_first_maximum_wins() {
        assert_eq!(argmax(&[0.2, 0.5, 0.5]), 1);
        assert_eq!(argmax(&[]), 0);
    }
}
