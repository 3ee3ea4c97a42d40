//! Stratified k-fold cross-validation for Random Forest.

use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;
use thicket_data::Dataset;
use tracing::{info, instrument};

use crate::config::RandomForestConfig;
use crate::confusion::ConfusionMatrix;
use crate::error::RfError;
use crate::stats::Stat;

/// Cross-validation configuration.
///
/// Construct via [`CrossValidation::new`], then chain `with_seed` if desired.
#[derive(Debug, Clone)]
pub struct CrossValidation {
    n_folds: usize,
    seed: u64,
}

/// Results of stratified k-fold cross-validation.
#[derive(Debug)]
pub struct CrossValidationResult {
    /// Accuracy for each fold.
    pub fold_accuracies: Vec<f64>,
    /// Binary statistics for each fold, when the positive class is known.
    pub fold_stats: Vec<Option<Stat>>,
    /// Aggregated confusion matrix (summed across all folds).
    pub confusion_matrix: ConfusionMatrix,
    /// Mean accuracy across folds.
    pub mean_accuracy: f64,
    /// Standard deviation of fold accuracies.
    pub std_accuracy: f64,
    /// Number of folds.
    pub n_folds: usize,
    /// Total number of samples.
    pub n_samples: usize,
}

impl CrossValidation {
    /// Create a new cross-validation config with the given number of folds.
    ///
    /// # Errors
    ///
    /// Returns [`RfError::InvalidFoldCount`] if `n_folds` < 2.
    pub fn new(n_folds: usize) -> Result<Self, RfError> {
        if n_folds < 2 {
            return Err(RfError::InvalidFoldCount { n_folds });
        }
        Ok(Self { n_folds, seed: 42 })
    }

    /// Set the random seed for fold shuffling.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Return the number of folds.
    #[must_use]
    pub fn n_folds(&self) -> usize {
        self.n_folds
    }

    /// Run stratified k-fold cross-validation.
    ///
    /// Each fold trains a forest on the remaining folds and classifies the
    /// held-out fold.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`RfError::EmptyDataset`] | Zero samples |
    /// | [`RfError::TooFewSamplesForFolds`] | A class has fewer samples than folds |
    /// | Other RF errors | From underlying training |
    #[instrument(skip_all, fields(n_folds = self.n_folds, n_samples = dataset.row_count()))]
    pub fn evaluate(
        &self,
        config: &RandomForestConfig,
        dataset: &Dataset,
    ) -> Result<CrossValidationResult, RfError> {
        if dataset.is_empty() {
            return Err(RfError::EmptyDataset);
        }

        let fold_assignments = self.stratified_split(dataset)?;

        let mut fold_accuracies = Vec::with_capacity(self.n_folds);
        let mut fold_stats = Vec::with_capacity(self.n_folds);
        let mut confusion_matrix = ConfusionMatrix::empty(dataset.class_value_space());

        for fold in 0..self.n_folds {
            let mut train = dataset.clone_empty();
            let mut test = dataset.clone_empty();
            for (row, &assigned) in dataset.rows().iter().zip(&fold_assignments) {
                if assigned == fold {
                    test.push(row.clone())?;
                } else {
                    train.push(row.clone())?;
                }
            }

            // Each fold trains with different randomness.
            let fold_config = config.clone().with_seed(config.seed.wrapping_add(fold as u64));
            let forest = fold_config.fit(&train)?.into_forest();
            let prediction = forest.classify_set(&test, None)?;

            let fold_accuracy = prediction.accuracy();
            info!(fold, accuracy = fold_accuracy, "fold completed");

            confusion_matrix.merge(&prediction.matrix)?;
            fold_accuracies.push(fold_accuracy);
            fold_stats.push(prediction.stat);
        }

        let mean_accuracy = fold_accuracies.iter().sum::<f64>() / self.n_folds as f64;
        let std_accuracy = {
            let variance = fold_accuracies
                .iter()
                .map(|&a| (a - mean_accuracy).powi(2))
                .sum::<f64>()
                / self.n_folds as f64;
            variance.sqrt()
        };

        info!(mean_accuracy, std_accuracy, "cross-validation complete");

        Ok(CrossValidationResult {
            fold_accuracies,
            fold_stats,
            confusion_matrix,
            mean_accuracy,
            std_accuracy,
            n_folds: self.n_folds,
            n_samples: dataset.row_count(),
        })
    }

    /// Create stratified fold assignments.
    ///
    /// Groups samples by class, shuffles within each class, then
    /// round-robins across folds so each fold gets approximately
    /// equal representation of each class.
    fn stratified_split(&self, dataset: &Dataset) -> Result<Vec<usize>, RfError> {
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let classes = dataset.class_value_space();

        let mut class_rows: Vec<Vec<usize>> = vec![vec![]; classes.len()];
        for (i, label) in dataset.class_indices().into_iter().enumerate() {
            class_rows[label].push(i);
        }

        for (class, rows) in class_rows.iter().enumerate() {
            if !rows.is_empty() && rows.len() < self.n_folds {
                return Err(RfError::TooFewSamplesForFolds {
                    class: classes.label(class).unwrap_or_default().to_string(),
                    count: rows.len(),
                    n_folds: self.n_folds,
                });
            }
        }

        let mut fold_assignments = vec![0usize; dataset.row_count()];
        for rows in &mut class_rows {
            rows.shuffle(&mut rng);
            for (j, &idx) in rows.iter().enumerate() {
                fold_assignments[idx] = j % self.n_folds;
            }
        }

        Ok(fold_assignments)
    }
}

#[cfg(test)]
mod tests {
    use thicket_data::{Attribute, Sample, Schema, Value};

    use super::*;

    fn make_separable_data() -> Dataset {
        let schema = Schema::new(
            vec![
                Attribute::numeric("x"),
                Attribute::numeric("y"),
                Attribute::categorical("class"),
            ],
            2,
        )
        .unwrap();
        let mut ds = Dataset::new(schema);
        for (offset, label) in [(0.0, "0"), (10.0, "1"), (20.0, "2")] {
            for i in 0..30 {
                let row = vec![
                    Value::Numeric(offset + f64::from(i) * 0.1),
                    Value::Numeric(0.5),
                    Value::from(label),
                ];
                ds.push(Sample::new(row, 2).unwrap()).unwrap();
            }
        }
        ds
    }

    #[test]
    fn five_fold_separable_accuracy() {
        let ds = make_separable_data();
        let rf_config = RandomForestConfig::new()
            .with_n_trees(20)
            .with_n_random_features(Some(2))
            .with_seed(42);
        let cv = CrossValidation::new(5).unwrap().with_seed(42);
        let result = cv.evaluate(&rf_config, &ds).unwrap();

        assert!(
            result.mean_accuracy > 0.8,
            "mean_accuracy = {}",
            result.mean_accuracy
        );
        assert_eq!(result.fold_accuracies.len(), 5);
        assert_eq!(result.n_folds, 5);
        assert_eq!(result.n_samples, 90);
        assert_eq!(result.confusion_matrix.total(), 90);
        assert!(result.fold_stats.iter().all(Option::is_some));
    }

    #[test]
    fn confusion_matrix_dimensions() {
        let ds = make_separable_data();
        let rf_config = RandomForestConfig::new().with_n_trees(5).with_seed(42);
        let result = CrossValidation::new(3).unwrap().evaluate(&rf_config, &ds).unwrap();
        assert_eq!(result.fold_accuracies.len(), 3);
        assert_eq!(result.confusion_matrix.n_classes(), 3);
    }

    #[test]
    fn invalid_fold_count() {
        assert!(CrossValidation::new(0).is_err());
        assert!(CrossValidation::new(1).is_err());
    }

    #[test]
    fn too_few_samples_for_folds() {
        let schema = Schema::new(
            vec![Attribute::numeric("x"), Attribute::categorical("class")],
            1,
        )
        .unwrap();
        let rows = [(1.0, "a"), (2.0, "a"), (10.0, "b"), (11.0, "b"), (12.0, "b")]
            .into_iter()
            .map(|(x, y)| Sample::new(vec![Value::Numeric(x), Value::from(y)], 1).unwrap())
            .collect();
        let ds = Dataset::from_rows(schema, rows).unwrap();
        let err = CrossValidation::new(5)
            .unwrap()
            .evaluate(&RandomForestConfig::new(), &ds)
            .unwrap_err();
        assert!(matches!(
            err,
            RfError::TooFewSamplesForFolds { class, count: 2, n_folds: 5 } if class == "a"
        ));
    }
}
