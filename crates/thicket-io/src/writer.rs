//! Delimited record writers and JSON run summaries.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use thicket_data::{Sample, Schema};
use thicket_rf::{
    ClassMetrics, ConfusionMatrix, CrossValidationResult, OobSummary, SetPrediction, Stat,
    StageReport, TrainingMetadata,
};
use tracing::{debug, info, instrument};

use crate::IoError;
use crate::domain::ExperimentName;

const STAT_HEADER: [&str; 11] = [
    "tp",
    "fp",
    "tn",
    "fn",
    "tp_rate",
    "fp_rate",
    "tn_rate",
    "precision",
    "f_measure",
    "accuracy",
    "auc",
];

fn stat_fields(stat: Option<&Stat>) -> Vec<String> {
    match stat {
        Some(s) => vec![
            s.counts.true_positives.to_string(),
            s.counts.false_positives.to_string(),
            s.counts.true_negatives.to_string(),
            s.counts.false_negatives.to_string(),
            s.tp_rate.to_string(),
            s.fp_rate.to_string(),
            s.tn_rate.to_string(),
            s.precision.to_string(),
            s.f_measure.to_string(),
            s.accuracy.to_string(),
            s.auc.map_or_else(String::new, |a| a.to_string()),
        ],
        None => vec![String::new(); STAT_HEADER.len()],
    }
}

/// Writes one record per line with a caller-chosen delimiter.
///
/// Each `write_*` method emits its own header line followed by its records,
/// so several tables can share one sink.
pub struct DelimitedWriter<W: Write> {
    inner: csv::Writer<W>,
}

impl<W: Write> DelimitedWriter<W> {
    /// Wrap `writer`, separating fields with `delimiter`.
    pub fn new(writer: W, delimiter: u8) -> Self {
        let inner = csv::WriterBuilder::new()
            .delimiter(delimiter)
            .flexible(true)
            .has_headers(false)
            .from_writer(writer);
        Self { inner }
    }

    fn record<I, S>(&mut self, fields: I) -> Result<(), IoError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<[u8]>,
    {
        self.inner.write_record(fields)?;
        Ok(())
    }

    /// Write labelled statistics records, one per `(label, stat)` pair.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::WriteRecord`] if the sink fails.
    pub fn write_stats<'a, I>(&mut self, stats: I) -> Result<(), IoError>
    where
        I: IntoIterator<Item = (&'a str, Option<&'a Stat>)>,
    {
        self.record(std::iter::once("label").chain(STAT_HEADER))?;
        for (label, stat) in stats {
            self.record(std::iter::once(label.to_string()).chain(stat_fields(stat)))?;
        }
        Ok(())
    }

    /// Write one record per tree of an out-of-bag summary.
    ///
    /// `running_*` columns are the statistics of all trees up to this one.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::WriteRecord`] if the sink fails.
    pub fn write_oob(&mut self, summary: &OobSummary) -> Result<(), IoError> {
        let mut header = vec!["tree".to_string(), "n_oob".to_string(), "accuracy".to_string()];
        header.extend(STAT_HEADER.iter().map(|h| (*h).to_string()));
        header.extend(STAT_HEADER.iter().map(|h| format!("running_{h}")));
        self.record(&header)?;
        for report in &summary.reports {
            let mut fields = vec![
                report.tree.to_string(),
                report.n_oob.to_string(),
                report.matrix.accuracy().to_string(),
            ];
            fields.extend(stat_fields(report.stat.as_ref()));
            fields.extend(stat_fields(report.running_stat.as_ref()));
            self.record(&fields)?;
        }
        Ok(())
    }

    /// Write one record per cascade stage.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::WriteRecord`] if the sink fails.
    pub fn write_stages(&mut self, reports: &[StageReport]) -> Result<(), IoError> {
        let mut header: Vec<String> = [
            "stage",
            "trees_grown",
            "retries",
            "weight",
            "working_before",
            "true_negatives_archived",
            "true_negatives_deleted",
            "false_positives_reinjected",
            "working_after",
            "reservoir_after",
        ]
        .iter()
        .map(|h| (*h).to_string())
        .collect();
        header.extend(STAT_HEADER.iter().map(|h| (*h).to_string()));
        self.record(&header)?;
        for r in reports {
            let mut fields = vec![
                r.stage.to_string(),
                r.trees_grown.to_string(),
                r.retries.to_string(),
                r.weight.to_string(),
                r.working_before.to_string(),
                r.true_negatives_archived.to_string(),
                r.true_negatives_deleted.to_string(),
                r.false_positives_reinjected.to_string(),
                r.working_after.len().to_string(),
                r.reservoir_after.len().to_string(),
            ];
            fields.extend(stat_fields(Some(&r.stat)));
            self.record(&fields)?;
        }
        Ok(())
    }

    /// Write rows under a header of attribute names.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::WriteRecord`] if the sink fails.
    pub fn write_samples(&mut self, schema: &Schema, samples: &[Sample]) -> Result<(), IoError> {
        self.record(schema.attributes().iter().map(|a| a.name()))?;
        for sample in samples {
            self.record(sample.values().iter().map(ToString::to_string))?;
        }
        Ok(())
    }

    /// Write one record per predicted row: id, actual, predicted and the
    /// vote frequency of each class.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::WriteRecord`] if the sink fails.
    pub fn write_predictions(&mut self, prediction: &SetPrediction) -> Result<(), IoError> {
        let classes = prediction.matrix.classes();
        let label = |idx: usize| classes.label(idx).unwrap_or_default().to_string();
        let mut header = vec!["row".to_string(), "actual".to_string(), "predicted".to_string()];
        header.extend(classes.labels().iter().map(|c| format!("p_{c}")));
        self.record(&header)?;
        for (i, &row) in prediction.sample_ids.iter().enumerate() {
            let mut fields = vec![
                row.to_string(),
                label(prediction.actuals[i]),
                label(prediction.predictions[i]),
            ];
            fields.extend(prediction.probabilities[i].iter().map(ToString::to_string));
            self.record(&fields)?;
        }
        Ok(())
    }

    /// Flush buffered records to the sink.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::WriteRecord`] if the sink fails.
    pub fn flush(&mut self) -> Result<(), IoError> {
        self.inner.flush().map_err(csv::Error::from)?;
        Ok(())
    }
}

/// Writes run artifacts into an output directory.
///
/// Creates the output directory on construction if it does not exist.
/// Every file is prefixed with the experiment name.
pub struct ResultWriter {
    output_dir: PathBuf,
    experiment: ExperimentName,
    delimiter: u8,
}

impl ResultWriter {
    /// Create a new writer targeting the given directory and experiment name.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::OutputDirCreate`] if the directory cannot be created.
    #[instrument(skip_all, fields(dir = %output_dir.display(), experiment = %experiment))]
    pub fn new(output_dir: &Path, experiment: ExperimentName) -> Result<Self, IoError> {
        fs::create_dir_all(output_dir).map_err(|e| IoError::OutputDirCreate {
            path: output_dir.to_path_buf(),
            source: e,
        })?;
        debug!("output directory ready");
        Ok(Self {
            output_dir: output_dir.to_path_buf(),
            experiment,
            delimiter: b',',
        })
    }

    /// Set the delimiter of record files.
    #[must_use]
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Return `{output_dir}/{experiment}_{suffix}`.
    #[must_use]
    pub fn path(&self, suffix: &str) -> PathBuf {
        self.output_dir
            .join(format!("{}_{suffix}", self.experiment.as_str()))
    }

    /// Return the path where the model file should be saved.
    ///
    /// Does not write anything; just computes `{output_dir}/{experiment}_model.bin`.
    #[must_use]
    pub fn model_path(&self) -> PathBuf {
        self.path("model.bin")
    }

    /// Write one record table to `{experiment}_{suffix}`.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`IoError::WriteFile`] | the file cannot be created |
    /// | [`IoError::WriteRecord`] | a record cannot be written |
    pub fn write_records<F>(&self, suffix: &str, fill: F) -> Result<PathBuf, IoError>
    where
        F: FnOnce(&mut DelimitedWriter<BufWriter<File>>) -> Result<(), IoError>,
    {
        let path = self.path(suffix);
        let file = File::create(&path).map_err(|e| IoError::WriteFile {
            path: path.clone(),
            source: e,
        })?;
        let mut writer = DelimitedWriter::new(BufWriter::new(file), self.delimiter);
        fill(&mut writer)?;
        writer.flush()?;
        info!(path = %path.display(), "records written");
        Ok(path)
    }

    fn write_json<T: Serialize>(&self, suffix: &str, artifact: &T) -> Result<PathBuf, IoError> {
        let path = self.path(suffix);
        let json = serde_json::to_string_pretty(artifact).map_err(|e| IoError::Serialize {
            path: path.clone(),
            source: e,
        })?;
        fs::write(&path, &json).map_err(|e| IoError::WriteFile {
            path: path.clone(),
            source: e,
        })?;
        info!(path = %path.display(), "summary written");
        Ok(path)
    }

    /// Write a training run summary to `{experiment}_summary.json`.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::WriteFile`] if the file cannot be written.
    #[instrument(skip_all)]
    pub fn write_training_summary(
        &self,
        model: &str,
        metadata: &TrainingMetadata,
        evaluation: &SetPrediction,
        oob_accuracy: Option<f64>,
    ) -> Result<PathBuf, IoError> {
        let artifact = TrainingArtifact {
            experiment: self.experiment.as_str(),
            model,
            metadata,
            accuracy: evaluation.accuracy(),
            oob_accuracy,
            stat: evaluation.stat.as_ref(),
            confusion: ConfusionArtifact::from_matrix(&evaluation.matrix),
        };
        self.write_json("summary.json", &artifact)
    }

    /// Write cross-validation results to `{experiment}_cv.json`.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::WriteFile`] if the file cannot be written.
    #[instrument(skip_all)]
    pub fn write_cross_validation(&self, result: &CrossValidationResult) -> Result<PathBuf, IoError> {
        let artifact = CrossValidationArtifact {
            experiment: self.experiment.as_str(),
            n_folds: result.n_folds,
            n_samples: result.n_samples,
            mean_accuracy: result.mean_accuracy,
            std_accuracy: result.std_accuracy,
            fold_accuracies: &result.fold_accuracies,
            fold_stats: &result.fold_stats,
            confusion: ConfusionArtifact::from_matrix(&result.confusion_matrix),
        };
        self.write_json("cv.json", &artifact)
    }
}

// --- Shadow structs for JSON serialization ---

#[derive(Serialize)]
struct ConfusionArtifact<'a> {
    classes: &'a [String],
    counts: &'a [Vec<usize>],
    class_metrics: Vec<ClassMetrics>,
}

impl<'a> ConfusionArtifact<'a> {
    fn from_matrix(matrix: &'a ConfusionMatrix) -> Self {
        Self {
            classes: matrix.classes().labels(),
            counts: matrix.as_rows(),
            class_metrics: matrix.class_metrics(),
        }
    }
}

#[derive(Serialize)]
struct TrainingArtifact<'a> {
    experiment: &'a str,
    model: &'a str,
    metadata: &'a TrainingMetadata,
    accuracy: f64,
    oob_accuracy: Option<f64>,
    stat: Option<&'a Stat>,
    confusion: ConfusionArtifact<'a>,
}

#[derive(Serialize)]
struct CrossValidationArtifact<'a> {
    experiment: &'a str,
    n_folds: usize,
    n_samples: usize,
    mean_accuracy: f64,
    std_accuracy: f64,
    fold_accuracies: &'a [f64],
    fold_stats: &'a [Option<Stat>],
    confusion: ConfusionArtifact<'a>,
}
