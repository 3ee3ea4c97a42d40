use std::path::PathBuf;

use thicket_data::DataError;

/// Errors from tree, forest and cascade operations.
#[derive(Debug, thiserror::Error)]
pub enum RfError {
    /// Returned when the training dataset has zero samples.
    #[error("training dataset has zero samples")]
    EmptyDataset,

    /// Returned when the training dataset has no attribute besides the class.
    #[error("training dataset has zero feature columns")]
    ZeroFeatures,

    /// Returned when a numeric training value is NaN or infinite.
    #[error("non-finite value at sample {sample_index}, column {column}")]
    NonFiniteValue {
        /// The zero-based index of the offending sample.
        sample_index: usize,
        /// The zero-based index of the offending column.
        column: usize,
    },

    /// Returned when the Gini engine is asked to score an empty partition.
    #[error("cannot compute Gini gain over an empty partition")]
    EmptyPartition,

    /// Returned when an attribute column and its target column differ in length.
    #[error("attribute column has {attribute} values but target has {target}")]
    ColumnLengthMismatch {
        /// Length of the attribute column.
        attribute: usize,
        /// Length of the target column.
        target: usize,
    },

    /// Returned when a chosen split leaves one side without rows.
    #[error("split on column {column} is degenerate ({n_left} left, {n_right} right)")]
    DegenerateSplit {
        /// Column the split was made on.
        column: usize,
        /// Rows sent left.
        n_left: usize,
        /// Rows sent right.
        n_right: usize,
    },

    /// Returned when a tree keeps failing to grow after every retry.
    #[error("tree {tree} failed to grow after {attempts} attempts")]
    TreeGrowthExhausted {
        /// Position of the tree in its forest.
        tree: usize,
        /// Number of attempts made.
        attempts: usize,
        /// The error raised by the last attempt.
        #[source]
        last: Box<RfError>,
    },

    /// Returned when a row has a different width than the training schema.
    #[error("prediction input has {got} columns, expected {expected}")]
    PredictionFeatureMismatch {
        /// Number of columns the model was trained on.
        expected: usize,
        /// Number of columns in the input row.
        got: usize,
    },

    /// Returned when an evaluated row carries a class label the model never saw.
    #[error("class label \"{label}\" is not in the model's value space")]
    UnknownClassLabel {
        /// The unrecognised label.
        label: String,
    },

    /// Returned when the configured positive label is not a known class.
    #[error("positive class \"{label}\" is not in the value space")]
    MissingPositiveClass {
        /// The configured positive label.
        label: String,
    },

    /// Returned when actual and predicted label slices differ in length.
    #[error("{actuals} actual labels but {predictions} predictions")]
    PredictionLengthMismatch {
        /// Number of actual labels.
        actuals: usize,
        /// Number of predictions.
        predictions: usize,
    },

    /// Returned when a class index does not address the value space.
    #[error("class index {class} is out of range for {n_classes} classes")]
    ClassOutOfRange {
        /// The offending class index.
        class: usize,
        /// Size of the value space.
        n_classes: usize,
    },

    /// Returned when a categorical value index does not address its value table.
    #[error("value index {value} is out of range for {n_values} values")]
    ValueOutOfRange {
        /// The offending value index.
        value: usize,
        /// Number of distinct values.
        n_values: usize,
    },

    /// Returned when n_folds is less than 2.
    #[error("n_folds must be at least 2, got {n_folds}")]
    InvalidFoldCount {
        /// The invalid n_folds value provided.
        n_folds: usize,
    },

    /// Returned when a class has fewer samples than the number of folds.
    #[error("class {class} has only {count} samples, need at least {n_folds} for stratified CV")]
    TooFewSamplesForFolds {
        /// The class label with insufficient samples.
        class: String,
        /// The number of samples belonging to that class.
        count: usize,
        /// The requested number of folds.
        n_folds: usize,
    },

    /// Wraps a dataset access error.
    #[error("dataset error: {0}")]
    Data(#[from] DataError),

    /// Returned when model serialization fails.
    #[error("failed to serialize model")]
    SerializeModel {
        /// The underlying bincode error.
        source: Box<bincode::ErrorKind>,
    },

    /// Returned when model deserialization fails.
    #[error("failed to deserialize model from {path}")]
    DeserializeModel {
        /// Path to the model file that could not be deserialized.
        path: PathBuf,
        /// The underlying bincode error.
        source: Box<bincode::ErrorKind>,
    },

    /// Returned when writing the model file fails.
    #[error("failed to write model to {path}")]
    WriteModel {
        /// Path to the file that could not be written.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when reading the model file fails.
    #[error("failed to read model from {path}")]
    ReadModel {
        /// Path to the file that could not be read.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when loading a model with an incompatible format version or kind.
    #[error("incompatible model in {path}: expected {expected}, found {found}")]
    IncompatibleModel {
        /// Format version and kind this build expects.
        expected: String,
        /// Format version and kind found in the file.
        found: String,
        /// Path to the offending model file.
        path: PathBuf,
    },
}

impl RfError {
    /// Return `true` for failures of a single tree-growth attempt that a
    /// fresh bootstrap draw may avoid.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            RfError::EmptyPartition | RfError::DegenerateSplit { .. }
        )
    }
}
