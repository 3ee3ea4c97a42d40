use crate::value::AttributeKind;

/// Errors from dataset construction and row access.
#[derive(Debug, thiserror::Error)]
pub enum DataError {
    /// Returned when a schema is built with zero attributes.
    #[error("schema must contain at least one attribute")]
    EmptySchema,

    /// Returned when an attribute index is outside the row.
    #[error("column {index} is out of range for {n_columns} columns")]
    ColumnOutOfRange {
        /// The requested column index.
        index: usize,
        /// Number of columns in the row or schema.
        n_columns: usize,
    },

    /// Returned when a row index is past the last row.
    #[error("row {index} is out of range for {n_rows} rows")]
    RowOutOfRange {
        /// The requested row index.
        index: usize,
        /// Number of rows in the dataset.
        n_rows: usize,
    },

    /// Returned when the class index does not address a column.
    #[error("class index {class_index} is out of range for {n_columns} columns")]
    ClassIndexOutOfRange {
        /// The requested class column index.
        class_index: usize,
        /// Number of columns in the schema.
        n_columns: usize,
    },

    /// Returned when the class column is not categorical.
    #[error("class column {class_index} must be categorical")]
    NonCategoricalClass {
        /// The class column index.
        class_index: usize,
    },

    /// Returned when a row has a different number of values than the schema.
    #[error("row has {got} values, expected {expected}")]
    RowLengthMismatch {
        /// Number of columns in the schema.
        expected: usize,
        /// Number of values in the offending row.
        got: usize,
    },

    /// Returned when a value does not match its column kind.
    #[error("column {column} holds a value that is not {expected}")]
    TypeMismatch {
        /// The offending column index.
        column: usize,
        /// The kind the column was declared with.
        expected: AttributeKind,
    },

    /// Returned when a caller tries to overwrite the class attribute numerically.
    #[error("column {column} is the class attribute and cannot be interpolated")]
    ClassAttributeImmutable {
        /// The class column index.
        column: usize,
    },
}
