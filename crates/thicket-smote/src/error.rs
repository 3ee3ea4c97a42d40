use thicket_data::DataError;

/// Errors from neighbour search and oversampling.
#[derive(Debug, thiserror::Error)]
pub enum SmoteError {
    /// Returned when the dataset to oversample has zero rows.
    #[error("cannot oversample an empty dataset")]
    EmptyDataset,

    /// Returned when the requested minority label never occurs.
    #[error("minority class \"{label}\" has no rows")]
    UnknownMinorityClass {
        /// The requested label.
        label: String,
    },

    /// Returned when a query and a candidate row differ in width.
    #[error("query has {got} columns, candidate has {expected}")]
    WidthMismatch {
        /// Width of the candidate row.
        expected: usize,
        /// Width of the query row.
        got: usize,
    },

    /// Wraps a dataset access error.
    #[error("dataset error: {0}")]
    Data(#[from] DataError),
}
