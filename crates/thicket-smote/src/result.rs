//! Oversampling output.

use thicket_data::{Dataset, Sample};

use crate::error::SmoteError;

/// Rows produced by one SMOTE or LN-SMOTE run.
#[derive(Debug, Clone)]
pub struct OversampleResult {
    pub(crate) minority_label: String,
    pub(crate) n_minority: usize,
    pub(crate) synthetic: Vec<Sample>,
    pub(crate) outliers: Vec<Sample>,
    pub(crate) skipped: usize,
}

impl OversampleResult {
    /// The oversampled class.
    #[must_use]
    pub fn minority_label(&self) -> &str {
        &self.minority_label
    }

    /// Minority rows in the input.
    #[must_use]
    pub fn n_minority(&self) -> usize {
        self.n_minority
    }

    /// Generated rows, in generation order.
    #[must_use]
    pub fn synthetic(&self) -> &[Sample] {
        &self.synthetic
    }

    /// Minority rows with no minority neighbour on either side.
    ///
    /// Always empty for plain SMOTE.
    #[must_use]
    pub fn outliers(&self) -> &[Sample] {
        &self.outliers
    }

    /// Interpolations that were not performed.
    #[must_use]
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Consume the result, returning the synthetic rows.
    #[must_use]
    pub fn into_synthetic(self) -> Vec<Sample> {
        self.synthetic
    }

    /// Append every synthetic row to `dataset`.
    ///
    /// # Errors
    ///
    /// Returns [`SmoteError::Data`] if a row does not fit the dataset schema.
    pub fn append_to(&self, dataset: &mut Dataset) -> Result<(), SmoteError> {
        for sample in &self.synthetic {
            dataset.push(sample.clone())?;
        }
        Ok(())
    }
}
