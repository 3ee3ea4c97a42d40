//! In-memory tabular dataset.

use tracing::debug;

use crate::error::DataError;
use crate::sample::Sample;
use crate::space::ValueSpace;
use crate::value::{Attribute, AttributeKind, Value};

/// Column layout shared by every row of a dataset.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Schema {
    attributes: Vec<Attribute>,
    class_index: usize,
}

impl Schema {
    /// Create a schema.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`DataError::EmptySchema`] | `attributes` is empty |
    /// | [`DataError::ClassIndexOutOfRange`] | `class_index` is past the last attribute |
    /// | [`DataError::NonCategoricalClass`] | the class attribute is numeric |
    pub fn new(attributes: Vec<Attribute>, class_index: usize) -> Result<Self, DataError> {
        if attributes.is_empty() {
            return Err(DataError::EmptySchema);
        }
        match attributes.get(class_index) {
            None => Err(DataError::ClassIndexOutOfRange {
                class_index,
                n_columns: attributes.len(),
            }),
            Some(attr) if attr.kind() != AttributeKind::Categorical => {
                Err(DataError::NonCategoricalClass { class_index })
            }
            Some(_) => Ok(Self {
                attributes,
                class_index,
            }),
        }
    }

    /// Number of columns, class attribute included.
    #[must_use]
    pub fn column_count(&self) -> usize {
        self.attributes.len()
    }

    /// Index of the class attribute.
    #[must_use]
    pub fn class_index(&self) -> usize {
        self.class_index
    }

    /// All attributes in column order.
    #[must_use]
    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    /// Return the attribute at `idx`.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::ColumnOutOfRange`] when `idx` is past the end.
    pub fn attribute(&self, idx: usize) -> Result<&Attribute, DataError> {
        self.attributes.get(idx).ok_or(DataError::ColumnOutOfRange {
            index: idx,
            n_columns: self.attributes.len(),
        })
    }

    /// Column indices of every non-class attribute.
    #[must_use]
    pub fn feature_indices(&self) -> Vec<usize> {
        (0..self.attributes.len())
            .filter(|&i| i != self.class_index)
            .collect()
    }

    fn check_row(&self, sample: &Sample) -> Result<(), DataError> {
        if sample.len() != self.attributes.len() {
            return Err(DataError::RowLengthMismatch {
                expected: self.attributes.len(),
                got: sample.len(),
            });
        }
        if sample.class_index() != self.class_index {
            return Err(DataError::ClassIndexOutOfRange {
                class_index: sample.class_index(),
                n_columns: self.attributes.len(),
            });
        }
        for (column, (attr, value)) in self.attributes.iter().zip(sample.values()).enumerate() {
            if attr.kind() != value.kind() {
                return Err(DataError::TypeMismatch {
                    column,
                    expected: attr.kind(),
                });
            }
        }
        Ok(())
    }
}

/// An ordered collection of samples sharing one schema.
///
/// Tracks the class value space and per-class counts as rows are pushed.
#[derive(Debug, Clone)]
pub struct Dataset {
    schema: Schema,
    rows: Vec<Sample>,
    classes: ValueSpace,
    class_counts: Vec<usize>,
}

impl Dataset {
    /// Create an empty dataset.
    #[must_use]
    pub fn new(schema: Schema) -> Self {
        Self {
            schema,
            rows: Vec::new(),
            classes: ValueSpace::default(),
            class_counts: Vec::new(),
        }
    }

    /// Create a dataset from rows.
    ///
    /// # Errors
    ///
    /// Propagates the first row validation error from [`Dataset::push`].
    pub fn from_rows(schema: Schema, rows: Vec<Sample>) -> Result<Self, DataError> {
        let mut dataset = Self::new(schema);
        dataset.rows.reserve(rows.len());
        for row in rows {
            dataset.push(row)?;
        }
        Ok(dataset)
    }

    /// Create an empty dataset with the same schema and class value space.
    ///
    /// Keeping the value space means class indices in the clone line up
    /// with those of `self`.
    #[must_use]
    pub fn clone_empty(&self) -> Self {
        Self {
            schema: self.schema.clone(),
            rows: Vec::new(),
            classes: self.classes.clone(),
            class_counts: vec![0; self.classes.len()],
        }
    }

    /// Append a row.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`DataError::RowLengthMismatch`] | row width differs from the schema |
    /// | [`DataError::ClassIndexOutOfRange`] | row class index differs from the schema |
    /// | [`DataError::TypeMismatch`] | a value kind differs from its column |
    pub fn push(&mut self, sample: Sample) -> Result<(), DataError> {
        self.schema.check_row(&sample)?;
        let class = self.classes.insert(sample.class_label());
        if class == self.class_counts.len() {
            self.class_counts.push(0);
        }
        self.class_counts[class] += 1;
        self.rows.push(sample);
        Ok(())
    }

    /// Number of rows.
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Return `true` if the dataset has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of columns, class attribute included.
    #[must_use]
    pub fn column_count(&self) -> usize {
        self.schema.column_count()
    }

    /// Index of the class attribute.
    #[must_use]
    pub fn class_index(&self) -> usize {
        self.schema.class_index()
    }

    /// The column layout.
    #[must_use]
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Distinct class labels in first-appearance order.
    #[must_use]
    pub fn class_value_space(&self) -> &ValueSpace {
        &self.classes
    }

    /// Column indices of every non-class attribute.
    #[must_use]
    pub fn feature_indices(&self) -> Vec<usize> {
        self.schema.feature_indices()
    }

    /// All rows in insertion order.
    #[must_use]
    pub fn rows(&self) -> &[Sample] {
        &self.rows
    }

    /// Return the row at `idx`, if present.
    #[must_use]
    pub fn row(&self, idx: usize) -> Option<&Sample> {
        self.rows.get(idx)
    }

    /// Consume the dataset and return its rows.
    #[must_use]
    pub fn into_rows(self) -> Vec<Sample> {
        self.rows
    }

    /// Class label of every row, encoded as an index into the value space.
    #[must_use]
    pub fn class_indices(&self) -> Vec<usize> {
        self.rows
            .iter()
            .map(|row| {
                self.classes
                    .index_of(row.class_label())
                    .unwrap_or_else(|| unreachable!("every pushed label is registered"))
            })
            .collect()
    }

    /// Number of rows carrying `label`.
    #[must_use]
    pub fn class_count(&self, label: &str) -> usize {
        self.classes
            .index_of(label)
            .map_or(0, |idx| self.class_counts[idx])
    }

    /// Most frequent class label; ties go to the label seen first.
    #[must_use]
    pub fn majority_class(&self) -> Option<&str> {
        let mut best: Option<(usize, usize)> = None;
        for (idx, &count) in self.class_counts.iter().enumerate() {
            if count > 0 && best.is_none_or(|(_, c)| count > c) {
                best = Some((idx, count));
            }
        }
        best.and_then(|(idx, _)| self.classes.label(idx))
    }

    /// Least frequent class label present in the rows; ties go to the label
    /// seen first.
    #[must_use]
    pub fn minority_class(&self) -> Option<&str> {
        let mut best: Option<(usize, usize)> = None;
        for (idx, &count) in self.class_counts.iter().enumerate() {
            if count > 0 && best.is_none_or(|(_, c)| count < c) {
                best = Some((idx, count));
            }
        }
        best.and_then(|(idx, _)| self.classes.label(idx))
    }

    /// Recompute per-class counts from the current rows.
    pub fn recount_major_minor(&mut self) {
        self.class_counts = vec![0; self.classes.len()];
        for row in &self.rows {
            if let Some(idx) = self.classes.index_of(row.class_label()) {
                self.class_counts[idx] += 1;
            }
        }
        debug!(
            majority = ?self.majority_class(),
            minority = ?self.minority_class(),
            "class counts refreshed"
        );
    }

    /// Materialise the rows at `indices` (repeats allowed) into a new dataset
    /// sharing this dataset's value space.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::RowOutOfRange`] if an index is past the last row.
    pub fn select(&self, indices: &[usize]) -> Result<Self, DataError> {
        let mut out = self.clone_empty();
        out.rows.reserve(indices.len());
        for &i in indices {
            let row = self.rows.get(i).ok_or(DataError::RowOutOfRange {
                index: i,
                n_rows: self.rows.len(),
            })?;
            out.push(row.clone())?;
        }
        Ok(out)
    }

    /// Partition rows on one column.
    ///
    /// Numeric columns send `value < threshold` left; categorical columns
    /// send rows equal to `value` left. Both halves keep this dataset's
    /// value space.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`DataError::ColumnOutOfRange`] | `col` is past the last column |
    /// | [`DataError::TypeMismatch`] | `value` kind differs from the column |
    pub fn split_by_value(&self, col: usize, value: &Value) -> Result<(Self, Self), DataError> {
        let attr = self.schema.attribute(col)?;
        if attr.kind() != value.kind() {
            return Err(DataError::TypeMismatch {
                column: col,
                expected: attr.kind(),
            });
        }
        let mut left = self.clone_empty();
        let mut right = self.clone_empty();
        for row in &self.rows {
            let goes_left = match (row.attribute(col)?, value) {
                (Value::Numeric(v), Value::Numeric(t)) => v < t,
                (Value::Categorical(v), Value::Categorical(t)) => v == t,
                _ => {
                    return Err(DataError::TypeMismatch {
                        column: col,
                        expected: attr.kind(),
                    });
                }
            };
            if goes_left {
                left.push(row.clone())?;
            } else {
                right.push(row.clone())?;
            }
        }
        Ok((left, right))
    }
}
