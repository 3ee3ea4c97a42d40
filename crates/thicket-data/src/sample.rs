use crate::error::DataError;
use crate::value::{AttributeKind, Value};

/// One row of a dataset: a fixed-length sequence of attribute values with a
/// designated categorical class attribute.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Sample {
    values: Vec<Value>,
    class_index: usize,
}

impl Sample {
    /// Create a sample.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`DataError::ClassIndexOutOfRange`] | `class_index >= values.len()` |
    /// | [`DataError::NonCategoricalClass`] | the class value is numeric |
    pub fn new(values: Vec<Value>, class_index: usize) -> Result<Self, DataError> {
        match values.get(class_index) {
            None => Err(DataError::ClassIndexOutOfRange {
                class_index,
                n_columns: values.len(),
            }),
            Some(Value::Numeric(_)) => Err(DataError::NonCategoricalClass { class_index }),
            Some(Value::Categorical(_)) => Ok(Self {
                values,
                class_index,
            }),
        }
    }

    /// Number of attributes, class attribute included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Return `true` if the sample has no attributes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Index of the class attribute.
    #[must_use]
    pub fn class_index(&self) -> usize {
        self.class_index
    }

    /// All values in column order.
    #[must_use]
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Column indices of every non-class attribute.
    pub fn feature_indices(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.values.len()).filter(move |&i| i != self.class_index)
    }

    /// Return the value at `idx`.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::ColumnOutOfRange`] when `idx` is past the end.
    pub fn attribute(&self, idx: usize) -> Result<&Value, DataError> {
        self.values.get(idx).ok_or(DataError::ColumnOutOfRange {
            index: idx,
            n_columns: self.values.len(),
        })
    }

    /// Return the numeric value at `idx`.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::ColumnOutOfRange`] or [`DataError::TypeMismatch`].
    pub fn numeric(&self, idx: usize) -> Result<f64, DataError> {
        self.attribute(idx)?
            .as_numeric()
            .ok_or(DataError::TypeMismatch {
                column: idx,
                expected: AttributeKind::Numeric,
            })
    }

    /// Return the categorical label at `idx`.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::ColumnOutOfRange`] or [`DataError::TypeMismatch`].
    pub fn categorical(&self, idx: usize) -> Result<&str, DataError> {
        self.attribute(idx)?
            .as_categorical()
            .ok_or(DataError::TypeMismatch {
                column: idx,
                expected: AttributeKind::Categorical,
            })
    }

    /// Return the class label.
    #[must_use]
    pub fn class_label(&self) -> &str {
        match &self.values[self.class_index] {
            Value::Categorical(label) => label,
            Value::Numeric(_) => unreachable!("class value is checked categorical on construction"),
        }
    }

    /// Overwrite a numeric, non-class attribute.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`DataError::ColumnOutOfRange`] | `idx` is past the end |
    /// | [`DataError::ClassAttributeImmutable`] | `idx` is the class column |
    /// | [`DataError::TypeMismatch`] | the column holds a categorical value |
    pub fn set_numeric(&mut self, idx: usize, value: f64) -> Result<(), DataError> {
        if idx == self.class_index {
            return Err(DataError::ClassAttributeImmutable { column: idx });
        }
        let n_columns = self.values.len();
        match self.values.get_mut(idx) {
            None => Err(DataError::ColumnOutOfRange {
                index: idx,
                n_columns,
            }),
            Some(Value::Categorical(_)) => Err(DataError::TypeMismatch {
                column: idx,
                expected: AttributeKind::Numeric,
            }),
            Some(slot) => {
                *slot = Value::Numeric(value);
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row() -> Sample {
        Sample::new(vec![Value::Numeric(1.0), Value::from("red"), Value::from("1")], 2).unwrap()
    }

    #[test]
    fn class_label_reads_class_column() {
        assert_eq!(row().class_label(), "1");
    }

    #[test]
    fn numeric_class_rejected() {
        let err = Sample::new(vec![Value::Numeric(1.0)], 0).unwrap_err();
        assert!(matches!(err, DataError::NonCategoricalClass { class_index: 0 }));
    }

    #[test]
    fn class_index_out_of_range() {
        let err = Sample::new(vec![Value::from("a")], 3).unwrap_err();
        assert!(matches!(err, DataError::ClassIndexOutOfRange { .. }));
    }

    #[test]
    fn feature_indices_skip_class() {
        let idx: Vec<usize> = row().feature_indices().collect();
        assert_eq!(idx, vec![0, 1]);
    }

    #[test]
    fn set_numeric_guards_class_and_type() {
        let mut s = row();
        s.set_numeric(0, 4.5).unwrap();
        assert_eq!(s.numeric(0).unwrap(), 4.5);
        assert!(matches!(
            s.set_numeric(2, 0.0),
            Err(DataError::ClassAttributeImmutable { column: 2 })
        ));
        assert!(matches!(s.set_numeric(1, 0.0), Err(DataError::TypeMismatch { .. })));
        assert!(matches!(s.set_numeric(9, 0.0), Err(DataError::ColumnOutOfRange { .. })));
    }

    #[test]
    fn typed_accessors() {
        let s = row();
        assert_eq!(s.categorical(1).unwrap(), "red");
        assert!(s.numeric(1).is_err());
    }
}
