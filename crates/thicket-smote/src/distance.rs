//! Row distances for neighbour search.

use std::cmp::Ordering;
use std::fmt;

use thicket_data::{DataError, Sample, Value};

use crate::error::SmoteError;

/// A non-negative distance between two rows.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Distance(f64);

impl Distance {
    pub(crate) fn new(value: f64) -> Self {
        Self(value)
    }

    /// Return the raw distance value.
    #[must_use]
    pub fn value(self) -> f64 {
        self.0
    }

    /// Total ordering comparison using [`f64::total_cmp`].
    #[must_use]
    pub fn total_cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl fmt::Display for Distance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6}", self.0)
    }
}

/// How per-attribute differences combine into a row distance.
///
/// A categorical attribute differs by 0 when equal and 1 otherwise.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DistanceMetric {
    /// `sum |a - b|`.
    #[default]
    Manhattan,
    /// `sqrt(sum (a - b)^2)`.
    Euclidean,
}

impl DistanceMetric {
    /// Distance between `a` and `b` over the non-class attributes of `a`.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`SmoteError::WidthMismatch`] | rows differ in width |
    /// | [`SmoteError::Data`] | an attribute has different kinds in the two rows |
    pub fn distance(self, a: &Sample, b: &Sample) -> Result<Distance, SmoteError> {
        if a.len() != b.len() {
            return Err(SmoteError::WidthMismatch {
                expected: b.len(),
                got: a.len(),
            });
        }
        let mut total = 0.0;
        for idx in a.feature_indices() {
            let diff = match (a.attribute(idx)?, b.attribute(idx)?) {
                (Value::Numeric(x), Value::Numeric(y)) => (x - y).abs(),
                (Value::Categorical(x), Value::Categorical(y)) => {
                    if x == y { 0.0 } else { 1.0 }
                }
                (this, _) => {
                    return Err(DataError::TypeMismatch {
                        column: idx,
                        expected: this.kind(),
                    }
                    .into());
                }
            };
            total += match self {
                DistanceMetric::Manhattan => diff,
                DistanceMetric::Euclidean => diff * diff,
            };
        }
        Ok(Distance::new(match self {
            DistanceMetric::Manhattan => total,
            DistanceMetric::Euclidean => total.sqrt(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(x: f64, y: f64, colour: &str) -> Sample {
        Sample::new(
            vec![
                Value::Numeric(x),
                Value::Numeric(y),
                Value::from(colour),
                Value::from("c"),
            ],
            3,
        )
        .unwrap()
    }

    #[test]
    fn manhattan_sums_absolute_differences() {
        let d = DistanceMetric::Manhattan
            .distance(&row(0.0, 0.0, "red"), &row(3.0, -4.0, "red"))
            .unwrap();
        assert!((d.value() - 7.0).abs() < 1e-12);
    }

    #[test]
    fn euclidean_is_root_of_squares() {
        let d = DistanceMetric::Euclidean
            .distance(&row(0.0, 0.0, "red"), &row(3.0, -4.0, "red"))
            .unwrap();
        assert!((d.value() - 5.0).abs() < 1e-12);
    }

    #[test]
    fn categorical_mismatch_counts_one() {
        let d = DistanceMetric::Manhattan
            .distance(&row(1.0, 1.0, "red"), &row(1.0, 1.0, "blue"))
            .unwrap();
        assert!((d.value() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn class_column_is_ignored() {
        let a = Sample::new(vec![Value::Numeric(1.0), Value::from("x")], 1).unwrap();
        let b = Sample::new(vec![Value::Numeric(1.0), Value::from("y")], 1).unwrap();
        let d = DistanceMetric::Manhattan.distance(&a, &b).unwrap();
        assert_eq!(d.value(), 0.0);
    }

    #[test]
    fn width_mismatch_error() {
        let a = Sample::new(vec![Value::Numeric(1.0), Value::from("x")], 1).unwrap();
        let err = DistanceMetric::Manhattan
            .distance(&a, &row(1.0, 1.0, "red"))
            .unwrap_err();
        assert!(matches!(err, SmoteError::WidthMismatch { expected: 4, got: 2 }));
    }

    #[test]
    fn display_format() {
        assert_eq!(format!("{}", Distance::new(1.5)), "1.500000");
    }
}
