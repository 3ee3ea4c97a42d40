use std::fmt;

/// Kind of a dataset column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum AttributeKind {
    /// Real-valued column, split by threshold.
    Numeric,
    /// Nominal column, split by value subsets.
    Categorical,
}

impl fmt::Display for AttributeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeKind::Numeric => f.write_str("numeric"),
            AttributeKind::Categorical => f.write_str("categorical"),
        }
    }
}

/// A named, typed column.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Attribute {
    name: String,
    kind: AttributeKind,
}

impl Attribute {
    /// Create a numeric attribute.
    pub fn numeric(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: AttributeKind::Numeric,
        }
    }

    /// Create a categorical attribute.
    pub fn categorical(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: AttributeKind::Categorical,
        }
    }

    /// Return the column name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Return the column kind.
    #[must_use]
    pub fn kind(&self) -> AttributeKind {
        self.kind
    }
}

/// A single cell of a sample.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum Value {
    /// A real number.
    Numeric(f64),
    /// A nominal label.
    Categorical(String),
}

impl Value {
    /// Return the kind of this value.
    #[must_use]
    pub fn kind(&self) -> AttributeKind {
        match self {
            Value::Numeric(_) => AttributeKind::Numeric,
            Value::Categorical(_) => AttributeKind::Categorical,
        }
    }

    /// Return the number if this is a numeric value.
    #[must_use]
    pub fn as_numeric(&self) -> Option<f64> {
        match self {
            Value::Numeric(v) => Some(*v),
            Value::Categorical(_) => None,
        }
    }

    /// Return the label if this is a categorical value.
    #[must_use]
    pub fn as_categorical(&self) -> Option<&str> {
        match self {
            Value::Numeric(_) => None,
            Value::Categorical(s) => Some(s),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Numeric(v) => write!(f, "{v}"),
            Value::Categorical(s) => f.write_str(s),
        }
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Numeric(v)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Categorical(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Categorical(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_follows_variant() {
        assert_eq!(Value::Numeric(1.5).kind(), AttributeKind::Numeric);
        assert_eq!(Value::from("a").kind(), AttributeKind::Categorical);
    }

    #[test]
    fn accessors_reject_wrong_variant() {
        assert_eq!(Value::Numeric(2.0).as_categorical(), None);
        assert_eq!(Value::from("x").as_numeric(), None);
        assert_eq!(Value::from("x").as_categorical(), Some("x"));
    }

    #[test]
    fn display_formats() {
        assert_eq!(format!("{}", Value::Numeric(0.25)), "0.25");
        assert_eq!(format!("{}", Value::from("yes")), "yes");
        assert_eq!(format!("{}", AttributeKind::Numeric), "numeric");
    }
}
