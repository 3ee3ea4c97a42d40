//! Validated names for run artifacts.

use std::fmt;

use crate::IoError;

/// A validated experiment name: non-empty, `[a-zA-Z0-9_-]` only.
///
/// Used as the prefix of every file a [`ResultWriter`](crate::ResultWriter)
/// creates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExperimentName(String);

impl ExperimentName {
    /// Validate and wrap an experiment name.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::InvalidExperimentName`] if `name` is empty or
    /// contains other characters.
    pub fn new(name: impl Into<String>) -> Result<Self, IoError> {
        let name = name.into();
        let valid = !name.is_empty()
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if valid {
            Ok(Self(name))
        } else {
            Err(IoError::InvalidExperimentName { name })
        }
    }

    /// Return the name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ExperimentName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
