/// The ordered set of distinct class labels of a dataset.
///
/// Order is first-insertion order and never changes once a label is added,
/// so class indices stay aligned with confusion-matrix rows and per-class
/// counters for the lifetime of a model.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ValueSpace {
    labels: Vec<String>,
}

impl ValueSpace {
    /// Build a value space from labels, keeping the first occurrence of each.
    pub fn new<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut space = Self::default();
        for label in labels {
            space.insert(label.into());
        }
        space
    }

    /// Add a label if absent and return its index.
    pub fn insert(&mut self, label: impl Into<String>) -> usize {
        let label = label.into();
        match self.index_of(&label) {
            Some(idx) => idx,
            None => {
                self.labels.push(label);
                self.labels.len() - 1
            }
        }
    }

    /// Return the index of `label`, if present.
    #[must_use]
    pub fn index_of(&self, label: &str) -> Option<usize> {
        self.labels.iter().position(|l| l == label)
    }

    /// Return the label at `idx`, if present.
    #[must_use]
    pub fn label(&self, idx: usize) -> Option<&str> {
        self.labels.get(idx).map(String::as_str)
    }

    /// Number of labels.
    #[must_use]
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Return `true` if no label has been registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// All labels in index order.
    #[must_use]
    pub fn labels(&self) -> &[String] {
        &self.labels
    }
}

#[cfg(test)]
mod tests {
    use super::ValueSpace;

    #[test]
    fn first_appearance_order() {
        let space = ValueSpace::new(["1", "1", "0", "1", "2", "0"]);
        assert_eq!(space.labels(), ["1", "0", "2"]);
        assert_eq!(space.index_of("0"), Some(1));
        assert_eq!(space.label(2), Some("2"));
        assert_eq!(space.index_of("9"), None);
    }

    #[test]
    fn insert_is_idempotent() {
        let mut space = ValueSpace::default();
        assert_eq!(space.insert("a"), 0);
        assert_eq!(space.insert("b"), 1);
        assert_eq!(space.insert("a"), 0);
        assert_eq!(space.len(), 2);
    }
}
