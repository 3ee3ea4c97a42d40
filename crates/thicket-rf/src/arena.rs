//! Stable-id sample storage for the cascade working set and reservoir.

use thicket_data::{DataError, Dataset, Sample};

/// Identifier of a training row, fixed for the whole cascade run.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash,
    serde::Serialize, serde::Deserialize,
)]
pub struct SampleId(usize);

impl SampleId {
    pub(crate) fn new(index: usize) -> Self {
        Self(index)
    }

    /// Return the zero-based row position in the original training set.
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

/// Rows addressed by [`SampleId`]; removing a row never shifts another.
#[derive(Debug, Clone)]
pub(crate) struct SampleArena {
    slots: Vec<Option<Sample>>,
    live: usize,
}

impl SampleArena {
    /// Fill the arena with `rows`, ids `0..rows.len()`.
    pub(crate) fn from_rows(rows: &[Sample]) -> Self {
        Self {
            slots: rows.iter().cloned().map(Some).collect(),
            live: rows.len(),
        }
    }

    /// An empty arena over the id range `0..capacity`.
    pub(crate) fn vacant(capacity: usize) -> Self {
        Self {
            slots: vec![None; capacity],
            live: 0,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.live
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.live == 0
    }

    pub(crate) fn contains(&self, id: SampleId) -> bool {
        self.slots.get(id.0).is_some_and(Option::is_some)
    }

    /// Take the row out, leaving its slot vacant.
    pub(crate) fn remove(&mut self, id: SampleId) -> Option<Sample> {
        let taken = self.slots.get_mut(id.0).and_then(Option::take);
        if taken.is_some() {
            self.live -= 1;
        }
        taken
    }

    /// Put a row back under its id, returning any row it replaced.
    pub(crate) fn insert(&mut self, id: SampleId, sample: Sample) -> Option<Sample> {
        if id.0 >= self.slots.len() {
            self.slots.resize(id.0 + 1, None);
        }
        let previous = self.slots[id.0].replace(sample);
        if previous.is_none() {
            self.live += 1;
        }
        previous
    }

    /// Move a row into `other`. Returns `false` if it was not here.
    pub(crate) fn transfer(&mut self, id: SampleId, other: &mut SampleArena) -> bool {
        match self.remove(id) {
            Some(sample) => {
                other.insert(id, sample);
                true
            }
            None => false,
        }
    }

    /// Live ids in ascending order.
    pub(crate) fn ids(&self) -> Vec<SampleId> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, s)| s.is_some())
            .map(|(i, _)| SampleId(i))
            .collect()
    }

    /// Copy the live rows into a dataset shaped like `template`, with the
    /// id of each dataset row.
    pub(crate) fn snapshot(
        &self,
        template: &Dataset,
    ) -> Result<(Vec<SampleId>, Dataset), DataError> {
        let mut dataset = template.clone_empty();
        let mut ids = Vec::with_capacity(self.live);
        for (i, slot) in self.slots.iter().enumerate() {
            if let Some(sample) = slot {
                dataset.push(sample.clone())?;
                ids.push(SampleId(i));
            }
        }
        Ok((ids, dataset))
    }
}

#[cfg(test)]
mod tests {
    use thicket_data::{Attribute, Schema, Value};

    use super::*;

    fn rows(n: usize) -> (Dataset, Vec<Sample>) {
        let schema = Schema::new(
            vec![Attribute::numeric("x"), Attribute::categorical("class")],
            1,
        )
        .unwrap();
        let samples: Vec<Sample> = (0..n)
            .map(|i| {
                let label = if i % 2 == 0 { "0" } else { "1" };
                Sample::new(vec![Value::Numeric(i as f64), Value::from(label)], 1).unwrap()
            })
            .collect();
        let ds = Dataset::from_rows(schema, samples.clone()).unwrap();
        (ds, samples)
    }

    #[test]
    fn removal_keeps_other_ids_stable() {
        let (ds, samples) = rows(6);
        let mut arena = SampleArena::from_rows(&samples);
        for id in [1, 2, 4] {
            assert!(arena.remove(SampleId::new(id)).is_some());
        }
        assert_eq!(arena.len(), 3);
        assert_eq!(
            arena.ids(),
            vec![SampleId::new(0), SampleId::new(3), SampleId::new(5)]
        );
        let (ids, snapshot) = arena.snapshot(&ds).unwrap();
        assert_eq!(ids.len(), 3);
        assert_eq!(snapshot.row(1).unwrap().numeric(0).unwrap(), 3.0);
        assert!(arena.remove(SampleId::new(1)).is_none());
    }

    #[test]
    fn transfer_moves_between_arenas() {
        let (_, samples) = rows(4);
        let mut working = SampleArena::from_rows(&samples);
        let mut reservoir = SampleArena::vacant(4);
        assert!(working.transfer(SampleId::new(2), &mut reservoir));
        assert!(!working.contains(SampleId::new(2)));
        assert!(reservoir.contains(SampleId::new(2)));
        assert!(!working.transfer(SampleId::new(2), &mut reservoir));

        assert!(reservoir.transfer(SampleId::new(2), &mut working));
        assert!(reservoir.is_empty());
        assert_eq!(working.len(), 4);
    }

    #[test]
    fn snapshot_keeps_value_space() {
        let (ds, samples) = rows(4);
        let mut arena = SampleArena::from_rows(&samples);
        arena.remove(SampleId::new(0));
        arena.remove(SampleId::new(2));
        let (_, snapshot) = arena.snapshot(&ds).unwrap();
        assert_eq!(snapshot.class_value_space(), ds.class_value_space());
        assert_eq!(snapshot.class_count("0"), 0);
    }
}
