//! Bootstrap bags.

use rand::Rng;

/// The rows drawn with replacement to grow one tree.
///
/// Immutable after the draw. Rows never drawn form the tree's out-of-bag set.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct BagRecord {
    indices: Vec<usize>,
    in_bag: Vec<bool>,
}

/// Number of rows drawn per bag: `round(n_rows * percent_boot / 100)`, at least 1.
#[must_use]
pub fn bag_size(n_rows: usize, percent_boot: f64) -> usize {
    ((n_rows as f64 * percent_boot / 100.0).round() as usize).max(1)
}

impl BagRecord {
    /// Draw `size` row indices uniformly with replacement from `0..n_rows`.
    pub(crate) fn draw(n_rows: usize, size: usize, rng: &mut impl Rng) -> Self {
        let mut in_bag = vec![false; n_rows];
        let mut indices = Vec::with_capacity(size);
        if n_rows > 0 {
            for _ in 0..size {
                let idx = rng.gen_range(0..n_rows);
                indices.push(idx);
                in_bag[idx] = true;
            }
        }
        Self { indices, in_bag }
    }

    /// Return the drawn indices in draw order, repeats included.
    #[must_use]
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    /// Return the number of draws.
    #[must_use]
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    /// Return `true` if nothing was drawn.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Return the size of the row set the bag was drawn from.
    #[must_use]
    pub fn n_rows(&self) -> usize {
        self.in_bag.len()
    }

    /// Return `true` if `row` was drawn at least once.
    #[must_use]
    pub fn contains(&self, row: usize) -> bool {
        self.in_bag.get(row).copied().unwrap_or(false)
    }

    /// Return the rows never drawn, ascending.
    #[must_use]
    pub fn oob_indices(&self) -> Vec<usize> {
        (0..self.in_bag.len()).filter(|&i| !self.in_bag[i]).collect()
    }
}
