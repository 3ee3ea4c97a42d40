//! Binary classification statistics and ROC AUC.

use std::cmp::Ordering;

/// Raw binary outcome counts for one positive class against the rest.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct BinaryCounts {
    /// Positive rows predicted positive.
    pub true_positives: usize,
    /// Negative rows predicted positive.
    pub false_positives: usize,
    /// Negative rows predicted negative.
    pub true_negatives: usize,
    /// Positive rows predicted negative.
    pub false_negatives: usize,
}

impl BinaryCounts {
    /// Return the number of rows counted.
    #[must_use]
    pub fn total(&self) -> usize {
        self.true_positives + self.false_positives + self.true_negatives + self.false_negatives
    }
}

/// Performance statistics derived from [`BinaryCounts`].
///
/// Every ratio is 0 when its denominator is 0.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Stat {
    /// The counts the ratios were derived from.
    pub counts: BinaryCounts,
    /// `TP / (TP + FN)`, also called recall.
    pub tp_rate: f64,
    /// `FP / (FP + TN)`.
    pub fp_rate: f64,
    /// `TN / (TN + FP)`.
    pub tn_rate: f64,
    /// `TP / (TP + FP)`.
    pub precision: f64,
    /// Harmonic mean of precision and TP rate.
    pub f_measure: f64,
    /// `(TP + TN) / total`.
    pub accuracy: f64,
    /// Area under the ROC curve, when scores were available.
    pub auc: Option<f64>,
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 { 0.0 } else { num as f64 / den as f64 }
}

impl Stat {
    /// Derive all ratios from raw counts.
    #[must_use]
    pub fn from_counts(counts: BinaryCounts) -> Self {
        let BinaryCounts {
            true_positives: tp,
            false_positives: fp,
            true_negatives: tn,
            false_negatives: fn_,
        } = counts;
        let tp_rate = ratio(tp, tp + fn_);
        let precision = ratio(tp, tp + fp);
        let f_measure = if precision == 0.0 || tp_rate == 0.0 {
            0.0
        } else {
            2.0 / (1.0 / precision + 1.0 / tp_rate)
        };
        Self {
            counts,
            tp_rate,
            fp_rate: ratio(fp, fp + tn),
            tn_rate: ratio(tn, tn + fp),
            precision,
            f_measure,
            accuracy: ratio(tp + tn, counts.total()),
            auc: None,
        }
    }

    /// Attach an AUC value.
    #[must_use]
    pub fn with_auc(mut self, auc: f64) -> Self {
        self.auc = Some(auc);
        self
    }
}

fn trapezoid(x1: usize, x2: usize, y1: usize, y2: usize) -> f64 {
    x1.abs_diff(x2) as f64 * (y1 + y2) as f64 / 2.0
}

/// Compute the binary ROC AUC of `scores` against `is_positive`.
///
/// Rows are swept in descending score order; tied scores form a single ROC
/// point. Returns 0 when either class is absent or the slices differ in
/// length.
#[must_use]
pub fn auc(scores: &[f64], is_positive: &[bool]) -> f64 {
    if scores.len() != is_positive.len() {
        return 0.0;
    }
    let n_pos = is_positive.iter().filter(|&&p| p).count();
    let n_neg = is_positive.len() - n_pos;
    if n_pos == 0 || n_neg == 0 {
        return 0.0;
    }

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[b].partial_cmp(&scores[a]).unwrap_or(Ordering::Equal));

    let (mut tp, mut fp) = (0usize, 0usize);
    let (mut tp_prev, mut fp_prev) = (0usize, 0usize);
    let mut area = 0.0;
    let mut prev_score: Option<f64> = None;
    for &i in &order {
        if prev_score != Some(scores[i]) {
            area += trapezoid(fp, fp_prev, tp, tp_prev);
            prev_score = Some(scores[i]);
            tp_prev = tp;
            fp_prev = fp;
        }
        if is_positive[i] {
            tp += 1;
        } else {
            fp += 1;
        }
    }
    area += trapezoid(n_neg, fp_prev, n_pos, tp_prev);
    area / (n_pos * n_neg) as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counts(tp: usize, fp: usize, tn: usize, fn_: usize) -> BinaryCounts {
        BinaryCounts {
            true_positives: tp,
            false_positives: fp,
            true_negatives: tn,
            false_negatives: fn_,
        }
    }

    #[test]
    fn rates_from_counts() {
        let stat = Stat::from_counts(counts(2, 1, 3, 1));
        assert!((stat.tp_rate - 2.0 / 3.0).abs() < 1e-12);
        assert!((stat.fp_rate - 0.25).abs() < 1e-12);
        assert!((stat.tn_rate - 0.75).abs() < 1e-12);
        assert!((stat.precision - 2.0 / 3.0).abs() < 1e-12);
        assert!((stat.f_measure - 2.0 / 3.0).abs() < 1e-12);
        assert!((stat.accuracy - 5.0 / 7.0).abs() < 1e-12);
        assert_eq!(stat.auc, None);
    }

    #[test]
    fn zero_denominators_give_zero() {
        let stat = Stat::from_counts(counts(0, 0, 0, 0));
        assert_eq!(stat.tp_rate, 0.0);
        assert_eq!(stat.fp_rate, 0.0);
        assert_eq!(stat.tn_rate, 0.0);
        assert_eq!(stat.precision, 0.0);
        assert_eq!(stat.f_measure, 0.0);
        assert_eq!(stat.accuracy, 0.0);

        // No positives predicted: precision 0, so F-measure 0.
        let stat = Stat::from_counts(counts(0, 0, 5, 3));
        assert_eq!(stat.f_measure, 0.0);
        assert!((stat.tn_rate - 1.0).abs() < 1e-12);
    }

    #[test]
    fn accuracy_matches_counts() {
        let c = counts(7, 2, 9, 4);
        let stat = Stat::from_counts(c);
        assert_eq!(c.total(), 22);
        assert!((stat.accuracy - 16.0 / 22.0).abs() < 1e-12);
    }

    #[test]
    fn auc_perfect_and_inverted() {
        let labels = [true, true, false, false];
        assert!((auc(&[0.9, 0.8, 0.2, 0.1], &labels) - 1.0).abs() < 1e-12);
        assert!(auc(&[0.1, 0.2, 0.8, 0.9], &labels).abs() < 1e-12);
    }

    #[test]
    fn auc_all_tied_is_half() {
        let labels = [true, false, true, false];
        assert!((auc(&[0.5; 4], &labels) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn auc_known_value() {
        // Pairs (pos, neg): one of four is misordered.
        let scores = [0.9, 0.4, 0.6, 0.1];
        let labels = [true, true, false, false];
        assert!((auc(&scores, &labels) - 0.75).abs() < 1e-12);
    }

    #[test]
    fn auc_single_class_is_zero() {
        assert_eq!(auc(&[0.3, 0.7], &[true, true]), 0.0);
        assert_eq!(auc(&[0.3], &[true, false]), 0.0);
    }
}
