//! Binary classification metrics on a held-out split.

use serde::{Deserialize, Serialize};
use std::fmt;

pub const DEFAULT_CUTOFF: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    /// Undefined (`None`) when the evaluated rows contain a single class.
    pub roc_auc: Option<f64>,
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    /// Number of evaluated rows.
    pub support: usize,
}

impl Evaluation {
    /// Scores `probabilities` against `labels`, predicting the positive class at or above
    /// `cutoff`. Ratios with a zero denominator are reported as `0.0`.
    pub fn compute(labels: &[u8], probabilities: &[f64], cutoff: f64) -> Self {
        let mut tp = 0usize;
        let mut fp = 0usize;
        let mut tn = 0usize;
        let mut fn_ = 0usize;
        for (label, p) in labels.iter().zip(probabilities) {
            match (*label == 1, *p >= cutoff) {
                (true, true) => tp += 1,
                (false, true) => fp += 1,
                (false, false) => tn += 1,
                (true, false) => fn_ += 1,
            }
        }

        let ratio = |num: usize, den: usize| if den == 0 { 0.0 } else { num as f64 / den as f64 };
        let precision = ratio(tp, tp + fp);
        let recall = ratio(tp, tp + fn_);
        let f1 = if precision + recall == 0.0 {
            0.0
        } else {
            2.0 * precision * recall / (precision + recall)
        };

        Self {
            roc_auc: roc_auc(labels, probabilities),
            accuracy: ratio(tp + tn, tp + fp + tn + fn_),
            precision,
            recall,
            f1,
            support: labels.len().min(probabilities.len()),
        }
    }
}

impl fmt::Display for Evaluation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.roc_auc {
            Some(auc) => writeln!(f, "roc_auc:   {auc:.4}")?,
            None => writeln!(f, "roc_auc:   n/a (single class)")?,
        }
        writeln!(f, "accuracy:  {:.4}", self.accuracy)?;
        writeln!(f, "precision: {:.4}", self.precision)?;
        writeln!(f, "recall:    {:.4}", self.recall)?;
        writeln!(f, "f1:        {:.4}", self.f1)?;
        write!(f, "support:   {}", self.support)
    }
}

/// Area under the ROC curve via the rank-sum statistic, tied scores sharing their mean rank.
pub fn roc_auc(labels: &[u8], scores: &[f64]) -> Option<f64> {
    let n = labels.len().min(scores.len());
    let positives = labels[..n].iter().filter(|l| **l == 1).count();
    let negatives = n - positives;
    if positives == 0 || negatives == 0 {
        return None;
    }

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|a, b| scores[*a].total_cmp(&scores[*b]));

    let mut positive_rank_sum = 0.0;
    let mut start = 0;
    while start < n {
        let mut end = start + 1;
        while end < n && scores[order[end]] == scores[order[start]] {
            end += 1;
        }
        // Ranks are 1-based; the tie block covers ranks start+1..=end.
        let rank = (start + 1 + end) as f64 / 2.0;
        for &i in &order[start..end] {
            if labels[i] == 1 {
                positive_rank_sum += rank;
            }
        }
        start = end;
    }

    let p = positives as f64;
    Some((positive_rank_sum - p * (p + 1.0) / 2.0) / (p * negatives as f64))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_perfect_and_inverted_ranking() {
        let labels = [0, 0, 1, 1];
        assert_eq!(roc_auc(&labels, &[0.1, 0.2, 0.8, 0.9]), Some(1.0));
        assert_eq!(roc_auc(&labels, &[0.9, 0.8, 0.2, 0.1]), Some(0.0));
    }

    #[test]
    fn test_auc_with_ties() {
        assert_eq!(roc_auc(&[0, 1], &[0.5, 0.5]), Some(0.5));
        // One of four positive/negative pairs is misordered.
        assert_eq!(roc_auc(&[0, 1, 0, 1], &[0.1, 0.3, 0.35, 0.8]), Some(0.75));
    }

    #[test]
    fn test_single_class_has_no_auc() {
        assert_eq!(roc_auc(&[1, 1, 1], &[0.2, 0.5, 0.9]), None);
        assert_eq!(roc_auc(&[], &[]), None);
    }

    #[test]
    fn test_confusion_metrics() {
        let labels = [1, 1, 0, 0, 1];
        let probs = [0.9, 0.4, 0.6, 0.1, 0.7];
        let eval = Evaluation::compute(&labels, &probs, DEFAULT_CUTOFF);
        assert_eq!(eval.support, 5);
        assert!((eval.accuracy - 0.6).abs() < 1e-12);
        assert!((eval.precision - 2.0 / 3.0).abs() < 1e-12);
        assert!((eval.recall - 2.0 / 3.0).abs() < 1e-12);
        assert!((eval.f1 - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_zero_division_reports_zero() {
        let eval = Evaluation::compute(&[0, 0, 0], &[0.1, 0.2, 0.3], DEFAULT_CUTOFF);
        assert_eq!(eval.precision, 0.0);
        assert_eq!(eval.recall, 0.0);
        assert_eq!(eval.f1, 0.0);
        assert_eq!(eval.accuracy, 1.0);
        assert_eq!(eval.roc_auc, None);
        assert!(eval.to_string().contains("n/a"));
    }
}
