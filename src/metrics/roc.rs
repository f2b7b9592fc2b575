//! Receiver operating characteristic curves and the area under them.

use serde::{Deserialize, Serialize};

/// Bucket name for the collapsed binary ROC input of a label.
pub const BINARY_ROC: &str = "Binary_ROC";

/// Paired binary expectations and scores for one ROC bucket.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RocBucket {
    pub expected: Vec<u8>,
    pub actual: Vec<f64>,
}

impl RocBucket {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, expected: bool, actual: f64) {
        self.expected.push(u8::from(expected));
        self.actual.push(actual);
    }

    pub fn len(&self) -> usize {
        self.expected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.expected.is_empty()
    }

    pub fn curve(&self) -> Option<Vec<RocPoint>> {
        roc_curve(&self.expected, &self.actual)
    }

    pub fn auc(&self) -> Option<f64> {
        roc_auc_score(&self.expected, &self.actual)
    }
}

/// One operating point of a ROC curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RocPoint {
    pub false_positive_rate: f64,
    pub true_positive_rate: f64,
    /// Score at or above which samples count as positive. `None` for the origin.
    pub threshold: Option<f64>,
}

/// Compute the full ROC curve, one point per distinct score plus the origin.
///
/// Scores are visited from highest to lowest. Every intermediate point is kept.
///
/// # Returns
///
/// `None` unless both classes are present in `expected`.
///
/// # Example
///
/// ```
/// use imaging_eval::metrics::roc::roc_curve;
///
/// let curve = roc_curve(&[0, 0, 1, 1], &[0.1, 0.4, 0.35, 0.8]).unwrap();
/// assert_eq!(curve.len(), 5);
/// assert_eq!(curve[0].threshold, None);
/// assert_eq!(curve[4].true_positive_rate, 1.0);
/// ```
pub fn roc_curve(expected: &[u8], scores: &[f64]) -> Option<Vec<RocPoint>> {
    let n = expected.len().min(scores.len());
    let positives = expected[..n].iter().filter(|&&e| e != 0).count();
    let negatives = n - positives;
    if positives == 0 || negatives == 0 {
        return None;
    }

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]));

    let mut curve = Vec::with_capacity(n + 1);
    curve.push(RocPoint {
        false_positive_rate: 0.0,
        true_positive_rate: 0.0,
        threshold: None,
    });

    let (mut tp, mut fp) = (0usize, 0usize);
    for (position, &idx) in order.iter().enumerate() {
        if expected[idx] != 0 {
            tp += 1;
        } else {
            fp += 1;
        }
        // Emit once per distinct score, after all ties are counted.
        let last_of_score = order
            .get(position + 1)
            .map_or(true, |&next| scores[next] != scores[idx]);
        if last_of_score {
            curve.push(RocPoint {
                false_positive_rate: fp as f64 / negatives as f64,
                true_positive_rate: tp as f64 / positives as f64,
                threshold: Some(scores[idx]),
            });
        }
    }

    Some(curve)
}

/// Trapezoidal area under a curve ordered by ascending false-positive rate.
pub fn auc(curve: &[RocPoint]) -> f64 {
    curve
        .windows(2)
        .map(|pair| {
            let width = pair[1].false_positive_rate - pair[0].false_positive_rate;
            width * (pair[0].true_positive_rate + pair[1].true_positive_rate) / 2.0
        })
        .sum()
}

/// Area under the ROC curve, `None` when only one class is present.
///
/// # Example
///
/// ```
/// use imaging_eval::metrics::roc::roc_auc_score;
///
/// let score = roc_auc_score(&[0, 0, 1, 1], &[0.1, 0.4, 0.35, 0.8]).unwrap();
/// assert!((score - 0.75).abs() < 1e-10);
/// assert_eq!(roc_auc_score(&[1, 1], &[0.2, 0.9]), None);
/// ```
pub fn roc_auc_score(expected: &[u8], scores: &[f64]) -> Option<f64> {
    roc_curve(expected, scores).map(|curve| auc(&curve))
}
