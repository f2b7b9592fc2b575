//! Greedy matching of predicted boxes to ground-truth boxes within one case.

use crate::metrics::iou::calculate_iou;
use crate::metrics::precision_recall::{calculate_precision_recall, PrecisionRecall};
use crate::types::BoundingBox;

/// The outcome for one ground-truth box.
#[derive(Debug, Clone, PartialEq)]
pub struct Match {
    pub ground_truth_index: usize,
    /// The matched prediction, `None` for a false negative.
    pub prediction_index: Option<usize>,
    /// IoU with the matched prediction, 0.0 when unmatched.
    pub iou: f64,
}

impl Match {
    pub fn is_true_positive(&self) -> bool {
        self.prediction_index.is_some()
    }
}

/// All matches of one case at one IoU threshold.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchResult {
    /// One entry per ground-truth box, in input order.
    pub matches: Vec<Match>,
    /// Predictions left without a ground truth (false positives), in input order.
    pub unmatched_predictions: Vec<usize>,
}

impl MatchResult {
    pub fn true_positives(&self) -> usize {
        self.matches.iter().filter(|m| m.is_true_positive()).count()
    }

    pub fn false_negatives(&self) -> usize {
        self.matches.len() - self.true_positives()
    }

    pub fn false_positives(&self) -> usize {
        self.unmatched_predictions.len()
    }

    pub fn precision_recall(&self) -> PrecisionRecall {
        calculate_precision_recall(
            self.true_positives(),
            self.false_positives(),
            self.false_negatives(),
        )
    }

    /// TP / (TP + FP), 0.0 when nothing was predicted.
    pub fn precision(&self) -> f64 {
        self.precision_recall().precision
    }
}

/// Match ground-truth boxes to predictions for a single case.
///
/// Uses greedy matching: ground-truth boxes are visited in input order, and
/// each takes the still-unmatched prediction with the highest IoU strictly above
/// `iou_threshold`. Ties go to the prediction that comes first in input order.
///
/// # Arguments
///
/// * `ground_truths` - Ground-truth boxes for this case
/// * `predictions` - Predicted boxes for this case
/// * `iou_threshold` - IoU a prediction must exceed to count as a match
///
/// # Example
///
/// ```
/// use imaging_eval::matching::match_boxes;
/// use imaging_eval::types::BoundingBox;
///
/// let gt = [BoundingBox::from_corners(0, 0, 9, 9)];
/// let pred = [
///     BoundingBox::from_corners(50, 50, 59, 59),
///     BoundingBox::from_corners(0, 0, 9, 9),
/// ];
/// let result = match_boxes(&gt, &pred, 0.5);
/// assert_eq!(result.matches[0].prediction_index, Some(1));
/// assert_eq!(result.unmatched_predictions, vec![0]);
/// ```
pub fn match_boxes(
    ground_truths: &[BoundingBox],
    predictions: &[BoundingBox],
    iou_threshold: f64,
) -> MatchResult {
    let mut matched = vec![false; predictions.len()];
    let mut matches = Vec::with_capacity(ground_truths.len());

    for (ground_truth_index, gt_box) in ground_truths.iter().enumerate() {
        let mut best: Option<(usize, f64)> = None;

        for (pred_idx, pred_box) in predictions.iter().enumerate() {
            if matched[pred_idx] {
                continue; // Already matched
            }

            let iou = calculate_iou(gt_box, pred_box);
            if iou > iou_threshold && best.map_or(true, |(_, best_iou)| iou > best_iou) {
                best = Some((pred_idx, iou));
            }
        }

        if let Some((pred_idx, _)) = best {
            matched[pred_idx] = true;
        }
        matches.push(Match {
            ground_truth_index,
            prediction_index: best.map(|(pred_idx, _)| pred_idx),
            iou: best.map_or(0.0, |(_, iou)| iou),
        });
    }

    let unmatched_predictions = matched
        .iter()
        .enumerate()
        .filter(|(_, &is_matched)| !is_matched)
        .map(|(pred_idx, _)| pred_idx)
        .collect();

    MatchResult {
        matches,
        unmatched_predictions,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_perfect_match() {
        let boxes = vec![BoundingBox::from_corners(10, 10, 59, 59)];
        let result = match_boxes(&boxes, &boxes, 0.5);
        assert_eq!(result.true_positives(), 1);
        assert!(result.matches[0].iou > 0.99);
        assert_eq!(result.precision(), 1.0);
    }

    #[test]
    fn test_no_match() {
        let gt = vec![BoundingBox::from_corners(10, 10, 59, 59)];
        let pred = vec![BoundingBox::from_corners(200, 200, 249, 249)];
        let result = match_boxes(&gt, &pred, 0.5);
        assert_eq!(result.false_negatives(), 1);
        assert_eq!(result.false_positives(), 1);
        assert_eq!(result.precision(), 0.0);
    }

    #[test]
    fn test_threshold_is_exclusive() {
        // IoU exactly 0.5: 10x10 vs 10x20 sharing the top half.
        let gt = vec![BoundingBox::from_corners(0, 0, 9, 9)];
        let pred = vec![BoundingBox::from_corners(0, 0, 9, 19)];
        assert_eq!(match_boxes(&gt, &pred, 0.5).true_positives(), 0);
        assert_eq!(match_boxes(&gt, &pred, 0.45).true_positives(), 1);
    }

    #[test]
    fn test_highest_iou_wins() {
        let gt = vec![BoundingBox::from_corners(0, 0, 9, 9)];
        let pred = vec![
            BoundingBox::from_corners(2, 0, 11, 9),
            BoundingBox::from_corners(1, 0, 10, 9),
        ];
        let result = match_boxes(&gt, &pred, 0.3);
        assert_eq!(result.matches[0].prediction_index, Some(1));
        assert_eq!(result.unmatched_predictions, vec![0]);
    }

    #[test]
    fn test_ties_go_to_first_prediction() {
        let gt = vec![BoundingBox::from_corners(0, 0, 9, 9)];
        let pred = vec![
            BoundingBox::from_corners(0, 0, 9, 9),
            BoundingBox::from_corners(0, 0, 9, 9),
        ];
        let result = match_boxes(&gt, &pred, 0.5);
        assert_eq!(result.matches[0].prediction_index, Some(0));
        assert_eq!(result.false_positives(), 1);
    }

    #[test]
    fn test_prediction_matched_once() {
        let gt = vec![
            BoundingBox::from_corners(0, 0, 9, 9),
            BoundingBox::from_corners(0, 0, 9, 9),
        ];
        let pred = vec![BoundingBox::from_corners(0, 0, 9, 9)];
        let result = match_boxes(&gt, &pred, 0.5);
        assert_eq!(result.true_positives(), 1);
        assert_eq!(result.false_negatives(), 1);
        assert_eq!(result.precision(), 1.0);
    }

    #[test]
    fn test_no_ground_truth_all_false_positives() {
        let pred = vec![BoundingBox::from_corners(0, 0, 9, 9)];
        let result = match_boxes(&[], &pred, 0.5);
        assert_eq!(result.false_positives(), 1);
        assert_eq!(result.precision(), 0.0);
    }
}
