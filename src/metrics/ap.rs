//! Average Precision (AP) per comparison case and mean Average Precision (mAP).
//!
//! Each case is scored by greedy matching at several IoU thresholds; the
//! per-threshold precisions are averaged into the case's AP, and the case APs
//! are averaged into the mAP.

use crate::matching::match_boxes;
use crate::types::BoundingBox;

/// IoU thresholds used for mAP: 0.35 to 0.75 in steps of 0.05.
pub const DEFAULT_IOU_THRESHOLDS: [f64; 9] = [0.35, 0.40, 0.45, 0.50, 0.55, 0.60, 0.65, 0.70, 0.75];

/// Precision of one case at each threshold, in threshold order.
pub fn precision_at_thresholds(
    ground_truths: &[BoundingBox],
    predictions: &[BoundingBox],
    iou_thresholds: &[f64],
) -> Vec<f64> {
    iou_thresholds
        .iter()
        .map(|&threshold| match_boxes(ground_truths, predictions, threshold).precision())
        .collect()
}

/// Average precision of one case: the uniform mean of its per-threshold precisions.
///
/// # Example
///
/// ```
/// use imaging_eval::metrics::ap::{calculate_case_ap, DEFAULT_IOU_THRESHOLDS};
/// use imaging_eval::types::BoundingBox;
///
/// let boxes = vec![BoundingBox::from_corners(10, 10, 59, 59)];
/// let ap = calculate_case_ap(&boxes, &boxes, &DEFAULT_IOU_THRESHOLDS);
/// assert!((ap - 1.0).abs() < 1e-10);
/// ```
pub fn calculate_case_ap(
    ground_truths: &[BoundingBox],
    predictions: &[BoundingBox],
    iou_thresholds: &[f64],
) -> f64 {
    calculate_map(&precision_at_thresholds(ground_truths, predictions, iou_thresholds))
}

/// Calculate the mean of a list of AP values.
///
/// # Returns
///
/// Returns the mean (0.0 to 1.0), or 0.0 for an empty list.
///
/// # Example
///
/// ```
/// use imaging_eval::metrics::ap::calculate_map;
///
/// let case_aps = vec![0.8, 0.9, 0.75, 0.85];
/// let map = calculate_map(&case_aps);
/// assert!((map - 0.825).abs() < 1e-10);
/// ```
pub fn calculate_map(aps: &[f64]) -> f64 {
    if aps.is_empty() {
        return 0.0;
    }

    aps.iter().sum::<f64>() / aps.len() as f64
}

/// mAP over comparison cases of (ground-truth boxes, predicted boxes).
///
/// Returns `None` when there are no cases to average.
pub fn calculate_case_map<'a, I>(cases: I, iou_thresholds: &[f64]) -> Option<f64>
where
    I: IntoIterator<Item = (&'a [BoundingBox], &'a [BoundingBox])>,
{
    let aps: Vec<f64> = cases
        .into_iter()
        .map(|(ground_truths, predictions)| {
            calculate_case_ap(ground_truths, predictions, iou_thresholds)
        })
        .collect();

    (!aps.is_empty()).then(|| calculate_map(&aps))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_calculate_map() {
        let aps = vec![0.8, 0.9, 0.75, 0.85];
        assert!((calculate_map(&aps) - 0.825).abs() < 1e-10);
    }

    #[test]
    fn test_calculate_map_empty() {
        assert_eq!(calculate_map(&[]), 0.0);
    }

    #[test]
    fn test_empty_predictions_score_zero_everywhere() {
        let gt = vec![BoundingBox::from_corners(0, 0, 9, 9)];
        let precisions = precision_at_thresholds(&gt, &[], &DEFAULT_IOU_THRESHOLDS);
        assert_eq!(precisions, vec![0.0; 9]);
    }

    #[test]
    fn test_partial_overlap_passes_low_thresholds_only() {
        // 10x10 boxes shifted by 3 columns: IoU = 70 / 130 ≈ 0.538
        let gt = vec![BoundingBox::from_corners(0, 0, 9, 9)];
        let pred = vec![BoundingBox::from_corners(3, 0, 12, 9)];
        let precisions = precision_at_thresholds(&gt, &pred, &DEFAULT_IOU_THRESHOLDS);
        assert_eq!(precisions, vec![1.0, 1.0, 1.0, 1.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
        assert!((calculate_case_ap(&gt, &pred, &DEFAULT_IOU_THRESHOLDS) - 4.0 / 9.0).abs() < 1e-10);
    }

    #[test]
    fn test_case_map_averages_cases() {
        let boxes = vec![BoundingBox::from_corners(0, 0, 9, 9)];
        let cases = vec![(boxes.as_slice(), boxes.as_slice()), (boxes.as_slice(), &[][..])];
        let map = calculate_case_map(cases, &DEFAULT_IOU_THRESHOLDS).unwrap();
        assert!((map - 0.5).abs() < 1e-10);
        let no_cases = Vec::<(&[BoundingBox], &[BoundingBox])>::new();
        assert_eq!(calculate_case_map(no_cases, &DEFAULT_IOU_THRESHOLDS), None);
    }
}
