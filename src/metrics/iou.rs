//! Intersection over Union (IoU) calculation.

use crate::types::{pixel_span, BoundingBox};

/// Calculate the Intersection over Union (IoU) between two bounding boxes.
///
/// Both corners are inclusive pixels, so the intersection width is
/// `right - left + 1`, clamped at zero.
///
/// # Arguments
///
/// * `bbox1` - First bounding box
/// * `bbox2` - Second bounding box
///
/// # Returns
///
/// Returns a value between 0.0 (no overlap) and 1.0 (perfect overlap).
///
/// # Example
///
/// ```
/// use imaging_eval::metrics::iou::calculate_iou;
/// use imaging_eval::types::BoundingBox;
///
/// let bbox1 = BoundingBox::from_corners(0, 0, 9, 9);
/// let bbox2 = BoundingBox::from_corners(5, 5, 14, 14);
/// let iou = calculate_iou(&bbox1, &bbox2);
/// assert!(iou > 0.0 && iou < 1.0);
/// ```
pub fn calculate_iou(bbox1: &BoundingBox, bbox2: &BoundingBox) -> f64 {
    let intersection_area = intersection_area(bbox1, bbox2);
    if intersection_area == 0 {
        return 0.0;
    }

    let union_area = bbox1
        .area()
        .saturating_add(bbox2.area())
        .saturating_sub(intersection_area);

    // Avoid division by zero
    if union_area <= 0 {
        return 0.0;
    }

    intersection_area as f64 / union_area as f64
}

/// Pixels covered by both boxes.
pub fn intersection_area(bbox1: &BoundingBox, bbox2: &BoundingBox) -> i64 {
    let x_left = bbox1.top_left.x.max(bbox2.top_left.x);
    let y_top = bbox1.top_left.y.max(bbox2.top_left.y);
    let x_right = bbox1.bottom_right.x.min(bbox2.bottom_right.x);
    let y_bottom = bbox1.bottom_right.y.min(bbox2.bottom_right.y);

    pixel_span(x_left, x_right).saturating_mul(pixel_span(y_top, y_bottom))
}

/// Calculate IoU matrix between two sets of bounding boxes.
///
/// # Returns
///
/// Returns a 2D vector where `result[i][j]` is the IoU between `bboxes1[i]` and `bboxes2[j]`.
///
/// # Example
///
/// ```
/// use imaging_eval::metrics::iou::calculate_iou_matrix;
/// use imaging_eval::types::BoundingBox;
///
/// let bboxes1 = vec![BoundingBox::from_corners(0, 0, 9, 9)];
/// let bboxes2 = vec![BoundingBox::from_corners(5, 5, 14, 14)];
/// let iou_matrix = calculate_iou_matrix(&bboxes1, &bboxes2);
/// assert_eq!(iou_matrix.len(), 1);
/// assert_eq!(iou_matrix[0].len(), 1);
/// ```
pub fn calculate_iou_matrix(bboxes1: &[BoundingBox], bboxes2: &[BoundingBox]) -> Vec<Vec<f64>> {
    bboxes1
        .iter()
        .map(|bbox1| {
            bboxes2
                .iter()
                .map(|bbox2| calculate_iou(bbox1, bbox2))
                .collect()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_boxes() {
        let bbox1 = BoundingBox::from_corners(0, 0, 9, 9);
        let bbox2 = BoundingBox::from_corners(0, 0, 9, 9);
        let iou = calculate_iou(&bbox1, &bbox2);
        assert!((iou - 1.0).abs() < 1e-10);
    }

    #[test]
    fn test_no_overlap() {
        let bbox1 = BoundingBox::from_corners(0, 0, 9, 9);
        let bbox2 = BoundingBox::from_corners(20, 20, 29, 29);
        assert_eq!(calculate_iou(&bbox1, &bbox2), 0.0);
    }

    #[test]
    fn test_partial_overlap() {
        let bbox1 = BoundingBox::from_corners(0, 0, 9, 9);
        let bbox2 = BoundingBox::from_corners(5, 5, 14, 14);
        let iou = calculate_iou(&bbox1, &bbox2);

        // Intersection: 5x5 = 25
        // Union: 100 + 100 - 25 = 175
        assert!((iou - 25.0 / 175.0).abs() < 1e-10);
    }

    #[test]
    fn test_touching_edge_counts_one_pixel_column() {
        let bbox1 = BoundingBox::from_corners(0, 0, 4, 4);
        let bbox2 = BoundingBox::from_corners(4, 0, 8, 4);
        assert_eq!(intersection_area(&bbox1, &bbox2), 5);
    }

    #[test]
    fn test_degenerate_box() {
        let inverted = BoundingBox::from_corners(10, 10, 5, 5);
        let normal = BoundingBox::from_corners(0, 0, 20, 20);
        assert_eq!(inverted.area(), 0);
        assert_eq!(calculate_iou(&inverted, &normal), 0.0);
        assert_eq!(calculate_iou(&inverted, &inverted), 0.0);
    }

    #[test]
    fn test_iou_matrix() {
        let bboxes1 = vec![
            BoundingBox::from_corners(0, 0, 9, 9),
            BoundingBox::from_corners(5, 5, 14, 14),
        ];
        let bboxes2 = vec![BoundingBox::from_corners(0, 0, 9, 9)];

        let matrix = calculate_iou_matrix(&bboxes1, &bboxes2);
        assert_eq!(matrix.len(), 2);
        assert_eq!(matrix[0].len(), 1);
        assert!((matrix[0][0] - 1.0).abs() < 1e-10);
    }
}
