//! Pixel-level overlap between all ground-truth and all predicted boxes of a case.
//!
//! Boxes on the same side are OR-ed into one mask, so overlapping boxes are
//! never double counted.

use crate::types::BoundingBox;

/// Pixels covered by one box as half-open ranges, clipped at the image origin.
#[derive(Debug, Clone, Copy)]
struct Region {
    x: (i64, i64),
    y: (i64, i64),
}

impl Region {
    fn from_box(bbox: &BoundingBox) -> Option<Self> {
        if !bbox.is_valid() || bbox.bottom_right.x < 0 || bbox.bottom_right.y < 0 {
            return None;
        }
        Some(Self {
            x: (bbox.top_left.x.max(0), bbox.bottom_right.x.saturating_add(1)),
            y: (bbox.top_left.y.max(0), bbox.bottom_right.y.saturating_add(1)),
        })
    }

    fn covers(&self, x: (i64, i64), y: (i64, i64)) -> bool {
        self.x.0 <= x.0 && x.1 <= self.x.1 && self.y.0 <= y.0 && y.1 <= self.y.1
    }
}

fn regions(boxes: &[BoundingBox]) -> Vec<Region> {
    boxes.iter().filter_map(Region::from_box).collect()
}

/// Sorted, deduplicated cell boundaries along one axis.
fn edges(bounds: impl Iterator<Item = (i64, i64)>) -> Vec<i64> {
    let mut edges: Vec<i64> = bounds.flat_map(|(start, end)| [start, end]).collect();
    edges.sort_unstable();
    edges.dedup();
    edges
}

/// Pixel counts for one comparison case.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelOverlap {
    pub ground_truth_area: u64,
    pub prediction_area: u64,
    pub intersection_area: u64,
    pub union_area: u64,
}

impl PixelOverlap {
    /// Compare the pixel masks of both box lists.
    ///
    /// The masks are evaluated on the grid of box edges rather than pixel by
    /// pixel, so memory stays proportional to the number of boxes whatever the
    /// coordinates. Areas saturate at `u64::MAX`.
    ///
    /// # Example
    ///
    /// ```
    /// use imaging_eval::metrics::overlap::PixelOverlap;
    /// use imaging_eval::types::BoundingBox;
    ///
    /// let gt = [BoundingBox::from_corners(0, 0, 9, 9)];
    /// let pred = [BoundingBox::from_corners(0, 0, 4, 9)];
    /// let overlap = PixelOverlap::measure(&gt, &pred);
    /// assert_eq!(overlap.intersection_area, 50);
    /// assert_eq!(overlap.dice(), Some(100.0 / 150.0));
    /// ```
    pub fn measure(ground_truths: &[BoundingBox], predictions: &[BoundingBox]) -> Self {
        let ground_truths = regions(ground_truths);
        let predictions = regions(predictions);
        let all = || ground_truths.iter().chain(&predictions);
        let xs = edges(all().map(|region| region.x));
        let ys = edges(all().map(|region| region.y));

        let mut overlap = Self {
            ground_truth_area: 0,
            prediction_area: 0,
            intersection_area: 0,
            union_area: 0,
        };
        for x in xs.windows(2).map(|pair| (pair[0], pair[1])) {
            for y in ys.windows(2).map(|pair| (pair[0], pair[1])) {
                let in_gt = ground_truths.iter().any(|region| region.covers(x, y));
                let in_pred = predictions.iter().any(|region| region.covers(x, y));
                if !in_gt && !in_pred {
                    continue;
                }

                // Both edges are non-negative, so the spans fit in u64.
                let cell = ((x.1 - x.0) as u64).saturating_mul((y.1 - y.0) as u64);
                let add = |total: &mut u64, hit: bool| {
                    if hit {
                        *total = total.saturating_add(cell);
                    }
                };
                add(&mut overlap.ground_truth_area, in_gt);
                add(&mut overlap.prediction_area, in_pred);
                add(&mut overlap.intersection_area, in_gt && in_pred);
                add(&mut overlap.union_area, true);
            }
        }
        overlap
    }

    /// `2·|∩| / (|gt| + |pred|)`, `None` when both masks are empty.
    pub fn dice(&self) -> Option<f64> {
        let total = self.ground_truth_area + self.prediction_area;
        (total > 0).then(|| 2.0 * self.intersection_area as f64 / total as f64)
    }

    /// `|∩| / |∪|`, `None` when both masks are empty.
    pub fn iou(&self) -> Option<f64> {
        (self.union_area > 0).then(|| self.intersection_area as f64 / self.union_area as f64)
    }
}
