//! Object-detection metrics: pixel-overlap Dice and IoU, and greedy
//! multi-threshold mean average precision.

use crate::alignment::{AlignedLabel, Correspondence, Modality, ModalityKind};
use crate::config::PreviousEvaluation;
use crate::diagnostics::Diagnostics;
use crate::error::{EvalError, Result};
use crate::metrics::ap::{calculate_case_map, DEFAULT_IOU_THRESHOLDS};
use crate::metrics::overlap::PixelOverlap;
use crate::types::BoundingBox;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

/// `(ground-truth area, predicted area)` per comparison case.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScatterPlot {
    pub data: Option<Vec<[u64; 2]>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoundingBoxMetrics {
    pub mean_dice_coefficient: Option<f64>,
    pub mean_average_precision: Option<f64>,
    pub mean_intersection_over_union: Option<f64>,
    pub scatter_plot: ScatterPlot,
}

/// Parse a list of geometry objects; `null` is an empty list.
///
/// # Errors
///
/// Returns [`EvalError::MalformedGeometry`] for a box with missing corners and
/// `not_a_list` for anything that is not a list.
pub fn parse_boxes(
    value: &Value,
    not_a_list: impl FnOnce(String) -> EvalError,
) -> Result<Vec<BoundingBox>> {
    match value {
        Value::Null => Ok(Vec::new()),
        Value::Array(items) => items.iter().map(BoundingBox::from_json).collect(),
        other => Err(not_a_list(format!("bounding boxes must be a list, got {other}"))),
    }
}

fn mean(values: &[f64]) -> Option<f64> {
    (!values.is_empty()).then(|| values.iter().sum::<f64>() / values.len() as f64)
}

/// The bounding-box modality.
///
/// Predictions at a finer granularity than their annotation roll up into it,
/// and every box attributed to the same annotation joins one list.
#[derive(Debug, Clone, Default)]
pub struct BoundingBoxModality<'a> {
    previous: Option<&'a PreviousEvaluation>,
}

impl<'a> BoundingBoxModality<'a> {
    pub fn new(previous: Option<&'a PreviousEvaluation>) -> Self {
        Self { previous }
    }
}

impl Modality for BoundingBoxModality<'_> {
    type GroundTruth = Vec<BoundingBox>;
    type Prediction = Vec<BoundingBox>;
    type Metrics = BoundingBoxMetrics;

    const KIND: ModalityKind = ModalityKind::BoundingBox;

    fn correspondence(&self) -> Correspondence {
        Correspondence::RollUp
    }

    fn parse_ground_truth(&self, value: &Value) -> Result<Vec<BoundingBox>> {
        parse_boxes(value, EvalError::InvalidGroundTruth)
    }

    fn transform_prediction(&self, raw: &Value) -> Result<Option<Vec<BoundingBox>>> {
        parse_boxes(raw, EvalError::InvalidOutput).map(Some)
    }

    fn merge_predictions(&self, into: &mut Vec<BoundingBox>, next: Vec<BoundingBox>) {
        into.extend(next);
    }

    fn compute_metrics(
        &self,
        aligned: &AlignedLabel<'_, Vec<BoundingBox>, Vec<BoundingBox>>,
        diagnostics: &mut Diagnostics,
    ) -> Result<Option<BoundingBoxMetrics>> {
        let mut cases = Vec::new();
        for (_, ground_truths, predictions) in aligned.pairs() {
            if ground_truths.is_empty() && predictions.is_empty() {
                diagnostics.skip_true_negative();
                continue;
            }
            cases.push((ground_truths.as_slice(), predictions.as_slice()));
        }

        let mean_average_precision =
            calculate_case_map(cases.iter().copied(), &DEFAULT_IOU_THRESHOLDS);

        let cached = self
            .previous
            .and_then(|previous| previous.bounding_box_for(aligned.label));
        if let Some(cached) = cached {
            debug!(label = aligned.label, "reusing cached overlap metrics");
            diagnostics.record_cache_hit();
            return Ok(Some(BoundingBoxMetrics {
                mean_average_precision,
                ..cached.clone()
            }));
        }

        let mut dice = Vec::with_capacity(cases.len());
        let mut iou = Vec::with_capacity(cases.len());
        let mut scatter = Vec::with_capacity(cases.len());
        for &(ground_truths, predictions) in &cases {
            let overlap = PixelOverlap::measure(ground_truths, predictions);
            scatter.push([overlap.ground_truth_area, overlap.prediction_area]);
            match (overlap.dice(), overlap.iou()) {
                (Some(case_dice), Some(case_iou)) => {
                    dice.push(case_dice);
                    iou.push(case_iou);
                }
                _ => diagnostics.skip_zero_area(),
            }
        }

        debug!(
            label = aligned.label,
            cases = cases.len(),
            scored = dice.len(),
            "bounding box metrics"
        );

        Ok(Some(BoundingBoxMetrics {
            mean_dice_coefficient: mean(&dice),
            mean_average_precision,
            mean_intersection_over_union: mean(&iou),
            scatter_plot: ScatterPlot { data: Some(scatter) },
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_boxes() {
        let modality = BoundingBoxModality::default();
        let boxes = modality
            .parse_ground_truth(&json!([{
                "top_left_hand_corner": {"x": 1, "y": 2},
                "bottom_right_hand_corner": {"x": 10, "y": 20}
            }]))
            .unwrap();
        assert_eq!(boxes, vec![BoundingBox::from_corners(1, 2, 10, 20)]);
        assert!(modality.parse_ground_truth(&Value::Null).unwrap().is_empty());
    }

    #[test]
    fn test_missing_corner_is_malformed() {
        let modality = BoundingBoxModality::default();
        let result =
            modality.transform_prediction(&json!([{"top_left_hand_corner": {"x": 1, "y": 2}}]));
        assert!(matches!(result, Err(EvalError::MalformedGeometry(_))));
    }

    #[test]
    fn test_non_list_is_rejected() {
        let modality = BoundingBoxModality::default();
        assert!(matches!(
            modality.transform_prediction(&json!("box")),
            Err(EvalError::InvalidOutput(_))
        ));
        assert!(matches!(
            modality.parse_ground_truth(&json!(3)),
            Err(EvalError::InvalidGroundTruth(_))
        ));
    }

    #[test]
    fn test_merge_concatenates() {
        let modality = BoundingBoxModality::default();
        let mut boxes = vec![BoundingBox::from_corners(0, 0, 1, 1)];
        modality.merge_predictions(&mut boxes, vec![BoundingBox::from_corners(5, 5, 6, 6)]);
        assert_eq!(boxes.len(), 2);
    }

    #[test]
    fn test_null_metrics_shape() {
        let value = serde_json::to_value(BoundingBoxMetrics::default()).unwrap();
        assert_eq!(
            value,
            json!({
                "meanDiceCoefficient": null,
                "meanAveragePrecision": null,
                "meanIntersectionOverUnion": null,
                "scatterPlot": {"data": null}
            })
        );
    }
}
