//! Segmentation placeholder: labels are aligned like any other modality, but
//! every metric is reported as null.

use crate::alignment::{AlignedLabel, Modality, ModalityKind};
use crate::diagnostics::Diagnostics;
use crate::error::Result;
use crate::modality::bounding_box::BoundingBoxMetrics;
use serde_json::Value;

/// Segmentation reports share the bounding-box shape.
pub type SegmentationMetrics = BoundingBoxMetrics;

#[derive(Debug, Clone, Copy, Default)]
pub struct Segmentation;

impl Modality for Segmentation {
    type GroundTruth = Value;
    type Prediction = Value;
    type Metrics = SegmentationMetrics;

    const KIND: ModalityKind = ModalityKind::Segmentation;

    fn parse_ground_truth(&self, value: &Value) -> Result<Value> {
        Ok(value.clone())
    }

    fn transform_prediction(&self, raw: &Value) -> Result<Option<Value>> {
        Ok(Some(raw.clone()))
    }

    fn compute_metrics(
        &self,
        _aligned: &AlignedLabel<'_, Value, Value>,
        _diagnostics: &mut Diagnostics,
    ) -> Result<Option<SegmentationMetrics>> {
        Ok(Some(SegmentationMetrics::default()))
    }
}
