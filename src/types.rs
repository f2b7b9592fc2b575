//! Core data types: pixel geometry, the dataset and output documents, and the
//! evaluation report.

use crate::error::{EvalError, Result};
use crate::granularity::Granularity;
use crate::modality::bounding_box::BoundingBoxMetrics;
use crate::modality::classification::ClassificationMetrics;
use crate::modality::continuous::ContinuousMetrics;
use crate::modality::segmentation::SegmentationMetrics;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A pixel position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Coordinate {
    pub x: i64,
    pub y: i64,
}

impl Coordinate {
    pub fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }

    fn from_json(value: &Value, corner: &str) -> Result<Self> {
        let axis = |name: &str| -> Result<i64> {
            let field = value.get(name).ok_or_else(|| {
                EvalError::MalformedGeometry(format!("{corner} does not have an {name} value"))
            })?;
            field
                .as_i64()
                .or_else(|| field.as_f64().filter(|v| v.is_finite()).map(|v| v.round() as i64))
                .ok_or_else(|| {
                    EvalError::MalformedGeometry(format!(
                        "{corner}.{name} is not a number: {field}"
                    ))
                })
        };
        Ok(Self::new(axis("x")?, axis("y")?))
    }
}

/// An axis-aligned box in pixel space, both corners inclusive.
///
/// A box whose bottom-right corner lies above or left of its top-left corner
/// is degenerate: it has zero area and rasterizes to nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BoundingBox {
    #[serde(rename = "top_left_hand_corner")]
    pub top_left: Coordinate,
    #[serde(rename = "bottom_right_hand_corner")]
    pub bottom_right: Coordinate,
}

impl BoundingBox {
    /// Create a new bounding box from its corners.
    pub fn new(top_left: Coordinate, bottom_right: Coordinate) -> Self {
        Self {
            top_left,
            bottom_right,
        }
    }

    /// Shorthand for `new` with raw corner coordinates.
    pub fn from_corners(x1: i64, y1: i64, x2: i64, y2: i64) -> Self {
        Self::new(Coordinate::new(x1, y1), Coordinate::new(x2, y2))
    }

    /// Parse `{ "top_left_hand_corner": {x, y}, "bottom_right_hand_corner": {x, y} }`.
    ///
    /// # Errors
    ///
    /// Returns [`EvalError::MalformedGeometry`] when a corner or an axis is
    /// missing or not numeric.
    pub fn from_json(value: &Value) -> Result<Self> {
        let corner = |name: &str| -> Result<Coordinate> {
            let data = value.get(name).ok_or_else(|| {
                EvalError::MalformedGeometry(format!(
                    "bounding box does not have a {name} field: {value}"
                ))
            })?;
            Coordinate::from_json(data, name)
        };
        Ok(Self::new(
            corner("top_left_hand_corner")?,
            corner("bottom_right_hand_corner")?,
        ))
    }

    /// Width in pixels, 0 for degenerate boxes.
    pub fn width(&self) -> i64 {
        pixel_span(self.top_left.x, self.bottom_right.x)
    }

    /// Height in pixels, 0 for degenerate boxes.
    pub fn height(&self) -> i64 {
        pixel_span(self.top_left.y, self.bottom_right.y)
    }

    /// Number of pixels covered, counting both corners. Saturates at `i64::MAX`.
    pub fn area(&self) -> i64 {
        self.width().saturating_mul(self.height())
    }

    /// Check that the box covers at least one pixel.
    pub fn is_valid(&self) -> bool {
        self.width() > 0 && self.height() > 0
    }
}

/// Inclusive pixel count between two corner coordinates, 0 when reversed.
pub(crate) fn pixel_span(start: i64, end: i64) -> i64 {
    end.saturating_sub(start).saturating_add(1).max(0)
}

/// One ground-truth annotation: a label key and its value.
///
/// The value is a string label (classification), a number (continuous), or a
/// list of geometry objects (bounding box, segmentation).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationEntry {
    pub key: String,
    #[serde(default)]
    pub value: Value,
}

/// Annotations attached to one level of the study hierarchy, grouped by modality.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotationBlock {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classification: Option<Vec<AnnotationEntry>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub continuous: Option<Vec<AnnotationEntry>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bounding_box: Option<Vec<AnnotationEntry>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub segmentation: Option<Vec<AnnotationEntry>>,
}

/// `annotationData` is usually one block, but older datasets carry a list of them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnnotationData {
    Many(Vec<AnnotationBlock>),
    One(AnnotationBlock),
}

impl AnnotationData {
    pub fn blocks(&self) -> &[AnnotationBlock] {
        match self {
            AnnotationData::Many(blocks) => blocks,
            AnnotationData::One(block) => std::slice::from_ref(block),
        }
    }
}

impl From<AnnotationBlock> for AnnotationData {
    fn from(block: AnnotationBlock) -> Self {
        AnnotationData::One(block)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Frame {
    #[serde(default)]
    pub frame_index: Option<Value>,
    #[serde(default)]
    pub annotation_data: Option<AnnotationData>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Instance {
    #[serde(default, alias = "sopInstanceUID")]
    pub sop_instance_uid: Option<String>,
    #[serde(default)]
    pub annotation_data: Option<AnnotationData>,
    #[serde(default)]
    pub frames: Option<Vec<Frame>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Series {
    #[serde(default, alias = "seriesInstanceUID")]
    pub series_instance_uid: Option<String>,
    #[serde(default)]
    pub annotation_data: Option<AnnotationData>,
    #[serde(default)]
    pub instances: Option<Vec<Instance>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Study {
    #[serde(alias = "studyInstanceUID")]
    pub study_instance_uid: String,
    #[serde(default)]
    pub annotation_data: Option<AnnotationData>,
    #[serde(default)]
    pub series: Option<Vec<Series>>,
}

impl Study {
    pub fn new(study_instance_uid: impl Into<String>) -> Self {
        Self {
            study_instance_uid: study_instance_uid.into(),
            ..Self::default()
        }
    }
}

/// The ground-truth dataset: an ordered list of studies.
pub type Dataset = Vec<Study>;

/// One model output for one label key at one granularity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputEntry {
    pub key: String,
    /// `null` means the model explicitly declined to predict (unknown).
    #[serde(default)]
    pub output: Value,
    #[serde(
        default,
        rename = "seriesInstanceUID",
        alias = "seriesInstanceUid",
        skip_serializing_if = "Option::is_none"
    )]
    pub series_instance_uid: Option<String>,
    #[serde(
        default,
        rename = "sopInstanceUID",
        alias = "sopInstanceUid",
        skip_serializing_if = "Option::is_none"
    )]
    pub sop_instance_uid: Option<String>,
    #[serde(default, rename = "frameIndex", skip_serializing_if = "Option::is_none")]
    pub frame_index: Option<Value>,
}

impl OutputEntry {
    /// A study-level output.
    pub fn new(key: impl Into<String>, output: Value) -> Self {
        Self {
            key: key.into(),
            output,
            series_instance_uid: None,
            sop_instance_uid: None,
            frame_index: None,
        }
    }
}

/// All outputs of the model for one study.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutputStudy {
    #[serde(rename = "studyInstanceUID", alias = "studyInstanceUid")]
    pub study_instance_uid: String,
    #[serde(default, rename = "classificationOutput", skip_serializing_if = "Option::is_none")]
    pub classification_output: Option<Vec<OutputEntry>>,
    #[serde(default, rename = "continuousOutput", skip_serializing_if = "Option::is_none")]
    pub continuous_output: Option<Vec<OutputEntry>>,
    #[serde(default, rename = "boundingBoxOutput", skip_serializing_if = "Option::is_none")]
    pub bounding_box_output: Option<Vec<OutputEntry>>,
    #[serde(default, rename = "segmentationOutput", skip_serializing_if = "Option::is_none")]
    pub segmentation_output: Option<Vec<OutputEntry>>,
}

impl OutputStudy {
    pub fn new(study_instance_uid: impl Into<String>) -> Self {
        Self {
            study_instance_uid: study_instance_uid.into(),
            ..Self::default()
        }
    }
}

/// The model output document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutputDocument {
    #[serde(default)]
    pub studies: Vec<OutputStudy>,
}

/// Per-label result of one modality.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationWrapper<M> {
    pub key: String,
    /// Granularities the model explicitly answered with `null`.
    pub unknowns: Vec<Granularity>,
    /// Annotated granularities with no output entry at all.
    pub failures: Vec<Granularity>,
    /// `None` when the label has no comparable ground-truth/prediction pair.
    pub output: Option<M>,
}

/// The full report of one evaluation run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationReport {
    #[serde(default)]
    pub classification: Vec<EvaluationWrapper<ClassificationMetrics>>,
    #[serde(default)]
    pub continuous: Vec<EvaluationWrapper<ContinuousMetrics>>,
    #[serde(default)]
    pub bounding_box: Vec<EvaluationWrapper<BoundingBoxMetrics>>,
    #[serde(default)]
    pub segmentation: Vec<EvaluationWrapper<SegmentationMetrics>>,
}
