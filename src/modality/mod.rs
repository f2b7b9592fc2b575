//! The four evaluation modalities, each an implementation of
//! [`Modality`](crate::alignment::Modality).

pub mod bounding_box;
pub mod classification;
pub mod continuous;
pub mod segmentation;

pub use bounding_box::{BoundingBoxMetrics, BoundingBoxModality, ScatterPlot};
pub use classification::{BinaryRegime, Classification, ClassificationMetrics, GeneralMetrics};
pub use continuous::{Continuous, ContinuousMetrics, ScatterSeries};
pub use segmentation::{Segmentation, SegmentationMetrics};
