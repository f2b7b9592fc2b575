//! # imaging-eval
//!
//! Scores machine-learning model outputs against human-annotated ground truth
//! for medical-imaging studies.
//!
//! Four modalities are evaluated:
//! - **Classification**: confusion matrix, Cohen's kappa, accuracy,
//!   sensitivity/specificity and ROC/AUC, with optional present/absent label maps
//! - **Continuous**: mean squared and mean absolute error, plus scatter data
//! - **Bounding box**: pixel-overlap Dice and IoU, and mean average precision
//!   from greedy matching at IoU thresholds 0.35 to 0.75
//! - **Segmentation**: aligned like the others, reported with null metrics
//!
//! Annotations may sit at study, series, instance, or frame level. Each level is
//! hashed into a [`GranularityKey`](granularity::GranularityKey) so predictions
//! can be paired with the annotation they answer.
//!
//! ## Quick Start
//!
//! ```rust
//! use imaging_eval::config::EvaluationConfig;
//! use imaging_eval::evaluator::evaluate;
//! use imaging_eval::loader::{load_dataset_from_str, load_output_from_str};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let dataset = load_dataset_from_str(r#"[
//!     {"studyInstanceUid": "A",
//!      "annotationData": {"classification": [{"key": "density", "value": "1"}]}},
//!     {"studyInstanceUid": "B",
//!      "annotationData": {"classification": [{"key": "density", "value": "3"}]}}
//! ]"#)?;
//! let output = load_output_from_str(r#"{"studies": [
//!     {"studyInstanceUID": "A",
//!      "classificationOutput": [{"key": "density", "output": {"1": 0.8, "2": 0.2}}]},
//!     {"studyInstanceUID": "B",
//!      "classificationOutput": [{"key": "density", "output": {"3": 0.6, "4": 0.4}}]}
//! ]}"#)?;
//!
//! let evaluation = evaluate(Some(&dataset), Some(&output), &EvaluationConfig::default())?;
//! let metrics = &evaluation.report.classification[0].output.as_ref().unwrap().general_metrics;
//! assert_eq!(metrics.accuracy, 1.0);
//! # Ok(())
//! # }
//! ```
//!
//! ## Output Format
//!
//! ```json
//! {
//!   "classification": [{"key": "density", "unknowns": [], "failures": [], "output": {...}}],
//!   "continuous": [],
//!   "boundingBox": [],
//!   "segmentation": []
//! }
//! ```

pub mod alignment;
pub mod binary_map;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod evaluator;
pub mod granularity;
pub mod loader;
pub mod matching;
pub mod metrics;
pub mod modality;
pub mod threshold;
pub mod types;

// Re-export commonly used types and functions
pub use alignment::{AlignmentEngine, Modality, ModalityKind};
pub use binary_map::BinaryClassificationMap;
pub use config::{parse_binary_maps, EvaluationConfig, PreviousEvaluation};
pub use diagnostics::Diagnostics;
pub use error::{EvalError, Result};
pub use evaluator::{evaluate, Evaluation};
pub use granularity::{Granularity, GranularityIndex, GranularityKey};
pub use loader::{
    load_dataset_from_file, load_dataset_from_str, load_output_from_file, load_output_from_str,
    load_previous_evaluation, write_report,
};
pub use types::{
    BoundingBox, Coordinate, Dataset, EvaluationReport, EvaluationWrapper, OutputDocument,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_compiles() {
        let bbox = BoundingBox::from_corners(0, 0, 10, 10);
        assert!(bbox.is_valid());
        assert_eq!(ModalityKind::BoundingBox.output_type(), "boundingBoxOutput");
    }
}
