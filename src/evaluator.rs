//! Main evaluation orchestrator: runs every modality over the same documents.

use crate::alignment::{AlignmentEngine, Modality, ModalityOutcome};
use crate::config::EvaluationConfig;
use crate::diagnostics::Diagnostics;
use crate::error::Result;
use crate::modality::{BoundingBoxModality, Classification, Continuous, Segmentation};
use crate::types::{Dataset, EvaluationReport, EvaluationWrapper, OutputDocument};
use tracing::{info, instrument};

/// Result of a run: the report plus what was skipped to build it.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub report: EvaluationReport,
    pub diagnostics: Diagnostics,
}

/// Evaluate model outputs against a dataset for every modality.
///
/// Each modality is aligned independently. A label key only appears in a
/// modality's section when the model answered it (and, except for continuous
/// outputs, when it is annotated).
///
/// # Arguments
///
/// * `dataset` - Ground-truth studies
/// * `output` - Model output document
/// * `config` - Threshold, binary maps, and the optional previous report
///
/// # Errors
///
/// Returns [`EvalError::MissingInput`](crate::error::EvalError::MissingInput)
/// when either document is absent, and any conversion error raised while
/// reading annotation or output values.
///
/// # Example
///
/// ```
/// use imaging_eval::config::EvaluationConfig;
/// use imaging_eval::evaluator::evaluate;
/// use imaging_eval::loader::{load_dataset_from_str, load_output_from_str};
///
/// let dataset = load_dataset_from_str(
///     r#"[{"studyInstanceUid": "A",
///          "annotationData": {"classification": [{"key": "finding", "value": "1"}]}}]"#,
/// ).unwrap();
/// let output = load_output_from_str(
///     r#"{"studies": [{"studyInstanceUID": "A",
///          "classificationOutput": [{"key": "finding", "output": {"1": 0.9}}]}]}"#,
/// ).unwrap();
///
/// let evaluation = evaluate(Some(&dataset), Some(&output), &EvaluationConfig::default()).unwrap();
/// assert_eq!(evaluation.report.classification.len(), 1);
/// assert!(evaluation.report.bounding_box.is_empty());
/// ```
#[instrument(skip_all, fields(threshold = config.threshold()))]
pub fn evaluate(
    dataset: Option<&Dataset>,
    output: Option<&OutputDocument>,
    config: &EvaluationConfig,
) -> Result<Evaluation> {
    let mut diagnostics = Diagnostics::new();

    let classification = run(dataset, output, Classification::new(config), &mut diagnostics)?;
    let continuous = run(dataset, output, Continuous, &mut diagnostics)?;
    let bounding_box = run(
        dataset,
        output,
        BoundingBoxModality::new(config.previous()),
        &mut diagnostics,
    )?;
    let segmentation = run(dataset, output, Segmentation, &mut diagnostics)?;

    info!(
        classification = classification.len(),
        continuous = continuous.len(),
        bounding_box = bounding_box.len(),
        segmentation = segmentation.len(),
        "{}",
        diagnostics.summary_string()
    );

    Ok(Evaluation {
        report: EvaluationReport {
            classification,
            continuous,
            bounding_box,
            segmentation,
        },
        diagnostics,
    })
}

/// Align and score one modality, folding its diagnostics into the run total.
fn run<M: Modality>(
    dataset: Option<&Dataset>,
    output: Option<&OutputDocument>,
    modality: M,
    diagnostics: &mut Diagnostics,
) -> Result<Vec<EvaluationWrapper<M::Metrics>>> {
    let ModalityOutcome {
        wrappers,
        diagnostics: modality_diagnostics,
    } = AlignmentEngine::new(dataset, output, modality)?.evaluate()?;
    *diagnostics += modality_diagnostics;
    Ok(wrappers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EvalError;
    use crate::types::{AnnotationBlock, AnnotationEntry, OutputEntry, OutputStudy, Study};
    use serde_json::json;

    #[test]
    fn test_missing_inputs() {
        let config = EvaluationConfig::default();
        assert!(matches!(
            evaluate(None, Some(&OutputDocument::default()), &config),
            Err(EvalError::MissingInput(_))
        ));
        assert!(matches!(
            evaluate(Some(&Vec::new()), None, &config),
            Err(EvalError::MissingInput(_))
        ));
    }

    #[test]
    fn test_empty_documents_give_empty_report() {
        let evaluation = evaluate(
            Some(&Vec::new()),
            Some(&OutputDocument::default()),
            &EvaluationConfig::default(),
        )
        .unwrap();
        assert_eq!(evaluation.report, EvaluationReport::default());
        assert_eq!(evaluation.diagnostics, Diagnostics::default());
    }

    #[test]
    fn test_modalities_are_independent() {
        let mut study = Study::new("A");
        study.annotation_data = Some(
            AnnotationBlock {
                classification: Some(vec![AnnotationEntry {
                    key: "finding".to_string(),
                    value: json!("1"),
                }]),
                continuous: Some(vec![AnnotationEntry {
                    key: "volume".to_string(),
                    value: json!(10.0),
                }]),
                ..AnnotationBlock::default()
            }
            .into(),
        );
        let mut out = OutputStudy::new("A");
        out.continuous_output = Some(vec![OutputEntry::new("volume", json!(12.0))]);

        let evaluation = evaluate(
            Some(&vec![study]),
            Some(&OutputDocument { studies: vec![out] }),
            &EvaluationConfig::default(),
        )
        .unwrap();
        assert!(evaluation.report.classification.is_empty());
        let volume = evaluation.report.continuous[0].output.as_ref().unwrap();
        assert_eq!(volume.mean_squared_error, Some(4.0));
        assert_eq!(evaluation.diagnostics.labels_evaluated, 1);
    }
}
