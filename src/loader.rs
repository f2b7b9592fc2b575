//! JSON loading and writing for datasets, output documents, and reports.

use crate::config::PreviousEvaluation;
use crate::error::{EvalError, Result};
use crate::types::{Dataset, EvaluationReport, OutputDocument};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, ErrorKind, Write};
use std::path::Path;
use tracing::debug;

/// Load a ground-truth dataset from a JSON file.
///
/// # Arguments
///
/// * `path` - Path to a JSON list of studies
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, or if a study has no
/// `studyInstanceUid`.
///
/// # Example
///
/// ```no_run
/// use imaging_eval::loader::load_dataset_from_file;
///
/// let dataset = load_dataset_from_file("dataset.json").unwrap();
/// println!("Loaded {} studies", dataset.len());
/// ```
pub fn load_dataset_from_file<P: AsRef<Path>>(path: P) -> Result<Dataset> {
    let reader = BufReader::new(File::open(path)?);
    let dataset: Dataset = serde_json::from_reader(reader)?;
    validate_dataset(&dataset)?;
    Ok(dataset)
}

/// Load a ground-truth dataset from a JSON string.
///
/// # Example
///
/// ```
/// use imaging_eval::loader::load_dataset_from_str;
///
/// let json = r#"[{"studyInstanceUid": "1.2.3", "annotationData": null}]"#;
/// let dataset = load_dataset_from_str(json).unwrap();
/// assert_eq!(dataset[0].study_instance_uid, "1.2.3");
/// ```
pub fn load_dataset_from_str(json: &str) -> Result<Dataset> {
    let dataset: Dataset = serde_json::from_str(json)?;
    validate_dataset(&dataset)?;
    Ok(dataset)
}

/// Load a model output document from a JSON file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, or if a study has no
/// `studyInstanceUID`.
pub fn load_output_from_file<P: AsRef<Path>>(path: P) -> Result<OutputDocument> {
    let reader = BufReader::new(File::open(path)?);
    let output: OutputDocument = serde_json::from_reader(reader)?;
    validate_output(&output)?;
    Ok(output)
}

/// Load a model output document from a JSON string.
pub fn load_output_from_str(json: &str) -> Result<OutputDocument> {
    let output: OutputDocument = serde_json::from_str(json)?;
    validate_output(&output)?;
    Ok(output)
}

/// Read the reusable part of a previous report.
///
/// A missing or blank file means there is nothing to reuse.
pub fn load_previous_evaluation<P: AsRef<Path>>(path: P) -> Result<Option<PreviousEvaluation>> {
    let path = path.as_ref();
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            debug!(path = %path.display(), "no previous evaluation");
            return Ok(None);
        }
        Err(err) => return Err(err.into()),
    };
    if contents.trim().is_empty() {
        return Ok(None);
    }
    Ok(Some(serde_json::from_str(&contents)?))
}

/// Write a report as pretty-printed JSON.
pub fn write_report<P: AsRef<Path>>(path: P, report: &EvaluationReport) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, report)?;
    writer.flush()?;
    Ok(())
}

fn validate_dataset(dataset: &Dataset) -> Result<()> {
    if let Some(position) = dataset
        .iter()
        .position(|study| study.study_instance_uid.is_empty())
    {
        return Err(EvalError::InvalidGroundTruth(format!(
            "study {position} has an empty studyInstanceUid"
        )));
    }
    Ok(())
}

fn validate_output(output: &OutputDocument) -> Result<()> {
    if let Some(position) = output
        .studies
        .iter()
        .position(|study| study.study_instance_uid.is_empty())
    {
        return Err(EvalError::InvalidOutput(format!(
            "output study {position} has an empty studyInstanceUID"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AnnotationData;
    use std::path::PathBuf;

    fn scratch_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("imaging-eval-{}-{name}", std::process::id()))
    }

    #[test]
    fn test_load_nested_dataset() {
        let json = r#"[{
            "studyInstanceUid": "A",
            "annotationData": [{"classification": [{"key": "finding", "value": "1"}]}],
            "series": [{
                "seriesInstanceUid": "S",
                "annotationData": null,
                "instances": [{
                    "sopInstanceUid": "I",
                    "annotationData": null,
                    "frames": [{"frameIndex": 3, "annotationData": {"boundingBox": []}}]
                }]
            }]
        }]"#;

        let dataset = load_dataset_from_str(json).unwrap();
        assert!(matches!(dataset[0].annotation_data, Some(AnnotationData::Many(_))));
        let frame = &dataset[0].series.as_ref().unwrap()[0].instances.as_ref().unwrap()[0]
            .frames
            .as_ref()
            .unwrap()[0];
        assert!(matches!(frame.annotation_data, Some(AnnotationData::One(_))));
    }

    #[test]
    fn test_empty_study_uid_is_rejected() {
        let result = load_dataset_from_str(r#"[{"studyInstanceUid": ""}]"#);
        assert!(matches!(result, Err(EvalError::InvalidGroundTruth(_))));

        let result = load_output_from_str(r#"{"studies": [{"studyInstanceUID": ""}]}"#);
        assert!(matches!(result, Err(EvalError::InvalidOutput(_))));
    }

    #[test]
    fn test_load_output_with_granularity_fields() {
        let json = r#"{"studies": [{
            "studyInstanceUID": "A",
            "boundingBoxOutput": [
                {"key": "lesion", "output": [], "sopInstanceUID": "I", "frameIndex": "0"}
            ]
        }]}"#;
        let output = load_output_from_str(json).unwrap();
        let entry = &output.studies[0].bounding_box_output.as_ref().unwrap()[0];
        assert_eq!(entry.sop_instance_uid.as_deref(), Some("I"));
        assert!(entry.series_instance_uid.is_none());
    }

    #[test]
    fn test_invalid_json() {
        assert!(matches!(load_output_from_str("{"), Err(EvalError::JsonError(_))));
    }

    #[test]
    fn test_previous_evaluation_missing_or_blank() {
        assert!(load_previous_evaluation(scratch_path("missing.json")).unwrap().is_none());

        let blank = scratch_path("blank.json");
        fs::write(&blank, "  \n").unwrap();
        assert!(load_previous_evaluation(&blank).unwrap().is_none());
        fs::remove_file(blank).unwrap();
    }

    #[test]
    fn test_report_round_trips_through_previous_evaluation() {
        let path = scratch_path("report.json");
        write_report(&path, &EvaluationReport::default()).unwrap();
        let previous = load_previous_evaluation(&path).unwrap().unwrap();
        assert!(previous.bounding_box.is_empty());
        fs::remove_file(path).unwrap();
    }
}
