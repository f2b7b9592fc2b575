//! Run configuration, passed explicitly into every component.

use crate::binary_map::{BinaryClassificationMap, BinaryMapSpec};
use crate::error::Result;
use crate::modality::bounding_box::BoundingBoxMetrics;
use crate::threshold::{validate_threshold, DEFAULT_THRESHOLD};
use crate::types::{EvaluationReport, EvaluationWrapper};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The part of a previous report that can be reused.
///
/// Only bounding-box metrics are read back; other sections of an older report
/// are ignored so that format changes there never block a cache hit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviousEvaluation {
    #[serde(default)]
    pub bounding_box: Vec<EvaluationWrapper<BoundingBoxMetrics>>,
}

impl PreviousEvaluation {
    /// Cached metrics for a label key, if the previous run produced any.
    pub fn bounding_box_for(&self, key: &str) -> Option<&BoundingBoxMetrics> {
        self.bounding_box
            .iter()
            .find(|wrapper| wrapper.key == key)
            .and_then(|wrapper| wrapper.output.as_ref())
    }
}

impl From<EvaluationReport> for PreviousEvaluation {
    fn from(report: EvaluationReport) -> Self {
        Self {
            bounding_box: report.bounding_box,
        }
    }
}

/// Settings for one evaluation run.
#[derive(Debug, Clone)]
pub struct EvaluationConfig {
    threshold: f64,
    binary_maps: HashMap<String, BinaryClassificationMap>,
    previous: Option<PreviousEvaluation>,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            binary_maps: HashMap::new(),
            previous: None,
        }
    }
}

impl EvaluationConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the classification threshold.
    ///
    /// # Errors
    ///
    /// Returns an error if the threshold is outside [0.0, 1.0].
    pub fn with_threshold(mut self, threshold: f64) -> Result<Self> {
        self.threshold = validate_threshold(threshold)?;
        Ok(self)
    }

    pub fn with_binary_map(mut self, key: impl Into<String>, map: BinaryClassificationMap) -> Self {
        self.binary_maps.insert(key.into(), map);
        self
    }

    pub fn with_binary_maps(mut self, maps: HashMap<String, BinaryClassificationMap>) -> Self {
        self.binary_maps.extend(maps);
        self
    }

    pub fn with_previous(mut self, previous: Option<PreviousEvaluation>) -> Self {
        self.previous = previous;
        self
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn binary_map(&self, key: &str) -> Option<&BinaryClassificationMap> {
        self.binary_maps.get(key)
    }

    pub fn binary_maps(&self) -> &HashMap<String, BinaryClassificationMap> {
        &self.binary_maps
    }

    pub fn previous(&self) -> Option<&PreviousEvaluation> {
        self.previous.as_ref()
    }
}

/// Parse binary maps from their JSON configuration:
/// `{ "<label key>": { "presentLabels": [...], "absentLabels": [...] } }`.
///
/// # Example
///
/// ```
/// use imaging_eval::config::parse_binary_maps;
///
/// let maps = parse_binary_maps(
///     r#"{"density": {"presentLabels": ["1", "2"], "absentLabels": ["3", "4"]}}"#,
/// ).unwrap();
/// assert!(maps["density"].is_present("2"));
/// ```
pub fn parse_binary_maps(json: &str) -> Result<HashMap<String, BinaryClassificationMap>> {
    let specs: HashMap<String, BinaryMapSpec> = serde_json::from_str(json)?;
    Ok(specs
        .into_iter()
        .map(|(key, spec)| (key, BinaryClassificationMap::from(spec)))
        .collect())
}
