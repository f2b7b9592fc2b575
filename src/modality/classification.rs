//! Classification metrics: confusion matrix, kappa, accuracy, sensitivity and
//! specificity, plus ROC/AUC built from the raw probability maps.

use crate::alignment::{AlignedLabel, Modality, ModalityKind, RawOutput};
use crate::binary_map::BinaryClassificationMap;
use crate::config::EvaluationConfig;
use crate::diagnostics::Diagnostics;
use crate::error::{EvalError, Result};
use crate::granularity::GranularityKey;
use crate::metrics::confusion::{
    accuracy, cohen_kappa, confusion_matrix, macro_recall, recall_for, ValueIndex, NEGATIVE_LABEL,
};
use crate::metrics::roc::{RocBucket, RocPoint, BINARY_ROC};
use crate::threshold::binarize;
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use tracing::{debug, warn};

/// ROC inputs of one label key, by bucket name.
pub type RocInputs = IndexMap<String, RocBucket>;

/// How sensitivity and specificity were derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BinaryRegime {
    /// Exactly two labels, one of them "0".
    TrueBinary,
    /// Thresholded scores of the collapsed binary ROC bucket.
    SimulatedBinary,
    /// Macro-averaged recall over every label.
    MultiClass,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneralMetrics {
    /// Rows are ground truth, columns are predictions, both in `matrix_value_orders` order.
    pub confusion_matrix: Vec<Vec<u64>>,
    /// `None` when chance agreement is total.
    pub kappa: Option<f64>,
    pub accuracy: f64,
    pub matrix_value_orders: IndexMap<String, usize>,
    pub sensitivity: f64,
    pub specificity: f64,
    pub auc: Option<f64>,
    pub roc_curve: Option<Vec<RocPoint>>,
    pub regime: BinaryRegime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationMetrics {
    pub general_metrics: GeneralMetrics,
}

/// Parse a probability map, keeping document order.
///
/// # Errors
///
/// Returns [`EvalError::InvalidOutput`] if `raw` is not an object of numbers.
pub fn probabilities(raw: &Value) -> Result<IndexMap<String, f64>> {
    let map = raw.as_object().ok_or_else(|| {
        EvalError::InvalidOutput(format!("classification output is not a probability map: {raw}"))
    })?;
    map.iter()
        .map(|(label, probability)| {
            probability
                .as_f64()
                .map(|p| (label.clone(), p))
                .ok_or_else(|| {
                    EvalError::InvalidOutput(format!(
                        "probability for '{label}' is not a number: {probability}"
                    ))
                })
        })
        .collect()
}

/// Reduce a probability map to one predicted label.
///
/// An empty map is unknown. A single entry is a yes/no answer: its label when
/// the probability reaches `threshold`, "0" otherwise. Larger maps take the
/// argmax, the first in map order on ties.
///
/// # Example
///
/// ```
/// use imaging_eval::modality::classification::predicted_label;
/// use indexmap::IndexMap;
///
/// let single: IndexMap<String, f64> = [("1".to_string(), 0.4)].into_iter().collect();
/// assert_eq!(predicted_label(&single, 0.5).as_deref(), Some("0"));
///
/// let multi: IndexMap<String, f64> =
///     [("a", 0.4), ("b", 0.4), ("c", 0.2)].map(|(k, p)| (k.to_string(), p)).into_iter().collect();
/// assert_eq!(predicted_label(&multi, 0.5).as_deref(), Some("a"));
/// ```
pub fn predicted_label(probabilities: &IndexMap<String, f64>, threshold: f64) -> Option<String> {
    match probabilities.len() {
        0 => None,
        1 => probabilities.first().map(|(label, &p)| {
            if p >= threshold {
                label.clone()
            } else {
                NEGATIVE_LABEL.to_string()
            }
        }),
        _ => {
            let mut best: Option<(&String, f64)> = None;
            for (label, &p) in probabilities {
                if best.map_or(true, |(_, best_p)| p > best_p) {
                    best = Some((label, p));
                }
            }
            best.map(|(label, _)| label.clone())
        }
    }
}

/// Build the ROC buckets of one label key from its raw outputs.
///
/// A label key gets either a single [`BINARY_ROC`] bucket or one bucket per
/// candidate label, never both:
///
/// * with a binary map whose present labels occur in at least one entry, every
///   entry contributes once to [`BINARY_ROC`]: the summed probability of the
///   present labels against whether the ground truth is present;
/// * otherwise, when every entry is a single-label yes/no answer, they feed
///   [`BINARY_ROC`] with "ground truth is not 0" as the expectation;
/// * otherwise each candidate label gets a one-vs-rest bucket.
///
/// Null outputs, empty maps, and entries without ground truth at their exact
/// granularity are skipped.
pub fn aggregate_roc_inputs<'g>(
    label: &str,
    raw_outputs: &[RawOutput],
    ground_truth_at: impl Fn(&GranularityKey) -> Option<&'g str>,
    binary_map: Option<&BinaryClassificationMap>,
) -> Result<RocInputs> {
    let mut entries = Vec::with_capacity(raw_outputs.len());
    for raw in raw_outputs {
        if raw.output.is_null() {
            continue;
        }
        let Some(ground_truth) = ground_truth_at(&raw.key) else {
            continue;
        };
        let probabilities = probabilities(&raw.output)?;
        if !probabilities.is_empty() {
            entries.push((ground_truth, probabilities));
        }
    }

    let mut inputs = RocInputs::new();
    let binary_map = binary_map.filter(|map| {
        let matched = entries
            .iter()
            .flat_map(|(_, probabilities)| probabilities.keys())
            .any(|candidate| map.is_present(candidate));
        if !matched && !entries.is_empty() {
            warn!(label, "binary map matches no output label; ignoring it");
        }
        matched
    });

    if let Some(map) = binary_map {
        let mut unmapped: IndexSet<String> = IndexSet::new();
        let bucket = inputs.entry(BINARY_ROC.to_string()).or_default();
        for (ground_truth, probabilities) in &entries {
            let actual: f64 = probabilities
                .iter()
                .filter(|(candidate, _)| map.is_present(candidate))
                .map(|(_, p)| p)
                .sum();
            unmapped.extend(
                probabilities
                    .keys()
                    .filter(|candidate| !map.contains(candidate))
                    .cloned(),
            );
            bucket.push(map.is_present(ground_truth), actual);
        }
        if !unmapped.is_empty() {
            warn!(label, ?unmapped, "labels not covered by the binary map");
        }
    } else if entries.iter().all(|(_, probabilities)| probabilities.len() == 1) {
        for (ground_truth, probabilities) in &entries {
            if let Some((_, &p)) = probabilities.first() {
                inputs
                    .entry(BINARY_ROC.to_string())
                    .or_default()
                    .push(*ground_truth != NEGATIVE_LABEL, p);
            }
        }
    } else {
        for (ground_truth, probabilities) in &entries {
            for (candidate, &p) in probabilities {
                inputs
                    .entry(candidate.clone())
                    .or_default()
                    .push(*ground_truth == candidate.as_str(), p);
            }
        }
    }

    inputs.retain(|_, bucket| !bucket.is_empty());
    Ok(inputs)
}

/// The classification modality.
#[derive(Debug, Clone)]
pub struct Classification {
    threshold: f64,
    binary_maps: HashMap<String, BinaryClassificationMap>,
}

impl Classification {
    pub fn new(config: &EvaluationConfig) -> Self {
        Self {
            threshold: config.threshold(),
            binary_maps: config.binary_maps().clone(),
        }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }
}

impl Default for Classification {
    fn default() -> Self {
        Self::new(&EvaluationConfig::default())
    }
}

impl Modality for Classification {
    type GroundTruth = String;
    type Prediction = String;
    type Metrics = ClassificationMetrics;

    const KIND: ModalityKind = ModalityKind::Classification;

    fn parse_ground_truth(&self, value: &Value) -> Result<String> {
        match value {
            Value::String(label) => Ok(label.clone()),
            Value::Number(number) => Ok(number.to_string()),
            other => Err(EvalError::InvalidGroundTruth(format!(
                "classification value must be a label, got {other}"
            ))),
        }
    }

    fn transform_prediction(&self, raw: &Value) -> Result<Option<String>> {
        Ok(predicted_label(&probabilities(raw)?, self.threshold))
    }

    fn compute_metrics(
        &self,
        aligned: &AlignedLabel<'_, String, String>,
        _diagnostics: &mut Diagnostics,
    ) -> Result<Option<ClassificationMetrics>> {
        let (gt_labels, pred_labels): (Vec<&str>, Vec<&str>) = aligned
            .pairs()
            .map(|(_, gt, pred)| (gt.as_str(), pred.as_str()))
            .unzip();

        let values = ValueIndex::from_values(gt_labels.iter().chain(&pred_labels).copied());
        let gts = values.encode(gt_labels.iter().copied());
        let preds = values.encode(pred_labels.iter().copied());
        let matrix = confusion_matrix(&gts, &preds, values.len());

        let roc_inputs = aggregate_roc_inputs(
            aligned.label,
            aligned.raw_outputs,
            |key| aligned.ground_truth_at(key).map(String::as_str),
            self.binary_maps.get(aligned.label),
        )?;
        let binary_roc = roc_inputs.get(BINARY_ROC);

        let (regime, sensitivity, specificity) = if values.is_true_binary() {
            let positive = values.labels()[0].as_str();
            (
                BinaryRegime::TrueBinary,
                recall_for(&gt_labels, &pred_labels, &positive),
                recall_for(&gt_labels, &pred_labels, &NEGATIVE_LABEL),
            )
        } else if let Some(bucket) = binary_roc {
            let predicted = binarize(&bucket.actual, self.threshold);
            (
                BinaryRegime::SimulatedBinary,
                recall_for(&bucket.expected, &predicted, &1),
                recall_for(&bucket.expected, &predicted, &0),
            )
        } else {
            let recall = macro_recall(&gts, &preds, values.len());
            (BinaryRegime::MultiClass, recall, recall)
        };

        debug!(
            label = aligned.label,
            pairs = gts.len(),
            classes = values.len(),
            ?regime,
            buckets = roc_inputs.len(),
            "classification metrics"
        );

        Ok(Some(ClassificationMetrics {
            general_metrics: GeneralMetrics {
                kappa: cohen_kappa(&matrix),
                accuracy: accuracy(&gts, &preds),
                confusion_matrix: matrix,
                matrix_value_orders: values.to_map(),
                sensitivity,
                specificity,
                auc: binary_roc.and_then(RocBucket::auc),
                roc_curve: binary_roc.and_then(RocBucket::curve),
                regime,
            },
        }))
    }
}
