//! Continuous regression metrics.
//!
//! Every predicted label key is evaluated, annotated or not. Errors compare a
//! prediction with the ground truth of its own label key, while the scatter
//! plot pairs it with every continuous ground truth at the same granularity.

use crate::alignment::{AlignedLabel, LabelScope, Modality, ModalityKind};
use crate::diagnostics::Diagnostics;
use crate::error::{EvalError, Result};
use crate::metrics::regression::{mean_absolute_error, mean_squared_error};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Points of one ground-truth label key against the evaluated predictions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScatterSeries {
    pub name: String,
    pub data: Vec<[f64; 2]>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContinuousMetrics {
    pub mean_squared_error: Option<f64>,
    pub mean_absolute_error: Option<f64>,
    pub scatter_plot: Vec<ScatterSeries>,
}

/// Read a number, or a string holding one.
fn numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Continuous;

impl Modality for Continuous {
    type GroundTruth = f64;
    type Prediction = f64;
    type Metrics = ContinuousMetrics;

    const KIND: ModalityKind = ModalityKind::Continuous;

    fn label_scope(&self) -> LabelScope {
        LabelScope::Predictions
    }

    fn scores_unpaired_predictions(&self) -> bool {
        true
    }

    fn parse_ground_truth(&self, value: &Value) -> Result<f64> {
        numeric(value).ok_or_else(|| {
            EvalError::InvalidGroundTruth(format!("continuous value is not a number: {value}"))
        })
    }

    fn transform_prediction(&self, raw: &Value) -> Result<Option<f64>> {
        numeric(raw)
            .map(Some)
            .ok_or_else(|| {
                EvalError::InvalidOutput(format!("continuous output is not a number: {raw}"))
            })
    }

    fn compute_metrics(
        &self,
        aligned: &AlignedLabel<'_, f64, f64>,
        _diagnostics: &mut Diagnostics,
    ) -> Result<Option<ContinuousMetrics>> {
        let pairs: Vec<(f64, f64)> = aligned.pairs().map(|(_, &gt, &pred)| (gt, pred)).collect();

        let scatter_plot = aligned
            .all_ground_truths
            .iter()
            .map(|(name, ground_truths)| ScatterSeries {
                name: name.clone(),
                data: aligned
                    .predictions
                    .iter()
                    .filter_map(|(key, &pred)| ground_truths.get(key).map(|&gt| [gt, pred]))
                    .collect(),
            })
            .collect();

        Ok(Some(ContinuousMetrics {
            mean_squared_error: mean_squared_error(&pairs),
            mean_absolute_error: mean_absolute_error(&pairs),
            scatter_plot,
        }))
    }
}
