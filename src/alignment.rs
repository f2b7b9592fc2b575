//! Reconciles ground-truth annotations with model outputs, per label key and
//! per granularity.
//!
//! The engine is generic over a [`Modality`]. The modality decides how raw JSON
//! values become comparable ground truth and predictions, and how an aligned
//! label is scored. The engine owns everything else: walking the documents,
//! hashing granularities, and splitting each label into valid / failure and
//! usable / unknown partitions.

use crate::diagnostics::Diagnostics;
use crate::error::{EvalError, Result};
use crate::granularity::{identifier_text, Granularity, GranularityIndex, GranularityKey};
use crate::types::{
    AnnotationBlock, AnnotationData, AnnotationEntry, Dataset, EvaluationWrapper, OutputDocument,
    OutputEntry, OutputStudy,
};
use indexmap::{IndexMap, IndexSet};
use serde_json::Value;
use std::collections::HashSet;
use std::fmt;
use tracing::{debug, instrument, warn};

/// Values grouped by label key, then by granularity. Both levels keep
/// first-insertion order; re-inserting a granularity overwrites its value.
pub type LabelMap<V> = IndexMap<String, IndexMap<GranularityKey, V>>;

/// The closed set of evaluation modalities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModalityKind {
    Classification,
    Continuous,
    BoundingBox,
    Segmentation,
}

impl ModalityKind {
    /// Key of this modality inside `annotationData`.
    pub fn annotation_type(self) -> &'static str {
        match self {
            ModalityKind::Classification => "classification",
            ModalityKind::Continuous => "continuous",
            ModalityKind::BoundingBox => "boundingBox",
            ModalityKind::Segmentation => "segmentation",
        }
    }

    /// Key of this modality inside an output study.
    pub fn output_type(self) -> &'static str {
        match self {
            ModalityKind::Classification => "classificationOutput",
            ModalityKind::Continuous => "continuousOutput",
            ModalityKind::BoundingBox => "boundingBoxOutput",
            ModalityKind::Segmentation => "segmentationOutput",
        }
    }

    pub fn annotations(self, block: &AnnotationBlock) -> Option<&[AnnotationEntry]> {
        match self {
            ModalityKind::Classification => block.classification.as_deref(),
            ModalityKind::Continuous => block.continuous.as_deref(),
            ModalityKind::BoundingBox => block.bounding_box.as_deref(),
            ModalityKind::Segmentation => block.segmentation.as_deref(),
        }
    }

    pub fn outputs(self, study: &OutputStudy) -> Option<&[OutputEntry]> {
        match self {
            ModalityKind::Classification => study.classification_output.as_deref(),
            ModalityKind::Continuous => study.continuous_output.as_deref(),
            ModalityKind::BoundingBox => study.bounding_box_output.as_deref(),
            ModalityKind::Segmentation => study.segmentation_output.as_deref(),
        }
    }
}

impl fmt::Display for ModalityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.annotation_type())
    }
}

/// Which label keys get a wrapper.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelScope {
    /// Ground-truth label keys that also have predictions.
    GroundTruth,
    /// Every predicted label key, annotated or not.
    Predictions,
}

/// How a prediction finds its ground truth.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Correspondence {
    /// Same granularity key on both sides.
    Exact,
    /// The most specific annotated ancestor-or-self of the prediction's granularity.
    RollUp,
}

/// One evaluation modality.
pub trait Modality {
    type GroundTruth;
    type Prediction: Clone;
    type Metrics;

    const KIND: ModalityKind;

    fn label_scope(&self) -> LabelScope {
        LabelScope::GroundTruth
    }

    fn correspondence(&self) -> Correspondence {
        Correspondence::Exact
    }

    /// Convert one ground-truth value.
    fn parse_ground_truth(&self, value: &Value) -> Result<Self::GroundTruth>;

    /// Convert one non-null raw output. `Ok(None)` marks it unknown.
    fn transform_prediction(&self, raw: &Value) -> Result<Option<Self::Prediction>>;

    /// Fold a prediction into one already attributed to the same ground truth.
    /// Only called under [`Correspondence::RollUp`]; the default keeps the latest.
    fn merge_predictions(&self, into: &mut Self::Prediction, next: Self::Prediction) {
        *into = next;
    }

    /// Whether a label with usable predictions but no same-key pairs is still
    /// scored. Off by default; such labels report null metrics.
    fn scores_unpaired_predictions(&self) -> bool {
        false
    }

    /// Score one label. Only called when the label has comparable pairs, or
    /// usable predictions under [`Modality::scores_unpaired_predictions`].
    fn compute_metrics(
        &self,
        aligned: &AlignedLabel<'_, Self::GroundTruth, Self::Prediction>,
        diagnostics: &mut Diagnostics,
    ) -> Result<Option<Self::Metrics>>;
}

/// Ground truth collected from the dataset walk, with its reverse lookup.
#[derive(Debug, Clone)]
pub struct GroundTruthWalk<G> {
    pub labels: LabelMap<G>,
    pub index: GranularityIndex,
}

/// One raw output entry, as it appeared in the document.
#[derive(Debug, Clone)]
pub struct RawOutput {
    pub key: GranularityKey,
    pub output: Value,
}

/// Predictions collected from the output document, with its reverse lookup.
#[derive(Debug, Clone)]
pub struct PredictionWalk<P> {
    /// `None` values are unknowns.
    pub labels: LabelMap<Option<P>>,
    /// Raw outputs per label, in document order, duplicates kept.
    pub raw: IndexMap<String, Vec<RawOutput>>,
    pub index: GranularityIndex,
}

/// What a modality sees for one label.
#[derive(Debug)]
pub struct AlignedLabel<'a, G, P> {
    pub label: &'a str,
    /// Ground truth with a corresponding prediction entry (usable or unknown).
    pub ground_truths: IndexMap<GranularityKey, &'a G>,
    /// Usable predictions, keyed by the ground-truth granularity they align to.
    pub predictions: IndexMap<GranularityKey, P>,
    /// Raw outputs under this label, in document order.
    pub raw_outputs: &'a [RawOutput],
    /// Every ground truth of this modality, across all label keys.
    pub all_ground_truths: &'a LabelMap<G>,
}

impl<'a, G, P> AlignedLabel<'a, G, P> {
    /// Comparable (ground truth, prediction) pairs, in ground-truth order.
    pub fn pairs(&self) -> impl Iterator<Item = (&GranularityKey, &'a G, &P)> + '_ {
        self.ground_truths.iter().filter_map(|(key, &gt)| {
            self.predictions.get(key).map(|prediction| (key, gt, prediction))
        })
    }

    pub fn pair_count(&self) -> usize {
        self.pairs().count()
    }

    /// Ground truth for this label at `key`, whether or not it was predicted.
    pub fn ground_truth_at(&self, key: &GranularityKey) -> Option<&'a G> {
        self.all_ground_truths
            .get(self.label)
            .and_then(|entries| entries.get(key))
    }
}

/// How one label's records were split.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Partition {
    pub valid: Vec<GranularityKey>,
    pub failures: Vec<GranularityKey>,
    pub usable: Vec<GranularityKey>,
    pub unknowns: Vec<GranularityKey>,
}

/// Wrappers for one modality plus what was skipped on the way.
#[derive(Debug, Clone)]
pub struct ModalityOutcome<M> {
    pub wrappers: Vec<EvaluationWrapper<M>>,
    pub diagnostics: Diagnostics,
}

/// Walk study → series → instance → frame and collect every annotation of `kind`.
///
/// Each level hashes its own granularity, so a study-level and a frame-level
/// annotation under the same label key are kept side by side.
pub fn walk_ground_truths<G>(
    dataset: &Dataset,
    kind: ModalityKind,
    parse: impl Fn(&Value) -> Result<G>,
) -> Result<GroundTruthWalk<G>> {
    let mut walk = GroundTruthWalk {
        labels: LabelMap::new(),
        index: GranularityIndex::new(),
    };

    let mut collect = |data: Option<&AnnotationData>, granularity: &Granularity| -> Result<()> {
        let Some(data) = data else {
            return Ok(());
        };
        for block in data.blocks() {
            let Some(entries) = kind.annotations(block) else {
                continue;
            };
            for entry in entries {
                let value = parse(&entry.value)?;
                let key = walk.index.record(granularity);
                walk.labels
                    .entry(entry.key.clone())
                    .or_default()
                    .insert(key, value);
            }
        }
        Ok(())
    };

    for study in dataset {
        let study_level = Granularity::study(&study.study_instance_uid);
        collect(study.annotation_data.as_ref(), &study_level)?;

        for series in study.series.iter().flatten() {
            let series_level =
                study_level.with_series(series.series_instance_uid.clone().unwrap_or_default());
            collect(series.annotation_data.as_ref(), &series_level)?;

            for instance in series.instances.iter().flatten() {
                let instance_level = series_level
                    .with_instance(instance.sop_instance_uid.clone().unwrap_or_default());
                collect(instance.annotation_data.as_ref(), &instance_level)?;

                for frame in instance.frames.iter().flatten() {
                    let frame_level =
                        instance_level.with_frame(identifier_text(frame.frame_index.as_ref()));
                    collect(frame.annotation_data.as_ref(), &frame_level)?;
                }
            }
        }
    }

    Ok(walk)
}

/// The granularity an output entry applies to.
pub fn output_granularity(study: &OutputStudy, entry: &OutputEntry) -> Granularity {
    Granularity::new(
        study.study_instance_uid.clone(),
        entry.series_instance_uid.clone().unwrap_or_default(),
        entry.sop_instance_uid.clone().unwrap_or_default(),
        identifier_text(entry.frame_index.as_ref()),
    )
}

/// Collect every output entry of `kind`, transforming non-null outputs.
pub fn collect_predictions<P>(
    output: &OutputDocument,
    kind: ModalityKind,
    transform: impl Fn(&Value) -> Result<Option<P>>,
) -> Result<PredictionWalk<P>> {
    let mut walk = PredictionWalk {
        labels: LabelMap::new(),
        raw: IndexMap::new(),
        index: GranularityIndex::new(),
    };

    for study in &output.studies {
        let Some(entries) = kind.outputs(study) else {
            continue;
        };
        for entry in entries {
            let key = walk.index.record(&output_granularity(study, entry));
            let prediction = if entry.output.is_null() {
                None
            } else {
                transform(&entry.output)?
            };
            walk.labels
                .entry(entry.key.clone())
                .or_default()
                .insert(key.clone(), prediction);
            walk.raw.entry(entry.key.clone()).or_default().push(RawOutput {
                key,
                output: entry.output.clone(),
            });
        }
    }

    Ok(walk)
}

/// Aligns one modality's ground truth and predictions.
pub struct AlignmentEngine<M: Modality> {
    modality: M,
    ground_truths: GroundTruthWalk<M::GroundTruth>,
    predictions: PredictionWalk<M::Prediction>,
    index: GranularityIndex,
}

impl<M: Modality> AlignmentEngine<M> {
    /// Walk both documents for `modality`.
    ///
    /// # Errors
    ///
    /// Returns [`EvalError::MissingInput`] when either document is absent, and
    /// propagates conversion errors from the modality.
    pub fn new(
        dataset: Option<&Dataset>,
        output: Option<&OutputDocument>,
        modality: M,
    ) -> Result<Self> {
        let dataset =
            dataset.ok_or_else(|| EvalError::MissingInput("no dataset found".to_string()))?;
        let output = output.ok_or_else(|| EvalError::MissingInput("no output found".to_string()))?;

        let ground_truths =
            walk_ground_truths(dataset, M::KIND, |value| modality.parse_ground_truth(value))?;
        let predictions =
            collect_predictions(output, M::KIND, |raw| modality.transform_prediction(raw))?;

        let mut index = ground_truths.index.clone();
        index.merge(predictions.index.clone());

        Ok(Self {
            modality,
            ground_truths,
            predictions,
            index,
        })
    }

    pub fn modality(&self) -> &M {
        &self.modality
    }

    pub fn ground_truths(&self) -> &LabelMap<M::GroundTruth> {
        &self.ground_truths.labels
    }

    pub fn predictions(&self) -> &LabelMap<Option<M::Prediction>> {
        &self.predictions.labels
    }

    pub fn index(&self) -> &GranularityIndex {
        &self.index
    }

    /// Label keys that get a wrapper, in order.
    pub fn label_keys(&self) -> Vec<&str> {
        match self.modality.label_scope() {
            LabelScope::GroundTruth => self
                .ground_truths
                .labels
                .keys()
                .filter(|label| self.predictions.labels.contains_key(label.as_str()))
                .map(String::as_str)
                .collect(),
            LabelScope::Predictions => self.predictions.labels.keys().map(String::as_str).collect(),
        }
    }

    /// Evaluate every label key.
    #[instrument(skip_all, fields(modality = %M::KIND))]
    pub fn evaluate(&self) -> Result<ModalityOutcome<M::Metrics>> {
        let mut diagnostics = Diagnostics::new();
        let wrappers = self
            .label_keys()
            .into_iter()
            .map(|label| self.wrapper_for_label(label, &mut diagnostics))
            .collect::<Result<Vec<_>>>()?;

        debug!(labels = wrappers.len(), "{}", diagnostics.summary_string());
        Ok(ModalityOutcome {
            wrappers,
            diagnostics,
        })
    }

    /// Split one label into valid / failure and usable / unknown.
    pub fn partition(&self, label: &str) -> Partition {
        let mut partition = Partition::default();
        let Some(predictions) = self.predictions.labels.get(label) else {
            return partition;
        };

        for (key, prediction) in predictions {
            if prediction.is_some() {
                partition.usable.push(key.clone());
            } else {
                partition.unknowns.push(key.clone());
            }
        }

        match self.modality.label_scope() {
            LabelScope::GroundTruth => {
                let targets = self.attributions(label);
                let attributed: HashSet<&GranularityKey> = targets.values().collect();
                if let Some(ground_truths) = self.ground_truths.labels.get(label) {
                    for key in ground_truths.keys() {
                        if attributed.contains(key) {
                            partition.valid.push(key.clone());
                        } else {
                            partition.failures.push(key.clone());
                        }
                    }
                }
            }
            LabelScope::Predictions => {
                if let Some(ground_truths) = self.ground_truths.labels.get(label) {
                    partition.valid = ground_truths
                        .keys()
                        .filter(|key| predictions.contains_key(*key))
                        .cloned()
                        .collect();
                }
                // Any annotated granularity of this modality counts, whatever its label.
                let annotated: IndexSet<&GranularityKey> = self
                    .ground_truths
                    .labels
                    .values()
                    .flat_map(|entries| entries.keys())
                    .collect();
                partition.failures = annotated
                    .into_iter()
                    .filter(|key| !predictions.contains_key(*key))
                    .cloned()
                    .collect();
            }
        }

        partition
    }

    /// Map each prediction granularity of `label` to the ground-truth
    /// granularity it is compared against. Unattributed predictions are absent.
    fn attributions(&self, label: &str) -> IndexMap<GranularityKey, GranularityKey> {
        let mut targets = IndexMap::new();
        let (Some(predictions), Some(ground_truths)) = (
            self.predictions.labels.get(label),
            self.ground_truths.labels.get(label),
        ) else {
            return targets;
        };

        for key in predictions.keys() {
            let target = match self.modality.correspondence() {
                Correspondence::Exact => ground_truths.contains_key(key).then(|| key.clone()),
                Correspondence::RollUp => self.index.get(key).and_then(|granularity| {
                    granularity
                        .lineage()
                        .into_iter()
                        .map(|ancestor| ancestor.key())
                        .find(|ancestor| ground_truths.contains_key(ancestor))
                }),
            };
            if let Some(target) = target {
                targets.insert(key.clone(), target);
            }
        }
        targets
    }

    /// Usable predictions re-keyed by their ground-truth granularity.
    fn aligned_predictions(&self, label: &str) -> IndexMap<GranularityKey, M::Prediction> {
        let mut aligned: IndexMap<GranularityKey, M::Prediction> = IndexMap::new();
        let Some(predictions) = self.predictions.labels.get(label) else {
            return aligned;
        };

        match self.modality.label_scope() {
            LabelScope::GroundTruth => {
                let targets = self.attributions(label);
                for (key, prediction) in predictions {
                    let (Some(prediction), Some(target)) = (prediction, targets.get(key)) else {
                        continue;
                    };
                    match aligned.get_mut(target) {
                        Some(existing) => {
                            self.modality.merge_predictions(existing, prediction.clone())
                        }
                        None => {
                            aligned.insert(target.clone(), prediction.clone());
                        }
                    }
                }
            }
            LabelScope::Predictions => {
                for (key, prediction) in predictions {
                    if let Some(prediction) = prediction {
                        aligned.insert(key.clone(), prediction.clone());
                    }
                }
            }
        }
        aligned
    }

    fn wrapper_for_label(
        &self,
        label: &str,
        diagnostics: &mut Diagnostics,
    ) -> Result<EvaluationWrapper<M::Metrics>> {
        let partition = self.partition(label);

        let ground_truths: IndexMap<GranularityKey, &M::GroundTruth> = self
            .ground_truths
            .labels
            .get(label)
            .map(|entries| {
                partition
                    .valid
                    .iter()
                    .filter_map(|key| entries.get(key).map(|value| (key.clone(), value)))
                    .collect()
            })
            .unwrap_or_default();

        let aligned = AlignedLabel {
            label,
            ground_truths,
            predictions: self.aligned_predictions(label),
            raw_outputs: self
                .predictions
                .raw
                .get(label)
                .map(Vec::as_slice)
                .unwrap_or_default(),
            all_ground_truths: &self.ground_truths.labels,
        };

        let scorable = aligned.pair_count() > 0
            || (self.modality.scores_unpaired_predictions() && !aligned.predictions.is_empty());
        let output = if !scorable {
            warn!(modality = %M::KIND, label, "no comparable ground-truth/prediction pairs");
            None
        } else {
            self.modality.compute_metrics(&aligned, diagnostics)?
        };

        debug!(
            modality = %M::KIND,
            label,
            valid = partition.valid.len(),
            failures = partition.failures.len(),
            unknowns = partition.unknowns.len(),
            "aligned label"
        );
        diagnostics.record_label(
            partition.unknowns.len(),
            partition.failures.len(),
            output.is_some(),
        );

        Ok(EvaluationWrapper {
            key: label.to_string(),
            unknowns: partition.unknowns.iter().map(|key| self.index.resolve(key)).collect(),
            failures: partition.failures.iter().map(|key| self.index.resolve(key)).collect(),
            output,
        })
    }
}
