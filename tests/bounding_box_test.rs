//! Bounding-box metrics through the full evaluation pipeline.

use imaging_eval::config::{EvaluationConfig, PreviousEvaluation};
use imaging_eval::evaluator::{evaluate, Evaluation};
use imaging_eval::loader::{load_dataset_from_str, load_output_from_str};
use imaging_eval::modality::bounding_box::BoundingBoxMetrics;
use serde_json::{json, Value};

fn bbox(x1: i64, y1: i64, x2: i64, y2: i64) -> Value {
    json!({
        "top_left_hand_corner": {"x": x1, "y": y1},
        "bottom_right_hand_corner": {"x": x2, "y": y2}
    })
}

fn study(uid: &str, boxes: Vec<Value>) -> Value {
    json!({
        "studyInstanceUid": uid,
        "annotationData": {"boundingBox": [{"key": "lesion", "value": boxes}]}
    })
}

fn prediction(uid: &str, boxes: Vec<Value>) -> Value {
    json!({
        "studyInstanceUID": uid,
        "boundingBoxOutput": [{"key": "lesion", "output": boxes}]
    })
}

fn run(studies: Vec<Value>, predictions: Vec<Value>, config: &EvaluationConfig) -> Evaluation {
    let dataset = load_dataset_from_str(&Value::Array(studies).to_string()).unwrap();
    let output = load_output_from_str(&json!({ "studies": predictions }).to_string()).unwrap();
    evaluate(Some(&dataset), Some(&output), config).unwrap()
}

fn lesion_metrics(evaluation: &Evaluation) -> &BoundingBoxMetrics {
    evaluation.report.bounding_box[0]
        .output
        .as_ref()
        .expect("lesion should have metrics")
}

#[test]
fn test_identical_boxes_score_perfectly() {
    let boxes = vec![bbox(10, 10, 59, 59), bbox(100, 100, 149, 149)];
    let evaluation = run(
        vec![study("A", boxes.clone())],
        vec![prediction("A", boxes)],
        &EvaluationConfig::default(),
    );

    let metrics = lesion_metrics(&evaluation);
    assert_eq!(metrics.mean_average_precision, Some(1.0));
    assert_eq!(metrics.mean_dice_coefficient, Some(1.0));
    assert_eq!(metrics.mean_intersection_over_union, Some(1.0));
    assert_eq!(metrics.scatter_plot.data, Some(vec![[5000, 5000]]));
}

#[test]
fn test_missed_boxes_score_zero() {
    let evaluation = run(
        vec![study("A", vec![bbox(0, 0, 9, 9)])],
        vec![prediction("A", vec![])],
        &EvaluationConfig::default(),
    );

    let metrics = lesion_metrics(&evaluation);
    assert_eq!(metrics.mean_average_precision, Some(0.0));
    assert_eq!(metrics.mean_dice_coefficient, Some(0.0));
    assert_eq!(metrics.mean_intersection_over_union, Some(0.0));
    assert_eq!(metrics.scatter_plot.data, Some(vec![[100, 0]]));
}

#[test]
fn test_true_negatives_are_excluded() {
    let evaluation = run(
        vec![
            study("A", vec![bbox(0, 0, 9, 9)]),
            study("B", vec![]),
        ],
        vec![
            prediction("A", vec![bbox(0, 0, 9, 9)]),
            prediction("B", vec![]),
        ],
        &EvaluationConfig::default(),
    );

    let metrics = lesion_metrics(&evaluation);
    assert_eq!(metrics.scatter_plot.data, Some(vec![[100, 100]]));
    assert_eq!(metrics.mean_average_precision, Some(1.0));
    assert_eq!(evaluation.diagnostics.skipped_true_negatives, 1);
}

#[test]
fn test_only_true_negatives_leave_null_aggregates() {
    let evaluation = run(
        vec![study("A", vec![])],
        vec![prediction("A", vec![])],
        &EvaluationConfig::default(),
    );

    let metrics = lesion_metrics(&evaluation);
    assert_eq!(metrics.mean_average_precision, None);
    assert_eq!(metrics.mean_dice_coefficient, None);
    assert_eq!(metrics.scatter_plot.data, Some(vec![]));
}

#[test]
fn test_false_positive_halves_precision() {
    let evaluation = run(
        vec![study("A", vec![bbox(0, 0, 9, 9)])],
        vec![prediction("A", vec![bbox(0, 0, 9, 9), bbox(50, 50, 59, 59)])],
        &EvaluationConfig::default(),
    );

    let metrics = lesion_metrics(&evaluation);
    assert_eq!(metrics.mean_average_precision, Some(0.5));
    // Dice = 2 * 100 / (100 + 200)
    assert!((metrics.mean_dice_coefficient.unwrap() - 2.0 / 3.0).abs() < 1e-10);
    assert!((metrics.mean_intersection_over_union.unwrap() - 0.5).abs() < 1e-10);
}

#[test]
fn test_instance_predictions_roll_up_to_study_annotation() {
    let dataset = vec![study("A", vec![bbox(0, 0, 9, 9), bbox(20, 20, 29, 29)])];
    let output = vec![json!({
        "studyInstanceUID": "A",
        "boundingBoxOutput": [
            {"key": "lesion", "output": [bbox(0, 0, 9, 9)], "seriesInstanceUID": "S", "sopInstanceUID": "I1"},
            {"key": "lesion", "output": [bbox(20, 20, 29, 29)], "seriesInstanceUID": "S", "sopInstanceUID": "I2"}
        ]
    })];

    let evaluation = run(dataset, output, &EvaluationConfig::default());
    let wrapper = &evaluation.report.bounding_box[0];
    assert!(wrapper.failures.is_empty());
    assert!(wrapper.unknowns.is_empty());

    let metrics = wrapper.output.as_ref().unwrap();
    assert_eq!(metrics.mean_average_precision, Some(1.0));
    assert_eq!(metrics.mean_dice_coefficient, Some(1.0));
    assert_eq!(metrics.scatter_plot.data, Some(vec![[200, 200]]));
}

#[test]
fn test_cached_overlap_metrics_are_reused() {
    let previous: PreviousEvaluation = serde_json::from_value(json!({
        "classification": [],
        "boundingBox": [{
            "key": "lesion",
            "unknowns": [],
            "failures": [],
            "output": {
                "meanDiceCoefficient": 0.25,
                "meanAveragePrecision": 0.1,
                "meanIntersectionOverUnion": 0.2,
                "scatterPlot": {"data": [[1, 2]]}
            }
        }]
    }))
    .unwrap();
    let config = EvaluationConfig::new().with_previous(Some(previous));

    let boxes = vec![bbox(0, 0, 9, 9)];
    let evaluation = run(vec![study("A", boxes.clone())], vec![prediction("A", boxes)], &config);

    let metrics = lesion_metrics(&evaluation);
    assert_eq!(metrics.mean_dice_coefficient, Some(0.25));
    assert_eq!(metrics.mean_intersection_over_union, Some(0.2));
    assert_eq!(metrics.scatter_plot.data, Some(vec![[1, 2]]));
    // mAP is always recomputed
    assert_eq!(metrics.mean_average_precision, Some(1.0));
    assert_eq!(evaluation.diagnostics.cached_labels, 1);
}

#[test]
fn test_degenerate_boxes_are_skipped_not_fatal() {
    let evaluation = run(
        vec![study("A", vec![bbox(10, 10, 2, 2)])],
        vec![prediction("A", vec![bbox(10, 10, 2, 2)])],
        &EvaluationConfig::default(),
    );

    let metrics = lesion_metrics(&evaluation);
    assert_eq!(metrics.mean_dice_coefficient, None);
    assert_eq!(metrics.scatter_plot.data, Some(vec![[0, 0]]));
    assert_eq!(evaluation.diagnostics.skipped_zero_area, 1);
}
