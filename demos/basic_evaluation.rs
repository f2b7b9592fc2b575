//! Basic evaluation example demonstrating core functionality.

use imaging_eval::{
    evaluator::evaluate, load_dataset_from_str, load_output_from_str, metrics::iou::calculate_iou,
    BinaryClassificationMap, BoundingBox, EvaluationConfig,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Imaging Evaluation Example ===\n");

    // Example 1: IoU Calculation
    println!("1. IoU Calculation");
    let bbox1 = BoundingBox::from_corners(10, 10, 59, 59);
    let bbox2 = BoundingBox::from_corners(30, 30, 79, 79);
    let iou = calculate_iou(&bbox1, &bbox2);
    println!("   IoU between overlapping boxes: {:.4}", iou);
    println!();

    // Example 2: Load the annotated dataset
    println!("2. Loading Ground Truth");
    let dataset_json = r#"[
        {
            "studyInstanceUid": "1.2.840.1",
            "annotationData": {
                "classification": [{"key": "density", "value": "1"}],
                "boundingBox": [{"key": "mass", "value": [
                    {"top_left_hand_corner": {"x": 100, "y": 100}, "bottom_right_hand_corner": {"x": 199, "y": 149}}
                ]}]
            }
        },
        {
            "studyInstanceUid": "1.2.840.2",
            "annotationData": {
                "classification": [{"key": "density", "value": "3"}],
                "boundingBox": [{"key": "mass", "value": []}]
            }
        },
        {
            "studyInstanceUid": "1.2.840.3",
            "annotationData": {"classification": [{"key": "density", "value": "4"}]}
        }
    ]"#;

    let dataset = load_dataset_from_str(dataset_json)?;
    println!("   Loaded {} studies", dataset.len());
    println!();

    // Example 3: Load model outputs
    println!("3. Loading Model Outputs");
    let output_json = r#"{"studies": [
        {
            "studyInstanceUID": "1.2.840.1",
            "classificationOutput": [{"key": "density", "output": {"1": 0.7, "2": 0.2, "3": 0.05, "4": 0.05}}],
            "boundingBoxOutput": [{"key": "mass", "output": [
                {"top_left_hand_corner": {"x": 105, "y": 98}, "bottom_right_hand_corner": {"x": 200, "y": 152}}
            ]}]
        },
        {
            "studyInstanceUID": "1.2.840.2",
            "classificationOutput": [{"key": "density", "output": {"1": 0.1, "2": 0.5, "3": 0.3, "4": 0.1}}],
            "boundingBoxOutput": [{"key": "mass", "output": []}]
        },
        {
            "studyInstanceUID": "1.2.840.3",
            "classificationOutput": [{"key": "density", "output": null}]
        }
    ]}"#;

    let output = load_output_from_str(output_json)?;
    println!("   Loaded outputs for {} studies", output.studies.len());
    println!();

    // Example 4: Evaluation with a binary map for density
    println!("4. Running Full Evaluation");
    let config = EvaluationConfig::new()
        .with_threshold(0.5)?
        .with_binary_map("density", BinaryClassificationMap::new(["3", "4"], ["1", "2"]));
    let evaluation = evaluate(Some(&dataset), Some(&output), &config)?;
    println!("   Evaluation complete!");
    println!();

    for wrapper in &evaluation.report.classification {
        println!("   Classification '{}':", wrapper.key);
        println!("   ├─ unknowns: {}", wrapper.unknowns.len());
        println!("   ├─ failures: {}", wrapper.failures.len());
        if let Some(metrics) = &wrapper.output {
            let general = &metrics.general_metrics;
            println!("   ├─ accuracy: {:.4}", general.accuracy);
            println!("   ├─ kappa: {:?}", general.kappa);
            println!("   ├─ sensitivity: {:.4} ({:?})", general.sensitivity, general.regime);
            println!("   ├─ specificity: {:.4}", general.specificity);
            println!("   └─ confusion matrix: {:?}", general.confusion_matrix);
        }
    }
    println!();

    for wrapper in &evaluation.report.bounding_box {
        println!("   Bounding box '{}':", wrapper.key);
        if let Some(metrics) = &wrapper.output {
            println!("   ├─ mean Dice: {:?}", metrics.mean_dice_coefficient);
            println!("   ├─ mean IoU: {:?}", metrics.mean_intersection_over_union);
            println!("   └─ mAP: {:?}", metrics.mean_average_precision);
        }
    }
    println!();

    println!("   {}", evaluation.diagnostics.summary_string());
    println!();

    println!("=== Example Complete ===");

    Ok(())
}
