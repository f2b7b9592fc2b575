//! Metric primitives shared by the modality engines.

pub mod ap;
pub mod confusion;
pub mod iou;
pub mod overlap;
pub mod precision_recall;
pub mod regression;
pub mod roc;

pub use ap::{calculate_case_ap, calculate_case_map, calculate_map, DEFAULT_IOU_THRESHOLDS};
pub use confusion::{accuracy, cohen_kappa, confusion_matrix, macro_recall, recall_for, ValueIndex};
pub use iou::{calculate_iou, calculate_iou_matrix};
pub use overlap::PixelOverlap;
pub use precision_recall::{calculate_precision_recall, PrecisionRecall};
pub use regression::{mean_absolute_error, mean_squared_error};
pub use roc::{roc_auc_score, roc_curve, RocBucket, RocPoint, BINARY_ROC};
