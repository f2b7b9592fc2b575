//! Counters for the recoverable conditions met during an evaluation run.
//!
//! Unknowns, failures, and degenerate comparison cases are folded into the
//! report rather than raised. These counters make them visible at a glance.

use serde::{Deserialize, Serialize};
use std::ops::AddAssign;

/// Statistics collected while aligning and scoring.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostics {
    /// Label keys that produced a wrapper.
    pub labels_evaluated: usize,

    /// Label keys whose wrapper carries null metrics (no comparable pairs).
    pub labels_without_pairs: usize,

    /// Predictions explicitly answered with `null`.
    pub unknown_predictions: usize,

    /// Annotated granularities with no prediction entry.
    pub failed_predictions: usize,

    /// Bounding-box cases with no boxes on either side.
    pub skipped_true_negatives: usize,

    /// Bounding-box cases excluded from Dice/IoU because both areas are zero.
    pub skipped_zero_area: usize,

    /// Bounding-box labels whose overlap metrics came from a previous report.
    pub cached_labels: usize,
}

impl Diagnostics {
    /// Create a new `Diagnostics` with all counters at zero
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_label(&mut self, unknowns: usize, failures: usize, has_metrics: bool) {
        self.labels_evaluated += 1;
        self.unknown_predictions += unknowns;
        self.failed_predictions += failures;
        if !has_metrics {
            self.labels_without_pairs += 1;
        }
    }

    pub fn skip_true_negative(&mut self) {
        self.skipped_true_negatives += 1;
    }

    pub fn skip_zero_area(&mut self) {
        self.skipped_zero_area += 1;
    }

    pub fn record_cache_hit(&mut self) {
        self.cached_labels += 1;
    }

    /// Total degenerate cases skipped by the bounding-box engine.
    pub fn total_skipped(&self) -> usize {
        self.skipped_true_negatives + self.skipped_zero_area
    }

    /// Get a formatted string summary of the statistics
    pub fn summary_string(&self) -> String {
        format!(
            "Diagnostics {{ labels: {}, without_pairs: {}, unknowns: {}, failures: {}, \
             skipped_cases: {}, cached: {} }}",
            self.labels_evaluated,
            self.labels_without_pairs,
            self.unknown_predictions,
            self.failed_predictions,
            self.total_skipped(),
            self.cached_labels
        )
    }
}

impl AddAssign for Diagnostics {
    fn add_assign(&mut self, other: Self) {
        self.labels_evaluated += other.labels_evaluated;
        self.labels_without_pairs += other.labels_without_pairs;
        self.unknown_predictions += other.unknown_predictions;
        self.failed_predictions += other.failed_predictions;
        self.skipped_true_negatives += other.skipped_true_negatives;
        self.skipped_zero_area += other.skipped_zero_area;
        self.cached_labels += other.cached_labels;
    }
}
