//! Confusion matrix, accuracy, Cohen's kappa, and per-class recall over
//! integer-coded label sequences.

use indexmap::IndexMap;

/// Label every comparison treats as "negative" / "absent".
pub const NEGATIVE_LABEL: &str = "0";

/// Dense integer codes for the labels seen in a comparison.
///
/// Labels sort ascending (as strings). A two-label set containing `"0"` puts
/// `"0"` last, so the positive label always takes index 0.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValueIndex {
    labels: Vec<String>,
}

impl ValueIndex {
    /// Enumerate the union of `values`.
    ///
    /// # Example
    ///
    /// ```
    /// use imaging_eval::metrics::confusion::ValueIndex;
    ///
    /// let index = ValueIndex::from_values(["0", "1", "0"]);
    /// assert_eq!(index.labels(), &["1".to_string(), "0".to_string()]);
    ///
    /// let index = ValueIndex::from_values(["3", "1", "2"]);
    /// assert_eq!(index.index_of("1"), Some(0));
    /// ```
    pub fn from_values<'a>(values: impl IntoIterator<Item = &'a str>) -> Self {
        let mut labels: Vec<String> = values.into_iter().map(str::to_string).collect();
        labels.sort();
        labels.dedup();
        if labels.len() == 2 && labels[0] == NEGATIVE_LABEL {
            labels.swap(0, 1);
        }
        Self { labels }
    }

    pub fn index_of(&self, label: &str) -> Option<usize> {
        self.labels.iter().position(|known| known == label)
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Exactly two labels, one of them `"0"`.
    pub fn is_true_binary(&self) -> bool {
        self.len() == 2 && self.index_of(NEGATIVE_LABEL).is_some()
    }

    /// Encode labels; unknown labels are skipped.
    pub fn encode<'a>(&self, labels: impl IntoIterator<Item = &'a str>) -> Vec<usize> {
        labels
            .into_iter()
            .filter_map(|label| self.index_of(label))
            .collect()
    }

    /// Label → index, in index order, for the report.
    pub fn to_map(&self) -> IndexMap<String, usize> {
        self.labels
            .iter()
            .enumerate()
            .map(|(index, label)| (label.clone(), index))
            .collect()
    }
}

/// Square matrix with rows = ground truth, columns = prediction.
///
/// # Example
///
/// ```
/// use imaging_eval::metrics::confusion::confusion_matrix;
///
/// let matrix = confusion_matrix(&[0, 1, 1], &[0, 1, 0], 2);
/// assert_eq!(matrix, vec![vec![1, 0], vec![1, 1]]);
/// ```
pub fn confusion_matrix(
    ground_truths: &[usize],
    predictions: &[usize],
    classes: usize,
) -> Vec<Vec<u64>> {
    let mut matrix = vec![vec![0u64; classes]; classes];
    for (&gt, &pred) in ground_truths.iter().zip(predictions) {
        if gt < classes && pred < classes {
            matrix[gt][pred] += 1;
        }
    }
    matrix
}

/// Fraction of positions where prediction equals ground truth.
pub fn accuracy(ground_truths: &[usize], predictions: &[usize]) -> f64 {
    let total = ground_truths.len().min(predictions.len());
    if total == 0 {
        return 0.0;
    }
    let correct = ground_truths
        .iter()
        .zip(predictions)
        .filter(|(gt, pred)| gt == pred)
        .count();
    correct as f64 / total as f64
}

/// Cohen's kappa from a confusion matrix.
///
/// `None` when chance agreement is total (a single class on both sides), where
/// kappa is undefined.
pub fn cohen_kappa(matrix: &[Vec<u64>]) -> Option<f64> {
    let total: u64 = matrix.iter().flatten().sum();
    if total == 0 {
        return None;
    }
    let total = total as f64;

    let observed = (0..matrix.len()).map(|i| matrix[i][i]).sum::<u64>() as f64 / total;
    let expected = (0..matrix.len())
        .map(|i| {
            let row: u64 = matrix[i].iter().sum();
            let column: u64 = matrix.iter().map(|row| row[i]).sum();
            row as f64 * column as f64
        })
        .sum::<f64>()
        / (total * total);

    if (1.0 - expected).abs() < f64::EPSILON {
        return None;
    }
    Some((observed - expected) / (1.0 - expected))
}

/// Recall of one class: correct predictions of `class` over its ground-truth count.
/// 0.0 when `class` never occurs in the ground truth.
pub fn recall_for<T: PartialEq>(ground_truths: &[T], predictions: &[T], class: &T) -> f64 {
    let mut support = 0usize;
    let mut hits = 0usize;
    for (gt, pred) in ground_truths.iter().zip(predictions) {
        if gt == class {
            support += 1;
            if pred == class {
                hits += 1;
            }
        }
    }
    if support == 0 {
        return 0.0;
    }
    hits as f64 / support as f64
}

/// Unweighted mean of per-class recall over `classes` codes.
pub fn macro_recall(ground_truths: &[usize], predictions: &[usize], classes: usize) -> f64 {
    if classes == 0 {
        return 0.0;
    }
    (0..classes)
        .map(|class| recall_for(ground_truths, predictions, &class))
        .sum::<f64>()
        / classes as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_index_sorts_as_strings() {
        let index = ValueIndex::from_values(["2", "10", "1"]);
        assert_eq!(index.labels(), &["1", "10", "2"]);
        assert!(!index.is_true_binary());
    }

    #[test]
    fn test_value_index_puts_zero_last_for_binary() {
        let index = ValueIndex::from_values(["0", "positive"]);
        assert_eq!(index.index_of("positive"), Some(0));
        assert_eq!(index.index_of("0"), Some(1));
        assert!(index.is_true_binary());
    }

    #[test]
    fn test_confusion_matrix_sums() {
        let gts = vec![0, 0, 1, 2, 2, 2];
        let preds = vec![0, 1, 1, 2, 0, 2];
        let matrix = confusion_matrix(&gts, &preds, 3);
        let row_sums: Vec<u64> = matrix.iter().map(|row| row.iter().sum()).collect();
        assert_eq!(row_sums, vec![2, 1, 3]);
        assert_eq!(matrix.iter().flatten().sum::<u64>(), 6);
    }

    #[test]
    fn test_accuracy() {
        assert_eq!(accuracy(&[0, 1, 1, 0], &[0, 1, 0, 0]), 0.75);
        assert_eq!(accuracy(&[], &[]), 0.0);
    }

    #[test]
    fn test_kappa_perfect_and_chance() {
        let perfect = confusion_matrix(&[0, 1], &[0, 1], 2);
        assert_eq!(cohen_kappa(&perfect), Some(1.0));

        // Predictions independent of the truth.
        let chance = confusion_matrix(&[0, 0, 1, 1], &[0, 1, 0, 1], 2);
        assert!(cohen_kappa(&chance).unwrap().abs() < 1e-10);

        let single_class = confusion_matrix(&[0, 0], &[0, 0], 1);
        assert_eq!(cohen_kappa(&single_class), None);
    }

    #[test]
    fn test_kappa_known_value() {
        // po = 0.7, pe = (0.5 * 0.6) + (0.5 * 0.4) = 0.5 → kappa = 0.4
        let matrix = vec![vec![4, 1], vec![2, 3]];
        assert!((cohen_kappa(&matrix).unwrap() - 0.4).abs() < 1e-10);
    }

    #[test]
    fn test_recall_for_label() {
        let gts = ["0", "1", "0", "1"];
        let preds = ["0", "1", "1", "1"];
        assert_eq!(recall_for(&gts, &preds, &"0"), 0.5);
        assert_eq!(recall_for(&gts, &preds, &"1"), 1.0);
        assert_eq!(recall_for(&gts, &preds, &"2"), 0.0);
    }

    #[test]
    fn test_macro_recall() {
        let gts = vec![0, 0, 1, 2];
        let preds = vec![0, 1, 1, 1];
        // (0.5 + 1.0 + 0.0) / 3
        assert!((macro_recall(&gts, &preds, 3) - 0.5).abs() < 1e-10);
    }
}
