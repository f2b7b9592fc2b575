//! Error metrics for continuous predictions.

/// Mean of `(gt - pred)²` over the pairs, `None` when there are none.
///
/// # Example
///
/// ```
/// use imaging_eval::metrics::regression::mean_squared_error;
///
/// let mse = mean_squared_error(&[(1.0, 2.0), (3.0, 3.0)]).unwrap();
/// assert_eq!(mse, 0.5);
/// ```
pub fn mean_squared_error(pairs: &[(f64, f64)]) -> Option<f64> {
    mean(pairs.iter().map(|(gt, pred)| (gt - pred).powi(2)), pairs.len())
}

/// Mean of `|gt - pred|` over the pairs, `None` when there are none.
pub fn mean_absolute_error(pairs: &[(f64, f64)]) -> Option<f64> {
    mean(pairs.iter().map(|(gt, pred)| (gt - pred).abs()), pairs.len())
}

fn mean(values: impl Iterator<Item = f64>, count: usize) -> Option<f64> {
    (count > 0).then(|| values.sum::<f64>() / count as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_errors() {
        let pairs = [(1.0, 3.0), (2.0, 1.0), (4.0, 4.0)];
        assert!((mean_squared_error(&pairs).unwrap() - 5.0 / 3.0).abs() < 1e-10);
        assert!((mean_absolute_error(&pairs).unwrap() - 1.0).abs() < 1e-10);
    }

    #[test]
    fn test_empty() {
        assert_eq!(mean_squared_error(&[]), None);
        assert_eq!(mean_absolute_error(&[]), None);
    }
}
