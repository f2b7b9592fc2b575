//! Classification threshold utilities.

use crate::error::{EvalError, Result};

/// Default decision boundary for binary outputs.
pub const DEFAULT_THRESHOLD: f64 = 0.5;

/// Check that a threshold is a probability.
///
/// # Errors
///
/// Returns an error if the threshold is not in the valid range [0.0, 1.0].
///
/// # Example
///
/// ```
/// use imaging_eval::threshold::validate_threshold;
///
/// assert!(validate_threshold(0.3).is_ok());
/// assert!(validate_threshold(1.5).is_err());
/// ```
pub fn validate_threshold(threshold: f64) -> Result<f64> {
    if !(0.0..=1.0).contains(&threshold) {
        return Err(EvalError::InvalidThreshold(format!(
            "Threshold must be between 0.0 and 1.0, got {threshold}"
        )));
    }
    Ok(threshold)
}

/// Binarize scores: 1 when `score >= threshold`, else 0.
pub fn binarize(scores: &[f64], threshold: f64) -> Vec<u8> {
    scores
        .iter()
        .map(|&score| u8::from(score >= threshold))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_bounds_inclusive() {
        assert!(validate_threshold(0.0).is_ok());
        assert!(validate_threshold(1.0).is_ok());
        assert!(validate_threshold(-0.1).is_err());
        assert!(validate_threshold(f64::NAN).is_err());
    }

    #[test]
    fn test_binarize_is_inclusive() {
        assert_eq!(binarize(&[0.2, 0.5, 0.9], 0.5), vec![0, 1, 1]);
        assert!(binarize(&[], 0.5).is_empty());
    }
}
