//! Error types and validation functions for regularized Mahalanobis distances.
//!
//! Every failure the crate can report is a precondition violation detected
//! before any numeric work proceeds, so no operation leaves a model partially
//! mutated. Variants group into three categories (see [`ErrorCategory`]):
//! malformed input, queries against a stale operator, and numerical
//! degeneracy during the build step.

use thiserror::Error;

/// Error types for model construction, operator builds and distance queries.
#[derive(Error, Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum MahalanobisError {
    /// Not enough samples to estimate a scatter matrix.
    #[error("Insufficient samples: need at least {required} rows, got {actual}")]
    InsufficientSamples {
        /// Minimum number of sample rows
        required: usize,
        /// Number of rows provided
        actual: usize,
    },

    /// A matrix, vector or image does not have the expected extent.
    #[error("Dimension mismatch for {what}: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Which input was malformed (e.g. "reference rows")
        what: String,
        /// Expected extent
        expected: usize,
        /// Extent actually provided
        actual: usize,
    },

    /// A scalar parameter lies outside its admissible range.
    #[error("Invalid parameter: {parameter} = {value}, expected {constraint}")]
    InvalidParameter {
        /// Parameter name
        parameter: String,
        /// Rejected value
        value: f64,
        /// Valid range or constraint description
        constraint: String,
    },

    /// Input values are unusable (non-finite entries, unrepresentable pixels).
    #[error("Invalid input: {reason}")]
    InvalidInput {
        /// Description of the problem
        reason: String,
    },

    /// The regularized operator was read while the model is stale.
    #[error("Model not built: {operation} requires build() after the last change to smin")]
    NotBuilt {
        /// Operation that was attempted
        operation: String,
    },

    /// A regularized eigenvalue cannot be inverted.
    #[error("Numeric degeneracy: regularized eigenvalue {index} = {value:e} cannot be inverted (smin = {smin})")]
    NumericDegeneracy {
        /// Position of the offending eigenvalue in the descending spectrum
        index: usize,
        /// Value of `W[index] + sigma2`
        value: f64,
        /// Regularization fraction in effect
        smin: f64,
    },

    /// The singular value decomposition did not converge.
    #[error("Decomposition failed: {reason}")]
    DecompositionFailed {
        /// Reason reported by the decomposition backend
        reason: String,
    },
}

/// Coarse classification of [`MahalanobisError`] variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Malformed shape, type or value of an input
    InvalidArgument,
    /// Query against a model whose operator is stale
    NotBuilt,
    /// Numerical failure while building the operator
    NumericDegeneracy,
}

impl MahalanobisError {
    /// Classify this error.
    pub fn category(&self) -> ErrorCategory {
        match self {
            MahalanobisError::InsufficientSamples { .. }
            | MahalanobisError::DimensionMismatch { .. }
            | MahalanobisError::InvalidParameter { .. }
            | MahalanobisError::InvalidInput { .. } => ErrorCategory::InvalidArgument,
            MahalanobisError::NotBuilt { .. } => ErrorCategory::NotBuilt,
            MahalanobisError::NumericDegeneracy { .. }
            | MahalanobisError::DecompositionFailed { .. } => ErrorCategory::NumericDegeneracy,
        }
    }

    pub(crate) fn not_built(operation: &str) -> Self {
        MahalanobisError::NotBuilt {
            operation: operation.to_string(),
        }
    }
}

/// Result type for Mahalanobis operations.
pub type MahalanobisResult<T> = Result<T, MahalanobisError>;

/// Validates that a sample set has enough rows.
///
/// # Example
/// ```rust
/// use regularized_mahalanobis::errors::validate_sample_count;
///
/// assert!(validate_sample_count(2, 2).is_ok());
/// assert!(validate_sample_count(1, 2).is_err());
/// ```
pub fn validate_sample_count(actual: usize, required: usize) -> MahalanobisResult<()> {
    if actual < required {
        Err(MahalanobisError::InsufficientSamples { required, actual })
    } else {
        Ok(())
    }
}

/// Validates that an extent matches the expected one.
pub fn validate_dimension(what: &str, expected: usize, actual: usize) -> MahalanobisResult<()> {
    if expected != actual {
        Err(MahalanobisError::DimensionMismatch {
            what: what.to_string(),
            expected,
            actual,
        })
    } else {
        Ok(())
    }
}

/// Validates that a parameter is finite and within `[min, max]`.
///
/// # Arguments
/// * `value` - Parameter value to validate
/// * `min` - Minimum acceptable value (inclusive)
/// * `max` - Maximum acceptable value (inclusive, may be infinite)
/// * `name` - Parameter name for error reporting
///
/// # Example
/// ```rust
/// use regularized_mahalanobis::errors::validate_parameter;
///
/// assert!(validate_parameter(0.1, 0.0, f64::INFINITY, "smin").is_ok());
/// assert!(validate_parameter(-0.1, 0.0, f64::INFINITY, "smin").is_err());
/// assert!(validate_parameter(f64::NAN, 0.0, f64::INFINITY, "smin").is_err());
/// ```
pub fn validate_parameter(value: f64, min: f64, max: f64, name: &str) -> MahalanobisResult<()> {
    if !value.is_finite() {
        return Err(MahalanobisError::InvalidParameter {
            parameter: name.to_string(),
            value,
            constraint: "a finite value".to_string(),
        });
    }

    if value < min || value > max {
        Err(MahalanobisError::InvalidParameter {
            parameter: name.to_string(),
            value,
            constraint: format!("[{}, {}]", min, max),
        })
    } else {
        Ok(())
    }
}

/// Validates that all values in a slice are finite.
///
/// Returns on the first non-finite value, reporting its index in `data`.
/// Matrices can be checked through their column-major `as_slice()`.
///
/// # Example
/// ```rust
/// use regularized_mahalanobis::errors::validate_all_finite;
///
/// assert!(validate_all_finite(&[1.0, 2.0], "samples").is_ok());
/// assert!(validate_all_finite(&[1.0, f64::NAN], "samples").is_err());
/// ```
pub fn validate_all_finite(data: &[f64], name: &str) -> MahalanobisResult<()> {
    if let Some((i, &value)) = data.iter().enumerate().find(|(_, v)| !v.is_finite()) {
        return Err(MahalanobisError::InvalidInput {
            reason: format!("{} contains non-finite value at index {}: {}", name, i, value),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_sample_count() {
        assert!(validate_sample_count(4, 2).is_ok());
        assert!(validate_sample_count(2, 2).is_ok());

        match validate_sample_count(1, 2) {
            Err(MahalanobisError::InsufficientSamples { required, actual }) => {
                assert_eq!(required, 2);
                assert_eq!(actual, 1);
            }
            other => panic!("Expected InsufficientSamples, got {:?}", other),
        }
    }

    #[test]
    fn test_validate_dimension() {
        assert!(validate_dimension("reference rows", 3, 3).is_ok());

        match validate_dimension("reference rows", 3, 2) {
            Err(MahalanobisError::DimensionMismatch {
                what,
                expected,
                actual,
            }) => {
                assert_eq!(what, "reference rows");
                assert_eq!(expected, 3);
                assert_eq!(actual, 2);
            }
            other => panic!("Expected DimensionMismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_validate_parameter_ranges() {
        assert!(validate_parameter(0.0, 0.0, f64::INFINITY, "smin").is_ok());
        assert!(validate_parameter(5.0, 0.0, f64::INFINITY, "smin").is_ok());

        match validate_parameter(-1.0, 0.0, 1.0, "smin") {
            Err(MahalanobisError::InvalidParameter {
                parameter,
                value,
                constraint,
            }) => {
                assert_eq!(parameter, "smin");
                assert_eq!(value, -1.0);
                assert_eq!(constraint, "[0, 1]");
            }
            other => panic!("Expected InvalidParameter, got {:?}", other),
        }

        assert!(validate_parameter(f64::INFINITY, 0.0, f64::INFINITY, "smin").is_err());
    }

    #[test]
    fn test_validate_all_finite_reports_index() {
        let data = [1.0, 2.0, f64::NEG_INFINITY, 4.0];
        match validate_all_finite(&data, "samples") {
            Err(MahalanobisError::InvalidInput { reason }) => {
                assert!(reason.contains("samples"));
                assert!(reason.contains("index 2"));
            }
            other => panic!("Expected InvalidInput, got {:?}", other),
        }
        assert!(validate_all_finite(&[], "empty").is_ok());
    }

    #[test]
    fn test_error_categories() {
        let invalid = MahalanobisError::InvalidInput {
            reason: "bad".to_string(),
        };
        assert_eq!(invalid.category(), ErrorCategory::InvalidArgument);

        assert_eq!(
            MahalanobisError::not_built("point_to").category(),
            ErrorCategory::NotBuilt
        );

        let degenerate = MahalanobisError::NumericDegeneracy {
            index: 1,
            value: 0.0,
            smin: 0.0,
        };
        assert_eq!(degenerate.category(), ErrorCategory::NumericDegeneracy);

        let svd = MahalanobisError::DecompositionFailed {
            reason: "no convergence".to_string(),
        };
        assert_eq!(svd.category(), ErrorCategory::NumericDegeneracy);
    }

    #[test]
    fn test_error_display_formatting() {
        let err = MahalanobisError::InsufficientSamples {
            required: 2,
            actual: 1,
        };
        let msg = format!("{}", err);
        assert!(msg.contains("Insufficient samples"));
        assert!(msg.contains('2'));

        let err = MahalanobisError::not_built("points_to");
        let msg = format!("{}", err);
        assert!(msg.contains("not built"));
        assert!(msg.contains("points_to"));

        let err = MahalanobisError::DimensionMismatch {
            what: "point columns".to_string(),
            expected: 3,
            actual: 4,
        };
        assert_eq!(
            format!("{}", err),
            "Dimension mismatch for point columns: expected 3, got 4"
        );
    }
}
