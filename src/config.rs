//! # Model Configuration
//!
//! Configuration for fitting a [`MahalanobisModel`](crate::MahalanobisModel):
//! the initial regularization fraction and whether inputs are screened for
//! non-finite values.

use crate::errors::{validate_parameter, MahalanobisResult};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Configuration applied when a model is constructed.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ModelConfig {
    /// Regularization fraction: every eigenvalue is floored by `smin * W[0]`
    pub smin: f64,
    /// Reject non-finite sample and reference values at construction
    pub check_finite: bool,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self::standard()
    }
}

impl ModelConfig {
    /// No regularization floor. Fails to build on exactly rank-deficient data.
    pub fn unregularized() -> Self {
        Self {
            smin: 0.0,
            check_finite: true,
        }
    }

    /// Light floor at 0.1% of the largest eigenvalue (default)
    pub fn standard() -> Self {
        Self {
            smin: 1e-3,
            check_finite: true,
        }
    }

    /// Strong floor at 10% of the largest eigenvalue, pulling the metric
    /// toward a scaled Euclidean distance
    pub fn strong() -> Self {
        Self {
            smin: 0.1,
            check_finite: true,
        }
    }

    /// Replace the regularization fraction
    pub fn with_smin(mut self, smin: f64) -> Self {
        self.smin = smin;
        self
    }

    /// Enable or disable the non-finite input screen
    pub fn with_finite_check(mut self, check_finite: bool) -> Self {
        self.check_finite = check_finite;
        self
    }

    /// Check that `smin` is finite and non-negative.
    pub fn validate(&self) -> MahalanobisResult<()> {
        validate_parameter(self.smin, 0.0, f64::INFINITY, "smin")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::MahalanobisError;

    #[test]
    fn test_presets_are_valid() {
        for config in [
            ModelConfig::unregularized(),
            ModelConfig::standard(),
            ModelConfig::strong(),
        ] {
            assert!(config.validate().is_ok(), "{:?} should validate", config);
            assert!(config.check_finite);
        }
        assert_eq!(ModelConfig::default(), ModelConfig::standard());
        assert!(ModelConfig::unregularized().smin < ModelConfig::standard().smin);
        assert!(ModelConfig::standard().smin < ModelConfig::strong().smin);
    }

    #[test]
    fn test_builder_methods() {
        let config = ModelConfig::standard()
            .with_smin(0.25)
            .with_finite_check(false);
        assert_eq!(config.smin, 0.25);
        assert!(!config.check_finite);
    }

    #[test]
    fn test_negative_smin_rejected() {
        let config = ModelConfig::standard().with_smin(-0.5);
        assert!(matches!(
            config.validate(),
            Err(MahalanobisError::InvalidParameter { .. })
        ));
    }
}
