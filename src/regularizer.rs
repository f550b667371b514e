//! Regularized inverse-covariance operator.
//!
//! Instead of truncating small eigenvalues, every eigenvalue of the scatter
//! matrix is raised by the same floor `σ² = smin · W[0]` before inversion:
//!
//! ```text
//! Σ⁻¹ = (N-1) · U · diag(W + σ²)⁻¹ · Uᵗ
//! ```
//!
//! With `smin = 0` this is the plain inverse covariance and fails on an
//! exactly rank-deficient sample; larger `smin` moves the metric toward a
//! scaled Euclidean distance.

use crate::{
    errors::{validate_parameter, validate_sample_count, MahalanobisError, MahalanobisResult},
    estimation::MIN_SAMPLES,
    spectrum::Spectrum,
};
use nalgebra::{DMatrix, DVector};

/// Condition number of the regularized spectrum above which a build logs a warning.
pub const MAX_CONDITION_NUMBER: f64 = 1e12;

/// The operator consumed by distance queries, with the parameters that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct RegularizedOperator {
    matrix: DMatrix<f64>,
    regularized_values: DVector<f64>,
    sigma2: f64,
    smin: f64,
}

impl RegularizedOperator {
    /// Build the operator for a spectrum estimated from `sample_count` samples.
    ///
    /// # Errors
    /// * `InvalidParameter` when `smin` is negative or not finite
    /// * `InsufficientSamples` when `sample_count < 2`
    /// * `NumericDegeneracy` when some `W[k] + σ²` is zero or too small to invert
    pub fn from_spectrum(
        spectrum: &Spectrum,
        smin: f64,
        sample_count: usize,
    ) -> MahalanobisResult<Self> {
        validate_parameter(smin, 0.0, f64::INFINITY, "smin")?;
        validate_sample_count(sample_count, MIN_SAMPLES)?;

        let sigma2 = smin * spectrum.largest();
        let regularized_values = spectrum.values().map(|w| w + sigma2);

        let mut inverse = DVector::zeros(regularized_values.len());
        for (k, &value) in regularized_values.iter().enumerate() {
            let reciprocal = 1.0 / value;
            if value == 0.0 || !reciprocal.is_finite() {
                return Err(MahalanobisError::NumericDegeneracy { index: k, value, smin });
            }
            inverse[k] = reciprocal;
        }

        let u = spectrum.basis();
        let product = u * DMatrix::from_diagonal(&inverse) * u.transpose();
        // exact symmetry keeps d(p, q) == d(q, p) bit for bit
        let matrix = (&product + product.transpose()) * (0.5 * (sample_count - 1) as f64);

        Ok(Self {
            matrix,
            regularized_values,
            sigma2,
            smin,
        })
    }

    /// The D×D symmetric positive-definite operator.
    pub fn matrix(&self) -> &DMatrix<f64> {
        &self.matrix
    }

    /// `W + σ²`, descending.
    pub fn regularized_values(&self) -> &DVector<f64> {
        &self.regularized_values
    }

    /// Floor added to every eigenvalue.
    pub fn sigma2(&self) -> f64 {
        self.sigma2
    }

    /// Regularization fraction the operator was built with.
    pub fn smin(&self) -> f64 {
        self.smin
    }

    /// Number of dimensions D.
    pub fn dimension(&self) -> usize {
        self.matrix.nrows()
    }

    /// `(W[0] + σ²) / (W[D-1] + σ²)`
    pub fn condition_number(&self) -> f64 {
        let values = &self.regularized_values;
        values[0] / values[values.len() - 1]
    }
}
