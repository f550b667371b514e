//! Spectral decomposition of the scatter matrix.
//!
//! The scatter matrix `S = AᵗA` is symmetric positive semi-definite, so its
//! singular value decomposition coincides with its eigendecomposition. The
//! decomposition itself is delegated to an [`SvdProvider`]; whatever the
//! provider returns is normalized into a [`Spectrum`] whose values are sorted
//! in descending order with the basis columns permuted to match.

use crate::errors::{validate_dimension, MahalanobisError, MahalanobisResult};
use nalgebra::{linalg::SVD, DMatrix, DVector};
use std::cmp::Ordering;

/// Singular values `W` (descending) and the matching orthonormal basis `U`.
///
/// Column `k` of [`basis`](Spectrum::basis) is the singular vector belonging
/// to `values()[k]`, so `S = U · diag(W) · Uᵗ`.
#[derive(Debug, Clone, PartialEq)]
pub struct Spectrum {
    values: DVector<f64>,
    basis: DMatrix<f64>,
}

impl Spectrum {
    /// Create a spectrum from singular values and basis columns in any order.
    ///
    /// Values must be finite and non-negative; the basis must be square with
    /// one column per value. The pair is re-sorted into descending order.
    pub fn new(values: DVector<f64>, basis: DMatrix<f64>) -> MahalanobisResult<Self> {
        let d = values.len();
        if d == 0 {
            return Err(MahalanobisError::InvalidInput {
                reason: "spectrum has no singular values".to_string(),
            });
        }
        validate_dimension("basis rows", d, basis.nrows())?;
        validate_dimension("basis columns", d, basis.ncols())?;

        if let Some((k, &w)) = values
            .iter()
            .enumerate()
            .find(|(_, w)| !w.is_finite() || **w < 0.0)
        {
            return Err(MahalanobisError::InvalidInput {
                reason: format!("singular value {} is {}, expected finite and >= 0", k, w),
            });
        }

        let mut order: Vec<usize> = (0..d).collect();
        order.sort_by(|&a, &b| {
            values[b]
                .partial_cmp(&values[a])
                .unwrap_or(Ordering::Equal)
        });

        let sorted_values = DVector::from_fn(d, |k, _| values[order[k]]);
        let sorted_basis = DMatrix::from_fn(d, d, |r, c| basis[(r, order[c])]);

        Ok(Self {
            values: sorted_values,
            basis: sorted_basis,
        })
    }

    /// Singular values `W`, descending.
    pub fn values(&self) -> &DVector<f64> {
        &self.values
    }

    /// Orthonormal basis `U`, one singular vector per column.
    pub fn basis(&self) -> &DMatrix<f64> {
        &self.basis
    }

    /// Number of dimensions `D`.
    pub fn dimension(&self) -> usize {
        self.values.len()
    }

    /// `W[0]`
    pub fn largest(&self) -> f64 {
        self.values[0]
    }

    /// `W[D-1]`
    pub fn smallest(&self) -> f64 {
        self.values[self.values.len() - 1]
    }

    /// Ratio of the largest to the smallest singular value.
    ///
    /// Infinite when the smallest value is zero, including the all-zero
    /// spectrum.
    pub fn condition_number(&self) -> f64 {
        let smallest = self.smallest();
        if smallest > 0.0 {
            self.largest() / smallest
        } else {
            f64::INFINITY
        }
    }

    /// Rebuild `U · diag(W) · Uᵗ`.
    pub fn reconstruct(&self) -> DMatrix<f64> {
        &self.basis * DMatrix::from_diagonal(&self.values) * self.basis.transpose()
    }
}

/// Backend computing the spectrum of a symmetric matrix.
///
/// Implementations may return values in any order; [`Spectrum::new`] sorts
/// them. The matrix handed to `decompose` is always square and symmetric.
pub trait SvdProvider {
    /// Decompose `matrix` into singular values and left singular vectors.
    fn decompose(&self, matrix: &DMatrix<f64>) -> MahalanobisResult<Spectrum>;
}

/// [`SvdProvider`] backed by `nalgebra`'s bidiagonalization SVD.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NalgebraSvd {
    /// Iteration cap passed to nalgebra; `0` means no limit
    pub max_iterations: usize,
}

impl NalgebraSvd {
    /// Provider with an iteration cap.
    pub fn with_max_iterations(max_iterations: usize) -> Self {
        Self { max_iterations }
    }
}

impl SvdProvider for NalgebraSvd {
    fn decompose(&self, matrix: &DMatrix<f64>) -> MahalanobisResult<Spectrum> {
        validate_dimension("decomposed matrix columns", matrix.nrows(), matrix.ncols())?;
        if let Some(value) = matrix.iter().find(|v| !v.is_finite()) {
            return Err(MahalanobisError::DecompositionFailed {
                reason: format!("matrix to decompose contains non-finite value {}", value),
            });
        }

        let svd = SVD::try_new(
            matrix.clone(),
            true,
            false,
            f64::EPSILON,
            self.max_iterations,
        )
        .ok_or_else(|| MahalanobisError::DecompositionFailed {
            reason: format!(
                "SVD of {}x{} scatter matrix did not converge",
                matrix.nrows(),
                matrix.ncols()
            ),
        })?;

        let basis = svd.u.ok_or_else(|| MahalanobisError::DecompositionFailed {
            reason: "SVD returned no left singular vectors".to_string(),
        })?;

        Spectrum::new(svd.singular_values, basis)
    }
}
