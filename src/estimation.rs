//! Sample statistics behind a Mahalanobis model.
//!
//! Turns an N×D sample matrix (one sample per row) into the quantities the
//! regularizer needs: the reference vector, the spectrum of the centered
//! scatter matrix `S = AᵗA`, and the sample covariance `S / (N-1)`.

use crate::{
    errors::{
        validate_all_finite, validate_dimension, validate_sample_count, MahalanobisError,
        MahalanobisResult,
    },
    spectrum::{Spectrum, SvdProvider},
};
use nalgebra::{DMatrix, DVector};

/// Minimum number of sample rows for an `N-1` normalization.
pub const MIN_SAMPLES: usize = 2;

/// Raw (unregularized) statistics estimated from a sample set.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleStatistics {
    /// Distribution center, D×1
    pub reference: DVector<f64>,
    /// Descending spectrum of the centered scatter matrix
    pub spectrum: Spectrum,
    /// `S / (N-1)`; informational only
    pub covariance: DMatrix<f64>,
    /// Number of samples N
    pub sample_count: usize,
}

impl SampleStatistics {
    /// Number of dimensions D.
    pub fn dimension(&self) -> usize {
        self.reference.len()
    }
}

/// Per-dimension mean of the sample rows.
pub fn column_means(samples: &DMatrix<f64>) -> DVector<f64> {
    DVector::from_iterator(samples.ncols(), samples.column_iter().map(|col| col.mean()))
}

/// Subtract `reference` from every sample row.
pub fn center_samples(samples: &DMatrix<f64>, reference: &DVector<f64>) -> DMatrix<f64> {
    DMatrix::from_fn(samples.nrows(), samples.ncols(), |i, j| {
        samples[(i, j)] - reference[j]
    })
}

/// `AᵗA` for a centered sample matrix `A`.
pub fn scatter_matrix(centered: &DMatrix<f64>) -> DMatrix<f64> {
    centered.transpose() * centered
}

/// Estimate reference, spectrum and covariance from a sample set.
///
/// # Arguments
/// * `samples` - N×D sample matrix, N >= 2
/// * `reference` - optional D×1 center; the column means are used when absent
/// * `provider` - decomposition backend for the scatter matrix
/// * `check_finite` - reject non-finite samples or reference entries
///
/// # Errors
/// * `InsufficientSamples` when N < 2
/// * `InvalidInput` for a sample set without columns or with non-finite values,
///   or when the scatter matrix overflows
/// * `DimensionMismatch` when the reference is not D×1
/// * `DecompositionFailed` when the provider cannot decompose `S`
pub fn estimate_statistics<P: SvdProvider + ?Sized>(
    samples: &DMatrix<f64>,
    reference: Option<DVector<f64>>,
    provider: &P,
    check_finite: bool,
) -> MahalanobisResult<SampleStatistics> {
    let n = samples.nrows();
    let d = samples.ncols();

    validate_sample_count(n, MIN_SAMPLES)?;
    if d == 0 {
        return Err(MahalanobisError::InvalidInput {
            reason: "sample set has no columns".to_string(),
        });
    }
    if check_finite {
        validate_all_finite(samples.as_slice(), "samples")?;
    }

    let reference = match reference {
        Some(reference) => {
            validate_dimension("reference rows", d, reference.len())?;
            if check_finite {
                validate_all_finite(reference.as_slice(), "reference")?;
            }
            reference
        }
        None => column_means(samples),
    };

    let centered = center_samples(samples, &reference);
    let scatter = scatter_matrix(&centered);
    // finite samples can still overflow AᵗA
    validate_all_finite(scatter.as_slice(), "scatter matrix")?;
    let spectrum = provider.decompose(&scatter)?;
    validate_dimension("spectrum dimension", d, spectrum.dimension())?;

    let covariance = scatter / (n - 1) as f64;

    Ok(SampleStatistics {
        reference,
        spectrum,
        covariance,
        sample_count: n,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spectrum::NalgebraSvd;
    use assert_approx_eq::assert_approx_eq;

    fn square_corners() -> DMatrix<f64> {
        DMatrix::from_row_slice(4, 2, &[0.0, 0.0, 2.0, 0.0, 0.0, 2.0, 2.0, 2.0])
    }

    #[test]
    fn test_column_means() {
        let means = column_means(&square_corners());
        assert_eq!(means.as_slice(), &[1.0, 1.0]);
    }

    #[test]
    fn test_centering_and_scatter() {
        let samples = square_corners();
        let centered = center_samples(&samples, &column_means(&samples));
        assert_eq!(centered.row(0).iter().copied().collect::<Vec<_>>(), vec![-1.0, -1.0]);
        assert_eq!(centered.row(3).iter().copied().collect::<Vec<_>>(), vec![1.0, 1.0]);

        let scatter = scatter_matrix(&centered);
        assert_eq!(scatter, DMatrix::from_row_slice(2, 2, &[4.0, 0.0, 0.0, 4.0]));
    }

    #[test]
    fn test_estimate_statistics_without_reference() {
        let stats =
            estimate_statistics(&square_corners(), None, &NalgebraSvd::default(), true).unwrap();

        assert_eq!(stats.sample_count, 4);
        assert_eq!(stats.dimension(), 2);
        assert_eq!(stats.reference.as_slice(), &[1.0, 1.0]);
        assert_approx_eq!(stats.spectrum.values()[0], 4.0, 1e-12);
        assert_approx_eq!(stats.spectrum.values()[1], 4.0, 1e-12);
        assert_approx_eq!(stats.covariance[(0, 0)], 4.0 / 3.0, 1e-12);
        assert_approx_eq!(stats.covariance[(0, 1)], 0.0, 1e-12);
    }

    #[test]
    fn test_estimate_statistics_with_reference() {
        let reference = DVector::from_vec(vec![0.0, 0.0]);
        let stats = estimate_statistics(
            &square_corners(),
            Some(reference.clone()),
            &NalgebraSvd::default(),
            true,
        )
        .unwrap();

        assert_eq!(stats.reference, reference);
        // uncentered scatter: sum of x_i x_i^t = [[8,4],[4,8]] -> eigenvalues 12, 4
        assert_approx_eq!(stats.spectrum.values()[0], 12.0, 1e-10);
        assert_approx_eq!(stats.spectrum.values()[1], 4.0, 1e-10);
    }

    #[test]
    fn test_estimate_statistics_rejects_malformed_input() {
        let provider = NalgebraSvd::default();

        let one_row = DMatrix::from_row_slice(1, 2, &[1.0, 2.0]);
        assert!(matches!(
            estimate_statistics(&one_row, None, &provider, true),
            Err(MahalanobisError::InsufficientSamples { required: 2, actual: 1 })
        ));

        let wrong_reference = DVector::from_vec(vec![1.0, 2.0, 3.0]);
        assert!(matches!(
            estimate_statistics(&square_corners(), Some(wrong_reference), &provider, true),
            Err(MahalanobisError::DimensionMismatch { .. })
        ));

        let mut with_nan = square_corners();
        with_nan[(2, 1)] = f64::NAN;
        assert!(matches!(
            estimate_statistics(&with_nan, None, &provider, true),
            Err(MahalanobisError::InvalidInput { .. })
        ));

        let no_columns = DMatrix::<f64>::zeros(3, 0);
        assert!(matches!(
            estimate_statistics(&no_columns, None, &provider, true),
            Err(MahalanobisError::InvalidInput { .. })
        ));
    }

    #[test]
    fn test_scatter_overflow_is_an_error() {
        let provider = NalgebraSvd::default();
        let huge = DMatrix::from_row_slice(3, 2, &[1e200, 0.0, -1e200, 1.0, 0.0, 2.0]);
        match estimate_statistics(&huge, None, &provider, true) {
            Err(MahalanobisError::InvalidInput { reason }) => {
                assert!(reason.contains("scatter matrix"), "{}", reason);
            }
            other => panic!("Expected InvalidInput, got {:?}", other),
        }

        // unscreened NaN samples are caught at the scatter matrix
        let mut with_nan = square_corners();
        with_nan[(0, 0)] = f64::NAN;
        assert!(matches!(
            estimate_statistics(&with_nan, None, &provider, false),
            Err(MahalanobisError::InvalidInput { .. })
        ));
    }
}
