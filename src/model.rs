//! # Regularized Mahalanobis Model
//!
//! [`MahalanobisModel`] owns everything estimated from a sample set (reference,
//! spectrum, sample covariance) plus the regularization fraction `smin` and
//! the operator derived from them.
//!
//! The operator lives in an explicit two-state machine ([`OperatorState`]):
//!
//! - a freshly constructed model is `Stale`;
//! - [`build`](MahalanobisModel::build) moves it to `Built`;
//! - [`set_smin`](MahalanobisModel::set_smin) moves it back to `Stale`.
//!
//! Distance queries go through a [`DistanceEngine`] obtained from
//! [`built`](MahalanobisModel::built). The engine borrows the model, so the
//! operator cannot be invalidated while queries are running.
//!
//! ## Usage Example
//!
//! ```rust
//! use nalgebra::{DMatrix, DVector};
//! use regularized_mahalanobis::{MahalanobisModel, MahalanobisError};
//!
//! # fn main() -> Result<(), MahalanobisError> {
//! let samples = DMatrix::from_row_slice(4, 2, &[0.0, 0.0, 2.0, 0.0, 0.0, 2.0, 2.0, 2.0]);
//! let mut model = MahalanobisModel::new(&samples, 0.1, None)?;
//! assert!(model.is_dirty());
//!
//! model.build()?;
//! let engine = model.built()?;
//! let d = engine.point_to_reference(&DVector::from_vec(vec![3.0, 1.0]))?;
//! assert!(d > 0.0);
//! # Ok(())
//! # }
//! ```

use crate::{
    config::ModelConfig,
    distance::DistanceEngine,
    errors::{validate_parameter, MahalanobisError, MahalanobisResult},
    estimation::{estimate_statistics, SampleStatistics},
    image::{Channel, Image},
    regularizer::{RegularizedOperator, MAX_CONDITION_NUMBER},
    spectrum::{NalgebraSvd, Spectrum, SvdProvider},
};
use nalgebra::{DMatrix, DVector};

/// Whether the regularized operator matches the current `smin`.
#[derive(Debug, Clone, PartialEq)]
pub enum OperatorState {
    /// No operator, or one built for an older `smin`
    Stale,
    /// Operator valid for the current `smin`
    Built(RegularizedOperator),
}

/// A distribution model answering regularized Mahalanobis distance queries.
#[derive(Debug, Clone)]
pub struct MahalanobisModel {
    statistics: SampleStatistics,
    smin: f64,
    state: OperatorState,
}

impl MahalanobisModel {
    /// Fit a model to `samples` (N×D, one sample per row).
    ///
    /// # Arguments
    /// * `samples` - sample set with at least two rows
    /// * `smin` - initial regularization fraction, finite and >= 0
    /// * `reference` - optional D×1 center; the column means are used when `None`
    ///
    /// The returned model is stale; call [`build`](Self::build) before querying.
    pub fn new(
        samples: &DMatrix<f64>,
        smin: f64,
        reference: Option<DVector<f64>>,
    ) -> MahalanobisResult<Self> {
        Self::with_config(samples, reference, &ModelConfig::default().with_smin(smin))
    }

    /// Fit a model using the settings in `config`.
    pub fn with_config(
        samples: &DMatrix<f64>,
        reference: Option<DVector<f64>>,
        config: &ModelConfig,
    ) -> MahalanobisResult<Self> {
        Self::with_provider(samples, reference, config, &NalgebraSvd::default())
    }

    /// Fit a model, decomposing the scatter matrix with `provider`.
    pub fn with_provider<P: SvdProvider + ?Sized>(
        samples: &DMatrix<f64>,
        reference: Option<DVector<f64>>,
        config: &ModelConfig,
        provider: &P,
    ) -> MahalanobisResult<Self> {
        config.validate()?;
        let statistics = estimate_statistics(samples, reference, provider, config.check_finite)?;
        Self::from_statistics(statistics, config.smin)
    }

    /// Wrap already estimated statistics.
    pub fn from_statistics(statistics: SampleStatistics, smin: f64) -> MahalanobisResult<Self> {
        validate_parameter(smin, 0.0, f64::INFINITY, "smin")?;

        log::debug!(
            "fitted model: {} samples, {} dimensions, W[0] = {:e}, W[D-1] = {:e}",
            statistics.sample_count,
            statistics.dimension(),
            statistics.spectrum.largest(),
            statistics.spectrum.smallest()
        );

        Ok(Self {
            statistics,
            smin,
            state: OperatorState::Stale,
        })
    }

    // --- Accessors ---

    /// Distribution center, D×1
    pub fn reference(&self) -> &DVector<f64> {
        &self.statistics.reference
    }

    /// Current regularization fraction
    pub fn smin(&self) -> f64 {
        self.smin
    }

    /// Number of dimensions D
    pub fn dimension(&self) -> usize {
        self.statistics.dimension()
    }

    /// Number of samples N
    pub fn sample_count(&self) -> usize {
        self.statistics.sample_count
    }

    /// `true` until the operator has been built for the current `smin`
    pub fn is_dirty(&self) -> bool {
        matches!(self.state, OperatorState::Stale)
    }

    /// Current operator state
    pub fn state(&self) -> &OperatorState {
        &self.state
    }

    /// Everything estimated at construction
    pub fn statistics(&self) -> &SampleStatistics {
        &self.statistics
    }

    /// Spectrum of the centered scatter matrix
    pub fn spectrum(&self) -> &Spectrum {
        &self.statistics.spectrum
    }

    /// Singular values `W`, descending
    pub fn singular_values(&self) -> &DVector<f64> {
        self.statistics.spectrum.values()
    }

    /// Singular vectors `U`, one per column
    pub fn basis(&self) -> &DMatrix<f64> {
        self.statistics.spectrum.basis()
    }

    /// Sample covariance `S / (N-1)`. Not used by distance queries.
    pub fn sample_covariance(&self) -> &DMatrix<f64> {
        &self.statistics.covariance
    }

    /// The built operator with its parameters.
    ///
    /// Fails with `NotBuilt` while the model is stale.
    pub fn operator(&self) -> MahalanobisResult<&RegularizedOperator> {
        match &self.state {
            OperatorState::Built(operator) => Ok(operator),
            OperatorState::Stale => Err(MahalanobisError::not_built("operator")),
        }
    }

    /// The D×D regularized inverse covariance.
    pub fn regularized_operator(&self) -> MahalanobisResult<&DMatrix<f64>> {
        self.operator().map(RegularizedOperator::matrix)
    }

    /// `smin · W[0]` of the built operator.
    pub fn sigma2(&self) -> MahalanobisResult<f64> {
        self.operator().map(RegularizedOperator::sigma2)
    }

    // --- State transitions ---

    /// Store a new regularization fraction and mark the operator stale.
    ///
    /// Rejects negative or non-finite values without changing the model.
    pub fn set_smin(&mut self, smin: f64) -> MahalanobisResult<()> {
        validate_parameter(smin, 0.0, f64::INFINITY, "smin")?;
        self.smin = smin;
        self.state = OperatorState::Stale;
        Ok(())
    }

    /// Build the operator for the current `smin`.
    ///
    /// No-op when already built. On failure the model stays stale.
    pub fn build(&mut self) -> MahalanobisResult<()> {
        if !self.is_dirty() {
            return Ok(());
        }

        let operator = RegularizedOperator::from_spectrum(
            &self.statistics.spectrum,
            self.smin,
            self.statistics.sample_count,
        )?;

        log::debug!(
            "built regularized operator: smin = {}, sigma2 = {:e}",
            self.smin,
            operator.sigma2()
        );
        let condition = operator.condition_number();
        if condition > MAX_CONDITION_NUMBER {
            log::warn!(
                "regularized spectrum is ill-conditioned (condition number {:e}); consider a larger smin than {}",
                condition,
                self.smin
            );
        }

        self.state = OperatorState::Built(operator);
        Ok(())
    }

    /// Distance engine over the built operator.
    ///
    /// Fails with `NotBuilt` while the model is stale.
    pub fn built(&self) -> MahalanobisResult<DistanceEngine<'_>> {
        match &self.state {
            OperatorState::Built(operator) => {
                DistanceEngine::new(operator, &self.statistics.reference)
            }
            OperatorState::Stale => Err(MahalanobisError::not_built("distance query")),
        }
    }

    // --- Distance queries ---

    /// Distance between two D×1 points.
    pub fn point_to(&self, p1: &DVector<f64>, p2: &DVector<f64>) -> MahalanobisResult<f64> {
        self.built()?.point_to(p1, p2)
    }

    /// Distance from a D×1 point to the reference.
    pub fn point_to_reference(&self, point: &DVector<f64>) -> MahalanobisResult<f64> {
        self.built()?.point_to_reference(point)
    }

    /// Distance from every row of `points` (M×D) to `reference` (D×1).
    pub fn points_to(
        &self,
        points: &DMatrix<f64>,
        reference: &DVector<f64>,
    ) -> MahalanobisResult<DVector<f64>> {
        self.built()?.points_to(points, reference)
    }

    /// Distance from every row of `points` to the reference.
    pub fn points_to_reference(&self, points: &DMatrix<f64>) -> MahalanobisResult<DVector<f64>> {
        self.built()?.points_to_reference(points)
    }

    /// Per-pixel distance map of `image` against `reference`.
    pub fn image_to<T: Channel>(
        &self,
        image: &Image<T>,
        reference: &DVector<f64>,
    ) -> MahalanobisResult<Image<f64>> {
        self.built()?.image_to(image, reference)
    }

    /// Per-pixel distance map of `image` against the reference.
    pub fn image_to_reference<T: Channel>(&self, image: &Image<T>) -> MahalanobisResult<Image<f64>> {
        self.built()?.image_to_reference(image)
    }
}
