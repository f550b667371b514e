//! Quadratic-form distance evaluation.
//!
//! A [`DistanceEngine`] pairs a built [`RegularizedOperator`] with the model's
//! reference vector. It can only be obtained from a built model (see
//! [`MahalanobisModel::built`](crate::MahalanobisModel::built)) or from an
//! operator directly, so queries never observe a stale operator.
//!
//! For a difference vector `v = p - q` the distance is `sqrt(vᵗ Σ⁻¹ v)`.
//! Batches are M×D matrices with one point per row.

use crate::{
    errors::{validate_all_finite, validate_dimension, MahalanobisResult},
    image::{delinearize, linearize, Channel, Image},
    regularizer::RegularizedOperator,
};
use nalgebra::{DMatrix, DVector};

/// Distance queries against a built operator.
#[derive(Debug, Clone, Copy)]
pub struct DistanceEngine<'a> {
    operator: &'a RegularizedOperator,
    reference: &'a DVector<f64>,
}

impl<'a> DistanceEngine<'a> {
    /// Pair an operator with a reference of the same dimension.
    pub fn new(
        operator: &'a RegularizedOperator,
        reference: &'a DVector<f64>,
    ) -> MahalanobisResult<Self> {
        validate_dimension("reference rows", operator.dimension(), reference.len())?;
        Ok(Self {
            operator,
            reference,
        })
    }

    /// Number of dimensions D.
    pub fn dimension(&self) -> usize {
        self.operator.dimension()
    }

    /// The model reference.
    pub fn reference(&self) -> &'a DVector<f64> {
        self.reference
    }

    /// The operator used for every query.
    pub fn operator(&self) -> &'a RegularizedOperator {
        self.operator
    }

    /// Distance from every row of `points` (M×D) to `reference` (D×1).
    ///
    /// Returns an M×1 vector; an empty batch yields an empty vector. Points or
    /// references holding NaN or ±inf are rejected with `InvalidInput`.
    pub fn points_to(
        &self,
        points: &DMatrix<f64>,
        reference: &DVector<f64>,
    ) -> MahalanobisResult<DVector<f64>> {
        let d = self.dimension();
        validate_dimension("point columns", d, points.ncols())?;
        validate_dimension("reference rows", d, reference.len())?;
        validate_all_finite(points.as_slice(), "query points")?;
        validate_all_finite(reference.as_slice(), "query reference")?;

        log::trace!("evaluating {} distances in {} dimensions", points.nrows(), d);

        let distances = DVector::from_fn(points.nrows(), |i, _| {
            let diff = DVector::from_fn(d, |j, _| points[(i, j)] - reference[j]);
            self.quadratic_form(&diff).sqrt()
        });
        Ok(distances)
    }

    /// Distance between two D×1 points.
    pub fn point_to(&self, p1: &DVector<f64>, p2: &DVector<f64>) -> MahalanobisResult<f64> {
        validate_dimension("point rows", self.dimension(), p1.len())?;
        let batch = DMatrix::from_row_slice(1, p1.len(), p1.as_slice());
        let distances = self.points_to(&batch, p2)?;
        Ok(distances[0])
    }

    /// Distance from a D×1 point to the model reference.
    pub fn point_to_reference(&self, point: &DVector<f64>) -> MahalanobisResult<f64> {
        self.point_to(point, self.reference)
    }

    /// Distance from every row of `points` to the model reference.
    pub fn points_to_reference(&self, points: &DMatrix<f64>) -> MahalanobisResult<DVector<f64>> {
        self.points_to(points, self.reference)
    }

    /// Per-pixel distance map of `image` against `reference`.
    ///
    /// The image must have one channel per model dimension; the result is an
    /// H×W single-channel `f64` image.
    pub fn image_to<T: Channel>(
        &self,
        image: &Image<T>,
        reference: &DVector<f64>,
    ) -> MahalanobisResult<Image<f64>> {
        validate_dimension("image channels", self.dimension(), image.channels())?;

        let points = linearize(image);
        let distances = self.points_to(&points, reference)?;
        let column = DMatrix::from_column_slice(distances.len(), 1, distances.as_slice());

        delinearize(&column, image.rows(), image.cols())
    }

    /// Per-pixel distance map of `image` against the model reference.
    pub fn image_to_reference<T: Channel>(&self, image: &Image<T>) -> MahalanobisResult<Image<f64>> {
        self.image_to(image, self.reference)
    }

    fn quadratic_form(&self, diff: &DVector<f64>) -> f64 {
        let q = diff.dot(&(self.operator.matrix() * diff));
        // rounding can push a zero form slightly negative; NaN must survive
        if q < 0.0 {
            0.0
        } else {
            q
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{errors::MahalanobisError, spectrum::Spectrum};
    use assert_approx_eq::assert_approx_eq;

    fn unit_operator(d: usize) -> RegularizedOperator {
        // (N-1) / W = 1 for every axis
        let spectrum = Spectrum::new(
            DVector::from_element(d, 2.0),
            DMatrix::<f64>::identity(d, d),
        )
        .unwrap();
        RegularizedOperator::from_spectrum(&spectrum, 0.0, 3).unwrap()
    }

    #[test]
    fn test_unit_operator_gives_euclidean_distance() {
        let op = unit_operator(2);
        let origin = DVector::zeros(2);
        let engine = DistanceEngine::new(&op, &origin).unwrap();

        let p = DVector::from_vec(vec![3.0, 4.0]);
        assert_approx_eq!(engine.point_to_reference(&p).unwrap(), 5.0, 1e-12);
        assert_eq!(engine.point_to(&p, &p).unwrap(), 0.0);
    }

    #[test]
    fn test_points_to_batch() {
        let op = unit_operator(2);
        let origin = DVector::zeros(2);
        let engine = DistanceEngine::new(&op, &origin).unwrap();

        let points = DMatrix::from_row_slice(3, 2, &[0.0, 0.0, 1.0, 0.0, 0.0, -2.0]);
        let d = engine.points_to_reference(&points).unwrap();
        assert_eq!(d.len(), 3);
        assert_approx_eq!(d[0], 0.0, 1e-12);
        assert_approx_eq!(d[1], 1.0, 1e-12);
        assert_approx_eq!(d[2], 2.0, 1e-12);

        let empty = DMatrix::<f64>::zeros(0, 2);
        assert_eq!(engine.points_to_reference(&empty).unwrap().len(), 0);
    }

    #[test]
    fn test_shape_validation() {
        let op = unit_operator(2);
        let origin = DVector::zeros(2);
        let engine = DistanceEngine::new(&op, &origin).unwrap();

        let wrong_points = DMatrix::<f64>::zeros(2, 3);
        assert!(engine.points_to_reference(&wrong_points).is_err());

        let wrong_ref = DVector::zeros(3);
        let points = DMatrix::<f64>::zeros(1, 2);
        assert!(engine.points_to(&points, &wrong_ref).is_err());

        assert!(engine.point_to_reference(&DVector::zeros(1)).is_err());
        assert!(DistanceEngine::new(&op, &wrong_ref).is_err());
    }

    #[test]
    fn test_non_finite_queries_are_rejected() {
        let op = unit_operator(2);
        let origin = DVector::zeros(2);
        let engine = DistanceEngine::new(&op, &origin).unwrap();

        for bad in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let p = DVector::from_vec(vec![bad, 1.0]);
            assert!(matches!(
                engine.point_to_reference(&p),
                Err(MahalanobisError::InvalidInput { .. })
            ));
            assert!(matches!(
                engine.point_to(&DVector::zeros(2), &p),
                Err(MahalanobisError::InvalidInput { .. })
            ));
        }

        let pixels = Image::new(1, 2, 2, vec![1.0f32, 0.0, f32::NAN, 2.0]).unwrap();
        assert!(matches!(
            engine.image_to_reference(&pixels),
            Err(MahalanobisError::InvalidInput { .. })
        ));
    }

    #[test]
    fn test_overflowing_form_is_not_reported_as_zero() {
        let op = unit_operator(1);
        let origin = DVector::zeros(1);
        let engine = DistanceEngine::new(&op, &origin).unwrap();

        let d = engine
            .point_to_reference(&DVector::from_vec(vec![f64::MAX]))
            .unwrap();
        assert!(d.is_infinite());
    }

    #[test]
    fn test_image_channel_count_must_match_dimension() {
        let op = unit_operator(2);
        let origin = DVector::zeros(2);
        let engine = DistanceEngine::new(&op, &origin).unwrap();

        let gray = Image::new(1, 2, 1, vec![1u8, 2]).unwrap();
        assert!(engine.image_to_reference(&gray).is_err());
    }
}
