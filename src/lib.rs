//! # Regularized Mahalanobis Distance
//!
//! Scores how far observations deviate from a statistical model of "normal"
//! data, using a Mahalanobis-type distance that stays well defined when the
//! sample covariance is rank-deficient or ill-conditioned (typically when the
//! number of samples is comparable to, or smaller than, the dimensionality).
//!
//! ## How it works
//!
//! 1. **Estimation**: samples are centered on a reference (the column means
//!    unless one is supplied) and the scatter matrix `S = AᵗA` is decomposed
//!    into descending singular values `W` and an orthonormal basis `U`.
//! 2. **Regularization**: every eigenvalue is raised by the same floor
//!    `σ² = smin · W[0]` and the operator `(N-1) · U · diag(W + σ²)⁻¹ · Uᵗ`
//!    is built.
//! 3. **Distance**: for a difference `v = p - q` the distance is
//!    `sqrt(vᵗ Σ⁻¹ v)`, evaluated per point, per batch, or per image pixel.
//!
//! `smin = 0` approaches the plain inverse covariance (and fails on exactly
//! singular data); larger values isotropize the metric toward a scaled
//! Euclidean distance.
//!
//! ## Quick Start
//!
//! ```rust
//! use nalgebra::{DMatrix, DVector};
//! use regularized_mahalanobis::{MahalanobisModel, MahalanobisError};
//!
//! fn main() -> Result<(), MahalanobisError> {
//!     // Four 2D samples on the corners of a square
//!     let samples = DMatrix::from_row_slice(4, 2, &[
//!         0.0, 0.0,
//!         2.0, 0.0,
//!         0.0, 2.0,
//!         2.0, 2.0,
//!     ]);
//!
//!     let mut model = MahalanobisModel::new(&samples, 0.1, None)?;
//!     model.build()?;
//!
//!     let center = model.point_to_reference(&DVector::from_vec(vec![1.0, 1.0]))?;
//!     let right = model.point_to_reference(&DVector::from_vec(vec![3.0, 1.0]))?;
//!     let up = model.point_to_reference(&DVector::from_vec(vec![1.0, 3.0]))?;
//!
//!     assert!(center.abs() < 1e-12);
//!     assert!((right - up).abs() < 1e-12);
//!     Ok(())
//! }
//! ```
//!
//! ## Images
//!
//! An H×W image with C channels is scored pixel by pixel against a model of
//! dimension C, producing an H×W single-channel distance map:
//!
//! ```rust
//! use nalgebra::DMatrix;
//! use regularized_mahalanobis::{Image, MahalanobisModel, MahalanobisError};
//!
//! # fn main() -> Result<(), MahalanobisError> {
//! let samples = DMatrix::from_row_slice(3, 1, &[-1.0, 0.0, 1.0]);
//! let mut model = MahalanobisModel::new(&samples, 0.0, None)?;
//! model.build()?;
//!
//! let image = Image::new(2, 2, 1, vec![0u8, 2, 0, 2])?;
//! let map = model.image_to_reference(&image)?;
//! assert_eq!(map.channels(), 1);
//! assert!((map.get(0, 1, 0).unwrap() - 2.0).abs() < 1e-12);
//! # Ok(())
//! # }
//! ```
//!
//! ## Model lifecycle
//!
//! A model is stale after construction and after every
//! [`set_smin`](MahalanobisModel::set_smin); queries fail with
//! [`MahalanobisError::NotBuilt`] until [`build`](MahalanobisModel::build)
//! succeeds. See the [`model`] module for details.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod distance;
pub mod errors;
pub mod estimation;
pub mod image;
pub mod model;
pub mod regularizer;
pub mod spectrum;

pub use config::ModelConfig;
pub use distance::DistanceEngine;
pub use errors::{ErrorCategory, MahalanobisError, MahalanobisResult};
pub use estimation::{estimate_statistics, SampleStatistics};
pub use image::{delinearize, linearize, Channel, ChannelDepth, Image};
pub use model::{MahalanobisModel, OperatorState};
pub use regularizer::RegularizedOperator;
pub use spectrum::{NalgebraSvd, Spectrum, SvdProvider};
