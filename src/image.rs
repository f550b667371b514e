//! Multi-channel images and their point-set representation.
//!
//! An H×W image with C channels maps to an (H·W)×C matrix of `f64` points:
//! pixel `(row, col)` becomes row `row·W + col`, channel `k` becomes column
//! `k`. [`linearize`] and [`delinearize`] are inverse to each other for every
//! supported [`Channel`] type, which lets the distance engine score an image
//! pixel by pixel.

use crate::errors::{validate_dimension, MahalanobisError, MahalanobisResult};
use nalgebra::DMatrix;
use num_traits::{AsPrimitive, NumCast};
use std::fmt::Debug;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Runtime tag for the element type of an image channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ChannelDepth {
    /// `u8`
    U8,
    /// `i8`
    I8,
    /// `u16`
    U16,
    /// `u32`
    U32,
    /// `i16`
    I16,
    /// `i32`
    I32,
    /// `f32`
    F32,
    /// `f64`
    F64,
}

/// Element types an [`Image`] channel may hold.
///
/// Widening to `f64` is lossless for every implementor, so narrowing the
/// widened value back always recovers the original.
pub trait Channel: Copy + PartialEq + Debug + NumCast + AsPrimitive<f64> + 'static {
    /// Runtime tag of this type
    const DEPTH: ChannelDepth;
}

macro_rules! impl_channel {
    ($($t:ty => $depth:ident),* $(,)?) => {
        $(
            impl Channel for $t {
                const DEPTH: ChannelDepth = ChannelDepth::$depth;
            }
        )*
    };
}

impl_channel!(
    u8 => U8,
    i8 => I8,
    u16 => U16,
    u32 => U32,
    i16 => I16,
    i32 => I32,
    f32 => F32,
    f64 => F64,
);

/// Dense H×W image with interleaved channels.
///
/// Channel `k` of pixel `(row, col)` is stored at `(row·W + col)·C + k`.
#[derive(Debug, Clone, PartialEq)]
pub struct Image<T> {
    rows: usize,
    cols: usize,
    channels: usize,
    data: Vec<T>,
}

impl<T: Channel> Image<T> {
    /// Wrap interleaved pixel data.
    ///
    /// # Errors
    /// * `InvalidInput` when `channels` is zero or the element count overflows
    /// * `DimensionMismatch` when `data.len() != rows * cols * channels`
    pub fn new(rows: usize, cols: usize, channels: usize, data: Vec<T>) -> MahalanobisResult<Self> {
        let len = element_count(rows, cols, channels)?;
        validate_dimension("image data length", len, data.len())?;
        Ok(Self {
            rows,
            cols,
            channels,
            data,
        })
    }

    /// Build an image from `f(row, col, channel)`.
    pub fn from_fn<F>(rows: usize, cols: usize, channels: usize, mut f: F) -> MahalanobisResult<Self>
    where
        F: FnMut(usize, usize, usize) -> T,
    {
        let mut data = Vec::with_capacity(element_count(rows, cols, channels)?);
        for row in 0..rows {
            for col in 0..cols {
                for channel in 0..channels {
                    data.push(f(row, col, channel));
                }
            }
        }
        Self::new(rows, cols, channels, data)
    }

    /// Compose channel planes into one image, channels in input order.
    ///
    /// All planes must share the same rows and columns; a plane with several
    /// channels contributes all of them.
    pub fn merge_channels(planes: &[Image<T>]) -> MahalanobisResult<Self> {
        let first = planes.first().ok_or_else(|| MahalanobisError::InvalidInput {
            reason: "no channel planes to merge".to_string(),
        })?;
        let (rows, cols) = (first.rows, first.cols);
        for plane in planes {
            validate_dimension("plane rows", rows, plane.rows)?;
            validate_dimension("plane columns", cols, plane.cols)?;
        }

        let channels: usize = planes.iter().map(|p| p.channels).sum();
        let mut data = Vec::with_capacity(rows * cols * channels);
        for pixel in 0..rows * cols {
            for plane in planes {
                let start = pixel * plane.channels;
                data.extend_from_slice(&plane.data[start..start + plane.channels]);
            }
        }
        Self::new(rows, cols, channels, data)
    }

    /// Split into one single-channel image per channel.
    pub fn split_channels(&self) -> Vec<Image<T>> {
        (0..self.channels)
            .filter_map(|k| self.channel_plane(k))
            .collect()
    }

    /// Single-channel copy of channel `k`, or `None` when out of range.
    pub fn channel_plane(&self, k: usize) -> Option<Image<T>> {
        if k >= self.channels {
            return None;
        }
        Some(Image {
            rows: self.rows,
            cols: self.cols,
            channels: 1,
            data: self.data.iter().skip(k).step_by(self.channels).copied().collect(),
        })
    }

    /// Value of one channel at `(row, col)`.
    pub fn get(&self, row: usize, col: usize, channel: usize) -> Option<T> {
        if row >= self.rows || col >= self.cols || channel >= self.channels {
            return None;
        }
        self.data
            .get((row * self.cols + col) * self.channels + channel)
            .copied()
    }

    /// Height H
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Width W
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Channel count C
    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Number of pixels, H·W
    pub fn pixel_count(&self) -> usize {
        self.rows * self.cols
    }

    /// Element type tag
    pub fn depth(&self) -> ChannelDepth {
        T::DEPTH
    }

    /// Interleaved pixel data
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    /// Consume the image, returning the interleaved pixel data
    pub fn into_vec(self) -> Vec<T> {
        self.data
    }
}

/// `rows * cols * channels`, rejecting zero channels and overflow.
fn element_count(rows: usize, cols: usize, channels: usize) -> MahalanobisResult<usize> {
    if channels == 0 {
        return Err(MahalanobisError::InvalidInput {
            reason: "image must have at least one channel".to_string(),
        });
    }
    rows
        .checked_mul(cols)
        .and_then(|pixels| pixels.checked_mul(channels))
        .ok_or_else(|| MahalanobisError::InvalidInput {
            reason: format!(
                "image size {}x{}x{} overflows the element count",
                rows, cols, channels
            ),
        })
}

/// Flatten an image into an (H·W)×C matrix of `f64` points.
pub fn linearize<T: Channel>(image: &Image<T>) -> DMatrix<f64> {
    log::trace!(
        "linearizing {}x{} image with {} {:?} channels",
        image.rows,
        image.cols,
        image.channels,
        T::DEPTH
    );
    let c = image.channels;
    DMatrix::from_fn(image.pixel_count(), c, |pixel, channel| {
        image.data[pixel * c + channel].as_()
    })
}

/// Rebuild an H×W image from an (H·W)×C point matrix.
///
/// Column `k` becomes channel `k`. Values are narrowed to `T`.
///
/// # Errors
/// * `DimensionMismatch` when `points` does not have `rows * cols` rows
/// * `InvalidInput` when `points` has no columns or holds a value that is
///   NaN or out of range for `T`
pub fn delinearize<T: Channel>(
    points: &DMatrix<f64>,
    rows: usize,
    cols: usize,
) -> MahalanobisResult<Image<T>> {
    validate_dimension("linearized rows", rows * cols, points.nrows())?;
    if points.ncols() == 0 {
        return Err(MahalanobisError::InvalidInput {
            reason: "linearized matrix has no channel columns".to_string(),
        });
    }

    let planes = points
        .column_iter()
        .map(|column| {
            let data = column
                .iter()
                .map(|&value| narrow::<T>(value))
                .collect::<MahalanobisResult<Vec<T>>>()?;
            Image::new(rows, cols, 1, data)
        })
        .collect::<MahalanobisResult<Vec<Image<T>>>>()?;

    Image::merge_channels(&planes)
}

fn narrow<T: Channel>(value: f64) -> MahalanobisResult<T> {
    <T as NumCast>::from(value).ok_or_else(|| MahalanobisError::InvalidInput {
        reason: format!("value {} is not representable as {:?}", value, T::DEPTH),
    })
}
