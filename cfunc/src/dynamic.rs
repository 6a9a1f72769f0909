//! Dynamically typed buffers, for callers which don't know the element type
//! of their arrays at compile time
//!
//! These are converted into statically typed buffers by
//! [`Element::coerce`](crate::Element::coerce) before validation.
use crate::{buffer::Buffer, element::DType};

#[cfg(feature = "real")]
use crate::element::Real;

/// Buffer tagged with its element type
pub enum AnyBuffer<'a> {
    /// Buffer of `f32`
    F32(Buffer<'a, f32>),
    /// Buffer of `f64`
    F64(Buffer<'a, f64>),
    /// Buffer of arbitrary-precision values
    #[cfg(feature = "real")]
    Real(Buffer<'a, Real>),
}

impl AnyBuffer<'_> {
    /// Returns the element type of this buffer
    pub fn dtype(&self) -> DType {
        match self {
            AnyBuffer::F32(..) => DType::F32,
            AnyBuffer::F64(..) => DType::F64,
            #[cfg(feature = "real")]
            AnyBuffer::Real(..) => DType::Real,
        }
    }
}

impl<'a> From<Buffer<'a, f32>> for AnyBuffer<'a> {
    fn from(b: Buffer<'a, f32>) -> Self {
        AnyBuffer::F32(b)
    }
}

impl<'a> From<Buffer<'a, f64>> for AnyBuffer<'a> {
    fn from(b: Buffer<'a, f64>) -> Self {
        AnyBuffer::F64(b)
    }
}

#[cfg(feature = "real")]
impl<'a> From<Buffer<'a, Real>> for AnyBuffer<'a> {
    fn from(b: Buffer<'a, Real>) -> Self {
        AnyBuffer::Real(b)
    }
}

/// Scalar tagged with its element type
#[derive(Clone, Debug)]
pub enum AnyScalar {
    /// Single precision
    F32(f32),
    /// Double precision
    F64(f64),
    /// Arbitrary precision
    #[cfg(feature = "real")]
    Real(Real),
}

impl AnyScalar {
    /// Returns the element type of this scalar
    pub fn dtype(&self) -> DType {
        match self {
            AnyScalar::F32(..) => DType::F32,
            AnyScalar::F64(..) => DType::F64,
            #[cfg(feature = "real")]
            AnyScalar::Real(..) => DType::Real,
        }
    }
}

/// Dynamically typed time argument
pub enum AnyTime<'a> {
    /// Single time value, for single evaluation
    Scalar(AnyScalar),
    /// One time value per point, for batch evaluation
    Array(AnyBuffer<'a>),
}
