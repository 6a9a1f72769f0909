//! Numeric element types supported by the evaluator
//!
//! Each kernel is instantiated for one concrete [`Element`] type; there is no
//! runtime type dispatch on the evaluation path.  The trait captures the
//! capabilities the dispatcher needs: construction at a working precision,
//! precision checks, and "safe" coercion from other element types.
use crate::{
    Error,
    buffer::{Operand, Role},
    dynamic::{AnyBuffer, AnyScalar},
};

/// Runtime tag for an element type
#[derive(
    Copy,
    Clone,
    Debug,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    serde::Serialize,
    serde::Deserialize,
)]
#[strum(serialize_all = "lowercase")]
pub enum DType {
    /// Single precision
    F32,
    /// Double precision
    F64,
    /// Arbitrary precision
    Real,
}

/// Trait for a numeric type which can be passed to a compiled kernel
pub trait Element: Clone + Send + Sync + std::fmt::Debug + 'static {
    /// Runtime tag for this type
    const DTYPE: DType;

    /// Whether kernels over this type may process more than one point per
    /// invocation of the batch kernel
    const SUPPORTS_BATCH: bool;

    /// Whether values of this type carry their own precision
    const HAS_PRECISION: bool = false;

    /// Builds a zero value constructed at the given working precision
    ///
    /// The precision is ignored by fixed-width types.
    fn zero(prec: u32) -> Self;

    /// Batch width used when the caller doesn't request one
    fn recommended_simd_size() -> u32;

    /// Returns the precision of this value, in bits
    ///
    /// Fixed-width types return 0.
    fn precision(&self) -> u32 {
        0
    }

    /// Checks whether this value was constructed at the given precision
    fn has_precision(&self, _prec: u32) -> bool {
        true
    }

    /// Rounds this value to the given precision, if necessary
    fn normalize(&mut self, _prec: u32) {}

    /// Converts a buffer of any element type into a buffer of this type
    ///
    /// Buffers which already hold `Self` are borrowed as-is; safe widening
    /// conversions build a fresh array, and anything else is an error.
    fn coerce(
        buf: AnyBuffer<'_>,
        role: Role,
        prec: u32,
    ) -> Result<Operand<'_, Self>, Error>;

    /// Converts a scalar of any element type into this type
    fn coerce_scalar(
        v: AnyScalar,
        role: Role,
        prec: u32,
    ) -> Result<Self, Error>;
}

/// Picks a SIMD width (in `f64` lanes) based on compile-time target features
fn f64_lanes() -> u32 {
    if cfg!(target_feature = "avx512f") {
        8
    } else if cfg!(target_feature = "avx") {
        4
    } else if cfg!(any(target_feature = "sse2", target_feature = "neon")) {
        2
    } else {
        1
    }
}

impl Element for f64 {
    const DTYPE: DType = DType::F64;
    const SUPPORTS_BATCH: bool = true;

    fn zero(_prec: u32) -> Self {
        0.0
    }

    fn recommended_simd_size() -> u32 {
        f64_lanes()
    }

    fn coerce(
        buf: AnyBuffer<'_>,
        role: Role,
        _prec: u32,
    ) -> Result<Operand<'_, Self>, Error> {
        match buf {
            AnyBuffer::F64(b) => Ok(Operand::Borrowed(b)),
            AnyBuffer::F32(b) => Ok(Operand::Owned(b.map(|v| f64::from(*v)))),
            #[allow(unreachable_patterns)]
            other => Err(Error::UnsafeCast {
                role,
                from: other.dtype(),
                to: Self::DTYPE,
            }),
        }
    }

    fn coerce_scalar(
        v: AnyScalar,
        role: Role,
        _prec: u32,
    ) -> Result<Self, Error> {
        match v {
            AnyScalar::F64(v) => Ok(v),
            AnyScalar::F32(v) => Ok(f64::from(v)),
            #[allow(unreachable_patterns)]
            other => Err(Error::UnsafeCast {
                role,
                from: other.dtype(),
                to: Self::DTYPE,
            }),
        }
    }
}

impl Element for f32 {
    const DTYPE: DType = DType::F32;
    const SUPPORTS_BATCH: bool = true;

    fn zero(_prec: u32) -> Self {
        0.0
    }

    fn recommended_simd_size() -> u32 {
        f64_lanes() * 2
    }

    fn coerce(
        buf: AnyBuffer<'_>,
        role: Role,
        _prec: u32,
    ) -> Result<Operand<'_, Self>, Error> {
        match buf {
            AnyBuffer::F32(b) => Ok(Operand::Borrowed(b)),
            other => Err(Error::UnsafeCast {
                role,
                from: other.dtype(),
                to: Self::DTYPE,
            }),
        }
    }

    fn coerce_scalar(
        v: AnyScalar,
        role: Role,
        _prec: u32,
    ) -> Result<Self, Error> {
        match v {
            AnyScalar::F32(v) => Ok(v),
            other => Err(Error::UnsafeCast {
                role,
                from: other.dtype(),
                to: Self::DTYPE,
            }),
        }
    }
}

/// Arbitrary-precision floating-point value
///
/// The precision (in bits) is carried by each value; a kernel over `Real`
/// operates at a single working precision, which every value passed to it
/// must share.
#[cfg(feature = "real")]
pub type Real = dashu_float::FBig;

/// Builds a `Real` from a float, which must be exactly representable
///
/// The conversion only counts as safe if the working precision covers the
/// mantissa of the source type (24 bits for `f32`, 53 for `f64`); otherwise
/// values would be silently rounded.
#[cfg(feature = "real")]
fn real_from_f64(
    v: f64,
    role: Role,
    prec: u32,
    from: DType,
) -> Result<Real, Error> {
    let err = Error::UnsafeCast {
        role,
        from,
        to: DType::Real,
    };
    let mantissa = match from {
        DType::F32 => f32::MANTISSA_DIGITS,
        _ => f64::MANTISSA_DIGITS,
    };
    if prec < mantissa {
        return Err(err);
    }
    Real::try_from(v)
        .map(|r| r.with_precision(prec as usize).value())
        .map_err(|_| err)
}

#[cfg(feature = "real")]
impl Element for Real {
    const DTYPE: DType = DType::Real;
    const SUPPORTS_BATCH: bool = false;
    const HAS_PRECISION: bool = true;

    fn zero(prec: u32) -> Self {
        Real::ZERO.with_precision(prec as usize).value()
    }

    fn recommended_simd_size() -> u32 {
        1
    }

    fn precision(&self) -> u32 {
        u32::try_from(Real::precision(self)).unwrap_or(u32::MAX)
    }

    fn has_precision(&self, prec: u32) -> bool {
        Real::precision(self) == prec as usize
    }

    fn normalize(&mut self, prec: u32) {
        if !self.has_precision(prec) {
            let v = std::mem::replace(self, Real::ZERO);
            *self = v.with_precision(prec as usize).value();
        }
    }

    fn coerce(
        buf: AnyBuffer<'_>,
        role: Role,
        prec: u32,
    ) -> Result<Operand<'_, Self>, Error> {
        match buf {
            AnyBuffer::Real(b) => Ok(Operand::Borrowed(b)),
            AnyBuffer::F64(b) => b
                .try_map(|v| real_from_f64(*v, role, prec, DType::F64))
                .map(Operand::Owned),
            AnyBuffer::F32(b) => b
                .try_map(|v| {
                    real_from_f64(f64::from(*v), role, prec, DType::F32)
                })
                .map(Operand::Owned),
        }
    }

    fn coerce_scalar(
        v: AnyScalar,
        role: Role,
        prec: u32,
    ) -> Result<Self, Error> {
        match v {
            AnyScalar::Real(v) => Ok(v),
            AnyScalar::F64(v) => real_from_f64(v, role, prec, DType::F64),
            AnyScalar::F32(v) => {
                real_from_f64(f64::from(v), role, prec, DType::F32)
            }
        }
    }
}
