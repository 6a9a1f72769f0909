//! Module containing the universal error type
use crate::{buffer::Role, element::DType};
use thiserror::Error;

/// Expected dimensionality of a buffer, used in error messages
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Dims {
    /// Inputs may be either one- or two-dimensional
    OneOrTwo,
    /// Every other buffer must match a fixed dimensionality
    Exactly(usize),
}

impl std::fmt::Display for Dims {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Dims::OneOrTwo => write!(f, "either 1 or 2 dimensions"),
            Dims::Exactly(n) => write!(f, "{n} dimension(s)"),
        }
    }
}

/// Universal error type for `cfunc`
///
/// Every failure is reported before any kernel is invoked, so a caller which
/// receives an `Error` from an evaluation can assume that its buffers were not
/// written.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The kernel has parameters, but no parameter array was provided
    #[error(
        "the compiled function contains {0} parameter(s), but no array of \
         parameter values was provided for evaluation"
    )]
    MissingParameters(u32),

    /// The kernel is time-dependent, but no time value was provided
    #[error(
        "the compiled function is time-dependent, but no time value(s) were \
         provided for evaluation"
    )]
    MissingTime,

    /// A buffer has the wrong number of dimensions
    #[error(
        "the array of {role} has {actual} dimension(s), but it must have \
         {expected} instead"
    )]
    InvalidDimensionality {
        /// Offending buffer
        role: Role,
        /// Number of dimensions of the buffer
        actual: usize,
        /// Expected dimensionality
        expected: Dims,
    },

    /// The first dimension of a buffer doesn't match the kernel
    #[error(
        "the array of {role} has size {actual} in the first dimension, but it \
         must have a size of {expected} instead"
    )]
    SizeMismatch {
        /// Offending buffer
        role: Role,
        /// Size of the first dimension
        actual: usize,
        /// Size expected by the kernel
        expected: usize,
    },

    /// The number of evaluation points doesn't match the inputs
    #[error(
        "the number of evaluation points in the array of {role} ({actual}) \
         must match the size in the second dimension of the array of inputs \
         ({expected})"
    )]
    BatchSizeMismatch {
        /// Offending buffer
        role: Role,
        /// Number of points in the buffer
        actual: usize,
        /// Number of points in the inputs
        expected: usize,
    },

    /// The output buffer is read-only
    #[error("the array of outputs provided for evaluation is not writeable")]
    NonWritableOutput,

    /// An array of times was passed for a single evaluation
    #[error(
        "when performing a single evaluation, a scalar time value must be \
         provided, but an array was passed instead"
    )]
    ScalarTimeExpected,

    /// A scalar time was passed for a batch evaluation
    #[error(
        "when performing a batch evaluation, an array of time values must be \
         provided, but a scalar was passed instead"
    )]
    TimeArrayExpected,

    /// The element type does not support batch kernels
    #[error(
        "batch sizes greater than 1 are not supported for element type \
         {dtype} (requested {requested})"
    )]
    UnsupportedBatchWidth {
        /// Element type of the kernel
        dtype: DType,
        /// Requested batch width
        requested: u32,
    },

    /// Batch size must be positive
    #[error("batch size must be at least 1")]
    InvalidBatchSize,

    /// A value in a buffer is not at the working precision
    #[error(
        "the value at flat index {index} in the array of {role} has a \
         precision of {actual}, but it must have a precision of {expected}"
    )]
    PrecisionMismatch {
        /// Offending buffer
        role: Role,
        /// Index (in logical row-major order) of the offending value
        index: usize,
        /// Precision of the value
        actual: u32,
        /// Working precision of the kernel
        expected: u32,
    },

    /// The working precision is invalid for this element type
    #[error("invalid working precision {0} for an arbitrary-precision kernel")]
    InvalidPrecision(u32),

    /// A buffer cannot be safely converted to the kernel's element type
    #[error(
        "cannot safely cast the array of {role} from {from} to {to}"
    )]
    UnsafeCast {
        /// Offending buffer
        role: Role,
        /// Element type of the buffer
        from: DType,
        /// Element type of the kernel
        to: DType,
    },

    /// Scalar and batch kernels were not built from the same function
    #[error(
        "scalar and batch kernels disagree on their signature \
         ({scalar} vs {batch})"
    )]
    KernelMismatch {
        /// Signature reported by the scalar kernel
        scalar: String,
        /// Signature reported by the batch kernel
        batch: String,
    },

    /// The batch kernel was compiled with an unexpected width
    #[error("batch kernel has width {actual}, expected {expected}")]
    BadKernelWidth {
        /// Width of the compiled kernel
        actual: u32,
        /// Width requested at build time
        expected: u32,
    },

    /// A kernel must produce at least one output
    #[error("a compiled function must have at least one output")]
    NoOutputs,

    /// Scratch or output sizes overflow `usize`
    #[error("buffer size overflow ({0} × {1})")]
    SizeOverflow(usize, usize),

    /// Error reported by the kernel compiler
    #[error("backend error: {0}")]
    Backend(String),
}
