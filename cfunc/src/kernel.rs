//! Compiled kernels and their metadata
//!
//! A kernel is a fixed-shape vector function that has been compiled (by some
//! external backend) into native code.  For each element type, the backend
//! produces four entry points:
//!
//! - A scalar kernel, evaluating one point
//! - A batch kernel, evaluating `W` points per invocation
//! - Strided versions of both, which take an explicit row stride
//!
//! All of them share the same calling convention: `(out, in, pars, time)`,
//! plus a trailing stride for the strided variants.  For a kernel of width
//! `w` invoked with stride `s` (the dense variants use `s = w`):
//!
//! - input variable `v` at point `j` is read from `in[v * s + j]`
//! - output `i` at point `j` is written to `out[i * s + j]`
//! - parameter `p` at point `j` is read from `pars[p * s + j]`
//! - the time at point `j` is read from `time[j]`
//!
//! Any of `in`, `pars`, and `time` may be null if the kernel has no
//! variables, has no parameters, or is not time-dependent.
use crate::{Error, element::Element};
use std::{any::Any, sync::Arc};

/// Kernel entry point operating on densely packed data
pub type KernelFn<T> = unsafe extern "C" fn(
    *mut T,   // out
    *const T, // in
    *const T, // pars
    *const T, // time
);

/// Kernel entry point operating on data with an explicit row stride
pub type StridedKernelFn<T> = unsafe extern "C" fn(
    *mut T,   // out
    *const T, // in
    *const T, // pars
    *const T, // time
    usize,    // stride
);

/// Shape of a compiled function
#[derive(
    Copy, Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize,
)]
pub struct Signature {
    /// Number of input variables
    pub nvars: u32,
    /// Number of outputs
    pub nouts: u32,
    /// Number of runtime parameters
    pub nparams: u32,
    /// Whether the function reads the time argument
    pub is_time_dependent: bool,
}

impl std::fmt::Display for Signature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} var(s), {} output(s), {} parameter(s), {}",
            self.nvars,
            self.nouts,
            self.nparams,
            if self.is_time_dependent {
                "time-dependent"
            } else {
                "time-independent"
            }
        )
    }
}

/// Immutable metadata describing a [`Kernel`]
#[derive(
    Copy, Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize,
)]
pub struct KernelMeta {
    /// Shape of the compiled function
    pub signature: Signature,
    /// Number of points evaluated per batch kernel invocation
    pub batch_size: u32,
    /// Element type
    pub dtype: crate::DType,
    /// Working precision in bits (only meaningful for arbitrary precision)
    pub prec: u32,
}

/// Sizes of the per-evaluator scratch buffers, in elements
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) struct ScratchLayout {
    pub inputs: usize,
    pub outputs: usize,
    pub pars: usize,
    pub time: usize,
}

impl ScratchLayout {
    fn new(sig: &Signature, width: u32) -> Result<Self, Error> {
        let width = width as usize;
        let mul = |n: u32| {
            (n as usize)
                .checked_mul(width)
                .ok_or(Error::SizeOverflow(n as usize, width))
        };
        Ok(Self {
            inputs: mul(sig.nvars)?,
            outputs: mul(sig.nouts)?,
            pars: mul(sig.nparams)?,
            time: if sig.is_time_dependent { width } else { 0 },
        })
    }
}

/// Entry points of a kernel compiled for a single batch width
pub struct CompiledKernel<T> {
    signature: Signature,
    width: u32,
    dense: KernelFn<T>,
    strided: StridedKernelFn<T>,

    /// Opaque handle keeping the compiled code alive (e.g. executable memory)
    #[allow(unused)]
    storage: Option<Arc<dyn Any + Send + Sync>>,
}

impl<T> CompiledKernel<T> {
    /// Wraps a pair of compiled entry points
    ///
    /// # Safety
    /// `dense` and `strided` must implement the calling convention described
    /// in the [module documentation](self) for a kernel of the given width
    /// and signature, must not unwind, and must remain callable for as long
    /// as this object (or any [`Kernel`] built from it) is alive.  If the
    /// code lives in memory owned by some other object, pass that object to
    /// [`CompiledKernel::with_storage`].
    pub unsafe fn new(
        signature: Signature,
        width: u32,
        dense: KernelFn<T>,
        strided: StridedKernelFn<T>,
    ) -> Self {
        Self {
            signature,
            width,
            dense,
            strided,
            storage: None,
        }
    }

    /// Attaches an object which owns the compiled code
    pub fn with_storage<S: Any + Send + Sync>(self, storage: S) -> Self {
        Self {
            storage: Some(Arc::new(storage)),
            ..self
        }
    }

    /// Returns the signature reported by the backend
    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    /// Returns the number of points evaluated per invocation
    pub fn width(&self) -> u32 {
        self.width
    }
}

struct KernelData<T> {
    meta: KernelMeta,
    scratch: ScratchLayout,
    scalar: CompiledKernel<T>,
    batch: CompiledKernel<T>,
}

/// Scalar and batch entry points for a single compiled function
///
/// A `Kernel` is immutable and cheap to clone; clones share the same compiled
/// code, and may be sent across threads to build one
/// [`Evaluator`](crate::Evaluator) per thread.
pub struct Kernel<T>(Arc<KernelData<T>>);
static_assertions::assert_impl_all!(Kernel<f64>: Send, Sync);

impl<T> Clone for Kernel<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<T: Element> Kernel<T> {
    /// Builds a kernel from separately compiled scalar and batch functions
    ///
    /// The two must have been compiled from the same function; this is
    /// checked by comparing their signatures.
    pub fn new(
        scalar: CompiledKernel<T>,
        batch: CompiledKernel<T>,
        prec: u32,
    ) -> Result<Self, Error> {
        if scalar.signature != batch.signature {
            return Err(Error::KernelMismatch {
                scalar: scalar.signature.to_string(),
                batch: batch.signature.to_string(),
            });
        }
        if scalar.width != 1 {
            return Err(Error::BadKernelWidth {
                actual: scalar.width,
                expected: 1,
            });
        }
        check_batch_size::<T>(batch.width)?;
        check_prec::<T>(prec)?;

        let signature = scalar.signature;
        if signature.nouts == 0 {
            return Err(Error::NoOutputs);
        }
        let scratch = ScratchLayout::new(&signature, batch.width)?;
        let meta = KernelMeta {
            signature,
            batch_size: batch.width,
            dtype: T::DTYPE,
            prec: if T::HAS_PRECISION { prec } else { 0 },
        };
        Ok(Self(Arc::new(KernelData {
            meta,
            scratch,
            scalar,
            batch,
        })))
    }

    /// Returns kernel metadata
    pub fn meta(&self) -> &KernelMeta {
        &self.0.meta
    }

    /// Returns the signature of the compiled function
    pub fn signature(&self) -> &Signature {
        &self.0.meta.signature
    }

    pub(crate) fn scratch_layout(&self) -> &ScratchLayout {
        &self.0.scratch
    }

    #[inline]
    pub(crate) fn scalar(&self) -> KernelFn<T> {
        self.0.scalar.dense
    }

    #[inline]
    pub(crate) fn scalar_strided(&self) -> StridedKernelFn<T> {
        self.0.scalar.strided
    }

    #[inline]
    pub(crate) fn batch(&self) -> KernelFn<T> {
        self.0.batch.dense
    }

    #[inline]
    pub(crate) fn batch_strided(&self) -> StridedKernelFn<T> {
        self.0.batch.strided
    }
}

/// Checks that a batch width is valid for the given element type
pub(crate) fn check_batch_size<T: Element>(w: u32) -> Result<(), Error> {
    if w == 0 {
        Err(Error::InvalidBatchSize)
    } else if w > 1 && !T::SUPPORTS_BATCH {
        Err(Error::UnsupportedBatchWidth {
            dtype: T::DTYPE,
            requested: w,
        })
    } else {
        Ok(())
    }
}

/// Checks that a working precision is valid for the given element type
pub(crate) fn check_prec<T: Element>(prec: u32) -> Result<(), Error> {
    if T::HAS_PRECISION && prec == 0 {
        Err(Error::InvalidPrecision(prec))
    } else {
        Ok(())
    }
}
