//! Options passed to kernel backends
use crate::element::Element;

/// Compilation options for a [`Backend`](crate::Backend)
///
/// These are forwarded verbatim to the backend, with the exception of
/// `batch_size`, which is resolved by [`Kernel::build`](crate::Kernel::build)
/// before compilation.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct CompileOptions {
    /// Prefer accurate (but slower) implementations of elementary functions
    pub high_accuracy: bool,

    /// Compile the function in compact mode, reducing code size at some
    /// cost in performance
    pub compact_mode: bool,

    /// Allow the backend to parallelize evaluation of a single point
    pub parallel_mode: bool,

    /// Optimization level, from 0 to 3
    pub opt_level: u32,

    /// Force the use of 512-bit registers when available
    pub force_avx512: bool,

    /// Allow floating-point transformations which don't preserve IEEE
    /// semantics
    pub fast_math: bool,

    /// Batch width; if `None`, the element type's recommended SIMD width is
    /// used
    pub batch_size: Option<u32>,

    /// Working precision in bits, for arbitrary-precision elements
    pub prec: u32,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            high_accuracy: false,
            compact_mode: false,
            parallel_mode: false,
            opt_level: 3,
            force_avx512: false,
            fast_math: false,
            batch_size: None,
            prec: 0,
        }
    }
}

impl CompileOptions {
    /// Builds the default options for the given element type
    ///
    /// Arbitrary-precision kernels default to compact mode.
    pub fn new<T: Element>() -> Self {
        Self {
            compact_mode: T::HAS_PRECISION,
            ..Self::default()
        }
    }

    /// Returns the batch width to compile for
    pub fn resolved_batch_size<T: Element>(&self) -> u32 {
        self.batch_size.unwrap_or_else(T::recommended_simd_size)
    }
}
