//! Building kernels from a code generator
use crate::{
    Error,
    config::CompileOptions,
    element::Element,
    kernel::{CompiledKernel, Kernel, check_batch_size, check_prec},
};

/// A code generator which can compile a function for a given batch width
///
/// Implementations are expected to be deterministic: compiling the same
/// function twice (at different widths) must produce kernels with the same
/// [`Signature`](crate::Signature).
pub trait Backend<T: Element>: Sync {
    /// Compiles the function for `width` points per invocation
    fn compile(
        &self,
        width: u32,
        opts: &CompileOptions,
    ) -> Result<CompiledKernel<T>, Error>;
}

impl<T: Element> Kernel<T> {
    /// Compiles scalar and batch kernels with the given backend
    ///
    /// The two compilations are independent and run in parallel.  The batch
    /// width is taken from `opts.batch_size`, falling back to the element
    /// type's recommended SIMD width.
    pub fn build<B: Backend<T>>(
        backend: &B,
        opts: &CompileOptions,
    ) -> Result<Self, Error> {
        let width = opts.resolved_batch_size::<T>();
        check_batch_size::<T>(width)?;
        check_prec::<T>(opts.prec)?;

        let start = std::time::Instant::now();
        let (scalar, batch) = rayon::join(
            || backend.compile(1, opts),
            || backend.compile(width, opts),
        );
        let (scalar, batch) = (scalar?, batch?);
        log::debug!(
            "compiled {} kernels (width {width}) in {:?}",
            T::DTYPE,
            start.elapsed()
        );

        if batch.width() != width {
            return Err(Error::BadKernelWidth {
                actual: batch.width(),
                expected: width,
            });
        }
        Kernel::new(scalar, batch, opts.prec)
    }
}
