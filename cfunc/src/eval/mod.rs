//! Evaluation of compiled kernels over caller-supplied buffers
//!
//! An [`Evaluator`] validates a set of buffers against its kernel, then picks
//! one of two execution paths:
//!
//! - **zero-copy**, where kernels read from and write to the caller's memory
//!   directly.  This requires every buffer to be densely packed in row-major
//!   order, and no two buffers to overlap.
//! - **buffered**, where values are gathered into a per-evaluator scratch
//!   arena, evaluated there, and scattered back into the outputs.
//!
//! Batch evaluations are split into blocks of `W` points (the batch width of
//! the kernel), followed by up to `W - 1` remaining points which are evaluated
//! one at a time with the scalar kernel.
use crate::{
    Error,
    alias::{overlaps, zero_copy_ok},
    buffer::{Buffer, Operand, Role, Time},
    dynamic::{AnyBuffer, AnyTime},
    element::Element,
    kernel::{Kernel, KernelMeta},
    precision,
    scratch::{Scratch, ptr_or_null},
    validate::{Mode, validate},
};
use ndarray::{ArrayD, IxDyn};

#[cfg(any(test, feature = "eval-tests"))]
pub mod test;

/// Arguments for a single call to [`Evaluator::eval`]
///
/// Inputs have shape `(nvars,)` for a single evaluation or `(nvars, N)` for a
/// batch evaluation of `N` points; every other buffer must follow suit.
pub struct Args<'a, T> {
    inputs: Buffer<'a, T>,
    outputs: Option<Buffer<'a, T>>,
    pars: Option<Buffer<'a, T>>,
    time: Option<Time<'a, T>>,
}

impl<'a, T> Args<'a, T> {
    /// Builds a new set of arguments from an array of inputs
    pub fn new(inputs: impl Into<Buffer<'a, T>>) -> Self {
        Self {
            inputs: inputs.into(),
            outputs: None,
            pars: None,
            time: None,
        }
    }

    /// Sets a pre-allocated output buffer, which is overwritten in place
    ///
    /// If no output buffer is given, a fresh array is allocated.
    pub fn outputs(self, outputs: impl Into<Buffer<'a, T>>) -> Self {
        Self {
            outputs: Some(outputs.into()),
            ..self
        }
    }

    /// Sets the parameter values
    pub fn pars(self, pars: impl Into<Buffer<'a, T>>) -> Self {
        Self {
            pars: Some(pars.into()),
            ..self
        }
    }

    /// Sets the time value(s)
    pub fn time(self, time: Time<'a, T>) -> Self {
        Self {
            time: Some(time),
            ..self
        }
    }
}

/// Dynamically typed arguments for [`Evaluator::eval_dyn`]
pub struct DynArgs<'a> {
    inputs: AnyBuffer<'a>,
    outputs: Option<AnyBuffer<'a>>,
    pars: Option<AnyBuffer<'a>>,
    time: Option<AnyTime<'a>>,
}

impl<'a> DynArgs<'a> {
    /// Builds a new set of arguments from an array of inputs
    pub fn new(inputs: impl Into<AnyBuffer<'a>>) -> Self {
        Self {
            inputs: inputs.into(),
            outputs: None,
            pars: None,
            time: None,
        }
    }

    /// Sets a pre-allocated output buffer
    ///
    /// If the buffer's element type differs from the kernel's, results are
    /// written to a converted copy (returned as [`Outputs::Allocated`]) and
    /// the buffer itself is left untouched.
    pub fn outputs(self, outputs: impl Into<AnyBuffer<'a>>) -> Self {
        Self {
            outputs: Some(outputs.into()),
            ..self
        }
    }

    /// Sets the parameter values
    pub fn pars(self, pars: impl Into<AnyBuffer<'a>>) -> Self {
        Self {
            pars: Some(pars.into()),
            ..self
        }
    }

    /// Sets the time value(s)
    pub fn time(self, time: AnyTime<'a>) -> Self {
        Self {
            time: Some(time),
            ..self
        }
    }
}

/// Result of an evaluation
pub enum Outputs<'a, T> {
    /// Freshly allocated array, in standard layout
    Allocated(ArrayD<T>),
    /// The caller's output buffer, now holding results
    Provided(Buffer<'a, T>),
}

impl<T> Outputs<'_, T> {
    /// Copies the results into an owned array
    pub fn to_array(&self) -> ArrayD<T>
    where
        T: Clone,
    {
        match self {
            Outputs::Allocated(a) => a.clone(),
            Outputs::Provided(b) => b.to_array(),
        }
    }

    /// Converts the results into an owned array, copying only if necessary
    pub fn into_array(self) -> ArrayD<T>
    where
        T: Clone,
    {
        match self {
            Outputs::Allocated(a) => a,
            Outputs::Provided(b) => b.to_array(),
        }
    }

    fn buffer_mut(&mut self) -> Buffer<'_, T> {
        match self {
            Outputs::Allocated(a) => Buffer::from(a.view_mut()),
            Outputs::Provided(b) => b.reborrow(),
        }
    }
}

/// Evaluator for a compiled kernel
///
/// Each evaluator owns a scratch arena sized for one batch of points, which
/// is reused across calls; evaluation therefore takes `&mut self`.  To
/// evaluate from several threads, build one evaluator per thread from clones
/// of the same [`Kernel`].
pub struct Evaluator<T> {
    kernel: Kernel<T>,
    scratch: Scratch<T>,
}
static_assertions::assert_impl_all!(Evaluator<f64>: Send);

impl<T: Element> Kernel<T> {
    /// Builds a new evaluator for this kernel
    pub fn evaluator(&self) -> Evaluator<T> {
        Evaluator::new(self.clone())
    }
}

impl<T: Element> Evaluator<T> {
    /// Builds a new evaluator, allocating its scratch arena
    pub fn new(kernel: Kernel<T>) -> Self {
        let scratch = Scratch::new(kernel.scratch_layout(), kernel.meta().prec);
        Self { kernel, scratch }
    }

    /// Returns the kernel being evaluated
    pub fn kernel(&self) -> &Kernel<T> {
        &self.kernel
    }

    /// Returns kernel metadata
    pub fn meta(&self) -> &KernelMeta {
        self.kernel.meta()
    }

    /// Evaluates the kernel
    ///
    /// All checks are performed before any kernel invocation; if this returns
    /// an error, no buffer has been written.
    pub fn eval<'a>(
        &mut self,
        args: Args<'a, T>,
    ) -> Result<Outputs<'a, T>, Error> {
        let Args {
            inputs,
            outputs,
            pars,
            time,
        } = args;
        self.eval_buffers(&inputs, outputs, pars.as_ref(), time.as_ref())
    }

    /// Evaluates the kernel with dynamically typed arguments
    ///
    /// Each buffer is first converted to the kernel's element type (see
    /// [`Element::coerce`]), then evaluation proceeds as in
    /// [`Evaluator::eval`].
    pub fn eval_dyn<'a>(
        &mut self,
        args: DynArgs<'a>,
    ) -> Result<Outputs<'a, T>, Error> {
        let prec = self.meta().prec;
        let DynArgs {
            inputs,
            outputs,
            pars,
            time,
        } = args;

        let inputs = T::coerce(inputs, Role::Inputs, prec)?;
        let outputs = outputs
            .map(|o| T::coerce(o, Role::Outputs, prec))
            .transpose()?;
        let pars = pars
            .map(|p| T::coerce(p, Role::Parameters, prec))
            .transpose()?;
        let time = match time {
            None => None,
            Some(AnyTime::Scalar(v)) => Some(TimeOperand::Scalar(
                T::coerce_scalar(v, Role::Time, prec)?,
            )),
            Some(AnyTime::Array(b)) => {
                Some(TimeOperand::Array(T::coerce(b, Role::Time, prec)?))
            }
        };

        let inputs = inputs.buffer();
        let pars = pars.as_ref().map(Operand::buffer);
        let time = time.as_ref().map(TimeOperand::time);
        match outputs {
            None => {
                self.eval_buffers(&inputs, None, pars.as_ref(), time.as_ref())
            }
            Some(Operand::Borrowed(out)) => self.eval_buffers(
                &inputs,
                Some(out),
                pars.as_ref(),
                time.as_ref(),
            ),
            Some(Operand::Owned(mut out)) => {
                self.eval_buffers(
                    &inputs,
                    Some(Buffer::from(out.view_mut())),
                    pars.as_ref(),
                    time.as_ref(),
                )?;
                Ok(Outputs::Allocated(out))
            }
        }
    }

    fn eval_buffers<'o>(
        &mut self,
        inputs: &Buffer<'_, T>,
        outputs: Option<Buffer<'o, T>>,
        pars: Option<&Buffer<'_, T>>,
        time: Option<&Time<'_, T>>,
    ) -> Result<Outputs<'o, T>, Error> {
        let meta = *self.kernel.meta();
        let mode = validate(
            &meta.signature,
            meta.prec,
            inputs,
            outputs.as_ref(),
            pars,
            time,
        )?;

        let mut outputs = match outputs {
            Some(mut out) => {
                precision::ensure(&mut out, meta.prec);
                Outputs::Provided(out)
            }
            None => {
                let nouts = meta.signature.nouts as usize;
                let shape = match mode {
                    Mode::Single => vec![nouts],
                    Mode::Batch(n) => vec![nouts, n],
                };
                Outputs::Allocated(ArrayD::from_elem(
                    IxDyn(&shape),
                    T::zero(meta.prec),
                ))
            }
        };

        let time = time.map(Time::buffer);
        let mut out = outputs.buffer_mut();
        let (zero_copy, aliased) = {
            let mut bufs = vec![inputs];
            bufs.extend(pars);
            bufs.extend(time.as_ref());
            let aliased = overlaps(&out, &bufs);
            bufs.push(&out);
            (zero_copy_ok(&bufs), aliased)
        };

        let call = Call {
            inputs,
            pars,
            time: time.as_ref(),
        };
        match (mode, zero_copy) {
            (Mode::Single, true) => self.single_zero_copy(&call, &mut out),
            (Mode::Single, false) => self.single_buffered(&call, &mut out),
            (Mode::Batch(n), true) => self.batch_zero_copy(&call, &mut out, n),
            (Mode::Batch(n), false) if aliased => {
                self.batch_staged(&call, &mut out, n)
            }
            (Mode::Batch(n), false) => self.batch_buffered(&call, &mut out, n),
        }
        drop(out);

        Ok(outputs)
    }

    /// Returns base pointers for the zero-copy path
    ///
    /// Pointers for roles which the kernel never reads are `None`, so that
    /// no arithmetic is done on them.
    fn read_ptrs(&self, call: &Call<'_, '_, T>) -> ReadPtrs<T> {
        let sig = self.kernel.signature();
        ReadPtrs {
            inputs: (sig.nvars > 0).then(|| call.inputs.as_ptr()),
            pars: call.pars.filter(|_| sig.nparams > 0).map(Buffer::as_ptr),
            time: call
                .time
                .filter(|_| sig.is_time_dependent)
                .map(Buffer::as_ptr),
        }
    }

    fn single_zero_copy(
        &mut self,
        call: &Call<'_, '_, T>,
        out: &mut Buffer<'_, T>,
    ) {
        log::trace!("single evaluation, zero-copy");
        let p = self.read_ptrs(call);
        let f = self.kernel.scalar();
        // SAFETY: buffers were validated against the kernel signature, and
        // are dense and disjoint
        unsafe {
            f(
                out.as_mut_ptr(),
                at(p.inputs, 0),
                at(p.pars, 0),
                at(p.time, 0),
            )
        }
    }

    fn single_buffered(
        &mut self,
        call: &Call<'_, '_, T>,
        out: &mut Buffer<'_, T>,
    ) {
        log::trace!("single evaluation, buffered");
        let sig = *self.kernel.signature();
        let f = self.kernel.scalar();
        let s = &mut self.scratch;

        // SAFETY: every index below was checked by `validate`
        unsafe {
            for v in 0..sig.nvars as usize {
                s.inputs[v].clone_from(&*call.inputs.at1(v));
            }
            if let Some(pars) = call.pars {
                for p in 0..sig.nparams as usize {
                    s.pars[p].clone_from(&*pars.at1(p));
                }
            }
            if let Some(time) = call.time.filter(|_| sig.is_time_dependent) {
                s.time[0].clone_from(&*time.at1(0));
            }
            f(
                s.outputs.as_mut_ptr(),
                ptr_or_null(&s.inputs),
                ptr_or_null(&s.pars),
                ptr_or_null(&s.time),
            );
            for i in 0..sig.nouts as usize {
                (*out.at1(i)).clone_from(&s.outputs[i]);
            }
        }
    }

    fn batch_zero_copy(
        &mut self,
        call: &Call<'_, '_, T>,
        out: &mut Buffer<'_, T>,
        n: usize,
    ) {
        let w = self.meta().batch_size as usize;
        let blocks = n / w;
        log::trace!(
            "batch evaluation of {n} point(s), zero-copy: \
             {blocks} block(s) of {w}, {} remaining",
            n % w
        );

        let p = self.read_ptrs(call);
        let batch = self.kernel.batch_strided();
        let scalar = self.kernel.scalar_strided();
        let out = out.as_mut_ptr();

        // SAFETY: buffers were validated to have `n` points per row, and are
        // dense and disjoint; each call touches points `k..k + width` of each
        // row, which are in bounds.
        unsafe {
            for k in (0..blocks).map(|b| b * w) {
                batch(
                    out.add(k),
                    at(p.inputs, k),
                    at(p.pars, k),
                    at(p.time, k),
                    n,
                );
            }
            for k in blocks * w..n {
                scalar(
                    out.add(k),
                    at(p.inputs, k),
                    at(p.pars, k),
                    at(p.time, k),
                    n,
                );
            }
        }
    }

    fn batch_buffered(
        &mut self,
        call: &Call<'_, '_, T>,
        out: &mut Buffer<'_, T>,
        n: usize,
    ) {
        let w = self.meta().batch_size as usize;
        let blocks = n / w;
        log::trace!(
            "batch evaluation of {n} point(s), buffered: \
             {blocks} block(s) of {w}, {} remaining",
            n % w
        );

        let sig = *self.kernel.signature();
        let (nvars, nouts, nparams) = (
            sig.nvars as usize,
            sig.nouts as usize,
            sig.nparams as usize,
        );
        let time = call.time.filter(|_| sig.is_time_dependent);
        let batch = self.kernel.batch();
        let scalar = self.kernel.scalar();
        let s = &mut self.scratch;

        // Gathers `width` points starting at `k` into the arena, evaluates
        // them with `f`, and scatters the results back.
        //
        // SAFETY: every index is in bounds per `validate`, and the arena is
        // sized for `w` points.
        let mut run = |f: crate::KernelFn<T>, k: usize, width: usize| unsafe {
            for v in 0..nvars {
                for j in 0..width {
                    let x = &*call.inputs.at2(v, k + j);
                    s.inputs[v * width + j].clone_from(x);
                }
            }
            if let Some(pars) = call.pars {
                for p in 0..nparams {
                    for j in 0..width {
                        s.pars[p * width + j].clone_from(&*pars.at2(p, k + j));
                    }
                }
            }
            if let Some(time) = time {
                for j in 0..width {
                    s.time[j].clone_from(&*time.at1(k + j));
                }
            }
            f(
                s.outputs.as_mut_ptr(),
                ptr_or_null(&s.inputs),
                ptr_or_null(&s.pars),
                ptr_or_null(&s.time),
            );
            for i in 0..nouts {
                for j in 0..width {
                    (*out.at2(i, k + j)).clone_from(&s.outputs[i * width + j]);
                }
            }
        };

        for k in (0..blocks).map(|b| b * w) {
            run(batch, k, w);
        }
        for k in blocks * w..n {
            run(scalar, k, 1);
        }
    }

    /// Buffered batch evaluation for outputs which overlap an argument
    ///
    /// Each block's gather would otherwise see results scattered by earlier
    /// blocks, so results are collected in a separate array and copied into
    /// the outputs once every block has been evaluated.
    fn batch_staged(
        &mut self,
        call: &Call<'_, '_, T>,
        out: &mut Buffer<'_, T>,
        n: usize,
    ) {
        log::trace!("outputs overlap their arguments, staging results");
        let nouts = self.kernel.signature().nouts as usize;
        let mut staged =
            ArrayD::from_elem(IxDyn(&[nouts, n]), T::zero(self.meta().prec));
        self.batch_buffered(call, &mut Buffer::from(staged.view_mut()), n);
        out.view_mut().assign(&staged);
    }
}

/// Validated read-only buffers for one evaluation
struct Call<'b, 'a, T> {
    inputs: &'b Buffer<'a, T>,
    pars: Option<&'b Buffer<'a, T>>,
    time: Option<&'b Buffer<'a, T>>,
}

/// Base pointers for the zero-copy path
struct ReadPtrs<T> {
    inputs: Option<*const T>,
    pars: Option<*const T>,
    time: Option<*const T>,
}

/// Offsets a base pointer by `k` elements, or returns null
///
/// # Safety
/// If `ptr` is present, the offset must stay within its allocation
#[inline]
unsafe fn at<T>(ptr: Option<*const T>, k: usize) -> *const T {
    match ptr {
        Some(p) => unsafe { p.add(k) },
        None => std::ptr::null(),
    }
}

/// Time argument after element type conversion
enum TimeOperand<'a, T> {
    Scalar(T),
    Array(Operand<'a, T>),
}

impl<T> TimeOperand<'_, T> {
    fn time(&self) -> Time<'_, T>
    where
        T: Clone,
    {
        match self {
            TimeOperand::Scalar(v) => Time::Scalar(v.clone()),
            TimeOperand::Array(op) => Time::Array(op.buffer()),
        }
    }
}
