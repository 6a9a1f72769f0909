//! `cfunc` evaluates pre-compiled numeric vector functions over arrays.
//!
//! A compiled function (a **kernel**) has a fixed shape: it reads `nvars`
//! input variables, `nparams` runtime parameters, and optionally a time value,
//! and writes `nouts` outputs.  Code generation is left to a [`Backend`],
//! which produces native entry points for two widths:
//!
//! - a scalar kernel, which evaluates one point per call
//! - a batch kernel, which evaluates `W` points per call using SIMD
//!
//! This crate handles everything between the caller's arrays and those entry
//! points.  An [`Evaluator`] checks the caller's buffers against the kernel's
//! [`Signature`], decides whether kernels may work on the caller's memory
//! directly or must go through a scratch arena, splits batches into blocks of
//! `W` points (with a scalar remainder), and returns the outputs.
//!
//! Kernels are generic over their [`Element`] type: `f32`, `f64`, and (with
//! the `real` feature) the arbitrary-precision [`Real`].
//!
//! ```
//! use cfunc::{Args, CompiledKernel, Kernel, Signature};
//! use ndarray::array;
//!
//! // out[0] = in[0] + in[1], for W points with the given row stride
//! unsafe extern "C" fn add_strided<const W: usize>(
//!     out: *mut f64,
//!     inputs: *const f64,
//!     _pars: *const f64,
//!     _time: *const f64,
//!     stride: usize,
//! ) {
//!     for j in 0..W {
//!         unsafe { *out.add(j) = *inputs.add(j) + *inputs.add(stride + j) }
//!     }
//! }
//! unsafe extern "C" fn add<const W: usize>(
//!     out: *mut f64,
//!     inputs: *const f64,
//!     pars: *const f64,
//!     time: *const f64,
//! ) {
//!     unsafe { add_strided::<W>(out, inputs, pars, time, W) }
//! }
//!
//! let sig = Signature {
//!     nvars: 2,
//!     nouts: 1,
//!     nparams: 0,
//!     is_time_dependent: false,
//! };
//! let (scalar, batch) = unsafe {
//!     (
//!         CompiledKernel::new(sig, 1, add::<1>, add_strided::<1>),
//!         CompiledKernel::new(sig, 4, add::<4>, add_strided::<4>),
//!     )
//! };
//! let kernel = Kernel::new(scalar, batch, 0)?;
//! let mut eval = kernel.evaluator();
//!
//! let x = array![3.0, 4.0];
//! let out = eval.eval(Args::new(x.view()))?;
//! assert_eq!(out.into_array(), array![7.0].into_dyn());
//!
//! let x = array![[1.0, 2.0], [10.0, 20.0]];
//! let out = eval.eval(Args::new(x.view()))?;
//! assert_eq!(out.into_array(), array![[11.0, 22.0]].into_dyn());
//! # Ok::<(), cfunc::Error>(())
//! ```
//!
//! # Feature flags
#![doc = document_features::document_features!()]
#![warn(missing_docs)]

mod alias;
mod compile;
mod config;
mod element;
mod error;
mod precision;
mod scratch;
mod validate;

pub mod buffer;
pub mod dynamic;
pub mod eval;
pub mod kernel;

pub use buffer::{Buffer, Operand, Role, Time};
pub use compile::Backend;
pub use config::CompileOptions;
pub use dynamic::{AnyBuffer, AnyScalar, AnyTime};
pub use element::{DType, Element};
pub use error::{Dims, Error};
pub use eval::{Args, DynArgs, Evaluator, Outputs};
pub use kernel::{
    CompiledKernel, Kernel, KernelFn, KernelMeta, Signature, StridedKernelFn,
};

#[cfg(feature = "real")]
pub use element::Real;
