//! Test suite for kernel evaluators
//!
//! If the `eval-tests` feature is set, then this exposes a standard test suite
//! which can be run against any [`Backend`] able to compile the handful of
//! functions in [`TestFunction`]; otherwise, the module has no public exports.
//!
//! The crate itself runs the suite against [`RefBackend`], whose kernels are
//! hand-written Rust functions.
use crate::{
    Backend, CompileOptions, Error, Kernel, KernelFn, Signature,
    StridedKernelFn,
    buffer::{Buffer, Role, Time},
    element::Element,
    error::Dims,
    eval::{Args, Outputs},
    kernel::CompiledKernel,
};
use ndarray::{Array1, Array2, Array3, ArrayD, s};

/// Element type with enough arithmetic to write reference kernels
pub trait TestElement: Element {
    /// Builds a value at the given precision
    fn from_f64(v: f64, prec: u32) -> Self;
    /// Converts back to `f64` for comparisons
    fn as_f64(&self) -> f64;
    /// Returns `self + other`
    fn plus(&self, other: &Self) -> Self;
    /// Returns `self * other`
    fn times(&self, other: &Self) -> Self;
}

impl TestElement for f64 {
    fn from_f64(v: f64, _prec: u32) -> Self {
        v
    }
    fn as_f64(&self) -> f64 {
        *self
    }
    fn plus(&self, other: &Self) -> Self {
        self + other
    }
    fn times(&self, other: &Self) -> Self {
        self * other
    }
}

impl TestElement for f32 {
    fn from_f64(v: f64, _prec: u32) -> Self {
        v as f32
    }
    fn as_f64(&self) -> f64 {
        f64::from(*self)
    }
    fn plus(&self, other: &Self) -> Self {
        self + other
    }
    fn times(&self, other: &Self) -> Self {
        self * other
    }
}

#[cfg(feature = "real")]
impl TestElement for crate::Real {
    fn from_f64(v: f64, prec: u32) -> Self {
        crate::Real::try_from(v)
            .expect("test values are finite")
            .with_precision(prec as usize)
            .value()
    }
    fn as_f64(&self) -> f64 {
        self.to_f64().value()
    }
    fn plus(&self, other: &Self) -> Self {
        self + other
    }
    fn times(&self, other: &Self) -> Self {
        self * other
    }
}

/// Functions which a backend must be able to compile to run the suite
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TestFunction {
    /// `out0 = x + y`
    Sum,
    /// `out0 = x * p0 + t`, `out1 = y + x`
    Affine,
    /// `out0 = p0`, with no input variables
    Constant,
}

impl TestFunction {
    /// Returns the signature of the function
    pub fn signature(&self) -> Signature {
        match self {
            TestFunction::Sum => Signature {
                nvars: 2,
                nouts: 1,
                nparams: 0,
                is_time_dependent: false,
            },
            TestFunction::Affine => Signature {
                nvars: 2,
                nouts: 2,
                nparams: 1,
                is_time_dependent: true,
            },
            TestFunction::Constant => Signature {
                nvars: 0,
                nouts: 1,
                nparams: 1,
                is_time_dependent: false,
            },
        }
    }
}

/// Backend which can be constructed for a [`TestFunction`]
pub trait TestBackend<T: Element>: Backend<T> {
    /// Builds a backend which compiles the given function
    fn new(f: TestFunction) -> Self;
}

////////////////////////////////////////////////////////////////////////////////

/// Backend serving hand-written kernels for each [`TestFunction`]
///
/// Kernels are monomorphized for widths 1, 2, 3, 4, 8, and 16.
pub struct RefBackend(TestFunction);

impl<T: TestElement> TestBackend<T> for RefBackend {
    fn new(f: TestFunction) -> Self {
        Self(f)
    }
}

impl<T: TestElement> Backend<T> for RefBackend {
    fn compile(
        &self,
        width: u32,
        _opts: &CompileOptions,
    ) -> Result<CompiledKernel<T>, Error> {
        let (dense, strided) = match width {
            1 => ref_kernels::<T, 1>(self.0),
            2 => ref_kernels::<T, 2>(self.0),
            3 => ref_kernels::<T, 3>(self.0),
            4 => ref_kernels::<T, 4>(self.0),
            8 => ref_kernels::<T, 8>(self.0),
            16 => ref_kernels::<T, 16>(self.0),
            w => return Err(Error::Backend(format!("unsupported width {w}"))),
        };
        // SAFETY: the reference kernels follow the documented layout
        Ok(unsafe {
            CompiledKernel::new(self.0.signature(), width, dense, strided)
        })
    }
}

fn ref_kernels<T: TestElement, const W: usize>(
    f: TestFunction,
) -> (KernelFn<T>, StridedKernelFn<T>) {
    match f {
        TestFunction::Sum => (sum::<T, W>, sum_strided::<T, W>),
        TestFunction::Affine => (affine::<T, W>, affine_strided::<T, W>),
        TestFunction::Constant => (constant::<T, W>, constant_strided::<T, W>),
    }
}

unsafe extern "C" fn sum_strided<T: TestElement, const W: usize>(
    out: *mut T,
    inputs: *const T,
    pars: *const T,
    time: *const T,
    stride: usize,
) {
    // No parameters and no time, so both pointers are always null
    assert!(pars.is_null());
    assert!(time.is_null());
    for j in 0..W {
        unsafe {
            *out.add(j) = (*inputs.add(j)).plus(&*inputs.add(stride + j));
        }
    }
}

unsafe extern "C" fn sum<T: TestElement, const W: usize>(
    out: *mut T,
    inputs: *const T,
    pars: *const T,
    time: *const T,
) {
    unsafe { sum_strided::<T, W>(out, inputs, pars, time, W) }
}

unsafe extern "C" fn affine_strided<T: TestElement, const W: usize>(
    out: *mut T,
    inputs: *const T,
    pars: *const T,
    time: *const T,
    stride: usize,
) {
    for j in 0..W {
        unsafe {
            let x = &*inputs.add(j);
            let y = &*inputs.add(stride + j);
            *out.add(j) = x.times(&*pars.add(j)).plus(&*time.add(j));
            *out.add(stride + j) = y.plus(x);
        }
    }
}

unsafe extern "C" fn affine<T: TestElement, const W: usize>(
    out: *mut T,
    inputs: *const T,
    pars: *const T,
    time: *const T,
) {
    unsafe { affine_strided::<T, W>(out, inputs, pars, time, W) }
}

unsafe extern "C" fn constant_strided<T: TestElement, const W: usize>(
    out: *mut T,
    inputs: *const T,
    pars: *const T,
    _time: *const T,
    _stride: usize,
) {
    // Functions without variables are always handed a null input pointer
    assert!(inputs.is_null());
    for j in 0..W {
        unsafe { *out.add(j) = (*pars.add(j)).clone() }
    }
}

unsafe extern "C" fn constant<T: TestElement, const W: usize>(
    out: *mut T,
    inputs: *const T,
    pars: *const T,
    time: *const T,
) {
    unsafe { constant_strided::<T, W>(out, inputs, pars, time, W) }
}

////////////////////////////////////////////////////////////////////////////////

/// Helper struct to put constraints on our element and backend types
pub struct TestDispatch<T, B>(std::marker::PhantomData<*const (T, B)>);

impl<T: TestElement, B: TestBackend<T>> TestDispatch<T, B> {
    fn prec() -> u32 {
        if T::HAS_PRECISION { 128 } else { 0 }
    }

    fn widths() -> Vec<u32> {
        if T::SUPPORTS_BATCH {
            vec![1, 3, 4]
        } else {
            vec![1]
        }
    }

    fn kernel(f: TestFunction, width: u32) -> Kernel<T> {
        let opts = CompileOptions {
            batch_size: Some(width),
            prec: Self::prec(),
            ..CompileOptions::new::<T>()
        };
        Kernel::build(&B::new(f), &opts).unwrap()
    }

    fn v(x: f64) -> T {
        T::from_f64(x, Self::prec())
    }

    fn array1(xs: &[f64]) -> Array1<T> {
        xs.iter().map(|x| Self::v(*x)).collect()
    }

    fn array2(
        rows: usize,
        cols: usize,
        f: impl Fn(usize, usize) -> f64,
    ) -> Array2<T> {
        Array2::from_shape_fn((rows, cols), |(i, j)| Self::v(f(i, j)))
    }

    fn values(a: &ArrayD<T>) -> Vec<f64> {
        a.iter().map(T::as_f64).collect()
    }

    /// Affine inputs, parameters, and times for `n` points
    fn affine_args(n: usize) -> (Array2<T>, Array2<T>, Array1<T>) {
        let x = Self::array2(2, n, |i, j| {
            if i == 0 { j as f64 * 0.5 } else { 1.0 - j as f64 }
        });
        let p = Self::array2(1, n, |_, j| j as f64 + 1.0);
        let t = (0..n).map(|j| Self::v(j as f64 * 0.25)).collect();
        (x, p, t)
    }

    fn affine_expected(n: usize) -> Vec<f64> {
        let row0 = (0..n).map(|j| {
            let (x, p, t) = (j as f64 * 0.5, j as f64 + 1.0, j as f64 * 0.25);
            x * p + t
        });
        let row1 = (0..n).map(|j| (1.0 - j as f64) + j as f64 * 0.5);
        row0.chain(row1).collect()
    }

    pub fn test_single_sum() {
        for w in Self::widths() {
            let k = Self::kernel(TestFunction::Sum, w);
            let mut eval = k.evaluator();
            let x = Self::array1(&[3.0, 4.0]);
            let out = eval.eval(Args::new(x.view())).unwrap().into_array();
            assert_eq!(out.shape(), &[1]);
            assert_eq!(Self::values(&out), [7.0]);
        }
    }

    pub fn test_batch_sum() {
        for w in Self::widths() {
            let k = Self::kernel(TestFunction::Sum, w);
            let mut eval = k.evaluator();
            let x = Self::array2(2, 2, |i, j| [[1.0, 2.0], [10.0, 20.0]][i][j]);
            let out = eval.eval(Args::new(x.view())).unwrap().into_array();
            assert_eq!(out.shape(), &[1, 2]);
            assert_eq!(Self::values(&out), [11.0, 22.0]);
        }
    }

    pub fn test_remainders() {
        for w in Self::widths() {
            let k = Self::kernel(TestFunction::Affine, w);
            let mut eval = k.evaluator();
            for n in 0..=(2 * w as usize + 1) {
                let (x, p, t) = Self::affine_args(n);
                let out = eval
                    .eval(
                        Args::new(x.view())
                            .pars(p.view())
                            .time(Time::Array(t.view().into())),
                    )
                    .unwrap()
                    .into_array();
                assert_eq!(out.shape(), &[2, n]);
                assert_eq!(
                    Self::values(&out),
                    Self::affine_expected(n),
                    "n = {n}"
                );

                // Evaluating one point at a time gives the same results
                for j in 0..n {
                    let xj = x.column(j).to_owned();
                    let pj = p.column(j).to_owned();
                    let out_j = eval
                        .eval(
                            Args::new(xj.view())
                                .pars(pj.view())
                                .time(Time::Scalar(t[j].clone())),
                        )
                        .unwrap()
                        .into_array();
                    assert_eq!(
                        Self::values(&out_j),
                        [out[[0, j]].as_f64(), out[[1, j]].as_f64()]
                    );
                }

                // So does splitting the batch into two calls
                for split in 0..=n {
                    let mut joined = Array2::from_elem((2, n), Self::v(0.0));
                    for (lo, hi) in [(0, split), (split, n)] {
                        eval.eval(
                            Args::new(x.slice(s![.., lo..hi]))
                                .outputs(joined.slice_mut(s![.., lo..hi]))
                                .pars(p.slice(s![.., lo..hi]))
                                .time(Time::Array(t.slice(s![lo..hi]).into())),
                        )
                        .unwrap();
                    }
                    assert_eq!(
                        Self::values(&joined.into_dyn()),
                        Self::values(&out)
                    );
                }
            }
        }
    }

    pub fn test_paths_agree() {
        for w in Self::widths() {
            let k = Self::kernel(TestFunction::Affine, w);
            let mut eval = k.evaluator();
            let n = 2 * w as usize + 1;
            let (x, p, t) = Self::affine_args(n);
            let dense = eval
                .eval(
                    Args::new(x.view())
                        .pars(p.view())
                        .time(Time::Array(t.view().into())),
                )
                .unwrap()
                .into_array();

            // Interleave the same values with padding, so that every buffer
            // is strided and the buffered path is taken
            let pad = |a: &Array2<T>| {
                let mut out = Array2::from_elem(
                    (a.nrows(), 2 * a.ncols()),
                    Self::v(-1.0),
                );
                out.slice_mut(s![.., ..;2]).assign(a);
                out
            };
            let (xp, pp) = (pad(&x), pad(&p));
            let mut tp = Array1::from_elem(2 * n, Self::v(-1.0));
            tp.slice_mut(s![..;2]).assign(&t);
            let mut outp = Array2::from_elem((2, 2 * n), Self::v(-1.0));
            eval.eval(
                Args::new(xp.slice(s![.., ..;2]))
                    .outputs(outp.slice_mut(s![.., ..;2]))
                    .pars(pp.slice(s![.., ..;2]))
                    .time(Time::Array(tp.slice(s![..;2]).into())),
            )
            .unwrap();
            assert_eq!(
                Self::values(&outp.slice(s![.., ..;2]).to_owned().into_dyn()),
                Self::values(&dense)
            );
            // Padding is left alone
            assert!(
                outp.slice(s![.., 1..;2]).iter().all(|v| v.as_f64() == -1.0)
            );

            // Same thing for single evaluation
            let x1 = Self::array1(&[2.0, 3.0]);
            let x1p = Self::array1(&[2.0, -1.0, 3.0]);
            let p1 = Self::array1(&[0.5]);
            let args = |x| {
                Args::new(x)
                    .pars(p1.view())
                    .time(Time::Scalar(Self::v(0.25)))
            };
            let a = eval.eval(args(x1.view())).unwrap().into_array();
            let b = eval.eval(args(x1p.slice(s![..;2]))).unwrap().into_array();
            assert_eq!(Self::values(&a), [1.25, 5.0]);
            assert_eq!(Self::values(&a), Self::values(&b));
        }
    }

    pub fn test_idempotent() {
        for w in Self::widths() {
            let k = Self::kernel(TestFunction::Affine, w);
            let mut eval = k.evaluator();
            let (x, p, t) = Self::affine_args(7);
            let mut run = || {
                eval.eval(
                    Args::new(x.view())
                        .pars(p.view())
                        .time(Time::Array(t.view().into())),
                )
                .unwrap()
                .into_array()
            };
            let a = run();
            let b = run();
            assert_eq!(Self::values(&a), Self::values(&b));
        }
    }

    pub fn test_provided_outputs() {
        let k = Self::kernel(TestFunction::Sum, 1);
        let mut eval = k.evaluator();
        let x = Self::array2(2, 3, |i, j| (i * 3 + j) as f64);
        let mut out = Array2::from_elem((1, 3), Self::v(99.0));
        let r = eval
            .eval(Args::new(x.view()).outputs(out.view_mut()))
            .unwrap();
        assert!(matches!(r, Outputs::Provided(..)));
        assert_eq!(Self::values(&r.to_array()), [3.0, 5.0, 7.0]);
        drop(r);
        assert_eq!(Self::values(&out.into_dyn()), [3.0, 5.0, 7.0]);
    }

    pub fn test_no_inputs() {
        for w in Self::widths() {
            let k = Self::kernel(TestFunction::Constant, w);
            let mut eval = k.evaluator();
            let n = w as usize + 1;
            let x = Array2::<T>::from_elem((0, n), Self::v(0.0));
            let p = Self::array2(1, n, |_, j| j as f64 * 2.0);
            let out = eval
                .eval(Args::new(x.view()).pars(p.view()))
                .unwrap()
                .into_array();
            assert_eq!(Self::values(&out), Self::values(&p.into_dyn()));

            let x = Self::array1(&[]);
            let p = Self::array1(&[3.5]);
            let out = eval
                .eval(Args::new(x.view()).pars(p.view()))
                .unwrap()
                .into_array();
            assert_eq!(Self::values(&out), [3.5]);
        }
    }

    pub fn test_in_place() {
        for w in Self::widths() {
            let k = Self::kernel(TestFunction::Affine, w);
            let mut eval = k.evaluator();
            let n = 2 * w as usize + 1;
            let (mut x, p, t) = Self::affine_args(n);

            let shape = [2, n];
            let strides = [n as isize, 1];
            let ptr = x.as_mut_ptr();
            // SAFETY: `x` is a live, standard-layout array of this shape, and
            // is not otherwise touched until both buffers are dropped.
            let (i, o) = unsafe {
                (
                    Buffer::from_raw_parts(ptr, &shape, &strides, false),
                    Buffer::from_raw_parts(ptr, &shape, &strides, true),
                )
            };
            eval.eval(
                Args::new(i)
                    .outputs(o)
                    .pars(p.view())
                    .time(Time::Array(t.view().into())),
            )
            .unwrap();
            assert_eq!(Self::values(&x.into_dyn()), Self::affine_expected(n));
        }
    }

    pub fn test_shifted_outputs() {
        for w in Self::widths() {
            let k = Self::kernel(TestFunction::Affine, w);
            let mut eval = k.evaluator();
            let n = 2 * w as usize + 1;
            let (x, p, t) = Self::affine_args(n);

            // Outputs start one element after the inputs, so every block
            // writes over values that later blocks read
            let mut mem: Array1<T> =
                x.iter().cloned().chain([Self::v(0.0)]).collect();
            let ptr = mem.as_mut_ptr();
            let strides = [n as isize, 1];
            // SAFETY: both buffers lie within `mem`, which is not otherwise
            // touched until they are dropped.
            let (i, o) = unsafe {
                (
                    Buffer::from_raw_parts(ptr, &[2, n], &strides, false),
                    Buffer::from_raw_parts(ptr.add(1), &[2, n], &strides, true),
                )
            };
            eval.eval(
                Args::new(i)
                    .outputs(o)
                    .pars(p.view())
                    .time(Time::Array(t.view().into())),
            )
            .unwrap();
            let shifted = mem.slice(s![1..]).to_owned().into_dyn();
            assert_eq!(Self::values(&shifted), Self::affine_expected(n));
        }

        let k = Self::kernel(TestFunction::Affine, 1);
        let mut eval = k.evaluator();
        let mut mem = Self::array1(&[2.0, 3.0, 0.0]);
        let p = Self::array1(&[0.5]);
        let ptr = mem.as_mut_ptr();
        // SAFETY: as above
        let (i, o) = unsafe {
            (
                Buffer::from_raw_parts(ptr, &[2], &[1], false),
                Buffer::from_raw_parts(ptr.add(1), &[2], &[1], true),
            )
        };
        eval.eval(
            Args::new(i)
                .outputs(o)
                .pars(p.view())
                .time(Time::Scalar(Self::v(0.25))),
        )
        .unwrap();
        assert_eq!(Self::values(&mem.into_dyn()), [2.0, 1.25, 5.0]);
    }

    pub fn test_unused_arguments() {
        for w in Self::widths() {
            let k = Self::kernel(TestFunction::Sum, w);
            let mut eval = k.evaluator();
            let n = 2 * w as usize + 1;
            let x = Self::array2(2, n, |i, j| (i * n + j) as f64);
            let p = Array2::from_elem((0, n), Self::v(0.0));
            let t = Self::array1(&vec![1.0; n]);
            let expected: Vec<f64> =
                (0..n).map(|j| (2 * j + n) as f64).collect();

            // Parameters and time are accepted, but never handed to kernels
            let xt = x.t().to_owned();
            for x in [x.view(), xt.t()] {
                let out = eval
                    .eval(
                        Args::new(x)
                            .pars(p.view())
                            .time(Time::Array(t.view().into())),
                    )
                    .unwrap()
                    .into_array();
                assert_eq!(Self::values(&out), expected);
            }

            let x = Self::array1(&[3.0, 4.0]);
            let p = Self::array1(&[]);
            let out = eval
                .eval(
                    Args::new(x.view())
                        .pars(p.view())
                        .time(Time::Scalar(Self::v(1.0))),
                )
                .unwrap()
                .into_array();
            assert_eq!(Self::values(&out), [7.0]);
        }
    }

    pub fn test_missing_arguments() {
        let k = Self::kernel(TestFunction::Affine, 1);
        let mut eval = k.evaluator();
        let x = Self::array1(&[1.0, 2.0]);
        let p = Self::array1(&[1.0]);
        assert_eq!(
            eval.eval(Args::new(x.view())).err(),
            Some(Error::MissingParameters(1))
        );
        assert_eq!(
            eval.eval(Args::new(x.view()).pars(p.view())).err(),
            Some(Error::MissingTime)
        );
    }

    pub fn test_shape_errors() {
        let k = Self::kernel(TestFunction::Affine, 1);
        let mut eval = k.evaluator();
        let t = || Time::Scalar(Self::v(0.0));

        let x = Self::array1(&[1.0, 2.0, 3.0]);
        let p = Self::array1(&[1.0]);
        assert_eq!(
            eval.eval(Args::new(x.view()).pars(p.view()).time(t())).err(),
            Some(Error::SizeMismatch {
                role: Role::Inputs,
                actual: 3,
                expected: 2
            })
        );

        let x = Array3::from_elem((2, 1, 1), Self::v(0.0));
        assert_eq!(
            eval.eval(Args::new(x.view()).pars(p.view()).time(t())).err(),
            Some(Error::InvalidDimensionality {
                role: Role::Inputs,
                actual: 3,
                expected: Dims::OneOrTwo
            })
        );

        let x = Self::array1(&[1.0, 2.0]);
        let p2 = Self::array1(&[1.0, 2.0]);
        assert_eq!(
            eval.eval(Args::new(x.view()).pars(p2.view()).time(t())).err(),
            Some(Error::SizeMismatch {
                role: Role::Parameters,
                actual: 2,
                expected: 1
            })
        );

        let p2 = Self::array2(1, 1, |_, _| 1.0);
        assert_eq!(
            eval.eval(Args::new(x.view()).pars(p2.view()).time(t())).err(),
            Some(Error::InvalidDimensionality {
                role: Role::Parameters,
                actual: 2,
                expected: Dims::Exactly(1)
            })
        );

        let tv = Self::array1(&[0.0]);
        assert_eq!(
            eval.eval(
                Args::new(x.view())
                    .pars(p.view())
                    .time(Time::Array(tv.view().into()))
            )
            .err(),
            Some(Error::ScalarTimeExpected)
        );
    }

    pub fn test_batch_errors() {
        let k = Self::kernel(TestFunction::Affine, 1);
        let mut eval = k.evaluator();
        let (x, p, t) = Self::affine_args(4);
        let (_, p5, t5) = Self::affine_args(5);

        assert_eq!(
            eval.eval(
                Args::new(x.view())
                    .pars(p5.view())
                    .time(Time::Array(t.view().into()))
            )
            .err(),
            Some(Error::BatchSizeMismatch {
                role: Role::Parameters,
                actual: 5,
                expected: 4
            })
        );
        assert_eq!(
            eval.eval(
                Args::new(x.view())
                    .pars(p.view())
                    .time(Time::Array(t5.view().into()))
            )
            .err(),
            Some(Error::BatchSizeMismatch {
                role: Role::Time,
                actual: 5,
                expected: 4
            })
        );
        assert_eq!(
            eval.eval(
                Args::new(x.view())
                    .pars(p.view())
                    .time(Time::Scalar(Self::v(0.0)))
            )
            .err(),
            Some(Error::TimeArrayExpected)
        );
    }

    pub fn test_bad_outputs_untouched() {
        let k = Self::kernel(TestFunction::Sum, 1);
        let mut eval = k.evaluator();
        let x = Self::array2(2, 3, |i, j| (i + j) as f64);

        let mut out = Array2::from_elem((2, 3), Self::v(42.0));
        assert_eq!(
            eval.eval(Args::new(x.view()).outputs(out.view_mut())).err(),
            Some(Error::SizeMismatch {
                role: Role::Outputs,
                actual: 2,
                expected: 1
            })
        );
        assert!(out.iter().all(|v| v.as_f64() == 42.0));

        let mut out = Array2::from_elem((1, 4), Self::v(42.0));
        assert_eq!(
            eval.eval(Args::new(x.view()).outputs(out.view_mut())).err(),
            Some(Error::BatchSizeMismatch {
                role: Role::Outputs,
                actual: 4,
                expected: 3
            })
        );
        assert!(out.iter().all(|v| v.as_f64() == 42.0));

        let out = Array2::from_elem((1, 3), Self::v(42.0));
        assert_eq!(
            eval.eval(Args::new(x.view()).outputs(out.view())).err(),
            Some(Error::NonWritableOutput)
        );
    }
}

#[macro_export]
macro_rules! dispatch_test {
    ($i:ident, $t:ty, $b:ty) => {
        #[test]
        fn $i() {
            $crate::eval::test::TestDispatch::<$t, $b>::$i()
        }
    };
}

#[macro_export]
macro_rules! dispatch_tests {
    ($t:ty, $b:ty) => {
        $crate::dispatch_test!(test_single_sum, $t, $b);
        $crate::dispatch_test!(test_batch_sum, $t, $b);
        $crate::dispatch_test!(test_remainders, $t, $b);
        $crate::dispatch_test!(test_paths_agree, $t, $b);
        $crate::dispatch_test!(test_idempotent, $t, $b);
        $crate::dispatch_test!(test_provided_outputs, $t, $b);
        $crate::dispatch_test!(test_no_inputs, $t, $b);
        $crate::dispatch_test!(test_in_place, $t, $b);
        $crate::dispatch_test!(test_shifted_outputs, $t, $b);
        $crate::dispatch_test!(test_unused_arguments, $t, $b);
        $crate::dispatch_test!(test_missing_arguments, $t, $b);
        $crate::dispatch_test!(test_shape_errors, $t, $b);
        $crate::dispatch_test!(test_batch_errors, $t, $b);
        $crate::dispatch_test!(test_bad_outputs_untouched, $t, $b);
    };
}

#[cfg(test)]
mod f64_dispatch {
    crate::dispatch_tests!(f64, crate::eval::test::RefBackend);
}

#[cfg(test)]
mod f32_dispatch {
    crate::dispatch_tests!(f32, crate::eval::test::RefBackend);
}

#[cfg(all(test, feature = "real"))]
mod real_dispatch {
    crate::dispatch_tests!(crate::Real, crate::eval::test::RefBackend);
}
