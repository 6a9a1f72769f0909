//! Normalized views of external numeric arrays
//!
//! A [`Buffer`] is the evaluator's view of a caller-supplied array: a raw
//! `ndarray` view plus a writability flag.  It is deliberately lower-level
//! than an `ArrayView`, because binding layers may hand us arrays which are
//! read-only or which alias each other; the evaluator has to detect both
//! cases rather than rely on the borrow checker.
use ndarray::{
    ArrayD, ArrayView, ArrayView1, ArrayViewD, ArrayViewMut, ArrayViewMutD,
    Axis, Dimension, IxDyn, RawArrayViewMut, ShapeBuilder,
};

/// Identifies the role of a buffer in an evaluation call
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, strum::Display)]
pub enum Role {
    /// Input variables
    #[strum(serialize = "inputs")]
    Inputs,
    /// Kernel outputs
    #[strum(serialize = "outputs")]
    Outputs,
    /// Runtime parameters
    #[strum(serialize = "parameter values")]
    Parameters,
    /// Time value(s)
    #[strum(serialize = "time values")]
    Time,
}

/// Raw view of a multi-dimensional array of `T`
///
/// The lifetime `'a` ties the view to the memory it was built from.
pub struct Buffer<'a, T> {
    raw: RawArrayViewMut<T, IxDyn>,
    writable: bool,
    _p: std::marker::PhantomData<&'a T>,
}
static_assertions::assert_not_impl_any!(Buffer<'static, f64>: Send, Sync);

impl<T> std::fmt::Debug for Buffer<'_, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Buffer")
            .field("shape", &self.shape())
            .field("strides", &self.strides())
            .field("writable", &self.writable)
            .finish()
    }
}

impl<'a, T, D: Dimension> From<ArrayView<'a, T, D>> for Buffer<'a, T> {
    fn from(v: ArrayView<'a, T, D>) -> Self {
        let v = v.into_dyn();
        // SAFETY: the view guarantees every element is valid for `'a`, and a
        // read-only buffer is never written through
        unsafe {
            Self::from_raw_parts(
                v.as_ptr() as *mut T,
                v.shape(),
                v.strides(),
                false,
            )
        }
    }
}

impl<'a, T, D: Dimension> From<ArrayViewMut<'a, T, D>> for Buffer<'a, T> {
    fn from(v: ArrayViewMut<'a, T, D>) -> Self {
        let mut v = v.into_dyn();
        Self {
            raw: v.raw_view_mut(),
            writable: true,
            _p: std::marker::PhantomData,
        }
    }
}

impl<'a, T> Buffer<'a, T> {
    /// Builds a read-only, one-element buffer referring to a single value
    pub fn from_ref(v: &'a T) -> Self {
        Self::from(ArrayView1::from(std::slice::from_ref(v)))
    }

    /// Builds a buffer from raw parts
    ///
    /// This is intended for binding layers which receive arrays from a foreign
    /// runtime.  Unlike views built from `ndarray` types, such buffers may
    /// overlap each other; the evaluator checks for this before reading or
    /// writing them directly.
    ///
    /// `ptr` is the address of the first logical element; strides are in
    /// elements and may be negative.
    ///
    /// # Safety
    /// For every index within `shape`, `ptr` offset by the dot product of the
    /// index with `strides` must point to an initialized, aligned `T` which
    /// remains valid for `'a`.  If `writable` is true, those elements must
    /// also be valid for writes for `'a`, and must not be read or written
    /// through other references while the buffer is in use (other `Buffer`s
    /// excepted).
    ///
    /// # Panics
    /// If `shape` and `strides` have different lengths
    pub unsafe fn from_raw_parts(
        ptr: *mut T,
        shape: &[usize],
        strides: &[isize],
        writable: bool,
    ) -> Self {
        assert_eq!(shape.len(), strides.len());

        // ndarray takes the lowest address and non-negative strides, so
        // build the view that way and flip the reversed axes afterwards
        let mut low = ptr;
        if shape.iter().all(|&n| n > 0) {
            for (&n, &s) in shape.iter().zip(strides) {
                if s < 0 {
                    low = low.wrapping_offset((n as isize - 1) * s);
                }
            }
        }
        let abs: Vec<usize> =
            strides.iter().map(|s| s.unsigned_abs()).collect();
        let dim = IxDyn(shape).strides(IxDyn(&abs));
        let mut raw = unsafe { RawArrayViewMut::from_shape_ptr(dim, low) };
        for (axis, &s) in strides.iter().enumerate() {
            if s < 0 {
                raw.invert_axis(Axis(axis));
            }
        }
        Self {
            raw,
            writable,
            _p: std::marker::PhantomData,
        }
    }

    /// Number of dimensions
    pub fn ndim(&self) -> usize {
        self.raw.ndim()
    }

    /// Shape of the buffer
    pub fn shape(&self) -> &[usize] {
        self.raw.shape()
    }

    /// Strides of the buffer, in elements
    pub fn strides(&self) -> &[isize] {
        self.raw.strides()
    }

    /// Size along the given axis
    ///
    /// # Panics
    /// If `axis >= self.ndim()`
    pub fn dim(&self, axis: usize) -> usize {
        self.raw.len_of(Axis(axis))
    }

    /// Total number of elements
    pub fn len(&self) -> usize {
        self.raw.len()
    }

    /// Checks whether the buffer has no elements
    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    /// Checks whether the buffer may be written to
    pub fn is_writable(&self) -> bool {
        self.writable
    }

    /// Returns the base pointer (the address of the first logical element)
    pub fn as_ptr(&self) -> *const T {
        self.raw.as_ptr()
    }

    /// Returns the base pointer for writing
    ///
    /// Writing through this pointer is only valid if the buffer is writable.
    pub(crate) fn as_mut_ptr(&mut self) -> *mut T {
        self.raw.as_ptr() as *mut T
    }

    /// Checks whether the buffer is densely packed in row-major order and
    /// suitably aligned for `T`
    ///
    /// Strides of axes with size 1 don't affect the layout and are ignored; an
    /// empty buffer is always contiguous.
    pub fn is_c_contiguous(&self) -> bool {
        self.is_empty()
            || (self.as_ptr().is_aligned() && self.raw.is_standard_layout())
    }

    /// Returns the half-open range of addresses touched by this buffer
    ///
    /// Returns `None` if the buffer is empty.
    pub fn memory_bounds(&self) -> Option<std::ops::Range<usize>> {
        if self.is_empty() {
            return None;
        }
        let (mut lo, mut hi) = (0isize, 0isize);
        for (&n, &s) in self.shape().iter().zip(self.strides()) {
            let span = (n as isize - 1) * s;
            if span < 0 {
                lo += span;
            } else {
                hi += span;
            }
        }
        let size = std::mem::size_of::<T>() as isize;
        let base = self.as_ptr() as isize;
        Some((base + lo * size) as usize..(base + (hi + 1) * size) as usize)
    }

    /// Returns a pointer to the element at `(i,)` in a 1D buffer
    ///
    /// # Safety
    /// The buffer must be 1D and `i` must be in bounds
    #[inline(always)]
    pub(crate) unsafe fn at1(&self, i: usize) -> *mut T {
        let s = self.strides();
        unsafe { self.raw.as_ptr().offset(i as isize * s[0]) as *mut T }
    }

    /// Returns a pointer to the element at `(i, j)` in a 2D buffer
    ///
    /// # Safety
    /// The buffer must be 2D and `(i, j)` must be in bounds
    #[inline(always)]
    pub(crate) unsafe fn at2(&self, i: usize, j: usize) -> *mut T {
        let s = self.strides();
        let o = i as isize * s[0] + j as isize * s[1];
        unsafe { self.raw.as_ptr().offset(o) as *mut T }
    }

    /// Borrows the buffer as an `ndarray` view
    pub fn view(&self) -> ArrayViewD<'_, T> {
        // SAFETY: every element is valid for reads for `'a`, per construction
        unsafe { self.raw.clone().deref_into_view() }
    }

    /// Iterates over elements in logical row-major order
    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        self.view().into_iter()
    }

    /// Borrows the buffer as a mutable `ndarray` view
    ///
    /// # Panics
    /// If the buffer is not writable
    pub(crate) fn view_mut(&mut self) -> ArrayViewMutD<'_, T> {
        assert!(self.writable);
        // SAFETY: writable buffers are valid for writes, per construction
        unsafe { self.raw.clone().deref_into_view_mut() }
    }

    /// Applies a function to each element in place
    ///
    /// # Panics
    /// If the buffer is not writable
    pub(crate) fn for_each_mut<F: FnMut(&mut T)>(&mut self, f: F) {
        self.view_mut().map_inplace(f)
    }

    /// Applies a function to each element, building a fresh array of the
    /// same shape
    pub fn map<U, F: FnMut(&T) -> U>(&self, f: F) -> ArrayD<U> {
        self.view().map(f)
    }

    /// Fallible version of [`Buffer::map`]
    pub fn try_map<U, E, F: FnMut(&T) -> Result<U, E>>(
        &self,
        f: F,
    ) -> Result<ArrayD<U>, E> {
        let data = self.iter().map(f).collect::<Result<Vec<U>, E>>()?;
        Ok(ArrayD::from_shape_vec(self.raw.raw_dim(), data)
            .expect("element count matches shape"))
    }

    /// Copies the buffer into an owned array
    pub fn to_array(&self) -> ArrayD<T>
    where
        T: Clone,
    {
        self.view().to_owned()
    }

    /// Builds a new descriptor for the same memory, borrowing from `self`
    pub fn reborrow(&mut self) -> Buffer<'_, T> {
        Buffer {
            raw: self.raw.clone(),
            writable: self.writable,
            _p: std::marker::PhantomData,
        }
    }

    /// Builds a read-only descriptor for the same memory
    fn read_only(&self) -> Buffer<'_, T> {
        Buffer {
            raw: self.raw.clone(),
            writable: false,
            _p: std::marker::PhantomData,
        }
    }
}

/// A buffer which is either borrowed from the caller or owned
///
/// Owned operands are produced when an array has to be converted to the
/// kernel's element type.
#[derive(Debug)]
pub enum Operand<'a, T> {
    /// Caller's buffer, used in place
    Borrowed(Buffer<'a, T>),
    /// Freshly allocated array
    Owned(ArrayD<T>),
}

impl<T> Operand<'_, T> {
    /// Returns a read-only buffer for this operand
    pub fn buffer(&self) -> Buffer<'_, T> {
        match self {
            Operand::Borrowed(b) => b.read_only(),
            Operand::Owned(a) => Buffer::from(a.view()),
        }
    }
}

/// Time argument for an evaluation
pub enum Time<'a, T> {
    /// Single time value, for single evaluation
    Scalar(T),
    /// One time value per point, for batch evaluation
    Array(Buffer<'a, T>),
}

impl<T> Time<'_, T> {
    /// Returns a one-dimensional buffer view of the time value(s)
    ///
    /// A scalar is presented as a buffer with a single element.
    pub fn buffer(&self) -> Buffer<'_, T> {
        match self {
            Time::Scalar(v) => Buffer::from_ref(v),
            Time::Array(b) => b.read_only(),
        }
    }

    /// Checks whether this is a scalar time value
    pub fn is_scalar(&self) -> bool {
        matches!(self, Time::Scalar(..))
    }
}
