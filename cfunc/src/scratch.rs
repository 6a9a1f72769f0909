//! Per-evaluator scratch storage for the buffered path
use crate::{element::Element, kernel::ScratchLayout};

/// Packed buffers sized for one batch kernel invocation
///
/// For arbitrary-precision elements, every value is constructed at the
/// working precision up front, so the kernel can write results in place.
pub(crate) struct Scratch<T> {
    pub inputs: Vec<T>,
    pub outputs: Vec<T>,
    pub pars: Vec<T>,
    pub time: Vec<T>,
}

impl<T: Element> Scratch<T> {
    pub fn new(layout: &ScratchLayout, prec: u32) -> Self {
        let alloc = |n| vec![T::zero(prec); n];
        Self {
            inputs: alloc(layout.inputs),
            outputs: alloc(layout.outputs),
            pars: alloc(layout.pars),
            time: alloc(layout.time),
        }
    }
}

/// Returns a pointer to the slice data, or null if it is empty
pub(crate) fn ptr_or_null<T>(v: &[T]) -> *const T {
    if v.is_empty() {
        std::ptr::null()
    } else {
        v.as_ptr()
    }
}
