//! Working-precision checks for arbitrary-precision elements
//!
//! Caller-supplied inputs are checked (never silently rounded); output slots
//! are normalized in place, since their prior contents are overwritten anyway.
use crate::{Error, buffer::{Buffer, Role}, element::Element};

/// Checks that every value in `buf` is at the working precision
///
/// On failure, the error reports the logical row-major index of the first
/// offending value.
pub(crate) fn check<T: Element>(
    buf: &Buffer<'_, T>,
    role: Role,
    prec: u32,
) -> Result<(), Error> {
    if !T::HAS_PRECISION {
        return Ok(());
    }
    match buf.iter().position(|v| !v.has_precision(prec)) {
        None => Ok(()),
        Some(index) => {
            let actual = buf.iter().nth(index).map_or(0, Element::precision);
            Err(Error::PrecisionMismatch {
                role,
                index,
                actual,
                expected: prec,
            })
        }
    }
}

/// Rounds every value in a writable buffer to the working precision
pub(crate) fn ensure<T: Element>(buf: &mut Buffer<'_, T>, prec: u32) {
    if T::HAS_PRECISION {
        buf.for_each_mut(|v| v.normalize(prec));
    }
}
