//! Safety gate for the zero-copy execution path
use crate::buffer::Buffer;

/// Checks whether kernels may read and write the given buffers directly
///
/// This requires every buffer to be densely packed in row-major order, and
/// no two buffers to touch overlapping memory.  The overlap test works on
/// address ranges, so it may reject buffers which interleave without sharing
/// elements; that only costs a trip through the buffered path.
pub(crate) fn zero_copy_ok<T>(bufs: &[&Buffer<'_, T>]) -> bool {
    if !bufs.iter().all(|b| b.is_c_contiguous()) {
        return false;
    }
    !bufs
        .iter()
        .enumerate()
        .any(|(i, a)| overlaps(a, &bufs[i + 1..]))
}

/// Checks whether `buf` shares any address range with one of `others`
///
/// Empty buffers never overlap anything.
pub(crate) fn overlaps<T>(
    buf: &Buffer<'_, T>,
    others: &[&Buffer<'_, T>],
) -> bool {
    let Some(a) = buf.memory_bounds() else {
        return false;
    };
    others
        .iter()
        .filter_map(|b| b.memory_bounds())
        .any(|b| a.start < b.end && b.start < a.end)
}
