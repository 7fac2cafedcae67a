#![forbid(unsafe_code)]

//! Sticky header resolution.

/// Header governing the row at `start`: the greatest header index `<= start`.
///
/// Falls back to the first header when none qualifies. Returns `None` only
/// when `header_indices` is empty. `header_indices` must be ascending.
#[must_use]
pub fn active_header(header_indices: &[usize], start: usize) -> Option<usize> {
    let qualifying = header_indices.partition_point(|&idx| idx <= start);
    match qualifying {
        0 => header_indices.first().copied(),
        n => Some(header_indices[n - 1]),
    }
}
