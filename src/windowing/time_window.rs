//! Pivot-centered time-window index lookup
//!
//! Used by the time-aware training variant: around a pivot position, find
//! the span of neighbouring positions whose time delta from the pivot
//! stays within a configured window.

/// Index span around `pivot` whose dates lie within `time_window / 2`
///
/// The search is first restricted to a position window of radius
/// `max_seq_len / 2` around the pivot, then to the subset whose absolute
/// date delta from `dates[pivot]` is at most `time_window / 2`. Returns
/// `(min_index, max_index)` over that subset, or `None` when it is empty.
/// Callers must treat `min_index >= max_index` as "skip": a single-element
/// span selects nothing.
#[must_use]
pub fn indexes_by_time_window(
    dates: &[i32],
    pivot: usize,
    max_seq_len: usize,
    time_window: i32,
) -> Option<(usize, usize)> {
    if pivot >= dates.len() {
        return None;
    }
    let half_len = max_seq_len / 2;
    let half_time = time_window / 2;
    let lower = pivot.saturating_sub(half_len);
    let upper = (pivot + half_len).min(dates.len());

    let qualifying = (lower..upper).filter(|&i| (dates[i] - dates[pivot]).abs() <= half_time);
    let (mut min_index, mut max_index) = (None, None);
    for i in qualifying {
        if min_index.is_none() {
            min_index = Some(i);
        }
        max_index = Some(i);
    }
    Some((min_index?, max_index?))
}
