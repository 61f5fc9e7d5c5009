//! Tail and random truncation
//!
//! Both policies reserve one slot of the model's maximum length for a
//! leading classifier token, so the selected window never exceeds
//! `max_length - 1` positions.

use rand::Rng;
use rand::rngs::StdRng;

/// Keep the final `max_length - 1` tokens
///
/// Returns the `[start, end)` window; sequences that already fit are
/// returned whole. The window always ends at `seq_len`.
#[must_use]
pub fn tail_truncation(seq_len: usize, max_length: usize) -> (usize, usize) {
    let budget = max_length.saturating_sub(1);
    if seq_len > budget {
        (seq_len - budget, seq_len)
    } else {
        (0, seq_len)
    }
}

/// Keep `max_length - 1` tokens starting at a uniformly random offset
///
/// The start offset is drawn from `[0, seq_len - (max_length - 1)]`
/// inclusive; sequences that already fit are returned whole.
pub fn random_truncation(seq_len: usize, max_length: usize, rng: &mut StdRng) -> (usize, usize) {
    let budget = max_length.saturating_sub(1);
    if seq_len > budget {
        let start = rng.random_range(0..=seq_len - budget);
        (start, start + budget)
    } else {
        (0, seq_len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::rng::record_rng;

    #[test]
    fn test_tail_truncation_keeps_suffix() {
        assert_eq!(tail_truncation(100, 11), (90, 100));
        assert_eq!(tail_truncation(10, 11), (0, 10));
        assert_eq!(tail_truncation(10, 10), (1, 10));
        assert_eq!(tail_truncation(0, 10), (0, 0));
    }

    #[test]
    fn test_tail_window_length_property() {
        for (seq_len, max_length) in [(5, 512), (511, 512), (512, 512), (10_000, 512)] {
            let (start, end) = tail_truncation(seq_len, max_length);
            assert_eq!(end, seq_len);
            assert_eq!(end - start, seq_len.min(max_length - 1));
        }
    }

    #[test]
    fn test_random_truncation_bounds() {
        let mut rng = record_rng(Some(13), 1);
        for _ in 0..200 {
            let (start, end) = random_truncation(100, 11, &mut rng);
            assert_eq!(end - start, 10);
            assert!(end <= 100);
        }
    }

    #[test]
    fn test_random_truncation_short_sequence_untouched() {
        let mut rng = record_rng(Some(13), 1);
        assert_eq!(random_truncation(8, 11, &mut rng), (0, 8));
    }
}
