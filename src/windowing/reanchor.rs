//! Boundary-respecting random re-anchor
//!
//! Selects a window from a long raw concept sequence by replaying its
//! clock: the walk starts from the demographic header's year, advances a
//! simulated date across gap tokens, and records every visit-start marker
//! as a candidate anchor. One candidate is drawn at random and the window
//! is closed at the nearest visit-end marker, so the selection never
//! splits a visit across the window edge.

use crate::error::{Result, TimelineError};
use crate::models::record::{VISIT_END_TOKEN, VISIT_START_TOKEN};
use crate::tokenize::time_tokens::parse_day_delta;
use chrono::{Datelike, Duration, NaiveDate};
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;

/// Window selected by the re-anchor, with a re-dated demographic header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReanchorWindow {
    /// Start offset, landing on a visit-start marker
    pub start: usize,
    /// End offset (exclusive); the position before it is a visit-end marker
    pub end: usize,
    /// Synthesized 4-token header: re-dated year and age, original gender
    /// and race
    pub demographics: Vec<String>,
}

impl ReanchorWindow {
    /// Whether the window is the skip sentinel
    #[must_use]
    pub fn is_degenerate(&self) -> bool {
        self.start >= self.end
    }

    fn degenerate() -> Self {
        Self {
            start: 0,
            end: 0,
            demographics: Vec::new(),
        }
    }
}

fn parse_header(concept_ids: &[String]) -> Result<(i32, i32)> {
    let parse = |token: &String, prefix: &str| -> Result<i32> {
        token
            .strip_prefix(prefix)
            .and_then(|v| v.parse().ok())
            .ok_or_else(|| {
                TimelineError::Parse(format!("expected a {prefix}-prefixed token, found {token}"))
            })
    };
    Ok((
        parse(&concept_ids[0], "year:")?,
        parse(&concept_ids[1], "age:")?,
    ))
}

/// Pick a visit-boundary-respecting window from a raw concept sequence
///
/// The sequence must start with the 4-token demographic header the mapper
/// emits under demographic prompting. Four slots of `max_window` are
/// reserved for the synthesized replacement header, so the returned span
/// never exceeds `max_window - 4` positions. Any parse failure, an empty
/// candidate set, or a window without a visit-end marker yields the
/// degenerate sentinel; callers skip the record when `is_degenerate()`.
pub fn random_reanchor(
    concept_ids: &[String],
    max_window: usize,
    rng: &mut StdRng,
) -> ReanchorWindow {
    let seq_len = concept_ids.len();
    if seq_len <= 4 || max_window < 5 {
        return ReanchorWindow::degenerate();
    }
    let (start_year, start_age) = match parse_header(concept_ids) {
        Ok(header) => header,
        Err(err) => {
            log::debug!("re-anchor falls back to the skip sentinel: {err}");
            return ReanchorWindow::degenerate();
        }
    };
    let Some(mut cursor) = NaiveDate::from_ymd_opt(start_year, 1, 1) else {
        log::debug!("re-anchor header year {start_year} is out of range");
        return ReanchorWindow::degenerate();
    };
    let birth_year = start_year - start_age;

    // candidate anchors carry the year the simulated clock had reached
    let scan_end = 5.max(seq_len.saturating_sub(max_window));
    let mut candidates = Vec::new();
    for (i, token) in concept_ids.iter().enumerate().take(scan_end).skip(4) {
        if token == VISIT_START_TOKEN {
            candidates.push((i, cursor.year()));
        } else if let Some(days) = parse_day_delta(token) {
            if let Some(advanced) = cursor.checked_add_signed(Duration::days(days)) {
                cursor = advanced;
            }
        }
    }
    let Some(&(start, anchor_year)) = candidates.choose(rng) else {
        return ReanchorWindow::degenerate();
    };

    let demographics = vec![
        format!("year:{anchor_year}"),
        format!("age:{}", anchor_year - birth_year),
        concept_ids[2].clone(),
        concept_ids[3].clone(),
    ];

    let scan_upper = (start + max_window - 4).min(seq_len);
    for i in (start..scan_upper).rev() {
        if concept_ids[i] == VISIT_END_TOKEN {
            return ReanchorWindow {
                start,
                end: i + 1,
                demographics,
            };
        }
    }
    ReanchorWindow::degenerate()
}
