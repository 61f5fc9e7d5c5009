//! Artificial gap-token vocabulary
//!
//! Gap tokens encode the day-delta between adjacent visits (or events
//! inside an inpatient stay) at a coarse granularity: `D7`, `W1`, `M2`,
//! `Q1`, `Y1`, or the long-term token `LT`. The inverse parse is used by
//! the boundary-respecting re-anchor to replay a sequence's clock.

use crate::config::TimeTokenScheme;

/// Token emitted for gaps beyond the mixed scheme's threshold
pub const LONG_TERM_TOKEN: &str = "LT";

/// Day-delta attributed to the long-term token when replaying a sequence
pub const LONG_TERM_DAYS: i64 = 3 * 365;

/// Mixed scheme switches to the long-term token at this many days
pub const LONG_TERM_THRESHOLD_DAYS: i64 = 1080;

impl TimeTokenScheme {
    /// Bucket a day-delta into a gap token
    #[must_use]
    pub fn gap_token(self, days: i64) -> String {
        match self {
            Self::Day => format!("D{days}"),
            Self::Week => format!("W{}", days / 7),
            Self::Month => format!("M{}", days / 30),
            Self::Quarter => format!("Q{}", days / 90),
            Self::Year => format!("Y{}", days / 365),
            Self::Mixed => {
                if days < LONG_TERM_THRESHOLD_DAYS {
                    format!("W{}", days / 7)
                } else {
                    LONG_TERM_TOKEN.to_string()
                }
            }
        }
    }

    /// Bucket a sub-day inpatient gap into an `i-`-prefixed token
    #[must_use]
    pub fn inpatient_gap_token(self, days: i64) -> String {
        format!("i-{}", self.gap_token(days))
    }
}

fn parse_unit_delta(token: &str) -> Option<i64> {
    let (unit, digits) = token.split_at(1);
    let n: i64 = digits.parse().ok()?;
    let scale = match unit {
        "D" => 1,
        "W" => 7,
        "M" => 30,
        "Q" => 90,
        "Y" => 365,
        _ => return None,
    };
    Some(n * scale)
}

/// Day-delta encoded by a gap token, or `None` for non-gap tokens
///
/// Accepts every form the bucketing functions emit (`D7`, `W1`, `M2`,
/// `Q1`, `Y1`, `LT`), the inpatient `i-` prefix, and the compound
/// `VS-D7-VE` form some upstream schemes produce.
#[must_use]
pub fn parse_day_delta(token: &str) -> Option<i64> {
    if token == LONG_TERM_TOKEN {
        return Some(LONG_TERM_DAYS);
    }
    if let Some(inner) = token.strip_prefix("i-") {
        return parse_day_delta(inner);
    }
    if let Some(inner) = token.strip_prefix("VS-") {
        return parse_day_delta(inner.strip_suffix("-VE").unwrap_or(inner));
    }
    if token.len() < 2 || !token.is_ascii() {
        return None;
    }
    parse_unit_delta(token)
}
