//! Calendar arithmetic shared by the mapper and the windowing policies.

use chrono::{Datelike, NaiveDate, NaiveDateTime};

/// The epoch date used for the week index on every token
pub const EPOCH: NaiveDate = match NaiveDate::from_ymd_opt(1970, 1, 1) {
    Some(d) => d,
    None => unreachable!(),
};

/// Age in completed years at `at` for someone born at `birth`
#[must_use]
pub fn age_in_years(birth: NaiveDateTime, at: NaiveDateTime) -> i32 {
    let mut years = at.year() - birth.year();
    if (at.month(), at.day()) < (birth.month(), birth.day()) {
        years -= 1;
    }
    years
}

/// Calendar-week index since the epoch (floor of days / 7)
#[must_use]
pub fn weeks_since_epoch(t: NaiveDateTime) -> i32 {
    let days = (t.date() - EPOCH).num_days();
    days.div_euclid(7) as i32
}

/// Whole-day delta between two timestamps, truncated toward zero
#[must_use]
pub fn day_delta(from: NaiveDateTime, to: NaiveDateTime) -> i64 {
    (to - from).num_days()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn dt(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_age_in_years() {
        let birth = dt(1980, 4, 14);
        assert_eq!(age_in_years(birth, dt(2024, 4, 14)), 44);
        assert_eq!(age_in_years(birth, dt(2024, 4, 13)), 43);
        assert_eq!(age_in_years(birth, dt(2024, 4, 21)), 44);
    }

    #[test]
    fn test_weeks_since_epoch() {
        // Reference values from the canonical mapping case
        assert_eq!(weeks_since_epoch(dt(2024, 4, 14)), 2832);
        assert_eq!(weeks_since_epoch(dt(2024, 4, 21)), 2833);
        assert_eq!(weeks_since_epoch(dt(1970, 1, 1)), 0);
    }

    #[test]
    fn test_day_delta() {
        assert_eq!(day_delta(dt(2024, 4, 14), dt(2024, 4, 21)), 7);
        assert_eq!(day_delta(dt(2024, 4, 21), dt(2024, 4, 14)), -7);
    }
}
