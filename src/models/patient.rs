//! Patient model
//!
//! A `Patient` is the reconstructed per-person timeline: demographics plus
//! visits sorted by start time, optionally annotated with a prediction
//! index time and a label for fine-tuning cohorts.

use crate::models::visit::Visit;
use chrono::NaiveDateTime;

/// Sentinel used when a demographic attribute was never observed
pub const UNKNOWN_VALUE: &str = "Unknown";

/// A patient's reconstructed timeline
#[derive(Debug, Clone)]
pub struct Patient {
    /// Person identifier
    pub person_id: i64,
    /// Birth time extracted from the birth marker event
    pub birth_time: NaiveDateTime,
    /// Gender code, `Unknown` if never observed
    pub gender: String,
    /// Race code, `Unknown` if never observed
    pub race: String,
    /// Ethnicity code, `Unknown` if never observed
    pub ethnicity: String,
    /// Visits in ascending `start_time` order
    pub visits: Vec<Visit>,
    /// Prediction cutoff for fine-tuning cohorts
    pub index_time: Option<NaiveDateTime>,
    /// Classifier label for fine-tuning cohorts
    pub label: Option<f64>,
    /// Age in completed years at `index_time`, -1 when no cutoff was given
    pub age_at_index: i32,
}

impl Patient {
    /// Create a patient with demographics and sorted visits
    #[must_use]
    pub fn new(person_id: i64, birth_time: NaiveDateTime, mut visits: Vec<Visit>) -> Self {
        visits.sort_by_key(|v| v.start_time);
        Self {
            person_id,
            birth_time,
            gender: UNKNOWN_VALUE.to_string(),
            race: UNKNOWN_VALUE.to_string(),
            ethnicity: UNKNOWN_VALUE.to_string(),
            visits,
            index_time: None,
            label: None,
            age_at_index: -1,
        }
    }
}
