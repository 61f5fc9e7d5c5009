//! Visit model
//!
//! A `Visit` is a clinically coherent encounter (inpatient stay, ED visit,
//! or outpatient encounter) spanning one or more raw event blocks.

use crate::models::event::Event;
use chrono::NaiveDateTime;

/// Standard concept id for inpatient visits
pub const DEFAULT_INPATIENT_CONCEPT_ID: &str = "9201";
/// Standard concept id for emergency-department visits
pub const DEFAULT_ED_CONCEPT_ID: &str = "9203";
/// Standard concept id for outpatient visits
pub const DEFAULT_OUTPATIENT_CONCEPT_ID: &str = "9202";

/// OMOP concept ids counted as inpatient-class visits
pub const INPATIENT_VISIT_TYPES: [&str; 5] = ["9201", "262", "8971", "8920", "38004311"];

/// Source visit-type codes counted as inpatient-class visits
pub const INPATIENT_VISIT_TYPE_CODES: [&str; 5] =
    ["Visit/IP", "Visit/ERIP", "Visit/51", "Visit/61", "NUCC/315D00000X"];

/// A clinically coherent encounter on a patient timeline
#[derive(Debug, Clone)]
pub struct Visit {
    /// Visit-type concept id (e.g. `9201` for inpatient)
    pub visit_type: String,
    /// Start of the encounter
    pub start_time: NaiveDateTime,
    /// End of the encounter; never earlier than `start_time`
    pub end_time: NaiveDateTime,
    /// Discharge-facility code for inpatient visits
    pub discharge_facility: Option<String>,
    /// Events of the encounter, ordered by time
    pub events: Vec<Event>,
}

impl Visit {
    /// Whether the visit type is inpatient-class
    #[must_use]
    pub fn is_inpatient(&self) -> bool {
        is_inpatient_type(&self.visit_type)
    }
}

/// Whether a visit-type code is inpatient-class
#[must_use]
pub fn is_inpatient_type(visit_type: &str) -> bool {
    INPATIENT_VISIT_TYPES.contains(&visit_type) || INPATIENT_VISIT_TYPE_CODES.contains(&visit_type)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_inpatient_type() {
        assert!(is_inpatient_type("9201"));
        assert!(is_inpatient_type("Visit/IP"));
        assert!(!is_inpatient_type("9202"));
        assert!(!is_inpatient_type("9203"));
    }
}
