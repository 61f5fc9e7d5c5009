//! Clinical event model
//!
//! An `Event` is a single timestamped observation from a patient's history.
//! Events are immutable once created.

use chrono::NaiveDateTime;

/// Source table an event was drawn from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventTable {
    /// A visit-occurrence row (visit type marker)
    Visit,
    /// A measurement or other clinical observation
    Measurement,
}

/// A single timestamped clinical event
#[derive(Debug, Clone)]
pub struct Event {
    /// Concept code, e.g. an OMOP concept id or a source marker code
    pub code: String,
    /// Time the event occurred
    pub time: NaiveDateTime,
    /// Numeric value for concept/value tuples (lab results etc.)
    pub numeric_value: Option<f64>,
    /// Free-text value, if any
    pub text_value: Option<String>,
    /// Source table
    pub table: EventTable,
    /// Visit the event belongs to, when already resolved upstream
    pub visit_id: Option<i64>,
}

impl Event {
    /// Create a measurement event with just a code and a time
    #[must_use]
    pub fn new(code: impl Into<String>, time: NaiveDateTime) -> Self {
        Self {
            code: code.into(),
            time,
            numeric_value: None,
            text_value: None,
            table: EventTable::Measurement,
            visit_id: None,
        }
    }

    /// Attach a numeric value
    #[must_use]
    pub fn with_numeric_value(mut self, value: f64) -> Self {
        self.numeric_value = Some(value);
        self
    }

    /// Mark the event as coming from the visit table
    #[must_use]
    pub fn as_visit_marker(mut self) -> Self {
        self.table = EventTable::Visit;
        self
    }

    /// Whether this event carries an attached numeric value
    #[must_use]
    pub fn has_numeric_value(&self) -> bool {
        self.numeric_value.is_some()
    }
}
