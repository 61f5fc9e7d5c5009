//! Error handling for the timeline pipeline.

use thiserror::Error;

/// Specialized error type for timeline construction and sequence windowing
#[derive(Debug, Error)]
pub enum TimelineError {
    /// A required field or column is absent from the input; fatal for the run
    #[error("Schema error: {0}")]
    Schema(String),

    /// Parallel arrays or visit brackets are inconsistent within one record;
    /// the record is dropped and processing continues
    #[error("Data integrity error for person {person_id}: {message}")]
    DataIntegrity {
        /// Patient the record belongs to
        person_id: i64,
        /// What was inconsistent
        message: String,
    },

    /// A token could not be parsed (demographic prompt, gap token)
    #[error("Parse error: {0}")]
    Parse(String),

    /// No visit-boundary-respecting window exists for the record
    #[error("Degenerate window: {0}")]
    DegenerateWindow(String),

    /// Error converting records to the columnar output schema
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// Any other error
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl TimelineError {
    /// Create a data-integrity error for one patient's record
    #[must_use]
    pub fn data_integrity(person_id: i64, message: impl Into<String>) -> Self {
        Self::DataIntegrity {
            person_id,
            message: message.into(),
        }
    }

}

/// Result type for timeline operations
pub type Result<T> = std::result::Result<T, TimelineError>;
