//! Timeline-to-token mapping
//!
//! Walks a patient's merged visits chronologically and emits the parallel
//! token arrays of a `SequenceRecord`, plus the artificial gap-token
//! vocabulary and the defensive chronological re-sort.

pub mod mapper;
pub mod normalize;
pub mod time_tokens;

pub use mapper::TimelineTokenMapper;
pub use normalize::sort_patient_sequence;
pub use time_tokens::{LONG_TERM_TOKEN, parse_day_delta};
