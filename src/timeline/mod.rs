//! Patient-timeline construction
//!
//! Groups a patient's raw event stream into day-blocks, merges
//! emergency-department and inpatient-admission blocks into coherent
//! encounters, and assembles the resulting `Visit` timeline.

pub mod block;
pub mod merge;

pub use block::{BlockScan, DayBlock, Demographics, build_day_blocks};
pub use merge::build_patient;
