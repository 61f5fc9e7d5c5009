//! Window selection over tokenized sequences
//!
//! Policies for fitting an oversized sequence into the model's maximum
//! length: tail truncation, uniformly random truncation, the
//! boundary-respecting random re-anchor, and the symmetric time-window
//! index lookup used by temporal attention.

pub mod reanchor;
pub mod time_window;
pub mod truncation;

pub use reanchor::{ReanchorWindow, random_reanchor};
pub use time_window::indexes_by_time_window;
pub use truncation::{random_truncation, tail_truncation};
