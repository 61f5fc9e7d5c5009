//! Shared utilities for the timeline pipeline.

pub mod logging;
pub mod progress;
pub mod rng;
pub mod time;
