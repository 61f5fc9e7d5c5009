//! Configuration for the timeline pipeline.

use serde::{Deserialize, Serialize};

/// Bucketing scheme for artificial gap tokens
///
/// A gap token encodes the day-delta between two chronologically adjacent
/// visits (or events inside an inpatient stay) at a coarse granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeTokenScheme {
    /// `D<days>`
    Day,
    /// `W<days / 7>`
    Week,
    /// `M<days / 30>`
    Month,
    /// `Q<days / 90>`
    Quarter,
    /// `Y<days / 365>`
    Year,
    /// `W<days / 7>` under 1080 days, the long-term token `LT` beyond
    Mixed,
}

/// Windowing policy applied to oversized sequences
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TruncationType {
    /// Keep the final `max_length - 1` tokens
    Tail,
    /// Uniformly random start offset
    Random,
    /// Boundary-respecting random re-anchor over the raw concept sequence
    RandomReanchor,
}

/// Configuration for the timeline-to-token mapper
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimelineConfig {
    /// Bucketing scheme for inter-visit gap tokens
    pub time_token_scheme: TimeTokenScheme,
    /// Bucketing scheme for gap tokens between events inside inpatient
    /// visits; `None` disables inpatient gap tokens
    pub inpatient_time_token_scheme: Option<TimeTokenScheme>,
    /// Emit the auxiliary visit-type token after each `[VS]` marker and the
    /// discharge-facility token before inpatient `[VE]` markers
    pub include_auxiliary_token: bool,
    /// Emit the 4-token demographic prompt at the head of the sequence
    pub include_demographic_prompt: bool,
    /// Visit id assigned to the first day-block of a patient
    pub default_visit_id: i64,
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self {
            time_token_scheme: TimeTokenScheme::Mixed,
            inpatient_time_token_scheme: None,
            include_auxiliary_token: false,
            include_demographic_prompt: false,
            default_visit_id: 1,
        }
    }
}

/// Configuration for windowing and the masked-token objective
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowingConfig {
    /// Maximum model sequence length; one slot is reserved for a leading
    /// classifier token
    pub max_length: usize,
    /// Policy used to select a window from an oversized sequence
    pub truncation: TruncationType,
    /// Base seed for randomized decisions; the per-record RNG is derived
    /// from this seed and the person id so transforms stay reproducible
    pub random_seed: Option<u64>,
}

impl Default for WindowingConfig {
    fn default() -> Self {
        Self {
            max_length: 512,
            truncation: TruncationType::Tail,
            random_seed: None,
        }
    }
}
