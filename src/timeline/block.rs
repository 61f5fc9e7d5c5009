//! Day-block grouping
//!
//! A `DayBlock` holds the events occurring on one calendar day for one
//! patient. Marker codes found inside the block drive the visit-merge
//! state machine; demographic events are captured separately and never
//! enter a block.

use crate::models::event::Event;
use crate::models::visit::{
    DEFAULT_ED_CONCEPT_ID, DEFAULT_INPATIENT_CONCEPT_ID, DEFAULT_OUTPATIENT_CONCEPT_ID,
};
use chrono::NaiveDateTime;

/// Codes marking the birth event
pub const BIRTH_CODES: [&str; 2] = ["MEDS_BIRTH", "SNOMED/184099003"];

/// Code substrings marking an emergency-department registration
pub const ED_MARKERS: [&str; 2] = ["ED_REGISTRATION", "TRANSFER_TO//ED"];

/// Code substring marking a hospital admission
pub const ADMISSION_MARKER: &str = "HOSPITAL_ADMISSION";

/// Code substring marking a hospital discharge
pub const DISCHARGE_MARKER: &str = "HOSPITAL_DISCHARGE";

/// Events of one calendar day for one patient
#[derive(Debug, Clone)]
pub struct DayBlock {
    /// Candidate visit id; re-assigned by the merge state machine
    pub visit_id: i64,
    /// Events of the day, in stream order
    pub events: Vec<Event>,
    /// Earliest event time in the block
    pub min_time: NaiveDateTime,
    /// Latest event time in the block
    pub max_time: NaiveDateTime,
    /// Whether the block contains an ED registration marker
    pub has_ed_admission: bool,
    /// Whether the block contains a hospital admission marker
    pub has_admission: bool,
    /// Whether the block contains a hospital discharge marker
    pub has_discharge: bool,
    /// Visit type inferred from marker presence; admission takes
    /// precedence over ED
    pub visit_type: String,
}

impl DayBlock {
    /// Build a block from one day's events; `None` when `events` is empty
    #[must_use]
    pub fn new(events: Vec<Event>, visit_id: i64) -> Option<Self> {
        let min_time = events.iter().map(|e| e.time).min()?;
        let max_time = events.iter().map(|e| e.time).max()?;

        let has_ed_admission = events
            .iter()
            .any(|e| ED_MARKERS.iter().any(|m| e.code.contains(m)));
        let has_admission = events.iter().any(|e| e.code.contains(ADMISSION_MARKER));
        let has_discharge = events.iter().any(|e| e.code.contains(DISCHARGE_MARKER));

        let visit_type = if has_admission {
            DEFAULT_INPATIENT_CONCEPT_ID
        } else if has_ed_admission {
            DEFAULT_ED_CONCEPT_ID
        } else {
            DEFAULT_OUTPATIENT_CONCEPT_ID
        };

        Some(Self {
            visit_id,
            events,
            min_time,
            max_time,
            has_ed_admission,
            has_admission,
            has_discharge,
            visit_type: visit_type.to_string(),
        })
    }

    /// Discharge-facility code parsed from the discharge marker's suffix
    ///
    /// Strips the marker substring and every non-alphabetic character from
    /// the remaining code; `None` when the block has no discharge marker or
    /// nothing is left after stripping.
    #[must_use]
    pub fn discharge_facility(&self) -> Option<String> {
        let event = self.events.iter().find(|e| e.code.contains(DISCHARGE_MARKER))?;
        let suffix: String = event
            .code
            .replace(DISCHARGE_MARKER, "")
            .chars()
            .filter(char::is_ascii_alphabetic)
            .collect();
        if suffix.is_empty() { None } else { Some(suffix) }
    }

    /// The block's events tagged with the resolved visit id, codes
    /// normalized to underscore-separated form
    #[must_use]
    pub fn tagged_events(&self) -> Vec<Event> {
        self.events
            .iter()
            .map(|e| {
                let mut event = e.clone();
                event.code = event.code.replace(' ', "_");
                event.visit_id = Some(self.visit_id);
                event
            })
            .collect()
    }
}

/// Demographic attributes observed on the event stream
#[derive(Debug, Clone, Default)]
pub struct Demographics {
    /// Birth time from the birth marker event
    pub birth_time: Option<NaiveDateTime>,
    /// Gender code
    pub gender: Option<String>,
    /// Race code
    pub race: Option<String>,
    /// Ethnicity code
    pub ethnicity: Option<String>,
}

/// Output of the day-block builder
#[derive(Debug, Clone)]
pub struct BlockScan {
    /// Day-blocks in chronological order
    pub blocks: Vec<DayBlock>,
    /// Demographics captured off the stream
    pub demographics: Demographics,
}

fn is_demographic(event: &Event, demographics: &mut Demographics) -> bool {
    if BIRTH_CODES.contains(&event.code.as_str()) {
        demographics.birth_time = Some(event.time);
        true
    } else if event.code.starts_with("RACE") || event.code.starts_with("Race/") {
        demographics.race = Some(event.code.clone());
        true
    } else if event.code.starts_with("GENDER") || event.code.starts_with("Gender/") {
        demographics.gender = Some(event.code.clone());
        true
    } else if event.code.starts_with("ETHNICITY") || event.code.starts_with("Ethnicity/") {
        demographics.ethnicity = Some(event.code.clone());
        true
    } else {
        false
    }
}

/// Group one patient's chronologically ordered events into day-blocks
///
/// Consecutive events sharing a calendar day form one block; each new day
/// increments the candidate visit id, starting from `default_visit_id`.
/// Demographic events are captured into `Demographics` instead of a block.
/// Events after `prediction_time` are dropped.
#[must_use]
pub fn build_day_blocks(
    events: &[Event],
    default_visit_id: i64,
    prediction_time: Option<NaiveDateTime>,
) -> BlockScan {
    let mut demographics = Demographics::default();
    let mut blocks = Vec::new();
    let mut visit_id = default_visit_id;
    let mut current_day = None;
    let mut day_events: Vec<Event> = Vec::new();

    for event in events {
        if let Some(cutoff) = prediction_time {
            if event.time > cutoff {
                break;
            }
        }
        if is_demographic(event, &mut demographics) {
            continue;
        }

        match current_day {
            None => {
                current_day = Some(event.time.date());
                day_events.push(event.clone());
            }
            Some(day) if day == event.time.date() => {
                day_events.push(event.clone());
            }
            Some(_) => {
                if let Some(block) = DayBlock::new(std::mem::take(&mut day_events), visit_id) {
                    blocks.push(block);
                }
                visit_id += 1;
                current_day = Some(event.time.date());
                day_events.push(event.clone());
            }
        }
    }
    if let Some(block) = DayBlock::new(day_events, visit_id) {
        blocks.push(block);
    }

    BlockScan {
        blocks,
        demographics,
    }
}
