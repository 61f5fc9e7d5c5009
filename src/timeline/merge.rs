//! Visit merge state machine
//!
//! Scans one patient's day-blocks chronologically and merges
//! ED-registration and inpatient-admission blocks into single encounters:
//! an ED block followed by an admission within 24 hours joins that
//! admission, a discharge closes the open span, and a block starting
//! within 12 hours of a discharge is absorbed into the closed visit.

use crate::error::{Result, TimelineError};
use crate::models::event::Event;
use crate::models::patient::{Patient, UNKNOWN_VALUE};
use crate::models::visit::{DEFAULT_INPATIENT_CONCEPT_ID, Visit};
use crate::timeline::block::{DayBlock, build_day_blocks};
use crate::utils::time::age_in_years;
use chrono::{Duration, NaiveDateTime};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

/// Maximum ED-to-admission gap, in hours, for the two blocks to count as
/// one encounter
const ED_ADMISSION_MERGE_HOURS: i64 = 24;

/// Maximum gap, in hours, for a block following a discharge to be absorbed
/// into the closed visit
const POST_DISCHARGE_ABSORB_HOURS: i64 = 12;

/// Resolve admission spans over the blocks and re-assign visit ids
///
/// Returns the `(admission_index, discharge_index)` pairs that were closed.
/// When `prediction_time` is supplied, an admission still open at the final
/// block is closed as an ongoing partial visit; without it, dangling
/// admission blocks stay unmerged and surface as standalone visits.
pub fn merge_admission_spans(
    blocks: &mut [DayBlock],
    prediction_time: Option<NaiveDateTime>,
) -> SmallVec<[(usize, usize); 4]> {
    let mut pairs: SmallVec<[(usize, usize); 4]> = SmallVec::new();
    let mut active_ed_index: Option<usize> = None;
    let mut active_admission_index: Option<usize> = None;

    for i in 0..blocks.len() {
        if blocks[i].has_ed_admission && active_admission_index.is_none() {
            active_ed_index = Some(i);
        }
        if blocks[i].has_admission {
            match (active_ed_index.take(), active_admission_index) {
                (Some(ed), _) => {
                    let gap = blocks[i].min_time - blocks[ed].max_time;
                    if ed == i || gap <= Duration::hours(ED_ADMISSION_MERGE_HOURS) {
                        // The encounter starts at the ED registration
                        active_admission_index = Some(ed);
                    } else {
                        active_admission_index = Some(i);
                    }
                }
                // Overlapping admissions collapse onto the earliest
                (None, Some(_)) => {}
                (None, None) => active_admission_index = Some(i),
            }
        }
        if blocks[i].has_discharge {
            if let Some(admission) = active_admission_index {
                pairs.push((admission, i));
            }
            active_admission_index = None;
            active_ed_index = None;
        }
        if i == blocks.len() - 1 {
            // An admission still open at the end of history is an ongoing
            // partial visit, closed only under a prediction cutoff
            if let Some(admission) = active_admission_index {
                if prediction_time.is_some() {
                    pairs.push((admission, i));
                } else {
                    log::debug!("dangling admission block at index {admission} left unmerged");
                }
            }
        }
    }

    for &(admission, discharge) in &pairs {
        let merged_visit_id = blocks[admission].visit_id;
        for block in &mut blocks[admission..=discharge] {
            block.visit_id = merged_visit_id;
            block.visit_type = DEFAULT_INPATIENT_CONCEPT_ID.to_string();
        }
        // Events shortly after the discharge still belong to the visit
        if discharge + 1 < blocks.len() {
            let gap = blocks[discharge + 1].min_time - blocks[discharge].max_time;
            if gap <= Duration::hours(POST_DISCHARGE_ABSORB_HOURS) {
                blocks[discharge + 1].visit_id = merged_visit_id;
                blocks[discharge + 1].visit_type = DEFAULT_INPATIENT_CONCEPT_ID.to_string();
            }
        }
    }

    pairs
}

/// Assemble visits by grouping blocks on their resolved visit id
///
/// Visit type comes from the first member block, the span covers the
/// members' extreme times, and inpatient visits pick the first parseable
/// discharge facility (`Unknown` when none parses).
#[must_use]
pub fn assemble_visits(blocks: &[DayBlock]) -> Vec<Visit> {
    let mut group_order: Vec<i64> = Vec::new();
    let mut groups: FxHashMap<i64, Vec<&DayBlock>> = FxHashMap::default();
    for block in blocks {
        groups
            .entry(block.visit_id)
            .or_insert_with(|| {
                group_order.push(block.visit_id);
                Vec::new()
            })
            .push(block);
    }

    let mut visits = Vec::with_capacity(group_order.len());
    for visit_id in group_order {
        let members = &groups[&visit_id];
        let visit_type = members[0].visit_type.clone();
        let start_time = members.iter().map(|b| b.min_time).min().unwrap_or(members[0].min_time);
        let end_time = members.iter().map(|b| b.max_time).max().unwrap_or(members[0].max_time);

        let discharge_facility = if visit_type == DEFAULT_INPATIENT_CONCEPT_ID {
            Some(
                members
                    .iter()
                    .find_map(|b| b.discharge_facility())
                    .unwrap_or_else(|| UNKNOWN_VALUE.to_string()),
            )
        } else {
            None
        };

        let mut events: Vec<Event> = members.iter().flat_map(|b| b.tagged_events()).collect();
        events.sort_by_key(|e| e.time);

        visits.push(Visit {
            visit_type,
            start_time,
            end_time,
            discharge_facility,
            events,
        });
    }
    visits
}

/// Build one patient's timeline from its raw event stream
///
/// Runs the day-block builder, the merge state machine, and visit
/// assembly. A patient with clinical events but no birth marker is a
/// data-integrity error; the batch driver drops such records and
/// continues.
pub fn build_patient(
    person_id: i64,
    events: &[Event],
    default_visit_id: i64,
    prediction_time: Option<NaiveDateTime>,
    label: Option<f64>,
) -> Result<Patient> {
    let scan = build_day_blocks(events, default_visit_id, prediction_time);
    let mut blocks = scan.blocks;
    merge_admission_spans(&mut blocks, prediction_time);
    let visits = assemble_visits(&blocks);

    let birth_time = scan.demographics.birth_time.ok_or_else(|| {
        TimelineError::data_integrity(person_id, "no birth event on the timeline")
    })?;

    let age_at_index = match prediction_time {
        Some(cutoff) => age_in_years(birth_time, cutoff),
        None => -1,
    };

    let mut patient = Patient::new(person_id, birth_time, visits);
    patient.gender = scan.demographics.gender.unwrap_or_else(|| UNKNOWN_VALUE.to_string());
    patient.race = scan.demographics.race.unwrap_or_else(|| UNKNOWN_VALUE.to_string());
    patient.ethnicity = scan
        .demographics
        .ethnicity
        .unwrap_or_else(|| UNKNOWN_VALUE.to_string());
    patient.index_time = prediction_time;
    patient.label = label;
    patient.age_at_index = age_at_index;
    Ok(patient)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn dt(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    fn dtm(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    fn block(code: &str, time: NaiveDateTime, visit_id: i64) -> DayBlock {
        DayBlock::new(vec![Event::new(code, time)], visit_id).unwrap()
    }

    #[test]
    fn test_ed_merges_into_admission_within_24_hours() {
        let mut blocks = vec![
            block("ED_REGISTRATION", dt(2020, 1, 1, 20), 1),
            block("HOSPITAL_ADMISSION", dt(2020, 1, 2, 10), 2),
            block("HOSPITAL_DISCHARGE//HOME", dt(2020, 1, 4, 9), 3),
        ];
        let pairs = merge_admission_spans(&mut blocks, None);
        assert_eq!(pairs.as_slice(), &[(0, 2)]);
        assert!(blocks.iter().all(|b| b.visit_id == 1));
        assert!(blocks.iter().all(|b| b.visit_type == "9201"));
    }

    #[test]
    fn test_ed_not_merged_beyond_24_hours() {
        let mut blocks = vec![
            block("ED_REGISTRATION", dt(2020, 1, 1, 8), 1),
            block("HOSPITAL_ADMISSION", dt(2020, 1, 3, 10), 2),
            block("HOSPITAL_DISCHARGE//HOME", dt(2020, 1, 4, 9), 3),
        ];
        let pairs = merge_admission_spans(&mut blocks, None);
        assert_eq!(pairs.as_slice(), &[(1, 2)]);
        assert_eq!(blocks[0].visit_id, 1);
        assert_eq!(blocks[1].visit_id, 2);
        assert_eq!(blocks[2].visit_id, 2);
    }

    #[test]
    fn test_ed_merge_boundary_counts_minutes() {
        // 24 h 30 m must not merge, exactly 24 h must
        let mut blocks = vec![
            block("ED_REGISTRATION", dt(2020, 3, 1, 8), 1),
            block("HOSPITAL_ADMISSION", dtm(2020, 3, 2, 8, 30), 2),
            block("HOSPITAL_DISCHARGE//HOME", dt(2020, 3, 3, 9), 3),
        ];
        let pairs = merge_admission_spans(&mut blocks, None);
        assert_eq!(pairs.as_slice(), &[(1, 2)]);
        assert_eq!(blocks[0].visit_type, "9203");

        let mut blocks = vec![
            block("ED_REGISTRATION", dt(2020, 3, 1, 8), 1),
            block("HOSPITAL_ADMISSION", dt(2020, 3, 2, 8), 2),
            block("HOSPITAL_DISCHARGE//HOME", dt(2020, 3, 3, 9), 3),
        ];
        let pairs = merge_admission_spans(&mut blocks, None);
        assert_eq!(pairs.as_slice(), &[(0, 2)]);
    }

    #[test]
    fn test_absorption_boundary_counts_minutes() {
        // 12 h 30 m past discharge must not be absorbed, exactly 12 h must
        let mut blocks = vec![
            block("HOSPITAL_ADMISSION", dt(2020, 3, 1, 8), 1),
            block("HOSPITAL_DISCHARGE//HOME", dt(2020, 3, 2, 8), 2),
            block("320128", dtm(2020, 3, 2, 20, 30), 3),
        ];
        merge_admission_spans(&mut blocks, None);
        assert_eq!(blocks[2].visit_id, 3);

        let mut blocks = vec![
            block("HOSPITAL_ADMISSION", dt(2020, 3, 1, 8), 1),
            block("HOSPITAL_DISCHARGE//HOME", dt(2020, 3, 2, 8), 2),
            block("320128", dt(2020, 3, 2, 20), 3),
        ];
        merge_admission_spans(&mut blocks, None);
        assert_eq!(blocks[2].visit_id, 1);
    }

    #[test]
    fn test_overlapping_admissions_collapse_onto_earliest() {
        let mut blocks = vec![
            block("HOSPITAL_ADMISSION", dt(2020, 1, 1, 8), 1),
            block("HOSPITAL_ADMISSION", dt(2020, 1, 2, 8), 2),
            block("HOSPITAL_DISCHARGE//SNF", dt(2020, 1, 3, 9), 3),
        ];
        let pairs = merge_admission_spans(&mut blocks, None);
        assert_eq!(pairs.as_slice(), &[(0, 2)]);
    }

    #[test]
    fn test_trailing_block_absorbed_within_12_hours() {
        let mut blocks = vec![
            block("HOSPITAL_ADMISSION", dt(2020, 1, 1, 8), 1),
            block("HOSPITAL_DISCHARGE//HOME", dt(2020, 1, 2, 22), 2),
            block("320128", dt(2020, 1, 3, 6), 3),
        ];
        merge_admission_spans(&mut blocks, None);
        assert_eq!(blocks[2].visit_id, 1);
        assert_eq!(blocks[2].visit_type, "9201");
    }

    #[test]
    fn test_trailing_block_not_absorbed_beyond_12_hours() {
        let mut blocks = vec![
            block("HOSPITAL_ADMISSION", dt(2020, 1, 1, 8), 1),
            block("HOSPITAL_DISCHARGE//HOME", dt(2020, 1, 2, 8), 2),
            block("320128", dt(2020, 1, 3, 6), 3),
        ];
        merge_admission_spans(&mut blocks, None);
        assert_eq!(blocks[2].visit_id, 3);
    }

    #[test]
    fn test_dangling_admission_closed_only_under_cutoff() {
        let mut blocks = vec![
            block("HOSPITAL_ADMISSION", dt(2020, 1, 1, 8), 1),
            block("320128", dt(2020, 1, 2, 8), 2),
        ];
        let pairs = merge_admission_spans(&mut blocks, None);
        assert!(pairs.is_empty());

        let mut blocks = vec![
            block("HOSPITAL_ADMISSION", dt(2020, 1, 1, 8), 1),
            block("320128", dt(2020, 1, 2, 8), 2),
        ];
        let pairs = merge_admission_spans(&mut blocks, Some(dt(2020, 1, 2, 12)));
        assert_eq!(pairs.as_slice(), &[(0, 1)]);
    }

    #[test]
    fn test_assemble_visits_groups_and_spans() {
        let mut blocks = vec![
            block("HOSPITAL_ADMISSION", dt(2020, 1, 1, 8), 1),
            block("4134120", dt(2020, 1, 2, 8), 2),
            block("HOSPITAL_DISCHARGE//HOME", dt(2020, 1, 3, 9), 3),
            block("320128", dt(2020, 2, 1, 10), 4),
        ];
        merge_admission_spans(&mut blocks, None);
        let visits = assemble_visits(&blocks);
        assert_eq!(visits.len(), 2);
        assert_eq!(visits[0].visit_type, "9201");
        assert_eq!(visits[0].start_time, dt(2020, 1, 1, 8));
        assert_eq!(visits[0].end_time, dt(2020, 1, 3, 9));
        assert_eq!(visits[0].discharge_facility.as_deref(), Some("HOME"));
        assert_eq!(visits[0].events.len(), 3);
        assert_eq!(visits[1].visit_type, "9202");
        assert!(visits[1].discharge_facility.is_none());
    }

    #[test]
    fn test_build_patient_requires_birth_event() {
        let events = vec![Event::new("320128", dt(2020, 1, 1, 9))];
        assert!(build_patient(1, &events, 1, None, None).is_err());

        let events = vec![
            Event::new("MEDS_BIRTH", dt(1980, 4, 14, 0)),
            Event::new("320128", dt(2020, 1, 1, 9)),
        ];
        let patient = build_patient(1, &events, 1, None, None).unwrap();
        assert_eq!(patient.visits.len(), 1);
        assert_eq!(patient.age_at_index, -1);
    }
}
