//! Timeline-to-token mapper
//!
//! Walks a patient's visits in chronological order and emits the parallel
//! token arrays of a `SequenceRecord`: visit start/end markers, concept
//! codes, artificial gap tokens, and the per-position age, week-index,
//! segment, and value annotations.

use crate::config::TimelineConfig;
use crate::error::{Result, TimelineError};
use crate::models::record::{
    RecordBuilder, SequenceRecord, TokenWrite, VALUE_SENTINEL, VISIT_END_TOKEN, VISIT_START_TOKEN,
};
use crate::models::{Patient, Visit};
use crate::utils::time::{age_in_years, day_delta, weeks_since_epoch};
use chrono::Datelike;
use itertools::Itertools;

/// Maps reconstructed patient timelines to tokenized sequence records
#[derive(Debug, Clone)]
pub struct TimelineTokenMapper {
    config: TimelineConfig,
}

impl TimelineTokenMapper {
    #[must_use]
    pub fn new(config: TimelineConfig) -> Self {
        Self { config }
    }

    /// Tokenize one patient's timeline
    ///
    /// Visits are walked in start-time order. Between visits a gap token is
    /// emitted whenever the day-delta from the date cursor is positive; the
    /// cursor advances to each visit's start, and past its end for inpatient
    /// visits. Inside inpatient visits, age and week index are recomputed
    /// per event so multi-day stays keep their internal chronology.
    pub fn map_patient(&self, patient: &Patient) -> Result<SequenceRecord> {
        let mut builder = RecordBuilder::new(patient.person_id);

        if self.config.include_demographic_prompt {
            self.push_demographic_prompt(&mut builder, patient);
        }

        let mut date_cursor = None;
        // parity alternates across visits that actually emit tokens
        let mut segment_toggle = false;

        for (i, visit) in patient.visits.iter().enumerate() {
            if visit.events.is_empty() {
                continue;
            }
            let visit_order = i as i32 + 1;
            let segment = if segment_toggle { 2 } else { 1 };

            if let Some(cursor) = date_cursor {
                let gap_days = day_delta(cursor, visit.start_time);
                if gap_days > 0 {
                    let code = self.config.time_token_scheme.gap_token(gap_days);
                    builder.push(TokenWrite {
                        code: &code,
                        visit_concept_order: visit_order,
                        ..TokenWrite::default()
                    });
                }
            }
            date_cursor = Some(visit.start_time);

            self.push_visit(&mut builder, patient, visit, visit_order, segment, &mut date_cursor);
            segment_toggle = !segment_toggle;
        }

        let mut record = builder.finish(patient.visits.len())?;
        if record.is_empty() {
            return Err(TimelineError::data_integrity(
                patient.person_id,
                "timeline produced no tokens",
            ));
        }

        record.birth_time = Some(patient.birth_time);
        record.gender = patient.gender.clone();
        record.race = patient.race.clone();
        record.index_time = patient.index_time;
        record.classifier_label = patient.label;
        if patient.index_time.is_some() {
            record.age_at_index = Some(patient.age_at_index);
        }
        Ok(record)
    }

    fn push_demographic_prompt(&self, builder: &mut RecordBuilder, patient: &Patient) {
        let Some(first_visit) = patient.visits.iter().find(|v| !v.events.is_empty()) else {
            return;
        };
        let year = format!("year:{}", first_visit.start_time.year());
        let age = format!(
            "age:{}",
            age_in_years(patient.birth_time, first_visit.start_time)
        );
        for code in [year.as_str(), age.as_str(), &patient.gender, &patient.race] {
            builder.push(TokenWrite {
                code,
                ..TokenWrite::default()
            });
        }
    }

    fn push_visit(
        &self,
        builder: &mut RecordBuilder,
        patient: &Patient,
        visit: &Visit,
        visit_order: i32,
        segment: i32,
        date_cursor: &mut Option<chrono::NaiveDateTime>,
    ) {
        let is_inpatient = visit.is_inpatient();
        let mut age = age_in_years(patient.birth_time, visit.start_time);
        let mut date = weeks_since_epoch(visit.start_time);

        builder.push(marker_token(VISIT_START_TOKEN, visit, age, date, segment, visit_order));
        if self.config.include_auxiliary_token {
            builder.push(marker_token(&visit.visit_type, visit, age, date, segment, visit_order));
        }

        let ordered = visit
            .events
            .iter()
            .sorted_by(|a, b| a.time.cmp(&b.time).then_with(|| a.code.cmp(&b.code)));
        for event in ordered {
            if is_inpatient {
                if let Some(cursor) = *date_cursor {
                    let gap_days = day_delta(cursor, event.time);
                    if gap_days > 0 {
                        *date_cursor = Some(event.time);
                        if let Some(scheme) = self.config.inpatient_time_token_scheme {
                            let code = scheme.inpatient_gap_token(gap_days);
                            builder.push(TokenWrite {
                                code: &code,
                                visit_segment: segment,
                                visit_concept_order: visit_order,
                                visit_concept_id: &visit.visit_type,
                                ..TokenWrite::default()
                            });
                        }
                    }
                }
                age = age_in_years(patient.birth_time, event.time);
                date = weeks_since_epoch(event.time);
            }
            let has_value = event.has_numeric_value();
            builder.push(TokenWrite {
                code: &event.code,
                age,
                date,
                visit_segment: segment,
                visit_concept_order: visit_order,
                visit_concept_id: &visit.visit_type,
                concept_value_mask: i32::from(has_value),
                concept_value: event.numeric_value.unwrap_or(VALUE_SENTINEL),
                mlm_skip_value: i32::from(has_value),
            });
        }

        if is_inpatient {
            *date_cursor = Some(visit.end_time);
            if self.config.include_auxiliary_token {
                let facility = visit.discharge_facility.as_deref().unwrap_or("0");
                builder.push(marker_token(facility, visit, age, date, segment, visit_order));
            }
        }
        builder.push(marker_token(VISIT_END_TOKEN, visit, age, date, segment, visit_order));
    }
}

fn marker_token<'a>(
    code: &'a str,
    visit: &'a Visit,
    age: i32,
    date: i32,
    segment: i32,
    visit_order: i32,
) -> TokenWrite<'a> {
    TokenWrite {
        code,
        age,
        date,
        visit_segment: segment,
        visit_concept_order: visit_order,
        visit_concept_id: &visit.visit_type,
        ..TokenWrite::default()
    }
}
