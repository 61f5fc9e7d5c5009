//! Record-transform pipeline
//!
//! Each stage implements one `transform(record) -> record` capability and
//! the pipeline is an explicit ordered list of stages composed by the
//! caller. The batch drivers run per-record transforms in parallel;
//! content errors drop the offending record and processing continues,
//! while schema errors abort the run.

use crate::config::{TruncationType, WindowingConfig};
use crate::error::{Result, TimelineError};
use crate::masking::mask_tokens;
use crate::models::Patient;
use crate::models::record::{LABEL_IGNORE, SequenceRecord};
use crate::tokenize::{TimelineTokenMapper, sort_patient_sequence};
use crate::tokenizer::ConceptTokenizer;
use crate::utils::logging::log_batch_summary;
use crate::utils::progress::{create_batch_progress_bar, finish_progress_bar};
use crate::utils::rng::record_rng;
use crate::windowing::{random_reanchor, random_truncation, tail_truncation};
use rayon::prelude::*;
use std::sync::Arc;

/// One capability of the record pipeline
pub trait RecordTransform: Send + Sync {
    /// Stage name used in logs
    fn name(&self) -> &'static str;

    /// Transform one record
    fn transform(&self, record: SequenceRecord) -> Result<SequenceRecord>;
}

/// Defensive chronological re-sort of the parallel arrays
pub struct SortPatientSequence;

impl RecordTransform for SortPatientSequence {
    fn name(&self) -> &'static str {
        "sort_patient_sequence"
    }

    fn transform(&self, record: SequenceRecord) -> Result<SequenceRecord> {
        Ok(sort_patient_sequence(record))
    }
}

/// Encode concept codes into vocabulary ids
///
/// Under pretraining the label array is pre-filled with the input ids,
/// with the ignore label at positions the masked-token objective must
/// never select.
pub struct TokenizeSequence {
    tokenizer: Arc<dyn ConceptTokenizer>,
    for_pretraining: bool,
}

impl TokenizeSequence {
    #[must_use]
    pub fn new(tokenizer: Arc<dyn ConceptTokenizer>, for_pretraining: bool) -> Self {
        Self {
            tokenizer,
            for_pretraining,
        }
    }
}

impl RecordTransform for TokenizeSequence {
    fn name(&self) -> &'static str {
        "tokenize_sequence"
    }

    fn transform(&self, mut record: SequenceRecord) -> Result<SequenceRecord> {
        record.input_ids = self.tokenizer.encode(&record.concept_ids);
        if self.for_pretraining {
            if record.mlm_skip_values.len() != record.input_ids.len() {
                return Err(TimelineError::data_integrity(
                    record.person_id,
                    "mlm_skip_values does not align with input_ids",
                ));
            }
            record.labels = record
                .input_ids
                .iter()
                .zip(&record.mlm_skip_values)
                .map(|(&id, &skip)| if skip == 1 { LABEL_IGNORE } else { id })
                .collect();
        }
        Ok(record)
    }
}

/// Select a bounded window per the configured truncation policy
pub struct TruncateSequence {
    config: WindowingConfig,
}

impl TruncateSequence {
    #[must_use]
    pub fn new(config: WindowingConfig) -> Self {
        Self { config }
    }
}

impl RecordTransform for TruncateSequence {
    fn name(&self) -> &'static str {
        "truncate_sequence"
    }

    fn transform(&self, record: SequenceRecord) -> Result<SequenceRecord> {
        let seq_len = record.len();
        let mut rng = record_rng(self.config.random_seed, record.person_id);
        let (start, end) = match self.config.truncation {
            TruncationType::Tail => tail_truncation(seq_len, self.config.max_length),
            TruncationType::Random => {
                random_truncation(seq_len, self.config.max_length, &mut rng)
            }
            TruncationType::RandomReanchor => {
                if seq_len <= self.config.max_length {
                    (0, seq_len)
                } else {
                    let window =
                        random_reanchor(&record.concept_ids, self.config.max_length, &mut rng);
                    if window.is_degenerate() {
                        return Err(TimelineError::DegenerateWindow(format!(
                            "no visit-boundary window for person {}",
                            record.person_id
                        )));
                    }
                    (window.start, window.end)
                }
            }
        };
        Ok(record.slice_window(start, end))
    }
}

/// Apply the masked-token objective to the tokenized sequence
pub struct MaskedLanguageModel {
    tokenizer: Arc<dyn ConceptTokenizer>,
    random_seed: Option<u64>,
}

impl MaskedLanguageModel {
    #[must_use]
    pub fn new(tokenizer: Arc<dyn ConceptTokenizer>, random_seed: Option<u64>) -> Self {
        Self {
            tokenizer,
            random_seed,
        }
    }
}

impl RecordTransform for MaskedLanguageModel {
    fn name(&self) -> &'static str {
        "masked_language_model"
    }

    fn transform(&self, mut record: SequenceRecord) -> Result<SequenceRecord> {
        if record.input_ids.len() != record.len() {
            return Err(TimelineError::data_integrity(
                record.person_id,
                "record was not tokenized before masking",
            ));
        }
        let mut rng = record_rng(self.random_seed, record.person_id);
        let (masked, labels) = mask_tokens(
            record.person_id,
            &record.input_ids,
            &record.mlm_skip_values,
            self.tokenizer.as_ref(),
            &mut rng,
        )?;
        record.input_ids = masked;
        record.labels = labels;
        Ok(record)
    }
}

/// Validate the annotations fine-tuning cohorts require
pub struct FineTuningValidation;

impl RecordTransform for FineTuningValidation {
    fn name(&self) -> &'static str {
        "fine_tuning_validation"
    }

    fn transform(&self, record: SequenceRecord) -> Result<SequenceRecord> {
        if record.classifier_label.is_none() {
            return Err(TimelineError::Schema(
                "fine-tuning input is missing the classifier label".to_string(),
            ));
        }
        if record.age_at_index.is_none() {
            return Err(TimelineError::Schema(
                "fine-tuning input is missing the index-time age".to_string(),
            ));
        }
        Ok(record)
    }
}

fn apply_stages(
    mut record: SequenceRecord,
    stages: &[Box<dyn RecordTransform>],
) -> Result<Option<SequenceRecord>> {
    let person_id = record.person_id;
    for stage in stages {
        match stage.transform(record) {
            Ok(next) => record = next,
            Err(err @ TimelineError::Schema(_)) => return Err(err),
            Err(err) => {
                log::warn!("{}: dropping record for person {person_id}: {err}", stage.name());
                return Ok(None);
            }
        }
    }
    Ok(Some(record))
}

/// Run a stage list over a batch of records in parallel
///
/// Content errors drop the offending record; schema errors abort the
/// whole batch.
pub fn run_pipeline(
    records: Vec<SequenceRecord>,
    stages: &[Box<dyn RecordTransform>],
) -> Result<Vec<SequenceRecord>> {
    let total = records.len();
    let progress = create_batch_progress_bar(total as u64, Some("transforming records"));

    let transformed: Result<Vec<Option<SequenceRecord>>> = records
        .into_par_iter()
        .map(|record| {
            let out = apply_stages(record, stages);
            progress.inc(1);
            out
        })
        .collect();
    let kept: Vec<SequenceRecord> = transformed?.into_iter().flatten().collect();

    finish_progress_bar(&progress, Some("done"));
    log_batch_summary("pipeline", total, kept.len());
    Ok(kept)
}

/// Map a batch of patients to records and run the stage list, in parallel
///
/// Mapping failures (for example a timeline with no tokens) drop the
/// patient and processing continues.
pub fn transform_patients(
    patients: &[Patient],
    mapper: &TimelineTokenMapper,
    stages: &[Box<dyn RecordTransform>],
) -> Result<Vec<SequenceRecord>> {
    let total = patients.len();
    let progress = create_batch_progress_bar(total as u64, Some("mapping timelines"));

    let transformed: Result<Vec<Option<SequenceRecord>>> = patients
        .par_iter()
        .map(|patient| {
            let out = match mapper.map_patient(patient) {
                Ok(record) => apply_stages(record, stages),
                Err(err @ TimelineError::Schema(_)) => Err(err),
                Err(err) => {
                    log::warn!("dropping patient {}: {err}", patient.person_id);
                    Ok(None)
                }
            };
            progress.inc(1);
            out
        })
        .collect();
    let kept: Vec<SequenceRecord> = transformed?.into_iter().flatten().collect();

    finish_progress_bar(&progress, Some("done"));
    log_batch_summary("timeline mapping", total, kept.len());
    Ok(kept)
}
