//! Domain models for patient timelines and tokenized sequences.
//!
//! `Event`, `DayBlock` (in `timeline`), and `Visit` are transient: they are
//! built and discarded within one patient's transform. `SequenceRecord` is
//! the immutable output unit handed to the tokenizer and trainer boundary.

pub mod event;
pub mod patient;
pub mod record;
pub mod record_schema;
pub mod visit;

pub use event::{Event, EventTable};
pub use patient::{Patient, UNKNOWN_VALUE};
pub use record::{
    AGE_SENTINEL, LABEL_IGNORE, RecordBuilder, SequenceRecord, TokenWrite, VALUE_SENTINEL,
    VISIT_END_TOKEN, VISIT_START_TOKEN,
};
pub use visit::{Visit, DEFAULT_ED_CONCEPT_ID, DEFAULT_INPATIENT_CONCEPT_ID, DEFAULT_OUTPATIENT_CONCEPT_ID};
