//! A Rust library for building patient timelines from clinical event
//! streams and windowing them into fixed-schema token sequences for
//! sequence models.

pub mod config;
pub mod error;
pub mod masking;
pub mod models;
pub mod pipeline;
pub mod timeline;
pub mod tokenize;
pub mod tokenizer;
pub mod utils;
pub mod windowing;

// Re-export the most common types for easier use
// Core types
pub use config::{TimeTokenScheme, TimelineConfig, TruncationType, WindowingConfig};
pub use error::{Result, TimelineError};
pub use models::{Event, Patient, SequenceRecord, Visit};

// Timeline construction
pub use timeline::{build_day_blocks, build_patient};

// Tokenization
pub use tokenize::{TimelineTokenMapper, sort_patient_sequence};
pub use tokenizer::{ConceptTokenizer, ConceptVocab};

// Windowing and masking
pub use masking::mask_tokens;
pub use windowing::{indexes_by_time_window, random_reanchor, random_truncation, tail_truncation};

// Pipeline composition
pub use pipeline::{
    FineTuningValidation, MaskedLanguageModel, RecordTransform, SortPatientSequence,
    TokenizeSequence, TruncateSequence, run_pipeline, transform_patients,
};

// Arrow types at the output boundary
pub use arrow::datatypes::Schema as ArrowSchema;
pub use arrow::record_batch::RecordBatch;
pub use models::record_schema::{output_schema, records_to_batch};
