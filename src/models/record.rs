//! Tokenized sequence record
//!
//! A `SequenceRecord` is the pipeline's output unit: one row per patient
//! (or per selected window), holding parallel arrays that all share one
//! length. Records are accumulated through `RecordBuilder` and immutable
//! once built.

use crate::error::{Result, TimelineError};
use chrono::NaiveDateTime;

/// Marker token opening a visit
pub const VISIT_START_TOKEN: &str = "[VS]";
/// Marker token closing a visit
pub const VISIT_END_TOKEN: &str = "[VE]";
/// Age value carried by artificial gap tokens
pub const AGE_SENTINEL: i32 = -1;
/// Concept value carried by positions without an attached numeric value
pub const VALUE_SENTINEL: f64 = -1.0;
/// Label id for positions the masked-token objective must ignore
pub const LABEL_IGNORE: i64 = -100;

/// One patient's (or window's) parallel token arrays
#[derive(Debug, Clone, Default)]
pub struct SequenceRecord {
    /// Person identifier
    pub person_id: i64,
    /// Concept codes, one per position
    pub concept_ids: Vec<String>,
    /// Ascending emission order, `1..=n`; the normalizer's primary sort key
    pub orders: Vec<i32>,
    /// Age in completed years per position; -1 on gap tokens
    pub ages: Vec<i32>,
    /// Calendar-week index since the epoch per position; 0 on gap tokens
    pub dates: Vec<i32>,
    /// Visit parity tag per position: 1/2 alternating across visits, 0 on
    /// inter-visit gap tokens
    pub visit_segments: Vec<i32>,
    /// 1-based order of the visit each position belongs to; gap tokens
    /// carry the following visit's order
    pub visit_concept_orders: Vec<i32>,
    /// Visit-type concept id per position, `"0"` outside visits
    pub visit_concept_ids: Vec<String>,
    /// 1 where the position carries an attached numeric value
    pub concept_value_masks: Vec<i32>,
    /// Attached numeric value, or -1 where none exists
    pub concept_values: Vec<f64>,
    /// 1 where the masked-token objective must never select the position
    pub mlm_skip_values: Vec<i32>,
    /// Vocabulary ids after tokenization
    pub input_ids: Vec<i64>,
    /// Masked-token labels; -100 for ignored positions
    pub labels: Vec<i64>,
    /// Number of token positions
    pub num_of_concepts: usize,
    /// Number of visits on the source timeline
    pub num_of_visits: usize,
    /// Start of the selected window, once a windowing policy ran
    pub start_index: Option<usize>,
    /// End (exclusive) of the selected window
    pub end_index: Option<usize>,
    /// Patient birth time, carried through for downstream consumers
    pub birth_time: Option<NaiveDateTime>,
    /// Gender code
    pub gender: String,
    /// Race code
    pub race: String,
    /// Prediction cutoff for fine-tuning cohorts
    pub index_time: Option<NaiveDateTime>,
    /// Age at the prediction cutoff (fine-tuning)
    pub age_at_index: Option<i32>,
    /// Classifier label (fine-tuning)
    pub classifier_label: Option<f64>,
}

impl SequenceRecord {
    /// Number of token positions
    #[must_use]
    pub fn len(&self) -> usize {
        self.concept_ids.len()
    }

    /// Whether the record holds no tokens
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.concept_ids.is_empty()
    }

    /// Check the record's structural invariants
    ///
    /// Verifies that every parallel array shares the concept array's length
    /// and that visit markers are properly bracketed: each `[VS]` is closed
    /// by exactly one `[VE]` before the next `[VS]` opens.
    pub fn validate(&self) -> Result<()> {
        let n = self.concept_ids.len();
        let lengths = [
            ("orders", self.orders.len()),
            ("ages", self.ages.len()),
            ("dates", self.dates.len()),
            ("visit_segments", self.visit_segments.len()),
            ("visit_concept_orders", self.visit_concept_orders.len()),
            ("visit_concept_ids", self.visit_concept_ids.len()),
            ("concept_value_masks", self.concept_value_masks.len()),
            ("concept_values", self.concept_values.len()),
            ("mlm_skip_values", self.mlm_skip_values.len()),
        ];
        for (name, len) in lengths {
            if len != n {
                return Err(TimelineError::data_integrity(
                    self.person_id,
                    format!("{name} has length {len}, expected {n}"),
                ));
            }
        }

        let mut open_order: Option<i32> = None;
        for (i, code) in self.concept_ids.iter().enumerate() {
            match code.as_str() {
                VISIT_START_TOKEN => {
                    if open_order.is_some() {
                        return Err(TimelineError::data_integrity(
                            self.person_id,
                            format!("nested visit start marker at position {i}"),
                        ));
                    }
                    open_order = Some(self.visit_concept_orders[i]);
                }
                VISIT_END_TOKEN => match open_order.take() {
                    Some(order) if order == self.visit_concept_orders[i] => {}
                    Some(_) => {
                        return Err(TimelineError::data_integrity(
                            self.person_id,
                            format!("visit end marker at position {i} closes a different visit"),
                        ));
                    }
                    None => {
                        return Err(TimelineError::data_integrity(
                            self.person_id,
                            format!("unmatched visit end marker at position {i}"),
                        ));
                    }
                },
                _ => {}
            }
        }
        if open_order.is_some() {
            return Err(TimelineError::data_integrity(
                self.person_id,
                "unclosed visit start marker at end of sequence",
            ));
        }
        Ok(())
    }

    /// Slice every token-level array to `[start, end)` and record the window
    ///
    /// Arrays that do not share the token length (e.g. `input_ids` before
    /// tokenization ran) are left empty in the result.
    #[must_use]
    pub fn slice_window(&self, start: usize, end: usize) -> SequenceRecord {
        let n = self.len();
        let take = |v: &Vec<i32>| -> Vec<i32> {
            if v.len() == n { v[start..end].to_vec() } else { Vec::new() }
        };

        SequenceRecord {
            person_id: self.person_id,
            concept_ids: self.concept_ids[start..end].to_vec(),
            orders: take(&self.orders),
            ages: take(&self.ages),
            dates: take(&self.dates),
            visit_segments: take(&self.visit_segments),
            visit_concept_orders: take(&self.visit_concept_orders),
            visit_concept_ids: if self.visit_concept_ids.len() == n {
                self.visit_concept_ids[start..end].to_vec()
            } else {
                Vec::new()
            },
            concept_value_masks: take(&self.concept_value_masks),
            concept_values: if self.concept_values.len() == n {
                self.concept_values[start..end].to_vec()
            } else {
                Vec::new()
            },
            mlm_skip_values: take(&self.mlm_skip_values),
            input_ids: if self.input_ids.len() == n {
                self.input_ids[start..end].to_vec()
            } else {
                Vec::new()
            },
            labels: if self.labels.len() == n {
                self.labels[start..end].to_vec()
            } else {
                Vec::new()
            },
            num_of_concepts: end - start,
            num_of_visits: self.num_of_visits,
            start_index: Some(start),
            end_index: Some(end),
            birth_time: self.birth_time,
            gender: self.gender.clone(),
            race: self.race.clone(),
            index_time: self.index_time,
            age_at_index: self.age_at_index,
            classifier_label: self.classifier_label,
        }
    }
}

/// Per-token attributes for `RecordBuilder::push`
///
/// Defaults carry the sentinel values used by artificial gap tokens, so a
/// caller only names the fields a token actually sets.
#[derive(Debug, Clone)]
pub struct TokenWrite<'a> {
    /// Concept code
    pub code: &'a str,
    /// Visit parity tag
    pub visit_segment: i32,
    /// Calendar-week index since the epoch
    pub date: i32,
    /// Age in completed years
    pub age: i32,
    /// 1-based visit order
    pub visit_concept_order: i32,
    /// Visit-type concept id
    pub visit_concept_id: &'a str,
    /// 1 when the token carries a numeric value
    pub concept_value_mask: i32,
    /// Attached numeric value
    pub concept_value: f64,
    /// 1 when the masked-token objective must skip the token
    pub mlm_skip_value: i32,
}

impl Default for TokenWrite<'_> {
    fn default() -> Self {
        Self {
            code: "",
            visit_segment: 0,
            date: 0,
            age: AGE_SENTINEL,
            visit_concept_order: 0,
            visit_concept_id: "0",
            concept_value_mask: 0,
            concept_value: VALUE_SENTINEL,
            mlm_skip_value: 0,
        }
    }
}

/// Accumulates token positions into local buffers and emits one immutable
/// `SequenceRecord` at completion
#[derive(Debug)]
pub struct RecordBuilder {
    person_id: i64,
    concept_ids: Vec<String>,
    ages: Vec<i32>,
    dates: Vec<i32>,
    visit_segments: Vec<i32>,
    visit_concept_orders: Vec<i32>,
    visit_concept_ids: Vec<String>,
    concept_value_masks: Vec<i32>,
    concept_values: Vec<f64>,
    mlm_skip_values: Vec<i32>,
}

impl RecordBuilder {
    /// Start a record for one patient
    #[must_use]
    pub fn new(person_id: i64) -> Self {
        Self {
            person_id,
            concept_ids: Vec::new(),
            ages: Vec::new(),
            dates: Vec::new(),
            visit_segments: Vec::new(),
            visit_concept_orders: Vec::new(),
            visit_concept_ids: Vec::new(),
            concept_value_masks: Vec::new(),
            concept_values: Vec::new(),
            mlm_skip_values: Vec::new(),
        }
    }

    /// Append one token position
    pub fn push(&mut self, token: TokenWrite<'_>) {
        self.concept_ids.push(token.code.to_string());
        self.ages.push(token.age);
        self.dates.push(token.date);
        self.visit_segments.push(token.visit_segment);
        self.visit_concept_orders.push(token.visit_concept_order);
        self.visit_concept_ids.push(token.visit_concept_id.to_string());
        self.concept_value_masks.push(token.concept_value_mask);
        self.concept_values.push(token.concept_value);
        self.mlm_skip_values.push(token.mlm_skip_value);
    }

    /// Number of positions pushed so far
    #[must_use]
    pub fn len(&self) -> usize {
        self.concept_ids.len()
    }

    /// Whether no positions were pushed yet
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.concept_ids.is_empty()
    }

    /// Finish the record, assigning `orders = 1..=n` and the token count
    pub fn finish(self, num_of_visits: usize) -> Result<SequenceRecord> {
        let n = self.concept_ids.len();
        let record = SequenceRecord {
            person_id: self.person_id,
            concept_ids: self.concept_ids,
            orders: (1..=n as i32).collect(),
            ages: self.ages,
            dates: self.dates,
            visit_segments: self.visit_segments,
            visit_concept_orders: self.visit_concept_orders,
            visit_concept_ids: self.visit_concept_ids,
            concept_value_masks: self.concept_value_masks,
            concept_values: self.concept_values,
            mlm_skip_values: self.mlm_skip_values,
            num_of_concepts: n,
            ..SequenceRecord::default()
        };
        record.validate()?;
        Ok(SequenceRecord {
            num_of_visits,
            ..record
        })
    }
}
