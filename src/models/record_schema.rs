//! Columnar output schema for sequence records
//!
//! The persisted output boundary is columnar: one row per record, with
//! the parallel token arrays stored as list columns. The surrounding
//! pipeline decides file format and batching cadence; this module only
//! provides the Arrow schema and the record-to-batch conversion.

use crate::error::Result;
use crate::models::record::SequenceRecord;
use arrow::array::{
    ArrayRef, Float64Builder, Int32Builder, Int64Builder, ListBuilder, StringBuilder,
};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use std::sync::Arc;

fn list_field(name: &str, item: DataType) -> Field {
    Field::new(name, DataType::List(Arc::new(Field::new("item", item, true))), false)
}

/// Arrow schema of the persisted record batches
#[must_use]
pub fn output_schema() -> Schema {
    Schema::new(vec![
        Field::new("person_id", DataType::Int64, false),
        list_field("concept_ids", DataType::Utf8),
        list_field("ages", DataType::Int32),
        list_field("dates", DataType::Int32),
        list_field("visit_segments", DataType::Int32),
        list_field("visit_concept_orders", DataType::Int32),
        list_field("concept_values", DataType::Float64),
        list_field("concept_value_masks", DataType::Int32),
        list_field("mlm_skip_values", DataType::Int32),
        list_field("input_ids", DataType::Int64),
        list_field("labels", DataType::Int64),
        Field::new("num_of_concepts", DataType::Int64, false),
        Field::new("num_of_visits", DataType::Int64, false),
    ])
}

fn int32_list(records: &[SequenceRecord], get: impl Fn(&SequenceRecord) -> &[i32]) -> ArrayRef {
    let mut builder = ListBuilder::new(Int32Builder::new());
    for record in records {
        builder.values().append_slice(get(record));
        builder.append(true);
    }
    Arc::new(builder.finish())
}

fn int64_list(records: &[SequenceRecord], get: impl Fn(&SequenceRecord) -> &[i64]) -> ArrayRef {
    let mut builder = ListBuilder::new(Int64Builder::new());
    for record in records {
        builder.values().append_slice(get(record));
        builder.append(true);
    }
    Arc::new(builder.finish())
}

/// Convert a batch of records into one Arrow record batch
pub fn records_to_batch(records: &[SequenceRecord]) -> Result<RecordBatch> {
    let mut person_ids = Int64Builder::new();
    let mut concept_ids = ListBuilder::new(StringBuilder::new());
    let mut concept_values = ListBuilder::new(Float64Builder::new());
    let mut num_of_concepts = Int64Builder::new();
    let mut num_of_visits = Int64Builder::new();

    for record in records {
        person_ids.append_value(record.person_id);
        for code in &record.concept_ids {
            concept_ids.values().append_value(code);
        }
        concept_ids.append(true);
        concept_values.values().append_slice(&record.concept_values);
        concept_values.append(true);
        num_of_concepts.append_value(record.num_of_concepts as i64);
        num_of_visits.append_value(record.num_of_visits as i64);
    }

    let columns: Vec<ArrayRef> = vec![
        Arc::new(person_ids.finish()),
        Arc::new(concept_ids.finish()),
        int32_list(records, |r| &r.ages),
        int32_list(records, |r| &r.dates),
        int32_list(records, |r| &r.visit_segments),
        int32_list(records, |r| &r.visit_concept_orders),
        Arc::new(concept_values.finish()),
        int32_list(records, |r| &r.concept_value_masks),
        int32_list(records, |r| &r.mlm_skip_values),
        int64_list(records, |r| &r.input_ids),
        int64_list(records, |r| &r.labels),
        Arc::new(num_of_concepts.finish()),
        Arc::new(num_of_visits.finish()),
    ];
    Ok(RecordBatch::try_new(Arc::new(output_schema()), columns)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{Array, Int64Array, ListArray, StringArray};

    fn record(person_id: i64) -> SequenceRecord {
        SequenceRecord {
            person_id,
            concept_ids: vec!["[VS]".into(), "320128".into(), "[VE]".into()],
            orders: vec![1, 2, 3],
            ages: vec![44, 44, 44],
            dates: vec![2832, 2832, 2832],
            visit_segments: vec![1, 1, 1],
            visit_concept_orders: vec![1, 1, 1],
            visit_concept_ids: vec!["9202".into(); 3],
            concept_value_masks: vec![0, 0, 0],
            concept_values: vec![-1.0, -1.0, -1.0],
            mlm_skip_values: vec![0, 0, 0],
            input_ids: vec![4, 5, 6],
            labels: vec![-100, 5, -100],
            num_of_concepts: 3,
            num_of_visits: 1,
            ..SequenceRecord::default()
        }
    }

    #[test]
    fn test_records_to_batch_shape() {
        let batch = records_to_batch(&[record(1), record(2)]).unwrap();
        assert_eq!(batch.num_rows(), 2);
        assert_eq!(batch.num_columns(), 13);

        let person_ids = batch
            .column(0)
            .as_any()
            .downcast_ref::<Int64Array>()
            .unwrap();
        assert_eq!(person_ids.value(1), 2);
    }

    #[test]
    fn test_concept_ids_round_trip() {
        let batch = records_to_batch(&[record(1)]).unwrap();
        let lists = batch
            .column(1)
            .as_any()
            .downcast_ref::<ListArray>()
            .unwrap();
        let row = lists.value(0);
        let codes = row.as_any().downcast_ref::<StringArray>().unwrap();
        assert_eq!(codes.len(), 3);
        assert_eq!(codes.value(1), "320128");
    }

    #[test]
    fn test_empty_batch() {
        let batch = records_to_batch(&[]).unwrap();
        assert_eq!(batch.num_rows(), 0);
    }
}
