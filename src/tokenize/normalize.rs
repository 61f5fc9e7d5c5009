//! Chronological re-sort of a tokenized record
//!
//! Upstream windowing can leave the parallel arrays out of emission order.
//! The normalizer re-sorts every token-level array by the record's order
//! column (falling back to the week index when orders are absent), with
//! the concept code as tie-breaker.

use crate::models::record::SequenceRecord;

fn permute<T: Clone>(values: &[T], index: &[usize]) -> Vec<T> {
    if values.len() == index.len() {
        index.iter().map(|&i| values[i].clone()).collect()
    } else {
        values.to_vec()
    }
}

/// Re-sort a record's token arrays into chronological order
///
/// Sorts by `orders` when present, otherwise by `dates`; ties are broken
/// by the concept code, and equal keys keep their relative order. Records
/// without either column are returned unchanged. Applying the normalizer
/// twice yields the same record as applying it once.
#[must_use]
pub fn sort_patient_sequence(record: SequenceRecord) -> SequenceRecord {
    let n = record.len();
    let keys: &[i32] = if record.orders.len() == n && n > 0 {
        &record.orders
    } else if record.dates.len() == n && n > 0 {
        &record.dates
    } else {
        return record;
    };

    let mut index: Vec<usize> = (0..n).collect();
    index.sort_by(|&a, &b| {
        keys[a]
            .cmp(&keys[b])
            .then_with(|| record.concept_ids[a].cmp(&record.concept_ids[b]))
    });
    if index.iter().enumerate().all(|(i, &j)| i == j) {
        return record;
    }

    SequenceRecord {
        concept_ids: permute(&record.concept_ids, &index),
        orders: permute(&record.orders, &index),
        ages: permute(&record.ages, &index),
        dates: permute(&record.dates, &index),
        visit_segments: permute(&record.visit_segments, &index),
        visit_concept_orders: permute(&record.visit_concept_orders, &index),
        visit_concept_ids: permute(&record.visit_concept_ids, &index),
        concept_value_masks: permute(&record.concept_value_masks, &index),
        concept_values: permute(&record.concept_values, &index),
        mlm_skip_values: permute(&record.mlm_skip_values, &index),
        input_ids: permute(&record.input_ids, &index),
        labels: permute(&record.labels, &index),
        ..record
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shuffled_record() -> SequenceRecord {
        SequenceRecord {
            person_id: 1,
            concept_ids: vec!["c".into(), "a".into(), "b".into()],
            orders: vec![3, 1, 2],
            ages: vec![32, 30, 31],
            dates: vec![300, 100, 200],
            visit_segments: vec![2, 1, 1],
            visit_concept_orders: vec![2, 1, 1],
            visit_concept_ids: vec!["9201".into(), "9202".into(), "9202".into()],
            concept_value_masks: vec![0, 0, 1],
            concept_values: vec![-1.0, -1.0, 0.5],
            mlm_skip_values: vec![0, 0, 1],
            num_of_concepts: 3,
            ..SequenceRecord::default()
        }
    }

    #[test]
    fn test_sorts_by_order_column() {
        let record = sort_patient_sequence(shuffled_record());
        assert_eq!(record.orders, vec![1, 2, 3]);
        assert_eq!(record.concept_ids, vec!["a", "b", "c"]);
        assert_eq!(record.ages, vec![30, 31, 32]);
        assert_eq!(record.concept_values, vec![-1.0, 0.5, -1.0]);
    }

    #[test]
    fn test_falls_back_to_dates() {
        let mut record = shuffled_record();
        record.orders = Vec::new();
        let sorted = sort_patient_sequence(record);
        assert_eq!(sorted.dates, vec![100, 200, 300]);
        assert_eq!(sorted.concept_ids, vec!["a", "b", "c"]);
        // orders stay absent rather than being invented
        assert!(sorted.orders.is_empty());
    }

    #[test]
    fn test_idempotent() {
        let once = sort_patient_sequence(shuffled_record());
        let twice = sort_patient_sequence(once.clone());
        assert_eq!(once.concept_ids, twice.concept_ids);
        assert_eq!(once.orders, twice.orders);
        assert_eq!(once.dates, twice.dates);
    }

    #[test]
    fn test_empty_record_unchanged() {
        let record = sort_patient_sequence(SequenceRecord::default());
        assert!(record.is_empty());
    }
}
