use chrono::{NaiveDate, NaiveDateTime};
use ehr_timeline::models::Event;
use ehr_timeline::timeline::build_patient;

fn dt(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .unwrap()
        .and_hms_opt(h, 0, 0)
        .unwrap()
}

fn demographic_events() -> Vec<Event> {
    vec![
        Event::new("SNOMED/184099003", dt(1980, 4, 14, 0)),
        Event::new("Gender/F", dt(1980, 4, 14, 0)),
        Event::new("Race/White", dt(1980, 4, 14, 0)),
    ]
}

/// An ED registration followed by an admission the next morning and a
/// discharge two days later must come out as a single inpatient stay.
#[test]
fn test_ed_to_admission_stream_becomes_one_stay() {
    let mut events = demographic_events();
    events.extend([
        Event::new("ED_REGISTRATION", dt(2020, 3, 1, 22)),
        Event::new("320128", dt(2020, 3, 1, 23)),
        Event::new("HOSPITAL_ADMISSION//EW EMER.", dt(2020, 3, 2, 8)),
        Event::new("4134120", dt(2020, 3, 3, 9)).with_numeric_value(0.5),
        Event::new("HOSPITAL_DISCHARGE//HOME", dt(2020, 3, 4, 11)),
    ]);

    let patient = build_patient(42, &events, 1, None, None).unwrap();
    assert_eq!(patient.visits.len(), 1);

    let stay = &patient.visits[0];
    assert_eq!(stay.visit_type, "9201");
    assert_eq!(stay.start_time, dt(2020, 3, 1, 22));
    assert_eq!(stay.end_time, dt(2020, 3, 4, 11));
    assert_eq!(stay.discharge_facility.as_deref(), Some("HOME"));
    assert_eq!(stay.events.len(), 5);
    assert_eq!(patient.gender, "Gender/F");
    assert_eq!(patient.race, "Race/White");
}

/// The same ED block must stay a separate visit when the admission
/// arrives more than 24 hours later.
#[test]
fn test_stale_ed_is_not_merged() {
    let mut events = demographic_events();
    events.extend([
        Event::new("ED_REGISTRATION", dt(2020, 3, 1, 6)),
        Event::new("HOSPITAL_ADMISSION", dt(2020, 3, 3, 10)),
        Event::new("HOSPITAL_DISCHARGE//HOME", dt(2020, 3, 4, 11)),
    ]);

    let patient = build_patient(42, &events, 1, None, None).unwrap();
    assert_eq!(patient.visits.len(), 2);
    assert_eq!(patient.visits[0].visit_type, "9203");
    assert_eq!(patient.visits[1].visit_type, "9201");
}

/// A follow-up block within 12 hours of the discharge is folded into
/// the stay; a later one is a fresh outpatient visit.
#[test]
fn test_post_discharge_absorption_window() {
    let mut events = demographic_events();
    events.extend([
        Event::new("HOSPITAL_ADMISSION", dt(2020, 3, 1, 8)),
        Event::new("HOSPITAL_DISCHARGE//HOME", dt(2020, 3, 2, 20)),
        Event::new("320128", dt(2020, 3, 3, 5)),
        Event::new("320128", dt(2020, 3, 10, 9)),
    ]);

    let patient = build_patient(42, &events, 1, None, None).unwrap();
    assert_eq!(patient.visits.len(), 2);
    assert_eq!(patient.visits[0].visit_type, "9201");
    assert_eq!(patient.visits[0].end_time, dt(2020, 3, 3, 5));
    assert_eq!(patient.visits[1].visit_type, "9202");
}

/// With a prediction cutoff, an undischarged admission closes as a
/// partial stay and later events disappear.
#[test]
fn test_prediction_cutoff_closes_open_admission() {
    let mut events = demographic_events();
    events.extend([
        Event::new("320128", dt(2020, 2, 1, 9)),
        Event::new("HOSPITAL_ADMISSION", dt(2020, 3, 1, 8)),
        Event::new("4134120", dt(2020, 3, 2, 9)),
        Event::new("320128", dt(2020, 6, 1, 9)),
    ]);

    let cutoff = dt(2020, 3, 3, 0);
    let patient = build_patient(42, &events, 1, Some(cutoff), Some(1.0)).unwrap();
    assert_eq!(patient.visits.len(), 2);
    assert_eq!(patient.visits[1].visit_type, "9201");
    assert!(patient.visits.iter().all(|v| v.end_time <= cutoff));
    assert_eq!(patient.index_time, Some(cutoff));
    assert_eq!(patient.label, Some(1.0));
    assert_eq!(patient.age_at_index, 39);
}

/// A stream with clinical events but no birth marker is dropped as a
/// data-integrity failure.
#[test]
fn test_missing_birth_event_is_an_error() {
    let events = vec![Event::new("320128", dt(2020, 3, 1, 9))];
    assert!(build_patient(42, &events, 1, None, None).is_err());
}
