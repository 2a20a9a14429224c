#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use changefinder_core::errors::{ChangeFinderError, ExErrorKind};
use changefinder_core::logging_facility::test_capture::init_test_capture;
use changefinder_core::rule::FnRule;
use changefinder_core::{
    log_op_end, log_op_error, log_op_start, Anomaly, Attribution, AttributionKind,
    NoReferenceData, Pipeline, Rule, RuleOutcome,
};
use changefinder_core_types::schema::{
    EVENT_ANOMALY, EVENT_END, EVENT_END_ERROR, EVENT_FALLBACK, EVENT_RULE_FIRED, EVENT_START,
    FIELD_ANOMALIES_LEN, FIELD_ATTRIBUTIONS_LEN, FIELD_CHANGED_LEN, FIELD_COMPONENT,
    FIELD_DURATION_MS, FIELD_ERR_CODE, FIELD_ERR_KIND, FIELD_RULE, FIELD_RUN_ID,
};
use common::snapshot;
use serde_json::json;
use tracing::Level;

#[test]
fn test_log_op_start_macro() {
    let capture = init_test_capture();
    let op_name = "test_log_op_start_unique_1";

    log_op_start!(op_name);

    capture.assert_event_exists(op_name, EVENT_START);
}

#[test]
fn test_log_op_end_macro() {
    let capture = init_test_capture();
    let op_name = "test_log_op_end_unique_2";

    log_op_end!(op_name, duration_ms = 42);

    let events = capture.events();
    let end_events: Vec<_> = events
        .iter()
        .filter(|e| e.is(op_name, EVENT_END))
        .collect();

    assert_eq!(end_events.len(), 1, "Should have exactly one end event");
    assert_eq!(end_events[0].field(FIELD_DURATION_MS), Some("42"));
}

#[test]
fn test_log_op_error_includes_kind_and_code() {
    let capture = init_test_capture();
    let op_name = "test_log_op_error_unique_3";

    let err = ChangeFinderError::ClaimViolation {
        rule: "r".to_string(),
        field: "f".to_string(),
    };
    log_op_error!(op_name, err, duration_ms = 10);

    let events = capture.events();
    let error_event = events
        .iter()
        .find(|e| e.is(op_name, EVENT_END_ERROR))
        .expect("error event captured");

    assert_eq!(error_event.level, Level::ERROR);
    assert_eq!(
        error_event.field(FIELD_ERR_CODE),
        Some(ExErrorKind::ClaimViolation.code())
    );
    assert_eq!(error_event.field(FIELD_ERR_KIND), Some("ClaimViolation"));
}

#[test]
fn test_pipeline_logs_process_lifecycle_and_fallback() {
    let capture = init_test_capture();
    let entity = "logging-entity-lifecycle";
    let mut pipeline = Pipeline::new(Vec::new(), NoReferenceData);

    pipeline
        .process(snapshot(entity, "2020-08-01T00:00:00Z", json!({"a": 1, "b": 2})))
        .unwrap();

    assert_eq!(capture.entity_events(entity, EVENT_START).len(), 1);

    let end: Vec<_> = capture.entity_events(entity, EVENT_END);
    assert_eq!(end.len(), 1);
    assert_eq!(end[0].field(FIELD_ATTRIBUTIONS_LEN), Some("1"));
    assert_eq!(end[0].field(FIELD_CHANGED_LEN), Some("2"));
    assert_eq!(end[0].field(FIELD_ANOMALIES_LEN), Some("0"));
    assert!(end[0].field(FIELD_COMPONENT).is_some());

    let fallback: Vec<_> = capture.entity_events(entity, EVENT_FALLBACK);
    assert_eq!(fallback.len(), 1);
    assert_eq!(fallback[0].level, Level::INFO);
}

#[test]
fn test_pipeline_logs_rule_firing_and_anomaly() {
    let capture = init_test_capture();
    let entity = "logging-entity-rules";
    let rule: Box<dyn Rule> = Box::new(FnRule::new("flaky_flag", |_ctx, changed| {
        Ok(RuleOutcome::single(Attribution::unknown_time(
            AttributionKind::CreepingDeallergize,
            changed.iter(),
        ))
        .with_anomaly(Anomaly::impossible_transition("flaky_flag", "cleared twice")))
    }));
    let mut pipeline = Pipeline::new(vec![rule], NoReferenceData);

    pipeline
        .process(snapshot(entity, "2020-08-01T00:00:00Z", json!({"flag": false})))
        .unwrap();

    let fired: Vec<_> = capture.entity_events(entity, EVENT_RULE_FIRED);
    assert_eq!(fired.len(), 1);
    assert_eq!(fired[0].level, Level::DEBUG);
    assert_eq!(fired[0].field(FIELD_RULE), Some("flaky_flag"));
    assert_eq!(fired[0].field("kind"), Some("creeping_deallergize"));

    let anomalies: Vec<_> = capture.entity_events(entity, EVENT_ANOMALY);
    assert_eq!(anomalies.len(), 1);
    assert_eq!(anomalies[0].level, Level::WARN);
    assert_eq!(capture.entity_events(entity, EVENT_FALLBACK).len(), 0);
}

#[test]
fn test_pipeline_logs_fatal_error() {
    let capture = init_test_capture();
    let entity = "logging-entity-fatal";
    let mut pipeline = Pipeline::new(Vec::new(), NoReferenceData);
    pipeline
        .process(snapshot(entity, "2020-08-02T00:00:00Z", json!({"a": 1})))
        .unwrap();

    let _ = pipeline.process(snapshot(entity, "2020-08-01T00:00:00Z", json!({"a": 2})));

    let errors: Vec<_> = capture.entity_events(entity, EVENT_END_ERROR);
    assert_eq!(errors.len(), 1);
    assert_eq!(
        errors[0].field(FIELD_ERR_CODE),
        Some(ExErrorKind::OutOfOrderSnapshot.code())
    );
}

#[test]
fn test_pipeline_events_carry_run_id() {
    let capture = init_test_capture();
    let entity = "logging-entity-run-id";
    let rule: Box<dyn Rule> = Box::new(FnRule::new("half_claim", |_ctx, _changed| {
        Ok(RuleOutcome::single(Attribution::unknown_time(
            AttributionKind::CreepingAllergy,
            ["flag"],
        ))
        .with_anomaly(Anomaly::impossible_transition("half_claim", "set twice")))
    }));
    let mut pipeline = Pipeline::new(vec![rule], NoReferenceData);
    let run_id = pipeline.run_id().as_str().to_string();

    pipeline
        .process(snapshot(entity, "2020-08-02T00:00:00Z", json!({"flag": true, "other": 1})))
        .unwrap();
    let _ = pipeline.process(snapshot(entity, "2020-08-01T00:00:00Z", json!({"flag": false})));

    let events = capture.for_entity(entity);
    for event in [
        EVENT_START,
        EVENT_RULE_FIRED,
        EVENT_ANOMALY,
        EVENT_FALLBACK,
        EVENT_END,
        EVENT_END_ERROR,
    ] {
        assert!(
            events.iter().any(|e| e.event.as_deref() == Some(event)),
            "missing {} event",
            event
        );
    }
    assert!(events
        .iter()
        .all(|e| e.field(FIELD_RUN_ID) == Some(run_id.as_str())));
}
