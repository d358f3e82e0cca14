#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use revkeep_core::errors::RevkeepError;
use revkeep_core::logging_facility::test_capture::init_test_capture;
use revkeep_core::schema::{EVENT_END, EVENT_END_ERROR, EVENT_START};
use revkeep_core::{log_op_end, log_op_error, log_op_start, Record, RecordStore};

#[test]
fn test_log_op_start_and_end_pair() {
    let capture = init_test_capture();
    let op_name = "test_log_op_pair_unique_1";

    log_op_start!(op_name, type_name = "Page");
    log_op_end!(op_name, duration_ms = 42);

    let events = capture.events_for_op(op_name);
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].event.as_deref(), Some(EVENT_START));
    assert_eq!(events[0].field("type_name"), Some("Page"));
    assert_eq!(events[1].event.as_deref(), Some(EVENT_END));
    assert_eq!(events[1].field("duration_ms"), Some("42"));
}

#[test]
fn test_log_op_error_carries_stable_code() {
    let capture = init_test_capture();
    let op_name = "test_log_op_error_unique_2";

    let err = RevkeepError::NotRegistered {
        type_name: "Page".to_string(),
    };
    log_op_error!(op_name, err, duration_ms = 5);

    capture.assert_event_exists(op_name, EVENT_END_ERROR);
    let event = capture
        .events_for_op(op_name)
        .into_iter()
        .find(|e| e.event.as_deref() == Some(EVENT_END_ERROR))
        .expect("Should have error event");
    assert_eq!(event.field("err_code"), Some("ERR_NOT_REGISTERED"));
}

#[test]
fn test_commit_emits_operation_events() {
    let capture = init_test_capture();
    let (mut manager, mut store) = common::setup();

    manager
        .run(&mut store, |m, s| {
            let mut tag = Record::new("Tag").with_field("name", "rust");
            s.save_with(&mut tag, m)
        })
        .unwrap();

    capture.assert_event_exists("commit_revision", EVENT_START);
    capture.assert_event_exists("commit_revision", EVENT_END);
    assert!(!capture.committed_revisions().is_empty());
}

#[test]
fn test_failed_revert_emits_error_event() {
    let capture = init_test_capture();
    let (manager, mut store) = common::setup();
    let registry = manager.registry().clone();

    let result = revkeep_core::revert_revision(
        &registry,
        &mut store,
        &mut revkeep_core::NoHooks,
        revkeep_core::RevisionId::new(404),
        false,
    );
    assert!(result.is_err());

    let errors = capture.count_events(|e| {
        e.op.as_deref() == Some("revert_revision")
            && e.event.as_deref() == Some(EVENT_END_ERROR)
            && e.field("err_code") == Some("ERR_NOT_FOUND")
    });
    assert!(errors >= 1);
}

#[test]
#[should_panic(expected = "Expected event")]
fn test_capture_assert_event_exists_fails_for_missing_event() {
    let capture = init_test_capture();
    capture.assert_event_exists("nonexistent_op_truly_unique_999", EVENT_START);
}
