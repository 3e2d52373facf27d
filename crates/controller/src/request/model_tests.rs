// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;

#[test]
fn new_request_starts_ok_and_not_terminal_message() {
    let req = Request::new(RequestKind::Experiment, json!({"a": 1}), json!({}), None, 1.0);
    assert_eq!(req.status.code, Code::Ok);
    assert!(req.errors.is_empty());
    assert_eq!(req.created_at, req.updated_at);
}

#[test]
fn caller_supplied_id_is_preserved() {
    let req = Request::new(RequestKind::Protocol, json!({}), json!({}), Some("rid-1".to_owned()), 1.0);
    assert_eq!(req.id, "rid-1");
}

#[test]
fn update_status_with_error_appends_to_errors_and_bumps_updated_at() {
    let mut req = Request::new(RequestKind::Experiment, json!({}), json!({}), None, 1.0);
    req.update_status(Code::Failed, Some("boom"), 2.0);
    assert_eq!(req.status.code, Code::Failed);
    assert_eq!(req.updated_at, 2.0);
    assert_eq!(req.errors.len(), 1);
    assert_eq!(req.errors[0].message, "boom");
}

#[test]
fn update_status_without_error_does_not_append() {
    let mut req = Request::new(RequestKind::Experiment, json!({}), json!({}), None, 1.0);
    req.update_status(Code::Running, None, 2.0);
    assert!(req.errors.is_empty());
}

#[test]
fn to_document_round_trips_through_from_document() -> anyhow::Result<()> {
    let mut req = Request::new(RequestKind::Calibration, json!({"x": 1}), json!({"y": 2}), Some("rid-2".to_owned()), 1.0);
    req.update_status(Code::Running, None, 2.0);
    req.add_result("k", json!(42));

    let doc = req.to_document();
    let restored = Request::from_document(doc)?;
    assert_eq!(restored.id, "rid-2");
    assert_eq!(restored.kind, RequestKind::Calibration);
    assert_eq!(restored.status.code, Code::Running);
    assert_eq!(restored.result["k"], json!(42));
    assert!(restored.custom_func.is_none());
    Ok(())
}

#[test]
fn normalize_bool() {
    assert_eq!(RawOutcome::Bool(true).normalize(), Code::Ok);
    assert_eq!(RawOutcome::Bool(false).normalize(), Code::Failed);
}

#[test]
fn normalize_int() {
    assert_eq!(RawOutcome::Int(0).normalize(), Code::Ok);
    assert_eq!(RawOutcome::Int(1).normalize(), Code::Failed);
    assert_eq!(RawOutcome::Int(-1).normalize(), Code::Failed);
}

#[test]
fn normalize_str_matches_case_insensitively() {
    assert_eq!(RawOutcome::Str("ok".to_owned()).normalize(), Code::Ok);
    assert_eq!(RawOutcome::Str("Queued".to_owned()).normalize(), Code::Queued);
    assert_eq!(RawOutcome::Str("nonsense".to_owned()).normalize(), Code::Failed);
}

#[test]
fn normalize_null_is_ok() {
    assert_eq!(RawOutcome::Null.normalize(), Code::Ok);
}

#[test]
fn normalize_code_passthrough() {
    assert_eq!(RawOutcome::Code(Code::Timeout).normalize(), Code::Timeout);
}
