// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;

#[tokio::test]
async fn upsert_then_get_round_trips() {
    let store = InMemoryStore::new();
    store.upsert("requests", "r1", json!({"id": "r1", "status": "QUEUED"})).await;
    let doc = store.get("requests", "r1").await;
    assert_eq!(doc, Some(json!({"id": "r1", "status": "QUEUED"})));
}

#[tokio::test]
async fn upsert_replaces_existing_document() {
    let store = InMemoryStore::new();
    store.upsert("requests", "r1", json!({"status": "QUEUED"})).await;
    store.upsert("requests", "r1", json!({"status": "RUNNING"})).await;
    let doc = store.get("requests", "r1").await;
    assert_eq!(doc, Some(json!({"status": "RUNNING"})));
}

#[tokio::test]
async fn get_missing_id_returns_none() {
    let store = InMemoryStore::new();
    assert_eq!(store.get("requests", "missing").await, None);
    assert_eq!(store.get("missing-collection", "r1").await, None);
}

#[tokio::test]
async fn find_filters_by_dotted_path() {
    let store = InMemoryStore::new();
    store.upsert("requests", "r1", json!({"status": {"code": "QUEUED"}})).await;
    store.upsert("requests", "r2", json!({"status": {"code": "FAILED"}})).await;

    let filter = Filter::new().eq("status.code", "QUEUED");
    let matches = store.find("requests", &filter, &FindOptions::default()).await;
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0]["status"]["code"], "QUEUED");
}

#[tokio::test]
async fn find_with_empty_filter_returns_all() {
    let store = InMemoryStore::new();
    store.upsert("requests", "r1", json!({"n": 1})).await;
    store.upsert("requests", "r2", json!({"n": 2})).await;
    let matches = store.find("requests", &Filter::new(), &FindOptions::default()).await;
    assert_eq!(matches.len(), 2);
}

#[tokio::test]
async fn find_respects_sort_desc_and_limit() {
    let store = InMemoryStore::new();
    store.upsert("requests", "r1", json!({"submitted_at": 1.0})).await;
    store.upsert("requests", "r2", json!({"submitted_at": 3.0})).await;
    store.upsert("requests", "r3", json!({"submitted_at": 2.0})).await;

    let options = FindOptions { limit: Some(2), sort_desc_by: Some("submitted_at".to_owned()) };
    let matches = store.find("requests", &Filter::new(), &options).await;
    assert_eq!(matches.len(), 2);
    assert_eq!(matches[0]["submitted_at"], 3.0);
    assert_eq!(matches[1]["submitted_at"], 2.0);
}

#[tokio::test]
async fn delete_removes_document_and_reports_result() {
    let store = InMemoryStore::new();
    store.upsert("requests", "r1", json!({"n": 1})).await;
    assert!(store.delete("requests", "r1").await);
    assert!(!store.delete("requests", "r1").await);
    assert_eq!(store.get("requests", "r1").await, None);
}

#[tokio::test]
async fn delete_on_missing_collection_returns_false() {
    let store = InMemoryStore::new();
    assert!(!store.delete("missing-collection", "r1").await);
}
