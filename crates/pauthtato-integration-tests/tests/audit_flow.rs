//! End-to-end audit of a file-backed ledger.
//!
//! Registrations go through the gateway, records are altered on disk, and
//! verification must point at the first damaged block.

#![allow(clippy::unwrap_used)]

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::{Request, StatusCode, header},
};
use http_body_util::BodyExt;
use pauthtato_gateway::{AppState, Registrar, create_router};
use pauthtato_ledger::{
    FileLedgerStore, LedgerError, LedgerStore, StoreError, ViolationKind, verify_store,
};
use pauthtato_test::{TEST_API_KEY, test_appender, test_generator};
use serde_json::{Value, json};
use tower::ServiceExt;

fn record_path(dir: &Path, index: u64) -> PathBuf {
    dir.join(format!("block_{index:020}.json"))
}

async fn open(dir: &Path) -> Arc<FileLedgerStore> {
    Arc::new(FileLedgerStore::open(dir).await.unwrap())
}

async fn register_services(store: Arc<FileLedgerStore>, names: &[&str]) {
    let registrar = Registrar::new(TEST_API_KEY, test_appender(store, 3))
        .with_generator(test_generator(42));
    for &name in names {
        registrar
            .register(Some(TEST_API_KEY), Some(name))
            .await
            .unwrap();
    }
}

/// Rewrite one field of a persisted record, leaving its hash alone.
fn tamper(dir: &Path, index: u64, field: &str, value: Value) {
    let path = record_path(dir, index);
    let mut record: Value = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
    record[field] = value;
    std::fs::write(&path, serde_json::to_vec_pretty(&record).unwrap()).unwrap();
}

#[tokio::test]
async fn test_untouched_file_ledger_verifies() {
    let dir = tempfile::tempdir().unwrap();
    register_services(open(dir.path()).await, &["alpha", "beta", "gamma"]).await;

    let report = verify_store(open(dir.path()).await.as_ref()).await.unwrap();

    assert!(report.valid);
    assert_eq!(report.blocks_verified, 3);
}

#[tokio::test]
async fn test_edited_record_is_hash_mismatch_at_that_index() {
    let dir = tempfile::tempdir().unwrap();
    register_services(open(dir.path()).await, &["a", "b", "c", "d", "e"]).await;

    tamper(dir.path(), 2, "service_name", json!("mallory"));

    let report = verify_store(open(dir.path()).await.as_ref()).await.unwrap();
    let violation = report.violation.unwrap();
    assert!(!report.valid);
    assert_eq!(violation.index, 2);
    assert_eq!(violation.kind, ViolationKind::HashMismatch);
}

#[tokio::test]
async fn test_earliest_tampering_is_reported_first() {
    let dir = tempfile::tempdir().unwrap();
    register_services(open(dir.path()).await, &["a", "b", "c", "d", "e"]).await;

    tamper(dir.path(), 3, "timestamp", json!(1));
    tamper(dir.path(), 1, "public_key", json!("00".repeat(32)));

    let report = verify_store(open(dir.path()).await.as_ref()).await.unwrap();
    let violation = report.violation.unwrap();
    assert_eq!(violation.index, 1);
    assert_eq!(violation.kind, ViolationKind::HashMismatch);
}

#[tokio::test]
async fn test_removed_record_is_index_gap() {
    let dir = tempfile::tempdir().unwrap();
    register_services(open(dir.path()).await, &["a", "b", "c", "d"]).await;

    std::fs::remove_file(record_path(dir.path(), 1)).unwrap();

    let report = verify_store(open(dir.path()).await.as_ref()).await.unwrap();
    let violation = report.violation.unwrap();
    assert_eq!(violation.index, 1);
    assert_eq!(violation.kind, ViolationKind::IndexGap);
}

#[tokio::test]
async fn test_relabelled_record_is_index_gap() {
    let dir = tempfile::tempdir().unwrap();
    register_services(open(dir.path()).await, &["a", "b", "c"]).await;

    tamper(dir.path(), 1, "index", json!(7));

    let report = verify_store(open(dir.path()).await.as_ref()).await.unwrap();
    let violation = report.violation.unwrap();
    assert_eq!(violation.index, 1);
    assert_eq!(violation.kind, ViolationKind::IndexGap);
}

#[tokio::test]
async fn test_recased_identifiers_do_not_verify_clean() {
    let dir = tempfile::tempdir().unwrap();
    register_services(open(dir.path()).await, &["a", "b"]).await;
    let chain = open(dir.path()).await.read_all().await.unwrap();

    for (field, value) in [
        ("uuid", chain[1].data.uuid.hyphenated().to_string().to_uppercase()),
        ("previous_hash", chain[1].previous_hash.to_hex().to_uppercase()),
    ] {
        let original = serde_json::to_value(&chain[1]).unwrap();
        tamper(dir.path(), 1, field, json!(value));

        let err = verify_store(open(dir.path()).await.as_ref())
            .await
            .unwrap_err();
        assert!(
            matches!(err, LedgerError::Store(StoreError::Corrupt(_))),
            "{field}: {err:?}"
        );

        let restore = if field == "uuid" {
            original["uuid"].clone()
        } else {
            original["previousHash"].clone()
        };
        tamper(dir.path(), 1, field, restore);
    }

    assert!(verify_store(open(dir.path()).await.as_ref()).await.unwrap().valid);
}

#[tokio::test]
async fn test_chain_continues_after_restart() {
    let dir = tempfile::tempdir().unwrap();
    register_services(open(dir.path()).await, &["before"]).await;

    let store = open(dir.path()).await;
    register_services(store.clone(), &["after"]).await;

    let chain = store.read_all().await.unwrap();
    assert_eq!(chain.len(), 2);
    assert_eq!(chain[1].index, 1);
    assert_eq!(chain[1].previous_hash, chain[0].compute_hash());
}

#[tokio::test]
async fn test_http_audit_over_file_store() {
    let dir = tempfile::tempdir().unwrap();
    let registrar = Registrar::new(TEST_API_KEY, test_appender(open(dir.path()).await, 3))
        .with_generator(test_generator(7));
    let app = create_router(Arc::new(AppState::new(registrar, Duration::from_secs(5))));

    for service in ["alpha", "beta"] {
        let request = Request::builder()
            .method("POST")
            .uri("/register")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(
                json!({ "apiKey": TEST_API_KEY, "serviceName": service }).to_string(),
            ))
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    tamper(dir.path(), 0, "obkup_id", json!("ff".repeat(32)));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/chain/verify")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let report: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(report["valid"], false);
    assert_eq!(report["violation"]["index"], 0);
    assert_eq!(report["violation"]["kind"], "HashMismatch");
}
