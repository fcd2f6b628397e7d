//! Contract Test: Bulk Mutations
//!
//! Constraints verified:
//! - Bulk items run sequentially, one remote call each
//! - A failed item is recorded and never aborts the batch
//! - A total outage still returns a BulkResult (every item failed)
//! - Exactly one store refresh and one selection clear per batch
//! - Non-proxyable or unknown ids are skipped by proxy toggling
//!
//! If this test fails, partial failures are being lost or hidden.

mod common;

use common::*;
use dnsdash_core::traits::Method;
use dnsdash_core::{Operation, OperationState, SyncEventKind};

#[tokio::test]
async fn bulk_delete_isolates_a_failing_item() {
    let gateway = MockGateway::new().with_zone("z1", "example.com", sample_records());
    gateway.fail_id("3", "Record is locked");
    let (engine, _events) = engine_for(&gateway);
    let mut session = session();
    engine.list_records(&mut session, "z1").await.unwrap();

    let result = engine
        .bulk_delete(&mut session, "z1", &ids(&["1", "2", "3", "4", "5"]))
        .await
        .unwrap();

    assert_eq!(result.attempted, 5);
    assert_eq!(result.succeeded, 4);
    assert_eq!(result.failures.len(), 1);
    assert_eq!(result.failures[0].id, "3");
    assert_eq!(result.failures[0].reason, "Record is locked");
    assert_eq!(result.refresh_error, None);

    // The trailing refresh reflects the remote outcome
    let held = store_ids(&session);
    assert_eq!(held.len(), 1);
    assert!(held.contains("3"));
    assert_eq!(gateway.remote_ids("z1"), vec!["3"]);
}

#[tokio::test]
async fn bulk_delete_issues_items_in_order_then_refreshes_once() {
    let gateway = MockGateway::new().with_zone("z1", "example.com", sample_records());
    let (engine, _events) = engine_for(&gateway);
    let mut session = session();
    engine.list_records(&mut session, "z1").await.unwrap();
    let before = gateway.requests().len();

    engine
        .bulk_delete(&mut session, "z1", &ids(&["4", "1", "4", "2"]))
        .await
        .unwrap();

    let calls: Vec<(Method, String)> = gateway.requests()[before..].to_vec();
    let deletes: Vec<&str> = calls
        .iter()
        .filter(|(method, _)| *method == Method::Delete)
        .map(|(_, endpoint)| endpoint.as_str())
        .collect();
    assert_eq!(
        deletes,
        vec![
            "zones/z1/dns_records/4",
            "zones/z1/dns_records/1",
            "zones/z1/dns_records/2",
        ]
    );

    // Two records remain and per_page is 2: one refresh is a single page
    let listings = calls
        .iter()
        .filter(|(method, endpoint)| *method == Method::Get && endpoint.contains("dns_records?"))
        .count();
    assert_eq!(listings, 1);
    assert!(matches!(calls.last(), Some((Method::Get, _))));
}

#[tokio::test]
async fn total_outage_fails_every_item_without_an_error() {
    let gateway = MockGateway::new().with_zone("z1", "example.com", sample_records());
    let (engine, mut events) = engine_for(&gateway);
    let mut session = session();
    engine.list_records(&mut session, "z1").await.unwrap();
    session.store_mut().select("1");
    session.store_mut().select("2");
    drain(&mut events);

    gateway.set_outage(true);
    let selected = session.store().selected_ids();
    let result = engine
        .bulk_delete(&mut session, "z1", &selected)
        .await
        .unwrap();

    assert_eq!(result.attempted, 2);
    assert_eq!(result.succeeded, 0);
    assert_eq!(result.failed(), 2);
    assert!(result.failures.iter().all(|f| f.reason == "connection refused"));
    assert_eq!(result.refresh_error.as_deref(), Some("connection refused"));

    // Selection cleared regardless; the stale snapshot is kept
    assert!(session.store().selection().is_empty());
    assert_eq!(session.store().len(), 5);
    assert!(matches!(
        session.state(),
        OperationState::Failed { operation: Operation::BulkDelete, .. }
    ));

    let failed_items = drain(&mut events)
        .into_iter()
        .filter(|e| matches!(e.kind, SyncEventKind::BulkItemFailed { .. }))
        .count();
    assert_eq!(failed_items, 2);
}

#[tokio::test]
async fn bulk_set_proxied_skips_non_proxyable_records() {
    let gateway = MockGateway::new().with_zone("z1", "example.com", sample_records());
    let (engine, _events) = engine_for(&gateway);
    let mut session = session();
    engine.list_records(&mut session, "z1").await.unwrap();

    let result = engine
        .bulk_set_proxied(
            &mut session,
            "z1",
            &ids(&["1", "2", "3", "4", "5", "missing"]),
            true,
        )
        .await
        .unwrap();

    assert_eq!(result.attempted, 3);
    assert_eq!(result.succeeded, 3);
    assert!(result.failures.is_empty());

    for id in ["1", "2", "3"] {
        assert_eq!(gateway.remote_proxied("z1", id), Some(true));
        assert!(session.store().get(id).unwrap().proxied);
    }
    assert_eq!(gateway.remote_proxied("z1", "4"), Some(false));

    let patches = gateway
        .requests()
        .iter()
        .filter(|(method, _)| *method == Method::Patch)
        .count();
    assert_eq!(patches, 3);
}

#[tokio::test]
async fn bulk_set_proxied_records_item_failures() {
    let gateway = MockGateway::new().with_zone("z1", "example.com", sample_records());
    gateway.fail_id("2", "Proxying is not available for this record");
    let (engine, _events) = engine_for(&gateway);
    let mut session = session();
    engine.list_records(&mut session, "z1").await.unwrap();
    session.store_mut().toggle_all(&ids(&["1", "2"]));
    let selected = session.store().selected_ids();

    let result = engine
        .bulk_set_proxied(&mut session, "z1", &selected, true)
        .await
        .unwrap();

    assert_eq!(result.attempted, 2);
    assert_eq!(result.succeeded, 1);
    assert_eq!(result.failures[0].id, "2");
    assert!(session.store().selection().is_empty());
    assert!(!session.store().get("2").unwrap().proxied);
}

#[tokio::test]
async fn bulk_with_no_items_still_refreshes() {
    let gateway = MockGateway::new().with_zone("z1", "example.com", sample_records());
    let (engine, _events) = engine_for(&gateway);
    let mut session = session();

    let result = engine.bulk_delete(&mut session, "z1", &[]).await.unwrap();
    assert_eq!(result.attempted, 0);
    assert!(result.is_success());
    assert_eq!(session.store().len(), 5);
    assert_eq!(session.active_zone(), Some("z1"));
}

#[tokio::test]
async fn bulk_requires_a_zone() {
    let gateway = MockGateway::new();
    let (engine, _events) = engine_for(&gateway);
    let mut session = session();

    let err = engine
        .bulk_delete(&mut session, " ", &ids(&["1"]))
        .await
        .unwrap_err();
    assert!(matches!(err, dnsdash_core::Error::ValidationFailed(_)));
    assert_eq!(gateway.call_count(), 0);
}
