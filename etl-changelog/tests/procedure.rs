use etl_changelog::error::ErrorKind;
use etl_changelog::procedure::{ChangesRequest, GenerateChanges};
use etl_changelog::range::ChangeRangeRequest;
use etl_changelog::registry::memory::MemoryViewRegistry;
use etl_changelog::types::ChangeType;
use etl_config::shared::NormalizationMode;
use etl_telemetry::tracing::init_test_tracing;

use crate::common::{ITEMS_TABLE, item, items_schema, items_source};

mod common;

#[tokio::test(flavor = "multi_thread")]
async fn raw_changelog_is_registered_without_identifier_columns() {
    init_test_tracing();

    let registry = MemoryViewRegistry::new();
    let procedure = GenerateChanges::new(items_source().await, registry.clone());

    let request = ChangesRequest::new(ITEMS_TABLE).with_range(ChangeRangeRequest {
        start_snapshot_id_exclusive: Some(1),
        end_snapshot_id_inclusive: Some(2),
        ..Default::default()
    });
    let view_name = procedure.run(&request).await.unwrap();

    assert_eq!(view_name, "items_changes");
    let view = registry.view(&view_name).await.unwrap();
    assert_eq!(view.schema, items_schema());
    assert_eq!(
        view.records,
        vec![
            item(ChangeType::Delete, 1, "a", 0),
            item(ChangeType::Insert, 1, "a", 0),
            item(ChangeType::Delete, 2, "b", 0),
            item(ChangeType::Insert, 2, "c", 0),
        ]
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn batch_mode_computes_pre_and_post_images() {
    init_test_tracing();

    let registry = MemoryViewRegistry::new();
    let procedure = GenerateChanges::new(items_source().await, registry.clone());

    let request = ChangesRequest::new(ITEMS_TABLE)
        .with_view_name("items_cdc")
        .with_identifier_columns(["id"], NormalizationMode::Batch);
    let view_name = procedure.run(&request).await.unwrap();

    assert_eq!(view_name, "items_cdc");
    let view = registry.view("items_cdc").await.unwrap();
    assert_eq!(
        view.records,
        vec![
            item(ChangeType::Insert, 1, "a", 0),
            item(ChangeType::Insert, 2, "b", 0),
            item(ChangeType::UpdatePreimage, 2, "b", 1),
            item(ChangeType::UpdatePostimage, 2, "c", 1),
            item(ChangeType::Delete, 1, "a", 2),
            item(ChangeType::Insert, 3, "d", 2),
        ]
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn streaming_mode_computes_before_and_after_images() {
    init_test_tracing();

    let registry = MemoryViewRegistry::new();
    let procedure = GenerateChanges::new(items_source().await, registry.clone());

    let request = ChangesRequest::new(ITEMS_TABLE)
        .with_identifier_columns(["id"], NormalizationMode::Streaming);
    let view_name = procedure.run(&request).await.unwrap();

    let view = registry.view(&view_name).await.unwrap();
    assert_eq!(
        view.records,
        vec![
            item(ChangeType::Insert, 1, "a", 0),
            item(ChangeType::Delete, 1, "a", 2),
            item(ChangeType::Insert, 2, "b", 0),
            item(ChangeType::UpdateBefore, 2, "b", 1),
            item(ChangeType::UpdateAfter, 2, "c", 1),
            item(ChangeType::Insert, 3, "d", 2),
        ]
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn timestamp_range_selects_matching_snapshots() {
    init_test_tracing();

    let registry = MemoryViewRegistry::new();
    let procedure = GenerateChanges::new(items_source().await, registry.clone());

    let request = ChangesRequest::new(ITEMS_TABLE)
        .with_range(ChangeRangeRequest {
            start_timestamp_ms: Some(1500),
            end_timestamp_ms: Some(2500),
            ..Default::default()
        })
        .with_identifier_columns(["id"], NormalizationMode::Batch);
    let view_name = procedure.run(&request).await.unwrap();

    let view = registry.view(&view_name).await.unwrap();
    assert_eq!(
        view.records,
        vec![
            item(ChangeType::UpdatePreimage, 2, "b", 0),
            item(ChangeType::UpdatePostimage, 2, "c", 0),
        ]
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn unmatched_time_range_registers_empty_view() {
    init_test_tracing();

    let registry = MemoryViewRegistry::new();
    let procedure = GenerateChanges::new(items_source().await, registry.clone());

    let request = ChangesRequest::new(ITEMS_TABLE).with_range(ChangeRangeRequest {
        start_timestamp_ms: Some(5000),
        ..Default::default()
    });
    let view_name = procedure.run(&request).await.unwrap();

    let view = registry.view(&view_name).await.unwrap();
    assert!(view.records.is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn inverted_time_range_is_rejected() {
    init_test_tracing();

    let registry = MemoryViewRegistry::new();
    let procedure = GenerateChanges::new(items_source().await, registry.clone());

    let request = ChangesRequest::new(ITEMS_TABLE).with_range(ChangeRangeRequest {
        start_timestamp_ms: Some(3000),
        end_timestamp_ms: Some(1000),
        ..Default::default()
    });
    let err = procedure.run(&request).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::ValidationError);
    assert!(registry.views().await.is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn unknown_identifier_column_fails_before_registering() {
    init_test_tracing();

    let registry = MemoryViewRegistry::new();
    let procedure = GenerateChanges::new(items_source().await, registry.clone());

    let request = ChangesRequest::new(ITEMS_TABLE)
        .with_identifier_columns(["id", "missing"], NormalizationMode::Streaming);
    let err = procedure.run(&request).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::ConfigError);
    assert!(registry.views().await.is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn unknown_table_is_reported() {
    init_test_tracing();

    let procedure = GenerateChanges::new(items_source().await, MemoryViewRegistry::new());

    let err = procedure
        .run(&ChangesRequest::new("db.unknown"))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::MissingTable);
}

#[tokio::test(flavor = "multi_thread")]
async fn rerun_replaces_registered_view() {
    init_test_tracing();

    let registry = MemoryViewRegistry::new();
    let procedure = GenerateChanges::new(items_source().await, registry.clone());

    procedure.run(&ChangesRequest::new(ITEMS_TABLE)).await.unwrap();
    let request = ChangesRequest::new(ITEMS_TABLE).with_range(ChangeRangeRequest {
        start_snapshot_id_exclusive: Some(2),
        ..Default::default()
    });
    procedure.run(&request).await.unwrap();

    let views = registry.views().await;
    assert_eq!(views.len(), 1);
    assert_eq!(views["items_changes"].records.len(), 2);
}
