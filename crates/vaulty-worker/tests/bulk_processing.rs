mod helpers;

use bytes::Bytes;
use helpers::{
    envelope, inventory_json, message, CancelAfter, CollectingReporter, FakeArchive, FakeNotifier,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use vaulty_core::models::{InventoryEntry, ItemOutcome, JobKind, LedgerRecord};
use vaulty_core::{ledger_key, NoOpProgressReporter};
use vaulty_db::Ledger;
use vaulty_worker::{
    BulkResultProcessor, CancellationToken, CatalogEntry, CoordinatorConfig, DeleteArchive,
    InventorySweep, ItemRunner, NotificationCoordinator,
};

fn entries(ids: &[&str]) -> Vec<InventoryEntry> {
    ids.iter()
        .map(|id| InventoryEntry {
            archive_id: id.to_string(),
            archive_description: None,
            creation_date: None,
            size: Some(1),
            sha256_tree_hash: None,
        })
        .collect()
}

fn config() -> CoordinatorConfig {
    CoordinatorConfig {
        listen_timeout: Some(Duration::from_secs(2)),
        receive_wait_secs: 0,
        cleanup: false,
    }
}

#[tokio::test]
async fn one_failed_delete_does_not_stop_the_others() {
    let dir = TempDir::new().unwrap();
    let archive = Arc::new(FakeArchive::default());
    archive.delete_failures.lock().unwrap().insert("a-3".to_string());
    let reporter = CollectingReporter::default();

    let ledger = Ledger::open(dir.path().join("delete_vault.db")).await.unwrap();
    let runner = ItemRunner::new("delete", "videos_openhpi", &reporter).with_ledger(&ledger);
    let delete = DeleteArchive::new(archive.clone(), "videos_openhpi");

    let report = BulkResultProcessor::new(runner)
        .process_all(&entries(&["a-1", "a-2", "a-3", "a-4", "a-5"]), &delete)
        .await
        .unwrap();

    assert_eq!(report.processed, 4);
    assert_eq!(report.failed, 1);
    assert_eq!(archive.deleted(), vec!["a-1", "a-2", "a-4", "a-5"]);
    assert_eq!(ledger.len().await.unwrap(), 4);
    assert!(!ledger.has(&ledger_key("a-3")).await.unwrap());

    let reports = reporter.reports();
    assert_eq!(reports.len(), 5);
    assert_eq!(reports[2].id, "a-3");
    assert!(matches!(reports[2].outcome, ItemOutcome::Failed { .. }));
}

#[tokio::test]
async fn already_deleted_archive_counts_as_done() {
    let dir = TempDir::new().unwrap();
    let archive = Arc::new(FakeArchive::default());
    archive.already_deleted.lock().unwrap().insert("a-2".to_string());

    let ledger = Ledger::open(dir.path().join("delete_vault.db")).await.unwrap();
    let runner =
        ItemRunner::new("delete", "videos_openhpi", &NoOpProgressReporter).with_ledger(&ledger);
    let delete = DeleteArchive::new(archive.clone(), "videos_openhpi");

    let report = BulkResultProcessor::new(runner)
        .process_all(&entries(&["a-1", "a-2"]), &delete)
        .await
        .unwrap();

    assert_eq!(report.processed, 1);
    assert_eq!(report.already_gone, 1);
    assert_eq!(report.failed, 0);

    let record = ledger.get(&ledger_key("a-2")).await.unwrap().unwrap();
    assert_eq!(record.remote_result["already_gone"], json!(true));
}

#[tokio::test]
async fn interrupted_delete_resumes_where_it_stopped() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("delete_vault.db");
    let archive = Arc::new(FakeArchive::default());
    let delete = DeleteArchive::new(archive.clone(), "videos_openhpi");

    let ledger = Ledger::open(&path).await.unwrap();
    let runner =
        ItemRunner::new("delete", "videos_openhpi", &NoOpProgressReporter).with_ledger(&ledger);
    BulkResultProcessor::new(runner)
        .process_all(&entries(&["a-1", "a-2"]), &delete)
        .await
        .unwrap();
    ledger.close().await.unwrap();

    let ledger = Ledger::open(&path).await.unwrap();
    let runner =
        ItemRunner::new("delete", "videos_openhpi", &NoOpProgressReporter).with_ledger(&ledger);
    let report = BulkResultProcessor::new(runner)
        .process_all(&entries(&["a-1", "a-2", "a-3"]), &delete)
        .await
        .unwrap();

    assert_eq!(report.skipped, 2);
    assert_eq!(report.processed, 1);
    assert_eq!(archive.deleted(), vec!["a-1", "a-2", "a-3"]);
}

#[tokio::test]
async fn inventory_job_feeds_the_bulk_delete() {
    let dir = TempDir::new().unwrap();
    let archive = Arc::new(FakeArchive::with_job(
        "job-inv",
        inventory_json(&["a-1", "a-2", "a-3"]),
    ));
    let notifier = FakeNotifier::with_batches(vec![vec![message(envelope("job-inv", "Succeeded"), "r-1")]]);

    let ledger = Ledger::open(dir.path().join("delete_vault.db")).await.unwrap();
    let runner =
        ItemRunner::new("delete", "videos_openhpi", &NoOpProgressReporter).with_ledger(&ledger);
    let sweep = InventorySweep::new(runner, DeleteArchive::new(archive.clone(), "videos_openhpi"));

    let coordinator = NotificationCoordinator::new(archive.as_ref(), &notifier, config());
    let job = coordinator
        .run("videos_openhpi", JobKind::InventoryRetrieval, &sweep)
        .await
        .unwrap();

    assert_eq!(job.output.processed, 3);
    assert_eq!(archive.deleted(), vec!["a-1", "a-2", "a-3"]);
    assert_eq!(ledger.len().await.unwrap(), 3);
}

#[tokio::test]
async fn inventory_is_catalogued_into_a_ledger() {
    let dir = TempDir::new().unwrap();
    let archive = FakeArchive::with_job("job-inv", inventory_json(&["a-1", "a-2"]));
    let notifier = FakeNotifier::with_batches(vec![vec![message(envelope("job-inv", "Succeeded"), "r-1")]]);

    let catalog = Ledger::open(dir.path().join("videos_openhpi_inventory.db"))
        .await
        .unwrap();
    let runner =
        ItemRunner::new("inventory", "videos_openhpi", &NoOpProgressReporter).with_ledger(&catalog);
    let sweep = InventorySweep::new(runner, CatalogEntry);

    NotificationCoordinator::new(&archive, &notifier, config())
        .run("videos_openhpi", JobKind::InventoryRetrieval, &sweep)
        .await
        .unwrap();

    let records = catalog.records().await.unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].source_reference, "a-1");
    assert_eq!(records[0].remote_result["ArchiveDescription"], json!("/videos/a-1"));
    assert!(archive.deleted().is_empty());
}

#[tokio::test]
async fn unparsable_inventory_is_a_handler_failure() {
    let dir = TempDir::new().unwrap();
    let archive = FakeArchive::with_job("job-inv", Bytes::from_static(b"<html>"));
    let notifier = FakeNotifier::with_batches(vec![vec![message(envelope("job-inv", "Succeeded"), "r-1")]]);

    let ledger = Ledger::open(dir.path().join("inv.db")).await.unwrap();
    let runner =
        ItemRunner::new("inventory", "videos_openhpi", &NoOpProgressReporter).with_ledger(&ledger);
    let sweep = InventorySweep::new(runner, CatalogEntry);

    let err = NotificationCoordinator::new(&archive, &notifier, config())
        .run("videos_openhpi", JobKind::InventoryRetrieval, &sweep)
        .await
        .unwrap_err();

    assert!(matches!(err, vaulty_core::WorkflowError::Handler(_)));
    assert!(ledger.is_empty().await.unwrap());
}

#[tokio::test]
async fn upload_ledger_replays_into_deletes() {
    let dir = TempDir::new().unwrap();
    let archive = Arc::new(FakeArchive::default());

    let upload_ledger = Ledger::open(dir.path().join("upload_videos.db")).await.unwrap();
    for (video, archive_id) in [("/videos/1", "a-1"), ("/videos/2", "a-2")] {
        upload_ledger
            .put(&LedgerRecord::new(
                ledger_key(video),
                video,
                json!({ "archive_id": archive_id }),
            ))
            .await
            .unwrap();
    }
    upload_ledger
        .put(&LedgerRecord::new(ledger_key("/videos/3"), "/videos/3", json!({})))
        .await
        .unwrap();
    let records = upload_ledger.records().await.unwrap();

    let delete_ledger = Ledger::open(dir.path().join("delete_by_ledger.db")).await.unwrap();
    let runner = ItemRunner::new("delete-by-ledger", "videos_openhpi", &NoOpProgressReporter)
        .with_ledger(&delete_ledger);
    let report = BulkResultProcessor::new(runner)
        .process_all(&records, &DeleteArchive::new(archive.clone(), "videos_openhpi"))
        .await
        .unwrap();

    assert_eq!(archive.deleted(), vec!["a-1", "a-2"]);
    assert_eq!(report.processed, 2);
    // A record without an archive id cannot be undone.
    assert_eq!(report.failed, 1);
    assert!(delete_ledger.has(&ledger_key("a-1")).await.unwrap());
}

#[tokio::test]
async fn cancelled_sweep_keeps_notification_for_a_rerun() {
    let dir = TempDir::new().unwrap();
    let archive = Arc::new(FakeArchive::with_job(
        "job-inv",
        inventory_json(&["a-1", "a-2", "a-3", "a-4", "a-5"]),
    ));
    let notifier = FakeNotifier::with_batches(vec![vec![message(envelope("job-inv", "Succeeded"), "r-1")]]);
    let cancel = CancellationToken::new();
    let reporter = CancelAfter::new(2, cancel.clone());

    let ledger = Ledger::open(dir.path().join("delete_vault.db")).await.unwrap();
    let runner = ItemRunner::new("delete", "videos_openhpi", &reporter)
        .with_ledger(&ledger)
        .with_cancellation(cancel);
    let sweep = InventorySweep::new(runner, DeleteArchive::new(archive.clone(), "videos_openhpi"));

    let err = NotificationCoordinator::new(archive.as_ref(), &notifier, config())
        .run("videos_openhpi", JobKind::InventoryRetrieval, &sweep)
        .await
        .unwrap_err();

    assert!(matches!(err, vaulty_core::WorkflowError::Interrupted { completed: 2, .. }));
    assert_eq!(archive.deleted(), vec!["a-1", "a-2"]);
    assert_eq!(ledger.len().await.unwrap(), 2);
    assert!(notifier.acknowledged().is_empty());
}
