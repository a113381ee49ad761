//! End-to-end batch behaviour over the in-memory stores.

use async_trait::async_trait;
use snapshelf_core::models::{AuthenticatedUser, SourceFile, UploadStatus};
use snapshelf_core::FileValidator;
use snapshelf_db::{ImageRecordStore, MemoryRecordStore, RecordFeed};
use snapshelf_index::{IndexAck, IndexNotifier, NotificationError};
use snapshelf_storage::MemoryStorage;
use snapshelf_upload::{BatchOrchestrator, UploadError};
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct CountingNotifier {
    calls: Mutex<Vec<Vec<String>>>,
}

#[async_trait]
impl IndexNotifier for CountingNotifier {
    async fn notify_upload(
        &self,
        _user_id: &str,
        urls: &[String],
    ) -> Result<IndexAck, NotificationError> {
        self.calls.lock().unwrap().push(urls.to_vec());
        Ok(IndexAck(serde_json::json!({ "status": "ok" })))
    }
}

struct Harness {
    storage: Arc<MemoryStorage>,
    records: Arc<MemoryRecordStore>,
    notifier: Arc<CountingNotifier>,
    orchestrator: BatchOrchestrator,
}

fn harness() -> Harness {
    let storage = Arc::new(MemoryStorage::new());
    let records = Arc::new(MemoryRecordStore::new());
    let notifier = Arc::new(CountingNotifier::default());
    let orchestrator = BatchOrchestrator::new(storage.clone(), records.clone())
        .with_notifier(notifier.clone());
    Harness {
        storage,
        records,
        notifier,
        orchestrator,
    }
}

fn user() -> AuthenticatedUser {
    AuthenticatedUser::new("uid-42")
}

fn png(name: &str) -> SourceFile {
    SourceFile::new(name, "image/png", vec![0u8; 2048])
}

#[tokio::test]
async fn failures_are_independent() {
    let h = harness();
    // Only the .gif key fails to store.
    h.storage.fail_keys_matching(".gif");

    let batch = h
        .orchestrator
        .prepare(
            Some(&user()),
            vec![SourceFile::new("a.gif", "image/gif", vec![1]), png("b.png")],
        )
        .unwrap();
    let outcome = h.orchestrator.run_batch(&batch).await;

    let snapshots = batch.snapshots();
    assert_eq!(snapshots[0].status, UploadStatus::Error);
    assert!(snapshots[0].error_message.is_some());
    assert!(snapshots[0].result_url.is_none());
    assert_eq!(snapshots[1].status, UploadStatus::Completed);

    assert_eq!(outcome.urls, vec![snapshots[1].result_url.clone().unwrap()]);
    assert_eq!((outcome.completed, outcome.failed), (1, 1));
    assert_eq!(h.records.count(), 1);

    outcome.notification.unwrap().await.unwrap();
    assert_eq!(h.notifier.calls.lock().unwrap().clone(), vec![outcome.urls]);
}

#[tokio::test]
async fn all_failed_batch_never_notifies() {
    let h = harness();
    h.storage.fail_keys_matching("uid-42");

    let batch = h
        .orchestrator
        .prepare(Some(&user()), vec![png("a.png"), png("b.png")])
        .unwrap();
    let outcome = h.orchestrator.run_batch(&batch).await;

    assert!(outcome.urls.is_empty());
    assert_eq!(outcome.failed, 2);
    assert!(outcome.notification.is_none());
    assert!(h.notifier.calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn record_failure_after_storage_is_an_error() {
    let h = harness();
    h.records.fail_file_names_matching("b.png");

    let batch = h
        .orchestrator
        .prepare(Some(&user()), vec![png("a.png"), png("b.png")])
        .unwrap();
    let outcome = h.orchestrator.run_batch(&batch).await;

    let failed = &batch.snapshots()[1];
    assert_eq!(failed.status, UploadStatus::Error);
    assert_eq!(
        failed.error_message.as_deref(),
        Some("Record rejected: Injected failure for b.png")
    );
    assert_eq!(outcome.urls.len(), 1);
    // Both blobs were stored; only one has a record.
    assert_eq!(h.storage.len(), 2);
    assert_eq!(h.records.count(), 1);
}

#[tokio::test]
async fn dismiss_releases_previews_once_after_settle() {
    let h = harness();
    let batch = h
        .orchestrator
        .prepare(Some(&user()), vec![png("a.png"), png("b.png"), png("c.png")])
        .unwrap();
    let previews = h.orchestrator.previews();

    assert_eq!(
        batch.dismiss(),
        Err(UploadError::NotSettled {
            unfinished: 3,
            total: 3
        })
    );
    assert_eq!(previews.live_count(), 3);

    h.orchestrator.run_batch(&batch).await;
    assert!(batch.is_settled());

    assert_eq!(batch.dismiss(), Ok(3));
    assert_eq!(previews.live_count(), 0);
    assert_eq!(previews.released_count(), 3);

    assert_eq!(batch.dismiss(), Ok(0));
    assert_eq!(previews.released_count(), 3);
}

#[tokio::test]
async fn only_accepted_files_reach_the_batch() {
    let h = harness();
    let selection = FileValidator::default().validate(vec![
        png("one.png"),
        SourceFile::new("two.txt", "text/plain", b"notes".to_vec()),
        SourceFile::new("three.jpg", "", vec![0u8; 10]),
    ]);

    assert_eq!(
        selection.error().unwrap().to_string(),
        "Invalid file format: two.txt. Please upload images only."
    );
    assert_eq!(selection.accepted.len(), 2);

    let batch = h
        .orchestrator
        .prepare(Some(&user()), selection.accepted)
        .unwrap();
    let outcome = h.orchestrator.run_batch(&batch).await;

    let names: Vec<_> = batch.snapshots().into_iter().map(|s| s.file_name).collect();
    assert_eq!(names, ["one.png", "three.jpg"]);
    assert_eq!(outcome.completed, 2);
    assert!(h.storage.keys().iter().all(|key| !key.ends_with(".txt")));
}

#[tokio::test]
async fn gallery_feed_sees_batch_records_newest_first() {
    let storage = Arc::new(MemoryStorage::new());
    let feed = Arc::new(RecordFeed::new(Arc::new(MemoryRecordStore::new())));
    let orchestrator = BatchOrchestrator::new(storage, feed.clone());
    let mut subscription = feed.subscribe("uid-42").await.unwrap();
    assert!(subscription.current().is_empty());

    let batch = orchestrator
        .prepare(Some(&user()), vec![png("a.png"), png("b.png")])
        .unwrap();
    orchestrator.run_batch(&batch).await;

    let snapshot = subscription.next().await.unwrap();
    assert_eq!(snapshot.len(), 2);
    assert_eq!(feed.list("uid-42").await.unwrap().len(), 2);
}

#[tokio::test]
async fn progress_reaches_one_hundred_only_on_completion() {
    let h = harness();
    h.storage.fail_keys_matching(".gif");
    let batch = h
        .orchestrator
        .prepare(
            Some(&user()),
            vec![png("a.png"), SourceFile::new("b.gif", "image/gif", vec![1])],
        )
        .unwrap();
    let mut reporter = batch.reporter();

    let watch_progress = async {
        let mut last = vec![0u8; 2];
        while let Some(progress) = reporter.changed().await {
            for (i, task) in progress.tasks.iter().enumerate() {
                assert!(task.progress >= last[i], "progress went backwards");
                if task.progress == 100 {
                    assert_eq!(task.status, UploadStatus::Completed);
                }
                last[i] = task.progress;
            }
        }
        last
    };

    let (_, last) = tokio::join!(h.orchestrator.run_batch(&batch), watch_progress);
    assert_eq!(last[0], 100);
    assert!(last[1] < 100);
    assert!(reporter.current().is_settled);
}
