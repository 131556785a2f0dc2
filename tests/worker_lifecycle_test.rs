mod common;

use cf_log_pusher::domain::model::{FetchFailure, PushFailure};
use cf_log_pusher::domain::ports::ArtifactStore;
use cf_log_pusher::{LocalArtifactStore, WindowOutcome, WindowWorker, WorkerSettings};
use common::{server_error, window_at, RecordingSink, ScriptedSource};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

const BODY: &str = "{\"RayID\":\"a\"}\n\n{\"RayID\":\"b\"}\n\n{\"RayID\":\"c\"}\n";

fn worker(source: &Arc<ScriptedSource>, sink: &Arc<RecordingSink>) -> WindowWorker {
    WindowWorker::new(source.clone(), sink.clone(), WorkerSettings::default())
}

#[tokio::test(start_paused = true)]
async fn test_fetch_succeeds_on_third_attempt() {
    let source = Arc::new(ScriptedSource::new(
        vec![
            Err(server_error()),
            Err(FetchFailure::Api {
                status: 429,
                code: 10000,
                message: "rate limited".to_string(),
            }),
        ],
        Ok(BODY.to_string()),
    ));
    let sink = Arc::new(RecordingSink::accepting());

    let outcome = worker(&source, &sink)
        .process(&window_at(10, 0), &CancellationToken::new())
        .await;

    assert_eq!(outcome, WindowOutcome::Pushed { records: 3 });
    assert_eq!(source.call_count().await, 3);

    let times = source.call_times().await;
    for pair in times.windows(2) {
        assert_eq!(pair[1] - pair[0], Duration::from_secs(3));
    }

    let batches = sink.batches().await;
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].records, 3);
    assert_eq!(batches[0].payload.lines().count(), 6);
}

#[tokio::test(start_paused = true)]
async fn test_exhausted_retries_never_push() {
    let source = Arc::new(ScriptedSource::always(Err(FetchFailure::Transport {
        message: "connection refused".to_string(),
    })));
    let sink = Arc::new(RecordingSink::accepting());
    let settings = WorkerSettings {
        retry_attempts: 4,
        ..WorkerSettings::default()
    };
    let started = tokio::time::Instant::now();

    let outcome = WindowWorker::new(source.clone(), sink.clone(), settings)
        .process(&window_at(10, 1), &CancellationToken::new())
        .await;

    assert_eq!(outcome, WindowOutcome::FetchExhausted { attempts: 4 });
    assert_eq!(source.call_count().await, 4);
    assert!(sink.batches().await.is_empty());
    // Three backoffs between four attempts, none after the last one.
    assert_eq!(started.elapsed(), Duration::from_secs(9));
}

#[tokio::test]
async fn test_empty_body_skips_push() {
    for body in ["", "\n", "\n\n\n"] {
        let source = Arc::new(ScriptedSource::always(Ok(body.to_string())));
        let sink = Arc::new(RecordingSink::accepting());

        let outcome = worker(&source, &sink)
            .process(&window_at(10, 2), &CancellationToken::new())
            .await;

        assert_eq!(outcome, WindowOutcome::Empty);
        assert_eq!(source.call_count().await, 1);
        assert!(sink.batches().await.is_empty());
    }
}

#[tokio::test]
async fn test_only_empty_lines_are_dropped() {
    let source = Arc::new(ScriptedSource::always(Ok(
        "{\"RayID\":\"a\"}\n \n{\"RayID\":\"b\"}\r\n".to_string(),
    )));
    let sink = Arc::new(RecordingSink::accepting());

    let outcome = worker(&source, &sink)
        .process(&window_at(10, 7), &CancellationToken::new())
        .await;

    assert_eq!(outcome, WindowOutcome::Pushed { records: 3 });
    let batches = sink.batches().await;
    let lines: Vec<&str> = batches[0].payload.split('\n').collect();
    assert_eq!(lines[3], " ");
    assert_eq!(lines[5], "{\"RayID\":\"b\"}\r");
}

#[tokio::test]
async fn test_push_failure_is_not_retried() {
    let source = Arc::new(ScriptedSource::always(Ok(BODY.to_string())));
    let sink = Arc::new(RecordingSink::failing(PushFailure::RootCause {
        status: 400,
        kind: "illegal_argument_exception".to_string(),
        reason: "pipeline does not exist".to_string(),
    }));

    let outcome = worker(&source, &sink)
        .process(&window_at(10, 3), &CancellationToken::new())
        .await;

    assert_eq!(outcome, WindowOutcome::PushFailed { records: 3 });
    assert_eq!(source.call_count().await, 1);
    assert_eq!(sink.batches().await.len(), 1);
}

#[tokio::test]
async fn test_existing_artifact_skips_second_run() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(LocalArtifactStore::new(dir.path(), "cf_logs"));
    let source = Arc::new(ScriptedSource::always(Ok(BODY.to_string())));
    let sink = Arc::new(RecordingSink::accepting());
    let window = window_at(10, 4);
    let worker = worker(&source, &sink).with_store(store.clone());

    let first = worker.process(&window, &CancellationToken::new()).await;
    assert_eq!(first, WindowOutcome::Pushed { records: 3 });
    assert!(store.artifact_path(&window).exists());

    let second = worker.process(&window, &CancellationToken::new()).await;
    assert_eq!(second, WindowOutcome::Skipped);
    assert_eq!(source.call_count().await, 1);
    assert_eq!(sink.batches().await.len(), 1);
}

#[tokio::test]
async fn test_persist_failure_still_pushes() {
    let dir = TempDir::new().unwrap();
    // A plain file where the date directory should go makes every write fail.
    let base = dir.path().join("not-a-dir");
    std::fs::write(&base, "occupied").unwrap();

    let store = Arc::new(LocalArtifactStore::new(&base, "cf_logs"));
    let source = Arc::new(ScriptedSource::always(Ok(BODY.to_string())));
    let sink = Arc::new(RecordingSink::accepting());

    let outcome = worker(&source, &sink)
        .with_store(store)
        .process(&window_at(10, 5), &CancellationToken::new())
        .await;

    assert_eq!(outcome, WindowOutcome::Pushed { records: 3 });
    assert_eq!(sink.batches().await.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_during_backoff_abandons_retries() {
    let source = Arc::new(ScriptedSource::always(Err(server_error())));
    let sink = Arc::new(RecordingSink::accepting());
    let ct = CancellationToken::new();

    let canceller = {
        let ct = ct.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(4)).await;
            ct.cancel();
        })
    };

    let outcome = worker(&source, &sink)
        .process(&window_at(10, 6), &ct)
        .await;
    canceller.await.unwrap();

    // Attempts at t=0 and t=3; the backoff started at t=3 is cut short at t=4.
    assert_eq!(outcome, WindowOutcome::Abandoned { attempts: 2 });
    assert_eq!(source.call_count().await, 2);
    assert!(sink.batches().await.is_empty());
}
