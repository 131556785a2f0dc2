use crate::core::reshape::reshape;
use crate::domain::model::{BulkBatch, PersistOutcome, Window};
use crate::domain::ports::{ArtifactStore, IngestSink, LogSource};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

pub const DEFAULT_RETRY_ATTEMPTS: u32 = 5;
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(3);
pub const DEFAULT_INDEX: &str = "cloudflare";

#[derive(Debug, Clone)]
pub struct WorkerSettings {
    /// Total fetch attempts per window, including the first.
    pub retry_attempts: u32,
    pub retry_delay: Duration,
    pub index: String,
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self {
            retry_attempts: DEFAULT_RETRY_ATTEMPTS,
            retry_delay: DEFAULT_RETRY_DELAY,
            index: DEFAULT_INDEX.to_string(),
        }
    }
}

/// How a window ended. Only logged by the coordinator; tests inspect it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WindowOutcome {
    /// An artifact for this window already exists on disk.
    Skipped,
    FetchExhausted { attempts: u32 },
    /// Shutdown arrived during a retry backoff.
    Abandoned { attempts: u32 },
    Empty,
    Pushed { records: usize },
    PushFailed { records: usize },
}

/// Runs the full lifecycle of one window. Never returns an error: every
/// failure is logged with the window's range and folded into the outcome.
pub struct WindowWorker {
    source: Arc<dyn LogSource>,
    sink: Arc<dyn IngestSink>,
    store: Option<Arc<dyn ArtifactStore>>,
    settings: WorkerSettings,
}

impl WindowWorker {
    pub fn new(
        source: Arc<dyn LogSource>,
        sink: Arc<dyn IngestSink>,
        settings: WorkerSettings,
    ) -> Self {
        Self {
            source,
            sink,
            store: None,
            settings,
        }
    }

    /// Enables local persistence and the duplicate-window check.
    pub fn with_store(mut self, store: Arc<dyn ArtifactStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub async fn process(&self, window: &Window, ct: &CancellationToken) -> WindowOutcome {
        if let Some(store) = &self.store {
            if store.exists(window).await {
                tracing::warn!("{}: Logfile already exists! Skipping.", window);
                return WindowOutcome::Skipped;
            }
        }

        tracing::info!("{}: Requesting logs from Cloudflare...", window);
        let body = match self.fetch_with_retry(window, ct).await {
            Ok(body) => body,
            Err(outcome) => return outcome,
        };

        match &self.store {
            Some(store) => {
                tracing::info!("{}: Logs requested. Saving logs...", window);
                self.persist(store.as_ref(), window, &body).await;
            }
            None => tracing::info!(
                "{}: Logs requested. Raw logs will not be saved on local storage.",
                window
            ),
        }

        tracing::info!("{}: Processing logs for Elasticsearch Bulk tasks.", window);
        let batch = reshape(&body, &self.settings.index);
        drop(body);

        if batch.is_empty() {
            tracing::info!(
                "{}: 0 logs requested from this log range. No further action required.",
                window
            );
            return WindowOutcome::Empty;
        }

        tracing::info!("{}: {} logs processed.", window, batch.records);
        tracing::info!(
            "{}: Pushing {} logs to Elasticsearch...",
            window,
            batch.records
        );
        self.push(window, &batch).await
    }

    async fn fetch_with_retry(
        &self,
        window: &Window,
        ct: &CancellationToken,
    ) -> Result<String, WindowOutcome> {
        let attempts = self.settings.retry_attempts.max(1);

        for attempt in 1..=attempts {
            let failure = match self.source.fetch(window).await {
                Ok(body) => {
                    tracing::debug!(attempt, bytes = body.len(), "{}: Logpull succeeded", window);
                    return Ok(body);
                }
                Err(failure) => failure,
            };

            if attempt == attempts {
                tracing::error!(kind = failure.kind(), attempt, "{}: {}.", window, failure);
                break;
            }

            tracing::error!(
                kind = failure.kind(),
                attempt,
                "{}: {}. Retrying {} of {}...",
                window,
                failure,
                attempt,
                attempts
            );

            tokio::select! {
                biased;
                _ = ct.cancelled() => {
                    tracing::warn!(
                        "{}: Shutdown requested, abandoning remaining {} attempt(s).",
                        window,
                        attempts - attempt
                    );
                    return Err(WindowOutcome::Abandoned { attempts: attempt });
                }
                _ = tokio::time::sleep(self.settings.retry_delay) => {}
            }
        }

        tracing::error!(
            "{}: Failed to request logs after {} attempts. Logs from this range will not be pushed.",
            window,
            attempts
        );
        Err(WindowOutcome::FetchExhausted { attempts })
    }

    async fn persist(&self, store: &dyn ArtifactStore, window: &Window, body: &str) {
        match store.persist(window, body).await {
            Ok(PersistOutcome::Compressed(path)) => tracing::info!(
                "{}: Logs saved and compressed in gzip format: {}",
                window,
                path.display()
            ),
            Ok(PersistOutcome::Uncompressed { raw_path, error }) => tracing::warn!(
                "{}: Logs saved as {} but gzip compression failed: {}",
                window,
                raw_path.display(),
                error
            ),
            Err(e) => tracing::warn!(
                "{}: Failed to save logs to {}: {}",
                window,
                store.artifact_path(window).display(),
                e
            ),
        }
    }

    async fn push(&self, window: &Window, batch: &BulkBatch) -> WindowOutcome {
        match self.sink.push(batch).await {
            Ok(summary) => {
                tracing::info!(
                    "{}: Successfully pushed {} logs to Elasticsearch.",
                    window,
                    batch.records
                );
                if summary.item_failures > 0 {
                    let (kind, reason) = summary.first_item_error.unwrap_or_default();
                    tracing::warn!(
                        "{}: {} of {} logs were rejected. First cause: {} | {}",
                        window,
                        summary.item_failures,
                        batch.records,
                        kind,
                        reason
                    );
                }
                WindowOutcome::Pushed {
                    records: batch.records,
                }
            }
            Err(failure) => {
                tracing::error!("{}: {}", window, failure);
                WindowOutcome::PushFailed {
                    records: batch.records,
                }
            }
        }
    }
}
