use crate::domain::model::{BulkBatch, FetchResult, PersistOutcome, PushResult, Window};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::path::PathBuf;

/// Remote source of raw access logs for a window.
#[async_trait]
pub trait LogSource: Send + Sync {
    /// One request for `[window.start, window.end)`. Retrying is the caller's job.
    async fn fetch(&self, window: &Window) -> FetchResult;
}

/// Bulk ingestion endpoint of the search engine.
#[async_trait]
pub trait IngestSink: Send + Sync {
    async fn push(&self, batch: &BulkBatch) -> PushResult;
}

/// On-disk home for raw window bodies.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    fn artifact_path(&self, window: &Window) -> PathBuf;

    /// Whether this window was already persisted by an earlier run.
    async fn exists(&self, window: &Window) -> bool;

    /// Writes `body` for `window` and compresses it. `Err` means nothing usable
    /// was written.
    async fn persist(&self, window: &Window, body: &str) -> Result<PersistOutcome>;
}
