#![allow(dead_code)]

use async_trait::async_trait;
use cf_log_pusher::domain::model::{
    BulkBatch, FetchFailure, FetchResult, PushFailure, PushResult, PushSummary, Window,
};
use cf_log_pusher::domain::ports::{IngestSink, LogSource};
use chrono::{NaiveDate, TimeDelta, TimeZone, Utc};
use std::collections::VecDeque;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

pub fn window_at(hour: u32, minute: u32) -> Window {
    let start = Utc.with_ymd_and_hms(2024, 5, 1, hour, minute, 0).unwrap();
    let label = NaiveDate::from_ymd_opt(2024, 5, 1)
        .unwrap()
        .and_hms_opt(hour, minute, 0)
        .unwrap();
    Window::new(start, TimeDelta::seconds(60), label)
}

pub fn server_error() -> FetchFailure {
    FetchFailure::Opaque {
        status: 500,
        body: "Internal Server Error".to_string(),
    }
}

/// Plays back scripted answers; once the script runs out it repeats `fallback`.
pub struct ScriptedSource {
    script: Mutex<VecDeque<FetchResult>>,
    fallback: FetchResult,
    delay: Duration,
    calls: Mutex<Vec<(Instant, Window)>>,
}

impl ScriptedSource {
    pub fn new(script: Vec<FetchResult>, fallback: FetchResult) -> Self {
        Self {
            script: Mutex::new(script.into()),
            fallback,
            delay: Duration::ZERO,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn always(result: FetchResult) -> Self {
        Self::new(Vec::new(), result)
    }

    /// Every fetch takes `delay` before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub async fn call_count(&self) -> usize {
        self.calls.lock().await.len()
    }

    pub async fn call_times(&self) -> Vec<Instant> {
        self.calls.lock().await.iter().map(|(t, _)| *t).collect()
    }

    pub async fn windows(&self) -> Vec<Window> {
        self.calls.lock().await.iter().map(|(_, w)| w.clone()).collect()
    }
}

#[async_trait]
impl LogSource for ScriptedSource {
    async fn fetch(&self, window: &Window) -> FetchResult {
        self.calls.lock().await.push((Instant::now(), window.clone()));
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let next = self.script.lock().await.pop_front();
        next.unwrap_or_else(|| self.fallback.clone())
    }
}

pub struct RecordingSink {
    batches: Mutex<Vec<BulkBatch>>,
    response: PushResult,
}

impl RecordingSink {
    pub fn accepting() -> Self {
        Self {
            batches: Mutex::new(Vec::new()),
            response: Ok(PushSummary::default()),
        }
    }

    pub fn failing(failure: PushFailure) -> Self {
        Self {
            batches: Mutex::new(Vec::new()),
            response: Err(failure),
        }
    }

    pub async fn batches(&self) -> Vec<BulkBatch> {
        self.batches.lock().await.clone()
    }
}

#[async_trait]
impl IngestSink for RecordingSink {
    async fn push(&self, batch: &BulkBatch) -> PushResult {
        self.batches.lock().await.push(batch.clone());
        self.response.clone()
    }
}
