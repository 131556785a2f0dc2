use crate::adapters::endpoint;
use crate::domain::model::{BulkBatch, PushFailure, PushResult, PushSummary};
use crate::domain::ports::IngestSink;
use crate::utils::error::{PusherError, Result};
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use url::Url;

const SERVICE: &str = "Elasticsearch";

/// Bulk writer bound to one ingest pipeline.
#[derive(Debug, Clone)]
pub struct ElasticSink {
    client: Client,
    bulk_url: Url,
    pipeline_url: Url,
    pipeline: String,
    username: String,
    password: String,
}

impl ElasticSink {
    pub fn new(
        client: Client,
        base_url: &str,
        username: &str,
        password: &str,
        pipeline: &str,
    ) -> Result<Self> {
        let mut bulk_url = endpoint(base_url, &["_bulk"])?;
        bulk_url.query_pairs_mut().append_pair("pipeline", pipeline);

        Ok(Self {
            client,
            bulk_url,
            pipeline_url: endpoint(base_url, &["_ingest", "pipeline", pipeline])?,
            pipeline: pipeline.to_string(),
            username: username.to_string(),
            password: password.to_string(),
        })
    }

    pub fn pipeline(&self) -> &str {
        &self.pipeline
    }

    /// Confirms the credentials work and the ingest pipeline is installed.
    pub async fn probe_pipeline(&self) -> Result<()> {
        let response = self
            .client
            .get(self.pipeline_url.clone())
            .basic_auth(&self.username, Some(&self.password))
            .send()
            .await
            .map_err(|e| PusherError::UnreachableError {
                service: SERVICE.to_string(),
                message: e.to_string(),
            })?;

        let status = response.status();
        match status {
            StatusCode::OK => Ok(()),
            StatusCode::UNAUTHORIZED => Err(PusherError::AuthenticationError {
                service: SERVICE.to_string(),
                message: "HTTP 401 Unauthorized".to_string(),
            }),
            StatusCode::NOT_FOUND => Err(PusherError::PipelineMissingError {
                pipeline: self.pipeline.clone(),
            }),
            _ => {
                let body = response.text().await.unwrap_or_default();
                let message = match root_cause(&body) {
                    Some((kind, reason)) => format!("Root cause: {} | {}", kind, reason),
                    None => format!("Error dump: {}", body),
                };
                Err(PusherError::DownstreamError {
                    service: SERVICE.to_string(),
                    status: status.as_u16(),
                    message,
                })
            }
        }
    }
}

#[async_trait]
impl IngestSink for ElasticSink {
    async fn push(&self, batch: &BulkBatch) -> PushResult {
        let response = self
            .client
            .post(self.bulk_url.clone())
            .basic_auth(&self.username, Some(&self.password))
            .header(CONTENT_TYPE, "application/x-ndjson")
            .body(batch.payload.clone())
            .send()
            .await
            .map_err(|e| PushFailure::Transport {
                message: e.to_string(),
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| PushFailure::Transport {
            message: e.to_string(),
        })?;

        if status == StatusCode::OK {
            Ok(summarize_accepted(&body))
        } else {
            Err(classify_failure(status.as_u16(), body))
        }
    }
}

/// `error.root_cause[0].{type,reason}` of an Elasticsearch error body.
fn root_cause(body: &str) -> Option<(String, String)> {
    let value: Value = serde_json::from_str(body).ok()?;
    let cause = value.pointer("/error/root_cause/0")?;
    Some((
        cause.get("type")?.as_str()?.to_string(),
        cause.get("reason")?.as_str()?.to_string(),
    ))
}

/// The `error` object of a bulk item, whatever its action key is.
fn item_error(item: &Value) -> Option<&Value> {
    item.as_object()?.values().find_map(|action| action.get("error"))
}

fn type_and_reason(error: &Value) -> (String, String) {
    let field = |name: &str| {
        error
            .get(name)
            .and_then(Value::as_str)
            .unwrap_or("unknown")
            .to_string()
    };
    (field("type"), field("reason"))
}

/// Reads a non-200 bulk answer into the most specific failure available.
pub fn classify_failure(status: u16, body: String) -> PushFailure {
    if let Some((kind, reason)) = root_cause(&body) {
        return PushFailure::RootCause {
            status,
            kind,
            reason,
        };
    }

    let first_item_error = serde_json::from_str::<Value>(&body).ok().and_then(|value| {
        value.get("errors")?;
        let first = value.pointer("/items/0")?;
        item_error(first).map(type_and_reason)
    });

    match first_item_error {
        Some((kind, reason)) => PushFailure::ItemError {
            status,
            kind,
            reason,
        },
        None => PushFailure::Unexpected { status, body },
    }
}

/// A 200 answer can still carry per-item rejections (`errors: true`).
pub fn summarize_accepted(body: &str) -> PushSummary {
    let Ok(value) = serde_json::from_str::<Value>(body) else {
        return PushSummary::default();
    };
    if value.get("errors").and_then(Value::as_bool) != Some(true) {
        return PushSummary::default();
    }

    let errors: Vec<&Value> = value
        .get("items")
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(item_error).collect())
        .unwrap_or_default();

    PushSummary {
        item_failures: errors.len(),
        first_item_error: errors.first().map(|e| type_and_reason(e)),
    }
}
