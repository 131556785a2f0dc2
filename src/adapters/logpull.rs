use crate::adapters::endpoint;
use crate::config::SampleRate;
use crate::domain::model::{FetchFailure, FetchResult, Window};
use crate::domain::ports::LogSource;
use crate::utils::error::{PusherError, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use url::Url;

pub const TIMESTAMP_FORMAT: &str = "rfc3339";

/// Error envelope of the Cloudflare v4 API.
#[derive(Debug, Deserialize)]
struct ApiEnvelope {
    success: Option<bool>,
    #[serde(default)]
    errors: Vec<ApiMessage>,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    code: i64,
    message: String,
}

/// Cloudflare Logpull client for one zone.
#[derive(Debug, Clone)]
pub struct LogpullClient {
    client: Client,
    received_url: Url,
    token: String,
    sample_rate: SampleRate,
    fields: String,
}

impl LogpullClient {
    pub fn new(
        client: Client,
        api_base: &str,
        zone_id: &str,
        token: &str,
        sample_rate: SampleRate,
        fields: &[String],
    ) -> Result<Self> {
        Ok(Self {
            client,
            received_url: endpoint(api_base, &["zones", zone_id, "logs", "received"])?,
            token: token.to_string(),
            sample_rate,
            fields: fields.join(","),
        })
    }

    /// Checks zone id and token before the scheduler starts.
    ///
    /// Cloudflare answers a bad zone or token with a `success:false` JSON
    /// envelope; anything that is not such an envelope counts as accepted.
    pub async fn probe_credentials(&self) -> Result<()> {
        let response = self
            .client
            .get(self.received_url.clone())
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| PusherError::UnreachableError {
                service: "Cloudflare".to_string(),
                message: e.to_string(),
            })?;

        let status = response.status();
        let body = response.text().await?;
        tracing::debug!(%status, "Cloudflare credential probe answered");

        if let Ok(ApiEnvelope {
            success: Some(false),
            errors,
        }) = serde_json::from_str::<ApiEnvelope>(&body)
        {
            let message = errors
                .first()
                .map(|e| format!("{} ({})", e.message, e.code))
                .unwrap_or_else(|| format!("HTTP {}", status.as_u16()));
            return Err(PusherError::AuthenticationError {
                service: "Cloudflare".to_string(),
                message,
            });
        }

        Ok(())
    }
}

#[async_trait]
impl LogSource for LogpullClient {
    async fn fetch(&self, window: &Window) -> FetchResult {
        let query = [
            ("start", window.start_rfc3339()),
            ("end", window.end_rfc3339()),
            ("timestamps", TIMESTAMP_FORMAT.to_string()),
            ("sample", self.sample_rate.to_string()),
            ("fields", self.fields.clone()),
        ];

        let response = self
            .client
            .get(self.received_url.clone())
            .bearer_auth(&self.token)
            .query(&query)
            .send()
            .await
            .map_err(|e| FetchFailure::Transport {
                message: e.to_string(),
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| FetchFailure::Transport {
            message: e.to_string(),
        })?;

        if status == StatusCode::OK {
            return Ok(body);
        }

        Err(classify_failure(status.as_u16(), body))
    }
}

/// Splits non-200 answers into API errors (`success:false`) and everything else.
pub fn classify_failure(status: u16, body: String) -> FetchFailure {
    match serde_json::from_str::<ApiEnvelope>(&body) {
        Ok(ApiEnvelope {
            success: Some(false),
            errors,
        }) => {
            let first = errors.into_iter().next();
            FetchFailure::Api {
                status,
                code: first.as_ref().map(|e| e.code).unwrap_or(status as i64),
                message: first
                    .map(|e| e.message)
                    .unwrap_or_else(|| "no error message".to_string()),
            }
        }
        _ => FetchFailure::Opaque { status, body },
    }
}
