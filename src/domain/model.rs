use chrono::{DateTime, Local, NaiveDateTime, SecondsFormat, TimeDelta, Utc};
use std::fmt;
use thiserror::Error;

/// A half-open `[start, end)` UTC interval processed as one unit.
///
/// `local_label` is the same instant in local time and is only used to bucket
/// artifacts on disk by date and hour.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Window {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    local_label: NaiveDateTime,
}

impl Window {
    pub fn new(start: DateTime<Utc>, width: TimeDelta, local_label: NaiveDateTime) -> Self {
        Self {
            start,
            end: start + width,
            local_label,
        }
    }

    /// Builds a window labelled with the process's local time zone.
    pub fn local(start: DateTime<Utc>, width: TimeDelta) -> Self {
        let local_label = start.with_timezone(&Local).naive_local();
        Self::new(start, width, local_label)
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    pub fn local_label(&self) -> NaiveDateTime {
        self.local_label
    }

    pub fn width(&self) -> TimeDelta {
        self.end - self.start
    }

    pub fn start_rfc3339(&self) -> String {
        self.start.to_rfc3339_opts(SecondsFormat::Secs, true)
    }

    pub fn end_rfc3339(&self) -> String {
        self.end.to_rfc3339_opts(SecondsFormat::Secs, true)
    }
}

impl fmt::Display for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Log range {} to {}", self.start_rfc3339(), self.end_rfc3339())
    }
}

/// Why a Logpull request did not return HTTP 200.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchFailure {
    #[error("Failed to request logs from Cloudflare with error code {code}: {message}")]
    Api {
        status: u16,
        code: i64,
        message: String,
    },

    #[error("Unknown error occured with error code {status}. Error dump: {body}")]
    Opaque { status: u16, body: String },

    #[error("Connection to Cloudflare failed: {message}")]
    Transport { message: String },
}

impl FetchFailure {
    /// Short classification used in structured log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            FetchFailure::Api { .. } => "api",
            FetchFailure::Opaque { .. } => "opaque",
            FetchFailure::Transport { .. } => "transport",
        }
    }
}

/// Raw NDJSON body on success.
pub type FetchResult = std::result::Result<String, FetchFailure>;

/// Bulk request body: one metadata line followed by one record line, per record.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BulkBatch {
    pub payload: String,
    pub records: usize,
}

impl BulkBatch {
    pub fn is_empty(&self) -> bool {
        self.records == 0
    }
}

/// Why a bulk push did not return HTTP 200.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PushFailure {
    #[error("Failed to push logs with error code {status}. Root cause: {kind} | {reason}")]
    RootCause {
        status: u16,
        kind: String,
        reason: String,
    },

    #[error("Failed to push logs with error code {status}. Root cause: {kind} | {reason}")]
    ItemError {
        status: u16,
        kind: String,
        reason: String,
    },

    #[error("Unexpected error occured with error code {status}. Error dump: {body}")]
    Unexpected { status: u16, body: String },

    #[error("Connection to Elasticsearch failed: {message}")]
    Transport { message: String },
}

/// Details of an accepted (HTTP 200) bulk request.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PushSummary {
    /// Items the engine rejected even though the request as a whole succeeded.
    pub item_failures: usize,
    pub first_item_error: Option<(String, String)>,
}

pub type PushResult = std::result::Result<PushSummary, PushFailure>;

/// What local persistence managed to do with a fetched body.
#[derive(Debug)]
pub enum PersistOutcome {
    Compressed(std::path::PathBuf),
    /// The raw file was written but gzip failed; it stays on disk uncompressed.
    Uncompressed {
        raw_path: std::path::PathBuf,
        error: std::io::Error,
    },
}
