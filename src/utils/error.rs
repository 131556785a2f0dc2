use thiserror::Error;

/// Fatal errors: configuration, startup probes and local plumbing.
///
/// Per-window failures never surface as `PusherError`; see
/// [`FetchFailure`](crate::domain::model::FetchFailure) and
/// [`PushFailure`](crate::domain::model::PushFailure).
#[derive(Error, Debug)]
pub enum PusherError {
    #[error("HTTP request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Failed to authenticate with {service}: {message}")]
    AuthenticationError { service: String, message: String },

    #[error("Ingest pipeline '{pipeline}' is not installed in Elasticsearch")]
    PipelineMissingError { pipeline: String },

    #[error("{service} returned error code {status}: {message}")]
    DownstreamError {
        service: String,
        status: u16,
        message: String,
    },

    #[error("Unable to connect to {service}: {message}")]
    UnreachableError { service: String, message: String },
}

impl PusherError {
    /// Process exit code for a fatal error.
    ///
    /// `2` covers invalid invocation and credential problems, `1` covers
    /// downstream configuration and runtime errors.
    pub fn exit_code(&self) -> i32 {
        match self {
            PusherError::ConfigError { .. }
            | PusherError::InvalidConfigValueError { .. }
            | PusherError::MissingConfigError { .. }
            | PusherError::TomlError(_)
            | PusherError::AuthenticationError { .. }
            | PusherError::UnreachableError { .. } => 2,
            PusherError::ApiError(_)
            | PusherError::IoError(_)
            | PusherError::SerializationError(_)
            | PusherError::PipelineMissingError { .. }
            | PusherError::DownstreamError { .. } => 1,
        }
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            PusherError::MissingConfigError { field } => format!(
                "Pass {} on the command line or set the matching environment variable",
                field
            ),
            PusherError::InvalidConfigValueError { field, .. } => {
                format!("Check the value given for {}", field)
            }
            PusherError::ConfigError { .. } | PusherError::TomlError(_) => {
                "Check the configuration file syntax and values".to_string()
            }
            PusherError::AuthenticationError { service, .. } if service == "Cloudflare" => {
                "Check your Zone ID and Cloudflare Access Token".to_string()
            }
            PusherError::AuthenticationError { .. } => {
                "Check your Elasticsearch username and password".to_string()
            }
            PusherError::PipelineMissingError { .. } => {
                "Install the ingest pipeline in Elasticsearch before starting".to_string()
            }
            PusherError::UnreachableError { .. } => {
                "Check whether the port number is correct and the server is up and running"
                    .to_string()
            }
            PusherError::DownstreamError { .. } | PusherError::ApiError(_) => {
                "Inspect the Elasticsearch logs for the root cause".to_string()
            }
            PusherError::IoError(_) | PusherError::SerializationError(_) => {
                "Check file permissions and available disk space".to_string()
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, PusherError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes_split_invocation_from_downstream() {
        let missing = PusherError::MissingConfigError {
            field: "--zone".to_string(),
        };
        assert_eq!(missing.exit_code(), 2);

        let auth = PusherError::AuthenticationError {
            service: "Elasticsearch".to_string(),
            message: "401".to_string(),
        };
        assert_eq!(auth.exit_code(), 2);

        let pipeline = PusherError::PipelineMissingError {
            pipeline: "cloudflare-pipeline-weekly".to_string(),
        };
        assert_eq!(pipeline.exit_code(), 1);
        assert!(pipeline.to_string().contains("cloudflare-pipeline-weekly"));
    }

    #[test]
    fn test_recovery_suggestion_names_service() {
        let cf = PusherError::AuthenticationError {
            service: "Cloudflare".to_string(),
            message: "invalid token".to_string(),
        };
        assert!(cf.recovery_suggestion().contains("Cloudflare Access Token"));
    }
}
