pub mod cli;
pub mod toml_config;

use crate::core::worker::{WorkerSettings, DEFAULT_INDEX, DEFAULT_RETRY_ATTEMPTS};
use crate::utils::error::{PusherError, Result};
use crate::utils::logger::{LogFileSettings, LoggerSettings};
use crate::utils::validation::{
    validate_decimal_places, validate_field_names, validate_non_empty_string, validate_path,
    validate_positive_number, validate_range, validate_required_field, validate_url, Validate,
};
use cli::CliArgs;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use toml_config::FileConfig;

pub const DEFAULT_CF_API: &str = "https://api.cloudflare.com/client/v4";
pub const DEFAULT_ES_HOST: &str = "http://localhost";
pub const DEFAULT_ES_PORT: u32 = 9200;
pub const DEFAULT_INTERVAL_SECS: u64 = 60;
pub const MAX_INTERVAL_SECS: u64 = 86_400;
pub const DEFAULT_STORAGE_PATH: &str = "/var/log/cf_logs/";
pub const DEFAULT_FILE_PREFIX: &str = "cf_logs";
pub const DEFAULT_PIPELINE_PREFIX: &str = "cloudflare-pipeline-";
pub const DEFAULT_RETRY_DELAY_SECS: u64 = 3;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 300;
pub const DEFAULT_LOG_DIR: &str = "/var/log/cf_elk_push/";
pub const DEFAULT_LOG_FILES: usize = 120;

/// Logpull fields requested when none are configured.
pub const DEFAULT_FIELDS: &[&str] = &[
    "CacheCacheStatus",
    "CacheResponseBytes",
    "CacheResponseStatus",
    "CacheTieredFill",
    "ClientASN",
    "ClientCountry",
    "ClientDeviceType",
    "ClientIP",
    "ClientIPClass",
    "ClientRequestBytes",
    "ClientRequestHost",
    "ClientRequestMethod",
    "ClientRequestPath",
    "ClientRequestProtocol",
    "ClientRequestReferer",
    "ClientRequestURI",
    "ClientRequestUserAgent",
    "ClientSSLCipher",
    "ClientSSLProtocol",
    "ClientSrcPort",
    "ClientXRequestedWith",
    "EdgeColoCode",
    "EdgeColoID",
    "EdgeEndTimestamp",
    "EdgePathingOp",
    "EdgePathingSrc",
    "EdgePathingStatus",
    "EdgeRateLimitAction",
    "EdgeRateLimitID",
    "EdgeRequestHost",
    "EdgeResponseBytes",
    "EdgeResponseCompressionRatio",
    "EdgeResponseContentType",
    "EdgeResponseStatus",
    "EdgeServerIP",
    "EdgeStartTimestamp",
    "FirewallMatchesActions",
    "FirewallMatchesRuleIDs",
    "FirewallMatchesSources",
    "OriginIP",
    "OriginResponseBytes",
    "OriginResponseHTTPExpires",
    "OriginResponseHTTPLastModified",
    "OriginResponseStatus",
    "OriginResponseTime",
    "OriginSSLProtocol",
    "ParentRayID",
    "RayID",
    "SecurityLevel",
    "WAFAction",
    "WAFFlags",
    "WAFMatchedVar",
    "WAFProfile",
    "WAFRuleID",
    "WAFRuleMessage",
    "WorkerCPUTime",
    "WorkerStatus",
    "WorkerSubrequest",
    "WorkerSubrequestCount",
    "ZoneID",
];

/// Logpull sample rate in hundredths, `1..=100`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleRate(u8);

impl SampleRate {
    pub const FULL: SampleRate = SampleRate(100);

    pub fn hundredths(&self) -> u8 {
        self.0
    }
}

impl Default for SampleRate {
    fn default() -> Self {
        Self::FULL
    }
}

impl FromStr for SampleRate {
    type Err = PusherError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = |reason: &str| PusherError::InvalidConfigValueError {
            field: "--rate".to_string(),
            value: s.to_string(),
            reason: reason.to_string(),
        };

        validate_decimal_places("--rate", s, 2)?;
        let value: f64 = s
            .trim()
            .parse()
            .map_err(|_| invalid("Sample rate must be a number"))?;
        if !(0.01..=1.0).contains(&value) {
            return Err(invalid(
                "Please specify a value between 0.01 and 1, and only two decimal places allowed",
            ));
        }

        Ok(SampleRate((value * 100.0).round() as u8))
    }
}

impl fmt::Display for SampleRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
    }
}

/// Which ingest pipeline the bulk requests go through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PipelineVariant {
    Daily,
    #[default]
    Weekly,
}

impl PipelineVariant {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineVariant::Daily => "daily",
            PipelineVariant::Weekly => "weekly",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageConfig {
    pub path: PathBuf,
    pub prefix: String,
}

/// Fully resolved run configuration; read-only once validated.
#[derive(Debug, Clone)]
pub struct PusherConfig {
    pub zone_id: String,
    pub cf_token: String,
    pub cf_api: String,
    pub sample_rate: SampleRate,
    pub fields: Vec<String>,
    pub es_host: String,
    pub es_port: u32,
    pub es_username: String,
    pub es_password: String,
    pub pipeline: PipelineVariant,
    pub pipeline_prefix: String,
    pub index: String,
    pub interval_secs: u64,
    pub retry_attempts: u32,
    pub retry_delay: Duration,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    /// `None` when raw logs are not kept on disk.
    pub storage: Option<StorageConfig>,
    pub logging: LoggerSettings,
}

/// Logging part of the configuration. Resolved on its own so the logger can
/// start before anything else is validated.
pub fn logger_settings(args: &CliArgs, file: Option<&FileConfig>) -> Result<LoggerSettings> {
    let section = file.map(|f| f.logging.clone()).unwrap_or_default();

    let file_enabled = !args.no_log_file && section.file.unwrap_or(true);
    let file = if file_enabled {
        let max_files = args.log_files.or(section.max_files).unwrap_or(DEFAULT_LOG_FILES);
        validate_positive_number("--log-files", max_files as u64, 1)?;
        Some(LogFileSettings {
            directory: args
                .log_dir
                .clone()
                .or(section.dir.map(PathBuf::from))
                .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_DIR)),
            max_files,
        })
    } else {
        None
    };

    Ok(LoggerSettings {
        debug: args.debug || section.debug.unwrap_or(false),
        format: args.log_format.or(section.format).unwrap_or_default(),
        file,
    })
}

impl PusherConfig {
    /// Merges command line (including environment fallbacks) over the optional
    /// TOML file, then built-in defaults.
    pub fn resolve(args: CliArgs, file: Option<FileConfig>) -> Result<Self> {
        let logging = logger_settings(&args, file.as_ref())?;
        let file = file.unwrap_or_default();
        let cf = file.cloudflare;
        let es = file.elasticsearch;
        let schedule = file.schedule;
        let storage = file.storage;

        let zone_id = validate_required_field("--zone (or CF_ZONE_ID)", args.zone.or(cf.zone_id))?;
        let cf_token = validate_required_field("--token (or CF_TOKEN)", args.token.or(cf.token))?;
        let es_username = validate_required_field(
            "--username (or ELASTIC_USERNAME)",
            args.username.or(es.username),
        )?;
        let es_password = validate_required_field(
            "--password (or ELASTIC_PASSWORD)",
            args.password.or(es.password),
        )?;

        let sample_rate = match args.rate.or_else(|| cf.sample_rate.map(|r| r.to_string())) {
            Some(rate) => rate.parse()?,
            None => SampleRate::default(),
        };

        let fields = args
            .fields
            .or(cf.fields)
            .unwrap_or_else(|| DEFAULT_FIELDS.iter().map(|f| f.to_string()).collect());

        let store_disabled = args.no_store || !storage.enabled.unwrap_or(true);
        let storage = if store_disabled {
            None
        } else {
            Some(StorageConfig {
                path: PathBuf::from(
                    args.path
                        .or(storage.path)
                        .unwrap_or_else(|| DEFAULT_STORAGE_PATH.to_string()),
                ),
                prefix: args
                    .prefix
                    .or(storage.prefix)
                    .unwrap_or_else(|| DEFAULT_FILE_PREFIX.to_string()),
            })
        };

        let pipeline = if args.daily_pipeline || es.daily_pipeline.unwrap_or(false) {
            PipelineVariant::Daily
        } else {
            PipelineVariant::Weekly
        };

        Ok(Self {
            zone_id,
            cf_token,
            cf_api: args
                .cf_api
                .or(cf.api_base)
                .unwrap_or_else(|| DEFAULT_CF_API.to_string()),
            sample_rate,
            fields,
            es_host: args
                .es_host
                .or(es.host)
                .unwrap_or_else(|| DEFAULT_ES_HOST.to_string()),
            es_port: args.port.or(es.port).unwrap_or(DEFAULT_ES_PORT),
            es_username,
            es_password,
            pipeline,
            pipeline_prefix: es
                .pipeline_prefix
                .unwrap_or_else(|| DEFAULT_PIPELINE_PREFIX.to_string()),
            index: es.index.unwrap_or_else(|| DEFAULT_INDEX.to_string()),
            interval_secs: args
                .interval
                .or(schedule.interval_secs)
                .unwrap_or(DEFAULT_INTERVAL_SECS),
            retry_attempts: args
                .retry_attempts
                .or(schedule.retry_attempts)
                .unwrap_or(DEFAULT_RETRY_ATTEMPTS),
            retry_delay: Duration::from_secs(
                schedule.retry_delay_secs.unwrap_or(DEFAULT_RETRY_DELAY_SECS),
            ),
            connect_timeout: Duration::from_secs(
                schedule
                    .connect_timeout_secs
                    .unwrap_or(DEFAULT_CONNECT_TIMEOUT_SECS),
            ),
            request_timeout: Duration::from_secs(
                schedule
                    .request_timeout_secs
                    .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
            ),
            storage,
            logging,
        })
    }

    /// e.g. `cloudflare-pipeline-weekly`
    pub fn pipeline_name(&self) -> String {
        format!("{}{}", self.pipeline_prefix, self.pipeline.as_str())
    }

    /// Elasticsearch base URL with the configured port applied.
    pub fn es_url(&self) -> Result<String> {
        let mut url =
            url::Url::parse(&self.es_host).map_err(|e| PusherError::InvalidConfigValueError {
                field: "--es-host".to_string(),
                value: self.es_host.clone(),
                reason: format!("Invalid URL format: {}", e),
            })?;
        url.set_port(Some(self.es_port as u16))
            .map_err(|_| PusherError::InvalidConfigValueError {
                field: "--es-host".to_string(),
                value: self.es_host.clone(),
                reason: "URL cannot carry a port".to_string(),
            })?;
        Ok(url.to_string())
    }

    pub fn worker_settings(&self) -> WorkerSettings {
        WorkerSettings {
            retry_attempts: self.retry_attempts,
            retry_delay: self.retry_delay,
            index: self.index.clone(),
        }
    }

    pub fn http_client(&self) -> Result<reqwest::Client> {
        let client = reqwest::Client::builder()
            .connect_timeout(self.connect_timeout)
            .timeout(self.request_timeout)
            .user_agent(concat!("cf-log-pusher/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(client)
    }
}

impl Validate for PusherConfig {
    fn validate(&self) -> Result<()> {
        validate_non_empty_string("--zone", &self.zone_id)?;
        validate_non_empty_string("--token", &self.cf_token)?;
        validate_non_empty_string("--username", &self.es_username)?;
        validate_url("--cf-api", &self.cf_api)?;
        validate_url("--es-host", &self.es_host)?;
        validate_range("--port", self.es_port, 1, 65535)?;
        validate_range("--interval", self.interval_secs, 1, MAX_INTERVAL_SECS)?;
        validate_positive_number("--retry-attempts", self.retry_attempts as u64, 1)?;
        validate_non_empty_string("pipeline_prefix", &self.pipeline_prefix)?;
        validate_non_empty_string("index", &self.index)?;

        validate_field_names("--fields", &self.fields)?;

        if let Some(storage) = &self.storage {
            validate_path("--path", &storage.path.to_string_lossy())?;
            validate_non_empty_string("--prefix", &storage.prefix)?;
        }

        if let Some(file) = &self.logging.file {
            validate_path("--log-dir", &file.directory.to_string_lossy())?;
        }

        Ok(())
    }
}
