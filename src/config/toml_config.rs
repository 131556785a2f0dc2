use crate::utils::error::Result;
use crate::utils::logger::LogFormat;
use regex::Regex;
use serde::Deserialize;
use std::fmt;
use std::path::Path;
use std::sync::OnceLock;

/// Optional TOML configuration file. Every key may be omitted; `${VAR}`
/// references are replaced from the environment before parsing.
///
/// ```toml
/// [cloudflare]
/// zone_id = "${CF_ZONE_ID}"
/// token = "${CF_TOKEN}"
/// sample_rate = 0.5
///
/// [elasticsearch]
/// host = "http://localhost"
/// port = 9200
/// daily_pipeline = true
///
/// [schedule]
/// interval_secs = 60
///
/// [storage]
/// enabled = false
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub cloudflare: CloudflareSection,
    pub elasticsearch: ElasticsearchSection,
    pub schedule: ScheduleSection,
    pub storage: StorageSection,
    pub logging: LoggingSection,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CloudflareSection {
    pub zone_id: Option<String>,
    pub token: Option<String>,
    pub api_base: Option<String>,
    pub sample_rate: Option<RateValue>,
    pub fields: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ElasticsearchSection {
    pub host: Option<String>,
    pub port: Option<u32>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub daily_pipeline: Option<bool>,
    pub pipeline_prefix: Option<String>,
    pub index: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScheduleSection {
    pub interval_secs: Option<u64>,
    pub retry_attempts: Option<u32>,
    pub retry_delay_secs: Option<u64>,
    pub connect_timeout_secs: Option<u64>,
    pub request_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StorageSection {
    pub enabled: Option<bool>,
    pub path: Option<String>,
    pub prefix: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingSection {
    pub debug: Option<bool>,
    pub format: Option<LogFormat>,
    /// Set to `false` to log to the console only.
    pub file: Option<bool>,
    pub dir: Option<String>,
    pub max_files: Option<usize>,
}

/// Sample rates may be written as `0.5` or `"0.5"`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RateValue {
    Number(f64),
    Text(String),
}

impl fmt::Display for RateValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RateValue::Number(n) => write!(f, "{}", n),
            RateValue::Text(s) => f.write_str(s),
        }
    }
}

impl FileConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed = Self::substitute_env_vars(content);
        Ok(toml::from_str(&processed)?)
    }

    /// Replaces `${VAR}` with the variable's value; unknown variables are left as is.
    fn substitute_env_vars(content: &str) -> String {
        static ENV_REF: OnceLock<Regex> = OnceLock::new();
        let re = ENV_REF.get_or_init(|| {
            Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("static regex is valid")
        });

        re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        })
        .into_owned()
    }
}
