use crate::utils::logger::LogFormat;
use clap::Parser;
use std::path::PathBuf;

/// Command line flags. Every value is optional here so a TOML file can fill
/// the gaps; [`PusherConfig::resolve`](super::PusherConfig::resolve) applies
/// defaults and reports what is still missing.
#[derive(Debug, Clone, Parser)]
#[command(name = "cf-log-pusher", version, disable_version_flag = true)]
#[command(about = "A utility to pull logs from Cloudflare, process it and push them to Elasticsearch.")]
pub struct CliArgs {
    /// Cloudflare Zone ID
    #[arg(short = 'z', long, env = "CF_ZONE_ID")]
    pub zone: Option<String>,

    /// Cloudflare Access Token
    #[arg(short = 't', long, env = "CF_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Username used to push logs to Elasticsearch
    #[arg(short = 'u', long, env = "ELASTIC_USERNAME")]
    pub username: Option<String>,

    /// Password used to push logs to Elasticsearch
    #[arg(short = 'p', long, env = "ELASTIC_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Port Elasticsearch listens on [default: 9200]
    #[arg(short = 'P', long)]
    pub port: Option<u32>,

    /// Log sampling rate from 0.01 to 1, at most two decimal places [default: 1]
    #[arg(short = 'r', long)]
    pub rate: Option<String>,

    /// Interval between each logpull in seconds [default: 60]
    #[arg(short = 'i', long)]
    pub interval: Option<u64>,

    /// Directory raw logs are stored under [default: /var/log/cf_logs/]
    #[arg(long)]
    pub path: Option<String>,

    /// File name prefix of stored logs [default: cf_logs]
    #[arg(long)]
    pub prefix: Option<String>,

    /// Use the daily ingest pipeline instead of the weekly one
    #[arg(long)]
    pub daily_pipeline: bool,

    /// Do not keep a copy of raw logs on local storage
    #[arg(long)]
    pub no_store: bool,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,

    /// TOML configuration file supplying values not given on the command line
    #[arg(short = 'c', long)]
    pub config: Option<PathBuf>,

    /// Elasticsearch scheme and host [default: http://localhost]
    #[arg(long)]
    pub es_host: Option<String>,

    /// Cloudflare API base URL
    #[arg(long)]
    pub cf_api: Option<String>,

    /// Comma-separated Logpull fields
    #[arg(long, value_delimiter = ',')]
    pub fields: Option<Vec<String>>,

    /// Logpull attempts per window before it is dropped [default: 5]
    #[arg(long)]
    pub retry_attempts: Option<u32>,

    #[arg(long, value_enum)]
    pub log_format: Option<LogFormat>,

    /// Directory of the hourly rotated log file [default: /var/log/cf_elk_push/]
    #[arg(long)]
    pub log_dir: Option<PathBuf>,

    /// Rotated log files to keep [default: 120]
    #[arg(long)]
    pub log_files: Option<usize>,

    /// Log to the console only
    #[arg(long)]
    pub no_log_file: bool,

    /// Print version
    #[arg(short = 'v', long, action = clap::ArgAction::Version)]
    pub version: Option<bool>,
}
