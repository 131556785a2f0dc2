use crate::utils::error::{PusherError, Result};
use std::fmt::Display;
use url::Url;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

fn invalid(field: &str, value: impl Display, reason: impl Into<String>) -> PusherError {
    PusherError::InvalidConfigValueError {
        field: field.to_string(),
        value: value.to_string(),
        reason: reason.into(),
    }
}

/// Accepts absolute `http`/`https` URLs only.
pub fn validate_url(field: &str, raw: &str) -> Result<()> {
    if raw.trim().is_empty() {
        return Err(invalid(field, raw, "URL cannot be empty"));
    }

    let url = Url::parse(raw).map_err(|e| invalid(field, raw, format!("Invalid URL format: {}", e)))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(
            field,
            raw,
            format!("Unsupported URL scheme: {}", url.scheme()),
        ));
    }
    Ok(())
}

pub fn validate_path(field: &str, path: &str) -> Result<()> {
    if path.is_empty() {
        Err(invalid(field, path, "Path cannot be empty"))
    } else if path.contains('\0') {
        Err(invalid(field, path.escape_default(), "Path contains null bytes"))
    } else {
        Ok(())
    }
}

pub fn validate_positive_number(field: &str, value: u64, min_value: u64) -> Result<()> {
    if value < min_value {
        return Err(invalid(field, value, format!("Value must be at least {}", min_value)));
    }
    Ok(())
}

/// Turns a value that neither the command line, the environment nor the
/// config file provided into a `MissingConfigError`.
pub fn validate_required_field<T>(field: &str, value: Option<T>) -> Result<T> {
    value.ok_or_else(|| PusherError::MissingConfigError {
        field: field.to_string(),
    })
}

pub fn validate_non_empty_string(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(invalid(field, value, "Value cannot be empty or whitespace-only"));
    }
    Ok(())
}

/// Inclusive on both ends.
pub fn validate_range<T: PartialOrd + Display + Copy>(
    field: &str,
    value: T,
    min: T,
    max: T,
) -> Result<()> {
    if value < min || value > max {
        return Err(invalid(field, value, format!("Value must be between {} and {}", min, max)));
    }
    Ok(())
}

pub fn validate_decimal_places(field: &str, value: &str, max_places: usize) -> Result<()> {
    match value.trim().split_once('.') {
        Some((_, fraction)) if fraction.len() > max_places => Err(invalid(
            field,
            value,
            format!("Only {} decimal places allowed", max_places),
        )),
        _ => Ok(()),
    }
}

/// Logpull rejects the whole request for an empty field name, so catch it
/// before the first window.
pub fn validate_field_names(field: &str, names: &[String]) -> Result<()> {
    if names.is_empty() || names.iter().any(|name| name.trim().is_empty()) {
        return Err(invalid(
            field,
            names.join(","),
            "Field list cannot be empty or contain blank names",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_http_urls_pass() {
        assert!(validate_url("--cf-api", "https://api.cloudflare.com/client/v4").is_ok());
        assert!(validate_url("--es-host", "http://localhost").is_ok());
        assert!(validate_url("--es-host", "  ").is_err());
        assert!(validate_url("--es-host", "localhost:9200").is_err());

        let err = validate_url("--es-host", "ftp://logs.internal").unwrap_err();
        assert!(err.to_string().contains("Unsupported URL scheme: ftp"));
    }

    #[test]
    fn test_interval_must_be_positive() {
        assert!(validate_positive_number("--interval", 60, 1).is_ok());
        assert!(validate_positive_number("--interval", 0, 1).is_err());
    }

    #[test]
    fn test_port_range_is_inclusive() {
        assert!(validate_range("--port", 1u32, 1, 65535).is_ok());
        assert!(validate_range("--port", 65535u32, 1, 65535).is_ok());
        assert!(validate_range("--port", 0u32, 1, 65535).is_err());
        assert!(validate_range("--port", 65536u32, 1, 65535).is_err());
    }

    #[test]
    fn test_sample_rate_decimal_places() {
        for ok in ["1", "0.5", "0.25", " 0.01 "] {
            assert!(validate_decimal_places("--rate", ok, 2).is_ok(), "{}", ok);
        }
        assert!(validate_decimal_places("--rate", "0.125", 2).is_err());
    }

    #[test]
    fn test_missing_credentials_are_reported_by_name() {
        assert_eq!(validate_required_field("--zone", Some("abc")).unwrap(), "abc");

        let err = validate_required_field::<String>("--token (or CF_TOKEN)", None).unwrap_err();
        assert!(matches!(err, PusherError::MissingConfigError { .. }));
        assert!(err.to_string().contains("CF_TOKEN"));
    }

    #[test]
    fn test_storage_path_checks() {
        assert!(validate_path("--path", "/var/log/cf_logs/").is_ok());
        assert!(validate_path("--path", "").is_err());
        assert!(validate_path("--path", "/tmp/\0logs").is_err());
    }

    #[test]
    fn test_field_names() {
        let fields = vec!["RayID".to_string(), "ClientIP".to_string()];
        assert!(validate_field_names("--fields", &fields).is_ok());
        assert!(validate_field_names("--fields", &[]).is_err());
        assert!(validate_field_names("--fields", &["RayID".to_string(), " ".to_string()]).is_err());
    }
}
