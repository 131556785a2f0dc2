// Adapters layer: concrete implementations of the domain ports.

pub mod elastic;
pub mod logpull;
pub mod storage;

use crate::utils::error::{PusherError, Result};
use url::Url;

/// Appends path segments to `base`, escaping each one.
pub(crate) fn endpoint(base: &str, segments: &[&str]) -> Result<Url> {
    let mut url = Url::parse(base).map_err(|e| PusherError::InvalidConfigValueError {
        field: "base_url".to_string(),
        value: base.to_string(),
        reason: format!("Invalid URL format: {}", e),
    })?;

    url.path_segments_mut()
        .map_err(|_| PusherError::ConfigError {
            message: format!("{} cannot be used as a base URL", base),
        })?
        .pop_if_empty()
        .extend(segments);

    Ok(url)
}
