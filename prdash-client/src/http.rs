//! Plumbing shared by the REST and GraphQL clients.

use crate::config::ClientSettings;
use crate::error::{ClientError, ClientResult};
use reqwest::header::HeaderMap;

pub(crate) fn build_http_client(settings: &ClientSettings) -> ClientResult<reqwest::Client> {
    let client = reqwest::Client::builder()
        .timeout(settings.request_timeout)
        .user_agent(concat!("prdash/", env!("CARGO_PKG_VERSION")))
        .build()?;
    Ok(client)
}

/// `https://` unless the host already names a scheme; no trailing slash.
pub(crate) fn with_scheme(host: &str) -> String {
    let host = host.trim().trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("https://{}", host)
    }
}

pub(crate) fn status_error(provider: &'static str, response: &reqwest::Response) -> ClientError {
    ClientError::Status {
        provider,
        status: response.status(),
        retry_after_ms: parse_retry_after_ms(response.headers()),
    }
}

fn parse_retry_after_ms(headers: &HeaderMap) -> Option<u64> {
    headers
        .get("retry-after")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<f64>().ok())
        .filter(|seconds| *seconds >= 0.0)
        .map(|seconds| (seconds * 1000.0) as u64)
}
