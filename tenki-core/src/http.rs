//! Small helpers shared by the HTTP clients.

use std::time::Duration;

use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;

use crate::error::FetchError;

const USER_AGENT: &str = concat!("tenki/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT_SECS: u64 = 15;

/// Client used by every HTTP-backed component.
pub fn default_client() -> Client {
    Client::builder()
        .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
        .user_agent(USER_AGENT)
        .build()
        .unwrap_or_else(|e| {
            tracing::warn!("Failed to build configured HTTP client, using defaults: {e}");
            Client::new()
        })
}

/// Sends `request` and decodes a successful JSON body into `T`.
pub(crate) async fn get_json<T: DeserializeOwned>(
    request: RequestBuilder,
    service: &'static str,
) -> Result<T, FetchError> {
    let res = request
        .send()
        .await
        .map_err(|source| FetchError::Request { service, source })?;

    let status = res.status();
    let body = res
        .text()
        .await
        .map_err(|source| FetchError::Request { service, source })?;

    if !status.is_success() {
        return Err(FetchError::Status { service, status, body: truncate_body(&body) });
    }

    serde_json::from_str(&body).map_err(|source| FetchError::Parse { service, source })
}

pub(crate) fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    if body.len() > MAX {
        let mut end = MAX;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &body[..end])
    } else {
        body.to_string()
    }
}
