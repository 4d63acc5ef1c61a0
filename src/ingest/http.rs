// src/ingest/http.rs
//! Shared HTTP plumbing for adapters: bounded client, status classification.

use reqwest::{header::RETRY_AFTER, Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;

use crate::error::SourceFetchError;

pub const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko)";

/// Client with a hard per-request timeout. Adapters never retry on their own.
pub fn build_client(timeout: Duration) -> anyhow::Result<Client> {
    let client = Client::builder()
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(10)))
        .user_agent(BROWSER_USER_AGENT)
        .build()?;
    Ok(client)
}

pub fn classify_transport_error(e: reqwest::Error) -> SourceFetchError {
    if e.is_decode() {
        SourceFetchError::Parse(e.to_string())
    } else if e.is_timeout() {
        SourceFetchError::Network(format!("request timed out: {e}"))
    } else {
        SourceFetchError::Network(e.to_string())
    }
}

/// `Retry-After` in delta-seconds form. HTTP-date values are ignored.
pub fn parse_retry_after(resp: &Response) -> Option<Duration> {
    resp.headers()
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

pub fn check_status(resp: &Response) -> Result<(), SourceFetchError> {
    let status = resp.status();
    if status == StatusCode::TOO_MANY_REQUESTS {
        return Err(SourceFetchError::RateLimited {
            retry_after: parse_retry_after(resp),
        });
    }
    if !status.is_success() {
        return Err(SourceFetchError::Network(format!("HTTP {status}")));
    }
    Ok(())
}

/// Send, check status, return the body text.
pub async fn fetch_text(req: RequestBuilder) -> Result<String, SourceFetchError> {
    let resp = req.send().await.map_err(classify_transport_error)?;
    check_status(&resp)?;
    resp.text().await.map_err(classify_transport_error)
}

pub async fn fetch_json<T: DeserializeOwned>(req: RequestBuilder) -> Result<T, SourceFetchError> {
    let body = fetch_text(req).await?;
    serde_json::from_str(body.trim()).map_err(|e| SourceFetchError::Parse(e.to_string()))
}
