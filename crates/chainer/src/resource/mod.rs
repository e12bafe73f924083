// ABOUTME: Page fetching: one GET per page with a browser User-Agent, timing and charset decoding.
// ABOUTME: Transport failures map to fatal ChainError values; there are no retries.

pub mod raw_store;

use std::collections::HashMap;
use std::time::{Duration, Instant};

use bytes::Bytes;
use tracing::debug;

use crate::error::ChainError;

/// Maximum allowed content length (10 MB).
pub const MAX_CONTENT_LENGTH: usize = 10 * 1024 * 1024;

/// Options for fetching pages.
#[derive(Debug, Clone, Default)]
pub struct FetchOptions {
    /// Extra request headers.
    pub headers: HashMap<String, String>,
}

/// A page as it came off the wire.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub status: u16,
    pub url: String,
    pub final_url: String,
    pub content_type: Option<String>,
    pub body: Bytes,
    /// Time from sending the request to the last body byte.
    pub elapsed: Duration,
}

/// Decode body bytes to a String using charset from content-type header or detection.
pub fn decode_body(body: &[u8], content_type: Option<&str>) -> String {
    if let Some(ct) = content_type {
        if let Some(charset) = extract_charset(ct) {
            if let Some(encoding) = encoding_rs::Encoding::for_label(charset.as_bytes()) {
                let (decoded, _, _) = encoding.decode(body);
                return decoded.into_owned();
            }
        }
    }

    let mut detector = chardetng::EncodingDetector::new();
    detector.feed(body, true);
    let encoding = detector.guess(None, true);
    let (decoded, _, _) = encoding.decode(body);
    decoded.into_owned()
}

/// Extract charset value from Content-Type header.
fn extract_charset(content_type: &str) -> Option<String> {
    let lower = content_type.to_lowercase();
    for part in lower.split(';') {
        let trimmed = part.trim();
        if let Some(charset) = trimmed.strip_prefix("charset=") {
            let charset = charset.trim_matches('"').trim_matches('\'');
            return Some(charset.to_string());
        }
    }
    None
}

/// Builds the HTTP client used for a run.
pub fn build_client(user_agent: &str, timeout: Duration) -> Result<reqwest::Client, ChainError> {
    reqwest::Client::builder()
        .user_agent(user_agent)
        .timeout(timeout)
        .gzip(true)
        .brotli(true)
        .deflate(true)
        .build()
        .map_err(|e| {
            ChainError::fetch(
                "",
                "build HTTP client",
                Some(anyhow::anyhow!("failed to build HTTP client: {}", e)),
            )
        })
}

fn transport_error(url: &str, context: &str, err: reqwest::Error) -> ChainError {
    let source = Some(anyhow::anyhow!("{}: {}", context, err));
    if err.is_timeout() {
        ChainError::timeout(url, "Fetch", source)
    } else {
        ChainError::fetch(url, "Fetch", source)
    }
}

/// Fetch one page. Any failure, including a non-2xx status, is fatal to the run.
pub async fn fetch(
    client: &reqwest::Client,
    url: &str,
    opts: &FetchOptions,
) -> Result<FetchedPage, ChainError> {
    if url.is_empty() {
        return Err(ChainError::invalid_url(url, "Fetch", None));
    }

    let parsed_url = url::Url::parse(url).map_err(|e| {
        ChainError::invalid_url(url, "Fetch", Some(anyhow::anyhow!("invalid URL: {}", e)))
    })?;

    let scheme = parsed_url.scheme();
    if scheme != "http" && scheme != "https" {
        return Err(ChainError::invalid_url(
            url,
            "Fetch",
            Some(anyhow::anyhow!("scheme must be http or https")),
        ));
    }

    let started = Instant::now();

    let mut request = client.get(parsed_url);
    for (key, value) in &opts.headers {
        request = request.header(key, value);
    }

    let response = request
        .send()
        .await
        .map_err(|e| transport_error(url, "request failed", e))?;

    let status = response.status().as_u16();
    if !response.status().is_success() {
        return Err(ChainError::status(url, "Fetch", status));
    }

    if let Some(len) = response.content_length() {
        if len as usize > MAX_CONTENT_LENGTH {
            return Err(ChainError::fetch(
                url,
                "Fetch",
                Some(anyhow::anyhow!("content too large")),
            ));
        }
    }

    let final_url = response.url().to_string();
    let content_type = response
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_lowercase());

    let body = response
        .bytes()
        .await
        .map_err(|e| transport_error(url, "failed to read body", e))?;

    if body.len() > MAX_CONTENT_LENGTH {
        return Err(ChainError::fetch(
            url,
            "Fetch",
            Some(anyhow::anyhow!("content too large")),
        ));
    }

    let elapsed = started.elapsed();
    debug!(url, status, bytes = body.len(), ?elapsed, "fetched page");

    Ok(FetchedPage {
        status,
        url: url.to_string(),
        final_url,
        content_type,
        body,
        elapsed,
    })
}
