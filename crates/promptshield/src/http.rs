//! Shared outbound HTTP client for provider calls.

use std::time::{Duration, Instant};

use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::Url;

use crate::error::{Error, Result};

const MAX_RESPONSE_BYTES: usize = 10_485_760; // 10MB
const ERROR_BODY_PREVIEW_CHARS: usize = 256;

/// Thin wrapper over one pooled `reqwest::Client` shared by every adapter.
///
/// All provider traffic goes through [`HttpClient::post_json`], which owns the
/// per-call timeout, the response size cap, and log redaction. Query strings
/// carry credentials for some providers and never reach the logs.
#[derive(Clone)]
pub struct HttpClient {
    client: reqwest::Client,
}

impl HttpClient {
    pub fn new() -> Self {
        let client = match reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
        {
            Ok(client) => client,
            Err(e) => {
                tracing::warn!(error = %e, "failed to build reqwest client; falling back to default client");
                reqwest::Client::new()
            }
        };
        Self { client }
    }

    /// POST a JSON body and decode a JSON reply. Anything but a 200 with a
    /// decodable body is a typed error; error bodies are truncated before
    /// they reach the error value.
    pub async fn post_json(
        &self,
        model: &str,
        url: &str,
        mut headers: HeaderMap,
        body: serde_json::Value,
        timeout: Duration,
    ) -> Result<serde_json::Value> {
        let url =
            Url::parse(url).map_err(|e| Error::Config(format!("invalid endpoint url: {e}")))?;
        let redacted = redact_url(&url);

        if !headers.contains_key(CONTENT_TYPE) {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        }

        let start = Instant::now();
        tracing::debug!(model, url = %redacted, "provider request");

        let resp = self
            .client
            .post(url)
            .headers(headers)
            .json(&body)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| {
                tracing::warn!(
                    model,
                    url = %redacted,
                    duration_ms = start.elapsed().as_millis() as u64,
                    error = %e,
                    "provider request failed"
                );
                if e.is_timeout() {
                    Error::Timeout
                } else {
                    Error::Request(e.to_string())
                }
            })?;

        let status = resp.status().as_u16();

        let bytes = resp.bytes().await.map_err(|e| {
            if e.is_timeout() {
                Error::Timeout
            } else {
                Error::Request(format!("read response: {e}"))
            }
        })?;

        if bytes.len() > MAX_RESPONSE_BYTES {
            return Err(Error::Decode(format!(
                "response too large ({} bytes)",
                bytes.len()
            )));
        }

        if status != 200 {
            let preview: String = String::from_utf8_lossy(&bytes)
                .chars()
                .take(ERROR_BODY_PREVIEW_CHARS)
                .collect();
            tracing::warn!(model, url = %redacted, status, "provider returned non-success status");
            return Err(Error::ProviderStatus {
                status,
                body: preview,
            });
        }

        let json: serde_json::Value = serde_json::from_slice(&bytes)
            .map_err(|e| Error::Decode(format!("parse json: {e}")))?;

        tracing::debug!(
            model,
            url = %redacted,
            status,
            duration_ms = start.elapsed().as_millis() as u64,
            "provider response"
        );

        Ok(json)
    }
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::new()
    }
}

/// Scheme, host, port and path only. Query strings are dropped.
fn redact_url(url: &Url) -> String {
    let mut out = format!("{}://{}", url.scheme(), url.host_str().unwrap_or_default());
    if let Some(port) = url.port() {
        out.push_str(&format!(":{}", port));
    }
    out.push_str(url.path());
    out
}
