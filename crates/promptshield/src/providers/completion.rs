use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::HeaderMap;

use crate::error::{Error, Result};
use crate::http::HttpClient;
use crate::prompt::analysis_prompt_for;
use crate::registry::ModelDescriptor;

use super::{credential, ProviderAdapter, RawResponse, ResponseFamily};

/// Adapter for single-content generative endpoints. The whole analysis
/// instruction plus the candidate text travels in one content part, and the
/// credential rides in the query string.
pub struct GenerativeCompletionAdapter;

#[async_trait]
impl ProviderAdapter for GenerativeCompletionAdapter {
    fn family(&self) -> ResponseFamily {
        ResponseFamily::Generative
    }

    async fn call(
        &self,
        http: &HttpClient,
        model: &ModelDescriptor,
        text: &str,
        budget: Duration,
    ) -> Result<RawResponse> {
        let url = match credential(model)? {
            Some(key) => format!("{}?key={}", model.endpoint, key),
            None => model.endpoint.clone(),
        };

        let body = serde_json::json!({
            "contents": [
                { "parts": [ { "text": analysis_prompt_for(text) } ] }
            ]
        });

        let reply = http
            .post_json(&model.name, &url, HeaderMap::new(), body, budget)
            .await?;

        let content = reply
            .pointer("/candidates/0/content/parts/0/text")
            .and_then(|v| v.as_str())
            .ok_or_else(|| Error::Decode("empty completion response".to_string()))?;

        Ok(RawResponse {
            family: ResponseFamily::Generative,
            payload: content.to_string(),
        })
    }
}
