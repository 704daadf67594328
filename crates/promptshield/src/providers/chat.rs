use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, AUTHORIZATION};

use crate::error::{Error, Result};
use crate::http::HttpClient;
use crate::prompt::ANALYSIS_PROMPT;
use crate::registry::ModelDescriptor;

use super::{bearer_header, ProviderAdapter, RawResponse, ResponseFamily};

/// Adapter for chat-completions endpoints. The analysis instruction rides in
/// the system message; the candidate text is the user message.
pub struct GenerativeChatAdapter;

#[async_trait]
impl ProviderAdapter for GenerativeChatAdapter {
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
        let mut headers = HeaderMap::new();
        if let Some(value) = bearer_header(model)? {
            headers.insert(AUTHORIZATION, value);
        }

        let body = serde_json::json!({
            "model": model.remote_id,
            "messages": [
                { "role": "system", "content": ANALYSIS_PROMPT },
                { "role": "user", "content": text },
            ],
        });

        let reply = http
            .post_json(&model.name, &model.endpoint, headers, body, budget)
            .await?;

        let content = reply
            .pointer("/choices/0/message/content")
            .and_then(|v| v.as_str())
            .ok_or_else(|| Error::Decode("empty chat response".to_string()))?;

        Ok(RawResponse {
            family: ResponseFamily::Generative,
            payload: content.to_string(),
        })
    }
}
