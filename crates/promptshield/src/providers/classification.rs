use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, AUTHORIZATION};

use crate::error::Result;
use crate::http::HttpClient;
use crate::registry::ModelDescriptor;

use super::{bearer_header, ProviderAdapter, RawResponse, ResponseFamily};

/// Longest input forwarded to hosted classifiers; longer candidates are cut
/// on a character boundary.
const MAX_CLASSIFIER_CHARS: usize = 500;

/// Adapter for hosted classification endpoints: `{"inputs": text}` in,
/// `[[{"label", "score"}, ...]]` out.
pub struct ClassificationAdapter;

#[async_trait]
impl ProviderAdapter for ClassificationAdapter {
    fn family(&self) -> ResponseFamily {
        ResponseFamily::Classification
    }

    async fn call(
        &self,
        http: &HttpClient,
        model: &ModelDescriptor,
        text: &str,
        budget: Duration,
    ) -> Result<RawResponse> {
        let text: String = text.chars().take(MAX_CLASSIFIER_CHARS).collect();

        let mut headers = HeaderMap::new();
        if let Some(value) = bearer_header(model)? {
            headers.insert(AUTHORIZATION, value);
        }

        let body = serde_json::json!({ "inputs": text });
        let reply = http
            .post_json(&model.name, &model.endpoint, headers, body, budget)
            .await?;

        Ok(RawResponse {
            family: ResponseFamily::Classification,
            payload: reply.to_string(),
        })
    }
}
