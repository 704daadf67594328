//! Provider adapters.
//!
//! One adapter per remote API shape. Adapters marshal the request, carry the
//! credential, and hand the raw reply to the normalizer; the pairing between
//! an adapter and its normalizer goes through the family tag, so a new
//! provider of an existing family needs only a new adapter.

mod chat;
mod classification;
mod completion;

pub use chat::GenerativeChatAdapter;
pub use classification::ClassificationAdapter;
pub use completion::GenerativeCompletionAdapter;

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::http::HttpClient;
use crate::registry::ModelDescriptor;

/// Which remote API shape a descriptor speaks. Selects the adapter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Provider {
    /// Hosted classifiers returning ranked `{label, score}` pairs.
    ClassificationInference,
    /// Chat-completions endpoints with a bearer credential in the header.
    GenerativeChat,
    /// Single-content generative endpoints carrying the credential in the
    /// query string.
    GenerativeCompletion,
}

impl Provider {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ClassificationInference => "classification-inference",
            Self::GenerativeChat => "generative-chat",
            Self::GenerativeCompletion => "generative-completion",
        }
    }
}

/// Which normalizer reads the reply.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResponseFamily {
    Classification,
    Generative,
}

/// Raw provider reply: an opaque payload plus the family tag telling the
/// normalizer how to read it. For the classification family the payload is
/// the untouched JSON body; for the generative family it is the model's
/// extracted reply text.
#[derive(Clone, Debug)]
pub struct RawResponse {
    pub family: ResponseFamily,
    pub payload: String,
}

#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    fn family(&self) -> ResponseFamily;

    /// Call the remote model with one candidate text. `budget` is the
    /// wall-clock allowance for this single call.
    async fn call(
        &self,
        http: &HttpClient,
        model: &ModelDescriptor,
        text: &str,
        budget: Duration,
    ) -> Result<RawResponse>;
}

/// Resolve the adapter for a provider tag.
pub fn adapter_for(provider: Provider) -> &'static dyn ProviderAdapter {
    match provider {
        Provider::ClassificationInference => &ClassificationAdapter,
        Provider::GenerativeChat => &GenerativeChatAdapter,
        Provider::GenerativeCompletion => &GenerativeCompletionAdapter,
    }
}

/// Resolve the descriptor's credential. An empty `credential_env` means the
/// endpoint is unauthenticated; a named but unset variable fails the call
/// before any network activity and is charged to the breaker.
fn credential(model: &ModelDescriptor) -> Result<Option<String>> {
    if model.credential_env.is_empty() {
        return Ok(None);
    }
    match std::env::var(&model.credential_env) {
        Ok(value) if !value.is_empty() => Ok(Some(value)),
        _ => Err(Error::MissingCredential(model.credential_env.clone())),
    }
}

fn bearer_header(model: &ModelDescriptor) -> Result<Option<reqwest::header::HeaderValue>> {
    let Some(cred) = credential(model)? else {
        return Ok(None);
    };
    reqwest::header::HeaderValue::from_str(&format!("Bearer {cred}"))
        .map(Some)
        .map_err(|e| Error::Config(format!("invalid credential for {}: {e}", model.name)))
}
