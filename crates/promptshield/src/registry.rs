//! Model registry: the ordered catalog of detection endpoints.

use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use serde::Deserialize;

use crate::breaker::BreakerSettings;
use crate::error::{Error, Result};
use crate::providers::Provider;

/// One remote model the pipeline may call.
#[derive(Clone, Debug)]
pub struct ModelDescriptor {
    /// Stable identifier, unique within the registry.
    pub name: String,
    pub provider: Provider,
    /// Identifier the provider uses for this model (may be empty when the
    /// endpoint URL already names it).
    pub remote_id: String,
    pub endpoint: String,
    /// Environment variable holding the bearer credential; empty means the
    /// endpoint takes no credential.
    pub credential_env: String,
    pub timeout: Duration,
    /// Fallback priority; smaller is tried earlier.
    pub priority: u32,
    pub enabled: bool,
    pub breaker: BreakerSettings,
}

struct Inner {
    models: Vec<ModelDescriptor>,
    enabled: Vec<ModelDescriptor>,
}

/// Catalog of model descriptors plus a derived view of the enabled ones
/// sorted by ascending priority (stable on ties). Mutations rebuild the view
/// before returning.
pub struct ModelRegistry {
    inner: RwLock<Inner>,
}

impl ModelRegistry {
    pub fn new(models: Vec<ModelDescriptor>) -> Self {
        let mut inner = Inner {
            models,
            enabled: Vec::new(),
        };
        rebuild(&mut inner);
        Self {
            inner: RwLock::new(inner),
        }
    }

    /// Registry seeded with the built-in endpoint catalog.
    pub fn with_defaults() -> Self {
        Self::new(default_catalog())
    }

    /// Load a catalog from its YAML form.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let catalog: ModelCatalog = serde_yaml::from_str(yaml)?;
        Ok(Self::new(
            catalog.models.into_iter().map(Into::into).collect(),
        ))
    }

    /// Replace the whole catalog.
    pub fn load(&self, models: Vec<ModelDescriptor>) {
        let mut inner = self.write();
        inner.models = models;
        rebuild(&mut inner);
    }

    /// Enabled descriptors in fallback order.
    pub fn enabled_ordered(&self) -> Vec<ModelDescriptor> {
        self.read().enabled.clone()
    }

    /// Every descriptor, enabled or not, in insertion order.
    pub fn all(&self) -> Vec<ModelDescriptor> {
        self.read().models.clone()
    }

    pub fn get(&self, name: &str) -> Result<ModelDescriptor> {
        self.read()
            .models
            .iter()
            .find(|m| m.name == name)
            .cloned()
            .ok_or_else(|| Error::ModelNotFound(name.to_string()))
    }

    pub fn enable(&self, name: &str) -> Result<()> {
        self.update(name, |m| m.enabled = true)
    }

    pub fn disable(&self, name: &str) -> Result<()> {
        self.update(name, |m| m.enabled = false)
    }

    pub fn set_priority(&self, name: &str, priority: u32) -> Result<()> {
        self.update(name, |m| m.priority = priority)
    }

    /// Whether any enabled descriptor's credential resolves right now.
    pub fn any_credential_configured(&self) -> bool {
        self.read().enabled.iter().any(|m| {
            !m.credential_env.is_empty()
                && std::env::var(&m.credential_env)
                    .map(|v| !v.is_empty())
                    .unwrap_or(false)
        })
    }

    fn update(&self, name: &str, apply: impl FnOnce(&mut ModelDescriptor)) -> Result<()> {
        let mut inner = self.write();
        let Some(model) = inner.models.iter_mut().find(|m| m.name == name) else {
            return Err(Error::ModelNotFound(name.to_string()));
        };
        apply(model);
        rebuild(&mut inner);
        Ok(())
    }

    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        match self.inner.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        match self.inner.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl Default for ModelRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

fn rebuild(inner: &mut Inner) {
    let mut enabled: Vec<ModelDescriptor> =
        inner.models.iter().filter(|m| m.enabled).cloned().collect();
    // sort_by_key is stable, so equal priorities keep insertion order.
    enabled.sort_by_key(|m| m.priority);
    inner.enabled = enabled;
}

/// YAML form of the catalog.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModelCatalog {
    pub models: Vec<CatalogModel>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CatalogModel {
    pub name: String,
    pub provider: Provider,
    #[serde(default)]
    pub remote_id: String,
    pub endpoint: String,
    #[serde(default)]
    pub credential_env: String,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_priority")]
    pub priority: u32,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub circuit_breaker: CatalogBreaker,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CatalogBreaker {
    #[serde(default)]
    pub failure_threshold: Option<u32>,
    #[serde(default)]
    pub success_threshold: Option<u32>,
    #[serde(default)]
    pub base_timeout_ms: Option<u64>,
    #[serde(default)]
    pub max_timeout_ms: Option<u64>,
}

fn default_timeout_ms() -> u64 {
    15_000
}

fn default_priority() -> u32 {
    100
}

fn default_enabled() -> bool {
    true
}

impl From<CatalogModel> for ModelDescriptor {
    fn from(raw: CatalogModel) -> Self {
        let defaults = BreakerSettings::default();
        let breaker = BreakerSettings {
            failure_threshold: raw.circuit_breaker.failure_threshold.unwrap_or(defaults.failure_threshold).max(1),
            success_threshold: raw.circuit_breaker.success_threshold.unwrap_or(defaults.success_threshold).max(1),
            base_timeout: raw
                .circuit_breaker
                .base_timeout_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.base_timeout),
            max_timeout: raw
                .circuit_breaker
                .max_timeout_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.max_timeout),
        };

        Self {
            name: raw.name,
            provider: raw.provider,
            remote_id: raw.remote_id,
            endpoint: raw.endpoint,
            credential_env: raw.credential_env,
            timeout: Duration::from_millis(raw.timeout_ms.max(1)),
            priority: raw.priority.max(1),
            enabled: raw.enabled,
            breaker,
        }
    }
}

/// Built-in endpoint catalog: two hosted classifiers first, generative
/// fallbacks behind them. Generative breakers are more sensitive and back
/// off longer.
pub fn default_catalog() -> Vec<ModelDescriptor> {
    let classifier_breaker = BreakerSettings {
        failure_threshold: 5,
        success_threshold: 2,
        base_timeout: Duration::from_secs(30),
        max_timeout: Duration::from_secs(300),
    };
    let generative_breaker = BreakerSettings {
        failure_threshold: 3,
        success_threshold: 2,
        base_timeout: Duration::from_secs(60),
        max_timeout: Duration::from_secs(600),
    };

    vec![
        ModelDescriptor {
            name: "protectai-deberta-v3".to_string(),
            provider: Provider::ClassificationInference,
            remote_id: "protectai/deberta-v3-base-prompt-injection-v2".to_string(),
            endpoint:
                "https://api-inference.huggingface.co/models/protectai/deberta-v3-base-prompt-injection-v2"
                    .to_string(),
            credential_env: "HUGGINGFACE_API_KEY".to_string(),
            timeout: Duration::from_secs(15),
            priority: 1,
            enabled: true,
            breaker: classifier_breaker.clone(),
        },
        ModelDescriptor {
            name: "llama-prompt-guard-2".to_string(),
            provider: Provider::ClassificationInference,
            remote_id: "meta-llama/Llama-Prompt-Guard-2-86M".to_string(),
            endpoint:
                "https://router.huggingface.co/hf-inference/models/meta-llama/Llama-Prompt-Guard-2-86M"
                    .to_string(),
            credential_env: "HUGGINGFACE_API_KEY".to_string(),
            timeout: Duration::from_secs(15),
            priority: 2,
            enabled: true,
            breaker: classifier_breaker,
        },
        ModelDescriptor {
            name: "gemini-2.0-flash".to_string(),
            provider: Provider::GenerativeCompletion,
            remote_id: "gemini-2.0-flash".to_string(),
            endpoint:
                "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash:generateContent"
                    .to_string(),
            credential_env: "GEMINI_API_KEY".to_string(),
            timeout: Duration::from_secs(15),
            priority: 3,
            enabled: true,
            breaker: generative_breaker.clone(),
        },
        ModelDescriptor {
            name: "kimi-k2".to_string(),
            provider: Provider::GenerativeChat,
            remote_id: "moonshotai/kimi-k2:free".to_string(),
            endpoint: "https://openrouter.ai/api/v1/chat/completions".to_string(),
            credential_env: "OPENROUTER_API_KEY".to_string(),
            timeout: Duration::from_secs(15),
            priority: 4,
            enabled: true,
            breaker: generative_breaker,
        },
    ]
}
