// src/config/drafting.rs
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

use crate::error::{ScoutError, ScoutResult};

fn default_provider() -> String {
    "openai".to_string()
}
fn default_model() -> String {
    "gpt-4o-mini".to_string()
}
fn default_api_key() -> String {
    "ENV".to_string()
}
fn default_daily_limit() -> u32 {
    50
}
fn default_cache_ttl_secs() -> u64 {
    7 * 24 * 3600
}
fn default_timeout_secs() -> u64 {
    30
}

#[derive(Clone, Serialize, Deserialize)]
pub struct DraftingConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// "openai" | "mock" (case-insensitive)
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// "ENV" means: read from OPENAI_API_KEY.
    #[serde(default = "default_api_key")]
    pub api_key: String,
    /// Real provider calls per UTC day; cache hits are free.
    #[serde(default = "default_daily_limit")]
    pub daily_limit: u32,
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_enabled() -> bool {
    true
}

impl Default for DraftingConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            provider: default_provider(),
            model: default_model(),
            api_key: default_api_key(),
            daily_limit: default_daily_limit(),
            cache_ttl_secs: default_cache_ttl_secs(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

// Never print the key itself.
impl std::fmt::Debug for DraftingConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DraftingConfig")
            .field("enabled", &self.enabled)
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("api_key_len", &self.api_key.len())
            .field("daily_limit", &self.daily_limit)
            .field("cache_ttl_secs", &self.cache_ttl_secs)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl DraftingConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> ScoutResult<Self> {
        let path = path.as_ref();
        let data = fs::read_to_string(path)
            .with_context(|| format!("reading drafting config {}", path.display()))
            .map_err(|e| ScoutError::Configuration(format!("{e:#}")))?;
        serde_json::from_str(&data).map_err(|e| {
            ScoutError::Configuration(format!("parsing drafting config {}: {e}", path.display()))
        })
    }

    /// Normalize provider and resolve an "ENV" key through `get`.
    /// Missing credentials for a live provider are a configuration error.
    pub fn resolve<F>(mut self, get: F) -> ScoutResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        self.provider = self.provider.trim().to_lowercase();

        if self.api_key.trim().eq_ignore_ascii_case("env") {
            self.api_key = match self.provider.as_str() {
                "openai" => get("OPENAI_API_KEY").unwrap_or_default(),
                "mock" => String::new(),
                other => {
                    return Err(ScoutError::Configuration(format!(
                        "unsupported drafting provider: {other}"
                    )))
                }
            };
        }
        if self.daily_limit == 0 {
            self.daily_limit = default_daily_limit();
        }
        Ok(self)
    }

    /// Whether a live call can be made with the resolved settings.
    pub fn validate_credentials(&self) -> ScoutResult<()> {
        if self.enabled && self.provider == "openai" && self.api_key.trim().is_empty() {
            return Err(ScoutError::Configuration(
                "drafting enabled with provider `openai` but OPENAI_API_KEY is not set".into(),
            ));
        }
        Ok(())
    }
}
