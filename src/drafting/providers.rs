// src/drafting/providers.rs
//! Concrete drafting backends. `Provider` does the raw call; `CachingClient`
//! wraps any provider with the cache and the daily limit.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::{sanitize_draft, DraftRequest, DraftingClient};
use crate::config::DraftingConfig;

pub const OPENAI_CHAT_URL: &str = "https://api.openai.com/v1/chat/completions";

/// Low-level provider: one remote call per request, no caching.
pub trait Provider: Send + Sync + 'static {
    fn fetch<'a>(
        &'a self,
        req: &'a DraftRequest,
    ) -> Pin<Box<dyn Future<Output = Option<String>> + Send + 'a>>;
    fn name(&self) -> &'static str;
}

/// OpenAI Chat Completions.
pub struct OpenAiProvider {
    http: reqwest::Client,
    api_key: String,
    model: String,
    url: String,
}

impl OpenAiProvider {
    pub fn new(cfg: &DraftingConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(crate::ingest::providers::USER_AGENT)
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(cfg.timeout_secs.max(1)))
            .build()
            .context("building drafting http client")?;
        Ok(Self {
            http,
            api_key: cfg.api_key.clone(),
            model: cfg.model.clone(),
            url: OPENAI_CHAT_URL.to_string(),
        })
    }

    /// Point at a compatible endpoint (proxies, local gateways).
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }
}

#[derive(Serialize)]
struct Msg<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Msg<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMsg,
}

#[derive(Deserialize)]
struct ChoiceMsg {
    #[serde(default)]
    content: Option<String>,
}

/// First choice's content, or `None` for empty/odd bodies.
pub(crate) fn parse_completion(body: &str) -> Option<String> {
    let resp: ChatResponse = serde_json::from_str(body).ok()?;
    resp.choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .filter(|s| !s.trim().is_empty())
}

/// Rough token budget: ~3 chars per token plus headroom.
fn max_tokens_for(max_chars: usize) -> u32 {
    u32::try_from(max_chars / 3 + 64).unwrap_or(u32::MAX).min(1024)
}

impl Provider for OpenAiProvider {
    fn fetch<'a>(
        &'a self,
        req: &'a DraftRequest,
    ) -> Pin<Box<dyn Future<Output = Option<String>> + Send + 'a>> {
        Box::pin(async move {
            if self.api_key.is_empty() {
                return None;
            }

            let body = ChatRequest {
                model: &self.model,
                messages: vec![
                    Msg {
                        role: "system",
                        content: &req.system,
                    },
                    Msg {
                        role: "user",
                        content: &req.prompt,
                    },
                ],
                temperature: 0.7,
                max_tokens: max_tokens_for(req.max_chars),
            };

            let resp = match self
                .http
                .post(&self.url)
                .bearer_auth(&self.api_key)
                .json(&body)
                .send()
                .await
            {
                Ok(r) => r,
                Err(e) => {
                    warn!(target: "drafting", platform = %req.platform, error = ?e, "drafting request failed");
                    return None;
                }
            };

            let status = resp.status();
            if !status.is_success() {
                warn!(target: "drafting", platform = %req.platform, status = status.as_u16(), "drafting service returned an error status");
                return None;
            }
            let text = resp.text().await.ok()?;
            let content = parse_completion(&text)?;
            let cleaned = sanitize_draft(&content, req.max_chars);
            (!cleaned.is_empty()).then_some(cleaned)
        })
    }

    fn name(&self) -> &'static str {
        "openai"
    }
}

/// Always `None`; used when drafting is switched off.
pub struct DisabledClient;

impl DraftingClient for DisabledClient {
    fn draft<'a>(
        &'a self,
        _req: &'a DraftRequest,
    ) -> Pin<Box<dyn Future<Output = Option<String>> + Send + 'a>> {
        Box::pin(async { None })
    }
    fn provider_name(&self) -> &'static str {
        "disabled"
    }
}

/// Deterministic drafts for tests and local runs. An empty `fail_on` list
/// means every platform succeeds.
#[derive(Clone, Default)]
pub struct MockProvider {
    pub fail_on: Vec<crate::platform::Platform>,
}

impl MockProvider {
    pub fn failing_on(platforms: impl IntoIterator<Item = crate::platform::Platform>) -> Self {
        Self {
            fail_on: platforms.into_iter().collect(),
        }
    }
}

impl Provider for MockProvider {
    fn fetch<'a>(
        &'a self,
        req: &'a DraftRequest,
    ) -> Pin<Box<dyn Future<Output = Option<String>> + Send + 'a>> {
        let out = if self.fail_on.contains(&req.platform) {
            None
        } else {
            let title = req
                .prompt
                .lines()
                .find_map(|l| l.strip_prefix("Title: "))
                .unwrap_or("this news");
            Some(sanitize_draft(
                &format!("[{} draft] Congrats on {title}. (mock)", req.platform),
                req.max_chars,
            ))
        };
        Box::pin(async move { out })
    }
    fn name(&self) -> &'static str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::Platform;

    fn req(p: Platform) -> DraftRequest {
        DraftRequest {
            platform: p,
            system: "s".into(),
            prompt: "Platform: x\nTitle: Acme raises Series A\n".into(),
            max_chars: p.style_guide().max_chars,
        }
    }

    #[test]
    fn completion_parsing() {
        let ok = r#"{"choices":[{"message":{"role":"assistant","content":"Hello there"}}]}"#;
        assert_eq!(parse_completion(ok).as_deref(), Some("Hello there"));
        assert!(parse_completion(r#"{"choices":[]}"#).is_none());
        assert!(parse_completion(r#"{"choices":[{"message":{"content":"  "}}]}"#).is_none());
        assert!(parse_completion(r#"{"choices":[{"message":{"content":null}}]}"#).is_none());
        assert!(parse_completion("<html>").is_none());
    }

    #[test]
    fn token_budget_is_bounded() {
        assert_eq!(max_tokens_for(280), 157);
        assert_eq!(max_tokens_for(100_000), 1024);
    }

    #[tokio::test]
    async fn mock_is_deterministic_and_can_fail_per_platform() {
        let m = MockProvider::failing_on([Platform::Email]);
        let a = m.fetch(&req(Platform::Twitter)).await.unwrap();
        let b = m.fetch(&req(Platform::Twitter)).await.unwrap();
        assert_eq!(a, b);
        assert!(a.contains("Acme raises Series A"));
        assert!(m.fetch(&req(Platform::Email)).await.is_none());
    }

    #[tokio::test]
    async fn openai_without_key_returns_none_without_calling_out() {
        let cfg = DraftingConfig {
            api_key: String::new(),
            ..DraftingConfig::default()
        };
        let p = OpenAiProvider::new(&cfg)
            .unwrap()
            .with_url("http://127.0.0.1:9/never");
        assert!(p.fetch(&req(Platform::LinkedIn)).await.is_none());
    }
}
