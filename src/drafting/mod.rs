// src/drafting/mod.rs
//! Drafting dispatcher: client abstraction, prompt building, output cleanup.
//!
//! A client returns `None` when it has no usable text; the caller treats that
//! as a per-platform drafting failure and moves on.

pub mod cache;
pub mod providers;
pub mod template;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use once_cell::sync::OnceCell;
use serde::Serialize;

use crate::config::DraftingConfig;
use crate::error::{ScoutError, ScoutResult};
use crate::ingest::types::Candidate;
use crate::platform::Platform;
use crate::store::ObjectStore;

pub use cache::CachingClient;
pub use providers::{DisabledClient, MockProvider, OpenAiProvider, Provider};
pub use template::PromptTemplate;

/// One fully rendered request for one platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DraftRequest {
    pub platform: Platform,
    pub system: String,
    pub prompt: String,
    pub max_chars: usize,
}

pub trait DraftingClient: Send + Sync {
    fn draft<'a>(
        &'a self,
        req: &'a DraftRequest,
    ) -> Pin<Box<dyn Future<Output = Option<String>> + Send + 'a>>;
    /// Provider name for logs.
    fn provider_name(&self) -> &'static str;
}

pub type DynDraftingClient = Arc<dyn DraftingClient>;

pub const SYSTEM_PROMPT: &str = "You write short outreach copy for a fractional sales leader who helps \
B2B founders build their first sales team. Be specific to the event you are given, never invent facts, \
no emojis. Output only the requested text.";

const DRAFT_TEMPLATE: &str = "\
Platform: {platform}
Tone: {tone}
Format: {format}
Hard limit: {max_chars} characters.

Event from {source}:
Title: {title}
Company: {company}
Summary: {excerpt}
Link: {url}

Write one {platform} draft that reacts to this event and offers a concrete point of view \
on hiring and building an early sales team.";

/// The built-in draft prompt.
pub fn default_template() -> ScoutResult<&'static PromptTemplate> {
    static TEMPLATE: OnceCell<PromptTemplate> = OnceCell::new();
    TEMPLATE.get_or_try_init(|| PromptTemplate::new("draft", DRAFT_TEMPLATE))
}

impl DraftRequest {
    /// Render `template` for one candidate and platform. Optional candidate
    /// fields are filled with "n/a" so that only real gaps fail validation.
    pub fn build(
        template: &PromptTemplate,
        candidate: &Candidate,
        platform: Platform,
    ) -> ScoutResult<Self> {
        let guide = platform.style_guide();
        let or_na = |v: Option<&str>| {
            v.map(str::trim)
                .filter(|s| !s.is_empty())
                .unwrap_or("n/a")
                .to_string()
        };
        let title = candidate.title.trim();
        if title.is_empty() {
            return Err(ScoutError::Template(
                "candidate has no title to draft from".into(),
            ));
        }

        let mut fill = template.fill();
        for slot in template.slots() {
            let value = match slot.as_str() {
                "platform" => platform.id().to_string(),
                "tone" => guide.tone.to_string(),
                "format" => guide.format.to_string(),
                "max_chars" => guide.max_chars.to_string(),
                "source" => candidate.source_id.clone(),
                "title" => title.to_string(),
                "company" => or_na(candidate.company.as_deref()),
                "excerpt" => or_na(candidate.excerpt.as_deref()),
                "url" => or_na(candidate.url.as_deref()),
                "author" => or_na(candidate.author.as_deref()),
                // Left unset: `render` reports it as missing.
                _ => continue,
            };
            fill = fill.set(slot, value);
        }

        Ok(Self {
            platform,
            system: SYSTEM_PROMPT.to_string(),
            prompt: fill.render()?,
            max_chars: guide.max_chars,
        })
    }
}

/// Pick a client for the resolved config.
///
/// * `mock` (env override) → deterministic mock behind the cache.
/// * `enabled = false` → `DisabledClient`.
/// * `provider = "openai"` → OpenAI behind the cache + daily limit.
pub fn build_client(
    config: &DraftingConfig,
    mock: bool,
    store: Arc<dyn ObjectStore>,
) -> ScoutResult<DynDraftingClient> {
    let ttl = Duration::from_secs(config.cache_ttl_secs);

    if mock || config.provider == "mock" {
        tracing::info!(target: "drafting", "using mock drafting client");
        return Ok(Arc::new(CachingClient::new(
            MockProvider::default(),
            store,
            ttl,
            config.daily_limit,
        )));
    }

    if !config.enabled {
        tracing::info!(target: "drafting", "drafting disabled");
        return Ok(Arc::new(DisabledClient));
    }

    match config.provider.as_str() {
        "openai" => {
            let provider = OpenAiProvider::new(config)
                .map_err(|e| ScoutError::Configuration(format!("{e:#}")))?;
            tracing::info!(
                target: "drafting",
                model = %config.model,
                api_key_len = config.api_key.len(),
                daily_limit = config.daily_limit,
                "using openai drafting client"
            );
            Ok(Arc::new(CachingClient::new(
                provider,
                store,
                ttl,
                config.daily_limit,
            )))
        }
        other => Err(ScoutError::Configuration(format!(
            "unsupported drafting provider: {other}"
        ))),
    }
}

/// Strip control characters, tidy whitespace, and cut to `max_chars`
/// characters (at a word boundary when one is reasonably close).
pub fn sanitize_draft(input: &str, max_chars: usize) -> String {
    let text = input.replace("\r\n", "\n").replace('\r', "\n");

    let mut lines: Vec<String> = Vec::new();
    let mut blank_run = 0usize;
    for line in text.split('\n') {
        let cleaned: String = line
            .chars()
            .map(|c| if c == '\t' { ' ' } else { c })
            .filter(|c| !c.is_control())
            .collect();
        let cleaned = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");
        if cleaned.is_empty() {
            blank_run += 1;
            if blank_run > 1 || lines.is_empty() {
                continue;
            }
        } else {
            blank_run = 0;
        }
        lines.push(cleaned);
    }
    let joined = lines.join("\n");
    let out = joined.trim();

    if out.chars().count() <= max_chars {
        return out.to_string();
    }

    let cut: String = out.chars().take(max_chars).collect();
    let boundary = cut
        .char_indices()
        .filter(|(_, c)| c.is_whitespace())
        .map(|(i, _)| i)
        .last();
    match boundary {
        Some(i) if cut[..i].chars().count() >= max_chars / 2 => cut[..i].trim_end().to_string(),
        _ => cut.trim_end().to_string(),
    }
}
