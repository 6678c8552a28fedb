// src/ingest/types.rs
use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Optional engagement numbers reported by the source.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct EngagementMetrics {
    pub comments: Option<u32>,
    pub score: Option<i64>, // upvotes / points
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Candidate {
    pub source_id: String, // e.g., "techcrunch", "reddit_startups"
    pub title: String,
    pub url: Option<String>,
    pub excerpt: Option<String>, // normalized, capped at MAX_EXCERPT_CHARS
    pub author: Option<String>,
    pub company: Option<String>,
    #[serde(default)]
    pub metrics: EngagementMetrics,
    pub published_at: Option<u64>, // unix seconds
    pub search_term: Option<String>,
}

impl Candidate {
    pub fn new(source_id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            source_id: source_id.into(),
            title: title.into(),
            url: None,
            excerpt: None,
            author: None,
            company: None,
            metrics: EngagementMetrics::default(),
            published_at: None,
            search_term: None,
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_excerpt(mut self, excerpt: impl Into<String>) -> Self {
        self.excerpt = Some(excerpt.into());
        self
    }

    pub fn with_company(mut self, company: impl Into<String>) -> Self {
        self.company = Some(company.into());
        self
    }

    /// URL usable as a ledger key (present and non-blank).
    pub fn dedup_key(&self) -> Option<&str> {
        self.url.as_deref().map(str::trim).filter(|u| !u.is_empty())
    }
}

#[async_trait::async_trait]
pub trait SourceCollector: Send + Sync {
    /// Returns an empty vec for "no results"; `Err` means the source is unavailable.
    async fn collect(&self, search_terms: &[String]) -> Result<Vec<Candidate>>;
    fn source_id(&self) -> &str;
}
