// src/ingest/providers/reddit.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use metrics::counter;
use serde::Deserialize;
use std::time::Duration;

use crate::ingest::types::{Candidate, EngagementMetrics, SourceCollector};
use crate::ingest::{normalize_excerpt, normalize_text};
use crate::pipeline::Throttle;

const REDDIT_BASE: &str = "https://www.reddit.com";

#[derive(Debug, Deserialize)]
struct Listing {
    data: ListingData,
}

#[derive(Debug, Deserialize)]
struct ListingData {
    #[serde(default)]
    children: Vec<Child>,
}

#[derive(Debug, Deserialize)]
struct Child {
    data: Post,
}

#[derive(Debug, Deserialize)]
struct Post {
    #[serde(default)]
    title: String,
    #[serde(default)]
    selftext: String,
    author: Option<String>,
    num_comments: Option<u32>,
    score: Option<i64>,
    created_utc: Option<f64>,
    permalink: Option<String>,
}

/// Searches one subreddit for each configured term via the public JSON listing.
/// Term requests go out one at a time, `term_delay` apart.
pub struct RedditCollector {
    subreddit: String,
    source_id: String,
    base_url: String,
    client: reqwest::Client,
    term_delay: Throttle,
}

impl RedditCollector {
    pub fn new(subreddit: impl Into<String>) -> Self {
        let subreddit = subreddit.into();
        let client = reqwest::Client::builder()
            .user_agent(super::USER_AGENT)
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(20))
            .build()
            .unwrap_or_default();
        Self {
            source_id: format!("reddit_{}", subreddit.to_ascii_lowercase()),
            subreddit,
            base_url: REDDIT_BASE.to_string(),
            client,
            term_delay: Throttle::none(),
        }
    }

    /// Pause between consecutive term searches.
    pub fn with_term_delay(mut self, delay: Throttle) -> Self {
        self.term_delay = delay;
        self
    }

    /// Point at a different host (mirrors, local test servers).
    pub fn with_base_url(mut self, base: impl Into<String>) -> Self {
        self.base_url = base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn search_url(&self) -> String {
        format!("{}/r/{}/search.json", self.base_url, self.subreddit)
    }

    /// Map one listing page into candidates.
    pub fn parse_listing(&self, body: &str, term: Option<&str>) -> Result<Vec<Candidate>> {
        let listing: Listing = serde_json::from_str(body)
            .with_context(|| format!("parsing {} listing json", self.source_id))?;

        let mut out = Vec::with_capacity(listing.data.children.len());
        for child in listing.data.children {
            let p = child.data;
            let title = normalize_text(&p.title);
            if title.is_empty() {
                continue;
            }
            let url = p
                .permalink
                .filter(|l| !l.trim().is_empty())
                .map(|l| format!("{}{}", self.base_url, l.trim()));
            out.push(Candidate {
                source_id: self.source_id.clone(),
                title,
                url,
                excerpt: normalize_excerpt(&p.selftext),
                author: p.author.filter(|a| a != "[deleted]"),
                company: None,
                metrics: EngagementMetrics {
                    comments: p.num_comments,
                    score: p.score,
                },
                published_at: p
                    .created_utc
                    .filter(|t| t.is_finite() && *t >= 0.0)
                    .map(|t| t as u64),
                search_term: term.map(str::to_string),
            });
        }
        Ok(out)
    }

    async fn search_term(&self, term: &str) -> Result<Vec<Candidate>> {
        let body = self
            .client
            .get(self.search_url())
            .query(&[
                ("q", term),
                ("restrict_sr", "1"),
                ("sort", "new"),
                ("t", "week"),
                ("limit", "25"),
            ])
            .send()
            .await
            .with_context(|| format!("{} http get()", self.source_id))?
            .error_for_status()
            .with_context(|| format!("{} non-2xx", self.source_id))?
            .text()
            .await
            .with_context(|| format!("{} http .text()", self.source_id))?;
        self.parse_listing(&body, Some(term))
    }
}

#[async_trait]
impl SourceCollector for RedditCollector {
    /// A failed term is logged and skipped; the source only fails when
    /// every term did.
    async fn collect(&self, search_terms: &[String]) -> Result<Vec<Candidate>> {
        let terms: Vec<&str> = search_terms
            .iter()
            .map(|t| t.trim())
            .filter(|t| !t.is_empty())
            .collect();

        let mut out = Vec::new();
        let mut answered = 0usize;
        let mut last_err = None;
        for (i, term) in terms.iter().copied().enumerate() {
            if i > 0 {
                self.term_delay.wait().await;
            }
            match self.search_term(term).await {
                Ok(mut page) => {
                    answered += 1;
                    tracing::debug!(target: "ingest", source = %self.source_id, term, count = page.len(), "reddit search");
                    out.append(&mut page);
                }
                Err(e) => {
                    tracing::warn!(target: "ingest", source = %self.source_id, term, error = ?e, "reddit search term failed");
                    counter!("scout_reddit_term_errors_total").increment(1);
                    last_err = Some(e);
                }
            }
        }

        if answered == 0 {
            if let Some(e) = last_err {
                return Err(e.context(format!("{}: every search term failed", self.source_id)));
            }
        }
        counter!("scout_reddit_posts_total").increment(out.len() as u64);
        Ok(out)
    }

    fn source_id(&self) -> &str {
        &self.source_id
    }
}
