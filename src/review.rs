// src/review.rs
//! Review sink: drafts land here for a human to approve before posting.
//!
//! `MarkdownReviewSink` writes one file per (date, platform, title slug):
//! `{dir}/{YYYY-MM-DD}_{platform}_{slug}.md`. Saving the same artifact again
//! overwrites the file.

use std::path::PathBuf;
use std::sync::Mutex;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::info;

use crate::engine::ScoredCandidate;
use crate::error::{ScoutError, ScoutResult};
use crate::ingest::types::EngagementMetrics;
use crate::platform::Platform;

pub const MAX_SLUG_CHARS: usize = 60;
const CHECKLIST_HEADING: &str = "## Checklist";

/// The human checklist at the bottom of every review file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReviewStatus {
    pub reviewed: bool,
    pub posted: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneratedArtifact {
    pub platform: Platform,
    pub source_id: String,
    pub title: String,
    pub url: Option<String>,
    pub company: Option<String>,
    pub author: Option<String>,
    pub published_at: Option<u64>,
    /// Comment and upvote counts when the source reports them.
    pub engagement: EngagementMetrics,
    pub score: i32,
    pub matched: Vec<String>,
    pub text: String,
    pub generated_on: NaiveDate,
    pub status: ReviewStatus,
}

/// Where a saved artifact ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactHandle {
    pub location: String,
}

impl GeneratedArtifact {
    pub fn new(
        pick: &ScoredCandidate,
        platform: Platform,
        text: impl Into<String>,
        generated_on: NaiveDate,
    ) -> Self {
        let c = &pick.candidate;
        Self {
            platform,
            source_id: c.source_id.clone(),
            title: c.title.clone(),
            url: c.dedup_key().map(str::to_string),
            company: c.company.clone(),
            author: c.author.clone(),
            published_at: c.published_at,
            engagement: c.metrics.clone(),
            score: pick.score,
            matched: pick.matched.clone(),
            text: text.into(),
            generated_on,
            status: ReviewStatus::default(),
        }
    }

    pub fn file_name(&self) -> String {
        format!(
            "{}_{}_{}.md",
            self.generated_on.format("%Y-%m-%d"),
            self.platform.id(),
            slugify(&self.title)
        )
    }

    pub fn to_markdown(&self) -> String {
        let mut md = String::new();
        let title = if self.title.trim().is_empty() {
            "(untitled)"
        } else {
            self.title.trim()
        };
        md.push_str(&format!("# {title}\n\n"));
        md.push_str(&format!("- Platform: {}\n", self.platform));
        md.push_str(&format!("- Source: {}\n", self.source_id));
        if let Some(url) = &self.url {
            md.push_str(&format!("- URL: <{url}>\n"));
        }
        if let Some(company) = self.company.as_deref().filter(|s| !s.trim().is_empty()) {
            md.push_str(&format!("- Company: {company}\n"));
        }
        if let Some(author) = self.author.as_deref().filter(|s| !s.trim().is_empty()) {
            md.push_str(&format!("- Author: {author}\n"));
        }
        if let Some(ts) = self
            .published_at
            .and_then(|s| i64::try_from(s).ok())
            .and_then(|s| chrono::DateTime::from_timestamp(s, 0))
        {
            md.push_str(&format!("- Published: {}\n", ts.format("%Y-%m-%d %H:%M UTC")));
        }
        if let Some(n) = self.engagement.comments {
            md.push_str(&format!("- Comments: {n}\n"));
        }
        if let Some(n) = self.engagement.score {
            md.push_str(&format!("- Upvotes: {n}\n"));
        }
        md.push_str(&format!("- Generated: {}\n", self.generated_on.format("%Y-%m-%d")));
        if self.matched.is_empty() {
            md.push_str(&format!("- Score: {}\n", self.score));
        } else {
            md.push_str(&format!(
                "- Score: {} ({})\n",
                self.score,
                self.matched.join(", ")
            ));
        }

        md.push_str("\n## Draft\n\n");
        md.push_str(self.text.trim());
        md.push_str("\n\n");

        let tick = |b: bool| if b { "x" } else { " " };
        md.push_str(CHECKLIST_HEADING);
        md.push_str("\n\n");
        md.push_str(&format!("- [{}] reviewed\n", tick(self.status.reviewed)));
        md.push_str(&format!(
            "- [{}] {}\n",
            tick(self.status.posted),
            self.platform.delivery_label()
        ));
        md
    }

    /// Read the checklist back from a review file. Only the last checklist
    /// section counts, so draft text cannot fake a tick.
    pub fn parse_status(markdown: &str) -> ReviewStatus {
        let section = match markdown.rfind(CHECKLIST_HEADING) {
            Some(i) => &markdown[i + CHECKLIST_HEADING.len()..],
            None => return ReviewStatus::default(),
        };
        let mut status = ReviewStatus::default();
        for line in section.lines().map(str::trim) {
            let Some(rest) = line.strip_prefix("- [") else {
                continue;
            };
            let Some((mark, label)) = rest.split_once(']') else {
                continue;
            };
            let checked = mark.trim().eq_ignore_ascii_case("x");
            match label.trim().to_ascii_lowercase().as_str() {
                "reviewed" => status.reviewed = checked,
                "posted" | "sent" => status.posted = checked,
                _ => {}
            }
        }
        status
    }
}

/// ASCII lowercase, dash-separated, at most 60 chars; `untitled` when empty.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(MAX_SLUG_CHARS);
    let mut pending_dash = false;
    for ch in title.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(ch.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
        if slug.len() >= MAX_SLUG_CHARS {
            break;
        }
    }
    slug.truncate(MAX_SLUG_CHARS);
    let slug = slug.trim_end_matches('-');
    if slug.is_empty() {
        "untitled".to_string()
    } else {
        slug.to_string()
    }
}

#[async_trait::async_trait]
pub trait ReviewSink: Send + Sync {
    async fn save(&self, artifact: &GeneratedArtifact) -> ScoutResult<ArtifactHandle>;
}

pub struct MarkdownReviewSink {
    dir: PathBuf,
}

impl MarkdownReviewSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, artifact: &GeneratedArtifact) -> PathBuf {
        self.dir.join(artifact.file_name())
    }
}

#[async_trait::async_trait]
impl ReviewSink for MarkdownReviewSink {
    async fn save(&self, artifact: &GeneratedArtifact) -> ScoutResult<ArtifactHandle> {
        let path = self.path_for(artifact);
        crate::store::write_atomic(&path, artifact.to_markdown().as_bytes())
            .await
            .map_err(|e| ScoutError::persistence(format!("writing {}", path.display()), e))?;
        info!(target: "review", platform = %artifact.platform, path = %path.display(), "review file written");
        Ok(ArtifactHandle {
            location: path.display().to_string(),
        })
    }
}

// --- Test helper ---
/// Keeps artifacts in memory; optionally fails every save.
#[derive(Default)]
pub struct MemoryReviewSink {
    pub saved: Mutex<Vec<GeneratedArtifact>>,
    pub fail: bool,
}

impl MemoryReviewSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn saved(&self) -> Vec<GeneratedArtifact> {
        self.saved
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
    }
}

#[async_trait::async_trait]
impl ReviewSink for MemoryReviewSink {
    async fn save(&self, artifact: &GeneratedArtifact) -> ScoutResult<ArtifactHandle> {
        if self.fail {
            return Err(ScoutError::persistence(
                "review sink",
                anyhow::anyhow!("sink configured to fail"),
            ));
        }
        let mut g = self.saved.lock().unwrap_or_else(|p| p.into_inner());
        g.push(artifact.clone());
        Ok(ArtifactHandle {
            location: format!("memory://{}", artifact.file_name()),
        })
    }
}
