use anyhow::{Context, Result};
use async_trait::async_trait;
use metrics::counter;
use quick_xml::de::from_str;
use serde::Deserialize;
use std::time::Duration;
use time::{format_description::well_known::Rfc2822, OffsetDateTime, UtcOffset};

use crate::ingest::types::{Candidate, SourceCollector};
use crate::ingest::{normalize_excerpt, normalize_text};

pub const TECHCRUNCH_FEED: &str = "https://techcrunch.com/category/startups/feed/";

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}
#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    item: Vec<Item>,
}
#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
    link: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    description: Option<String>,
    author: Option<String>,
}

fn parse_rfc2822_to_unix(ts: &str) -> Option<u64> {
    OffsetDateTime::parse(ts.trim(), &Rfc2822)
        .ok()
        .map(|dt| dt.to_offset(UtcOffset::UTC).unix_timestamp())
        .and_then(|x| u64::try_from(x).ok())
}

/// Generic RSS feed collector (news sites, job boards with feeds).
pub struct RssCollector {
    source_id: String,
    mode: Mode,
}

enum Mode {
    Fixture(String),
    Http { url: String, client: reqwest::Client },
}

impl RssCollector {
    pub fn from_fixture(source_id: impl Into<String>, xml: &str) -> Self {
        Self {
            source_id: source_id.into(),
            mode: Mode::Fixture(xml.to_string()),
        }
    }

    pub fn from_url(source_id: impl Into<String>, url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(super::USER_AGENT)
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(20))
            .build()
            .unwrap_or_default();
        Self {
            source_id: source_id.into(),
            mode: Mode::Http {
                url: url.into(),
                client,
            },
        }
    }

    /// Parse the feed and keep items mentioning any search term (all items if none given).
    pub fn parse_items(&self, xml: &str, search_terms: &[String]) -> Result<Vec<Candidate>> {
        let xml_clean = scrub_html_entities_for_xml(xml);
        let rss: Rss = from_str(&xml_clean)
            .with_context(|| format!("parsing {} rss xml", self.source_id))?;

        let terms: Vec<String> = search_terms
            .iter()
            .map(|t| t.trim().to_lowercase())
            .filter(|t| !t.is_empty())
            .collect();

        let mut out = Vec::with_capacity(rss.channel.item.len());
        for it in rss.channel.item {
            let title = normalize_text(it.title.as_deref().unwrap_or_default());
            let excerpt = it.description.as_deref().and_then(normalize_excerpt);
            if title.is_empty() && excerpt.is_none() {
                continue;
            }

            let matched_term = if terms.is_empty() {
                None
            } else {
                let hay = format!("{} {}", title, excerpt.as_deref().unwrap_or_default())
                    .to_lowercase();
                match terms.iter().find(|t| hay.contains(t.as_str())) {
                    Some(t) => Some(t.clone()),
                    None => continue,
                }
            };

            out.push(Candidate {
                source_id: self.source_id.clone(),
                title,
                url: it.link.map(|l| l.trim().to_string()).filter(|l| !l.is_empty()),
                excerpt,
                author: it.author.map(|a| normalize_text(&a)).filter(|a| !a.is_empty()),
                company: None,
                metrics: Default::default(),
                published_at: it.pub_date.as_deref().and_then(parse_rfc2822_to_unix),
                search_term: matched_term,
            });
        }

        counter!("scout_rss_items_total").increment(out.len() as u64);
        Ok(out)
    }
}

#[async_trait]
impl SourceCollector for RssCollector {
    async fn collect(&self, search_terms: &[String]) -> Result<Vec<Candidate>> {
        match &self.mode {
            Mode::Fixture(s) => self.parse_items(s, search_terms),
            Mode::Http { url, client } => {
                let body = client
                    .get(url.as_str())
                    .send()
                    .await
                    .with_context(|| format!("{} http get()", self.source_id))?
                    .error_for_status()
                    .with_context(|| format!("{} non-2xx", self.source_id))?
                    .text()
                    .await
                    .with_context(|| format!("{} http .text()", self.source_id))?;
                self.parse_items(&body, search_terms)
            }
        }
    }

    fn source_id(&self) -> &str {
        &self.source_id
    }
}

fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
        .replace("&hellip;", "...")
}

#[cfg(test)]
mod tests {
    use super::*;

    const FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Startups</title>
    <item>
      <title>Acme raises $12M Series A to hire its first sales team</title>
      <link>https://news.example/acme-series-a</link>
      <pubDate>Tue, 03 Jun 2025 14:00:00 +0000</pubDate>
      <description>&lt;p&gt;The B2B SaaS startup&amp;nbsp;plans to grow.&lt;/p&gt;</description>
      <author>Jane Reporter</author>
    </item>
    <item>
      <title>Local bakery opens second shop</title>
      <link>https://news.example/bakery</link>
      <description>Bread&mdash;lots of it.</description>
    </item>
    <item>
      <title></title>
    </item>
  </channel>
</rss>"#;

    #[tokio::test]
    async fn parses_items_without_terms() {
        let c = RssCollector::from_fixture("techcrunch", FEED);
        let out = c.collect(&[]).await.unwrap();
        assert_eq!(out.len(), 2, "empty item is skipped");
        assert_eq!(out[0].source_id, "techcrunch");
        assert_eq!(out[0].url.as_deref(), Some("https://news.example/acme-series-a"));
        assert_eq!(
            out[0].excerpt.as_deref(),
            Some("The B2B SaaS startup plans to grow.")
        );
        assert_eq!(out[0].author.as_deref(), Some("Jane Reporter"));
        assert_eq!(out[0].published_at, Some(1_748_959_200));
        assert_eq!(out[1].excerpt.as_deref(), Some("Bread-lots of it."));
        assert!(out[1].published_at.is_none());
    }

    #[tokio::test]
    async fn search_terms_filter_items() {
        let c = RssCollector::from_fixture("techcrunch", FEED);
        let out = c.collect(&["series a".to_string()]).await.unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].search_term.as_deref(), Some("series a"));
    }

    #[tokio::test]
    async fn malformed_feed_is_an_error() {
        let c = RssCollector::from_fixture("broken", "<rss><channel><item>");
        assert!(c.collect(&[]).await.is_err());
    }

    #[tokio::test]
    async fn feed_without_items_is_empty_not_error() {
        let xml = r#"<rss><channel><title>quiet</title></channel></rss>"#;
        let c = RssCollector::from_fixture("quiet", xml);
        assert!(c.collect(&[]).await.unwrap().is_empty());
    }
}
