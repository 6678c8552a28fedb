// src/ingest/mod.rs
pub mod providers;
pub mod terms;
pub mod types;

use crate::error::ScoutError;
use crate::ingest::types::{Candidate, SourceCollector};
use futures::future::join_all;
use metrics::{counter, describe_counter, describe_histogram, histogram};
use once_cell::sync::OnceCell;
use std::collections::HashSet;

/// Excerpts are capped so downstream prompts stay within token limits.
pub const MAX_EXCERPT_CHARS: usize = 2000;

/// One-time metrics registration.
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "scout_candidates_total",
            "Candidates returned by collectors."
        );
        describe_counter!(
            "scout_dedup_total",
            "Candidates dropped as same-URL duplicates within one pass."
        );
        describe_counter!(
            "scout_source_errors_total",
            "Collector failures (source unavailable)."
        );
        describe_counter!(
            "scout_reddit_term_errors_total",
            "Reddit term searches that failed; the source survives while any term answers."
        );
        describe_histogram!("scout_collect_ms", "Collector wall time in milliseconds.");
    });
}

/// Normalize text: decode entities, strip tags, straighten quotes, collapse whitespace.
pub fn normalize_text(s: &str) -> String {
    let mut out = html_escape::decode_html_entities(s).to_string();

    static RE_TAGS: OnceCell<regex::Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"(?is)</?[^>]+>").unwrap());
    out = re_tags.replace_all(&out, " ").to_string();

    out = out
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    static RE_WS: OnceCell<regex::Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").unwrap());
    out = re_ws.replace_all(&out, " ").to_string();
    out.trim().to_string()
}

/// Normalize and cap an excerpt; blank input becomes `None`.
pub fn normalize_excerpt(s: &str) -> Option<String> {
    let mut out = normalize_text(s);
    if out.chars().count() > MAX_EXCERPT_CHARS {
        out = out.chars().take(MAX_EXCERPT_CHARS).collect();
    }
    if out.is_empty() {
        None
    } else {
        Some(out)
    }
}

/// Drop later candidates whose URL was already seen in this pass.
/// Candidates without a URL are never collapsed.
/// Returns (kept, dropped_count).
pub fn dedup_by_url(candidates: Vec<Candidate>) -> (Vec<Candidate>, usize) {
    let mut seen: HashSet<String> = HashSet::with_capacity(candidates.len());
    let mut keep = Vec::with_capacity(candidates.len());
    let mut dropped = 0usize;
    for c in candidates {
        if let Some(key) = c.dedup_key() {
            if !seen.insert(key.to_string()) {
                dropped += 1;
                continue;
            }
        }
        keep.push(c);
    }
    (keep, dropped)
}

/// What one gathering pass produced.
#[derive(Debug, Default)]
pub struct GatherReport {
    /// Flattened in collector order, already deduplicated by URL.
    pub candidates: Vec<Candidate>,
    /// Raw count before within-pass dedup.
    pub found: usize,
    pub duplicates: usize,
    pub failures: Vec<ScoutError>,
}

impl GatherReport {
    pub fn failed_sources(&self) -> Vec<&str> {
        self.failures
            .iter()
            .filter_map(|e| match e {
                ScoutError::SourceUnavailable { source_id, .. } => Some(source_id.as_str()),
                _ => None,
            })
            .collect()
    }
}

/// Run every collector concurrently and merge what comes back.
/// A failing collector is logged and skipped; it never aborts the pass.
pub async fn gather(
    collectors: &[Box<dyn SourceCollector>],
    search_terms: &[String],
) -> GatherReport {
    ensure_metrics_described();

    let calls = collectors.iter().map(|c| async move {
        let t0 = std::time::Instant::now();
        let res = c.collect(search_terms).await;
        histogram!("scout_collect_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
        (c.source_id(), res)
    });
    let results = join_all(calls).await;

    let mut raw = Vec::new();
    let mut failures = Vec::new();
    for (source_id, res) in results {
        match res {
            Ok(mut v) => {
                tracing::info!(target: "ingest", source = source_id, count = v.len(), "source collected");
                raw.append(&mut v);
            }
            Err(e) => {
                tracing::warn!(target: "ingest", error = ?e, source = source_id, "source unavailable");
                counter!("scout_source_errors_total").increment(1);
                failures.push(ScoutError::source_unavailable(source_id, &e));
            }
        }
    }

    let found = raw.len();
    let (candidates, duplicates) = dedup_by_url(raw);

    counter!("scout_candidates_total").increment(found as u64);
    counter!("scout_dedup_total").increment(duplicates as u64);

    GatherReport {
        candidates,
        found,
        duplicates,
        failures,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cand(url: Option<&str>, title: &str) -> Candidate {
        let c = Candidate::new("t", title);
        match url {
            Some(u) => c.with_url(u),
            None => c,
        }
    }

    #[test]
    fn normalize_text_strips_tags_and_entities() {
        let s = "  <p>Hello,&nbsp;&nbsp; <b>world</b></p>  &ldquo;ok&rdquo; ";
        assert_eq!(normalize_text(s), r#"Hello, world "ok""#);
    }

    #[test]
    fn excerpt_is_capped_and_blank_is_none() {
        let long = "a".repeat(MAX_EXCERPT_CHARS + 50);
        let out = normalize_excerpt(&long).unwrap();
        assert_eq!(out.chars().count(), MAX_EXCERPT_CHARS);
        assert!(normalize_excerpt("  <br/>  ").is_none());
    }

    #[test]
    fn dedup_keeps_first_and_never_collapses_missing_urls() {
        let raw = vec![
            cand(Some("https://a"), "first"),
            cand(None, "no url 1"),
            cand(Some("https://a"), "second"),
            cand(None, "no url 2"),
            cand(Some("https://b"), "b"),
        ];
        let (kept, dropped) = dedup_by_url(raw);
        assert_eq!(dropped, 1);
        let titles: Vec<_> = kept.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(titles, vec!["first", "no url 1", "no url 2", "b"]);
    }

    #[test]
    fn blank_url_counts_as_missing() {
        let raw = vec![cand(Some("  "), "x"), cand(Some(""), "y")];
        let (kept, dropped) = dedup_by_url(raw);
        assert_eq!(kept.len(), 2);
        assert_eq!(dropped, 0);
    }
}
