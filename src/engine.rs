//! # Selection Engine
//! Gather → dedup → drop already-processed → score → stable rank → top N.
//!
//! `rank` is pure and works on a fixed list; `select_best` adds the
//! collector fan-out and the ledger filter in front of it.

use metrics::{counter, describe_counter};
use once_cell::sync::OnceCell;
use serde::Serialize;
use tracing::{debug, info};

use crate::error::ScoutError;
use crate::history::{filter_fresh, ProcessedHistory};
use crate::ingest::gather;
use crate::ingest::types::{Candidate, SourceCollector};
use crate::relevance::{anon_hash, RelevanceScorer};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScoredCandidate {
    pub candidate: Candidate,
    pub score: i32,
    /// Weight-table row ids that fired.
    pub matched: Vec<String>,
    /// Position in the gathered pool (first-seen order).
    pub discovery_index: usize,
}

/// Counts from one selection pass, for the run summary.
#[derive(Debug, Default)]
pub struct SelectionStats {
    pub found: usize,
    pub duplicates: usize,
    pub fresh: usize,
    pub failures: Vec<ScoutError>,
}

impl SelectionStats {
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

#[derive(Debug, Default)]
pub struct Selection {
    /// Best first; empty means "no events found".
    pub picks: Vec<ScoredCandidate>,
    pub stats: SelectionStats,
}

impl Selection {
    pub fn best(&self) -> Option<&ScoredCandidate> {
        self.picks.first()
    }

    pub fn is_empty(&self) -> bool {
        self.picks.is_empty()
    }
}

fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "scout_fresh_total",
            "Candidates left after the processed-history filter."
        );
    });
}

/// Score every candidate and sort by score descending.
/// The sort is stable, so ties keep discovery order.
pub fn rank(candidates: Vec<Candidate>, scorer: &RelevanceScorer) -> Vec<ScoredCandidate> {
    let mut scored: Vec<ScoredCandidate> = candidates
        .into_iter()
        .enumerate()
        .map(|(i, candidate)| {
            let rel = scorer.explain(&candidate);
            ScoredCandidate {
                candidate,
                score: rel.score,
                matched: rel.matched,
                discovery_index: i,
            }
        })
        .collect();
    scored.sort_by(|a, b| b.score.cmp(&a.score));
    scored
}

/// Full selection pass. Never fails: unavailable sources are recorded in
/// `stats.failures`, and an empty pool yields an empty `picks`.
pub async fn select_best(
    collectors: &[Box<dyn SourceCollector>],
    search_terms: &[String],
    history: &ProcessedHistory,
    scorer: &RelevanceScorer,
    top_n: usize,
) -> Selection {
    ensure_metrics_described();

    let report = gather(collectors, search_terms).await;
    let fresh = filter_fresh(report.candidates, history);
    counter!("scout_fresh_total").increment(fresh.len() as u64);

    let stats = SelectionStats {
        found: report.found,
        duplicates: report.duplicates,
        fresh: fresh.len(),
        failures: report.failures,
    };

    if fresh.is_empty() {
        info!(
            target: "engine",
            found = stats.found,
            failed_sources = stats.failures.len(),
            "no events found"
        );
        return Selection {
            picks: Vec::new(),
            stats,
        };
    }

    let mut ranked = rank(fresh, scorer);
    for sc in ranked.iter().take(10) {
        debug!(
            target: "engine",
            id = %anon_hash(sc.candidate.dedup_key().unwrap_or(&sc.candidate.title)),
            score = sc.score,
            source = %sc.candidate.source_id,
            "ranked"
        );
    }
    ranked.truncate(top_n.max(1));

    if let Some(best) = ranked.first() {
        info!(
            target: "engine",
            score = best.score,
            source = %best.candidate.source_id,
            matched = ?best.matched,
            picks = ranked.len(),
            "selected"
        );
    }

    Selection {
        picks: ranked,
        stats,
    }
}
