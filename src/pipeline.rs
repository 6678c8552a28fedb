// src/pipeline.rs
//! One scouting run, end to end:
//! ledger load → select (or override item) → draft per platform → review
//! files → ledger record + persist → summary.
//!
//! A single run at a time is assumed; the ledger is not locked.

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use futures::future::join_all;
use metrics::{counter, gauge};
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::drafting::{build_client, default_template, DraftRequest, DynDraftingClient, PromptTemplate};
use crate::engine::{rank, select_best, ScoredCandidate, Selection};
use crate::error::{ScoutError, ScoutResult};
use crate::history::Ledger;
use crate::ingest::providers::build_collectors;
use crate::ingest::types::{Candidate, SourceCollector};
use crate::platform::Platform;
use crate::relevance::RelevanceScorer;
use crate::review::{ArtifactHandle, GeneratedArtifact, MarkdownReviewSink, ReviewSink};
use crate::store::{FsObjectStore, ObjectStore};

/// Fixed pause between candidates in multi-candidate runs.
#[derive(Debug, Clone, Copy, Default)]
pub struct Throttle {
    delay: Duration,
}

impl Throttle {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    pub fn none() -> Self {
        Self::default()
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub async fn wait(&self) {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
    }
}

/// Per-invocation switches (CLI flags).
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Select and log the ranking; no drafts, files, or ledger writes.
    pub dry_run: bool,
    /// Draft for this platform only.
    pub platform: Option<Platform>,
    /// Skip selection and process this item.
    pub item: Option<Candidate>,
    /// Overrides the configured top N.
    pub top_n: Option<usize>,
}

#[derive(Debug, Default)]
pub struct RunSummary {
    pub dry_run: bool,
    pub found: usize,
    pub fresh: usize,
    /// Titles of the selected candidates, best first.
    pub selected: Vec<String>,
    pub artifacts: Vec<ArtifactHandle>,
    pub drafting_failures: usize,
    pub failed_sources: Vec<String>,
    pub recorded: usize,
}

impl RunSummary {
    pub fn nothing_new(&self) -> bool {
        self.selected.is_empty()
    }

    fn log(&self) {
        if self.nothing_new() {
            info!(
                target: "pipeline",
                found = self.found,
                fresh = self.fresh,
                failed_sources = ?self.failed_sources,
                "run finished: no events found"
            );
            return;
        }
        info!(
            target: "pipeline",
            dry_run = self.dry_run,
            found = self.found,
            fresh = self.fresh,
            selected = ?self.selected,
            artifacts = self.artifacts.len(),
            drafting_failures = self.drafting_failures,
            failed_sources = ?self.failed_sources,
            recorded = self.recorded,
            "run finished"
        );
    }
}

/// Everything a run needs, wired once at startup.
pub struct Pipeline {
    pub collectors: Vec<Box<dyn SourceCollector>>,
    pub search_terms: Vec<String>,
    pub scorer: RelevanceScorer,
    pub ledger: Ledger,
    pub store: Arc<dyn ObjectStore>,
    pub drafter: DynDraftingClient,
    pub template: PromptTemplate,
    pub sink: Arc<dyn ReviewSink>,
    pub platforms: Vec<Platform>,
    pub top_n: usize,
    pub throttle: Throttle,
}

impl Pipeline {
    /// Live wiring: filesystem store under `{output}/state`, markdown review
    /// files under `{output}/review`, collectors from the configured sources.
    pub fn from_config(cfg: &AppConfig) -> ScoutResult<Self> {
        let throttle = Throttle::new(cfg.item_delay);
        let store: Arc<dyn ObjectStore> = Arc::new(FsObjectStore::new(cfg.state_dir()));
        let scorer = RelevanceScorer::from_path(cfg.weights_path.as_deref())
            .map_err(|e| ScoutError::Configuration(format!("{e:#}")))?;
        let drafter = build_client(&cfg.drafting, cfg.drafting_mock, store.clone())?;

        Ok(Self {
            collectors: build_collectors(&cfg.sources, throttle),
            search_terms: cfg.search_terms.clone(),
            scorer,
            ledger: Ledger::new(store.clone(), cfg.history_key.clone(), cfg.history_cap),
            store,
            drafter,
            template: default_template()?.clone(),
            sink: Arc::new(MarkdownReviewSink::new(cfg.review_dir())),
            platforms: cfg.platforms.clone(),
            top_n: cfg.top_n,
            throttle,
        })
    }

    pub async fn run(&self, opts: &RunOptions) -> ScoutResult<RunSummary> {
        let started = std::time::Instant::now();
        let mut history = self.ledger.load().await?;

        let selection = match &opts.item {
            Some(item) => {
                if item.dedup_key().is_some_and(|u| history.contains(u)) {
                    warn!(target: "pipeline", "override item was already processed; drafting it again");
                }
                Selection {
                    picks: rank(vec![item.clone()], &self.scorer),
                    ..Selection::default()
                }
            }
            None => {
                let top_n = opts.top_n.unwrap_or(self.top_n).max(1);
                select_best(
                    &self.collectors,
                    &self.search_terms,
                    &history,
                    &self.scorer,
                    top_n,
                )
                .await
            }
        };

        let mut summary = RunSummary {
            dry_run: opts.dry_run,
            found: selection.stats.found,
            fresh: selection.stats.fresh,
            selected: selection
                .picks
                .iter()
                .map(|p| p.candidate.title.clone())
                .collect(),
            failed_sources: selection
                .stats
                .failed_sources()
                .into_iter()
                .map(str::to_string)
                .collect(),
            ..RunSummary::default()
        };
        if opts.item.is_some() {
            summary.found = 1;
            summary.fresh = 1;
        }

        if selection.is_empty() {
            summary.log();
            return Ok(summary);
        }

        if opts.dry_run {
            for (rank_pos, p) in selection.picks.iter().enumerate() {
                info!(
                    target: "pipeline",
                    rank = rank_pos + 1,
                    score = p.score,
                    source = %p.candidate.source_id,
                    title = %p.candidate.title,
                    matched = ?p.matched,
                    "dry run pick"
                );
            }
            summary.log();
            return Ok(summary);
        }

        match self.store.purge_expired().await {
            Ok(n) if n > 0 => info!(target: "pipeline", purged = n, "expired cache entries removed"),
            Ok(_) => {}
            Err(e) => warn!(target: "pipeline", error = ?e, "cache purge failed"),
        }

        let platforms: Vec<Platform> = match opts.platform {
            Some(p) => vec![p],
            None => self.platforms.clone(),
        };
        let today = chrono::Utc::now().date_naive();

        for (i, pick) in selection.picks.iter().enumerate() {
            if i > 0 {
                self.throttle.wait().await;
            }
            let (handles, failures) = self.process_pick(pick, &platforms, today).await?;
            summary.drafting_failures += failures;
            if !handles.is_empty() {
                if let Some(url) = pick.candidate.dedup_key() {
                    if history.record(url) {
                        summary.recorded += 1;
                    }
                }
            }
            summary.artifacts.extend(handles);
        }

        if summary.recorded > 0 {
            self.ledger.persist(&history).await?;
        }

        gauge!("scout_last_run_ts").set(chrono::Utc::now().timestamp() as f64);
        info!(target: "pipeline", elapsed_ms = started.elapsed().as_millis() as u64, "pipeline done");
        summary.log();
        Ok(summary)
    }

    /// Draft every platform concurrently, then write each draft that came
    /// back. Returns the written handles and the number of failed platforms.
    async fn process_pick(
        &self,
        pick: &ScoredCandidate,
        platforms: &[Platform],
        today: NaiveDate,
    ) -> ScoutResult<(Vec<ArtifactHandle>, usize)> {
        let mut failures = 0usize;
        let mut requests = Vec::with_capacity(platforms.len());
        for &p in platforms {
            match DraftRequest::build(&self.template, &pick.candidate, p) {
                Ok(req) => requests.push(req),
                Err(e) => {
                    warn!(target: "drafting", platform = %p, error = %e, "prompt rejected before dispatch");
                    counter!("scout_drafting_failures_total").increment(1);
                    failures += 1;
                }
            }
        }

        let drafts = join_all(requests.iter().map(|r| self.drafter.draft(r))).await;

        let mut handles = Vec::new();
        for (req, draft) in requests.iter().zip(drafts) {
            let Some(text) = draft else {
                let err = ScoutError::DraftingFailed {
                    platform: req.platform.id().to_string(),
                };
                warn!(target: "drafting", provider = self.drafter.provider_name(), error = %err, "skipping platform");
                counter!("scout_drafting_failures_total").increment(1);
                failures += 1;
                continue;
            };
            let artifact = GeneratedArtifact::new(pick, req.platform, text, today);
            handles.push(self.sink.save(&artifact).await?);
            counter!("scout_artifacts_total").increment(1);
        }
        Ok((handles, failures))
    }
}
