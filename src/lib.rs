// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod config;
pub mod engine;
pub mod error;
pub mod history;
pub mod platform;
pub mod relevance;
pub mod source_weights;
pub mod store;

// Collection, drafting, and review hand-off
pub mod drafting;
pub mod ingest;
pub mod review;

pub mod metrics;
pub mod pipeline;
pub mod telemetry;

// ---- Re-exports for stable public API ----
pub use crate::config::AppConfig;
pub use crate::engine::{rank, select_best, ScoredCandidate, Selection};
pub use crate::error::{ScoutError, ScoutResult};
pub use crate::history::{filter_fresh, Ledger, ProcessedHistory};
pub use crate::ingest::types::{Candidate, SourceCollector};
pub use crate::pipeline::{Pipeline, RunOptions, RunSummary, Throttle};
pub use crate::platform::Platform;
pub use crate::relevance::RelevanceScorer;
