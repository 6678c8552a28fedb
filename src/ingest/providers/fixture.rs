// src/ingest/providers/fixture.rs
use anyhow::{anyhow, Result};
use async_trait::async_trait;

use crate::ingest::types::{Candidate, SourceCollector};

/// In-memory collector: fixed candidates or a forced failure.
/// Backs the single-item override mode and the test suites.
pub struct FixtureCollector {
    source_id: String,
    outcome: Outcome,
}

enum Outcome {
    Items(Vec<Candidate>),
    Fail(String),
}

impl FixtureCollector {
    pub fn new(source_id: impl Into<String>, items: Vec<Candidate>) -> Self {
        Self {
            source_id: source_id.into(),
            outcome: Outcome::Items(items),
        }
    }

    pub fn failing(source_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            source_id: source_id.into(),
            outcome: Outcome::Fail(reason.into()),
        }
    }
}

#[async_trait]
impl SourceCollector for FixtureCollector {
    async fn collect(&self, _search_terms: &[String]) -> Result<Vec<Candidate>> {
        match &self.outcome {
            Outcome::Items(v) => Ok(v.clone()),
            Outcome::Fail(reason) => Err(anyhow!("{reason}")),
        }
    }

    fn source_id(&self) -> &str {
        &self.source_id
    }
}
