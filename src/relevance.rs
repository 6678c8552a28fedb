// src/relevance.rs
//! Relevance scorer: an explicit phrase → weight table plus a per-source bonus.
//!
//! Scoring is pure and deterministic. The scanned text is title, excerpt and
//! company joined by single spaces and case-folded. Each row fires at most
//! once per candidate: a phrase row when its phrase occurs in that text, a
//! co-occurrence row when every listed term does. Sums saturate at the `i32`
//! bounds instead of overflowing.

use anyhow::{anyhow, bail, Context};
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;
use tracing::debug;

use crate::ingest::types::Candidate;
use crate::source_weights::SourceBonusTable;

/// Short, stable, anonymized id for log lines (never log raw text).
pub(crate) fn anon_hash(text: &str) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let digest = hasher.finalize();
    let mut out = String::with_capacity(12);
    for b in digest.iter().take(6) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

/// Result of scoring one candidate.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Relevance {
    pub score: i32,
    /// Ids of table rows that fired, then `source:<id>` when a bonus applied.
    pub matched: Vec<String>,
}

/* ----------------------------
Weight table (from TOML or seed)
---------------------------- */

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct PhraseWeight {
    pub id: String,
    pub phrase: String,
    pub weight: i32,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct CoOccurrence {
    pub id: String,
    pub all_of: Vec<String>,
    pub weight: i32,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct WeightTable {
    #[serde(default)]
    pub phrases: Vec<PhraseWeight>,
    #[serde(default)]
    pub co_occurrence: Vec<CoOccurrence>,
}

impl WeightTable {
    /// Built-in table tuned for "company just got budget to hire sales" events.
    pub fn default_seed() -> Self {
        let phrases = [
            ("first_sales_hire", "first sales hire", 20),
            ("series_a", "series a", 15),
            ("icp", "icp", 10),
            ("b2b", "b2b", 5),
            ("saas", "saas", 5),
            ("consumer", "consumer", -5),
            ("crypto", "crypto", -3),
            ("web3", "web3", -3),
        ]
        .into_iter()
        .map(|(id, phrase, weight)| PhraseWeight {
            id: id.to_string(),
            phrase: phrase.to_string(),
            weight,
        })
        .collect();

        let co_occurrence = vec![CoOccurrence {
            id: "founding_sales".to_string(),
            all_of: vec!["founding".to_string(), "sales".to_string()],
            weight: 15,
        }];

        Self {
            phrases,
            co_occurrence,
        }
    }

    /// Lowercase/trim every phrase and reject rows that could never fire or collide.
    pub fn validated(mut self) -> anyhow::Result<Self> {
        let mut ids = HashSet::new();
        for p in &mut self.phrases {
            p.phrase = p.phrase.trim().to_lowercase();
            if p.phrase.is_empty() {
                bail!("phrase row `{}` has an empty phrase", p.id);
            }
            if !ids.insert(p.id.clone()) {
                bail!("duplicate weight row id `{}`", p.id);
            }
        }
        for c in &mut self.co_occurrence {
            c.all_of = c
                .all_of
                .iter()
                .map(|t| t.trim().to_lowercase())
                .filter(|t| !t.is_empty())
                .collect();
            if c.all_of.is_empty() {
                bail!("co-occurrence row `{}` has no terms", c.id);
            }
            if !ids.insert(c.id.clone()) {
                bail!("duplicate weight row id `{}`", c.id);
            }
        }
        Ok(self)
    }

    /// Weight of a row by id (phrase or co-occurrence).
    pub fn weight_of(&self, id: &str) -> Option<i32> {
        self.phrases
            .iter()
            .find(|p| p.id == id)
            .map(|p| p.weight)
            .or_else(|| {
                self.co_occurrence
                    .iter()
                    .find(|c| c.id == id)
                    .map(|c| c.weight)
            })
    }
}

/// File shape: `[[phrases]]`, `[[co_occurrence]]`, optional `[source_bonus]`.
#[derive(Debug, Deserialize)]
struct ScorerFile {
    #[serde(flatten)]
    table: WeightTable,
    #[serde(default)]
    source_bonus: Option<SourceBonusFile>,
}

#[derive(Debug, Deserialize)]
struct SourceBonusFile {
    #[serde(default)]
    default_bonus: i32,
    #[serde(default)]
    bonuses: HashMap<String, i32>,
    #[serde(default)]
    aliases: HashMap<String, String>,
}

/* ----------------------------
Scorer
---------------------------- */

/// Case-folded `title excerpt company`, blank fields skipped.
fn haystack(c: &Candidate) -> String {
    [
        Some(c.title.as_str()),
        c.excerpt.as_deref(),
        c.company.as_deref(),
    ]
    .into_iter()
    .flatten()
    .map(str::trim)
    .filter(|f| !f.is_empty())
    .collect::<Vec<_>>()
    .join(" ")
    .to_lowercase()
}

#[derive(Debug, Clone)]
pub struct RelevanceScorer {
    table: WeightTable,
    sources: SourceBonusTable,
}

impl Default for RelevanceScorer {
    fn default() -> Self {
        Self::new(WeightTable::default_seed(), SourceBonusTable::default_seed())
    }
}

impl RelevanceScorer {
    /// Caller is expected to pass a table that went through `validated()`;
    /// the seed already satisfies it.
    pub fn new(table: WeightTable, sources: SourceBonusTable) -> Self {
        Self { table, sources }
    }

    pub fn table(&self) -> &WeightTable {
        &self.table
    }

    pub fn sources(&self) -> &SourceBonusTable {
        &self.sources
    }

    /// Load from a TOML string. Missing `[source_bonus]` keeps the seed bonuses.
    pub fn from_toml_str(toml_str: &str) -> anyhow::Result<Self> {
        let file: ScorerFile = toml::from_str(toml_str).context("parsing weight table toml")?;
        let table = file.table.validated()?;
        let sources = match file.source_bonus {
            Some(sb) => SourceBonusTable::new(sb.default_bonus, sb.bonuses, sb.aliases),
            None => SourceBonusTable::default_seed(),
        };
        Ok(Self::new(table, sources))
    }

    /// Load from a file path, or the seed when no path is configured.
    pub fn from_path(path: Option<&Path>) -> anyhow::Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let content = fs::read_to_string(path)
            .map_err(|e| anyhow!("failed to read weight table at {}: {}", path.display(), e))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("weight table at {}", path.display()))
    }

    /// Score with the list of rows that fired.
    pub fn explain(&self, c: &Candidate) -> Relevance {
        let haystack = haystack(c);

        let mut rel = Relevance::default();

        for p in &self.table.phrases {
            if haystack.contains(p.phrase.as_str()) {
                rel.score = rel.score.saturating_add(p.weight);
                rel.matched.push(p.id.clone());
            }
        }

        for co in &self.table.co_occurrence {
            if co.all_of.iter().all(|t| haystack.contains(t.as_str())) {
                rel.score = rel.score.saturating_add(co.weight);
                rel.matched.push(co.id.clone());
            }
        }

        let bonus = self.sources.bonus_for(&c.source_id);
        if bonus != 0 {
            rel.score = rel.score.saturating_add(bonus);
            rel.matched.push(format!("source:{}", c.source_id));
        }

        debug!(
            target: "relevance",
            id = %anon_hash(c.url.as_deref().unwrap_or(&c.title)),
            score = rel.score,
            matched = ?rel.matched,
            "scored"
        );
        rel
    }

    pub fn score(&self, c: &Candidate) -> i32 {
        self.explain(c).score
    }
}

/* ----------------------------
Tests
---------------------------- */
