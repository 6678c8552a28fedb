//! # Source Bonuses
//!
//! Maps a candidate's origin (e.g. "techcrunch", "reddit_startups") to a
//! small integer bonus added on top of the phrase score, so trusted sources
//! win close calls.
//!
//! - Case-insensitive lookup with normalization of punctuation, dashes, etc.
//! - Aliases map alternative spellings to canonical sources.
//! - Fallback order: aliases → exact match → substring match → default.

use serde::Deserialize;
use std::collections::HashMap;

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct SourceBonusTable {
    /// Bonus if no match is found.
    #[serde(default)]
    pub default_bonus: i32,
    /// Explicit bonuses for canonical source names.
    #[serde(default)]
    pub bonuses: HashMap<String, i32>,
    /// Aliases mapping non-canonical names → canonical names.
    #[serde(default)]
    pub aliases: HashMap<String, String>,
}

impl Default for SourceBonusTable {
    fn default() -> Self {
        Self::default_seed()
    }
}

impl SourceBonusTable {
    /// Build a table, normalizing all keys the same way lookups are normalized.
    pub fn new(
        default_bonus: i32,
        bonuses: impl IntoIterator<Item = (String, i32)>,
        aliases: impl IntoIterator<Item = (String, String)>,
    ) -> Self {
        Self {
            default_bonus,
            bonuses: bonuses
                .into_iter()
                .map(|(k, v)| (normalize(&k), v))
                .collect(),
            aliases: aliases
                .into_iter()
                .map(|(a, c)| (normalize(&a), normalize(&c)))
                .collect(),
        }
    }

    /// Get the bonus for a given source id.
    ///
    /// Steps:
    /// 1. Alias lookup (normalized) → canonical → bonus.
    /// 2. Exact match.
    /// 3. Substring fallback (longest key wins, so results don't depend on map order).
    /// 4. Default.
    pub fn bonus_for(&self, source: &str) -> i32 {
        let s = normalize(source);

        if let Some(canon) = self.aliases.get(&s) {
            if let Some(&b) = self.bonuses.get(&normalize(canon)) {
                return b;
            }
        }

        if let Some(&b) = self.bonuses.get(&s) {
            return b;
        }

        if let Some((_, &b)) = self
            .bonuses
            .iter()
            .filter(|(k, _)| !k.is_empty() && s.contains(k.as_str()))
            .max_by(|(a, _), (b, _)| a.len().cmp(&b.len()).then_with(|| b.cmp(a)))
        {
            return b;
        }

        self.default_bonus
    }

    /// Primary news source +3, founder/sales communities +2.
    pub fn default_seed() -> Self {
        Self::new(
            0,
            [
                ("techcrunch", 3),
                ("reddit startups", 2),
                ("reddit sales", 2),
            ]
            .map(|(k, v)| (k.to_string(), v)),
            [
                ("tc", "techcrunch"),
                ("techcrunch com", "techcrunch"),
                ("r startups", "reddit startups"),
                ("r sales", "reddit sales"),
            ]
            .map(|(a, c)| (a.to_string(), c.to_string())),
        )
    }
}

/// Lowercase, replace punctuation/dashes/underscores with spaces,
/// collapse multiple spaces into one.
pub(crate) fn normalize(s: &str) -> String {
    let mut out = s.trim().to_ascii_lowercase();

    for ch in ['—', '–', '-', '_', '/', '\\'] {
        out = out.replace(ch, " ");
    }

    out = out.replace(['\n', '\r', '\t', '.', ',', '’', '\''], " ");

    out.split_whitespace().collect::<Vec<_>>().join(" ")
}
