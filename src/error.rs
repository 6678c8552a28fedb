// src/error.rs
//! Error taxonomy for a scouting run.
//!
//! Only `Persistence` and `Configuration` end a run. The other variants are
//! recovered where they occur and show up in the run summary instead.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScoutError {
    /// A single collector failed (network, HTTP status, parse).
    #[error("source `{source_id}` unavailable: {reason}")]
    SourceUnavailable { source_id: String, reason: String },

    /// Every source came back empty or everything was already processed.
    #[error("no events found")]
    NoCandidatesFound,

    /// The drafting service returned no usable text for a platform.
    #[error("drafting failed for platform `{platform}`")]
    DraftingFailed { platform: String },

    /// Ledger or review output could not be read/written.
    #[error("persistence failure ({what})")]
    Persistence {
        what: String,
        #[source]
        source: anyhow::Error,
    },

    /// Missing or invalid setting, raised before any I/O.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Prompt template with unknown or unfilled slots.
    #[error("prompt template error: {0}")]
    Template(String),
}

impl ScoutError {
    pub fn persistence(what: impl Into<String>, source: impl Into<anyhow::Error>) -> Self {
        Self::Persistence {
            what: what.into(),
            source: source.into(),
        }
    }

    pub fn source_unavailable(source_id: impl Into<String>, err: &anyhow::Error) -> Self {
        Self::SourceUnavailable {
            source_id: source_id.into(),
            reason: format!("{err:#}"),
        }
    }

    /// Whether the run must stop (non-zero exit) when this error surfaces.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Persistence { .. } | Self::Configuration(_))
    }
}

pub type ScoutResult<T> = Result<T, ScoutError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_persistence_and_config_are_fatal() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "ro");
        assert!(ScoutError::persistence("ledger", io).is_fatal());
        assert!(ScoutError::Configuration("x".into()).is_fatal());
        assert!(!ScoutError::NoCandidatesFound.is_fatal());
        assert!(!ScoutError::DraftingFailed {
            platform: "email".into()
        }
        .is_fatal());
        let e = anyhow::anyhow!("timeout");
        assert!(!ScoutError::source_unavailable("techcrunch", &e).is_fatal());
    }

    #[test]
    fn source_unavailable_message_names_source() {
        let e = anyhow::anyhow!("HTTP 503");
        let msg = ScoutError::source_unavailable("reddit_startups", &e).to_string();
        assert!(msg.contains("reddit_startups"));
        assert!(msg.contains("503"));
    }
}
