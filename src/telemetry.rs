// src/telemetry.rs
//! Tracing setup for the batch binary.
//!
//! `RUST_LOG` wins when set. Otherwise the pipeline targets log at info and
//! everything else at warn. `SCOUT_LOG_JSON=1` switches to JSON lines.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

pub const ENV_LOG_JSON: &str = "SCOUT_LOG_JSON";

pub const DEFAULT_FILTER: &str =
    "lead_scout=info,ingest=info,engine=info,history=info,drafting=info,review=info,pipeline=info,warn";

pub fn json_requested(value: Option<&str>) -> bool {
    value.is_some_and(|v| matches!(v.trim(), "1" | "true" | "yes"))
}

/// Install the global subscriber. Safe to call twice (second call is a no-op).
pub fn init() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let json = json_requested(std::env::var(ENV_LOG_JSON).ok().as_deref());

    let result = if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_target(true))
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().compact().with_target(true))
            .try_init()
    };
    if result.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}
