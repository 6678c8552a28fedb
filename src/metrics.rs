// src/metrics.rs
//! Run counters and the optional Prometheus textfile snapshot.
//!
//! A batch job has no scrape endpoint, so the exposition text is written to
//! `SCOUT_METRICS_PATH` at the end of a run (node-exporter textfile style).

use std::path::{Path, PathBuf};

use anyhow::Context;
use metrics::{describe_counter, describe_gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

/// Register help text for the run-level series. Idempotent.
pub fn describe_all() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "scout_artifacts_total",
            "Review files written (one per platform draft)."
        );
        describe_counter!(
            "scout_drafting_failures_total",
            "Platforms skipped because no draft came back."
        );
        describe_gauge!(
            "scout_last_run_ts",
            "Unix time of the last completed non-dry run."
        );
    });
}

pub struct TextfileExporter {
    handle: PrometheusHandle,
    path: PathBuf,
}

impl TextfileExporter {
    /// Install the global Prometheus recorder. Call once per process.
    pub fn install(path: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .context("installing prometheus recorder")?;
        describe_all();
        Ok(Self::from_handle(handle, path))
    }

    pub fn from_handle(handle: PrometheusHandle, path: impl Into<PathBuf>) -> Self {
        Self {
            handle,
            path: path.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn render(&self) -> String {
        self.handle.render()
    }

    /// Write the current exposition text atomically.
    pub async fn write(&self) -> anyhow::Result<()> {
        crate::store::write_atomic(&self.path, self.render().as_bytes())
            .await
            .with_context(|| format!("writing metrics snapshot {}", self.path.display()))
    }
}
