//! lead-scout batch entrypoint.
//! Loads `.env`, reads the configuration once, runs one pass, exits.

use std::process::ExitCode;

use clap::Parser;
use lead_scout::config::AppConfig;
use lead_scout::ingest::normalize_excerpt;
use lead_scout::metrics::TextfileExporter;
use lead_scout::pipeline::{Pipeline, RunOptions};
use lead_scout::platform::Platform;
use lead_scout::{telemetry, Candidate};

#[derive(Debug, Parser)]
#[command(name = "lead-scout", version, about = "Find a compelling event, draft outreach, queue it for review")]
struct Cli {
    /// Gather, score, and print the ranking; draft and write nothing.
    #[arg(long)]
    dry_run: bool,

    /// Draft for one platform only (linkedin, twitter, email, reddit).
    #[arg(long)]
    platform: Option<Platform>,

    /// Process this URL instead of running selection.
    #[arg(long, requires = "title")]
    item: Option<String>,

    /// Title for --item.
    #[arg(long, requires = "item")]
    title: Option<String>,

    /// Summary text for --item.
    #[arg(long, requires = "item")]
    excerpt: Option<String>,

    /// Company name for --item.
    #[arg(long, requires = "item")]
    company: Option<String>,

    /// Process the best N candidates instead of one.
    #[arg(long, value_parser = clap::value_parser!(u16).range(1..))]
    top: Option<u16>,
}

impl Cli {
    fn override_item(&self) -> Option<Candidate> {
        let url = self.item.as_deref()?.trim();
        let title = self.title.as_deref().unwrap_or_default().trim();
        let mut c = Candidate::new("manual", title).with_url(url);
        c.excerpt = self.excerpt.as_deref().and_then(normalize_excerpt);
        c.company = self
            .company
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);
        Some(c)
    }

    fn run_options(&self) -> RunOptions {
        RunOptions {
            dry_run: self.dry_run,
            platform: self.platform,
            item: self.override_item(),
            top_n: self.top.map(usize::from),
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    telemetry::init();
    let cli = Cli::parse();

    match run(&cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = ?e, "run failed");
            eprintln!("lead-scout: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: &Cli) -> anyhow::Result<()> {
    let cfg = AppConfig::from_env()?;
    if !cli.dry_run {
        cfg.validate_for_drafting()?;
    }
    if let Some(p) = cli.platform {
        if !cfg.platforms.contains(&p) {
            tracing::warn!(platform = %p, "platform is not in SCOUT_PLATFORMS; drafting it anyway");
        }
    }
    tracing::info!(
        sources = cfg.sources.len(),
        terms = cfg.search_terms.len(),
        platforms = ?cfg.platforms,
        drafting = ?cfg.drafting,
        "configuration loaded"
    );

    let exporter = match &cfg.metrics_path {
        Some(path) => Some(TextfileExporter::install(path)?),
        None => None,
    };

    let pipeline = Pipeline::from_config(&cfg)?;
    let outcome = pipeline.run(&cli.run_options()).await;

    if let Some(exp) = &exporter {
        if let Err(e) = exp.write().await {
            tracing::warn!(error = ?e, "metrics snapshot not written");
        }
    }

    let summary = outcome?;
    for a in &summary.artifacts {
        println!("{}", a.location);
    }
    Ok(())
}
