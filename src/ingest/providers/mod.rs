// src/ingest/providers/mod.rs
pub mod fixture;
pub mod reddit;
pub mod rss;

use crate::config::SourceSpec;
use crate::ingest::types::SourceCollector;
use crate::pipeline::Throttle;

pub(crate) const USER_AGENT: &str = "lead-scout/0.1 (compelling-event discovery)";

/// Build live collectors for the configured sources, in configuration order.
/// `term_delay` spaces out per-term requests for sources that search term by term.
pub fn build_collectors(specs: &[SourceSpec], term_delay: Throttle) -> Vec<Box<dyn SourceCollector>> {
    specs
        .iter()
        .map(|spec| -> Box<dyn SourceCollector> {
            match spec {
                SourceSpec::Rss { id, url } => Box::new(rss::RssCollector::from_url(id, url)),
                SourceSpec::Reddit { subreddit } => {
                    Box::new(reddit::RedditCollector::new(subreddit).with_term_delay(term_delay))
                }
            }
        })
        .collect()
}
