// tests/selection_scenarios.rs
//! Selection behaviour over fixture collectors: scoring purity, ranking,
//! graceful degradation, and the end-to-end selection scenarios.

use lead_scout::ingest::providers::fixture::FixtureCollector;
use lead_scout::{
    rank, select_best, Candidate, ProcessedHistory, RelevanceScorer, SourceCollector,
};

fn cand(url: &str, title: &str) -> Candidate {
    Candidate::new("test_source", title).with_url(url)
}

fn boxed(v: Vec<FixtureCollector>) -> Vec<Box<dyn SourceCollector>> {
    v.into_iter()
        .map(|c| Box::new(c) as Box<dyn SourceCollector>)
        .collect()
}

fn scenario_pool() -> Vec<Candidate> {
    vec![
        cand("a", "Startup raises Series A seed funding"),
        cand("b", "Local bakery opens"),
    ]
}

#[test]
fn scoring_is_pure() {
    let s = RelevanceScorer::default();
    let c = Candidate::new("techcrunch", "B2B SaaS startup makes first sales hire")
        .with_excerpt("Crypto-free ICP, Series A closed")
        .with_company("Acme");
    let before = c.clone();
    let first = s.score(&c);
    let second = s.score(&c);
    assert_eq!(first, second);
    assert_eq!(c, before);
}

#[test]
fn adding_a_positive_phrase_never_lowers_the_score() {
    let s = RelevanceScorer::default();
    let titles = [
        "",
        "Local bakery opens",
        "crypto consumer app raises",
        "Series A for web3 tooling",
        "b2b",
    ];
    let boosters = ["series a", "first sales hire", "ICP", "B2B", "SaaS", "founding sales team"];
    for t in titles {
        let base = Candidate::new("test_source", t);
        for b in boosters {
            let boosted = Candidate::new("test_source", format!("{t} {b}"));
            assert!(
                s.score(&boosted) >= s.score(&base),
                "`{t}` + `{b}` scored lower"
            );
        }
    }
}

#[test]
fn rank_picks_strict_max_and_breaks_ties_by_discovery_order() {
    let s = RelevanceScorer::default();
    let ranked = rank(
        vec![
            cand("1", "bakery"),
            cand("2", "b2b saas"),
            cand("3", "series a"),
            cand("4", "another series a"),
        ],
        &s,
    );
    assert_eq!(ranked[0].candidate.url.as_deref(), Some("3"));
    assert_eq!(ranked[1].candidate.url.as_deref(), Some("4"));
    assert!(ranked[0].score > ranked[2].score);

    let tied = rank(vec![cand("x", "nothing"), cand("y", "nothing either")], &s);
    assert_eq!(tied[0].candidate.url.as_deref(), Some("x"));
}

#[tokio::test]
async fn one_failing_source_does_not_sink_the_pass() {
    let cols = boxed(vec![
        FixtureCollector::new("techcrunch", vec![cand("t1", "b2b saas launches")]),
        FixtureCollector::failing("reddit_startups", "HTTP 503"),
        FixtureCollector::new("reddit_sales", vec![cand("r1", "Our first sales hire")]),
    ]);
    let sel = select_best(
        &cols,
        &[],
        &ProcessedHistory::default(),
        &RelevanceScorer::default(),
        1,
    )
    .await;
    assert_eq!(sel.best().unwrap().candidate.url.as_deref(), Some("r1"));
    assert_eq!(sel.stats.failed_sources(), vec!["reddit_startups"]);
    assert_eq!(sel.stats.found, 2);
}

#[tokio::test]
async fn scenario_a_series_a_wins() {
    let s = RelevanceScorer::default();
    let pool = scenario_pool();
    assert!(s.score(&pool[0]) >= 15);
    assert_eq!(s.score(&pool[1]), 0);

    let cols = boxed(vec![FixtureCollector::new("test_source", pool)]);
    let sel = select_best(&cols, &[], &ProcessedHistory::default(), &s, 1).await;
    assert_eq!(sel.best().unwrap().candidate.url.as_deref(), Some("a"));
    assert!(sel.best().unwrap().matched.contains(&"series_a".to_string()));
}

#[tokio::test]
async fn scenario_b_history_leaves_only_the_weaker_candidate() {
    let s = RelevanceScorer::default();
    let history = ProcessedHistory::from_urls(["a".to_string()], 100);
    let cols = boxed(vec![FixtureCollector::new("test_source", scenario_pool())]);
    let sel = select_best(&cols, &[], &history, &s, 5).await;
    assert_eq!(sel.stats.fresh, 1);
    assert_eq!(sel.picks.len(), 1);
    assert_eq!(sel.picks[0].candidate.url.as_deref(), Some("b"));
    assert_eq!(sel.picks[0].score, 0);
}

#[tokio::test]
async fn scenario_d_every_source_down_means_no_pick() {
    let cols = boxed(vec![
        FixtureCollector::failing("techcrunch", "timeout"),
        FixtureCollector::failing("reddit_startups", "HTTP 429"),
        FixtureCollector::failing("reddit_sales", "bad json"),
    ]);
    let sel = select_best(
        &cols,
        &["series a".to_string()],
        &ProcessedHistory::default(),
        &RelevanceScorer::default(),
        1,
    )
    .await;
    assert!(sel.is_empty());
    assert!(sel.best().is_none());
    assert_eq!(sel.stats.failures.len(), 3);
    assert!(sel.stats.failures.iter().all(|e| !e.is_fatal()));
}
