// tests/ledger_properties.rs
//! Processed-history invariants: idempotent filtering and recording, bounded
//! FIFO retention, and persistence through the filesystem store.

use std::sync::Arc;

use lead_scout::store::{FsObjectStore, ObjectStore};
use lead_scout::{filter_fresh, Candidate, Ledger, ProcessedHistory, ScoutError};
use rand::Rng;

fn random_url(rng: &mut impl Rng, space: u32) -> String {
    format!("https://news.example/{}", rng.random_range(0..space))
}

#[test]
fn filtering_twice_changes_nothing() {
    let mut rng = rand::rng();
    for _ in 0..50 {
        let mut history = ProcessedHistory::with_capacity(20);
        for _ in 0..rng.random_range(0..30) {
            history.record(&random_url(&mut rng, 40));
        }
        let pool: Vec<Candidate> = (0..rng.random_range(0..25))
            .map(|i| {
                let c = Candidate::new("src", format!("item {i}"));
                if rng.random_bool(0.8) {
                    c.with_url(random_url(&mut rng, 40))
                } else {
                    c
                }
            })
            .collect();

        let once = filter_fresh(pool.clone(), &history);
        assert_eq!(filter_fresh(once.clone(), &history), once);
        assert_eq!(filter_fresh(pool, &history), once);
    }
}

#[test]
fn recording_the_same_url_grows_by_at_most_one() {
    let mut h = ProcessedHistory::with_capacity(100);
    h.record("https://x/0");
    let before = h.len();
    h.record("https://x/new");
    h.record("https://x/new");
    assert_eq!(h.len(), before + 1);
}

#[test]
fn retention_is_bounded_and_fifo() {
    let n = 100;
    let mut h = ProcessedHistory::with_capacity(n);
    for i in 0..n + 5 {
        h.record(&format!("https://e/{i}"));
        assert!(h.len() <= n);
    }
    for i in 0..5 {
        assert!(!h.contains(&format!("https://e/{i}")));
    }
    assert!(h.contains("https://e/5"));
    assert!(h.contains(&format!("https://e/{}", n + 4)));
}

#[test]
fn random_record_sequences_stay_bounded() {
    let mut rng = rand::rng();
    for _ in 0..20 {
        let cap = rng.random_range(1..50);
        let mut h = ProcessedHistory::with_capacity(cap);
        for _ in 0..rng.random_range(0..300) {
            h.record(&random_url(&mut rng, 200));
            assert!(h.len() <= cap);
        }
        let urls: Vec<&str> = h.urls().collect();
        let mut dedup = urls.clone();
        dedup.sort_unstable();
        dedup.dedup();
        assert_eq!(dedup.len(), urls.len(), "no duplicates retained");
    }
}

#[test]
fn full_history_drops_its_oldest_entry_on_insert() {
    let urls: Vec<String> = (0..100).map(|i| format!("https://old/{i}")).collect();
    let mut h = ProcessedHistory::from_urls(urls, 100);
    assert_eq!(h.len(), 100);
    h.record("https://new/1");
    assert_eq!(h.len(), 100);
    assert!(!h.contains("https://old/0"));
    assert!(h.contains("https://old/1"));
    assert!(h.contains("https://new/1"));
}

#[tokio::test]
async fn ledger_persists_across_store_instances() {
    let dir = tempfile::tempdir().unwrap();
    {
        let store: Arc<dyn ObjectStore> = Arc::new(FsObjectStore::new(dir.path()));
        let ledger = Ledger::new(store, "processed_history.json", 3);
        let mut h = ledger.load().await.unwrap();
        for u in ["https://1", "https://2", "https://3", "https://4"] {
            h.record(u);
        }
        ledger.persist(&h).await.unwrap();
    }

    let raw = std::fs::read_to_string(dir.path().join("processed_history.json")).unwrap();
    let doc: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(
        doc["urls"],
        serde_json::json!(["https://2", "https://3", "https://4"])
    );

    let store: Arc<dyn ObjectStore> = Arc::new(FsObjectStore::new(dir.path()));
    let h = Ledger::new(store, "processed_history.json", 3)
        .load()
        .await
        .unwrap();
    assert!(!h.contains("https://1"));
    assert!(h.contains("https://4"));
}

#[tokio::test]
async fn unreadable_ledger_stops_the_run() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("processed_history.json"), "[[[").unwrap();
    let store: Arc<dyn ObjectStore> = Arc::new(FsObjectStore::new(dir.path()));
    let err = Ledger::new(store, "processed_history.json", 100)
        .load()
        .await
        .unwrap_err();
    assert!(matches!(err, ScoutError::Persistence { .. }));
}
