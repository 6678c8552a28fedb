// src/drafting/cache.rs
//! Response cache + per-day call limit around a `Provider`.
//!
//! Cached drafts live in the object store under `cache/drafts/<sha256>.json`
//! with the configured TTL. Only real provider calls count towards the daily
//! limit; the counter lives at `cache/drafts/daily_count.json` and resets at
//! UTC midnight.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::providers::Provider;
use super::{sanitize_draft, DraftRequest, DraftingClient};
use crate::store::ObjectStore;

const CACHE_PREFIX: &str = "cache/drafts";
const COUNTER_KEY: &str = "cache/drafts/daily_count.json";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
struct CachedDraft {
    text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
struct DailyCounter {
    date: String,
    count: u32,
}

impl DailyCounter {
    fn today() -> Self {
        Self {
            date: today(),
            count: 0,
        }
    }
}

fn today() -> String {
    chrono::Utc::now().date_naive().to_string()
}

pub struct CachingClient<P: Provider> {
    inner: P,
    store: Arc<dyn ObjectStore>,
    ttl: Duration,
    daily_limit: u32,
    // Loaded from the store on first use.
    counter: Mutex<Option<DailyCounter>>,
}

impl<P: Provider> CachingClient<P> {
    pub fn new(inner: P, store: Arc<dyn ObjectStore>, ttl: Duration, daily_limit: u32) -> Self {
        Self {
            inner,
            store,
            ttl,
            daily_limit,
            counter: Mutex::new(None),
        }
    }

    fn cache_key(&self, req: &DraftRequest) -> String {
        let max_chars = req.max_chars.to_string();
        let mut h = Sha256::new();
        for part in [
            self.inner.name(),
            req.platform.id(),
            req.system.as_str(),
            req.prompt.as_str(),
            max_chars.as_str(),
        ] {
            h.update(part.as_bytes());
            h.update([0u8]);
        }
        let digest = h.finalize();
        let hex: String = digest.iter().map(|b| format!("{b:02x}")).collect();
        format!("{CACHE_PREFIX}/{hex}.json")
    }

    async fn read_cached(&self, key: &str) -> Option<String> {
        match self.store.get(key).await {
            Ok(Some(bytes)) => serde_json::from_slice::<CachedDraft>(&bytes)
                .ok()
                .map(|c| c.text),
            Ok(None) => None,
            Err(e) => {
                warn!(target: "drafting", error = ?e, "draft cache read failed");
                None
            }
        }
    }

    async fn save_counter(&self, c: &DailyCounter) {
        let bytes = match serde_json::to_vec(c) {
            Ok(b) => b,
            Err(_) => return,
        };
        if let Err(e) = self.store.put(COUNTER_KEY, bytes, None).await {
            warn!(target: "drafting", error = ?e, "saving daily counter failed");
        }
    }

    /// Take one slot from today's budget; `false` when the limit is reached.
    async fn reserve(&self) -> bool {
        let snapshot = {
            let mut g = self.counter.lock().await;
            let mut c = match g.take() {
                Some(c) => c,
                None => match self.store.get(COUNTER_KEY).await {
                    Ok(Some(b)) => serde_json::from_slice::<DailyCounter>(&b)
                        .unwrap_or_else(|_| DailyCounter::today()),
                    _ => DailyCounter::today(),
                },
            };
            if c.date != today() {
                c = DailyCounter::today();
            }
            let allowed = c.count < self.daily_limit;
            if allowed {
                c.count = c.count.saturating_add(1);
            }
            *g = Some(c.clone());
            if !allowed {
                return false;
            }
            c
        };
        self.save_counter(&snapshot).await;
        true
    }

    /// Give a reserved slot back after a failed call.
    async fn release(&self) {
        let snapshot = {
            let mut g = self.counter.lock().await;
            match g.as_mut() {
                Some(c) => {
                    c.count = c.count.saturating_sub(1);
                    c.clone()
                }
                None => return,
            }
        };
        self.save_counter(&snapshot).await;
    }

    /// Calls counted today (loads the counter if needed).
    pub async fn calls_today(&self) -> u32 {
        let g = self.counter.lock().await;
        match g.as_ref() {
            Some(c) if c.date == today() => c.count,
            Some(_) => 0,
            None => match self.store.get(COUNTER_KEY).await {
                Ok(Some(b)) => serde_json::from_slice::<DailyCounter>(&b)
                    .ok()
                    .filter(|c| c.date == today())
                    .map_or(0, |c| c.count),
                _ => 0,
            },
        }
    }

    async fn draft_impl(&self, req: &DraftRequest) -> Option<String> {
        let key = self.cache_key(req);
        if let Some(hit) = self.read_cached(&key).await {
            debug!(target: "drafting", platform = %req.platform, "draft cache hit");
            return Some(hit);
        }

        if !self.reserve().await {
            warn!(
                target: "drafting",
                platform = %req.platform,
                limit = self.daily_limit,
                "daily drafting limit reached"
            );
            return None;
        }

        let fresh = self
            .inner
            .fetch(req)
            .await
            .map(|t| sanitize_draft(&t, req.max_chars))
            .filter(|t| !t.is_empty());

        match fresh {
            Some(text) => {
                let body = serde_json::to_vec(&CachedDraft { text: text.clone() });
                if let Ok(body) = body {
                    if let Err(e) = self.store.put(&key, body, Some(self.ttl)).await {
                        warn!(target: "drafting", error = ?e, "draft cache write failed");
                    }
                }
                Some(text)
            }
            None => {
                self.release().await;
                None
            }
        }
    }
}

impl<P: Provider> DraftingClient for CachingClient<P> {
    fn draft<'a>(
        &'a self,
        req: &'a DraftRequest,
    ) -> Pin<Box<dyn Future<Output = Option<String>> + Send + 'a>> {
        Box::pin(self.draft_impl(req))
    }
    fn provider_name(&self) -> &'static str {
        self.inner.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::Platform;
    use crate::store::MemoryObjectStore;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Counts calls; returns `None` when `ok` is false.
    struct Counting {
        calls: Arc<AtomicUsize>,
        ok: bool,
    }

    impl Provider for Counting {
        fn fetch<'a>(
            &'a self,
            req: &'a DraftRequest,
        ) -> Pin<Box<dyn Future<Output = Option<String>> + Send + 'a>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let out = self.ok.then(|| format!("draft for {}", req.prompt));
            Box::pin(async move { out })
        }
        fn name(&self) -> &'static str {
            "counting"
        }
    }

    fn req(prompt: &str) -> DraftRequest {
        DraftRequest {
            platform: Platform::LinkedIn,
            system: "sys".into(),
            prompt: prompt.into(),
            max_chars: 1300,
        }
    }

    fn client(ok: bool, limit: u32) -> (CachingClient<Counting>, Arc<AtomicUsize>, Arc<MemoryObjectStore>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let store = Arc::new(MemoryObjectStore::new());
        let c = CachingClient::new(
            Counting {
                calls: calls.clone(),
                ok,
            },
            store.clone(),
            Duration::from_secs(3600),
            limit,
        );
        (c, calls, store)
    }

    #[tokio::test]
    async fn second_identical_request_is_a_cache_hit() {
        let (c, calls, store) = client(true, 10);
        let a = c.draft(&req("p1")).await.unwrap();
        let b = c.draft(&req("p1")).await.unwrap();
        assert_eq!(a, b);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(c.calls_today().await, 1);
        assert!(store
            .keys()
            .iter()
            .any(|k| k.starts_with("cache/drafts/") && k != COUNTER_KEY));
    }

    #[tokio::test]
    async fn daily_limit_blocks_new_calls_but_not_hits() {
        let (c, calls, _) = client(true, 2);
        assert!(c.draft(&req("a")).await.is_some());
        assert!(c.draft(&req("b")).await.is_some());
        assert!(c.draft(&req("c")).await.is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(c.draft(&req("a")).await.is_some(), "cached hit still served");
    }

    #[tokio::test]
    async fn failed_calls_do_not_consume_budget() {
        let (c, calls, _) = client(false, 1);
        assert!(c.draft(&req("a")).await.is_none());
        assert!(c.draft(&req("b")).await.is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(c.calls_today().await, 0);
    }

    #[tokio::test]
    async fn counter_survives_a_new_client_on_the_same_store() {
        let (c, _, store) = client(true, 1);
        assert!(c.draft(&req("a")).await.is_some());

        let calls = Arc::new(AtomicUsize::new(0));
        let again = CachingClient::new(
            Counting {
                calls: calls.clone(),
                ok: true,
            },
            store,
            Duration::from_secs(3600),
            1,
        );
        assert_eq!(again.calls_today().await, 1);
        assert!(again.draft(&req("b")).await.is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
