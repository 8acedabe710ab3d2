//! Versioned in-memory caches.
//!
//! Keys carry the profile's version stamp, so any edit to a bot produces a
//! miss on its own; [`CacheService::invalidate`] only forces eviction ahead
//! of natural expiry. Each map sits behind a `std::sync::Mutex` that is never
//! held across an `.await` or while computing a value. Two tasks racing on
//! the same miss may both compute; the later insert wins.

use chatwright_config::CacheConfig;
use chatwright_core::market::MarketQuote;
use chatwright_core::profile::{BotProfile, Platform};
use serde::Serialize;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

use crate::knowledge::{CompiledKnowledge, compile, truncate};

/// A cached value with its creation time.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    pub value: V,
    pub created_at: Instant,
    seq: u64,
}

/// Hit/miss counters and occupancy for one cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub name: &'static str,
    pub entries: usize,
    pub capacity: usize,
    pub ttl_secs: u64,
    pub hits: u64,
    pub misses: u64,
}

struct CacheState<K, V> {
    entries: HashMap<K, CacheEntry<V>>,
    next_seq: u64,
    hits: u64,
    misses: u64,
}

/// A bounded TTL map. Entries are valid while `now - created_at < ttl`; over
/// capacity, the oldest-created entries go first.
pub struct VersionedCache<K, V> {
    name: &'static str,
    ttl: Duration,
    capacity: usize,
    state: Mutex<CacheState<K, V>>,
}

impl<K, V> VersionedCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new(name: &'static str, ttl: Duration, capacity: usize) -> Self {
        Self {
            name,
            ttl,
            capacity: capacity.max(1),
            state: Mutex::new(CacheState {
                entries: HashMap::new(),
                next_seq: 0,
                hits: 0,
                misses: 0,
            }),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, CacheState<K, V>> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn is_fresh(&self, entry: &CacheEntry<V>, now: Instant) -> bool {
        now.duration_since(entry.created_at) < self.ttl
    }

    /// Fresh value for `key`, counting the hit or miss.
    pub fn get(&self, key: &K) -> Option<V> {
        let now = Instant::now();
        let mut state = self.lock();
        let fresh = state
            .entries
            .get(key)
            .filter(|entry| self.is_fresh(entry, now))
            .map(|entry| entry.value.clone());
        match fresh {
            Some(_) => state.hits += 1,
            None => state.misses += 1,
        }
        fresh
    }

    /// Store `value`, then evict expired entries and trim to capacity.
    pub fn insert(&self, key: K, value: V) {
        let now = Instant::now();
        let mut state = self.lock();
        let seq = state.next_seq;
        state.next_seq += 1;
        state.entries.insert(
            key,
            CacheEntry {
                value,
                created_at: now,
                seq,
            },
        );

        let ttl = self.ttl;
        state
            .entries
            .retain(|_, entry| now.duration_since(entry.created_at) < ttl);

        while state.entries.len() > self.capacity {
            let oldest = state
                .entries
                .iter()
                .min_by_key(|(_, entry)| (entry.created_at, entry.seq))
                .map(|(key, _)| key.clone());
            match oldest {
                Some(key) => {
                    state.entries.remove(&key);
                }
                None => break,
            }
        }
    }

    /// Cached value for `key`, or compute, store and return a fresh one.
    /// The lock is released while `compute` runs.
    pub fn get_or_compute(&self, key: K, compute: impl FnOnce() -> V) -> V {
        if let Some(value) = self.get(&key) {
            return value;
        }
        let value = compute();
        self.insert(key, value.clone());
        value
    }

    /// Remove every entry whose key matches; returns how many were removed.
    pub fn invalidate_where(&self, predicate: impl Fn(&K) -> bool) -> usize {
        let mut state = self.lock();
        let before = state.entries.len();
        state.entries.retain(|key, _| !predicate(key));
        before - state.entries.len()
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        let state = self.lock();
        CacheStats {
            name: self.name,
            entries: state.entries.len(),
            capacity: self.capacity,
            ttl_secs: self.ttl.as_secs(),
            hits: state.hits,
            misses: state.misses,
        }
    }
}

// ── Keys ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KnowledgeKey {
    pub bot_id: String,
    pub version: i64,
    pub variant: &'static str,
}

impl KnowledgeKey {
    /// The untruncated compile of a profile version.
    pub fn full(profile: &BotProfile) -> Self {
        Self {
            bot_id: profile.id.clone(),
            version: profile.version(),
            variant: "full",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PromptKey {
    pub bot_id: String,
    pub version: i64,
    pub platform: Platform,
    pub max_length: usize,
}

// ── Service ───────────────────────────────────────────────────────────────

/// The process-wide caches: compiled knowledge, assembled prompts, and
/// market quotes. Construct once and share through an `Arc`.
pub struct CacheService {
    knowledge: VersionedCache<KnowledgeKey, Arc<CompiledKnowledge>>,
    prompts: VersionedCache<PromptKey, Arc<str>>,
    quotes: VersionedCache<String, MarketQuote>,
}

impl CacheService {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            knowledge: VersionedCache::new(
                "knowledge",
                Duration::from_secs(config.knowledge_ttl_secs),
                config.knowledge_capacity,
            ),
            prompts: VersionedCache::new(
                "prompt",
                Duration::from_secs(config.prompt_ttl_secs),
                config.prompt_capacity,
            ),
            quotes: VersionedCache::new(
                "quote",
                Duration::from_secs(config.quote_ttl_secs),
                config.quote_capacity,
            ),
        }
    }

    /// Compiled knowledge for a profile, cut to `max_length` when given.
    ///
    /// The cache holds the full compile per profile version; smaller budgets
    /// re-run truncation on the cached text rather than recompiling.
    pub fn knowledge(&self, profile: &BotProfile, max_length: Option<usize>) -> CompiledKnowledge {
        self.knowledge_with(profile, max_length, || compile(profile, None))
    }

    pub(crate) fn knowledge_with(
        &self,
        profile: &BotProfile,
        max_length: Option<usize>,
        compute: impl FnOnce() -> CompiledKnowledge,
    ) -> CompiledKnowledge {
        let full = self
            .knowledge
            .get_or_compute(KnowledgeKey::full(profile), || {
                debug!(bot_id = %profile.id, version = profile.version(), "Compiling knowledge");
                Arc::new(compute())
            });
        match max_length {
            Some(len) => truncate(&full, len),
            None => full.as_ref().clone(),
        }
    }

    /// Assembled prompt for `(profile version, platform, max_length)`.
    pub fn prompt(
        &self,
        profile: &BotProfile,
        platform: Platform,
        max_length: usize,
        build: impl FnOnce() -> String,
    ) -> Arc<str> {
        let key = PromptKey {
            bot_id: profile.id.clone(),
            version: profile.version(),
            platform,
            max_length,
        };
        self.prompts.get_or_compute(key, || Arc::from(build()))
    }

    pub fn quote(&self, token_id: &str) -> Option<MarketQuote> {
        self.quotes.get(&token_id.to_string())
    }

    pub fn store_quote(&self, token_id: &str, quote: MarketQuote) {
        self.quotes.insert(token_id.to_string(), quote);
    }

    /// Evict every knowledge and prompt entry for a bot.
    pub fn invalidate(&self, bot_id: &str) -> usize {
        let knowledge = self.knowledge.invalidate_where(|k| k.bot_id == bot_id);
        let prompts = self.prompts.invalidate_where(|k| k.bot_id == bot_id);
        debug!(bot_id, knowledge, prompts, "Invalidated bot caches");
        knowledge + prompts
    }

    pub fn stats(&self) -> Vec<CacheStats> {
        vec![
            self.knowledge.stats(),
            self.prompts.stats(),
            self.quotes.stats(),
        ]
    }
}

impl Default for CacheService {
    fn default() -> Self {
        Self::new(&CacheConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatwright_core::profile::Faq;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn cache(capacity: usize) -> VersionedCache<String, u32> {
        VersionedCache::new("test", Duration::from_secs(600), capacity)
    }

    #[tokio::test(start_paused = true)]
    async fn hit_within_ttl_miss_after() {
        let c = cache(10);
        c.insert("a".into(), 1);
        tokio::time::advance(Duration::from_secs(599)).await;
        assert_eq!(c.get(&"a".into()), Some(1));
        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(c.get(&"a".into()), None);

        let stats = c.stats();
        assert_eq!((stats.hits, stats.misses), (1, 1));
    }

    #[tokio::test(start_paused = true)]
    async fn evicts_oldest_created_first() {
        let c = cache(2);
        c.insert("a".into(), 1);
        tokio::time::advance(Duration::from_secs(1)).await;
        c.insert("b".into(), 2);
        tokio::time::advance(Duration::from_secs(1)).await;
        c.insert("c".into(), 3);

        assert_eq!(c.len(), 2);
        assert_eq!(c.get(&"a".into()), None);
        assert_eq!(c.get(&"b".into()), Some(2));
        assert_eq!(c.get(&"c".into()), Some(3));
    }

    #[tokio::test(start_paused = true)]
    async fn same_instant_inserts_evict_in_insertion_order() {
        let c = cache(2);
        for (i, key) in ["a", "b", "c"].into_iter().enumerate() {
            c.insert(key.into(), i as u32);
        }
        assert_eq!(c.get(&"a".into()), None);
        assert_eq!(c.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn get_or_compute_runs_once_while_fresh() {
        let c = cache(10);
        let calls = AtomicUsize::new(0);
        let compute = || {
            calls.fetch_add(1, Ordering::SeqCst);
            7
        };
        assert_eq!(c.get_or_compute("k".into(), compute), 7);
        assert_eq!(c.get_or_compute("k".into(), compute), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        tokio::time::advance(Duration::from_secs(601)).await;
        c.get_or_compute("k".into(), compute);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn invalidate_where_counts_removed() {
        let c = cache(10);
        c.insert("bot-1:a".into(), 1);
        c.insert("bot-1:b".into(), 2);
        c.insert("bot-2:a".into(), 3);
        assert_eq!(c.invalidate_where(|k| k.starts_with("bot-1")), 2);
        assert_eq!(c.len(), 1);
    }

    fn profile() -> BotProfile {
        let mut p = BotProfile::new("bot-1", "Acme");
        p.faqs.push(Faq::new("Hours?", "9 to 5"));
        p
    }

    #[tokio::test(start_paused = true)]
    async fn knowledge_hits_until_version_changes() {
        let service = CacheService::default();
        let mut p = profile();
        let calls = AtomicUsize::new(0);
        let counted = |p: &BotProfile| {
            calls.fetch_add(1, Ordering::SeqCst);
            compile(p, None)
        };

        service.knowledge_with(&p, None, || counted(&p));
        service.knowledge_with(&p, Some(50), || counted(&p));
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        p.updated_at += chrono::Duration::seconds(1);
        service.knowledge_with(&p, None, || counted(&p));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn smaller_budget_truncates_cached_full_text() {
        let service = CacheService::default();
        let mut p = profile();
        p.urls.push(chatwright_core::profile::UrlSource {
            url: "https://acme.test".into(),
            title: "Home".into(),
            content: "x".repeat(1_500),
            enabled: true,
            category: None,
            tags: vec![],
        });
        let full = service.knowledge(&p, None);
        let cut = service.knowledge(&p, Some(600));
        assert!(!full.truncated);
        assert!(cut.truncated);
        assert_eq!(cut, truncate(&full, 600));
    }

    #[test]
    fn invalidate_evicts_knowledge_and_prompts() {
        let service = CacheService::default();
        let p = profile();
        service.knowledge(&p, None);
        service.prompt(&p, Platform::Web, 100, || "prompt".into());
        service.prompt(&p, Platform::Telegram, 100, || "prompt".into());

        assert_eq!(service.invalidate("bot-1"), 3);
        assert_eq!(service.invalidate("bot-1"), 0);
    }

    #[test]
    fn prompt_key_includes_platform_and_length() {
        let service = CacheService::default();
        let p = profile();
        let web = service.prompt(&p, Platform::Web, 100, || "web".into());
        let tg = service.prompt(&p, Platform::Telegram, 100, || "telegram".into());
        let cached = service.prompt(&p, Platform::Web, 100, || "rebuilt".into());
        let small = service.prompt(&p, Platform::Web, 50, || "small".into());
        assert_eq!((&*web, &*tg, &*cached, &*small), ("web", "telegram", "web", "small"));
    }

    #[test]
    fn stats_cover_all_three_caches() {
        let names: Vec<&str> = CacheService::default()
            .stats()
            .into_iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(names, vec!["knowledge", "prompt", "quote"]);
    }
}
