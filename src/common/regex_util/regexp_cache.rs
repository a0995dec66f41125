use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};

use lru_time_cache::LruCache;
use regex::Regex;

use crate::config::get_global_settings;
use crate::error::AnalyzerResult;

pub const DEFAULT_CACHE_SIZE: usize = 100;

/// Bounded LRU of compiled full-match patterns, keyed by the source pattern.
pub struct RegexpCache {
    requests: AtomicU64,
    misses: AtomicU64,
    inner: Mutex<LruCache<String, Arc<Regex>>>,
    capacity: usize,
}

impl RegexpCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            requests: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            inner: Mutex::new(LruCache::with_capacity(capacity)),
            capacity,
        }
    }

    fn lock(&self) -> MutexGuard<'_, LruCache<String, Arc<Regex>>> {
        // the cache holds no invariants a panicking holder could break
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn get(&self, key: &str) -> Option<Arc<Regex>> {
        self.requests.fetch_add(1, Ordering::Relaxed);
        let item = self.lock().get(key).cloned();
        if item.is_none() {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }
        item
    }

    pub fn put(&self, key: &str, value: Arc<Regex>) {
        self.lock().insert(key.to_string(), value);
    }

    /// Returns the compiled full-match form of `pattern`, compiling it on a miss.
    pub fn get_or_compile(&self, pattern: &str) -> AnalyzerResult<Arc<Regex>> {
        if let Some(re) = self.get(pattern) {
            return Ok(re);
        }
        let re = Arc::new(compile_anchored(pattern)?);
        self.put(pattern, re.clone());
        Ok(re)
    }

    /// returns the number of cached regexps.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().len() == 0
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    pub fn requests(&self) -> u64 {
        self.requests.load(Ordering::Relaxed)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// Compiles `pattern` so that it must match the whole subject.
pub fn compile_anchored(pattern: &str) -> AnalyzerResult<Regex> {
    Ok(Regex::new(&format!("^(?:{pattern})$"))?)
}

static REGEXP_CACHE: OnceLock<RegexpCache> = OnceLock::new();

pub fn get_regexp_cache() -> &'static RegexpCache {
    REGEXP_CACHE.get_or_init(|| RegexpCache::new(get_global_settings().regex_cache_size))
}
