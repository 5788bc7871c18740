//! A bounded LRU cache of compiled regex patterns:
//! 64 entries keyed by pattern string, carrying either the compiled
//! pattern or a sentinel marking "compile failed" so a malformed pattern
//! isn't recompiled (and re-fail-logged) on every evaluation.

use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;
use parking_lot::Mutex;
use regex::Regex;

/// Default capacity for the pattern cache.
pub const DEFAULT_CAPACITY: usize = 64;

#[derive(Clone)]
enum CacheEntry {
    Compiled(Arc<Regex>),
    Failed,
}

/// Thread-safe bounded LRU cache from pattern string to compiled `Regex`
/// (or a "compile failed" marker).
pub struct RegexCache {
    inner: Mutex<LruCache<String, CacheEntry>>,
}

impl RegexCache {
    pub fn new(capacity: usize) -> Self {
        let cap = NonZeroUsize::new(capacity.max(1)).expect("capacity >= 1 after max(1)");
        RegexCache {
            inner: Mutex::new(LruCache::new(cap)),
        }
    }

    /// Compile `pattern` (or fetch it from cache). Returns `None` if the
    /// pattern is invalid, without attempting to recompile it on a
    /// subsequent call.
    pub fn get_or_compile(&self, pattern: &str) -> Option<Arc<Regex>> {
        let mut guard = self.inner.lock();
        if let Some(entry) = guard.get(pattern) {
            return match entry {
                CacheEntry::Compiled(re) => Some(re.clone()),
                CacheEntry::Failed => None,
            };
        }
        match Regex::new(pattern) {
            Ok(re) => {
                let re = Arc::new(re);
                guard.put(pattern.to_string(), CacheEntry::Compiled(re.clone()));
                Some(re)
            }
            Err(_) => {
                guard.put(pattern.to_string(), CacheEntry::Failed);
                None
            }
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for RegexCache {
    fn default() -> Self {
        RegexCache::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compiles_and_caches_valid_pattern() {
        let cache = RegexCache::default();
        let re1 = cache.get_or_compile(r"^foo\d+$").expect("valid pattern");
        assert!(re1.is_match("foo123"));
        assert_eq!(cache.len(), 1);
        let re2 = cache.get_or_compile(r"^foo\d+$").expect("cached hit");
        assert!(Arc::ptr_eq(&re1, &re2));
    }

    #[test]
    fn invalid_pattern_returns_none_and_is_remembered() {
        let cache = RegexCache::default();
        assert!(cache.get_or_compile("(unclosed").is_none());
        assert_eq!(cache.len(), 1);
        assert!(cache.get_or_compile("(unclosed").is_none());
    }

    #[test]
    fn evicts_least_recently_used_beyond_capacity() {
        let cache = RegexCache::new(2);
        cache.get_or_compile("a").unwrap();
        cache.get_or_compile("b").unwrap();
        cache.get_or_compile("c").unwrap();
        assert_eq!(cache.len(), 2);
    }
}
