//! Thread-safe hostname set facade with match-result memoisation.
//!
//! The trie container itself is single-threaded; this wrapper provides the
//! read-write exclusion multi-threaded hosts need, plus an LRU cache so hot
//! queries skip the trie walk entirely.

use std::num::NonZeroUsize;

use lru::LruCache;
use parking_lot::Mutex;

use crate::container::TrieContainer;
use crate::error::Result;
use crate::parser;
use crate::types::{CacheKey, TrieRef};

/// Default size of the match-result LRU cache.
pub const DEFAULT_CACHE_SIZE: usize = 1024;

struct SetState {
    container: TrieContainer,
    trie: TrieRef,
}

/// A set of hostnames answering equal-or-subdomain queries.
///
/// # Example
///
/// ```rust
/// use hostname_trie_r::HostnameSet;
///
/// let set = HostnameSet::from_hosts_text("ads.example.com\ntracker.net\n").unwrap();
/// assert_eq!(set.matches("cdn.ads.example.com"), Some(4));
/// assert!(set.contains("tracker.net"));
/// assert!(!set.contains("example.com"));
/// ```
pub struct HostnameSet {
    state: Mutex<SetState>,
    cache: Mutex<LruCache<CacheKey, i32>>,
}

impl std::fmt::Debug for HostnameSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostnameSet").finish_non_exhaustive()
    }
}

impl HostnameSet {
    /// Create an empty set with the default cache size.
    pub fn new() -> Self {
        Self::with_cache_size(DEFAULT_CACHE_SIZE)
    }

    /// Create an empty set with an explicit match-result cache size.
    pub fn with_cache_size(cache_size: usize) -> Self {
        let mut container = TrieContainer::new();
        let trie = container.create_trie();
        Self {
            state: Mutex::new(SetState { container, trie }),
            cache: Mutex::new(LruCache::new(cache_capacity(cache_size))),
        }
    }

    /// Build a compacted set from blocklist text (see
    /// [`parse_hosts`](crate::parser::parse_hosts) for the format).
    pub fn from_hosts_text(text: &str) -> Result<Self> {
        let hostnames = parser::parse_hosts(text)?;
        let set = Self::new();
        {
            let mut state = set.state.lock();
            let SetState { container, trie } = &mut *state;
            for hostname in &hostnames {
                container.add_hostname(trie, hostname);
            }
            container.optimize();
        }
        Ok(set)
    }

    /// Insert a hostname. Returns `true` if it was not already present.
    /// Insertion clears the match-result cache.
    pub fn insert(&self, hostname: &str) -> bool {
        let hostname = hostname.to_lowercase();
        let added = {
            let mut state = self.state.lock();
            let SetState { container, trie } = &mut *state;
            container.add_hostname(trie, &hostname)
        };
        if added {
            self.cache.lock().clear();
        }
        added
    }

    /// Match a query hostname against the set.
    ///
    /// Returns the byte offset where the matched stored hostname begins
    /// inside the query (0 when the query itself is stored), or `None`.
    pub fn matches(&self, hostname: &str) -> Option<usize> {
        // stored hostnames are lowercase; normalize only when needed
        let normalized;
        let hostname = if hostname.bytes().any(|b| b.is_ascii_uppercase()) {
            normalized = hostname.to_lowercase();
            normalized.as_str()
        } else {
            hostname
        };

        let key = CacheKey::from_hostname(hostname);

        let mut cache = self.cache.lock();
        if let Some(&cached) = cache.get(&key) {
            return offset_from(cached);
        }

        // Cache miss: walk the trie while holding the cache lock so
        // concurrent queries for the same hostname compute it once.
        let result = {
            let mut state = self.state.lock();
            let SetState { container, trie } = &mut *state;
            container.set_needle(hostname);
            container.matches(trie)
        };
        cache.put(key, result);
        offset_from(result)
    }

    /// True when the query hostname itself is stored in the set.
    pub fn contains(&self, hostname: &str) -> bool {
        self.matches(hostname) == Some(0)
    }

    /// True when the query equals, or is a subdomain of, a stored hostname.
    pub fn is_covered(&self, hostname: &str) -> bool {
        self.matches(hostname).is_some()
    }

    /// Snapshot of the stored hostnames.
    pub fn hostnames(&self) -> Vec<String> {
        let state = self.state.lock();
        state.container.iter(&state.trie).collect()
    }

    /// Number of stored hostnames.
    pub fn len(&self) -> usize {
        self.state.lock().trie.len()
    }

    /// True when no hostname is stored.
    pub fn is_empty(&self) -> bool {
        self.state.lock().trie.is_empty()
    }

    /// Clear the match-result cache.
    pub fn clear_cache(&self) {
        self.cache.lock().clear();
    }

    /// Compact the container and return the serialised buffer.
    pub fn to_snapshot_bytes(&self) -> Vec<u8> {
        let mut state = self.state.lock();
        state.container.optimize();
        state.container.as_bytes().to_vec()
    }

    /// Rebuild a set from a serialised buffer, without re-insertion.
    pub fn from_snapshot_bytes(bytes: Vec<u8>) -> Result<Self> {
        let container = TrieContainer::from_bytes(bytes)?;
        let trie = container.trie_at(TrieContainer::FIRST_TRIE_ROOT)?;
        Ok(Self {
            state: Mutex::new(SetState { container, trie }),
            cache: Mutex::new(LruCache::new(cache_capacity(DEFAULT_CACHE_SIZE))),
        })
    }
}

impl Default for HostnameSet {
    fn default() -> Self {
        Self::new()
    }
}

fn cache_capacity(cache_size: usize) -> NonZeroUsize {
    NonZeroUsize::new(cache_size).unwrap_or(NonZeroUsize::MIN)
}

fn offset_from(result: i32) -> Option<usize> {
    (result >= 0).then_some(result as usize)
}
