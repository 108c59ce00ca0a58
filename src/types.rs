/// Handle to one logical trie inside a [`TrieContainer`](crate::TrieContainer).
///
/// Multiple tries can coexist in one container; they share the segment pool
/// but not cells. A `TrieRef` stays valid until the container is `reset`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrieRef {
    pub(crate) iroot: u32,
    pub(crate) size: u32,
}

impl TrieRef {
    /// Word index of the root cell inside the container buffer.
    pub fn root(&self) -> u32 {
        self.iroot
    }

    /// Number of hostnames successfully added through this reference.
    pub fn len(&self) -> usize {
        self.size as usize
    }

    /// True if no hostname has been added yet.
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }
}

/// Cache key for the match-result LRU cache.
/// Lightweight u64 hash that does NOT clone the hostname string on
/// construction. A hash collision can only conflate two query hostnames,
/// which yields a stale-but-valid match result for the colliding query;
/// the cache is cleared on every insertion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct CacheKey(u64);

impl CacheKey {
    /// Compute a cache key hash from a query hostname.
    pub fn from_hostname(hostname: &str) -> Self {
        use std::hash::{Hash, Hasher};
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        hostname.hash(&mut hasher);
        Self(hasher.finish())
    }
}
