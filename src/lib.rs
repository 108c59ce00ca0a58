//! Hostname Trie - A compact, mutable, arena-backed radix trie for hostname
//! blocklist matching
//!
//! This library answers, for any query hostname, whether it is equal to or a
//! subdomain of any stored hostname, with support for:
//! - Incremental insertion (no global rebuild, tens or hundreds of
//!   thousands of entries)
//! - A single linear buffer as backing store, an order of magnitude smaller
//!   than a string set
//! - Serialisation as the raw buffer: store it anywhere, restore it without
//!   fix-ups
//! - Two interchangeable matcher backends over the same buffer (portable
//!   scalar and unchecked word-load), selected at startup
//! - Blocklist/hosts-file parsing and a thread-safe cached set facade
//!
//! # Example
//!
//! ```rust
//! use hostname_trie_r::TrieContainer;
//!
//! let mut container = TrieContainer::new();
//! let mut trie = container.create_trie();
//!
//! container.add_hostname(&mut trie, "example.com");
//! container.add_hostname(&mut trie, "ads.example.net");
//!
//! // 0 means the query itself is stored
//! assert_eq!(container.matches_hostname(&trie, "example.com"), 0);
//! // 4 is where the matched suffix begins in "foo.example.com"
//! assert_eq!(container.matches_hostname(&trie, "foo.example.com"), 4);
//! // label boundaries are respected
//! assert_eq!(container.matches_hostname(&trie, "notexample.com"), -1);
//!
//! // compact and ship the raw bytes
//! let layout = container.optimize();
//! assert!(layout.byte_length <= 131072);
//! ```
//!
//! # Matching semantics
//!
//! A stored hostname `s` matches a query `q` iff `q == s` or `q` ends with
//! `"." + s`. Matching walks the query right to left and prefers the
//! deepest stored suffix; the returned offset `k` always satisfies
//! `q[k..] ∈ set` with `k == 0` or `q[k - 1] == '.'`.

pub mod container;
pub mod error;
pub mod iter;
pub mod matcher;
pub mod parser;
pub mod set;
pub mod types;

// Re-export commonly used items
pub use container::{TrieContainer, TrieLayout};
pub use error::{Result, TrieError};
pub use iter::TrieIter;
pub use matcher::MatcherKind;
pub use parser::{parse_hosts, parse_hosts_from_file, validate_hostname, MAX_HOSTNAME_LEN};
pub use set::{HostnameSet, DEFAULT_CACHE_SIZE};
pub use types::TrieRef;
