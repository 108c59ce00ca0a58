mod packed;
mod scalar;

use once_cell::sync::Lazy;

use crate::container::TrieContainer;

/// Matcher backend over a container buffer.
///
/// Both backends run the identical traversal on the identical byte image;
/// [`Packed`](MatcherKind::Packed) trades bounds checks for native word
/// loads and is only engaged on little-endian hosts that pass the startup
/// probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatcherKind {
    /// Portable bounds-checked traversal.
    Scalar,
    /// Unchecked word-load traversal, little-endian hosts only.
    Packed,
}

impl MatcherKind {
    pub(crate) fn run(&self, buf: &[u8], iroot: u32) -> i32 {
        match self {
            MatcherKind::Scalar => scalar::matches(buf, iroot),
            MatcherKind::Packed => packed::matches(buf, iroot),
        }
    }
}

/// The backend engaged by [`TrieContainer::matches`], decided once per
/// process. Detection failure is non-fatal: the scalar backend is the
/// fallback.
pub fn active() -> MatcherKind {
    *ACTIVE
}

static ACTIVE: Lazy<MatcherKind> = Lazy::new(|| {
    if cfg!(target_endian = "big") {
        return MatcherKind::Scalar;
    }
    if probe_agrees() {
        MatcherKind::Packed
    } else {
        MatcherKind::Scalar
    }
});

/// Differential probe: both backends must agree on a small reference trie
/// before the packed backend may replace the scalar one.
fn probe_agrees() -> bool {
    let mut container = TrieContainer::new();
    let mut trie = container.create_trie();
    for hostname in ["example.com", "sub.example.com", "a.b.c"] {
        container.set_needle(hostname);
        container.add(&mut trie);
    }
    let queries = [
        "example.com",
        "foo.example.com",
        "notexample.com",
        "x.a.b.c",
        "b.c",
        "",
    ];
    queries.into_iter().all(|query| {
        container.set_needle(query);
        scalar::matches(container.as_bytes(), trie.root())
            == packed::matches(container.as_bytes(), trie.root())
    })
}
