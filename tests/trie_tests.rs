//! Integration tests for the trie container: matching semantics, order
//! independence, compaction, serialisation, and a large randomized set.

use std::collections::BTreeSet;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use hostname_trie_r::{MatcherKind, TrieContainer, TrieRef};

fn build(hostnames: &[&str]) -> (TrieContainer, TrieRef) {
    let mut container = TrieContainer::new();
    let mut trie = container.create_trie();
    for hostname in hostnames {
        container.add_hostname(&mut trie, hostname);
    }
    (container, trie)
}

#[test]
fn test_single_hostname_scenario() {
    let (mut container, trie) = build(&["example.com"]);
    assert_eq!(container.matches_hostname(&trie, "example.com"), 0);
    assert_eq!(container.matches_hostname(&trie, "foo.example.com"), 4);
    assert_eq!(container.matches_hostname(&trie, "notexample.com"), -1);
    assert_eq!(container.matches_hostname(&trie, "example.co"), -1);
}

#[test]
fn test_nested_suffix_scenario() {
    let (mut container, trie) = build(&["example.com", "sub.example.com"]);
    assert_eq!(container.matches_hostname(&trie, "sub.example.com"), 0);
    assert_eq!(container.matches_hostname(&trie, "x.sub.example.com"), 2);
    assert_eq!(container.matches_hostname(&trie, "other.example.com"), 6);
}

#[test]
fn test_double_insert_scenario() {
    let mut container = TrieContainer::new();
    let mut trie = container.create_trie();
    assert!(container.add_hostname(&mut trie, "ads.example.com"));
    let cells = container.num_cells();
    assert!(!container.add_hostname(&mut trie, "ads.example.com"));
    assert_eq!(container.num_cells(), cells, "re-add must not grow the arena");
    let stored: Vec<String> = container.iter(&trie).collect();
    assert_eq!(stored, vec!["ads.example.com"]);
}

#[test]
fn test_overlapping_suffixes_scenario() {
    let (mut container, trie) = build(&["a.b.c", "b.c"]);
    assert_eq!(container.matches_hostname(&trie, "z.b.c"), 2);
    assert_eq!(container.matches_hostname(&trie, "a.b.c"), 0);
    assert_eq!(container.matches_hostname(&trie, "x.a.b.c"), 2);
}

#[test]
fn test_match_offset_lands_on_label_boundary() {
    let (mut container, trie) = build(&["shop.example.co.uk", "example.co.uk", "co.uk"]);
    let stored: BTreeSet<String> = container.iter(&trie).collect();
    for query in [
        "shop.example.co.uk",
        "www.shop.example.co.uk",
        "example.co.uk",
        "a.b.example.co.uk",
        "co.uk",
        "deep.co.uk",
    ] {
        let k = container.matches_hostname(&trie, query);
        assert!(k >= 0, "{query} should match");
        let k = k as usize;
        assert!(stored.contains(&query[k..]), "{query}[{k}..] must be stored");
        assert!(k == 0 || query.as_bytes()[k - 1] == b'.');
    }
    assert_eq!(container.matches_hostname(&trie, "notco.uk"), -1);
}

#[test]
fn test_order_independence() {
    let hostnames = [
        "example.com",
        "sub.example.com",
        "deep.sub.example.com",
        "other.org",
        "a.b.c",
        "b.c",
        "tracker.a.b.c",
    ];
    let queries = [
        "example.com",
        "x.example.com",
        "sub.example.com",
        "y.sub.example.com",
        "deep.sub.example.com",
        "other.org",
        "www.other.org",
        "a.b.c",
        "x.a.b.c",
        "z.b.c",
        "tracker.a.b.c",
        "q.tracker.a.b.c",
        "unrelated.net",
        "c",
        "b.d",
    ];
    let (mut forward, ftrie) = build(&hostnames);
    let reversed: Vec<&str> = hostnames.iter().rev().copied().collect();
    let (mut backward, btrie) = build(&reversed);
    for query in queries {
        assert_eq!(
            forward.matches_hostname(&ftrie, query),
            backward.matches_hostname(&btrie, query),
            "insertion order changed the result for {query}"
        );
    }
}

#[cfg(target_endian = "little")]
#[test]
fn test_backends_agree_on_same_buffer() {
    let (mut container, trie) = build(&[
        "example.com",
        "sub.example.com",
        "ads.net",
        "a.b.c",
        "b.c",
        "very.long.hostname.with.many.labels.example.org",
    ]);
    for query in [
        "example.com",
        "www.sub.example.com",
        "x.ads.net",
        "ads.net",
        "z.b.c",
        "x.a.b.c",
        "cdn.very.long.hostname.with.many.labels.example.org",
        "nomatch.io",
        "",
        "c",
    ] {
        container.set_needle(query);
        assert_eq!(
            container.matches_with(MatcherKind::Scalar, &trie),
            container.matches_with(MatcherKind::Packed, &trie),
            "backends disagree on {query:?}"
        );
    }
}

#[test]
fn test_serialised_buffer_scenario() {
    let (mut container, trie) = build(&["example.com"]);
    container.optimize();
    let iroot = trie.root();
    let bytes = container.into_bytes();

    // a fresh container around the stored bytes answers without re-insertion
    let restored = TrieContainer::from_bytes(bytes).unwrap();
    let trie = restored.trie_at(iroot).unwrap();
    let mut restored = restored;
    assert_eq!(restored.matches_hostname(&trie, "foo.example.com"), 4);
}

#[test]
fn test_iteration_matches_inserted_set() {
    let hostnames = [
        "example.com",
        "sub.example.com",
        "ads.net",
        "x.ads.net",
        "a.b.c",
    ];
    let (container, trie) = build(&hostnames);
    let got: BTreeSet<String> = container.iter(&trie).collect();
    let want: BTreeSet<String> = hostnames.iter().map(|s| s.to_string()).collect();
    assert_eq!(got, want);
    assert_eq!(trie.len(), hostnames.len());
}

fn random_hostname(rng: &mut StdRng, tail: &str) -> String {
    // 16..=31 bytes including the fixed ".{tail}" suffix
    let body_len: usize = rng.gen_range(12..=27);
    let mut name = String::with_capacity(body_len + tail.len() + 1);
    let mut remaining = body_len;
    while remaining > 0 {
        let label_len = rng.gen_range(1..=remaining);
        for _ in 0..label_len {
            name.push(char::from(b'a' + rng.gen_range(0..26)));
        }
        remaining -= label_len;
        if remaining > 1 {
            name.push('.');
            remaining -= 1;
        } else if remaining == 1 {
            // no room left for a dot plus label; extend the last label
            name.push(char::from(b'a' + rng.gen_range(0..26)));
            remaining = 0;
        }
    }
    format!("{name}.{tail}")
}

#[test]
fn test_large_randomized_set() {
    const COUNT: usize = 100_000;
    let mut rng = StdRng::seed_from_u64(0x686e_7472);

    // members end with ".mem", non-members with ".non", so a non-member can
    // never be equal to or a subdomain of a member
    let mut members = BTreeSet::new();
    while members.len() < COUNT {
        members.insert(random_hostname(&mut rng, "mem"));
    }
    let mut non_members = BTreeSet::new();
    while non_members.len() < COUNT {
        non_members.insert(random_hostname(&mut rng, "non"));
    }

    let mut container = TrieContainer::new();
    let mut trie = container.create_trie();
    for hostname in &members {
        assert!(container.add_hostname(&mut trie, hostname), "{hostname}");
    }
    assert_eq!(trie.len(), COUNT);

    container.optimize();

    for hostname in &members {
        assert_eq!(container.matches_hostname(&trie, hostname), 0, "{hostname}");
        let sub = format!("www.{hostname}");
        assert_eq!(container.matches_hostname(&trie, &sub), 4, "{sub}");
    }
    for hostname in &non_members {
        assert_eq!(container.matches_hostname(&trie, hostname), -1, "{hostname}");
    }
}

#[test]
fn test_optimize_idempotent_behaviour() {
    let (mut container, trie) = build(&["example.com", "tracker.net"]);
    let first = container.optimize();
    let second = container.optimize();
    assert_eq!(first, second);
    assert_eq!(container.matches_hostname(&trie, "a.tracker.net"), 2);
}
