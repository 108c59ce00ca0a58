//! Integration tests for the HostnameSet facade using realistic blocklist
//! data.

use hostname_trie_r::{parse_hosts, HostnameSet, TrieError};

/// Ad and tracker hostnames in the shape real blocklists use.
fn blocklist_text() -> &'static str {
    "\
# Ad servers
0.0.0.0 ads.doubleclick.test adservice.google.test
0.0.0.0 pagead2.googlesyndication.test
0.0.0.0 securepubads.g.doubleclick.test

# Trackers
telemetry.example.test
metrics.icloud.test
app-measurement.test
graph.facebook.test

# Mining pools
pool.minexmr.test
xmr.nanopool.test
"
}

#[test]
fn test_blocklist_end_to_end() {
    let set = HostnameSet::from_hosts_text(blocklist_text()).unwrap();
    assert_eq!(set.len(), 10);

    // exact entries
    assert!(set.contains("ads.doubleclick.test"));
    assert!(set.contains("app-measurement.test"));
    assert!(set.contains("xmr.nanopool.test"));

    // subdomains are covered
    assert!(set.is_covered("static.ads.doubleclick.test"));
    assert!(set.is_covered("eu1.pool.minexmr.test"));
    assert_eq!(set.matches("cdn.telemetry.example.test"), Some(4));

    // label boundaries hold
    assert!(!set.is_covered("notads.doubleclick.test"));
    assert!(!set.is_covered("doubleclick.test"));
    assert!(!set.is_covered("example.test"));
}

#[test]
fn test_insert_after_build() {
    let set = HostnameSet::from_hosts_text("ads.example.test\n").unwrap();
    assert!(!set.is_covered("late.tracker.test"));
    assert!(set.insert("tracker.test"));
    assert!(set.is_covered("late.tracker.test"));
    assert_eq!(set.len(), 2);
}

#[test]
fn test_parse_error_propagates() {
    let err = HostnameSet::from_hosts_text("ads.example.test\nnot a hostname!\n").unwrap_err();
    match err {
        TrieError::ParseErrorAtLine { line, .. } => assert_eq!(line, 2),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_snapshot_survives_process_boundary() {
    let set = HostnameSet::from_hosts_text(blocklist_text()).unwrap();
    let bytes = set.to_snapshot_bytes();

    // simulate a store/load cycle of the raw bytes
    let restored = HostnameSet::from_snapshot_bytes(bytes.clone()).unwrap();
    assert_eq!(restored.len(), set.len());
    assert!(restored.is_covered("static.ads.doubleclick.test"));
    assert!(!restored.is_covered("doubleclick.test"));

    let mut hostnames = restored.hostnames();
    hostnames.sort();
    let mut want = parse_hosts(blocklist_text()).unwrap();
    want.sort();
    assert_eq!(hostnames, want);

    // a second snapshot of an untouched set is byte-identical
    assert_eq!(restored.to_snapshot_bytes(), bytes);
}

#[test]
fn test_concurrent_queries() {
    let set = HostnameSet::from_hosts_text(blocklist_text()).unwrap();
    std::thread::scope(|scope| {
        for _ in 0..4 {
            scope.spawn(|| {
                for _ in 0..1000 {
                    assert!(set.is_covered("static.ads.doubleclick.test"));
                    assert!(!set.is_covered("unrelated.example"));
                }
            });
        }
    });
}

#[test]
fn test_garbage_snapshot_rejected() {
    assert!(HostnameSet::from_snapshot_bytes(vec![0xff; 100]).is_err());
    assert!(HostnameSet::from_snapshot_bytes(vec![0xff; 4096]).is_err());
}
