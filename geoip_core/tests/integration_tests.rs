use std::{
    fs,
    net::{IpAddr, Ipv4Addr},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Barrier,
    },
    thread,
};

use geoip_core::{
    DataSource, Dataset, DirectorySource, Error, ErrorCode, FetchError, IpIndex, IpManager,
    SourceConfig, StaticSource,
};

fn sample() -> StaticSource<&'static str, &'static str> {
    StaticSource::new(vec![
        ("192.168.0.0/16", "CN"),
        ("10.0.0.0/8", "US"),
        ("172.16.0.0/12", "JP"),
        ("8.8.8.0/24", "US"),
    ])
}

fn q(m: &IpManager<&'static str>, addr: &str) -> Option<&'static str> {
    m.query(addr).map(|p| *p)
}

struct FailingSource;

impl DataSource for FailingSource {
    type Cidr = String;
    type Payload = &'static str;

    fn fetch(&self) -> Result<Dataset<String, &'static str>, FetchError> {
        Err(FetchError::new("upstream unavailable"))
    }
}

#[test]
fn end_to_end_lookup() {
    let m = IpManager::new(&sample()).unwrap();
    assert_eq!(q(&m, "192.168.1.1"), Some("CN"));
    assert_eq!(q(&m, "10.1.1.1"), Some("US"));
    assert_eq!(q(&m, "8.8.8.8"), Some("US"));
    assert_eq!(q(&m, "172.16.5.5"), Some("JP"));
    assert_eq!(q(&m, "1.2.3.4"), None);
    assert_eq!(m.stats().v4_prefixes, 4);
}

#[test]
fn lpm_precedence() {
    let m = IpManager::with_dataset(vec![("10.0.0.0/8", "A"), ("10.1.0.0/16", "B")]).unwrap();
    assert_eq!(q(&m, "10.1.2.3"), Some("B"));
    assert_eq!(q(&m, "10.2.2.3"), Some("A"));
}

#[test]
fn unparsable_query_is_a_miss() {
    let m = IpManager::new(&sample()).unwrap();
    assert_eq!(q(&m, "not an address"), None);
    assert_eq!(q(&m, "10.0.0.0/8"), None);
    assert_eq!(q(&m, ""), None);
}

#[test]
fn query_ignores_surrounding_whitespace() {
    let m = IpManager::new(&sample()).unwrap();
    assert_eq!(q(&m, " 8.8.8.8\n"), Some("US"));
    assert_eq!(q(&m, "\t192.168.1.1 "), Some("CN"));
}

#[test]
fn query_address_matches_query() {
    let m = IpManager::new(&sample()).unwrap();
    let ip = IpAddr::V4(Ipv4Addr::new(172, 16, 5, 5));
    assert_eq!(m.query_address(ip).map(|p| *p), Some("JP"));
}

#[test]
fn family_dispatch() {
    // 0.0.0.0/0 would swallow every IPv4 query; IPv6 must not see it
    let m = IpManager::with_dataset(vec![
        ("0.0.0.0/0", "v4-default"),
        ("2001:db8::/32", "v6-doc"),
    ])
    .unwrap();
    assert_eq!(q(&m, "8.8.8.8"), Some("v4-default"));
    assert_eq!(q(&m, "2001:db8::1"), Some("v6-doc"));
    assert_eq!(q(&m, "2001:db9::1"), None);

    let only_v6 = IpManager::with_dataset(vec![("::/0", "v6-default")]).unwrap();
    assert_eq!(q(&only_v6, "8.8.8.8"), None);
    assert_eq!(q(&only_v6, "2606:4700::1111"), Some("v6-default"));
}

#[test]
fn ipv4_mapped_queries_use_ipv4_data() {
    let m = IpManager::new(&sample()).unwrap();
    assert_eq!(q(&m, "::ffff:192.168.1.1"), Some("CN"));
    assert_eq!(q(&m, "::ffff:1.2.3.4"), None);

    let mapped = IpManager::with_dataset(vec![("::ffff:10.0.0.0/104", "mapped")]).unwrap();
    assert_eq!(q(&mapped, "10.9.9.9"), Some("mapped"));
    assert_eq!(mapped.stats().v4_prefixes, 1);
    assert_eq!(mapped.stats().v6_prefixes, 0);
}

#[test]
fn ipv6_prefixes_beyond_32_bits() {
    let m = IpManager::with_dataset(vec![
        ("2001:db8:aaaa::/48", "first"),
        ("2001:db8:bbbb::/48", "second"),
        ("2001:db8:bbbb:1::/64", "inner"),
    ])
    .unwrap();
    assert_eq!(q(&m, "2001:db8:aaaa::5"), Some("first"));
    assert_eq!(q(&m, "2001:db8:bbbb:2::5"), Some("second"));
    assert_eq!(q(&m, "2001:db8:bbbb:1::5"), Some("inner"));
    assert_eq!(q(&m, "2001:db8:cccc::5"), None);
}

#[test]
fn duplicate_prefix_last_write_wins() {
    let m = IpManager::with_dataset(vec![("8.8.8.0/24", "old"), ("8.8.8.0/24", "new")]).unwrap();
    assert_eq!(q(&m, "8.8.8.8"), Some("new"));
    assert_eq!(m.stats().v4_prefixes, 1);
}

#[test]
fn update_is_idempotent() {
    let m = IpManager::new(&sample()).unwrap();
    let addrs = ["192.168.1.1", "10.1.1.1", "8.8.8.8", "172.16.5.5", "1.2.3.4"];
    let before: Vec<_> = addrs.iter().map(|a| q(&m, a)).collect();

    m.refresh(&sample()).unwrap();
    m.refresh(&sample()).unwrap();

    let after: Vec<_> = addrs.iter().map(|a| q(&m, a)).collect();
    assert_eq!(before, after);
}

#[test]
fn failed_update_keeps_previous_index() {
    let m = IpManager::new(&sample()).unwrap();
    let before = m.snapshot();

    let err = m
        .update(vec![
            ("1.0.0.0/8", "NEW"),
            ("300.0.0.0/8", "BAD"),
            ("2.0.0.0/8", "NEW"),
        ])
        .unwrap_err();

    match &err {
        Error::BuildAborted {
            position, cidr, ..
        } => {
            assert_eq!(*position, 1);
            assert_eq!(cidr, "300.0.0.0/8");
        }
        other => panic!("unexpected error {other:?}"),
    }
    assert_eq!(err.code(), ErrorCode::BuildAborted);
    assert!(err.to_string().contains("300.0.0.0/8"));

    assert!(Arc::ptr_eq(&before, &m.snapshot()));
    assert_eq!(q(&m, "1.1.1.1"), None);
    assert_eq!(q(&m, "192.168.1.1"), Some("CN"));
}

#[test]
fn successful_update_replaces_everything() {
    let m = IpManager::new(&sample()).unwrap();
    m.update(vec![("1.0.0.0/8", "AU")]).unwrap();
    assert_eq!(q(&m, "1.2.3.4"), Some("AU"));
    assert_eq!(q(&m, "192.168.1.1"), None);
}

#[test]
fn empty_update_clears_index() {
    let m = IpManager::new(&sample()).unwrap();
    m.update(Vec::<(&str, &str)>::new()).unwrap();
    assert!(m.snapshot().is_empty());
    assert_eq!(q(&m, "10.0.0.1"), None);
}

#[test]
fn construction_fails_on_fetch_error() {
    let err = IpManager::new(&FailingSource).err().expect("must fail");
    assert_eq!(err.code(), ErrorCode::FetchFailed);
    assert!(err.to_string().contains("upstream unavailable"));
}

#[test]
fn construction_fails_on_bad_dataset() {
    let res = IpManager::with_dataset(vec![("10.0.0.0/8", "US"), ("garbage", "XX")]);
    assert!(matches!(res, Err(Error::BuildAborted { position: 1, .. })));
}

#[test]
fn refresh_fetch_error_keeps_serving() {
    let m = IpManager::new(&sample()).unwrap();
    let err = m.refresh(&FailingSource).unwrap_err();
    assert!(matches!(err, Error::Fetch(_)));
    assert_eq!(q(&m, "8.8.8.8"), Some("US"));
}

#[test]
fn snapshot_outlives_update() {
    let m = IpManager::new(&sample()).unwrap();
    let old = m.snapshot();
    m.update(vec![("1.0.0.0/8", "AU")]).unwrap();

    assert_eq!(old.search("192.168.1.1").map(|p| **p), Some("CN"));
    assert_eq!(m.snapshot().search("192.168.1.1"), None);
}

#[test]
fn index_insert_reports_parse_errors() {
    let mut index = IpIndex::new();
    index.insert("10.0.0.0/8", 1).unwrap();
    let err = index.insert("10.0.0.0/99", 2).unwrap_err();
    assert_eq!(err.input(), "10.0.0.0/99");
    assert_eq!(index.search("10.0.0.1").map(|p| **p), Some(1));
}

// ---- directory source ------------------------------------------------------

#[test]
fn directory_source_reads_country_files() {
    let tmp = tempfile::tempdir().unwrap();
    let dir = tmp.path();
    fs::write(
        dir.join("cn-aggregated.txt"),
        "# China\n1.0.1.0/24\n\n  1.0.2.0/23  \n",
    )
    .unwrap();
    fs::create_dir_all(dir.join("nested")).unwrap();
    fs::write(dir.join("nested").join("us.txt"), "8.8.8.0/24\n2001:4860::/32\n").unwrap();
    fs::write(dir.join("README.md"), "10.0.0.0/8\n").unwrap();

    let source = DirectorySource::new(dir);
    let mut data = source.fetch().unwrap();
    data.sort();
    assert_eq!(
        data,
        vec![
            ("1.0.1.0/24".to_owned(), "CN".to_owned()),
            ("1.0.2.0/23".to_owned(), "CN".to_owned()),
            ("2001:4860::/32".to_owned(), "US".to_owned()),
            ("8.8.8.0/24".to_owned(), "US".to_owned()),
        ]
    );

    let m = IpManager::new(&source).unwrap();
    assert_eq!(m.query("1.0.3.7").as_deref().map(String::as_str), Some("CN"));
    assert_eq!(m.query("2001:4860::8888").as_deref().map(String::as_str), Some("US"));
    assert_eq!(m.query("10.0.0.1"), None);
}

#[test]
fn directory_source_custom_extension() {
    let tmp = tempfile::tempdir().unwrap();
    let dir = tmp.path();
    fs::write(dir.join("jp.list"), "; comment\n133.0.0.0/8\n").unwrap();
    fs::write(dir.join("kr.txt"), "1.11.0.0/16\n").unwrap();

    let cfg = SourceConfig {
        extension: "list".to_owned(),
        comment_prefix: ";".to_owned(),
        ..SourceConfig::new(dir)
    };
    let data = DirectorySource::from_config(cfg).fetch().unwrap();
    assert_eq!(data, vec![("133.0.0.0/8".to_owned(), "JP".to_owned())]);
}

#[cfg(unix)]
#[test]
fn directory_source_ignores_looping_symlinks() {
    let tmp = tempfile::tempdir().unwrap();
    let dir = tmp.path();
    fs::create_dir_all(dir.join("sub")).unwrap();
    fs::write(dir.join("sub").join("fr.txt"), "2.0.0.0/12\n").unwrap();
    // both links point back up the tree
    std::os::unix::fs::symlink(dir, dir.join("sub").join("loop")).unwrap();
    std::os::unix::fs::symlink(dir.join("sub"), dir.join("again")).unwrap();

    let data = DirectorySource::new(dir).fetch().unwrap();
    assert_eq!(data, vec![("2.0.0.0/12".to_owned(), "FR".to_owned())]);
}

#[test]
fn directory_source_missing_dir_is_fetch_error() {
    let source = DirectorySource::new("/definitely/not/here/geoip_core");
    let err = IpManager::new(&source).err().expect("must fail");
    assert!(matches!(err, Error::Fetch(_)));
}

#[test]
fn directory_source_bad_line_aborts_update() {
    let tmp = tempfile::tempdir().unwrap();
    let dir = tmp.path();
    fs::write(dir.join("de.txt"), "5.1.0.0/16\nnot-a-cidr\n").unwrap();

    let m = IpManager::new(&sample()).unwrap();
    let err = m.refresh(&DirectorySource::new(dir)).unwrap_err();
    assert!(matches!(err, Error::BuildAborted { ref cidr, .. } if cidr == "not-a-cidr"));
    assert_eq!(q(&m, "5.1.2.3"), None);
}

// ---- concurrency -----------------------------------------------------------

#[derive(Debug, PartialEq, Eq)]
struct Tagged {
    generation: u8,
    slot: u8,
}

fn generation(gen: u8) -> Vec<(String, Tagged)> {
    // generations use disjoint address space: 10.x/16 for even, 20.x/16 for odd
    let first = if gen % 2 == 0 { 10 } else { 20 };
    (0..32u8)
        .map(|slot| {
            (
                format!("{first}.{slot}.0.0/16"),
                Tagged {
                    generation: gen,
                    slot,
                },
            )
        })
        .collect()
}

#[test]
fn readers_see_whole_snapshots_during_updates() {
    let readers = num_cpus::get().clamp(2, 8);
    let m = Arc::new(IpManager::with_dataset(generation(0)).unwrap());
    let stop = Arc::new(AtomicBool::new(false));
    let barrier = Arc::new(Barrier::new(readers + 1));

    let mut handles = Vec::new();
    for _ in 0..readers {
        let m = Arc::clone(&m);
        let stop = Arc::clone(&stop);
        let barrier = Arc::clone(&barrier);
        handles.push(thread::spawn(move || {
            barrier.wait();
            let mut checks = 0usize;
            let mut last_seen = 0u8;
            while !stop.load(Ordering::Relaxed) || checks == 0 {
                let snap = m.snapshot();
                let even = snap.search("10.3.1.1").map(|t| t.generation);
                let odd = snap.search("20.3.1.1").map(|t| t.generation);
                // exactly one side is populated in any one snapshot
                let gen = match (even, odd) {
                    (Some(g), None) => {
                        assert_eq!(g % 2, 0);
                        g
                    }
                    (None, Some(g)) => {
                        assert_eq!(g % 2, 1);
                        g
                    }
                    mixed => panic!("mixed snapshot: {mixed:?}"),
                };
                assert!(gen >= last_seen, "snapshot went back from {last_seen} to {gen}");
                last_seen = gen;
                for slot in 0..32u8 {
                    let first = if gen % 2 == 0 { 10 } else { 20 };
                    let t = snap
                        .search(&format!("{first}.{slot}.200.1"))
                        .expect("slot present");
                    assert_eq!(**t, Tagged { generation: gen, slot });
                }

                // a hit on 10.x must be even, on 20.x odd, and never older
                let first: u8 = if rand::random::<bool>() { 10 } else { 20 };
                let slot = rand::random::<u8>() % 32;
                if let Some(t) = m.query(&format!("{first}.{slot}.9.9")) {
                    assert_eq!(t.generation % 2, u8::from(first == 20));
                    assert_eq!(t.slot, slot);
                    assert!(t.generation >= last_seen, "query went back to {}", t.generation);
                    last_seen = t.generation;
                }
                checks += 1;
            }
            checks
        }));
    }

    barrier.wait();
    for gen in 1..=50u8 {
        m.update(generation(gen)).unwrap();
    }
    stop.store(true, Ordering::Relaxed);

    for h in handles {
        assert!(h.join().expect("reader panicked") > 0);
    }
    assert_eq!(m.query("20.0.0.1").map(|t| t.generation), None);
    assert_eq!(m.query("10.0.0.1").map(|t| t.generation), Some(50));
}
