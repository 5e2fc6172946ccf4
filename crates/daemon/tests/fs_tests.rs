//! End-to-end tests of the translation core over the in-memory backend.

use std::sync::Arc;
use std::time::Duration;

use client::MemoryClient;
use ossfs_daemon::{Attr, BucketFs, DirEntry, FsConfig, FsError};

fn fixture() -> (Arc<MemoryClient>, BucketFs) {
    fixture_with(FsConfig::default())
}

fn fixture_with(config: FsConfig) -> (Arc<MemoryClient>, BucketFs) {
    let client = Arc::new(MemoryClient::new());
    let fs = BucketFs::new(client.clone(), config);
    (client, fs)
}

fn names(mut entries: Vec<DirEntry>) -> Vec<String> {
    entries.sort_by(|a, b| a.name.cmp(&b.name));
    entries.into_iter().map(|e| e.name).collect()
}

#[tokio::test]
async fn root_resolves_without_backend_calls() {
    let (client, fs) = fixture();

    let attr = fs.resolve("/").await.unwrap();
    assert!(attr.is_dir());
    assert_eq!(client.counts().total(), 0);
}

#[tokio::test]
async fn resolve_classifies_files_markers_and_absences() {
    let (client, fs) = fixture();
    client.put_marker("docs/");
    client.put("docs/readme.txt", &b"abcdefg"[..]);

    match fs.resolve("/docs/readme.txt").await.unwrap() {
        Attr::File { size, .. } => assert_eq!(size, 7),
        other => panic!("expected a file, got {other:?}"),
    }

    match fs.resolve("/docs").await.unwrap() {
        Attr::Directory { mtime } => assert!(mtime.is_some()),
        other => panic!("expected a directory, got {other:?}"),
    }

    let err = fs.resolve("/missing").await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn negative_cache_suppresses_repeat_probes() {
    let (client, fs) = fixture();

    // First miss costs a bare-key probe plus a marker probe.
    assert!(fs.resolve("/ghost").await.unwrap_err().is_not_found());
    assert_eq!(client.counts().head, 2);

    // Second miss is answered from the cache.
    assert!(fs.resolve("/ghost").await.unwrap_err().is_not_found());
    assert_eq!(client.counts().head, 2);
}

#[tokio::test]
async fn listing_teaches_resolve_about_implicit_directories() {
    let (client, fs) = fixture();
    client.put("docs/readme.txt", &b"x"[..]);

    // "docs" has no marker key; only the root listing reveals it.
    let entries = fs.list_collected("/").await.unwrap();
    assert_eq!(names(entries), vec!["docs"]);
    assert_eq!(client.counts().head, 0);

    // One bare-key probe, then the known-directory set answers; no probe
    // for a marker that does not exist.
    match fs.resolve("/docs").await.unwrap() {
        Attr::Directory { mtime } => assert!(mtime.is_none()),
        other => panic!("expected a directory, got {other:?}"),
    }
    assert_eq!(client.counts().head, 1);
}

#[tokio::test]
async fn listing_invalidates_stale_negative_entries() {
    let (client, fs) = fixture();

    assert!(fs.resolve("/late.txt").await.unwrap_err().is_not_found());

    // The object appears after the miss was cached.
    client.put("late.txt", &b"x"[..]);
    let entries = fs.list_collected("/").await.unwrap();
    assert_eq!(names(entries), vec!["late.txt"]);

    // The listing evicted the negative entry, so resolve succeeds.
    assert!(matches!(
        fs.resolve("/late.txt").await.unwrap(),
        Attr::File { .. }
    ));
}

#[tokio::test]
async fn negative_entries_expire() {
    let (client, fs) = fixture_with(FsConfig {
        negative_ttl: Duration::from_millis(50),
        ..FsConfig::default()
    });

    assert!(fs.resolve("/ghost").await.unwrap_err().is_not_found());
    client.put("ghost", &b"x"[..]);

    // Within the TTL the cached miss still answers.
    assert!(fs.resolve("/ghost").await.unwrap_err().is_not_found());

    std::thread::sleep(Duration::from_millis(120));
    assert!(matches!(
        fs.resolve("/ghost").await.unwrap(),
        Attr::File { .. }
    ));
}

#[tokio::test]
async fn listing_excludes_the_directorys_own_marker() {
    let (client, fs) = fixture();
    client.put_marker("docs/");
    client.put("docs/readme.txt", &b"abcdefg"[..]);

    let entries = fs.list_collected("/docs").await.unwrap();
    assert_eq!(names(entries), vec!["readme.txt"]);
}

#[tokio::test]
async fn listing_a_nonexistent_directory_is_an_error() {
    let (_client, fs) = fixture();

    let err = fs.list_collected("/nowhere").await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn listing_pages_through_large_directories() {
    let (client, fs) = fixture_with(FsConfig {
        page_size: 3,
        ..FsConfig::default()
    });
    for i in 0..10 {
        client.put(&format!("f{:02}.txt", i), &b"data"[..]);
    }
    client.put("sub/inner.txt", &b"x"[..]);

    let entries = fs.list_collected("/").await.unwrap();
    let expected: Vec<String> = (0..10)
        .map(|i| format!("f{:02}.txt", i))
        .chain(std::iter::once("sub".to_string()))
        .collect();
    assert_eq!(names(entries), expected);
    assert!(client.counts().list > 1, "should have paged");
}

#[tokio::test]
async fn read_returns_the_requested_window() {
    let (client, fs) = fixture();
    client.put("docs/readme.txt", &b"abcdefg"[..]);

    // Reads past the end are clamped, not errors.
    let data = fs.read("/docs/readme.txt", 0, 100).await.unwrap();
    assert_eq!(data, b"abcdefg");

    let data = fs.read("/docs/readme.txt", 3, 100).await.unwrap();
    assert_eq!(data, b"defg");

    let data = fs.read("/docs/readme.txt", 3, 2).await.unwrap();
    assert_eq!(data, b"de");

    let data = fs.read("/docs/readme.txt", 7, 10).await.unwrap();
    assert!(data.is_empty());
}

#[tokio::test]
async fn read_compensates_when_the_backend_ignores_ranges() {
    let (client, fs) = fixture();
    client.put("big.bin", &b"abcdefg"[..]);
    client.set_ignore_ranges(true);

    let data = fs.read("/big.bin", 3, 2).await.unwrap();
    assert_eq!(data, b"de");

    let data = fs.read("/big.bin", 0, 100).await.unwrap();
    assert_eq!(data, b"abcdefg");

    // Tail read: the window reaches past EOF, so the full-object body is
    // no longer than the request and only the object size betrays the
    // ignored range.
    let data = fs.read("/big.bin", 3, 100).await.unwrap();
    assert_eq!(data, b"defg");

    let data = fs.read("/big.bin", 7, 10).await.unwrap();
    assert!(data.is_empty());
}

#[tokio::test]
async fn read_of_a_missing_object_is_not_found() {
    let (_client, fs) = fixture();

    let err = fs.read("/missing.bin", 0, 10).await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn oversized_reads_are_rejected() {
    let (client, fs) = fixture_with(FsConfig {
        max_read: 4,
        ..FsConfig::default()
    });
    client.put("a.txt", &b"abcdefg"[..]);

    let err = fs.read("/a.txt", 0, 5).await.unwrap_err();
    assert!(matches!(err, FsError::ReadTooLarge { .. }));
}

#[tokio::test]
async fn probe_noise_is_answered_without_round_trips() {
    let (client, fs) = fixture();

    for path in ["/.DS_Store", "/._resource", "/docs/.DS_Store"] {
        let err = fs.resolve(path).await.unwrap_err();
        assert!(err.is_not_found(), "{path} should be filtered");
    }
    assert_eq!(client.counts().total(), 0);
}

#[tokio::test]
async fn backend_faults_surface_and_are_not_cached() {
    let (client, fs) = fixture();
    client.put("a.txt", &b"x"[..]);
    client.set_faulty(true);

    let err = fs.resolve("/a.txt").await.unwrap_err();
    assert!(matches!(err, FsError::Backend { .. }));

    // A fault must not poison the negative cache.
    client.set_faulty(false);
    assert!(matches!(
        fs.resolve("/a.txt").await.unwrap(),
        Attr::File { .. }
    ));
}

#[tokio::test]
async fn relative_paths_are_invalid() {
    let (_client, fs) = fixture();

    let err = fs.resolve("docs/readme.txt").await.unwrap_err();
    assert!(matches!(err, FsError::InvalidPath(_)));
}
