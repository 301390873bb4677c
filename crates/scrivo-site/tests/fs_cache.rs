//! Content cache over real files.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use pretty_assertions::assert_eq;
use scrivo_renderer::{DocumentRenderer, RenderOptions};
use scrivo_site::{ContentCache, RenderStatus};

fn write(dir: &tempfile::TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path
}

/// Push the file's mtime forward so the change is visible even on
/// filesystems with coarse timestamps.
fn touch(path: &Path, secs: u64) {
    let file = fs::File::options().write(true).open(path).unwrap();
    file.set_modified(SystemTime::UNIX_EPOCH + Duration::from_secs(secs))
        .unwrap();
}

#[test]
fn test_unchanged_file_is_hit() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(&dir, "01-intro.md", "# Intro\n\nBody.");
    let cache = ContentCache::with_fs(DocumentRenderer::default());

    let first = cache.get(&path).unwrap();
    assert_eq!(first.title, "Intro");
    assert_eq!(first.order, 1);
    cache.get(&path).unwrap();

    let stats = cache.stats();
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.hits, 1);
}

#[test]
fn test_rewritten_file_is_reparsed() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(&dir, "page.md", "# Before");
    touch(&path, 1_000);
    let cache = ContentCache::with_fs(DocumentRenderer::default());
    assert_eq!(cache.get(&path).unwrap().title, "Before");

    fs::write(&path, "# After").unwrap();
    touch(&path, 2_000);
    assert_eq!(cache.get(&path).unwrap().title, "After");
    assert_eq!(cache.stats().misses, 2);
}

#[test]
fn test_deleted_file_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(&dir, "gone.md", "# Gone");
    let cache = ContentCache::with_fs(DocumentRenderer::default());
    cache.get(&path).unwrap();

    fs::remove_file(&path).unwrap();
    assert!(cache.get(&path).unwrap_err().is_not_found());
    assert!(cache.is_empty());
}

#[test]
fn test_oversized_file_is_truncated_not_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(&dir, "big.md", &"word ".repeat(100));
    let renderer = DocumentRenderer::new(RenderOptions {
        max_source_bytes: 64,
        ..RenderOptions::default()
    });
    let cache = ContentCache::with_fs(renderer);

    let out = cache.get(&path).unwrap();
    assert_eq!(out.status, RenderStatus::Truncated);
    assert!(out.plain_text.len() <= 64);
}

#[test]
fn test_prewarm_directory() {
    let dir = tempfile::tempdir().unwrap();
    let paths = vec![
        write(&dir, "a.md", "# A"),
        write(&dir, "b.md", ":::info\nunclosed"),
        dir.path().join("missing.md"),
    ];
    let cache = ContentCache::with_fs(DocumentRenderer::default());

    let report = cache.prewarm(&paths);
    assert_eq!(report.loaded, 2);
    assert_eq!(report.failed, 1);
    assert!(cache.contains(&paths[0]));
    assert!(!cache.contains(&paths[2]));
}
