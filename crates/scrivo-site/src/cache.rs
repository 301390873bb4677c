//! Mtime-invalidated content cache.
//!
//! # Thread Safety
//!
//! [`ContentCache`] is shared by reference across request threads:
//! - `RwLock<HashMap>` holds the entries; lookups take the read lock
//! - A per-path `Mutex<()>` serializes misses, so concurrent requests for
//!   the same changed file share one parse
//! - `AtomicU64` counters track hits and misses
//!
//! Entries are immutable `Arc<RenderOutput>` values. Invalidation swaps the
//! map contents; readers holding an `Arc` keep their snapshot.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::{Instant, SystemTime};

use rayon::prelude::*;
use scrivo_renderer::{DocumentRenderer, RenderOutput};
use serde::Serialize;

use crate::source::{FsSource, Source, SourceError};

/// Convert Duration to milliseconds as f64.
fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}

#[derive(Debug)]
struct CacheEntry {
    output: Arc<RenderOutput>,
    /// Modification time observed before the source was read.
    mtime: SystemTime,
    /// Wall-clock time the render finished.
    parsed_at: SystemTime,
}

/// Point-in-time cache counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
    /// Paths currently being parsed.
    pub in_flight: usize,
    pub approx_bytes: usize,
}

/// Outcome of [`ContentCache::prewarm`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct PrewarmReport {
    pub loaded: usize,
    pub failed: usize,
}

/// Cache of rendered documents keyed by path.
///
/// An entry is valid while the source's modification time equals the one
/// recorded when it was parsed. There is no TTL.
pub struct ContentCache {
    renderer: DocumentRenderer,
    source: Arc<dyn Source>,
    entries: RwLock<HashMap<PathBuf, CacheEntry>>,
    in_flight: Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl std::fmt::Debug for ContentCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentCache")
            .field("renderer", &self.renderer)
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}

impl ContentCache {
    /// Create a cache reading from `source`.
    #[must_use]
    pub fn new(renderer: DocumentRenderer, source: Arc<dyn Source>) -> Self {
        Self {
            renderer,
            source,
            entries: RwLock::new(HashMap::new()),
            in_flight: Mutex::new(HashMap::new()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Create a cache reading from the local filesystem.
    #[must_use]
    pub fn with_fs(renderer: DocumentRenderer) -> Self {
        Self::new(renderer, Arc::new(FsSource::new()))
    }

    #[must_use]
    pub fn renderer(&self) -> &DocumentRenderer {
        &self.renderer
    }

    /// Rendered output for `path`, parsing it if the cached copy is stale.
    ///
    /// Malformed content never fails here: it yields degraded output.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if the file can't be inspected or read. A
    /// missing file also drops any entry cached for it.
    pub fn get(&self, path: &Path) -> Result<Arc<RenderOutput>, SourceError> {
        let mtime = match self.source.mtime(path) {
            Ok(mtime) => mtime,
            Err(e) => {
                if e.is_not_found() && self.invalidate(path) {
                    tracing::debug!(path = %path.display(), "Source removed, entry dropped");
                }
                return Err(e);
            }
        };

        if let Some(output) = self.lookup(path, mtime) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(path = %path.display(), "Cache hit");
            return Ok(output);
        }

        let flight = self.flight(path);
        let result = {
            let _guard = flight.lock().unwrap_or_else(PoisonError::into_inner);

            // Another request may have parsed this version while we waited.
            if let Some(output) = self.lookup(path, mtime) {
                self.hits.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(path = %path.display(), "Cache hit after wait");
                Ok(output)
            } else {
                self.load(path, mtime)
            }
        };
        self.land(path, flight);
        result
    }

    /// Cached output without checking the source. Does not touch counters.
    #[must_use]
    pub fn get_cached(&self, path: &Path) -> Option<Arc<RenderOutput>> {
        self.read_entries()
            .get(path)
            .map(|entry| Arc::clone(&entry.output))
    }

    /// When the cached entry for `path` was rendered.
    #[must_use]
    pub fn parsed_at(&self, path: &Path) -> Option<SystemTime> {
        self.read_entries().get(path).map(|entry| entry.parsed_at)
    }

    #[must_use]
    pub fn contains(&self, path: &Path) -> bool {
        self.read_entries().contains_key(path)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.read_entries().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.read_entries().is_empty()
    }

    /// Drop the entry for `path`. Returns whether one existed.
    pub fn invalidate(&self, path: &Path) -> bool {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(path)
            .is_some()
    }

    /// Drop every entry. Counters are kept.
    pub fn invalidate_all(&self) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let dropped = entries.len();
        entries.clear();
        tracing::debug!(dropped, "Cache cleared");
    }

    #[must_use]
    pub fn stats(&self) -> CacheStats {
        let (entries, approx_bytes) = {
            let entries = self.read_entries();
            let bytes = entries.values().map(|e| e.output.approx_bytes()).sum();
            (entries.len(), bytes)
        };
        CacheStats {
            entries,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            in_flight: self
                .in_flight
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .len(),
            approx_bytes,
        }
    }

    /// Parse a batch of files in parallel.
    ///
    /// Failures are logged and counted; they never stop the batch.
    pub fn prewarm<P: AsRef<Path> + Sync>(&self, paths: &[P]) -> PrewarmReport {
        let start = Instant::now();
        let report = paths
            .par_iter()
            .map(|path| {
                let path = path.as_ref();
                match self.get(path) {
                    Ok(_) => PrewarmReport { loaded: 1, failed: 0 },
                    Err(e) => {
                        tracing::warn!(path = %path.display(), error = %e, "Pre-warm failed");
                        PrewarmReport { loaded: 0, failed: 1 }
                    }
                }
            })
            .reduce(PrewarmReport::default, |a, b| PrewarmReport {
                loaded: a.loaded + b.loaded,
                failed: a.failed + b.failed,
            });

        tracing::info!(
            loaded = report.loaded,
            failed = report.failed,
            elapsed_ms = elapsed_ms(start),
            "Cache pre-warmed"
        );
        report
    }

    fn read_entries(&self) -> std::sync::RwLockReadGuard<'_, HashMap<PathBuf, CacheEntry>> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn lookup(&self, path: &Path, mtime: SystemTime) -> Option<Arc<RenderOutput>> {
        self.read_entries()
            .get(path)
            .filter(|entry| entry.mtime == mtime)
            .map(|entry| Arc::clone(&entry.output))
    }

    /// Miss path: read, render, store.
    fn load(&self, path: &Path, mtime: SystemTime) -> Result<Arc<RenderOutput>, SourceError> {
        let start = Instant::now();
        let content = self.source.read(path)?;
        let output = Arc::new(self.renderer.render(path, &content));
        self.misses.fetch_add(1, Ordering::Relaxed);

        tracing::debug!(
            path = %path.display(),
            status = ?output.status,
            elapsed_ms = elapsed_ms(start),
            "Cache miss, rendered"
        );

        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(
                path.to_path_buf(),
                CacheEntry {
                    output: Arc::clone(&output),
                    mtime,
                    parsed_at: SystemTime::now(),
                },
            );
        Ok(output)
    }

    /// Lock shared by every request currently missing on `path`.
    fn flight(&self, path: &Path) -> Arc<Mutex<()>> {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(in_flight.entry(path.to_path_buf()).or_default())
    }

    /// Release this request's hold on the flight lock, forgetting it once
    /// nobody else holds it.
    fn land(&self, path: &Path, flight: Arc<Mutex<()>>) {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        // Clones are only made under this lock, so the count can't grow here.
        drop(flight);
        if in_flight
            .get(path)
            .is_some_and(|current| Arc::strong_count(current) == 1)
        {
            in_flight.remove(path);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::thread;
    use std::time::Duration;

    use pretty_assertions::assert_eq;
    use scrivo_renderer::RenderStatus;

    use super::*;
    use crate::memory::MemorySource;

    static_assertions::assert_impl_all!(super::ContentCache: Send, Sync);

    fn at(secs: u64) -> SystemTime {
        SystemTime::UNIX_EPOCH + Duration::from_secs(secs)
    }

    fn cache_with(source: &Arc<MemorySource>) -> ContentCache {
        let source: Arc<MemorySource> = Arc::clone(source);
        ContentCache::new(DocumentRenderer::default(), source)
    }

    #[test]
    fn test_second_get_is_hit() {
        let source = Arc::new(MemorySource::new().with_file("/d/a.md", "# A", at(1)));
        let cache = cache_with(&source);

        let first = cache.get(Path::new("/d/a.md")).unwrap();
        let second = cache.get(Path::new("/d/a.md")).unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.entries, 1);
        assert_eq!(stats.in_flight, 0);
        assert_eq!(source.reads(), 1);
    }

    #[test]
    fn test_changed_mtime_reparses() {
        let source = Arc::new(MemorySource::new().with_file("a.md", "# Old", at(1)));
        let cache = cache_with(&source);
        assert_eq!(cache.get(Path::new("a.md")).unwrap().title, "Old");

        source.insert("a.md", "# New", at(2));
        assert_eq!(cache.get(Path::new("a.md")).unwrap().title, "New");
        assert_eq!(cache.stats().misses, 2);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_parsed_at_tracks_renders() {
        let source = Arc::new(MemorySource::new().with_file("a.md", "# A", at(1)));
        let cache = cache_with(&source);
        let path = Path::new("a.md");
        assert_eq!(cache.parsed_at(path), None);

        let before = SystemTime::now();
        cache.get(path).unwrap();
        let first = cache.parsed_at(path).unwrap();
        assert!(first >= before);
        assert!(first <= SystemTime::now());

        cache.get(path).unwrap();
        assert_eq!(cache.parsed_at(path), Some(first));

        source.insert("a.md", "# B", at(2));
        cache.get(path).unwrap();
        assert!(cache.parsed_at(path).unwrap() >= first);

        cache.invalidate(path);
        assert_eq!(cache.parsed_at(path), None);
    }

    #[test]
    fn test_older_mtime_also_reparses() {
        let source = Arc::new(MemorySource::new().with_file("a.md", "# Old", at(10)));
        let cache = cache_with(&source);
        cache.get(Path::new("a.md")).unwrap();

        source.insert("a.md", "# Restored", at(5));
        assert_eq!(cache.get(Path::new("a.md")).unwrap().title, "Restored");
    }

    #[test]
    fn test_missing_source_is_error_not_degraded() {
        let source = Arc::new(MemorySource::new().with_file("a.md", "# A", at(1)));
        let cache = cache_with(&source);
        cache.get(Path::new("a.md")).unwrap();

        source.remove("a.md");
        let err = cache.get(Path::new("a.md")).unwrap_err();
        assert!(err.is_not_found());
        assert!(!cache.contains(Path::new("a.md")));
    }

    #[test]
    fn test_malformed_content_is_cached_as_output() {
        let source = Arc::new(MemorySource::new().with_file("a.md", ":::info\nnever closed", at(1)));
        let cache = cache_with(&source);
        let out = cache.get(Path::new("a.md")).unwrap();
        assert_eq!(out.status, RenderStatus::Complete);
        assert!(!out.warnings.is_empty());
    }

    #[test]
    fn test_invalidate() {
        let source = Arc::new(
            MemorySource::new()
                .with_file("a.md", "# A", at(1))
                .with_file("b.md", "# B", at(1)),
        );
        let cache = cache_with(&source);
        cache.get(Path::new("a.md")).unwrap();
        cache.get(Path::new("b.md")).unwrap();

        assert!(cache.invalidate(Path::new("a.md")));
        assert!(!cache.invalidate(Path::new("a.md")));
        assert_eq!(cache.len(), 1);
        assert!(cache.get_cached(Path::new("b.md")).is_some());

        cache.invalidate_all();
        assert!(cache.is_empty());
        assert_eq!(cache.stats().misses, 2);

        cache.get(Path::new("a.md")).unwrap();
        assert_eq!(cache.stats().misses, 3);
    }

    #[test]
    fn test_get_cached_does_not_count() {
        let source = Arc::new(MemorySource::new().with_file("a.md", "# A", at(1)));
        let cache = cache_with(&source);
        assert!(cache.get_cached(Path::new("a.md")).is_none());
        cache.get(Path::new("a.md")).unwrap();
        assert!(cache.get_cached(Path::new("a.md")).is_some());
        assert_eq!(cache.stats().hits, 0);
    }

    #[test]
    fn test_concurrent_misses_share_one_parse() {
        let source = Arc::new(
            MemorySource::new()
                .with_file("a.md", "# A", at(1))
                .with_read_delay(Duration::from_millis(50)),
        );
        let cache = cache_with(&source);

        let outputs: Vec<_> = thread::scope(|s| {
            let handles: Vec<_> = (0..8)
                .map(|_| s.spawn(|| cache.get(Path::new("a.md")).unwrap()))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(source.reads(), 1);
        assert!(outputs.iter().all(|o| Arc::ptr_eq(o, &outputs[0])));
        let stats = cache.stats();
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hits, 7);
        assert_eq!(stats.in_flight, 0);
    }

    #[test]
    fn test_prewarm_counts_failures() {
        let source = Arc::new(
            MemorySource::new()
                .with_file("a.md", "# A", at(1))
                .with_file("b.md", "---\ntitle: [broken\n---\nbody", at(1)),
        );
        let cache = cache_with(&source);

        let report = cache.prewarm(&["a.md", "b.md", "missing.md"]);
        assert_eq!(report, PrewarmReport { loaded: 2, failed: 1 });
        assert_eq!(cache.len(), 2);

        cache.get(Path::new("a.md")).unwrap();
        assert_eq!(cache.stats().hits, 1);
    }

    #[test]
    fn test_stats_approx_bytes() {
        let source = Arc::new(MemorySource::new().with_file("a.md", "# A\n\ntext", at(1)));
        let cache = cache_with(&source);
        assert_eq!(cache.stats().approx_bytes, 0);
        let out = cache.get(Path::new("a.md")).unwrap();
        assert_eq!(cache.stats().approx_bytes, out.approx_bytes());
    }
}
