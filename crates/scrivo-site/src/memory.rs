//! In-memory source.
//!
//! Holds documents and their modification times in memory. Used by tests
//! and by embedders that render content not stored on disk.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{PoisonError, RwLock};
use std::thread;
use std::time::{Duration, SystemTime};

use crate::source::{Source, SourceError};

const BACKEND: &str = "Memory";

#[derive(Debug)]
struct File {
    content: String,
    mtime: SystemTime,
}

/// Source backed by a map of path to contents.
///
/// ```
/// use std::path::Path;
/// use std::time::{Duration, SystemTime};
/// use scrivo_site::{MemorySource, Source};
///
/// let source = MemorySource::new().with_file("/docs/a.md", "# A", SystemTime::UNIX_EPOCH);
/// assert_eq!(source.read(Path::new("/docs/a.md")).unwrap(), "# A");
///
/// source.set_mtime("/docs/a.md", SystemTime::UNIX_EPOCH + Duration::from_secs(1));
/// ```
#[derive(Debug, Default)]
pub struct MemorySource {
    files: RwLock<HashMap<PathBuf, File>>,
    reads: AtomicUsize,
    read_delay: Option<Duration>,
}

impl MemorySource {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file.
    #[must_use]
    pub fn with_file(
        self,
        path: impl Into<PathBuf>,
        content: impl Into<String>,
        mtime: SystemTime,
    ) -> Self {
        self.insert(path, content, mtime);
        self
    }

    /// Sleep this long inside every `read`, to widen race windows in tests.
    #[must_use]
    pub fn with_read_delay(mut self, delay: Duration) -> Self {
        self.read_delay = Some(delay);
        self
    }

    /// Add or replace a file.
    pub fn insert(&self, path: impl Into<PathBuf>, content: impl Into<String>, mtime: SystemTime) {
        let file = File {
            content: content.into(),
            mtime,
        };
        self.files
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(path.into(), file);
    }

    /// Change a file's modification time. Returns false if it doesn't exist.
    pub fn set_mtime(&self, path: impl AsRef<Path>, mtime: SystemTime) -> bool {
        let mut files = self.files.write().unwrap_or_else(PoisonError::into_inner);
        match files.get_mut(path.as_ref()) {
            Some(file) => {
                file.mtime = mtime;
                true
            }
            None => false,
        }
    }

    pub fn remove(&self, path: impl AsRef<Path>) -> bool {
        self.files
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(path.as_ref())
            .is_some()
    }

    /// Number of successful and failed `read` calls so far.
    #[must_use]
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::Relaxed)
    }
}

impl Source for MemorySource {
    fn mtime(&self, path: &Path) -> Result<SystemTime, SourceError> {
        self.files
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(path)
            .map(|file| file.mtime)
            .ok_or_else(|| SourceError::not_found(path).with_backend(BACKEND))
    }

    fn read(&self, path: &Path) -> Result<String, SourceError> {
        self.reads.fetch_add(1, Ordering::Relaxed);
        if let Some(delay) = self.read_delay {
            thread::sleep(delay);
        }
        self.files
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(path)
            .map(|file| file.content.clone())
            .ok_or_else(|| SourceError::not_found(path).with_backend(BACKEND))
    }
}
