//! Source access trait and error types.
//!
//! The cache never touches the filesystem directly. It asks a [`Source`] for
//! a file's modification time and contents, so tests and embedders can supply
//! documents from memory.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Backend identifier for [`FsSource`] errors.
const BACKEND: &str = "Fs";

/// Semantic error categories.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum SourceErrorKind {
    /// File does not exist.
    NotFound,
    /// Permission denied.
    PermissionDenied,
    /// Anything else: unreadable bytes, I/O failure.
    Other,
}

/// Failure to stat or read a source file.
#[derive(Debug)]
pub struct SourceError {
    /// Semantic error category.
    pub kind: SourceErrorKind,
    /// Path context (if applicable).
    pub path: Option<PathBuf>,
    /// Backend identifier (e.g., "Fs", "Memory").
    pub backend: Option<&'static str>,
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl SourceError {
    #[must_use]
    pub fn new(kind: SourceErrorKind) -> Self {
        Self {
            kind,
            path: None,
            backend: None,
            source: None,
        }
    }

    /// Attach path context.
    #[must_use]
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Attach backend identifier.
    #[must_use]
    pub fn with_backend(mut self, backend: &'static str) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Attach the underlying error source.
    #[must_use]
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    #[must_use]
    pub fn not_found(path: impl Into<PathBuf>) -> Self {
        Self::new(SourceErrorKind::NotFound).with_path(path)
    }

    /// Map an I/O error onto a semantic kind.
    #[must_use]
    pub fn io(err: std::io::Error, path: impl Into<PathBuf>) -> Self {
        let kind = match err.kind() {
            std::io::ErrorKind::NotFound => SourceErrorKind::NotFound,
            std::io::ErrorKind::PermissionDenied => SourceErrorKind::PermissionDenied,
            _ => SourceErrorKind::Other,
        };
        Self::new(kind).with_path(path).with_source(err)
    }

    /// True for the "source unavailable" condition callers must handle.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.kind == SourceErrorKind::NotFound
    }
}

impl std::fmt::Display for SourceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Format: "[Backend] Kind: message (path: /foo/bar)"
        if let Some(backend) = self.backend {
            write!(f, "[{backend}] ")?;
        }

        let kind_str = match self.kind {
            SourceErrorKind::NotFound => "Not found",
            SourceErrorKind::PermissionDenied => "Permission denied",
            SourceErrorKind::Other => "Error",
        };
        write!(f, "{kind_str}")?;

        if let Some(source) = &self.source {
            write!(f, ": {source}")?;
        }
        if let Some(path) = &self.path {
            write!(f, " (path: {})", path.display())?;
        }
        Ok(())
    }
}

impl std::error::Error for SourceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|s| s.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// Where document sources come from.
///
/// Paths are passed through unchanged; the caller decides whether they are
/// absolute.
pub trait Source: Send + Sync {
    /// Current modification time.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if the file doesn't exist or can't be inspected.
    fn mtime(&self, path: &Path) -> Result<SystemTime, SourceError>;

    /// Full UTF-8 contents.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if the file doesn't exist, can't be read, or
    /// isn't valid UTF-8.
    fn read(&self, path: &Path) -> Result<String, SourceError>;
}

/// Reads sources from the local filesystem.
#[derive(Clone, Copy, Debug, Default)]
pub struct FsSource;

impl FsSource {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Source for FsSource {
    fn mtime(&self, path: &Path) -> Result<SystemTime, SourceError> {
        fs::metadata(path)
            .and_then(|m| m.modified())
            .map_err(|e| SourceError::io(e, path).with_backend(BACKEND))
    }

    fn read(&self, path: &Path) -> Result<String, SourceError> {
        fs::read_to_string(path).map_err(|e| SourceError::io(e, path).with_backend(BACKEND))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_io_error_kinds() {
        let err = SourceError::io(std::io::Error::from(std::io::ErrorKind::NotFound), "a.md");
        assert_eq!(err.kind, SourceErrorKind::NotFound);
        assert!(err.is_not_found());

        let err = SourceError::io(
            std::io::Error::from(std::io::ErrorKind::PermissionDenied),
            "a.md",
        );
        assert_eq!(err.kind, SourceErrorKind::PermissionDenied);

        let err = SourceError::io(std::io::Error::from(std::io::ErrorKind::InvalidData), "a.md");
        assert_eq!(err.kind, SourceErrorKind::Other);
    }

    #[test]
    fn test_display_format() {
        let err = SourceError::not_found("/docs/a.md").with_backend("Fs");
        assert_eq!(err.to_string(), "[Fs] Not found (path: /docs/a.md)");
    }

    #[test]
    fn test_display_with_source() {
        let err = SourceError::new(SourceErrorKind::Other)
            .with_source(std::io::Error::other("disk on fire"));
        assert_eq!(err.to_string(), "Error: disk on fire");
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_fs_source_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("page.md");
        fs::write(&path, "# Hi").unwrap();

        let source = FsSource::new();
        assert_eq!(source.read(&path).unwrap(), "# Hi");
        assert!(source.mtime(&path).is_ok());
    }

    #[test]
    fn test_fs_source_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.md");

        let err = FsSource::new().mtime(&path).unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(err.backend, Some("Fs"));
        assert!(FsSource::new().read(&path).unwrap_err().is_not_found());
    }

    #[test]
    fn test_fs_source_invalid_utf8() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("binary.md");
        fs::write(&path, [0xff, 0xfe, 0x00]).unwrap();

        let err = FsSource::new().read(&path).unwrap_err();
        assert_eq!(err.kind, SourceErrorKind::Other);
    }
}
