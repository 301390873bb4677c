//! Source access and content caching for Scrivo.
//!
//! This crate provides:
//! - [`Source`]: where document text and modification times come from
//! - [`FsSource`] and [`MemorySource`]: filesystem and in-memory sources
//! - [`ContentCache`]: rendered output keyed by path, invalidated when the
//!   source's modification time changes
//!
//! # Quick Start
//!
//! ```
//! use std::path::Path;
//! use std::sync::Arc;
//! use std::time::SystemTime;
//! use scrivo_renderer::DocumentRenderer;
//! use scrivo_site::{ContentCache, MemorySource};
//!
//! let source = Arc::new(
//!     MemorySource::new().with_file("/docs/guide.md", "# Guide\n\nHello.", SystemTime::UNIX_EPOCH),
//! );
//! let cache = ContentCache::new(DocumentRenderer::default(), source);
//!
//! let page = cache.get(Path::new("/docs/guide.md")).unwrap();
//! assert_eq!(page.title, "Guide");
//!
//! cache.get(Path::new("/docs/guide.md")).unwrap();
//! assert_eq!(cache.stats().hits, 1);
//! ```

mod cache;
mod memory;
mod source;

pub use cache::{CacheStats, ContentCache, PrewarmReport};
pub use memory::MemorySource;
pub use source::{FsSource, Source, SourceError, SourceErrorKind};

// Re-export the output type for convenience
pub use scrivo_renderer::{RenderOutput, RenderStatus};
