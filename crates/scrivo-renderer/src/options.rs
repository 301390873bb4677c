//! Engine options.

use serde::{Deserialize, Serialize};

/// Default size guard: 1 MiB.
pub const DEFAULT_MAX_SOURCE_BYTES: usize = 1024 * 1024;
/// Default excerpt limit in characters.
pub const DEFAULT_EXCERPT_LENGTH: usize = 160;
/// Order given to documents with no explicit or filename order.
pub const DEFAULT_ORDER: i64 = 999;

/// Deployment environment. Controls how much detail error notices show.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    #[default]
    Production,
}

/// Where rewritten image references point.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AssetOptions {
    /// Base URL of the asset service, without trailing slash.
    pub endpoint: String,
    /// Variant widths offered for raster images.
    pub widths: Vec<u32>,
    /// Modern format offered alongside the original.
    pub format: String,
}

impl Default for AssetOptions {
    fn default() -> Self {
        Self {
            endpoint: "/_assets".to_owned(),
            widths: vec![400, 800, 1200],
            format: "webp".to_owned(),
        }
    }
}

/// Options for [`DocumentRenderer`](crate::DocumentRenderer).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderOptions {
    /// Sources larger than this are not parsed.
    pub max_source_bytes: usize,
    pub excerpt_length: usize,
    pub default_order: i64,
    pub environment: Environment,
    pub assets: AssetOptions,
    /// Run syntax highlighting on fenced code.
    pub highlight: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            max_source_bytes: DEFAULT_MAX_SOURCE_BYTES,
            excerpt_length: DEFAULT_EXCERPT_LENGTH,
            default_order: DEFAULT_ORDER,
            environment: Environment::default(),
            assets: AssetOptions::default(),
            highlight: true,
        }
    }
}
