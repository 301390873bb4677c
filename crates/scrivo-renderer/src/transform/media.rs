//! Image reference rewriting.
//!
//! External URLs and data URIs are left alone. Everything else is treated
//! as content-relative and pointed at the asset service. Vector and
//! animated formats only get lazy loading; other rasters become responsive
//! `<picture>` elements with width variants.

use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};

use crate::options::AssetOptions;
use crate::tree::{Document, Inline, Rendition, walk_inlines_mut};

/// Extensions the asset service can resize. Anything else (svg, gif,
/// unknown) is served as-is.
const RASTER_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "webp", "avif", "bmp", "tif", "tiff"];

/// Bytes escaped in asset path segments. `%` is left alone so paths that
/// are already encoded pass through; `,` and space would split a `srcset`.
const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'\'')
    .add(b'#')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}')
    .add(b',');

#[derive(Debug, PartialEq, Eq)]
enum MediaRef<'a> {
    External,
    Relative(&'a str),
}

fn classify(src: &str) -> MediaRef<'_> {
    let src = src.trim();
    if src.is_empty() || src.starts_with("//") || has_scheme(src) {
        return MediaRef::External;
    }

    let mut path = src.trim_start_matches('/');
    loop {
        if let Some(rest) = path.strip_prefix("./") {
            path = rest;
        } else if let Some(rest) = path.strip_prefix("../") {
            path = rest;
        } else {
            break;
        }
    }
    MediaRef::Relative(path)
}

/// `http:`, `data:`, `mailto:` and friends.
fn has_scheme(src: &str) -> bool {
    src.split_once(':').is_some_and(|(scheme, _)| {
        !scheme.is_empty()
            && scheme
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
    })
}

fn extension(path: &str) -> Option<String> {
    let path = path.split(['?', '#']).next().unwrap_or(path);
    let file = path.rsplit('/').next().unwrap_or(path);
    file.rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .filter(|ext| !ext.is_empty())
}

/// Asset service URL for a content-relative `path`.
///
/// Segments are percent-encoded, a query is kept and a fragment dropped.
fn asset_url(endpoint: &str, path: &str) -> String {
    let path = path.split('#').next().unwrap_or(path);
    let (path, query) = match path.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (path, None),
    };
    let encoded = path
        .split('/')
        .map(|segment| utf8_percent_encode(segment, SEGMENT).to_string())
        .collect::<Vec<_>>()
        .join("/");
    match query {
        Some(query) if !query.is_empty() => format!("{endpoint}/{encoded}?{query}"),
        _ => format!("{endpoint}/{encoded}"),
    }
}

/// Rewrite every image in the document.
pub(crate) fn rewrite(doc: &mut Document, assets: &AssetOptions) {
    let endpoint = assets.endpoint.trim_end_matches('/');
    walk_inlines_mut(&mut doc.blocks, &mut |inline| {
        let Inline::Image(image) = inline else {
            return;
        };
        let MediaRef::Relative(path) = classify(&image.src) else {
            return;
        };

        let resizable = extension(path).is_some_and(|ext| RASTER_EXTENSIONS.contains(&ext.as_str()));
        let rendition = if resizable && !assets.widths.is_empty() {
            Rendition::Responsive {
                widths: assets.widths.clone(),
                format: assets.format.clone(),
            }
        } else {
            Rendition::Lazy
        };
        image.src = asset_url(endpoint, path);
        image.rendition = rendition;
    });
}
