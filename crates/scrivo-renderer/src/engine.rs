//! Document renderer and its resilience boundary.
//!
//! [`DocumentRenderer::render`] is a total function: any input string
//! produces a [`RenderOutput`]. Oversized sources short-circuit before
//! parsing. Pipeline errors and panics are contained and turned into a
//! degraded page that shows the raw source.

use std::any::Any;
use std::fmt::Write;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::Path;

use tracing::{error, warn};

use crate::directive::DirectiveProcessor;
use crate::error::PipelineError;
use crate::escape::escape_html;
use crate::frontmatter::{self, Frontmatter};
use crate::metadata::{resolve_excerpt, resolve_order, resolve_title, title_from_path};
use crate::options::{Environment, RenderOptions};
use crate::output::{RenderOutput, RenderStatus};
use crate::plaintext::to_plain_text;
use crate::{render, transform, tree};

/// Largest raw preview shown on the "too large" page.
const PREVIEW_BYTES: usize = 64 * 1024;

/// Markdown document transformation engine.
///
/// Holds no per-document state; share one instance across threads.
///
/// ```
/// use std::path::Path;
/// use scrivo_renderer::{DocumentRenderer, RenderStatus};
///
/// let renderer = DocumentRenderer::default();
/// let out = renderer.render(Path::new("guide.md"), "# Hello\n\nWorld");
/// assert_eq!(out.title, "Hello");
/// assert_eq!(out.status, RenderStatus::Complete);
/// assert!(out.html.contains(r#"<h1 id="hello">Hello</h1>"#));
/// ```
#[derive(Debug)]
pub struct DocumentRenderer {
    options: RenderOptions,
    processor: DirectiveProcessor,
}

impl Default for DocumentRenderer {
    fn default() -> Self {
        Self::new(RenderOptions::default())
    }
}

impl DocumentRenderer {
    /// Renderer with the standard directive set.
    #[must_use]
    pub fn new(options: RenderOptions) -> Self {
        Self {
            options,
            processor: DirectiveProcessor::standard(),
        }
    }

    /// Replace the directive processor.
    #[must_use]
    pub fn with_processor(mut self, processor: DirectiveProcessor) -> Self {
        self.processor = processor;
        self
    }

    #[must_use]
    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    /// Render one document. Never fails.
    #[must_use]
    pub fn render(&self, path: &Path, source: &str) -> RenderOutput {
        if source.len() > self.options.max_source_bytes {
            warn!(
                path = %path.display(),
                size = source.len(),
                limit = self.options.max_source_bytes,
                "Source too large, skipping parse"
            );
            return self.too_large(path, source);
        }
        self.contain(path, source, || self.pipeline(path, source))
    }

    /// Full pipeline: split, preprocess, parse, transform, render, mirror.
    fn pipeline(&self, path: &Path, source: &str) -> Result<RenderOutput, PipelineError> {
        let split = frontmatter::split(source);
        let body = split.body;
        let mut warnings: Vec<String> = split.warning.into_iter().collect();

        let preprocessed = self.processor.process(body);
        warnings.extend(preprocessed.warnings);

        let parsed = tree::build(
            &preprocessed.markdown,
            preprocessed.nodes,
            &preprocessed.sentinel_tag,
        )?;
        warnings.extend(parsed.warnings);
        for warning in &warnings {
            warn!(path = %path.display(), %warning, "Recovered during render");
        }

        let mut doc = parsed.document;
        let toc = transform::run(&mut doc, &self.options);
        let html = render::render(&doc)?;

        let plain_text = to_plain_text(body);
        let fm = split.frontmatter;
        Ok(RenderOutput {
            html,
            toc,
            title: resolve_title(&fm, body, path),
            order: resolve_order(&fm, path, self.options.default_order),
            excerpt: resolve_excerpt(&fm, &plain_text, self.options.excerpt_length),
            description: fm.description.clone(),
            draft: fm.draft.unwrap_or(false),
            frontmatter: fm,
            plain_text,
            raw_body: body.to_owned(),
            status: RenderStatus::Complete,
            warnings,
        })
    }

    /// Run `pipeline`, turning errors and panics into degraded output.
    fn contain<F>(&self, path: &Path, source: &str, pipeline: F) -> RenderOutput
    where
        F: FnOnce() -> Result<RenderOutput, PipelineError>,
    {
        let failure = match catch_unwind(AssertUnwindSafe(pipeline)) {
            Ok(Ok(output)) => return output,
            Ok(Err(err)) => {
                error!(path = %path.display(), error = %err, "Render pipeline failed");
                err.to_string()
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                error!(path = %path.display(), %message, "Render pipeline panicked");
                format!("internal error: {message}")
            }
        };
        self.degraded(path, source, &failure)
    }

    fn degraded(&self, path: &Path, source: &str, failure: &str) -> RenderOutput {
        let (frontmatter, body) = attempt(|| {
            let split = frontmatter::split(source);
            (split.frontmatter, split.body.to_owned())
        })
        .unwrap_or_else(|| (Frontmatter::default(), source.to_owned()));

        let plain_text = attempt(|| to_plain_text(&body)).unwrap_or_else(|| body.clone());
        let title = attempt(|| resolve_title(&frontmatter, &body, path))
            .unwrap_or_else(|| title_from_path(path));
        let excerpt = attempt(|| resolve_excerpt(&frontmatter, &plain_text, self.options.excerpt_length))
            .unwrap_or_default();

        let mut html = String::with_capacity(source.len() + 256);
        html.push_str(r#"<div class="render-error" role="alert"><p class="render-error-title">This page could not be rendered.</p>"#);
        match self.options.environment {
            Environment::Development => {
                let _ = write!(
                    html,
                    r#"<pre class="render-error-detail">{}</pre>"#,
                    escape_html(failure)
                );
            }
            Environment::Production => {
                html.push_str("<p>The original source is shown below.</p>");
            }
        }
        html.push_str("</div>");
        let _ = write!(html, r#"<pre class="raw-source">{}</pre>"#, escape_html(source));

        RenderOutput {
            html,
            toc: Vec::new(),
            order: resolve_order(&frontmatter, path, self.options.default_order),
            description: frontmatter.description.clone(),
            draft: frontmatter.draft.unwrap_or(false),
            frontmatter,
            plain_text,
            title,
            raw_body: body,
            excerpt,
            status: RenderStatus::Degraded,
            warnings: vec![failure.to_owned()],
        }
    }

    fn too_large(&self, path: &Path, source: &str) -> RenderOutput {
        let limit = self.options.max_source_bytes;
        let preview = truncate_at_char_boundary(source, limit.min(PREVIEW_BYTES));
        let truncated = truncate_at_char_boundary(source, limit);

        let mut html = String::with_capacity(preview.len() + 256);
        let _ = write!(
            html,
            r#"<div class="render-notice render-too-large" role="alert"><p>This document is too large to display ({} bytes, limit {limit} bytes). Showing the first {} bytes of the source.</p></div>"#,
            source.len(),
            preview.len()
        );
        let _ = write!(html, r#"<pre class="raw-source">{}</pre>"#, escape_html(preview));

        // The header sits at the top, so the kept prefix still carries it.
        let (frontmatter, body) = attempt(|| {
            let split = frontmatter::split(truncated);
            (split.frontmatter, split.body)
        })
        .unwrap_or_else(|| (Frontmatter::default(), truncated));
        let title = attempt(|| resolve_title(&frontmatter, body, path))
            .unwrap_or_else(|| title_from_path(path));

        RenderOutput {
            html,
            toc: Vec::new(),
            plain_text: truncated.to_owned(),
            title,
            raw_body: body.to_owned(),
            order: resolve_order(&frontmatter, path, self.options.default_order),
            excerpt: frontmatter.excerpt.clone().unwrap_or_default(),
            description: frontmatter.description.clone(),
            draft: frontmatter.draft.unwrap_or(false),
            frontmatter,
            status: RenderStatus::Truncated,
            warnings: vec![format!(
                "source is {} bytes, over the {limit} byte limit",
                source.len()
            )],
        }
    }
}

/// Run `f`, swallowing a panic.
fn attempt<T>(f: impl FnOnce() -> T) -> Option<T> {
    catch_unwind(AssertUnwindSafe(f)).ok()
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_owned()
    } else {
        "unknown panic".to_owned()
    }
}

/// Longest prefix of `s` of at most `max` bytes ending on a char boundary.
pub(crate) fn truncate_at_char_boundary(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}
