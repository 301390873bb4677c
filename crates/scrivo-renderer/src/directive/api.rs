//! API endpoint blocks.
//!
//! ```text
//! :::api GET /users/{id}
//! Fetch a single user.
//!
//! Returns 404 when the user does not exist.
//! :::
//! ```
//!
//! The first body line is the summary and everything after the first blank
//! line is the description. A body with no blank line is the compact form:
//! first line summary, remaining lines description. The single-line form
//! `:::api GET /health Liveness probe :::` carries the summary in the header.

use std::fmt::Write;

use crate::escape::escape_html;

use super::{Block, BlockDirective, DirectiveNode, DirectiveOutput};

/// HTTP methods accepted in an API block header.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Options,
    Head,
}

impl HttpMethod {
    /// Parse an upper-case method token.
    #[must_use]
    pub fn parse(token: &str) -> Option<Self> {
        Some(match token {
            "GET" => Self::Get,
            "POST" => Self::Post,
            "PUT" => Self::Put,
            "PATCH" => Self::Patch,
            "DELETE" => Self::Delete,
            "OPTIONS" => Self::Options,
            "HEAD" => Self::Head,
            _ => return None,
        })
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
            Self::Options => "OPTIONS",
            Self::Head => "HEAD",
        }
    }
}

/// Parsed `METHOD PATH [summary]` header.
#[derive(Debug, PartialEq, Eq)]
pub(crate) struct Endpoint<'a> {
    pub method: HttpMethod,
    pub path: &'a str,
    pub summary: &'a str,
}

pub(crate) fn parse_header(header: &str) -> Option<Endpoint<'_>> {
    let header = header.trim();
    let (method, rest) = header.split_once(char::is_whitespace)?;
    let method = HttpMethod::parse(method)?;
    let rest = rest.trim_start();
    let (path, summary) = rest
        .split_once(char::is_whitespace)
        .map_or((rest, ""), |(path, summary)| (path, summary.trim()));
    if path.is_empty() {
        return None;
    }
    Some(Endpoint {
        method,
        path,
        summary,
    })
}

/// Split a body into summary and description paragraphs.
pub(crate) fn split_body(body: &str) -> (String, Vec<String>) {
    let mut paragraphs: Vec<Vec<&str>> = Vec::new();
    let mut current = Vec::new();
    for line in body.lines() {
        if line.trim().is_empty() {
            if !current.is_empty() {
                paragraphs.push(std::mem::take(&mut current));
            }
        } else {
            current.push(line.trim());
        }
    }
    if !current.is_empty() {
        paragraphs.push(current);
    }

    let mut paragraphs = paragraphs.into_iter();
    let Some(mut first) = paragraphs.next() else {
        return (String::new(), Vec::new());
    };
    let summary = first.remove(0).to_owned();

    let mut description = Vec::new();
    if !first.is_empty() {
        description.push(first.join("\n"));
    }
    description.extend(paragraphs.map(|p| p.join("\n")));

    (summary, description)
}

/// Handler for `:::api`.
#[derive(Debug, Default)]
pub struct ApiDirective;

impl BlockDirective for ApiDirective {
    fn handles(&self, name: &str) -> bool {
        name == "api"
    }

    fn render(&self, block: &Block<'_>) -> DirectiveOutput {
        let Some(endpoint) = parse_header(block.header) else {
            tracing::debug!(line = block.line, header = block.header, "Invalid API block header");
            return DirectiveOutput::Skip;
        };

        let (body_summary, mut description) = split_body(block.body);
        let summary = if endpoint.summary.is_empty() {
            body_summary
        } else {
            // Header summary wins; a body line then belongs to the description.
            if !body_summary.is_empty() {
                description.insert(0, body_summary);
            }
            endpoint.summary.to_owned()
        };

        DirectiveOutput::Replace(DirectiveNode::Api {
            html: render_html(&endpoint, &summary, &description),
        })
    }
}

fn render_html(endpoint: &Endpoint<'_>, summary: &str, description: &[String]) -> String {
    let method = endpoint.method.as_str();
    let lower = method.to_ascii_lowercase();

    let mut html = String::with_capacity(256);
    let _ = write!(
        html,
        r#"<div class="api-block" data-method="{lower}"><div class="api-block-header"><span class="api-method api-method-{lower}">{method}</span> <code class="api-path">{}</code></div>"#,
        escape_html(endpoint.path)
    );
    if !summary.is_empty() {
        let _ = write!(html, r#"<p class="api-summary">{}</p>"#, escape_html(summary));
    }

    if !description.is_empty() {
        html.push_str(r#"<div class="api-description">"#);
        for paragraph in description {
            let _ = write!(html, "<p>{}</p>", escape_html(paragraph));
        }
        html.push_str("</div>");
    }
    html.push_str("</div>");
    html
}
