//! Media embeds.
//!
//! Two forms:
//!
//! - by ID: `::youtube[Title]{id=ID}` (also `vimeo`, `loom`)
//! - by URL: `::embed[Title]{url=URL}`, resolved through [`PROVIDERS`]
//!
//! A URL whose host has no provider, or whose identifier cannot be
//! extracted, renders as a link card. Gists never embed: inline gist
//! widgets need a third-party script, so they always get the card.

use std::fmt::Write;

use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};

use crate::escape::escape_html;

use super::{DirectiveArgs, DirectiveNode, DirectiveOutput, LeafDirective};

/// Embeddable service, keyed by host.
#[derive(Debug)]
pub struct Provider {
    /// Short name, used as CSS modifier.
    pub name: &'static str,
    /// Human label used in plain text (`[YouTube Video: Title](url)`).
    pub label: &'static str,
    hosts: &'static [&'static str],
    /// Extracts an iframe `src` from the URL. `None` means link card only.
    player: Option<fn(&Url<'_>) -> Option<String>>,
}

/// Domain table for `::embed`.
pub static PROVIDERS: &[Provider] = &[
    Provider {
        name: "youtube",
        label: "YouTube Video",
        hosts: &["youtube.com", "m.youtube.com", "youtu.be", "youtube-nocookie.com"],
        player: Some(youtube_player),
    },
    Provider {
        name: "vimeo",
        label: "Vimeo Video",
        hosts: &["vimeo.com", "player.vimeo.com"],
        player: Some(vimeo_player),
    },
    Provider {
        name: "loom",
        label: "Loom Video",
        hosts: &["loom.com"],
        player: Some(loom_player),
    },
    Provider {
        name: "codepen",
        label: "CodePen",
        hosts: &["codepen.io"],
        player: Some(codepen_player),
    },
    Provider {
        name: "figma",
        label: "Figma",
        hosts: &["figma.com"],
        player: Some(figma_player),
    },
    Provider {
        name: "gist",
        label: "Gist",
        hosts: &["gist.github.com"],
        player: None,
    },
];

/// Find the provider for an http(s) URL.
pub fn provider_for_url(url: &str) -> Option<&'static Provider> {
    let parsed = Url::parse(url)?;
    PROVIDERS.iter().find(|p| p.hosts.contains(&parsed.host.as_str()))
}

/// Minimal view of an absolute http(s) URL.
#[derive(Debug, PartialEq, Eq)]
pub(crate) struct Url<'a> {
    raw: &'a str,
    /// Lower-cased host without `www.` or port.
    host: String,
    path: &'a str,
    query: &'a str,
}

impl<'a> Url<'a> {
    fn parse(raw: &'a str) -> Option<Self> {
        let rest = raw
            .strip_prefix("https://")
            .or_else(|| raw.strip_prefix("http://"))?;
        let rest = rest.split('#').next().unwrap_or_default();
        let authority_end = rest.find(['/', '?']).unwrap_or(rest.len());
        let authority = &rest[..authority_end];
        let host = authority.rsplit('@').next().unwrap_or_default();
        let host = host.split(':').next().unwrap_or_default().to_ascii_lowercase();
        if host.is_empty() {
            return None;
        }
        let host = host.strip_prefix("www.").map(str::to_owned).unwrap_or(host);

        let tail = &rest[authority_end..];
        let (path, query) = tail.split_once('?').unwrap_or((tail, ""));
        Some(Self {
            raw,
            host,
            path,
            query,
        })
    }

    fn segments(&self) -> impl Iterator<Item = &'a str> {
        self.path.split('/').filter(|s| !s.is_empty())
    }

    fn query_param(&self, key: &str) -> Option<&'a str> {
        self.query
            .split('&')
            .filter_map(|pair| pair.split_once('='))
            .find_map(|(k, v)| (k == key).then_some(v))
    }
}

fn is_id(s: &str) -> bool {
    !s.is_empty()
        && s.len() <= 64
        && s.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

fn youtube_player(url: &Url<'_>) -> Option<String> {
    let id = if url.host == "youtu.be" {
        url.segments().next()
    } else {
        url.query_param("v").or_else(|| {
            let mut segments = url.segments();
            match segments.next() {
                Some("embed" | "shorts" | "live") => segments.next(),
                _ => None,
            }
        })
    };
    id.filter(|id| is_id(id)).map(youtube_src)
}

fn vimeo_player(url: &Url<'_>) -> Option<String> {
    url.segments()
        .find(|s| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()))
        .map(vimeo_src)
}

fn loom_player(url: &Url<'_>) -> Option<String> {
    let mut segments = url.segments();
    match segments.next() {
        Some("share" | "embed") => segments.next().filter(|id| is_id(id)).map(loom_src),
        _ => None,
    }
}

fn codepen_player(url: &Url<'_>) -> Option<String> {
    let mut segments = url.segments();
    let user = segments.next().filter(|s| is_id(s))?;
    let kind = segments.next()?;
    let id = segments.next().filter(|s| is_id(s))?;
    matches!(kind, "pen" | "embed")
        .then(|| format!("https://codepen.io/{user}/embed/{id}?default-tab=result"))
}

fn figma_player(url: &Url<'_>) -> Option<String> {
    let kind = url.segments().next()?;
    matches!(kind, "file" | "design" | "proto" | "board").then(|| {
        format!(
            "https://www.figma.com/embed?embed_host=share&url={}",
            utf8_percent_encode(url.raw, NON_ALPHANUMERIC)
        )
    })
}

fn youtube_src(id: &str) -> String {
    format!("https://www.youtube.com/embed/{id}")
}

fn vimeo_src(id: &str) -> String {
    format!("https://player.vimeo.com/video/{id}")
}

fn loom_src(id: &str) -> String {
    format!("https://www.loom.com/embed/{id}")
}

/// ID-addressed leaf directives: `(name, provider name, player, canonical page)`.
type IdEmbed = (&'static str, &'static str, fn(&str) -> String, fn(&str) -> String);

const ID_EMBEDS: &[IdEmbed] = &[
    ("youtube", "youtube", youtube_src, youtube_page),
    ("vimeo", "vimeo", vimeo_src, vimeo_page),
    ("loom", "loom", loom_src, loom_page),
];

fn youtube_page(id: &str) -> String {
    format!("https://www.youtube.com/watch?v={id}")
}

fn vimeo_page(id: &str) -> String {
    format!("https://vimeo.com/{id}")
}

fn loom_page(id: &str) -> String {
    format!("https://www.loom.com/share/{id}")
}

fn id_embed(name: &str) -> Option<&'static IdEmbed> {
    ID_EMBEDS.iter().find(|(n, ..)| *n == name)
}

fn provider_named(name: &str) -> Option<&'static Provider> {
    PROVIDERS.iter().find(|p| p.name == name)
}

/// Plain-text description of a leaf embed: `(label, title, url)`.
///
/// Returns `None` for leaves that would not expand.
pub(crate) fn describe_leaf(name: &str, args: &DirectiveArgs) -> Option<(&'static str, String, String)> {
    if name == "embed" {
        let url = args.get("url")?;
        let parsed = Url::parse(url)?;
        let label = PROVIDERS
            .iter()
            .find(|p| p.hosts.contains(&parsed.host.as_str()))
            .map_or("Link", |p| p.label);
        let title = args.label_or(&parsed.host).to_owned();
        return Some((label, title, url.to_owned()));
    }

    let (_, provider, _, page) = id_embed(name)?;
    let id = args.get("id").filter(|id| is_id(id))?;
    let label = provider_named(provider).map_or("Video", |p| p.label);
    Some((label, args.label_or("Video").to_owned(), page(id)))
}

/// Handler for `::embed` and the ID-based providers.
#[derive(Debug, Default)]
pub struct EmbedDirective;

impl LeafDirective for EmbedDirective {
    fn handles(&self, name: &str) -> bool {
        name == "embed" || id_embed(name).is_some()
    }

    fn render(&self, name: &str, args: &DirectiveArgs) -> DirectiveOutput {
        let html = if name == "embed" {
            let Some(url) = args.get("url") else {
                return DirectiveOutput::Skip;
            };
            let Some(parsed) = Url::parse(url) else {
                // Only http(s) links are ever emitted as hrefs.
                return DirectiveOutput::Skip;
            };
            let provider = PROVIDERS.iter().find(|p| p.hosts.contains(&parsed.host.as_str()));
            match provider.and_then(|p| p.player.and_then(|player| player(&parsed)).map(|src| (p, src))) {
                Some((provider, src)) => iframe(provider.name, &src, args.label_or(provider.label)),
                None => link_card(url, args.label_or(&parsed.host)),
            }
        } else {
            let Some((_, provider, player, _)) = id_embed(name) else {
                return DirectiveOutput::Skip;
            };
            let Some(id) = args.get("id").filter(|id| is_id(id)) else {
                return DirectiveOutput::Skip;
            };
            let label = provider_named(provider).map_or("Video", |p| p.label);
            iframe(provider, &player(id), args.label_or(label))
        };

        DirectiveOutput::Replace(DirectiveNode::Embed { html })
    }
}

fn iframe(provider: &str, src: &str, title: &str) -> String {
    let mut html = String::with_capacity(320);
    let _ = write!(
        html,
        r#"<div class="embed embed-{provider}"><iframe src="{}" title="{}" loading="lazy" allow="accelerometer; clipboard-write; encrypted-media; gyroscope; picture-in-picture; fullscreen" referrerpolicy="strict-origin-when-cross-origin" allowfullscreen></iframe></div>"#,
        escape_html(src),
        escape_html(title)
    );
    html
}

fn link_card(url: &str, title: &str) -> String {
    let url = escape_html(url);
    let mut html = String::with_capacity(200);
    let _ = write!(
        html,
        r#"<div class="embed embed-card"><a href="{url}" target="_blank" rel="noopener noreferrer"><span class="embed-card-title">{}</span><span class="embed-card-url">{url}</span></a></div>"#,
        escape_html(title)
    );
    html
}
