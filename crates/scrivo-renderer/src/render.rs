//! HTML serialization of the document tree.
//!
//! Directive markup is already escaped and is written verbatim. Everything
//! else coming from the source, raw HTML included, is escaped here.

use std::fmt::Write;

use crate::PipelineError;
use crate::escape::escape_html;
use crate::tree::{
    Alignment, Block, Cell, CodeBlock, Document, Heading, Image, Inline, List, Rendition, Table,
};

/// Link schemes that are replaced with `#`.
const UNSAFE_SCHEMES: &[&str] = &["javascript:", "vbscript:", "data:"];

/// Serialize a document to HTML.
pub(crate) fn render(doc: &Document) -> Result<String, PipelineError> {
    let mut out = String::with_capacity(4096);
    write_blocks(&doc.blocks, &mut out)?;
    Ok(out)
}

fn write_blocks(blocks: &[Block], out: &mut String) -> Result<(), PipelineError> {
    for block in blocks {
        write_block(block, out)?;
    }
    Ok(())
}

fn write_block(block: &Block, out: &mut String) -> Result<(), PipelineError> {
    match block {
        Block::Heading(heading) => write_heading(heading, out)?,
        Block::Paragraph(inlines) => {
            out.push_str("<p>");
            write_inlines(inlines, out)?;
            out.push_str("</p>");
        }
        Block::Plain(inlines) => write_inlines(inlines, out)?,
        Block::Code(code) => write_code(code, out)?,
        Block::Quote(children) => {
            out.push_str("<blockquote>");
            write_blocks(children, out)?;
            out.push_str("</blockquote>");
        }
        Block::List(list) => write_list(list, out)?,
        Block::Table(table) => write_table(table, out)?,
        Block::Rule => out.push_str("<hr>"),
        Block::Html(raw) => {
            let raw = raw.trim_end();
            if !raw.is_empty() {
                write!(out, "<p>{}</p>", escape_html(raw))?;
            }
        }
        Block::Callout {
            kind,
            title,
            children,
        } => {
            let title = title.as_deref().unwrap_or(kind.label());
            write!(
                out,
                r#"<div class="callout callout-{}" role="note"><p class="callout-title">{}</p>"#,
                kind.as_str(),
                escape_html(title)
            )?;
            write_blocks(children, out)?;
            out.push_str("</div>");
        }
        Block::Api(html) | Block::Embed(html) => out.push_str(html),
        Block::Diagram(source) => {
            write!(
                out,
                r#"<pre class="mermaid" data-directive="diagram">{}</pre>"#,
                escape_html(source)
            )?;
        }
    }
    Ok(())
}

fn write_heading(heading: &Heading, out: &mut String) -> Result<(), PipelineError> {
    let level = heading.level;
    match &heading.id {
        Some(id) => write!(out, r#"<h{level} id="{}">"#, escape_html(id))?,
        None => write!(out, "<h{level}>")?,
    }
    write_inlines(&heading.inlines, out)?;
    write!(out, "</h{level}>")?;
    Ok(())
}

fn write_code(code: &CodeBlock, out: &mut String) -> Result<(), PipelineError> {
    let body = match &code.highlighted {
        Some(html) => html.clone(),
        None => escape_html(&code.source).into_owned(),
    };
    let class = code
        .lang
        .as_deref()
        .map(|lang| format!(r#" class="language-{}""#, escape_html(lang)))
        .unwrap_or_default();

    let Some(label) = &code.label else {
        write!(out, "<pre><code{class}>{body}</code></pre>")?;
        return Ok(());
    };
    let label = escape_html(label);
    write!(
        out,
        concat!(
            r#"<div class="code-block" data-lang="{label}">"#,
            r#"<div class="code-block-header"><span class="code-block-lang">{label}</span>"#,
            r#"<button type="button" class="code-block-copy" aria-label="Copy code">Copy</button></div>"#,
            r#"<pre><code{class}>{body}</code></pre></div>"#,
        ),
        label = label,
        class = class,
        body = body,
    )?;
    Ok(())
}

fn write_list(list: &List, out: &mut String) -> Result<(), PipelineError> {
    let (open, close) = match list.start {
        None => ("<ul>".to_owned(), "</ul>"),
        Some(1) => ("<ol>".to_owned(), "</ol>"),
        Some(n) => (format!(r#"<ol start="{n}">"#), "</ol>"),
    };
    out.push_str(&open);
    for item in &list.items {
        match item.task {
            Some(checked) => {
                out.push_str(r#"<li class="task-list-item"><input type="checkbox" disabled"#);
                if checked {
                    out.push_str(" checked");
                }
                out.push_str("> ");
            }
            None => out.push_str("<li>"),
        }
        write_blocks(&item.blocks, out)?;
        out.push_str("</li>");
    }
    out.push_str(close);
    Ok(())
}

fn alignment_style(alignment: Alignment) -> &'static str {
    match alignment {
        Alignment::None => "",
        Alignment::Left => r#" style="text-align:left""#,
        Alignment::Center => r#" style="text-align:center""#,
        Alignment::Right => r#" style="text-align:right""#,
    }
}

fn write_row(
    cells: &[Cell],
    tag: &str,
    alignments: &[Alignment],
    out: &mut String,
) -> Result<(), PipelineError> {
    out.push_str("<tr>");
    for (i, cell) in cells.iter().enumerate() {
        let style = alignments.get(i).copied().map_or("", alignment_style);
        write!(out, "<{tag}{style}>")?;
        write_inlines(cell, out)?;
        write!(out, "</{tag}>")?;
    }
    out.push_str("</tr>");
    Ok(())
}

fn write_table(table: &Table, out: &mut String) -> Result<(), PipelineError> {
    out.push_str("<table><thead>");
    write_row(&table.head, "th", &table.alignments, out)?;
    out.push_str("</thead><tbody>");
    for row in &table.rows {
        write_row(row, "td", &table.alignments, out)?;
    }
    out.push_str("</tbody></table>");
    Ok(())
}

fn write_inlines(inlines: &[Inline], out: &mut String) -> Result<(), PipelineError> {
    for inline in inlines {
        write_inline(inline, out)?;
    }
    Ok(())
}

fn write_inline(inline: &Inline, out: &mut String) -> Result<(), PipelineError> {
    match inline {
        Inline::Text(text) | Inline::Html(text) => out.push_str(&escape_html(text)),
        Inline::Code(code) => write!(out, "<code>{}</code>", escape_html(code))?,
        Inline::Emphasis(children) => wrap("em", children, out)?,
        Inline::Strong(children) => wrap("strong", children, out)?,
        Inline::Strikethrough(children) => wrap("s", children, out)?,
        Inline::Link {
            url,
            title,
            children,
        } => {
            write!(out, r#"<a href="{}""#, escape_html(safe_url(url)))?;
            if !title.is_empty() {
                write!(out, r#" title="{}""#, escape_html(title))?;
            }
            out.push('>');
            write_inlines(children, out)?;
            out.push_str("</a>");
        }
        Inline::Image(image) => write_image(image, out)?,
        Inline::SoftBreak => out.push('\n'),
        Inline::HardBreak => out.push_str("<br>"),
    }
    Ok(())
}

fn wrap(tag: &str, children: &[Inline], out: &mut String) -> Result<(), PipelineError> {
    write!(out, "<{tag}>")?;
    write_inlines(children, out)?;
    write!(out, "</{tag}>")?;
    Ok(())
}

fn safe_url(url: &str) -> &str {
    let lower = url.trim().to_ascii_lowercase();
    if UNSAFE_SCHEMES.iter().any(|scheme| lower.starts_with(scheme)) {
        "#"
    } else {
        url
    }
}

fn write_image(image: &Image, out: &mut String) -> Result<(), PipelineError> {
    let src = escape_html(&image.src);
    let alt = escape_html(&image.alt);
    let title = if image.title.is_empty() {
        String::new()
    } else {
        format!(r#" title="{}""#, escape_html(&image.title))
    };

    match &image.rendition {
        Rendition::Original => write!(out, r#"<img src="{src}" alt="{alt}"{title}>"#)?,
        Rendition::Lazy => write!(out, r#"<img src="{src}" alt="{alt}"{title} loading="lazy">"#)?,
        Rendition::Responsive { widths, format } => {
            let largest = widths.iter().copied().max().unwrap_or_default();
            let sizes = format!("(max-width: {largest}px) 100vw, {largest}px");
            let format = escape_html(format);
            let modern = srcset(&src, widths, Some(&format));
            let fallback = srcset(&src, widths, None);
            write!(
                out,
                concat!(
                    r#"<picture><source type="image/{format}" srcset="{modern}" sizes="{sizes}">"#,
                    r#"<img src="{src}" srcset="{fallback}" sizes="{sizes}" alt="{alt}"{title} loading="lazy" decoding="async">"#,
                    "</picture>",
                ),
                format = format,
                modern = modern,
                sizes = sizes,
                src = src,
                fallback = fallback,
                alt = alt,
                title = title,
            )?;
        }
    }
    Ok(())
}

/// `src?w=400&amp;format=webp 400w, ...` (already attribute-escaped).
///
/// Parameters are appended with `&` when `src` already has a query.
fn srcset(src: &str, widths: &[u32], format: Option<&str>) -> String {
    let sep = if src.contains('?') { "&amp;" } else { "?" };
    widths
        .iter()
        .map(|w| match format {
            Some(format) => format!("{src}{sep}w={w}&amp;format={format} {w}w"),
            None => format!("{src}{sep}w={w} {w}w"),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directive::CalloutKind;
    use pretty_assertions::assert_eq;

    fn text(s: &str) -> Inline {
        Inline::Text(s.to_owned())
    }

    fn html(blocks: Vec<Block>) -> String {
        render(&Document { blocks }).unwrap()
    }

    #[test]
    fn test_paragraph_escapes_text() {
        assert_eq!(
            html(vec![Block::Paragraph(vec![text("a < b & c")])]),
            "<p>a &lt; b &amp; c</p>"
        );
    }

    #[test]
    fn test_raw_html_is_escaped() {
        assert_eq!(
            html(vec![Block::Html("<script>alert(1)</script>\n".to_owned())]),
            "<p>&lt;script&gt;alert(1)&lt;/script&gt;</p>"
        );
    }

    #[test]
    fn test_heading_with_id() {
        let block = Block::Heading(Heading {
            level: 2,
            id: Some("setup".to_owned()),
            inlines: vec![text("Setup")],
        });
        assert_eq!(html(vec![block]), r#"<h2 id="setup">Setup</h2>"#);
    }

    #[test]
    fn test_callout_default_title() {
        let block = Block::Callout {
            kind: CalloutKind::Info,
            title: None,
            children: vec![Block::Paragraph(vec![text("Note")])],
        };
        assert_eq!(
            html(vec![block]),
            r#"<div class="callout callout-info" role="note"><p class="callout-title">Info</p><p>Note</p></div>"#
        );
    }

    #[test]
    fn test_decorated_code() {
        let block = Block::Code(CodeBlock {
            lang: Some("sh".to_owned()),
            source: "echo <hi>\n".to_owned(),
            label: Some("sh".to_owned()),
            highlighted: None,
        });
        assert_eq!(
            html(vec![block]),
            concat!(
                r#"<div class="code-block" data-lang="sh"><div class="code-block-header">"#,
                r#"<span class="code-block-lang">sh</span><button type="button" class="code-block-copy" aria-label="Copy code">Copy</button></div>"#,
                r#"<pre><code class="language-sh">echo &lt;hi&gt;"#,
                "\n</code></pre></div>"
            )
        );
    }

    #[test]
    fn test_diagram_not_highlighted() {
        assert_eq!(
            html(vec![Block::Diagram("A-->B".to_owned())]),
            r#"<pre class="mermaid" data-directive="diagram">A--&gt;B</pre>"#
        );
    }

    #[test]
    fn test_unsafe_link_neutralized() {
        let link = Inline::Link {
            url: "JavaScript:alert(1)".to_owned(),
            title: String::new(),
            children: vec![text("x")],
        };
        assert_eq!(
            html(vec![Block::Paragraph(vec![link])]),
            r##"<p><a href="#">x</a></p>"##
        );
    }

    #[test]
    fn test_responsive_image() {
        let image = Inline::Image(Image {
            src: "/_assets/a.png".to_owned(),
            alt: "alt".to_owned(),
            title: String::new(),
            rendition: Rendition::Responsive {
                widths: vec![400, 800, 1200],
                format: "webp".to_owned(),
            },
        });
        let out = html(vec![Block::Paragraph(vec![image])]);
        assert!(out.contains(r#"<source type="image/webp" srcset="/_assets/a.png?w=400&amp;format=webp 400w, /_assets/a.png?w=800&amp;format=webp 800w, /_assets/a.png?w=1200&amp;format=webp 1200w""#));
        assert!(out.contains(r#"<img src="/_assets/a.png" srcset="/_assets/a.png?w=400 400w"#));
        assert!(out.contains(r#"loading="lazy" decoding="async""#));
    }

    #[test]
    fn test_srcset_extends_existing_query() {
        assert_eq!(
            srcset("/_assets/a.png?v=2", &[400, 800], Some("webp")),
            "/_assets/a.png?v=2&amp;w=400&amp;format=webp 400w, /_assets/a.png?v=2&amp;w=800&amp;format=webp 800w"
        );
        assert_eq!(
            srcset("/_assets/a.png", &[400], None),
            "/_assets/a.png?w=400 400w"
        );
    }

    #[test]
    fn test_task_list_and_ordered_start() {
        let list = Block::List(List {
            start: Some(3),
            items: vec![crate::tree::ListItem {
                task: Some(true),
                blocks: vec![Block::Plain(vec![text("done")])],
            }],
        });
        assert_eq!(
            html(vec![list]),
            r#"<ol start="3"><li class="task-list-item"><input type="checkbox" disabled checked> done</li></ol>"#
        );
    }

    #[test]
    fn test_table_alignment() {
        let table = Block::Table(Table {
            alignments: vec![Alignment::Center],
            head: vec![vec![text("h")]],
            rows: vec![vec![vec![text("1")]]],
        });
        assert_eq!(
            html(vec![table]),
            r#"<table><thead><tr><th style="text-align:center">h</th></tr></thead><tbody><tr><td style="text-align:center">1</td></tr></tbody></table>"#
        );
    }
}
