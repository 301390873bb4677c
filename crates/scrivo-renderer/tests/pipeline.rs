//! End-to-end rendering through the public API.

use std::path::Path;

use pretty_assertions::assert_eq;
use scrivo_renderer::directive::{Block, BlockDirective, DirectiveOutput, DirectiveProcessor};
use scrivo_renderer::{
    DocumentRenderer, Environment, OutlineItem, RenderOptions, RenderStatus, to_plain_text,
};

fn render(source: &str) -> scrivo_renderer::RenderOutput {
    DocumentRenderer::default().render(Path::new("/docs/guide/page.md"), source)
}

fn item(id: &str, text: &str, level: u8, children: Vec<OutlineItem>) -> OutlineItem {
    OutlineItem {
        id: id.to_owned(),
        text: text.to_owned(),
        level,
        children,
    }
}

#[test]
fn test_frontmatter_title_and_callout() {
    let out = render("---\ntitle: Demo\n---\n# Hi\n\n:::info\nNote\n:::");

    assert_eq!(out.title, "Demo");
    assert_eq!(out.status, RenderStatus::Complete);
    assert_eq!(out.html.matches("callout-info").count(), 1);
    assert!(out.html.contains(r#"<div class="callout callout-info" role="note">"#));
    assert!(out.html.contains("<p>Note</p>"));
    assert!(out.toc.is_empty());
    assert_eq!(out.raw_body, "# Hi\n\n:::info\nNote\n:::");
}

#[test]
fn test_duplicate_headings_get_suffixed_ids() {
    let out = render("## Setup\n\ntext\n\n## Setup\n");
    let ids: Vec<&str> = out.toc.iter().map(|i| i.id.as_str()).collect();
    assert_eq!(ids, vec!["setup", "setup-2"]);
    assert!(out.html.contains(r#"<h2 id="setup">Setup</h2>"#));
    assert!(out.html.contains(r#"<h2 id="setup-2">Setup</h2>"#));
}

#[test]
fn test_relative_image_becomes_responsive() {
    let out = render("![alt](./assets/images/a.png)");
    assert!(out.html.contains("<picture>"));
    assert!(out.html.contains(r#"src="/_assets/assets/images/a.png""#));
    assert!(out.html.contains("/_assets/assets/images/a.png?w=800&amp;format=webp 800w"));
    assert!(out.html.contains(r#"alt="alt""#));
    assert!(out.plain_text.contains("[Image: alt]"));
}

#[test]
fn test_external_image_untouched() {
    let out = render("![logo](https://cdn.example.com/logo.png)");
    assert!(out.html.contains(r#"<img src="https://cdn.example.com/logo.png" alt="logo""#));
    assert!(!out.html.contains("<picture>"));
}

#[test]
fn test_youtube_embed() {
    let out = render("::youtube[My Vid]{id=abc123XYZ90}");
    assert!(out.html.contains("abc123XYZ90"));
    assert!(out.html.contains("<iframe"));
    assert_eq!(
        out.plain_text,
        "[YouTube Video: My Vid](https://www.youtube.com/watch?v=abc123XYZ90)"
    );
}

#[test]
fn test_oversized_source_is_truncated() {
    let limit = scrivo_renderer::DEFAULT_MAX_SOURCE_BYTES;
    let line = "# Heading\n\nSome **bold** paragraph text.\n\n";
    let source = line.repeat(2 * 1024 * 1024 / line.len() + 1);
    assert!(source.len() > limit);

    let out = render(&source);
    assert_eq!(out.status, RenderStatus::Truncated);
    assert!(out.html.contains("too large"));
    assert!(out.plain_text.len() <= limit);
    assert!(out.toc.is_empty());
    assert_eq!(out.title, "Page");
}

#[test]
fn test_size_guard_threshold_is_configurable() {
    let renderer = DocumentRenderer::new(RenderOptions {
        max_source_bytes: 32,
        ..RenderOptions::default()
    });
    let out = renderer.render(Path::new("a.md"), "short");
    assert_eq!(out.status, RenderStatus::Complete);

    let long = "x".repeat(33);
    let out = renderer.render(Path::new("a.md"), &long);
    assert_eq!(out.status, RenderStatus::Truncated);
    assert_eq!(out.plain_text.len(), 32);
}

#[test]
fn test_output_is_deterministic() {
    let source = "---\ntitle: T\ntags: [a, b]\n---\n## A\n\n```rust\nfn main() {}\n```\n\n:::tip\nx\n:::\n";
    let renderer = DocumentRenderer::default();
    let first = renderer.render(Path::new("a.md"), source);
    let second = renderer.render(Path::new("a.md"), source);
    assert_eq!(first, second);
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
}

#[test]
fn test_outline_nesting() {
    let out = render("## A\n### B\n## C\n### D\n### E\n");
    assert_eq!(
        out.toc,
        vec![
            item("a", "A", 2, vec![item("b", "B", 3, vec![])]),
            item(
                "c",
                "C",
                2,
                vec![item("d", "D", 3, vec![]), item("e", "E", 3, vec![])]
            ),
        ]
    );
}

#[test]
fn test_title_precedence() {
    let renderer = DocumentRenderer::default();
    let path = Path::new("docs/04-quick-start.md");
    assert_eq!(renderer.render(path, "---\ntitle: X\n---\n# Y").title, "X");
    assert_eq!(renderer.render(path, "# Y").title, "Y");
    assert_eq!(renderer.render(path, "no heading").title, "Quick Start");
}

#[test]
fn test_title_survives_directive_rewriting() {
    let out = render(":::note\n# Inside\n:::\n");
    assert_eq!(out.title, "Inside");
}

#[test]
fn test_plain_text_is_syntax_free() {
    let source = concat!(
        "# Title\n\n",
        "## Section **bold**\n\n",
        ":::warning Careful\nDo **not** do this.\n:::\n\n",
        "```js\nconst a = 1;\n```\n\n",
        "::mermaid\ngraph TD; A-->B\n::\n\n",
        ":::api GET /users\nList users\n\nReturns all.\n:::\n\n",
        "~~~\ntilde\n~~~\n\n",
        "Text with ## inside and ::: too.\n",
    );
    let out = render(source);
    for marker in ["**", ":::", "```", "##", "~~~"] {
        assert!(!out.plain_text.contains(marker), "found {marker:?} in {:?}", out.plain_text);
    }
    assert!(out.plain_text.contains("Do not do this."));
    assert!(out.plain_text.contains("GET /users"));
    assert!(out.plain_text.contains("[Diagram]"));
    assert!(out.plain_text.contains("const a = 1;"));
}

#[test]
fn test_plain_text_matches_public_mirror() {
    let body = "## A\n\nSome *text*.\n";
    assert_eq!(render(body).plain_text, to_plain_text(body));
}

#[test]
fn test_pathological_inputs_never_panic() {
    let quotes = "> ".repeat(500);
    let openers = ":::info\n".repeat(300);
    let inputs = [
        ":::info\n:::warning\n:::tip\nnever closed",
        "a\0b\0\0c\n# nul\0heading",
        ":::\n:::\n:::",
        "---\n: : :\n---\n",
        "::mermaid\nno end",
        "[[[[[[[[[[[[[[[[[[[[[[[[[[[[[[[[[[[[[[[[[[[[[[[[[[[[[[[[[[",
        quotes.as_str(),
        openers.as_str(),
    ];
    for input in inputs {
        let out = render(input);
        assert_ne!(out.status, RenderStatus::Truncated);
        if out.status == RenderStatus::Degraded {
            assert!(out.html.contains("raw-source"));
        }
    }
}

#[test]
fn test_unterminated_directive_stays_literal() {
    let out = render(":::info\nstill text");
    assert_eq!(out.status, RenderStatus::Complete);
    assert!(!out.html.contains("callout"));
    assert!(out.html.contains(":::info"));
    assert!(out.warnings.iter().any(|w| w.contains("unterminated")));
}

#[test]
fn test_raw_html_is_escaped() {
    let out = render("<script>alert(1)</script>\n\nhi <b>there</b>");
    assert!(!out.html.contains("<script>"));
    assert!(out.html.contains("&lt;script&gt;"));
    assert!(!out.html.contains("<b>"));
}

#[test]
fn test_javascript_links_neutralized() {
    let out = render("[x](javascript:alert(1))");
    assert!(!out.html.contains("javascript:"));
}

#[test]
fn test_frontmatter_metadata() {
    let out = render(
        "---\ndescription: About it\norder: 3\ndraft: true\nexcerpt: Short\nauthor: Ana\n---\nBody",
    );
    assert_eq!(out.order, 3);
    assert!(out.draft);
    assert_eq!(out.excerpt, "Short");
    assert_eq!(out.description.as_deref(), Some("About it"));
    assert_eq!(
        out.frontmatter.get("author"),
        Some(&serde_json::Value::String("Ana".to_owned()))
    );
}

#[test]
fn test_malformed_frontmatter_recovers() {
    let out = render("---\ntitle: [unclosed\n---\n# Body");
    assert_eq!(out.status, RenderStatus::Complete);
    assert!(out.frontmatter.is_empty());
    assert_eq!(out.title, "Body");
    assert!(!out.warnings.is_empty());
}

#[test]
fn test_code_block_decoration() {
    let out = render("```rust\nfn main() {}\n```\n\n```mermaid\ngraph TD\n```\n");
    assert!(out.html.contains("rust"));
    assert!(out.html.contains(r#"<pre class="mermaid" data-directive="diagram">graph TD</pre>"#));
}

#[test]
fn test_json_shape() {
    let out = render("---\ntitle: T\n---\n## A\n");
    let value = serde_json::to_value(&out).unwrap();
    for key in ["html", "toc", "frontmatter", "plainText", "title", "rawBody", "status"] {
        assert!(value.get(key).is_some(), "missing {key}");
    }
    assert_eq!(value["status"], "complete");
    assert_eq!(value["frontmatter"]["title"], "T");
}

/// Handler that fails on every `:::explode` container.
struct Exploding;

impl BlockDirective for Exploding {
    fn handles(&self, name: &str) -> bool {
        name == "explode"
    }

    fn render(&self, _block: &Block<'_>) -> DirectiveOutput {
        panic!("handler exploded");
    }
}

fn exploding_renderer(environment: Environment) -> DocumentRenderer {
    DocumentRenderer::new(RenderOptions {
        environment,
        ..RenderOptions::default()
    })
    .with_processor(DirectiveProcessor::standard().with_block(Exploding))
}

#[test]
fn test_environment_controls_error_detail() {
    let source = "# Boom\n\n:::explode\nbody\n:::";
    let path = Path::new("/docs/boom.md");

    let dev = exploding_renderer(Environment::Development).render(path, source);
    assert_eq!(dev.status, RenderStatus::Degraded);
    assert!(dev.html.contains("handler exploded"));
    assert!(dev.html.contains(r#"<pre class="raw-source">"#));
    assert_eq!(dev.title, "Boom");

    let prod = exploding_renderer(Environment::Production).render(path, source);
    assert_eq!(prod.status, RenderStatus::Degraded);
    assert!(!prod.html.contains("handler exploded"));
    assert!(prod.html.contains(":::explode"));
    assert_eq!(prod.title, "Boom");
}

#[test]
fn test_deeply_nested_quotes_render() {
    let source = format!("{}x", "> ".repeat(200_000));
    let out = render(&source);
    assert_eq!(out.status, RenderStatus::Complete);
    assert!(out.html.contains("x</p>"));
    assert!(out.warnings.iter().any(|w| w.contains("flattened")));
}

#[test]
fn test_deeply_nested_lists_and_emphasis_render() {
    let lists = render(&("- ".repeat(20_000) + "item"));
    assert_eq!(lists.status, RenderStatus::Complete);
    assert!(lists.html.contains("item"));
    assert!(lists.warnings.iter().any(|w| w.contains("flattened")));

    let emphasis = render(&("*a ".repeat(5_000) + "b" + &"*".repeat(5_000)));
    assert_eq!(emphasis.status, RenderStatus::Complete);
    assert!(emphasis.html.contains('b'));
}

#[test]
fn test_typed_sentinel_is_plain_html() {
    let out = render("<!--scrivo:0-->\n\ntext\n\n:::info\nNote\n:::");
    assert_eq!(out.status, RenderStatus::Complete);
    assert!(out.html.contains("&lt;!--scrivo:0--&gt;"));
    assert!(out.html.contains(r#"<p class="callout-title">Info</p><p>Note</p></div>"#));
    let callout = out.html.find("callout-info").unwrap();
    let text = out.html.find("<p>text</p>").unwrap();
    assert!(text < callout);
}

#[test]
fn test_unterminated_diagram_text_matches_html() {
    let out = render("::mermaid\ngraph TD\n\nAfter the diagram.");
    assert!(out.html.contains("After the diagram."));
    assert!(out.plain_text.contains("After the diagram."));
    assert!(!out.plain_text.contains("[Diagram]"));
}

#[test]
fn test_image_path_with_spaces_and_query() {
    let out = render("![A](<./my photo.png>)\n\n![B](./b.png?v=2)");
    assert!(out.html.contains("/_assets/my%20photo.png?w=400"));
    assert!(!out.html.contains("my photo.png"));
    assert!(out.html.contains("/_assets/b.png?v=2&amp;w=400"));
    assert!(!out.html.contains("?v=2?w="));
}
