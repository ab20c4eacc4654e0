//! Markdown-to-HTML conversion and document wrapping.

use std::sync::LazyLock;

use pulldown_cmark::{CowStr, Event, LinkType, Options, Parser, Tag, TagEnd, html};
use regex::Regex;
use tracing::{debug, instrument};

use mdpress_shared::{FormattingOptions, TextAlignment, TocLayout};

use crate::toc::TREE_TOC_CSS;

/// Extension switches for the markdown parser.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MarkdownExtensions {
    /// Strikethrough, footnotes, task lists and definition lists.
    pub advanced: bool,
    pub pipe_tables: bool,
    /// Link bare `http(s)://` URLs found in text.
    pub auto_links: bool,
}

impl From<&FormattingOptions> for MarkdownExtensions {
    fn from(opts: &FormattingOptions) -> Self {
        Self {
            advanced: opts.use_advanced_extensions,
            pipe_tables: opts.use_pipe_tables,
            auto_links: opts.use_auto_links,
        }
    }
}

impl MarkdownExtensions {
    fn parser_options(self) -> Options {
        // `{#anchor}` attributes are always emitted by the numbering pass.
        let mut options = Options::ENABLE_HEADING_ATTRIBUTES;
        if self.advanced {
            options |= Options::ENABLE_STRIKETHROUGH
                | Options::ENABLE_FOOTNOTES
                | Options::ENABLE_TASKLISTS
                | Options::ENABLE_DEFINITION_LIST;
        }
        if self.pipe_tables {
            options |= Options::ENABLE_TABLES;
        }
        options
    }
}

/// Convert markdown to an HTML fragment.
#[instrument(skip(markdown), fields(len = markdown.len()))]
pub fn to_html(markdown: &str, extensions: MarkdownExtensions) -> String {
    let parser = Parser::new_ext(markdown, extensions.parser_options());

    let mut body = String::with_capacity(markdown.len() * 3 / 2);
    if extensions.auto_links {
        html::push_html(&mut body, autolink_events(parser).into_iter());
    } else {
        html::push_html(&mut body, parser);
    }

    debug!(html_len = body.len(), "markdown converted");
    body
}

/// Wrap a body fragment into a complete HTML document.
pub fn wrap_document(body: &str, head: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset='utf-8'>\n{head}\n</head>\n<body>\n{body}\n</body>\n</html>\n"
    )
}

/// Base `<style>` block derived from the formatting options.
pub fn base_stylesheet(opts: &FormattingOptions) -> String {
    let paragraph_rule = match opts.body_text_alignment {
        TextAlignment::Left => "p, li { text-align: left; }",
        TextAlignment::Center => "p, li { text-align: center; }",
        TextAlignment::Right => "p, li { text-align: right; }",
        TextAlignment::Justify => {
            "p, li { text-align: justify; text-justify: inter-word; hyphens: auto; }"
        }
    };
    let toc_rules = if opts.add_table_of_contents && opts.toc_layout == TocLayout::Tree {
        TREE_TOC_CSS
    } else {
        ""
    };

    format!(
        "<style>
:root {{ --mdpress-border-color: #d0d7de; }}
body {{ font-family: {font}; font-size: {size}px; margin: {margin}px; }}
{paragraph_rule}
h1, h2, h3, h4, h5, h6, pre, code {{ text-align: left; }}
img {{ max-width: 100%; }}
pre {{ overflow: auto; }}
table {{ border-collapse: collapse; border-spacing: 0; width: 100%; }}
table, th, td {{ border: 1px solid var(--mdpress-border-color); }}
th, td {{ padding: 6px 8px; vertical-align: top; word-break: break-word; }}
thead th {{ background: #f6f8fa; }}
{toc_rules}</style>",
        font = opts.base_font_family,
        size = opts.body_font_size_px,
        margin = opts.body_margin_px,
    )
}

/// Escape text for use in HTML content and attribute values.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let _ = pulldown_cmark_escape::escape_html(&mut out, text);
    out
}

// ---------------------------------------------------------------------------
// Auto-links
// ---------------------------------------------------------------------------

/// Split text events around bare URLs and wrap the URLs in links.
///
/// Text inside links, code blocks and raw HTML is left alone.
fn autolink_events<'a>(parser: Parser<'a>) -> Vec<Event<'a>> {
    static URL_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r#"https?://[^\s<>"']*[^\s<>"'.,;:!?)\]]"#).expect("valid regex")
    });

    let mut events = Vec::new();
    let mut link_depth = 0usize;
    let mut in_code_block = false;

    for event in parser {
        match &event {
            Event::Start(Tag::Link { .. }) => link_depth += 1,
            Event::End(TagEnd::Link) => link_depth = link_depth.saturating_sub(1),
            Event::Start(Tag::CodeBlock(_)) => in_code_block = true,
            Event::End(TagEnd::CodeBlock) => in_code_block = false,
            _ => {}
        }

        let Event::Text(text) = &event else {
            events.push(event);
            continue;
        };
        if link_depth > 0 || in_code_block || !URL_RE.is_match(text) {
            events.push(event);
            continue;
        }

        let mut last = 0;
        for m in URL_RE.find_iter(text) {
            if m.start() > last {
                events.push(Event::Text(CowStr::from(text[last..m.start()].to_string())));
            }
            let url = m.as_str().to_string();
            events.push(Event::Start(Tag::Link {
                link_type: LinkType::Autolink,
                dest_url: CowStr::from(url.clone()),
                title: CowStr::from(""),
                id: CowStr::from(""),
            }));
            events.push(Event::Text(CowStr::from(url)));
            events.push(Event::End(TagEnd::Link));
            last = m.end();
        }
        if last < text.len() {
            events.push(Event::Text(CowStr::from(text[last..].to_string())));
        }
    }

    events
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_extensions() -> MarkdownExtensions {
        MarkdownExtensions {
            advanced: true,
            pipe_tables: true,
            auto_links: true,
        }
    }

    #[test]
    fn heading_attributes_become_ids() {
        let html = to_html("## 1 Intro {#1-intro}", MarkdownExtensions::default());
        assert_eq!(html.trim(), "<h2 id=\"1-intro\">1 Intro</h2>");
    }

    #[test]
    fn pipe_tables_follow_the_flag() {
        let md = "| a | b |\n| --- | --- |\n| 1 | 2 |\n";
        assert!(to_html(md, all_extensions()).contains("<table>"));
        assert!(!to_html(md, MarkdownExtensions::default()).contains("<table>"));
    }

    #[test]
    fn strikethrough_needs_advanced() {
        let md = "~~gone~~";
        assert!(to_html(md, all_extensions()).contains("<del>gone</del>"));
        assert!(!to_html(md, MarkdownExtensions::default()).contains("<del>"));
    }

    #[test]
    fn bare_urls_are_linked() {
        let html = to_html("See https://example.com/docs. Done", all_extensions());
        assert!(html.contains("<a href=\"https://example.com/docs\">https://example.com/docs</a>. Done"));
    }

    #[test]
    fn urls_in_code_and_links_are_untouched() {
        let md = "[site](https://a.example)\n\n```\nhttps://b.example\n```\n";
        let html = to_html(md, all_extensions());
        assert_eq!(html.matches("<a href=").count(), 1);
        assert!(html.contains("<code>https://b.example\n</code>"));
    }

    #[test]
    fn raw_html_passes_through() {
        let md = "before\n\n<div style='page-break-after: always;'></div>\n\nafter";
        let html = to_html(md, MarkdownExtensions::default());
        assert!(html.contains("<div style='page-break-after: always;'></div>"));
    }

    #[test]
    fn wrap_document_places_head_and_body() {
        let doc = wrap_document("<p>x</p>", "<style>p{}</style>");
        assert!(doc.starts_with("<!DOCTYPE html>"));
        assert!(doc.contains("<meta charset='utf-8'>\n<style>p{}</style>\n</head>"));
        assert!(doc.contains("<body>\n<p>x</p>\n</body>"));
    }

    #[test]
    fn stylesheet_reflects_options() {
        let opts = FormattingOptions {
            body_text_alignment: TextAlignment::Center,
            add_table_of_contents: true,
            toc_layout: TocLayout::Tree,
            ..Default::default()
        };
        let css = base_stylesheet(&opts);
        assert!(css.contains("text-align: center"));
        assert!(css.contains("font-size: 12px"));
        assert!(css.contains("#mdpress-toc"));

        let plain = base_stylesheet(&FormattingOptions::default());
        assert!(!plain.contains("#mdpress-toc"));
    }

    #[test]
    fn escape_html_covers_specials() {
        assert_eq!(escape_html("a<b>&\"c"), "a&lt;b&gt;&amp;&quot;c");
        assert_eq!(escape_html("plain text"), "plain text");
    }
}
