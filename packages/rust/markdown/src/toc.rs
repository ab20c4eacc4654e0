//! TOC (Table of Contents) builder.
//!
//! Turns the registered headings into either a flat markdown list or a nested
//! HTML tree whose entries carry page-number slots that are filled in once the
//! rendered PDF has been scanned.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::{Captures, Regex};
use tracing::{debug, instrument};

use mdpress_shared::{
    FormattingOptions, HeadingDescriptor, PublicHeading, TocBulletStyle, TocLayout, TocLeader,
};

use crate::PAGE_BREAK_HTML;
use crate::html::escape_html;

/// `id` of the tree TOC container. Its presence triggers the two-pass render.
pub const TREE_TOC_ID: &str = "mdpress-toc";

/// Number of dot characters in a dotted leader; CSS clips the overflow.
const LEADER_DOTS: usize = 160;

/// Stylesheet fragment for the tree TOC.
pub const TREE_TOC_CSS: &str = "\
#mdpress-toc .toc-title { font-size: 1.5em; font-weight: bold; margin-bottom: 0.8em; }
#mdpress-toc ol { list-style: none; margin: 0; padding-left: 1.2em; }
#mdpress-toc > ol { padding-left: 0; }
#mdpress-toc .toc-link { display: flex; align-items: baseline; color: inherit; text-decoration: none; }
#mdpress-toc .title { flex: 0 1 auto; }
#mdpress-toc .leader { flex: 1 1 auto; overflow: hidden; white-space: nowrap; margin: 0 0.3em; }
#mdpress-toc .page { flex: 0 0 auto; min-width: 1.5em; text-align: right; }
#mdpress-toc .visually-hidden { position: absolute; width: 1px; height: 1px; overflow: hidden; clip: rect(0 0 0 0); }
";

/// A node of the hierarchical TOC.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TocNode {
    pub level: u8,
    pub title: String,
    /// Link target (`#anchor`).
    pub href: String,
    pub children: Vec<TocNode>,
}

impl From<&PublicHeading> for TocNode {
    fn from(heading: &PublicHeading) -> Self {
        Self {
            level: heading.level,
            title: heading.label.clone(),
            href: heading.href(),
            children: vec![],
        }
    }
}

/// Build the TOC block in the configured layout.
///
/// `headers` feeds the flat form and `headings` the tree form; both come from
/// the same numbering pass. Returns an empty string when there is nothing to list.
#[instrument(skip_all, fields(layout = ?opts.toc_layout, headings = headings.len()))]
pub fn build_toc(
    headers: &[HeadingDescriptor],
    headings: &[PublicHeading],
    opts: &FormattingOptions,
) -> String {
    match opts.toc_layout {
        TocLayout::Flat => build_flat_toc(headers, opts),
        TocLayout::Tree => render_tree_toc(&build_toc_tree(headings), opts),
    }
}

// ---------------------------------------------------------------------------
// Flat form
// ---------------------------------------------------------------------------

/// Render a markdown list TOC followed by a page break.
pub fn build_flat_toc(headers: &[HeadingDescriptor], opts: &FormattingOptions) -> String {
    let entries: Vec<&HeadingDescriptor> =
        headers.iter().filter(|h| !h.is_super_heading()).collect();
    if entries.is_empty() {
        return String::new();
    }

    let numbered = opts.toc_bullet_style == TocBulletStyle::Numbered;
    // Nested ordered items need four columns to stay nested.
    let indent_width = if numbered { 4 } else { 2 };

    let mut lines = vec![format!("## {}", opts.toc_header())];
    for header in entries {
        let depth = usize::from(header.logical_level.saturating_sub(1));
        let indent = if opts.indent_toc {
            " ".repeat(depth * indent_width)
        } else {
            String::new()
        };
        lines.push(format!(
            "{indent}{} [{}](#{})",
            opts.toc_bullet_style.marker(),
            header.label(),
            header.anchor
        ));
    }
    lines.push(String::new());
    lines.push(PAGE_BREAK_HTML.to_string());

    debug!(entries = lines.len() - 3, "flat TOC built");
    lines.join("\n")
}

// ---------------------------------------------------------------------------
// Tree form
// ---------------------------------------------------------------------------

/// Build a forest from headings in document order.
///
/// A node becomes the child of the nearest preceding node with a smaller
/// level, or a root when there is none.
pub fn build_toc_tree(headings: &[PublicHeading]) -> Vec<TocNode> {
    let mut roots: Vec<TocNode> = Vec::new();
    let mut stack: Vec<TocNode> = Vec::new();

    for heading in headings {
        let node = TocNode::from(heading);
        while stack.last().is_some_and(|top| top.level >= node.level) {
            if let Some(done) = stack.pop() {
                attach(done, &mut stack, &mut roots);
            }
        }
        stack.push(node);
    }
    while let Some(done) = stack.pop() {
        attach(done, &mut stack, &mut roots);
    }

    roots
}

fn attach(node: TocNode, stack: &mut [TocNode], roots: &mut Vec<TocNode>) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(node),
        None => roots.push(node),
    }
}

/// Render the forest as a single raw HTML block followed by a page break.
pub fn render_tree_toc(nodes: &[TocNode], opts: &FormattingOptions) -> String {
    if nodes.is_empty() {
        return String::new();
    }

    let mut out = String::new();
    out.push_str(&format!("<nav id=\"{TREE_TOC_ID}\" class=\"toc\">\n"));
    out.push_str(&format!(
        "<div class=\"toc-title\">{}</div>\n",
        escape_html(opts.toc_header())
    ));
    render_list(nodes, opts.toc_leader, &mut out, true);
    out.push_str("</nav>\n\n");
    out.push_str(PAGE_BREAK_HTML);
    out
}

fn render_list(nodes: &[TocNode], leader: TocLeader, out: &mut String, top: bool) {
    if top {
        out.push_str("<ol class=\"toc-list\">\n");
    } else {
        out.push_str("<ol>\n");
    }

    for node in nodes {
        let href = escape_html(&node.href);
        out.push_str(&format!(
            "<li class=\"toc-entry toc-level-{}\"><a class=\"toc-link\" href=\"{href}\">",
            node.level
        ));
        out.push_str(&format!(
            "<span class=\"title\">{}</span>",
            escape_html(&node.title)
        ));
        if leader == TocLeader::Dotted {
            out.push_str(&format!(
                "<span class=\"leader\" aria-hidden=\"true\">{}</span>",
                ".".repeat(LEADER_DOTS)
            ));
        }
        out.push_str(&format!("<span class=\"page\" data-href=\"{href}\"></span></a>"));

        if node.children.is_empty() {
            out.push_str("</li>\n");
        } else {
            out.push('\n');
            render_list(&node.children, leader, out, false);
            out.push_str("</li>\n");
        }
    }

    out.push_str("</ol>\n");
}

// ---------------------------------------------------------------------------
// Page numbers
// ---------------------------------------------------------------------------

/// Fill the empty page slots of a rendered tree TOC with resolved page numbers.
///
/// Slots whose heading is unresolved stay empty.
pub fn fill_page_numbers(html: &str, headings: &[PublicHeading]) -> String {
    static PAGE_SLOT_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r#"<span class="page" data-href="([^"]*)"></span>"#).expect("valid regex")
    });

    let mut pages: HashMap<String, u32> = HashMap::new();
    for heading in headings.iter().filter(|h| h.is_resolved()) {
        pages.entry(escape_html(&heading.href())).or_insert(heading.page);
    }

    PAGE_SLOT_RE
        .replace_all(html, |caps: &Captures| {
            let href = &caps[1];
            match pages.get(href) {
                Some(page) => format!(
                    "<span class=\"page\" data-href=\"{href}\"><span class=\"visually-hidden\">Page&nbsp;</span>{page}</span>"
                ),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn heading(level: u8, label: &str) -> PublicHeading {
        PublicHeading {
            level,
            label: label.into(),
            anchor: crate::numbering::slugify(label),
            page: 0,
        }
    }

    fn descriptor(markdown_level: u8, text: &str, numbering: &str) -> HeadingDescriptor {
        HeadingDescriptor {
            markdown_level,
            logical_level: markdown_level.saturating_sub(1),
            text: text.into(),
            numbering: numbering.into(),
            anchor: crate::numbering::build_anchor(text, numbering),
        }
    }

    #[test]
    fn tree_from_levels_1_2_2_1() {
        let headings = vec![
            heading(1, "A"),
            heading(2, "A1"),
            heading(2, "A2"),
            heading(1, "B"),
        ];
        let forest = build_toc_tree(&headings);
        assert_eq!(forest.len(), 2);
        assert_eq!(forest[0].children.len(), 2);
        assert_eq!(forest[0].children[0].title, "A1");
        assert_eq!(forest[0].children[1].title, "A2");
        assert!(forest[1].children.is_empty());
    }

    #[test]
    fn tree_handles_deep_then_shallow() {
        let headings = vec![
            heading(2, "Orphan"),
            heading(1, "Root"),
            heading(3, "Grandchild"),
            heading(2, "Child"),
        ];
        let forest = build_toc_tree(&headings);
        assert_eq!(forest.len(), 2);
        assert_eq!(forest[0].title, "Orphan");
        let root = &forest[1];
        assert_eq!(root.children.len(), 2);
        assert_eq!(root.children[0].title, "Grandchild");
        assert_eq!(root.children[1].title, "Child");
        assert_eq!(root.children[0].href, "#grandchild");
    }

    #[test]
    fn flat_toc_lists_sub_headings() {
        let headers = vec![
            descriptor(1, "Book", ""),
            descriptor(2, "Intro", "1"),
            descriptor(3, "Scope", "1.1"),
        ];
        let toc = build_flat_toc(&headers, &FormattingOptions::default());
        let lines: Vec<&str> = toc.lines().collect();
        assert_eq!(lines[0], "## Table of Contents");
        assert_eq!(lines[1], "- [1 Intro](#1-intro)");
        assert_eq!(lines[2], "  - [1.1 Scope](#1-1-scope)");
        assert_eq!(lines[3], "");
        assert_eq!(lines[4], PAGE_BREAK_HTML);
        assert_eq!(lines.len(), 5);
    }

    #[test]
    fn flat_toc_numbered_uses_wider_indent() {
        let headers = vec![descriptor(2, "Intro", ""), descriptor(3, "Scope", "")];
        let opts = FormattingOptions {
            toc_bullet_style: TocBulletStyle::Numbered,
            toc_header_text: "Contents".into(),
            ..Default::default()
        };
        let toc = build_flat_toc(&headers, &opts);
        assert!(toc.starts_with("## Contents\n1. [Intro](#intro)\n    1. [Scope](#scope)"));
    }

    #[test]
    fn flat_toc_without_indent() {
        let headers = vec![descriptor(2, "Intro", ""), descriptor(4, "Deep", "")];
        let opts = FormattingOptions {
            indent_toc: false,
            ..Default::default()
        };
        let toc = build_flat_toc(&headers, &opts);
        assert!(toc.contains("\n- [Deep](#deep)"));
    }

    #[test]
    fn empty_inputs_render_nothing() {
        let opts = FormattingOptions::default();
        assert_eq!(build_flat_toc(&[], &opts), "");
        assert_eq!(build_flat_toc(&[descriptor(1, "Only", "")], &opts), "");
        assert_eq!(render_tree_toc(&[], &opts), "");
        assert!(build_toc_tree(&[]).is_empty());
    }

    #[test]
    fn tree_toc_renders_nested_lists_with_page_slots() {
        let headings = vec![heading(1, "Intro & Goals"), heading(2, "Scope")];
        let opts = FormattingOptions {
            toc_layout: TocLayout::Tree,
            ..Default::default()
        };
        let html = build_toc(&[], &headings, &opts);

        assert!(html.starts_with("<nav id=\"mdpress-toc\" class=\"toc\">"));
        assert!(html.contains("<span class=\"title\">Intro &amp; Goals</span>"));
        assert!(html.contains("<span class=\"page\" data-href=\"#intro-goals\"></span>"));
        assert!(html.contains("<ol>\n<li class=\"toc-entry toc-level-2\">"));
        assert!(html.contains(&".".repeat(LEADER_DOTS)));
        assert!(html.ends_with(PAGE_BREAK_HTML));

        // A raw HTML block ends at the first blank line.
        let block = html.split("\n\n").next().unwrap();
        assert!(block.ends_with("</nav>"));
    }

    #[test]
    fn tree_toc_without_leader() {
        let opts = FormattingOptions {
            toc_leader: TocLeader::None,
            ..Default::default()
        };
        let html = render_tree_toc(&build_toc_tree(&[heading(1, "A")]), &opts);
        assert!(!html.contains("class=\"leader\""));
    }

    #[test]
    fn fill_page_numbers_only_touches_resolved() {
        let mut resolved = heading(1, "Intro");
        resolved.page = 4;
        let pending = heading(1, "Later");
        let opts = FormattingOptions::default();
        let html = render_tree_toc(&build_toc_tree(&[resolved.clone(), pending.clone()]), &opts);

        let filled = fill_page_numbers(&html, &[resolved, pending]);
        assert!(filled.contains(
            "<span class=\"page\" data-href=\"#intro\"><span class=\"visually-hidden\">Page&nbsp;</span>4</span>"
        ));
        assert!(filled.contains("<span class=\"page\" data-href=\"#later\"></span>"));
    }
}
