//! Markdown processing for mdpress.
//!
//! Numbers headings and injects anchors, builds the table of contents, and
//! converts the processed markdown to HTML with `pulldown-cmark`.

pub mod html;
pub mod numbering;
pub mod toc;

pub use html::{MarkdownExtensions, base_stylesheet, to_html, wrap_document};
pub use numbering::{NumberingResult, build_anchor, number_headings, slugify};
pub use toc::{TREE_TOC_ID, TocNode, build_toc, build_toc_tree, fill_page_numbers};

/// Sentinel line marking where the TOC block is spliced in.
pub const TOC_PLACEHOLDER: &str = "<!--__TOC_PLACEHOLDER__-->";

/// Raw HTML that forces a page break in print.
pub const PAGE_BREAK_HTML: &str = "<div style='page-break-after: always;'></div>";
