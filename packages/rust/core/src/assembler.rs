//! Document assembler.
//!
//! Combines the input files into one markdown document, numbers its
//! headings, splices in the table of contents and converts the result to a
//! complete HTML page ready for printing.

use tracing::{debug, info, instrument};

use mdpress_markdown::{
    MarkdownExtensions, PAGE_BREAK_HTML, TOC_PLACEHOLDER, base_stylesheet, build_toc,
    number_headings, to_html, wrap_document,
};
use mdpress_shared::{FormattingOptions, PublicHeading, Result, SourceFile};

use crate::cancel::CancelSignal;

/// Output of a successful build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembledDocument {
    /// Combined markdown after numbering and TOC insertion.
    pub markdown: String,
    /// Complete HTML document.
    pub html: String,
    /// Public headings in document order, pages unresolved.
    pub headings: Vec<PublicHeading>,
}

/// Builds documents and remembers the headings of the latest build.
#[derive(Debug, Default)]
pub struct DocumentAssembler {
    headings: Vec<PublicHeading>,
}

impl DocumentAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Headings of the most recent successful build.
    pub fn headings(&self) -> &[PublicHeading] {
        &self.headings
    }

    /// Run the full markdown pipeline over `files`.
    #[instrument(skip_all, fields(files = files.len()))]
    pub fn build(
        &mut self,
        files: &[SourceFile],
        opts: &FormattingOptions,
        cancel: &CancelSignal,
    ) -> Result<AssembledDocument> {
        cancel.check()?;
        let combined = combine_sources(files, opts, cancel)?;

        let numbered = number_headings(&combined, opts, TOC_PLACEHOLDER);

        let toc = if opts.add_table_of_contents && !numbered.headers.is_empty() {
            build_toc(&numbered.headers, &numbered.headings, opts)
        } else {
            String::new()
        };
        let markdown = splice_toc(&numbered.markdown, &toc);

        cancel.check()?;
        let body = to_html(&markdown, MarkdownExtensions::from(opts));
        let head = if opts.additional_head_html.trim().is_empty() {
            base_stylesheet(opts)
        } else {
            format!("{}\n{}", base_stylesheet(opts), opts.additional_head_html)
        };
        let html = wrap_document(&body, &head);

        info!(
            headings = numbered.headings.len(),
            toc = !toc.is_empty(),
            html_len = html.len(),
            "document assembled"
        );

        self.headings = numbered.headings.clone();
        Ok(AssembledDocument {
            markdown,
            html,
            headings: numbered.headings,
        })
    }
}

/// Join the input files in order.
///
/// When the TOC goes after the first file, a page break and the placeholder
/// line follow it. With page breaks enabled every later file except the last
/// is followed by one.
pub fn combine_sources(
    files: &[SourceFile],
    opts: &FormattingOptions,
    cancel: &CancelSignal,
) -> Result<String> {
    let Some((first, rest)) = files.split_first() else {
        return Ok(String::new());
    };

    let mut out = String::with_capacity(files.iter().map(|f| f.content.len() + 64).sum());
    out.push_str(&first.content);
    out.push('\n');

    if opts.toc_after_first_file() {
        out.push_str(PAGE_BREAK_HTML);
        out.push_str("\n\n");
        out.push_str(TOC_PLACEHOLDER);
        out.push_str("\n\n");
    } else if opts.insert_page_breaks_between_files && !rest.is_empty() {
        out.push('\n');
        out.push_str(PAGE_BREAK_HTML);
        out.push_str("\n\n");
    }

    for (i, file) in rest.iter().enumerate() {
        cancel.check()?;
        out.push_str(&file.content);
        out.push('\n');
        if opts.insert_page_breaks_between_files && i + 1 < rest.len() {
            out.push('\n');
            out.push_str(PAGE_BREAK_HTML);
            out.push_str("\n\n");
        }
        debug!(file = %file.name, "file appended");
    }

    Ok(out)
}

/// Replace the placeholder line with the TOC block, or prepend the block.
fn splice_toc(markdown: &str, toc: &str) -> String {
    let has_placeholder = markdown.lines().any(|l| l == TOC_PLACEHOLDER);

    if toc.is_empty() {
        if !has_placeholder {
            return markdown.to_string();
        }
        return markdown
            .split('\n')
            .filter(|l| *l != TOC_PLACEHOLDER)
            .collect::<Vec<_>>()
            .join("\n");
    }

    if has_placeholder {
        markdown
            .split('\n')
            .map(|l| if l == TOC_PLACEHOLDER { toc } else { l })
            .collect::<Vec<_>>()
            .join("\n")
    } else {
        format!("{toc}\n\n{markdown}")
    }
}
