//! End-to-end export pipeline: markdown files → HTML → PDF with page
//! numbers in the TOC, bookmarks and cleaned header/footer bands.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tracing::{debug, info, instrument, warn};

use mdpress_markdown::{TREE_TOC_ID, fill_page_numbers};
use mdpress_pdf::{BandRedaction, inject_outline_at, redact_bands_at, resolve_pages_at};
use mdpress_shared::{ExportOptions, FormattingOptions, MdPressError, PublicHeading, Result, SourceFile};

use crate::assembler::DocumentAssembler;
use crate::cancel::CancelSignal;
use crate::render::{PageLayout, PageRenderer};

/// Result of [`export_pdf`].
#[derive(Debug, Clone)]
pub struct ExportResult {
    pub output_path: PathBuf,
    /// Headings with their final page numbers (0 when unresolved).
    pub headings: Vec<PublicHeading>,
    /// Number of headings with a page.
    pub resolved: usize,
    /// Number of bookmarks written.
    pub bookmarks: usize,
    pub elapsed: Duration,
}

/// Progress callback for reporting export status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called when the export completes.
    fn done(&self, result: &ExportResult);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn done(&self, _result: &ExportResult) {}
}

/// Run the full export.
///
/// 1. Assemble the HTML document
/// 2. With a tree TOC: print a draft, resolve pages, fill the TOC page numbers
/// 3. Print the final PDF
/// 4. Resolve remaining pages, inject bookmarks, clear header/footer bands
///
/// Failures in step 4 are logged and leave the printed PDF as is.
#[instrument(skip_all, fields(files = files.len(), output = %output.display()))]
pub async fn export_pdf<R>(
    files: &[SourceFile],
    formatting: &FormattingOptions,
    export: &ExportOptions,
    output: &Path,
    renderer: &R,
    progress: &dyn ProgressReporter,
    cancel: &CancelSignal,
) -> Result<ExportResult>
where
    R: PageRenderer + ?Sized,
{
    check_output_path(output)?;
    let start = Instant::now();
    info!("starting export");

    // --- Phase 1: Assemble ---
    progress.phase("Assembling document");
    let mut assembler = DocumentAssembler::new();
    let document = assembler.build(files, formatting, cancel)?;
    let mut headings = document.headings;
    let mut html = document.html;
    let layout = PageLayout::from(export);

    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| MdPressError::io(parent, e))?;
    }

    // --- Phase 2: Draft pass for TOC page numbers ---
    if html.contains(&format!("id=\"{TREE_TOC_ID}\"")) && !headings.is_empty() {
        progress.phase("Printing draft for page numbers");
        let draft = draft_path(output);
        let outcome = render_draft(&html, &layout, &draft, renderer, &mut headings, cancel).await;
        if let Err(e) = std::fs::remove_file(&draft) {
            debug!(path = %draft.display(), error = %e, "draft not removed");
        }
        outcome?;
        html = fill_page_numbers(&html, &headings);
    }

    // --- Phase 3: Print ---
    progress.phase("Printing PDF");
    renderer.render(&html, &layout, output, cancel).await?;
    cancel.check()?;

    // --- Phase 4: Post-process ---
    progress.phase("Resolving heading pages");
    if let Err(e) = resolve_pages_at(output, &mut headings) {
        warn!(error = %e, "page resolution failed");
    }

    progress.phase("Adding bookmarks");
    let bookmarks = match inject_outline_at(output, &headings) {
        Ok(n) => n,
        Err(e) => {
            warn!(error = %e, "outline injection failed");
            0
        }
    };

    if export.show_page_numbers {
        progress.phase("Cleaning header and footer");
        if let Err(e) = redact_bands_at(output, redaction_bands(export)) {
            warn!(error = %e, "header/footer cleanup failed");
        }
    }

    let resolved = headings.iter().filter(|h| h.is_resolved()).count();
    let result = ExportResult {
        output_path: output.to_path_buf(),
        headings,
        resolved,
        bookmarks,
        elapsed: start.elapsed(),
    };

    info!(
        resolved,
        bookmarks,
        elapsed_ms = result.elapsed.as_millis() as u64,
        "export complete"
    );
    progress.done(&result);
    Ok(result)
}

/// Reject an export target that is not a `.pdf` file before doing any work.
pub fn check_output_path(output: &Path) -> Result<()> {
    match output.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("pdf") => Ok(()),
        _ => Err(MdPressError::validation(format!(
            "output '{}' must end in .pdf",
            output.display()
        ))),
    }
}

/// Bands printed by the browser that do not belong in the document: the
/// date/title header, the file URL on the left of every footer, and the
/// whole first footer when page 1 carries no number.
fn redaction_bands(export: &ExportOptions) -> BandRedaction {
    if !export.show_page_numbers {
        return BandRedaction::default();
    }
    BandRedaction {
        header_mm: Some(export.top_margin_mm),
        footer_text_mm: Some(export.bottom_margin_mm),
        first_footer_mm: (!export.show_page_number_on_first_page)
            .then_some(export.bottom_margin_mm),
    }
}

async fn render_draft<R>(
    html: &str,
    layout: &PageLayout,
    draft: &Path,
    renderer: &R,
    headings: &mut [PublicHeading],
    cancel: &CancelSignal,
) -> Result<()>
where
    R: PageRenderer + ?Sized,
{
    renderer.render(html, layout, draft, cancel).await?;
    cancel.check()?;
    match resolve_pages_at(draft, headings) {
        Ok(n) => debug!(resolved = n, "draft pages resolved"),
        Err(e) => warn!(error = %e, "draft page resolution failed"),
    }
    Ok(())
}

fn draft_path(output: &Path) -> PathBuf {
    let stem = output
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "export".into());
    std::env::temp_dir().join(format!("{stem}.{}.draft.pdf", uuid::Uuid::now_v7()))
}
