//! Post-processing of rendered PDFs for mdpress.
//!
//! Resolves heading page numbers from extracted page text, injects a
//! bookmark outline and clears the header/footer bands printed by the
//! browser. Everything goes through [`PaginatedArtifact`] so the algorithms
//! can be exercised without a real PDF.

pub mod artifact;
pub mod outline;
pub mod redact;
pub mod resolver;

pub use artifact::{OutlineNodeId, PaginatedArtifact, PdfArtifact, Rect};
pub use outline::{inject_outline, inject_outline_at};
pub use redact::{
    BandRedaction, PAGE_NUMBER_SLOT_PT, clear_footer_on_first_page, clear_footer_text_on_all_pages,
    clear_header_on_all_pages, mm_to_pt, redact_bands_at,
};
pub use resolver::{normalize, resolve_pages, resolve_pages_at};
