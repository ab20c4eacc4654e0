//! Core pipeline orchestration for mdpress.
//!
//! This crate ties together markdown assembly, browser rendering and PDF
//! post-processing into end-to-end workflows (e.g., `export_pdf`).

pub mod assembler;
pub mod cancel;
pub mod export;
pub mod render;

pub use assembler::{AssembledDocument, DocumentAssembler, combine_sources};
pub use cancel::CancelSignal;
pub use export::{ExportResult, ProgressReporter, SilentProgress, check_output_path, export_pdf};
pub use render::{ChromiumRenderer, PageLayout, PageRenderer, page_css, with_page_css};
