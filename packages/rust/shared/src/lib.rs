//! Shared types, error model, and configuration for mdpress.
//!
//! This crate is the foundation depended on by all other mdpress crates.
//! It provides:
//! - [`MdPressError`], the unified error type
//! - Domain types ([`HeadingDescriptor`], [`PublicHeading`], [`SourceFile`])
//! - Configuration ([`AppConfig`], [`FormattingOptions`], [`ExportOptions`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, DEFAULT_NUMBERING_PATTERN, DEFAULT_TOC_HEADER, ExportOptions, FormattingOptions,
    PaperFormat, TextAlignment, TocBulletStyle, TocLayout, TocLeader, config_dir, config_file_path,
    init_config, load_config, load_config_from,
};
pub use error::{MdPressError, Result};
pub use types::{HeadingDescriptor, PublicHeading, SourceFile};
