//! Application configuration for mdpress.
//!
//! User config lives at `~/.mdpress/mdpress.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{MdPressError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "mdpress.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".mdpress";

/// Numbering pattern used when none is configured.
pub const DEFAULT_NUMBERING_PATTERN: &str = "1.1.1";

/// TOC title used when the configured one is blank.
pub const DEFAULT_TOC_HEADER: &str = "Table of Contents";

// ---------------------------------------------------------------------------
// Config structs (matching mdpress.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Document assembly and styling.
    #[serde(default)]
    pub formatting: FormattingOptions,

    /// Page layout and PDF post-processing.
    #[serde(default)]
    pub export: ExportOptions,
}

/// `[formatting]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormattingOptions {
    /// Strikethrough, footnotes, task lists and definition lists.
    #[serde(default = "default_true")]
    pub use_advanced_extensions: bool,

    /// GitHub-style pipe tables.
    #[serde(default = "default_true")]
    pub use_pipe_tables: bool,

    /// Turn bare `http(s)://` URLs into links.
    #[serde(default = "default_true")]
    pub use_auto_links: bool,

    /// Insert a page break between consecutive input files.
    #[serde(default)]
    pub insert_page_breaks_between_files: bool,

    /// Prefix sub-headings with hierarchical numbers.
    #[serde(default)]
    pub add_header_numbering: bool,

    /// Numbering pattern, e.g. `1.1.1`, `A.A.A.` or `a.a`.
    #[serde(default = "default_numbering_pattern")]
    pub header_numbering_pattern: String,

    /// Generate a table of contents.
    #[serde(default)]
    pub add_table_of_contents: bool,

    /// Place the TOC after the first file (typically a cover page).
    #[serde(default)]
    pub table_of_contents_after_first_file: bool,

    /// Title shown above the TOC.
    #[serde(default = "default_toc_header")]
    pub toc_header_text: String,

    /// List marker for the flat TOC.
    #[serde(default)]
    pub toc_bullet_style: TocBulletStyle,

    /// Indent nested entries in the flat TOC.
    #[serde(default = "default_true")]
    pub indent_toc: bool,

    /// Flat markdown list or nested HTML tree with page numbers.
    #[serde(default)]
    pub toc_layout: TocLayout,

    /// Decoration between title and page number in the tree TOC.
    #[serde(default)]
    pub toc_leader: TocLeader,

    /// CSS font-family for the body.
    #[serde(default = "default_font_family")]
    pub base_font_family: String,

    /// Body font size in CSS pixels.
    #[serde(default = "default_font_size")]
    pub body_font_size_px: f64,

    /// Body margin in CSS pixels (page margins are set in `[export]`).
    #[serde(default)]
    pub body_margin_px: f64,

    /// Paragraph alignment.
    #[serde(default)]
    pub body_text_alignment: TextAlignment,

    /// Extra markup appended to `<head>`.
    #[serde(default)]
    pub additional_head_html: String,
}

impl Default for FormattingOptions {
    fn default() -> Self {
        Self {
            use_advanced_extensions: true,
            use_pipe_tables: true,
            use_auto_links: true,
            insert_page_breaks_between_files: false,
            add_header_numbering: false,
            header_numbering_pattern: default_numbering_pattern(),
            add_table_of_contents: false,
            table_of_contents_after_first_file: false,
            toc_header_text: default_toc_header(),
            toc_bullet_style: TocBulletStyle::default(),
            indent_toc: true,
            toc_layout: TocLayout::default(),
            toc_leader: TocLeader::default(),
            base_font_family: default_font_family(),
            body_font_size_px: default_font_size(),
            body_margin_px: 0.0,
            body_text_alignment: TextAlignment::default(),
            additional_head_html: String::new(),
        }
    }
}

impl FormattingOptions {
    /// TOC title, falling back to the default when blank.
    pub fn toc_header(&self) -> &str {
        let trimmed = self.toc_header_text.trim();
        if trimmed.is_empty() {
            DEFAULT_TOC_HEADER
        } else {
            trimmed
        }
    }

    /// Whether headings before the TOC placeholder are left out of numbering.
    pub fn toc_after_first_file(&self) -> bool {
        self.add_table_of_contents && self.table_of_contents_after_first_file
    }
}

fn default_true() -> bool {
    true
}
fn default_numbering_pattern() -> String {
    DEFAULT_NUMBERING_PATTERN.into()
}
fn default_toc_header() -> String {
    DEFAULT_TOC_HEADER.into()
}
fn default_font_family() -> String {
    "Segoe UI, sans-serif".into()
}
fn default_font_size() -> f64 {
    12.0
}

/// `[export]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportOptions {
    /// Paper size.
    #[serde(default)]
    pub paper_format: PaperFormat,

    /// Landscape orientation.
    #[serde(default)]
    pub landscape: bool,

    /// Print CSS backgrounds.
    #[serde(default = "default_true")]
    pub print_background: bool,

    /// Let the renderer print its header/footer with page numbers.
    #[serde(default = "default_true")]
    pub show_page_numbers: bool,

    /// Keep the page number on the first page (usually a cover).
    #[serde(default = "default_true")]
    pub show_page_number_on_first_page: bool,

    #[serde(default = "default_margin")]
    pub top_margin_mm: f64,
    #[serde(default = "default_margin")]
    pub right_margin_mm: f64,
    #[serde(default = "default_margin")]
    pub bottom_margin_mm: f64,
    #[serde(default = "default_margin")]
    pub left_margin_mm: f64,

    /// Explicit browser executable; searched on `PATH` when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub browser_path: Option<String>,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            paper_format: PaperFormat::default(),
            landscape: false,
            print_background: true,
            show_page_numbers: true,
            show_page_number_on_first_page: true,
            top_margin_mm: default_margin(),
            right_margin_mm: default_margin(),
            bottom_margin_mm: default_margin(),
            left_margin_mm: default_margin(),
            browser_path: None,
        }
    }
}

// Word-like one inch.
fn default_margin() -> f64 {
    25.4
}

// ---------------------------------------------------------------------------
// Option enums
// ---------------------------------------------------------------------------

/// List marker of the flat TOC.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TocBulletStyle {
    #[default]
    #[serde(rename = "-")]
    Bullet,
    #[serde(rename = "1.")]
    Numbered,
}

impl TocBulletStyle {
    pub fn marker(self) -> &'static str {
        match self {
            Self::Bullet => "-",
            Self::Numbered => "1.",
        }
    }
}

/// Shape of the generated TOC.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TocLayout {
    #[default]
    Flat,
    Tree,
}

impl FromStr for TocLayout {
    type Err = MdPressError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "flat" => Ok(Self::Flat),
            "tree" => Ok(Self::Tree),
            other => Err(MdPressError::parse(format!(
                "unknown TOC layout '{other}' (expected flat or tree)"
            ))),
        }
    }
}

/// Leader between a tree TOC title and its page number.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TocLeader {
    #[default]
    Dotted,
    None,
}

impl FromStr for TocLeader {
    type Err = MdPressError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dotted" | "dots" => Ok(Self::Dotted),
            "none" => Ok(Self::None),
            other => Err(MdPressError::parse(format!(
                "unknown TOC leader '{other}' (expected dotted or none)"
            ))),
        }
    }
}

/// Paragraph alignment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAlignment {
    Left,
    Center,
    Right,
    #[default]
    Justify,
}

/// Supported paper sizes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaperFormat {
    A3,
    #[default]
    A4,
    Letter,
}

impl PaperFormat {
    /// Name understood by CSS `@page { size: ... }`.
    pub fn css_name(self) -> &'static str {
        match self {
            Self::A3 => "A3",
            Self::A4 => "A4",
            Self::Letter => "letter",
        }
    }
}

impl FromStr for PaperFormat {
    type Err = MdPressError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "A3" => Ok(Self::A3),
            "A4" => Ok(Self::A4),
            "LETTER" => Ok(Self::Letter),
            other => Err(MdPressError::parse(format!(
                "unknown paper format '{other}' (expected A3, A4 or Letter)"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.mdpress/`).
pub fn config_dir() -> Result<PathBuf> {
    let home =
        dirs::home_dir().ok_or_else(|| MdPressError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.mdpress/mdpress.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| MdPressError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| MdPressError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| MdPressError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| MdPressError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| MdPressError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}
