//! Core domain types for mdpress documents.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// SourceFile
// ---------------------------------------------------------------------------

/// A markdown input file that has already been read into memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Display name (usually the file name), used in logs.
    pub name: String,
    /// Raw markdown content.
    pub content: String,
}

impl SourceFile {
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// HeadingDescriptor
// ---------------------------------------------------------------------------

/// One registered heading line of the combined markdown, in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadingDescriptor {
    /// Raw heading depth as written (number of `#`, 1–6).
    pub markdown_level: u8,
    /// 0 for level-1 headings, otherwise `markdown_level - 1`.
    pub logical_level: u8,
    /// Heading text, trimmed.
    pub text: String,
    /// Synthesized label such as `2.3` or `B.1.`; empty when not numbered.
    pub numbering: String,
    /// URL-fragment-safe identifier.
    pub anchor: String,
}

impl HeadingDescriptor {
    /// Level-1 headings anchor document sections and never enter the TOC.
    pub fn is_super_heading(&self) -> bool {
        self.markdown_level == 1
    }

    /// Numbering and text joined with a space, or just the text.
    pub fn label(&self) -> String {
        if self.numbering.is_empty() {
            self.text.clone()
        } else {
            format!("{} {}", self.numbering, self.text)
        }
    }

    /// Project into the externally consumed form (page unresolved).
    pub fn to_public(&self) -> PublicHeading {
        PublicHeading {
            level: self.logical_level,
            label: self.label(),
            anchor: self.anchor.clone(),
            page: 0,
        }
    }
}

// ---------------------------------------------------------------------------
// PublicHeading
// ---------------------------------------------------------------------------

/// A heading as seen by page resolution, outline injection and TOC rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicHeading {
    /// Logical level: H2 => 1, H3 => 2, etc.
    pub level: u8,
    /// Text as rendered in the document (numbering included).
    pub label: String,
    /// HTML id of the heading.
    pub anchor: String,
    /// 1-based page number, 0 while unresolved.
    #[serde(default)]
    pub page: u32,
}

impl PublicHeading {
    pub fn is_resolved(&self) -> bool {
        self.page > 0
    }

    /// Link target for this heading (`#anchor`).
    pub fn href(&self) -> String {
        format!("#{}", self.anchor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(level: u8, text: &str, numbering: &str, anchor: &str) -> HeadingDescriptor {
        HeadingDescriptor {
            markdown_level: level,
            logical_level: level.saturating_sub(1),
            text: text.into(),
            numbering: numbering.into(),
            anchor: anchor.into(),
        }
    }

    #[test]
    fn label_includes_numbering_when_present() {
        let numbered = descriptor(3, "Setup", "2.1", "2-1-setup");
        assert_eq!(numbered.label(), "2.1 Setup");

        let plain = descriptor(2, "Overview", "", "overview");
        assert_eq!(plain.label(), "Overview");
    }

    #[test]
    fn public_projection_starts_unresolved() {
        let heading = descriptor(2, "Intro", "1", "1-intro").to_public();
        assert_eq!(heading.level, 1);
        assert_eq!(heading.page, 0);
        assert!(!heading.is_resolved());
        assert_eq!(heading.href(), "#1-intro");
    }

    #[test]
    fn public_heading_json_defaults_page() {
        let heading: PublicHeading =
            serde_json::from_str(r#"{"level":1,"label":"Intro","anchor":"intro"}"#).unwrap();
        assert_eq!(heading.page, 0);
    }
}
