//! Heading numbering and anchor synthesis.
//!
//! Scans the combined markdown for ATX headings, assigns hierarchical labels
//! (`1`, `2.1`, `B.3.`), derives a slug anchor for each heading and rewrites
//! the heading lines as `## 2.1 Title {#2-1-title}`.

use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, instrument};

use mdpress_shared::{FormattingOptions, HeadingDescriptor, PublicHeading};

/// Number of sub-level counters (H2..H6 plus one spare slot).
const COUNTER_SLOTS: usize = 6;

static HEADING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(#{1,6})\s+(.*)$").expect("valid regex"));

static NUMERIC_PREFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]+(\.[0-9]+)+\.?\s").expect("valid regex"));

static ALPHA_PREFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z]+(\.[A-Za-z]+)+\.?\s").expect("valid regex"));

static CLOSING_SEQUENCE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+#+\s*$").expect("valid regex"));

static PATTERN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([0-9]+|[A-Za-z]+)(\.([0-9]+|[A-Za-z]+))*\.?$").expect("valid regex")
});

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// Output of a numbering pass over the combined markdown.
#[derive(Debug, Clone)]
pub struct NumberingResult {
    /// Markdown with numbering and `{#anchor}` attributes injected.
    pub markdown: String,
    /// Every registered heading (level 1 included), in document order.
    pub headers: Vec<HeadingDescriptor>,
    /// Projection of `headers` without level-1 headings.
    pub headings: Vec<PublicHeading>,
}

/// How individual counters are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumberingStyle {
    Numeric,
    LowerAlpha,
    UpperAlpha,
}

/// A parsed numbering pattern such as `1.1.1` or `A.A.`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NumberingScheme {
    pub style: NumberingStyle,
    pub trailing_dot: bool,
}

impl NumberingScheme {
    /// Parse a pattern. Empty or malformed patterns yield `None`, which
    /// disables numbering instead of failing the build.
    pub fn parse(pattern: &str) -> Option<Self> {
        let pattern = pattern.trim();
        if !PATTERN_RE.is_match(pattern) {
            return None;
        }

        let first = pattern.trim_end_matches('.').chars().find(|c| *c != '.')?;
        let style = if first.is_ascii_digit() {
            NumberingStyle::Numeric
        } else if first.is_uppercase() {
            NumberingStyle::UpperAlpha
        } else {
            NumberingStyle::LowerAlpha
        };

        Some(Self {
            style,
            trailing_dot: pattern.ends_with('.'),
        })
    }

    fn render_counter(&self, value: u32) -> String {
        match self.style {
            NumberingStyle::Numeric => value.to_string(),
            NumberingStyle::LowerAlpha => to_alpha(value),
            NumberingStyle::UpperAlpha => to_alpha(value).to_uppercase(),
        }
    }
}

// ---------------------------------------------------------------------------
// Counter state
// ---------------------------------------------------------------------------

/// Per-build heading counters, one slot per sub-level.
#[derive(Debug, Clone, Default)]
pub struct HeadingCounters {
    slots: [u32; COUNTER_SLOTS],
}

impl HeadingCounters {
    /// Advance the counter of `logical_level` (1-based) and zero every deeper one.
    pub fn advance(&mut self, logical_level: u8) {
        let idx = usize::from(logical_level.clamp(1, COUNTER_SLOTS as u8)) - 1;
        self.slots[idx] += 1;
        for slot in &mut self.slots[idx + 1..] {
            *slot = 0;
        }
    }

    /// Zero every counter (a level-1 heading starts a new section).
    pub fn reset(&mut self) {
        self.slots = [0; COUNTER_SLOTS];
    }

    /// Render the label for `logical_level`. Stops at the first zero counter,
    /// so a heading that skips a level gets a truncated label.
    pub fn label(&self, logical_level: u8, scheme: &NumberingScheme) -> String {
        let depth = usize::from(logical_level).min(COUNTER_SLOTS);
        let parts: Vec<String> = self.slots[..depth]
            .iter()
            .take_while(|value| **value != 0)
            .map(|value| scheme.render_counter(*value))
            .collect();

        let core = parts.join(".");
        if scheme.trailing_dot && !core.is_empty() {
            format!("{core}.")
        } else {
            core
        }
    }
}

// ---------------------------------------------------------------------------
// Numbering pass
// ---------------------------------------------------------------------------

/// Number the headings of `markdown` and inject anchors.
///
/// `placeholder` is the TOC sentinel line. When the TOC goes after the first
/// file, headings above the placeholder are suppressed: they get an anchor but
/// no number, and are not registered.
#[instrument(skip_all, fields(len = markdown.len()))]
pub fn number_headings(
    markdown: &str,
    opts: &FormattingOptions,
    placeholder: &str,
) -> NumberingResult {
    let normalized = markdown.replace("\r\n", "\n");
    let mut lines: Vec<String> = normalized.split('\n').map(str::to_string).collect();

    let placeholder_index = lines.iter().position(|l| l == placeholder);
    let suppress_before = if opts.toc_after_first_file() {
        placeholder_index
    } else {
        None
    };

    let scheme = if opts.add_header_numbering {
        NumberingScheme::parse(&opts.header_numbering_pattern)
    } else {
        None
    };

    let mut counters = HeadingCounters::default();
    let mut headers: Vec<HeadingDescriptor> = Vec::new();
    let mut fence: Option<Fence> = None;

    for (i, line) in lines.iter_mut().enumerate() {
        if let Some(open) = fence {
            if open.is_closed_by(line) {
                fence = None;
            }
            continue;
        }
        if let Some(open) = Fence::opened_by(line) {
            fence = Some(open);
            continue;
        }
        if line == placeholder {
            continue;
        }

        let Some(caps) = HEADING_RE.captures(line) else {
            continue;
        };

        let markdown_level = caps[1].len() as u8;
        let raw_text = heading_text(&caps[2]);
        let suppressed = suppress_before.is_some_and(|p| i < p);
        let is_super = markdown_level == 1;
        let logical_level = if is_super { 0 } else { markdown_level - 1 };

        if !suppressed && !is_super && scheme.is_some() && looks_numbered(&raw_text) {
            let anchor = build_anchor(&raw_text, "");
            *line = rewrite_heading(markdown_level, "", &raw_text, &anchor);
            headers.push(HeadingDescriptor {
                markdown_level,
                logical_level,
                text: raw_text,
                numbering: String::new(),
                anchor,
            });
            continue;
        }

        let mut numbering = String::new();
        if !suppressed {
            if is_super {
                counters.reset();
            } else if let Some(scheme) = &scheme {
                counters.advance(logical_level);
                numbering = counters.label(logical_level, scheme);
            }
        }

        let anchor = build_anchor(&raw_text, &numbering);
        *line = rewrite_heading(markdown_level, &numbering, &raw_text, &anchor);

        if !suppressed {
            headers.push(HeadingDescriptor {
                markdown_level,
                logical_level,
                text: raw_text,
                numbering,
                anchor,
            });
        }
    }

    let headings: Vec<PublicHeading> = headers
        .iter()
        .filter(|h| !h.is_super_heading())
        .map(HeadingDescriptor::to_public)
        .collect();

    debug!(
        registered = headers.len(),
        public = headings.len(),
        numbered = scheme.is_some(),
        "heading numbering complete"
    );

    NumberingResult {
        markdown: lines.join("\n"),
        headers,
        headings,
    }
}

// ---------------------------------------------------------------------------
// Anchors
// ---------------------------------------------------------------------------

/// Slugify heading text: lowercase, drop punctuation, hyphenate whitespace.
pub fn slugify(text: &str) -> String {
    static NON_WORD_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"[^\w\s-]").expect("valid regex"));
    static WHITESPACE_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));
    static HYPHENS_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"-{2,}").expect("valid regex"));

    let lower = text.to_lowercase();
    let stripped = NON_WORD_RE.replace_all(&lower, "");
    let hyphenated = WHITESPACE_RE.replace_all(&stripped, "-");
    let collapsed = HYPHENS_RE.replace_all(&hyphenated, "-");
    collapsed.trim_matches('-').to_string()
}

/// Build the anchor for a heading: `2-1-title` for numbering `2.1.`.
pub fn build_anchor(text: &str, numbering: &str) -> String {
    let number_part = numbering.trim_end_matches('.').replace('.', "-");
    let slug = slugify(text);

    let anchor = match (number_part.is_empty(), slug.is_empty()) {
        (true, _) => slug,
        (false, true) => number_part,
        (false, false) => format!("{number_part}-{slug}"),
    };
    anchor.trim_matches('-').to_string()
}

/// Bijective base-26 lowercase label: 1 → `a`, 26 → `z`, 27 → `aa`.
pub fn to_alpha(n: u32) -> String {
    let mut out = Vec::new();
    let mut num = n;
    while num > 0 {
        num -= 1;
        out.push(b'a' + (num % 26) as u8);
        num /= 26;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Whether heading text already starts with `1.2 ` or `A.b. ` style numbering.
fn looks_numbered(text: &str) -> bool {
    NUMERIC_PREFIX_RE.is_match(text) || ALPHA_PREFIX_RE.is_match(text)
}

/// Heading text without the optional closing `#` sequence.
fn heading_text(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.chars().all(|c| c == '#') {
        return String::new();
    }
    CLOSING_SEQUENCE_RE.replace(trimmed, "").trim().to_string()
}

/// An open code fence: its marker character and run length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Fence {
    marker: char,
    len: usize,
}

impl Fence {
    /// A line of three or more backticks or tildes. The info string of a
    /// backtick fence may not contain a backtick, so ```` ```x``` ```` is inline code.
    fn opened_by(line: &str) -> Option<Self> {
        let trimmed = line.trim_start();
        let marker = trimmed.chars().next().filter(|c| matches!(c, '`' | '~'))?;
        let len = marker_run(trimmed, marker);
        if len < 3 || (marker == '`' && trimmed[len..].contains('`')) {
            return None;
        }
        Some(Self { marker, len })
    }

    /// Closed by a run of the same marker at least as long, with nothing after it.
    fn is_closed_by(&self, line: &str) -> bool {
        let trimmed = line.trim_start();
        let len = marker_run(trimmed, self.marker);
        len >= self.len && trimmed[len..].trim().is_empty()
    }
}

/// Length in bytes of the leading run of an ASCII `marker`.
fn marker_run(text: &str, marker: char) -> usize {
    text.chars().take_while(|c| *c == marker).count()
}

fn rewrite_heading(level: u8, numbering: &str, text: &str, anchor: &str) -> String {
    let hashes = "#".repeat(usize::from(level));
    let mut out = hashes;
    if !numbering.is_empty() {
        out.push(' ');
        out.push_str(numbering);
    }
    if !text.is_empty() {
        out.push(' ');
        out.push_str(text);
    }
    if !anchor.is_empty() {
        out.push_str(" {#");
        out.push_str(anchor);
        out.push('}');
    }
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const PLACEHOLDER: &str = "<!--__TOC_PLACEHOLDER__-->";

    fn numbered(pattern: &str) -> FormattingOptions {
        FormattingOptions {
            add_header_numbering: true,
            header_numbering_pattern: pattern.into(),
            ..Default::default()
        }
    }

    fn numbering_of(result: &NumberingResult) -> Vec<&str> {
        result.headers.iter().map(|h| h.numbering.as_str()).collect()
    }

    #[test]
    fn sibling_and_child_counters() {
        let md = "## A\n## B\n### C\n## D";
        let result = number_headings(md, &numbered("1.1.1"), PLACEHOLDER);
        assert_eq!(numbering_of(&result), vec!["1", "2", "2.1", "3"]);
    }

    #[test]
    fn rewrites_heading_lines_with_anchor() {
        let md = "## Getting Started\ntext\n### Install it!";
        let result = number_headings(md, &numbered("1.1"), PLACEHOLDER);
        let lines: Vec<&str> = result.markdown.lines().collect();
        assert_eq!(lines[0], "## 1 Getting Started {#1-getting-started}");
        assert_eq!(lines[1], "text");
        assert_eq!(lines[2], "### 1.1 Install it! {#1-1-install-it}");
    }

    #[test]
    fn upper_alpha_wraps_after_z() {
        let md = (0..27).map(|i| format!("## H{i}")).collect::<Vec<_>>().join("\n");
        let result = number_headings(&md, &numbered("A.A.A"), PLACEHOLDER);
        assert_eq!(result.headers[2].numbering, "C");
        assert_eq!(result.headers[25].numbering, "Z");
        assert_eq!(result.headers[26].numbering, "AA");
    }

    #[test]
    fn lower_alpha_with_trailing_dot() {
        let md = "## One\n### Two\n### Three";
        let result = number_headings(md, &numbered("a.a."), PLACEHOLDER);
        assert_eq!(numbering_of(&result), vec!["a.", "a.a.", "a.b."]);
        assert_eq!(result.headers[2].anchor, "a-b-three");
    }

    #[test]
    fn level_one_resets_counters_and_is_not_public() {
        let md = "# Part I\n## Intro\n## Body\n# Part II\n## Intro";
        let result = number_headings(md, &numbered("1.1"), PLACEHOLDER);
        assert_eq!(numbering_of(&result), vec!["", "1", "2", "", "1"]);
        assert_eq!(result.headings.len(), 3);
        assert!(result.headings.iter().all(|h| h.level == 1));
        assert_eq!(result.headers[0].anchor, "part-i");
    }

    #[test]
    fn skipped_level_truncates_label() {
        let md = "## Top\n#### Deep";
        let result = number_headings(md, &numbered("1.1.1"), PLACEHOLDER);
        assert_eq!(numbering_of(&result), vec!["1", "1"]);
        assert_eq!(result.headings[1].level, 3);
    }

    #[test]
    fn invalid_or_empty_pattern_disables_numbering() {
        for pattern in ["", "   ", "#.#", "1..1", "1-1"] {
            let result = number_headings("## A\n### B", &numbered(pattern), PLACEHOLDER);
            assert_eq!(numbering_of(&result), vec!["", ""], "pattern {pattern:?}");
            assert_eq!(result.headers[0].anchor, "a");
        }
    }

    #[test]
    fn numbering_disabled_still_anchors() {
        let opts = FormattingOptions::default();
        let result = number_headings("## Hello World", &opts, PLACEHOLDER);
        assert_eq!(result.markdown, "## Hello World {#hello-world}");
        assert_eq!(result.headings[0].label, "Hello World");
    }

    #[test]
    fn pre_numbered_headings_keep_their_text() {
        let md = "## 3.2 Existing\n## Fresh";
        let result = number_headings(md, &numbered("1.1"), PLACEHOLDER);
        assert_eq!(result.headers[0].numbering, "");
        assert_eq!(result.headers[0].anchor, "32-existing");
        assert_eq!(result.headers[1].numbering, "1");
        assert!(result.markdown.starts_with("## 3.2 Existing {#32-existing}"));
    }

    #[test]
    fn headings_before_placeholder_are_suppressed() {
        let opts = FormattingOptions {
            add_header_numbering: true,
            add_table_of_contents: true,
            table_of_contents_after_first_file: true,
            ..Default::default()
        };
        let md = format!("# Cover\n## Subtitle\n{PLACEHOLDER}\n## Intro\n### Scope");
        let result = number_headings(&md, &opts, PLACEHOLDER);

        assert_eq!(result.headers.len(), 2);
        assert_eq!(numbering_of(&result), vec!["1", "1.1"]);

        let lines: Vec<&str> = result.markdown.lines().collect();
        assert_eq!(lines[0], "# Cover {#cover}");
        assert_eq!(lines[1], "## Subtitle {#subtitle}");
        assert_eq!(lines[2], PLACEHOLDER);
    }

    #[test]
    fn placeholder_ignored_without_after_first_file() {
        let opts = FormattingOptions {
            add_header_numbering: true,
            add_table_of_contents: true,
            ..Default::default()
        };
        let md = format!("## Before\n{PLACEHOLDER}\n## After");
        let result = number_headings(&md, &opts, PLACEHOLDER);
        assert_eq!(numbering_of(&result), vec!["1", "2"]);
    }

    #[test]
    fn fenced_code_is_not_scanned() {
        let md = "## Real\n```bash\n# comment\n## not a heading\n```\n## Also real";
        let result = number_headings(md, &numbered("1"), PLACEHOLDER);
        assert_eq!(numbering_of(&result), vec!["1", "2"]);
        assert!(result.markdown.contains("\n# comment\n"));
    }

    #[test]
    fn inline_triple_backticks_do_not_open_a_fence() {
        let md = "## Before\nUse ```foo``` inline.\n```foo``` inline\n## After inline fence";
        let result = number_headings(md, &numbered("1"), PLACEHOLDER);
        assert_eq!(numbering_of(&result), vec!["1", "2"]);
        assert_eq!(result.headings[1].label, "2 After inline fence");
        assert!(result.markdown.ends_with("## 2 After inline fence {#2-after-inline-fence}"));
    }

    #[test]
    fn fence_closes_only_on_matching_run() {
        let md = "````md\n```\n## inside\n````\n~~~\n```\n## still inside\n~~~ \n## Outside";
        let result = number_headings(md, &numbered("1"), PLACEHOLDER);
        assert_eq!(numbering_of(&result), vec!["1"]);
        assert_eq!(result.headers[0].text, "Outside");
        assert!(result.markdown.contains("\n## inside\n"));
        assert!(result.markdown.contains("\n## still inside\n"));
    }

    #[test]
    fn closing_hashes_are_not_heading_text() {
        let md = "## Title ##\n### Sub #####   \n## C# tips\n## ##";
        let result = number_headings(md, &numbered("1.1"), PLACEHOLDER);
        let lines: Vec<&str> = result.markdown.lines().collect();
        assert_eq!(lines[0], "## 1 Title {#1-title}");
        assert_eq!(lines[1], "### 1.1 Sub {#1-1-sub}");
        assert_eq!(lines[2], "## 2 C# tips {#2-c-tips}");
        assert_eq!(lines[3], "## 3 {#3}");
        assert_eq!(result.headings[0].label, "1 Title");
        assert_eq!(result.headers[0].anchor, "1-title");
    }

    #[test]
    fn crlf_input_is_normalized() {
        let result = number_headings("## A\r\n## B\r\n", &numbered("1"), PLACEHOLDER);
        assert_eq!(result.markdown, "## 1 A {#1-a}\n## 2 B {#2-b}\n");
    }

    #[test]
    fn slugify_is_idempotent() {
        for text in ["Hello, World!", "  Spaces   and -- dashes ", "Ünïcode wörds", "a_b c"] {
            let once = slugify(text);
            assert_eq!(slugify(&once), once);
        }
        assert_eq!(slugify("Hello, World!"), "hello-world");
        assert_eq!(slugify("  Spaces   and -- dashes "), "spaces-and-dashes");
    }

    #[test]
    fn anchor_joins_numbering_and_slug() {
        assert_eq!(build_anchor("Intro", "2.3."), "2-3-intro");
        assert_eq!(build_anchor("Intro", ""), "intro");
        assert_eq!(build_anchor("!!!", "4"), "4");
    }

    #[test]
    fn alpha_conversion() {
        assert_eq!(to_alpha(1), "a");
        assert_eq!(to_alpha(26), "z");
        assert_eq!(to_alpha(27), "aa");
        assert_eq!(to_alpha(52), "az");
        assert_eq!(to_alpha(53), "ba");
        assert_eq!(to_alpha(0), "");
    }

    #[test]
    fn scheme_parsing() {
        let upper = NumberingScheme::parse("A.A.").unwrap();
        assert_eq!(upper.style, NumberingStyle::UpperAlpha);
        assert!(upper.trailing_dot);

        let numeric = NumberingScheme::parse(" 1.1.1 ").unwrap();
        assert_eq!(numeric.style, NumberingStyle::Numeric);
        assert!(!numeric.trailing_dot);

        assert!(NumberingScheme::parse(".").is_none());
    }

    #[test]
    fn numbering_is_deterministic() {
        let md = "# T\n## A\n### B\n## C\n### D\n#### E";
        let opts = numbered("1.1.1");
        let first = number_headings(md, &opts, PLACEHOLDER);
        let second = number_headings(md, &opts, PLACEHOLDER);
        assert_eq!(first.markdown, second.markdown);
        assert_eq!(first.headers, second.headers);
    }
}
