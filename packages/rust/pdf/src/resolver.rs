//! Find the page each heading landed on after rendering.
//!
//! Headings with the same normalized label form a group. Pages are scanned
//! from last to first and every occurrence of a label on a page is handed to
//! the latest still-unassigned member of its group. Scanning backwards means
//! repeated labels land in document order and a TOC page near the front
//! never steals an assignment from the body.

use std::collections::HashMap;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, instrument, warn};

use mdpress_shared::{PublicHeading, Result};

use crate::artifact::{PaginatedArtifact, PdfArtifact};

/// Labels longer than this also match on a prefix, since long headings
/// are often wrapped or hyphenated by the renderer.
const RELAXED_MATCH_THRESHOLD: usize = 60;
const RELAXED_PREFIX_LEN: usize = 50;

static WHITESPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Lowercase, collapse whitespace runs to one space, trim.
pub fn normalize(text: &str) -> String {
    WHITESPACE_RE
        .replace_all(&text.to_lowercase(), " ")
        .trim()
        .to_string()
}

struct HeadingGroup {
    key: String,
    relaxed: Option<String>,
    /// Heading indices in document order.
    members: Vec<usize>,
    /// Number of members still waiting for a page.
    remaining: usize,
}

impl HeadingGroup {
    fn occurrences(&self, page_text: &str) -> usize {
        let exact = page_text.matches(self.key.as_str()).count();
        match (&self.relaxed, exact) {
            (Some(prefix), 0) => page_text.matches(prefix.as_str()).count(),
            _ => exact,
        }
    }
}

/// Fill `page` (1-based) for every heading still at 0. Returns how many
/// headings were resolved by this call.
///
/// Does not read the artifact at all when nothing is pending.
#[instrument(skip_all, fields(headings = headings.len()))]
pub fn resolve_pages<A>(artifact: &A, headings: &mut [PublicHeading]) -> Result<usize>
where
    A: PaginatedArtifact + ?Sized,
{
    let mut groups: Vec<HeadingGroup> = Vec::new();
    let mut by_key: HashMap<String, usize> = HashMap::new();

    for (index, heading) in headings.iter().enumerate() {
        if heading.is_resolved() {
            continue;
        }
        let key = normalize(&heading.label);
        if key.is_empty() {
            continue;
        }
        let slot = *by_key.entry(key.clone()).or_insert_with(|| {
            let relaxed = (key.chars().count() > RELAXED_MATCH_THRESHOLD)
                .then(|| key.chars().take(RELAXED_PREFIX_LEN).collect());
            groups.push(HeadingGroup {
                key,
                relaxed,
                members: Vec::new(),
                remaining: 0,
            });
            groups.len() - 1
        });
        groups[slot].members.push(index);
        groups[slot].remaining += 1;
    }

    if groups.is_empty() {
        return Ok(0);
    }

    let mut resolved = 0usize;
    for page_index in (0..artifact.page_count()).rev() {
        let text = match artifact.page_text(page_index) {
            Ok(text) => normalize(&text),
            Err(e) => {
                warn!(page = page_index + 1, error = %e, "skipping unreadable page");
                continue;
            }
        };
        let page_number = page_index as u32 + 1;

        for group in groups.iter_mut().filter(|g| g.remaining > 0) {
            let hits = group.occurrences(&text).min(group.remaining);
            for _ in 0..hits {
                group.remaining -= 1;
                headings[group.members[group.remaining]].page = page_number;
                resolved += 1;
            }
        }

        groups.retain(|g| g.remaining > 0);
        if groups.is_empty() {
            break;
        }
    }

    debug!(resolved, unresolved = groups.iter().map(|g| g.remaining).sum::<usize>(), "pages resolved");
    Ok(resolved)
}

/// Open the PDF at `path` and resolve pending headings against it.
pub fn resolve_pages_at(path: &Path, headings: &mut [PublicHeading]) -> Result<usize> {
    if headings.iter().all(PublicHeading::is_resolved) {
        return Ok(0);
    }
    let artifact = PdfArtifact::open(path)?;
    resolve_pages(&artifact, headings)
}
