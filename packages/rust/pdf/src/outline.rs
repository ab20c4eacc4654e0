//! Bookmark (outline) injection from resolved headings.

use std::path::Path;

use tracing::{debug, instrument, warn};

use mdpress_shared::{PublicHeading, Result};

use crate::artifact::{OutlineNodeId, PaginatedArtifact, PdfArtifact};

/// Initial size of the per-level parent table.
const MIN_PARENT_SLOTS: usize = 16;

/// Add one bookmark per resolved heading, nested by logical level.
///
/// Levels 0 and 1 go to the root. A deeper heading hangs under the last
/// bookmark recorded one level up, or the root when there is none. The
/// parent table is never rolled back, so a heading may attach to a stale
/// parent from an earlier branch. Returns the number of bookmarks written.
#[instrument(skip_all, fields(headings = headings.len()))]
pub fn inject_outline<A>(artifact: &mut A, headings: &[PublicHeading]) -> Result<usize>
where
    A: PaginatedArtifact + ?Sized,
{
    let page_count = artifact.page_count();
    let mut parents: Vec<Option<OutlineNodeId>> = vec![None; MIN_PARENT_SLOTS];
    let mut written = 0usize;

    for heading in headings {
        if !heading.is_resolved() {
            continue;
        }
        let page_index = heading.page as usize - 1;
        if page_index >= page_count {
            warn!(
                label = %heading.label,
                page = heading.page,
                page_count,
                "heading page beyond document, skipping bookmark"
            );
            continue;
        }

        let level = usize::from(heading.level);
        if level >= parents.len() {
            parents.resize(level + 1, None);
        }
        let parent = if level <= 1 { None } else { parents[level - 1] };

        let node = artifact.add_outline_entry(parent, &heading.label, page_index)?;
        parents[level] = Some(node);
        written += 1;
    }

    debug!(written, "outline injected");
    Ok(written)
}

/// Open the PDF at `path`, inject bookmarks and save it in place.
pub fn inject_outline_at(path: &Path, headings: &[PublicHeading]) -> Result<usize> {
    if !headings.iter().any(PublicHeading::is_resolved) {
        return Ok(0);
    }
    let mut artifact = PdfArtifact::open(path)?;
    let written = inject_outline(&mut artifact, headings)?;
    artifact.save()?;
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeArtifact, heading_on};

    #[test]
    fn nests_by_level() {
        let mut artifact = FakeArtifact::from_pages(&["a", "b", "c", "d"]);
        let headings = vec![
            heading_on(0, "Part", 1),
            heading_on(1, "1 Intro", 1),
            heading_on(2, "1.1 Scope", 2),
            heading_on(3, "1.1.1 Detail", 2),
            heading_on(1, "2 Usage", 3),
            heading_on(2, "2.1 Install", 4),
        ];

        let written = inject_outline(&mut artifact, &headings).unwrap();

        assert_eq!(written, 6);
        let parents: Vec<Option<usize>> = artifact.outline.iter().map(|e| e.parent).collect();
        assert_eq!(
            parents,
            vec![None, None, Some(1), Some(2), None, Some(4)]
        );
        assert_eq!(artifact.outline[5].page_index, 3);
    }

    #[test]
    fn unresolved_and_out_of_range_are_skipped() {
        let mut artifact = FakeArtifact::from_pages(&["a", "b"]);
        let headings = vec![
            heading_on(1, "Zero", 0),
            heading_on(1, "Beyond", 9),
            heading_on(1, "Kept", 2),
        ];

        assert_eq!(inject_outline(&mut artifact, &headings).unwrap(), 1);
        assert_eq!(artifact.outline[0].title, "Kept");
    }

    #[test]
    fn orphans_are_promoted_to_root() {
        let mut artifact = FakeArtifact::from_pages(&["a"]);
        let headings = vec![heading_on(3, "Deep", 1), heading_on(4, "Deeper", 1)];

        inject_outline(&mut artifact, &headings).unwrap();

        assert_eq!(artifact.outline[0].parent, None);
        assert_eq!(artifact.outline[1].parent, Some(0));
    }

    #[test]
    fn stale_parents_are_not_rolled_back() {
        let mut artifact = FakeArtifact::from_pages(&["a", "b"]);
        let headings = vec![
            heading_on(1, "1 A", 1),
            heading_on(2, "1.1 B", 1),
            heading_on(1, "2 C", 2),
            heading_on(3, "x", 2),
        ];

        inject_outline(&mut artifact, &headings).unwrap();

        // The level-3 heading attaches to "1.1 B", the last level-2 entry seen.
        assert_eq!(artifact.outline[3].parent, Some(1));
    }

    #[test]
    fn levels_beyond_initial_table_grow_it() {
        let mut artifact = FakeArtifact::from_pages(&["a"]);
        let headings = vec![heading_on(20, "deep", 1), heading_on(21, "deeper", 1)];

        assert_eq!(inject_outline(&mut artifact, &headings).unwrap(), 2);
        assert_eq!(artifact.outline[1].parent, Some(0));
    }

    #[test]
    fn nothing_resolved_skips_opening() {
        let headings = vec![heading_on(1, "x", 0)];
        let n = inject_outline_at(Path::new("/nonexistent/mdpress.pdf"), &headings).unwrap();
        assert_eq!(n, 0);
    }
}
