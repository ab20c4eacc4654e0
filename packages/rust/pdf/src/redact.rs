//! Paint over header and footer bands the browser prints by default.

use std::path::Path;

use tracing::{debug, instrument};

use mdpress_shared::Result;

use crate::artifact::{PaginatedArtifact, PdfArtifact, Rect};

/// Width kept at the right of each footer, where the browser prints `N/M`.
pub const PAGE_NUMBER_SLOT_PT: f64 = 72.0;

pub fn mm_to_pt(mm: f64) -> f64 {
    mm * 72.0 / 25.4
}

/// White out a full-width band of `height_mm` at the bottom of page 1.
pub fn clear_footer_on_first_page<A>(artifact: &mut A, height_mm: f64) -> Result<()>
where
    A: PaginatedArtifact + ?Sized,
{
    if artifact.page_count() == 0 || height_mm <= 0.0 {
        return Ok(());
    }
    let (width, height) = artifact.page_size(0)?;
    let band = mm_to_pt(height_mm).min(height);
    artifact.draw_opaque_rect(
        0,
        Rect {
            x: 0.0,
            y: height - band,
            width,
            height: band,
        },
    )
}

/// White out the footer band of every page except its right-hand page number
/// slot. This removes the document URL the browser prints on the left.
pub fn clear_footer_text_on_all_pages<A>(artifact: &mut A, height_mm: f64) -> Result<()>
where
    A: PaginatedArtifact + ?Sized,
{
    if height_mm <= 0.0 {
        return Ok(());
    }
    for index in 0..artifact.page_count() {
        let (width, height) = artifact.page_size(index)?;
        let band = mm_to_pt(height_mm).min(height);
        let cleared = width - PAGE_NUMBER_SLOT_PT;
        if cleared <= 0.0 {
            continue;
        }
        artifact.draw_opaque_rect(
            index,
            Rect {
                x: 0.0,
                y: height - band,
                width: cleared,
                height: band,
            },
        )?;
    }
    Ok(())
}

/// White out a full-width band of `height_mm` at the top of every page.
pub fn clear_header_on_all_pages<A>(artifact: &mut A, height_mm: f64) -> Result<()>
where
    A: PaginatedArtifact + ?Sized,
{
    if height_mm <= 0.0 {
        return Ok(());
    }
    for index in 0..artifact.page_count() {
        let (width, height) = artifact.page_size(index)?;
        artifact.draw_opaque_rect(
            index,
            Rect {
                x: 0.0,
                y: 0.0,
                width,
                height: mm_to_pt(height_mm).min(height),
            },
        )?;
    }
    Ok(())
}

/// Bands to clear after printing.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BandRedaction {
    /// Header band height on every page.
    pub header_mm: Option<f64>,
    /// Footer band height on every page, page number slot excluded.
    pub footer_text_mm: Option<f64>,
    /// Footer band height on the first page, cleared in full.
    pub first_footer_mm: Option<f64>,
}

impl BandRedaction {
    pub fn is_empty(&self) -> bool {
        self.header_mm.is_none() && self.footer_text_mm.is_none() && self.first_footer_mm.is_none()
    }
}

/// Open the PDF at `path`, apply the redaction and save it in place.
#[instrument(skip_all, fields(path = %path.display()))]
pub fn redact_bands_at(path: &Path, bands: BandRedaction) -> Result<()> {
    if bands.is_empty() {
        return Ok(());
    }
    let mut artifact = PdfArtifact::open(path)?;
    if let Some(mm) = bands.footer_text_mm {
        clear_footer_text_on_all_pages(&mut artifact, mm)?;
    }
    if let Some(mm) = bands.first_footer_mm {
        clear_footer_on_first_page(&mut artifact, mm)?;
    }
    if let Some(mm) = bands.header_mm {
        clear_header_on_all_pages(&mut artifact, mm)?;
    }
    artifact.save()?;
    debug!(?bands, "bands cleared");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeArtifact;

    #[test]
    fn inch_is_72_points() {
        assert!((mm_to_pt(25.4) - 72.0).abs() < 1e-9);
    }

    #[test]
    fn footer_band_sits_at_page_bottom() {
        let mut artifact = FakeArtifact::from_pages(&["a", "b"]);
        clear_footer_on_first_page(&mut artifact, 25.4).unwrap();

        assert_eq!(artifact.rects.len(), 1);
        let (page, rect) = artifact.rects[0];
        assert_eq!(page, 0);
        assert_eq!(rect.width, 612.0);
        assert!((rect.height - 72.0).abs() < 1e-9);
        assert!((rect.y - 720.0).abs() < 1e-9);
    }

    #[test]
    fn header_band_on_every_page() {
        let mut artifact = FakeArtifact::from_pages(&["a", "b", "c"]);
        clear_header_on_all_pages(&mut artifact, 10.0).unwrap();

        let pages: Vec<usize> = artifact.rects.iter().map(|(p, _)| *p).collect();
        assert_eq!(pages, vec![0, 1, 2]);
        assert!(artifact.rects.iter().all(|(_, r)| r.y == 0.0));
    }

    #[test]
    fn footer_text_band_spares_page_number_slot() {
        let mut artifact = FakeArtifact::from_pages(&["a", "b", "c"]);
        clear_footer_text_on_all_pages(&mut artifact, 25.4).unwrap();

        let pages: Vec<usize> = artifact.rects.iter().map(|(p, _)| *p).collect();
        assert_eq!(pages, vec![0, 1, 2]);
        for (_, rect) in &artifact.rects {
            assert_eq!(rect.x, 0.0);
            assert_eq!(rect.width, 612.0 - PAGE_NUMBER_SLOT_PT);
            assert!((rect.y - 720.0).abs() < 1e-9);
            assert!((rect.height - 72.0).abs() < 1e-9);
        }
    }

    #[test]
    fn zero_height_draws_nothing() {
        let mut artifact = FakeArtifact::from_pages(&["a"]);
        clear_header_on_all_pages(&mut artifact, 0.0).unwrap();
        clear_footer_text_on_all_pages(&mut artifact, 0.0).unwrap();
        clear_footer_on_first_page(&mut artifact, 0.0).unwrap();
        assert!(artifact.rects.is_empty());
    }

    #[test]
    fn redact_on_disk_pdf() {
        let path = std::env::temp_dir().join(format!("mdpress-redact-{}.pdf", uuid::Uuid::now_v7()));
        let mut doc = crate::testing::sample_pdf(&[&["one"], &["two"]]);
        doc.save(&path).unwrap();

        redact_bands_at(
            &path,
            BandRedaction {
                header_mm: Some(12.0),
                footer_text_mm: Some(12.0),
                first_footer_mm: Some(12.0),
            },
        )
        .unwrap();

        let reloaded = lopdf::Document::load(&path).unwrap();
        std::fs::remove_file(&path).ok();
        let pages = reloaded.get_pages();
        let contents_len = |page: u32| {
            let dict = reloaded.get_dictionary(pages[&page]).unwrap();
            dict.get(b"Contents").unwrap().as_array().unwrap().len()
        };
        // original plus a save wrapper and an overlay per band
        assert_eq!(contents_len(1), 7);
        assert_eq!(contents_len(2), 5);
        assert!(reloaded.extract_text(&[2]).unwrap().contains("two"));
    }
}
