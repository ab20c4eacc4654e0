//! Paginated-artifact access on top of `lopdf`.
//!
//! [`PaginatedArtifact`] is the narrow surface the resolver, the outline
//! injector and the redaction passes need. [`PdfArtifact`] implements it for
//! PDF files on disk.

use std::path::{Path, PathBuf};

use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, StringFormat, dictionary};
use tracing::{debug, instrument};

use mdpress_shared::{MdPressError, Result};

/// Letter size, used when a page has no readable `MediaBox`.
const FALLBACK_PAGE_SIZE: (f64, f64) = (612.0, 792.0);

/// Handle of an outline entry created through [`PaginatedArtifact::add_outline_entry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OutlineNodeId(pub usize);

/// Rectangle in PDF points, measured from the top-left corner of the page.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Operations the heading pipeline needs from a rendered, paginated document.
///
/// Page indices are 0-based.
pub trait PaginatedArtifact {
    fn page_count(&self) -> usize;

    /// Extracted text of one page.
    fn page_text(&self, index: usize) -> Result<String>;

    /// `(width, height)` of one page in points.
    fn page_size(&self, index: usize) -> Result<(f64, f64)>;

    /// Add a bookmark under `parent` (or at the root) pointing at a page.
    fn add_outline_entry(
        &mut self,
        parent: Option<OutlineNodeId>,
        title: &str,
        page_index: usize,
    ) -> Result<OutlineNodeId>;

    /// Paint an opaque white rectangle over a page.
    fn draw_opaque_rect(&mut self, page_index: usize, rect: Rect) -> Result<()>;

    /// Persist all pending changes.
    fn save(&mut self) -> Result<()>;
}

/// An outline entry waiting to be written on save.
#[derive(Debug, Clone)]
struct PendingOutline {
    title: String,
    page_index: usize,
    parent: Option<usize>,
}

/// A PDF opened for reading and in-place modification.
pub struct PdfArtifact {
    path: PathBuf,
    doc: Document,
    page_ids: Vec<ObjectId>,
    outline: Vec<PendingOutline>,
}

impl PdfArtifact {
    /// Open a PDF file. Changes are written back to the same path by `save`.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let doc = Document::load(path)
            .map_err(|e| MdPressError::Pdf(format!("failed to open {}: {e}", path.display())))?;
        let artifact = Self::from_document(doc, path);
        debug!(pages = artifact.page_ids.len(), "pdf opened");
        Ok(artifact)
    }

    /// Wrap an in-memory document that will be saved to `path`.
    pub fn from_document(doc: Document, path: impl Into<PathBuf>) -> Self {
        // `get_pages` is keyed by 1-based page number, so values come out in order.
        let page_ids = doc.get_pages().into_values().collect();
        Self {
            path: path.into(),
            doc,
            page_ids,
            outline: Vec::new(),
        }
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }

    fn page_id(&self, index: usize) -> Result<ObjectId> {
        self.page_ids.get(index).copied().ok_or_else(|| {
            MdPressError::Pdf(format!(
                "page index {index} out of range ({} pages)",
                self.page_ids.len()
            ))
        })
    }

    /// Look up the `MediaBox` of a page, following inherited `Parent` entries.
    fn media_box(&self, page_id: ObjectId) -> Option<[f64; 4]> {
        let mut current = Some(page_id);
        let mut hops = 0;

        while let Some(id) = current {
            let dict = self.doc.get_dictionary(id).ok()?;
            if let Ok(obj) = dict.get(b"MediaBox") {
                let array = match obj {
                    Object::Reference(r) => self.doc.get_object(*r).ok()?.as_array().ok()?,
                    other => other.as_array().ok()?,
                };
                if array.len() != 4 {
                    return None;
                }
                let mut values = [0.0; 4];
                for (slot, value) in values.iter_mut().zip(array) {
                    *slot = f64::from(value.as_float().ok()?);
                }
                return Some(values);
            }

            hops += 1;
            if hops > 32 {
                return None;
            }
            current = dict.get(b"Parent").and_then(Object::as_reference).ok();
        }
        None
    }

    /// Append a content stream to a page so it is drawn over the existing content.
    ///
    /// The original content is wrapped in `q`/`Q` so its graphics state cannot
    /// leak into the overlay.
    fn overlay_content(&mut self, page_id: ObjectId, content: Vec<u8>) -> Result<()> {
        let save_id = self
            .doc
            .add_object(Stream::new(dictionary! {}, b"q\n".to_vec()));
        let overlay_id = self.doc.add_object(Stream::new(dictionary! {}, content));

        let mut contents = self.content_streams(page_id)?;
        let page = self
            .doc
            .get_object_mut(page_id)
            .and_then(Object::as_dict_mut)
            .map_err(|e| MdPressError::Pdf(format!("page {page_id:?} is not a dictionary: {e}")))?;

        contents.insert(0, Object::Reference(save_id));
        contents.push(Object::Reference(overlay_id));
        page.set("Contents", Object::Array(contents));

        Ok(())
    }

    /// The page's `/Contents` as a flat list of stream references. An indirect
    /// array is spliced in, so wrapping never nests arrays.
    fn content_streams(&self, page_id: ObjectId) -> Result<Vec<Object>> {
        let page = self
            .doc
            .get_dictionary(page_id)
            .map_err(|e| MdPressError::Pdf(format!("page {page_id:?} is not a dictionary: {e}")))?;

        Ok(match page.get(b"Contents") {
            Ok(Object::Array(items)) => items.clone(),
            Ok(Object::Reference(id)) => match self.doc.get_object(*id) {
                Ok(Object::Array(items)) => items.clone(),
                _ => vec![Object::Reference(*id)],
            },
            Ok(other) => vec![other.clone()],
            Err(_) => Vec::new(),
        })
    }

    /// Materialize pending outline entries as the document's `/Outlines` tree.
    fn write_outline(&mut self) -> Result<()> {
        if self.outline.is_empty() {
            return Ok(());
        }

        let entries = std::mem::take(&mut self.outline);
        let ids: Vec<ObjectId> = entries.iter().map(|_| self.doc.new_object_id()).collect();
        let root_id = self.doc.new_object_id();

        let mut children: Vec<Vec<usize>> = vec![Vec::new(); entries.len()];
        let mut roots: Vec<usize> = Vec::new();
        for (i, entry) in entries.iter().enumerate() {
            match entry.parent {
                Some(p) => children[p].push(i),
                None => roots.push(i),
            }
        }

        // Parents always precede their children, so a reverse sweep sees
        // every child's total before its parent's.
        let mut descendants = vec![0i64; entries.len()];
        for i in (0..entries.len()).rev() {
            descendants[i] = children[i].iter().map(|c| 1 + descendants[*c]).sum();
        }

        let mut groups: Vec<(ObjectId, &[usize])> = vec![(root_id, roots.as_slice())];
        groups.extend(
            children
                .iter()
                .enumerate()
                .filter(|(_, kids)| !kids.is_empty())
                .map(|(i, kids)| (ids[i], kids.as_slice())),
        );

        for (parent_id, siblings) in groups {
            for (pos, &i) in siblings.iter().enumerate() {
                let entry = &entries[i];
                let page_id = self.page_id(entry.page_index)?;
                let mut dict = Dictionary::new();
                dict.set("Title", pdf_text_string(&entry.title));
                dict.set("Parent", Object::Reference(parent_id));
                dict.set("Dest", vec![Object::Reference(page_id), "Fit".into()]);
                if pos > 0 {
                    dict.set("Prev", Object::Reference(ids[siblings[pos - 1]]));
                }
                if pos + 1 < siblings.len() {
                    dict.set("Next", Object::Reference(ids[siblings[pos + 1]]));
                }
                if let (Some(first), Some(last)) = (children[i].first(), children[i].last()) {
                    dict.set("First", Object::Reference(ids[*first]));
                    dict.set("Last", Object::Reference(ids[*last]));
                    dict.set("Count", descendants[i]);
                }
                self.doc.objects.insert(ids[i], Object::Dictionary(dict));
            }
        }

        let (Some(first), Some(last)) = (roots.first(), roots.last()) else {
            return Ok(());
        };
        self.doc.objects.insert(
            root_id,
            Object::Dictionary(dictionary! {
                "Type" => "Outlines",
                "First" => Object::Reference(ids[*first]),
                "Last" => Object::Reference(ids[*last]),
                "Count" => entries.len() as i64,
            }),
        );

        let catalog_id = self
            .doc
            .trailer
            .get(b"Root")
            .and_then(Object::as_reference)
            .map_err(|e| MdPressError::Pdf(format!("document has no catalog: {e}")))?;
        if let Ok(Object::Dictionary(catalog)) = self.doc.get_object_mut(catalog_id) {
            catalog.set("Outlines", Object::Reference(root_id));
            catalog.set("PageMode", "UseOutlines");
        }

        debug!(entries = entries.len(), roots = roots.len(), "outline written");
        Ok(())
    }
}

impl PaginatedArtifact for PdfArtifact {
    fn page_count(&self) -> usize {
        self.page_ids.len()
    }

    fn page_text(&self, index: usize) -> Result<String> {
        self.page_id(index)?;
        self.doc
            .extract_text(&[index as u32 + 1])
            .map_err(|e| MdPressError::Pdf(format!("text extraction failed on page {}: {e}", index + 1)))
    }

    fn page_size(&self, index: usize) -> Result<(f64, f64)> {
        let page_id = self.page_id(index)?;
        Ok(self
            .media_box(page_id)
            .map(|[x0, y0, x1, y1]| ((x1 - x0).abs(), (y1 - y0).abs()))
            .unwrap_or(FALLBACK_PAGE_SIZE))
    }

    fn add_outline_entry(
        &mut self,
        parent: Option<OutlineNodeId>,
        title: &str,
        page_index: usize,
    ) -> Result<OutlineNodeId> {
        self.page_id(page_index)?;
        if let Some(OutlineNodeId(p)) = parent {
            if p >= self.outline.len() {
                return Err(MdPressError::Pdf(format!("unknown outline parent {p}")));
            }
        }

        self.outline.push(PendingOutline {
            title: title.to_string(),
            page_index,
            parent: parent.map(|OutlineNodeId(p)| p),
        });
        Ok(OutlineNodeId(self.outline.len() - 1))
    }

    fn draw_opaque_rect(&mut self, page_index: usize, rect: Rect) -> Result<()> {
        let page_id = self.page_id(page_index)?;
        let (_, page_height) = self.page_size(page_index)?;
        let bottom = page_height - rect.y - rect.height;

        let content = Content {
            operations: vec![
                Operation::new("Q", vec![]),
                Operation::new("q", vec![]),
                Operation::new(
                    "rg",
                    vec![Object::Integer(1), Object::Integer(1), Object::Integer(1)],
                ),
                Operation::new(
                    "re",
                    vec![
                        (rect.x as f32).into(),
                        (bottom as f32).into(),
                        (rect.width as f32).into(),
                        (rect.height as f32).into(),
                    ],
                ),
                Operation::new("f", vec![]),
                Operation::new("Q", vec![]),
            ],
        };
        let bytes = content
            .encode()
            .map_err(|e| MdPressError::Pdf(format!("failed to encode overlay: {e}")))?;
        self.overlay_content(page_id, bytes)
    }

    fn save(&mut self) -> Result<()> {
        self.write_outline()?;
        self.doc
            .save(&self.path)
            .map_err(|e| MdPressError::Pdf(format!("failed to save {}: {e}", self.path.display())))?;
        debug!(path = %self.path.display(), "pdf saved");
        Ok(())
    }
}

/// Encode a title as a PDF text string: literal for ASCII, UTF-16BE otherwise.
fn pdf_text_string(text: &str) -> Object {
    if text.is_ascii() {
        return Object::string_literal(text);
    }
    let mut bytes = vec![0xFE, 0xFF];
    for unit in text.encode_utf16() {
        bytes.extend_from_slice(&unit.to_be_bytes());
    }
    Object::String(bytes, StringFormat::Hexadecimal)
}
