// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF reader: open existing PDF documents, count and extract pages, and
// append pages from other documents using the `lopdf` crate.

use std::collections::HashMap;
use std::path::Path;

use kamera_core::error::{KameraError, Result};
use lopdf::{Dictionary, Document, Object, ObjectId, dictionary};
use tracing::{debug, info, instrument, warn};

/// Page attributes a page may inherit from its ancestors in the page tree.
const INHERITABLE: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Guard against malformed page trees whose /Parent chain loops.
const MAX_TREE_DEPTH: usize = 64;

/// Reads and manipulates existing PDF files.
///
/// Wraps `lopdf::Document` and provides the page-level operations the report
/// pipeline needs: counting pages, extracting single pages for drawing
/// ingestion, and appending drawings behind a rendered report.
pub struct PdfReader {
    document: Document,
}

impl PdfReader {
    // -- Construction ---------------------------------------------------------

    /// Open a PDF from the filesystem.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path_ref = path.as_ref();
        let document = Document::load(path_ref).map_err(|err| {
            KameraError::PdfError(format!("failed to open {}: {}", path_ref.display(), err))
        })?;

        debug!(pages = document.get_pages().len(), "PDF loaded");
        Ok(Self { document })
    }

    /// Create a reader from raw PDF bytes already in memory.
    #[instrument(skip_all, fields(bytes_len = data.len()))]
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let document = Document::load_mem(data).map_err(|err| {
            KameraError::PdfError(format!("failed to load PDF from memory: {}", err))
        })?;

        debug!(pages = document.get_pages().len(), "PDF loaded from bytes");
        Ok(Self { document })
    }

    /// An empty document with a catalog and a page tree but no pages.
    pub fn empty() -> Self {
        let mut document = Document::with_version("1.5");
        let pages_id = document.new_object_id();
        document.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => Vec::<Object>::new(),
                "Count" => 0,
            }),
        );
        let catalog_id = document.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        document.trailer.set("Root", catalog_id);
        Self { document }
    }

    // -- Inspection -----------------------------------------------------------

    /// Number of pages in the document.
    pub fn page_count(&self) -> usize {
        self.document.get_pages().len()
    }

    // -- Extraction -----------------------------------------------------------

    /// Extract a single page (1-indexed) into a new standalone PDF document.
    #[instrument(skip(self))]
    pub fn extract_page(&self, page_number: u32) -> Result<Vec<u8>> {
        let pages = self.document.get_pages();
        let page_id = *pages.get(&page_number).ok_or_else(|| {
            KameraError::PdfError(format!(
                "page {} out of range (document has {} pages)",
                page_number,
                pages.len()
            ))
        })?;

        let mut single = Self::empty();
        single.append_page(&self.document, page_id)?;
        let output = single.to_bytes()?;

        debug!(page_number, output_bytes = output.len(), "Page extracted");
        Ok(output)
    }

    /// Split the document into one standalone PDF per page, in page order.
    #[instrument(skip(self))]
    pub fn split_pages(&self) -> Result<Vec<Vec<u8>>> {
        let total = self.page_count() as u32;
        info!(total, "Splitting PDF into single pages");
        (1..=total).map(|page| self.extract_page(page)).collect()
    }

    // -- Appending ------------------------------------------------------------

    /// Append every page of `other`, in order, after this document's pages.
    ///
    /// Every source page is resolved before anything is copied, so a drawing
    /// with an unreadable page leaves this document untouched. Returns the
    /// number of pages appended.
    #[instrument(skip_all, fields(base_pages = self.page_count(), other_pages = other.page_count()))]
    pub fn append_document(&mut self, other: &PdfReader) -> Result<usize> {
        let pages_id = self.root_pages_id()?;
        let resolved = other
            .document
            .get_pages()
            .into_values()
            .map(|page_id| resolve_inherited(&other.document, page_id).map(|dict| (page_id, dict)))
            .collect::<Result<Vec<_>>>()?;

        let mut copier = ObjectCopier::new(&other.document);
        for (page_id, page_dict) in &resolved {
            self.link_page(&mut copier, pages_id, *page_id, page_dict)?;
        }

        debug!(appended = resolved.len(), total = self.page_count(), "Pages appended");
        Ok(resolved.len())
    }

    /// Serialise the document.
    pub fn to_bytes(&mut self) -> Result<Vec<u8>> {
        let mut output = Vec::new();
        self.document.save_to(&mut output).map_err(|err| {
            KameraError::PdfError(format!("failed to serialise PDF: {}", err))
        })?;
        Ok(output)
    }

    // -- Helpers --------------------------------------------------------------

    fn append_page(&mut self, source: &Document, page_id: ObjectId) -> Result<()> {
        let pages_id = self.root_pages_id()?;
        let page_dict = resolve_inherited(source, page_id)?;
        let mut copier = ObjectCopier::new(source);
        self.link_page(&mut copier, pages_id, page_id, &page_dict)
    }

    /// Copy one resolved page and link it under the root page tree node.
    fn link_page(
        &mut self,
        copier: &mut ObjectCopier<'_>,
        pages_id: ObjectId,
        page_id: ObjectId,
        page_dict: &Dictionary,
    ) -> Result<()> {
        // Reserve the id first so annotations pointing back at the page (/P)
        // resolve to the copy instead of duplicating it.
        let new_page_id = self.document.new_object_id();
        copier.id_map.insert(page_id, new_page_id);

        let mut copied = copier.copy_dictionary(&mut self.document, page_dict);
        copied.set("Parent", pages_id);
        self.document
            .objects
            .insert(new_page_id, Object::Dictionary(copied));

        let pages_dict = self
            .document
            .get_object_mut(pages_id)
            .and_then(Object::as_dict_mut)
            .map_err(|err| KameraError::PdfError(format!("page tree root unreadable: {}", err)))?;

        match pages_dict.get_mut(b"Kids").and_then(Object::as_array_mut) {
            Ok(kids) => kids.push(Object::Reference(new_page_id)),
            Err(_) => pages_dict.set("Kids", vec![Object::Reference(new_page_id)]),
        }
        let count = pages_dict
            .get(b"Count")
            .and_then(Object::as_i64)
            .unwrap_or(0);
        pages_dict.set("Count", count + 1);

        Ok(())
    }

    fn root_pages_id(&self) -> Result<ObjectId> {
        self.document
            .catalog()
            .and_then(|catalog| catalog.get(b"Pages"))
            .and_then(Object::as_reference)
            .map_err(|err| KameraError::PdfError(format!("document has no page tree: {}", err)))
    }
}

/// The page dictionary with inheritable attributes pulled down from its
/// ancestors. /Parent is left for the caller to replace.
fn resolve_inherited(source: &Document, page_id: ObjectId) -> Result<Dictionary> {
    let mut page = source
        .get_dictionary(page_id)
        .map_err(|err| KameraError::PdfError(format!("cannot read page {:?}: {}", page_id, err)))?
        .clone();

    let mut parent = page.get(b"Parent").and_then(Object::as_reference).ok();
    let mut depth = 0;
    while let Some(node_id) = parent {
        if depth >= MAX_TREE_DEPTH {
            warn!(?page_id, "page tree too deep, stopping inheritance walk");
            break;
        }
        let Ok(node) = source.get_dictionary(node_id) else {
            break;
        };
        for key in INHERITABLE {
            if !page.has(key) {
                if let Ok(value) = node.get(key) {
                    page.set(key.to_vec(), value.clone());
                }
            }
        }
        parent = node.get(b"Parent").and_then(Object::as_reference).ok();
        depth += 1;
    }

    Ok(page)
}

/// Deep-copies objects from one document into another, remembering every
/// source id it has already copied so shared resources are copied once and
/// reference cycles terminate.
struct ObjectCopier<'a> {
    source: &'a Document,
    id_map: HashMap<ObjectId, ObjectId>,
}

impl<'a> ObjectCopier<'a> {
    fn new(source: &'a Document) -> Self {
        Self {
            source,
            id_map: HashMap::new(),
        }
    }

    fn copy_reference(&mut self, target: &mut Document, id: ObjectId) -> Object {
        if let Some(mapped) = self.id_map.get(&id) {
            return Object::Reference(*mapped);
        }

        let object = match self.source.get_object(id) {
            Ok(object) => object,
            Err(err) => {
                warn!(?id, %err, "Cannot resolve reference, using Null");
                return Object::Null;
            }
        };

        let new_id = target.add_object(Object::Null);
        self.id_map.insert(id, new_id);
        let copied = self.copy_object(target, object);
        target.objects.insert(new_id, copied);
        Object::Reference(new_id)
    }

    fn copy_object(&mut self, target: &mut Document, object: &Object) -> Object {
        match object {
            Object::Reference(id) => self.copy_reference(target, *id),
            Object::Dictionary(dict) => Object::Dictionary(self.copy_dictionary(target, dict)),
            Object::Array(items) => Object::Array(
                items
                    .iter()
                    .map(|item| self.copy_object(target, item))
                    .collect(),
            ),
            Object::Stream(stream) => {
                let mut copied = stream.clone();
                copied.dict = self.copy_dictionary(target, &stream.dict);
                Object::Stream(copied)
            }
            other => other.clone(),
        }
    }

    /// Copy a dictionary, dropping /Parent so page-tree back-references never
    /// drag the source tree along.
    fn copy_dictionary(&mut self, target: &mut Document, dict: &Dictionary) -> Dictionary {
        let mut copied = Dictionary::new();
        for (key, value) in dict.iter() {
            if key == b"Parent" {
                continue;
            }
            copied.set(key.clone(), self.copy_object(target, value));
        }
        copied
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use lopdf::content::{Content, Operation};

    /// Build a PDF whose pages each show their own label. Resources and
    /// MediaBox live on the page tree node so pages rely on inheritance.
    pub(crate) fn labelled_pdf(labels: &[&str]) -> Vec<u8> {
        let mut doc = Document::with_version("1.7");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });

        let mut kids = Vec::new();
        for label in labels {
            let content = Content {
                operations: vec![
                    Operation::new("BT", vec![]),
                    Operation::new("Tf", vec!["F1".into(), 24.into()]),
                    Operation::new("Td", vec![72.into(), 700.into()]),
                    Operation::new("Tj", vec![Object::string_literal(*label)]),
                    Operation::new("ET", vec![]),
                ],
            };
            let content_id = doc.add_object(lopdf::Stream::new(
                Dictionary::new(),
                content.encode().expect("encode content"),
            ));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            });
            kids.push(Object::Reference(page_id));
        }

        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
                "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
                "Resources" => dictionary! {
                    "Font" => dictionary! { "F1" => font_id },
                },
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).expect("save fixture");
        bytes
    }

    /// Decoded content stream of a page, lossily as text.
    pub(crate) fn page_text(bytes: &[u8], page: u32) -> String {
        let doc = Document::load_mem(bytes).expect("load");
        let page_id = doc.get_pages()[&page];
        let content = doc.get_page_content(page_id).expect("page content");
        String::from_utf8_lossy(&content).into_owned()
    }

    #[test]
    fn counts_pages() {
        let reader = PdfReader::from_bytes(&labelled_pdf(&["a", "b", "c"])).expect("load");
        assert_eq!(reader.page_count(), 3);
    }

    #[test]
    fn garbage_is_a_pdf_error() {
        match PdfReader::from_bytes(b"not a pdf") {
            Err(KameraError::PdfError(_)) => {}
            other => panic!("expected PdfError, got {:?}", other.map(|r| r.page_count())),
        }
    }

    #[test]
    fn extracted_page_keeps_its_content_and_inherited_box() {
        let source = labelled_pdf(&["first", "second"]);
        let reader = PdfReader::from_bytes(&source).expect("load");
        let single = reader.extract_page(2).expect("extract");

        let doc = Document::load_mem(&single).expect("reload");
        assert_eq!(doc.get_pages().len(), 1);
        let page_id = doc.get_pages()[&1];
        let page = doc.get_dictionary(page_id).expect("page dict");
        assert!(page.has(b"MediaBox"));
        assert!(page.has(b"Resources"));
        assert!(page_text(&single, 1).contains("second"));
    }

    #[test]
    fn extract_out_of_range_fails() {
        let reader = PdfReader::from_bytes(&labelled_pdf(&["only"])).expect("load");
        assert!(reader.extract_page(0).is_err());
        assert!(reader.extract_page(2).is_err());
    }

    #[test]
    fn split_yields_one_document_per_page_in_order() {
        let reader = PdfReader::from_bytes(&labelled_pdf(&["p1", "p2", "p3"])).expect("load");
        let parts = reader.split_pages().expect("split");
        assert_eq!(parts.len(), 3);
        for (index, part) in parts.iter().enumerate() {
            assert_eq!(PdfReader::from_bytes(part).expect("part").page_count(), 1);
            assert!(page_text(part, 1).contains(&format!("p{}", index + 1)));
        }
    }

    #[test]
    fn append_keeps_order_and_count() {
        let mut base = PdfReader::from_bytes(&labelled_pdf(&["report"])).expect("base");
        let drawing = PdfReader::from_bytes(&labelled_pdf(&["iso-1", "iso-2"])).expect("drawing");

        assert_eq!(base.append_document(&drawing).expect("append"), 2);
        assert_eq!(base.page_count(), 3);

        let merged = base.to_bytes().expect("save");
        let reloaded = PdfReader::from_bytes(&merged).expect("reload");
        assert_eq!(reloaded.page_count(), 3);
        assert!(page_text(&merged, 1).contains("report"));
        assert!(page_text(&merged, 2).contains("iso-1"));
        assert!(page_text(&merged, 3).contains("iso-2"));
    }

    #[test]
    fn shared_resources_are_copied_once() {
        let mut base = PdfReader::empty();
        let drawing = PdfReader::from_bytes(&labelled_pdf(&["a", "b", "c", "d"])).expect("load");
        base.append_document(&drawing).expect("append");

        let fonts = base
            .document
            .objects
            .values()
            .filter(|object| {
                object
                    .as_dict()
                    .and_then(|d| d.get(b"Type"))
                    .and_then(Object::as_name)
                    .map(|name| name == b"Font")
                    .unwrap_or(false)
            })
            .count();
        assert_eq!(fonts, 1);
    }

    #[test]
    fn empty_document_serialises() {
        let mut empty = PdfReader::empty();
        assert_eq!(empty.page_count(), 0);
        assert!(empty.to_bytes().expect("save").starts_with(b"%PDF-1.5"));
    }
}
