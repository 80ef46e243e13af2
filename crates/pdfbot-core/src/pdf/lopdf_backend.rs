//! PDF adapter built on lopdf.

use std::path::Path;

use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, dictionary};
use tracing::{debug, trace};

use super::import::ObjectImporter;
use super::{PdfBackend, Result};
use crate::error::PdfError;

/// Page tree depth after which attribute lookup gives up.
const MAX_TREE_DEPTH: usize = 64;

/// US Letter, used when a watermark page has no MediaBox.
const DEFAULT_MEDIA_BOX: [i64; 4] = [0, 0, 612, 792];

/// lopdf-based implementation of [`PdfBackend`].
#[derive(Debug, Clone)]
pub struct LopdfBackend {
    watermark_page: u32,
}

/// A watermark page imported into a target document as a Form XObject.
#[derive(Debug, Clone)]
pub struct FormStamp {
    name: Vec<u8>,
    form_id: ObjectId,
}

impl FormStamp {
    /// Resource name the form is registered under on each page.
    pub fn name(&self) -> &[u8] {
        &self.name
    }
}

impl LopdfBackend {
    pub fn new() -> Self {
        Self { watermark_page: 1 }
    }

    /// Use page `page` (1-indexed) of the watermark document.
    pub fn with_watermark_page(mut self, page: u32) -> Self {
        self.watermark_page = page;
        self
    }
}

impl Default for LopdfBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl PdfBackend for LopdfBackend {
    type Document = Document;
    type Stamp = FormStamp;

    fn open(&self, path: &Path) -> Result<Document> {
        let data = std::fs::read(path)?;
        let mut doc = Document::load_mem(&data).map_err(|e| PdfError::Parse(e.to_string()))?;

        // Handle PDFs with empty password encryption
        if doc.is_encrypted() {
            if doc.decrypt("").is_err() {
                return Err(PdfError::Encrypted);
            }
            debug!("Decrypted {} with empty password", path.display());
        }

        let page_count = doc.get_pages().len();
        if page_count == 0 {
            return Err(PdfError::NoPages);
        }

        debug!("Loaded {} with {} pages", path.display(), page_count);
        Ok(doc)
    }

    fn page_count(&self, doc: &Document) -> u32 {
        doc.get_pages().len() as u32
    }

    fn import_watermark(&self, doc: &mut Document, watermark: &Document) -> Result<FormStamp> {
        let page_id = *watermark
            .get_pages()
            .get(&self.watermark_page)
            .ok_or(PdfError::InvalidPage(self.watermark_page))?;

        let content = watermark
            .get_page_content(page_id)
            .map_err(|e| PdfError::Watermark(e.to_string()))?;

        let media_box = inherited_attribute(watermark, page_id, b"MediaBox")
            .cloned()
            .unwrap_or_else(|| Object::Array(DEFAULT_MEDIA_BOX.iter().map(|&v| v.into()).collect()));
        let resources = inherited_attribute(watermark, page_id, b"Resources")
            .cloned()
            .unwrap_or_else(|| Object::Dictionary(Dictionary::new()));

        let (bbox, resources) = {
            let mut importer = ObjectImporter::new(watermark, doc);
            (
                importer.import(&media_box).map_err(watermark_error)?,
                importer.import(&resources).map_err(watermark_error)?,
            )
        };

        let form = Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Form",
                "BBox" => bbox,
                "Resources" => resources,
            },
            content,
        );
        let form_id = doc.add_object(form);
        let name = format!("PdfBotWmk{}", form_id.0).into_bytes();

        trace!("Imported watermark page {} as form {:?}", self.watermark_page, form_id);
        Ok(FormStamp { name, form_id })
    }

    fn add_watermark(&self, doc: &mut Document, page: u32, stamp: &FormStamp) -> Result<()> {
        let page_id = *doc.get_pages().get(&page).ok_or(PdfError::InvalidPage(page))?;

        let mut resources = match inherited_attribute(doc, page_id, b"Resources") {
            Some(obj) => resolve_dict(doc, obj)?,
            None => Dictionary::new(),
        };
        let mut xobjects = match resources.get(b"XObject") {
            Ok(obj) => resolve_dict(doc, obj)?,
            Err(_) => Dictionary::new(),
        };
        xobjects.set(stamp.name.clone(), Object::Reference(stamp.form_id));
        resources.set("XObject", Object::Dictionary(xobjects));

        // Isolate the original content's graphics state, then draw on top.
        let open = encode(vec![Operation::new("q", vec![])])?;
        let close = encode(vec![
            Operation::new("Q", vec![]),
            Operation::new("q", vec![]),
            Operation::new("Do", vec![Object::Name(stamp.name.clone())]),
            Operation::new("Q", vec![]),
        ])?;
        let open_id = doc.add_object(Stream::new(Dictionary::new(), open));
        let close_id = doc.add_object(Stream::new(Dictionary::new(), close));

        let mut contents = vec![Object::Reference(open_id)];
        contents.extend(page_contents(doc, page_id)?);
        contents.push(Object::Reference(close_id));

        let page_dict = doc
            .get_object_mut(page_id)
            .and_then(Object::as_dict_mut)
            .map_err(watermark_error)?;
        page_dict.set("Resources", Object::Dictionary(resources));
        page_dict.set("Contents", Object::Array(contents));

        Ok(())
    }

    fn write(&self, doc: &mut Document, dest: &Path) -> Result<()> {
        doc.compress();
        doc.save(dest).map_err(|e| PdfError::Write(e.to_string()))?;
        debug!("Wrote {}", dest.display());
        Ok(())
    }
}

fn watermark_error(e: lopdf::Error) -> PdfError {
    PdfError::Watermark(e.to_string())
}

fn encode(operations: Vec<Operation>) -> Result<Vec<u8>> {
    Content { operations }.encode().map_err(watermark_error)
}

/// Look up a page attribute, following the Parent chain for inherited ones.
fn inherited_attribute<'a>(doc: &'a Document, page_id: ObjectId, key: &[u8]) -> Option<&'a Object> {
    let mut node_id = page_id;
    for _ in 0..MAX_TREE_DEPTH {
        let Ok(Object::Dictionary(node)) = doc.get_object(node_id) else {
            return None;
        };
        if let Ok(value) = node.get(key) {
            return Some(value);
        }
        node_id = node.get(b"Parent").and_then(Object::as_reference).ok()?;
    }
    None
}

/// Clone a dictionary that may be stored inline or behind a reference.
fn resolve_dict(doc: &Document, obj: &Object) -> Result<Dictionary> {
    match obj {
        Object::Dictionary(dict) => Ok(dict.clone()),
        Object::Reference(id) => match doc.get_object(*id).map_err(watermark_error)? {
            Object::Dictionary(dict) => Ok(dict.clone()),
            other => Err(PdfError::Watermark(format!(
                "expected dictionary at {:?}, found {}",
                id,
                kind(other)
            ))),
        },
        other => Err(PdfError::Watermark(format!(
            "expected dictionary, found {}",
            kind(other)
        ))),
    }
}

fn kind(obj: &Object) -> &'static str {
    match obj {
        Object::Null => "null",
        Object::Boolean(_) => "boolean",
        Object::Integer(_) | Object::Real(_) => "number",
        Object::Name(_) => "name",
        Object::String(..) => "string",
        Object::Array(_) => "array",
        Object::Dictionary(_) => "dictionary",
        Object::Stream(_) => "stream",
        Object::Reference(_) => "reference",
    }
}

/// The page's content streams as a flat list of references.
fn page_contents(doc: &Document, page_id: ObjectId) -> Result<Vec<Object>> {
    let page = match doc.get_object(page_id).map_err(watermark_error)? {
        Object::Dictionary(dict) => dict,
        _ => return Err(PdfError::Watermark(format!("page {:?} is not a dictionary", page_id))),
    };

    let contents = match page.get(b"Contents") {
        Ok(contents) => contents,
        Err(_) => return Ok(Vec::new()),
    };

    match contents {
        Object::Array(items) => Ok(items.clone()),
        Object::Reference(id) => match doc.get_object(*id).map_err(watermark_error)? {
            Object::Array(items) => Ok(items.clone()),
            _ => Ok(vec![contents.clone()]),
        },
        other => Ok(vec![other.clone()]),
    }
}
