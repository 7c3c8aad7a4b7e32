//! PDF metadata extraction

use std::path::Path;
use lopdf::{Document, Object};
use crate::error::{Error, Result};
use crate::layout::PageGeometry;
use crate::pdf::stamp::page_geometry;

/// PDF metadata
#[derive(Debug, Clone)]
pub struct PdfMetadata {
    /// Number of pages in the PDF
    pub page_count: usize,
    /// Size of each page, in document order
    pub page_sizes: Vec<PageGeometry>,
    /// Document title (if present)
    pub title: Option<String>,
}

/// Extract metadata from a PDF file
pub fn extract_metadata(path: &Path) -> Result<PdfMetadata> {
    if !path.exists() {
        return Err(Error::FileNotFound(path.to_path_buf()));
    }

    let bytes = std::fs::read(path).map_err(|source| Error::FileRead {
        path: path.to_path_buf(),
        source,
    })?;
    extract_metadata_from_bytes(&bytes)
}

/// Extract metadata from an in-memory PDF
pub fn extract_metadata_from_bytes(bytes: &[u8]) -> Result<PdfMetadata> {
    let doc = Document::load_mem(bytes).map_err(Error::DocumentLoad)?;

    let page_sizes = doc
        .get_pages()
        .values()
        .map(|page_id| page_geometry(&doc, *page_id))
        .collect::<Result<Vec<_>>>()?;

    if page_sizes.is_empty() {
        return Err(Error::EmptyPdf);
    }

    Ok(PdfMetadata {
        page_count: page_sizes.len(),
        page_sizes,
        title: document_title(&doc),
    })
}

/// Read the Title entry from the trailer's Info dictionary
fn document_title(doc: &Document) -> Option<String> {
    let info = match doc.trailer.get(b"Info").ok()? {
        Object::Reference(id) => doc.get_dictionary(*id).ok()?,
        Object::Dictionary(dict) => dict,
        _ => return None,
    };

    let title = info.get(b"Title").ok()?.as_str().ok()?;
    String::from_utf8(title.to_vec()).ok()
}
