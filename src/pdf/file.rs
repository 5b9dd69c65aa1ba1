//! Thread-safe PDF handle
//!
//! MuPDF documents are not thread-safe, so this wrapper keeps only the raw
//! bytes and opens a fresh MuPDF document for each operation; the lopdf
//! document (plain parsed object data) is parsed once and shared.

use std::path::Path;
use std::sync::Arc;

use mupdf::Document;
use parking_lot::Mutex;

use super::{PdfError, PdfResult};

/// A loaded PDF: raw bytes plus the parsed object tree
///
/// Cloning is cheap; clones share the underlying data and the MuPDF
/// access lock.
#[derive(Clone)]
pub struct PdfFile {
    data: Arc<Vec<u8>>,
    objects: Arc<lopdf::Document>,
    page_count: usize,
    /// Serializes MuPDF operations; its contexts are not thread-safe
    mupdf_lock: Arc<Mutex<()>>,
}

impl PdfFile {
    /// Load and validate a PDF from a file path
    pub fn open<P: AsRef<Path>>(path: P) -> PdfResult<Self> {
        let data = std::fs::read(path.as_ref())
            .map_err(|e| PdfError::Open(format!("{}: {}", path.as_ref().display(), e)))?;
        Self::from_bytes(data)
    }

    /// Load and validate a PDF from owned bytes
    pub fn from_bytes(data: Vec<u8>) -> PdfResult<Self> {
        // Validate that MuPDF can open the document and get the page count
        let doc = Document::from_bytes(&data, "application/pdf")?;
        let page_count = doc.page_count()? as usize;

        let objects = lopdf::Document::load_mem(&data)
            .map_err(|e| PdfError::Open(format!("object parse failed: {}", e)))?;

        Ok(Self {
            data: Arc::new(data),
            objects: Arc::new(objects),
            page_count,
            mupdf_lock: Arc::new(Mutex::new(())),
        })
    }

    pub fn page_count(&self) -> usize {
        self.page_count
    }

    /// Raw document bytes (for the base64 preview payload)
    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    /// The parsed object tree
    pub fn objects(&self) -> &lopdf::Document {
        &self.objects
    }

    /// Execute a closure against a freshly opened MuPDF document
    ///
    /// Opening per operation keeps the handle `Send + Sync` without holding
    /// a long-lived MuPDF reference.
    pub fn with_mupdf<F, R>(&self, f: F) -> PdfResult<R>
    where
        F: FnOnce(&Document) -> PdfResult<R>,
    {
        let _guard = self.mupdf_lock.lock();
        let doc = Document::from_bytes(&self.data, "application/pdf")?;
        f(&doc)
    }

    /// Whether any page carries extractable text
    pub fn has_text_layer(&self) -> PdfResult<bool> {
        self.with_mupdf(|doc| {
            for i in 0..self.page_count {
                let page = doc.load_page(i as i32)?;
                if let Ok(text) = page.to_text() {
                    if !text.trim().is_empty() {
                        return Ok(true);
                    }
                }
            }
            Ok(false)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_pdf_bytes() {
        let result = PdfFile::from_bytes(b"not a pdf at all".to_vec());
        assert!(result.is_err());
    }
}
