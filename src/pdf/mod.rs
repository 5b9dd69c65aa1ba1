//! PDF parser boundary
//!
//! Adapts the external PDF libraries (MuPDF for page geometry and structured
//! text, lopdf for object-level access) into the typed records the layout
//! engine consumes. Nothing outside this module touches a PDF library type.

use thiserror::Error;
use tracing::warn;

pub mod content;
pub mod file;
pub mod fonts;
pub mod images;
pub mod primitives;
pub mod tables;
pub mod text;

pub use file::PdfFile;
pub use fonts::{EmbeddedFont, FontProgram};
pub use primitives::{
    BoundingBox, FillRect, ImageData, ImageObject, PageContent, PrimitiveError, Ruling,
    TableRegion, TextSpan,
};

/// Errors from the parser boundary
#[derive(Debug, Error)]
pub enum PdfError {
    #[error("failed to open PDF: {0}")]
    Open(String),

    #[error("page {0} not found")]
    PageNotFound(usize),

    #[error("object error: {0}")]
    Object(#[from] lopdf::Error),

    #[error("invalid parser output: {0}")]
    Primitive(#[from] PrimitiveError),

    #[error("MuPDF error: {0}")]
    MuPdf(String),
}

impl From<mupdf::Error> for PdfError {
    fn from(err: mupdf::Error) -> Self {
        PdfError::MuPdf(err.to_string())
    }
}

pub type PdfResult<T> = std::result::Result<T, PdfError>;

/// Extract every layout primitive from one page (0-indexed)
///
/// Text extraction failing is fatal for the page; vector graphics, images,
/// and tables degrade to empty sets so a malformed content stream cannot
/// take the page down with it.
pub fn extract_page(file: &PdfFile, index: usize) -> PdfResult<PageContent> {
    if index >= file.page_count() {
        return Err(PdfError::PageNotFound(index));
    }

    let (width, height, spans) = file.with_mupdf(|doc| {
        let page = doc.load_page(index as i32)?;
        let bounds = page.bounds()?;
        let width = bounds.x1 - bounds.x0;
        let height = bounds.y1 - bounds.y0;
        let spans = text::extract_spans(&page)?;
        Ok((width, height, spans))
    })?;

    let graphics = match content::walk_page(file.objects(), index, height) {
        Ok(g) => g,
        Err(e) => {
            warn!(page = index + 1, error = %e, "content stream walk failed, skipping vector graphics");
            content::PageGraphics::default()
        }
    };

    let images = match images::resolve_images(file.objects(), index, &graphics.placements) {
        Ok(imgs) => imgs,
        Err(e) => {
            warn!(page = index + 1, error = %e, "image resolution failed, skipping page images");
            Vec::new()
        }
    };

    let tables = tables::detect_tables(
        &graphics.rulings,
        &spans,
        &tables::TableDetectorConfig::default(),
    );

    Ok(PageContent {
        number: index + 1,
        width,
        height,
        spans,
        images,
        tables,
        fills: graphics.fills,
    })
}
