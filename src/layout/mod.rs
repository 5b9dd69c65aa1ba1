//! Layout extraction and reconstruction engine
//!
//! Walks a parsed page's primitives and emits a geometrically faithful,
//! style-annotated markup tree: absolutely positioned text runs, images,
//! and reconstructed tables on a fixed-width page canvas.

use thiserror::Error;

pub mod compose;
pub mod fonts;
pub mod images;
pub mod scale;
pub mod tables;
pub mod text;

pub use compose::{compose_page, PageLayout};
pub use fonts::{FontResolver, ResolvedFont};
pub use scale::{PageScale, TARGET_WIDTH};

/// Fatal layout errors; isolated per-element failures degrade instead
#[derive(Debug, Error)]
pub enum LayoutError {
    #[error("page has zero width")]
    ZeroWidthPage,
}

/// One positioned element of a page, in stacking order
///
/// Order within a page is part of the visible result: text, then images,
/// then tables, each in extraction order.
#[derive(Debug, Clone, PartialEq)]
pub enum LayoutElement {
    /// Escaped, link-wrapped text run
    Text { style: String, markup: String },
    /// Base64 PNG payload shared by every placement of one image object
    Image { style: String, payload: String },
    /// Reconstructed table markup
    Table { style: String, markup: String },
}

impl LayoutElement {
    pub fn to_html(&self) -> String {
        match self {
            LayoutElement::Text { style, markup } => {
                format!(r#"<div class="positioned-text" style="{}">{}</div>"#, style, markup)
            }
            LayoutElement::Image { style, payload } => format!(
                r#"<div class="positioned-image" style="{}"><img src="data:image/png;base64,{}" style="width: 100%; height: 100%; object-fit: contain;"></div>"#,
                style, payload
            ),
            LayoutElement::Table { style, markup } => {
                format!(r#"<div class="positioned-table" style="{}">{}</div>"#, style, markup)
            }
        }
    }
}
