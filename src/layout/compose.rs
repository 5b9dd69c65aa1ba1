//! Page composition
//!
//! Merges the three element layers of a page into one container, in the
//! order they stack visually: text, then images, then tables, each in
//! extraction order.

use super::fonts::FontResolver;
use super::scale::PageScale;
use super::{LayoutElement, LayoutError};
use crate::pdf::PageContent;

/// One composed page, immutable after composition
#[derive(Debug, Clone, PartialEq)]
pub struct PageLayout {
    pub elements: Vec<LayoutElement>,
    pub height_px: u32,
}

impl PageLayout {
    /// Render the page container markup
    pub fn to_html(&self) -> String {
        let mut out = format!(
            r#"<div class="page-container" style="height: {}px;">"#,
            self.height_px
        );
        for element in &self.elements {
            out.push_str(&element.to_html());
        }
        out.push_str("</div>");
        out
    }
}

/// Run the full layout pipeline for one parsed page
pub fn compose_page(page: &PageContent, fonts: &FontResolver) -> Result<PageLayout, LayoutError> {
    let scale = PageScale::new(page.width)?;

    let text = super::text::build_text_elements(&page.spans, &page.tables, &scale, fonts);
    let images = super::images::build_image_elements(&page.images, &scale);
    let tables = super::tables::build_table_elements(&page.tables, &page.fills, &scale);

    let mut elements = text;
    elements.extend(images);
    elements.extend(tables);

    Ok(PageLayout {
        elements,
        height_px: scale.page_height_px(page.height),
    })
}
