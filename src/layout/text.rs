//! Text layer
//!
//! One absolutely positioned element per text span. Spans inside a detected
//! table region are skipped; the table reconstructor renders that text.
//! Escaping runs before URL wrapping so the injected anchor markup survives.

use std::sync::OnceLock;

use regex::Regex;

use super::fonts::FontResolver;
use super::scale::PageScale;
use super::LayoutElement;
use crate::pdf::{TableRegion, TextSpan};

/// Escape markup, then wrap http(s) URLs in anchors
///
/// Order matters: escaping first keeps span text inert, and the URL pattern
/// stops at whitespace and raw `<`, which no longer occur in escaped text.
pub fn escape_and_link(raw: &str) -> String {
    static URL: OnceLock<Regex> = OnceLock::new();
    let re = URL.get_or_init(|| Regex::new(r"(https?://[^\s<]+)").expect("valid URL pattern"));

    let escaped = html_escape::encode_text(raw);
    re.replace_all(&escaped, r#"<a href="$1" target="_blank">$1</a>"#)
        .into_owned()
}

fn color_hex(color: [u8; 3]) -> String {
    format!("#{:02x}{:02x}{:02x}", color[0], color[1], color[2])
}

/// Build the positioned text elements of one page
pub fn build_text_elements(
    spans: &[TextSpan],
    tables: &[TableRegion],
    scale: &PageScale,
    fonts: &FontResolver,
) -> Vec<LayoutElement> {
    let mut elements = Vec::new();

    for span in spans {
        if span.text.trim().is_empty() {
            continue;
        }
        // Table text renders inside the reconstructed table, not twice
        if tables.iter().any(|t| t.bbox.contains(&span.bbox)) {
            continue;
        }

        let resolved = fonts.resolve(&span.font_name);
        let mut style = format!(
            "top: {}px; left: {}px; font-size: {:.2}px; color: {}; font-family: {};",
            scale.px(span.bbox.y0),
            scale.px(span.bbox.x0),
            scale.px(span.font_size),
            color_hex(span.color),
            resolved.family,
        );
        if resolved.bold {
            style.push_str(" font-weight: bold;");
        }
        if resolved.italic {
            style.push_str(" font-style: italic;");
        }
        style.push_str(" white-space: pre;");

        elements.push(LayoutElement::Text {
            style,
            markup: escape_and_link(&span.text),
        });
    }

    elements
}
