//! Text span extraction
//!
//! Uses MuPDF's structured-text JSON output, which carries the per-line font
//! identity the plain character API does not expose. One structured-text
//! line becomes one `TextSpan`: a maximal run sharing a single font and size.

use mupdf::Page;
use serde::Deserialize;

use super::primitives::{BoundingBox, TextSpan};
use super::{PdfError, PdfResult};

/// Span color when the parser does not report one
const DEFAULT_COLOR: [u8; 3] = [0, 0, 0];

#[derive(Debug, Deserialize)]
struct StextPage {
    #[serde(default)]
    blocks: Vec<StextBlock>,
}

#[derive(Debug, Deserialize)]
struct StextBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    lines: Vec<StextLine>,
}

#[derive(Debug, Deserialize)]
struct StextLine {
    #[serde(default)]
    bbox: StextBbox,
    #[serde(default)]
    font: StextFont,
    #[serde(default)]
    text: String,
}

#[derive(Debug, Default, Deserialize)]
struct StextBbox {
    #[serde(default)]
    x: f32,
    #[serde(default)]
    y: f32,
    #[serde(default)]
    w: f32,
    #[serde(default)]
    h: f32,
}

#[derive(Debug, Default, Deserialize)]
struct StextFont {
    #[serde(default)]
    name: String,
    #[serde(default)]
    size: f32,
}

/// Extract the text spans of a page in reading order
pub fn extract_spans(page: &Page) -> PdfResult<Vec<TextSpan>> {
    let json = page.stext_page_as_json(1.0)?;
    let parsed: StextPage = serde_json::from_str(&json)
        .map_err(|e| PdfError::MuPdf(format!("structured text parse failed: {}", e)))?;

    let mut spans = Vec::new();
    for block in parsed.blocks {
        if block.kind != "text" {
            continue;
        }
        for line in block.lines {
            if line.text.is_empty() {
                continue;
            }
            spans.push(TextSpan {
                bbox: BoundingBox::new(
                    line.bbox.x,
                    line.bbox.y,
                    line.bbox.x + line.bbox.w,
                    line.bbox.y + line.bbox.h,
                ),
                text: line.text,
                font_name: line.font.name,
                font_size: line.font.size,
                color: DEFAULT_COLOR,
            });
        }
    }
    Ok(spans)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_structured_text_json() {
        let json = r#"{
            "blocks": [
                {
                    "type": "text",
                    "bbox": {"x": 10.0, "y": 20.0, "w": 200.0, "h": 14.0},
                    "lines": [
                        {
                            "wmode": 0,
                            "bbox": {"x": 10.0, "y": 20.0, "w": 200.0, "h": 14.0},
                            "font": {"name": "BAAAAA+LiberationSerif", "family": "serif", "weight": "normal", "style": "normal", "size": 12.0},
                            "x": 10, "y": 31,
                            "text": "Hello world"
                        }
                    ]
                },
                {"type": "image", "bbox": {"x": 0.0, "y": 0.0, "w": 50.0, "h": 50.0}}
            ]
        }"#;

        let parsed: StextPage = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.blocks.len(), 2);
        assert_eq!(parsed.blocks[0].kind, "text");
        let line = &parsed.blocks[0].lines[0];
        assert_eq!(line.text, "Hello world");
        assert_eq!(line.font.name, "BAAAAA+LiberationSerif");
        assert_eq!(line.font.size, 12.0);
    }

    #[test]
    fn image_blocks_have_no_lines() {
        let json = r#"{"blocks": [{"type": "image", "bbox": {"x": 0, "y": 0, "w": 1, "h": 1}}]}"#;
        let parsed: StextPage = serde_json::from_str(json).unwrap();
        assert!(parsed.blocks[0].lines.is_empty());
    }
}
