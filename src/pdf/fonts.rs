//! Embedded font program extraction
//!
//! Walks every page's font resources once per document and pulls the
//! embedded program bytes out of FontFile / FontFile2 / FontFile3 streams,
//! descending through DescendantFonts for composite (Type0) fonts. One bad
//! font never aborts extraction for the rest of the document.

use std::collections::HashSet;

use lopdf::{Dictionary, Document, Object};
use tracing::warn;

use super::content::{deref, resources_dict, stream_bytes};

/// Detected embedded program kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontProgram {
    TrueType,
    OpenType,
    Cff,
    Type1,
}

impl FontProgram {
    pub fn mime_type(&self) -> &'static str {
        match self {
            FontProgram::TrueType | FontProgram::Type1 => "font/ttf",
            FontProgram::OpenType | FontProgram::Cff => "font/otf",
        }
    }

    /// `format()` hint for an @font-face src
    pub fn css_format(&self) -> &'static str {
        match self {
            FontProgram::TrueType | FontProgram::Type1 => "truetype",
            FontProgram::OpenType | FontProgram::Cff => "opentype",
        }
    }
}

/// One font referenced by the document, with its program bytes when they
/// could be recovered
#[derive(Debug, Clone)]
pub struct EmbeddedFont {
    /// Internal reference name (BaseFont), subset tag included
    pub internal_name: String,
    pub bytes: Option<Vec<u8>>,
    pub program: Option<FontProgram>,
}

/// Extract every distinct font referenced anywhere in the document
pub fn extract_fonts(doc: &Document) -> Vec<EmbeddedFont> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut fonts = Vec::new();

    for page_id in doc.get_pages().values() {
        let Some(resources) = resources_dict(doc, *page_id) else {
            continue;
        };
        let Some(font_dict) = resources
            .get(b"Font")
            .ok()
            .and_then(|o| deref(doc, o).as_dict().ok())
        else {
            continue;
        };

        for (_, font_ref) in font_dict.iter() {
            let Ok(font) = deref(doc, font_ref).as_dict() else {
                continue;
            };
            let Some(name) = base_font_name(font) else {
                continue;
            };
            if !seen.insert(name.clone()) {
                continue;
            }

            match extract_program(doc, font) {
                Some((bytes, program)) => fonts.push(EmbeddedFont {
                    internal_name: name,
                    bytes: Some(bytes),
                    program: Some(program),
                }),
                None => {
                    warn!(font = %name, "no embedded program, falling back to reference name");
                    fonts.push(EmbeddedFont {
                        internal_name: name,
                        bytes: None,
                        program: None,
                    });
                }
            }
        }
    }

    fonts
}

fn base_font_name(font: &Dictionary) -> Option<String> {
    match font.get(b"BaseFont") {
        Ok(Object::Name(name)) if !name.is_empty() => {
            Some(String::from_utf8_lossy(name).into_owned())
        }
        _ => None,
    }
}

/// Program bytes from the font's descriptor, descending into the
/// descendant font for Type0 composites
fn extract_program(doc: &Document, font: &Dictionary) -> Option<(Vec<u8>, FontProgram)> {
    let descriptor = font_descriptor(doc, font)?;

    for (key, fallback) in [
        (b"FontFile2".as_slice(), FontProgram::TrueType),
        (b"FontFile3".as_slice(), FontProgram::Cff),
        (b"FontFile".as_slice(), FontProgram::Type1),
    ] {
        let Ok(entry) = descriptor.get(key) else {
            continue;
        };
        let Object::Stream(stream) = deref(doc, entry) else {
            continue;
        };

        // FontFile3 streams declare their flavor via Subtype
        let program = match stream.dict.get(b"Subtype") {
            Ok(Object::Name(subtype)) if subtype == b"OpenType" => FontProgram::OpenType,
            _ => fallback,
        };

        match stream_bytes(stream) {
            Ok(bytes) if !bytes.is_empty() => return Some((bytes, program)),
            Ok(_) => return None,
            Err(e) => {
                warn!(error = %e, "font program stream failed to decompress");
                return None;
            }
        }
    }
    None
}

fn font_descriptor<'a>(doc: &'a Document, font: &'a Dictionary) -> Option<&'a Dictionary> {
    if let Ok(fd) = font.get(b"FontDescriptor") {
        return deref(doc, fd).as_dict().ok();
    }

    // Type0: the descriptor lives on the single descendant font
    let descendants = font.get(b"DescendantFonts").ok()?;
    let descendants = match deref(doc, descendants) {
        Object::Array(items) => items,
        _ => return None,
    };
    let descendant = deref(doc, descendants.first()?).as_dict().ok()?;
    deref(doc, descendant.get(b"FontDescriptor").ok()?).as_dict().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::Stream;

    #[test]
    fn base_font_name_requires_name_object() {
        let mut font = Dictionary::new();
        font.set("BaseFont", Object::Name(b"ABCDEF+TestSans-Bold".to_vec()));
        assert_eq!(
            base_font_name(&font).as_deref(),
            Some("ABCDEF+TestSans-Bold")
        );

        let empty = Dictionary::new();
        assert!(base_font_name(&empty).is_none());
    }

    #[test]
    fn font_file3_opentype_subtype_wins() {
        let mut doc = Document::with_version("1.5");

        let mut program_dict = Dictionary::new();
        program_dict.set("Subtype", Object::Name(b"OpenType".to_vec()));
        let program = Stream::new(program_dict, vec![0u8; 16]).with_compression(false);
        let program_id = doc.add_object(Object::Stream(program));

        let mut descriptor = Dictionary::new();
        descriptor.set("FontFile3", Object::Reference(program_id));
        let descriptor_id = doc.add_object(Object::Dictionary(descriptor));

        let mut font = Dictionary::new();
        font.set("BaseFont", Object::Name(b"TestSerif".to_vec()));
        font.set("FontDescriptor", Object::Reference(descriptor_id));

        let (bytes, program) = extract_program(&doc, &font).unwrap();
        assert_eq!(bytes.len(), 16);
        assert_eq!(program, FontProgram::OpenType);
    }

    #[test]
    fn missing_descriptor_yields_none() {
        let doc = Document::with_version("1.5");
        let mut font = Dictionary::new();
        font.set("BaseFont", Object::Name(b"NoBytes".to_vec()));
        assert!(extract_program(&doc, &font).is_none());
    }
}
