//! Image XObject resolution
//!
//! Turns the placement rectangles collected by the content walk into
//! `ImageObject` records: one record per distinct image stream, carrying
//! every rectangle it is stamped at. Decoding stays with the layout engine;
//! this module only classifies the stream payload.

use std::collections::HashMap;

use lopdf::{Document, Object, Stream};
use tracing::warn;

use super::content::{deref, page_id, resources_dict, stream_bytes};
use super::primitives::{BoundingBox, ImageData, ImageObject};
use super::PdfResult;

/// Resolve the image objects referenced by a page's placements
pub fn resolve_images(
    doc: &Document,
    index: usize,
    placements: &[(String, BoundingBox)],
) -> PdfResult<Vec<ImageObject>> {
    if placements.is_empty() {
        return Ok(Vec::new());
    }

    let page = page_id(doc, index)?;
    let Some(resources) = resources_dict(doc, page) else {
        return Ok(Vec::new());
    };
    let Some(xobjects) = resources
        .get(b"XObject")
        .ok()
        .and_then(|o| deref(doc, o).as_dict().ok())
    else {
        return Ok(Vec::new());
    };

    // Group placement rects by XObject name; the same artwork is often
    // stamped several times
    let mut rects_by_name: HashMap<&str, Vec<BoundingBox>> = HashMap::new();
    for (name, rect) in placements {
        rects_by_name.entry(name.as_str()).or_default().push(*rect);
    }

    let mut images = Vec::new();
    for (name, rects) in rects_by_name {
        let Ok(entry) = xobjects.get(name.as_bytes()) else {
            warn!(page = index + 1, name, "placed XObject missing from resources");
            continue;
        };

        let id = match entry {
            Object::Reference((num, gen)) => format!("im{}-{}", num, gen),
            _ => format!("p{}-{}", index + 1, name),
        };

        let Object::Stream(stream) = deref(doc, entry) else {
            continue;
        };

        match classify_stream(doc, stream) {
            Ok(Some((width, height, components, data))) => images.push(ImageObject {
                id,
                width,
                height,
                components,
                data,
                rects,
            }),
            Ok(None) => {}
            Err(e) => {
                warn!(page = index + 1, name, error = %e, "skipping undecodable image");
            }
        }
    }

    // Stable output order for deterministic markup
    images.sort_by(|a, b| a.id.cmp(&b.id));
    Ok(images)
}

/// Extract dimensions, component count, and payload from an image stream.
/// Returns `Ok(None)` for images this converter does not handle.
fn classify_stream(
    doc: &Document,
    stream: &Stream,
) -> Result<Option<(u32, u32, u8, ImageData)>, String> {
    let dict = &stream.dict;

    let width = dict_u32(dict, b"Width").ok_or("missing Width")?;
    let height = dict_u32(dict, b"Height").ok_or("missing Height")?;
    let components = color_components(doc, dict)?;

    let filter = last_filter(dict);
    match filter.as_deref() {
        Some(b"DCTDecode") => Ok(Some((
            width,
            height,
            components,
            ImageData::Jpeg(stream.content.clone()),
        ))),
        None | Some(b"FlateDecode") => {
            let bits = dict_u32(dict, b"BitsPerComponent").unwrap_or(8);
            if bits != 8 {
                return Err(format!("unsupported bit depth {}", bits));
            }
            let samples =
                stream_bytes(stream).map_err(|e| format!("decompress failed: {}", e))?;
            let expected = width as usize * height as usize * components as usize;
            if samples.len() < expected {
                return Err(format!(
                    "sample buffer too short: {} < {}",
                    samples.len(),
                    expected
                ));
            }
            Ok(Some((width, height, components, ImageData::Raw(samples))))
        }
        Some(other) => Err(format!(
            "unsupported filter {}",
            String::from_utf8_lossy(other)
        )),
    }
}

fn dict_u32(dict: &lopdf::Dictionary, key: &[u8]) -> Option<u32> {
    match dict.get(key) {
        Ok(Object::Integer(i)) if *i >= 0 => Some(*i as u32),
        _ => None,
    }
}

/// The last entry of the Filter chain, the one describing the payload
fn last_filter(dict: &lopdf::Dictionary) -> Option<Vec<u8>> {
    match dict.get(b"Filter") {
        Ok(Object::Name(name)) => Some(name.clone()),
        Ok(Object::Array(filters)) => filters.last().and_then(|f| match f {
            Object::Name(name) => Some(name.clone()),
            _ => None,
        }),
        _ => None,
    }
}

/// Color components per pixel implied by the ColorSpace entry
fn color_components(doc: &Document, dict: &lopdf::Dictionary) -> Result<u8, String> {
    let Ok(cs) = dict.get(b"ColorSpace") else {
        // Image masks and missing color spaces render as grayscale
        return Ok(1);
    };

    match deref(doc, cs) {
        Object::Name(name) => match name.as_slice() {
            b"DeviceGray" | b"CalGray" => Ok(1),
            b"DeviceRGB" | b"CalRGB" => Ok(3),
            b"DeviceCMYK" => Ok(4),
            other => Err(format!(
                "unsupported color space {}",
                String::from_utf8_lossy(other)
            )),
        },
        Object::Array(parts) => {
            let family = match parts.first() {
                Some(Object::Name(name)) => name.as_slice(),
                _ => return Err("malformed color space array".into()),
            };
            match family {
                b"ICCBased" => {
                    let n = parts
                        .get(1)
                        .and_then(|o| match deref(doc, o) {
                            Object::Stream(s) => dict_u32(&s.dict, b"N"),
                            _ => None,
                        })
                        .ok_or("ICCBased color space missing N")?;
                    Ok(n as u8)
                }
                other => Err(format!(
                    "unsupported color space {}",
                    String::from_utf8_lossy(other)
                )),
            }
        }
        _ => Err("malformed color space".into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::Dictionary;

    fn image_dict(width: i64, height: i64, cs: &[u8]) -> Dictionary {
        let mut dict = Dictionary::new();
        dict.set("Type", Object::Name(b"XObject".to_vec()));
        dict.set("Subtype", Object::Name(b"Image".to_vec()));
        dict.set("Width", Object::Integer(width));
        dict.set("Height", Object::Integer(height));
        dict.set("ColorSpace", Object::Name(cs.to_vec()));
        dict.set("BitsPerComponent", Object::Integer(8));
        dict
    }

    #[test]
    fn classifies_raw_rgb_stream() {
        let doc = Document::with_version("1.5");
        let dict = image_dict(2, 2, b"DeviceRGB");
        let stream = Stream::new(dict, vec![0u8; 12]).with_compression(false);

        let (w, h, components, data) = classify_stream(&doc, &stream).unwrap().unwrap();
        assert_eq!((w, h, components), (2, 2, 3));
        assert!(matches!(data, ImageData::Raw(ref s) if s.len() == 12));
    }

    #[test]
    fn keeps_jpeg_payload_undecoded() {
        let doc = Document::with_version("1.5");
        let mut dict = image_dict(4, 4, b"DeviceCMYK");
        dict.set("Filter", Object::Name(b"DCTDecode".to_vec()));
        let stream = Stream::new(dict, vec![0xFF, 0xD8, 0xFF]).with_compression(false);

        let (_, _, components, data) = classify_stream(&doc, &stream).unwrap().unwrap();
        assert_eq!(components, 4);
        assert!(matches!(data, ImageData::Jpeg(_)));
    }

    #[test]
    fn rejects_unsupported_filter() {
        let doc = Document::with_version("1.5");
        let mut dict = image_dict(4, 4, b"DeviceRGB");
        dict.set("Filter", Object::Name(b"JPXDecode".to_vec()));
        let stream = Stream::new(dict, vec![0u8; 4]).with_compression(false);

        assert!(classify_stream(&doc, &stream).is_err());
    }

    #[test]
    fn short_sample_buffer_is_rejected() {
        let doc = Document::with_version("1.5");
        let dict = image_dict(10, 10, b"DeviceRGB");
        let stream = Stream::new(dict, vec![0u8; 5]).with_compression(false);

        assert!(classify_stream(&doc, &stream).is_err());
    }
}
