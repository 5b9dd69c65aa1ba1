//! Image layer
//!
//! Each distinct image object is decoded and encoded exactly once; every
//! placement rectangle reuses the same base64 payload. A failed decode
//! skips that one image object and nothing else.

use std::io::Cursor;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use image::DynamicImage;
use tracing::warn;

use super::scale::PageScale;
use super::LayoutElement;
use crate::pdf::{ImageData, ImageObject};

/// Build the positioned image elements of one page
pub fn build_image_elements(images: &[ImageObject], scale: &PageScale) -> Vec<LayoutElement> {
    let mut elements = Vec::new();

    for image in images {
        // Decode once; placements share the payload
        let payload = match encode_png_base64(image) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(id = %image.id, error = %e, "skipping undecodable image");
                continue;
            }
        };

        for rect in &image.rects {
            let style = format!(
                "top: {}px; left: {}px; width: {}px; height: {}px;",
                scale.px(rect.y0),
                scale.px(rect.x0),
                scale.px(rect.width()),
                scale.px(rect.height()),
            );
            elements.push(LayoutElement::Image {
                style,
                payload: payload.clone(),
            });
        }
    }

    elements
}

fn encode_png_base64(image: &ImageObject) -> Result<String, String> {
    let decoded = decode_pixels(image)?;
    let mut png = Vec::new();
    decoded
        .write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)
        .map_err(|e| format!("PNG encode failed: {}", e))?;
    Ok(BASE64.encode(&png))
}

fn decode_pixels(image: &ImageObject) -> Result<DynamicImage, String> {
    match &image.data {
        ImageData::Jpeg(bytes) => {
            let decoded =
                image::load_from_memory(bytes).map_err(|e| format!("JPEG decode failed: {}", e))?;
            Ok(normalize_channels(decoded))
        }
        ImageData::Raw(samples) => raw_to_image(image, samples),
    }
}

/// Collapse CMYK-like decodes to RGB; pass everything else through
fn normalize_channels(decoded: DynamicImage) -> DynamicImage {
    match decoded.color().channel_count() {
        c if c >= 4 => DynamicImage::ImageRgb8(decoded.to_rgb8()),
        _ => decoded,
    }
}

fn raw_to_image(image: &ImageObject, samples: &[u8]) -> Result<DynamicImage, String> {
    let (w, h) = (image.width, image.height);
    let pixels = w as usize * h as usize;

    if samples.len() < pixels * image.components as usize {
        return Err(format!(
            "sample buffer too short: {} < {}",
            samples.len(),
            pixels * image.components as usize
        ));
    }

    match image.components {
        1 => {
            let buf = image::GrayImage::from_raw(w, h, samples[..pixels].to_vec())
                .ok_or("grayscale buffer mismatch")?;
            Ok(DynamicImage::ImageLuma8(buf))
        }
        3 => {
            let buf = image::RgbImage::from_raw(w, h, samples[..pixels * 3].to_vec())
                .ok_or("RGB buffer mismatch")?;
            Ok(DynamicImage::ImageRgb8(buf))
        }
        4 => {
            // CMYK-like: convert to RGB before encoding
            let mut rgb = Vec::with_capacity(pixels * 3);
            for px in samples[..pixels * 4].chunks_exact(4) {
                let (c, m, y, k) = (
                    px[0] as f32 / 255.0,
                    px[1] as f32 / 255.0,
                    px[2] as f32 / 255.0,
                    px[3] as f32 / 255.0,
                );
                rgb.push(((1.0 - c) * (1.0 - k) * 255.0).round() as u8);
                rgb.push(((1.0 - m) * (1.0 - k) * 255.0).round() as u8);
                rgb.push(((1.0 - y) * (1.0 - k) * 255.0).round() as u8);
            }
            let buf =
                image::RgbImage::from_raw(w, h, rgb).ok_or("CMYK conversion buffer mismatch")?;
            Ok(DynamicImage::ImageRgb8(buf))
        }
        other => Err(format!("unsupported component count {}", other)),
    }
}
