//! Content stream walk
//!
//! A single pass over a page's content stream collecting the vector
//! primitives the layout engine needs: image placement rectangles, filled
//! rectangles (table cell backgrounds), and axis-aligned stroke segments
//! (table rulings). Text-showing operators are ignored; MuPDF handles text.
//!
//! Coordinates are converted from PDF bottom-up user space to the top-down
//! native space every boundary record uses.

use std::collections::HashSet;

use lopdf::content::Content;
use lopdf::{Dictionary, Document, Object, ObjectId};
use tracing::debug;

use super::primitives::{BoundingBox, FillRect, Ruling};
use super::{PdfError, PdfResult};

/// Segments thinner than this count as rulings even when drawn as fills
const RULING_THICKNESS: f32 = 2.0;

/// Tolerance for treating a transformed segment as axis-aligned
const AXIS_TOLERANCE: f64 = 0.5;

/// Vector primitives collected from one page
#[derive(Debug, Default)]
pub struct PageGraphics {
    /// (XObject name, placement rectangle) per image drawing op
    pub placements: Vec<(String, BoundingBox)>,
    pub fills: Vec<FillRect>,
    pub rulings: Vec<Ruling>,
}

/// Graphics state tracked during the walk: CTM and non-stroking color
#[derive(Debug, Clone, Copy)]
struct GraphicsState {
    ctm: [f64; 6],
    fill_color: [u8; 3],
}

impl Default for GraphicsState {
    fn default() -> Self {
        Self {
            ctm: [1.0, 0.0, 0.0, 1.0, 0.0, 0.0],
            fill_color: [0, 0, 0],
        }
    }
}

/// Row-vector affine composition: apply `a`, then `b`
fn concat(a: [f64; 6], b: [f64; 6]) -> [f64; 6] {
    [
        a[0] * b[0] + a[1] * b[2],
        a[0] * b[1] + a[1] * b[3],
        a[2] * b[0] + a[3] * b[2],
        a[2] * b[1] + a[3] * b[3],
        a[4] * b[0] + a[5] * b[2] + b[4],
        a[4] * b[1] + a[5] * b[3] + b[5],
    ]
}

fn apply(m: [f64; 6], x: f64, y: f64) -> (f64, f64) {
    (m[0] * x + m[2] * y + m[4], m[1] * x + m[3] * y + m[5])
}

fn number(obj: &Object) -> Option<f64> {
    match obj {
        Object::Integer(i) => Some(*i as f64),
        Object::Real(r) => Some(*r as f64),
        _ => None,
    }
}

/// Stream payload with filters applied; filterless streams pass through
pub(crate) fn stream_bytes(stream: &lopdf::Stream) -> Result<Vec<u8>, lopdf::Error> {
    if stream.dict.has(b"Filter") {
        stream.decompressed_content()
    } else {
        Ok(stream.content.clone())
    }
}

/// Follow a reference to its target object, if any
pub(crate) fn deref<'a>(doc: &'a Document, obj: &'a Object) -> &'a Object {
    if let Object::Reference(id) = obj {
        doc.get_object(*id).unwrap_or(obj)
    } else {
        obj
    }
}

/// Object id of the 0-indexed page
pub(crate) fn page_id(doc: &Document, index: usize) -> PdfResult<ObjectId> {
    doc.get_pages()
        .get(&(index as u32 + 1))
        .copied()
        .ok_or(PdfError::PageNotFound(index))
}

/// The page's Resources dictionary, following the Parent chain when the
/// page inherits it
pub(crate) fn resources_dict<'a>(doc: &'a Document, page: ObjectId) -> Option<&'a Dictionary> {
    let mut current = page;
    loop {
        let dict = doc.get_object(current).ok()?.as_dict().ok()?;
        if let Ok(res) = dict.get(b"Resources") {
            return deref(doc, res).as_dict().ok();
        }
        match dict.get(b"Parent") {
            Ok(Object::Reference(parent)) => current = *parent,
            _ => return None,
        }
    }
}

/// Names of the XObjects in `resources` whose Subtype is Image
fn image_xobject_names(doc: &Document, resources: &Dictionary) -> HashSet<String> {
    let mut names = HashSet::new();
    let Some(xobjects) = resources
        .get(b"XObject")
        .ok()
        .and_then(|o| deref(doc, o).as_dict().ok())
    else {
        return names;
    };

    for (name, obj) in xobjects.iter() {
        if let Object::Stream(stream) = deref(doc, obj) {
            let is_image = matches!(
                stream.dict.get(b"Subtype"),
                Ok(Object::Name(subtype)) if subtype == b"Image"
            );
            if is_image {
                names.insert(String::from_utf8_lossy(name).into_owned());
            }
        }
    }
    names
}

/// Walk the content stream of the 0-indexed page
pub fn walk_page(doc: &Document, index: usize, page_height: f32) -> PdfResult<PageGraphics> {
    let page = page_id(doc, index)?;
    let data = doc.get_page_content(page)?;
    let content = Content::decode(&data)?;

    let image_names = resources_dict(doc, page)
        .map(|res| image_xobject_names(doc, res))
        .unwrap_or_default();

    let mut out = PageGraphics::default();
    let mut state = GraphicsState::default();
    let mut stack: Vec<GraphicsState> = Vec::new();

    // Path under construction: rects from `re`, segments from `m`/`l`
    let mut rects: Vec<(f64, f64, f64, f64)> = Vec::new();
    let mut segments: Vec<((f64, f64), (f64, f64))> = Vec::new();
    let mut current: Option<(f64, f64)> = None;
    let mut subpath_start: Option<(f64, f64)> = None;

    for op in &content.operations {
        let operands = &op.operands;
        match op.operator.as_str() {
            "q" => stack.push(state),
            "Q" => {
                if let Some(prev) = stack.pop() {
                    state = prev;
                }
            }
            "cm" => {
                if let Some(m) = six_numbers(operands) {
                    state.ctm = concat(m, state.ctm);
                }
            }

            // Non-stroking color
            "rg" => {
                if let Some([r, g, b]) = three_numbers(operands) {
                    state.fill_color = rgb_bytes(r, g, b);
                }
            }
            "g" => {
                if let Some(v) = operands.first().and_then(number) {
                    state.fill_color = rgb_bytes(v, v, v);
                }
            }
            "k" => {
                if let Some([c, m, y, k]) = four_numbers(operands) {
                    state.fill_color = cmyk_bytes(c, m, y, k);
                }
            }
            "sc" | "scn" => {
                let nums: Vec<f64> = operands.iter().filter_map(number).collect();
                match nums.as_slice() {
                    [v] => state.fill_color = rgb_bytes(*v, *v, *v),
                    [r, g, b] => state.fill_color = rgb_bytes(*r, *g, *b),
                    [c, m, y, k] => state.fill_color = cmyk_bytes(*c, *m, *y, *k),
                    _ => {}
                }
            }

            // Path construction
            "re" => {
                if let Some([x, y, w, h]) = four_numbers(operands) {
                    rects.push((x, y, w, h));
                }
            }
            "m" => {
                if let Some([x, y]) = two_numbers(operands) {
                    current = Some((x, y));
                    subpath_start = Some((x, y));
                }
            }
            "l" => {
                if let (Some(from), Some([x, y])) = (current, two_numbers(operands)) {
                    segments.push((from, (x, y)));
                    current = Some((x, y));
                }
            }
            "c" | "v" | "y" => {
                // Curves are not rulings; just advance the current point
                let nums: Vec<f64> = operands.iter().filter_map(number).collect();
                if nums.len() >= 2 {
                    current = Some((nums[nums.len() - 2], nums[nums.len() - 1]));
                }
            }
            "h" => {
                if let (Some(from), Some(start)) = (current, subpath_start) {
                    segments.push((from, start));
                    current = Some(start);
                }
            }

            // Path painting
            "S" | "s" => {
                emit_rulings(&mut out, &state, &rects, &segments, page_height);
                clear_path(&mut rects, &mut segments, &mut current, &mut subpath_start);
            }
            "f" | "F" | "f*" => {
                emit_fills(&mut out, &state, &rects, page_height);
                clear_path(&mut rects, &mut segments, &mut current, &mut subpath_start);
            }
            "B" | "B*" | "b" | "b*" => {
                emit_fills(&mut out, &state, &rects, page_height);
                emit_rulings(&mut out, &state, &rects, &segments, page_height);
                clear_path(&mut rects, &mut segments, &mut current, &mut subpath_start);
            }
            "n" => clear_path(&mut rects, &mut segments, &mut current, &mut subpath_start),

            // External objects
            "Do" => {
                if let Some(Object::Name(name)) = operands.first() {
                    let name = String::from_utf8_lossy(name).into_owned();
                    if image_names.contains(&name) {
                        let bbox = unit_square_bbox(state.ctm, page_height);
                        out.placements.push((name, bbox));
                    } else {
                        debug!(name = %name, "skipping non-image XObject");
                    }
                }
            }

            _ => {}
        }
    }

    Ok(out)
}

fn clear_path(
    rects: &mut Vec<(f64, f64, f64, f64)>,
    segments: &mut Vec<((f64, f64), (f64, f64))>,
    current: &mut Option<(f64, f64)>,
    subpath_start: &mut Option<(f64, f64)>,
) {
    rects.clear();
    segments.clear();
    *current = None;
    *subpath_start = None;
}

fn two_numbers(operands: &[Object]) -> Option<[f64; 2]> {
    match operands {
        [a, b] => Some([number(a)?, number(b)?]),
        _ => None,
    }
}

fn three_numbers(operands: &[Object]) -> Option<[f64; 3]> {
    match operands {
        [a, b, c] => Some([number(a)?, number(b)?, number(c)?]),
        _ => None,
    }
}

fn four_numbers(operands: &[Object]) -> Option<[f64; 4]> {
    match operands {
        [a, b, c, d] => Some([number(a)?, number(b)?, number(c)?, number(d)?]),
        _ => None,
    }
}

fn six_numbers(operands: &[Object]) -> Option<[f64; 6]> {
    match operands {
        [a, b, c, d, e, f] => Some([
            number(a)?,
            number(b)?,
            number(c)?,
            number(d)?,
            number(e)?,
            number(f)?,
        ]),
        _ => None,
    }
}

fn rgb_bytes(r: f64, g: f64, b: f64) -> [u8; 3] {
    [channel(r), channel(g), channel(b)]
}

fn cmyk_bytes(c: f64, m: f64, y: f64, k: f64) -> [u8; 3] {
    [
        channel((1.0 - c) * (1.0 - k)),
        channel((1.0 - m) * (1.0 - k)),
        channel((1.0 - y) * (1.0 - k)),
    ]
}

fn channel(v: f64) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// Transformed bounding box of a rect in bottom-up user space, flipped to
/// top-down native coordinates
fn transformed_bbox(
    ctm: [f64; 6],
    x: f64,
    y: f64,
    w: f64,
    h: f64,
    page_height: f32,
) -> BoundingBox {
    let corners = [
        apply(ctm, x, y),
        apply(ctm, x + w, y),
        apply(ctm, x, y + h),
        apply(ctm, x + w, y + h),
    ];
    let min_x = corners.iter().map(|c| c.0).fold(f64::MAX, f64::min);
    let max_x = corners.iter().map(|c| c.0).fold(f64::MIN, f64::max);
    let min_y = corners.iter().map(|c| c.1).fold(f64::MAX, f64::min);
    let max_y = corners.iter().map(|c| c.1).fold(f64::MIN, f64::max);

    BoundingBox::new(
        min_x as f32,
        page_height - max_y as f32,
        max_x as f32,
        page_height - min_y as f32,
    )
}

fn unit_square_bbox(ctm: [f64; 6], page_height: f32) -> BoundingBox {
    transformed_bbox(ctm, 0.0, 0.0, 1.0, 1.0, page_height)
}

fn emit_fills(
    out: &mut PageGraphics,
    state: &GraphicsState,
    rects: &[(f64, f64, f64, f64)],
    page_height: f32,
) {
    for &(x, y, w, h) in rects {
        let bbox = transformed_bbox(state.ctm, x, y, w, h, page_height);
        out.fills.push(FillRect {
            bbox,
            color: state.fill_color,
        });

        // Table borders are often drawn as thin filled rects
        if bbox.width().min(bbox.height()) <= RULING_THICKNESS {
            let (cx, cy) = bbox.center();
            let ruling = if bbox.width() >= bbox.height() {
                Ruling { x0: bbox.x0, y0: cy, x1: bbox.x1, y1: cy }
            } else {
                Ruling { x0: cx, y0: bbox.y0, x1: cx, y1: bbox.y1 }
            };
            out.rulings.push(ruling);
        }
    }
}

fn emit_rulings(
    out: &mut PageGraphics,
    state: &GraphicsState,
    rects: &[(f64, f64, f64, f64)],
    segments: &[((f64, f64), (f64, f64))],
    page_height: f32,
) {
    for &(from, to) in segments {
        let (x0, y0) = apply(state.ctm, from.0, from.1);
        let (x1, y1) = apply(state.ctm, to.0, to.1);
        if (x1 - x0).abs() > AXIS_TOLERANCE && (y1 - y0).abs() > AXIS_TOLERANCE {
            continue;
        }
        out.rulings.push(Ruling {
            x0: x0.min(x1) as f32,
            y0: page_height - y0.max(y1) as f32,
            x1: x0.max(x1) as f32,
            y1: page_height - y0.min(y1) as f32,
        });
    }

    // Stroked rect borders count as four rulings
    for &(x, y, w, h) in rects {
        let bbox = transformed_bbox(state.ctm, x, y, w, h, page_height);
        out.rulings.extend([
            Ruling { x0: bbox.x0, y0: bbox.y0, x1: bbox.x1, y1: bbox.y0 },
            Ruling { x0: bbox.x0, y0: bbox.y1, x1: bbox.x1, y1: bbox.y1 },
            Ruling { x0: bbox.x0, y0: bbox.y0, x1: bbox.x0, y1: bbox.y1 },
            Ruling { x0: bbox.x1, y0: bbox.y0, x1: bbox.x1, y1: bbox.y1 },
        ]);
    }
}
