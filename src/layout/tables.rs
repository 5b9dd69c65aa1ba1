//! Table reconstruction
//!
//! Turns a detected table's flattened grid into minimal table markup with
//! inferred row and column spans. Span inference tracks an occupancy set of
//! grid coordinates already claimed by an earlier cell's span; a `None`
//! slot is a merge continuation only when an owner actually absorbs it,
//! otherwise it renders as a genuinely empty cell.
//!
//! Growth is two one-dimensional scans (rightward for colspan, down the
//! starting column for rowspan), not a rectangular flood fill, so an
//! L-shaped merge renders as its best rectangular approximation.

use std::fmt::Write;

use thiserror::Error;
use tracing::warn;

use super::scale::PageScale;
use super::LayoutElement;
use crate::pdf::{BoundingBox, FillRect, TableRegion};

#[derive(Debug, Error)]
enum SpanError {
    #[error("grid has no cells ({rows}x{cols})")]
    EmptyGrid { rows: usize, cols: usize },

    #[error("grid has {len} cells, expected {expected}")]
    CellCount { len: usize, expected: usize },
}

/// Render disposition of one grid slot after span inference
#[derive(Debug, Clone, PartialEq)]
enum Slot {
    /// Renders a `<td>` carrying this text and any span attributes
    Owner {
        text: String,
        rowspan: usize,
        colspan: usize,
    },
    /// Genuinely empty cell: renders an attribute-less `<td>`
    Empty,
    /// Absorbed by an owner's span: never rendered
    Claimed,
}

/// Build the positioned table elements of one page
pub fn build_table_elements(
    tables: &[TableRegion],
    fills: &[FillRect],
    scale: &PageScale,
) -> Vec<LayoutElement> {
    tables
        .iter()
        .map(|region| {
            let markup = match infer_spans(region) {
                Ok(slots) => render_table(region, &slots, fills),
                Err(e) => {
                    // Degrade to an unspanned grid; never abort the page
                    warn!(error = %e, "span inference failed, rendering plain grid");
                    render_plain_grid(region, fills)
                }
            };
            let style = format!(
                "top: {}px; left: {}px; width: {}px; height: {}px;",
                scale.px(region.bbox.y0),
                scale.px(region.bbox.x0),
                scale.px(region.bbox.width()),
                scale.px(region.bbox.height()),
            );
            LayoutElement::Table { style, markup }
        })
        .collect()
}

/// Occupancy-tracking span inference over the raw grid
fn infer_spans(region: &TableRegion) -> Result<Vec<Slot>, SpanError> {
    let (rows, cols) = (region.rows, region.cols);
    if rows == 0 || cols == 0 {
        return Err(SpanError::EmptyGrid { rows, cols });
    }
    if region.cells.len() != rows * cols {
        return Err(SpanError::CellCount {
            len: region.cells.len(),
            expected: rows * cols,
        });
    }

    let cell = |r: usize, c: usize| region.cells[r * cols + c].as_deref();
    let mut claimed = vec![false; rows * cols];
    let mut slots = vec![Slot::Empty; rows * cols];

    for r in 0..rows {
        for c in 0..cols {
            let idx = r * cols + c;
            if claimed[idx] {
                slots[idx] = Slot::Claimed;
                continue;
            }
            let Some(text) = cell(r, c) else {
                // Unclaimed and empty: plain cell, claims nothing
                continue;
            };

            // Grow rightward over unclaimed empty slots
            let mut colspan = 1;
            while c + colspan < cols
                && !claimed[r * cols + c + colspan]
                && cell(r, c + colspan).is_none()
            {
                colspan += 1;
            }

            // Grow downward along the starting column, independently
            let mut rowspan = 1;
            while r + rowspan < rows
                && !claimed[(r + rowspan) * cols + c]
                && cell(r + rowspan, c).is_none()
            {
                rowspan += 1;
            }

            for rr in r..r + rowspan {
                for cc in c..c + colspan {
                    claimed[rr * cols + cc] = true;
                }
            }
            slots[idx] = Slot::Owner {
                text: text.to_string(),
                rowspan,
                colspan,
            };
        }
    }

    Ok(slots)
}

/// First vector fill intersecting the cell's native box, as a CSS color
fn cell_background(cell_bbox: &BoundingBox, fills: &[FillRect]) -> Option<String> {
    fills
        .iter()
        .find(|fill| fill.bbox.intersects(cell_bbox))
        .map(|fill| {
            format!(
                "#{:02x}{:02x}{:02x}",
                fill.color[0], fill.color[1], fill.color[2]
            )
        })
}

fn push_td(
    out: &mut String,
    text: &str,
    rowspan: usize,
    colspan: usize,
    background: Option<String>,
) {
    out.push_str("<td");
    if rowspan > 1 {
        let _ = write!(out, r#" rowspan="{}""#, rowspan);
    }
    if colspan > 1 {
        let _ = write!(out, r#" colspan="{}""#, colspan);
    }
    if let Some(color) = background {
        let _ = write!(out, r#" style="background-color: {};""#, color);
    }
    out.push('>');
    out.push_str(&html_escape::encode_text(text));
    out.push_str("</td>");
}

fn render_table(region: &TableRegion, slots: &[Slot], fills: &[FillRect]) -> String {
    let mut out = String::from("<table>");
    for r in 0..region.rows {
        out.push_str("<tr>");
        for c in 0..region.cols {
            match &slots[r * region.cols + c] {
                Slot::Claimed => {}
                Slot::Empty => {
                    let bbox = region.cell_bbox(r, c, 1, 1);
                    push_td(&mut out, "", 1, 1, cell_background(&bbox, fills));
                }
                Slot::Owner {
                    text,
                    rowspan,
                    colspan,
                } => {
                    let bbox = region.cell_bbox(r, c, *rowspan, *colspan);
                    push_td(&mut out, text, *rowspan, *colspan, cell_background(&bbox, fills));
                }
            }
        }
        out.push_str("</tr>");
    }
    out.push_str("</table>");
    out
}

/// Fallback: every slot renders as its own cell, no spans inferred
fn render_plain_grid(region: &TableRegion, fills: &[FillRect]) -> String {
    let mut out = String::from("<table>");
    for r in 0..region.rows {
        out.push_str("<tr>");
        for c in 0..region.cols {
            let text = region.cell(r, c).unwrap_or("");
            let bbox = region.cell_bbox(r, c, 1, 1);
            push_td(&mut out, text, 1, 1, cell_background(&bbox, fills));
        }
        out.push_str("</tr>");
    }
    out.push_str("</table>");
    out
}
