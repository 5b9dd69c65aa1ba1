//! Typed records at the parser boundary
//!
//! The layout engine consumes these records only; everything the PDF
//! libraries produce is validated and converted here. All coordinates are
//! native page units with a top-left origin: `(x0, y0)` is the upper-left
//! corner of a box, `(x1, y1)` the lower-right.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Invalid parser output caught at record construction
#[derive(Debug, Error)]
pub enum PrimitiveError {
    #[error("table grid has {len} cells, expected {rows}x{cols}")]
    GridShape { len: usize, rows: usize, cols: usize },

    #[error("table has {edges} {axis} edges for {cells} cells")]
    EdgeCount {
        axis: &'static str,
        edges: usize,
        cells: usize,
    },
}

/// Bounding box in native page units
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl BoundingBox {
    pub fn new(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self { x0, y0, x1, y1 }
    }

    pub fn width(&self) -> f32 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f32 {
        self.y1 - self.y0
    }

    pub fn center(&self) -> (f32, f32) {
        ((self.x0 + self.x1) / 2.0, (self.y0 + self.y1) / 2.0)
    }

    /// Whether `other` lies fully inside this box
    pub fn contains(&self, other: &BoundingBox) -> bool {
        other.x0 >= self.x0 && other.x1 <= self.x1 && other.y0 >= self.y0 && other.y1 <= self.y1
    }

    pub fn contains_point(&self, x: f32, y: f32) -> bool {
        x >= self.x0 && x <= self.x1 && y >= self.y0 && y <= self.y1
    }

    pub fn intersects(&self, other: &BoundingBox) -> bool {
        self.x0 < other.x1 && self.x1 > other.x0 && self.y0 < other.y1 && self.y1 > other.y0
    }
}

/// A maximal run of text sharing one font and size, as produced by the
/// page parser
#[derive(Debug, Clone, PartialEq)]
pub struct TextSpan {
    pub bbox: BoundingBox,
    pub text: String,
    /// Internal font reference name, e.g. "BAAAAA+LiberationSerif-Bold"
    pub font_name: String,
    pub font_size: f32,
    pub color: [u8; 3],
}

/// Encoded pixel payload of an embedded image stream
#[derive(Debug, Clone)]
pub enum ImageData {
    /// DCT-encoded stream kept as-is
    Jpeg(Vec<u8>),
    /// Decompressed interleaved samples, `components` per pixel
    Raw(Vec<u8>),
}

/// One embedded image object together with every rectangle it is stamped at
/// on the page
#[derive(Debug, Clone)]
pub struct ImageObject {
    pub id: String,
    pub width: u32,
    pub height: u32,
    /// Color components per pixel, alpha excluded
    pub components: u8,
    pub data: ImageData,
    pub rects: Vec<BoundingBox>,
}

/// Vector fill primitive, kept only for table cell background sampling
#[derive(Debug, Clone, Copy)]
pub struct FillRect {
    pub bbox: BoundingBox,
    pub color: [u8; 3],
}

/// Axis-aligned stroke segment from the page's vector graphics
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ruling {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl Ruling {
    pub fn horizontal(&self) -> bool {
        (self.y1 - self.y0).abs() <= (self.x1 - self.x0).abs()
    }

    pub fn vertical(&self) -> bool {
        !self.horizontal()
    }
}

/// A detected table: bounding box, a rows x cols grid of extracted cell
/// text, and the native row/column edge coordinates the grid was built from.
///
/// `None` marks a slot with no text of its own: either a genuinely empty
/// cell or a slot absorbed by a neighboring merged cell; span inference in
/// the layout engine disambiguates the two.
#[derive(Debug, Clone)]
pub struct TableRegion {
    pub bbox: BoundingBox,
    pub rows: usize,
    pub cols: usize,
    pub cells: Vec<Option<String>>,
    /// rows + 1 ascending y coordinates
    pub row_edges: Vec<f32>,
    /// cols + 1 ascending x coordinates
    pub col_edges: Vec<f32>,
}

impl TableRegion {
    pub fn new(
        bbox: BoundingBox,
        rows: usize,
        cols: usize,
        cells: Vec<Option<String>>,
        row_edges: Vec<f32>,
        col_edges: Vec<f32>,
    ) -> Result<Self, PrimitiveError> {
        if cells.len() != rows * cols {
            return Err(PrimitiveError::GridShape {
                len: cells.len(),
                rows,
                cols,
            });
        }
        if row_edges.len() != rows + 1 {
            return Err(PrimitiveError::EdgeCount {
                axis: "row",
                edges: row_edges.len(),
                cells: rows,
            });
        }
        if col_edges.len() != cols + 1 {
            return Err(PrimitiveError::EdgeCount {
                axis: "column",
                edges: col_edges.len(),
                cells: cols,
            });
        }
        Ok(Self {
            bbox,
            rows,
            cols,
            cells,
            row_edges,
            col_edges,
        })
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<&str> {
        self.cells
            .get(row * self.cols + col)
            .and_then(|c| c.as_deref())
    }

    /// Native bounding box of the cell at (row, col) spanning
    /// `rowspan` x `colspan` grid slots
    pub fn cell_bbox(&self, row: usize, col: usize, rowspan: usize, colspan: usize) -> BoundingBox {
        BoundingBox::new(
            self.col_edges[col],
            self.row_edges[row],
            self.col_edges[(col + colspan).min(self.cols)],
            self.row_edges[(row + rowspan).min(self.rows)],
        )
    }
}

/// Everything the layout engine needs from one parsed page
#[derive(Debug, Clone)]
pub struct PageContent {
    /// 1-indexed page number
    pub number: usize,
    pub width: f32,
    pub height: f32,
    pub spans: Vec<TextSpan>,
    pub images: Vec<ImageObject>,
    pub tables: Vec<TableRegion>,
    pub fills: Vec<FillRect>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bbox_containment() {
        let outer = BoundingBox::new(0.0, 0.0, 100.0, 50.0);
        let inner = BoundingBox::new(10.0, 10.0, 40.0, 20.0);
        assert!(outer.contains(&inner));
        assert!(!inner.contains(&outer));
    }

    #[test]
    fn bbox_intersection() {
        let a = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        let b = BoundingBox::new(5.0, 5.0, 15.0, 15.0);
        let c = BoundingBox::new(20.0, 20.0, 30.0, 30.0);
        assert!(a.intersects(&b));
        assert!(!a.intersects(&c));
    }

    #[test]
    fn table_region_validates_grid_shape() {
        let bbox = BoundingBox::new(0.0, 0.0, 100.0, 40.0);
        let err = TableRegion::new(
            bbox,
            2,
            2,
            vec![None; 3],
            vec![0.0, 20.0, 40.0],
            vec![0.0, 50.0, 100.0],
        );
        assert!(matches!(err, Err(PrimitiveError::GridShape { len: 3, .. })));
    }

    #[test]
    fn table_region_validates_edge_counts() {
        let bbox = BoundingBox::new(0.0, 0.0, 100.0, 40.0);
        let err = TableRegion::new(
            bbox,
            2,
            2,
            vec![None; 4],
            vec![0.0, 40.0],
            vec![0.0, 50.0, 100.0],
        );
        assert!(matches!(err, Err(PrimitiveError::EdgeCount { axis: "row", .. })));
    }

    #[test]
    fn cell_bbox_spans_edges() {
        let region = TableRegion::new(
            BoundingBox::new(0.0, 0.0, 90.0, 60.0),
            2,
            3,
            vec![None; 6],
            vec![0.0, 30.0, 60.0],
            vec![0.0, 30.0, 60.0, 90.0],
        )
        .unwrap();

        let cell = region.cell_bbox(0, 0, 1, 2);
        assert_eq!(cell, BoundingBox::new(0.0, 0.0, 60.0, 30.0));

        let tall = region.cell_bbox(0, 2, 2, 1);
        assert_eq!(tall, BoundingBox::new(60.0, 0.0, 90.0, 60.0));
    }

    #[test]
    fn ruling_orientation() {
        assert!(Ruling { x0: 0.0, y0: 5.0, x1: 100.0, y1: 5.0 }.horizontal());
        assert!(Ruling { x0: 5.0, y0: 0.0, x1: 5.0, y1: 100.0 }.vertical());
    }
}
