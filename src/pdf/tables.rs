//! Table region detection
//!
//! Lattice detection over the ruling segments collected from the content
//! stream: connected rulings are clustered, their distinct coordinates
//! snapped into row and column edges, and the page's text spans distributed
//! into the resulting grid. A grid slot with no text of its own (whether a
//! genuinely empty cell or one absorbed by a merge) stays `None`; the
//! layout engine's span inference disambiguates.

use tracing::warn;

use super::primitives::{BoundingBox, Ruling, TableRegion, TextSpan};

#[derive(Debug, Clone)]
pub struct TableDetectorConfig {
    /// Merge edge coordinates closer than this (native units)
    pub snap_tolerance: f32,
    /// Rulings closer than this are considered connected
    pub join_tolerance: f32,
    /// Minimum grid size to call a cluster a table
    pub min_rows: usize,
    pub min_cols: usize,
    /// Tolerance when grouping a cell's spans into text lines
    pub line_tolerance: f32,
}

impl Default for TableDetectorConfig {
    fn default() -> Self {
        Self {
            snap_tolerance: 3.0,
            join_tolerance: 3.0,
            min_rows: 2,
            min_cols: 2,
            line_tolerance: 2.0,
        }
    }
}

/// Detect the table regions of a page
pub fn detect_tables(
    rulings: &[Ruling],
    spans: &[TextSpan],
    config: &TableDetectorConfig,
) -> Vec<TableRegion> {
    if rulings.is_empty() {
        return Vec::new();
    }

    let mut tables = Vec::new();
    for cluster in cluster_rulings(rulings, config.join_tolerance) {
        let mut row_edges = Vec::new();
        let mut col_edges = Vec::new();
        for ruling in &cluster {
            if ruling.horizontal() {
                row_edges.push((ruling.y0 + ruling.y1) / 2.0);
            } else {
                col_edges.push((ruling.x0 + ruling.x1) / 2.0);
            }
        }
        let row_edges = snap(row_edges, config.snap_tolerance);
        let col_edges = snap(col_edges, config.snap_tolerance);

        if row_edges.len() < config.min_rows + 1 || col_edges.len() < config.min_cols + 1 {
            continue;
        }

        let rows = row_edges.len() - 1;
        let cols = col_edges.len() - 1;
        let bbox = BoundingBox::new(
            col_edges[0],
            row_edges[0],
            col_edges[cols],
            row_edges[rows],
        );

        let cells = fill_grid(&bbox, rows, cols, &row_edges, &col_edges, spans, config);

        match TableRegion::new(bbox, rows, cols, cells, row_edges, col_edges) {
            Ok(region) => tables.push(region),
            Err(e) => warn!(error = %e, "discarding malformed table cluster"),
        }
    }

    tables.sort_by(|a, b| {
        (a.bbox.y0, a.bbox.x0)
            .partial_cmp(&(b.bbox.y0, b.bbox.x0))
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    tables
}

/// Group rulings into connected clusters by expanded-bbox overlap
fn cluster_rulings(rulings: &[Ruling], tolerance: f32) -> Vec<Vec<Ruling>> {
    let mut clusters: Vec<(BoundingBox, Vec<Ruling>)> = Vec::new();

    for &ruling in rulings {
        let bbox = BoundingBox::new(
            ruling.x0 - tolerance,
            ruling.y0 - tolerance,
            ruling.x1 + tolerance,
            ruling.y1 + tolerance,
        );

        // Collect every existing cluster this ruling touches, then merge
        let mut merged: Vec<usize> = clusters
            .iter()
            .enumerate()
            .filter(|(_, (cb, _))| cb.intersects(&bbox))
            .map(|(i, _)| i)
            .collect();

        if merged.is_empty() {
            clusters.push((bbox, vec![ruling]));
            continue;
        }

        let target = merged.remove(0);
        clusters[target].1.push(ruling);
        let mut cb = union(clusters[target].0, bbox);

        // Absorb the remaining touched clusters, highest index first
        for &i in merged.iter().rev() {
            let (other_bbox, mut other) = clusters.swap_remove(i);
            cb = union(cb, other_bbox);
            clusters[target].1.append(&mut other);
        }
        clusters[target].0 = cb;
    }

    clusters.into_iter().map(|(_, rulings)| rulings).collect()
}

fn union(a: BoundingBox, b: BoundingBox) -> BoundingBox {
    BoundingBox::new(
        a.x0.min(b.x0),
        a.y0.min(b.y0),
        a.x1.max(b.x1),
        a.y1.max(b.y1),
    )
}

/// Sort coordinates and merge groups within tolerance into their average
fn snap(mut values: Vec<f32>, tolerance: f32) -> Vec<f32> {
    if values.is_empty() {
        return values;
    }
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let mut snapped = Vec::new();
    let mut group = vec![values[0]];
    for &v in &values[1..] {
        if v - group.last().copied().unwrap_or(v) <= tolerance {
            group.push(v);
        } else {
            snapped.push(group.iter().sum::<f32>() / group.len() as f32);
            group = vec![v];
        }
    }
    snapped.push(group.iter().sum::<f32>() / group.len() as f32);
    snapped
}

/// Distribute span text into grid slots by span center
fn fill_grid(
    bbox: &BoundingBox,
    rows: usize,
    cols: usize,
    row_edges: &[f32],
    col_edges: &[f32],
    spans: &[TextSpan],
    config: &TableDetectorConfig,
) -> Vec<Option<String>> {
    let mut slot_spans: Vec<Vec<&TextSpan>> = vec![Vec::new(); rows * cols];

    for span in spans {
        let (cx, cy) = span.bbox.center();
        if !bbox.contains_point(cx, cy) {
            continue;
        }
        let Some(row) = edge_index(row_edges, cy) else { continue };
        let Some(col) = edge_index(col_edges, cx) else { continue };
        slot_spans[row * cols + col].push(span);
    }

    slot_spans
        .into_iter()
        .map(|mut cell| {
            if cell.is_empty() {
                return None;
            }
            cell.sort_by(|a, b| {
                (a.bbox.y0, a.bbox.x0)
                    .partial_cmp(&(b.bbox.y0, b.bbox.x0))
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
            Some(join_cell_text(&cell, config.line_tolerance))
        })
        .collect()
}

/// Index of the interval containing `v` in an ascending edge list
fn edge_index(edges: &[f32], v: f32) -> Option<usize> {
    for i in 0..edges.len().saturating_sub(1) {
        if v >= edges[i] && v < edges[i + 1] {
            return Some(i);
        }
    }
    None
}

/// Join a cell's spans: same-baseline spans with spaces, distinct
/// baselines with newlines
fn join_cell_text(spans: &[&TextSpan], line_tolerance: f32) -> String {
    let mut lines: Vec<String> = Vec::new();
    let mut current_y = f32::MIN;

    for span in spans {
        let text = span.text.trim();
        if text.is_empty() {
            continue;
        }
        if (span.bbox.y0 - current_y).abs() <= line_tolerance && !lines.is_empty() {
            let last = lines.last_mut().expect("non-empty lines");
            last.push(' ');
            last.push_str(text);
        } else {
            lines.push(text.to_string());
            current_y = span.bbox.y0;
        }
    }
    lines.join("\n")
}
