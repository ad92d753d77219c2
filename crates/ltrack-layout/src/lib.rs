#![forbid(unsafe_code)]

//! Deterministic track/row layout for LineaTrack.
//!
//! # Role in LineaTrack
//! `ltrack-layout` turns the structure of a [`TrackGraph`] into a spatial
//! grid: one row per distinct time instant, one column band per track
//! (connected component), a pixel width and palette color per band, and a
//! grid slot per detection. It holds no state between passes; the caller
//! decides when a recomputation is warranted.
//!
//! # Determinism
//! Two passes over the same graph yield identical output. Rows come from a
//! sorted-unique instant list; tracks are ordered by earliest instant, then
//! by smallest member handle; members sharing an instant are placed in
//! ascending handle order. No iteration order of any hash table leaks into
//! the result.

/// Track color palette.
pub mod palette;

use ltrack_graph::{DetectionId, Instant, TrackGraph};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

pub use palette::{Rgb, TRACK_PALETTE, track_color};

// ============================================================================
// Grid constants
// ============================================================================

/// Vertical extent of one instant row, in pixels.
pub const ROW_HEIGHT: f64 = 96.0;
/// Horizontal extent of one column unit, in pixels.
pub const COLUMN_WIDTH: f64 = 160.0;
/// Width of a vertex cell, in pixels.
pub const CELL_WIDTH: f64 = 128.0;
/// Nominal height of a vertex cell, in pixels.
pub const CELL_HEIGHT: f64 = 80.0;
/// Smallest height a vertex cell may take.
pub const MIN_CELL_HEIGHT: f64 = 12.0;

/// Cell height for a detection radius under a calibration factor
/// (physical units per pixel).
///
/// The raw height is the rounded on-screen diameter; it is clamped to
/// `[MIN_CELL_HEIGHT, CELL_WIDTH]`. The upper bound is deliberately the
/// cell *width*: the source view has no separate max-height constant.
#[must_use]
pub fn clamped_cell_height(radius: f64, calibration: f64) -> f64 {
    let raw = (2.0 * radius / calibration).round();
    raw.clamp(MIN_CELL_HEIGHT, CELL_WIDTH)
}

/// Top-left position for a cell created outside a layout pass, staged to
/// the right of the occupied column span.
#[must_use]
pub fn staging_position(next_column: usize, row: usize) -> (f64, f64) {
    let x = (next_column as f64 - 2.0) * COLUMN_WIDTH - CELL_WIDTH / 2.0;
    let y = (0.5 + row as f64) * ROW_HEIGHT - CELL_HEIGHT / 2.0;
    (x, y)
}

// ============================================================================
// Layout output
// ============================================================================

/// One track's column band.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackColumn {
    /// First column unit of the band.
    pub offset: usize,
    /// Band width in column units (max detections sharing one instant).
    pub width: usize,
    /// Display color for the band.
    pub color: Rgb,
    /// Member detections, ascending.
    pub members: Vec<DetectionId>,
}

impl TrackColumn {
    /// Band width in pixels.
    #[must_use]
    pub fn pixel_width(&self) -> f64 {
        self.width as f64 * COLUMN_WIDTH
    }
}

/// Grid slot assigned to one detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellSlot {
    /// Absolute column unit.
    pub column: usize,
    /// Row index (instant rank).
    pub row: usize,
}

impl CellSlot {
    /// Top-left pixel position of a nominal cell in this slot.
    #[must_use]
    pub fn origin(self) -> (f64, f64) {
        let x = self.column as f64 * COLUMN_WIDTH + (COLUMN_WIDTH - CELL_WIDTH) / 2.0;
        let y = (0.5 + self.row as f64) * ROW_HEIGHT - CELL_HEIGHT / 2.0;
        (x, y)
    }
}

/// Result of one layout pass. Derived data only; recomputed wholesale.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemeLayout {
    /// Distinct instants, ascending; index = row.
    rows: Vec<Instant>,
    /// Track bands in column order.
    columns: Vec<TrackColumn>,
    /// Slot per detection, sorted by handle.
    slots: Vec<(DetectionId, CellSlot)>,
    /// Total occupied width in column units.
    next_column: usize,
    /// Physical units per pixel, captured at compute time.
    calibration: f64,
}

impl SchemeLayout {
    /// Row index of an instant, if it appeared in the computed graph.
    #[must_use]
    pub fn row_of(&self, instant: Instant) -> Option<usize> {
        self.rows.binary_search(&instant).ok()
    }

    /// Distinct instants in row order.
    #[must_use]
    pub fn rows(&self) -> &[Instant] {
        &self.rows
    }

    /// Number of rows.
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Track bands in column order.
    #[must_use]
    pub fn columns(&self) -> &[TrackColumn] {
        &self.columns
    }

    /// Grid slot of a detection.
    #[must_use]
    pub fn slot_of(&self, id: DetectionId) -> Option<CellSlot> {
        self.slots
            .binary_search_by_key(&id, |(d, _)| *d)
            .ok()
            .map(|i| self.slots[i].1)
    }

    /// All slots, sorted by handle.
    #[must_use]
    pub fn slots(&self) -> &[(DetectionId, CellSlot)] {
        &self.slots
    }

    /// Total occupied width in column units; the staging column for cells
    /// created between layout passes.
    #[must_use]
    pub fn next_column(&self) -> usize {
        self.next_column
    }

    /// Calibration factor the pass was computed with.
    #[must_use]
    pub fn calibration(&self) -> f64 {
        self.calibration
    }

    /// Pixel geometry `(x, y, width, height)` for a detection in its slot.
    #[must_use]
    pub fn cell_geometry(&self, id: DetectionId, radius: f64) -> Option<(f64, f64, f64, f64)> {
        let (x, y) = self.slot_of(id)?.origin();
        Some((x, y, CELL_WIDTH, clamped_cell_height(radius, self.calibration)))
    }
}

// ============================================================================
// Layout pass
// ============================================================================

/// Compute a layout for the current graph structure.
///
/// Pure: same graph and calibration in, same layout out.
#[must_use]
pub fn compute(graph: &TrackGraph, calibration: f64) -> SchemeLayout {
    // Row grid: sorted-unique instants, uniform even when irregularly spaced.
    let mut rows: Vec<Instant> = graph
        .detection_ids()
        .filter_map(|id| graph.detection(id).map(|d| d.instant()))
        .collect();
    rows.sort();
    rows.dedup();
    let row_of: FxHashMap<Instant, usize> = rows
        .iter()
        .enumerate()
        .map(|(row, &instant)| (instant, row))
        .collect();

    // Track order: earliest instant, then smallest member handle.
    let mut tracks = graph.components();
    tracks.sort_by_key(|members| {
        let earliest = members
            .iter()
            .filter_map(|&d| graph.detection(d).map(|det| det.instant()))
            .min();
        (earliest, members.first().copied())
    });

    let mut columns = Vec::with_capacity(tracks.len());
    let mut slots = Vec::new();
    let mut offset = 0usize;
    for (index, members) in tracks.into_iter().enumerate() {
        // Bucket members by row; ascending handle order within a bucket
        // is inherited from the sorted member list.
        let mut by_row: FxHashMap<usize, Vec<DetectionId>> = FxHashMap::default();
        for &id in &members {
            let Some(detection) = graph.detection(id) else {
                continue;
            };
            let Some(&row) = row_of.get(&detection.instant()) else {
                continue;
            };
            by_row.entry(row).or_default().push(id);
        }
        let width = by_row.values().map(Vec::len).max().unwrap_or(1);
        for (row, bucket) in by_row {
            for (lane, id) in bucket.into_iter().enumerate() {
                slots.push((
                    id,
                    CellSlot {
                        column: offset + lane,
                        row,
                    },
                ));
            }
        }
        columns.push(TrackColumn {
            offset,
            width,
            color: track_color(index),
            members,
        });
        offset += width;
    }
    slots.sort_by_key(|(id, _)| *id);

    SchemeLayout {
        rows,
        columns,
        slots,
        next_column: offset,
        calibration,
    }
}

// ============================================================================
// Tests
// ============================================================================
