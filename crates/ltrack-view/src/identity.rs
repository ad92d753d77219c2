#![forbid(unsafe_code)]

//! Bidirectional detection/link ↔ cell associations.
//!
//! A pure relation: it owns neither side, and every association is stored
//! in both directions so removal of one side always clears the other. No
//! dangling one-sided entry can exist between public calls.

use ltrack_graph::{DetectionId, LinkId};
use rustc_hash::FxHashMap;

use crate::cell::CellId;

/// The identity map between domain objects and visual cells.
#[derive(Debug, Default)]
pub struct IdentityMap {
    detection_to_cell: FxHashMap<DetectionId, CellId>,
    cell_to_detection: FxHashMap<CellId, DetectionId>,
    link_to_cell: FxHashMap<LinkId, CellId>,
    cell_to_link: FxHashMap<CellId, LinkId>,
}

impl IdentityMap {
    /// Create an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Associate a detection with its vertex-cell, evicting any stale
    /// pairing of either key first.
    pub fn insert_detection(&mut self, detection: DetectionId, cell: CellId) {
        self.remove_detection(detection);
        self.remove_cell(cell);
        self.detection_to_cell.insert(detection, cell);
        self.cell_to_detection.insert(cell, detection);
    }

    /// Associate a link with its edge-cell, evicting any stale pairing of
    /// either key first.
    pub fn insert_link(&mut self, link: LinkId, cell: CellId) {
        self.remove_link(link);
        self.remove_cell(cell);
        self.link_to_cell.insert(link, cell);
        self.cell_to_link.insert(cell, link);
    }

    /// Cell of a detection.
    #[must_use]
    pub fn cell_of_detection(&self, detection: DetectionId) -> Option<CellId> {
        self.detection_to_cell.get(&detection).copied()
    }

    /// Cell of a link.
    #[must_use]
    pub fn cell_of_link(&self, link: LinkId) -> Option<CellId> {
        self.link_to_cell.get(&link).copied()
    }

    /// Detection of a cell.
    #[must_use]
    pub fn detection_of(&self, cell: CellId) -> Option<DetectionId> {
        self.cell_to_detection.get(&cell).copied()
    }

    /// Link of a cell.
    #[must_use]
    pub fn link_of(&self, cell: CellId) -> Option<LinkId> {
        self.cell_to_link.get(&cell).copied()
    }

    /// Drop a detection association (both directions). Idempotent.
    pub fn remove_detection(&mut self, detection: DetectionId) -> Option<CellId> {
        let cell = self.detection_to_cell.remove(&detection)?;
        self.cell_to_detection.remove(&cell);
        Some(cell)
    }

    /// Drop a link association (both directions). Idempotent.
    pub fn remove_link(&mut self, link: LinkId) -> Option<CellId> {
        let cell = self.link_to_cell.remove(&link)?;
        self.cell_to_link.remove(&cell);
        Some(cell)
    }

    /// Drop whatever association a cell participates in. Idempotent.
    pub fn remove_cell(&mut self, cell: CellId) {
        if let Some(detection) = self.cell_to_detection.remove(&cell) {
            self.detection_to_cell.remove(&detection);
        }
        if let Some(link) = self.cell_to_link.remove(&cell) {
            self.link_to_cell.remove(&link);
        }
    }

    /// Mapped detections, unordered.
    pub fn detections(&self) -> impl Iterator<Item = (DetectionId, CellId)> + '_ {
        self.detection_to_cell.iter().map(|(&d, &c)| (d, c))
    }

    /// Mapped links, unordered.
    pub fn links(&self) -> impl Iterator<Item = (LinkId, CellId)> + '_ {
        self.link_to_cell.iter().map(|(&l, &c)| (l, c))
    }

    /// Number of detection associations.
    #[must_use]
    pub fn detection_len(&self) -> usize {
        self.detection_to_cell.len()
    }

    /// Number of link associations.
    #[must_use]
    pub fn link_len(&self) -> usize {
        self.link_to_cell.len()
    }

    /// Whether both directions of both tables agree. Cheap enough for
    /// assertions in tests and property suites.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.detection_to_cell.len() == self.cell_to_detection.len()
            && self.link_to_cell.len() == self.cell_to_link.len()
            && self
                .detection_to_cell
                .iter()
                .all(|(d, c)| self.cell_to_detection.get(c) == Some(d))
            && self
                .link_to_cell
                .iter()
                .all(|(l, c)| self.cell_to_link.get(c) == Some(l))
    }
}
