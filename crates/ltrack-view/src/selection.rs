#![forbid(unsafe_code)]

//! Native cell selection model.
//!
//! Keeps the insertion-ordered set of currently highlighted cells and
//! reports changes as [`SelectionDelta`]s. Event emission can be disabled
//! while the synchronizer swaps the selection wholesale, so a multi-step
//! swap surfaces as at most one delta.

use crate::cell::CellId;

/// Change notification from the selection model.
///
/// The field naming is inherited from the source view library, where the
/// meaning is inverted: `added` carries the cells that just LEFT the
/// selection, `removed` the cells that just ENTERED it. Consumers must use
/// [`SelectionDelta::deselected`] and [`SelectionDelta::selected`] rather
/// than trusting the field names.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SelectionDelta {
    /// Nominal "added" list: cells that ceased to be selected.
    pub added: Vec<CellId>,
    /// Nominal "removed" list: cells that became selected.
    pub removed: Vec<CellId>,
}

impl SelectionDelta {
    /// Cells that ceased to be selected.
    #[must_use]
    pub fn deselected(&self) -> &[CellId] {
        &self.added
    }

    /// Cells that became selected.
    #[must_use]
    pub fn selected(&self) -> &[CellId] {
        &self.removed
    }

    /// Whether the delta carries no transition at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// Insertion-ordered set of highlighted cells.
#[derive(Debug, Default)]
pub struct SelectionModel {
    cells: Vec<CellId>,
    events_enabled: bool,
}

impl SelectionModel {
    /// Create an empty selection with events enabled.
    #[must_use]
    pub fn new() -> Self {
        Self {
            cells: Vec::new(),
            events_enabled: true,
        }
    }

    /// Currently selected cells, in selection order.
    #[must_use]
    pub fn cells(&self) -> &[CellId] {
        &self.cells
    }

    /// Whether a cell is selected.
    #[must_use]
    pub fn contains(&self, cell: CellId) -> bool {
        self.cells.contains(&cell)
    }

    /// Number of selected cells.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Whether nothing is selected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Toggle event emission, returning the previous state.
    pub fn set_events_enabled(&mut self, enabled: bool) -> bool {
        std::mem::replace(&mut self.events_enabled, enabled)
    }

    /// Whether changes currently emit deltas.
    #[must_use]
    pub const fn events_enabled(&self) -> bool {
        self.events_enabled
    }

    /// Apply a change: select `add`, deselect `remove`.
    ///
    /// Returns the delta when events are enabled and anything actually
    /// changed; the delta fields carry the inverted naming documented on
    /// [`SelectionDelta`].
    pub fn change(&mut self, add: &[CellId], remove: &[CellId]) -> Option<SelectionDelta> {
        let mut left: Vec<CellId> = Vec::new();
        for &cell in remove {
            if self.cells.contains(&cell) && !left.contains(&cell) {
                left.push(cell);
            }
        }
        let mut entered: Vec<CellId> = Vec::new();
        for &cell in add {
            if !self.cells.contains(&cell) && !entered.contains(&cell) && !left.contains(&cell) {
                entered.push(cell);
            }
        }
        if left.is_empty() && entered.is_empty() {
            return None;
        }
        self.cells.retain(|c| !left.contains(c));
        self.cells.extend(entered.iter().copied());

        if !self.events_enabled {
            return None;
        }
        Some(SelectionDelta {
            added: left,
            removed: entered,
        })
    }

    /// Replace the whole selection.
    pub fn set(&mut self, cells: &[CellId]) -> Option<SelectionDelta> {
        let remove: Vec<CellId> = self
            .cells
            .iter()
            .copied()
            .filter(|c| !cells.contains(c))
            .collect();
        self.change(cells, &remove)
    }

    /// Deselect everything.
    pub fn clear(&mut self) -> Option<SelectionDelta> {
        let remove = self.cells.clone();
        self.change(&[], &remove)
    }

    /// Drop dead cells without emitting a delta. Used when cells are
    /// removed from the graph; the removal itself is the notification.
    pub fn prune(&mut self, removed: &[CellId]) {
        self.cells.retain(|c| !removed.contains(c));
    }
}
