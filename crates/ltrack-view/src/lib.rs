#![forbid(unsafe_code)]

//! Visual cell graph and synchronization for LineaTrack.
//!
//! # Role in LineaTrack
//! `ltrack-view` keeps two independently mutable structures consistent: the
//! observable track graph (edited by tracking code) and the visual cell
//! graph (edited by direct user interaction). The [`SchemeView`] handle
//! owns both sides, the identity map between them, the selection
//! synchronizer, and the listener registries.
//!
//! # This crate provides
//! - [`CellGraph`] — the cell arena with reentrant update transactions and
//!   combined change notifications.
//! - [`SelectionModel`] — the native selection set with its historically
//!   inverted change-delta naming, preserved and documented.
//! - [`IdentityMap`] — the bidirectional detection/link ↔ cell relation.
//! - [`SchemeView`] — the top-level handle: materialization, propagation,
//!   highlighting, layout application, and consistency checking.
//!
//! # How it fits in the system
//! Tracking code feeds [`CollectionEvent`] batches in and mutates the graph
//! through [`SchemeView::graph_mut`]; a renderer reads cells and the layout
//! out; hosts observe [`GraphListener`] and [`SelectionListener`]
//! callbacks for view-origin edits and settled selection changes.

/// Visual cell model.
pub mod cell;
/// Cell arena with transactional change notification.
pub mod cell_graph;
/// View configuration.
pub mod config;
/// Detection/link ↔ cell associations.
pub mod identity;
/// The top-level scheme view.
pub mod scheme;
/// Native cell selection model.
pub mod selection;

pub use cell::{Cell, CellId, CellKind, CellStyle, Geometry};
pub use cell_graph::{CellChange, CellGraph, CellGraphError, ObserverId};
pub use config::SchemeConfig;
pub use identity::IdentityMap;
pub use scheme::{
    CollectionEvent, ConsistencyError, GraphListener, ListenerId, SchemeView, SelectionChange,
    SelectionListener,
};
pub use selection::{SelectionDelta, SelectionModel};
