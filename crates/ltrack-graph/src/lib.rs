#![forbid(unsafe_code)]

//! Lineage graph model for LineaTrack.
//!
//! # Role in LineaTrack
//! `ltrack-graph` is the authoritative domain model: detections (tracked
//! objects at one time instant) connected by weighted temporal links. It
//! knows nothing about cells, layout, or selection; the view layer projects
//! it and the layout layer reads it.
//!
//! # This crate provides
//! - [`Detection`] and [`Instant`], the domain vertex and its row key.
//! - [`TrackGraph`], an arena-backed undirected weighted graph with stable
//!   `u32` handles and free-list slot reuse.
//! - [`ObservableTrackGraph`], the same graph with synchronous mutation
//!   notifications delivered in subscriber registration order.
//!
//! # How it fits in the system
//! `ltrack-layout` partitions a [`TrackGraph`] into tracks and assigns the
//! row/column grid; `ltrack-view` subscribes to an [`ObservableTrackGraph`]
//! and mirrors every structural mutation into its visual cell graph.

/// Detection model and time instants.
pub mod detection;
/// Arena-backed track graph.
pub mod graph;
/// Mutation notifications over the track graph.
pub mod observable;

pub use detection::{Detection, Instant};
pub use graph::{DetectionId, LinkError, LinkId, LinkRecord, TrackGraph};
pub use observable::{GraphEvent, ObservableTrackGraph, SubscriptionId};
