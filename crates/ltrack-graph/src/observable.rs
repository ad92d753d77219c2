#![forbid(unsafe_code)]

//! Mutation notifications over the track graph.
//!
//! # Design
//!
//! [`ObservableTrackGraph`] wraps a [`TrackGraph`] and notifies subscribers
//! about every structural mutation, whoever performs it. Delivery is
//! synchronous, in registration order, and happens after the mutation has
//! been fully applied: a subscriber querying the graph observes the
//! post-mutation state, never a half-applied one.
//!
//! Cascade order is fixed: removing a detection first removes each incident
//! link (one [`GraphEvent::LinkRemoved`] apiece), then the detection itself
//! (one [`GraphEvent::DetectionRemoved`]).
//!
//! Attribute edits (rename, radius, weight) are not structural and pass
//! through silently.

use std::fmt;

use crate::detection::Detection;
use crate::graph::{DetectionId, LinkError, LinkId, TrackGraph};

/// A structural mutation of the track graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphEvent {
    DetectionAdded(DetectionId),
    DetectionRemoved(DetectionId),
    LinkAdded(LinkId),
    LinkRemoved(LinkId),
}

/// Handle for removing a subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u32);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "S{}", self.0)
    }
}

type Subscriber = Box<dyn FnMut(&TrackGraph, &GraphEvent)>;

/// A [`TrackGraph`] that announces its structural mutations.
pub struct ObservableTrackGraph {
    graph: TrackGraph,
    subscribers: Vec<(SubscriptionId, Subscriber)>,
    next_subscription: u32,
}

impl fmt::Debug for ObservableTrackGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObservableTrackGraph")
            .field("graph", &self.graph)
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}

impl ObservableTrackGraph {
    /// Wrap an existing graph.
    #[must_use]
    pub fn new(graph: TrackGraph) -> Self {
        Self {
            graph,
            subscribers: Vec::new(),
            next_subscription: 0,
        }
    }

    /// Read access to the wrapped graph.
    #[must_use]
    pub fn graph(&self) -> &TrackGraph {
        &self.graph
    }

    /// Clone the wrapped graph as a snapshot.
    #[must_use]
    pub fn snapshot(&self) -> TrackGraph {
        self.graph.clone()
    }

    /// Register a subscriber. Subscribers run synchronously after each
    /// mutation, in registration order.
    pub fn subscribe(&mut self, subscriber: Subscriber) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.subscribers.push((id, subscriber));
        id
    }

    /// Remove a subscriber. Removing one that is already gone is a no-op.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(s, _)| *s != id);
        self.subscribers.len() != before
    }

    /// Insert a detection and announce it.
    pub fn add_detection(&mut self, detection: Detection) -> DetectionId {
        let id = self.graph.add_detection(detection);
        self.notify(GraphEvent::DetectionAdded(id));
        id
    }

    /// Remove a detection, announcing each cascaded link first and the
    /// detection last.
    pub fn remove_detection(&mut self, id: DetectionId) -> bool {
        if !self.graph.contains(id) {
            return false;
        }
        for link in self.graph.incident_links(id) {
            self.graph.remove_link(link);
            self.notify(GraphEvent::LinkRemoved(link));
        }
        if self.graph.remove_detection(id).is_none() {
            return false;
        }
        self.notify(GraphEvent::DetectionRemoved(id));
        true
    }

    /// Insert a link and announce it.
    pub fn add_link(
        &mut self,
        a: DetectionId,
        b: DetectionId,
        weight: f64,
    ) -> Result<LinkId, LinkError> {
        let id = self.graph.add_link(a, b, weight)?;
        self.notify(GraphEvent::LinkAdded(id));
        Ok(id)
    }

    /// Remove a link and announce it.
    pub fn remove_link(&mut self, id: LinkId) -> bool {
        if self.graph.remove_link(id).is_none() {
            return false;
        }
        self.notify(GraphEvent::LinkRemoved(id));
        true
    }

    /// Mutable access to a detection's attributes. Not structural.
    #[must_use]
    pub fn detection_mut(&mut self, id: DetectionId) -> Option<&mut Detection> {
        self.graph.detection_mut(id)
    }

    /// Update a link weight. Not structural.
    pub fn set_weight(&mut self, id: LinkId, weight: f64) -> bool {
        self.graph.set_weight(id, weight)
    }

    fn notify(&mut self, event: GraphEvent) {
        for (_, subscriber) in &mut self.subscribers {
            subscriber(&self.graph, &event);
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
