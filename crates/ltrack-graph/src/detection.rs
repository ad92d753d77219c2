#![forbid(unsafe_code)]

//! Detection model and time instants.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

/// Acquisition time of a detection, used as the row key in layout.
///
/// The upstream feature store carries time as a float, so this wraps `f32`
/// with a total order (`f32::total_cmp`) and bit-level hashing to make it
/// usable as a map/sort key. `-0.0` is canonicalized to `0.0` on
/// construction so the two zeros land on one row.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Instant(f32);

impl Instant {
    /// Wrap a raw time value.
    #[must_use]
    pub fn new(value: f32) -> Self {
        if value == 0.0 { Self(0.0) } else { Self(value) }
    }

    /// Get the raw time value.
    #[must_use]
    pub const fn get(self) -> f32 {
        self.0
    }
}

impl PartialEq for Instant {
    fn eq(&self, other: &Self) -> bool {
        self.0.total_cmp(&other.0) == Ordering::Equal
    }
}

impl Eq for Instant {}

impl PartialOrd for Instant {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Instant {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl Hash for Instant {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u32(self.0.to_bits());
    }
}

impl From<f32> for Instant {
    fn from(value: f32) -> Self {
        Self::new(value)
    }
}

impl fmt::Display for Instant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t{}", self.0)
    }
}

/// A tracked object at one time instant.
///
/// Owned by the graph arena; addressed through
/// [`DetectionId`](crate::graph::DetectionId). The thumbnail payload is an
/// opaque byte blob used only for presentation (the view embeds it in the
/// cell style as a base64 image reference).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    name: String,
    instant: Instant,
    radius: f64,
    #[serde(default)]
    thumbnail: Vec<u8>,
}

impl Detection {
    /// Create a detection with an empty thumbnail.
    #[must_use]
    pub fn new(name: impl Into<String>, instant: impl Into<Instant>, radius: f64) -> Self {
        Self {
            name: name.into(),
            instant: instant.into(),
            radius,
            thumbnail: Vec::new(),
        }
    }

    /// Attach a thumbnail payload.
    #[must_use]
    pub fn with_thumbnail(mut self, bytes: impl Into<Vec<u8>>) -> Self {
        self.thumbnail = bytes.into();
        self
    }

    /// Display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Rename the detection.
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Acquisition time.
    #[must_use]
    pub const fn instant(&self) -> Instant {
        self.instant
    }

    /// Spatial extent in physical units.
    #[must_use]
    pub const fn radius(&self) -> f64 {
        self.radius
    }

    /// Update the spatial extent.
    pub const fn set_radius(&mut self, radius: f64) {
        self.radius = radius;
    }

    /// Raw thumbnail payload (may be empty).
    #[must_use]
    pub fn thumbnail(&self) -> &[u8] {
        &self.thumbnail
    }

    /// Replace the thumbnail payload.
    pub fn set_thumbnail(&mut self, bytes: impl Into<Vec<u8>>) {
        self.thumbnail = bytes.into();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instant_orders_totally() {
        let a = Instant::new(1.0);
        let b = Instant::new(2.5);
        assert!(a < b);
        assert_eq!(Instant::new(1.0), a);
    }

    #[test]
    fn instant_canonicalizes_negative_zero() {
        assert_eq!(Instant::new(-0.0), Instant::new(0.0));
        assert_eq!(Instant::new(-0.0).get().to_bits(), 0.0_f32.to_bits());
    }

    #[test]
    fn instant_hash_agrees_with_eq() {
        use std::collections::HashSet;
        let mut set = HashSet::new();
        set.insert(Instant::new(-0.0));
        assert!(set.contains(&Instant::new(0.0)));
    }

    #[test]
    fn detection_builder() {
        let det = Detection::new("spot 1", 3.0, 2.5).with_thumbnail(vec![1, 2, 3]);
        assert_eq!(det.name(), "spot 1");
        assert_eq!(det.instant(), Instant::new(3.0));
        assert_eq!(det.radius(), 2.5);
        assert_eq!(det.thumbnail(), &[1, 2, 3]);
    }
}
