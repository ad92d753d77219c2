#![forbid(unsafe_code)]

//! Track color palette.

use serde::{Deserialize, Serialize};

/// A 24-bit color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    /// Create a color from components.
    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// CSS-style hex rendering, e.g. `#FF00FF`.
    #[must_use]
    pub fn hex(self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

/// Fixed palette cycled across track columns.
///
/// Hues are interleaved so consecutive columns draw from different color
/// classes; with more tracks than entries the cycle wraps.
pub const TRACK_PALETTE: [Rgb; 12] = [
    Rgb::new(0x1F, 0x77, 0xB4), // blue
    Rgb::new(0xFF, 0x7F, 0x0E), // orange
    Rgb::new(0x2C, 0xA0, 0x2C), // green
    Rgb::new(0xD6, 0x27, 0x28), // red
    Rgb::new(0x94, 0x67, 0xBD), // purple
    Rgb::new(0x8C, 0x56, 0x4B), // brown
    Rgb::new(0xE3, 0x77, 0xC2), // pink
    Rgb::new(0xBC, 0xBD, 0x22), // olive
    Rgb::new(0x17, 0xBE, 0xCF), // cyan
    Rgb::new(0xFF, 0xBB, 0x78), // light orange
    Rgb::new(0x98, 0xDF, 0x8A), // light green
    Rgb::new(0xAE, 0xC7, 0xE8), // light blue
];

/// Color for a track column index.
#[must_use]
pub const fn track_color(column: usize) -> Rgb {
    TRACK_PALETTE[column % TRACK_PALETTE.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn palette_cycles() {
        assert_eq!(track_color(0), track_color(TRACK_PALETTE.len()));
        assert_ne!(track_color(0), track_color(1));
    }

    #[test]
    fn hex_renders_uppercase() {
        assert_eq!(Rgb::new(255, 0, 255).hex(), "#FF00FF");
    }
}
