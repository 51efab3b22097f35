//! Vector math over normalized landmark coordinates
//!
//! All inputs are in the detector's normalized space (`0.0..=1.0` on both
//! axes, origin top-left, y growing downwards).

use crate::landmarks::Point;

/// Minimum MCP-to-tip distance for a finger to count as extended.
///
/// Rejects hands rotated so that vertical ordering alone would report a
/// curled finger as extended.
pub const MIN_EXTENSION_DISTANCE: f32 = 0.05;

/// Euclidean distance between two landmarks
pub fn distance(a: Point, b: Point) -> f32 {
    (a.x - b.x).hypot(a.y - b.y)
}

/// Vector pointing from `from` to `to`
pub fn vector(from: Point, to: Point) -> (f32, f32) {
    (to.x - from.x, to.y - from.y)
}

/// Length of a 2D vector
pub fn magnitude(v: (f32, f32)) -> f32 {
    v.0.hypot(v.1)
}

/// Whether the finger described by the `mcp`/`pip`/`tip` joint indices is extended.
///
/// True iff the tip sits above the PIP joint and is far enough from the
/// knuckle.
pub fn is_finger_extended(lm: &[Point], mcp: usize, pip: usize, tip: usize) -> bool {
    lm[tip].y < lm[pip].y && distance(lm[mcp], lm[tip]) > MIN_EXTENSION_DISTANCE
}
