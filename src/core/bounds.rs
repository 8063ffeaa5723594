//! Stitch bounds tracking
//!
//! Encoders grow a bounding rectangle from every appended stitch; the
//! rectangle stays invalid until the first update.

use serde::{Deserialize, Serialize};

/// Axis-aligned bounding rectangle in millimeters
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    /// Smallest seen x coordinate
    pub min_x: f32,
    /// Smallest seen y coordinate
    pub min_y: f32,
    /// Largest seen x coordinate
    pub max_x: f32,
    /// Largest seen y coordinate
    pub max_y: f32,
    /// False until at least one point has been recorded
    pub valid: bool,
}

impl Bounds {
    /// Create an invalid, empty bounds rectangle
    pub fn new() -> Self {
        Self::default()
    }

    /// Grow the rectangle to include the given point
    pub fn update(&mut self, x: f32, y: f32) {
        if !self.valid {
            self.min_x = x;
            self.min_y = y;
            self.max_x = x;
            self.max_y = y;
            self.valid = true;
        } else {
            if x < self.min_x {
                self.min_x = x;
            }
            if y < self.min_y {
                self.min_y = y;
            }
            if x > self.max_x {
                self.max_x = x;
            }
            if y > self.max_y {
                self.max_y = y;
            }
        }
    }

    /// Width of the rectangle, zero while invalid
    pub fn width(&self) -> f32 {
        if self.valid {
            self.max_x - self.min_x
        } else {
            0.0
        }
    }

    /// Height of the rectangle, zero while invalid
    pub fn height(&self) -> f32 {
        if self.valid {
            self.max_y - self.min_y
        } else {
            0.0
        }
    }
}
