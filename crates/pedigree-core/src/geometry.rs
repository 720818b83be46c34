//! Geometric primitives for pedigree layout.
//!
//! The layout engine works in *relative units*: a person node is one unit
//! wide by default and every other width and gap is expressed relative to it.
//! Rendering collaborators scale these units to pixels.
//!
//! # Coordinate System
//!
//! ```text
//!   (0,0) ────────► +X   (order within a rank)
//!     │
//!     ▼
//!    +Y                  (rank, i.e. generation)
//! ```

use serde::Serialize;

/// A 2D point representing a position in diagram coordinate space.
///
/// # Examples
///
/// ```
/// # use pedigree_core::geometry::Point;
/// let p = Point::new(10.0, 20.0);
/// assert_eq!(p.x(), 10.0);
/// assert_eq!(p.y(), 20.0);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Point {
    x: f32,
    y: f32,
}

impl Point {
    /// Creates a new point with the specified coordinates
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Returns the x-coordinate of the point
    pub fn x(self) -> f32 {
        self.x
    }

    /// Returns the y-coordinate of the point
    pub fn y(self) -> f32 {
        self.y
    }
}
