//! Axis-aligned rectangle math used for collision checks

/// An axis-aligned rectangle. `y` grows downward.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Overlap test on both axes with half-open intervals, so rectangles
    /// that only share an edge do not intersect.
    pub fn intersects(&self, other: &Rect) -> bool {
        self.x < other.x + other.width
            && other.x < self.x + self.width
            && self.y < other.y + other.height
            && other.y < self.y + self.height
    }
}

/// Free-function form of [`Rect::intersects`]
pub fn intersects(a: &Rect, b: &Rect) -> bool {
    a.intersects(b)
}
