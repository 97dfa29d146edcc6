use serde::{Deserialize, Serialize};

/// Window origin in screen coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// Visible area of the screen a window is placed on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenFrame {
    pub origin: Point,
    pub size: Size,
}

impl ScreenFrame {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            origin: Point::new(x, y),
            size: Size::new(width, height),
        }
    }

    /// Origin that centres a window of `size` on this screen.
    pub fn centered(&self, size: Size) -> Point {
        Point::new(
            self.origin.x + (self.size.width - size.width) / 2.0,
            self.origin.y + (self.size.height - size.height) / 2.0,
        )
    }

    /// Whether a window of `size` placed at `origin` overlaps the screen.
    pub fn shows(&self, origin: Point, size: Size) -> bool {
        origin.is_finite()
            && origin.x + size.width > self.origin.x
            && origin.x < self.origin.x + self.size.width
            && origin.y + size.height > self.origin.y
            && origin.y < self.origin.y + self.size.height
    }
}
