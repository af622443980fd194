use serde::{Deserialize, Serialize};

/// A point in some 2-D pixel space. Which space is up to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn is_positive(&self) -> bool {
        self.width > 0.0 && self.height > 0.0
    }
}

/// Axis-aligned rectangle, origin at the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    /// Rectangle spanned by two corners given in any order.
    pub fn from_corners(a: Point, b: Point) -> Self {
        let x = a.x.min(b.x);
        let y = a.y.min(b.y);
        Self {
            x,
            y,
            width: a.x.max(b.x) - x,
            height: a.y.max(b.y) - y,
        }
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    /// Edges are inclusive, so a press exactly on the border counts.
    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.x && p.x <= self.right() && p.y >= self.y && p.y <= self.bottom()
    }

    pub fn clamp_point(&self, p: Point) -> Point {
        Point::new(p.x.clamp(self.x, self.right()), p.y.clamp(self.y, self.bottom()))
    }

    pub fn is_degenerate(&self) -> bool {
        !(self.width > 0.0 && self.height > 0.0)
    }
}

/// Outcome of laying content out under the "contain" policy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ContainFit {
    pub rendered_width: f64,
    pub rendered_height: f64,
    pub offset_x: f64,
    pub offset_y: f64,
}

impl ContainFit {
    /// The rendered content box in container coordinates.
    pub fn content_rect(&self) -> Rect {
        Rect::new(self.offset_x, self.offset_y, self.rendered_width, self.rendered_height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_corners_ignores_drag_direction() {
        let expected = Rect::new(10.0, 20.0, 30.0, 40.0);
        let tl = Point::new(10.0, 20.0);
        let br = Point::new(40.0, 60.0);
        let tr = Point::new(40.0, 20.0);
        let bl = Point::new(10.0, 60.0);
        assert_eq!(Rect::from_corners(tl, br), expected);
        assert_eq!(Rect::from_corners(br, tl), expected);
        assert_eq!(Rect::from_corners(tr, bl), expected);
        assert_eq!(Rect::from_corners(bl, tr), expected);
    }

    #[test]
    fn clamp_and_contains() {
        let r = Rect::new(0.0, 0.0, 100.0, 50.0);
        assert!(r.contains(Point::new(100.0, 50.0)));
        assert!(!r.contains(Point::new(100.1, 10.0)));
        assert_eq!(r.clamp_point(Point::new(-5.0, 70.0)), Point::new(0.0, 50.0));
    }
}
