use crate::geometry::{Point, Rect};

/// Pointer-drag state for drawing the screen rectangle.
///
/// Points are in container coordinates. The press must land inside the
/// image box, and later points are clamped to it so the finished rectangle
/// never leaves the image.
#[derive(Debug, Clone, Default)]
pub struct DragSelection {
    start: Option<Point>,
    end: Option<Point>,
    image_box: Option<Rect>,
    dragging: bool,
}

impl DragSelection {
    /// Starts a drag if `p` is inside `image_box`. Returns whether it did.
    pub fn press(&mut self, p: Point, image_box: Rect) -> bool {
        if image_box.is_degenerate() || !image_box.contains(p) {
            return false;
        }
        self.start = Some(p);
        self.end = Some(p);
        self.image_box = Some(image_box);
        self.dragging = true;
        true
    }

    /// Moves the free corner. Returns the live rectangle while dragging.
    pub fn update(&mut self, p: Point) -> Option<Rect> {
        if !self.dragging {
            return None;
        }
        let image_box = self.image_box?;
        self.end = Some(image_box.clamp_point(p));
        self.rect()
    }

    /// Ends the drag at `p`. The rectangle may still be degenerate.
    pub fn release(&mut self, p: Point) -> Option<Rect> {
        let rect = self.update(p)?;
        self.dragging = false;
        Some(rect)
    }

    /// Normalized rectangle between the start and end points.
    pub fn rect(&self) -> Option<Rect> {
        Some(Rect::from_corners(self.start?, self.end?))
    }

    pub fn image_box(&self) -> Option<Rect> {
        self.image_box
    }

    pub fn is_dragging(&self) -> bool {
        self.dragging
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}
