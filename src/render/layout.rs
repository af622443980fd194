use crate::geometry::Size;

/// On-screen size for a custom frame: natural size, capped to `max_width`
/// for landscape images and to `max_height` otherwise, aspect preserved.
///
/// `None` when the natural size is unknown.
pub fn frame_display_size(natural_width: u32, natural_height: u32, max_width: f64, max_height: f64) -> Option<Size> {
    if natural_width == 0 || natural_height == 0 {
        return None;
    }
    let nw = natural_width as f64;
    let nh = natural_height as f64;

    if nw > nh {
        let width = max_width.min(nw);
        Some(Size::new(width, nh / nw * width))
    } else {
        let height = max_height.min(nh);
        Some(Size::new(nw / nh * height, height))
    }
}
