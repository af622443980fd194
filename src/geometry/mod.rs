pub mod contain;
pub mod types;

pub use contain::{contain_fit, fraction_to_pixel, pixel_to_fraction};
pub use types::{ContainFit, Point, Rect, Size};
