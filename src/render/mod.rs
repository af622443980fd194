pub mod layout;
pub mod mapper;

pub use layout::frame_display_size;
pub use mapper::{CutoutPlacement, RenderMapper, ScreenCutout};
