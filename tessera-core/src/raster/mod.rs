//! The export surface: full-raster evaluation, direct or via the tile
//! cache.

mod frame;
mod render;

pub use frame::FrameRgba;
pub use render::{render_frame, render_frame_tiled};
