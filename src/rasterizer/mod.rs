//! Fixed-point software rasterizer for handheld hardware
//!
//! Features:
//! - Q16.16 math throughout (no FPU on the target)
//! - Affine texture mapping per scanline
//! - Two-level lighting with an 8x8 ordered dither between texture regions
//! - Painter's algorithm (per-instance back-to-front sort, no z-buffer)
//! - Paletted output through a remappable 16-color palette

mod cull;
mod decode;
mod fixed;
mod frame;
mod math;
mod render;
mod sort;
mod transform;
mod types;

pub use cull::*;
pub use decode::*;
pub use fixed::*;
pub use frame::*;
pub use math::*;
pub use render::*;
pub use sort::*;
pub use transform::*;
pub use types::*;

/// Screen dimensions of the target handheld
pub const WIDTH: usize = 160;
pub const HEIGHT: usize = 128;
