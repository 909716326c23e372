//! Hyperspace Engine: fixed-point software rasterizer for handheld hardware
//!
//! Textured triangle meshes go through camera space into a paletted pixel
//! buffer with no FPU and no GPU:
//! - Q16.16 math with lookup-table trigonometry and reciprocals
//! - Meshes decoded from a signed-byte stream in cart map memory
//! - Scanline fill, affine texturing, dithered two-level lighting
//! - Per-instance back-to-front sorting and early culling

/// Version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod assets;
pub mod config;
pub mod logging;
pub mod rasterizer;
pub mod scene;
