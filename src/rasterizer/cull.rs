//! Early triangle rejection
//!
//! Tests run in a fixed order and the first failure wins, so the cheap
//! checks guard the arithmetic in the later ones.

use super::fixed::Fix16;
use super::math::Vec3;
use super::types::{TextureRegion, Triangle};

/// Signed area (in pixels², doubled) below which a triangle is degenerate
pub const DEGENERATE_AREA: Fix16 = Fix16::from_raw(66);

/// Why a triangle was not drawn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CullReason {
    /// Negative index or index past the projected vertex buffer
    InvalidTriangle,
    NoTexture,
    BehindCamera,
    OffScreen,
    SubPixel,
    Backfacing,
    Degenerate,
}

impl CullReason {
    pub const ALL: [CullReason; 7] = [
        CullReason::InvalidTriangle,
        CullReason::NoTexture,
        CullReason::BehindCamera,
        CullReason::OffScreen,
        CullReason::SubPixel,
        CullReason::Backfacing,
        CullReason::Degenerate,
    ];

    pub fn index(self) -> usize {
        self as usize
    }
}

/// A triangle that passed every test, ready to fill
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisibleTriangle {
    pub verts: [Vec3; 3],
    pub texture: TextureRegion,
}

/// Classify `tri` against the projected vertices and a `width` x `height`
/// viewport.
///
/// Front faces wind clockwise on screen (y down), giving a positive signed
/// area `(x1-x0)(y2-y0) - (y1-y0)(x2-x0)`.
pub fn cull_triangle(
    tri: &Triangle,
    projected: &[Vec3],
    texture: Option<TextureRegion>,
    width: usize,
    height: usize,
) -> Result<VisibleTriangle, CullReason> {
    let [i0, i1, i2] = tri.vertex_indices(projected.len()).ok_or(CullReason::InvalidTriangle)?;
    let texture = texture.ok_or(CullReason::NoTexture)?;
    let (v0, v1, v2) = (projected[i0], projected[i1], projected[i2]);

    if !v0.z.is_positive() && !v1.z.is_positive() && !v2.z.is_positive() {
        return Err(CullReason::BehindCamera);
    }

    let min_x = v0.x.min(v1.x).min(v2.x);
    let max_x = v0.x.max(v1.x).max(v2.x);
    let min_y = v0.y.min(v1.y).min(v2.y);
    let max_y = v0.y.max(v1.y).max(v2.y);

    let w = Fix16::from_int(width as i32);
    let h = Fix16::from_int(height as i32);
    if max_x < Fix16::ZERO || max_y < Fix16::ZERO || min_x >= w || min_y >= h {
        return Err(CullReason::OffScreen);
    }

    if max_x - min_x < Fix16::ONE && max_y - min_y < Fix16::ONE {
        return Err(CullReason::SubPixel);
    }

    let nz = signed_area(v0, v1, v2);
    if nz < 0 {
        return Err(CullReason::Backfacing);
    }
    if nz < DEGENERATE_AREA.raw() as i64 {
        return Err(CullReason::Degenerate);
    }

    Ok(VisibleTriangle { verts: [v0, v1, v2], texture })
}

/// `(x1-x0)(y2-y0) - (y1-y0)(x2-x0)` as raw Q16.16 in 64 bits; large
/// on-screen triangles overflow the 32-bit product.
fn signed_area(v0: Vec3, v1: Vec3, v2: Vec3) -> i64 {
    let ax = (v1.x - v0.x).raw() as i64;
    let ay = (v1.y - v0.y).raw() as i64;
    let bx = (v2.x - v0.x).raw() as i64;
    let by = (v2.y - v0.y).raw() as i64;
    (ax * by - ay * bx) >> 16
}
