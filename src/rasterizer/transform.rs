//! Camera-space to screen projection

use super::fixed::Fix16;
use super::math::{Mat34, Vec3};
use super::types::RasterSettings;

/// Perspective factors above this are treated as too close to draw
pub const MAX_PERSPECTIVE: Fix16 = Fix16::from_int(10);

/// Screen mapping: `c = proj_const / z`, `x' = cx + x*c`, `y' = cy - y*c`.
///
/// The projected vertex keeps `c` in its z component (0 when unusable)
/// rather than depth. Culling and depth sorting read it from there.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Projection {
    pub center_x: Fix16,
    pub center_y: Fix16,
    pub proj_const: Fix16,
}

impl Default for Projection {
    fn default() -> Self {
        Self::from_settings(&RasterSettings::default())
    }
}

impl Projection {
    pub fn new(center_x: Fix16, center_y: Fix16, proj_const: Fix16) -> Self {
        Self { center_x, center_y, proj_const }
    }

    pub fn from_settings(settings: &RasterSettings) -> Self {
        Self::new(
            Fix16::from_f32(settings.center_x),
            Fix16::from_f32(settings.center_y),
            Fix16::from_f32(settings.proj_const),
        )
    }

    /// Transform a model-space point by `mat` and project it
    pub fn transform_pos(&self, mat: &Mat34, pos: Vec3) -> Vec3 {
        self.project(mat.mul_pos(pos))
    }

    /// Project a camera-space point
    pub fn project(&self, p: Vec3) -> Vec3 {
        let c = self.proj_const / p.z;
        let z = if c.is_positive() && c <= MAX_PERSPECTIVE { c } else { Fix16::ZERO };
        Vec3 {
            x: self.center_x + p.x * c,
            y: self.center_y - p.y * c,
            z,
        }
    }

    /// Project every vertex into `out`, which must be at least as long
    pub fn project_all(&self, mat: &Mat34, vertices: &[Vec3], out: &mut [Vec3]) {
        for (dst, &v) in out.iter_mut().zip(vertices) {
            *dst = self.transform_pos(mat, v);
        }
    }
}
