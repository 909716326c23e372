//! Fixed-point vector and matrix math
//!
//! Matrices are 3x4, row-major: a 3x3 rotation with the translation in the
//! last column. The implied bottom row is (0, 0, 0, 1).

use std::ops::{Add, Mul, Neg, Sub};

use super::fixed::Fix16;

/// 3D Vector
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Vec3 {
    pub x: Fix16,
    pub y: Fix16,
    pub z: Fix16,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3 { x: Fix16::ZERO, y: Fix16::ZERO, z: Fix16::ZERO };

    pub const fn new(x: Fix16, y: Fix16, z: Fix16) -> Self {
        Self { x, y, z }
    }

    /// Host-side constructor for assets and tests
    pub fn from_f32(x: f32, y: f32, z: f32) -> Self {
        Self::new(Fix16::from_f32(x), Fix16::from_f32(y), Fix16::from_f32(z))
    }

    pub fn dot(self, other: Vec3) -> Fix16 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    pub fn len(self) -> Fix16 {
        self.dot(self).sqrt()
    }

    /// Unit vector in the same direction. Zero stays zero.
    ///
    /// Components are pre-scaled by 1/10 so the squared length of vectors up
    /// to ~1800 units long still fits in Q16.16.
    pub fn normalize(self) -> Vec3 {
        let shrunk = self.scale(Fix16::from_raw(6554));
        let l = shrunk.len();
        if l == Fix16::ZERO {
            return Vec3::ZERO;
        }
        shrunk.scale(l.recip())
    }

    pub fn scale(self, s: Fix16) -> Vec3 {
        Vec3 {
            x: self.x * s,
            y: self.y * s,
            z: self.z * s,
        }
    }
}

impl Add for Vec3 {
    type Output = Vec3;
    fn add(self, other: Vec3) -> Vec3 {
        Vec3 {
            x: self.x + other.x,
            y: self.y + other.y,
            z: self.z + other.z,
        }
    }
}

impl Sub for Vec3 {
    type Output = Vec3;
    fn sub(self, other: Vec3) -> Vec3 {
        Vec3 {
            x: self.x - other.x,
            y: self.y - other.y,
            z: self.z - other.z,
        }
    }
}

impl Neg for Vec3 {
    type Output = Vec3;
    fn neg(self) -> Vec3 {
        Vec3::new(-self.x, -self.y, -self.z)
    }
}

impl Mul<Fix16> for Vec3 {
    type Output = Vec3;
    fn mul(self, s: Fix16) -> Vec3 {
        self.scale(s)
    }
}

/// 2D Vector (texture coordinates, in texels)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Vec2 {
    pub x: Fix16,
    pub y: Fix16,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: Fix16::ZERO, y: Fix16::ZERO };

    pub const fn new(x: Fix16, y: Fix16) -> Self {
        Self { x, y }
    }

    pub fn from_f32(x: f32, y: f32) -> Self {
        Self::new(Fix16::from_f32(x), Fix16::from_f32(y))
    }

    pub fn scale(self, s: Fix16) -> Vec2 {
        Vec2::new(self.x * s, self.y * s)
    }
}

impl Add for Vec2 {
    type Output = Vec2;
    fn add(self, other: Vec2) -> Vec2 {
        Vec2::new(self.x + other.x, self.y + other.y)
    }
}

impl Sub for Vec2 {
    type Output = Vec2;
    fn sub(self, other: Vec2) -> Vec2 {
        Vec2::new(self.x - other.x, self.y - other.y)
    }
}

/// Affine transform: rotation in m[0..3], m[4..7], m[8..11] with the
/// translation in m[3], m[7], m[11].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mat34 {
    pub m: [Fix16; 12],
}

impl Default for Mat34 {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Mat34 {
    pub const IDENTITY: Mat34 = {
        let (o, i) = (Fix16::ZERO, Fix16::ONE);
        Mat34 { m: [i, o, o, o, o, i, o, o, o, o, i, o] }
    };

    pub fn translation(t: Vec3) -> Mat34 {
        let mut out = Mat34::IDENTITY;
        out.m[3] = t.x;
        out.m[7] = t.y;
        out.m[11] = t.z;
        out
    }

    /// Rotation about X, angle in turns
    pub fn rot_x(turns: Fix16) -> Mat34 {
        let (s, c) = (turns.sin(), turns.cos());
        let mut out = Mat34::IDENTITY;
        out.m[5] = c;
        out.m[6] = -s;
        out.m[9] = s;
        out.m[10] = c;
        out
    }

    /// Rotation about Y, angle in turns
    pub fn rot_y(turns: Fix16) -> Mat34 {
        let (s, c) = (turns.sin(), turns.cos());
        let mut out = Mat34::IDENTITY;
        out.m[0] = c;
        out.m[2] = -s;
        out.m[8] = s;
        out.m[10] = c;
        out
    }

    /// Rotation about Z, angle in turns
    pub fn rot_z(turns: Fix16) -> Mat34 {
        let (s, c) = (turns.sin(), turns.cos());
        let mut out = Mat34::IDENTITY;
        out.m[0] = c;
        out.m[1] = -s;
        out.m[4] = s;
        out.m[5] = c;
        out
    }

    /// Rotation part only
    pub fn mul_vec(&self, v: Vec3) -> Vec3 {
        let m = &self.m;
        Vec3 {
            x: v.x * m[0] + v.y * m[1] + v.z * m[2],
            y: v.x * m[4] + v.y * m[5] + v.z * m[6],
            z: v.x * m[8] + v.y * m[9] + v.z * m[10],
        }
    }

    /// Rotation plus translation
    pub fn mul_pos(&self, v: Vec3) -> Vec3 {
        let r = self.mul_vec(v);
        Vec3::new(r.x + self.m[3], r.y + self.m[7], r.z + self.m[11])
    }

    /// Transposed rotation with zero translation. For an orthonormal rotation
    /// this is its inverse, which brings world directions into model space.
    pub fn transpose_rot(&self) -> Mat34 {
        let m = &self.m;
        let o = Fix16::ZERO;
        Mat34 {
            m: [m[0], m[4], m[8], o, m[1], m[5], m[9], o, m[2], m[6], m[10], o],
        }
    }
}

/// Composition: `(a * b).mul_pos(v) == a.mul_pos(b.mul_pos(v))`
impl Mul for Mat34 {
    type Output = Mat34;
    fn mul(self, rhs: Mat34) -> Mat34 {
        let a = &self.m;
        let b = &rhs.m;
        let mut out = [Fix16::ZERO; 12];
        for row in 0..3 {
            let r = row * 4;
            for col in 0..4 {
                out[r + col] = a[r] * b[col] + a[r + 1] * b[4 + col] + a[r + 2] * b[8 + col];
            }
            out[r + 3] += a[r + 3];
        }
        Mat34 { m: out }
    }
}
