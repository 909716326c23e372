//! Core types for the rasterizer

use serde::{Deserialize, Serialize};

use super::fixed::Fix16;
use super::math::{Vec2, Vec3};

/// RGBA color (0-255 per channel)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const BLACK: Color = Color { r: 0, g: 0, b: 0, a: 255 };

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn with_alpha(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// From a packed 0xRRGGBB value
    pub const fn from_rgb24(rgb: u32) -> Self {
        Self::new((rgb >> 16) as u8, (rgb >> 8) as u8, rgb as u8)
    }

    /// Convert to [u8; 4] for framebuffer
    pub fn to_bytes(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }

    /// Squared RGB distance, used when quantizing imported images
    fn distance_sq(self, other: Color) -> u32 {
        let dr = self.r as i32 - other.r as i32;
        let dg = self.g as i32 - other.g as i32;
        let db = self.b as i32 - other.b as i32;
        (dr * dr + dg * dg + db * db) as u32
    }
}

/// The 16 hardware colors the palette indexes into
pub const PICO8_COLORS: [Color; 16] = [
    Color::from_rgb24(0x000000),
    Color::from_rgb24(0x1D2B53),
    Color::from_rgb24(0x7E2553),
    Color::from_rgb24(0x008751),
    Color::from_rgb24(0xAB5236),
    Color::from_rgb24(0x5F574F),
    Color::from_rgb24(0xC2C3C7),
    Color::from_rgb24(0xFFF1E8),
    Color::from_rgb24(0xFF004D),
    Color::from_rgb24(0xFFA300),
    Color::from_rgb24(0xFFEC27),
    Color::from_rgb24(0x00E436),
    Color::from_rgb24(0x29ADFF),
    Color::from_rgb24(0x83769C),
    Color::from_rgb24(0xFF77A8),
    Color::from_rgb24(0xFFCCAA),
];

/// 16-entry indirection from logical color index to output color.
///
/// The outer layer remaps entries between frames (flash effects, fades,
/// engine glow); the rasterizer reads it on every pixel write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette {
    base: [Color; 16],
    map: [u8; 16],
}

impl Default for Palette {
    fn default() -> Self {
        Self::new(PICO8_COLORS)
    }
}

impl Palette {
    pub fn new(base: [Color; 16]) -> Self {
        let mut map = [0u8; 16];
        for (i, slot) in map.iter_mut().enumerate() {
            *slot = i as u8;
        }
        Self { base, map }
    }

    /// Make logical index `from` draw as base color `to`
    pub fn remap(&mut self, from: u8, to: u8) {
        self.map[(from & 15) as usize] = to & 15;
    }

    /// Restore the identity mapping
    pub fn reset(&mut self) {
        for (i, slot) in self.map.iter_mut().enumerate() {
            *slot = i as u8;
        }
    }

    /// Logical index after remapping
    #[inline]
    pub fn index(&self, idx: u8) -> u8 {
        self.map[(idx & 15) as usize]
    }

    #[inline]
    pub fn resolve(&self, idx: u8) -> Color {
        self.base[self.index(idx) as usize]
    }

    /// Base color closest to `c` (used when importing RGBA images)
    pub fn nearest(&self, c: Color) -> u8 {
        let mut best = 0u8;
        let mut best_dist = u32::MAX;
        for (i, base) in self.base.iter().enumerate() {
            let d = base.distance_sq(c);
            if d < best_dist {
                best = i as u8;
                best_dist = d;
            }
        }
        best
    }
}

/// Steps one palette slot through a list of colors at a fixed rate
#[derive(Debug, Clone)]
pub struct PaletteCycle {
    slot: u8,
    colors: Vec<u8>,
    rate: Fix16,
    phase: Fix16,
}

impl PaletteCycle {
    /// `rate` is in list entries per tick
    pub fn new(slot: u8, colors: Vec<u8>, rate: Fix16) -> Self {
        Self { slot, colors, rate, phase: Fix16::ZERO }
    }

    /// The engine glow: cycles through 13, 12, 7, 12
    pub fn engine_glow(slot: u8) -> Self {
        Self::new(slot, vec![13, 12, 7, 12], Fix16::ONE)
    }

    pub fn current(&self) -> u8 {
        if self.colors.is_empty() {
            return self.slot;
        }
        let i = self.phase.to_int().rem_euclid(self.colors.len() as i32) as usize;
        self.colors[i]
    }

    /// Advance one tick and write the current color into `palette`
    pub fn advance(&mut self, palette: &mut Palette) {
        if self.colors.is_empty() {
            return;
        }
        self.phase += self.rate;
        let len = Fix16::from_int(self.colors.len() as i32);
        if self.phase >= len {
            self.phase -= len;
        }
        palette.remap(self.slot, self.current());
    }
}

/// Side length of the square spritesheet, in texels
pub const SHEET_SIZE: usize = 128;

/// 128x128 bitmap of 4-bit palette indices
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Spritesheet {
    pixels: Vec<u8>,
}

impl Default for Spritesheet {
    fn default() -> Self {
        Self::new()
    }
}

impl Spritesheet {
    pub fn new() -> Self {
        Self { pixels: vec![0; SHEET_SIZE * SHEET_SIZE] }
    }

    /// Palette index at (x, y); 0 outside the sheet
    #[inline]
    pub fn get(&self, x: i32, y: i32) -> u8 {
        if x < 0 || y < 0 || x >= SHEET_SIZE as i32 || y >= SHEET_SIZE as i32 {
            return 0;
        }
        self.pixels[y as usize * SHEET_SIZE + x as usize]
    }

    /// Writes outside the sheet are ignored
    pub fn set(&mut self, x: i32, y: i32, idx: u8) {
        if x < 0 || y < 0 || x >= SHEET_SIZE as i32 || y >= SHEET_SIZE as i32 {
            return;
        }
        self.pixels[y as usize * SHEET_SIZE + x as usize] = idx & 15;
    }

    pub fn fill_rect(&mut self, x: i32, y: i32, w: i32, h: i32, idx: u8) {
        for ty in y..y + h {
            for tx in x..x + w {
                self.set(tx, ty, idx);
            }
        }
    }

    /// Load a PNG and quantize each pixel to the nearest palette color.
    /// Images larger than the sheet are cropped.
    pub fn from_png<P: AsRef<std::path::Path>>(path: P, palette: &Palette) -> Result<Self, image::ImageError> {
        let img = image::open(path.as_ref())?;
        Ok(Self::from_image(&img, palette))
    }

    /// Decode PNG bytes, quantizing like [`Spritesheet::from_png`]
    pub fn from_png_bytes(bytes: &[u8], palette: &Palette) -> Result<Self, image::ImageError> {
        let img = image::load_from_memory(bytes)?;
        Ok(Self::from_image(&img, palette))
    }

    fn from_image(img: &image::DynamicImage, palette: &Palette) -> Self {
        let rgba = img.to_rgba8();
        let mut sheet = Self::new();
        for (x, y, p) in rgba.enumerate_pixels() {
            let color = Color::with_alpha(p[0], p[1], p[2], 255);
            // fully transparent texels read as color 0
            let idx = if p[3] == 0 { 0 } else { palette.nearest(color) };
            sheet.set(x as i32, y as i32, idx);
        }
        sheet
    }
}

/// 8x8 ordered-dither thresholds, values 0..=15
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DitherPattern {
    rows: [[u8; 8]; 8],
}

impl Default for DitherPattern {
    fn default() -> Self {
        Self::bayer()
    }
}

impl DitherPattern {
    /// Classic 8x8 Bayer matrix (0..64) reduced to 0..16
    pub fn bayer() -> Self {
        const BAYER: [[u8; 8]; 8] = [
            [0, 32, 8, 40, 2, 34, 10, 42],
            [48, 16, 56, 24, 50, 18, 58, 26],
            [12, 44, 4, 36, 14, 46, 6, 38],
            [60, 28, 52, 20, 62, 30, 54, 22],
            [3, 35, 11, 43, 1, 33, 9, 41],
            [51, 19, 59, 27, 49, 17, 57, 25],
            [15, 47, 7, 39, 13, 45, 5, 37],
            [63, 31, 55, 23, 61, 29, 53, 21],
        ];
        let mut rows = [[0u8; 8]; 8];
        for (y, row) in BAYER.iter().enumerate() {
            for (x, v) in row.iter().enumerate() {
                rows[y][x] = v >> 2;
            }
        }
        Self { rows }
    }

    /// Read the 8x8 block whose top-left texel is (x, y)
    pub fn from_sheet(sheet: &Spritesheet, x: i32, y: i32) -> Self {
        let mut rows = [[0u8; 8]; 8];
        for (dy, row) in rows.iter_mut().enumerate() {
            for (dx, v) in row.iter_mut().enumerate() {
                *v = sheet.get(x + dx as i32, y + dy as i32);
            }
        }
        Self { rows }
    }

    #[inline]
    pub fn at(&self, x: usize, y: usize) -> u8 {
        self.rows[y & 7][x & 7]
    }
}

/// Where a mesh's texels live in the spritesheet
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextureRegion {
    pub x: i32,
    pub y: i32,
    /// Horizontal offset to the lit variant of the same region
    pub lit_dx: i32,
}

impl TextureRegion {
    pub const fn new(x: i32, y: i32, lit_dx: i32) -> Self {
        Self { x, y, lit_dx }
    }
}

/// A triangle face. Indices are signed: a negative index marks the triangle
/// as unused and every stage skips it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Triangle {
    pub indices: [i32; 3],
    pub uvs: [Vec2; 3],
    pub normal: Vec3,
    /// Sort key, rewritten every frame
    pub z: Fix16,
}

impl Triangle {
    pub fn new(indices: [i32; 3], uvs: [Vec2; 3], normal: Vec3) -> Self {
        Self { indices, uvs, normal, z: Fix16::ZERO }
    }

    /// Indices as `usize` if all three address a buffer of length `len`
    pub fn vertex_indices(&self, len: usize) -> Option<[usize; 3]> {
        let mut out = [0usize; 3];
        for (dst, &i) in out.iter_mut().zip(self.indices.iter()) {
            if i < 0 || i as usize >= len {
                return None;
            }
            *dst = i as usize;
        }
        Some(out)
    }
}

pub const MAX_MESH_VERTICES: usize = 256;
pub const MAX_MESH_TRIANGLES: usize = 256;

/// Model-space geometry shared by every instance
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Mesh {
    pub vertices: Vec<Vec3>,
    pub triangles: Vec<Triangle>,
}

impl Mesh {
    pub fn new(vertices: Vec<Vec3>, triangles: Vec<Triangle>) -> Self {
        Self { vertices, triangles }
    }

    /// Fresh per-instance scratch for this mesh
    pub fn instantiate(&self) -> MeshInstance {
        MeshInstance {
            projected: vec![Vec3::ZERO; self.vertices.len()],
            triangles: self.triangles.clone(),
        }
    }
}

/// Per-instance working set: projected vertices and a draw list sorted
/// in place each frame.
#[derive(Debug, Clone, Default)]
pub struct MeshInstance {
    pub projected: Vec<Vec3>,
    pub triangles: Vec<Triangle>,
}

/// Integer upscale the viewer opens with
pub const DEFAULT_WINDOW_SCALE: u32 = 4;

/// Rasterizer settings, stored as RON
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RasterSettings {
    pub width: usize,
    pub height: usize,
    pub center_x: f32,
    pub center_y: f32,
    /// Negative: the camera looks down -z
    pub proj_const: f32,
    /// Use the reciprocal table for per-scanline span gradients
    pub fast_recip: bool,
    pub dither: DitherSource,
    /// Palette index the back buffer is cleared to
    pub clear_color: u8,
    /// Integer upscale for the viewer window
    pub window_scale: u32,
}

impl Default for RasterSettings {
    fn default() -> Self {
        Self {
            width: super::WIDTH,
            height: super::HEIGHT,
            center_x: 80.0,
            center_y: 64.0,
            proj_const: -75.0,
            fast_recip: true,
            dither: DitherSource::Spritesheet { x: 0, y: 56 },
            clear_color: 0,
            window_scale: DEFAULT_WINDOW_SCALE,
        }
    }
}

/// Where the 8x8 dither thresholds come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DitherSource {
    /// 8x8 block of the spritesheet with this top-left texel
    Spritesheet { x: i32, y: i32 },
    Bayer,
}
