//! Core rendering functions
//! Scanline triangle fill with affine texture mapping and dithered lighting

use super::cull::{cull_triangle, CullReason, VisibleTriangle};
use super::fixed::Fix16;
use super::math::{Vec2, Vec3};
use super::types::{Color, DitherPattern, Palette, Spritesheet, TextureRegion, Triangle};

/// Edges shorter than this (in rows) are not filled
pub const EDGE_EPSILON: Fix16 = Fix16::from_raw(655);

/// Split-point depth weights below this fall back to a plain linear blend
const WEIGHT_EPSILON: Fix16 = Fix16::from_raw(66);

/// Light levels span [-15, 15]; the alternate region is used at or below
/// `7 + dither / 8`.
const LIGHT_LEVELS: i32 = 15;
const LIGHT_BIAS: Fix16 = Fix16::from_int(7);
const DITHER_STEP: Fix16 = Fix16::from_raw(0x2000);

/// Framebuffer for software rendering
pub struct Framebuffer {
    pub pixels: Vec<u8>, // RGBA, 4 bytes per pixel
    pub width: usize,
    pub height: usize,
}

impl Framebuffer {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            pixels: vec![0; width * height * 4],
            width,
            height,
        }
    }

    pub fn clear(&mut self, color: Color) {
        let bytes = color.to_bytes();
        for px in self.pixels.chunks_exact_mut(4) {
            px.copy_from_slice(&bytes);
        }
    }

    pub fn get_pixel(&self, x: usize, y: usize) -> Color {
        if x < self.width && y < self.height {
            let idx = (y * self.width + x) * 4;
            let p = &self.pixels[idx..idx + 4];
            Color::with_alpha(p[0], p[1], p[2], p[3])
        } else {
            Color::BLACK
        }
    }

    /// One scanline of RGBA bytes
    fn row_mut(&mut self, y: usize) -> &mut [u8] {
        let stride = self.width * 4;
        &mut self.pixels[y * stride..(y + 1) * stride]
    }

    /// Write the buffer as an RGBA PNG
    pub fn save_png<P: AsRef<std::path::Path>>(&self, path: P) -> Result<(), image::ImageError> {
        image::save_buffer(
            path.as_ref(),
            &self.pixels,
            self.width as u32,
            self.height as u32,
            image::ColorType::Rgba8,
        )
    }
}

/// Two framebuffers: the renderer draws into the back one while the
/// presenter reads the front one. `swap` hands over a finished frame.
pub struct DoubleBuffer {
    buffers: [Framebuffer; 2],
    back: usize,
}

impl DoubleBuffer {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            buffers: [Framebuffer::new(width, height), Framebuffer::new(width, height)],
            back: 0,
        }
    }

    pub fn back_mut(&mut self) -> &mut Framebuffer {
        &mut self.buffers[self.back]
    }

    pub fn front(&self) -> &Framebuffer {
        &self.buffers[self.back ^ 1]
    }

    /// Call once per frame, after the back buffer is complete
    pub fn swap(&mut self) {
        self.back ^= 1;
    }
}

/// Per-frame counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RasterStats {
    pub triangles_drawn: u32,
    pub pixels_written: u32,
    culled: [u32; 7],
}

impl RasterStats {
    pub fn record_cull(&mut self, reason: CullReason) {
        self.culled[reason.index()] += 1;
    }

    pub fn culled(&self, reason: CullReason) -> u32 {
        self.culled[reason.index()]
    }

    pub fn culled_total(&self) -> u32 {
        self.culled.iter().sum()
    }
}

impl std::ops::AddAssign for RasterStats {
    fn add_assign(&mut self, other: RasterStats) {
        self.triangles_drawn += other.triangles_drawn;
        self.pixels_written += other.pixels_written;
        for (a, b) in self.culled.iter_mut().zip(other.culled.iter()) {
            *a += b;
        }
    }
}

/// Everything a draw call needs besides the geometry
pub struct RenderContext<'a> {
    pub sheet: &'a Spritesheet,
    pub palette: &'a Palette,
    pub dither: &'a DitherPattern,
    /// Region bound for this draw call; `None` culls every triangle
    pub texture: Option<TextureRegion>,
    /// Object-space light direction, unit length
    pub light_dir: Vec3,
    /// Use the reciprocal table for span gradients
    pub fast_recip: bool,
}

/// Cull and draw one triangle. Returns true if it reached the fill stage.
pub fn draw_triangle(
    fb: &mut Framebuffer,
    ctx: &RenderContext,
    tri: &Triangle,
    projected: &[Vec3],
    stats: &mut RasterStats,
) -> bool {
    match cull_triangle(tri, projected, ctx.texture, fb.width, fb.height) {
        Err(reason) => {
            stats.record_cull(reason);
            false
        }
        Ok(visible) => {
            let light = Fix16::from_int(LIGHT_LEVELS) * ctx.light_dir.dot(tri.normal);
            stats.pixels_written += rasterize_triangle(fb, ctx, &visible, tri.uvs, light);
            stats.triangles_drawn += 1;
            true
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Corner {
    pos: Vec3,
    uv: Vec2,
}

/// Per-triangle shading state: texture and which dither cells take the
/// alternate region.
struct Shader<'a> {
    sheet: &'a Spritesheet,
    palette: &'a Palette,
    texture: TextureRegion,
    alt: [[bool; 8]; 8],
    fast_recip: bool,
}

impl<'a> Shader<'a> {
    fn new(ctx: &'a RenderContext, texture: TextureRegion, light: Fix16) -> Self {
        let mut alt = [[false; 8]; 8];
        for (y, row) in alt.iter_mut().enumerate() {
            for (x, cell) in row.iter_mut().enumerate() {
                let threshold = LIGHT_BIAS + DITHER_STEP * Fix16::from_int(ctx.dither.at(x, y) as i32);
                *cell = light <= threshold;
            }
        }
        Self {
            sheet: ctx.sheet,
            palette: ctx.palette,
            texture,
            alt,
            fast_recip: ctx.fast_recip,
        }
    }

    /// Walk one clipped span. Returns pixels written.
    #[allow(clippy::too_many_arguments)]
    fn span(&self, row: &mut [u8], y: usize, xl: usize, xr: usize, mut u: Fix16, mut v: Fix16, du: Fix16, dv: Fix16) -> u32 {
        let alt = &self.alt[y & 7];
        let tex = self.texture;
        for x in xl..=xr {
            let tex_x = if alt[x & 7] { tex.x + tex.lit_dx } else { tex.x };
            let idx = self.sheet.get(u.to_int() + tex_x, v.to_int() + tex.y);
            let o = x * 4;
            row[o..o + 4].copy_from_slice(&self.palette.resolve(idx).to_bytes());
            u += du;
            v += dv;
        }
        (xr - xl + 1) as u32
    }
}

/// Sort by y, split at the middle vertex and fill both halves.
/// Returns pixels written.
pub fn rasterize_triangle(
    fb: &mut Framebuffer,
    ctx: &RenderContext,
    visible: &VisibleTriangle,
    uvs: [Vec2; 3],
    light: Fix16,
) -> u32 {
    let mut c = [
        Corner { pos: visible.verts[0], uv: uvs[0] },
        Corner { pos: visible.verts[1], uv: uvs[1] },
        Corner { pos: visible.verts[2], uv: uvs[2] },
    ];
    if c[1].pos.y < c[0].pos.y {
        c.swap(0, 1);
    }
    if c[2].pos.y < c[0].pos.y {
        c.swap(0, 2);
    }
    if c[2].pos.y < c[1].pos.y {
        c.swap(1, 2);
    }
    let [top, mid, bot] = c;

    if top.pos.y == bot.pos.y {
        return 0;
    }

    let shader = Shader::new(ctx, visible.texture, light);

    if top.pos.y == mid.pos.y {
        let (l, r) = order_x(top, mid);
        return fill_flat(fb, &shader, bot, l, r);
    }
    if mid.pos.y == bot.pos.y {
        let (l, r) = order_x(mid, bot);
        return fill_flat(fb, &shader, top, l, r);
    }

    let split = split_long_edge(top, mid, bot);
    let (l, r) = order_x(mid, split);
    fill_flat(fb, &shader, top, l, r) + fill_flat(fb, &shader, bot, l, r)
}

fn order_x(a: Corner, b: Corner) -> (Corner, Corner) {
    if a.pos.x <= b.pos.x {
        (a, b)
    } else {
        (b, a)
    }
}

/// Point on the top-bottom edge at the middle vertex's height. UVs are
/// blended with the perspective factors as weights.
fn split_long_edge(top: Corner, mid: Corner, bot: Corner) -> Corner {
    let c = (mid.pos.y - top.pos.y) / (bot.pos.y - top.pos.y);
    let pos = Vec3::new(
        top.pos.x + c * (bot.pos.x - top.pos.x),
        mid.pos.y,
        top.pos.z + c * (bot.pos.z - top.pos.z),
    );

    let w0 = (Fix16::ONE - c) * top.pos.z;
    let w1 = c * bot.pos.z;
    let sum = w0 + w1;
    let uv = if sum > WEIGHT_EPSILON {
        (top.uv.scale(w0) + bot.uv.scale(w1)).scale(sum.recip())
    } else {
        top.uv + (bot.uv - top.uv).scale(c)
    };
    Corner { pos, uv }
}

/// Interpolated edge state, stepped once per scanline. No z: depth is only
/// read at the split vertex, and fills are painter-ordered with no depth test.
struct Edge {
    x: Fix16,
    u: Fix16,
    v: Fix16,
    dx: Fix16,
    du: Fix16,
    dv: Fix16,
}

impl Edge {
    fn new(from: Corner, to: Corner, inv_dy: Fix16) -> Self {
        Self {
            x: from.pos.x,
            u: from.uv.x,
            v: from.uv.y,
            dx: (to.pos.x - from.pos.x) * inv_dy,
            du: (to.uv.x - from.uv.x) * inv_dy,
            dv: (to.uv.y - from.uv.y) * inv_dy,
        }
    }

    fn prestep(&mut self, amount: Fix16) {
        self.x += self.dx * amount;
        self.u += self.du * amount;
        self.v += self.dv * amount;
    }

    fn advance(&mut self) {
        self.x += self.dx;
        self.u += self.du;
        self.v += self.dv;
    }
}

/// Fill a triangle with a horizontal edge. `tip` is the lone vertex;
/// `left` and `right` share the other y. Pixel centers sit at +0.5.
fn fill_flat(fb: &mut Framebuffer, shader: &Shader, tip: Corner, left: Corner, right: Corner) -> u32 {
    let base_y = left.pos.y;
    let flat_bottom = tip.pos.y < base_y;
    let (y_top, y_bot) = if flat_bottom { (tip.pos.y, base_y) } else { (base_y, tip.pos.y) };

    let dy = y_bot - y_top;
    if dy.abs() < EDGE_EPSILON {
        return 0;
    }

    let y_start = (y_top + Fix16::HALF).to_int().max(0);
    let y_end = (y_bot - Fix16::HALF).to_int().min(fb.height as i32 - 1);
    if y_start > y_end {
        return 0;
    }

    let inv_dy = dy.recip();
    let (mut le, mut re) = if flat_bottom {
        (Edge::new(tip, left, inv_dy), Edge::new(tip, right, inv_dy))
    } else {
        (Edge::new(left, tip, inv_dy), Edge::new(right, tip, inv_dy))
    };
    let prestep = Fix16::from_int(y_start) + Fix16::HALF - y_top;
    le.prestep(prestep);
    re.prestep(prestep);

    let max_x = fb.width as i32 - 1;
    let mut written = 0;
    for y in y_start..=y_end {
        let xl = (le.x + Fix16::HALF).to_int().max(0);
        let xr = (re.x - Fix16::HALF).to_int().min(max_x);
        if xl <= xr {
            let span = re.x - le.x;
            let (du, dv) = if span > Fix16::HALF {
                let inv = if shader.fast_recip { span.recip_fast() } else { span.recip() };
                ((re.u - le.u) * inv, (re.v - le.v) * inv)
            } else {
                (Fix16::ZERO, Fix16::ZERO)
            };
            let x_prestep = Fix16::from_int(xl) + Fix16::HALF - le.x;
            let u = le.u + du * x_prestep;
            let v = le.v + dv * x_prestep;
            let row = fb.row_mut(y as usize);
            written += shader.span(row, y as usize, xl as usize, xr as usize, u, v, du, dv);
        }
        le.advance();
        re.advance();
    }
    written
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rasterizer::types::PICO8_COLORS;

    const BASE: u8 = 3;
    const ALT: u8 = 9;
    // padded so UVs a hair outside [0, 15] still land on the same color
    const REGION: TextureRegion = TextureRegion::new(16, 16, 48);

    struct Fixture {
        sheet: Spritesheet,
        palette: Palette,
        dither: DitherPattern,
    }

    impl Fixture {
        fn new() -> Self {
            let mut sheet = Spritesheet::new();
            sheet.fill_rect(8, 8, 32, 32, BASE);
            sheet.fill_rect(56, 8, 32, 32, ALT);
            Self { sheet, palette: Palette::default(), dither: DitherPattern::bayer() }
        }

        fn ctx(&self, light_dir: Vec3) -> RenderContext<'_> {
            RenderContext {
                sheet: &self.sheet,
                palette: &self.palette,
                dither: &self.dither,
                texture: Some(REGION),
                light_dir,
                fast_recip: true,
            }
        }
    }

    fn tri_facing_z() -> Triangle {
        let uvs = [Vec2::from_f32(0.0, 0.0), Vec2::from_f32(0.0, 15.0), Vec2::from_f32(15.0, 0.0)];
        Triangle::new([0, 1, 2], uvs, Vec3::from_f32(0.0, 0.0, 1.0))
    }

    fn screen(points: [(f32, f32); 3]) -> Vec<Vec3> {
        points.iter().map(|&(x, y)| Vec3::from_f32(x, y, 1.0)).collect()
    }

    fn count_color(fb: &Framebuffer, c: Color) -> usize {
        fb.pixels.chunks_exact(4).filter(|p| p == &c.to_bytes()).count()
    }

    #[test]
    fn test_framebuffer_clear_and_get() {
        let mut fb = Framebuffer::new(4, 3);
        fb.clear(PICO8_COLORS[1]);
        assert_eq!(fb.get_pixel(3, 2), PICO8_COLORS[1]);
        assert_eq!(&fb.pixels[..4], &PICO8_COLORS[1].to_bytes());
        assert_eq!(fb.get_pixel(9, 9), Color::BLACK);
    }

    #[test]
    fn test_double_buffer_swap() {
        let mut db = DoubleBuffer::new(2, 2);
        db.back_mut().clear(PICO8_COLORS[7]);
        assert_ne!(db.front().get_pixel(0, 0), PICO8_COLORS[7]);
        db.swap();
        assert_eq!(db.front().get_pixel(0, 0), PICO8_COLORS[7]);
    }

    #[test]
    fn test_fill_writes_texture_colors_only() {
        let fx = Fixture::new();
        // facing the light: base region everywhere
        let ctx = fx.ctx(Vec3::from_f32(0.0, 0.0, 1.0));
        let mut fb = Framebuffer::new(160, 128);
        let mut stats = RasterStats::default();
        let verts = screen([(20.0, 40.0), (20.0, 10.0), (50.0, 40.0)]);

        assert!(draw_triangle(&mut fb, &ctx, &tri_facing_z(), &verts, &mut stats));
        let base = count_color(&fb, PICO8_COLORS[BASE as usize]);
        assert_eq!(base as u32, stats.pixels_written);
        // right triangle with legs of 30: area 450
        assert!((400..=500).contains(&base), "wrote {}", base);
        assert_eq!(stats.triangles_drawn, 1);
    }

    #[test]
    fn test_dark_side_uses_alternate_region() {
        let fx = Fixture::new();
        let ctx = fx.ctx(Vec3::from_f32(0.0, 0.0, -1.0));
        let mut fb = Framebuffer::new(160, 128);
        let mut stats = RasterStats::default();
        let verts = screen([(20.0, 40.0), (20.0, 10.0), (50.0, 40.0)]);

        draw_triangle(&mut fb, &ctx, &tri_facing_z(), &verts, &mut stats);
        assert_eq!(count_color(&fb, PICO8_COLORS[BASE as usize]), 0);
        assert_eq!(count_color(&fb, PICO8_COLORS[ALT as usize]) as u32, stats.pixels_written);
    }

    #[test]
    fn test_threshold_light_dithers_between_regions() {
        let fx = Fixture::new();
        // light = 15 * 0.55 = 8.25, inside the dither band [7, 8.875]
        let ctx = fx.ctx(Vec3::from_f32(0.0, 0.0, 0.55));
        let mut fb = Framebuffer::new(160, 128);
        let mut stats = RasterStats::default();
        let verts = screen([(20.0, 40.0), (20.0, 10.0), (50.0, 40.0)]);

        draw_triangle(&mut fb, &ctx, &tri_facing_z(), &verts, &mut stats);
        assert!(count_color(&fb, PICO8_COLORS[BASE as usize]) > 0);
        assert!(count_color(&fb, PICO8_COLORS[ALT as usize]) > 0);
    }

    #[test]
    fn test_general_triangle_is_split_and_filled() {
        let fx = Fixture::new();
        let ctx = fx.ctx(Vec3::from_f32(0.0, 0.0, 1.0));
        let mut fb = Framebuffer::new(160, 128);
        let mut stats = RasterStats::default();
        // no two vertices share a y
        let verts = screen([(30.0, 10.0), (60.0, 35.0), (10.0, 50.0)]);
        let nz = (60.0 - 30.0) * (50.0 - 10.0) - (35.0 - 10.0) * (10.0 - 30.0);
        assert!(nz > 0.0);

        assert!(draw_triangle(&mut fb, &ctx, &tri_facing_z(), &verts, &mut stats));
        let area = nz / 2.0;
        let written = stats.pixels_written as f32;
        assert!((written - area).abs() < area * 0.1, "wrote {} area {}", written, area);
    }

    #[test]
    fn test_clipped_triangle_stays_in_bounds() {
        let fx = Fixture::new();
        let ctx = fx.ctx(Vec3::from_f32(0.0, 0.0, 1.0));
        let mut fb = Framebuffer::new(160, 128);
        let mut stats = RasterStats::default();
        let verts = screen([(-100.0, 200.0), (80.0, -100.0), (300.0, 200.0)]);

        assert!(draw_triangle(&mut fb, &ctx, &tri_facing_z(), &verts, &mut stats));
        assert!(stats.pixels_written as usize <= 160 * 128);
    }

    #[test]
    fn test_culled_triangle_writes_nothing() {
        let fx = Fixture::new();
        let ctx = fx.ctx(Vec3::from_f32(0.0, 0.0, 1.0));
        let mut fb = Framebuffer::new(160, 128);
        let mut stats = RasterStats::default();
        let verts = screen([(20.0, 20.0), (20.0, 20.0), (20.0, 20.0)]);

        assert!(!draw_triangle(&mut fb, &ctx, &tri_facing_z(), &verts, &mut stats));
        assert_eq!(stats.pixels_written, 0);
        assert_eq!(stats.culled_total(), 1);
        assert!(fb.pixels.iter().all(|&b| b == 0));
    }

    /// Sheet whose base-region texels hold their own U (or V) coordinate mod 16
    fn gradient_fixture(along_u: bool) -> Fixture {
        let mut sheet = Spritesheet::new();
        for y in 0..128 {
            for x in 0..128 {
                let t = if along_u { x - REGION.x } else { y - REGION.y };
                sheet.set(x, y, t.rem_euclid(16) as u8);
            }
        }
        Fixture { sheet, palette: Palette::default(), dither: DitherPattern::bayer() }
    }

    /// Affine UV at the pixel center, from barycentric weights
    fn uv_at(points: [(f32, f32); 3], uvs: [(f32, f32); 3], px: usize, py: usize) -> (f32, f32) {
        let (x, y) = (px as f32 + 0.5, py as f32 + 0.5);
        let [(x0, y0), (x1, y1), (x2, y2)] = points;
        let det = (y1 - y2) * (x0 - x2) + (x2 - x1) * (y0 - y2);
        let w0 = ((y1 - y2) * (x - x2) + (x2 - x1) * (y - y2)) / det;
        let w1 = ((y2 - y0) * (x - x2) + (x0 - x2) * (y - y2)) / det;
        let w2 = 1.0 - w0 - w1;
        (
            w0 * uvs[0].0 + w1 * uvs[1].0 + w2 * uvs[2].0,
            w0 * uvs[0].1 + w1 * uvs[1].1 + w2 * uvs[2].1,
        )
    }

    /// Every written pixel samples the texel its interpolated UV names,
    /// give or take one texel at the edges
    fn assert_texels_follow_uv(points: [(f32, f32); 3]) {
        let uvs = [(0.0, 0.0), (0.0, 15.0), (15.0, 0.0)];
        for along_u in [true, false] {
            let fx = gradient_fixture(along_u);
            let ctx = fx.ctx(Vec3::from_f32(0.0, 0.0, 1.0));
            let mut fb = Framebuffer::new(160, 128);
            let mut stats = RasterStats::default();
            assert!(draw_triangle(&mut fb, &ctx, &tri_facing_z(), &screen(points), &mut stats));

            let mut checked = 0;
            for py in 0..fb.height {
                for px in 0..fb.width {
                    let c = fb.get_pixel(px, py);
                    if c.a == 0 {
                        continue;
                    }
                    let got = PICO8_COLORS.iter().position(|&p| p == c).expect("palette color") as i32;
                    let (u, v) = uv_at(points, uvs, px, py);
                    let want = (if along_u { u } else { v }).floor() as i32;
                    let off = (got - want).rem_euclid(16);
                    assert!(off <= 1 || off == 15, "pixel ({}, {}) texel {} want {}", px, py, got, want);
                    checked += 1;
                }
            }
            assert_eq!(checked, stats.pixels_written);
            assert!(checked > 300);
        }
    }

    #[test]
    fn test_flat_triangle_samples_along_uv() {
        assert_texels_follow_uv([(20.0, 40.0), (20.0, 10.0), (50.0, 40.0)]);
    }

    #[test]
    fn test_split_triangle_samples_along_uv() {
        assert_texels_follow_uv([(30.0, 10.0), (60.0, 35.0), (10.0, 50.0)]);
    }
}
