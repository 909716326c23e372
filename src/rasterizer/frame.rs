//! Per-frame driver
//!
//! For each draw call: project the instance's vertices, depth sort its
//! triangle list, then cull and fill each triangle back to front.

use super::math::{Mat34, Vec3};
use super::render::{draw_triangle, Framebuffer, RasterStats, RenderContext};
use super::sort::sort_triangles;
use super::transform::Projection;
use super::types::{
    DitherPattern, DitherSource, Mesh, MeshInstance, Palette, RasterSettings, Spritesheet, TextureRegion,
};

/// One mesh instance to draw this frame
pub struct DrawCall<'a> {
    pub mesh: &'a Mesh,
    pub instance: &'a mut MeshInstance,
    /// Model to camera space
    pub transform: Mat34,
    /// Object-space light direction, unit length
    pub light_dir: Vec3,
    pub texture: Option<TextureRegion>,
    /// Palette for this call only; `None` draws with the renderer's palette.
    /// Remaps in it never outlive the call.
    pub palette: Option<Palette>,
}

/// Long-lived render state: projection, spritesheet, palette and dither
/// thresholds. `palette` is the frame-wide mapping, used for the clear color
/// and for calls without their own.
pub struct Renderer {
    pub settings: RasterSettings,
    pub projection: Projection,
    pub sheet: Spritesheet,
    pub palette: Palette,
    pub dither: DitherPattern,
}

impl Renderer {
    pub fn new(settings: RasterSettings, sheet: Spritesheet) -> Self {
        let dither = match settings.dither {
            DitherSource::Spritesheet { x, y } => DitherPattern::from_sheet(&sheet, x, y),
            DitherSource::Bayer => DitherPattern::bayer(),
        };
        log::debug!(
            "renderer {}x{}, proj {}, dither {:?}, fast recip {}",
            settings.width,
            settings.height,
            settings.proj_const,
            settings.dither,
            settings.fast_recip
        );
        Self {
            projection: Projection::from_settings(&settings),
            settings,
            sheet,
            palette: Palette::default(),
            dither,
        }
    }

    /// Project, sort and draw one instance into `fb` with the renderer's
    /// palette
    pub fn draw_instance(
        &self,
        fb: &mut Framebuffer,
        mesh: &Mesh,
        instance: &mut MeshInstance,
        transform: &Mat34,
        light_dir: Vec3,
        texture: Option<TextureRegion>,
    ) -> RasterStats {
        self.draw_call(
            fb,
            &mut DrawCall {
                mesh,
                instance,
                transform: *transform,
                light_dir,
                texture,
                palette: None,
            },
        )
    }

    /// Project, sort and draw one call into `fb`
    pub fn draw_call(&self, fb: &mut Framebuffer, call: &mut DrawCall) -> RasterStats {
        let mesh = call.mesh;
        let instance = &mut *call.instance;
        if instance.projected.len() != mesh.vertices.len() {
            instance.projected.resize(mesh.vertices.len(), Vec3::ZERO);
        }
        self.projection.project_all(&call.transform, &mesh.vertices, &mut instance.projected);
        sort_triangles(&mut instance.triangles, &instance.projected);

        let ctx = RenderContext {
            sheet: &self.sheet,
            palette: call.palette.as_ref().unwrap_or(&self.palette),
            dither: &self.dither,
            texture: call.texture,
            light_dir: call.light_dir,
            fast_recip: self.settings.fast_recip,
        };
        let mut stats = RasterStats::default();
        for tri in &instance.triangles {
            draw_triangle(fb, &ctx, tri, &instance.projected, &mut stats);
        }
        stats
    }

    /// Clear `fb` and draw every call in order. Later calls paint over
    /// earlier ones. Each call's palette applies to its own triangles only.
    pub fn render_frame(&self, fb: &mut Framebuffer, calls: &mut [DrawCall]) -> RasterStats {
        fb.clear(self.palette.resolve(self.settings.clear_color));
        let mut stats = RasterStats::default();
        for call in calls.iter_mut() {
            stats += self.draw_call(fb, call);
        }
        log::trace!(
            "frame: {} triangles drawn, {} culled, {} pixels",
            stats.triangles_drawn,
            stats.culled_total(),
            stats.pixels_written
        );
        stats
    }
}

/// Light direction for a model given its world rotation: the inverse
/// rotation brings the world-space light into model space.
pub fn object_light(world: &Mat34, light_world: Vec3) -> Vec3 {
    world.transpose_rot().mul_vec(light_world).normalize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rasterizer::cull::CullReason;
    use crate::rasterizer::fixed::Fix16;
    use crate::rasterizer::math::Vec2;
    use crate::rasterizer::types::Triangle;

    fn unit_mesh() -> Mesh {
        let vertices = vec![
            Vec3::from_f32(0.0, 0.0, 0.0),
            Vec3::from_f32(0.0, 1.0, 0.0),
            Vec3::from_f32(1.0, 0.0, 0.0),
        ];
        let uvs = [Vec2::from_f32(0.0, 0.0), Vec2::from_f32(0.0, 7.0), Vec2::from_f32(7.0, 0.0)];
        let tri = Triangle::new([0, 1, 2], uvs, Vec3::from_f32(0.0, 0.0, 1.0));
        Mesh::new(vertices, vec![tri])
    }

    fn renderer() -> Renderer {
        let mut sheet = Spritesheet::new();
        sheet.fill_rect(0, 0, 32, 16, 8);
        Renderer::new(RasterSettings { dither: DitherSource::Bayer, ..Default::default() }, sheet)
    }

    #[test]
    fn test_draw_instance_in_front() {
        let r = renderer();
        let mesh = unit_mesh();
        let mut inst = mesh.instantiate();
        let mut fb = Framebuffer::new(160, 128);
        let cam = Mat34::translation(Vec3::from_f32(0.0, 0.0, -10.0));
        let stats = r.draw_instance(&mut fb, &mesh, &mut inst, &cam, Vec3::from_f32(0.0, 0.0, 1.0), Some(TextureRegion::new(0, 0, 16)));
        assert_eq!(stats.triangles_drawn, 1);
        assert!(stats.pixels_written > 0);
        assert_eq!(inst.projected[0].x, Fix16::from_int(80));
    }

    #[test]
    fn test_no_texture_culls_all() {
        let r = renderer();
        let mesh = unit_mesh();
        let mut inst = mesh.instantiate();
        let mut fb = Framebuffer::new(160, 128);
        let cam = Mat34::translation(Vec3::from_f32(0.0, 0.0, -10.0));
        let stats = r.draw_instance(&mut fb, &mesh, &mut inst, &cam, Vec3::ZERO, None);
        assert_eq!(stats.triangles_drawn, 0);
        assert_eq!(stats.culled(CullReason::NoTexture), 1);
    }

    #[test]
    fn test_behind_camera_is_culled() {
        let r = renderer();
        let mesh = unit_mesh();
        let mut inst = mesh.instantiate();
        let mut fb = Framebuffer::new(160, 128);
        let cam = Mat34::translation(Vec3::from_f32(0.0, 0.0, 10.0));
        let stats = r.draw_instance(&mut fb, &mesh, &mut inst, &cam, Vec3::ZERO, Some(TextureRegion::default()));
        assert_eq!(stats.culled(CullReason::BehindCamera), 1);
        assert_eq!(stats.pixels_written, 0);
    }

    #[test]
    fn test_render_frame_clears_and_sums() {
        let r = renderer();
        let mesh = unit_mesh();
        let mut a = mesh.instantiate();
        let mut b = mesh.instantiate();
        let mut fb = Framebuffer::new(160, 128);
        fb.clear(r.palette.resolve(7));
        let tex = Some(TextureRegion::new(0, 0, 16));
        let mut calls = [
            DrawCall {
                mesh: &mesh,
                instance: &mut a,
                transform: Mat34::translation(Vec3::from_f32(-2.0, 0.0, -10.0)),
                light_dir: Vec3::from_f32(0.0, 0.0, 1.0),
                texture: tex,
                palette: None,
            },
            DrawCall {
                mesh: &mesh,
                instance: &mut b,
                transform: Mat34::translation(Vec3::from_f32(2.0, 0.0, -10.0)),
                light_dir: Vec3::from_f32(0.0, 0.0, 1.0),
                texture: tex,
                palette: None,
            },
        ];
        let stats = r.render_frame(&mut fb, &mut calls);
        assert_eq!(stats.triangles_drawn, 2);
        assert_eq!(fb.get_pixel(0, 0), r.palette.resolve(0));
    }

    #[test]
    fn test_object_light_undoes_rotation() {
        let world = Mat34::rot_y(Fix16::from_f32(0.25));
        let light = Vec3::from_f32(0.0, 0.0, 1.0);
        let local = object_light(&world, light);
        let back = world.mul_vec(local);
        assert!((back.z.to_f32() - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_call_palette_stays_with_its_call() {
        let r = renderer();
        let mesh = unit_mesh();
        let mut a = mesh.instantiate();
        let mut b = mesh.instantiate();
        let mut fb = Framebuffer::new(160, 128);
        let mut glow = Palette::default();
        glow.remap(8, 12);
        let tex = Some(TextureRegion::new(0, 0, 16));
        let light = Vec3::from_f32(0.0, 0.0, 1.0);
        let mut calls = [
            DrawCall {
                mesh: &mesh,
                instance: &mut a,
                transform: Mat34::translation(Vec3::from_f32(-3.0, 0.0, -10.0)),
                light_dir: light,
                texture: tex,
                palette: Some(glow),
            },
            DrawCall {
                mesh: &mesh,
                instance: &mut b,
                transform: Mat34::translation(Vec3::from_f32(3.0, 0.0, -10.0)),
                light_dir: light,
                texture: tex,
                palette: None,
            },
        ];
        r.render_frame(&mut fb, &mut calls);

        // left triangle remapped, right one untouched
        assert_eq!(fb.get_pixel(60, 61), r.palette.resolve(12));
        assert_eq!(fb.get_pixel(105, 61), r.palette.resolve(8));
        assert_eq!(r.palette, Palette::default());
    }
}
