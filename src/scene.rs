//! Demo scene: the ship and four enemies turning in front of the camera
//!
//! Stands in for the game layer. It owns the decoded meshes and one
//! instance per actor, animates their transforms and the engine glow, and
//! hands the renderer one draw call per actor each frame.

use crate::assets::demo::{ENEMY_TEXTURES, ENGINE_SLOT, HIT_TEXTURE, SHIP_TEXTURE};
use crate::rasterizer::{
    normalize_angle, object_light, smoothstep, DrawCall, Fix16, Framebuffer, Mat34, Mesh, MeshDecoder, MeshInstance,
    Palette, PaletteCycle, RasterStats, Renderer, TextureRegion, Vec3, MESH_LIBRARY_SCALES,
};

/// Ship plus enemy meshes, decoded in stream order
#[derive(Debug, Clone)]
pub struct MeshLibrary {
    pub ship: Mesh,
    pub enemies: Vec<Mesh>,
}

impl MeshLibrary {
    pub fn decode(map: &[u8]) -> Self {
        let scales: Vec<Fix16> = MESH_LIBRARY_SCALES.iter().map(|&s| Fix16::from_f32(s)).collect();
        let mut decoder = MeshDecoder::new(map);
        let mut meshes = decoder.decode_library(&scales).into_iter();
        let ship = meshes.next().unwrap_or_default();
        let enemies: Vec<Mesh> = meshes.collect();
        log::info!(
            "mesh library: ship {} tris, {} enemy meshes, {} bytes read",
            ship.triangles.len(),
            enemies.len(),
            decoder.position()
        );
        Self { ship, enemies }
    }

    fn get(&self, id: MeshId) -> &Mesh {
        match id {
            MeshId::Ship => &self.ship,
            MeshId::Enemy(i) => self.enemies.get(i).unwrap_or(&self.ship),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MeshId {
    Ship,
    Enemy(usize),
}

struct Actor {
    mesh: MeshId,
    instance: MeshInstance,
    position: Vec3,
    /// Euler angles in turns, applied z, then x, then y
    angles: Vec3,
    spin: Vec3,
    texture: TextureRegion,
}

impl Actor {
    fn world(&self) -> Mat34 {
        Mat34::translation(self.position)
            * Mat34::rot_y(self.angles.y)
            * Mat34::rot_x(self.angles.x)
            * Mat34::rot_z(self.angles.z)
    }
}

/// Ticks between hit flashes on the nearest enemy
const FLASH_PERIOD: u32 = 45;
const FLASH_TICKS: u32 = 4;

/// The ship takes a hit every `SHIP_HIT_PERIOD` ticks and flashes on the
/// even ticks of the following `SHIP_HIT_TICKS`
const SHIP_HIT_PERIOD: u32 = 90;
const SHIP_HIT_TICKS: u32 = 8;
/// Hull colors swapped for reds and pinks while the ship flashes
const SHIP_FLASH: [(u8, u8); 6] = [(0, 2), (1, 8), (6, 14), (9, 8), (10, 14), (13, 14)];

/// The camera eases from `CAMERA_START` to `CAMERA_REST` over this many ticks
const INTRO_TICKS: i32 = 60;
const CAMERA_START: f32 = -34.5;
const CAMERA_REST: f32 = -22.5;

pub struct DemoScene {
    library: MeshLibrary,
    actors: Vec<Actor>,
    camera_tilt: Fix16,
    /// Direction the light travels, world space
    light: Vec3,
    glow: PaletteCycle,
    /// Remaps applied to the ship's draw call only
    ship_palette: Palette,
    tick: u32,
}

impl DemoScene {
    pub fn new(library: MeshLibrary) -> Self {
        let f = Fix16::from_f32;
        let placements = [
            (Vec3::from_f32(-14.0, 7.0, -20.0), Vec3::new(f(0.003), f(0.007), Fix16::ZERO)),
            (Vec3::from_f32(13.0, 6.0, -16.0), Vec3::new(f(0.005), f(-0.004), f(0.002))),
            (Vec3::from_f32(-11.0, -8.0, -14.0), Vec3::new(Fix16::ZERO, f(0.006), f(0.004))),
            (Vec3::from_f32(15.0, -7.0, -18.0), Vec3::new(f(-0.002), f(0.003), f(0.005))),
        ];

        // enemies first so the ship paints over them
        let mut actors: Vec<Actor> = placements
            .iter()
            .enumerate()
            .take(library.enemies.len())
            .map(|(i, &(position, spin))| Actor {
                mesh: MeshId::Enemy(i),
                instance: library.enemies[i].instantiate(),
                position,
                angles: Vec3::ZERO,
                spin,
                texture: ENEMY_TEXTURES[i],
            })
            .collect();
        actors.push(Actor {
            mesh: MeshId::Ship,
            instance: library.ship.instantiate(),
            position: Vec3::from_f32(0.0, -1.0, 0.0),
            angles: Vec3::new(f(0.04), Fix16::ZERO, Fix16::ZERO),
            spin: Vec3::new(Fix16::ZERO, f(0.004), Fix16::ZERO),
            texture: SHIP_TEXTURE,
        });

        Self {
            library,
            actors,
            camera_tilt: f(0.03),
            light: Vec3::from_f32(-0.5, -0.7, -0.5).normalize(),
            glow: PaletteCycle::engine_glow(ENGINE_SLOT),
            ship_palette: Palette::default(),
            tick: 0,
        }
    }

    /// Advance one frame of animation and palette effects
    pub fn update(&mut self) {
        self.tick = self.tick.wrapping_add(1);
        for actor in self.actors.iter_mut() {
            let a = actor.angles + actor.spin;
            actor.angles = Vec3::new(normalize_angle(a.x), normalize_angle(a.y), normalize_angle(a.z));
        }

        let flashing = self.tick % FLASH_PERIOD < FLASH_TICKS;
        if let Some(actor) = self.actors.iter_mut().find(|a| a.mesh == MeshId::Enemy(2)) {
            actor.texture = if flashing { HIT_TEXTURE } else { ENEMY_TEXTURES[2] };
        }

        self.ship_palette.reset();
        let ship_hit = self.tick % SHIP_HIT_PERIOD < SHIP_HIT_TICKS;
        if ship_hit && self.tick % 2 == 0 {
            for (from, to) in SHIP_FLASH {
                self.ship_palette.remap(from, to);
            }
        }
        self.glow.advance(&mut self.ship_palette);
    }

    /// Palette the ship is drawn with this tick
    pub fn ship_palette(&self) -> &Palette {
        &self.ship_palette
    }

    /// World to camera transform for the current tick
    pub fn camera(&self) -> Mat34 {
        let t = Fix16::from_int(self.tick.min(INTRO_TICKS as u32) as i32) / Fix16::from_int(INTRO_TICKS);
        let start = Fix16::from_f32(CAMERA_START);
        let z = start + (Fix16::from_f32(CAMERA_REST) - start) * smoothstep(t);
        Mat34::translation(Vec3::new(Fix16::ZERO, Fix16::ZERO, z)) * Mat34::rot_x(self.camera_tilt)
    }

    /// One draw call per actor, enemies first. Only the ship's call carries
    /// its own palette.
    pub fn draw_calls(&mut self) -> Vec<DrawCall<'_>> {
        let camera = self.camera();
        let library = &self.library;
        let light = self.light;
        let ship_palette = &self.ship_palette;
        self.actors
            .iter_mut()
            .map(|actor| {
                let world = actor.world();
                DrawCall {
                    mesh: library.get(actor.mesh),
                    transform: camera * world,
                    light_dir: object_light(&world, light),
                    texture: Some(actor.texture),
                    instance: &mut actor.instance,
                    palette: (actor.mesh == MeshId::Ship).then(|| ship_palette.clone()),
                }
            })
            .collect()
    }

    /// Draw every actor into `fb`
    pub fn render(&mut self, renderer: &Renderer, fb: &mut Framebuffer) -> RasterStats {
        let mut calls = self.draw_calls();
        renderer.render_frame(fb, &mut calls)
    }

    pub fn tick(&self) -> u32 {
        self.tick
    }
}
