//! Built-in assets used when no cart is supplied
//!
//! The meshes are authored here as float geometry and packed into the same
//! signed-byte stream a cart's map memory carries, so the demo exercises the
//! real decoder. Sheet layout follows the cart convention:
//! - enemies: 16x16 regions at (i * 32, 32), lit variant 16 to the right
//! - hit flash: (96, 64), lit variant at (112, 64)
//! - dither thresholds: 8x8 at (0, 56)
//! - ship: 48x32 at (0, 96), lit variant at (48, 96)

use crate::rasterizer::{DitherPattern, Spritesheet, TextureRegion};

use super::cart::{Cartridge, MAP_SIZE};

pub const SHIP_TEXTURE: TextureRegion = TextureRegion::new(0, 96, 48);
pub const ENEMY_TEXTURES: [TextureRegion; 4] = [
    TextureRegion::new(0, 32, 16),
    TextureRegion::new(32, 32, 16),
    TextureRegion::new(64, 32, 16),
    TextureRegion::new(96, 32, 16),
];
pub const HIT_TEXTURE: TextureRegion = TextureRegion::new(96, 64, 16);

/// Palette slot the ship's engine is painted with; cycled at runtime
pub const ENGINE_SLOT: u8 = 12;

const SHIP_VERTICES: [[f32; 3]; 6] = [
    [0.0, 0.0, -6.0],  // nose
    [-5.0, -0.5, 3.0], // left wing
    [5.0, -0.5, 3.0],  // right wing
    [0.0, 2.0, 2.5],   // fin
    [0.0, -1.5, 2.0],  // belly
    [0.0, 0.0, 3.5],   // engine
];

const SHIP_FACES: [[usize; 3]; 8] = [
    [0, 1, 3],
    [0, 3, 2],
    [0, 4, 1],
    [0, 2, 4],
    [1, 5, 3],
    [3, 5, 2],
    [1, 4, 5],
    [5, 4, 2],
];

const OCTAHEDRON_FACES: [[usize; 3]; 8] = [
    [0, 2, 4],
    [2, 1, 4],
    [1, 3, 4],
    [3, 0, 4],
    [2, 0, 5],
    [1, 2, 5],
    [3, 1, 5],
    [0, 3, 5],
];

/// Half-extents of the four enemy octahedra, before the library scale
const ENEMY_SHAPES: [[f32; 3]; 4] = [[1.0, 1.0, 1.0], [1.5, 0.5, 1.0], [1.0, 1.0, 0.5], [0.5, 1.5, 0.5]];

/// Packs meshes into the signed-byte stream format
struct StreamWriter {
    bytes: Vec<u8>,
}

impl StreamWriter {
    fn half(&mut self, v: f32) {
        let b = (v * 2.0).round().clamp(-128.0, 127.0) as i8;
        self.bytes.push(b as u8);
    }

    fn count(&mut self, n: usize) {
        self.half(n as f32);
    }

    fn normal(&mut self, n: f32) {
        let b = (n * 127.0).round().clamp(-127.0, 127.0) as i8;
        self.bytes.push(b as u8);
    }

    /// Faces are rewound so they read clockwise on screen when seen from
    /// outside the mesh; the stored normal points outward.
    fn mesh(&mut self, vertices: &[[f32; 3]], faces: &[[usize; 3]], uv: impl Fn(usize, [f32; 3]) -> [f32; 2]) {
        let n = vertices.len() as f32;
        let center = vertices.iter().fold([0.0f32; 3], |acc, v| [acc[0] + v[0] / n, acc[1] + v[1] / n, acc[2] + v[2] / n]);

        self.count(vertices.len());
        for v in vertices {
            for &c in v {
                self.half(c);
            }
        }

        self.count(faces.len());
        for face in faces {
            let [a, mut b, mut c] = *face;
            let rh = face_normal(vertices[a], vertices[b], vertices[c]);
            let centroid = [0, 1, 2].map(|k| (vertices[a][k] + vertices[b][k] + vertices[c][k]) / 3.0 - center[k]);
            let outward = dot3(rh, centroid) > 0.0;
            if outward {
                std::mem::swap(&mut b, &mut c);
            }
            let out_dir = if outward { rh } else { rh.map(|x| -x) };
            let len = dot3(out_dir, out_dir).sqrt().max(f32::EPSILON);
            let normal = out_dir.map(|x| x / len);

            for (k, &idx) in [a, b, c].iter().enumerate() {
                self.count(idx + 1);
                self.normal(normal[k]);
                let [u, v] = uv(k, vertices[idx]);
                self.half(u);
                self.half(v);
            }
        }
    }
}

fn face_normal(a: [f32; 3], b: [f32; 3], c: [f32; 3]) -> [f32; 3] {
    let e1 = [b[0] - a[0], b[1] - a[1], b[2] - a[2]];
    let e2 = [c[0] - a[0], c[1] - a[1], c[2] - a[2]];
    [e1[1] * e2[2] - e1[2] * e2[1], e1[2] * e2[0] - e1[0] * e2[2], e1[0] * e2[1] - e1[1] * e2[0]]
}

fn dot3(a: [f32; 3], b: [f32; 3]) -> f32 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

/// Ship followed by the four enemies, padded to map size
pub fn demo_map() -> Vec<u8> {
    let mut w = StreamWriter { bytes: Vec::with_capacity(MAP_SIZE) };

    // planar top-down mapping onto the 48x32 ship region
    w.mesh(&SHIP_VERTICES, &SHIP_FACES, |_, p| [(p[0] + 5.0) * 4.7, (p[2] + 6.0) * 3.2]);

    for shape in ENEMY_SHAPES {
        let [sx, sy, sz] = shape;
        let verts = [[sx, 0.0, 0.0], [-sx, 0.0, 0.0], [0.0, sy, 0.0], [0.0, -sy, 0.0], [0.0, 0.0, sz], [0.0, 0.0, -sz]];
        w.mesh(&verts, &OCTAHEDRON_FACES, |corner, _| match corner {
            0 => [0.5, 0.5],
            1 => [15.0, 0.5],
            _ => [7.5, 15.0],
        });
    }

    w.bytes.resize(MAP_SIZE, 0);
    w.bytes
}

/// Procedural sheet matching the layout above
pub fn demo_spritesheet() -> Spritesheet {
    let mut sheet = Spritesheet::new();

    // enemies: checker of two colors, brighter on the lit side
    let enemy_colors: [(u8, u8, u8, u8); 4] = [(2, 8, 8, 14), (4, 9, 9, 10), (3, 11, 11, 7), (1, 12, 13, 6)];
    for (i, &(dark_a, dark_b, lit_a, lit_b)) in enemy_colors.iter().enumerate() {
        let region = ENEMY_TEXTURES[i];
        checker(&mut sheet, region.x, region.y, 16, 16, dark_a, dark_b);
        checker(&mut sheet, region.x + region.lit_dx, region.y, 16, 16, lit_a, lit_b);
    }

    sheet.fill_rect(HIT_TEXTURE.x, HIT_TEXTURE.y, 16, 16, 6);
    sheet.fill_rect(HIT_TEXTURE.x + HIT_TEXTURE.lit_dx, HIT_TEXTURE.y, 16, 16, 7);

    let bayer = DitherPattern::bayer();
    for y in 0..8 {
        for x in 0..8 {
            sheet.set(x as i32, 56 + y as i32, bayer.at(x, y));
        }
    }

    // ship: hull panels with an engine strip at the tail
    for (dx, hull, seam) in [(0, 5, 1), (SHIP_TEXTURE.lit_dx, 6, 13)] {
        let x0 = SHIP_TEXTURE.x + dx;
        sheet.fill_rect(x0, SHIP_TEXTURE.y, 48, 32, hull);
        for seam_x in (x0..x0 + 48).step_by(8) {
            sheet.fill_rect(seam_x, SHIP_TEXTURE.y, 1, 26, seam);
        }
        sheet.fill_rect(x0, SHIP_TEXTURE.y + 26, 48, 6, ENGINE_SLOT);
    }

    sheet
}

fn checker(sheet: &mut Spritesheet, x: i32, y: i32, w: i32, h: i32, a: u8, b: u8) {
    for ty in 0..h {
        for tx in 0..w {
            let c = if ((tx / 4) + (ty / 4)) % 2 == 0 { a } else { b };
            sheet.set(x + tx, y + ty, c);
        }
    }
}

pub fn demo_cart() -> Cartridge {
    Cartridge { sheet: demo_spritesheet(), map: demo_map() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rasterizer::{Fix16, MeshDecoder, Vec3, MESH_LIBRARY_SCALES};

    #[test]
    fn test_demo_map_decodes_to_library() {
        let map = demo_map();
        assert_eq!(map.len(), MAP_SIZE);
        let scales: Vec<Fix16> = MESH_LIBRARY_SCALES.iter().map(|&s| Fix16::from_f32(s)).collect();
        let mut dec = MeshDecoder::new(&map);
        let meshes = dec.decode_library(&scales);
        assert!(!dec.overran());

        assert_eq!(meshes[0].vertices.len(), 6);
        assert_eq!(meshes[0].triangles.len(), 8);
        assert_eq!(meshes[0].vertices[0], Vec3::from_f32(0.0, 0.0, -6.0));
        for mesh in &meshes[1..] {
            assert_eq!(mesh.vertices.len(), 6);
            assert_eq!(mesh.triangles.len(), 8);
            assert!(mesh.triangles.iter().all(|t| t.vertex_indices(6).is_some()));
        }
        // last enemy is scaled by 5
        assert_eq!(meshes[4].vertices[0], Vec3::from_f32(2.5, 0.0, 0.0));
    }

    #[test]
    fn test_normals_point_outward() {
        let map = demo_map();
        let meshes = MeshDecoder::new(&map).decode_library(&[Fix16::ONE; 5]);
        for mesh in &meshes {
            let n = Fix16::from_int(mesh.vertices.len() as i32);
            let center = mesh.vertices.iter().fold(Vec3::ZERO, |acc, &v| acc + v).scale(n.recip());
            for tri in &mesh.triangles {
                let [a, b, c] = tri.vertex_indices(mesh.vertices.len()).unwrap();
                let offset = mesh.vertices[a] + mesh.vertices[b] + mesh.vertices[c] - center.scale(Fix16::from_int(3));
                assert!(offset.dot(tri.normal) > Fix16::ZERO);
            }
        }
    }

    #[test]
    fn test_sheet_dither_block() {
        let sheet = demo_spritesheet();
        let from_sheet = DitherPattern::from_sheet(&sheet, 0, 56);
        assert_eq!(from_sheet, DitherPattern::bayer());
        assert_eq!(sheet.get(SHIP_TEXTURE.x, SHIP_TEXTURE.y + 30), ENGINE_SLOT);
    }
}
