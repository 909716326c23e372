//! Mesh stream decoding
//!
//! Meshes are packed into map memory as signed bytes. Every value is stored
//! doubled, so a byte decodes to `byte / 2` with half-unit precision:
//!
//! ```text
//! vertex_count
//! vertex_count * (x, y, z)
//! triangle_count
//! triangle_count * 3 * (index + 1, normal component, u, v)
//! ```
//!
//! Decoding never fails. Counts are clamped, reads past the end of the
//! buffer yield 0, and both conditions are reported through `log::warn!`.

use super::fixed::Fix16;
use super::math::{Vec2, Vec3};
use super::types::{Mesh, Triangle, MAX_MESH_TRIANGLES, MAX_MESH_VERTICES};

/// Normal components are stored as `n * 127`; after halving, divide by this
const NORMAL_SCALE: Fix16 = Fix16::from_raw(0x003F_8000);

/// Scales for the packed mesh library: the ship, then four enemy sizes
pub const MESH_LIBRARY_SCALES: [f32; 5] = [1.0, 1.0, 2.5, 3.0, 5.0];

/// Cursor over a packed mesh stream. The position carries over between
/// meshes so consecutive meshes decode in order.
#[derive(Debug, Clone)]
pub struct MeshDecoder<'a> {
    data: &'a [u8],
    pos: usize,
    overrun: bool,
}

impl<'a> MeshDecoder<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self::at(data, 0)
    }

    pub fn at(data: &'a [u8], pos: usize) -> Self {
        Self { data, pos, overrun: false }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    /// True once any read has gone past the end of the buffer
    pub fn overran(&self) -> bool {
        self.overrun
    }

    fn next_byte(&mut self) -> i32 {
        let value = match self.data.get(self.pos) {
            Some(&b) => b as i8 as i32,
            None => {
                self.overrun = true;
                0
            }
        };
        self.pos += 1;
        value
    }

    /// Next value in half units
    pub fn read_half(&mut self) -> Fix16 {
        Fix16::from_int(self.next_byte()).half()
    }

    /// Next value as a halved integer, truncated toward zero
    pub fn read_int(&mut self) -> i32 {
        self.next_byte() / 2
    }

    fn read_count(&mut self, what: &str, max: usize) -> usize {
        let raw = self.read_int();
        let count = raw.clamp(0, max as i32) as usize;
        if count as i32 != raw {
            log::warn!("mesh {} count {} clamped to {} at byte {}", what, raw, count, self.pos - 1);
        }
        count
    }

    /// Decode one mesh, multiplying vertex positions by `scale`
    pub fn decode_mesh(&mut self, scale: Fix16) -> Mesh {
        let start = self.pos;
        let was_overrun = self.overrun;

        let vertex_count = self.read_count("vertex", MAX_MESH_VERTICES);
        let mut vertices = Vec::with_capacity(vertex_count);
        for _ in 0..vertex_count {
            let x = self.read_half();
            let y = self.read_half();
            let z = self.read_half();
            vertices.push(Vec3::new(x, y, z).scale(scale));
        }

        let triangle_count = self.read_count("triangle", MAX_MESH_TRIANGLES);
        let mut triangles = Vec::with_capacity(triangle_count);
        for _ in 0..triangle_count {
            let mut indices = [0i32; 3];
            let mut normal = [Fix16::ZERO; 3];
            let mut uvs = [Vec2::ZERO; 3];
            for k in 0..3 {
                indices[k] = self.read_int() - 1;
                normal[k] = self.read_half() / NORMAL_SCALE;
                let u = self.read_half();
                let v = self.read_half();
                uvs[k] = Vec2::new(u, v);
            }
            triangles.push(Triangle::new(indices, uvs, Vec3::new(normal[0], normal[1], normal[2])));
        }

        if self.overrun && !was_overrun {
            log::warn!(
                "mesh stream ended early: mesh at byte {} needs {} bytes, buffer has {}",
                start,
                self.pos,
                self.data.len()
            );
        }
        log::debug!(
            "decoded mesh at byte {}: {} vertices, {} triangles",
            start,
            vertex_count,
            triangle_count
        );

        Mesh::new(vertices, triangles)
    }

    /// Decode consecutive meshes, one per scale
    pub fn decode_library(&mut self, scales: &[Fix16]) -> Vec<Mesh> {
        scales.iter().map(|&s| self.decode_mesh(s)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn b(v: i32) -> u8 {
        v as i8 as u8
    }

    /// One triangle over three vertices, values already doubled
    fn single_triangle() -> Vec<u8> {
        let mut bytes = vec![b(6)];
        bytes.extend([b(0), b(0), b(0)]);
        bytes.extend([b(2), b(0), b(0)]);
        bytes.extend([b(0), b(-3), b(4)]);
        bytes.push(b(2));
        for (idx, n, u, v) in [(1, 0, 0, 0), (2, 0, 8, 0), (3, 127, 0, 16)] {
            bytes.extend([b(idx * 2), b(n), b(u), b(v)]);
        }
        bytes
    }

    #[test]
    fn test_decode_values() {
        let data = single_triangle();
        let mut dec = MeshDecoder::new(&data);
        let mesh = dec.decode_mesh(Fix16::ONE);

        assert_eq!(mesh.vertices.len(), 3);
        assert_eq!(mesh.vertices[1], Vec3::from_f32(1.0, 0.0, 0.0));
        assert_eq!(mesh.vertices[2], Vec3::from_f32(0.0, -1.5, 2.0));

        let tri = &mesh.triangles[0];
        assert_eq!(tri.indices, [0, 1, 2]);
        assert_eq!(tri.uvs[1], Vec2::from_f32(4.0, 0.0));
        assert_eq!(tri.uvs[2], Vec2::from_f32(0.0, 8.0));
        assert_eq!(tri.normal.z, Fix16::ONE);
        assert_eq!(dec.position(), data.len());
        assert!(!dec.overran());
    }

    #[test]
    fn test_decode_scale() {
        let data = single_triangle();
        let mesh = MeshDecoder::new(&data).decode_mesh(Fix16::from_f32(2.5));
        assert_eq!(mesh.vertices[1], Vec3::from_f32(2.5, 0.0, 0.0));
    }

    #[test]
    fn test_decode_is_deterministic() {
        let data = single_triangle();
        let a = MeshDecoder::new(&data).decode_mesh(Fix16::ONE);
        let b = MeshDecoder::new(&data).decode_mesh(Fix16::ONE);
        assert_eq!(a, b);
    }

    #[test]
    fn test_negative_count_clamps_to_zero() {
        let data = [b(-8), b(0)];
        let mesh = MeshDecoder::new(&data).decode_mesh(Fix16::ONE);
        assert!(mesh.vertices.is_empty());
        assert!(mesh.triangles.is_empty());
    }

    #[test]
    fn test_zero_index_becomes_invalid() {
        let mut data = single_triangle();
        // first corner's index byte
        data[11] = 0;
        let mesh = MeshDecoder::new(&data).decode_mesh(Fix16::ONE);
        assert_eq!(mesh.triangles[0].indices[0], -1);
        assert_eq!(mesh.triangles[0].vertex_indices(3), None);
    }

    #[test]
    fn test_truncated_stream_reads_zero() {
        let data = single_triangle();
        let short = &data[..14];
        let mut dec = MeshDecoder::new(short);
        let mesh = dec.decode_mesh(Fix16::ONE);
        assert!(dec.overran());
        assert_eq!(mesh.triangles.len(), 1);
        assert_eq!(mesh.triangles[0].indices[1], -1);
    }

    #[test]
    fn test_library_cursor_persists() {
        let one = single_triangle();
        let mut data = one.clone();
        data.extend(&one);
        let scales = [Fix16::ONE, Fix16::TWO];
        let mut dec = MeshDecoder::new(&data);
        let meshes = dec.decode_library(&scales);
        assert_eq!(meshes.len(), 2);
        assert_eq!(meshes[1].vertices[1], Vec3::from_f32(2.0, 0.0, 0.0));
        assert_eq!(dec.position(), data.len());
    }
}
