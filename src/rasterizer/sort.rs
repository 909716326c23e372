//! Back-to-front triangle ordering
//!
//! The key is the sum of the three perspective factors: a larger factor
//! means closer to the camera, so ascending order draws far triangles first.

use super::fixed::Fix16;
use super::math::Vec3;
use super::types::Triangle;

/// Lists up to this length use insertion sort, longer ones the std stable sort
pub const INSERTION_SORT_MAX: usize = 32;

/// Write each triangle's sort key. Invalid triangles get 0.
pub fn assign_sort_keys(triangles: &mut [Triangle], projected: &[Vec3]) {
    for tri in triangles.iter_mut() {
        tri.z = match tri.vertex_indices(projected.len()) {
            Some([a, b, c]) => projected[a].z + projected[b].z + projected[c].z,
            None => Fix16::ZERO,
        };
    }
}

/// Assign keys and sort ascending. Stable: equal keys keep their order.
pub fn sort_triangles(triangles: &mut [Triangle], projected: &[Vec3]) {
    assign_sort_keys(triangles, projected);
    if triangles.len() <= INSERTION_SORT_MAX {
        insertion_sort(triangles);
    } else {
        triangles.sort_by_key(|t| t.z);
    }
}

/// Stable ascending insertion sort by key. Returns the number of key
/// comparisons made.
pub(crate) fn insertion_sort(triangles: &mut [Triangle]) -> usize {
    let mut comparisons = 0;
    for i in 1..triangles.len() {
        let mut j = i;
        while j > 0 {
            comparisons += 1;
            if triangles[j - 1].z <= triangles[j].z {
                break;
            }
            triangles.swap(j - 1, j);
            j -= 1;
        }
    }
    comparisons
}
