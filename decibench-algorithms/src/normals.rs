//! Vertex normal computation

use decibench_core::{TriangleMesh, Vector3f};

/// Compute per-vertex normals weighted by the corner angle of each incident
/// face, and store them on the mesh. Isolated vertices get a zero normal.
pub fn compute_vertex_normals(mesh: &mut TriangleMesh) {
    let mut accum = vec![Vector3f::zeros(); mesh.vertices.len()];

    for (fi, face) in mesh.faces.iter().enumerate() {
        let Some(normal) = mesh.face_cross(fi).try_normalize(f32::EPSILON) else {
            continue;
        };
        for k in 0..3 {
            let here = mesh.vertices[face[k]];
            let e1 = mesh.vertices[face[(k + 1) % 3]] - here;
            let e2 = mesh.vertices[face[(k + 2) % 3]] - here;
            let angle = e1.angle(&e2);
            if angle.is_finite() {
                accum[face[k]] += normal * angle;
            }
        }
    }

    let normals = accum
        .into_iter()
        .map(|n| n.try_normalize(f32::EPSILON).unwrap_or_else(Vector3f::zeros))
        .collect();
    mesh.set_normals(normals);
}

#[cfg(test)]
mod tests {
    use super::*;
    use decibench_core::primitives;

    #[test]
    fn test_sphere_normals_point_outward() {
        let mut sphere = primitives::uv_sphere(12, 16, 2.0);
        compute_vertex_normals(&mut sphere);
        let normals = sphere.normals.as_ref().unwrap();
        for (v, n) in sphere.vertices.iter().zip(normals) {
            let radial = v.coords.normalize();
            assert!(radial.dot(n) > 0.95);
            assert!((n.norm() - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn test_flat_grid_normals() {
        let mut grid = primitives::grid(3);
        compute_vertex_normals(&mut grid);
        assert!(grid.normals.unwrap().iter().all(|n| (n.z - 1.0).abs() < 1e-6));
    }
}
