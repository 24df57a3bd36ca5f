//! Procedural meshes used by tests, benches and smoke runs.
//!
//! All closed primitives are wound counter-clockwise when seen from outside.

use crate::mesh::TriangleMesh;
use crate::point::Point3f;
use std::f32::consts::PI;

/// Axis-aligned cube of side `extent` centred on the origin (8 vertices, 12 faces)
pub fn box_mesh(extent: f32) -> TriangleMesh {
    let h = extent * 0.5;
    let vertices = vec![
        Point3f::new(-h, -h, -h),
        Point3f::new(h, -h, -h),
        Point3f::new(h, h, -h),
        Point3f::new(-h, h, -h),
        Point3f::new(-h, -h, h),
        Point3f::new(h, -h, h),
        Point3f::new(h, h, h),
        Point3f::new(-h, h, h),
    ];
    let faces = vec![
        [0, 2, 1], [0, 3, 2], // -z
        [4, 5, 6], [4, 6, 7], // +z
        [0, 1, 5], [0, 5, 4], // -y
        [3, 7, 6], [3, 6, 2], // +y
        [0, 4, 7], [0, 7, 3], // -x
        [1, 2, 6], [1, 6, 5], // +x
    ];
    TriangleMesh::from_vertices_and_faces(vertices, faces)
}

/// Latitude/longitude sphere with `2 * segments * (rings - 1)` faces
pub fn uv_sphere(rings: usize, segments: usize, radius: f32) -> TriangleMesh {
    displaced_sphere(rings, segments, |_, _| radius)
}

/// Sphere whose radius is modulated by a smooth bump pattern. Gives an
/// organic, scan-like surface for tests that need curvature variation.
pub fn bumpy_sphere(rings: usize, segments: usize, radius: f32, amplitude: f32) -> TriangleMesh {
    displaced_sphere(rings, segments, |theta, phi| {
        radius * (1.0 + amplitude * (5.0 * theta).sin() * (4.0 * phi).cos())
    })
}

fn displaced_sphere<F>(rings: usize, segments: usize, radius_at: F) -> TriangleMesh
where
    F: Fn(f32, f32) -> f32,
{
    let rings = rings.max(2);
    let segments = segments.max(3);
    let mut mesh = TriangleMesh::new();

    let top = mesh.add_vertex(Point3f::new(0.0, 0.0, radius_at(0.0, 0.0)));
    for i in 1..rings {
        let theta = PI * i as f32 / rings as f32;
        for j in 0..segments {
            let phi = 2.0 * PI * j as f32 / segments as f32;
            let r = radius_at(theta, phi);
            mesh.add_vertex(Point3f::new(
                r * theta.sin() * phi.cos(),
                r * theta.sin() * phi.sin(),
                r * theta.cos(),
            ));
        }
    }
    let bottom = mesh.add_vertex(Point3f::new(0.0, 0.0, -radius_at(PI, 0.0)));

    let ring = |i: usize, j: usize| 1 + i * segments + (j % segments);

    for j in 0..segments {
        mesh.add_face([top, ring(0, j), ring(0, j + 1)]);
    }
    for i in 0..rings - 2 {
        for j in 0..segments {
            let a = ring(i, j);
            let b = ring(i, j + 1);
            let c = ring(i + 1, j);
            let d = ring(i + 1, j + 1);
            mesh.add_face([a, c, d]);
            mesh.add_face([a, d, b]);
        }
    }
    let last = rings - 2;
    for j in 0..segments {
        mesh.add_face([bottom, ring(last, j + 1), ring(last, j)]);
    }
    mesh
}

/// Flat `size x size` grid on the unit square in the z = 0 plane
pub fn grid(size: usize) -> TriangleMesh {
    height_field(size, |_, _| 0.0)
}

/// Open `size x size` grid on the unit square displaced by `height(x, y)`
pub fn height_field<F>(size: usize, height: F) -> TriangleMesh
where
    F: Fn(f32, f32) -> f32,
{
    let size = size.max(1);
    let mut mesh = TriangleMesh::new();
    for j in 0..=size {
        for i in 0..=size {
            let x = i as f32 / size as f32;
            let y = j as f32 / size as f32;
            mesh.add_vertex(Point3f::new(x, y, height(x, y)));
        }
    }
    let idx = |i: usize, j: usize| j * (size + 1) + i;
    for j in 0..size {
        for i in 0..size {
            let v00 = idx(i, j);
            let v10 = idx(i + 1, j);
            let v01 = idx(i, j + 1);
            let v11 = idx(i + 1, j + 1);
            mesh.add_face([v00, v10, v11]);
            mesh.add_face([v00, v11, v01]);
        }
    }
    mesh
}
