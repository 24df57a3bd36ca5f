//! Vertex welding and duplicate cleanup.
//!
//! Every pass edits the mesh in place and returns how many elements it
//! merged or removed. Passes that orphan vertices compact the vertex list
//! before returning, remapping normals and colors along with positions.

use decibench_core::{Drawable, Point3f, TriangleMesh};
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Weld vertices closer than `threshold` (absolute units).
///
/// Uses a spatial hash with cells of `2 * threshold` and checks the 3x3x3
/// neighbourhood of each vertex. Vertices are visited in index order and each
/// unmerged vertex absorbs the later unmerged vertices within `threshold`, so
/// every vertex snaps to the first representative in reach. Merging is not
/// transitive: a chain of vertices spaced just under `threshold` apart keeps
/// every other link. Faces that collapse are removed.
///
/// Returns the number of vertices merged away.
pub fn merge_close_vertices(mesh: &mut TriangleMesh, threshold: f32) -> usize {
    if mesh.vertices.is_empty() || threshold <= 0.0 || !threshold.is_finite() {
        return 0;
    }

    let cell_size = threshold as f64 * 2.0;
    let cell_of = |p: &Point3f| -> (i64, i64, i64) {
        (
            (p.x as f64 / cell_size).floor() as i64,
            (p.y as f64 / cell_size).floor() as i64,
            (p.z as f64 / cell_size).floor() as i64,
        )
    };

    let mut spatial_hash: HashMap<(i64, i64, i64), Vec<usize>> = HashMap::new();
    for (idx, v) in mesh.vertices.iter().enumerate() {
        spatial_hash.entry(cell_of(v)).or_default().push(idx);
    }

    let mut remap: Vec<usize> = (0..mesh.vertices.len()).collect();
    let mut merged = 0;

    for idx in 0..mesh.vertices.len() {
        if remap[idx] != idx {
            continue;
        }
        let p = mesh.vertices[idx];
        let (cx, cy, cz) = cell_of(&p);
        for dx in -1..=1 {
            for dy in -1..=1 {
                for dz in -1..=1 {
                    let Some(candidates) = spatial_hash.get(&(cx + dx, cy + dy, cz + dz)) else {
                        continue;
                    };
                    for &other in candidates {
                        if other <= idx || remap[other] != other {
                            continue;
                        }
                        if (mesh.vertices[other] - p).norm() < threshold {
                            remap[other] = idx;
                            merged += 1;
                        }
                    }
                }
            }
        }
    }

    if merged == 0 {
        return 0;
    }

    apply_vertex_remap(mesh, &remap);
    let collapsed = remove_degenerate_faces(mesh);
    remove_unreferenced_vertices(mesh);
    debug!(merged, collapsed, threshold, "Merged close vertices");
    merged
}

/// Weld vertices using a threshold given as a percentage of the bounding
/// box diagonal.
pub fn merge_close_vertices_percent(mesh: &mut TriangleMesh, percent: f32) -> usize {
    let threshold = mesh.diagonal() * percent / 100.0;
    merge_close_vertices(mesh, threshold)
}

/// Merge vertices whose positions are bit-identical.
///
/// Returns the number of vertices merged away.
pub fn remove_duplicate_vertices(mesh: &mut TriangleMesh) -> usize {
    let mut first_at: HashMap<[u32; 3], usize> = HashMap::with_capacity(mesh.vertices.len());
    let mut remap: Vec<usize> = Vec::with_capacity(mesh.vertices.len());
    let mut merged = 0;

    for (idx, v) in mesh.vertices.iter().enumerate() {
        let key = [v.x, v.y, v.z].map(|c| if c == 0.0 { 0 } else { c.to_bits() });
        let rep = *first_at.entry(key).or_insert(idx);
        if rep != idx {
            merged += 1;
        }
        remap.push(rep);
    }

    if merged > 0 {
        apply_vertex_remap(mesh, &remap);
        remove_degenerate_faces(mesh);
        remove_unreferenced_vertices(mesh);
    }
    merged
}

/// Remove faces that use the same vertex set as an earlier face,
/// regardless of winding.
///
/// Returns the number of faces removed.
pub fn remove_duplicate_faces(mesh: &mut TriangleMesh) -> usize {
    let before = mesh.faces.len();
    let mut seen: HashSet<[usize; 3]> = HashSet::with_capacity(before);
    mesh.faces.retain(|face| {
        let mut key = *face;
        key.sort_unstable();
        seen.insert(key)
    });
    before - mesh.faces.len()
}

/// Remove faces referencing the same vertex twice.
///
/// Returns the number of faces removed.
pub fn remove_degenerate_faces(mesh: &mut TriangleMesh) -> usize {
    let before = mesh.faces.len();
    mesh.faces
        .retain(|&[a, b, c]| a != b && b != c && a != c);
    before - mesh.faces.len()
}

/// Drop vertices not referenced by any face and compact indices.
///
/// Returns the number of vertices removed.
pub fn remove_unreferenced_vertices(mesh: &mut TriangleMesh) -> usize {
    let mut used = vec![false; mesh.vertices.len()];
    for face in &mesh.faces {
        for &v in face {
            used[v] = true;
        }
    }
    let removed = used.iter().filter(|&&u| !u).count();
    if removed == 0 {
        return 0;
    }

    let mut new_index = vec![usize::MAX; mesh.vertices.len()];
    let mut next = 0;
    for (old, &keep) in used.iter().enumerate() {
        if keep {
            new_index[old] = next;
            next += 1;
        }
    }

    mesh.vertices = retain_indexed(&mesh.vertices, &used);
    if let Some(normals) = mesh.normals.take() {
        if normals.len() == used.len() {
            mesh.normals = Some(retain_indexed(&normals, &used));
        }
    }
    if let Some(colors) = mesh.colors.take() {
        if colors.len() == used.len() {
            mesh.colors = Some(retain_indexed(&colors, &used));
        }
    }
    for face in &mut mesh.faces {
        for v in face.iter_mut() {
            *v = new_index[*v];
        }
    }
    removed
}

fn retain_indexed<T: Copy>(items: &[T], keep: &[bool]) -> Vec<T> {
    items
        .iter()
        .zip(keep)
        .filter_map(|(item, &k)| k.then_some(*item))
        .collect()
}

/// Point every face corner at its representative, resolving chains first
fn apply_vertex_remap(mesh: &mut TriangleMesh, remap: &[usize]) {
    let mut resolved = remap.to_vec();
    for i in 0..resolved.len() {
        let mut target = resolved[i];
        while resolved[target] != target {
            target = resolved[target];
        }
        resolved[i] = target;
    }
    for face in &mut mesh.faces {
        for v in face.iter_mut() {
            *v = resolved[*v];
        }
    }
}
