//! Face orientation
//!
//! `orient_coherently` propagates winding across manifold edges so that
//! neighbouring faces agree. `orient_by_geometry` additionally flips whole
//! closed components whose enclosed volume comes out negative, so normals
//! point outwards.

use crate::topology::{directed_edges, edge_face_map, edge_key, face_components};
use decibench_core::{to_f64, Error, Result, TriangleMesh};
use std::collections::VecDeque;
use tracing::debug;

/// Make winding consistent within each edge-connected component.
///
/// The first face of every component (in index order) keeps its winding.
/// Fails with [`Error::Algorithm`] if a component is not orientable.
/// Returns the number of faces flipped.
pub fn orient_coherently(mesh: &mut TriangleMesh) -> Result<usize> {
    let edges = edge_face_map(&mesh.faces);
    let n = mesh.faces.len();
    let mut visited = vec![false; n];
    let mut flipped = 0;
    let mut queue = VecDeque::new();

    for seed in 0..n {
        if visited[seed] {
            continue;
        }
        visited[seed] = true;
        queue.push_back(seed);

        while let Some(f) = queue.pop_front() {
            for (a, b) in directed_edges(&mesh.faces[f]) {
                let Some(users) = edges.get(&edge_key(a, b)) else {
                    continue;
                };
                // Only manifold edges carry an orientation constraint
                if users.len() != 2 {
                    continue;
                }
                let g = if users[0] == f { users[1] } else { users[0] };
                let agrees = !has_directed_edge(&mesh.faces[g], a, b);
                if visited[g] {
                    if !agrees {
                        return Err(Error::Algorithm(format!(
                            "mesh is not orientable (faces {f} and {g} conflict on edge {a}-{b})"
                        )));
                    }
                    continue;
                }
                if !agrees {
                    mesh.faces[g].swap(1, 2);
                    flipped += 1;
                }
                visited[g] = true;
                queue.push_back(g);
            }
        }
    }

    if flipped > 0 {
        debug!(flipped, "Reoriented faces coherently");
    }
    Ok(flipped)
}

fn has_directed_edge(face: &[usize; 3], a: usize, b: usize) -> bool {
    directed_edges(face).contains(&(a, b))
}

/// Orient faces coherently and turn each closed component outward.
///
/// Fails when the mesh is not orientable or when a component is open, since
/// an open surface has no inside to decide the direction from. Returns the
/// number of faces whose winding changed.
pub fn orient_by_geometry(mesh: &mut TriangleMesh) -> Result<usize> {
    let open_edges = edge_face_map(&mesh.faces)
        .values()
        .filter(|users| users.len() == 1)
        .count();
    if open_edges > 0 {
        return Err(Error::Algorithm(format!(
            "cannot orient by geometry: mesh has {open_edges} boundary edges"
        )));
    }

    let before = mesh.faces.clone();
    orient_coherently(mesh)?;

    let (labels, count) = face_components(&mesh.faces);
    let mut volume = vec![0.0f64; count];
    let mut anchor = vec![None; count];
    for (fi, face) in mesh.faces.iter().enumerate() {
        let label = labels[fi];
        // Volume relative to a point of the component keeps it translation invariant
        let origin = *anchor[label].get_or_insert_with(|| to_f64(&mesh.vertices[face[0]]));
        let p = to_f64(&mesh.vertices[face[0]]) - origin;
        let q = to_f64(&mesh.vertices[face[1]]) - origin;
        let r = to_f64(&mesh.vertices[face[2]]) - origin;
        volume[label] += p.dot(&q.cross(&r)) / 6.0;
    }

    for (fi, face) in mesh.faces.iter_mut().enumerate() {
        if volume[labels[fi]] < 0.0 {
            face.swap(1, 2);
        }
    }

    let changed = before
        .iter()
        .zip(&mesh.faces)
        .filter(|(a, b)| a != b)
        .count();
    Ok(changed)
}

/// Signed volume enclosed by the mesh (positive when outward facing)
pub fn signed_volume(mesh: &TriangleMesh) -> f64 {
    mesh.faces
        .iter()
        .map(|&[a, b, c]| {
            let p = to_f64(&mesh.vertices[a]).coords;
            let q = to_f64(&mesh.vertices[b]).coords;
            let r = to_f64(&mesh.vertices[c]).coords;
            p.dot(&q.cross(&r)) / 6.0
        })
        .sum()
}
