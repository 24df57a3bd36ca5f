//! Non-manifold repair

use crate::repair::remove_unreferenced_vertices;
use crate::topology::{edge_face_map, vertex_face_map, DisjointSets};
use decibench_core::TriangleMesh;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use tracing::debug;

/// Make every edge shared by at most two faces by deleting faces.
///
/// On each over-shared edge the smallest faces go first, so the two
/// largest faces remain. Returns the number of faces removed.
pub fn repair_non_manifold_edges(mesh: &mut TriangleMesh) -> usize {
    let mut crowded: Vec<_> = edge_face_map(&mesh.faces)
        .into_iter()
        .filter(|(_, users)| users.len() > 2)
        .collect();
    if crowded.is_empty() {
        return 0;
    }
    crowded.sort_unstable_by_key(|(edge, _)| *edge);

    let areas: Vec<f32> = (0..mesh.faces.len()).map(|i| mesh.face_area(i)).collect();
    let mut doomed = vec![false; mesh.faces.len()];

    for (_, mut users) in crowded {
        users.retain(|&f| !doomed[f]);
        if users.len() <= 2 {
            continue;
        }
        users.sort_by(|&a, &b| areas[a].total_cmp(&areas[b]).then(a.cmp(&b)));
        for &f in &users[..users.len() - 2] {
            doomed[f] = true;
        }
    }

    let before = mesh.faces.len();
    let mut it = doomed.iter();
    mesh.faces.retain(|_| !it.next().copied().unwrap_or(false));
    remove_unreferenced_vertices(mesh);

    let removed = before - mesh.faces.len();
    debug!(removed, "Removed faces on non-manifold edges");
    removed
}

/// Split vertices whose incident faces form more than one fan.
///
/// Two faces around a vertex belong to the same fan when they share an
/// edge through that vertex. The first fan keeps the original vertex and
/// every other fan gets its own copy at the same position. Returns the
/// number of vertices added.
pub fn repair_non_manifold_vertices(mesh: &mut TriangleMesh) -> usize {
    let vertex_faces = vertex_face_map(mesh.vertices.len(), &mesh.faces);
    let mut added = 0;

    for (v, incident) in vertex_faces.iter().enumerate() {
        if incident.len() < 2 {
            continue;
        }

        let mut fans = DisjointSets::new(incident.len());
        let mut first_with: HashMap<usize, usize> = HashMap::new();
        for (local, &f) in incident.iter().enumerate() {
            for &w in &mesh.faces[f] {
                if w == v {
                    continue;
                }
                match first_with.entry(w) {
                    Entry::Occupied(e) => fans.union(*e.get(), local),
                    Entry::Vacant(e) => {
                        e.insert(local);
                    }
                }
            }
        }

        let (labels, count) = fans.labels();
        if count < 2 {
            continue;
        }

        let mut copies = vec![v; count];
        for slot in copies.iter_mut().skip(1) {
            *slot = duplicate_vertex(mesh, v);
        }
        for (local, &f) in incident.iter().enumerate() {
            let target = copies[labels[local]];
            if target == v {
                continue;
            }
            for corner in mesh.faces[f].iter_mut() {
                if *corner == v {
                    *corner = target;
                }
            }
        }
        added += count - 1;
    }

    if added > 0 {
        debug!(added, "Split non-manifold vertices");
    }
    added
}

fn duplicate_vertex(mesh: &mut TriangleMesh, v: usize) -> usize {
    let idx = mesh.add_vertex(mesh.vertices[v]);
    if let Some(normals) = &mut mesh.normals {
        let n = normals[v];
        normals.push(n);
    }
    if let Some(colors) = &mut mesh.colors {
        let c = colors[v];
        colors.push(c);
    }
    idx
}

/// Count edges shared by more than two faces
pub fn non_manifold_edge_count(mesh: &TriangleMesh) -> usize {
    edge_face_map(&mesh.faces)
        .values()
        .filter(|users| users.len() > 2)
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use decibench_core::Point3f;

    #[test]
    fn test_fin_on_shared_edge_is_removed() {
        // Three faces on edge 0-1; the small one goes
        let mut mesh = TriangleMesh::from_vertices_and_faces(
            vec![
                Point3f::new(0.0, 0.0, 0.0),
                Point3f::new(1.0, 0.0, 0.0),
                Point3f::new(0.5, 2.0, 0.0),
                Point3f::new(0.5, -2.0, 0.0),
                Point3f::new(0.5, 0.0, 0.1),
            ],
            vec![[0, 1, 2], [1, 0, 3], [0, 1, 4]],
        );
        assert_eq!(non_manifold_edge_count(&mesh), 1);
        assert_eq!(repair_non_manifold_edges(&mut mesh), 1);
        assert_eq!(mesh.face_count(), 2);
        assert_eq!(mesh.vertex_count(), 4);
        assert_eq!(non_manifold_edge_count(&mesh), 0);
    }

    #[test]
    fn test_bowtie_vertex_is_split() {
        // Two triangles touching only at vertex 0
        let mut mesh = TriangleMesh::from_vertices_and_faces(
            vec![
                Point3f::new(0.0, 0.0, 0.0),
                Point3f::new(1.0, 1.0, 0.0),
                Point3f::new(1.0, -1.0, 0.0),
                Point3f::new(-1.0, 1.0, 0.0),
                Point3f::new(-1.0, -1.0, 0.0),
            ],
            vec![[0, 2, 1], [0, 3, 4]],
        );
        assert_eq!(repair_non_manifold_vertices(&mut mesh), 1);
        assert_eq!(mesh.vertex_count(), 6);
        assert_eq!(mesh.faces[0][0], 0);
        assert_eq!(mesh.faces[1][0], 5);
        assert_eq!(mesh.vertices[5], mesh.vertices[0]);
    }

    #[test]
    fn test_closed_fan_is_untouched() {
        let mut mesh = decibench_core::primitives::uv_sphere(6, 8, 1.0);
        let before = mesh.vertex_count();
        assert_eq!(repair_non_manifold_vertices(&mut mesh), 0);
        assert_eq!(mesh.vertex_count(), before);
    }
}
