//! Connected component cleanup

use crate::repair::remove_unreferenced_vertices;
use crate::topology::face_components;
use decibench_core::TriangleMesh;
use tracing::debug;

/// Remove edge-connected face components with fewer than `min_faces` faces.
///
/// Returns the number of faces removed.
pub fn remove_small_components(mesh: &mut TriangleMesh, min_faces: usize) -> usize {
    if mesh.faces.is_empty() || min_faces <= 1 {
        return 0;
    }

    let (labels, count) = face_components(&mesh.faces);
    let mut sizes = vec![0usize; count];
    for &label in &labels {
        sizes[label] += 1;
    }

    let small = sizes.iter().filter(|&&s| s < min_faces).count();
    if small == 0 {
        return 0;
    }

    let before = mesh.faces.len();
    let mut keep = labels.iter().map(|&l| sizes[l] >= min_faces);
    mesh.faces.retain(|_| keep.next().unwrap_or(false));
    remove_unreferenced_vertices(mesh);

    let removed = before - mesh.faces.len();
    debug!(components = count, small, removed, "Removed small components");
    removed
}

/// Number of edge-connected face components
pub fn component_count(mesh: &TriangleMesh) -> usize {
    face_components(&mesh.faces).1
}
