//! Quadric edge collapse decimation
//!
//! Iteratively contracts the edge with the lowest quadric error (Garland &
//! Heckbert) until the face budget is met. Candidates live in an indexed
//! priority queue keyed by edge, so costs around a contracted vertex are
//! updated in place instead of piling up duplicates. Collapses are guarded
//! by the link condition, triangle quality and normal flip checks, and
//! boundary constraints.

use crate::quadric::{vertex_quadrics, Quadric};
use crate::MeshSimplifier;
use decibench_core::{to_f32, to_f64, Error, Point3d, Result, TriangleMesh, Vector3d, Vector3f};
use priority_queue::PriorityQueue;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashSet;
use tracing::debug;

/// Quadric floor so that quality scaling still ranks perfectly flat collapses
const QUADRIC_EPSILON: f64 = 1e-15;
/// Cost multiplier for collapses that flip a face normal
const NORMAL_FLIP_PENALTY: f64 = 1000.0;

type Edge = (usize, usize);

#[inline]
fn edge_key(a: usize, b: usize) -> Edge {
    if a < b {
        (a, b)
    } else {
        (b, a)
    }
}

/// Triangle shape quality in `[0, 1]`, 1 for equilateral
pub fn triangle_quality(a: &Point3d, b: &Point3d, c: &Point3d) -> f64 {
    let cross = (b - a).cross(&(c - a)).norm();
    let sum_sq = (b - a).norm_squared() + (c - b).norm_squared() + (a - c).norm_squared();
    if sum_sq <= 0.0 {
        return 0.0;
    }
    2.0 * 3f64.sqrt() * cross / sum_sq
}

// ============================================================
// Working mesh
// ============================================================

struct CollapseMesh {
    positions: Vec<Point3d>,
    faces: Vec<[usize; 3]>,
    face_alive: Vec<bool>,
    /// Incident faces per vertex; may hold dead faces until pruned
    vertex_faces: Vec<Vec<usize>>,
    vertex_alive: Vec<bool>,
    boundary: Vec<bool>,
    quadrics: Vec<Quadric>,
    normals: Option<Vec<Vector3f>>,
    colors: Option<Vec<[u8; 3]>>,
    active_faces: usize,
}

impl CollapseMesh {
    fn from_triangle_mesh(mesh: &TriangleMesh) -> Self {
        let positions: Vec<Point3d> = mesh.vertices.iter().map(to_f64).collect();
        let nv = positions.len();

        let mut vertex_faces = vec![Vec::new(); nv];
        for (fi, face) in mesh.faces.iter().enumerate() {
            for &v in face {
                vertex_faces[v].push(fi);
            }
        }

        let mut edge_uses: std::collections::HashMap<Edge, u32> =
            std::collections::HashMap::with_capacity(mesh.faces.len() * 3 / 2);
        for face in &mesh.faces {
            for k in 0..3 {
                *edge_uses.entry(edge_key(face[k], face[(k + 1) % 3])).or_default() += 1;
            }
        }
        let mut boundary = vec![false; nv];
        for ((a, b), uses) in edge_uses {
            if uses == 1 {
                boundary[a] = true;
                boundary[b] = true;
            }
        }

        let quadrics = vertex_quadrics(&positions, &mesh.faces);
        let vertex_alive = vertex_faces.iter().map(|f| !f.is_empty()).collect();

        Self {
            positions,
            faces: mesh.faces.clone(),
            face_alive: vec![true; mesh.faces.len()],
            vertex_faces,
            vertex_alive,
            boundary,
            quadrics,
            normals: mesh.normals.clone(),
            colors: mesh.colors.clone(),
            active_faces: mesh.faces.len(),
        }
    }

    fn live_faces(&self, v: usize) -> impl Iterator<Item = usize> + '_ {
        self.vertex_faces[v]
            .iter()
            .copied()
            .filter(move |&f| self.face_alive[f])
    }

    fn neighbors(&self, v: usize) -> HashSet<usize> {
        self.live_faces(v)
            .flat_map(|f| self.faces[f])
            .filter(|&w| w != v)
            .collect()
    }

    fn edge_face_count(&self, a: usize, b: usize) -> usize {
        self.live_faces(a)
            .filter(|&f| self.faces[f].contains(&b))
            .count()
    }

    /// Common neighbours must be exactly the apices of the edge's faces
    fn link_condition(&self, a: usize, b: usize, edge_faces: usize) -> bool {
        let na = self.neighbors(a);
        let nb = self.neighbors(b);
        na.intersection(&nb).count() == edge_faces
    }

    /// Contracting the edge must not stack two faces on the same vertex set
    fn creates_duplicate_face(&self, a: usize, b: usize) -> bool {
        let mut seen = HashSet::new();
        for f in self.live_faces(a).chain(self.live_faces(b)) {
            let face = self.faces[f];
            if face.contains(&a) && face.contains(&b) {
                continue;
            }
            let mut key = face.map(|v| if v == b { a } else { v });
            key.sort_unstable();
            if !seen.insert(key) {
                return true;
            }
        }
        false
    }

    fn collapse(&mut self, kept: usize, gone: usize, position: Point3d) {
        let gone_faces: Vec<usize> = self.live_faces(gone).collect();
        for f in gone_faces {
            if self.faces[f].contains(&kept) {
                self.face_alive[f] = false;
                self.active_faces -= 1;
            } else {
                for corner in self.faces[f].iter_mut() {
                    if *corner == gone {
                        *corner = kept;
                    }
                }
                self.vertex_faces[kept].push(f);
            }
        }
        let face_alive = &self.face_alive;
        self.vertex_faces[kept].retain(|&f| face_alive[f]);
        self.vertex_faces[gone].clear();

        self.positions[kept] = position;
        let q = self.quadrics[gone];
        self.quadrics[kept] += q;
        self.boundary[kept] |= self.boundary[gone];
        self.vertex_alive[gone] = false;

        if let Some(normals) = &mut self.normals {
            let avg = normals[kept] + normals[gone];
            if let Some(n) = avg.try_normalize(f32::EPSILON) {
                normals[kept] = n;
            }
        }
        if let Some(colors) = &mut self.colors {
            let (c1, c2) = (colors[kept], colors[gone]);
            colors[kept] = [0, 1, 2].map(|i| ((c1[i] as u16 + c2[i] as u16) / 2) as u8);
        }
    }

    fn to_triangle_mesh(&self) -> TriangleMesh {
        let mut new_index = vec![usize::MAX; self.positions.len()];
        let mut vertices = Vec::new();
        let mut normals = self.normals.as_ref().map(|_| Vec::new());
        let mut colors = self.colors.as_ref().map(|_| Vec::new());
        let mut faces = Vec::with_capacity(self.active_faces);

        for (fi, face) in self.faces.iter().enumerate() {
            if !self.face_alive[fi] {
                continue;
            }
            let remapped = face.map(|v| {
                if new_index[v] == usize::MAX {
                    new_index[v] = vertices.len();
                    vertices.push(to_f32(&self.positions[v]));
                    if let (Some(out), Some(src)) = (normals.as_mut(), self.normals.as_ref()) {
                        out.push(src[v]);
                    }
                    if let (Some(out), Some(src)) = (colors.as_mut(), self.colors.as_ref()) {
                        out.push(src[v]);
                    }
                }
                new_index[v]
            });
            faces.push(remapped);
        }

        let mut mesh = TriangleMesh::from_vertices_and_faces(vertices, faces);
        if let Some(normals) = normals {
            mesh.set_normals(normals);
        }
        if let Some(colors) = colors {
            mesh.set_colors(colors);
        }
        mesh
    }
}

// ============================================================
// Edge Cost for Priority Queue
// ============================================================

#[derive(Debug, Clone, Copy)]
struct EdgeCost {
    /// Vertex that survives the collapse
    kept: usize,
    position: Point3d,
    cost: f64,
}

impl PartialEq for EdgeCost {
    fn eq(&self, other: &Self) -> bool {
        self.cost.total_cmp(&other.cost) == Ordering::Equal
    }
}
impl Eq for EdgeCost {}

impl PartialOrd for EdgeCost {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for EdgeCost {
    fn cmp(&self, other: &Self) -> Ordering {
        // Min-heap: smallest cost first
        other.cost.total_cmp(&self.cost)
    }
}

// ============================================================
// Quadric Edge Collapse
// ============================================================

/// Quadric edge collapse decimator.
///
/// Defaults match the settings used by the benchmark: normal, boundary and
/// topology preservation on, quality threshold 0.3, optimal placement.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QuadricEdgeCollapse {
    /// Stop once the mesh has at most this many faces
    pub target_faces: usize,
    /// Penalize collapses that flip a face normal by more than 90 degrees
    pub preserve_normal: bool,
    /// Never move boundary vertices off their position
    pub preserve_boundary: bool,
    /// Reject collapses that violate the link condition
    pub preserve_topology: bool,
    /// Collapses producing faces below this quality are penalized; 0 disables
    pub quality_threshold: f64,
    /// Place the merged vertex at the quadric minimizer when solvable
    pub optimal_placement: bool,
}

impl Default for QuadricEdgeCollapse {
    fn default() -> Self {
        Self {
            target_faces: 0,
            preserve_normal: true,
            preserve_boundary: true,
            preserve_topology: true,
            quality_threshold: 0.3,
            optimal_placement: true,
        }
    }
}

impl QuadricEdgeCollapse {
    pub fn new(target_faces: usize) -> Self {
        Self {
            target_faces,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_target_faces(mut self, target_faces: usize) -> Self {
        self.target_faces = target_faces;
        self
    }

    #[must_use]
    pub fn with_preserve_normal(mut self, on: bool) -> Self {
        self.preserve_normal = on;
        self
    }

    #[must_use]
    pub fn with_preserve_boundary(mut self, on: bool) -> Self {
        self.preserve_boundary = on;
        self
    }

    #[must_use]
    pub fn with_preserve_topology(mut self, on: bool) -> Self {
        self.preserve_topology = on;
        self
    }

    #[must_use]
    pub fn with_quality_threshold(mut self, threshold: f64) -> Self {
        self.quality_threshold = threshold;
        self
    }

    #[must_use]
    pub fn with_optimal_placement(mut self, on: bool) -> Self {
        self.optimal_placement = on;
        self
    }

    /// Placement and cost for contracting `(a, b)`, or `None` when the edge
    /// must not be collapsed.
    fn evaluate(&self, m: &CollapseMesh, a: usize, b: usize) -> Option<EdgeCost> {
        let q = m.quadrics[a] + m.quadrics[b];
        let (pa, pb) = (m.positions[a], m.positions[b]);

        let (kept, position) = match (
            self.preserve_boundary && m.boundary[a],
            self.preserve_boundary && m.boundary[b],
        ) {
            (true, true) => return None,
            (true, false) => (a, pa),
            (false, true) => (b, pb),
            (false, false) => {
                let optimal = if self.optimal_placement {
                    q.optimal_point()
                } else {
                    None
                };
                let position = optimal.unwrap_or_else(|| {
                    let mut candidates = vec![pa, pb];
                    if self.optimal_placement {
                        candidates.push(nalgebra::center(&pa, &pb));
                    }
                    candidates
                        .into_iter()
                        .min_by(|x, y| q.evaluate(x).total_cmp(&q.evaluate(y)))
                        .unwrap_or(pa)
                });
                (a, position)
            }
        };

        let mut cost = q.evaluate(&position).max(QUADRIC_EPSILON);

        if self.quality_threshold > 0.0 || self.preserve_normal {
            let mut min_quality = f64::INFINITY;
            let mut flipped = false;
            for f in m.live_faces(a).chain(m.live_faces(b)) {
                let face = m.faces[f];
                if face.contains(&a) && face.contains(&b) {
                    continue;
                }
                let old = face.map(|v| m.positions[v]);
                let new = face.map(|v| if v == a || v == b { position } else { m.positions[v] });
                min_quality = min_quality.min(triangle_quality(&new[0], &new[1], &new[2]));
                if self.preserve_normal {
                    let n_old: Vector3d = (old[1] - old[0]).cross(&(old[2] - old[0]));
                    let n_new: Vector3d = (new[1] - new[0]).cross(&(new[2] - new[0]));
                    if n_old.dot(&n_new) < 0.0 {
                        flipped = true;
                    }
                }
            }
            if self.quality_threshold > 0.0 && min_quality.is_finite() {
                cost /= min_quality.min(self.quality_threshold).max(f64::EPSILON);
            }
            if flipped {
                cost *= NORMAL_FLIP_PENALTY;
            }
        }

        Some(EdgeCost {
            kept,
            position,
            cost,
        })
    }

    fn build_queue(&self, m: &CollapseMesh) -> PriorityQueue<Edge, EdgeCost> {
        let mut queue = PriorityQueue::with_capacity(m.faces.len() * 3 / 2);
        for face in &m.faces {
            for k in 0..3 {
                let key = edge_key(face[k], face[(k + 1) % 3]);
                if queue.get(&key).is_some() {
                    continue;
                }
                if let Some(cost) = self.evaluate(m, key.0, key.1) {
                    queue.push(key, cost);
                }
            }
        }
        queue
    }
}

impl MeshSimplifier for QuadricEdgeCollapse {
    fn simplify(&self, mesh: &TriangleMesh) -> Result<TriangleMesh> {
        if mesh.is_empty() {
            return Err(Error::InvalidData("Mesh is empty".to_string()));
        }
        mesh.validate()?;
        if self.target_faces >= mesh.face_count() {
            return Ok(mesh.clone());
        }

        let mut m = CollapseMesh::from_triangle_mesh(mesh);
        let mut queue = self.build_queue(&m);
        let mut collapses = 0usize;
        let mut rejected = 0usize;
        let mut requeued = 0usize;

        while m.active_faces > self.target_faces {
            let Some(((a, b), queued)) = queue.pop() else {
                break;
            };
            if !m.vertex_alive[a] || !m.vertex_alive[b] {
                continue;
            }
            let edge_faces = m.edge_face_count(a, b);
            if edge_faces == 0 {
                continue;
            }

            // Neighbourhood changes can raise a cost without touching this key
            let Some(current) = self.evaluate(&m, a, b) else {
                continue;
            };
            if current.cost > queued.cost * (1.0 + 1e-9) {
                queue.push((a, b), current);
                requeued += 1;
                continue;
            }

            if self.preserve_topology && !m.link_condition(a, b, edge_faces) {
                rejected += 1;
                continue;
            }
            if m.creates_duplicate_face(a, b) {
                rejected += 1;
                continue;
            }

            let kept = current.kept;
            let gone = if kept == a { b } else { a };
            m.collapse(kept, gone, current.position);
            collapses += 1;

            for n in m.neighbors(kept) {
                let key = edge_key(kept, n);
                match self.evaluate(&m, key.0, key.1) {
                    Some(cost) => {
                        queue.push(key, cost);
                    }
                    None => {
                        queue.remove(&key);
                    }
                }
            }
        }

        debug!(
            original = mesh.face_count(),
            target = self.target_faces,
            result = m.active_faces,
            collapses,
            rejected,
            requeued,
            "Quadric edge collapse finished"
        );

        Ok(m.to_triangle_mesh())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use decibench_core::{primitives, Drawable, Point3f};

    fn make_tetrahedron() -> TriangleMesh {
        TriangleMesh::from_vertices_and_faces(
            vec![
                Point3f::new(0.0, 0.0, 0.0),
                Point3f::new(1.0, 0.0, 0.0),
                Point3f::new(0.5, 1.0, 0.0),
                Point3f::new(0.5, 0.5, 1.0),
            ],
            vec![[0, 2, 1], [0, 1, 3], [1, 2, 3], [2, 0, 3]],
        )
    }

    fn make_curved_surface(size: usize) -> TriangleMesh {
        primitives::height_field(size, |x, y| {
            0.3 * (x * std::f32::consts::PI).sin() * (y * std::f32::consts::PI).sin()
        })
    }

    #[test]
    fn test_defaults_match_benchmark_settings() {
        let qem = QuadricEdgeCollapse::default();
        assert!(qem.preserve_normal && qem.preserve_boundary && qem.preserve_topology);
        assert!(qem.optimal_placement);
        assert_eq!(qem.quality_threshold, 0.3);
    }

    #[test]
    fn test_triangle_quality() {
        let s = 3f64.sqrt() / 2.0;
        let q = triangle_quality(
            &Point3d::new(0.0, 0.0, 0.0),
            &Point3d::new(1.0, 0.0, 0.0),
            &Point3d::new(0.5, s, 0.0),
        );
        assert!((q - 1.0).abs() < 1e-12);
        let sliver = triangle_quality(
            &Point3d::new(0.0, 0.0, 0.0),
            &Point3d::new(1.0, 0.0, 0.0),
            &Point3d::new(0.5, 1e-4, 0.0),
        );
        assert!(sliver < 0.01);
    }

    #[test]
    fn test_empty_mesh() {
        let result = QuadricEdgeCollapse::new(0).simplify(&TriangleMesh::new());
        assert!(result.is_err());
    }

    #[test]
    fn test_target_above_face_count_is_identity() {
        let sphere = primitives::uv_sphere(6, 8, 1.0);
        let out = QuadricEdgeCollapse::new(10_000).simplify(&sphere).unwrap();
        assert_eq!(out.faces, sphere.faces);
    }

    #[test]
    fn test_tetrahedron_is_not_collapsed_further() {
        let tet = make_tetrahedron();
        let out = QuadricEdgeCollapse::new(1).simplify(&tet).unwrap();
        // Any contraction of a tetrahedron stacks duplicate faces
        assert_eq!(out.face_count(), 4);
    }

    #[test]
    fn test_sphere_reaches_target() {
        let sphere = primitives::uv_sphere(24, 48, 1.0);
        let target = sphere.face_count() / 2;
        let out = QuadricEdgeCollapse::new(target).simplify(&sphere).unwrap();
        assert!(out.face_count() <= target);
        // Each collapse on a closed mesh removes exactly two faces
        assert!(out.face_count() >= target - 1);
        assert!(out.validate().is_ok());
    }

    #[test]
    fn test_sphere_shape_is_kept() {
        let sphere = primitives::uv_sphere(24, 48, 1.0);
        let out = QuadricEdgeCollapse::new(sphere.face_count() / 10)
            .simplify(&sphere)
            .unwrap();
        for v in &out.vertices {
            let r = v.coords.norm();
            assert!((r - 1.0).abs() < 0.1, "vertex drifted to radius {r}");
        }
    }

    #[test]
    fn test_flat_grid_collapses_to_few_faces() {
        let grid = primitives::grid(10);
        let out = QuadricEdgeCollapse::new(20).simplify(&grid).unwrap();
        assert!(out.face_count() < grid.face_count());
        // Boundary vertices never move, so the footprint is unchanged
        let (min, max) = out.bounding_box();
        assert_eq!(min, Point3f::new(0.0, 0.0, 0.0));
        assert_eq!(max, Point3f::new(1.0, 1.0, 0.0));
    }

    #[test]
    fn test_boundary_vertices_stay_put() {
        let surface = make_curved_surface(12);
        let boundary: Vec<Point3f> = surface
            .vertices
            .iter()
            .copied()
            .filter(|v| v.x == 0.0 || v.y == 0.0 || v.x == 1.0 || v.y == 1.0)
            .collect();
        let out = QuadricEdgeCollapse::new(surface.face_count() / 3)
            .simplify(&surface)
            .unwrap();
        for b in &boundary {
            assert!(
                out.vertices.iter().any(|v| (v - b).norm() < 1e-6),
                "boundary vertex {b:?} moved or vanished"
            );
        }
    }

    #[test]
    fn test_without_boundary_preservation_goes_lower() {
        let surface = make_curved_surface(12);
        let target = surface.face_count() / 10;
        let kept = QuadricEdgeCollapse::new(target).simplify(&surface).unwrap();
        let free = QuadricEdgeCollapse::new(target)
            .with_preserve_boundary(false)
            .simplify(&surface)
            .unwrap();
        assert!(free.face_count() <= kept.face_count());
    }

    #[test]
    fn test_normals_and_colors_follow_vertices() {
        let mut sphere = primitives::uv_sphere(10, 16, 1.0);
        let n = sphere.vertex_count();
        let normals = sphere.vertices.iter().map(|v| v.coords.normalize()).collect();
        sphere.set_normals(normals);
        sphere.set_colors(vec![[200, 100, 50]; n]);

        let out = QuadricEdgeCollapse::new(sphere.face_count() / 2)
            .simplify(&sphere)
            .unwrap();
        assert_eq!(out.normals.as_ref().unwrap().len(), out.vertex_count());
        assert_eq!(out.colors.as_ref().unwrap()[0], [200, 100, 50]);
    }

    #[test]
    fn test_rejects_invalid_indices() {
        let mut mesh = primitives::grid(2);
        mesh.faces.push([0, 1, 99]);
        assert!(QuadricEdgeCollapse::new(1).simplify(&mesh).is_err());
    }
}
