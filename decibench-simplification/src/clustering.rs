//! Vertex clustering simplification
//!
//! Rossignac & Borrel (1993): vertices are bucketed on a uniform grid, each
//! occupied cell collapses to one representative, and faces whose corners
//! land in fewer than three distinct cells disappear. The grid resolution is
//! the only control, so the face count is reached indirectly through the
//! threshold tuning in [`crate::tuning`].

use crate::quadric::{vertex_quadrics, Quadric};
use crate::MeshSimplifier;
use decibench_core::{
    to_f32, to_f64, Drawable, Error, Point3d, Point3f, Result, TriangleMesh, Vector3f,
};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Strategy for selecting the representative vertex within a cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepresentativeStrategy {
    /// Arithmetic mean of all vertex positions in the cluster.
    #[default]
    Centroid,
    /// Weighted average using vertex valence (number of adjacent faces).
    WeightedAverage,
    /// Position that minimizes the summed quadric error for the cluster.
    MinimumError,
}

fn compute_vertex_valence(mesh: &TriangleMesh) -> Vec<usize> {
    let mut valence = vec![0usize; mesh.vertices.len()];
    for face in &mesh.faces {
        for &v in face {
            valence[v] += 1;
        }
    }
    valence
}

fn select_representative(
    cluster: &[usize],
    positions: &[Point3d],
    quadrics: &[Quadric],
    valence: &[usize],
    strategy: RepresentativeStrategy,
) -> Point3d {
    match strategy {
        RepresentativeStrategy::Centroid => {
            let sum = cluster
                .iter()
                .fold(Point3d::origin().coords, |acc, &vi| acc + positions[vi].coords);
            Point3d::from(sum / cluster.len() as f64)
        }
        RepresentativeStrategy::WeightedAverage => {
            let mut sum = Point3d::origin().coords;
            let mut w_total = 0.0;
            for &vi in cluster {
                let w = valence[vi].max(1) as f64;
                sum += positions[vi].coords * w;
                w_total += w;
            }
            Point3d::from(sum / w_total)
        }
        RepresentativeStrategy::MinimumError => {
            let q_sum = cluster
                .iter()
                .fold(Quadric::default(), |acc, &vi| acc + quadrics[vi]);

            if let Some(p) = q_sum.optimal_point() {
                return p;
            }

            // Singular system: pick the member with minimum quadric error
            cluster
                .iter()
                .map(|&vi| positions[vi])
                .min_by(|a, b| q_sum.evaluate(a).total_cmp(&q_sum.evaluate(b)))
                .unwrap_or(positions[cluster[0]])
        }
    }
}

/// Uniform-grid vertex clustering simplifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VertexClustering {
    /// Cell size as a percentage of the bounding box diagonal
    pub threshold_percent: f64,
    /// Strategy for choosing the representative position of each cluster
    pub representative: RepresentativeStrategy,
}

impl Default for VertexClustering {
    fn default() -> Self {
        Self {
            threshold_percent: 1.0,
            representative: RepresentativeStrategy::Centroid,
        }
    }
}

impl VertexClustering {
    pub fn new(threshold_percent: f64) -> Self {
        Self {
            threshold_percent,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_representative(mut self, representative: RepresentativeStrategy) -> Self {
        self.representative = representative;
        self
    }

    /// Absolute grid cell size for `mesh`
    pub fn cell_size(&self, mesh: &TriangleMesh) -> f64 {
        mesh.diagonal() as f64 * self.threshold_percent / 100.0
    }

    /// Group vertex indices by grid cell, in order of first appearance.
    fn cluster_vertices(&self, positions: &[Point3d], min: &Point3d, cell_size: f64) -> Vec<Vec<usize>> {
        let mut cell_index: HashMap<(i64, i64, i64), usize> = HashMap::new();
        let mut clusters: Vec<Vec<usize>> = Vec::new();

        for (vi, v) in positions.iter().enumerate() {
            let key = (
                ((v.x - min.x) / cell_size).floor() as i64,
                ((v.y - min.y) / cell_size).floor() as i64,
                ((v.z - min.z) / cell_size).floor() as i64,
            );
            let ci = *cell_index.entry(key).or_insert_with(|| {
                clusters.push(Vec::new());
                clusters.len() - 1
            });
            clusters[ci].push(vi);
        }
        clusters
    }

    fn build_simplified_mesh(
        &self,
        mesh: &TriangleMesh,
        positions: &[Point3d],
        clusters: &[Vec<usize>],
    ) -> TriangleMesh {
        let mut vertex_to_cluster = vec![0usize; mesh.vertices.len()];
        for (ci, cluster) in clusters.iter().enumerate() {
            for &vi in cluster {
                vertex_to_cluster[vi] = ci;
            }
        }

        // Faces first: only clusters referenced by a surviving face get a vertex
        let mut new_faces: Vec<[usize; 3]> = Vec::new();
        let mut seen_faces: HashSet<[usize; 3]> = HashSet::new();
        for face in &mesh.faces {
            let mapped = face.map(|v| vertex_to_cluster[v]);
            let [c0, c1, c2] = mapped;
            if c0 == c1 || c1 == c2 || c2 == c0 {
                continue;
            }
            let mut sorted = mapped;
            sorted.sort_unstable();
            if seen_faces.insert(sorted) {
                new_faces.push(mapped);
            }
        }

        let quadrics = match self.representative {
            RepresentativeStrategy::MinimumError => vertex_quadrics(positions, &mesh.faces),
            _ => Vec::new(),
        };
        let valence = match self.representative {
            RepresentativeStrategy::WeightedAverage => compute_vertex_valence(mesh),
            _ => Vec::new(),
        };

        let mut old_to_new = vec![usize::MAX; clusters.len()];
        let mut new_vertices: Vec<Point3f> = Vec::new();
        let mut new_normals: Option<Vec<Vector3f>> = mesh.normals.as_ref().map(|_| Vec::new());
        let mut new_colors: Option<Vec<[u8; 3]>> = mesh.colors.as_ref().map(|_| Vec::new());

        for face in &mut new_faces {
            for ci in face.iter_mut() {
                if old_to_new[*ci] == usize::MAX {
                    let cluster = &clusters[*ci];
                    old_to_new[*ci] = new_vertices.len();

                    let rep = if cluster.len() == 1 {
                        positions[cluster[0]]
                    } else {
                        select_representative(
                            cluster,
                            positions,
                            &quadrics,
                            &valence,
                            self.representative,
                        )
                    };
                    new_vertices.push(to_f32(&rep));

                    if let (Some(out), Some(normals)) = (new_normals.as_mut(), mesh.normals.as_ref()) {
                        let sum: Vector3f = cluster.iter().map(|&vi| normals[vi]).sum();
                        out.push(sum.try_normalize(1e-12).unwrap_or(sum));
                    }
                    if let (Some(out), Some(colors)) = (new_colors.as_mut(), mesh.colors.as_ref()) {
                        let n = cluster.len() as u32;
                        let mut rgb = [0u32; 3];
                        for &vi in cluster {
                            for k in 0..3 {
                                rgb[k] += colors[vi][k] as u32;
                            }
                        }
                        out.push(rgb.map(|c| (c / n) as u8));
                    }
                }
                *ci = old_to_new[*ci];
            }
        }

        let mut result = TriangleMesh::from_vertices_and_faces(new_vertices, new_faces);
        if let Some(normals) = new_normals {
            result.set_normals(normals);
        }
        if let Some(colors) = new_colors {
            result.set_colors(colors);
        }
        result
    }
}

impl MeshSimplifier for VertexClustering {
    fn simplify(&self, mesh: &TriangleMesh) -> Result<TriangleMesh> {
        if mesh.is_empty() {
            return Err(Error::InvalidData("Mesh is empty".to_string()));
        }
        if !(self.threshold_percent.is_finite() && self.threshold_percent > 0.0) {
            return Err(Error::InvalidData(format!(
                "Clustering threshold must be positive, got {}",
                self.threshold_percent
            )));
        }
        mesh.validate()?;

        let cell_size = self.cell_size(mesh);
        if cell_size <= 0.0 {
            return Err(Error::InvalidData(
                "Mesh bounding box is degenerate".to_string(),
            ));
        }

        let positions: Vec<Point3d> = mesh.vertices.iter().map(to_f64).collect();
        let (min, _) = mesh.bounding_box();
        let clusters = self.cluster_vertices(&positions, &to_f64(&min), cell_size);
        let result = self.build_simplified_mesh(mesh, &positions, &clusters);

        debug!(
            threshold_percent = self.threshold_percent,
            cell_size,
            clusters = clusters.len(),
            original = mesh.face_count(),
            result = result.face_count(),
            "Vertex clustering finished"
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use decibench_core::primitives;

    fn make_curved_surface(size: usize) -> TriangleMesh {
        primitives::height_field(size, |x, y| 0.2 * (x * 4.0).sin() * (y * 3.0).cos())
    }

    #[test]
    fn test_empty_mesh() {
        assert!(VertexClustering::new(1.0).simplify(&TriangleMesh::new()).is_err());
    }

    #[test]
    fn test_invalid_threshold() {
        let grid = primitives::grid(4);
        assert!(VertexClustering::new(0.0).simplify(&grid).is_err());
        assert!(VertexClustering::new(-1.0).simplify(&grid).is_err());
        assert!(VertexClustering::new(f64::NAN).simplify(&grid).is_err());
    }

    #[test]
    fn test_tiny_threshold_keeps_mesh() {
        let sphere = primitives::uv_sphere(12, 24, 1.0);
        let out = VertexClustering::new(0.001).simplify(&sphere).unwrap();
        assert_eq!(out.face_count(), sphere.face_count());
        assert_eq!(out.vertex_count(), sphere.vertex_count());
    }

    #[test]
    fn test_huge_threshold_collapses_everything() {
        let sphere = primitives::uv_sphere(12, 24, 1.0);
        let out = VertexClustering::new(200.0).simplify(&sphere).unwrap();
        assert_eq!(out.face_count(), 0);
        assert_eq!(out.vertex_count(), 0);
    }

    #[test]
    fn test_face_count_decreases_with_threshold() {
        let sphere = primitives::uv_sphere(32, 64, 1.0);
        let fine = VertexClustering::new(2.0).simplify(&sphere).unwrap();
        let coarse = VertexClustering::new(8.0).simplify(&sphere).unwrap();
        assert!(fine.face_count() < sphere.face_count());
        assert!(coarse.face_count() < fine.face_count());
        assert!(coarse.validate().is_ok());
    }

    #[test]
    fn test_grid_cells_on_flat_grid() {
        // 8x8 grid on the unit square, cells of a quarter side merge 2x2 blocks
        let grid = primitives::grid(8);
        let percent = 100.0 * 0.25 / 2f64.sqrt() + 1e-6;
        let out = VertexClustering::new(percent).simplify(&grid).unwrap();
        assert!(out.face_count() > 0);
        assert!(out.face_count() < grid.face_count());
        assert!(out.vertex_count() <= 25);
    }

    #[test]
    fn test_no_duplicate_or_degenerate_faces() {
        let surface = make_curved_surface(20);
        let out = VertexClustering::new(7.0).simplify(&surface).unwrap();
        let mut seen = HashSet::new();
        for face in &out.faces {
            assert!(face[0] != face[1] && face[1] != face[2] && face[0] != face[2]);
            let mut key = *face;
            key.sort_unstable();
            assert!(seen.insert(key));
        }
    }

    #[test]
    fn test_all_strategies_produce_valid_output() {
        let surface = make_curved_surface(16);
        for strategy in [
            RepresentativeStrategy::Centroid,
            RepresentativeStrategy::WeightedAverage,
            RepresentativeStrategy::MinimumError,
        ] {
            let out = VertexClustering::new(10.0)
                .with_representative(strategy)
                .simplify(&surface)
                .unwrap();
            assert!(out.validate().is_ok(), "{strategy:?}");
            assert!(out.face_count() > 0, "{strategy:?}");
            for v in &out.vertices {
                assert!(v.x.is_finite() && v.y.is_finite() && v.z.is_finite());
            }
        }
    }

    #[test]
    fn test_centroid_representative() {
        let positions = vec![
            Point3d::new(0.0, 0.0, 0.0),
            Point3d::new(2.0, 0.0, 0.0),
            Point3d::new(1.0, 3.0, 0.0),
        ];
        let rep = select_representative(
            &[0, 1, 2],
            &positions,
            &[],
            &[],
            RepresentativeStrategy::Centroid,
        );
        assert!((rep - Point3d::new(1.0, 1.0, 0.0)).norm() < 1e-12);
    }

    #[test]
    fn test_weighted_average_representative() {
        let positions = vec![Point3d::new(0.0, 0.0, 0.0), Point3d::new(4.0, 0.0, 0.0)];
        let rep = select_representative(
            &[0, 1],
            &positions,
            &[],
            &[3, 1],
            RepresentativeStrategy::WeightedAverage,
        );
        assert!((rep.x - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_attributes_are_averaged() {
        let mut grid = primitives::grid(8);
        let n = grid.vertex_count();
        grid.set_normals(vec![Vector3f::z(); n]);
        grid.set_colors(vec![[10, 20, 30]; n]);
        let out = VertexClustering::new(20.0).simplify(&grid).unwrap();
        let normals = out.normals.as_ref().unwrap();
        assert_eq!(normals.len(), out.vertex_count());
        assert!(normals.iter().all(|n| (n.z - 1.0).abs() < 1e-6));
        assert!(out.colors.unwrap().iter().all(|&c| c == [10, 20, 30]));
    }
}
