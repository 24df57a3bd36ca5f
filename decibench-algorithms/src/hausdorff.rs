//! Hausdorff distance between triangle meshes.
//!
//! One direction samples points on the `sampled` mesh and measures each
//! one's distance to the closest point on the surface of `target`. Closest
//! triangles come from an R*-tree over triangle bounding boxes, and the
//! per-sample queries run on the rayon pool.

use decibench_core::{to_f64, Drawable, Error, Point3d, Result, TriangleMesh};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use rstar::{PointDistance, RTree, RTreeObject, AABB};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Sampling and filtering options for a Hausdorff measurement
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HausdorffParams {
    /// Use every vertex of the sampled mesh as a sample
    pub sample_vertices: bool,
    /// Extra area-weighted random samples on the faces of the sampled mesh
    pub face_samples: usize,
    /// Discard samples farther than this fraction of the target's bounding
    /// box diagonal. `None` keeps every sample.
    pub max_distance: Option<f64>,
    /// Seed for face sampling
    pub seed: u64,
}

impl Default for HausdorffParams {
    fn default() -> Self {
        Self {
            sample_vertices: true,
            face_samples: 0,
            max_distance: Some(0.05),
            seed: 0,
        }
    }
}

impl HausdorffParams {
    /// Keep every sample regardless of distance
    #[must_use]
    pub fn unbounded() -> Self {
        Self {
            max_distance: None,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_face_samples(mut self, count: usize) -> Self {
        self.face_samples = count;
        self
    }

    #[must_use]
    pub fn with_max_distance(mut self, fraction: Option<f64>) -> Self {
        self.max_distance = fraction;
        self
    }
}

/// Distance statistics for one sampling direction
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HausdorffResult {
    pub max: f64,
    pub min: f64,
    pub mean: f64,
    pub rms: f64,
    /// Samples that contributed to the statistics
    pub sample_count: usize,
    /// Samples dropped by the distance bound
    pub discarded: usize,
    /// Bounding box diagonal of the target mesh
    pub diagonal: f64,
}

struct SurfaceTriangle {
    corners: [Point3d; 3],
    envelope: AABB<[f64; 3]>,
}

impl SurfaceTriangle {
    fn new(corners: [Point3d; 3]) -> Self {
        let min = corners[0].inf(&corners[1]).inf(&corners[2]);
        let max = corners[0].sup(&corners[1]).sup(&corners[2]);
        Self {
            corners,
            envelope: AABB::from_corners([min.x, min.y, min.z], [max.x, max.y, max.z]),
        }
    }
}

impl RTreeObject for SurfaceTriangle {
    type Envelope = AABB<[f64; 3]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

impl PointDistance for SurfaceTriangle {
    fn distance_2(&self, point: &[f64; 3]) -> f64 {
        let p = Point3d::new(point[0], point[1], point[2]);
        let [a, b, c] = self.corners;
        (closest_point_on_triangle(p, a, b, c) - p).norm_squared()
    }
}

/// Closest point on triangle `abc` to `p` by Voronoi region classification
pub fn closest_point_on_triangle(p: Point3d, a: Point3d, b: Point3d, c: Point3d) -> Point3d {
    let ab = b - a;
    let ac = c - a;
    let ap = p - a;

    let d1 = ab.dot(&ap);
    let d2 = ac.dot(&ap);
    if d1 <= 0.0 && d2 <= 0.0 {
        return a;
    }

    let bp = p - b;
    let d3 = ab.dot(&bp);
    let d4 = ac.dot(&bp);
    if d3 >= 0.0 && d4 <= d3 {
        return b;
    }

    let vc = d1 * d4 - d3 * d2;
    if vc <= 0.0 && d1 >= 0.0 && d3 <= 0.0 {
        let v = d1 / (d1 - d3);
        return a + ab * v;
    }

    let cp = p - c;
    let d5 = ab.dot(&cp);
    let d6 = ac.dot(&cp);
    if d6 >= 0.0 && d5 <= d6 {
        return c;
    }

    let vb = d5 * d2 - d1 * d6;
    if vb <= 0.0 && d2 >= 0.0 && d6 <= 0.0 {
        let w = d2 / (d2 - d6);
        return a + ac * w;
    }

    let va = d3 * d6 - d5 * d4;
    if va <= 0.0 && (d4 - d3) >= 0.0 && (d5 - d6) >= 0.0 {
        let w = (d4 - d3) / ((d4 - d3) + (d5 - d6));
        return b + (c - b) * w;
    }

    let denom = 1.0 / (va + vb + vc);
    let v = vb * denom;
    let w = vc * denom;
    a + ab * v + ac * w
}

fn build_surface_index(mesh: &TriangleMesh) -> RTree<SurfaceTriangle> {
    let triangles = mesh
        .faces
        .iter()
        .map(|f| SurfaceTriangle::new(f.map(|v| to_f64(&mesh.vertices[v]))))
        .collect();
    RTree::bulk_load(triangles)
}

fn collect_samples(mesh: &TriangleMesh, params: &HausdorffParams) -> Vec<Point3d> {
    let mut samples = Vec::new();
    if params.sample_vertices {
        samples.extend(mesh.vertices.iter().map(to_f64));
    }
    if params.face_samples == 0 || mesh.faces.is_empty() {
        return samples;
    }

    let mut cumulative = Vec::with_capacity(mesh.faces.len());
    let mut total = 0.0f64;
    for i in 0..mesh.faces.len() {
        total += mesh.face_area(i) as f64;
        cumulative.push(total);
    }
    if total <= 0.0 {
        return samples;
    }

    let mut rng = StdRng::seed_from_u64(params.seed);
    samples.reserve(params.face_samples);
    for _ in 0..params.face_samples {
        let target = rng.gen::<f64>() * total;
        let fi = cumulative
            .partition_point(|&c| c < target)
            .min(mesh.faces.len() - 1);
        let [a, b, c] = mesh.faces[fi].map(|v| to_f64(&mesh.vertices[v]));
        // Uniform barycentric sample
        let r1 = rng.gen::<f64>().sqrt();
        let r2 = rng.gen::<f64>();
        let p = a.coords * (1.0 - r1) + b.coords * (r1 * (1.0 - r2)) + c.coords * (r1 * r2);
        samples.push(Point3d::from(p));
    }
    samples
}

/// One-sided Hausdorff distance from `sampled` to the surface of `target`
pub fn hausdorff_distance(
    sampled: &TriangleMesh,
    target: &TriangleMesh,
    params: &HausdorffParams,
) -> Result<HausdorffResult> {
    if target.faces.is_empty() {
        return Err(Error::InvalidData(
            "Hausdorff target mesh has no faces".to_string(),
        ));
    }

    let diagonal = target.diagonal() as f64;
    let bound = params.max_distance.map(|fraction| fraction * diagonal);

    let index = build_surface_index(target);
    let samples = collect_samples(sampled, params);
    if samples.is_empty() {
        return Err(Error::InvalidData(
            "Hausdorff sampled mesh produced no samples".to_string(),
        ));
    }

    let distances: Vec<f64> = samples
        .par_iter()
        .filter_map(|p| {
            let query = [p.x, p.y, p.z];
            index
                .nearest_neighbor(&query)
                .map(|tri| tri.distance_2(&query).sqrt())
        })
        .collect();

    let kept: Vec<f64> = match bound {
        Some(limit) => distances.iter().copied().filter(|&d| d <= limit).collect(),
        None => distances.clone(),
    };
    let discarded = distances.len() - kept.len();

    if kept.is_empty() {
        warn!(
            samples = distances.len(),
            "All Hausdorff samples exceeded the distance bound"
        );
        return Ok(HausdorffResult {
            max: 0.0,
            min: 0.0,
            mean: 0.0,
            rms: 0.0,
            sample_count: 0,
            discarded,
            diagonal,
        });
    }

    let n = kept.len() as f64;
    let max = kept.iter().copied().fold(f64::MIN, f64::max);
    let min = kept.iter().copied().fold(f64::MAX, f64::min);
    let mean = kept.iter().sum::<f64>() / n;
    let rms = (kept.iter().map(|d| d * d).sum::<f64>() / n).sqrt();

    debug!(samples = kept.len(), discarded, max, mean, "Hausdorff pass");

    Ok(HausdorffResult {
        max,
        min,
        mean,
        rms,
        sample_count: kept.len(),
        discarded,
        diagonal,
    })
}

/// Two-sided Hausdorff distance: the larger of both one-sided maxima
pub fn symmetric_hausdorff(
    a: &TriangleMesh,
    b: &TriangleMesh,
    params: &HausdorffParams,
) -> Result<f64> {
    let forward = hausdorff_distance(a, b, params)?;
    let backward = hausdorff_distance(b, a, params)?;
    Ok(forward.max.max(backward.max))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use decibench_core::{primitives, Point3f, Transform3D, Transformable, Vector3f};

    #[test]
    fn test_closest_point_regions() {
        let a = Point3d::new(0.0, 0.0, 0.0);
        let b = Point3d::new(1.0, 0.0, 0.0);
        let c = Point3d::new(0.0, 1.0, 0.0);
        // interior projection
        let p = closest_point_on_triangle(Point3d::new(0.2, 0.2, 3.0), a, b, c);
        assert_relative_eq!(p, Point3d::new(0.2, 0.2, 0.0));
        // vertex region
        let p = closest_point_on_triangle(Point3d::new(-1.0, -1.0, 0.0), a, b, c);
        assert_relative_eq!(p, a);
        // edge region bc
        let p = closest_point_on_triangle(Point3d::new(1.0, 1.0, 0.0), a, b, c);
        assert_relative_eq!(p, Point3d::new(0.5, 0.5, 0.0));
    }

    #[test]
    fn test_identical_meshes_have_zero_distance() {
        let sphere = primitives::uv_sphere(10, 16, 1.0);
        let params = HausdorffParams::default().with_face_samples(500);
        let d = symmetric_hausdorff(&sphere, &sphere, &params).unwrap();
        assert!(d < 1e-6);
    }

    #[test]
    fn test_offset_plane_distance() {
        let grid = primitives::grid(4);
        let mut lifted = grid.clone();
        lifted.transform(&Transform3D::translation(Vector3f::new(0.0, 0.0, 0.5)));

        let result = hausdorff_distance(&lifted, &grid, &HausdorffParams::unbounded()).unwrap();
        assert_relative_eq!(result.max, 0.5, epsilon = 1e-6);
        assert_relative_eq!(result.min, 0.5, epsilon = 1e-6);
        assert_eq!(result.sample_count, 25);
        assert_eq!(result.discarded, 0);
    }

    #[test]
    fn test_distance_bound_discards_far_samples() {
        let grid = primitives::grid(4);
        let mut lifted = grid.clone();
        lifted.transform(&Transform3D::translation(Vector3f::new(0.0, 0.0, 0.5)));

        // 5% of sqrt(2) is well below 0.5
        let result = hausdorff_distance(&lifted, &grid, &HausdorffParams::default()).unwrap();
        assert_eq!(result.sample_count, 0);
        assert_eq!(result.discarded, 25);
        assert_eq!(result.max, 0.0);
    }

    #[test]
    fn test_symmetric_takes_larger_direction() {
        // A small triangle inside a large one: the large one's far corners
        // are far from the small one, but not the other way round
        let big = TriangleMesh::from_vertices_and_faces(
            vec![
                Point3f::new(0.0, 0.0, 0.0),
                Point3f::new(4.0, 0.0, 0.0),
                Point3f::new(0.0, 4.0, 0.0),
            ],
            vec![[0, 1, 2]],
        );
        let small = TriangleMesh::from_vertices_and_faces(
            vec![
                Point3f::new(0.0, 0.0, 0.0),
                Point3f::new(1.0, 0.0, 0.0),
                Point3f::new(0.0, 1.0, 0.0),
            ],
            vec![[0, 1, 2]],
        );
        let params = HausdorffParams::unbounded();
        let forward = hausdorff_distance(&small, &big, &params).unwrap();
        assert!(forward.max < 1e-9);
        let sym = symmetric_hausdorff(&small, &big, &params).unwrap();
        assert_relative_eq!(sym, 3.0, epsilon = 1e-9);
    }

    #[test]
    fn test_empty_target_errors() {
        let sphere = primitives::uv_sphere(4, 6, 1.0);
        assert!(hausdorff_distance(&sphere, &TriangleMesh::new(), &HausdorffParams::default()).is_err());
    }
}
