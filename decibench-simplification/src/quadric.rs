//! Quadric error metric shared by both decimators

use decibench_core::Point3d;
use nalgebra::{Matrix4, Vector4};
use std::ops::{Add, AddAssign};

/// Sum of squared distances to a set of planes, stored as a symmetric 4x4
/// matrix acting on homogeneous points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quadric(pub Matrix4<f64>);

impl Default for Quadric {
    fn default() -> Self {
        Quadric(Matrix4::zeros())
    }
}

impl Quadric {
    /// Quadric of the plane `ax + by + cz + d = 0` with unit normal `(a, b, c)`
    pub fn from_plane(plane: &Vector4<f64>) -> Self {
        Quadric(plane * plane.transpose())
    }

    /// Quadric of the plane through a triangle, or `None` when degenerate
    pub fn from_triangle(v0: &Point3d, v1: &Point3d, v2: &Point3d) -> Option<Self> {
        let n = (v1 - v0).cross(&(v2 - v0)).try_normalize(1e-300)?;
        let d = -n.dot(&v0.coords);
        Some(Self::from_plane(&Vector4::new(n.x, n.y, n.z, d)))
    }

    /// Error at `p`, clamped at zero against round-off
    pub fn evaluate(&self, p: &Point3d) -> f64 {
        let v = p.to_homogeneous();
        (v.transpose() * self.0 * v)[0].max(0.0)
    }

    /// Point minimizing the error, if the 3x3 system is well conditioned
    pub fn optimal_point(&self) -> Option<Point3d> {
        let q3 = self.0.fixed_view::<3, 3>(0, 0);
        let q1 = self.0.fixed_view::<3, 1>(0, 3);
        let inv = q3.try_inverse()?;
        let p = -inv * q1;
        if p.iter().all(|c| c.is_finite()) {
            Some(Point3d::new(p[0], p[1], p[2]))
        } else {
            None
        }
    }
}

impl Add for Quadric {
    type Output = Quadric;

    fn add(self, rhs: Quadric) -> Quadric {
        Quadric(self.0 + rhs.0)
    }
}

impl AddAssign for Quadric {
    fn add_assign(&mut self, rhs: Quadric) {
        self.0 += rhs.0;
    }
}

/// Per-vertex quadrics accumulated from incident face planes
pub fn vertex_quadrics(positions: &[Point3d], faces: &[[usize; 3]]) -> Vec<Quadric> {
    let mut quadrics = vec![Quadric::default(); positions.len()];
    for face in faces {
        let [a, b, c] = face.map(|v| positions[v]);
        if let Some(q) = Quadric::from_triangle(&a, &b, &c) {
            for &v in face {
                quadrics[v] += q;
            }
        }
    }
    quadrics
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_plane_error_is_squared_distance() {
        let q = Quadric::from_triangle(
            &Point3d::new(0.0, 0.0, 0.0),
            &Point3d::new(1.0, 0.0, 0.0),
            &Point3d::new(0.0, 1.0, 0.0),
        )
        .unwrap();
        assert_relative_eq!(q.evaluate(&Point3d::new(5.0, -3.0, 0.0)), 0.0);
        assert_relative_eq!(q.evaluate(&Point3d::new(0.0, 0.0, 2.0)), 4.0);
    }

    #[test]
    fn test_three_planes_meet_at_corner() {
        let planes = [
            Vector4::new(1.0, 0.0, 0.0, -1.0),
            Vector4::new(0.0, 1.0, 0.0, -2.0),
            Vector4::new(0.0, 0.0, 1.0, -3.0),
        ];
        let q = planes
            .iter()
            .fold(Quadric::default(), |acc, p| acc + Quadric::from_plane(p));
        let p = q.optimal_point().unwrap();
        assert_relative_eq!(p, Point3d::new(1.0, 2.0, 3.0), epsilon = 1e-9);
        assert_relative_eq!(q.evaluate(&p), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_single_plane_is_singular() {
        let q = Quadric::from_plane(&Vector4::new(0.0, 0.0, 1.0, 0.0));
        assert!(q.optimal_point().is_none());
    }

    #[test]
    fn test_degenerate_triangle_has_no_quadric() {
        let p = Point3d::new(1.0, 1.0, 1.0);
        assert!(Quadric::from_triangle(&p, &p, &Point3d::origin()).is_none());
    }
}
