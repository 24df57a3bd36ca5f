//! Mesh data structures and functionality

use crate::error::{Error, Result};
use crate::point::*;
use serde::{Deserialize, Serialize};

/// A triangle mesh with vertices and faces
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriangleMesh {
    pub vertices: Vec<Point3f>,
    pub faces: Vec<[usize; 3]>,
    pub normals: Option<Vec<Vector3f>>,
    pub colors: Option<Vec<[u8; 3]>>,
}

impl TriangleMesh {
    /// Create a new empty mesh
    pub fn new() -> Self {
        Self {
            vertices: Vec::new(),
            faces: Vec::new(),
            normals: None,
            colors: None,
        }
    }

    /// Create a mesh from vertices and faces
    pub fn from_vertices_and_faces(vertices: Vec<Point3f>, faces: Vec<[usize; 3]>) -> Self {
        Self {
            vertices,
            faces,
            normals: None,
            colors: None,
        }
    }

    /// Get the number of vertices
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Get the number of faces
    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    /// Check if the mesh is empty
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty() || self.faces.is_empty()
    }

    /// Add a vertex to the mesh
    pub fn add_vertex(&mut self, vertex: Point3f) -> usize {
        let index = self.vertices.len();
        self.vertices.push(vertex);
        index
    }

    /// Add a face to the mesh
    pub fn add_face(&mut self, face: [usize; 3]) {
        self.faces.push(face);
    }

    /// Unnormalized normal of a face; its length is twice the face area
    pub fn face_cross(&self, face_idx: usize) -> Vector3f {
        let [a, b, c] = self.faces[face_idx];
        let v0 = self.vertices[a];
        (self.vertices[b] - v0).cross(&(self.vertices[c] - v0))
    }

    /// Area of a single face
    pub fn face_area(&self, face_idx: usize) -> f32 {
        0.5 * self.face_cross(face_idx).norm()
    }

    /// Total surface area
    pub fn surface_area(&self) -> f64 {
        (0..self.faces.len())
            .map(|i| self.face_area(i) as f64)
            .sum()
    }

    /// Calculate face normals. Degenerate faces get a zero normal.
    pub fn calculate_face_normals(&self) -> Vec<Vector3f> {
        (0..self.faces.len())
            .map(|i| {
                let n = self.face_cross(i);
                n.try_normalize(f32::EPSILON).unwrap_or_else(Vector3f::zeros)
            })
            .collect()
    }

    /// Set vertex normals
    pub fn set_normals(&mut self, normals: Vec<Vector3f>) {
        if normals.len() == self.vertices.len() {
            self.normals = Some(normals);
        }
    }

    /// Set vertex colors
    pub fn set_colors(&mut self, colors: Vec<[u8; 3]>) {
        if colors.len() == self.vertices.len() {
            self.colors = Some(colors);
        }
    }

    /// Check that every face references an existing vertex and that
    /// per-vertex attributes line up with the vertex list.
    pub fn validate(&self) -> Result<()> {
        let n = self.vertices.len();
        for (i, face) in self.faces.iter().enumerate() {
            if let Some(bad) = face.iter().find(|&&v| v >= n) {
                return Err(Error::InvalidData(format!(
                    "face {} references vertex {} but mesh has {} vertices",
                    i, bad, n
                )));
            }
        }
        if let Some(normals) = &self.normals {
            if normals.len() != n {
                return Err(Error::InvalidData(format!(
                    "{} normals for {} vertices",
                    normals.len(),
                    n
                )));
            }
        }
        if let Some(colors) = &self.colors {
            if colors.len() != n {
                return Err(Error::InvalidData(format!(
                    "{} colors for {} vertices",
                    colors.len(),
                    n
                )));
            }
        }
        Ok(())
    }

    /// Drop per-vertex attributes. Called by operations that change the
    /// vertex set without tracking attributes.
    pub fn clear_attributes(&mut self) {
        self.normals = None;
        self.colors = None;
    }

    /// Clear the mesh
    pub fn clear(&mut self) {
        self.vertices.clear();
        self.faces.clear();
        self.normals = None;
        self.colors = None;
    }
}

impl Default for TriangleMesh {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn unit_right_triangle() -> TriangleMesh {
        TriangleMesh::from_vertices_and_faces(
            vec![
                Point3f::new(0.0, 0.0, 0.0),
                Point3f::new(1.0, 0.0, 0.0),
                Point3f::new(0.0, 1.0, 0.0),
            ],
            vec![[0, 1, 2]],
        )
    }

    #[test]
    fn test_face_area_and_normal() {
        let mesh = unit_right_triangle();
        assert_relative_eq!(mesh.face_area(0), 0.5);
        assert_relative_eq!(mesh.surface_area(), 0.5);
        let normals = mesh.calculate_face_normals();
        assert_relative_eq!(normals[0].z, 1.0);
    }

    #[test]
    fn test_degenerate_face_normal_is_zero() {
        let mesh = TriangleMesh::from_vertices_and_faces(
            vec![Point3f::origin(), Point3f::new(1.0, 0.0, 0.0), Point3f::new(2.0, 0.0, 0.0)],
            vec![[0, 1, 2]],
        );
        assert_eq!(mesh.calculate_face_normals()[0], Vector3f::zeros());
    }

    #[test]
    fn test_validate_rejects_out_of_range() {
        let mut mesh = unit_right_triangle();
        assert!(mesh.validate().is_ok());
        mesh.add_face([0, 1, 7]);
        assert!(matches!(mesh.validate(), Err(Error::InvalidData(_))));
    }

    #[test]
    fn test_set_normals_length_mismatch_ignored() {
        let mut mesh = unit_right_triangle();
        mesh.set_normals(vec![Vector3f::z(); 2]);
        assert!(mesh.normals.is_none());
        mesh.set_normals(vec![Vector3f::z(); 3]);
        assert!(mesh.normals.is_some());
    }
}
