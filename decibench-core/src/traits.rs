//! Core traits for decibench

use crate::{mesh::*, point::*, transform::Transform3D};

/// Trait for objects with a spatial extent
pub trait Drawable {
    /// Get the bounding box of the object
    fn bounding_box(&self) -> (Point3f, Point3f);

    /// Get the center point of the object
    fn center(&self) -> Point3f {
        let (min, max) = self.bounding_box();
        nalgebra::center(&min, &max)
    }

    /// Length of the bounding box diagonal
    fn diagonal(&self) -> f32 {
        let (min, max) = self.bounding_box();
        (max - min).norm()
    }

    /// Largest side of the bounding box
    fn max_extent(&self) -> f32 {
        let (min, max) = self.bounding_box();
        (max - min).max()
    }
}

/// Trait for objects that can be transformed
pub trait Transformable {
    /// Apply a transformation to the object
    fn transform(&mut self, transform: &Transform3D);
}

impl Drawable for TriangleMesh {
    fn bounding_box(&self) -> (Point3f, Point3f) {
        if self.vertices.is_empty() {
            return (Point3f::origin(), Point3f::origin());
        }

        let mut min = self.vertices[0];
        let mut max = self.vertices[0];

        for vertex in &self.vertices {
            min = min.inf(vertex);
            max = max.sup(vertex);
        }

        (min, max)
    }
}

impl Transformable for TriangleMesh {
    fn transform(&mut self, transform: &Transform3D) {
        for v in &mut self.vertices {
            *v = transform.transform_point(v);
        }
        if let Some(normals) = &mut self.normals {
            for n in normals.iter_mut() {
                let t = transform.transform_vector(n);
                *n = t.try_normalize(f32::EPSILON).unwrap_or(t);
            }
        }
    }
}
