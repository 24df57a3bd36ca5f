//! Uniform rescaling

use decibench_core::{Drawable, Error, Result, Transform3D, Transformable, TriangleMesh};

/// Scale the mesh uniformly about the origin so that its largest bounding
/// box side becomes 1. Returns the applied scale factor.
pub fn scale_to_unit_box(mesh: &mut TriangleMesh) -> Result<f32> {
    let extent = mesh.max_extent();
    if !(extent > 0.0 && extent.is_finite()) {
        return Err(Error::InvalidData(format!(
            "cannot normalize a mesh with bounding box extent {extent}"
        )));
    }
    let factor = 1.0 / extent;
    mesh.transform(&Transform3D::uniform_scaling(factor));
    Ok(factor)
}
