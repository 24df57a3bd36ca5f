//! Mesh decimation algorithms
//!
//! Two decimators share the [`MeshSimplifier`] trait:
//! - [`QuadricEdgeCollapse`]: greedy quadric error edge collapse to a face budget
//! - [`VertexClustering`]: uniform grid clustering driven by a size threshold
//!
//! [`tuning`] searches the clustering threshold that best matches a face budget.

pub mod quadric;
pub mod edge_collapse;
pub mod clustering;
pub mod tuning;

pub use quadric::*;
pub use edge_collapse::*;
pub use clustering::*;
pub use tuning::*;

use decibench_core::{Result, TriangleMesh};

/// Reduce the face count of a mesh
pub trait MeshSimplifier {
    /// Produce a simplified copy; the input is left untouched
    fn simplify(&self, mesh: &TriangleMesh) -> Result<TriangleMesh>;
}
