//! Core data structures and traits for decibench
//!
//! This crate provides the triangle mesh type shared by every stage of the
//! decimation benchmark, together with bounding-box helpers, transforms,
//! procedural primitives used by tests and benches, and the common error type.

pub mod point;
pub mod mesh;
pub mod traits;
pub mod transform;
pub mod primitives;
pub mod error;

pub use point::*;
pub use mesh::*;
pub use traits::*;
pub use transform::*;
pub use error::*;

/// Re-export commonly used types from nalgebra
pub use nalgebra::{Point3, Vector3, Matrix3, Matrix4};

// Type aliases for easier imports
pub type Point = Point3f;
pub type Mesh = TriangleMesh;
