//! # decibench algorithms
//!
//! Mesh preparation and measurement used around the decimators: vertex
//! welding, duplicate and component cleanup, non-manifold repair, face
//! orientation, vertex normals, unit-box scaling and Hausdorff distance.

pub mod topology;
pub mod repair;
pub mod components;
pub mod manifold;
pub mod orientation;
pub mod normals;
pub mod scaling;
pub mod hausdorff;

// Re-export commonly used items
pub use repair::*;
pub use components::*;
pub use manifold::*;
pub use orientation::*;
pub use normals::*;
pub use scaling::*;
pub use hausdorff::*;
