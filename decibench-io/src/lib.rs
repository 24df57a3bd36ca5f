//! I/O operations for triangle meshes
//!
//! This crate reads the raw formats found in the benchmark datasets
//! (ModelNet40 `.off`, Thingi10K `.stl`) and the `.obj` files the
//! preprocessor and the experiment runner exchange, plus PLY.

pub mod obj;
pub mod off;
pub mod ply;
pub mod stl;

use decibench_core::{Error, Result, TriangleMesh};
use std::path::Path;

/// Trait for reading meshes from files
pub trait MeshReader {
    fn read_mesh<P: AsRef<Path>>(path: P) -> Result<TriangleMesh>;
}

/// Trait for writing meshes to files
pub trait MeshWriter {
    fn write_mesh<P: AsRef<Path>>(mesh: &TriangleMesh, path: P) -> Result<()>;
}

/// Mesh formats recognised by extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeshFormat {
    Obj,
    Off,
    Stl,
    Ply,
}

impl MeshFormat {
    /// Detect the format from a file extension, ignoring case
    pub fn from_path<P: AsRef<Path>>(path: P) -> Option<Self> {
        let ext = path.as_ref().extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "obj" => Some(MeshFormat::Obj),
            "off" => Some(MeshFormat::Off),
            "stl" => Some(MeshFormat::Stl),
            "ply" => Some(MeshFormat::Ply),
            _ => None,
        }
    }
}

fn unsupported(path: &Path) -> Error {
    Error::UnsupportedFormat(format!("Unsupported mesh format: {:?}", path.extension()))
}

/// Auto-detect format and read mesh
pub fn read_mesh<P: AsRef<Path>>(path: P) -> Result<TriangleMesh> {
    let path = path.as_ref();
    let mesh = match MeshFormat::from_path(path) {
        Some(MeshFormat::Obj) => obj::ObjReader::read_mesh(path)?,
        Some(MeshFormat::Off) => off::OffReader::read_mesh(path)?,
        Some(MeshFormat::Stl) => stl::StlReader::read_mesh(path)?,
        Some(MeshFormat::Ply) => ply::PlyReader::read_mesh(path)?,
        None => return Err(unsupported(path)),
    };
    tracing::debug!(
        path = %path.display(),
        vertices = mesh.vertex_count(),
        faces = mesh.face_count(),
        "Loaded mesh"
    );
    Ok(mesh)
}

/// Auto-detect format and write mesh
pub fn write_mesh<P: AsRef<Path>>(mesh: &TriangleMesh, path: P) -> Result<()> {
    let path = path.as_ref();
    match MeshFormat::from_path(path) {
        Some(MeshFormat::Obj) => obj::ObjWriter::write_mesh(mesh, path),
        Some(MeshFormat::Stl) => stl::StlWriter::write_mesh(mesh, path),
        Some(MeshFormat::Ply) => ply::PlyWriter::write_mesh(mesh, path),
        Some(MeshFormat::Off) => Err(Error::Unsupported("writing OFF files".to_string())),
        None => Err(unsupported(path)),
    }
}

/// Split a polygon into a triangle fan anchored at its first corner
pub(crate) fn fan_triangulate(polygon: &[usize], faces: &mut Vec<[usize; 3]>) {
    if polygon.len() < 3 {
        return;
    }
    for i in 1..polygon.len() - 1 {
        faces.push([polygon[0], polygon[i], polygon[i + 1]]);
    }
}
