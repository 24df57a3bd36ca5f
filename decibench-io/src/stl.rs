//! STL format support (Thingi10K raw models)
//!
//! STL stores an independent triangle soup. On read, corners with the same
//! bit pattern are merged into one shared vertex so the result is an
//! indexed mesh that later repair stages can reason about.

use crate::{MeshReader, MeshWriter};
use decibench_core::{Error, Point3f, Result, TriangleMesh};
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Cursor, Write};
use std::path::Path;

const HEADER_SIZE: usize = 80;
const TRIANGLE_SIZE: usize = 50;

pub struct StlReader;
pub struct StlWriter;

impl MeshReader for StlReader {
    fn read_mesh<P: AsRef<Path>>(path: P) -> Result<TriangleMesh> {
        let bytes = fs::read(path)?;
        parse_stl(&bytes)
    }
}

impl MeshWriter for StlWriter {
    fn write_mesh<P: AsRef<Path>>(mesh: &TriangleMesh, path: P) -> Result<()> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        write_binary_stl(mesh, &mut writer, "decibench")?;
        writer.flush()?;
        Ok(())
    }
}

/// Parse STL bytes, detecting binary vs ascii
pub fn parse_stl(bytes: &[u8]) -> Result<TriangleMesh> {
    if is_binary(bytes) {
        parse_binary(bytes)
    } else if starts_with_solid(bytes) {
        parse_ascii(BufReader::new(Cursor::new(bytes)))
    } else {
        Err(Error::InvalidData(
            "not an STL file (no solid keyword, size does not match binary layout)".to_string(),
        ))
    }
}

fn starts_with_solid(bytes: &[u8]) -> bool {
    bytes
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .is_some_and(|start| bytes[start..].starts_with(b"solid"))
}

/// Binary STL is recognised by its exact size, since many binary
/// exporters also start their header with "solid".
fn is_binary(bytes: &[u8]) -> bool {
    if bytes.len() < HEADER_SIZE + 4 {
        return false;
    }
    let count = u32::from_le_bytes([
        bytes[HEADER_SIZE],
        bytes[HEADER_SIZE + 1],
        bytes[HEADER_SIZE + 2],
        bytes[HEADER_SIZE + 3],
    ]) as usize;
    bytes.len() == HEADER_SIZE + 4 + count * TRIANGLE_SIZE
}

/// Welds corners with identical coordinates into shared vertices
#[derive(Default)]
struct Welder {
    lookup: HashMap<[u32; 3], usize>,
    mesh: TriangleMesh,
}

impl Welder {
    fn vertex(&mut self, p: [f32; 3]) -> usize {
        // +0.0 and -0.0 are the same position
        let key = p.map(|c| if c == 0.0 { 0 } else { c.to_bits() });
        let mesh = &mut self.mesh;
        *self
            .lookup
            .entry(key)
            .or_insert_with(|| mesh.add_vertex(Point3f::new(p[0], p[1], p[2])))
    }

    fn triangle(&mut self, corners: [[f32; 3]; 3]) {
        let face = corners.map(|c| self.vertex(c));
        self.mesh.add_face(face);
    }
}

fn read_f32(buf: &[u8], offset: usize) -> f32 {
    f32::from_le_bytes([buf[offset], buf[offset + 1], buf[offset + 2], buf[offset + 3]])
}

fn parse_binary(bytes: &[u8]) -> Result<TriangleMesh> {
    let body = &bytes[HEADER_SIZE + 4..];
    let mut welder = Welder::default();
    for tri in body.chunks_exact(TRIANGLE_SIZE) {
        // Skip the stored normal (12 bytes), read 3 corners
        let corner = |i: usize| {
            let o = 12 + i * 12;
            [read_f32(tri, o), read_f32(tri, o + 4), read_f32(tri, o + 8)]
        };
        welder.triangle([corner(0), corner(1), corner(2)]);
    }
    Ok(welder.mesh)
}

fn parse_ascii<R: BufRead>(reader: R) -> Result<TriangleMesh> {
    let mut welder = Welder::default();
    let mut corners: Vec<[f32; 3]> = Vec::with_capacity(3);

    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        let parts: Vec<&str> = line.split_whitespace().collect();
        let Some(keyword) = parts.first() else {
            continue;
        };

        match keyword.to_ascii_lowercase().as_str() {
            "outer" => corners.clear(),
            "vertex" => {
                if parts.len() < 4 {
                    return Err(Error::parse(i + 1, "vertex needs three coordinates"));
                }
                let mut p = [0.0f32; 3];
                for (k, token) in parts[1..4].iter().enumerate() {
                    p[k] = token
                        .parse()
                        .map_err(|e| Error::parse(i + 1, format!("invalid coordinate: {e}")))?;
                }
                corners.push(p);
            }
            "endfacet" => {
                if corners.len() != 3 {
                    return Err(Error::parse(
                        i + 1,
                        format!("facet has {} corners", corners.len()),
                    ));
                }
                welder.triangle([corners[0], corners[1], corners[2]]);
                corners.clear();
            }
            "endsolid" => break,
            _ => {}
        }
    }

    Ok(welder.mesh)
}

/// Write a mesh as binary STL
pub fn write_binary_stl<W: Write>(mesh: &TriangleMesh, writer: &mut W, name: &str) -> Result<()> {
    let mut header = [0u8; HEADER_SIZE];
    let name_bytes = name.as_bytes();
    let n = name_bytes.len().min(HEADER_SIZE);
    header[..n].copy_from_slice(&name_bytes[..n]);
    writer.write_all(&header)?;

    let count = u32::try_from(mesh.faces.len())
        .map_err(|_| Error::InvalidData("too many faces for binary STL".to_string()))?;
    writer.write_all(&count.to_le_bytes())?;

    let normals = mesh.calculate_face_normals();
    for (face, normal) in mesh.faces.iter().zip(&normals) {
        for c in normal.iter() {
            writer.write_all(&c.to_le_bytes())?;
        }
        for &vi in face {
            let v = mesh.vertices[vi];
            for c in [v.x, v.y, v.z] {
                writer.write_all(&c.to_le_bytes())?;
            }
        }
        writer.write_all(&0u16.to_le_bytes())?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use decibench_core::primitives;

    #[test]
    fn test_binary_stl_size_and_welding() {
        let cube = primitives::box_mesh(1.0);
        let mut bytes = Vec::new();
        write_binary_stl(&cube, &mut bytes, "cube").unwrap();
        assert_eq!(bytes.len(), 84 + 12 * 50);

        let loaded = parse_stl(&bytes).unwrap();
        assert_eq!(loaded.face_count(), 12);
        // 36 corners weld back into 8 shared vertices
        assert_eq!(loaded.vertex_count(), 8);
    }

    #[test]
    fn test_binary_header_starting_with_solid() {
        let cube = primitives::box_mesh(1.0);
        let mut bytes = Vec::new();
        write_binary_stl(&cube, &mut bytes, "solid but binary").unwrap();
        let loaded = parse_stl(&bytes).unwrap();
        assert_eq!(loaded.face_count(), 12);
    }

    #[test]
    fn test_ascii_stl() {
        let text = b"solid test
  facet normal 0 0 1
    outer loop
      vertex 0 0 0
      vertex 1 0 0
      vertex 0 1 0
    endloop
  endfacet
  facet normal 0 0 1
    outer loop
      vertex 1 0 0
      vertex 1 1 0
      vertex 0 1 0
    endloop
  endfacet
endsolid test
";
        let mesh = parse_stl(text).unwrap();
        assert_eq!(mesh.face_count(), 2);
        assert_eq!(mesh.vertex_count(), 4);
        assert_eq!(mesh.faces[1], [1, 3, 2]);
    }

    #[test]
    fn test_ascii_bad_facet_errors() {
        let text = b"solid t\nfacet normal 0 0 1\nouter loop\nvertex 0 0 0\nvertex 1 0 0\nendloop\nendfacet\nendsolid t\n";
        assert!(matches!(parse_stl(text), Err(Error::Parse { line: 7, .. })));
    }

    #[test]
    fn test_garbage_is_rejected() {
        assert!(parse_stl(b"hello world").is_err());
    }

    #[test]
    fn test_writer_roundtrip_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sphere.stl");
        let sphere = primitives::uv_sphere(6, 10, 2.0);
        StlWriter::write_mesh(&sphere, &path).unwrap();
        let loaded = StlReader::read_mesh(&path).unwrap();
        assert_eq!(loaded.face_count(), sphere.face_count());
        assert_eq!(loaded.vertex_count(), sphere.vertex_count());
    }
}
