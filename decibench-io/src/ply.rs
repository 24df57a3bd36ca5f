//! PLY format support

use crate::{fan_triangulate, MeshReader, MeshWriter};
use decibench_core::{Error, Point3f, Result, TriangleMesh, Vector3f};
use ply_rs::{
    parser::Parser,
    ply::{Addable, DefaultElement, ElementDef, Ply, Property, PropertyDef, PropertyType, ScalarType},
    writer::Writer,
};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

pub struct PlyReader;
pub struct PlyWriter;

impl MeshReader for PlyReader {
    fn read_mesh<P: AsRef<Path>>(path: P) -> Result<TriangleMesh> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);

        let parser = Parser::<DefaultElement>::new();
        let ply = parser.read_ply(&mut reader)?;

        let vertex_elements = ply.payload.get("vertex").map(Vec::as_slice).unwrap_or(&[]);

        let mut vertices = Vec::with_capacity(vertex_elements.len());
        for vertex in vertex_elements {
            let x = extract_property_value(vertex, "x")?;
            let y = extract_property_value(vertex, "y")?;
            let z = extract_property_value(vertex, "z")?;
            vertices.push(Point3f::new(x, y, z));
        }

        let mut faces = Vec::new();
        if let Some(face_element) = ply.payload.get("face") {
            for face in face_element {
                let indices = extract_face_indices(face)?;
                if let Some(bad) = indices.iter().find(|&&i| i >= vertices.len()) {
                    return Err(Error::InvalidData(format!(
                        "PLY face references vertex {} of {}",
                        bad,
                        vertices.len()
                    )));
                }
                fan_triangulate(&indices, &mut faces);
            }
        }

        // Normals only when every vertex carries them
        let normals: Option<Vec<Vector3f>> = vertex_elements
            .iter()
            .map(|v| {
                match (
                    extract_property_value(v, "nx"),
                    extract_property_value(v, "ny"),
                    extract_property_value(v, "nz"),
                ) {
                    (Ok(nx), Ok(ny), Ok(nz)) => Some(Vector3f::new(nx, ny, nz)),
                    _ => None,
                }
            })
            .collect();

        let mut mesh = TriangleMesh::from_vertices_and_faces(vertices, faces);
        if let Some(normals) = normals.filter(|n| !n.is_empty()) {
            mesh.set_normals(normals);
        }

        Ok(mesh)
    }
}

fn float_property(name: &str) -> PropertyDef {
    PropertyDef::new(name.to_string(), PropertyType::Scalar(ScalarType::Float))
}

impl MeshWriter for PlyWriter {
    fn write_mesh<P: AsRef<Path>>(mesh: &TriangleMesh, path: P) -> Result<()> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);

        let mut ply = Ply::<DefaultElement>::new();
        let normals = mesh
            .normals
            .as_ref()
            .filter(|n| n.len() == mesh.vertices.len());

        let mut vertex_def = ElementDef::new("vertex".to_string());
        vertex_def.count = mesh.vertices.len();
        for name in ["x", "y", "z"] {
            vertex_def.properties.add(float_property(name));
        }
        if normals.is_some() {
            for name in ["nx", "ny", "nz"] {
                vertex_def.properties.add(float_property(name));
            }
        }
        ply.header.elements.add(vertex_def);

        let mut face_def = ElementDef::new("face".to_string());
        face_def.count = mesh.faces.len();
        face_def.properties.add(PropertyDef::new(
            "vertex_indices".to_string(),
            PropertyType::List(ScalarType::UChar, ScalarType::Int),
        ));
        ply.header.elements.add(face_def);

        let mut vertex_payload = Vec::with_capacity(mesh.vertices.len());
        for (i, v) in mesh.vertices.iter().enumerate() {
            let mut element = DefaultElement::new();
            element.insert("x".to_string(), Property::Float(v.x));
            element.insert("y".to_string(), Property::Float(v.y));
            element.insert("z".to_string(), Property::Float(v.z));
            if let Some(normals) = normals {
                element.insert("nx".to_string(), Property::Float(normals[i].x));
                element.insert("ny".to_string(), Property::Float(normals[i].y));
                element.insert("nz".to_string(), Property::Float(normals[i].z));
            }
            vertex_payload.push(element);
        }
        ply.payload.insert("vertex".to_string(), vertex_payload);

        let mut face_payload = Vec::with_capacity(mesh.faces.len());
        for face in &mesh.faces {
            let indices = face
                .iter()
                .map(|&i| {
                    i32::try_from(i).map_err(|_| {
                        Error::InvalidData(format!("vertex index {i} exceeds PLY int range"))
                    })
                })
                .collect::<Result<Vec<i32>>>()?;
            let mut element = DefaultElement::new();
            element.insert("vertex_indices".to_string(), Property::ListInt(indices));
            face_payload.push(element);
        }
        ply.payload.insert("face".to_string(), face_payload);

        let ply_writer = Writer::new();
        ply_writer.write_ply(&mut writer, &mut ply)?;
        writer.flush()?;

        Ok(())
    }
}

/// Extract a property value as f32 from a PLY element
fn extract_property_value(element: &DefaultElement, name: &str) -> Result<f32> {
    match element.get(name) {
        Some(Property::Float(val)) => Ok(*val),
        Some(Property::Double(val)) => Ok(*val as f32),
        Some(Property::Int(val)) => Ok(*val as f32),
        Some(Property::UInt(val)) => Ok(*val as f32),
        Some(Property::Short(val)) => Ok(*val as f32),
        Some(Property::UShort(val)) => Ok(*val as f32),
        _ => Err(Error::InvalidData(format!(
            "Property '{}' not found or invalid type",
            name
        ))),
    }
}

/// Extract face indices from a PLY face element
fn extract_face_indices(element: &DefaultElement) -> Result<Vec<usize>> {
    let to_usize = |idx: i64| {
        usize::try_from(idx)
            .map_err(|_| Error::InvalidData(format!("negative face index {idx}")))
    };
    match element.get("vertex_indices").or_else(|| element.get("vertex_index")) {
        Some(Property::ListInt(indices)) => indices.iter().map(|&i| to_usize(i as i64)).collect(),
        Some(Property::ListUInt(indices)) => Ok(indices.iter().map(|&i| i as usize).collect()),
        Some(Property::ListUChar(indices)) => Ok(indices.iter().map(|&i| i as usize).collect()),
        Some(Property::ListUShort(indices)) => Ok(indices.iter().map(|&i| i as usize).collect()),
        Some(Property::ListShort(indices)) => indices.iter().map(|&i| to_usize(i as i64)).collect(),
        _ => Err(Error::InvalidData("Face indices not found".to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_ascii_ply_with_normals_and_quad() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("quad.ply");
        let content = "ply
format ascii 1.0
comment quad with normals
element vertex 4
property float x
property float y
property float z
property float nx
property float ny
property float nz
element face 1
property list uchar int vertex_indices
end_header
0 0 0 0 0 1
1 0 0 0 0 1
1 1 0 0 0 1
0 1 0 0 0 1
4 0 1 2 3
";
        std::fs::write(&path, content).unwrap();

        let mesh = PlyReader::read_mesh(&path).unwrap();
        assert_eq!(mesh.vertex_count(), 4);
        assert_eq!(mesh.faces, vec![[0, 1, 2], [0, 2, 3]]);
        assert!(mesh.normals.is_some());
    }

    #[test]
    fn test_ply_write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tri.ply");
        let mut mesh = TriangleMesh::from_vertices_and_faces(
            vec![
                Point3f::new(0.0, 0.0, 0.0),
                Point3f::new(1.0, 0.0, 0.0),
                Point3f::new(0.5, 1.0, 0.0),
            ],
            vec![[0, 1, 2]],
        );
        mesh.set_normals(vec![Vector3f::z(); 3]);

        PlyWriter::write_mesh(&mesh, &path).unwrap();
        let loaded = PlyReader::read_mesh(&path).unwrap();

        assert_eq!(loaded.faces, mesh.faces);
        assert_relative_eq!(loaded.vertices[2], mesh.vertices[2]);
        assert!(loaded.normals.is_some());
    }

    #[test]
    fn test_ply_out_of_range_face() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.ply");
        let content = "ply
format ascii 1.0
element vertex 3
property float x
property float y
property float z
element face 1
property list uchar int vertex_indices
end_header
0 0 0
1 0 0
0 1 0
3 0 1 5
";
        std::fs::write(&path, content).unwrap();
        assert!(PlyReader::read_mesh(&path).is_err());
    }
}
