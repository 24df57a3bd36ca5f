//! OBJ format support
//!
//! Reading goes through the `obj` crate; n-gons are fan-triangulated.
//! Writing emits positions, optional vertex normals and 1-based faces.

use crate::{fan_triangulate, MeshReader, MeshWriter};
use decibench_core::{Error, Point3f, Result, TriangleMesh, Vector3f};
use obj::Obj;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

pub struct ObjReader;
pub struct ObjWriter;

impl MeshReader for ObjReader {
    fn read_mesh<P: AsRef<Path>>(path: P) -> Result<TriangleMesh> {
        let path = path.as_ref();
        let obj = Obj::load(path).map_err(|e| {
            Error::InvalidData(format!("failed to parse OBJ {}: {}", path.display(), e))
        })?;
        let data = obj.data;

        let vertices: Vec<Point3f> = data
            .position
            .iter()
            .map(|p| Point3f::new(p[0], p[1], p[2]))
            .collect();

        // Per-vertex normal index; None = unseen, Some(None) = conflicting
        let mut normal_of: Vec<Option<Option<usize>>> = vec![None; vertices.len()];
        let mut all_have_normals = true;

        let mut faces = Vec::new();
        let mut polygon = Vec::new();
        for object in &data.objects {
            for group in &object.groups {
                for poly in &group.polys {
                    polygon.clear();
                    for tuple in &poly.0 {
                        let vi = tuple.0;
                        if vi >= vertices.len() {
                            return Err(Error::InvalidData(format!(
                                "OBJ face references vertex {} of {}",
                                vi + 1,
                                vertices.len()
                            )));
                        }
                        match tuple.2 {
                            Some(ni) => {
                                normal_of[vi] = match normal_of[vi] {
                                    None => Some(Some(ni)),
                                    Some(Some(prev)) if prev == ni => Some(Some(ni)),
                                    _ => Some(None),
                                };
                            }
                            None => all_have_normals = false,
                        }
                        polygon.push(vi);
                    }
                    fan_triangulate(&polygon, &mut faces);
                }
            }
        }

        let mut mesh = TriangleMesh::from_vertices_and_faces(vertices, faces);

        if all_have_normals && !data.normal.is_empty() {
            let normals: Option<Vec<Vector3f>> = normal_of
                .iter()
                .map(|slot| match slot {
                    Some(Some(ni)) => data
                        .normal
                        .get(*ni)
                        .map(|n| Vector3f::new(n[0], n[1], n[2])),
                    _ => None,
                })
                .collect();
            if let Some(normals) = normals {
                mesh.set_normals(normals);
            }
        }

        Ok(mesh)
    }
}

impl MeshWriter for ObjWriter {
    fn write_mesh<P: AsRef<Path>>(mesh: &TriangleMesh, path: P) -> Result<()> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        write_obj(mesh, &mut writer)?;
        writer.flush()?;
        Ok(())
    }
}

/// Serialize a mesh as OBJ text into any writer
pub fn write_obj<W: Write>(mesh: &TriangleMesh, writer: &mut W) -> Result<()> {
    writeln!(writer, "# decibench")?;
    writeln!(
        writer,
        "# vertices {} faces {}",
        mesh.vertex_count(),
        mesh.face_count()
    )?;
    for v in &mesh.vertices {
        writeln!(writer, "v {} {} {}", v.x, v.y, v.z)?;
    }

    let normals = mesh
        .normals
        .as_ref()
        .filter(|n| n.len() == mesh.vertices.len());
    if let Some(normals) = normals {
        for n in normals {
            writeln!(writer, "vn {} {} {}", n.x, n.y, n.z)?;
        }
    }

    for f in &mesh.faces {
        let [a, b, c] = [f[0] + 1, f[1] + 1, f[2] + 1];
        if normals.is_some() {
            writeln!(writer, "f {a}//{a} {b}//{b} {c}//{c}")?;
        } else {
            writeln!(writer, "f {a} {b} {c}")?;
        }
    }
    Ok(())
}
