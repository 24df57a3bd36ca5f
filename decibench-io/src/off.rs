//! OFF format support (ModelNet40 raw models)
//!
//! Accepts the common header variants:
//!
//! ```text
//! OFF
//! 8 6 0
//! ```
//!
//! and the ModelNet40 quirk where the counts are glued to the keyword
//! (`OFF8 6 0`). Blank lines and `#` comments are ignored everywhere.

use crate::{fan_triangulate, MeshReader};
use decibench_core::{Error, Point3f, Result, TriangleMesh};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

pub struct OffReader;

impl MeshReader for OffReader {
    fn read_mesh<P: AsRef<Path>>(path: P) -> Result<TriangleMesh> {
        let file = File::open(path)?;
        parse_off(BufReader::new(file))
    }
}

/// Parse OFF text from any buffered reader
pub fn parse_off<R: BufRead>(reader: R) -> Result<TriangleMesh> {
    let mut lines = Vec::new();
    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        let content = match line.find('#') {
            Some(pos) => &line[..pos],
            None => line.as_str(),
        };
        let content = content.trim();
        if !content.is_empty() {
            lines.push((i + 1, content.to_string()));
        }
    }

    let mut it = lines.into_iter();
    let (first_no, first) = it
        .next()
        .ok_or_else(|| Error::parse(1, "empty OFF file"))?;

    // Header keyword is optional; counts may follow it on the same line
    let counts_line = if let Some(rest) = first.strip_prefix("OFF") {
        let rest = rest.trim();
        if rest.is_empty() {
            it.next()
                .ok_or_else(|| Error::parse(first_no, "missing element counts"))?
        } else {
            (first_no, rest.to_string())
        }
    } else {
        (first_no, first)
    };

    let (counts_no, counts) = counts_line;
    let counts: Vec<usize> = counts
        .split_whitespace()
        .take(2)
        .map(|t| t.parse::<usize>())
        .collect::<std::result::Result<_, _>>()
        .map_err(|e| Error::parse(counts_no, format!("invalid element counts: {e}")))?;
    if counts.len() < 2 {
        return Err(Error::parse(counts_no, "expected vertex and face counts"));
    }
    let (n_vertices, n_faces) = (counts[0], counts[1]);

    let mut mesh = TriangleMesh::new();
    // header counts are untrusted; short files fail in the loop below
    mesh.vertices.reserve(n_vertices.min(1 << 20));
    for _ in 0..n_vertices {
        let (no, line) = it
            .next()
            .ok_or_else(|| Error::parse(counts_no, "unexpected end of file in vertex list"))?;
        let coords: Vec<f32> = line
            .split_whitespace()
            .take(3)
            .map(|t| t.parse::<f32>())
            .collect::<std::result::Result<_, _>>()
            .map_err(|e| Error::parse(no, format!("invalid vertex: {e}")))?;
        if coords.len() < 3 {
            return Err(Error::parse(no, "vertex needs three coordinates"));
        }
        mesh.add_vertex(Point3f::new(coords[0], coords[1], coords[2]));
    }

    let mut polygon = Vec::new();
    for _ in 0..n_faces {
        let (no, line) = it
            .next()
            .ok_or_else(|| Error::parse(counts_no, "unexpected end of file in face list"))?;
        let mut tokens = line.split_whitespace();
        let arity: usize = tokens
            .next()
            .and_then(|t| t.parse().ok())
            .ok_or_else(|| Error::parse(no, "missing face vertex count"))?;

        polygon.clear();
        for _ in 0..arity {
            let idx: usize = tokens
                .next()
                .and_then(|t| t.parse().ok())
                .ok_or_else(|| Error::parse(no, "truncated face"))?;
            if idx >= n_vertices {
                return Err(Error::parse(
                    no,
                    format!("face index {idx} out of range ({n_vertices} vertices)"),
                ));
            }
            polygon.push(idx);
        }
        // Trailing colour values are ignored
        fan_triangulate(&polygon, &mut mesh.faces);
    }

    Ok(mesh)
}
