//! Raw dataset preparation
//!
//! Cleans every raw download into a manifold, consistently oriented mesh
//! scaled to the unit box, and saves it as `.obj` for the runner.

use crate::config::{PreprocessConfig, PreprocessSource};
use crate::dataset::discover_raw_files;
use anyhow::Context;
use decibench_algorithms::{
    compute_vertex_normals, merge_close_vertices_percent, orient_by_geometry, orient_coherently,
    remove_duplicate_faces, remove_duplicate_vertices, remove_small_components,
    remove_unreferenced_vertices, repair_non_manifold_edges, repair_non_manifold_vertices,
    scale_to_unit_box,
};
use decibench_core::{Error, Result, TriangleMesh};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

/// How the faces ended up oriented
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Orientation {
    /// Coherent and outward facing
    Geometric,
    /// Coherent only
    Coherent,
}

/// What each cleanup step changed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CleanupCounts {
    pub merged_vertices: usize,
    pub duplicate_faces: usize,
    pub duplicate_vertices: usize,
    pub small_component_faces: usize,
    pub non_manifold_edge_faces: usize,
    pub split_vertices: usize,
    pub unreferenced_vertices: usize,
    pub flipped_faces: usize,
}

/// Orient by geometry, falling back to coherent propagation. The mesh is
/// left untouched when both fail.
fn orient(mesh: &mut TriangleMesh) -> Result<(Orientation, usize)> {
    let original = mesh.faces.clone();
    match orient_by_geometry(mesh) {
        Ok(flipped) => return Ok((Orientation::Geometric, flipped)),
        Err(e) => {
            debug!(error = %e, "Geometric orientation failed, trying coherent");
            mesh.faces.clone_from(&original);
        }
    }
    match orient_coherently(mesh) {
        Ok(flipped) => Ok((Orientation::Coherent, flipped)),
        Err(e) => {
            mesh.faces = original;
            Err(Error::Algorithm(format!("Geometry too broken to re-orient: {e}")))
        }
    }
}

/// Run the cleanup pipeline in place.
///
/// Fails only when the mesh cannot be oriented or has no extent to scale.
pub fn prepare_mesh(mesh: &mut TriangleMesh, config: &PreprocessConfig) -> Result<CleanupCounts> {
    let mut counts = CleanupCounts {
        merged_vertices: merge_close_vertices_percent(mesh, config.merge_threshold_percent),
        ..CleanupCounts::default()
    };
    counts.duplicate_faces = remove_duplicate_faces(mesh);
    counts.duplicate_vertices = remove_duplicate_vertices(mesh);
    counts.unreferenced_vertices += remove_unreferenced_vertices(mesh);

    counts.small_component_faces = remove_small_components(mesh, config.min_component_faces);
    counts.non_manifold_edge_faces = repair_non_manifold_edges(mesh);
    counts.unreferenced_vertices += remove_unreferenced_vertices(mesh);
    counts.split_vertices = repair_non_manifold_vertices(mesh);

    if mesh.faces.is_empty() {
        return Err(Error::Algorithm("no faces left after cleanup".into()));
    }

    let (orientation, flipped) = orient(mesh)?;
    counts.flipped_faces = flipped;

    compute_vertex_normals(mesh);
    scale_to_unit_box(mesh)?;

    debug!(?counts, ?orientation, "Cleaned mesh");
    Ok(counts)
}

#[derive(Debug, Clone, PartialEq)]
pub enum PreprocessOutcome {
    Processed {
        output: PathBuf,
        initial_faces: usize,
        final_faces: usize,
        counts: CleanupCounts,
    },
    TooFewFaces(usize),
    /// Orientation or scaling failed
    Unrepairable(String),
}

/// Load, clean and save one raw model as `<stem>.obj` in `out_dir`
pub fn preprocess_file(
    path: &Path,
    out_dir: &Path,
    config: &PreprocessConfig,
) -> anyhow::Result<PreprocessOutcome> {
    let mut mesh = decibench_io::read_mesh(path)
        .with_context(|| format!("failed to load {}", path.display()))?;
    let initial_faces = mesh.face_count();
    info!(file = %path.display(), initial_faces, "Processing");

    if initial_faces < config.min_faces {
        return Ok(PreprocessOutcome::TooFewFaces(initial_faces));
    }

    let counts = match prepare_mesh(&mut mesh, config) {
        Ok(counts) => counts,
        Err(e) => return Ok(PreprocessOutcome::Unrepairable(e.to_string())),
    };

    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .with_context(|| format!("invalid file name {}", path.display()))?;
    let output = out_dir.join(format!("{stem}.obj"));
    decibench_io::write_mesh(&mesh, &output)
        .with_context(|| format!("failed to save {}", output.display()))?;

    Ok(PreprocessOutcome::Processed {
        output,
        initial_faces,
        final_faces: mesh.face_count(),
        counts,
    })
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PreprocessSummary {
    pub processed: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl std::ops::AddAssign for PreprocessSummary {
    fn add_assign(&mut self, rhs: Self) {
        self.processed += rhs.processed;
        self.skipped += rhs.skipped;
        self.failed += rhs.failed;
    }
}

/// Preprocess every file of one raw source directory
pub fn preprocess_source(
    source: &PreprocessSource,
    config: &PreprocessConfig,
) -> anyhow::Result<PreprocessSummary> {
    std::fs::create_dir_all(&source.processed_dir)
        .with_context(|| format!("failed to create {}", source.processed_dir.display()))?;
    let files = discover_raw_files(&source.raw_dir)?;
    info!(source = %source.name, files = files.len(), "Preprocessing source");

    let mut summary = PreprocessSummary::default();
    for path in &files {
        match preprocess_file(path, &source.processed_dir, config) {
            Ok(PreprocessOutcome::Processed { final_faces, .. }) => {
                info!(file = %path.display(), final_faces, "Fixed and converted");
                summary.processed += 1;
            }
            Ok(PreprocessOutcome::TooFewFaces(faces)) => {
                warn!(file = %path.display(), faces, min = config.min_faces, "Skipping: too few faces");
                summary.skipped += 1;
            }
            Ok(PreprocessOutcome::Unrepairable(reason)) => {
                warn!(file = %path.display(), %reason, "Skipping");
                summary.skipped += 1;
            }
            Err(e) => {
                error!(file = %path.display(), error = %format!("{e:#}"), "Preprocessing failed");
                summary.failed += 1;
            }
        }
    }
    Ok(summary)
}

/// Preprocess every configured source
pub fn run_preprocess(config: &PreprocessConfig) -> anyhow::Result<PreprocessSummary> {
    let mut total = PreprocessSummary::default();
    for source in &config.sources {
        total += preprocess_source(source, config)?;
    }
    info!(
        processed = total.processed,
        skipped = total.skipped,
        failed = total.failed,
        "Preprocessing finished"
    );
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use decibench_algorithms::signed_volume;
    use decibench_core::{primitives, Drawable, Point3f, Transform3D, Transformable, Vector3f};

    fn config(min_faces: usize) -> PreprocessConfig {
        PreprocessConfig {
            sources: Vec::new(),
            min_faces,
            merge_threshold_percent: 0.01,
            min_component_faces: 50,
        }
    }

    #[test]
    fn test_prepare_sphere() {
        let mut mesh = primitives::uv_sphere(16, 24, 3.0);
        mesh.transform(&Transform3D::translation(Vector3f::new(1.0, 2.0, 3.0)));
        // inside-out input
        for f in &mut mesh.faces {
            f.swap(1, 2);
        }
        // floating noise triangle
        let base = mesh.add_vertex(Point3f::new(20.0, 0.0, 0.0));
        mesh.add_vertex(Point3f::new(21.0, 0.0, 0.0));
        mesh.add_vertex(Point3f::new(20.0, 1.0, 0.0));
        mesh.add_face([base, base + 1, base + 2]);

        let counts = prepare_mesh(&mut mesh, &config(0)).unwrap();
        assert_eq!(counts.small_component_faces, 1);
        assert!(counts.flipped_faces > 0);
        assert!(signed_volume(&mesh) > 0.0);
        assert!((mesh.max_extent() - 1.0).abs() < 1e-5);
        assert_eq!(mesh.normals.as_ref().map(Vec::len), Some(mesh.vertex_count()));
    }

    #[test]
    fn test_open_grid_falls_back_to_coherent() {
        let mut mesh = primitives::grid(12);
        assert!(prepare_mesh(&mut mesh, &config(0)).is_ok());
        assert!(!mesh.faces.is_empty());
    }

    #[test]
    fn test_preprocess_file_outcomes() {
        let dir = tempfile::tempdir().unwrap();
        let raw = dir.path().join("sphere.stl");
        decibench_io::write_mesh(&primitives::uv_sphere(16, 24, 1.0), &raw).unwrap();

        let out = dir.path().join("out");
        std::fs::create_dir(&out).unwrap();

        let small = preprocess_file(&raw, &out, &config(100_000)).unwrap();
        assert!(matches!(small, PreprocessOutcome::TooFewFaces(_)));

        match preprocess_file(&raw, &out, &config(10)).unwrap() {
            PreprocessOutcome::Processed { output, final_faces, .. } => {
                assert_eq!(output, out.join("sphere.obj"));
                assert_eq!(decibench_io::read_mesh(&output).unwrap().face_count(), final_faces);
            }
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[test]
    fn test_run_preprocess_counts() {
        let dir = tempfile::tempdir().unwrap();
        let raw = dir.path().join("raw");
        std::fs::create_dir(&raw).unwrap();
        decibench_io::write_mesh(&primitives::uv_sphere(16, 24, 1.0), raw.join("a.obj")).unwrap();
        decibench_io::write_mesh(&primitives::box_mesh(1.0), raw.join("b.obj")).unwrap();
        std::fs::write(raw.join("c.txt"), "not a mesh").unwrap();
        std::fs::write(raw.join(".DS_Store"), "").unwrap();

        let processed = dir.path().join("processed");
        let cfg = PreprocessConfig {
            sources: vec![PreprocessSource {
                name: "test".into(),
                raw_dir: raw,
                processed_dir: processed.clone(),
            }],
            ..config(100)
        };
        let summary = run_preprocess(&cfg).unwrap();
        assert_eq!(
            summary,
            PreprocessSummary {
                processed: 1,
                skipped: 1,
                failed: 1
            }
        );
        assert!(processed.join("a.obj").is_file());
    }
}
