//! The timing and fidelity experiment
//!
//! For every model, decimation level and algorithm: tune if needed, warm up,
//! time the decimation, save the result, then measure the symmetric
//! Hausdorff distance between the saved mesh and the original.

use crate::algorithm::{Algorithm, DecimationLevel};
use crate::config::ExperimentConfig;
use crate::dataset::discover_models;
use crate::results::{ResultRow, ResultsWriter};
use anyhow::Context;
use decibench_algorithms::symmetric_hausdorff;
use decibench_core::{Result, TriangleMesh};
use decibench_simplification::{
    tune_clustering_threshold, MeshSimplifier, QuadricEdgeCollapse, VertexClustering,
};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// A configured decimator ready to run on one model
#[derive(Debug, Clone)]
pub enum Decimator {
    Qem(QuadricEdgeCollapse),
    Clustering(VertexClustering),
}

impl Decimator {
    /// Configure `algorithm` to reach `target_faces` on `mesh`. Clustering
    /// tunes its threshold against the mesh first.
    pub fn configure(
        algorithm: Algorithm,
        mesh: &TriangleMesh,
        target_faces: usize,
        config: &ExperimentConfig,
    ) -> Result<Self> {
        match algorithm {
            Algorithm::Qem => Ok(Decimator::Qem(
                config.qem.clone().with_target_faces(target_faces),
            )),
            Algorithm::Clustering => {
                let outcome = tune_clustering_threshold(mesh, target_faces, &config.tuning)?;
                Ok(Decimator::Clustering(VertexClustering::new(outcome.threshold)))
            }
        }
    }
}

impl MeshSimplifier for Decimator {
    fn simplify(&self, mesh: &TriangleMesh) -> Result<TriangleMesh> {
        match self {
            Decimator::Qem(qem) => qem.simplify(mesh),
            Decimator::Clustering(clustering) => clustering.simplify(mesh),
        }
    }
}

/// Mean wall-clock seconds of `repeats` runs, each on a fresh copy of `mesh`
pub fn time_decimation(
    decimator: &impl MeshSimplifier,
    mesh: &TriangleMesh,
    repeats: usize,
) -> Result<f64> {
    let repeats = repeats.max(1);
    let mut total = 0.0;
    for _ in 0..repeats {
        let input = mesh.clone();
        let start = Instant::now();
        let output = decimator.simplify(&input)?;
        total += start.elapsed().as_secs_f64();
        drop(output);
    }
    Ok(total / repeats as f64)
}

/// Empty `dir`, creating it if needed
pub fn prepare_output_dir(dir: &Path) -> std::io::Result<()> {
    if dir.exists() {
        info!(dir = %dir.display(), "Clearing output directory");
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            let removed = if path.is_dir() {
                std::fs::remove_dir_all(&path)
            } else {
                std::fs::remove_file(&path)
            };
            if let Err(e) = removed {
                warn!(path = %path.display(), error = %e, "Failed to delete");
            }
        }
        Ok(())
    } else {
        std::fs::create_dir_all(dir)
    }
}

/// One model's measurement context
struct Trial<'a> {
    model_path: &'a Path,
    model_name: &'a str,
    mesh_type: &'a str,
    original: &'a TriangleMesh,
    level: &'a DecimationLevel,
}

fn measure(
    trial: &Trial<'_>,
    algorithm: Algorithm,
    config: &ExperimentConfig,
) -> anyhow::Result<ResultRow> {
    let initial_faces = trial.original.face_count();
    let target_faces = trial.level.target_faces(initial_faces);
    let decimator = Decimator::configure(algorithm, trial.original, target_faces, config)?;

    if config.warm_up {
        decimator.simplify(trial.original)?;
    }
    let time = time_decimation(&decimator, trial.original, config.repeats)?;

    let decimated = decimator.simplify(trial.original)?;
    let stem = trial
        .model_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(trial.model_name);
    let save_path: PathBuf = config
        .decimated_dir
        .join(format!("{stem}_{}_{}.obj", algorithm.label(), trial.level.label));
    decibench_io::write_mesh(&decimated, &save_path)
        .with_context(|| format!("failed to save {}", save_path.display()))?;

    // Measure what was written, not the in-memory copy
    let saved = decibench_io::read_mesh(&save_path)
        .with_context(|| format!("failed to reload {}", save_path.display()))?;
    let hausdorff = symmetric_hausdorff(&saved, trial.original, &config.hausdorff)?;

    Ok(ResultRow {
        model: trial.model_name.to_string(),
        mesh_type: trial.mesh_type.to_string(),
        algorithm: algorithm.label().to_string(),
        decimation: trial.level.label.clone(),
        time,
        hausdorff,
        initial_faces,
        final_faces: saved.face_count(),
    })
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub models: usize,
    pub rows: usize,
    pub failures: usize,
    pub skipped_models: usize,
}

/// Run the full experiment and stream rows to `config.results_file`
pub fn run_experiment(config: &ExperimentConfig) -> anyhow::Result<RunSummary> {
    let levels = config
        .keep_fractions
        .iter()
        .map(|&p| DecimationLevel::from_keep_fraction(p))
        .collect::<Result<Vec<_>>>()?;

    prepare_output_dir(&config.decimated_dir)
        .with_context(|| format!("failed to prepare {}", config.decimated_dir.display()))?;
    let mut writer = ResultsWriter::create(&config.results_file)
        .with_context(|| format!("failed to create {}", config.results_file.display()))?;

    let mut summary = RunSummary::default();
    for dataset in &config.datasets {
        let models = discover_models(&dataset.dir)?;
        info!(mesh_type = %dataset.label, files = models.len(), "Processing dataset");

        for model_path in &models {
            let model_name = model_path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or_default();
            let original = match decibench_io::read_mesh(model_path) {
                Ok(mesh) => mesh,
                Err(e) => {
                    error!(model = model_name, error = %e, "Failed to load model, skipping");
                    summary.skipped_models += 1;
                    continue;
                }
            };
            summary.models += 1;
            info!(model = model_name, faces = original.face_count(), "Processing model");

            for level in &levels {
                debug!(
                    level = %level.label,
                    target = level.target_faces(original.face_count()),
                    "Decimation target"
                );
                let trial = Trial {
                    model_path,
                    model_name,
                    mesh_type: &dataset.label,
                    original: &original,
                    level,
                };
                for &algorithm in &config.algorithms {
                    match measure(&trial, algorithm, config) {
                        Ok(row) => {
                            info!(
                                algorithm = %algorithm,
                                level = %level.label,
                                time = row.time,
                                hausdorff = row.hausdorff,
                                faces = row.final_faces,
                                "Measured"
                            );
                            writer.write_row(&row)?;
                            summary.rows += 1;
                        }
                        Err(e) => {
                            error!(
                                algorithm = %algorithm,
                                model = model_name,
                                error = %format!("{e:#}"),
                                "Decimation failed"
                            );
                            summary.failures += 1;
                        }
                    }
                }
            }
        }
    }

    info!(
        rows = summary.rows,
        failures = summary.failures,
        results = %config.results_file.display(),
        "Experiment complete"
    );
    Ok(summary)
}
