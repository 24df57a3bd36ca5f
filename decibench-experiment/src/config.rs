//! Experiment configuration
//!
//! Every section and field is optional in the JSON file; anything left out
//! takes the value the benchmark was designed around.

use crate::algorithm::Algorithm;
use decibench_algorithms::HausdorffParams;
use decibench_core::{Error, Result};
use decibench_simplification::{QuadricEdgeCollapse, TuningParams};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// A labelled directory of meshes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetDir {
    /// Mesh category written to the `Type` column
    pub label: String,
    pub dir: PathBuf,
}

impl DatasetDir {
    pub fn new(label: impl Into<String>, dir: impl Into<PathBuf>) -> Self {
        Self {
            label: label.into(),
            dir: dir.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentConfig {
    pub datasets: Vec<DatasetDir>,
    pub results_file: PathBuf,
    pub decimated_dir: PathBuf,
    /// Fractions of the original face count to keep
    pub keep_fractions: Vec<f64>,
    pub algorithms: Vec<Algorithm>,
    /// Timed runs averaged per measurement
    pub repeats: usize,
    pub warm_up: bool,
    /// QEM options; `target_faces` is set per run
    pub qem: QuadricEdgeCollapse,
    pub tuning: TuningParams,
    pub hausdorff: HausdorffParams,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            datasets: vec![
                DatasetDir::new("clean_cad", "./dataset/clean_cad"),
                DatasetDir::new("organic_scanned", "./dataset/organic_scanned"),
            ],
            results_file: PathBuf::from("experiment_results.csv"),
            decimated_dir: PathBuf::from("decimated_meshes"),
            keep_fractions: vec![0.5, 0.1],
            algorithms: vec![Algorithm::Qem, Algorithm::Clustering],
            repeats: 1,
            warm_up: true,
            qem: QuadricEdgeCollapse::default(),
            tuning: TuningParams::default(),
            hausdorff: HausdorffParams::default(),
        }
    }
}

/// One raw source directory and where its cleaned meshes go
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreprocessSource {
    pub name: String,
    pub raw_dir: PathBuf,
    pub processed_dir: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessConfig {
    pub sources: Vec<PreprocessSource>,
    /// Models with fewer faces are not processed
    pub min_faces: usize,
    /// Vertex weld distance as a percentage of the bounding box diagonal
    pub merge_threshold_percent: f32,
    pub min_component_faces: usize,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            sources: vec![
                PreprocessSource {
                    name: "modelnet40".into(),
                    raw_dir: "./raw_downloads/modelnet40".into(),
                    processed_dir: "./dataset/clean_cad".into(),
                },
                PreprocessSource {
                    name: "thingi10k".into(),
                    raw_dir: "./raw_downloads/thingi10k".into(),
                    processed_dir: "./dataset/organic_scanned".into(),
                },
            ],
            min_faces: 2000,
            merge_threshold_percent: 1.0,
            min_component_faces: 50,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub alpha: f64,
    pub confidence: f64,
    pub summary_file: PathBuf,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            alpha: 0.05,
            confidence: 0.95,
            summary_file: PathBuf::from("analysis_summary.txt"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FigureConfig {
    pub report_dir: PathBuf,
    pub statistical_summary: PathBuf,
    pub presentation_dir: PathBuf,
    pub bootstrap_resamples: usize,
    pub bootstrap_seed: u64,
}

impl Default for FigureConfig {
    fn default() -> Self {
        Self {
            report_dir: PathBuf::from("Report/figures"),
            statistical_summary: PathBuf::from("Report/statistical_summary.txt"),
            presentation_dir: PathBuf::from("presentation"),
            bootstrap_resamples: 1000,
            bootstrap_seed: 0,
        }
    }
}

/// Top-level configuration file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub experiment: ExperimentConfig,
    pub preprocess: PreprocessConfig,
    pub analysis: AnalysisConfig,
    pub figures: FigureConfig,
}

impl Config {
    /// Load and validate a JSON configuration file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_json(&text)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;
        debug!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let exp = &self.experiment;
        if let Some(p) = exp.keep_fractions.iter().find(|p| !(**p > 0.0 && **p <= 1.0)) {
            return Err(Error::Config(format!("keep fraction {p} is outside (0, 1]")));
        }
        if exp.repeats == 0 {
            return Err(Error::Config("repeats must be at least 1".into()));
        }
        if exp.algorithms.is_empty() {
            return Err(Error::Config("no algorithms selected".into()));
        }
        if !(self.analysis.alpha > 0.0 && self.analysis.alpha < 1.0) {
            return Err(Error::Config(format!("alpha {} is outside (0, 1)", self.analysis.alpha)));
        }
        if !(self.analysis.confidence > 0.0 && self.analysis.confidence < 1.0) {
            return Err(Error::Config(format!(
                "confidence {} is outside (0, 1)",
                self.analysis.confidence
            )));
        }
        if self.figures.bootstrap_resamples == 0 {
            return Err(Error::Config("bootstrap_resamples must be at least 1".into()));
        }
        Ok(())
    }
}
