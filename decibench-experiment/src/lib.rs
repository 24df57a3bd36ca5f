//! # decibench experiment
//!
//! Orchestration of the decimation benchmark, stage by stage:
//!
//! 1. [`preprocess`]: clean raw downloads into unit-scaled `.obj` datasets
//! 2. [`runner`]: time QEM and clustering per model and decimation level,
//!    measure Hausdorff distance, stream rows to the results CSV
//! 3. [`analysis`]: descriptive statistics, normality and variance tests,
//!    three-way ANOVA and Tukey HSD written to a text report
//! 4. [`diagnostics`]: residual normality tests and Q-Q plots
//! 5. [`figures`] and [`presentation`]: SVG charts of the results
//!
//! Stages communicate only through files, so each can be rerun alone.

pub mod config;
pub mod algorithm;
pub mod dataset;
pub mod results;
pub mod preprocess;
pub mod runner;
pub mod analysis;
pub mod diagnostics;
pub mod figures;
pub mod presentation;

pub use config::*;
pub use algorithm::*;
pub use dataset::*;
pub use results::*;
pub use preprocess::{prepare_mesh, run_preprocess, CleanupCounts, PreprocessOutcome, PreprocessSummary};
pub use runner::{run_experiment, Decimator, RunSummary};
pub use analysis::{analysis_report, run_analysis};
pub use diagnostics::{run_diagnostics, ResidualDiagnostics};
pub use figures::run_figures;
pub use presentation::run_presentation;
