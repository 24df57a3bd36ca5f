//! Residual normality diagnostics for the ANOVA model

use crate::analysis::format_sci;
use crate::config::FigureConfig;
use crate::results::{read_results, ResultRow, Response};
use anyhow::Context;
use decibench_stats::{normal_qq_points, residuals_from_group_means, shapiro_wilk, ShapiroWilk};
use decibench_visualization::QqPlot;
use std::path::Path;
use tracing::info;

/// Residuals of `response` from its (Algorithm, Type, Decimation) cell means
pub fn cell_residuals(rows: &[ResultRow], response: Response) -> Vec<f64> {
    let y: Vec<f64> = rows.iter().map(|r| response.value(r)).collect();
    let keys: Vec<(&str, &str, &str)> = rows
        .iter()
        .map(|r| (r.algorithm.as_str(), r.mesh_type.as_str(), r.decimation.as_str()))
        .collect();
    residuals_from_group_means(&y, &keys)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResidualDiagnostics {
    pub time: ShapiroWilk,
    pub hausdorff: ShapiroWilk,
}

impl ResidualDiagnostics {
    /// Lines written to the statistical summary file
    pub fn summary(&self) -> String {
        format!(
            "Shapiro-Wilk Test for Time Residuals: W={:.4}, p={}\n\
             Shapiro-Wilk Test for HD Residuals:   W={:.4}, p={}\n",
            self.time.w,
            format_sci(self.time.p_value, 4),
            self.hausdorff.w,
            format_sci(self.hausdorff.p_value, 4)
        )
    }
}

/// Test the residuals, write the summary and both Q-Q plots
pub fn run_diagnostics(results: &Path, config: &FigureConfig) -> anyhow::Result<ResidualDiagnostics> {
    let rows = read_results(results)
        .with_context(|| format!("failed to read {}", results.display()))?;

    let time_residuals = cell_residuals(&rows, Response::Time);
    let hd_residuals = cell_residuals(&rows, Response::HausdorffDist);
    let diagnostics = ResidualDiagnostics {
        time: shapiro_wilk(&time_residuals).context("Shapiro-Wilk on time residuals")?,
        hausdorff: shapiro_wilk(&hd_residuals).context("Shapiro-Wilk on HD residuals")?,
    };

    if let Some(parent) = config.statistical_summary.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&config.statistical_summary, diagnostics.summary())
        .with_context(|| format!("failed to write {}", config.statistical_summary.display()))?;

    std::fs::create_dir_all(&config.report_dir)
        .with_context(|| format!("failed to create {}", config.report_dir.display()))?;
    QqPlot::new(
        "Q-Q Plot of Execution Time Residuals",
        normal_qq_points(&time_residuals),
    )
    .render(&config.report_dir.join("qq_plot_time.svg"))?;
    QqPlot::new(
        "Q-Q Plot of Hausdorff Distance Residuals",
        normal_qq_points(&hd_residuals),
    )
    .render(&config.report_dir.join("qq_plot_hd.svg"))?;

    info!(
        time_w = diagnostics.time.w,
        time_p = diagnostics.time.p_value,
        hd_w = diagnostics.hausdorff.w,
        hd_p = diagnostics.hausdorff.p_value,
        "Residual diagnostics written"
    );
    Ok(diagnostics)
}
