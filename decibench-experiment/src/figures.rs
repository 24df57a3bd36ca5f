//! Report figures: bar charts, interaction plots and per-type decimation
//! charts, all with 95% normal-approximation error bars.

use crate::config::FigureConfig;
use crate::results::{read_results, sorted_unique, unique_in_order, values, ResultRow, Response};
use anyhow::Context;
use decibench_stats::Summary;
use decibench_visualization::{BarChart, Estimate, InteractionPlot, Marker, Scale, Series};
use std::path::{Path, PathBuf};
use tracing::info;

/// z for a two-sided 95% interval
const Z95: f64 = 1.96;

fn scale_for(response: Response) -> Scale {
    match response {
        Response::Time => Scale::Log10,
        Response::HausdorffDist => Scale::Linear,
    }
}

/// Mean with a `1.96 * sem` half width, `None` for an empty cell
pub fn normal_estimate(data: &[f64]) -> Option<Estimate> {
    let s = Summary::from_slice(data).ok()?;
    Some(Estimate::symmetric(s.mean, s.normal_ci(Z95)))
}

/// One series per algorithm over `categories`, where `category` picks the
/// x key of a row.
fn series_by_algorithm<'a, F>(
    rows: &'a [ResultRow],
    algorithms: &[&str],
    categories: &[&str],
    response: Response,
    category: F,
) -> Vec<Series>
where
    F: Fn(&'a ResultRow) -> &'a str,
{
    algorithms
        .iter()
        .map(|&algorithm| {
            let estimates = categories
                .iter()
                .map(|&c| {
                    let cell: Vec<&ResultRow> = rows
                        .iter()
                        .filter(|r| r.algorithm == algorithm && category(*r) == c)
                        .collect();
                    normal_estimate(&values(&cell, response))
                })
                .collect();
            Series::new(algorithm, estimates)
        })
        .collect()
}

fn owned(labels: &[&str]) -> Vec<String> {
    labels.iter().map(|s| s.to_string()).collect()
}

fn bar_chart(rows: &[ResultRow], response: Response) -> BarChart {
    let types = sorted_unique(rows, |r| r.mesh_type.as_str());
    let algorithms = sorted_unique(rows, |r| r.algorithm.as_str());
    let (title, y_label) = match response {
        Response::Time => ("Execution Time by Mesh Type and Algorithm", "Time (s) - Log Scale"),
        Response::HausdorffDist => ("Hausdorff Distance by Mesh Type and Algorithm", "Hausdorff Distance"),
    };
    let series = series_by_algorithm(rows, &algorithms, &types, response, |r| r.mesh_type.as_str());
    series
        .into_iter()
        .fold(BarChart::new(title, owned(&types)), BarChart::series)
        .labels("Mesh Type", y_label)
        .scale(scale_for(response))
        .legend()
}

fn interaction_plot(rows: &[ResultRow], response: Response) -> InteractionPlot {
    let types = sorted_unique(rows, |r| r.mesh_type.as_str());
    let algorithms = unique_in_order(rows, |r| r.algorithm.as_str());
    let title = match response {
        Response::Time => "Interaction Plot: Time vs. Mesh Type & Algorithm",
        Response::HausdorffDist => "Interaction Plot: Geometric Error vs. Mesh Type & Algorithm",
    };
    let series = series_by_algorithm(rows, &algorithms, &types, response, |r| r.mesh_type.as_str());
    series
        .into_iter()
        .fold(InteractionPlot::new(title, owned(&types)), |plot, s| {
            let marker = if s.name == "QEM" { Marker::Circle } else { Marker::Square };
            plot.series(s, marker)
        })
        .labels("Mesh Type", response.column())
        .scale(scale_for(response))
}

fn decimation_chart(rows: &[ResultRow], mesh_type: &str, response: Response) -> BarChart {
    let subset: Vec<ResultRow> = rows.iter().filter(|r| r.mesh_type == mesh_type).cloned().collect();
    let levels = sorted_unique(&subset, |r| r.decimation.as_str());
    let algorithms = sorted_unique(&subset, |r| r.algorithm.as_str());
    let prefix = match response {
        Response::Time => "Execution Time",
        Response::HausdorffDist => "Hausdorff Dist",
    };
    let series = series_by_algorithm(&subset, &algorithms, &levels, response, |r| r.decimation.as_str());
    series
        .into_iter()
        .fold(
            BarChart::new(format!("{prefix} - {mesh_type}"), owned(&levels)).size(800, 600),
            BarChart::series,
        )
        .labels("Decimation Level", response.column())
        .scale(scale_for(response))
        .legend()
}

fn file_prefix(response: Response) -> &'static str {
    match response {
        Response::Time => "time",
        Response::HausdorffDist => "hd",
    }
}

/// Render every report figure for `rows` into `dir`; returns the files written
pub fn render_report_figures(rows: &[ResultRow], dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    anyhow::ensure!(!rows.is_empty(), "results table is empty");
    std::fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))?;
    let mut written = Vec::new();

    for response in Response::ALL {
        let prefix = file_prefix(response);

        let path = dir.join(format!("{prefix}_bar_chart.svg"));
        bar_chart(rows, response).render(&path)?;
        written.push(path);

        let path = dir.join(format!("{prefix}_interaction.svg"));
        interaction_plot(rows, response).render(&path)?;
        written.push(path);

        for mesh_type in sorted_unique(rows, |r| r.mesh_type.as_str()) {
            let path = dir.join(format!("{prefix}_dec_{mesh_type}.svg"));
            decimation_chart(rows, mesh_type, response).render(&path)?;
            written.push(path);
        }
    }
    Ok(written)
}

/// Read the results table and render the report figures
pub fn run_figures(results: &Path, config: &FigureConfig) -> anyhow::Result<Vec<PathBuf>> {
    let rows = read_results(results)
        .with_context(|| format!("failed to read {}", results.display()))?;
    let written = render_report_figures(&rows, &config.report_dir)?;
    info!(figures = written.len(), dir = %config.report_dir.display(), "Figures generated");
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::tests::synthetic_rows;
    use approx::assert_relative_eq;

    #[test]
    fn test_normal_estimate() {
        let e = normal_estimate(&[1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();
        assert_relative_eq!(e.mean, 3.0);
        // sem = sqrt(2.5) / sqrt(5)
        assert_relative_eq!(e.upper - e.mean, 1.96 * (0.5f64).sqrt(), epsilon = 1e-12);
        assert!(normal_estimate(&[]).is_none());
        let single = normal_estimate(&[2.0]).unwrap();
        assert_eq!(single.lower, single.upper);
    }

    #[test]
    fn test_bar_chart_layout() {
        let rows = synthetic_rows();
        let chart = bar_chart(&rows, Response::Time);
        assert_eq!(chart.categories, ["clean_cad", "organic_scanned"]);
        let names: Vec<&str> = chart.series.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["Clustering", "QEM"]);
        assert_eq!(chart.scale, Scale::Log10);
        assert_eq!(bar_chart(&rows, Response::HausdorffDist).scale, Scale::Linear);
    }

    #[test]
    fn test_interaction_markers() {
        let plot = interaction_plot(&synthetic_rows(), Response::HausdorffDist);
        assert_eq!(plot.series[0].name, "QEM");
        assert_eq!(plot.markers, [Marker::Circle, Marker::Square]);
    }

    #[test]
    fn test_render_report_figures() {
        let dir = tempfile::tempdir().unwrap();
        let written = render_report_figures(&synthetic_rows(), dir.path()).unwrap();
        let names: Vec<String> = written
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        for expected in [
            "time_bar_chart.svg",
            "hd_bar_chart.svg",
            "time_interaction.svg",
            "hd_interaction.svg",
            "time_dec_clean_cad.svg",
            "time_dec_organic_scanned.svg",
            "hd_dec_clean_cad.svg",
            "hd_dec_organic_scanned.svg",
        ] {
            assert!(names.iter().any(|n| n == expected), "missing {expected}");
            assert!(dir.path().join(expected).is_file());
        }
    }
}
