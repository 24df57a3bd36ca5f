//! Slide figures: bars faceted by decimation level with bootstrap intervals

use crate::config::FigureConfig;
use crate::results::{read_results, sorted_unique, values, ResultRow, Response};
use anyhow::Context;
use decibench_stats::{mean, quantile};
use decibench_visualization::{
    parse_hex_color, BarChart, Estimate, FacetedBarChart, Scale, Series,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::{Path, PathBuf};
use tracing::info;

/// Mesh types in slide order; types not listed follow alphabetically
pub const TYPE_ORDER: [&str; 2] = ["clean_cad", "organic_scanned"];
/// Algorithms in slide order with their fixed colours
pub const HUE_ORDER: [(&str, &str); 2] = [("QEM", "#9b59b6"), ("Clustering", "#e67e22")];

/// Percentile bootstrap interval for the mean.
///
/// `None` for an empty sample. A single value gives a zero-width interval.
pub fn bootstrap_mean_ci<R: Rng>(
    data: &[f64],
    resamples: usize,
    confidence: f64,
    rng: &mut R,
) -> Option<Estimate> {
    if data.is_empty() {
        return None;
    }
    let n = data.len();
    let mut buf = vec![0.0; n];
    let means: Vec<f64> = (0..resamples.max(1))
        .map(|_| {
            for slot in buf.iter_mut() {
                *slot = data[rng.gen_range(0..n)];
            }
            mean(&buf)
        })
        .collect();
    let tail = (1.0 - confidence) / 2.0;
    Some(Estimate::with_bounds(
        mean(data),
        quantile(&means, tail),
        quantile(&means, 1.0 - tail),
    ))
}

/// `preferred` entries first, then the remaining keys sorted
fn ordered<'a>(present: Vec<&'a str>, preferred: &[&'a str]) -> Vec<&'a str> {
    let mut out: Vec<&str> = preferred.to_vec();
    out.extend(present.into_iter().filter(|k| !preferred.contains(k)));
    out
}

/// Faceted slide chart for `response`
pub fn slide_chart(
    rows: &[ResultRow],
    response: Response,
    config: &FigureConfig,
) -> anyhow::Result<FacetedBarChart> {
    let levels = sorted_unique(rows, |r| r.decimation.as_str());
    let types = ordered(sorted_unique(rows, |r| r.mesh_type.as_str()), &TYPE_ORDER);
    let hue_names: Vec<&str> = HUE_ORDER.iter().map(|(name, _)| *name).collect();
    let algorithms = ordered(sorted_unique(rows, |r| r.algorithm.as_str()), &hue_names);

    let (super_title, y_label, scale) = match response {
        Response::Time => (
            "Execution Time: Clustering vs QEM",
            "Execution Time (s) [Log Scale]",
            Scale::Log10,
        ),
        Response::HausdorffDist => (
            "Geometric Fidelity: Clustering vs QEM",
            "Hausdorff Distance (Lower is Better)",
            Scale::Linear,
        ),
    };

    let mut rng = StdRng::seed_from_u64(config.bootstrap_seed);
    let mut chart = FacetedBarChart::new(super_title).size(560 * levels.len().max(1) as u32, 600);
    for (i, level) in levels.iter().enumerate() {
        let mut panel = BarChart::new(
            format!("{level} Decimation"),
            types.iter().map(|t| t.to_string()).collect(),
        )
        .labels("Mesh Type", y_label)
        .scale(scale);
        if i + 1 == levels.len() {
            panel = panel.legend();
        }

        for algorithm in &algorithms {
            let estimates = types
                .iter()
                .map(|t| {
                    let cell: Vec<&ResultRow> = rows
                        .iter()
                        .filter(|r| {
                            r.decimation == *level && r.mesh_type == *t && r.algorithm == *algorithm
                        })
                        .collect();
                    bootstrap_mean_ci(
                        &values(&cell, response),
                        config.bootstrap_resamples,
                        0.95,
                        &mut rng,
                    )
                })
                .collect();
            let mut series = Series::new(*algorithm, estimates);
            if let Some((_, hex)) = HUE_ORDER.iter().find(|(name, _)| name == algorithm) {
                series = series.with_color(parse_hex_color(hex)?);
            }
            panel = panel.series(series);
        }
        chart = chart.panel(panel);
    }
    Ok(chart)
}

/// Read the results table and render both slide figures
pub fn run_presentation(results: &Path, config: &FigureConfig) -> anyhow::Result<Vec<PathBuf>> {
    let rows = read_results(results)
        .with_context(|| format!("failed to read {}", results.display()))?;
    anyhow::ensure!(!rows.is_empty(), "results table is empty");
    std::fs::create_dir_all(&config.presentation_dir)
        .with_context(|| format!("failed to create {}", config.presentation_dir.display()))?;

    let mut written = Vec::new();
    for (response, name) in [
        (Response::Time, "slide5_execution_time.svg"),
        (Response::HausdorffDist, "slide6_geometric_fidelity.svg"),
    ] {
        let path = config.presentation_dir.join(name);
        slide_chart(&rows, response, config)?.render(&path)?;
        written.push(path);
    }
    info!(dir = %config.presentation_dir.display(), "Presentation figures generated");
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::tests::synthetic_rows;
    use crate::results::ResultsWriter;

    #[test]
    fn test_bootstrap_interval_brackets_mean() {
        let mut rng = StdRng::seed_from_u64(42);
        let data = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0];
        let e = bootstrap_mean_ci(&data, 1000, 0.95, &mut rng).unwrap();
        assert_eq!(e.mean, 4.5);
        assert!(e.lower < 4.5 && e.upper > 4.5);
        assert!(e.lower >= 1.0 && e.upper <= 8.0);
        // normal theory half width is about 1.96 * 0.866
        assert!(e.upper - e.lower < 4.0);
    }

    #[test]
    fn test_bootstrap_is_seeded() {
        let data = [0.3, 0.1, 0.4, 0.1, 0.5, 0.9];
        let a = bootstrap_mean_ci(&data, 200, 0.95, &mut StdRng::seed_from_u64(7));
        let b = bootstrap_mean_ci(&data, 200, 0.95, &mut StdRng::seed_from_u64(7));
        assert_eq!(a, b);
    }

    #[test]
    fn test_bootstrap_edge_cases() {
        let mut rng = StdRng::seed_from_u64(0);
        assert!(bootstrap_mean_ci(&[], 100, 0.95, &mut rng).is_none());
        let single = bootstrap_mean_ci(&[2.5], 100, 0.95, &mut rng).unwrap();
        assert_eq!((single.lower, single.mean, single.upper), (2.5, 2.5, 2.5));
    }

    #[test]
    fn test_ordering_prefers_fixed_order() {
        assert_eq!(
            ordered(vec!["organic_scanned", "aaa", "clean_cad"], &TYPE_ORDER),
            ["clean_cad", "organic_scanned", "aaa"]
        );
    }

    #[test]
    fn test_slide_chart_layout() {
        let chart = slide_chart(&synthetic_rows(), Response::Time, &FigureConfig::default()).unwrap();
        assert_eq!(chart.super_title, "Execution Time: Clustering vs QEM");
        let titles: Vec<&str> = chart.panels.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, ["50pct Decimation", "90pct Decimation"]);
        let panel = &chart.panels[0];
        assert_eq!(panel.series[0].name, "QEM");
        assert_eq!(panel.series[0].color, Some(parse_hex_color("#9b59b6").unwrap()));
        assert_eq!(panel.series[1].color, Some(parse_hex_color("#e67e22").unwrap()));
        assert!(!panel.show_legend);
        assert!(chart.panels[1].show_legend);
    }

    #[test]
    fn test_run_presentation() {
        let dir = tempfile::tempdir().unwrap();
        let results = dir.path().join("experiment_results.csv");
        let mut writer = ResultsWriter::create(&results).unwrap();
        for row in synthetic_rows() {
            writer.write_row(&row).unwrap();
        }
        let config = FigureConfig {
            presentation_dir: dir.path().join("presentation"),
            bootstrap_resamples: 100,
            ..FigureConfig::default()
        };
        let written = run_presentation(&results, &config).unwrap();
        assert_eq!(written.len(), 2);
        let svg = std::fs::read_to_string(&written[1]).unwrap();
        assert!(svg.contains("Geometric Fidelity: Clustering vs QEM"));
    }
}
