//! Statistical analysis report over the results table
//!
//! Sections, in order: descriptive statistics with t intervals per
//! (Algorithm, Type), per-group Shapiro-Wilk, Levene across groups, three-way
//! type II ANOVA for both responses, Tukey HSD on the combined
//! `Algorithm_Type_Decimation` groups, and a short interpretation guide.

use crate::config::AnalysisConfig;
use crate::results::{read_results, sorted_unique, unique_in_order, values, ResultRow, Response};
use anyhow::Context;
use decibench_core::Result;
use decibench_stats::{levene, shapiro_wilk, tukey_hsd, FactorialAnova, Summary};
use std::fmt::Write as _;
use std::path::Path;
use tracing::{info, warn};

/// Descriptive statistics of one (Algorithm, Type) group
#[derive(Debug, Clone, PartialEq)]
pub struct GroupSummary {
    pub algorithm: String,
    pub mesh_type: String,
    pub time: Summary,
    pub time_ci: (f64, f64),
    pub hausdorff: Summary,
    pub hausdorff_ci: (f64, f64),
}

/// Rows whose algorithm and type match
fn subset<'a>(rows: &'a [ResultRow], algorithm: &str, mesh_type: &str) -> Vec<&'a ResultRow> {
    rows.iter()
        .filter(|r| r.algorithm == algorithm && r.mesh_type == mesh_type)
        .collect()
}

/// Summaries for every (Algorithm, Type) pair present, sorted by both keys
pub fn describe_groups(rows: &[ResultRow], confidence: f64) -> Result<Vec<GroupSummary>> {
    let mut out = Vec::new();
    for algorithm in sorted_unique(rows, |r| r.algorithm.as_str()) {
        for mesh_type in sorted_unique(rows, |r| r.mesh_type.as_str()) {
            let group = subset(rows, algorithm, mesh_type);
            if group.is_empty() {
                continue;
            }
            let time = Summary::from_slice(&values(&group, Response::Time))?;
            let hausdorff = Summary::from_slice(&values(&group, Response::HausdorffDist))?;
            out.push(GroupSummary {
                algorithm: algorithm.to_string(),
                mesh_type: mesh_type.to_string(),
                time_ci: time.t_interval(confidence)?,
                time,
                hausdorff_ci: hausdorff.t_interval(confidence)?,
                hausdorff,
            });
        }
    }
    Ok(out)
}

/// Scientific notation with a signed two-digit exponent, e.g. `1.2346e-05`
pub fn format_sci(x: f64, precision: usize) -> String {
    if !x.is_finite() {
        return format!("{x}").to_lowercase();
    }
    let s = format!("{x:.precision$e}");
    match s.split_once('e') {
        Some((mantissa, exp)) => {
            let exp: i32 = exp.parse().unwrap_or(0);
            let sign = if exp < 0 { '-' } else { '+' };
            format!("{mantissa}e{sign}{:02}", exp.abs())
        }
        None => s,
    }
}

/// Shapiro-Wilk p-value, NaN when the test is undefined for the sample
fn shapiro_p(data: &[f64], what: &str) -> f64 {
    match shapiro_wilk(data) {
        Ok(sw) => sw.p_value,
        Err(e) => {
            warn!(group = what, error = %e, "Shapiro-Wilk not computed");
            f64::NAN
        }
    }
}

fn write_descriptive(out: &mut String, rows: &[ResultRow], confidence: f64) -> anyhow::Result<()> {
    let pct = (confidence * 100.0).round();
    writeln!(out, "\n--- Descriptive Statistics with {pct}% CI ---")?;
    let groups = describe_groups(rows, confidence)?;

    writeln!(out, "Summary Table:")?;
    writeln!(
        out,
        "{:<15} {:<20} {:>12} {:>12} {:>6} {:>12} {:>12} {:>12} {:>6} {:>12}",
        "Algorithm", "Type", "Time mean", "Time std", "count", "Time sem", "HD mean", "HD std", "count", "HD sem"
    )?;
    for g in &groups {
        writeln!(
            out,
            "{:<15} {:<20} {:>12.6} {:>12.6} {:>6} {:>12.6} {:>12.6} {:>12.6} {:>6} {:>12.6}",
            g.algorithm,
            g.mesh_type,
            g.time.mean,
            g.time.std,
            g.time.count,
            g.time.sem,
            g.hausdorff.mean,
            g.hausdorff.std,
            g.hausdorff.count,
            g.hausdorff.sem
        )?;
    }

    let time_ci = format!("Time {pct}% CI");
    let hd_ci = format!("HD {pct}% CI");
    writeln!(
        out,
        "{:<15} {:<20} {:<10} {:<25} {:<10} {:<25}",
        "Algorithm", "Type", "Time Mean", time_ci, "HD Mean", hd_ci
    )?;
    writeln!(out, "{}", "-".repeat(110))?;
    for g in &groups {
        writeln!(
            out,
            "{:<15} {:<20} {:<10.4} ({:.4}, {:.4})    {:<10.4} ({:.4}, {:.4})",
            g.algorithm,
            g.mesh_type,
            g.time.mean,
            g.time_ci.0,
            g.time_ci.1,
            g.hausdorff.mean,
            g.hausdorff_ci.0,
            g.hausdorff_ci.1
        )?;
    }
    writeln!(out, "{}", "-".repeat(110))?;
    Ok(())
}

fn write_normality(out: &mut String, rows: &[ResultRow], alpha: f64) -> anyhow::Result<()> {
    writeln!(
        out,
        "Shapiro-Wilk Test for Normality (p-value < {alpha} indicates non-normality):"
    )?;
    for algorithm in unique_in_order(rows, |r| r.algorithm.as_str()) {
        for mesh_type in unique_in_order(rows, |r| r.mesh_type.as_str()) {
            let group = subset(rows, algorithm, mesh_type);
            if group.len() <= 3 {
                continue;
            }
            let what = format!("{algorithm} - {mesh_type}");
            let p_time = shapiro_p(&values(&group, Response::Time), &what);
            let p_hd = shapiro_p(&values(&group, Response::HausdorffDist), &what);
            writeln!(out, "  {what}: Time p={p_time:.4}, HD p={p_hd:.4}")?;
        }
    }
    Ok(())
}

fn write_levene(out: &mut String, rows: &[ResultRow], alpha: f64) -> anyhow::Result<()> {
    writeln!(
        out,
        "\nLevene's Test for Homogeneity of Variance (p-value < {alpha} indicates unequal variances):"
    )?;
    let mut groups = Vec::new();
    for algorithm in unique_in_order(rows, |r| r.algorithm.as_str()) {
        for mesh_type in unique_in_order(rows, |r| r.mesh_type.as_str()) {
            let group = subset(rows, algorithm, mesh_type);
            if !group.is_empty() {
                groups.push(group);
            }
        }
    }

    for response in Response::ALL {
        let samples: Vec<Vec<f64>> = groups.iter().map(|g| values(g, response)).collect();
        let p = match levene(&samples) {
            Ok(l) => l.p_value,
            Err(e) => {
                warn!(response = response.column(), error = %e, "Levene not computed");
                f64::NAN
            }
        };
        let name = match response {
            Response::Time => "Time",
            Response::HausdorffDist => "Hausdorff Distance",
        };
        writeln!(out, "  {name}: p={p:.4}")?;
    }
    writeln!(out, "\n")?;
    Ok(())
}

fn write_anova(out: &mut String, rows: &[ResultRow]) -> anyhow::Result<()> {
    writeln!(out, "--- Three-Way ANOVA Results ---")?;
    let algorithms: Vec<&str> = rows.iter().map(|r| r.algorithm.as_str()).collect();
    let types: Vec<&str> = rows.iter().map(|r| r.mesh_type.as_str()).collect();
    let levels: Vec<&str> = rows.iter().map(|r| r.decimation.as_str()).collect();

    for response in Response::ALL {
        writeln!(out, "Dependent Variable: {}", response.description())?;
        let y: Vec<f64> = rows.iter().map(|r| response.value(r)).collect();
        let table = FactorialAnova::new(&y)
            .factor("C(Algorithm)", &algorithms)
            .factor("C(Type)", &types)
            .factor("C(Decimation)", &levels)
            .fit_type2();
        match table {
            Ok(table) => write!(out, "{table}")?,
            Err(e) => {
                warn!(response = response.column(), error = %e, "ANOVA not computed");
                writeln!(out, "ANOVA could not be computed: {e}")?;
            }
        }
        writeln!(out, "\n")?;
    }
    Ok(())
}

fn write_tukey(out: &mut String, rows: &[ResultRow], alpha: f64) -> anyhow::Result<()> {
    writeln!(out, "--- Post-Hoc Analysis (Tukey's HSD) ---")?;
    writeln!(out, "Performing pairwise comparisons to control for Type 1 error.\n")?;
    let labels: Vec<String> = rows
        .iter()
        .map(|r| format!("{}_{}_{}", r.algorithm, r.mesh_type, r.decimation))
        .collect();

    for (i, response) in Response::ALL.into_iter().enumerate() {
        writeln!(out, "{}. Tukey HSD for {}:", i + 1, response.description())?;
        let y: Vec<f64> = rows.iter().map(|r| response.value(r)).collect();
        match tukey_hsd(&y, &labels, alpha) {
            Ok(hsd) => writeln!(out, "{hsd}")?,
            Err(e) => {
                warn!(response = response.column(), error = %e, "Tukey HSD not computed");
                writeln!(out, "Tukey HSD could not be computed: {e}")?;
            }
        }
        writeln!(out, "\n")?;
    }
    Ok(())
}

/// The full analysis report as text
pub fn analysis_report(rows: &[ResultRow], config: &AnalysisConfig) -> anyhow::Result<String> {
    anyhow::ensure!(!rows.is_empty(), "results table is empty");
    let mut out = String::new();
    write_descriptive(&mut out, rows, config.confidence)?;
    write_normality(&mut out, rows, config.alpha)?;
    write_levene(&mut out, rows, config.alpha)?;
    write_anova(&mut out, rows)?;
    write_tukey(&mut out, rows, config.alpha)?;

    writeln!(out, "=== Analysis Complete ===")?;
    writeln!(out, "\nInterpretation Guide:")?;
    writeln!(
        out,
        "- If Levene's test p < {}: Variances are unequal, T-test results may be affected.",
        config.alpha
    )?;
    Ok(out)
}

/// Read `results`, analyse it and write the report to `config.summary_file`
pub fn run_analysis(results: &Path, config: &AnalysisConfig) -> anyhow::Result<()> {
    let rows = read_results(results)
        .with_context(|| format!("{} not found or unreadable; run the experiment first", results.display()))?;
    let report = analysis_report(&rows, config)?;
    std::fs::write(&config.summary_file, report)
        .with_context(|| format!("failed to write {}", config.summary_file.display()))?;
    info!(rows = rows.len(), summary = %config.summary_file.display(), "Analysis written");
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// Balanced synthetic results: 2 algorithms x 2 types x 2 levels x 5 models
    pub(crate) fn synthetic_rows() -> Vec<ResultRow> {
        let mut rows = Vec::new();
        for (ai, algorithm) in ["QEM", "Clustering"].iter().enumerate() {
            for (ti, mesh_type) in ["clean_cad", "organic_scanned"].iter().enumerate() {
                for (di, decimation) in ["50pct", "90pct"].iter().enumerate() {
                    for m in 0..5 {
                        let jitter = (m as f64 - 2.0) * 0.01 + (m * m) as f64 * 0.001;
                        rows.push(ResultRow {
                            model: format!("model_{m}.obj"),
                            mesh_type: mesh_type.to_string(),
                            algorithm: algorithm.to_string(),
                            decimation: decimation.to_string(),
                            time: if ai == 0 { 0.5 + 0.2 * ti as f64 } else { 0.01 } + jitter.abs(),
                            hausdorff: 0.01 + 0.02 * ai as f64 + 0.01 * di as f64 + jitter * 0.1 + 0.05,
                            initial_faces: 4000,
                            final_faces: if di == 0 { 2000 } else { 400 },
                        });
                    }
                }
            }
        }
        rows
    }

    #[test]
    fn test_format_sci() {
        assert_eq!(format_sci(1.23456e-5, 4), "1.2346e-05");
        assert_eq!(format_sci(0.5, 4), "5.0000e-01");
        assert_eq!(format_sci(12345.0, 2), "1.23e+04");
        assert_eq!(format_sci(f64::NAN, 4), "nan");
    }

    #[test]
    fn test_describe_groups_sorted() {
        let rows = synthetic_rows();
        let groups = describe_groups(&rows, 0.95).unwrap();
        let keys: Vec<(&str, &str)> = groups
            .iter()
            .map(|g| (g.algorithm.as_str(), g.mesh_type.as_str()))
            .collect();
        assert_eq!(
            keys,
            [
                ("Clustering", "clean_cad"),
                ("Clustering", "organic_scanned"),
                ("QEM", "clean_cad"),
                ("QEM", "organic_scanned")
            ]
        );
        let g = &groups[2];
        assert_eq!(g.time.count, 10);
        assert_relative_eq!(
            (g.time_ci.0 + g.time_ci.1) / 2.0,
            g.time.mean,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_report_sections() {
        let report = analysis_report(&synthetic_rows(), &AnalysisConfig::default()).unwrap();
        for section in [
            "--- Descriptive Statistics with 95% CI ---",
            "Shapiro-Wilk Test for Normality (p-value < 0.05 indicates non-normality):",
            "  QEM - clean_cad: Time p=",
            "  Time: p=",
            "  Hausdorff Distance: p=",
            "--- Three-Way ANOVA Results ---",
            "Dependent Variable: Execution Time",
            "C(Algorithm):C(Type):C(Decimation)",
            "1. Tukey HSD for Execution Time:",
            "2. Tukey HSD for Hausdorff Distance:",
            "Multiple Comparison of Means - Tukey HSD, FWER=0.05",
            "QEM_organic_scanned_90pct",
            "=== Analysis Complete ===",
        ] {
            assert!(report.contains(section), "missing {section:?}");
        }
        // Shapiro groups follow first appearance: QEM before Clustering
        let qem = report.find("  QEM - clean_cad").unwrap();
        let clustering = report.find("  Clustering - clean_cad").unwrap();
        assert!(qem < clustering);
    }

    #[test]
    fn test_run_analysis_writes_summary() {
        let dir = tempfile::tempdir().unwrap();
        let results = dir.path().join("experiment_results.csv");
        let mut writer = crate::results::ResultsWriter::create(&results).unwrap();
        for row in synthetic_rows() {
            writer.write_row(&row).unwrap();
        }
        let config = AnalysisConfig {
            summary_file: dir.path().join("analysis_summary.txt"),
            ..AnalysisConfig::default()
        };
        run_analysis(&results, &config).unwrap();
        let text = std::fs::read_to_string(&config.summary_file).unwrap();
        assert!(text.contains("=== Analysis Complete ==="));

        assert!(run_analysis(&dir.path().join("missing.csv"), &config).is_err());
        assert!(analysis_report(&[], &config).is_err());
    }
}
