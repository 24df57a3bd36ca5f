//! Tukey's honestly significant difference test

use crate::descriptive::mean;
use crate::studentized_range::{ptukey, qtukey};
use decibench_core::{Error, Result};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// One pairwise comparison; `meandiff` is `mean(group2) - mean(group1)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TukeyComparison {
    pub group1: String,
    pub group2: String,
    pub meandiff: f64,
    pub p_adj: f64,
    pub lower: f64,
    pub upper: f64,
    pub reject: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TukeyHsd {
    /// Family-wise error rate
    pub alpha: f64,
    pub df: usize,
    pub mse: f64,
    /// Critical value of the studentized range at `1 - alpha`
    pub q_crit: f64,
    pub comparisons: Vec<TukeyComparison>,
}

impl TukeyHsd {
    pub fn comparison(&self, group1: &str, group2: &str) -> Option<&TukeyComparison> {
        self.comparisons
            .iter()
            .find(|c| c.group1 == group1 && c.group2 == group2)
    }

    pub fn significant(&self) -> impl Iterator<Item = &TukeyComparison> {
        self.comparisons.iter().filter(|c| c.reject)
    }
}

/// All pairwise comparisons between the groups in `labels`, in sorted label
/// order.
pub fn tukey_hsd<S: AsRef<str>>(values: &[f64], labels: &[S], alpha: f64) -> Result<TukeyHsd> {
    if values.len() != labels.len() {
        return Err(Error::Statistics(format!(
            "{} values for {} labels",
            values.len(),
            labels.len()
        )));
    }
    if !(alpha > 0.0 && alpha < 1.0) {
        return Err(Error::Statistics(format!("alpha must be in (0, 1), got {alpha}")));
    }

    let mut groups: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
    for (v, label) in values.iter().zip(labels) {
        groups.entry(label.as_ref()).or_default().push(*v);
    }
    let k = groups.len();
    let n = values.len();
    if k < 2 {
        return Err(Error::Statistics(format!("Tukey HSD needs at least 2 groups, got {k}")));
    }
    if n <= k + 1 {
        return Err(Error::Statistics(format!(
            "Tukey HSD needs more than {} observations for {k} groups",
            k + 1
        )));
    }

    let stats: Vec<(&str, f64, usize)> = groups
        .iter()
        .map(|(name, g)| (*name, mean(g), g.len()))
        .collect();
    let within: f64 = groups
        .values()
        .map(|g| {
            let m = mean(g);
            g.iter().map(|x| (x - m).powi(2)).sum::<f64>()
        })
        .sum();
    let df = n - k;
    let mse = within / df as f64;
    let q_crit = qtukey(1.0 - alpha, k, df as f64)?;

    let comparisons = stats
        .iter()
        .tuple_combinations()
        .map(|(&(g1, m1, n1), &(g2, m2, n2))| -> Result<TukeyComparison> {
            let meandiff = m2 - m1;
            let se = (mse / 2.0 * (1.0 / n1 as f64 + 1.0 / n2 as f64)).sqrt();
            let q = meandiff.abs() / se;
            let p_adj = if q.is_nan() {
                f64::NAN
            } else {
                (1.0 - ptukey(q, k, df as f64)?).clamp(0.0, 1.0)
            };
            Ok(TukeyComparison {
                group1: g1.to_string(),
                group2: g2.to_string(),
                meandiff,
                p_adj,
                lower: meandiff - q_crit * se,
                upper: meandiff + q_crit * se,
                reject: q > q_crit,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(TukeyHsd {
        alpha,
        df,
        mse,
        q_crit,
        comparisons,
    })
}

impl fmt::Display for TukeyHsd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let w1 = self
            .comparisons
            .iter()
            .map(|c| c.group1.len())
            .chain(std::iter::once(6))
            .max()
            .unwrap_or(6);
        let w2 = self
            .comparisons
            .iter()
            .map(|c| c.group2.len())
            .chain(std::iter::once(6))
            .max()
            .unwrap_or(6);
        let rule_len = w1 + w2 + 50;

        writeln!(f, "Multiple Comparison of Means - Tukey HSD, FWER={:.2}", self.alpha)?;
        writeln!(f, "{}", "=".repeat(rule_len))?;
        writeln!(
            f,
            "{:<w1$} {:<w2$} {:>10} {:>7} {:>10} {:>10} {:>6}",
            "group1", "group2", "meandiff", "p-adj", "lower", "upper", "reject"
        )?;
        writeln!(f, "{}", "-".repeat(rule_len))?;
        for c in &self.comparisons {
            writeln!(
                f,
                "{:<w1$} {:<w2$} {:>10.4} {:>7.4} {:>10.4} {:>10.4} {:>6}",
                c.group1,
                c.group2,
                c.meandiff,
                c.p_adj,
                c.lower,
                c.upper,
                if c.reject { "True" } else { "False" }
            )?;
        }
        write!(f, "{}", "-".repeat(rule_len))
    }
}
