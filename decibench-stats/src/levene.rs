//! Levene's test for equal variances, median-centred (Brown-Forsythe)

use crate::descriptive::{mean, median};
use decibench_core::{Error, Result};
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, FisherSnedecor};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Levene {
    pub statistic: f64,
    pub p_value: f64,
    /// Numerator and denominator degrees of freedom `(k - 1, N - k)`
    pub df: (usize, usize),
}

/// Test whether all `groups` share the same variance.
pub fn levene<G: AsRef<[f64]>>(groups: &[G]) -> Result<Levene> {
    let k = groups.len();
    if k < 2 {
        return Err(Error::Statistics(format!("Levene needs at least 2 groups, got {k}")));
    }
    if groups.iter().any(|g| g.as_ref().is_empty()) {
        return Err(Error::Statistics("Levene groups must not be empty".into()));
    }
    let total: usize = groups.iter().map(|g| g.as_ref().len()).sum();
    if total <= k {
        return Err(Error::Statistics(format!(
            "Levene needs more observations ({total}) than groups ({k})"
        )));
    }

    let deviations: Vec<Vec<f64>> = groups
        .iter()
        .map(|g| {
            let g = g.as_ref();
            let centre = median(g);
            g.iter().map(|x| (x - centre).abs()).collect()
        })
        .collect();

    let group_means: Vec<f64> = deviations.iter().map(|z| mean(z)).collect();
    let grand_mean = deviations.iter().flatten().sum::<f64>() / total as f64;

    let between: f64 = deviations
        .iter()
        .zip(&group_means)
        .map(|(z, zm)| z.len() as f64 * (zm - grand_mean).powi(2))
        .sum();
    let within: f64 = deviations
        .iter()
        .zip(&group_means)
        .map(|(z, zm)| z.iter().map(|v| (v - zm).powi(2)).sum::<f64>())
        .sum();

    let (df1, df2) = (k - 1, total - k);
    let statistic = (df2 as f64 / df1 as f64) * between / within;
    let p_value = f_survival(statistic, df1 as f64, df2 as f64)?;

    Ok(Levene {
        statistic,
        p_value,
        df: (df1, df2),
    })
}

/// Upper tail of the F distribution, tolerating infinite and NaN statistics
pub(crate) fn f_survival(f: f64, df1: f64, df2: f64) -> Result<f64> {
    if f.is_nan() {
        return Ok(f64::NAN);
    }
    if f == f64::INFINITY {
        return Ok(0.0);
    }
    let dist = FisherSnedecor::new(df1, df2).map_err(|e| Error::Statistics(e.to_string()))?;
    Ok(dist.sf(f.max(0.0)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_levene_statistic() {
        let r = levene(&[vec![1.0, 2.0, 3.0], vec![2.0, 4.0, 6.0]]).unwrap();
        assert_relative_eq!(r.statistic, 0.8, epsilon = 1e-12);
        assert_eq!(r.df, (1, 4));
        assert!(r.p_value > 0.3 && r.p_value < 0.5);
    }

    #[test]
    fn test_equal_spread_gives_zero() {
        let r = levene(&[[1.0, 2.0, 3.0], [11.0, 12.0, 13.0]]).unwrap();
        assert_relative_eq!(r.statistic, 0.0);
        assert_relative_eq!(r.p_value, 1.0);
    }

    #[test]
    fn test_detects_unequal_variance() {
        let tight: Vec<f64> = (0..20).map(|i| 10.0 + 0.01 * (i % 5) as f64).collect();
        let wide: Vec<f64> = (0..20).map(|i| 10.0 + 5.0 * (i % 5) as f64 - 10.0).collect();
        let r = levene(&[tight, wide]).unwrap();
        assert!(r.p_value < 1e-6);
    }

    #[test]
    fn test_invalid_inputs() {
        assert!(levene(&[vec![1.0, 2.0]]).is_err());
        assert!(levene(&[vec![1.0], vec![2.0]]).is_err());
        assert!(levene(&[vec![1.0, 2.0], vec![]]).is_err());
    }
}
