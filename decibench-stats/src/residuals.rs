//! Cell-mean residuals and normal Q-Q coordinates

use crate::descriptive::{mean, normal_quantile, variance};
use std::collections::HashMap;
use std::hash::Hash;

/// Residual of every observation from the mean of its cell.
///
/// `keys[i]` identifies the cell of `values[i]`; output order follows input.
pub fn residuals_from_group_means<K: Hash + Eq>(values: &[f64], keys: &[K]) -> Vec<f64> {
    let mut sums: HashMap<&K, (f64, usize)> = HashMap::new();
    for (v, k) in values.iter().zip(keys) {
        let entry = sums.entry(k).or_insert((0.0, 0));
        entry.0 += v;
        entry.1 += 1;
    }
    values
        .iter()
        .zip(keys)
        .map(|(v, k)| {
            let (sum, count) = sums[k];
            v - sum / count as f64
        })
        .collect()
}

/// Normal Q-Q pairs `(theoretical, sample)` sorted by sample value.
///
/// The sample is standardised with its mean and maximum likelihood standard
/// deviation; theoretical quantiles use plotting positions `i / (n + 1)`.
pub fn normal_qq_points(data: &[f64]) -> Vec<(f64, f64)> {
    let n = data.len();
    if n == 0 {
        return Vec::new();
    }
    let m = mean(data);
    let sd = variance(data, 0).sqrt();
    let scale = if sd > 0.0 { sd } else { 1.0 };

    let mut sorted = data.to_vec();
    sorted.sort_by(f64::total_cmp);
    sorted
        .iter()
        .enumerate()
        .map(|(i, x)| {
            let theoretical = normal_quantile((i + 1) as f64 / (n + 1) as f64);
            (theoretical, (x - m) / scale)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_residuals_sum_to_zero_per_cell() {
        let values = [1.0, 3.0, 10.0, 14.0, 2.0];
        let keys = [("QEM", "a"), ("QEM", "a"), ("Clustering", "a"), ("Clustering", "a"), ("QEM", "b")];
        let r = residuals_from_group_means(&values, &keys);
        assert_eq!(r, vec![-1.0, 1.0, -2.0, 2.0, 0.0]);
    }

    #[test]
    fn test_qq_points() {
        let pts = normal_qq_points(&[3.0, 1.0, 2.0]);
        assert_eq!(pts.len(), 3);
        assert_relative_eq!(pts[1].0, 0.0, epsilon = 1e-12);
        assert_relative_eq!(pts[0].0, -pts[2].0, epsilon = 1e-12);
        // (1 - 2) / sqrt(2/3)
        assert_relative_eq!(pts[0].1, -(1.5f64).sqrt(), epsilon = 1e-12);
        assert!(pts.windows(2).all(|w| w[0].1 <= w[1].1));
    }

    #[test]
    fn test_qq_constant_sample() {
        let pts = normal_qq_points(&[5.0, 5.0]);
        assert!(pts.iter().all(|p| p.1 == 0.0));
    }
}
