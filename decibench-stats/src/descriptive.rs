//! Descriptive statistics and confidence intervals

use decibench_core::{Error, Result};
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, Normal, StudentsT};

pub fn mean(data: &[f64]) -> f64 {
    data.iter().sum::<f64>() / data.len() as f64
}

/// Sample variance with `ddof` delta degrees of freedom; NaN when undefined
pub fn variance(data: &[f64], ddof: usize) -> f64 {
    if data.len() <= ddof {
        return f64::NAN;
    }
    let m = mean(data);
    data.iter().map(|x| (x - m).powi(2)).sum::<f64>() / (data.len() - ddof) as f64
}

pub fn median(data: &[f64]) -> f64 {
    quantile(data, 0.5)
}

/// Linearly interpolated quantile of unsorted data (numpy's default method)
pub fn quantile(data: &[f64], q: f64) -> f64 {
    if data.is_empty() {
        return f64::NAN;
    }
    let mut sorted = data.to_vec();
    sorted.sort_by(f64::total_cmp);
    quantile_sorted(&sorted, q)
}

pub(crate) fn quantile_sorted(sorted: &[f64], q: f64) -> f64 {
    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

/// Standard normal quantile
pub fn normal_quantile(p: f64) -> f64 {
    // N(0, 1) always constructs
    Normal::new(0.0, 1.0)
        .map(|n| n.inverse_cdf(p))
        .unwrap_or(f64::NAN)
}

/// Count, mean, standard deviation and standard error of one sample
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub count: usize,
    pub mean: f64,
    /// Sample standard deviation (ddof = 1); NaN for a single value
    pub std: f64,
    pub sem: f64,
}

impl Summary {
    pub fn from_slice(data: &[f64]) -> Result<Self> {
        if data.is_empty() {
            return Err(Error::Statistics("Cannot summarize an empty sample".into()));
        }
        let count = data.len();
        let std = variance(data, 1).sqrt();
        Ok(Self {
            count,
            mean: mean(data),
            std,
            sem: std / (count as f64).sqrt(),
        })
    }

    /// Two-sided Student t interval for the mean. NaN bounds when `count < 2`.
    pub fn t_interval(&self, confidence: f64) -> Result<(f64, f64)> {
        if !(0.0..1.0).contains(&confidence) {
            return Err(Error::Statistics(format!(
                "Confidence must be in [0, 1), got {confidence}"
            )));
        }
        if self.count < 2 {
            return Ok((f64::NAN, f64::NAN));
        }
        let t = StudentsT::new(0.0, 1.0, (self.count - 1) as f64)
            .map_err(|e| Error::Statistics(e.to_string()))?;
        let half = t.inverse_cdf(0.5 + confidence / 2.0) * self.sem;
        Ok((self.mean - half, self.mean + half))
    }

    /// Half-width `z * sem` of a normal-approximation interval
    pub fn normal_ci(&self, z: f64) -> f64 {
        z * self.sem
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_summary() {
        let s = Summary::from_slice(&[1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();
        assert_eq!(s.count, 5);
        assert_relative_eq!(s.mean, 3.0);
        assert_relative_eq!(s.std, 2.5f64.sqrt());
        assert_relative_eq!(s.sem, 0.5f64.sqrt());
    }

    #[test]
    fn test_t_interval() {
        let s = Summary::from_slice(&[1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();
        let (lo, hi) = s.t_interval(0.95).unwrap();
        // t(0.975, 4) = 2.776445
        assert_relative_eq!(lo, 1.036757, epsilon = 1e-5);
        assert_relative_eq!(hi, 4.963243, epsilon = 1e-5);
    }

    #[test]
    fn test_single_value() {
        let s = Summary::from_slice(&[7.0]).unwrap();
        assert!(s.std.is_nan());
        let (lo, hi) = s.t_interval(0.95).unwrap();
        assert!(lo.is_nan() && hi.is_nan());
    }

    #[test]
    fn test_empty_is_error() {
        assert!(Summary::from_slice(&[]).is_err());
    }

    #[test]
    fn test_normal_ci() {
        let s = Summary::from_slice(&[2.0, 4.0, 6.0, 8.0]).unwrap();
        assert_relative_eq!(s.normal_ci(1.96), 1.96 * s.sem);
    }

    #[test]
    fn test_quantiles() {
        let data = [4.0, 1.0, 3.0, 2.0];
        assert_relative_eq!(median(&data), 2.5);
        assert_relative_eq!(quantile(&data, 0.0), 1.0);
        assert_relative_eq!(quantile(&data, 1.0), 4.0);
        assert_relative_eq!(quantile(&data, 0.25), 1.75);
        assert_relative_eq!(normal_quantile(0.975), 1.959964, epsilon = 1e-6);
    }
}
