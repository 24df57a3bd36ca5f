//! Shapiro-Wilk normality test
//!
//! Royston's approximation (Applied Statistics algorithm AS R94, 1995) for
//! the coefficients and the p-value. Valid for 3 <= n <= 5000.

use crate::descriptive::normal_quantile;
use decibench_core::{Error, Result};
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, Normal};

const C1: [f64; 6] = [0.0, 0.221157, -0.147981, -2.071190, 4.434685, -2.706056];
const C2: [f64; 6] = [0.0, 0.042981, -0.293762, -1.752461, 5.682633, -3.582633];
const C3: [f64; 4] = [0.5440, -0.39978, 0.025054, -6.714e-4];
const C4: [f64; 4] = [1.3822, -0.77857, 0.062767, -0.0020322];
const C5: [f64; 4] = [-1.5861, -0.31082, -0.083751, 0.0038915];
const C6: [f64; 3] = [-0.4803, -0.082676, 0.0030302];
const G: [f64; 2] = [-2.273, 0.459];

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShapiroWilk {
    pub w: f64,
    pub p_value: f64,
}

impl ShapiroWilk {
    /// Whether normality is retained at level `alpha`
    pub fn is_normal(&self, alpha: f64) -> bool {
        self.p_value > alpha
    }
}

/// Polynomial `c[0] + c[1] x + c[2] x^2 + ...`
fn poly(c: &[f64], x: f64) -> f64 {
    c.iter().rev().fold(0.0, |acc, &ci| acc * x + ci)
}

/// Coefficients for the lower half of the order statistics, largest first
fn coefficients(n: usize) -> Vec<f64> {
    let nn2 = n / 2;
    if n == 3 {
        return vec![std::f64::consts::FRAC_1_SQRT_2];
    }

    let an = n as f64;
    let an25 = an + 0.25;
    let m: Vec<f64> = (1..=nn2)
        .map(|i| normal_quantile((i as f64 - 0.375) / an25))
        .collect();
    let summ2 = 2.0 * m.iter().map(|v| v * v).sum::<f64>();
    let ssumm2 = summ2.sqrt();
    let rsn = 1.0 / an.sqrt();

    let mut a = vec![0.0; nn2];
    let a1 = poly(&C1, rsn) - m[0] / ssumm2;
    a[0] = a1;

    let (first, fac) = if n > 5 {
        let a2 = -m[1] / ssumm2 + poly(&C2, rsn);
        a[1] = a2;
        let fac = ((summ2 - 2.0 * m[0] * m[0] - 2.0 * m[1] * m[1])
            / (1.0 - 2.0 * a1 * a1 - 2.0 * a2 * a2))
            .sqrt();
        (2, fac)
    } else {
        let fac = ((summ2 - 2.0 * m[0] * m[0]) / (1.0 - 2.0 * a1 * a1)).sqrt();
        (1, fac)
    };
    for i in first..nn2 {
        a[i] = -m[i] / fac;
    }
    a
}

/// Shapiro-Wilk test of the hypothesis that `data` comes from a normal
/// distribution.
pub fn shapiro_wilk(data: &[f64]) -> Result<ShapiroWilk> {
    let n = data.len();
    if !(3..=5000).contains(&n) {
        return Err(Error::Statistics(format!(
            "Shapiro-Wilk needs 3 to 5000 observations, got {n}"
        )));
    }
    if data.iter().any(|x| !x.is_finite()) {
        return Err(Error::Statistics("Shapiro-Wilk data must be finite".into()));
    }

    let mut x = data.to_vec();
    x.sort_by(f64::total_cmp);
    let range = x[n - 1] - x[0];
    if range < 1e-19 {
        return Err(Error::Statistics("Shapiro-Wilk data has zero range".into()));
    }

    // Scale by the range for numerical stability; W is scale invariant
    let x: Vec<f64> = x.iter().map(|v| (v - x[0]) / range).collect();
    let a = coefficients(n);

    let b: f64 = a
        .iter()
        .enumerate()
        .map(|(i, ai)| ai * (x[n - 1 - i] - x[i]))
        .sum();
    let mean = x.iter().sum::<f64>() / n as f64;
    let ssq: f64 = x.iter().map(|v| (v - mean).powi(2)).sum();
    let w = (b * b / ssq).min(1.0);

    Ok(ShapiroWilk {
        w,
        p_value: p_value(w, n),
    })
}

fn p_value(w: f64, n: usize) -> f64 {
    if n == 3 {
        const PI6: f64 = 1.909_859_317_102_74;
        const STQR: f64 = 1.047_197_551_196_6;
        return (PI6 * (w.sqrt().asin() - STQR)).clamp(0.0, 1.0);
    }

    let an = n as f64;
    let w1 = (1.0 - w).ln();
    let (y, m, s) = if n <= 11 {
        let gamma = poly(&G, an);
        if w1 >= gamma {
            return 1e-99;
        }
        (-(gamma - w1).ln(), poly(&C3, an), poly(&C4, an).exp())
    } else {
        let xx = an.ln();
        (w1, poly(&C5, xx), poly(&C6, xx).exp())
    };

    Normal::new(m, s)
        .map(|d| d.sf(y))
        .unwrap_or(f64::NAN)
}
