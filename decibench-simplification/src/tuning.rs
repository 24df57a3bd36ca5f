//! Threshold search for vertex clustering
//!
//! Clustering has no face budget of its own, so the grid threshold is found
//! by bisection: larger thresholds give fewer faces. The search keeps the
//! threshold whose face count came closest to the target.

use crate::clustering::VertexClustering;
use crate::MeshSimplifier;
use decibench_core::{Error, Result, TriangleMesh};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

/// Bounds and budget for the bisection
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TuningParams {
    /// Lower bound on the threshold (percent of bbox diagonal)
    pub min: f64,
    /// Upper bound on the threshold
    pub max: f64,
    /// Threshold returned when no evaluation improves on it
    pub initial_best: f64,
    pub iterations: usize,
}

impl Default for TuningParams {
    fn default() -> Self {
        Self {
            min: 0.001,
            max: 20.0,
            initial_best: 0.1,
            iterations: 25,
        }
    }
}

/// Best threshold found and the face count it produced
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TuningOutcome {
    pub threshold: f64,
    /// Face count at `threshold`; `None` when no evaluation ran
    pub faces: Option<usize>,
    /// `|faces - target|` at `threshold`
    pub difference: usize,
    pub evaluations: usize,
}

/// Bisect a threshold so that `oracle(threshold)` approaches `target` faces.
///
/// `oracle` must be monotonically non-increasing in the threshold. Its first
/// error aborts the search.
pub fn bisect_threshold<F>(target: usize, params: &TuningParams, mut oracle: F) -> Result<TuningOutcome>
where
    F: FnMut(f64) -> Result<usize>,
{
    if !(params.min.is_finite() && params.max.is_finite() && params.min < params.max) {
        return Err(Error::Config(format!(
            "Invalid tuning range [{}, {}]",
            params.min, params.max
        )));
    }

    let (mut lo, mut hi) = (params.min, params.max);
    let mut best = TuningOutcome {
        threshold: params.initial_best,
        faces: None,
        difference: usize::MAX,
        evaluations: 0,
    };

    for _ in 0..params.iterations {
        let mid = (lo + hi) / 2.0;
        let faces = oracle(mid)?;
        best.evaluations += 1;

        let difference = faces.abs_diff(target);
        trace!(mid, faces, difference, "Tuning step");
        if difference < best.difference {
            best.threshold = mid;
            best.faces = Some(faces);
            best.difference = difference;
        }

        if faces < target {
            hi = mid;
        } else {
            lo = mid;
        }
    }

    Ok(best)
}

/// Find the clustering threshold whose output is closest to `target` faces
pub fn tune_clustering_threshold(
    mesh: &TriangleMesh,
    target: usize,
    params: &TuningParams,
) -> Result<TuningOutcome> {
    let outcome = bisect_threshold(target, params, |threshold| {
        VertexClustering::new(threshold)
            .simplify(mesh)
            .map(|m| m.face_count())
    })?;
    debug!(
        target,
        threshold = outcome.threshold,
        faces = ?outcome.faces,
        evaluations = outcome.evaluations,
        "Tuned clustering threshold"
    );
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use decibench_core::primitives;

    #[test]
    fn test_defaults() {
        let p = TuningParams::default();
        assert_eq!((p.min, p.max, p.initial_best, p.iterations), (0.001, 20.0, 0.1, 25));
    }

    #[test]
    fn test_bisection_on_synthetic_oracle() {
        // faces = 1000 / t, so the exact answer for 200 faces is t = 5
        let outcome = bisect_threshold(200, &TuningParams::default(), |t| {
            Ok((1000.0 / t).round() as usize)
        })
        .unwrap();
        assert_eq!(outcome.evaluations, 25);
        assert_eq!(outcome.faces, Some(200));
        assert!((outcome.threshold - 5.0).abs() < 0.01);
    }

    #[test]
    fn test_first_midpoint_is_center_of_range() {
        let mut calls = Vec::new();
        let params = TuningParams {
            iterations: 3,
            ..TuningParams::default()
        };
        bisect_threshold(10, &params, |t| {
            calls.push(t);
            Ok(0)
        })
        .unwrap();
        // Zero faces is below target so the upper bound keeps shrinking
        assert!((calls[0] - 10.0005).abs() < 1e-9);
        assert!((calls[1] - 5.00075).abs() < 1e-9);
        assert!(calls[2] < calls[1]);
    }

    #[test]
    fn test_zero_iterations_returns_initial_best() {
        let params = TuningParams {
            iterations: 0,
            ..TuningParams::default()
        };
        let outcome = bisect_threshold(10, &params, |_| Ok(0)).unwrap();
        assert_eq!(outcome.threshold, 0.1);
        assert_eq!(outcome.faces, None);
        assert_eq!(outcome.evaluations, 0);
    }

    #[test]
    fn test_oracle_error_aborts() {
        let mut count = 0;
        let result = bisect_threshold(10, &TuningParams::default(), |_| {
            count += 1;
            Err(Error::Algorithm("boom".into()))
        });
        assert!(result.is_err());
        assert_eq!(count, 1);
    }

    #[test]
    fn test_invalid_range() {
        let params = TuningParams {
            min: 5.0,
            max: 1.0,
            ..TuningParams::default()
        };
        assert!(bisect_threshold(10, &params, |_| Ok(0)).is_err());
    }

    #[test]
    fn test_tune_on_sphere() {
        let sphere = primitives::uv_sphere(32, 64, 1.0);
        let target = sphere.face_count() / 4;
        let outcome = tune_clustering_threshold(&sphere, target, &TuningParams::default()).unwrap();
        let faces = outcome.faces.unwrap();
        // Clustering is not continuous in the threshold, but lands in the vicinity
        assert!(faces.abs_diff(target) < target / 3, "got {faces} for {target}");
        assert!(outcome.threshold > 0.001 && outcome.threshold < 20.0);
    }
}
