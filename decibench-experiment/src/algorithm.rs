//! Algorithms under test and decimation levels

use decibench_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A decimation algorithm under test
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Algorithm {
    Qem,
    Clustering,
}

impl Algorithm {
    pub const ALL: [Algorithm; 2] = [Algorithm::Qem, Algorithm::Clustering];

    /// Label written to the `Algorithm` column
    pub fn label(self) -> &'static str {
        match self {
            Algorithm::Qem => "QEM",
            Algorithm::Clustering => "Clustering",
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Algorithm {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "qem" => Ok(Algorithm::Qem),
            "clustering" => Ok(Algorithm::Clustering),
            other => Err(Error::Config(format!("Unknown algorithm {other:?}"))),
        }
    }
}

impl TryFrom<String> for Algorithm {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<Algorithm> for String {
    fn from(a: Algorithm) -> Self {
        a.label().to_string()
    }
}

/// How much of a mesh to remove, e.g. keep 10% for `90pct`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecimationLevel {
    pub keep_fraction: f64,
    pub label: String,
}

impl DecimationLevel {
    /// Level keeping `keep` of the faces; the label is the removed percentage,
    /// rounded to the nearest integer.
    pub fn from_keep_fraction(keep: f64) -> Result<Self> {
        if !(keep > 0.0 && keep <= 1.0) {
            return Err(Error::Config(format!("keep fraction {keep} is outside (0, 1]")));
        }
        let removed = ((1.0 - keep) * 100.0).round() as i64;
        Ok(Self {
            keep_fraction: keep,
            label: format!("{removed}pct"),
        })
    }

    pub fn target_faces(&self, initial_faces: usize) -> usize {
        (initial_faces as f64 * self.keep_fraction).floor() as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_case_insensitive() {
        assert_eq!("QEM".parse::<Algorithm>().unwrap(), Algorithm::Qem);
        assert_eq!(" clustering ".parse::<Algorithm>().unwrap(), Algorithm::Clustering);
        assert_eq!("Clustering".parse::<Algorithm>().unwrap(), Algorithm::Clustering);
        assert!("edge".parse::<Algorithm>().is_err());
    }

    #[test]
    fn test_serde_uses_labels() {
        let json = serde_json::to_string(&Algorithm::ALL).unwrap();
        assert_eq!(json, r#"["QEM","Clustering"]"#);
        let back: Vec<Algorithm> = serde_json::from_str(r#"["clustering","Qem"]"#).unwrap();
        assert_eq!(back, vec![Algorithm::Clustering, Algorithm::Qem]);
    }

    #[test]
    fn test_decimation_labels() {
        assert_eq!(DecimationLevel::from_keep_fraction(0.5).unwrap().label, "50pct");
        // 1 - 0.1 is 0.8999999999999999 in binary
        assert_eq!(DecimationLevel::from_keep_fraction(0.1).unwrap().label, "90pct");
        assert_eq!(DecimationLevel::from_keep_fraction(0.3).unwrap().label, "70pct");
        assert_eq!(DecimationLevel::from_keep_fraction(1.0).unwrap().label, "0pct");
        assert!(DecimationLevel::from_keep_fraction(0.0).is_err());
        assert!(DecimationLevel::from_keep_fraction(f64::NAN).is_err());
    }

    #[test]
    fn test_target_faces_floors() {
        let level = DecimationLevel::from_keep_fraction(0.1).unwrap();
        assert_eq!(level.target_faces(2345), 234);
        assert_eq!(level.target_faces(5), 0);
        let half = DecimationLevel::from_keep_fraction(0.5).unwrap();
        assert_eq!(half.target_faces(2001), 1000);
    }
}
