//! Statistics for the decimation benchmark
//!
//! Descriptive summaries and confidence intervals, Shapiro-Wilk normality,
//! Levene (Brown-Forsythe) homogeneity of variance, type II factorial ANOVA
//! and Tukey HSD post-hoc comparisons. Distribution functions come from
//! `statrs`; least squares from `nalgebra`.

pub mod descriptive;
pub mod shapiro;
pub mod levene;
pub mod anova;
pub mod studentized_range;
pub mod tukey;
pub mod residuals;

pub use descriptive::*;
pub use shapiro::*;
pub use levene::*;
pub use anova::*;
pub use studentized_range::*;
pub use tukey::*;
pub use residuals::*;
