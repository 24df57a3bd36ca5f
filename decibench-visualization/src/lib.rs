//! Charts for the decimation benchmark
//!
//! Every chart renders to SVG through `plotters`:
//! - [`BarChart`]: grouped bars with error bars, optional log axis
//! - [`InteractionPlot`]: one line per series across categories
//! - [`FacetedBarChart`]: a row of bar chart panels under a shared title
//! - [`QqPlot`]: normal quantile-quantile plot with a 45 degree reference
//!
//! Rendering failures surface as [`decibench_core::Error::Visualization`].

pub mod axis;
pub mod bar;
pub mod interaction;
pub mod facet;
pub mod qq;

pub use axis::*;
pub use bar::*;
pub use interaction::*;
pub use facet::*;
pub use qq::*;

pub use plotters::style::RGBColor;

use decibench_core::Error;

/// Collapse a plotting backend error into the shared error type
pub(crate) fn render_error(e: Box<dyn std::error::Error>) -> Error {
    Error::Visualization(e.to_string())
}
