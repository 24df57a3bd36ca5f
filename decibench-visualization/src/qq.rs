//! Normal Q-Q scatter with the 45 degree reference line

use crate::axis::PALETTE;
use crate::render_error;
use decibench_core::{Error, Result};
use plotters::prelude::*;
use std::path::Path;
use tracing::debug;

/// Scatter of `(theoretical, sample)` quantile pairs.
#[derive(Debug, Clone)]
pub struct QqPlot {
    pub title: String,
    pub points: Vec<(f64, f64)>,
    pub size: (u32, u32),
}

impl QqPlot {
    pub fn new(title: impl Into<String>, points: Vec<(f64, f64)>) -> Self {
        Self {
            title: title.into(),
            points,
            size: (600, 600),
        }
    }

    fn extent(&self) -> f64 {
        self.points
            .iter()
            .flat_map(|&(x, y)| [x.abs(), y.abs()])
            .filter(|v| v.is_finite())
            .fold(1.0, f64::max)
            * 1.1
    }

    pub fn render(&self, path: &Path) -> Result<()> {
        if self.points.is_empty() {
            return Err(Error::Visualization(format!("{}: no points", self.title)));
        }
        self.draw(path).map_err(render_error)?;
        debug!(path = %path.display(), points = self.points.len(), "Rendered Q-Q plot");
        Ok(())
    }

    fn draw(&self, path: &Path) -> std::result::Result<(), Box<dyn std::error::Error>> {
        let root = SVGBackend::new(path, self.size).into_drawing_area();
        root.fill(&WHITE)?;

        let e = self.extent();
        let mut chart = ChartBuilder::on(&root)
            .caption(&self.title, ("sans-serif", 18))
            .margin(12)
            .x_label_area_size(40)
            .y_label_area_size(50)
            .build_cartesian_2d(-e..e, -e..e)?;

        chart
            .configure_mesh()
            .x_desc("Theoretical Quantiles")
            .y_desc("Sample Quantiles")
            .draw()?;

        chart.draw_series(LineSeries::new([(-e, -e), (e, e)], RED.stroke_width(1)))?;
        chart.draw_series(
            self.points
                .iter()
                .filter(|(x, y)| x.is_finite() && y.is_finite())
                .map(|&p| Circle::new(p, 3, PALETTE[0].filled())),
        )?;

        root.present()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_qq_plot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("qq_time.svg");
        let points = vec![(-1.0, -1.2), (0.0, 0.1), (1.0, 0.9)];
        QqPlot::new("Q-Q Plot of Execution Time Residuals", points)
            .render(&path)
            .unwrap();
        let svg = std::fs::read_to_string(&path).unwrap();
        assert!(svg.contains("Q-Q Plot of Execution Time Residuals"));
        assert_eq!(svg.matches("<circle").count(), 3);
    }

    #[test]
    fn test_extent_covers_points() {
        let plot = QqPlot::new("t", vec![(-2.5, 0.3), (0.1, 3.0)]);
        assert!(plot.extent() >= 3.0);
        assert!(QqPlot::new("t", Vec::new()).render(Path::new("unused.svg")).is_err());
    }
}
