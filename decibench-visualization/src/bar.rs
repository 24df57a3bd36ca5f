//! Grouped bar chart with error bars

use crate::axis::{category_label, category_tick_count, value_range, Estimate, Scale, Series};
use crate::render_error;
use decibench_core::{Error, Result};
use plotters::coord::Shift;
use plotters::prelude::*;
use std::error::Error as StdError;
use std::ops::Range;
use std::path::Path;
use tracing::debug;

/// Fraction of a category slot covered by its bar group
const GROUP_WIDTH: f64 = 0.8;

/// Bars for `series` grouped by `categories`.
#[derive(Debug, Clone)]
pub struct BarChart {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub categories: Vec<String>,
    pub series: Vec<Series>,
    pub scale: Scale,
    pub show_legend: bool,
    pub size: (u32, u32),
}

impl BarChart {
    pub fn new(title: impl Into<String>, categories: Vec<String>) -> Self {
        Self {
            title: title.into(),
            x_label: String::new(),
            y_label: String::new(),
            categories,
            series: Vec::new(),
            scale: Scale::Linear,
            show_legend: false,
            size: (1000, 600),
        }
    }

    #[must_use]
    pub fn labels(mut self, x_label: impl Into<String>, y_label: impl Into<String>) -> Self {
        self.x_label = x_label.into();
        self.y_label = y_label.into();
        self
    }

    #[must_use]
    pub fn series(mut self, series: Series) -> Self {
        self.series.push(series);
        self
    }

    #[must_use]
    pub fn scale(mut self, scale: Scale) -> Self {
        self.scale = scale;
        self
    }

    #[must_use]
    pub fn legend(mut self) -> Self {
        self.show_legend = true;
        self
    }

    #[must_use]
    pub fn size(mut self, width: u32, height: u32) -> Self {
        self.size = (width, height);
        self
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.categories.is_empty() {
            return Err(Error::Visualization(format!("{}: no categories", self.title)));
        }
        if let Some(s) = self.series.iter().find(|s| s.values.len() != self.categories.len()) {
            return Err(Error::Visualization(format!(
                "{}: series {} has {} values for {} categories",
                self.title,
                s.name,
                s.values.len(),
                self.categories.len()
            )));
        }
        Ok(())
    }

    /// Drawing-space y range of this chart
    pub fn y_range(&self) -> Range<f64> {
        value_range(&self.series, self.scale, true)
    }

    /// Write the chart to an SVG file.
    pub fn render(&self, path: &Path) -> Result<()> {
        self.validate()?;
        let root = SVGBackend::new(path, self.size).into_drawing_area();
        self.draw(&root, None)
            .and_then(|_| root.present().map_err(Into::into))
            .map_err(render_error)?;
        debug!(path = %path.display(), series = self.series.len(), "Rendered bar chart");
        Ok(())
    }

    /// Draw into `area`, optionally forcing a shared y range.
    pub(crate) fn draw(
        &self,
        area: &DrawingArea<SVGBackend<'_>, Shift>,
        y_range: Option<Range<f64>>,
    ) -> std::result::Result<(), Box<dyn StdError>> {
        area.fill(&WHITE)?;
        let n = self.categories.len() as f64;
        let y_range = y_range.unwrap_or_else(|| self.y_range());
        let base = y_range.start;

        let mut chart = ChartBuilder::on(area)
            .caption(&self.title, ("sans-serif", 20))
            .margin(12)
            .x_label_area_size(40)
            .y_label_area_size(70)
            .build_cartesian_2d(0f64..n, y_range)?;

        let scale = self.scale;
        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_labels(category_tick_count(self.categories.len()))
            .x_label_formatter(&|x| category_label(&self.categories, *x))
            .y_label_formatter(&|y| scale.format_tick(*y))
            .x_desc(self.x_label.as_str())
            .y_desc(self.y_label.as_str())
            .draw()?;

        let ns = self.series.len().max(1) as f64;
        let bar_w = GROUP_WIDTH / ns;

        for (si, series) in self.series.iter().enumerate() {
            let color = series.color_or_default(si);
            let bars: Vec<(f64, Estimate)> = series
                .values
                .iter()
                .enumerate()
                .filter_map(|(ci, e)| {
                    let x0 = ci as f64 + (1.0 - GROUP_WIDTH) / 2.0 + si as f64 * bar_w;
                    e.map(|e| (x0, e))
                })
                .collect();

            chart
                .draw_series(bars.iter().filter_map(|(x0, e)| {
                    let top = scale.project(e.mean)?;
                    Some(Rectangle::new([(*x0, base), (*x0 + bar_w, top)], color.filled()))
                }))?
                .label(series.name.as_str())
                .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 12, y + 5)], color.filled()));

            for (x0, e) in bars.iter().filter(|(_, e)| e.has_error_bar()) {
                let xc = x0 + bar_w / 2.0;
                let cap = bar_w * 0.15;
                let lo = scale.project(e.lower).unwrap_or(base).max(base);
                let Some(hi) = scale.project(e.upper) else {
                    continue;
                };
                chart.draw_series(
                    [
                        vec![(xc, lo), (xc, hi)],
                        vec![(xc - cap, lo), (xc + cap, lo)],
                        vec![(xc - cap, hi), (xc + cap, hi)],
                    ]
                    .into_iter()
                    .map(|pts| PathElement::new(pts, BLACK.stroke_width(1))),
                )?;
            }
        }

        if self.show_legend && !self.series.is_empty() {
            chart
                .configure_series_labels()
                .position(SeriesLabelPosition::UpperRight)
                .background_style(WHITE.mix(0.8))
                .border_style(BLACK)
                .draw()?;
        }
        Ok(())
    }
}
