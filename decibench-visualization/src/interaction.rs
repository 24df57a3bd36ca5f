//! Interaction plot: series means joined across categories

use crate::axis::{category_label, category_tick_count, value_range, Scale, Series};
use crate::render_error;
use decibench_core::{Error, Result};
use plotters::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Marker {
    Circle,
    Square,
}

#[derive(Debug, Clone)]
pub struct InteractionPlot {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub categories: Vec<String>,
    pub series: Vec<Series>,
    /// One marker per series; falls back to alternating circle and square
    pub markers: Vec<Marker>,
    pub scale: Scale,
    pub size: (u32, u32),
}

impl InteractionPlot {
    pub fn new(title: impl Into<String>, categories: Vec<String>) -> Self {
        Self {
            title: title.into(),
            x_label: String::new(),
            y_label: String::new(),
            categories,
            series: Vec::new(),
            markers: Vec::new(),
            scale: Scale::Linear,
            size: (800, 600),
        }
    }

    #[must_use]
    pub fn labels(mut self, x_label: impl Into<String>, y_label: impl Into<String>) -> Self {
        self.x_label = x_label.into();
        self.y_label = y_label.into();
        self
    }

    #[must_use]
    pub fn series(mut self, series: Series, marker: Marker) -> Self {
        self.series.push(series);
        self.markers.push(marker);
        self
    }

    #[must_use]
    pub fn scale(mut self, scale: Scale) -> Self {
        self.scale = scale;
        self
    }

    fn marker(&self, index: usize) -> Marker {
        self.markers.get(index).copied().unwrap_or(if index % 2 == 0 {
            Marker::Circle
        } else {
            Marker::Square
        })
    }

    pub fn render(&self, path: &Path) -> Result<()> {
        if self.categories.is_empty() {
            return Err(Error::Visualization(format!("{}: no categories", self.title)));
        }
        if let Some(s) = self.series.iter().find(|s| s.values.len() != self.categories.len()) {
            return Err(Error::Visualization(format!(
                "{}: series {} does not match the categories",
                self.title, s.name
            )));
        }
        self.draw(path).map_err(render_error)?;
        debug!(path = %path.display(), "Rendered interaction plot");
        Ok(())
    }

    fn draw(&self, path: &Path) -> std::result::Result<(), Box<dyn std::error::Error>> {
        let root = SVGBackend::new(path, self.size).into_drawing_area();
        root.fill(&WHITE)?;

        let n = self.categories.len() as f64;
        let scale = self.scale;
        let mut chart = ChartBuilder::on(&root)
            .caption(&self.title, ("sans-serif", 20))
            .margin(12)
            .x_label_area_size(40)
            .y_label_area_size(70)
            .build_cartesian_2d(0f64..n, value_range(&self.series, scale, false))?;

        chart
            .configure_mesh()
            .x_labels(category_tick_count(self.categories.len()))
            .x_label_formatter(&|x| category_label(&self.categories, *x))
            .y_label_formatter(&|y| scale.format_tick(*y))
            .x_desc(self.x_label.as_str())
            .y_desc(self.y_label.as_str())
            .draw()?;

        for (si, series) in self.series.iter().enumerate() {
            let color = series.color_or_default(si);
            let points: Vec<(f64, f64)> = series
                .values
                .iter()
                .enumerate()
                .filter_map(|(ci, e)| Some((ci as f64 + 0.5, scale.project(e.as_ref()?.mean)?)))
                .collect();

            let marker = self.marker(si);
            chart
                .draw_series(LineSeries::new(points.iter().copied(), color.stroke_width(2)))?
                .label(series.name.as_str())
                .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2)));

            match marker {
                Marker::Circle => {
                    chart.draw_series(
                        points.iter().map(|&p| Circle::new(p, 5, color.filled())),
                    )?;
                }
                Marker::Square => {
                    chart.draw_series(points.iter().map(|&p| {
                        EmptyElement::at(p) + Rectangle::new([(-5, -5), (5, 5)], color.filled())
                    }))?;
                }
            }

            for (ci, e) in series.values.iter().enumerate() {
                let Some(e) = e.filter(|e| e.has_error_bar()) else {
                    continue;
                };
                let (Some(lo), Some(hi)) = (scale.project(e.lower), scale.project(e.upper)) else {
                    continue;
                };
                let x = ci as f64 + 0.5;
                let cap = 0.04;
                chart.draw_series(
                    [
                        vec![(x, lo), (x, hi)],
                        vec![(x - cap, lo), (x + cap, lo)],
                        vec![(x - cap, hi), (x + cap, hi)],
                    ]
                    .into_iter()
                    .map(|pts| PathElement::new(pts, color.stroke_width(1))),
                )?;
            }
        }

        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperRight)
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()?;

        root.present()?;
        Ok(())
    }
}
