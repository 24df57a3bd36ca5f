//! Side by side bar chart panels sharing one y axis

use crate::bar::BarChart;
use crate::render_error;
use decibench_core::{Error, Result};
use plotters::prelude::*;
use std::ops::Range;
use std::path::Path;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct FacetedBarChart {
    pub super_title: String,
    pub panels: Vec<BarChart>,
    pub size: (u32, u32),
}

impl FacetedBarChart {
    pub fn new(super_title: impl Into<String>) -> Self {
        Self {
            super_title: super_title.into(),
            panels: Vec::new(),
            size: (1400, 600),
        }
    }

    #[must_use]
    pub fn panel(mut self, chart: BarChart) -> Self {
        self.panels.push(chart);
        self
    }

    #[must_use]
    pub fn size(mut self, width: u32, height: u32) -> Self {
        self.size = (width, height);
        self
    }

    /// Union of every panel's y range
    pub fn shared_y_range(&self) -> Range<f64> {
        self.panels
            .iter()
            .map(BarChart::y_range)
            .reduce(|a, b| a.start.min(b.start)..a.end.max(b.end))
            .unwrap_or(0.0..1.0)
    }

    pub fn render(&self, path: &Path) -> Result<()> {
        if self.panels.is_empty() {
            return Err(Error::Visualization(format!("{}: no panels", self.super_title)));
        }
        if let Some(scale) = self.panels.first().map(|p| p.scale) {
            if self.panels.iter().any(|p| p.scale != scale) {
                return Err(Error::Visualization(format!(
                    "{}: panels must share one scale",
                    self.super_title
                )));
            }
        }
        for p in &self.panels {
            p.validate()?;
        }
        self.draw(path).map_err(render_error)?;
        debug!(path = %path.display(), panels = self.panels.len(), "Rendered faceted chart");
        Ok(())
    }

    fn draw(&self, path: &Path) -> std::result::Result<(), Box<dyn std::error::Error>> {
        let root = SVGBackend::new(path, self.size).into_drawing_area();
        root.fill(&WHITE)?;
        let body = root.titled(&self.super_title, ("sans-serif", 24))?;
        let range = self.shared_y_range();

        for (area, panel) in body
            .split_evenly((1, self.panels.len()))
            .iter()
            .zip(&self.panels)
        {
            panel.draw(area, Some(range.clone()))?;
        }
        root.present()?;
        Ok(())
    }
}
