//! Axis scales, categorical ticks, colours and the shared data model

use decibench_core::{Error, Result};
use plotters::style::RGBColor;
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Default series colours (matplotlib "tab10" order)
pub const PALETTE: [RGBColor; 6] = [
    RGBColor(31, 119, 180),
    RGBColor(255, 127, 14),
    RGBColor(44, 160, 44),
    RGBColor(214, 39, 40),
    RGBColor(148, 103, 189),
    RGBColor(140, 86, 75),
];

/// Parse `#rrggbb`
pub fn parse_hex_color(hex: &str) -> Result<RGBColor> {
    let digits = hex.strip_prefix('#').unwrap_or(hex);
    if digits.len() != 6 {
        return Err(Error::Visualization(format!("Invalid colour {hex:?}")));
    }
    let channel = |i: usize| {
        u8::from_str_radix(&digits[i..i + 2], 16)
            .map_err(|_| Error::Visualization(format!("Invalid colour {hex:?}")))
    };
    Ok(RGBColor(channel(0)?, channel(2)?, channel(4)?))
}

/// Y axis scale
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Scale {
    #[default]
    Linear,
    /// Values are drawn as `log10(v)`; non-positive values are not drawn
    Log10,
}

impl Scale {
    pub fn project(self, v: f64) -> Option<f64> {
        match self {
            Scale::Linear => v.is_finite().then_some(v),
            Scale::Log10 => (v.is_finite() && v > 0.0).then(|| v.log10()),
        }
    }

    pub fn format_tick(self, y: f64) -> String {
        match self {
            Scale::Linear => format_linear(y),
            Scale::Log10 => {
                let k = y.round();
                if (y - k).abs() < 1e-6 {
                    format!("10^{}", k as i32)
                } else {
                    String::new()
                }
            }
        }
    }
}

fn format_linear(y: f64) -> String {
    let a = y.abs();
    if a != 0.0 && !(1e-3..1e4).contains(&a) {
        format!("{y:.1e}")
    } else {
        let s = format!("{y:.4}");
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    }
}

/// A point estimate with its interval
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Estimate {
    pub mean: f64,
    pub lower: f64,
    pub upper: f64,
}

impl Estimate {
    /// `mean +- half_width`; a NaN half width draws no error bar
    pub fn symmetric(mean: f64, half_width: f64) -> Self {
        let h = if half_width.is_finite() { half_width } else { 0.0 };
        Self {
            mean,
            lower: mean - h,
            upper: mean + h,
        }
    }

    pub fn with_bounds(mean: f64, lower: f64, upper: f64) -> Self {
        Self { mean, lower, upper }
    }

    pub(crate) fn has_error_bar(&self) -> bool {
        self.upper > self.lower
    }
}

/// A named sequence of estimates, one slot per category
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub name: String,
    pub values: Vec<Option<Estimate>>,
    pub color: Option<RGBColor>,
}

impl Series {
    pub fn new(name: impl Into<String>, values: Vec<Option<Estimate>>) -> Self {
        Self {
            name: name.into(),
            values,
            color: None,
        }
    }

    #[must_use]
    pub fn with_color(mut self, color: RGBColor) -> Self {
        self.color = Some(color);
        self
    }

    pub(crate) fn color_or_default(&self, index: usize) -> RGBColor {
        self.color.unwrap_or(PALETTE[index % PALETTE.len()])
    }
}

/// Drawing-space y range covering every estimate and its interval.
///
/// Bars need the linear range to include zero. Log ranges snap to whole
/// decades.
pub fn value_range<'a>(
    series: impl IntoIterator<Item = &'a Series>,
    scale: Scale,
    include_zero: bool,
) -> Range<f64> {
    let mut lo = f64::INFINITY;
    let mut hi = f64::NEG_INFINITY;
    for s in series {
        for e in s.values.iter().flatten() {
            for v in [e.mean, e.lower, e.upper] {
                if let Some(p) = scale.project(v) {
                    lo = lo.min(p);
                    hi = hi.max(p);
                }
            }
        }
    }
    if !lo.is_finite() || !hi.is_finite() {
        return match scale {
            Scale::Linear => 0.0..1.0,
            Scale::Log10 => -1.0..1.0,
        };
    }

    match scale {
        Scale::Linear => {
            if include_zero {
                lo = lo.min(0.0);
                hi = hi.max(0.0);
            }
            let pad = ((hi - lo) * 0.08).max(1e-12);
            let lo = if include_zero && lo >= 0.0 { lo } else { lo - pad };
            lo..hi + pad
        }
        Scale::Log10 => {
            let lo = lo.floor();
            let hi = hi.ceil().max(lo + 1.0);
            lo..hi
        }
    }
}

/// Label for tick `x` on an axis with categories centred at `i + 0.5`
pub(crate) fn category_label(categories: &[String], x: f64) -> String {
    let shifted = x - 0.5;
    let idx = shifted.round();
    if (shifted - idx).abs() > 1e-6 || idx < 0.0 {
        return String::new();
    }
    categories.get(idx as usize).cloned().unwrap_or_default()
}

/// Tick count that puts a tick on every category centre
pub(crate) fn category_tick_count(categories: usize) -> usize {
    categories * 2 + 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_color() {
        assert_eq!(parse_hex_color("#9b59b6").unwrap(), RGBColor(0x9b, 0x59, 0xb6));
        assert_eq!(parse_hex_color("e67e22").unwrap(), RGBColor(0xe6, 0x7e, 0x22));
        assert!(parse_hex_color("#12345").is_err());
        assert!(parse_hex_color("#zzzzzz").is_err());
    }

    #[test]
    fn test_log_projection_and_ticks() {
        assert_eq!(Scale::Log10.project(100.0), Some(2.0));
        assert_eq!(Scale::Log10.project(0.0), None);
        assert_eq!(Scale::Log10.format_tick(-3.0), "10^-3");
        assert_eq!(Scale::Log10.format_tick(0.5), "");
        assert_eq!(Scale::Linear.format_tick(0.25), "0.25");
        assert_eq!(Scale::Linear.format_tick(2.0), "2");
    }

    #[test]
    fn test_value_range_log_snaps_to_decades() {
        let s = Series::new(
            "QEM",
            vec![Some(Estimate::symmetric(0.05, 0.01)), Some(Estimate::symmetric(3.0, 1.0))],
        );
        let r = value_range([&s], Scale::Log10, true);
        assert_eq!(r, -2.0..1.0);
    }

    #[test]
    fn test_value_range_linear_includes_zero() {
        let s = Series::new("a", vec![Some(Estimate::symmetric(5.0, 1.0)), None]);
        let r = value_range([&s], Scale::Linear, true);
        assert_eq!(r.start, 0.0);
        assert!(r.end > 6.0);
    }

    #[test]
    fn test_category_labels() {
        let cats = vec!["clean_cad".to_string(), "organic_scanned".to_string()];
        assert_eq!(category_label(&cats, 0.5), "clean_cad");
        assert_eq!(category_label(&cats, 1.5), "organic_scanned");
        assert_eq!(category_label(&cats, 1.0), "");
        assert_eq!(category_label(&cats, 2.5), "");
        assert_eq!(category_tick_count(2), 5);
    }

    #[test]
    fn test_symmetric_nan_has_no_bar() {
        let e = Estimate::symmetric(1.0, f64::NAN);
        assert!(!e.has_error_bar());
    }
}
