//! Curve records and the shape invariant.
//!
//! A curve is created on first data add, mutated in place on refresh
//! (identity, color and legend preserved unless explicitly overridden),
//! and destroyed on removal or window close.
//!
//! The shape invariant holds at all times: `len(x) == len(y)`, except for
//! histogram curves where `len(x) == len(y) + 1` (x holds bin edges).

use crate::error::{PlotLinkError, Result};
use crate::types::{CurveId, PlotRef};

/// Metadata supplied when a curve is created.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CurveMeta {
    /// Axis label of the plotted quantity.
    pub label: String,
    /// Physical unit of the plotted quantity.
    pub unit: String,
    /// Legend text; `None` hides the curve from the legend.
    pub legend: Option<String>,
    /// Bin-edge convention: x has one more element than y.
    pub histogram: bool,
}

impl CurveMeta {
    pub fn new(label: impl Into<String>, unit: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            unit: unit.into(),
            legend: None,
            histogram: false,
        }
    }

    pub fn with_legend(mut self, legend: impl Into<String>) -> Self {
        self.legend = Some(legend.into());
        self
    }

    pub fn histogram(mut self) -> Self {
        self.histogram = true;
        self
    }
}

/// One displayed curve within a plot window.
#[derive(Debug, Clone)]
pub struct Curve {
    /// Unique within the owning window.
    pub id: CurveId,
    /// The owning plot window.
    pub plot: PlotRef,
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub meta: CurveMeta,
    /// Index into the application palette; stable across refreshes.
    pub color_index: usize,
    pub hidden: bool,
}

impl Curve {
    pub fn new(
        plot: PlotRef,
        id: CurveId,
        x: Vec<f64>,
        y: Vec<f64>,
        meta: CurveMeta,
        color_index: usize,
    ) -> Result<Self> {
        validate_shape(&x, &y, meta.histogram)?;
        Ok(Self {
            id,
            plot,
            x,
            y,
            meta,
            color_index,
            hidden: false,
        })
    }

    /// Replace the data in place, preserving identity, color and legend.
    pub fn set_data(&mut self, x: Vec<f64>, y: Vec<f64>) -> Result<()> {
        validate_shape(&x, &y, self.meta.histogram)?;
        self.x = x;
        self.y = y;
        Ok(())
    }

    /// Number of samples (y length).
    pub fn len(&self) -> usize {
        self.y.len()
    }

    pub fn is_empty(&self) -> bool {
        self.y.is_empty()
    }

    /// The x positions used for nearest-index lookups: the x array itself,
    /// or bin centers for histogram curves (edges collapsed pairwise).
    pub fn sample_positions(&self) -> Vec<f64> {
        if self.meta.histogram {
            self.x.windows(2).map(|w| 0.5 * (w[0] + w[1])).collect()
        } else {
            self.x.clone()
        }
    }
}

/// Check the shape invariant for a candidate (x, y) pair.
pub fn validate_shape(x: &[f64], y: &[f64], histogram: bool) -> Result<()> {
    let expected = if histogram { y.len() + 1 } else { y.len() };
    // An empty histogram curve has no edges either.
    if histogram && x.is_empty() && y.is_empty() {
        return Ok(());
    }
    if x.len() != expected {
        return Err(PlotLinkError::DataShape(format!(
            "len(x)={} does not match len(y)={}{}",
            x.len(),
            y.len(),
            if histogram { " (histogram, expected len(y)+1 edges)" } else { "" }
        )));
    }
    Ok(())
}
