//! User-movable data-range selections.
//!
//! At most one selection is active per plot window. A selection owns one
//! curve of that window and two boundary positions (a, b); the index
//! bounds come from nearest-index search on the curve's x array and are
//! independent of whether a < b or a > b. Histogram x is collapsed to
//! bin centers before bounding.
//!
//! The cached (x, y) slice is what transforms read — never raw curve
//! data and never another transform's output.

use crate::curve::Curve;
use crate::error::{PlotLinkError, Result};
use crate::types::{CurveId, PlotRef};
use std::collections::HashMap;

/// The active sub-range of one curve.
#[derive(Debug, Clone)]
pub struct Selection {
    /// The owning curve.
    pub curve: CurveId,
    /// Boundary positions as set by the user (order-independent).
    pub a: f64,
    pub b: f64,
    /// Resolved index bounds (inclusive), `lo <= hi`.
    pub lo: usize,
    pub hi: usize,
    /// Cached selected data.
    pub x: Vec<f64>,
    pub y: Vec<f64>,
}

impl Selection {
    /// Resolve boundaries against a curve and cache the selected slice.
    pub fn compute(curve: &Curve, a: f64, b: f64) -> Result<Selection> {
        let positions = curve.sample_positions();
        if positions.is_empty() {
            return Err(PlotLinkError::DataShape(format!(
                "curve '{}' has no data to select",
                curve.id
            )));
        }
        let ia = nearest_index(&positions, a);
        let ib = nearest_index(&positions, b);
        let (lo, hi) = if ia <= ib { (ia, ib) } else { (ib, ia) };
        Ok(Selection {
            curve: curve.id.clone(),
            a,
            b,
            lo,
            hi,
            x: positions[lo..=hi].to_vec(),
            y: curve.y[lo..=hi].to_vec(),
        })
    }

    /// Selection spanning the whole curve. Used when a transform is
    /// enabled before any explicit selection exists.
    pub fn full_range(curve: &Curve) -> Result<Selection> {
        let positions = curve.sample_positions();
        let (first, last) = match (positions.first(), positions.last()) {
            (Some(&f), Some(&l)) => (f, l),
            _ => {
                return Err(PlotLinkError::DataShape(format!(
                    "curve '{}' has no data to select",
                    curve.id
                )))
            }
        };
        Selection::compute(curve, first, last)
    }

    pub fn len(&self) -> usize {
        self.y.len()
    }

    pub fn is_empty(&self) -> bool {
        self.y.is_empty()
    }
}

/// Index of the sample nearest to `target` (first on ties).
pub fn nearest_index(xs: &[f64], target: f64) -> usize {
    let mut best = 0;
    let mut best_dist = f64::INFINITY;
    for (i, &x) in xs.iter().enumerate() {
        let d = (x - target).abs();
        if d < best_dist {
            best_dist = d;
            best = i;
        }
    }
    best
}

/// One selection per plot window.
#[derive(Default)]
pub struct SelectionController {
    selections: HashMap<PlotRef, Selection>,
}

impl SelectionController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a freshly computed selection, replacing any previous one.
    pub fn set(&mut self, plot: &PlotRef, selection: Selection) {
        tracing::debug!(
            "selection on '{}'/'{}' indices [{}, {}]",
            plot,
            selection.curve,
            selection.lo,
            selection.hi
        );
        self.selections.insert(plot.clone(), selection);
    }

    pub fn get(&self, plot: &PlotRef) -> Option<&Selection> {
        self.selections.get(plot)
    }

    /// The selection of `plot` if it is owned by `curve`.
    pub fn owned_by(&self, plot: &PlotRef, curve: &CurveId) -> Option<&Selection> {
        self.selections.get(plot).filter(|s| &s.curve == curve)
    }

    pub fn clear(&mut self, plot: &PlotRef) -> Option<Selection> {
        self.selections.remove(plot)
    }

    /// Recompute the selection of `plot` against refreshed curve data,
    /// keeping the stored (a, b) boundaries. No-op if the refreshed curve
    /// does not own the selection.
    pub fn recompute(&mut self, plot: &PlotRef, curve: &Curve) -> Option<Result<&Selection>> {
        let stored = self.selections.get(plot)?;
        if stored.curve != curve.id {
            return None;
        }
        let (a, b) = (stored.a, stored.b);
        match Selection::compute(curve, a, b) {
            Ok(sel) => {
                self.selections.insert(plot.clone(), sel);
                self.selections.get(plot).map(Ok)
            }
            Err(e) => Some(Err(e)),
        }
    }
}
