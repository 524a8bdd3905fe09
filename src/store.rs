//! Curve storage per plot window.
//!
//! The store owns every curve record, keyed by owning window. Curves
//! within a window keep insertion order, which makes iteration (and
//! therefore event emission) deterministic.
//!
//! Color assignment: a new curve gets the smallest non-negative integer
//! not already used as a color index in its window, taken modulo the
//! configured palette size.

use crate::curve::{Curve, CurveMeta};
use crate::error::{PlotLinkError, Result};
use crate::types::{CurveId, PlotRef};
use std::collections::HashMap;

pub struct CurveStore {
    windows: HashMap<PlotRef, Vec<Curve>>,
    palette_size: usize,
}

impl CurveStore {
    pub fn new(palette_size: usize) -> Self {
        Self {
            windows: HashMap::new(),
            palette_size: palette_size.max(1),
        }
    }

    /// Create the (empty) curve list for a newly opened window.
    pub fn ensure_window(&mut self, plot: &PlotRef) {
        self.windows.entry(plot.clone()).or_default();
    }

    /// Add a curve to a window. Fails with `DataShape` on a length
    /// mismatch and `DuplicateReference` if the id is already taken.
    pub fn add_curve(
        &mut self,
        plot: &PlotRef,
        id: CurveId,
        x: Vec<f64>,
        y: Vec<f64>,
        meta: CurveMeta,
    ) -> Result<&Curve> {
        let palette_size = self.palette_size;
        let curves = self
            .windows
            .get_mut(plot)
            .ok_or_else(|| PlotLinkError::UnknownReference(format!("plot '{plot}' is not open")))?;
        if curves.iter().any(|c| c.id == id) {
            return Err(PlotLinkError::DuplicateReference(format!(
                "curve '{id}' already exists in plot '{plot}'"
            )));
        }
        let color_index = next_color_index(curves, palette_size);
        let curve = Curve::new(plot.clone(), id, x, y, meta, color_index)?;
        tracing::debug!("added curve '{}' to '{}' (color {})", curve.id, plot, color_index);
        curves.push(curve);
        Ok(curves.last().unwrap())
    }

    /// Replace a curve's data (and optionally legend) in place, keeping
    /// identity and color. `UnknownReference` if window or curve is gone.
    pub fn update_curve(
        &mut self,
        plot: &PlotRef,
        id: &CurveId,
        x: Vec<f64>,
        y: Vec<f64>,
        legend: Option<String>,
    ) -> Result<()> {
        let curve = self.curve_mut(plot, id)?;
        curve.set_data(x, y)?;
        if let Some(legend) = legend {
            curve.meta.legend = Some(legend);
        }
        Ok(())
    }

    /// Remove a curve, returning the number of curves left in the window.
    pub fn remove_curve(&mut self, plot: &PlotRef, id: &CurveId) -> Result<usize> {
        let curves = self
            .windows
            .get_mut(plot)
            .ok_or_else(|| PlotLinkError::UnknownReference(format!("plot '{plot}' is not open")))?;
        let pos = curves.iter().position(|c| &c.id == id).ok_or_else(|| {
            PlotLinkError::UnknownReference(format!("curve '{id}' not found in plot '{plot}'"))
        })?;
        curves.remove(pos);
        tracing::debug!("removed curve '{}' from '{}'", id, plot);
        Ok(curves.len())
    }

    /// Drop a whole window's curves, returning their ids (close-time
    /// curve set handed to the lifecycle cascade).
    pub fn remove_window(&mut self, plot: &PlotRef) -> Vec<CurveId> {
        self.windows
            .remove(plot)
            .map(|curves| curves.into_iter().map(|c| c.id).collect())
            .unwrap_or_default()
    }

    pub fn curve(&self, plot: &PlotRef, id: &CurveId) -> Result<&Curve> {
        self.windows
            .get(plot)
            .and_then(|curves| curves.iter().find(|c| &c.id == id))
            .ok_or_else(|| {
                PlotLinkError::UnknownReference(format!("curve '{id}' not found in plot '{plot}'"))
            })
    }

    pub fn curve_mut(&mut self, plot: &PlotRef, id: &CurveId) -> Result<&mut Curve> {
        self.windows
            .get_mut(plot)
            .and_then(|curves| curves.iter_mut().find(|c| &c.id == id))
            .ok_or_else(|| {
                PlotLinkError::UnknownReference(format!("curve '{id}' not found in plot '{plot}'"))
            })
    }

    pub fn contains_curve(&self, plot: &PlotRef, id: &CurveId) -> bool {
        self.curve(plot, id).is_ok()
    }

    /// Curves of a window in insertion order (empty slice if unknown).
    pub fn curves(&self, plot: &PlotRef) -> &[Curve] {
        self.windows.get(plot).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Number of curves in a window, excluding selection overlays.
    pub fn data_curve_count(&self, plot: &PlotRef) -> usize {
        self.curves(plot)
            .iter()
            .filter(|c| !c.id.is_selection_overlay())
            .count()
    }
}

/// Smallest non-negative integer not used as a color index in `curves`,
/// modulo the palette size.
fn next_color_index(curves: &[Curve], palette_size: usize) -> usize {
    let used: Vec<usize> = curves.iter().map(|c| c.color_index).collect();
    let mut k = 0;
    while used.contains(&k) {
        k += 1;
    }
    k % palette_size
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with_window() -> (CurveStore, PlotRef) {
        let mut store = CurveStore::new(8);
        let plot = PlotRef::from("w1");
        store.ensure_window(&plot);
        (store, plot)
    }

    fn add(store: &mut CurveStore, plot: &PlotRef, id: &str) -> usize {
        store
            .add_curve(
                plot,
                CurveId::from(id),
                vec![0.0, 1.0],
                vec![1.0, 2.0],
                CurveMeta::new("V", "mV"),
            )
            .unwrap()
            .color_index
    }

    #[test]
    fn test_color_assignment_smallest_unused() {
        let (mut store, plot) = store_with_window();
        assert_eq!(add(&mut store, &plot, "a"), 0);
        assert_eq!(add(&mut store, &plot, "b"), 1);
        assert_eq!(add(&mut store, &plot, "c"), 2);

        // Freeing the middle color makes it the next assignment
        store.remove_curve(&plot, &CurveId::from("b")).unwrap();
        assert_eq!(add(&mut store, &plot, "d"), 1);
    }

    #[test]
    fn test_color_assignment_wraps_palette() {
        let mut store = CurveStore::new(2);
        let plot = PlotRef::from("w");
        store.ensure_window(&plot);
        assert_eq!(add(&mut store, &plot, "a"), 0);
        assert_eq!(add(&mut store, &plot, "b"), 1);
        // indices 0 and 1 taken -> smallest unused is 2 -> wraps to 0
        assert_eq!(add(&mut store, &plot, "c"), 0);
    }

    #[test]
    fn test_add_rejects_shape_mismatch() {
        let (mut store, plot) = store_with_window();
        let err = store
            .add_curve(
                &plot,
                CurveId::from("bad"),
                vec![0.0, 1.0, 2.0],
                vec![1.0],
                CurveMeta::new("V", "mV"),
            )
            .unwrap_err();
        assert!(matches!(err, PlotLinkError::DataShape(_)));
    }

    #[test]
    fn test_update_unknown_curve() {
        let (mut store, plot) = store_with_window();
        let err = store
            .update_curve(&plot, &CurveId::from("nope"), vec![], vec![], None)
            .unwrap_err();
        assert!(err.is_unknown_reference());
    }

    #[test]
    fn test_update_preserves_color_and_legend() {
        let (mut store, plot) = store_with_window();
        add(&mut store, &plot, "a");
        add(&mut store, &plot, "b");
        store
            .update_curve(&plot, &CurveId::from("b"), vec![5.0], vec![6.0], None)
            .unwrap();
        let b = store.curve(&plot, &CurveId::from("b")).unwrap();
        assert_eq!(b.color_index, 1);
        assert_eq!(b.y, vec![6.0]);
    }

    #[test]
    fn test_remove_window_returns_curve_ids() {
        let (mut store, plot) = store_with_window();
        add(&mut store, &plot, "a");
        add(&mut store, &plot, "b");
        let ids = store.remove_window(&plot);
        assert_eq!(ids, vec![CurveId::from("a"), CurveId::from("b")]);
        assert!(store.curves(&plot).is_empty());
    }
}
