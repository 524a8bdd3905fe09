//! Plot window registry.
//!
//! Owns one record per open plot window, keyed by its unique reference.
//! Enforces reference uniqueness and the reserved-suffix rule for
//! user-chosen (primary) references.

use crate::error::{PlotLinkError, Result};
use crate::types::{CurveId, DerivedKind, PlotRef};
use std::collections::HashMap;

/// How a plot window came to exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlotKind {
    /// Opened directly by the user / data source.
    Primary,
    /// Spawned by enabling a transform on a source curve's selection.
    TransformDerived,
    /// Shared window of a 2D slice group.
    SliceDerived,
}

/// Originating edge data carried by derived windows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowOrigin {
    pub source_plot: PlotRef,
    pub source_curve: CurveId,
    pub kind: DerivedKind,
}

/// One open plot window.
#[derive(Debug, Clone)]
pub struct PlotWindow {
    pub plot: PlotRef,
    pub kind: PlotKind,
    /// Present iff the window is derived.
    pub origin: Option<WindowOrigin>,
}

#[derive(Default)]
pub struct PlotWindowRegistry {
    windows: HashMap<PlotRef, PlotWindow>,
}

impl PlotWindowRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an open window. Primary references ending in a reserved
    /// derived-name suffix are rejected so they can never collide with a
    /// derived window spawned later.
    pub fn open(&mut self, plot: PlotRef, kind: PlotKind, origin: Option<WindowOrigin>) -> Result<()> {
        if self.windows.contains_key(&plot) {
            return Err(PlotLinkError::DuplicateReference(format!(
                "plot '{plot}' is already open"
            )));
        }
        if kind == PlotKind::Primary {
            if let Some(suffix) = plot.reserved_suffix() {
                return Err(PlotLinkError::DuplicateReference(format!(
                    "plot '{plot}' ends with reserved suffix '{suffix}'"
                )));
            }
        }
        debug_assert_eq!(origin.is_some(), kind != PlotKind::Primary);
        tracing::info!("opened plot window '{}' ({:?})", plot, kind);
        self.windows.insert(plot.clone(), PlotWindow { plot, kind, origin });
        Ok(())
    }

    /// Unregister a window and return its record.
    pub fn close(&mut self, plot: &PlotRef) -> Result<PlotWindow> {
        let win = self.windows.remove(plot).ok_or_else(|| {
            PlotLinkError::UnknownReference(format!("plot '{plot}' is not open"))
        })?;
        tracing::info!("closed plot window '{}'", plot);
        Ok(win)
    }

    pub fn get(&self, plot: &PlotRef) -> Option<&PlotWindow> {
        self.windows.get(plot)
    }

    pub fn contains(&self, plot: &PlotRef) -> bool {
        self.windows.contains_key(plot)
    }

    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    /// References of all open windows (unordered).
    pub fn refs(&self) -> impl Iterator<Item = &PlotRef> {
        self.windows.keys()
    }
}
