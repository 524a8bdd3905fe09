//! The derived-plot dependency graph.
//!
//! An edge maps (source plot, source curve, derived kind) to the derived
//! window it spawned. The central invariant is bidirectional: an edge
//! exists **iff** its derived window is currently open. The engine keeps
//! the two in lockstep — the graph itself only enforces the
//! at-most-one-derived-window-per-(source, kind) rule.
//!
//! Each edge carries the generation of its latest background dispatch.
//! Generations come from one engine-wide monotonic counter, so an edge
//! re-created after a disable never repeats a value its predecessor
//! handed to the worker; results tagged with a stale generation (or an
//! edge that no longer exists) are discarded.

use crate::error::{PlotLinkError, Result};
use crate::transforms::TransformParams;
use crate::types::{CurveId, DerivedKind, PlotRef};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

/// Key identifying one edge: a source window has at most one derived
/// window per kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EdgeKey {
    pub source_plot: PlotRef,
    pub kind: DerivedKind,
}

/// One live dependency edge.
#[derive(Debug, Clone)]
pub struct TransformEdge {
    pub source_plot: PlotRef,
    pub source_curve: CurveId,
    pub kind: DerivedKind,
    pub derived: PlotRef,
    pub params: TransformParams,
    /// Generation of the latest background dispatch, taken from the
    /// engine-wide counter; stale results are dropped.
    pub generation: u64,
    /// Cancellation token shared with a pending worker job.
    pub cancel: Arc<AtomicBool>,
}

impl TransformEdge {
    pub fn new(
        source_plot: PlotRef,
        source_curve: CurveId,
        kind: DerivedKind,
        derived: PlotRef,
        params: TransformParams,
    ) -> Self {
        Self {
            source_plot,
            source_curve,
            kind,
            derived,
            params,
            generation: 0,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn key(&self) -> EdgeKey {
        EdgeKey {
            source_plot: self.source_plot.clone(),
            kind: self.kind,
        }
    }
}

/// Edge set, iterated in insertion order.
#[derive(Default)]
pub struct DependencyGraph {
    edges: Vec<TransformEdge>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an edge. Fails with `DuplicateTransform` if the (source,
    /// kind) pair already has a derived window — a contract violation the
    /// UI layer is expected to prevent.
    pub fn insert(&mut self, edge: TransformEdge) -> Result<()> {
        if self.get(&edge.source_plot, edge.kind).is_some() {
            tracing::error!(
                "transform '{}' already enabled for plot '{}'",
                edge.kind,
                edge.source_plot
            );
            return Err(PlotLinkError::DuplicateTransform(format!(
                "'{}' is already enabled for plot '{}'",
                edge.kind, edge.source_plot
            )));
        }
        tracing::debug!(
            "edge: '{}'/'{}' --{}--> '{}'",
            edge.source_plot,
            edge.source_curve,
            edge.kind,
            edge.derived
        );
        self.edges.push(edge);
        Ok(())
    }

    pub fn get(&self, source_plot: &PlotRef, kind: DerivedKind) -> Option<&TransformEdge> {
        self.edges
            .iter()
            .find(|e| &e.source_plot == source_plot && e.kind == kind)
    }

    pub fn get_mut(&mut self, source_plot: &PlotRef, kind: DerivedKind) -> Option<&mut TransformEdge> {
        self.edges
            .iter_mut()
            .find(|e| &e.source_plot == source_plot && e.kind == kind)
    }

    /// Remove and return the edge for (source, kind), if present.
    pub fn remove(&mut self, source_plot: &PlotRef, kind: DerivedKind) -> Option<TransformEdge> {
        let pos = self
            .edges
            .iter()
            .position(|e| &e.source_plot == source_plot && e.kind == kind)?;
        Some(self.edges.remove(pos))
    }

    /// Remove and return the edge pointing at a derived window, if present.
    pub fn remove_by_derived(&mut self, derived: &PlotRef) -> Option<TransformEdge> {
        let pos = self.edges.iter().position(|e| &e.derived == derived)?;
        Some(self.edges.remove(pos))
    }

    /// The edge whose derived window is `derived`, if any.
    pub fn edge_for_derived(&self, derived: &PlotRef) -> Option<&TransformEdge> {
        self.edges.iter().find(|e| &e.derived == derived)
    }

    /// Edges sourced from a plot, in insertion order.
    pub fn outgoing(&self, source_plot: &PlotRef) -> Vec<&TransformEdge> {
        self.edges
            .iter()
            .filter(|e| &e.source_plot == source_plot)
            .collect()
    }

    /// True if any edge references `plot` as source or derived window.
    pub fn references(&self, plot: &PlotRef) -> bool {
        self.edges
            .iter()
            .any(|e| &e.source_plot == plot || &e.derived == plot)
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
}
