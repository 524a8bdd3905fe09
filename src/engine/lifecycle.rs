//! The cascading close path.
//!
//! Closing any window tears down its whole dependent subtree exactly
//! once:
//!
//! 1. every window reachable via outgoing dependency edges closes
//!    recursively (derived windows may own further selections, transforms
//!    and slices — recursion, not a fixed depth);
//! 2. a slice-group window detaches its markers from the owning 2D
//!    window;
//! 3. a derived window closed directly (not via cascade) removes its
//!    incoming edge and resets the originating UI control;
//! 4. selection, field, curves and the registry record are dropped.
//!
//! A `closing` set guards against double-close and cycles: re-entering
//! the path for a window already being closed is a silent no-op.

use super::Engine;
use crate::error::{PlotLinkError, Result};
use crate::events::CoreEvent;
use crate::types::{DerivedKind, PlotRef};
use std::sync::atomic::Ordering;

impl Engine {
    /// Close a window and its whole dependent subtree.
    pub fn close_window(&mut self, plot: &PlotRef) -> Result<()> {
        if !self.registry.contains(plot) {
            return Err(PlotLinkError::UnknownReference(format!(
                "plot '{plot}' is not open"
            )));
        }
        self.close_inner(plot)
    }

    pub(crate) fn close_inner(&mut self, plot: &PlotRef) -> Result<()> {
        if !self.closing.insert(plot.clone()) {
            tracing::debug!("'{plot}' is already closing, skipping");
            return Ok(());
        }
        let result = self.close_steps(plot);
        self.closing.remove(plot);
        result
    }

    fn close_steps(&mut self, plot: &PlotRef) -> Result<()> {
        // 1. Cascade over outgoing edges. Each edge is removed before its
        // derived window closes so the child never sees itself as
        // "directly closed".
        let outgoing: Vec<PlotRef> = self
            .graph
            .outgoing(plot)
            .into_iter()
            .map(|e| e.derived.clone())
            .collect();
        for derived in outgoing {
            if let Some(edge) = self.graph.remove_by_derived(&derived) {
                edge.cancel.store(true, Ordering::Relaxed);
                self.pending.remove(plot);
                self.events.publish(CoreEvent::TransformDisabled {
                    plot: plot.clone(),
                    kind: edge.kind,
                    derived: derived.clone(),
                });
            }
            if self.registry.contains(&derived) {
                self.close_inner(&derived)?;
            }
        }

        // 2. A slice-group window detaches its markers from the owning 2D
        // window before it disappears.
        let group_key = self
            .slice_groups
            .iter()
            .find(|(_, g)| &g.derived == plot)
            .map(|(k, _)| k.clone());
        if let Some(key) = group_key {
            let group = self.slice_groups.remove(&key).expect("key found above");
            let (source, _) = key;
            if !group.markers.is_empty() {
                self.events.publish(CoreEvent::MarkersDetached {
                    plot: source,
                    markers: group.markers.iter().map(|m| m.id.0).collect(),
                });
            }
        }

        // 3. A derived window closed directly still has its incoming edge;
        // remove it and reset the originating control. Via the cascade the
        // edge is already gone, so this never re-enters the parent.
        if let Some(edge) = self.graph.remove_by_derived(plot) {
            edge.cancel.store(true, Ordering::Relaxed);
            if matches!(edge.kind, DerivedKind::Transform(k) if self.transforms.is_background(k)) {
                self.pending.remove(&edge.source_plot);
            }
            self.events.publish(CoreEvent::TransformDisabled {
                plot: edge.source_plot.clone(),
                kind: edge.kind,
                derived: plot.clone(),
            });
            // Slice windows have no enable toggle; markers were already
            // detached above.
            if matches!(edge.kind, DerivedKind::Transform(_)) {
                self.events.publish(CoreEvent::ControlReset {
                    plot: edge.source_plot.clone(),
                    kind: edge.kind,
                });
            }
        }

        // 4. Selection, field, curves, registry record.
        if self.selections.clear(plot).is_some() {
            self.events
                .publish(CoreEvent::SelectionCleared { plot: plot.clone() });
        }
        self.fields.remove(plot);
        let curves = self.store.remove_window(plot);
        self.registry.close(plot)?;
        self.events.publish(CoreEvent::WindowClosed {
            plot: plot.clone(),
            curves,
        });
        Ok(())
    }
}
