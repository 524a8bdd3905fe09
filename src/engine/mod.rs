//! The engine: single owner of the graph, stores and controllers.
//!
//! All operations execute to completion on the caller's thread (the
//! application event loop); the only other thread is the background
//! transform worker, which communicates exclusively through channels.
//! Collaborators call in (data source, UI controls) and drain the event
//! bus afterwards (renderer).
//!
//! Submodules split the engine by concern:
//! - [`propagate`] — refresh ordering and worker-result application,
//! - [`lifecycle`] — the cascading close path.

mod lifecycle;
mod propagate;

use crate::config::EngineConfig;
use crate::curve::{Curve, CurveMeta};
use crate::error::{PlotLinkError, Result};
use crate::events::{CoreEvent, EventBus, Severity};
use crate::graph::{DependencyGraph, EdgeKey, TransformEdge};
use crate::registry::{PlotKind, PlotWindowRegistry, WindowOrigin};
use crate::selection::{Selection, SelectionController};
use crate::slices::{Field2d, MarkerId, MarkerSpec, SliceGroup, SliceMarker};
use crate::store::CurveStore;
use crate::transforms::{ParamValue, TransformParams, TransformRegistry};
use crate::types::{CurveId, DerivedKind, PlotRef, SliceOrientation, TransformKind};
use crate::worker::{TransformJob, TransformWorker};
use crossbeam_channel::Receiver;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::Ordering;

/// The derived-plot dependency engine.
pub struct Engine {
    config: EngineConfig,
    store: CurveStore,
    registry: PlotWindowRegistry,
    selections: SelectionController,
    transforms: TransformRegistry,
    graph: DependencyGraph,
    /// 2D fields hosted by primary windows.
    fields: HashMap<PlotRef, Field2d>,
    /// Shared slice windows per (2D window, orientation).
    slice_groups: HashMap<(PlotRef, SliceOrientation), SliceGroup>,
    next_marker: u32,
    /// Monotonic source of background-job generations. Never reset, so a
    /// re-created edge can never collide with a result of its predecessor.
    generations: u64,
    events: EventBus,
    /// Lazily spawned background worker.
    worker: Option<TransformWorker>,
    /// Source plots with an outstanding background computation — the
    /// re-entrancy guard for live refresh ticks.
    pending: HashSet<PlotRef>,
    /// Windows currently inside the close cascade (double-close guard).
    closing: HashSet<PlotRef>,
}

impl Engine {
    /// Engine with the built-in transform set.
    pub fn new(config: EngineConfig) -> Self {
        Self::with_transforms(config, TransformRegistry::with_builtins())
    }

    /// Engine with a caller-supplied transform registry.
    pub fn with_transforms(config: EngineConfig, transforms: TransformRegistry) -> Self {
        let palette_size = config.palette_size;
        Self {
            config,
            store: CurveStore::new(palette_size),
            registry: PlotWindowRegistry::new(),
            selections: SelectionController::new(),
            transforms,
            graph: DependencyGraph::new(),
            fields: HashMap::new(),
            slice_groups: HashMap::new(),
            next_marker: 0,
            generations: 0,
            events: EventBus::new(),
            worker: None,
            pending: HashSet::new(),
            closing: HashSet::new(),
        }
    }

    // ── Windows ──

    /// Open a primary 1D plot window.
    pub fn open_window(&mut self, plot: PlotRef) -> Result<()> {
        self.registry.open(plot.clone(), PlotKind::Primary, None)?;
        self.store.ensure_window(&plot);
        self.events.publish(CoreEvent::WindowOpened { plot });
        Ok(())
    }

    /// Open a primary window hosting a 2D field.
    pub fn open_field_window(&mut self, plot: PlotRef, field: Field2d) -> Result<()> {
        self.registry.open(plot.clone(), PlotKind::Primary, None)?;
        self.store.ensure_window(&plot);
        self.fields.insert(plot.clone(), field);
        self.events.publish(CoreEvent::WindowOpened { plot });
        Ok(())
    }

    pub fn has_window(&self, plot: &PlotRef) -> bool {
        self.registry.contains(plot)
    }

    pub fn window_count(&self) -> usize {
        self.registry.len()
    }

    // ── Curves ──

    /// Add a curve supplied by the data source.
    pub fn add_curve(
        &mut self,
        plot: &PlotRef,
        id: CurveId,
        x: Vec<f64>,
        y: Vec<f64>,
        meta: CurveMeta,
    ) -> Result<()> {
        if id.is_selection_overlay() {
            return Err(PlotLinkError::DuplicateReference(format!(
                "curve id '{id}' uses the reserved '-selection' suffix"
            )));
        }
        self.store.add_curve(plot, id.clone(), x, y, meta)?;
        self.events.publish(CoreEvent::CurveAdded {
            plot: plot.clone(),
            curve: id,
        });
        Ok(())
    }

    /// Remove a curve. Derived windows sourced from it close; removing
    /// the last curve of a window closes the window itself.
    pub fn remove_curve(&mut self, plot: &PlotRef, id: &CurveId) -> Result<()> {
        if id.is_selection_overlay() {
            return Err(PlotLinkError::UnknownReference(format!(
                "'{id}' is a selection overlay; it lives and dies with the selection"
            )));
        }
        // The owning selection (and its overlay curve) goes first.
        if self
            .selections
            .get(plot)
            .map(|s| &s.curve == id)
            .unwrap_or(false)
        {
            self.clear_selection(plot)?;
        }

        // Derived windows fed by this curve lose their source.
        let kinds: Vec<DerivedKind> = self
            .graph
            .outgoing(plot)
            .into_iter()
            .filter(|e| &e.source_curve == id)
            .map(|e| e.kind)
            .collect();
        for kind in kinds {
            self.disable_edge(plot, kind)?;
        }

        let remaining = self.store.remove_curve(plot, id)?;
        self.events.publish(CoreEvent::CurveRemoved {
            plot: plot.clone(),
            curve: id.clone(),
        });

        // Drop the marker link if this was a slice-group curve.
        for group in self.slice_groups.values_mut() {
            if &group.derived == plot {
                group.markers.retain(|m| &m.curve != id);
            }
        }

        if remaining == 0 && self.registry.contains(plot) {
            self.close_window(plot)?;
        }
        Ok(())
    }

    pub fn curve(&self, plot: &PlotRef, id: &CurveId) -> Result<&Curve> {
        self.store.curve(plot, id)
    }

    pub fn curves(&self, plot: &PlotRef) -> &[Curve] {
        self.store.curves(plot)
    }

    // ── Selection ──

    /// Place the window's selection on a curve. Selecting a different
    /// curve than before clears the previous selection and everything
    /// derived from it first.
    pub fn set_selection(&mut self, plot: &PlotRef, curve_id: &CurveId, a: f64, b: f64) -> Result<()> {
        if curve_id.is_selection_overlay() {
            return Err(PlotLinkError::UnknownReference(format!(
                "'{curve_id}' is a selection overlay, not a selectable curve"
            )));
        }
        if let Some(previous) = self.selections.get(plot).map(|s| s.curve.clone()) {
            if &previous != curve_id {
                let kinds: Vec<DerivedKind> = self
                    .graph
                    .outgoing(plot)
                    .into_iter()
                    .filter(|e| e.source_curve == previous)
                    .map(|e| e.kind)
                    .collect();
                for kind in kinds {
                    self.disable_edge(plot, kind)?;
                }
                self.clear_selection(plot)?;
            }
        }

        let curve = self.store.curve(plot, curve_id)?;
        let selection = Selection::compute(curve, a, b)?;
        let overlay_meta = CurveMeta::new(curve.meta.label.clone(), curve.meta.unit.clone());

        let overlay = curve_id.selection_overlay();
        if self.store.contains_curve(plot, &overlay) {
            self.store.update_curve(
                plot,
                &overlay,
                selection.x.clone(),
                selection.y.clone(),
                None,
            )?;
            self.events.publish(CoreEvent::CurveUpdated {
                plot: plot.clone(),
                curve: overlay,
            });
        } else {
            self.store.add_curve(
                plot,
                overlay.clone(),
                selection.x.clone(),
                selection.y.clone(),
                overlay_meta,
            )?;
            self.events.publish(CoreEvent::CurveAdded {
                plot: plot.clone(),
                curve: overlay,
            });
        }

        self.selections.set(plot, selection);
        self.events.publish(CoreEvent::SelectionSet {
            plot: plot.clone(),
            curve: curve_id.clone(),
        });

        // Enabled transforms follow the selection immediately.
        self.recompute_transforms(plot, curve_id)
    }

    /// Drop the window's selection and its overlay curve, if any.
    pub fn clear_selection(&mut self, plot: &PlotRef) -> Result<()> {
        if let Some(selection) = self.selections.clear(plot) {
            let overlay = selection.curve.selection_overlay();
            if self.store.contains_curve(plot, &overlay) {
                self.store.remove_curve(plot, &overlay)?;
                self.events.publish(CoreEvent::CurveRemoved {
                    plot: plot.clone(),
                    curve: overlay,
                });
            }
            self.events.publish(CoreEvent::SelectionCleared { plot: plot.clone() });
        }
        Ok(())
    }

    pub fn selection(&self, plot: &PlotRef) -> Option<&Selection> {
        self.selections.get(plot)
    }

    // ── Transforms ──

    /// Enable a transform on a source curve: compute once, open the
    /// derived window + curve, record the edge. Background transforms
    /// open a pending (empty) derived curve and dispatch to the worker.
    pub fn enable_transform(
        &mut self,
        plot: &PlotRef,
        curve_id: &CurveId,
        kind: TransformKind,
        params: TransformParams,
    ) -> Result<PlotRef> {
        let dkind = DerivedKind::Transform(kind);
        if self.graph.get(plot, dkind).is_some() {
            tracing::error!("transform '{kind}' already enabled for plot '{plot}'");
            return Err(PlotLinkError::DuplicateTransform(format!(
                "'{kind}' is already enabled for plot '{plot}'"
            )));
        }
        let function = self.transforms.function(kind)?;
        let params = if kind == TransformKind::Histogram && !params.contains("bins") {
            params.set("bins", ParamValue::Int(self.config.histogram_bins as i64))
        } else {
            params
        };
        let source = self.store.curve(plot, curve_id)?;
        let source_meta = CurveMeta::new(source.meta.label.clone(), source.meta.unit.clone());
        let selection = self.selection_for(plot, curve_id)?;

        let derived = plot.derived(dkind);
        let derived_curve = curve_id.derived(dkind);
        let background = self.transforms.is_background(kind) && self.config.background_fit;

        let origin = WindowOrigin {
            source_plot: plot.clone(),
            source_curve: curve_id.clone(),
            kind: dkind,
        };

        if background {
            self.registry
                .open(derived.clone(), PlotKind::TransformDerived, Some(origin))?;
            self.store.ensure_window(&derived);
            self.store.add_curve(
                &derived,
                derived_curve.clone(),
                Vec::new(),
                Vec::new(),
                source_meta.with_legend(format!("{kind} (pending)")),
            )?;
            let generation = self.next_generation();
            let mut edge = TransformEdge::new(
                plot.clone(),
                curve_id.clone(),
                dkind,
                derived.clone(),
                params.clone(),
            );
            edge.generation = generation;
            let cancel = edge.cancel.clone();
            self.graph.insert(edge)?;
            let job = TransformJob {
                key: EdgeKey {
                    source_plot: plot.clone(),
                    kind: dkind,
                },
                derived: derived.clone(),
                derived_curve: derived_curve.clone(),
                generation,
                selection,
                params,
                function,
                cancel,
            };
            self.worker().submit(job);
            self.pending.insert(plot.clone());
        } else {
            let output = function(&selection, &params).map_err(|e| {
                self.events
                    .status(Severity::Error, format!("transform '{kind}' failed: {e}"));
                e
            })?;
            self.registry
                .open(derived.clone(), PlotKind::TransformDerived, Some(origin))?;
            self.store.ensure_window(&derived);
            let mut meta = source_meta.with_legend(output.legend.clone());
            meta.histogram = output.histogram;
            if let Err(e) =
                self.store
                    .add_curve(&derived, derived_curve.clone(), output.x, output.y, meta)
            {
                // Roll the half-opened window back so the edge-iff-window
                // invariant holds even on this path.
                let _ = self.store.remove_window(&derived);
                let _ = self.registry.close(&derived);
                return Err(e);
            }
            self.graph.insert(TransformEdge::new(
                plot.clone(),
                curve_id.clone(),
                dkind,
                derived.clone(),
                params,
            ))?;
        }

        self.events.publish(CoreEvent::WindowOpened {
            plot: derived.clone(),
        });
        self.events.publish(CoreEvent::CurveAdded {
            plot: derived.clone(),
            curve: derived_curve,
        });
        self.events.publish(CoreEvent::TransformEnabled {
            plot: plot.clone(),
            kind: dkind,
            derived: derived.clone(),
        });
        Ok(derived)
    }

    /// Disable a transform: close the derived window, remove the edge.
    /// Idempotent no-op when the transform is not enabled.
    pub fn disable_transform(&mut self, plot: &PlotRef, kind: TransformKind) -> Result<()> {
        self.disable_edge(plot, DerivedKind::Transform(kind))
    }

    /// Shared teardown for transform and slice edges.
    pub(crate) fn disable_edge(&mut self, plot: &PlotRef, kind: DerivedKind) -> Result<()> {
        let Some(edge) = self.graph.remove(plot, kind) else {
            return Ok(());
        };
        edge.cancel.store(true, Ordering::Relaxed);
        // Only a background edge can own the outstanding computation;
        // disabling an inline sibling must not lift the refresh guard.
        if matches!(kind, DerivedKind::Transform(k) if self.transforms.is_background(k)) {
            self.pending.remove(plot);
        }
        self.events.publish(CoreEvent::TransformDisabled {
            plot: plot.clone(),
            kind,
            derived: edge.derived.clone(),
        });
        if self.registry.contains(&edge.derived) {
            self.close_inner(&edge.derived)?;
        }
        Ok(())
    }

    /// The edge for (source plot, kind), if the transform is enabled.
    pub fn edge(&self, plot: &PlotRef, kind: DerivedKind) -> Option<&TransformEdge> {
        self.graph.get(plot, kind)
    }

    pub fn edge_count(&self) -> usize {
        self.graph.len()
    }

    // ── Slices ──

    /// Place a marker on a 2D window. The first marker of an orientation
    /// opens the shared derived window; later ones add curves to it.
    pub fn add_slice_marker(&mut self, plot: &PlotRef, spec: MarkerSpec) -> Result<MarkerId> {
        let field = self
            .fields
            .get(plot)
            .ok_or_else(|| {
                PlotLinkError::UnknownReference(format!("plot '{plot}' has no 2D field"))
            })?
            .clone();
        let orientation = spec.orientation();
        let dkind = DerivedKind::Slice(orientation);
        let derived = plot.derived(dkind);
        let (x, y, legend) = spec.compute(&field);

        let key = (plot.clone(), orientation);
        if !self.slice_groups.contains_key(&key) {
            self.registry.open(
                derived.clone(),
                PlotKind::SliceDerived,
                Some(WindowOrigin {
                    source_plot: plot.clone(),
                    source_curve: field.id.clone(),
                    kind: dkind,
                }),
            )?;
            self.store.ensure_window(&derived);
            self.graph.insert(TransformEdge::new(
                plot.clone(),
                field.id.clone(),
                dkind,
                derived.clone(),
                TransformParams::new(),
            ))?;
            self.slice_groups.insert(
                key.clone(),
                SliceGroup {
                    orientation,
                    derived: derived.clone(),
                    markers: Vec::new(),
                },
            );
            self.events.publish(CoreEvent::WindowOpened {
                plot: derived.clone(),
            });
            self.events.publish(CoreEvent::TransformEnabled {
                plot: plot.clone(),
                kind: dkind,
                derived: derived.clone(),
            });
        }

        let id = MarkerId(self.next_marker);
        self.next_marker += 1;
        let curve = CurveId::new(format!("{}{}{}", field.id, orientation.suffix(), id.0));
        self.store.add_curve(
            &derived,
            curve.clone(),
            x,
            y,
            CurveMeta::new(field.label.clone(), field.unit.clone()).with_legend(legend),
        )?;
        self.events.publish(CoreEvent::CurveAdded {
            plot: derived,
            curve: curve.clone(),
        });
        self.slice_groups
            .get_mut(&key)
            .expect("group inserted above")
            .markers
            .push(SliceMarker { id, spec, curve });
        Ok(id)
    }

    /// Remove a marker; removing the last marker of an orientation closes
    /// the group's shared window.
    pub fn remove_slice_marker(&mut self, plot: &PlotRef, marker: MarkerId) -> Result<()> {
        let found = self.slice_groups.iter_mut().find_map(|((p, _), group)| {
            if p != plot {
                return None;
            }
            group
                .markers
                .iter()
                .position(|m| m.id == marker)
                .map(|pos| (group.derived.clone(), group.markers.remove(pos)))
        });
        let Some((derived, removed)) = found else {
            return Err(PlotLinkError::UnknownReference(format!(
                "marker {} not found on plot '{plot}'",
                marker.0
            )));
        };
        self.remove_curve(&derived, &removed.curve)
    }

    /// The slice group for (plot, orientation), if open.
    pub fn slice_group(&self, plot: &PlotRef, orientation: SliceOrientation) -> Option<&SliceGroup> {
        self.slice_groups.get(&(plot.clone(), orientation))
    }

    pub fn field(&self, plot: &PlotRef) -> Option<&Field2d> {
        self.fields.get(plot)
    }

    // ── Events / worker plumbing ──

    /// Drain all events published since the last drain, in order.
    pub fn drain_events(&mut self) -> Vec<CoreEvent> {
        self.events.drain()
    }

    /// Mirror every future event to a channel (for out-of-thread renderers).
    pub fn subscribe(&mut self) -> Receiver<CoreEvent> {
        self.events.subscribe()
    }

    /// Next background-job generation. Engine-global and monotonic: an
    /// edge created after a disable gets a generation no in-flight result
    /// of the old edge can ever carry.
    pub(crate) fn next_generation(&mut self) -> u64 {
        self.generations += 1;
        self.generations
    }

    pub(crate) fn worker(&mut self) -> &TransformWorker {
        if self.worker.is_none() {
            self.worker = Some(TransformWorker::spawn());
        }
        self.worker.as_ref().unwrap()
    }

    /// The active selection of the source curve, or a synthesized
    /// whole-curve selection when none exists.
    pub(crate) fn selection_for(&self, plot: &PlotRef, curve_id: &CurveId) -> Result<Selection> {
        if let Some(sel) = self.selections.owned_by(plot, curve_id) {
            return Ok(sel.clone());
        }
        let curve = self.store.curve(plot, curve_id)?;
        Selection::full_range(curve)
    }
}
