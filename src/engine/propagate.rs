//! Update propagation: the refresh ordering invariant.
//!
//! When source data changes (user action or live-measurement tick), the
//! engine runs a strict two-level sequence:
//!
//! 1. update the raw curve,
//! 2. recompute the window's selection if the changed curve owns it,
//! 3. recompute every enabled transform sourced from that curve, in
//!    transform registration order.
//!
//! Because the whole sequence runs to completion on one thread, no
//! transform can ever read a stale selection. A refresh arriving while a
//! background computation for the same plot is still outstanding is
//! skipped with a warning (live ticks repeat, nothing is lost).

use super::Engine;
use crate::error::Result;
use crate::events::{CoreEvent, Severity};
use crate::graph::EdgeKey;
use crate::slices::{Field2d, MarkerSpec};
use crate::types::{CurveId, DerivedKind, PlotRef};
use crate::worker::{TransformJob, TransformJobResult};

impl Engine {
    /// Push refreshed data for one curve and propagate it through the
    /// selection and all enabled transforms.
    ///
    /// A refresh that races a window close is a benign no-op; data-shape
    /// and transform failures go to the status channel and leave the
    /// affected curves in their last good state.
    pub fn refresh(
        &mut self,
        plot: &PlotRef,
        curve_id: &CurveId,
        x: Vec<f64>,
        y: Vec<f64>,
        legend: Option<String>,
    ) -> Result<()> {
        if self.pending.contains(plot) {
            tracing::warn!(
                "refresh for '{plot}' skipped: previous refresh still outstanding"
            );
            return Ok(());
        }

        // 1. Raw curve.
        match self.store.update_curve(plot, curve_id, x, y, legend) {
            Ok(()) => self.events.publish(CoreEvent::CurveUpdated {
                plot: plot.clone(),
                curve: curve_id.clone(),
            }),
            Err(e) if e.is_unknown_reference() => {
                tracing::debug!("refresh of '{plot}'/'{curve_id}' raced a close: {e}");
                return Ok(());
            }
            Err(e) => {
                self.events
                    .status(Severity::Error, format!("refresh of '{curve_id}' rejected: {e}"));
                return Ok(());
            }
        }

        // 2. Selection owned by this curve.
        let curve = self.store.curve(plot, curve_id)?.clone();
        if let Some(result) = self.selections.recompute(plot, &curve) {
            match result {
                Ok(sel) => {
                    let (sx, sy) = (sel.x.clone(), sel.y.clone());
                    let overlay = curve_id.selection_overlay();
                    if self.store.update_curve(plot, &overlay, sx, sy, None).is_ok() {
                        self.events.publish(CoreEvent::CurveUpdated {
                            plot: plot.clone(),
                            curve: overlay,
                        });
                    }
                }
                Err(e) => {
                    self.events
                        .status(Severity::Warning, format!("selection recompute failed: {e}"));
                }
            }
        }

        // 3. Transforms, in registration order.
        self.recompute_transforms(plot, curve_id)
    }

    /// Recompute every enabled transform sourced from (plot, curve), in
    /// transform registration order.
    pub(crate) fn recompute_transforms(&mut self, plot: &PlotRef, curve_id: &CurveId) -> Result<()> {
        for kind in self.transforms.kinds_in_order() {
            let dkind = DerivedKind::Transform(kind);
            let Some(edge) = self.graph.get(plot, dkind) else {
                continue;
            };
            if &edge.source_curve != curve_id {
                continue;
            }
            let params = edge.params.clone();
            let derived = edge.derived.clone();
            let derived_curve = curve_id.derived(dkind);
            let function = self.transforms.function(kind)?;

            let selection = match self.selection_for(plot, curve_id) {
                Ok(sel) => sel,
                Err(e) => {
                    self.events
                        .status(Severity::Warning, format!("transform '{kind}' skipped: {e}"));
                    continue;
                }
            };

            if self.transforms.is_background(kind) && self.config.background_fit {
                let generation = self.next_generation();
                let edge = self
                    .graph
                    .get_mut(plot, dkind)
                    .expect("edge checked above");
                edge.generation = generation;
                let cancel = edge.cancel.clone();
                let job = TransformJob {
                    key: EdgeKey {
                        source_plot: plot.clone(),
                        kind: dkind,
                    },
                    derived,
                    derived_curve,
                    generation,
                    selection,
                    params,
                    function,
                    cancel,
                };
                self.worker().submit(job);
                self.pending.insert(plot.clone());
                continue;
            }

            match function(&selection, &params) {
                Ok(output) => {
                    match self.store.update_curve(
                        &derived,
                        &derived_curve,
                        output.x,
                        output.y,
                        Some(output.legend),
                    ) {
                        Ok(()) => self.events.publish(CoreEvent::CurveUpdated {
                            plot: derived,
                            curve: derived_curve,
                        }),
                        Err(e) if e.is_unknown_reference() => {
                            tracing::debug!("derived '{derived}' vanished mid-refresh: {e}");
                        }
                        Err(e) => self.events.status(
                            Severity::Error,
                            format!("derived update for '{derived}' rejected: {e}"),
                        ),
                    }
                }
                Err(e) => {
                    // Last good state stays on screen; remaining
                    // transforms still run.
                    self.events
                        .status(Severity::Error, format!("transform '{kind}' failed: {e}"));
                }
            }
        }
        Ok(())
    }

    /// Push a refreshed 2D field and recompute every slice marker fed by
    /// it. A refresh racing the window close is a benign no-op.
    pub fn refresh_field(&mut self, plot: &PlotRef, field: Field2d) -> Result<()> {
        if !self.fields.contains_key(plot) {
            tracing::debug!("field refresh for '{plot}' raced a close");
            return Ok(());
        }
        self.fields.insert(plot.clone(), field.clone());
        self.events.publish(CoreEvent::CurveUpdated {
            plot: plot.clone(),
            curve: field.id.clone(),
        });

        let groups: Vec<(PlotRef, Vec<(CurveId, MarkerSpec)>)> = self
            .slice_groups
            .iter()
            .filter(|((p, _), _)| p == plot)
            .map(|(_, g)| {
                (
                    g.derived.clone(),
                    g.markers
                        .iter()
                        .map(|m| (m.curve.clone(), m.spec.clone()))
                        .collect(),
                )
            })
            .collect();

        for (derived, markers) in groups {
            for (curve, spec) in markers {
                let (x, y, legend) = spec.compute(&field);
                match self.store.update_curve(&derived, &curve, x, y, Some(legend)) {
                    Ok(()) => self.events.publish(CoreEvent::CurveUpdated {
                        plot: derived.clone(),
                        curve,
                    }),
                    Err(e) if e.is_unknown_reference() => {
                        tracing::debug!("slice curve '{curve}' vanished mid-refresh: {e}");
                    }
                    Err(e) => self.events.status(
                        Severity::Error,
                        format!("slice update for '{derived}' rejected: {e}"),
                    ),
                }
            }
        }
        Ok(())
    }

    /// Apply finished background-transform results. Results whose edge no
    /// longer exists, or whose generation is stale, are discarded — the
    /// use-after-close guard. Returns the number of applied results.
    pub fn poll_workers(&mut self) -> usize {
        let results = match &self.worker {
            Some(worker) => worker.try_results(),
            None => return 0,
        };
        results
            .into_iter()
            .map(|r| self.apply_result(r) as usize)
            .sum()
    }

    /// Block until the worker goes idle (no pending background plots) or
    /// the timeout elapses, applying results as they arrive. Intended for
    /// embedders that need deterministic teardown and for tests.
    pub fn wait_for_workers(&mut self, timeout: std::time::Duration) -> usize {
        let deadline = std::time::Instant::now() + timeout;
        let mut applied = 0;
        while !self.pending.is_empty() && std::time::Instant::now() < deadline {
            let Some(worker) = &self.worker else { break };
            if let Some(result) =
                worker.recv_result_timeout(std::time::Duration::from_millis(10))
            {
                applied += self.apply_result(result) as usize;
            }
        }
        applied
    }

    fn apply_result(&mut self, result: TransformJobResult) -> bool {
        let Some(edge) = self.graph.get(&result.key.source_plot, result.key.kind) else {
            tracing::debug!(
                "discarding '{}' result for '{}': edge gone",
                result.key.kind,
                result.key.source_plot
            );
            return false;
        };
        if edge.generation != result.generation {
            tracing::debug!(
                "discarding stale '{}' result for '{}' (gen {} != {})",
                result.key.kind,
                result.key.source_plot,
                result.generation,
                edge.generation
            );
            return false;
        }
        // Edge is live and the generations match: this is the outstanding
        // computation, so the refresh guard lifts whether it succeeded or
        // not. A stale or orphaned result must leave `pending` alone, as
        // a newer job for the same plot may still be in flight.
        self.pending.remove(&result.key.source_plot);
        match result.outcome {
            Ok(output) => {
                match self.store.update_curve(
                    &result.derived,
                    &result.derived_curve,
                    output.x,
                    output.y,
                    Some(output.legend),
                ) {
                    Ok(()) => {
                        self.events.publish(CoreEvent::CurveUpdated {
                            plot: result.derived.clone(),
                            curve: result.derived_curve.clone(),
                        });
                        true
                    }
                    Err(e) => {
                        self.events.status(
                            Severity::Error,
                            format!("worker result for '{}' rejected: {e}", result.derived),
                        );
                        false
                    }
                }
            }
            Err(e) => {
                // Fit windows surface an explicit failure message and
                // keep their last good data.
                self.events.status(
                    Severity::Error,
                    format!("'{}' failed on '{}': {e}", result.key.kind, result.derived),
                );
                false
            }
        }
    }
}
