//! Synchronous event bus between the engine and its collaborators.
//!
//! Every store/registry mutation publishes a [`CoreEvent`]; the rendering
//! collaborator drains the queue after calling into the engine. Events are
//! published in mutation order, which is the documented ordering guarantee
//! that replaces queued signal delivery.
//!
//! An optional crossbeam mirror forwards every event to an out-of-thread
//! renderer; the in-process queue stays authoritative.

use crate::types::{CurveId, DerivedKind, PlotRef};
use crossbeam_channel::{unbounded, Receiver, Sender};
use std::collections::VecDeque;

/// Severity of a status message on the user-visible status channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// Events emitted by the engine, in mutation order.
#[derive(Debug, Clone, PartialEq)]
pub enum CoreEvent {
    WindowOpened {
        plot: PlotRef,
    },
    /// Carries the close-time curve set of the window.
    WindowClosed {
        plot: PlotRef,
        curves: Vec<CurveId>,
    },
    CurveAdded {
        plot: PlotRef,
        curve: CurveId,
    },
    CurveUpdated {
        plot: PlotRef,
        curve: CurveId,
    },
    CurveRemoved {
        plot: PlotRef,
        curve: CurveId,
    },
    SelectionSet {
        plot: PlotRef,
        curve: CurveId,
    },
    SelectionCleared {
        plot: PlotRef,
    },
    TransformEnabled {
        plot: PlotRef,
        kind: DerivedKind,
        derived: PlotRef,
    },
    TransformDisabled {
        plot: PlotRef,
        kind: DerivedKind,
        derived: PlotRef,
    },
    /// A derived window was closed directly; the UI control that enabled
    /// it must reset (controls are views of graph state, not its source).
    ControlReset {
        plot: PlotRef,
        kind: DerivedKind,
    },
    /// Slice markers lost their derived window and must disappear from
    /// the owning 2D plot.
    MarkersDetached {
        plot: PlotRef,
        markers: Vec<u32>,
    },
    /// User-visible status channel (shape/computation failures).
    Status {
        severity: Severity,
        message: String,
    },
}

/// Ordered event queue with an optional channel mirror.
pub struct EventBus {
    queue: VecDeque<CoreEvent>,
    mirror: Option<Sender<CoreEvent>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            queue: VecDeque::new(),
            mirror: None,
        }
    }

    /// Create a channel mirror; every subsequently published event is
    /// also sent to the returned receiver.
    pub fn subscribe(&mut self) -> Receiver<CoreEvent> {
        let (tx, rx) = unbounded();
        self.mirror = Some(tx);
        rx
    }

    pub fn publish(&mut self, event: CoreEvent) {
        tracing::trace!("event: {:?}", event);
        if let Some(tx) = &self.mirror {
            // A dropped receiver just disables the mirror.
            if tx.send(event.clone()).is_err() {
                self.mirror = None;
            }
        }
        self.queue.push_back(event);
    }

    /// Convenience for the status channel.
    pub fn status(&mut self, severity: Severity, message: impl Into<String>) {
        let message = message.into();
        match severity {
            Severity::Error => tracing::error!("{message}"),
            Severity::Warning => tracing::warn!("{message}"),
            Severity::Info => tracing::info!("{message}"),
        }
        self.publish(CoreEvent::Status { severity, message });
    }

    /// Drain all queued events in publication order.
    pub fn drain(&mut self) -> Vec<CoreEvent> {
        self.queue.drain(..).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
