//! # plotlink: derived-plot dependency engine
//!
//! The bookkeeping core of a measurement plot browser: any displayed
//! curve can spawn *derived* curves and windows — via a transform on its
//! selected range (FFT, derivative, integral, unwrap, de-slope,
//! histogram, fit, filtering) or via a 2D slice — and the engine keeps
//! every derived view consistent as source data changes, then tears the
//! whole dependency subtree down exactly once on close.
//!
//! ## Architecture
//!
//! - **Engine**: single owner of all state, driven from the application
//!   event-loop thread; operations run to completion, so the refresh
//!   ordering (raw curve → selection → transforms) is guaranteed.
//! - **Dependency graph**: explicit edges from (source curve, kind) to
//!   the derived window — an edge exists iff the window is open. UI
//!   controls are views of graph state, never its source of truth.
//! - **Worker**: long transforms (fitting) compute on a background
//!   thread; results are generation-tagged and discarded if the edge is
//!   gone by the time they arrive.
//! - **Events**: every mutation publishes a [`CoreEvent`] in order; the
//!   rendering collaborator drains the bus after each call.
//!
//! ## Example
//!
//! ```
//! use plotlink::{CurveMeta, CurveId, Engine, EngineConfig, PlotRef, TransformKind, TransformParams};
//!
//! let mut engine = Engine::new(EngineConfig::default());
//! let plot = PlotRef::from("scan1");
//! engine.open_window(plot.clone()).unwrap();
//!
//! let x: Vec<f64> = (0..100).map(|i| i as f64 * 0.1).collect();
//! let y: Vec<f64> = x.iter().map(|v| v.sin()).collect();
//! engine
//!     .add_curve(&plot, CurveId::from("c1"), x, y, CurveMeta::new("V", "mV"))
//!     .unwrap();
//!
//! // Opens the derived window "scan1derivative" with curve "c1derivative".
//! let derived = engine
//!     .enable_transform(&plot, &CurveId::from("c1"), TransformKind::Derivative, TransformParams::new())
//!     .unwrap();
//! assert_eq!(derived.as_str(), "scan1derivative");
//!
//! // Closing the source cascades to every derived window.
//! engine.close_window(&plot).unwrap();
//! assert_eq!(engine.window_count(), 0);
//! ```

pub mod config;
pub mod curve;
pub mod engine;
pub mod error;
pub mod events;
pub mod graph;
pub mod registry;
pub mod selection;
pub mod slices;
pub mod store;
pub mod transforms;
pub mod types;
pub mod worker;

// Re-export commonly used types
pub use config::EngineConfig;
pub use curve::{Curve, CurveMeta};
pub use engine::Engine;
pub use error::{PlotLinkError, Result};
pub use events::{CoreEvent, Severity};
pub use graph::{DependencyGraph, TransformEdge};
pub use registry::{PlotKind, PlotWindow, PlotWindowRegistry};
pub use selection::{Selection, SelectionController};
pub use slices::{AxisOrientation, Field2d, MarkerId, MarkerSpec};
pub use store::CurveStore;
pub use transforms::{ParamValue, TransformOutput, TransformParams, TransformRegistry};
pub use types::{CurveId, DerivedKind, PlotRef, SliceOrientation, TransformKind};
