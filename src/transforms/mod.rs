//! Transform registry and parameter values.
//!
//! A transform is a pure function mapping (selected data, parameters) to
//! a derived series. Transforms are mutually independent siblings: each
//! reads the *selection*, never another transform's output. Registration
//! order is the fixed order in which enabled transforms are recomputed
//! during a refresh.
//!
//! Long-running transforms (nonlinear/polynomial fitting) can be
//! registered as background transforms; the engine then computes them on
//! the worker thread and marshals results back.

mod builtin;
mod fft;

pub use builtin::{
    derivative_transform, deslope_transform, filtering_transform, fit_transform,
    histogram_transform, integral_transform, unwrap_transform,
};
pub use fft::{fft_transform, WindowFunction};

use crate::error::{PlotLinkError, Result};
use crate::selection::Selection;
use crate::types::TransformKind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// A single transform parameter value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

/// Named parameters passed to a transform function.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransformParams(BTreeMap<String, ParamValue>);

impl TransformParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, key: impl Into<String>, value: ParamValue) -> Self {
        self.0.insert(key.into(), value);
        self
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn get_f64(&self, key: &str, default: f64) -> f64 {
        match self.0.get(key) {
            Some(ParamValue::Float(v)) => *v,
            Some(ParamValue::Int(v)) => *v as f64,
            _ => default,
        }
    }

    pub fn get_usize(&self, key: &str, default: usize) -> usize {
        match self.0.get(key) {
            Some(ParamValue::Int(v)) if *v >= 0 => *v as usize,
            Some(ParamValue::Float(v)) if *v >= 0.0 => *v as usize,
            _ => default,
        }
    }

    pub fn get_bool(&self, key: &str, default: bool) -> bool {
        match self.0.get(key) {
            Some(ParamValue::Bool(v)) => *v,
            _ => default,
        }
    }

    pub fn get_str<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        match self.0.get(key) {
            Some(ParamValue::Str(v)) => v.as_str(),
            _ => default,
        }
    }
}

/// Result of a transform: the derived series plus display metadata.
#[derive(Debug, Clone)]
pub struct TransformOutput {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub legend: String,
    /// The derived curve uses the bin-edge convention.
    pub histogram: bool,
}

impl TransformOutput {
    pub fn new(x: Vec<f64>, y: Vec<f64>, legend: impl Into<String>) -> Self {
        Self {
            x,
            y,
            legend: legend.into(),
            histogram: false,
        }
    }
}

/// Signature of a registered transform: pure and deterministic for fixed
/// inputs.
pub type TransformFn = Arc<dyn Fn(&Selection, &TransformParams) -> Result<TransformOutput> + Send + Sync>;

struct Registration {
    kind: TransformKind,
    f: TransformFn,
    background: bool,
}

/// Registry of transform functions, iterated in registration order.
pub struct TransformRegistry {
    entries: Vec<Registration>,
}

impl TransformRegistry {
    /// Empty registry (tests register their own functions).
    pub fn empty() -> Self {
        Self { entries: Vec::new() }
    }

    /// Registry with all built-in transforms. Fit is registered as a
    /// background transform; everything else computes inline.
    pub fn with_builtins() -> Self {
        let mut reg = Self::empty();
        reg.register(TransformKind::Fft, Arc::new(fft_transform));
        reg.register(TransformKind::Derivative, Arc::new(derivative_transform));
        reg.register(TransformKind::Integral, Arc::new(integral_transform));
        reg.register(TransformKind::Unwrap, Arc::new(unwrap_transform));
        reg.register(TransformKind::Deslope, Arc::new(deslope_transform));
        reg.register(TransformKind::Histogram, Arc::new(histogram_transform));
        reg.register_background(TransformKind::Fit, Arc::new(fit_transform));
        reg.register(TransformKind::Filtering, Arc::new(filtering_transform));
        reg
    }

    /// Register (or replace) the function for `kind`. Replacing keeps the
    /// original registration position.
    pub fn register(&mut self, kind: TransformKind, f: TransformFn) {
        self.insert(kind, f, false);
    }

    /// Register a transform that runs on the background worker.
    pub fn register_background(&mut self, kind: TransformKind, f: TransformFn) {
        self.insert(kind, f, true);
    }

    fn insert(&mut self, kind: TransformKind, f: TransformFn, background: bool) {
        if let Some(entry) = self.entries.iter_mut().find(|e| e.kind == kind) {
            entry.f = f;
            entry.background = background;
        } else {
            self.entries.push(Registration { kind, f, background });
        }
    }

    /// Registered kinds in registration order — the fixed recompute order.
    pub fn kinds_in_order(&self) -> Vec<TransformKind> {
        self.entries.iter().map(|e| e.kind).collect()
    }

    pub fn is_registered(&self, kind: TransformKind) -> bool {
        self.entries.iter().any(|e| e.kind == kind)
    }

    pub fn is_background(&self, kind: TransformKind) -> bool {
        self.entries
            .iter()
            .find(|e| e.kind == kind)
            .map(|e| e.background)
            .unwrap_or(false)
    }

    /// The registered function for `kind` (cloned handle).
    pub fn function(&self, kind: TransformKind) -> Result<TransformFn> {
        self.entries
            .iter()
            .find(|e| e.kind == kind)
            .map(|e| e.f.clone())
            .ok_or_else(|| {
                PlotLinkError::UnknownReference(format!("transform '{kind}' is not registered"))
            })
    }

    /// Compute `kind` inline.
    pub fn compute(
        &self,
        kind: TransformKind,
        selection: &Selection,
        params: &TransformParams,
    ) -> Result<TransformOutput> {
        let f = self.function(kind)?;
        f(selection, params)
    }
}
