//! Identity types and the derived-window naming convention.
//!
//! Plot windows and curves are keyed by string references because the
//! naming convention is part of the wire contract with the surrounding
//! application:
//!
//! - `<sourcePlotRef><kind>` names a transform-derived window,
//! - `<sourcePlotRef><orientation>` names a shared slice-group window,
//! - `<curveId>-selection` names the selection overlay curve.
//!
//! These suffixes are reserved: a user-chosen primary window reference
//! ending in one of them is rejected so derived names can never collide.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique string key identifying one plot window.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlotRef(String);

impl PlotRef {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Reference of the derived window spawned from this window for `kind`.
    pub fn derived(&self, kind: DerivedKind) -> PlotRef {
        PlotRef(format!("{}{}", self.0, kind.suffix()))
    }

    /// The reserved suffix this reference ends with, if any.
    pub fn reserved_suffix(&self) -> Option<&'static str> {
        RESERVED_SUFFIXES
            .iter()
            .copied()
            .find(|s| self.0.ends_with(s))
    }
}

impl fmt::Display for PlotRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for PlotRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PlotRef({:?})", self.0)
    }
}

impl From<&str> for PlotRef {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Unique string key identifying one curve within a plot window.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CurveId(String);

impl CurveId {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Id of the derived curve spawned from this curve for `kind`.
    pub fn derived(&self, kind: DerivedKind) -> CurveId {
        CurveId(format!("{}{}", self.0, kind.suffix()))
    }

    /// Id of this curve's selection overlay curve (`<curveId>-selection`).
    pub fn selection_overlay(&self) -> CurveId {
        CurveId(format!("{}-selection", self.0))
    }

    /// True if this id names a selection overlay curve.
    pub fn is_selection_overlay(&self) -> bool {
        self.0.ends_with("-selection")
    }
}

impl fmt::Display for CurveId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for CurveId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CurveId({:?})", self.0)
    }
}

impl From<&str> for CurveId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A named transform operating on the active selection of a curve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TransformKind {
    Fft,
    Derivative,
    Integral,
    Unwrap,
    Deslope,
    Histogram,
    Fit,
    Filtering,
}

impl TransformKind {
    /// All transform kinds, in the order they are registered by default.
    pub fn all() -> &'static [TransformKind] {
        &[
            TransformKind::Fft,
            TransformKind::Derivative,
            TransformKind::Integral,
            TransformKind::Unwrap,
            TransformKind::Deslope,
            TransformKind::Histogram,
            TransformKind::Fit,
            TransformKind::Filtering,
        ]
    }

    /// The wire-level name, also the reserved derived-window suffix.
    pub fn suffix(&self) -> &'static str {
        match self {
            TransformKind::Fft => "fft",
            TransformKind::Derivative => "derivative",
            TransformKind::Integral => "integral",
            TransformKind::Unwrap => "unwrap",
            TransformKind::Deslope => "deslope",
            TransformKind::Histogram => "histogram",
            TransformKind::Fit => "fit",
            TransformKind::Filtering => "filtering",
        }
    }
}

impl fmt::Display for TransformKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.suffix())
    }
}

/// Orientation of a 2D slice group. All markers sharing an orientation
/// feed curves into one shared derived window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SliceOrientation {
    Vertical,
    Horizontal,
    Arbitrary,
}

impl SliceOrientation {
    pub fn all() -> &'static [SliceOrientation] {
        &[
            SliceOrientation::Vertical,
            SliceOrientation::Horizontal,
            SliceOrientation::Arbitrary,
        ]
    }

    /// The wire-level name, also the reserved derived-window suffix.
    pub fn suffix(&self) -> &'static str {
        match self {
            SliceOrientation::Vertical => "vertical",
            SliceOrientation::Horizontal => "horizontal",
            SliceOrientation::Arbitrary => "arbitrary",
        }
    }
}

impl fmt::Display for SliceOrientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.suffix())
    }
}

/// What a derived window was spawned by: a transform on a 1D curve's
/// selection, or a slice group on a 2D field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DerivedKind {
    Transform(TransformKind),
    Slice(SliceOrientation),
}

impl DerivedKind {
    pub fn suffix(&self) -> &'static str {
        match self {
            DerivedKind::Transform(k) => k.suffix(),
            DerivedKind::Slice(o) => o.suffix(),
        }
    }
}

impl fmt::Display for DerivedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.suffix())
    }
}

/// Suffixes that user-chosen primary references must not end with.
pub const RESERVED_SUFFIXES: &[&str] = &[
    "fft",
    "derivative",
    "integral",
    "unwrap",
    "deslope",
    "histogram",
    "fit",
    "filtering",
    "vertical",
    "horizontal",
    "arbitrary",
    "-selection",
];
