//! Error handling for the plotlink engine
//!
//! This module defines the engine's error taxonomy and a Result alias
//! used throughout the crate.
//!
//! Propagation rules (enforced at the call sites, documented here):
//!
//! - [`PlotLinkError::DataShape`] and [`PlotLinkError::TransformComputation`]
//!   are reported on the status event channel and leave the affected derived
//!   window in its last good state; they never abort unrelated refreshes.
//! - [`PlotLinkError::UnknownReference`] during a refresh means a live tick
//!   raced a window close — a benign no-op, logged at debug level.
//! - [`PlotLinkError::DuplicateTransform`] is a contract violation the UI
//!   layer is expected to prevent; the engine rejects it hard and logs at
//!   error level.

use thiserror::Error;

/// Main error type for plotlink operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlotLinkError {
    /// x/y length mismatch outside the histogram bin-edge exception
    #[error("Data shape error: {0}")]
    DataShape(String),

    /// Operating on an already-closed plot window or removed curve
    #[error("Unknown reference: {0}")]
    UnknownReference(String),

    /// Opening a plot window whose reference already exists, or a
    /// user-chosen reference colliding with a reserved derived-name suffix
    #[error("Duplicate reference: {0}")]
    DuplicateReference(String),

    /// Enabling a transform kind that is already enabled for the source
    #[error("Duplicate transform: {0}")]
    DuplicateTransform(String),

    /// A registered transform function failed (fit non-convergence,
    /// FFT on fewer than two samples, ...)
    #[error("Transform computation error: {0}")]
    TransformComputation(String),

    /// Configuration loading/saving errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic errors with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<PlotLinkError>,
    },
}

impl PlotLinkError {
    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        PlotLinkError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// True if this error (ignoring context wrappers) is an
    /// `UnknownReference` — the variant treated as a benign no-op when a
    /// live-update tick races a close.
    pub fn is_unknown_reference(&self) -> bool {
        match self {
            PlotLinkError::UnknownReference(_) => true,
            PlotLinkError::WithContext { source, .. } => source.is_unknown_reference(),
            _ => false,
        }
    }
}

/// Result type alias for plotlink operations
pub type Result<T> = std::result::Result<T, PlotLinkError>;

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error result
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context lazily to an error result
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.with_context(f()))
    }
}
