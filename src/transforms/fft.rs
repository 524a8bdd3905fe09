//! FFT transform body.
//!
//! Computes a single-sided magnitude spectrum of the selected y values.
//! The sample rate is taken from the mean spacing of the selection's x
//! array. An optional window function reduces spectral leakage.
//!
//! Parameters: `window` — "rectangular" (default), "hann", "hamming"
//! or "blackman".

use crate::error::{PlotLinkError, Result};
use crate::selection::Selection;
use crate::transforms::{TransformOutput, TransformParams};
use rustfft::{num_complex::Complex, FftPlanner};
use std::f64::consts::PI;

/// Window function for FFT preprocessing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WindowFunction {
    /// Rectangular window (no windowing)
    #[default]
    Rectangular,
    /// Hann window (good general purpose)
    Hann,
    /// Hamming window (reduced side lobes)
    Hamming,
    /// Blackman window (very low side lobes)
    Blackman,
}

impl WindowFunction {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "rectangular" => Some(WindowFunction::Rectangular),
            "hann" => Some(WindowFunction::Hann),
            "hamming" => Some(WindowFunction::Hamming),
            "blackman" => Some(WindowFunction::Blackman),
            _ => None,
        }
    }

    /// Compute window coefficient at position i out of n samples
    pub fn coefficient(&self, i: usize, n: usize) -> f64 {
        let n_f = n as f64;
        let i_f = i as f64;
        match self {
            WindowFunction::Rectangular => 1.0,
            WindowFunction::Hann => 0.5 * (1.0 - (2.0 * PI * i_f / n_f).cos()),
            WindowFunction::Hamming => 0.54 - 0.46 * (2.0 * PI * i_f / n_f).cos(),
            WindowFunction::Blackman => {
                // Clamp to 0.0: the formula is exactly 0 at endpoints but
                // floating-point representation of 0.42 and 0.08 can produce -ε.
                (0.42 - 0.5 * (2.0 * PI * i_f / n_f).cos() + 0.08 * (4.0 * PI * i_f / n_f).cos())
                    .max(0.0)
            }
        }
    }
}

/// Magnitude spectrum of the selection.
pub fn fft_transform(selection: &Selection, params: &TransformParams) -> Result<TransformOutput> {
    let n = selection.len();
    if n < 2 {
        return Err(PlotLinkError::TransformComputation(format!(
            "fft needs at least 2 samples, selection has {n}"
        )));
    }
    let window_name = params.get_str("window", "rectangular");
    let window = WindowFunction::from_name(window_name).ok_or_else(|| {
        PlotLinkError::TransformComputation(format!("unknown fft window '{window_name}'"))
    })?;

    let span = selection.x[n - 1] - selection.x[0];
    if span <= 0.0 {
        return Err(PlotLinkError::TransformComputation(
            "fft needs a strictly increasing x span".to_string(),
        ));
    }
    let sample_rate = (n - 1) as f64 / span;

    let mut buffer: Vec<Complex<f64>> = selection
        .y
        .iter()
        .enumerate()
        .map(|(i, &v)| Complex::new(v * window.coefficient(i, n), 0.0))
        .collect();

    let mut planner = FftPlanner::new();
    planner.plan_fft_forward(n).process(&mut buffer);

    // Single-sided spectrum: DC through Nyquist
    let half = n / 2 + 1;
    let freq_resolution = sample_rate / n as f64;
    let frequencies: Vec<f64> = (0..half).map(|i| i as f64 * freq_resolution).collect();
    let magnitudes: Vec<f64> = buffer[..half]
        .iter()
        .map(|c| 2.0 * c.norm() / n as f64)
        .collect();

    Ok(TransformOutput::new(
        frequencies,
        magnitudes,
        format!("fft ({window_name})"),
    ))
}
