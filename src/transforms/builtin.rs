//! Built-in transform bodies.
//!
//! Every function here satisfies the registry contract: pure, deterministic
//! for fixed inputs, reads only the selection, and fails with
//! `TransformComputation` when the selected data cannot support the
//! operation (too few samples, singular fit system).

use crate::error::{PlotLinkError, Result};
use crate::selection::Selection;
use crate::transforms::{TransformOutput, TransformParams};
use std::f64::consts::PI;

fn require_samples(selection: &Selection, min: usize, what: &str) -> Result<()> {
    if selection.len() < min {
        return Err(PlotLinkError::TransformComputation(format!(
            "{what} needs at least {min} samples, selection has {}",
            selection.len()
        )));
    }
    Ok(())
}

/// Numerical derivative dy/dx on a possibly nonuniform grid: central
/// differences in the interior, one-sided at the ends.
pub fn derivative_transform(selection: &Selection, _params: &TransformParams) -> Result<TransformOutput> {
    require_samples(selection, 2, "derivative")?;
    let x = &selection.x;
    let y = &selection.y;
    let n = x.len();
    let mut dy = vec![0.0; n];
    dy[0] = (y[1] - y[0]) / (x[1] - x[0]);
    dy[n - 1] = (y[n - 1] - y[n - 2]) / (x[n - 1] - x[n - 2]);
    for i in 1..n - 1 {
        dy[i] = (y[i + 1] - y[i - 1]) / (x[i + 1] - x[i - 1]);
    }
    Ok(TransformOutput::new(x.clone(), dy, "d/dx"))
}

/// Cumulative trapezoid integral, anchored at zero.
pub fn integral_transform(selection: &Selection, _params: &TransformParams) -> Result<TransformOutput> {
    require_samples(selection, 2, "integral")?;
    let x = &selection.x;
    let y = &selection.y;
    let mut acc = vec![0.0; x.len()];
    for i in 1..x.len() {
        acc[i] = acc[i - 1] + 0.5 * (y[i] + y[i - 1]) * (x[i] - x[i - 1]);
    }
    Ok(TransformOutput::new(x.clone(), acc, "cumulative integral"))
}

/// 2π phase unwrap: successive differences are folded into (-π, π].
pub fn unwrap_transform(selection: &Selection, _params: &TransformParams) -> Result<TransformOutput> {
    require_samples(selection, 2, "unwrap")?;
    let y = &selection.y;
    let mut out = Vec::with_capacity(y.len());
    let mut offset = 0.0;
    out.push(y[0]);
    for i in 1..y.len() {
        let d = y[i] - y[i - 1];
        if d > PI {
            offset -= 2.0 * PI;
        } else if d < -PI {
            offset += 2.0 * PI;
        }
        out.push(y[i] + offset);
    }
    Ok(TransformOutput::new(selection.x.clone(), out, "unwrapped"))
}

/// Subtract the least-squares line from the selection (de-slope).
pub fn deslope_transform(selection: &Selection, _params: &TransformParams) -> Result<TransformOutput> {
    require_samples(selection, 2, "deslope")?;
    let (slope, intercept) = linear_fit(&selection.x, &selection.y)?;
    let y = selection
        .x
        .iter()
        .zip(&selection.y)
        .map(|(&x, &y)| y - (slope * x + intercept))
        .collect();
    Ok(TransformOutput::new(
        selection.x.clone(),
        y,
        format!("desloped ({slope:.3e}/x removed)"),
    ))
}

/// Histogram of the selected y values. Output x holds bin edges
/// (`len(x) == len(y) + 1`). Parameter `bins` (default 10).
pub fn histogram_transform(selection: &Selection, params: &TransformParams) -> Result<TransformOutput> {
    require_samples(selection, 1, "histogram")?;
    let bins = params.get_usize("bins", 10).max(1);
    let mut lo = selection.y.iter().copied().fold(f64::INFINITY, f64::min);
    let mut hi = selection.y.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if lo == hi {
        // All samples equal: widen to a unit-width range around the value.
        lo -= 0.5;
        hi += 0.5;
    }
    let width = (hi - lo) / bins as f64;
    let edges: Vec<f64> = (0..=bins).map(|i| lo + i as f64 * width).collect();
    let mut counts = vec![0.0; bins];
    for &v in &selection.y {
        let mut idx = ((v - lo) / width) as usize;
        if idx >= bins {
            idx = bins - 1;
        }
        counts[idx] += 1.0;
    }
    let mut out = TransformOutput::new(edges, counts, format!("histogram ({bins} bins)"));
    out.histogram = true;
    Ok(out)
}

/// Centered moving-average smoothing. Parameter `window` (default 5) is
/// the full window width; it shrinks near the edges.
pub fn filtering_transform(selection: &Selection, params: &TransformParams) -> Result<TransformOutput> {
    require_samples(selection, 1, "filtering")?;
    let window = params.get_usize("window", 5).max(1);
    let half = window / 2;
    let y = &selection.y;
    let out = (0..y.len())
        .map(|i| {
            let lo = i.saturating_sub(half);
            let hi = (i + half + 1).min(y.len());
            y[lo..hi].iter().sum::<f64>() / (hi - lo) as f64
        })
        .collect();
    Ok(TransformOutput::new(
        selection.x.clone(),
        out,
        format!("moving average (window {window})"),
    ))
}

/// Polynomial least-squares fit, evaluated on the selection's x grid.
/// Parameter `degree` (default 1). Fails with `TransformComputation`
/// when the system is underdetermined or singular (the fit equivalent of
/// non-convergence).
pub fn fit_transform(selection: &Selection, params: &TransformParams) -> Result<TransformOutput> {
    let degree = params.get_usize("degree", 1);
    require_samples(selection, degree + 1, "fit")?;
    let coeffs = polyfit(&selection.x, &selection.y, degree)?;
    let x0 = mean(&selection.x);
    let y = selection
        .x
        .iter()
        .map(|&x| polyval(&coeffs, x - x0))
        .collect();
    Ok(TransformOutput::new(
        selection.x.clone(),
        y,
        format!("polynomial fit (degree {degree})"),
    ))
}

fn mean(v: &[f64]) -> f64 {
    v.iter().sum::<f64>() / v.len() as f64
}

fn linear_fit(x: &[f64], y: &[f64]) -> Result<(f64, f64)> {
    let mx = mean(x);
    let my = mean(y);
    let sxx: f64 = x.iter().map(|&v| (v - mx) * (v - mx)).sum();
    if sxx == 0.0 {
        return Err(PlotLinkError::TransformComputation(
            "fit failed: x values are all identical".to_string(),
        ));
    }
    let sxy: f64 = x.iter().zip(y).map(|(&a, &b)| (a - mx) * (b - my)).sum();
    let slope = sxy / sxx;
    let intercept = my - slope * mx;
    Ok((slope, intercept))
}

/// Least-squares polynomial coefficients (ascending powers) in
/// coordinates centered on mean(x) for conditioning.
fn polyfit(x: &[f64], y: &[f64], degree: usize) -> Result<Vec<f64>> {
    let m = degree + 1;
    let x0 = mean(x);
    // Normal equations A c = b with A[i][j] = sum x^(i+j)
    let mut powers = vec![0.0; 2 * degree + 1];
    for &xv in x {
        let xc = xv - x0;
        let mut p = 1.0;
        for entry in powers.iter_mut() {
            *entry += p;
            p *= xc;
        }
    }
    let mut a = vec![vec![0.0; m]; m];
    for (i, row) in a.iter_mut().enumerate() {
        for (j, cell) in row.iter_mut().enumerate() {
            *cell = powers[i + j];
        }
    }
    let mut b = vec![0.0; m];
    for (&xv, &yv) in x.iter().zip(y) {
        let xc = xv - x0;
        let mut p = 1.0;
        for entry in b.iter_mut() {
            *entry += p * yv;
            p *= xc;
        }
    }
    solve(a, b)
}

fn polyval(coeffs: &[f64], x: f64) -> f64 {
    coeffs.iter().rev().fold(0.0, |acc, &c| acc * x + c)
}

/// Gaussian elimination with partial pivoting.
fn solve(mut a: Vec<Vec<f64>>, mut b: Vec<f64>) -> Result<Vec<f64>> {
    let n = b.len();
    for col in 0..n {
        let pivot = (col..n)
            .max_by(|&i, &j| a[i][col].abs().total_cmp(&a[j][col].abs()))
            .unwrap();
        if a[pivot][col].abs() < 1e-12 {
            return Err(PlotLinkError::TransformComputation(
                "fit failed: singular system (did not converge)".to_string(),
            ));
        }
        a.swap(col, pivot);
        b.swap(col, pivot);
        for row in col + 1..n {
            let f = a[row][col] / a[col][col];
            for k in col..n {
                a[row][k] -= f * a[col][k];
            }
            b[row] -= f * b[col];
        }
    }
    let mut x = vec![0.0; n];
    for row in (0..n).rev() {
        let mut acc = b[row];
        for k in row + 1..n {
            acc -= a[row][k] * x[k];
        }
        x[row] = acc / a[row][row];
    }
    Ok(x)
}
