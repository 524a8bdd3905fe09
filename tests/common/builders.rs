//! Test data builders for creating engines, curves, and 2D fields

use plotlink::{
    Curve, CurveId, CurveMeta, Engine, EngineConfig, Field2d, PlotRef,
};

/// Builder for sampled test signals
pub struct SignalBuilder {
    samples: usize,
    dx: f64,
    f: fn(f64) -> f64,
}

impl SignalBuilder {
    pub fn new(f: fn(f64) -> f64) -> Self {
        Self {
            samples: 1000,
            dx: 0.01,
            f,
        }
    }

    pub fn samples(mut self, samples: usize) -> Self {
        self.samples = samples;
        self
    }

    pub fn dx(mut self, dx: f64) -> Self {
        self.dx = dx;
        self
    }

    pub fn build(self) -> (Vec<f64>, Vec<f64>) {
        let x: Vec<f64> = (0..self.samples).map(|i| i as f64 * self.dx).collect();
        let y: Vec<f64> = x.iter().map(|&v| (self.f)(v)).collect();
        (x, y)
    }
}

/// An engine with one primary window holding one curve
pub fn engine_with_curve(
    plot: &str,
    curve: &str,
    x: Vec<f64>,
    y: Vec<f64>,
) -> (Engine, PlotRef, CurveId) {
    let mut engine = Engine::new(EngineConfig::default());
    let plot = PlotRef::from(plot);
    let curve = CurveId::from(curve);
    engine.open_window(plot.clone()).unwrap();
    engine
        .add_curve(&plot, curve.clone(), x, y, CurveMeta::new("signal", "V"))
        .unwrap();
    engine.drain_events();
    (engine, plot, curve)
}

/// A 4x3 field with z[xi][yi] = 10 * xi + yi, axes 0..4 and 0..3
pub fn small_field(id: &str) -> Field2d {
    let x: Vec<f64> = (0..4).map(|i| i as f64).collect();
    let y: Vec<f64> = (0..3).map(|i| i as f64).collect();
    let z: Vec<Vec<f64>> = (0..4)
        .map(|xi| (0..3).map(|yi| (10 * xi + yi) as f64).collect())
        .collect();
    Field2d::new(CurveId::from(id), x, y, z, "field", "counts").unwrap()
}

/// An engine with one 2D field window
pub fn engine_with_field(plot: &str, field_id: &str) -> (Engine, PlotRef) {
    let mut engine = Engine::new(EngineConfig::default());
    let plot = PlotRef::from(plot);
    engine
        .open_field_window(plot.clone(), small_field(field_id))
        .unwrap();
    engine.drain_events();
    (engine, plot)
}

pub fn curve_xy(curve: &Curve) -> (&[f64], &[f64]) {
    (&curve.x, &curve.y)
}
